//! Host-provided numeric constants: the three singleton values and the
//! Fixnum encoding. These are properties of the host VM's value
//! representation, not something this compiler invents — the bit pattern
//! `Qfalse = 0`, `Qnil = 8`, `Qundef = 0x34` and `INT2FIX(n) = (n << 1) | 1`
//! below are the host's actual tagged-pointer layout, reproduced here so the
//! default test configuration has concrete values to lower `putobject`,
//! `putnil`, and RTEST against.

/// `false`. Bit pattern chosen so `Qfalse & ~Qnil == 0`.
pub const QFALSE: u64 = 0x00;

/// `nil`. Bit pattern chosen so `Qnil & ~Qnil == 0`.
pub const QNIL: u64 = 0x08;

/// `true`.
pub const QTRUE: u64 = 0x14;

/// The "not yet computed" sentinel, never observable from user-visible code.
pub const QUNDEF: u64 = 0x34;

/// Encodes a small integer using the host's tagged-fixnum scheme.
pub const fn int2fix(n: i64) -> u64 {
    ((n << 1) | 1) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rtest_lowering_matches_the_host_predicate() {
        let rtest = |v: u64| (v & !QNIL) != 0;
        assert!(!rtest(QFALSE));
        assert!(!rtest(QNIL));
        assert!(rtest(QTRUE));
        assert!(rtest(QUNDEF));
        assert!(rtest(int2fix(0)));
        assert!(rtest(int2fix(42)));
    }
}
