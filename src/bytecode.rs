//! The bytecode input and the opcode-metadata interface the host provides.
//!
//! Everything in this module is data, or a trait over host-owned data: the
//! compiler never constructs an `Iseq` itself, and never invents opcode
//! metadata. An embedder's own opcode table can implement `OpcodeTable`
//! directly over its existing instruction-length/operand tables; this crate
//! ships `DefaultOpcodeTable` only so the translator has something concrete
//! to compile against in its own tests.

/// One method's compiled bytecode, as handed to us by the host VM.
#[derive(Debug, Clone)]
pub struct Iseq {
    /// Length of `iseq_encoded`, in host words.
    pub iseq_size: usize,
    /// Each instruction occupies `1 + operand_count` words; the first word
    /// of an instruction is an opcode word resolvable via
    /// [`OpcodeTable::decode`].
    pub iseq_encoded: Vec<u64>,
    /// Runtime operand-stack high-water mark; sizes the abstract stack.
    pub stack_max: u32,
    /// Number of local variable slots (arguments included).
    pub local_table_size: u32,
    /// Number of argument slots among the locals.
    pub arg_size: u32,
}

impl Iseq {
    /// Reads the raw word at `offset`, without interpreting it.
    pub fn word_at(&self, offset: usize) -> u64 {
        self.iseq_encoded[offset]
    }
}

/// The kind of an instruction operand, as drawn from the host's opcode
/// metadata tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    /// A numeric literal operand (immediate value, local slot index, etc).
    Literal,
    /// A relative branch offset.
    Offset,
    /// A reference into the host's value table (e.g. an interned object).
    ValueRef,
    /// An opaque call-info operand, forwarded verbatim to dispatch helpers.
    CallInfo,
    /// An opaque inline-cache operand, forwarded verbatim to dispatch helpers.
    InlineCache,
    /// A reference to a nested instruction sequence.
    IseqRef,
}

/// Every opcode this front end knows how to translate.
///
/// Deliberately closed: an unresolvable bytecode word is a host-table bug
/// (`CompileError::UnknownOpcodeWord`), and a resolvable-but-unhandled
/// opcode is `CompileError::UnsupportedOpcode`. There is no catch-all
/// variant, so adding support for a new opcode is a compile-time-checked
/// exercise of extending the translator's `match`.
///
/// `getlocal_OP__WC__1`/`setlocal_OP__WC__1` (one level of lexical nesting)
/// are intentionally absent: without a concrete helper signature to target,
/// guessing one would be worse than declining to support them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    PutNil,
    PutObject,
    PutObjectInt2Fix0,
    PutObjectInt2Fix1,
    PutIseq,
    PutSelf,
    PutSpecialObject,
    PutString,

    GetGlobal,
    SetGlobal,
    GetInstanceVariable,
    SetInstanceVariable,
    GetClassVariable,
    SetClassVariable,
    GetConstant,
    SetConstant,
    GetSpecial,
    SetSpecial,
    GetLocalWC0,
    SetLocalWC0,

    Pop,
    Dup,
    DupN,
    Swap,
    TopN,
    SetN,
    AdjustStack,

    NewArray,
    DupArray,
    ConcatArray,
    SplatArray,
    NewHash,
    NewRange,
    ToRegexp,
    ConcatStrings,
    ToString,
    FreezeString,

    Send,
    OptSendWithoutBlock,
    InvokeSuper,

    OptPlus,
    OptMinus,
    OptMult,
    OptDiv,
    OptMod,
    OptEq,
    OptNeq,
    OptLt,
    OptLe,
    OptGt,
    OptGe,
    OptLtLt,
    OptAref,
    OptAset,
    OptArefWith,
    OptAsetWith,
    OptLength,
    OptSize,
    OptEmptyP,
    OptSucc,
    OptNot,
    OptRegexpMatch2,
    OptCaseDispatch,

    Leave,
    Throw,
    Jump,
    BranchIf,
    BranchUnless,
    BranchNil,

    Trace,
    GetInlineCache,
    SetInlineCache,
}

impl Opcode {
    /// True for opcodes that unconditionally end a basic block: the four
    /// branch forms, the (unlowered) case-dispatch, `throw`, and `leave`.
    pub fn is_terminator(self) -> bool {
        matches!(
            self,
            Opcode::Jump
                | Opcode::BranchIf
                | Opcode::BranchUnless
                | Opcode::BranchNil
                | Opcode::OptCaseDispatch
                | Opcode::Throw
                | Opcode::Leave
        )
    }

    /// True for opcodes whose translation recurses into the block driver
    /// rather than falling through to the next instruction locally.
    pub fn is_branch(self) -> bool {
        matches!(
            self,
            Opcode::Jump | Opcode::BranchIf | Opcode::BranchUnless | Opcode::BranchNil
        )
    }
}

/// Read-only opcode metadata, owned and provided by the host.
///
/// Implementations back this with whatever static tables the embedding VM
/// already maintains. The compiler never mutates or caches these lookups
/// itself (length/name/operand-kind lookups are assumed cheap).
pub trait OpcodeTable {
    /// Resolves a raw instruction word to an opcode, or `None` if the host's
    /// metadata table has no entry for it.
    fn decode(&self, word: u64) -> Option<Opcode>;

    /// The opcode's human-readable name, used in diagnostics.
    fn name(&self, op: Opcode) -> &'static str;

    /// The instruction's length in words, opcode word included.
    fn length(&self, op: Opcode) -> usize;

    /// The operand kinds carried by this opcode, in encoding order.
    fn operand_kinds(&self, op: Opcode) -> &'static [OperandKind];
}

/// A concrete `OpcodeTable` covering every opcode in [`Opcode`], for tests
/// and for embedders happy with the conventional encoding (opcode word ==
/// the `Opcode` discriminant cast to `u64`, in declaration order).
pub struct DefaultOpcodeTable;

macro_rules! opcode_entry {
    ($op:expr, $name:literal, $len:expr, $kinds:expr) => {
        ($op, $name, $len, $kinds)
    };
}

use OperandKind::*;

const TABLE: &[(Opcode, &str, usize, &[OperandKind])] = &[
    opcode_entry!(Opcode::PutNil, "putnil", 1, &[]),
    opcode_entry!(Opcode::PutObject, "putobject", 2, &[Literal]),
    opcode_entry!(Opcode::PutObjectInt2Fix0, "putobject_INT2FIX_0", 1, &[]),
    opcode_entry!(Opcode::PutObjectInt2Fix1, "putobject_INT2FIX_1", 1, &[]),
    opcode_entry!(Opcode::PutIseq, "putiseq", 2, &[IseqRef]),
    opcode_entry!(Opcode::PutSelf, "putself", 1, &[]),
    opcode_entry!(Opcode::PutSpecialObject, "putspecialobject", 2, &[Literal]),
    opcode_entry!(Opcode::PutString, "putstring", 2, &[ValueRef]),
    opcode_entry!(Opcode::GetGlobal, "getglobal", 2, &[ValueRef]),
    opcode_entry!(Opcode::SetGlobal, "setglobal", 2, &[ValueRef]),
    opcode_entry!(
        Opcode::GetInstanceVariable,
        "getinstancevariable",
        3,
        &[ValueRef, InlineCache]
    ),
    opcode_entry!(
        Opcode::SetInstanceVariable,
        "setinstancevariable",
        3,
        &[ValueRef, InlineCache]
    ),
    opcode_entry!(Opcode::GetClassVariable, "getclassvariable", 2, &[ValueRef]),
    opcode_entry!(Opcode::SetClassVariable, "setclassvariable", 2, &[ValueRef]),
    opcode_entry!(
        Opcode::GetConstant,
        "getconstant",
        2,
        &[ValueRef]
    ),
    opcode_entry!(
        Opcode::SetConstant,
        "setconstant",
        2,
        &[ValueRef]
    ),
    opcode_entry!(Opcode::GetSpecial, "getspecial", 3, &[Literal, Literal]),
    opcode_entry!(Opcode::SetSpecial, "setspecial", 2, &[Literal]),
    opcode_entry!(Opcode::GetLocalWC0, "getlocal_OP__WC__0", 2, &[Literal]),
    opcode_entry!(Opcode::SetLocalWC0, "setlocal_OP__WC__0", 2, &[Literal]),
    opcode_entry!(Opcode::Pop, "pop", 1, &[]),
    opcode_entry!(Opcode::Dup, "dup", 1, &[]),
    opcode_entry!(Opcode::DupN, "dupn", 2, &[Literal]),
    opcode_entry!(Opcode::Swap, "swap", 1, &[]),
    opcode_entry!(Opcode::TopN, "topn", 2, &[Literal]),
    opcode_entry!(Opcode::SetN, "setn", 2, &[Literal]),
    opcode_entry!(Opcode::AdjustStack, "adjuststack", 2, &[Literal]),
    opcode_entry!(Opcode::NewArray, "newarray", 2, &[Literal]),
    opcode_entry!(Opcode::DupArray, "duparray", 2, &[ValueRef]),
    opcode_entry!(Opcode::ConcatArray, "concatarray", 1, &[]),
    opcode_entry!(Opcode::SplatArray, "splatarray", 2, &[Literal]),
    opcode_entry!(Opcode::NewHash, "newhash", 2, &[Literal]),
    opcode_entry!(Opcode::NewRange, "newrange", 2, &[Literal]),
    opcode_entry!(Opcode::ToRegexp, "toregexp", 3, &[Literal, Literal]),
    opcode_entry!(Opcode::ConcatStrings, "concatstrings", 2, &[Literal]),
    opcode_entry!(Opcode::ToString, "tostring", 1, &[]),
    opcode_entry!(Opcode::FreezeString, "freezestring", 2, &[ValueRef]),
    opcode_entry!(
        Opcode::Send,
        "send",
        3,
        &[CallInfo, InlineCache]
    ),
    opcode_entry!(
        Opcode::OptSendWithoutBlock,
        "opt_send_without_block",
        3,
        &[CallInfo, InlineCache]
    ),
    opcode_entry!(
        Opcode::InvokeSuper,
        "invokesuper",
        3,
        &[CallInfo, InlineCache]
    ),
    opcode_entry!(Opcode::OptPlus, "opt_plus", 3, &[CallInfo, InlineCache]),
    opcode_entry!(Opcode::OptMinus, "opt_minus", 3, &[CallInfo, InlineCache]),
    opcode_entry!(Opcode::OptMult, "opt_mult", 3, &[CallInfo, InlineCache]),
    opcode_entry!(Opcode::OptDiv, "opt_div", 3, &[CallInfo, InlineCache]),
    opcode_entry!(Opcode::OptMod, "opt_mod", 3, &[CallInfo, InlineCache]),
    opcode_entry!(Opcode::OptEq, "opt_eq", 3, &[CallInfo, InlineCache]),
    opcode_entry!(Opcode::OptNeq, "opt_neq", 3, &[CallInfo, InlineCache]),
    opcode_entry!(Opcode::OptLt, "opt_lt", 3, &[CallInfo, InlineCache]),
    opcode_entry!(Opcode::OptLe, "opt_le", 3, &[CallInfo, InlineCache]),
    opcode_entry!(Opcode::OptGt, "opt_gt", 3, &[CallInfo, InlineCache]),
    opcode_entry!(Opcode::OptGe, "opt_ge", 3, &[CallInfo, InlineCache]),
    opcode_entry!(Opcode::OptLtLt, "opt_ltlt", 3, &[CallInfo, InlineCache]),
    opcode_entry!(Opcode::OptAref, "opt_aref", 3, &[CallInfo, InlineCache]),
    opcode_entry!(Opcode::OptAset, "opt_aset", 3, &[CallInfo, InlineCache]),
    opcode_entry!(
        Opcode::OptArefWith,
        "opt_aref_with",
        4,
        &[ValueRef, CallInfo, InlineCache]
    ),
    opcode_entry!(
        Opcode::OptAsetWith,
        "opt_aset_with",
        4,
        &[ValueRef, CallInfo, InlineCache]
    ),
    opcode_entry!(Opcode::OptLength, "opt_length", 3, &[CallInfo, InlineCache]),
    opcode_entry!(Opcode::OptSize, "opt_size", 3, &[CallInfo, InlineCache]),
    opcode_entry!(Opcode::OptEmptyP, "opt_empty_p", 3, &[CallInfo, InlineCache]),
    opcode_entry!(Opcode::OptSucc, "opt_succ", 3, &[CallInfo, InlineCache]),
    opcode_entry!(Opcode::OptNot, "opt_not", 3, &[CallInfo, InlineCache]),
    opcode_entry!(
        Opcode::OptRegexpMatch2,
        "opt_regexpmatch2",
        3,
        &[CallInfo, InlineCache]
    ),
    opcode_entry!(
        Opcode::OptCaseDispatch,
        "opt_case_dispatch",
        2,
        &[ValueRef]
    ),
    opcode_entry!(Opcode::Leave, "leave", 1, &[]),
    opcode_entry!(Opcode::Throw, "throw", 2, &[Literal]),
    opcode_entry!(Opcode::Jump, "jump", 2, &[Offset]),
    opcode_entry!(Opcode::BranchIf, "branchif", 2, &[Offset]),
    opcode_entry!(Opcode::BranchUnless, "branchunless", 2, &[Offset]),
    opcode_entry!(Opcode::BranchNil, "branchnil", 2, &[Offset]),
    opcode_entry!(Opcode::Trace, "trace", 2, &[Literal]),
    opcode_entry!(Opcode::GetInlineCache, "getinlinecache", 3, &[Offset, InlineCache]),
    opcode_entry!(Opcode::SetInlineCache, "setinlinecache", 2, &[InlineCache]),
];

impl OpcodeTable for DefaultOpcodeTable {
    fn decode(&self, word: u64) -> Option<Opcode> {
        TABLE.iter().find(|(op, ..)| *op as u64 == word).map(|(op, ..)| *op)
    }

    fn name(&self, op: Opcode) -> &'static str {
        TABLE
            .iter()
            .find(|(o, ..)| *o == op)
            .map(|(_, name, ..)| *name)
            .expect("every Opcode variant has a TABLE entry")
    }

    fn length(&self, op: Opcode) -> usize {
        TABLE
            .iter()
            .find(|(o, ..)| *o == op)
            .map(|(_, _, len, _)| *len)
            .expect("every Opcode variant has a TABLE entry")
    }

    fn operand_kinds(&self, op: Opcode) -> &'static [OperandKind] {
        TABLE
            .iter()
            .find(|(o, ..)| *o == op)
            .map(|(_, _, _, kinds)| *kinds)
            .expect("every Opcode variant has a TABLE entry")
    }
}

/// Encodes `op` as its conventional bytecode word (discriminant order),
/// mirroring [`DefaultOpcodeTable::decode`]. Test fixtures build `Iseq`s
/// with this so they stay in lockstep with the table above.
pub fn encode(op: Opcode) -> u64 {
    op as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_opcode_round_trips_through_the_default_table() {
        let table = DefaultOpcodeTable;
        for (op, name, len, kinds) in TABLE {
            assert_eq!(table.decode(encode(*op)), Some(*op));
            assert_eq!(table.name(*op), *name);
            assert_eq!(table.length(*op), *len);
            assert_eq!(table.operand_kinds(*op), *kinds);
        }
    }

    #[test]
    fn unknown_word_resolves_to_none() {
        let table = DefaultOpcodeTable;
        assert_eq!(table.decode(0xffff_ffff), None);
    }
}
