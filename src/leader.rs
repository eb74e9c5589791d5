//! Leader analysis: a single linear pass over the bytecode producing
//! the sorted, deduplicated set of basic-block leaders.

use std::collections::BTreeSet;

use crate::bytecode::{Iseq, OpcodeTable, OperandKind};
use crate::error::CompileError;

/// Scans `iseq` once, stepping with each opcode's length, and returns every
/// leader offset in ascending order with no duplicates.
///
/// Three rules apply cumulatively:
/// 1. offset 0 is always a leader;
/// 2. the absolute target of every `Offset` operand is a leader;
/// 3. the offset immediately following any terminator is a leader, provided
///    it is still inside the instruction stream.
pub fn analyze(iseq: &Iseq, opcodes: &dyn OpcodeTable) -> Result<Vec<usize>, CompileError> {
    let mut leaders = BTreeSet::new();
    leaders.insert(0);

    let mut offset = 0usize;
    while offset < iseq.iseq_size {
        let word = iseq.word_at(offset);
        let op = opcodes
            .decode(word)
            .ok_or(CompileError::UnknownOpcodeWord { offset, word })?;
        let name = opcodes.name(op);
        let len = opcodes.length(op);
        let kinds = opcodes.operand_kinds(op);

        log::trace!("leader scan: offset={offset} opcode={name} len={len}");

        for (i, kind) in kinds.iter().enumerate() {
            if *kind == OperandKind::Offset {
                let operand_word = offset + 1 + i;
                let rel = iseq.word_at(operand_word) as i64;
                let target = (offset as i64 + len as i64 + rel) as usize;
                leaders.insert(target);
            }
        }

        if op.is_terminator() {
            let next = offset + len;
            if next < iseq.iseq_size {
                leaders.insert(next);
            }
        }

        offset += len;
    }

    let sorted: Vec<usize> = leaders.into_iter().collect();
    log::debug!("leader analysis found {} leaders", sorted.len());
    Ok(sorted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::{encode, DefaultOpcodeTable, Opcode};

    fn iseq(words: Vec<u64>, stack_max: u32) -> Iseq {
        Iseq {
            iseq_size: words.len(),
            iseq_encoded: words,
            stack_max,
            local_table_size: 1,
            arg_size: 1,
        }
    }

    #[test]
    fn leaders_are_sorted_and_include_zero() {
        // putnil; leave
        let iseq = iseq(vec![encode(Opcode::PutNil), encode(Opcode::Leave)], 1);
        let leaders = analyze(&iseq, &DefaultOpcodeTable).unwrap();
        assert_eq!(leaders, vec![0]);
    }

    #[test]
    fn branch_targets_and_terminator_successors_are_leaders() {
        // 0: getlocal 0        (len 2)
        // 2: branchunless -> 6 (len 2, target = 2+2+2=6)
        // 4: putobject_INT2FIX_1 (len 1)
        // 5: jump -> 7          (len 2, target = 5+2+0=7)
        // 7: putnil
        // 8: leave
        let words = vec![
            encode(Opcode::GetLocalWC0),
            0,
            encode(Opcode::BranchUnless),
            2,
            encode(Opcode::PutObjectInt2Fix1),
            encode(Opcode::Jump),
            0,
            encode(Opcode::PutNil),
            encode(Opcode::Leave),
        ];
        let iseq = iseq(words, 2);
        let leaders = analyze(&iseq, &DefaultOpcodeTable).unwrap();
        // 0 (entry), 4 (fallthrough of branchunless), 6 (branch target and
        // jump's fallthrough), 7 (jump target).
        assert_eq!(leaders, vec![0, 4, 6, 7]);
        assert!(leaders.contains(&0));
        assert!(leaders.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn unknown_word_is_an_error() {
        let iseq = iseq(vec![0xdead_beef], 1);
        let err = analyze(&iseq, &DefaultOpcodeTable).unwrap_err();
        assert!(matches!(err, CompileError::UnknownOpcodeWord { .. }));
    }
}
