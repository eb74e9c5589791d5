//! Per-leader block metadata, including the pending-incoming buffers that
//! let a not-yet-visited block receive φ-contributions from a predecessor
//! reached first (the "deferred" route, below).
//!
//! Sized to `iseq_size`, not to the number of leaders — a wasteful but
//! simple indexing scheme, kept deliberately so offset lookups are direct
//! array indexing rather than a binary search. A sparse map keyed by offset
//! is an equivalent, lower-memory alternative left for an implementation
//! that cares about it.

use inkwell::basic_block::BasicBlock;
use inkwell::context::Context;
use inkwell::module::Module;
use inkwell::values::{FunctionValue, IntValue, PhiValue};

use crate::error::CompileError;

/// Metadata for one basic block, indexed by its leader's byte offset.
pub struct BlockEntry<'ctx> {
    /// The emitted block handle.
    pub block: BasicBlock<'ctx>,
    /// Offset of the last instruction wholly contained in this block.
    pub block_end: usize,
    /// Set once the driver has entered this block; re-entry is then a no-op.
    pub compiled: bool,
    /// The φ at this block's head, once materialized.
    pub phi: Option<PhiValue<'ctx>>,
    /// (value, predecessor) pairs deposited before `phi` existed.
    pending_values: Vec<IntValue<'ctx>>,
    pending_blocks: Vec<BasicBlock<'ctx>>,
}

impl<'ctx> BlockEntry<'ctx> {
    fn new(block: BasicBlock<'ctx>, block_end: usize) -> Self {
        Self {
            block,
            block_end,
            compiled: false,
            phi: None,
            pending_values: Vec::new(),
            pending_blocks: Vec::new(),
        }
    }
}

/// Dense `offset -> Option<BlockEntry>` table, one live entry per leader.
pub struct BlockTable<'ctx> {
    entries: Vec<Option<BlockEntry<'ctx>>>,
}

impl<'ctx> BlockTable<'ctx> {
    /// Allocates one inkwell basic block per leader (named `label_<offset>`)
    /// and computes each leader's `block_end` as the offset
    /// immediately preceding the next leader (or `iseq_size - 1` for the
    /// last block).
    pub fn new(
        context: &'ctx Context,
        _module: &Module<'ctx>,
        function: FunctionValue<'ctx>,
        leaders: &[usize],
        iseq_size: usize,
    ) -> Self {
        let mut entries: Vec<Option<BlockEntry<'ctx>>> = (0..iseq_size).map(|_| None).collect();

        for (i, &offset) in leaders.iter().enumerate() {
            let block_end = if i + 1 < leaders.len() {
                leaders[i + 1] - 1
            } else {
                iseq_size - 1
            };
            let name = format!("label_{offset}");
            let block = context.append_basic_block(function, &name);
            entries[offset] = Some(BlockEntry::new(block, block_end));
        }

        Self { entries }
    }

    /// Borrow the entry at `offset`, which must be a leader.
    pub fn get(&self, offset: usize) -> &BlockEntry<'ctx> {
        self.entries[offset]
            .as_ref()
            .expect("offset must be a leader produced by leader::analyze")
    }

    /// Mutably borrow the entry at `offset`, which must be a leader.
    pub fn get_mut(&mut self, offset: usize) -> &mut BlockEntry<'ctx> {
        self.entries[offset]
            .as_mut()
            .expect("offset must be a leader produced by leader::analyze")
    }

    /// Deposits a (value, predecessor) φ-contribution for the block at
    /// `offset`. If the φ already exists, adds the incoming edge directly
    /// (the "incremental" route); otherwise the pair is buffered until the
    /// driver enters the block (the "deferred" route).
    pub fn add_incoming(&mut self, offset: usize, value: IntValue<'ctx>, from: BasicBlock<'ctx>) {
        let entry = self.get_mut(offset);
        match entry.phi {
            Some(phi) => phi.add_incoming(&[(&value, from)]),
            None => {
                entry.pending_values.push(value);
                entry.pending_blocks.push(from);
            }
        }
    }

    /// Materializes the φ at `offset`'s block head from whatever
    /// φ-contributions are already pending, if any, pushing the resulting
    /// value is left to the caller (the driver pushes it onto the
    /// continuation stack). No-op if there is nothing pending yet, or if a
    /// φ already exists.
    pub fn materialize_pending_phi(
        &mut self,
        offset: usize,
        context: &'ctx Context,
    ) -> Result<Option<PhiValue<'ctx>>, CompileError> {
        let entry = self.get_mut(offset);
        if entry.phi.is_some() || entry.pending_values.is_empty() {
            return Ok(entry.phi);
        }
        if entry.pending_values.len() != entry.pending_blocks.len() {
            return Err(CompileError::InconsistentJoin {
                offset,
                values: entry.pending_values.len(),
                blocks: entry.pending_blocks.len(),
            });
        }

        let builder = context.create_builder();
        builder.position_at_end(entry.block);
        let phi = builder
            .build_phi(context.i64_type(), &format!("phi_{offset}"))
            .map_err(|e| CompileError::Ir(e.to_string()))?;
        for (value, pred) in entry.pending_values.iter().zip(entry.pending_blocks.iter()) {
            phi.add_incoming(&[(value, *pred)]);
        }
        entry.pending_values.clear();
        entry.pending_blocks.clear();
        entry.phi = Some(phi);
        Ok(Some(phi))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_function<'ctx>(context: &'ctx Context, module: &Module<'ctx>) -> FunctionValue<'ctx> {
        let i64_ty = context.i64_type();
        let fn_ty = i64_ty.fn_type(&[i64_ty.into(), i64_ty.into()], false);
        module.add_function("f", fn_ty, None)
    }

    #[test]
    fn block_end_is_predecessor_of_next_leader() {
        let context = Context::create();
        let module = context.create_module("m");
        let function = make_function(&context, &module);
        let leaders = vec![0, 4, 7];
        let table = BlockTable::new(&context, &module, function, &leaders, 9);
        assert_eq!(table.get(0).block_end, 3);
        assert_eq!(table.get(4).block_end, 6);
        assert_eq!(table.get(7).block_end, 8);
    }

    #[test]
    fn deferred_then_materialized_phi_carries_all_incomings() {
        let context = Context::create();
        let module = context.create_module("m");
        let function = make_function(&context, &module);
        let leaders = vec![0, 5];
        let mut table = BlockTable::new(&context, &module, function, &leaders, 6);

        let entry_block = table.get(0).block;
        let i64_ty = context.i64_type();
        table.add_incoming(5, i64_ty.const_int(1, false), entry_block);
        table.add_incoming(5, i64_ty.const_int(2, false), entry_block);

        let phi = table
            .materialize_pending_phi(5, &context)
            .unwrap()
            .expect("pending incomings should materialize a phi");
        assert_eq!(phi.count_incoming(), 2);
    }
}
