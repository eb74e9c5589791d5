//! The recursive block walker: enters a block, installs any pending φ,
//! translates instructions to the block's end, then either falls through to
//! the next leader or returns because a translator already terminated the
//! block.

use inkwell::builder::Builder;
use inkwell::context::Context;
use inkwell::module::Module;
use inkwell::values::{FunctionValue, IntValue};

use crate::block_table::BlockTable;
use crate::bytecode::{Iseq, OpcodeTable};
use crate::error::CompileError;
use crate::helpers::HelperRegistry;
use crate::stack::OperandStack;
use crate::translator;

/// Everything one method compilation shares across the recursive block walk.
/// Borrowed, not owned: the orchestrator in `lib.rs` owns the module,
/// builder, and block table and lends them here for the duration of the
/// walk.
pub struct Driver<'a, 'ctx> {
    pub context: &'ctx Context,
    pub module: &'a Module<'ctx>,
    pub builder: &'a Builder<'ctx>,
    pub function: FunctionValue<'ctx>,
    pub iseq: &'a Iseq,
    pub opcodes: &'a dyn OpcodeTable,
    pub helpers: &'a mut HelperRegistry<'ctx>,
    pub blocks: &'a mut BlockTable<'ctx>,
}

impl<'a, 'ctx> Driver<'a, 'ctx> {
    /// Parameter 0: the thread pointer.
    pub fn thread_param(&self) -> IntValue<'ctx> {
        self.function
            .get_nth_param(0)
            .expect("compile_iseq always declares two parameters")
            .into_int_value()
    }

    /// Parameter 1: the frame pointer.
    pub fn frame_param(&self) -> IntValue<'ctx> {
        self.function
            .get_nth_param(1)
            .expect("compile_iseq always declares two parameters")
            .into_int_value()
    }

    /// Enters the block at `offset`. Re-entry (the `compiled` flag already
    /// set) is a no-op — this is what bounds recursion on loop back-edges.
    ///
    /// `incoming_stack` is whatever the caller has left over after routing
    /// any cross-block value through a φ-contribution; `None` means "nothing
    /// left, allocate fresh" (true for the method's entry block and for the
    /// `jump`-with-empty-stack fast path\). Either way, a φ
    /// pending at this block's head — deposited by an already-visited
    /// predecessor — is drained and pushed on top before translation starts.
    pub fn compile_block(
        &mut self,
        offset: usize,
        incoming_stack: Option<OperandStack<'ctx>>,
    ) -> Result<(), CompileError> {
        if self.blocks.get(offset).compiled {
            log::trace!("block at {offset} already compiled, back-edge no-op");
            return Ok(());
        }
        self.blocks.get_mut(offset).compiled = true;

        let block = self.blocks.get(offset).block;
        self.builder.position_at_end(block);

        let mut stack = incoming_stack.unwrap_or_else(|| OperandStack::new(self.iseq.stack_max as usize));
        if let Some(phi) = self.blocks.materialize_pending_phi(offset, self.context)? {
            stack.push(phi.as_basic_value().into_int_value(), offset, "phi")?;
        }

        log::debug!(
            "entering block at {offset}, ending at {}, incoming stack depth {}",
            self.blocks.get(offset).block_end,
            stack.len()
        );

        let block_end = self.blocks.get(offset).block_end;
        let mut cursor = offset;
        let mut terminated = false;

        while cursor <= block_end {
            let word = self.iseq.word_at(cursor);
            let op = self
                .opcodes
                .decode(word)
                .ok_or(CompileError::UnknownOpcodeWord { offset: cursor, word })?;
            let len = self.opcodes.length(op);

            if translator::translate(self, cursor, op, &mut stack)? {
                terminated = true;
                break;
            }
            cursor += len;
        }

        if terminated {
            return Ok(());
        }

        let next = block_end + 1;
        if next < self.iseq.iseq_size {
            let next_block = self.blocks.get(next).block;
            self.builder
                .build_unconditional_branch(next_block)
                .map_err(|e| CompileError::Ir(e.to_string()))?;

            if !stack.is_empty() {
                let value = stack.pop(block_end, "fallthrough")?;
                self.blocks.add_incoming(next, value, block);
            }

            self.compile_block(next, Some(stack))?;
        }

        Ok(())
    }
}
