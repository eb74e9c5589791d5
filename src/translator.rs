//! Per-opcode semantic mapping: the dispatch that turns one
//! bytecode instruction into abstract-stack edits and IR emission.
//!
//! `translate` returns whether the instruction terminated its block (the
//! "jumped" flag the driver checks after each call). Only the control-flow
//! family ever returns `true`; every other opcode is a local, non-branching
//! edit.

use inkwell::values::{BasicMetadataValueEnum, IntValue};
use inkwell::IntPredicate;

use crate::bytecode::Opcode;
use crate::consts;
use crate::driver::Driver;
use crate::error::CompileError;
use crate::stack::OperandStack;

/// Declares (if needed) and calls a helper returning a value, pushing
/// nothing — the caller pushes the result onto the abstract stack itself.
fn call_helper<'ctx>(
    driver: &mut Driver<'_, 'ctx>,
    helper: &'static str,
    offset: usize,
    args: &[BasicMetadataValueEnum<'ctx>],
) -> Result<IntValue<'ctx>, CompileError> {
    let function = driver.helpers.get_function(driver.module, helper, offset)?;
    let call = driver
        .builder
        .build_call(function, args, helper)
        .map_err(|e| CompileError::Ir(e.to_string()))?;
    call.try_as_basic_value()
        .left()
        .map(|v| v.into_int_value())
        .ok_or(CompileError::TypeMismatch { name: helper })
}

/// Declares (if needed) and calls a void-returning helper.
fn call_helper_void<'ctx>(
    driver: &mut Driver<'_, 'ctx>,
    helper: &'static str,
    offset: usize,
    args: &[BasicMetadataValueEnum<'ctx>],
) -> Result<(), CompileError> {
    let function = driver.helpers.get_function(driver.module, helper, offset)?;
    driver
        .builder
        .build_call(function, args, helper)
        .map_err(|e| CompileError::Ir(e.to_string()))?;
    Ok(())
}

/// A stable synthesized method id for the `opt_*` opcodes that lower to a
/// generic `rb_funcall` rather than a dedicated helper (only
/// `opt_plus`/`opt_minus`/`opt_lt` get one of their own). The host's real
/// method-id space isn't available to this front end (opcode metadata
/// carries no such table), so these ids are this compiler's own invention —
/// stable for the lifetime of one compilation, meaningless outside it.
fn method_id_for(op: Opcode) -> i64 {
    match op {
        Opcode::OptMult => 1,
        Opcode::OptDiv => 2,
        Opcode::OptMod => 3,
        Opcode::OptEq => 4,
        Opcode::OptNeq => 5,
        Opcode::OptLe => 6,
        Opcode::OptGt => 7,
        Opcode::OptGe => 8,
        Opcode::OptLtLt => 9,
        Opcode::OptAref => 10,
        Opcode::OptAset => 11,
        Opcode::OptLength => 12,
        Opcode::OptSize => 13,
        Opcode::OptEmptyP => 14,
        Opcode::OptSucc => 15,
        Opcode::OptNot => 16,
        Opcode::OptRegexpMatch2 => 17,
        _ => unreachable!("method_id_for called on an opcode with a dedicated helper"),
    }
}

/// Call-info words are opaque; this front end reads the argument
/// count out of their low 32 bits, leaving the rest (the real method id /
/// cache the host would embed) as an uninterpreted, forwarded tag.
fn call_info_argc(word: u64) -> usize {
    (word & 0xffff_ffff) as usize
}

/// The block currently being built, i.e. the predecessor a branch or jump
/// should record itself as — never the block keyed by the instruction's own
/// bytecode offset, which is only a leader (and thus present in
/// `BlockTable`) when the branch happens to be the first instruction of its
/// block.
fn current_block<'ctx>(driver: &Driver<'_, 'ctx>) -> inkwell::basic_block::BasicBlock<'ctx> {
    driver
        .builder
        .get_insert_block()
        .expect("translate is always called with the builder positioned in a block")
}

/// RTEST: `(v & ~Qnil) != 0`, a single AND + ICMP.
fn rtest<'ctx>(driver: &Driver<'_, 'ctx>, v: IntValue<'ctx>) -> Result<IntValue<'ctx>, CompileError> {
    let i64_ty = driver.context.i64_type();
    let mask = i64_ty.const_int(!consts::QNIL, false);
    let masked = driver
        .builder
        .build_and(v, mask, "rtest_mask")
        .map_err(|e| CompileError::Ir(e.to_string()))?;
    driver
        .builder
        .build_int_compare(IntPredicate::NE, masked, i64_ty.const_int(0, false), "rtest")
        .map_err(|e| CompileError::Ir(e.to_string()))
}

pub fn translate<'ctx>(
    driver: &mut Driver<'_, 'ctx>,
    offset: usize,
    op: Opcode,
    stack: &mut OperandStack<'ctx>,
) -> Result<bool, CompileError> {
    let name = driver.opcodes.name(op);
    let len = driver.opcodes.length(op);
    log::trace!("translate offset={offset} opcode={name} stack_depth={}", stack.len());

    let i64_ty = driver.context.i64_type();
    let operand = |i: usize| driver.iseq.word_at(offset + 1 + i);

    match op {
        // --- Literals and self -------------------------------------
        Opcode::PutNil => {
            stack.push(i64_ty.const_int(consts::QNIL, false), offset, name)?;
        }
        Opcode::PutObject => {
            stack.push(i64_ty.const_int(operand(0), false), offset, name)?;
        }
        Opcode::PutObjectInt2Fix0 => {
            stack.push(i64_ty.const_int(consts::int2fix(0), false), offset, name)?;
        }
        Opcode::PutObjectInt2Fix1 => {
            stack.push(i64_ty.const_int(consts::int2fix(1), false), offset, name)?;
        }
        Opcode::PutIseq => {
            stack.push(i64_ty.const_int(operand(0), false), offset, name)?;
        }
        Opcode::PutSelf => {
            let frame = driver.frame_param();
            let result = call_helper(driver, "self_from_cfp", offset, &[frame.into()])?;
            stack.push(result, offset, name)?;
        }
        Opcode::PutSpecialObject => {
            let which = i64_ty.const_int(operand(0), false);
            let result = call_helper(driver, name, offset, &[which.into()])?;
            stack.push(result, offset, name)?;
        }
        Opcode::PutString => {
            let value_ref = i64_ty.const_int(operand(0), false);
            let result = call_helper(driver, name, offset, &[value_ref.into()])?;
            stack.push(result, offset, name)?;
        }

        // --- Variable access ---------------------------------------
        Opcode::GetGlobal => {
            let id = i64_ty.const_int(operand(0), false);
            let result = call_helper(driver, name, offset, &[id.into()])?;
            stack.push(result, offset, name)?;
        }
        Opcode::SetGlobal => {
            let id = i64_ty.const_int(operand(0), false);
            let value = stack.pop(offset, name)?;
            call_helper_void(driver, name, offset, &[id.into(), value.into()])?;
        }
        Opcode::GetInstanceVariable => {
            let id = i64_ty.const_int(operand(0), false);
            let ic = i64_ty.const_int(operand(1), false);
            let frame = driver.frame_param();
            let self_val = call_helper(driver, "self_from_cfp", offset, &[frame.into()])?;
            let result = call_helper(driver, name, offset, &[self_val.into(), id.into(), ic.into()])?;
            stack.push(result, offset, name)?;
        }
        Opcode::SetInstanceVariable => {
            let id = i64_ty.const_int(operand(0), false);
            let ic = i64_ty.const_int(operand(1), false);
            let value = stack.pop(offset, name)?;
            let frame = driver.frame_param();
            let self_val = call_helper(driver, "self_from_cfp", offset, &[frame.into()])?;
            call_helper_void(driver, name, offset, &[self_val.into(), id.into(), value.into(), ic.into()])?;
        }
        Opcode::GetClassVariable => {
            let id = i64_ty.const_int(operand(0), false);
            let frame = driver.frame_param();
            let result = call_helper(driver, name, offset, &[frame.into(), id.into()])?;
            stack.push(result, offset, name)?;
        }
        Opcode::SetClassVariable => {
            let id = i64_ty.const_int(operand(0), false);
            let value = stack.pop(offset, name)?;
            let frame = driver.frame_param();
            call_helper_void(driver, name, offset, &[frame.into(), id.into(), value.into()])?;
        }
        Opcode::GetConstant => {
            let chain = i64_ty.const_int(operand(0), false);
            let thread = driver.thread_param();
            let result = call_helper(driver, name, offset, &[thread.into(), chain.into()])?;
            stack.push(result, offset, name)?;
        }
        Opcode::SetConstant => {
            let id = i64_ty.const_int(operand(0), false);
            let value = stack.pop(offset, name)?;
            call_helper_void(driver, name, offset, &[id.into(), value.into()])?;
        }
        Opcode::GetSpecial => {
            let key = i64_ty.const_int(operand(0), false);
            let kind = i64_ty.const_int(operand(1), false);
            let result = call_helper(driver, name, offset, &[key.into(), kind.into()])?;
            stack.push(result, offset, name)?;
        }
        Opcode::SetSpecial => {
            let key = i64_ty.const_int(operand(0), false);
            let value = stack.pop(offset, name)?;
            call_helper_void(driver, name, offset, &[key.into(), value.into()])?;
        }
        Opcode::GetLocalWC0 => {
            let slot = i64_ty.const_int(operand(0), false);
            let frame = driver.frame_param();
            let result = call_helper(driver, "getlocal_level0", offset, &[frame.into(), slot.into()])?;
            stack.push(result, offset, name)?;
        }
        Opcode::SetLocalWC0 => {
            let slot = i64_ty.const_int(operand(0), false);
            let value = stack.pop(offset, name)?;
            let frame = driver.frame_param();
            call_helper_void(driver, "setlocal_level0", offset, &[frame.into(), slot.into(), value.into()])?;
        }

        // --- Stack manipulation: pure abstract-stack edits, no IR -----
        Opcode::Pop => {
            stack.pop(offset, name)?;
        }
        Opcode::Dup => {
            let v = stack.topn(0, offset, name)?;
            stack.push(v, offset, name)?;
        }
        Opcode::DupN => {
            let n = operand(0) as usize;
            let mut values = Vec::with_capacity(n);
            for k in (0..n).rev() {
                values.push(stack.topn(k, offset, name)?);
            }
            for v in values {
                stack.push(v, offset, name)?;
            }
        }
        Opcode::Swap => {
            let top = stack.pop(offset, name)?;
            let below = stack.pop(offset, name)?;
            stack.push(top, offset, name)?;
            stack.push(below, offset, name)?;
        }
        Opcode::TopN => {
            let k = operand(0) as usize;
            let v = stack.topn(k, offset, name)?;
            stack.push(v, offset, name)?;
        }
        Opcode::SetN => {
            let k = operand(0) as usize;
            let v = stack.topn(0, offset, name)?;
            stack.setn(k, v, offset, name)?;
        }
        Opcode::AdjustStack => {
            let n = operand(0) as usize;
            stack.popn(n, offset, name)?;
        }

        // --- Composite constructors --------------------------------
        Opcode::NewArray => {
            let count = operand(0) as usize;
            let elems = pop_n_in_order(stack, count, offset, name)?;
            let mut args: Vec<BasicMetadataValueEnum> = vec![i64_ty.const_int(count as u64, false).into()];
            args.extend(elems.into_iter().map(Into::into));
            let result = call_helper(driver, name, offset, &args)?;
            stack.push(result, offset, name)?;
        }
        Opcode::DupArray => {
            let array_ref = i64_ty.const_int(operand(0), false);
            let result = call_helper(driver, name, offset, &[array_ref.into()])?;
            stack.push(result, offset, name)?;
        }
        Opcode::ConcatArray => {
            let b = stack.pop(offset, name)?;
            let a = stack.pop(offset, name)?;
            let result = call_helper(driver, name, offset, &[a.into(), b.into()])?;
            stack.push(result, offset, name)?;
        }
        Opcode::SplatArray => {
            let flag = i64_ty.const_int(operand(0), false);
            let value = stack.pop(offset, name)?;
            let result = call_helper(driver, name, offset, &[value.into(), flag.into()])?;
            stack.push(result, offset, name)?;
        }
        Opcode::NewHash => {
            let count = operand(0) as usize;
            let elems = pop_n_in_order(stack, count, offset, name)?;
            let mut args: Vec<BasicMetadataValueEnum> = vec![i64_ty.const_int(count as u64, false).into()];
            args.extend(elems.into_iter().map(Into::into));
            let result = call_helper(driver, name, offset, &args)?;
            stack.push(result, offset, name)?;
        }
        Opcode::NewRange => {
            let flag = i64_ty.const_int(operand(0), false);
            let high = stack.pop(offset, name)?;
            let low = stack.pop(offset, name)?;
            let result = call_helper(driver, name, offset, &[low.into(), high.into(), flag.into()])?;
            stack.push(result, offset, name)?;
        }
        Opcode::ToRegexp => {
            let regexp_opt = i64_ty.const_int(operand(0), false);
            let count = operand(1) as usize;
            let elems = pop_n_in_order(stack, count, offset, name)?;
            let mut args: Vec<BasicMetadataValueEnum> =
                vec![regexp_opt.into(), i64_ty.const_int(count as u64, false).into()];
            args.extend(elems.into_iter().map(Into::into));
            let result = call_helper(driver, name, offset, &args)?;
            stack.push(result, offset, name)?;
        }
        Opcode::ConcatStrings => {
            let count = operand(0) as usize;
            let elems = pop_n_in_order(stack, count, offset, name)?;
            let mut args: Vec<BasicMetadataValueEnum> = vec![i64_ty.const_int(count as u64, false).into()];
            args.extend(elems.into_iter().map(Into::into));
            let result = call_helper(driver, name, offset, &args)?;
            stack.push(result, offset, name)?;
        }
        Opcode::ToString => {
            let value = stack.pop(offset, name)?;
            let result = call_helper(driver, name, offset, &[value.into()])?;
            stack.push(result, offset, name)?;
        }
        Opcode::FreezeString => {
            let value_ref = i64_ty.const_int(operand(0), false);
            let value = stack.pop(offset, name)?;
            let result = call_helper(driver, name, offset, &[value.into(), value_ref.into()])?;
            stack.push(result, offset, name)?;
        }

        // --- Method dispatch ---------------------------------------
        Opcode::Send | Opcode::OptSendWithoutBlock | Opcode::InvokeSuper => {
            let call_info = operand(0);
            let argc = call_info_argc(call_info);
            let args_popped = pop_n_in_order(stack, argc, offset, name)?;
            let receiver = stack.pop(offset, name)?;
            let thread = driver.thread_param();
            let frame = driver.frame_param();
            let mut args: Vec<BasicMetadataValueEnum> = vec![
                thread.into(),
                frame.into(),
                i64_ty.const_int(call_info, false).into(),
                receiver.into(),
            ];
            args.extend(args_popped.into_iter().map(Into::into));
            let result = call_helper(driver, name, offset, &args)?;
            stack.push(result, offset, name)?;
        }
        Opcode::OptPlus | Opcode::OptMinus | Opcode::OptLt => {
            let rhs = stack.pop(offset, name)?;
            let lhs = stack.pop(offset, name)?;
            let result = call_helper(driver, name, offset, &[lhs.into(), rhs.into()])?;
            stack.push(result, offset, name)?;
        }
        Opcode::OptMult
        | Opcode::OptDiv
        | Opcode::OptMod
        | Opcode::OptEq
        | Opcode::OptNeq
        | Opcode::OptLe
        | Opcode::OptGt
        | Opcode::OptGe
        | Opcode::OptLtLt
        | Opcode::OptAref
        | Opcode::OptAset
        | Opcode::OptRegexpMatch2 => {
            let rhs = stack.pop(offset, name)?;
            let lhs = stack.pop(offset, name)?;
            let method_id = i64_ty.const_int(method_id_for(op) as u64, false);
            let argc = i64_ty.const_int(1, false);
            let result = call_helper(driver, "rb_funcall", offset, &[lhs.into(), method_id.into(), argc.into(), rhs.into()])?;
            stack.push(result, offset, name)?;
        }
        Opcode::OptLength | Opcode::OptSize | Opcode::OptEmptyP | Opcode::OptSucc | Opcode::OptNot => {
            let receiver = stack.pop(offset, name)?;
            let method_id = i64_ty.const_int(method_id_for(op) as u64, false);
            let argc = i64_ty.const_int(0, false);
            let result = call_helper(driver, "rb_funcall", offset, &[receiver.into(), method_id.into(), argc.into()])?;
            stack.push(result, offset, name)?;
        }
        Opcode::OptArefWith => {
            let key = i64_ty.const_int(operand(0), false);
            let receiver = stack.pop(offset, name)?;
            let result = call_helper(driver, name, offset, &[receiver.into(), key.into()])?;
            stack.push(result, offset, name)?;
        }
        Opcode::OptAsetWith => {
            let key = i64_ty.const_int(operand(0), false);
            let value = stack.pop(offset, name)?;
            let receiver = stack.pop(offset, name)?;
            let result = call_helper(driver, name, offset, &[receiver.into(), key.into(), value.into()])?;
            stack.push(result, offset, name)?;
        }

        // --- Instrumentation ---------------------------------------
        Opcode::Trace => {
            let flag = i64_ty.const_int(operand(0), false);
            call_helper_void(driver, name, offset, &[flag.into()])?;
        }
        Opcode::GetInlineCache => {
            stack.push(i64_ty.const_int(consts::QNIL, false), offset, name)?;
        }
        Opcode::SetInlineCache => {}
        Opcode::OptCaseDispatch => {
            stack.pop(offset, name)?;
        }

        // --- Control flow ------------------------------------------
        Opcode::Leave => {
            if stack.len() != 1 {
                return Err(CompileError::StackShapeAtLeave { offset, depth: stack.len() });
            }
            let value = stack.pop(offset, name)?;
            let frame = driver.frame_param();
            call_helper_void(driver, "push_result", offset, &[frame.into(), value.into()])?;
            driver
                .builder
                .build_return(Some(&frame))
                .map_err(|e| CompileError::Ir(e.to_string()))?;
            return Ok(true);
        }
        Opcode::Throw => {
            let throw_state = i64_ty.const_int(operand(0), false);
            let value = stack.pop(offset, name)?;
            let thread = driver.thread_param();
            let frame = driver.frame_param();
            call_helper_void(driver, "insn_throw", offset, &[thread.into(), frame.into(), throw_state.into(), value.into()])?;
            let zero = i64_ty.const_int(0, false);
            driver
                .builder
                .build_return(Some(&zero))
                .map_err(|e| CompileError::Ir(e.to_string()))?;
            return Ok(true);
        }
        Opcode::Jump => {
            let dest = (offset as i64 + len as i64 + operand(0) as i64) as usize;
            let dest_block = driver.blocks.get(dest).block;
            let current_block = current_block(driver);
            if stack.is_empty() {
                driver
                    .builder
                    .build_unconditional_branch(dest_block)
                    .map_err(|e| CompileError::Ir(e.to_string()))?;
                driver.compile_block(dest, None)?;
            } else {
                let value = stack.pop(offset, name)?;
                driver
                    .builder
                    .build_unconditional_branch(dest_block)
                    .map_err(|e| CompileError::Ir(e.to_string()))?;
                driver.blocks.add_incoming(dest, value, current_block);
            }
            return Ok(true);
        }
        Opcode::BranchIf | Opcode::BranchUnless => {
            let branch_dest = (offset as i64 + len as i64 + operand(0) as i64) as usize;
            let fallthrough = offset + len;
            let cond = stack.pop(offset, name)?;
            if stack.len() > 1 {
                return Err(CompileError::StackShapeAtReturn {
                    offset,
                    expected: 1,
                    actual: stack.len(),
                });
            }
            let predicate = rtest(driver, cond)?;
            let (true_offset, false_offset) = if matches!(op, Opcode::BranchIf) {
                (branch_dest, fallthrough)
            } else {
                (fallthrough, branch_dest)
            };
            let true_block = driver.blocks.get(true_offset).block;
            let false_block = driver.blocks.get(false_offset).block;
            let current_block = current_block(driver);
            driver
                .builder
                .build_conditional_branch(predicate, true_block, false_block)
                .map_err(|e| CompileError::Ir(e.to_string()))?;

            let mut fallthrough_stack = stack.snapshot();
            let mut branch_stack = stack.snapshot();
            if !stack.is_empty() {
                let value = fallthrough_stack.pop(offset, name)?;
                driver.blocks.add_incoming(fallthrough, value, current_block);
                if branch_dest > offset {
                    let value = branch_stack.pop(offset, name)?;
                    driver.blocks.add_incoming(branch_dest, value, current_block);
                }
            }
            driver.compile_block(fallthrough, Some(fallthrough_stack))?;
            driver.compile_block(branch_dest, Some(branch_stack))?;
            return Ok(true);
        }
        Opcode::BranchNil => {
            let branch_dest = (offset as i64 + len as i64 + operand(0) as i64) as usize;
            let fallthrough = offset + len;
            let cond = stack.pop(offset, name)?;
            let qnil = i64_ty.const_int(consts::QNIL, false);
            let is_nonnil = driver
                .builder
                .build_int_compare(IntPredicate::NE, cond, qnil, "nonnil")
                .map_err(|e| CompileError::Ir(e.to_string()))?;
            let fallthrough_block = driver.blocks.get(fallthrough).block;
            let branch_block = driver.blocks.get(branch_dest).block;
            let current_block = current_block(driver);
            driver
                .builder
                .build_conditional_branch(is_nonnil, fallthrough_block, branch_block)
                .map_err(|e| CompileError::Ir(e.to_string()))?;
            driver.blocks.add_incoming(branch_dest, qnil, current_block);
            driver.compile_block(fallthrough, Some(stack.snapshot()))?;
            return Ok(true);
        }
    }

    Ok(false)
}

/// Pops `n` values and returns them in their original (bottom-to-top)
/// source order, for opcodes that replay popped operands into a
/// variable-arity constructor call.
fn pop_n_in_order<'ctx>(
    stack: &mut OperandStack<'ctx>,
    n: usize,
    offset: usize,
    opcode: &'static str,
) -> Result<Vec<IntValue<'ctx>>, CompileError> {
    let mut values = Vec::with_capacity(n);
    for _ in 0..n {
        values.push(stack.pop(offset, opcode)?);
    }
    values.reverse();
    Ok(values)
}

#[cfg(test)]
mod tests {
    use inkwell::context::Context;

    use super::*;
    use crate::block_table::BlockTable;
    use crate::bytecode::{encode, DefaultOpcodeTable, Iseq};
    use crate::helpers::HelperRegistry;

    fn make_driver_harness<'ctx>(
        context: &'ctx Context,
        module: &'ctx inkwell::module::Module<'ctx>,
        words: Vec<u64>,
        stack_max: u32,
    ) -> (Iseq, inkwell::values::FunctionValue<'ctx>, inkwell::builder::Builder<'ctx>) {
        let iseq = Iseq {
            iseq_size: words.len(),
            iseq_encoded: words,
            stack_max,
            local_table_size: 2,
            arg_size: 2,
        };
        let i64_ty = context.i64_type();
        let fn_ty = i64_ty.fn_type(&[i64_ty.into(), i64_ty.into()], false);
        let function = module.add_function("f", fn_ty, None);
        let builder = context.create_builder();
        (iseq, function, builder)
    }

    #[test]
    fn leave_with_wrong_depth_is_an_error() {
        let context = Context::create();
        let module = context.create_module("m");
        let (iseq, function, builder) = make_driver_harness(&context, &module, vec![encode(Opcode::Leave)], 1);
        let opcodes = DefaultOpcodeTable;
        let leaders = vec![0];
        let mut blocks = BlockTable::new(&context, &module, function, &leaders, iseq.iseq_size);
        let mut helpers = HelperRegistry::new();
        let mut driver = Driver {
            context: &context,
            module: &module,
            builder: &builder,
            function,
            iseq: &iseq,
            opcodes: &opcodes,
            helpers: &mut helpers,
            blocks: &mut blocks,
        };
        driver.builder.position_at_end(driver.blocks.get(0).block);
        let mut stack: OperandStack = OperandStack::new(1);
        let err = translate(&mut driver, 0, Opcode::Leave, &mut stack).unwrap_err();
        assert!(matches!(err, CompileError::StackShapeAtLeave { .. }));
    }

    #[test]
    fn putnil_then_leave_pushes_qnil_and_returns() {
        let context = Context::create();
        let module = context.create_module("m");
        let words = vec![encode(Opcode::PutNil), encode(Opcode::Leave)];
        let (iseq, function, builder) = make_driver_harness(&context, &module, words, 1);
        let opcodes = DefaultOpcodeTable;
        let leaders = vec![0];
        let mut blocks = BlockTable::new(&context, &module, function, &leaders, iseq.iseq_size);
        let mut helpers = HelperRegistry::new();
        let mut driver = Driver {
            context: &context,
            module: &module,
            builder: &builder,
            function,
            iseq: &iseq,
            opcodes: &opcodes,
            helpers: &mut helpers,
            blocks: &mut blocks,
        };
        driver.builder.position_at_end(driver.blocks.get(0).block);
        let mut stack: OperandStack = OperandStack::new(1);
        let jumped = translate(&mut driver, 0, Opcode::PutNil, &mut stack).unwrap();
        assert!(!jumped);
        assert_eq!(stack.len(), 1);
        let jumped = translate(&mut driver, 1, Opcode::Leave, &mut stack).unwrap();
        assert!(jumped);
        assert!(module.get_function("push_result").is_some());
    }
}
