//! A method-level JIT front end: translates one stack-based bytecode method
//! body into SSA-form LLVM IR, via [`inkwell`].
//!
//! The three hard subsystems are basic-block discovery ([`leader`]),
//! abstract stack evaluation ([`stack`]), and SSA construction across merges
//! ([`block_table`]'s φ protocol). Everything else — the opcode dispatch in
//! [`translator`], the recursive walk in [`driver`] — is built on top of
//! those three.
//!
//! The crate never invents opcode metadata or helper behavior: both are
//! either read-only host data (an [`OpcodeTable`] implementation) or
//! external declarations this compiler only ever calls by name, never
//! defines.

mod block_table;
mod bytecode;
mod consts;
mod driver;
mod error;
mod helpers;
mod leader;
mod stack;
mod translator;

pub use bytecode::{DefaultOpcodeTable, Iseq, Opcode, OpcodeTable, OperandKind};
pub use consts::{int2fix, QFALSE, QNIL, QTRUE, QUNDEF};
pub use error::{CompileError, CompileResult};
pub use helpers::{signature_for, HelperSignature, HelperType};
pub use stack::OperandStack;

use block_table::BlockTable;
use driver::Driver;
use helpers::HelperRegistry;
use inkwell::context::Context;
use inkwell::module::Module;

/// Compiles one method's bytecode into a freshly created module containing
/// a single function named `function_name`, plus every helper declaration
/// the method's body ends up referencing.
///
/// `context` outlives the returned module, as is usual for inkwell-backed
/// compilers: callers typically keep one `Context` per compilation unit (or
/// per thread) and create many modules from it.
pub fn compile_iseq<'ctx>(
    context: &'ctx Context,
    iseq: &Iseq,
    opcodes: &dyn OpcodeTable,
    function_name: &str,
) -> CompileResult<Module<'ctx>> {
    log::info!("compile_iseq: `{function_name}`, {} words, stack_max={}", iseq.iseq_size, iseq.stack_max);

    let module = context.create_module(function_name);
    let i64_ty = context.i64_type();
    let fn_type = i64_ty.fn_type(&[i64_ty.into(), i64_ty.into()], false);
    let function = module.add_function(function_name, fn_type, None);

    let leaders = leader::analyze(iseq, opcodes)?;
    log::debug!("compile_iseq: {} basic block(s)", leaders.len());

    let mut blocks = BlockTable::new(context, &module, function, &leaders, iseq.iseq_size);
    let builder = context.create_builder();
    let mut helpers = HelperRegistry::new();

    let mut driver = Driver {
        context,
        module: &module,
        builder: &builder,
        function,
        iseq,
        opcodes,
        helpers: &mut helpers,
        blocks: &mut blocks,
    };
    driver.compile_block(0, None)?;

    log::info!("compile_iseq: `{function_name}` compiled successfully");
    Ok(module)
}
