//! The single error taxon exposed to the host, `CompileError`.
//!
//! Every variant carries whatever context (opcode name, byte offset, stack
//! depth) an implementer needs to diagnose the failure. There is no
//! recovery path: any `CompileError` aborts the current method compilation
//! and the partially built module must be discarded by the caller.

use thiserror::Error;

/// Result type used throughout the compiler.
pub type CompileResult<T> = Result<T, CompileError>;

/// A fatal error raised while compiling one bytecode method.
#[derive(Debug, Error)]
pub enum CompileError {
    /// The abstract operand stack would exceed `stack_max`.
    #[error("stack overflow at offset {offset} compiling `{opcode}` (capacity {capacity})")]
    StackOverflow {
        offset: usize,
        opcode: &'static str,
        capacity: usize,
    },

    /// The abstract operand stack was popped while empty.
    #[error("stack underflow at offset {offset} compiling `{opcode}`")]
    StackUnderflow { offset: usize, opcode: &'static str },

    /// A helper name was requested that isn't in the registry's static table.
    #[error("unknown helper `{name}` requested at offset {offset}")]
    UnknownHelper { offset: usize, name: &'static str },

    /// A raw bytecode word did not resolve to a known opcode.
    #[error("word 0x{word:016x} at offset {offset} did not resolve to a known opcode")]
    UnknownOpcodeWord { offset: usize, word: u64 },

    /// The translator has no lowering for this (known, but unimplemented) opcode.
    #[error("unsupported opcode `{opcode}` at offset {offset}")]
    UnsupportedOpcode { offset: usize, opcode: &'static str },

    /// `leave` was reached with a stack depth other than 1.
    #[error("`leave` at offset {offset} requires stack depth 1, found {depth}")]
    StackShapeAtLeave { offset: usize, depth: usize },

    /// A branch block finished compiling with a stack depth other than expected.
    #[error("block ending at offset {offset} expected stack depth {expected}, found {actual}")]
    StackShapeAtReturn {
        offset: usize,
        expected: usize,
        actual: usize,
    },

    /// A deferred φ's pending value/block lists had mismatched lengths.
    #[error(
        "inconsistent join at block {offset}: {values} pending values but {blocks} pending blocks"
    )]
    InconsistentJoin {
        offset: usize,
        values: usize,
        blocks: usize,
    },

    /// The helper signature table asked for an IR type this backend can't represent.
    #[error("helper `{name}` has an unmappable type in its signature")]
    TypeMismatch { name: &'static str },

    /// The underlying IR builder (LLVM, via inkwell) reported a failure.
    #[error("IR builder error: {0}")]
    Ir(String),
}
