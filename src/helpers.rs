//! External-function registry: resolves a helper name to a typed IR
//! function declaration, declaring it into the module on first use and
//! caching the resulting `FunctionValue` for every later reference.
//!
//! The compiler never emits a helper's body — by construction every helper
//! is an external declaration the host VM links in separately. This is the
//! seam between generated code and the interpreter's own C-level runtime
//! (`rb_funcall`, the various `vm_opt_*` fast paths, etc).

use std::collections::HashMap;

use inkwell::module::Module;
use inkwell::values::FunctionValue;

use crate::error::CompileError;

/// The three scalar shapes a helper's parameters or return value can take.
/// `Void` only ever appears as a return type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelperType {
    Void,
    I32,
    I64,
}

/// A helper's call signature, as seen from the IR side.
#[derive(Debug, Clone)]
pub struct HelperSignature {
    pub params: Vec<HelperType>,
    pub return_type: HelperType,
    pub variadic: bool,
}

impl HelperSignature {
    const fn new(params: Vec<HelperType>, return_type: HelperType, variadic: bool) -> Self {
        Self {
            params,
            return_type,
            variadic,
        }
    }
}

fn fixed(params: &[HelperType], return_type: HelperType) -> HelperSignature {
    HelperSignature::new(params.to_vec(), return_type, false)
}

/// Looks up the static signature for `name`, or `None` if it isn't one of
/// the helpers this front end knows how to call.
///
/// Every signature here is I64-in/I64-out unless the helper is genuinely
/// void (trace hooks, the two setters that mutate host state and hand
/// nothing back) — this matches the boxed-value convention described in
/// every Ruby value, fixnum or otherwise, already fits in one
/// tagged machine word, so there is no reason for a narrower helper
/// parameter.
pub fn signature_for(name: &str) -> Option<HelperSignature> {
    use HelperType::{I64, Void};

    Some(match name {
        // Method dispatch. `rb_funcall` is the one genuinely variadic
        // helper: receiver, method id, argument count, then the arguments
        // themselves.
        "rb_funcall" => HelperSignature::new(vec![I64, I64, I64], I64, true),
        // (thread, frame, call-info word), then receiver and argc popped
        // arguments as trailing variadic operands.
        "send" | "opt_send_without_block" | "invokesuper" => {
            HelperSignature::new(vec![I64, I64, I64], I64, true)
        }

        // Dedicated arithmetic/comparison fast paths. Only these
        // three `opt_*` opcodes get a named helper of their own; every other
        // `opt_*` opcode falls back to `rb_funcall` with a synthesized
        // method id (see `translator::method_id_for`).
        "opt_plus" | "opt_minus" | "opt_lt" => fixed(&[I64, I64], I64),

        // `opt_aref_with`/`opt_aset_with` resurrect an interned string
        // operand and call directly rather than re-entering `rb_funcall`
        // (which would re-pop the stack the opcode already consumed).
        "opt_aref_with" => fixed(&[I64, I64], I64),
        "opt_aset_with" => fixed(&[I64, I64, I64], I64),

        // Composite constructors. The count-prefixed builders take their
        // element count as a fixed leading parameter and the popped
        // elements themselves as trailing variadic arguments, the same
        // calling convention as `rb_funcall`.
        "newarray" | "newhash" => HelperSignature::new(vec![I64], I64, true),
        "toregexp" => HelperSignature::new(vec![I64, I64], I64, true),
        "concatstrings" => HelperSignature::new(vec![I64], I64, true),
        "duparray" => fixed(&[I64], I64),
        "splatarray" => fixed(&[I64, I64], I64),
        "concatarray" => fixed(&[I64, I64], I64),
        "newrange" => fixed(&[I64, I64, I64], I64),
        "tostring" => fixed(&[I64], I64),
        "freezestring" => fixed(&[I64, I64], I64),
        "putstring" => fixed(&[I64], I64),

        // Variable and constant access.
        "getglobal" => fixed(&[I64], I64),
        "setglobal" => fixed(&[I64, I64], Void),
        "getinstancevariable" => fixed(&[I64, I64, I64], I64),
        "setinstancevariable" => fixed(&[I64, I64, I64, I64], Void),
        "getclassvariable" => fixed(&[I64, I64], I64),
        "setclassvariable" => fixed(&[I64, I64, I64], Void),
        "getconstant" => fixed(&[I64, I64], I64),
        "setconstant" => fixed(&[I64, I64], Void),
        "getspecial" => fixed(&[I64, I64], I64),
        "setspecial" => fixed(&[I64, I64], Void),

        // Synthesized primitives backing the opcodes that don't already
        // name a helper 1:1.
        "self_from_cfp" => fixed(&[I64], I64),
        "push_result" => fixed(&[I64, I64], Void),
        "getlocal_level0" => fixed(&[I64, I64], I64),
        "setlocal_level0" => fixed(&[I64, I64, I64], Void),
        "insn_throw" => fixed(&[I64, I64, I64, I64], Void),
        "defined" => fixed(&[I64, I64, I64], I64),
        "checkmatch" => fixed(&[I64, I64, I64], I64),
        "checkkeyword" => fixed(&[I64, I64], I64),
        "putspecialobject" => fixed(&[I64], I64),

        // Instrumentation. `trace` is a pure side-effecting hook.
        "trace" => fixed(&[I64], Void),

        _ => return None,
    })
}

/// Maps a helper's name to its declared `FunctionValue`, declaring it the
/// first time it's asked for and reusing the same declaration afterwards.
pub struct HelperRegistry<'ctx> {
    cache: HashMap<&'static str, FunctionValue<'ctx>>,
}

impl<'ctx> HelperRegistry<'ctx> {
    pub fn new() -> Self {
        Self {
            cache: HashMap::new(),
        }
    }

    /// Resolves `name` against `module`, declaring an external function the
    /// first time this name is requested and returning the cached value on
    /// every subsequent call.
    pub fn get_function(
        &mut self,
        module: &Module<'ctx>,
        name: &'static str,
        offset: usize,
    ) -> Result<FunctionValue<'ctx>, CompileError> {
        if let Some(existing) = self.cache.get(name) {
            return Ok(*existing);
        }

        if let Some(existing) = module.get_function(name) {
            self.cache.insert(name, existing);
            return Ok(existing);
        }

        let signature =
            signature_for(name).ok_or(CompileError::UnknownHelper { offset, name })?;

        let context = module.get_context();
        let to_basic = |t: HelperType| -> Result<inkwell::types::BasicMetadataTypeEnum<'ctx>, CompileError> {
            match t {
                HelperType::I64 => Ok(context.i64_type().into()),
                HelperType::I32 => Ok(context.i32_type().into()),
                HelperType::Void => Err(CompileError::TypeMismatch { name }),
            }
        };

        let param_types = signature
            .params
            .iter()
            .map(|t| to_basic(*t))
            .collect::<Result<Vec<_>, _>>()?;

        let fn_type = match signature.return_type {
            HelperType::I64 => context.i64_type().fn_type(&param_types, signature.variadic),
            HelperType::I32 => context.i32_type().fn_type(&param_types, signature.variadic),
            HelperType::Void => context.void_type().fn_type(&param_types, signature.variadic),
        };

        let function = module.add_function(name, fn_type, None);
        self.cache.insert(name, function);
        log::debug!("declared helper `{name}` on first use at offset {offset}");
        Ok(function)
    }
}

impl<'ctx> Default for HelperRegistry<'ctx> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkwell::context::Context;

    #[test]
    fn known_helper_declares_and_caches() {
        let context = Context::create();
        let module = context.create_module("m");
        let mut registry = HelperRegistry::new();

        let first = registry.get_function(&module, "opt_plus", 0).unwrap();
        let second = registry.get_function(&module, "opt_plus", 10).unwrap();
        assert_eq!(first, second);
        assert_eq!(module.get_functions().count(), 1);
    }

    #[test]
    fn variadic_helper_is_marked_variadic() {
        let context = Context::create();
        let module = context.create_module("m");
        let mut registry = HelperRegistry::new();
        let function = registry.get_function(&module, "rb_funcall", 0).unwrap();
        assert!(function.get_type().is_var_arg());
    }

    #[test]
    fn unknown_helper_is_an_error() {
        let context = Context::create();
        let module = context.create_module("m");
        let mut registry = HelperRegistry::new();
        let err = registry
            .get_function(&module, "not_a_real_helper", 3)
            .unwrap_err();
        assert!(matches!(err, CompileError::UnknownHelper { .. }));
    }
}
