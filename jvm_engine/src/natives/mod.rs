//! Built-in intrinsics: the slice of the Java class library the engine
//! implements itself.

mod java_io;
mod java_lang;
mod math;

use crate::java_exception::JavaExceptionKind;
use crate::jvm_values::{ObjectRef, Value};
use crate::native_method_area::{NativeError, NativeMethodArea};
use crate::virtual_machine::VirtualMachine;

pub(crate) fn register_defaults(area: &mut NativeMethodArea) {
    java_io::register(area);
    java_lang::register(area);
    math::register(area);
}

fn argument(args: &[Value], index: usize) -> Result<Value, NativeError> {
    args.get(index)
        .copied()
        .ok_or_else(|| NativeError::Failure(format!("missing argument {index}")))
}

fn wrong_argument(index: usize, expected: &str, found: Value) -> NativeError {
    NativeError::Failure(format!(
        "argument {index}: expected {expected}, found {}",
        found.kind_name()
    ))
}

pub(crate) fn int_arg(args: &[Value], index: usize) -> Result<i32, NativeError> {
    let value = argument(args, index)?;
    value.as_int().ok_or_else(|| wrong_argument(index, "Int", value))
}

pub(crate) fn long_arg(args: &[Value], index: usize) -> Result<i64, NativeError> {
    let value = argument(args, index)?;
    value.as_long().ok_or_else(|| wrong_argument(index, "Long", value))
}

pub(crate) fn float_arg(args: &[Value], index: usize) -> Result<f32, NativeError> {
    let value = argument(args, index)?;
    value.as_float().ok_or_else(|| wrong_argument(index, "Float", value))
}

pub(crate) fn double_arg(args: &[Value], index: usize) -> Result<f64, NativeError> {
    let value = argument(args, index)?;
    value.as_double().ok_or_else(|| wrong_argument(index, "Double", value))
}

/// A reference argument; None for null.
pub(crate) fn reference_arg(args: &[Value], index: usize) -> Result<Option<ObjectRef>, NativeError> {
    match argument(args, index)? {
        Value::Null => Ok(None),
        Value::ObjectRef(object_ref) => Ok(Some(object_ref)),
        other => Err(wrong_argument(index, "Reference", other)),
    }
}

/// A reference argument that must not be null.
pub(crate) fn object_arg(args: &[Value], index: usize, what: &str) -> Result<ObjectRef, NativeError> {
    reference_arg(args, index)?.ok_or_else(|| {
        NativeError::exception(
            JavaExceptionKind::NullPointerException,
            format!("{what}: null reference"),
        )
    })
}

/// Text of a string argument; None for null.
pub(crate) fn string_arg(
    vm: &VirtualMachine,
    args: &[Value],
    index: usize,
) -> Result<Option<String>, NativeError> {
    match reference_arg(args, index)? {
        Some(object_ref) => Ok(Some(vm.string_value(object_ref)?)),
        None => Ok(None),
    }
}

fn new_string(vm: &mut VirtualMachine, value: &str) -> Result<Option<Value>, NativeError> {
    Ok(Some(Value::ObjectRef(vm.new_string(value)?)))
}
