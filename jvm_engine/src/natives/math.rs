use crate::jvm_values::Value;
use crate::native_method_area::{NativeMethodArea, NativeResult};
use crate::natives::{double_arg, float_arg, int_arg, long_arg};
use crate::virtual_machine::VirtualMachine;

const MATH: &str = "java/lang/Math";

pub(super) fn register(area: &mut NativeMethodArea) {
    area.registry_native_method(MATH, "sqrt", "(D)D", sqrt);
    area.registry_native_method(MATH, "pow", "(DD)D", pow);
    area.registry_native_method(MATH, "floor", "(D)D", floor);
    area.registry_native_method(MATH, "ceil", "(D)D", ceil);
    area.registry_native_method(MATH, "abs", "(I)I", abs_int);
    area.registry_native_method(MATH, "abs", "(J)J", abs_long);
    area.registry_native_method(MATH, "abs", "(F)F", abs_float);
    area.registry_native_method(MATH, "abs", "(D)D", abs_double);
    area.registry_native_method(MATH, "max", "(II)I", max_int);
    area.registry_native_method(MATH, "max", "(JJ)J", max_long);
    area.registry_native_method(MATH, "max", "(DD)D", max_double);
    area.registry_native_method(MATH, "min", "(II)I", min_int);
    area.registry_native_method(MATH, "min", "(JJ)J", min_long);
    area.registry_native_method(MATH, "min", "(DD)D", min_double);
}

macro_rules! generate_unary_double {
    ($name:ident, $op:expr) => {
        fn $name(_vm: &mut VirtualMachine, args: Vec<Value>) -> NativeResult {
            let value = double_arg(&args, 0)?;
            Ok(Some(Value::Double($op(value))))
        }
    };
}

generate_unary_double!(sqrt, f64::sqrt);
generate_unary_double!(floor, f64::floor);
generate_unary_double!(ceil, f64::ceil);
generate_unary_double!(abs_double, f64::abs);

fn pow(_vm: &mut VirtualMachine, args: Vec<Value>) -> NativeResult {
    let base = double_arg(&args, 0)?;
    let exponent = double_arg(&args, 1)?;
    Ok(Some(Value::Double(base.powf(exponent))))
}

fn abs_int(_vm: &mut VirtualMachine, args: Vec<Value>) -> NativeResult {
    Ok(Some(Value::Int(int_arg(&args, 0)?.wrapping_abs())))
}

fn abs_long(_vm: &mut VirtualMachine, args: Vec<Value>) -> NativeResult {
    Ok(Some(Value::Long(long_arg(&args, 0)?.wrapping_abs())))
}

fn abs_float(_vm: &mut VirtualMachine, args: Vec<Value>) -> NativeResult {
    Ok(Some(Value::Float(float_arg(&args, 0)?.abs())))
}

fn max_int(_vm: &mut VirtualMachine, args: Vec<Value>) -> NativeResult {
    Ok(Some(Value::Int(int_arg(&args, 0)?.max(int_arg(&args, 1)?))))
}

fn min_int(_vm: &mut VirtualMachine, args: Vec<Value>) -> NativeResult {
    Ok(Some(Value::Int(int_arg(&args, 0)?.min(int_arg(&args, 1)?))))
}

fn max_long(_vm: &mut VirtualMachine, args: Vec<Value>) -> NativeResult {
    Ok(Some(Value::Long(long_arg(&args, 0)?.max(long_arg(&args, 1)?))))
}

fn min_long(_vm: &mut VirtualMachine, args: Vec<Value>) -> NativeResult {
    Ok(Some(Value::Long(long_arg(&args, 0)?.min(long_arg(&args, 1)?))))
}

// NaN wins and +0.0 is larger than -0.0, unlike f64::max
fn java_max(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else if a == 0.0 && b == 0.0 {
        if a.is_sign_positive() {
            a
        } else {
            b
        }
    } else if a >= b {
        a
    } else {
        b
    }
}

fn java_min(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else if a == 0.0 && b == 0.0 {
        if a.is_sign_negative() {
            a
        } else {
            b
        }
    } else if a <= b {
        a
    } else {
        b
    }
}

fn max_double(_vm: &mut VirtualMachine, args: Vec<Value>) -> NativeResult {
    let value = java_max(double_arg(&args, 0)?, double_arg(&args, 1)?);
    Ok(Some(Value::Double(value)))
}

fn min_double(_vm: &mut VirtualMachine, args: Vec<Value>) -> NativeResult {
    let value = java_min(double_arg(&args, 0)?, double_arg(&args, 1)?);
    Ok(Some(Value::Double(value)))
}
