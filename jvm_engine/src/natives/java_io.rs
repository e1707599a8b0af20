use crate::jvm_values::Value;
use crate::native_method_area::{NativeError, NativeMethod, NativeMethodArea, NativeResult};
use crate::natives::java_lang::object_to_string;
use crate::natives::{double_arg, float_arg, int_arg, long_arg, object_arg, reference_arg, string_arg};
use crate::virtual_machine::VirtualMachine;

const PRINT_STREAM: &str = "java/io/PrintStream";
const STDERR_FD: i32 = 2;

pub(super) fn register(area: &mut NativeMethodArea) {
    area.registry_native_method(PRINT_STREAM, "println", "()V", println_empty);
    let variants: [(&str, NativeMethod, NativeMethod); 8] = [
        ("(Z)V", print_boolean, println_boolean),
        ("(C)V", print_char, println_char),
        ("(I)V", print_int, println_int),
        ("(J)V", print_long, println_long),
        ("(F)V", print_float, println_float),
        ("(D)V", print_double, println_double),
        ("(Ljava/lang/String;)V", print_string, println_string),
        ("(Ljava/lang/Object;)V", print_object, println_object),
    ];
    for (descriptor, print, println) in variants {
        area.registry_native_method(PRINT_STREAM, "print", descriptor, print);
        area.registry_native_method(PRINT_STREAM, "println", descriptor, println);
    }
}

fn write_text(vm: &mut VirtualMachine, args: &[Value], text: &str, newline: bool) -> NativeResult {
    let stream = object_arg(args, 0, "print")?;
    let fd = match vm.object_heap.get(stream)?.field_value("fd") {
        Some(Value::Int(fd)) => fd,
        _ => return Err(NativeError::Failure(format!("{stream} is not a PrintStream"))),
    };
    let out = if fd == STDERR_FD {
        vm.stderr()
    } else {
        vm.stdout()
    };
    let written = if newline {
        writeln!(out, "{text}")
    } else {
        write!(out, "{text}")
    };
    written.map_err(|e| NativeError::Failure(e.to_string()))?;
    Ok(None)
}

macro_rules! generate_print {
    ($print:ident, $println:ident, $render:ident) => {
        fn $print(vm: &mut VirtualMachine, args: Vec<Value>) -> NativeResult {
            let text = $render(vm, &args)?;
            write_text(vm, &args, &text, false)
        }

        fn $println(vm: &mut VirtualMachine, args: Vec<Value>) -> NativeResult {
            let text = $render(vm, &args)?;
            write_text(vm, &args, &text, true)
        }
    };
}

fn println_empty(vm: &mut VirtualMachine, args: Vec<Value>) -> NativeResult {
    write_text(vm, &args, "", true)
}

fn render_boolean(_vm: &VirtualMachine, args: &[Value]) -> Result<String, NativeError> {
    Ok((int_arg(args, 1)? != 0).to_string())
}

fn render_char(_vm: &VirtualMachine, args: &[Value]) -> Result<String, NativeError> {
    let unit = int_arg(args, 1)? as u16;
    Ok(char::from_u32(unit as u32)
        .unwrap_or(char::REPLACEMENT_CHARACTER)
        .to_string())
}

fn render_int(_vm: &VirtualMachine, args: &[Value]) -> Result<String, NativeError> {
    Ok(int_arg(args, 1)?.to_string())
}

fn render_long(_vm: &VirtualMachine, args: &[Value]) -> Result<String, NativeError> {
    Ok(long_arg(args, 1)?.to_string())
}

fn render_float(_vm: &VirtualMachine, args: &[Value]) -> Result<String, NativeError> {
    Ok(format_float(float_arg(args, 1)?))
}

fn render_double(_vm: &VirtualMachine, args: &[Value]) -> Result<String, NativeError> {
    Ok(format_double(double_arg(args, 1)?))
}

fn render_string(vm: &VirtualMachine, args: &[Value]) -> Result<String, NativeError> {
    Ok(string_arg(vm, args, 1)?.unwrap_or_else(|| "null".to_string()))
}

fn render_object(vm: &VirtualMachine, args: &[Value]) -> Result<String, NativeError> {
    match reference_arg(args, 1)? {
        Some(object_ref) => object_to_string(vm, object_ref),
        None => Ok("null".to_string()),
    }
}

generate_print!(print_boolean, println_boolean, render_boolean);
generate_print!(print_char, println_char, render_char);
generate_print!(print_int, println_int, render_int);
generate_print!(print_long, println_long, render_long);
generate_print!(print_float, println_float, render_float);
generate_print!(print_double, println_double, render_double);
generate_print!(print_string, println_string, render_string);
generate_print!(print_object, println_object, render_object);

/// `Double.toString`: plain notation within `[1e-3, 1e7)`, computerized
/// scientific notation outside it.
pub(crate) fn format_double(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let magnitude = value.abs();
    if magnitude == 0.0 || (1e-3..1e7).contains(&magnitude) {
        with_fraction(value.to_string())
    } else {
        scientific(format!("{value:e}"))
    }
}

/// `Float.toString`, shortest digits at float precision.
pub(crate) fn format_float(value: f32) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let magnitude = value.abs();
    if magnitude == 0.0 || (1e-3..1e7).contains(&magnitude) {
        with_fraction(value.to_string())
    } else {
        scientific(format!("{value:e}"))
    }
}

fn with_fraction(text: String) -> String {
    if text.contains('.') {
        text
    } else {
        format!("{text}.0")
    }
}

// 1e10 -> 1.0E10, 1.5e-5 -> 1.5E-5
fn scientific(text: String) -> String {
    match text.split_once('e') {
        Some((mantissa, exponent)) => format!("{}E{exponent}", with_fraction(mantissa.to_string())),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use crate::natives::java_io::{format_double, format_float};

    #[test]
    fn doubles_print_like_java() {
        assert_eq!("1.0", format_double(1.0));
        assert_eq!("-0.0", format_double(-0.0));
        assert_eq!("100.5", format_double(100.5));
        assert_eq!("0.001", format_double(0.001));
        assert_eq!("1.0E-4", format_double(0.0001));
        assert_eq!("1.0E7", format_double(1e7));
        assert_eq!("1.2345678E7", format_double(12345678.0));
        assert_eq!("1.5E-5", format_double(1.5e-5));
        assert_eq!("0.30000000000000004", format_double(0.1 + 0.2));
        assert_eq!("NaN", format_double(f64::NAN));
        assert_eq!("-Infinity", format_double(f64::NEG_INFINITY));
    }

    #[test]
    fn floats_print_at_float_precision() {
        assert_eq!("0.1", format_float(0.1));
        assert_eq!("1.0", format_float(1.0 + 1e-16));
        assert_eq!("3.4028235E38", format_float(f32::MAX));
        assert_eq!("Infinity", format_float(f32::INFINITY));
    }
}
