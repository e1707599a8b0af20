use crate::descriptor::java_name;
use crate::java_exception::JavaExceptionKind;
use crate::jvm_values::{ObjectRef, Value};
use crate::method_area::array_component_class;
use crate::native_method_area::{NativeError, NativeMethodArea, NativeResult};
use crate::natives::{int_arg, new_string, object_arg, reference_arg, string_arg};
use crate::virtual_machine::VirtualMachine;
use log::debug;
use std::time::{SystemTime, UNIX_EPOCH};

const OBJECT: &str = "java/lang/Object";
const SYSTEM: &str = "java/lang/System";
const THROWABLE: &str = "java/lang/Throwable";
const INTEGER: &str = "java/lang/Integer";
const STRING: &str = "java/lang/String";

pub(super) fn register(area: &mut NativeMethodArea) {
    area.registry_native_method(SYSTEM, "<clinit>", "()V", system_clinit);
    area.registry_native_method(
        SYSTEM,
        "arraycopy",
        "(Ljava/lang/Object;ILjava/lang/Object;II)V",
        system_arraycopy,
    );
    area.registry_native_method(SYSTEM, "exit", "(I)V", system_exit);
    area.registry_native_method(SYSTEM, "currentTimeMillis", "()J", system_current_time_millis);
    area.registry_native_method(SYSTEM, "nanoTime", "()J", system_nano_time);

    area.registry_native_method(OBJECT, "<init>", "()V", nop);
    area.registry_native_method(OBJECT, "hashCode", "()I", object_hash_code);
    area.registry_native_method(OBJECT, "equals", "(Ljava/lang/Object;)Z", object_equals);
    area.registry_native_method(OBJECT, "toString", "()Ljava/lang/String;", object_to_string_native);

    area.registry_native_method(THROWABLE, "<init>", "()V", nop);
    area.registry_native_method(THROWABLE, "<init>", "(Ljava/lang/String;)V", throwable_init_message);
    area.registry_native_method(THROWABLE, "getMessage", "()Ljava/lang/String;", throwable_get_message);
    area.registry_native_method(THROWABLE, "toString", "()Ljava/lang/String;", throwable_to_string);

    area.registry_native_method(INTEGER, "parseInt", "(Ljava/lang/String;)I", integer_parse_int);
    area.registry_native_method(INTEGER, "toString", "(I)Ljava/lang/String;", integer_to_string);

    area.registry_native_method(STRING, "length", "()I", string_length);
    area.registry_native_method(STRING, "charAt", "(I)C", string_char_at);
    area.registry_native_method(STRING, "equals", "(Ljava/lang/Object;)Z", string_equals);
    area.registry_native_method(STRING, "hashCode", "()I", string_hash_code);
    area.registry_native_method(STRING, "isEmpty", "()Z", string_is_empty);
    area.registry_native_method(STRING, "toString", "()Ljava/lang/String;", string_to_string);
    area.registry_native_method(STRING, "valueOf", "(I)Ljava/lang/String;", integer_to_string);
    area.registry_native_method(
        STRING,
        "concat",
        "(Ljava/lang/String;)Ljava/lang/String;",
        string_concat,
    );
}

fn nop(_vm: &mut VirtualMachine, _args: Vec<Value>) -> NativeResult {
    Ok(None)
}

fn boolean(value: bool) -> NativeResult {
    Ok(Some(Value::Int(value as i32)))
}

/// `toString()` as the engine can answer it without running bytecode.
pub(crate) fn object_to_string(vm: &VirtualMachine, object_ref: ObjectRef) -> Result<String, NativeError> {
    let class_name = vm.class_name_of(object_ref)?;
    if class_name == STRING {
        return Ok(vm.string_value(object_ref)?);
    }
    if class_name == "java/lang/Class" {
        let name = match vm.object_heap.get(object_ref)?.field_value("name") {
            Some(Value::ObjectRef(name)) => vm.string_value(name)?,
            _ => String::new(),
        };
        return Ok(format!("class {name}"));
    }
    if vm.is_instance_of(object_ref, THROWABLE)? {
        return Ok(vm.describe_throwable(object_ref)?);
    }
    Ok(format!(
        "{}@{:x}",
        class_name.replace('/', "."),
        identity_hash(object_ref)
    ))
}

fn identity_hash(object_ref: ObjectRef) -> i32 {
    object_ref.index() as i32
}

fn system_clinit(vm: &mut VirtualMachine, _args: Vec<Value>) -> NativeResult {
    let system = vm.load_class(SYSTEM)?;
    let print_stream = vm.load_class("java/io/PrintStream")?;
    for (field, fd) in [("out", 1), ("err", 2)] {
        let stream = vm.new_object(print_stream)?;
        vm.object_heap
            .get_mut(stream)?
            .set_field_value("fd", Value::Int(fd));
        vm.set_static_field(system, field, Value::ObjectRef(stream));
    }
    debug!("System.out and System.err are ready");
    Ok(None)
}

fn array_store(message: String) -> NativeError {
    NativeError::exception(JavaExceptionKind::ArrayStoreException, message)
}

fn out_of_bounds(message: String) -> NativeError {
    NativeError::exception(JavaExceptionKind::ArrayIndexOutOfBoundsException, message)
}

fn is_primitive_component(component: &str) -> bool {
    !component.starts_with('L') && !component.starts_with('[')
}

fn system_arraycopy(vm: &mut VirtualMachine, args: Vec<Value>) -> NativeResult {
    let src = object_arg(&args, 0, "arraycopy")?;
    let src_pos = int_arg(&args, 1)?;
    let dest = object_arg(&args, 2, "arraycopy")?;
    let dest_pos = int_arg(&args, 3)?;
    let length = int_arg(&args, 4)?;

    let src_class = vm.class_name_of(src)?.to_string();
    let dest_class = vm.class_name_of(dest)?.to_string();
    let src_component = src_class.strip_prefix('[').ok_or_else(|| {
        array_store(format!(
            "arraycopy: source type {} is not an array",
            java_name(&src_class)
        ))
    })?;
    let dest_component = dest_class.strip_prefix('[').ok_or_else(|| {
        array_store(format!(
            "arraycopy: destination type {} is not an array",
            java_name(&dest_class)
        ))
    })?;
    let primitive_copy = is_primitive_component(src_component) || is_primitive_component(dest_component);
    if primitive_copy && src_component != dest_component {
        return Err(array_store(format!(
            "arraycopy: type mismatch: can not copy {} into {}",
            java_name(&src_class),
            java_name(&dest_class)
        )));
    }

    let src_len = vm.object_heap.array(src)?.len() as i64;
    let dest_len = vm.object_heap.array(dest)?.len() as i64;
    let element = |class: &str| java_name(class).trim_end_matches("[]").to_string();
    if length < 0 {
        return Err(out_of_bounds(format!("arraycopy: length {length} is negative")));
    }
    if src_pos < 0 {
        return Err(out_of_bounds(format!(
            "arraycopy: source index {src_pos} out of bounds for {}[{src_len}]",
            element(&src_class)
        )));
    }
    if dest_pos < 0 {
        return Err(out_of_bounds(format!(
            "arraycopy: destination index {dest_pos} out of bounds for {}[{dest_len}]",
            element(&dest_class)
        )));
    }
    if src_pos as i64 + length as i64 > src_len {
        return Err(out_of_bounds(format!(
            "arraycopy: last source index {} out of bounds for {}[{src_len}]",
            src_pos as i64 + length as i64,
            element(&src_class)
        )));
    }
    if dest_pos as i64 + length as i64 > dest_len {
        return Err(out_of_bounds(format!(
            "arraycopy: last destination index {} out of bounds for {}[{dest_len}]",
            dest_pos as i64 + length as i64,
            element(&dest_class)
        )));
    }

    let (src_pos, dest_pos, length) = (src_pos as usize, dest_pos as usize, length as usize);
    // copied up front so that overlapping copies within one array behave like memmove
    let source = vm.object_heap.array(src)?;
    let values: Vec<Value> = (src_pos..src_pos + length)
        .filter_map(|i| source.get(i))
        .collect();
    let check_elements = !primitive_copy && src_class != dest_class;
    let dest_element = array_component_class(&dest_class).map(str::to_string);
    for (offset, value) in values.into_iter().enumerate() {
        if let (true, Value::ObjectRef(element_ref), Some(target)) =
            (check_elements, value, dest_element.as_deref())
        {
            if !vm.is_instance_of(element_ref, target)? {
                return Err(array_store(format!(
                    "arraycopy: element type mismatch: can not cast one of the elements of {} to the type of the destination array, {}",
                    java_name(&src_class),
                    java_name(target)
                )));
            }
        }
        vm.object_heap.array_mut(dest)?.set(dest_pos + offset, value)?;
    }
    Ok(None)
}

fn system_exit(_vm: &mut VirtualMachine, args: Vec<Value>) -> NativeResult {
    let code = int_arg(&args, 0)?;
    debug!("System.exit({code})");
    Err(NativeError::Exit(code))
}

fn system_current_time_millis(_vm: &mut VirtualMachine, _args: Vec<Value>) -> NativeResult {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0);
    Ok(Some(Value::Long(millis)))
}

fn system_nano_time(vm: &mut VirtualMachine, _args: Vec<Value>) -> NativeResult {
    Ok(Some(Value::Long(vm.start_time.elapsed().as_nanos() as i64)))
}

fn object_hash_code(_vm: &mut VirtualMachine, args: Vec<Value>) -> NativeResult {
    let receiver = object_arg(&args, 0, "hashCode")?;
    Ok(Some(Value::Int(identity_hash(receiver))))
}

fn object_equals(_vm: &mut VirtualMachine, args: Vec<Value>) -> NativeResult {
    let receiver = object_arg(&args, 0, "equals")?;
    boolean(reference_arg(&args, 1)? == Some(receiver))
}

fn object_to_string_native(vm: &mut VirtualMachine, args: Vec<Value>) -> NativeResult {
    let receiver = object_arg(&args, 0, "toString")?;
    let text = object_to_string(vm, receiver)?;
    new_string(vm, &text)
}

fn throwable_init_message(vm: &mut VirtualMachine, args: Vec<Value>) -> NativeResult {
    let receiver = object_arg(&args, 0, "<init>")?;
    let message = reference_arg(&args, 1)?.map_or(Value::Null, Value::ObjectRef);
    vm.object_heap
        .get_mut(receiver)?
        .set_field_value("message", message);
    Ok(None)
}

fn throwable_get_message(vm: &mut VirtualMachine, args: Vec<Value>) -> NativeResult {
    let receiver = object_arg(&args, 0, "getMessage")?;
    Ok(Some(
        vm.object_heap
            .get(receiver)?
            .field_value("message")
            .unwrap_or(Value::Null),
    ))
}

fn throwable_to_string(vm: &mut VirtualMachine, args: Vec<Value>) -> NativeResult {
    let receiver = object_arg(&args, 0, "toString")?;
    let text = vm.describe_throwable(receiver)?;
    new_string(vm, &text)
}

fn integer_parse_int(vm: &mut VirtualMachine, args: Vec<Value>) -> NativeResult {
    let text = string_arg(vm, &args, 0)?.ok_or_else(|| {
        NativeError::exception(
            JavaExceptionKind::NumberFormatException,
            "Cannot parse null string: null",
        )
    })?;
    let value = text.parse::<i32>().map_err(|_| {
        NativeError::exception(
            JavaExceptionKind::NumberFormatException,
            format!("For input string: \"{text}\""),
        )
    })?;
    Ok(Some(Value::Int(value)))
}

fn integer_to_string(vm: &mut VirtualMachine, args: Vec<Value>) -> NativeResult {
    let value = int_arg(&args, 0)?;
    new_string(vm, &value.to_string())
}

fn receiver_string(vm: &VirtualMachine, args: &[Value], what: &str) -> Result<String, NativeError> {
    let receiver = object_arg(args, 0, what)?;
    Ok(vm.string_value(receiver)?)
}

fn string_length(vm: &mut VirtualMachine, args: Vec<Value>) -> NativeResult {
    let text = receiver_string(vm, &args, "length")?;
    Ok(Some(Value::Int(text.encode_utf16().count() as i32)))
}

fn string_char_at(vm: &mut VirtualMachine, args: Vec<Value>) -> NativeResult {
    let text = receiver_string(vm, &args, "charAt")?;
    let index = int_arg(&args, 1)?;
    let units: Vec<u16> = text.encode_utf16().collect();
    match usize::try_from(index).ok().and_then(|i| units.get(i)) {
        Some(unit) => Ok(Some(Value::Int(*unit as i32))),
        None => Err(NativeError::exception(
            JavaExceptionKind::StringIndexOutOfBoundsException,
            format!("Index {index} out of bounds for length {}", units.len()),
        )),
    }
}

fn string_equals(vm: &mut VirtualMachine, args: Vec<Value>) -> NativeResult {
    let text = receiver_string(vm, &args, "equals")?;
    match reference_arg(&args, 1)? {
        Some(other) if vm.class_name_of(other)? == STRING => boolean(vm.string_value(other)? == text),
        _ => boolean(false),
    }
}

fn string_hash_code(vm: &mut VirtualMachine, args: Vec<Value>) -> NativeResult {
    let text = receiver_string(vm, &args, "hashCode")?;
    let hash = text
        .encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(unit as i32));
    Ok(Some(Value::Int(hash)))
}

fn string_is_empty(vm: &mut VirtualMachine, args: Vec<Value>) -> NativeResult {
    let text = receiver_string(vm, &args, "isEmpty")?;
    boolean(text.is_empty())
}

fn string_to_string(_vm: &mut VirtualMachine, args: Vec<Value>) -> NativeResult {
    let receiver = object_arg(&args, 0, "toString")?;
    Ok(Some(Value::ObjectRef(receiver)))
}

fn string_concat(vm: &mut VirtualMachine, args: Vec<Value>) -> NativeResult {
    let receiver = object_arg(&args, 0, "concat")?;
    let other = string_arg(vm, &args, 1)?.ok_or_else(|| {
        NativeError::exception(
            JavaExceptionKind::NullPointerException,
            "concat: null reference",
        )
    })?;
    if other.is_empty() {
        return Ok(Some(Value::ObjectRef(receiver)));
    }
    let text = vm.string_value(receiver)? + &other;
    new_string(vm, &text)
}
