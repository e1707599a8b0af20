use crate::descriptor::java_name;
use crate::java_exception::{InvokeResult, JavaExceptionKind, MethodCallError};
use crate::jvm_error::verify_error;
use crate::jvm_values::{narrow_to_byte, narrow_to_char, narrow_to_short, ObjectRef, PrimaryType, Value};
use crate::method_area::array_component_class;
use crate::stack_frame::StackFrame;
use crate::virtual_machine::{out_of_memory, VirtualMachine};

fn negative_size(count: i32) -> MethodCallError {
    MethodCallError::java(JavaExceptionKind::NegativeArraySizeException, count.to_string())
}

// `[[I` with counts [2, 3]: an int[2][3]
fn build_multi_array(vm: &mut VirtualMachine, descriptor: &str, counts: &[i32]) -> InvokeResult<ObjectRef> {
    let length = counts[0] as usize;
    let array = vm.new_zeroed_array(descriptor, length)?;
    if counts.len() > 1 {
        let component = &descriptor[1..];
        for index in 0..length {
            let element = build_multi_array(vm, component, &counts[1..])?;
            vm.object_heap.array_mut(array)?.set(index, Value::ObjectRef(element))?;
        }
    }
    Ok(array)
}

// elements of every level of an array with these counts, saturating
fn total_elements(counts: &[i32]) -> usize {
    let mut level = 1usize;
    let mut total = 0usize;
    for count in counts {
        level = level.saturating_mul(*count as usize);
        total = total.saturating_add(level);
    }
    total
}

impl StackFrame {
    fn pop_count(&mut self, opcode: &str) -> InvokeResult<usize> {
        let count = self.pop_int(opcode)?;
        if count < 0 {
            return Err(negative_size(count));
        }
        Ok(count as usize)
    }

    pub(crate) fn exec_newarray(&mut self, vm: &mut VirtualMachine, opcode: &str, tag: u8) -> InvokeResult<()> {
        let count = self.pop_count(opcode)?;
        let primary = PrimaryType::from_tag(tag).ok_or_else(|| {
            MethodCallError::InternalError(verify_error!("{opcode}: invalid array type {tag}"))
        })?;
        let component = primary.descriptor().to_string();
        let array = vm.new_zeroed_array(&format!("[{component}"), count)?;
        self.push(Value::ObjectRef(array))
    }

    pub(crate) fn exec_anewarray(&mut self, vm: &mut VirtualMachine, opcode: &str, index: u16) -> InvokeResult<()> {
        let count = self.pop_count(opcode)?;
        let class_name = self.constant_pool.get_class_name(opcode, index)?.to_string();
        let descriptor = if class_name.starts_with('[') {
            format!("[{class_name}")
        } else {
            vm.load_class(&class_name)?;
            format!("[L{class_name};")
        };
        let array = vm.new_zeroed_array(&descriptor, count)?;
        self.push(Value::ObjectRef(array))
    }

    /// `multianewarray`. A zero count cuts the rank at its dimension, so
    /// `new int[4][0][3]` yields an `int[4]`.
    pub(crate) fn exec_multianewarray(
        &mut self,
        vm: &mut VirtualMachine,
        opcode: &str,
        index: u16,
        dimensions: u8,
    ) -> InvokeResult<()> {
        let descriptor = self.constant_pool.get_class_name(opcode, index)?.to_string();
        let dimensions = dimensions as usize;
        let depth = descriptor.chars().take_while(|c| *c == '[').count();
        if dimensions == 0 || dimensions > depth {
            return Err(MethodCallError::InternalError(verify_error!(
                "{opcode}: {dimensions} dimensions for {descriptor}"
            )));
        }
        let mut counts = Vec::with_capacity(dimensions);
        for (position, value) in self.op_stack.pop_n(dimensions)?.into_iter().enumerate() {
            match value {
                Value::Int(count) if count < 0 => return Err(negative_size(count)),
                Value::Int(count) => counts.push(count),
                other => {
                    return Err(MethodCallError::InternalError(verify_error!(
                        "{opcode}: dimension {position} expected Int, found {}",
                        other.kind_name()
                    )))
                }
            }
        }
        let element = &descriptor[depth..];
        if let Some(class_name) = element.strip_prefix('L').and_then(|c| c.strip_suffix(';')) {
            vm.load_class(class_name)?;
        }
        let (descriptor, counts) = match counts.iter().position(|count| *count == 0) {
            Some(0) => (descriptor.as_str(), &counts[..1]),
            // drop the dimensions below the empty one
            Some(zero) => (&descriptor[dimensions - zero..], &counts[..zero]),
            None => (descriptor.as_str(), &counts[..]),
        };
        if !vm.object_heap.has_room_for(total_elements(counts)) {
            return Err(out_of_memory());
        }
        let array = build_multi_array(vm, descriptor, counts)?;
        self.push(Value::ObjectRef(array))
    }

    pub(crate) fn exec_arraylength(&mut self, vm: &mut VirtualMachine, opcode: &str) -> InvokeResult<()> {
        let array_ref = self.pop_object(opcode)?;
        let length = vm.object_heap.array(array_ref)?.len();
        self.push(Value::Int(length as i32))
    }

    // element descriptor of the array, which must be one of `components`
    fn array_component<'a>(
        vm: &'a VirtualMachine,
        opcode: &str,
        array_ref: ObjectRef,
        components: &str,
    ) -> InvokeResult<&'a str> {
        let class_name = vm.class_name_of(array_ref)?;
        match class_name.strip_prefix('[') {
            Some(component) if component.starts_with(|c| components.contains(c)) => Ok(component),
            _ => Err(MethodCallError::InternalError(verify_error!(
                "{opcode}: expected array of {components}, found {class_name}"
            ))),
        }
    }

    fn check_index(opcode: &str, length: usize, index: i32) -> InvokeResult<usize> {
        if index < 0 || index as usize >= length {
            return Err(MethodCallError::java(
                JavaExceptionKind::ArrayIndexOutOfBoundsException,
                format!("{opcode}: array length is {length} but array index is {index}"),
            ));
        }
        Ok(index as usize)
    }

    pub(crate) fn exec_array_load(
        &mut self,
        vm: &mut VirtualMachine,
        opcode: &str,
        components: &str,
    ) -> InvokeResult<()> {
        let index = self.pop_int(opcode)?;
        let array_ref = self.pop_object(opcode)?;
        Self::array_component(vm, opcode, array_ref, components)?;
        let array = vm.object_heap.array(array_ref)?;
        let index = Self::check_index(opcode, array.len(), index)?;
        let value = array.get(index).ok_or_else(|| {
            MethodCallError::InternalError(verify_error!("{opcode}: no element {index}"))
        })?;
        self.push(value)
    }

    pub(crate) fn exec_array_store(
        &mut self,
        vm: &mut VirtualMachine,
        opcode: &str,
        components: &str,
    ) -> InvokeResult<()> {
        let value = self.pop()?;
        let index = self.pop_int(opcode)?;
        let array_ref = self.pop_object(opcode)?;
        let component = Self::array_component(vm, opcode, array_ref, components)?;
        let index = Self::check_index(opcode, vm.object_heap.array(array_ref)?.len(), index)?;
        let value = match (component.as_bytes()[0], value) {
            (b'Z', Value::Int(v)) => Value::Int(v & 1),
            (b'B', Value::Int(v)) => Value::Int(narrow_to_byte(v)),
            (b'C', Value::Int(v)) => Value::Int(narrow_to_char(v)),
            (b'S', Value::Int(v)) => Value::Int(narrow_to_short(v)),
            (b'L' | b'[', Value::ObjectRef(element)) => {
                let element_class = vm.class_name_of(element)?;
                let array_class = vm.class_name_of(array_ref)?;
                let accepted = array_component_class(array_class)
                    .map_or(false, |target| vm.method_area.is_assignable(element_class, target));
                if !accepted {
                    return Err(MethodCallError::java(
                        JavaExceptionKind::ArrayStoreException,
                        java_name(element_class),
                    ));
                }
                value
            }
            (_, value) => value,
        };
        vm.object_heap.array_mut(array_ref)?.set(index, value)?;
        Ok(())
    }
}
