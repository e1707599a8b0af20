use crate::descriptor::{java_name, FieldType};
use crate::java_exception::{InvokeResult, JavaExceptionKind, MethodCallError};
use crate::jvm_error::verify_error;
use crate::jvm_values::Value;
use crate::loaded_class::ClassId;
use crate::runtime_constant_pool::{MemberFlags, RuntimeConstantPoolEntry};
use crate::stack_frame::{narrow_to_type, InstructionResult, StackFrame};
use crate::virtual_machine::VirtualMachine;

// a resolved field reference
struct FieldTarget {
    declaring_class: ClassId,
    class_name: String,
    name: String,
    field_type: FieldType,
}

impl StackFrame {
    fn resolve_field_ref(
        &self,
        vm: &mut VirtualMachine,
        opcode: &str,
        index: u16,
        expect_static: bool,
    ) -> InvokeResult<FieldTarget> {
        let member = self.constant_pool.get_field_ref(opcode, index, &mut vm.strings)?;
        let class_name = vm.strings.get(member.class_name).to_string();
        let class_id = vm.load_class(&class_name)?;
        let (declaring_class, field) = vm.method_area.resolve_field(class_id, &member.name)?;
        let (is_static, is_final) = (field.is_static(), field.is_final());
        let field_type = field.field_type.clone();
        if is_static != expect_static {
            return Err(MethodCallError::java(
                JavaExceptionKind::IncompatibleClassChangeError,
                format!(
                    "Expected {} field {}.{}",
                    if expect_static { "static" } else { "non-static" },
                    java_name(&class_name),
                    member.name
                ),
            ));
        }
        let mut flags = MemberFlags::empty();
        flags.set(MemberFlags::STATIC, is_static);
        flags.set(MemberFlags::FINAL, is_final);
        member.record_flags(flags);
        Ok(FieldTarget {
            declaring_class,
            class_name,
            name: member.name.clone(),
            field_type,
        })
    }

    fn check_field_value(opcode: &str, target: &FieldTarget, value: Value) -> InvokeResult<Value> {
        if !target.field_type.accepts(&value) {
            return Err(MethodCallError::InternalError(verify_error!(
                "{opcode}: field {}.{} is {}, found {}",
                target.class_name,
                target.name,
                target.field_type,
                value.kind_name()
            )));
        }
        Ok(narrow_to_type(&target.field_type, value))
    }

    pub(crate) fn exec_getstatic(
        &mut self,
        vm: &mut VirtualMachine,
        opcode: &str,
        index: u16,
    ) -> InvokeResult<InstructionResult> {
        let target = self.resolve_field_ref(vm, opcode, index, true)?;
        if let Some(frame) = vm.initialize_class(target.declaring_class, self.thread_id)? {
            return Ok(InstructionResult::InitializeClass(frame));
        }
        let value = vm
            .get_static_field(target.declaring_class, &target.name)
            .unwrap_or_else(|| target.field_type.default_value());
        self.push(value)?;
        Ok(InstructionResult::Continue)
    }

    pub(crate) fn exec_putstatic(
        &mut self,
        vm: &mut VirtualMachine,
        opcode: &str,
        index: u16,
    ) -> InvokeResult<InstructionResult> {
        let target = self.resolve_field_ref(vm, opcode, index, true)?;
        // the value stays on the stack until the class is initialized
        if let Some(frame) = vm.initialize_class(target.declaring_class, self.thread_id)? {
            return Ok(InstructionResult::InitializeClass(frame));
        }
        let value = self.pop()?;
        let value = Self::check_field_value(opcode, &target, value)?;
        vm.set_static_field(target.declaring_class, &target.name, value);
        Ok(InstructionResult::Continue)
    }

    pub(crate) fn exec_getfield(&mut self, vm: &mut VirtualMachine, opcode: &str, index: u16) -> InvokeResult<()> {
        let target = self.resolve_field_ref(vm, opcode, index, false)?;
        let object_ref = self.pop_object(opcode)?;
        let value = vm
            .object_heap
            .get(object_ref)?
            .field_value(&target.name)
            .ok_or_else(|| {
                MethodCallError::java(
                    JavaExceptionKind::NoSuchFieldError,
                    format!("{}.{}", target.class_name, target.name),
                )
            })?;
        self.push(value)
    }

    pub(crate) fn exec_putfield(&mut self, vm: &mut VirtualMachine, opcode: &str, index: u16) -> InvokeResult<()> {
        let target = self.resolve_field_ref(vm, opcode, index, false)?;
        let value = self.pop()?;
        let object_ref = self.pop_object(opcode)?;
        let value = Self::check_field_value(opcode, &target, value)?;
        if !vm.object_heap.get_mut(object_ref)?.set_field_value(&target.name, value) {
            return Err(MethodCallError::java(
                JavaExceptionKind::NoSuchFieldError,
                format!("{}.{}", target.class_name, target.name),
            ));
        }
        Ok(())
    }

    pub(crate) fn exec_new(
        &mut self,
        vm: &mut VirtualMachine,
        opcode: &str,
        index: u16,
    ) -> InvokeResult<InstructionResult> {
        let class_name = self.constant_pool.get_class_name(opcode, index)?.to_string();
        let class_id = vm.load_class(&class_name)?;
        let class = vm.method_area.class(class_id);
        if class.is_interface() || class.is_abstract() {
            return Err(MethodCallError::java(
                JavaExceptionKind::InstantiationError,
                java_name(&class_name),
            ));
        }
        if let Some(frame) = vm.initialize_class(class_id, self.thread_id)? {
            return Ok(InstructionResult::InitializeClass(frame));
        }
        let object_ref = vm.new_object(class_id)?;
        self.push(Value::ObjectRef(object_ref))?;
        Ok(InstructionResult::Continue)
    }

    /// `ldc` and `ldc_w`: int, float, string or class constants.
    pub(crate) fn exec_ldc(&mut self, vm: &mut VirtualMachine, opcode: &str, index: u16) -> InvokeResult<()> {
        let constant_pool = self.constant_pool.clone();
        let value = match constant_pool.get(opcode, index)? {
            RuntimeConstantPoolEntry::Integer(v) => Value::Int(*v),
            RuntimeConstantPoolEntry::Float(v) => Value::Float(*v),
            RuntimeConstantPoolEntry::StringReference(v) => Value::ObjectRef(vm.intern_string(v)?),
            RuntimeConstantPoolEntry::ClassReference(name) => {
                if !name.starts_with('[') {
                    vm.load_class(name)?;
                }
                Value::ObjectRef(vm.class_object(name)?)
            }
            other => {
                return Err(MethodCallError::InternalError(verify_error!(
                    "{opcode}: expected Integer, Float, String or Class at index {index}, found {}",
                    other.kind_name()
                )))
            }
        };
        self.push(value)
    }

    pub(crate) fn exec_ldc2_w(&mut self, opcode: &str, index: u16) -> InvokeResult<()> {
        let value = match self.constant_pool.get(opcode, index)? {
            RuntimeConstantPoolEntry::Long(v) => Value::Long(*v),
            RuntimeConstantPoolEntry::Double(v) => Value::Double(*v),
            other => {
                return Err(MethodCallError::InternalError(verify_error!(
                    "{opcode}: expected Long or Double at index {index}, found {}",
                    other.kind_name()
                )))
            }
        };
        self.push(value)
    }

    // class named by a checkcast or instanceof operand, loaded unless it is an array
    fn type_operand(&self, vm: &mut VirtualMachine, opcode: &str, index: u16) -> InvokeResult<String> {
        let class_name = self.constant_pool.get_class_name(opcode, index)?.to_string();
        if !class_name.starts_with('[') {
            vm.load_class(&class_name)?;
        }
        Ok(class_name)
    }

    pub(crate) fn exec_checkcast(&mut self, vm: &mut VirtualMachine, opcode: &str, index: u16) -> InvokeResult<()> {
        let object_ref = match self.op_stack.peek()? {
            Value::Null => return Ok(()),
            Value::ObjectRef(object_ref) => object_ref,
            other => {
                return Err(MethodCallError::InternalError(verify_error!(
                    "{opcode}: expected Reference, found {}",
                    other.kind_name()
                )))
            }
        };
        let target = self.type_operand(vm, opcode, index)?;
        if !vm.is_instance_of(object_ref, &target)? {
            return Err(MethodCallError::java(
                JavaExceptionKind::ClassCastException,
                format!(
                    "class {} cannot be cast to class {}",
                    java_name(vm.class_name_of(object_ref)?),
                    java_name(&target)
                ),
            ));
        }
        Ok(())
    }

    pub(crate) fn exec_instanceof(&mut self, vm: &mut VirtualMachine, opcode: &str, index: u16) -> InvokeResult<()> {
        let result = match self.pop_reference(opcode)? {
            None => false,
            Some(object_ref) => {
                let target = self.type_operand(vm, opcode, index)?;
                vm.is_instance_of(object_ref, &target)?
            }
        };
        self.push(Value::Int(result as i32))
    }

    pub(crate) fn exec_athrow(&mut self, vm: &mut VirtualMachine, opcode: &str) -> InvokeResult<InstructionResult> {
        let exception = self.pop_object(opcode)?;
        if !vm.is_instance_of(exception, "java/lang/Throwable")? {
            return Err(MethodCallError::InternalError(verify_error!(
                "{opcode}: {} is not a Throwable",
                vm.class_name_of(exception)?
            )));
        }
        Err(MethodCallError::ExceptionThrown(exception))
    }
}
