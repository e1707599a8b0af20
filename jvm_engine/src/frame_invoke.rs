use crate::descriptor::MethodDescriptor;
use crate::java_exception::{InvokeResult, JavaExceptionKind, MethodCallError};
use crate::jvm_error::verify_error;
use crate::jvm_values::Value;
use crate::method_area::MethodEntry;
use crate::runtime_constant_pool::MemberFlags;
use crate::stack_frame::{narrow_to_type, InstructionResult, StackFrame};
use crate::virtual_machine::VirtualMachine;
use log::debug;

/// How an invoke instruction picks the method to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InvokeKind {
    Static,
    // constructors, private and super calls: no dynamic dispatch
    Special,
    Virtual,
    Interface,
}

impl InvokeKind {
    fn is_static(self) -> bool {
        self == InvokeKind::Static
    }

    fn dispatches(self) -> bool {
        matches!(self, InvokeKind::Virtual | InvokeKind::Interface)
    }
}

impl StackFrame {
    pub(crate) fn exec_invoke(
        &mut self,
        vm: &mut VirtualMachine,
        opcode: &str,
        kind: InvokeKind,
        index: u16,
    ) -> InvokeResult<InstructionResult> {
        let member = self.constant_pool.get_method_ref(opcode, index, &mut vm.strings)?;
        let mut class_name = vm.strings.get(member.class_name).to_string();
        // methods of arrays are those of Object
        if class_name.starts_with('[') {
            class_name = "java/lang/Object".to_string();
        }
        let class_id = vm.load_class(&class_name)?;
        if kind.is_static() {
            // arguments stay on the stack until the class is initialized
            if let Some(frame) = vm.initialize_class(class_id, self.thread_id)? {
                return Ok(InstructionResult::InitializeClass(frame));
            }
        }

        let signature = MethodDescriptor::parse(&member.descriptor)?;
        let mut args = self.op_stack.pop_n(signature.parameter_count())?;
        for (position, (parameter, value)) in signature.parameters.iter().zip(args.iter_mut()).enumerate() {
            if !parameter.accepts(value) {
                return Err(MethodCallError::InternalError(verify_error!(
                    "{opcode}: argument {position} of {class_name}.{}{} is {parameter}, found {}",
                    member.name,
                    member.descriptor,
                    value.kind_name()
                )));
            }
            *value = narrow_to_type(parameter, *value);
        }

        let mut target_class = class_id;
        if !kind.is_static() {
            let receiver = self.pop_object(opcode)?;
            if kind.dispatches() {
                let runtime_class = vm.class_name_of(receiver)?.to_string();
                if !runtime_class.starts_with('[') {
                    target_class = vm.load_class(&runtime_class)?;
                }
            }
            args.insert(0, Value::ObjectRef(receiver));
        }

        let entry = vm.resolve_method(target_class, &member.name, &member.descriptor)?;
        if let Some(is_static) = entry.is_static() {
            if is_static != kind.is_static() {
                return Err(MethodCallError::java(
                    JavaExceptionKind::IncompatibleClassChangeError,
                    format!(
                        "Expecting {} method {class_name}.{}{}",
                        if kind.is_static() { "static" } else { "non-static" },
                        member.name,
                        member.descriptor
                    ),
                ));
            }
        }
        let mut flags = MemberFlags::empty();
        flags.set(MemberFlags::STATIC, kind.is_static());
        flags.set(MemberFlags::INTRINSIC, entry.is_intrinsic());
        member.record_flags(flags);

        match entry {
            MethodEntry::Intrinsic(native) => {
                debug!("intrinsic {class_name}.{}{}", member.name, member.descriptor);
                let result = native(vm, args).map_err(MethodCallError::from)?;
                match (&signature.return_type, result) {
                    (None, None) => {}
                    (Some(return_type), Some(value)) if return_type.accepts(&value) => {
                        self.push(narrow_to_type(return_type, value))?
                    }
                    (_, result) => {
                        return Err(MethodCallError::java(
                            JavaExceptionKind::NativeMethodException,
                            format!(
                                "{class_name}.{}{} returned {}",
                                member.name,
                                member.descriptor,
                                result.map_or("nothing", |v| v.kind_name())
                            ),
                        ))
                    }
                }
                Ok(InstructionResult::Continue)
            }
            MethodEntry::Bytecode { class, method } => Ok(InstructionResult::Invoke(
                StackFrame::new(vm, class, method, args, self.thread_id)?,
            )),
        }
    }
}
