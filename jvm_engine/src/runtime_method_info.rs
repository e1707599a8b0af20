use crate::descriptor::MethodDescriptor;
use crate::jvm_error::{VmError, VmExecResult};
use crate::runtime_attribute_info::{get_attr_as_code, CodeAttribute};
use crate::runtime_constant_pool::RuntimeConstantPool;
use class_file_reader::attribute_info::AttributeType;
use class_file_reader::instruction::check_code;
use class_file_reader::method_info::{MethodAccessFlags, MethodInfo};
use std::rc::Rc;

#[derive(Debug)]
pub struct RuntimeMethodInfo {
    pub access_flags: MethodAccessFlags,
    pub name: String,
    pub descriptor: String,
    pub signature: MethodDescriptor,
    // native and abstract methods have no code
    pub code: Option<Rc<CodeAttribute>>,
}

impl RuntimeMethodInfo {
    pub fn is_native(&self) -> bool {
        self.access_flags.contains(MethodAccessFlags::NATIVE)
    }

    pub fn is_static(&self) -> bool {
        self.access_flags.contains(MethodAccessFlags::STATIC)
    }

    pub fn is_final(&self) -> bool {
        self.access_flags.contains(MethodAccessFlags::FINAL)
    }

    pub fn is_abstract(&self) -> bool {
        self.access_flags.contains(MethodAccessFlags::ABSTRACT)
    }

    /// `name(descriptor)`, the key inside a class.
    pub fn key(&self) -> String {
        method_key(&self.name, &self.descriptor)
    }

    /// Reads the method and rejects bytecode with unknown opcodes.
    pub fn from(method_info: MethodInfo, cp: &RuntimeConstantPool) -> VmExecResult<RuntimeMethodInfo> {
        let mut code = None;
        for attr in &method_info.attributes {
            if let AttributeType::Code = attr.name {
                let code_attribute = get_attr_as_code(&attr.info, cp)?;
                check_code(&code_attribute.code).map_err(|e| {
                    VmError::ClassFormatError(format!(
                        "{}{}: {e}",
                        method_info.name, method_info.descriptor
                    ))
                })?;
                code = Some(Rc::new(code_attribute));
            }
        }
        Ok(RuntimeMethodInfo {
            access_flags: method_info.access_flags,
            signature: MethodDescriptor::parse(&method_info.descriptor)?,
            name: method_info.name,
            descriptor: method_info.descriptor,
            code,
        })
    }
}

pub fn method_key(name: &str, descriptor: &str) -> String {
    format!("{name}{descriptor}")
}
