use crate::descriptor::FieldType;
use crate::jvm_error::VmExecResult;
use crate::runtime_attribute_info::{get_attr_as_constant_value, ConstantValueAttribute};
use crate::runtime_constant_pool::RuntimeConstantPool;
use class_file_reader::attribute_info::AttributeType;
use class_file_reader::field_info::{FieldAccessFlags, FieldInfo};

#[derive(Debug, Clone)]
pub struct RuntimeFieldInfo {
    pub access_flags: FieldAccessFlags,
    pub name: String,
    pub descriptor: String,
    pub field_type: FieldType,
    pub constant_value: Option<ConstantValueAttribute>,
}

impl RuntimeFieldInfo {
    pub fn from(field_info: FieldInfo, cp: &RuntimeConstantPool) -> VmExecResult<RuntimeFieldInfo> {
        let mut constant_value: Option<ConstantValueAttribute> = None;
        for attr in &field_info.attributes {
            if let AttributeType::ConstantValue = attr.name {
                constant_value = Some(get_attr_as_constant_value(&attr.info, cp)?)
            }
        }
        Ok(RuntimeFieldInfo {
            access_flags: field_info.access_flags,
            field_type: FieldType::parse(&field_info.descriptor)?,
            name: field_info.name,
            descriptor: field_info.descriptor,
            constant_value,
        })
    }

    /// Field of a built-in class that has no class file behind it.
    pub(crate) fn synthetic(
        name: &str,
        descriptor: &str,
        access_flags: FieldAccessFlags,
    ) -> VmExecResult<RuntimeFieldInfo> {
        Ok(RuntimeFieldInfo {
            access_flags,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            field_type: FieldType::parse(descriptor)?,
            constant_value: None,
        })
    }

    pub fn is_static(&self) -> bool {
        self.access_flags.contains(FieldAccessFlags::STATIC)
    }

    pub fn is_final(&self) -> bool {
        self.access_flags.contains(FieldAccessFlags::FINAL)
    }
}
