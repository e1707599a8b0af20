use crate::jvm_error::{VmError, VmExecResult};
use crate::runtime_constant_pool::{RuntimeConstantPool, RuntimeConstantPoolEntry};
use class_file_reader::cesu8_byte_buffer::ByteBuffer;
use indexmap::IndexMap;
use std::fmt::{Display, Formatter};

///https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.7.2
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValueAttribute {
    Int(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    String(String),
}

pub(crate) fn get_attr_as_constant_value(
    value: &[u8],
    cp: &RuntimeConstantPool,
) -> VmExecResult<ConstantValueAttribute> {
    let mut buffer = ByteBuffer::new(value);
    let const_pool_index = buffer.read_u16()?;
    match cp.get("ConstantValue", const_pool_index)? {
        RuntimeConstantPoolEntry::Integer(v) => Ok(ConstantValueAttribute::Int(*v)),
        RuntimeConstantPoolEntry::Float(v) => Ok(ConstantValueAttribute::Float(*v)),
        RuntimeConstantPoolEntry::Long(v) => Ok(ConstantValueAttribute::Long(*v)),
        RuntimeConstantPoolEntry::Double(v) => Ok(ConstantValueAttribute::Double(*v)),
        RuntimeConstantPoolEntry::StringReference(v) => Ok(ConstantValueAttribute::String(v.clone())),
        other => Err(VmError::ClassFormatError(format!(
            "ConstantValue cannot refer to {}",
            other.kind_name()
        ))),
    }
}

impl Display for ConstantValueAttribute {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConstantValueAttribute::Int(v) => write!(f, "ConstantValue=>Int:{v}"),
            ConstantValueAttribute::Float(v) => write!(f, "ConstantValue=>Float:{v}"),
            ConstantValueAttribute::Long(v) => write!(f, "ConstantValue=>Long:{v}"),
            ConstantValueAttribute::Double(v) => write!(f, "ConstantValue=>Double:{v}"),
            ConstantValueAttribute::String(v) => write!(f, "ConstantValue=>String:{v}"),
        }
    }
}

///
/// ```c
/// Code_attribute {
///     u2 attribute_name_index;
///     u4 attribute_length;
///
///     u2 max_stack;
///     u2 max_locals;
///     u4 code_length;
///     u1 code[code_length];
///     u2 exception_table_length;
///     {   u2 start_pc;
///         u2 end_pc;
///         u2 handler_pc;
///         u2 catch_type;
///     } exception_table[exception_table_length];
///     u2 attributes_count;
///     attribute_info attributes[attributes_count];
/// }
/// ```
/// Only `LineNumberTable` is kept from the nested attributes.
#[derive(Debug)]
pub struct CodeAttribute {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
    pub exception_table: Vec<ExceptionTable>,
    //start_pc -> line number
    pub line_number_table: IndexMap<u16, u16>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExceptionTable {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    // None catches everything (finally blocks)
    pub catch_type: Option<String>,
}

impl ExceptionTable {
    pub fn covers(&self, pc: usize) -> bool {
        (self.start_pc as usize) <= pc && pc < (self.end_pc as usize)
    }
}

impl CodeAttribute {
    /// Source line of the instruction at `pc`, 0 when unknown.
    pub fn line_number(&self, pc: usize) -> u16 {
        let mut current_line_number: u16 = 0;
        for (start, line_number) in self.line_number_table.iter() {
            if (*start as usize) <= pc {
                current_line_number = *line_number
            } else {
                break;
            }
        }
        current_line_number
    }
}

pub(crate) fn get_attr_as_code(value: &[u8], cp: &RuntimeConstantPool) -> VmExecResult<CodeAttribute> {
    let mut buffer = ByteBuffer::new(value);
    let max_stack = buffer.read_u16()?;
    let max_locals = buffer.read_u16()?;
    let code_length = buffer.read_u32()?;
    let code = buffer.read_bytes(code_length as usize)?;
    let exception_table_length = buffer.read_u16()?;
    let mut exception_table = Vec::new();

    for _ in 0..exception_table_length {
        let start_pc = buffer.read_u16()?;
        let end_pc = buffer.read_u16()?;
        let handler_pc = buffer.read_u16()?;
        let catch_type_index = buffer.read_u16()?;
        let catch_type = if catch_type_index == 0 {
            None
        } else {
            Some(cp.get_class_name("Code", catch_type_index)?.to_string())
        };
        exception_table.push(ExceptionTable {
            start_pc,
            end_pc,
            handler_pc,
            catch_type,
        });
    }
    let attributes_count = buffer.read_u16()?;
    let mut line_number_table = IndexMap::new();
    for _ in 0..attributes_count {
        let attribute_name_index = buffer.read_u16()?;
        let attribute_length = buffer.read_u32()?;
        let attribute_bytes = buffer.read_bytes(attribute_length as usize)?;
        if cp.get_utf8_string("Code", attribute_name_index)? == "LineNumberTable" {
            let mut line_number_reader = ByteBuffer::new(attribute_bytes);
            let line_number_table_length = line_number_reader.read_u16()?;
            for _ in 0..line_number_table_length {
                let start_pc = line_number_reader.read_u16()?;
                let line_number = line_number_reader.read_u16()?;
                line_number_table.insert(start_pc, line_number);
            }
        }
    }
    line_number_table.sort_keys();
    Ok(CodeAttribute {
        max_stack,
        max_locals,
        code: Vec::from(code),
        exception_table,
        line_number_table,
    })
}
