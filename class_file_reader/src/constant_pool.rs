use crate::cesu8_byte_buffer::ByteBuffer;
use crate::class_file_error::{ClassFileError, Result};
pub type ConstantPoolIndex = u16;
//https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.4
#[derive(Debug, PartialEq)]
pub enum ConstantPoolEntry {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    ClassReference(ConstantPoolIndex),
    StringReference(ConstantPoolIndex),
    FieldReference(ConstantPoolIndex, ConstantPoolIndex),
    MethodReference(ConstantPoolIndex, ConstantPoolIndex),
    InterfaceMethodReference(ConstantPoolIndex, ConstantPoolIndex),
    NameAndTypeDescriptor(ConstantPoolIndex, ConstantPoolIndex),
    MethodHandler(u8, ConstantPoolIndex),
    MethodType(ConstantPoolIndex),
    Dynamic(u16, ConstantPoolIndex),
    InvokeDynamic(u16, ConstantPoolIndex),
    Module(ConstantPoolIndex),
    Package(ConstantPoolIndex),
}
/// https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.4
/// ```c
/// cp_info {
///     u1 tag;
///     u1 info[];
/// }
/// ```
/// The tag selects the entry kind and the length of the info that follows.
impl ConstantPoolEntry {
    /// The JVM tag name of this entry, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            ConstantPoolEntry::Utf8(_) => "Utf8",
            ConstantPoolEntry::Integer(_) => "Integer",
            ConstantPoolEntry::Float(_) => "Float",
            ConstantPoolEntry::Long(_) => "Long",
            ConstantPoolEntry::Double(_) => "Double",
            ConstantPoolEntry::ClassReference(_) => "Class",
            ConstantPoolEntry::StringReference(_) => "String",
            ConstantPoolEntry::FieldReference(_, _) => "Fieldref",
            ConstantPoolEntry::MethodReference(_, _) => "Methodref",
            ConstantPoolEntry::InterfaceMethodReference(_, _) => "InterfaceMethodref",
            ConstantPoolEntry::NameAndTypeDescriptor(_, _) => "NameAndType",
            ConstantPoolEntry::MethodHandler(_, _) => "MethodHandle",
            ConstantPoolEntry::MethodType(_) => "MethodType",
            ConstantPoolEntry::Dynamic(_, _) => "Dynamic",
            ConstantPoolEntry::InvokeDynamic(_, _) => "InvokeDynamic",
            ConstantPoolEntry::Module(_) => "Module",
            ConstantPoolEntry::Package(_) => "Package",
        }
    }

    pub fn read_from_bytes(buffer: &mut ByteBuffer) -> Result<ConstantPoolEntry> {
        let flag = buffer.read_u8()?;
        match flag {
            1 => ConstantPoolEntry::read_utf8(buffer),
            3 => buffer.read_i32().map(ConstantPoolEntry::Integer),
            4 => buffer.read_f32().map(ConstantPoolEntry::Float),
            5 => buffer.read_i64().map(ConstantPoolEntry::Long),
            6 => buffer.read_f64().map(ConstantPoolEntry::Double),
            7 => buffer.read_u16().map(ConstantPoolEntry::ClassReference),
            8 => buffer.read_u16().map(ConstantPoolEntry::StringReference),
            9 => buffer
                .read_2_u16()
                .map(|(f1, f2)| ConstantPoolEntry::FieldReference(f1, f2)),
            10 => buffer
                .read_2_u16()
                .map(|(f1, f2)| ConstantPoolEntry::MethodReference(f1, f2)),
            11 => buffer
                .read_2_u16()
                .map(|(f1, f2)| ConstantPoolEntry::InterfaceMethodReference(f1, f2)),
            12 => buffer
                .read_2_u16()
                .map(|(f1, f2)| ConstantPoolEntry::NameAndTypeDescriptor(f1, f2)),
            15 => buffer
                .read_u8_u16()
                .map(|(f1, f2)| ConstantPoolEntry::MethodHandler(f1, f2)),
            16 => buffer.read_u16().map(ConstantPoolEntry::MethodType),
            17 => buffer
                .read_2_u16()
                .map(|(f1, f2)| ConstantPoolEntry::Dynamic(f1, f2)),
            18 => buffer
                .read_2_u16()
                .map(|(f1, f2)| ConstantPoolEntry::InvokeDynamic(f1, f2)),
            19 => buffer.read_u16().map(ConstantPoolEntry::Module),
            20 => buffer.read_u16().map(ConstantPoolEntry::Package),
            t => Err(ClassFileError::ConstantPoolTagNotSupport(t)),
        }
    }

    fn read_utf8(buffer: &mut ByteBuffer) -> Result<ConstantPoolEntry> {
        let length = buffer.read_u16()?;
        buffer
            .read_utf8(length as usize)
            .map(ConstantPoolEntry::Utf8)
    }
}

// long and double entries take two slots; the second is a placeholder
#[derive(Debug)]
pub enum ConstantPoolPhysicalEntry {
    Entry(ConstantPoolEntry),
    PlaceHolder,
}

/// Implementation of the constant pool of a java class.
/// Note that constants are 1-based in java.
#[derive(Debug, Default)]
pub struct ConstantPool {
    pub entries: Vec<ConstantPoolPhysicalEntry>,
}

impl ConstantPool {
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    pub fn new() -> ConstantPool {
        ConstantPool::default()
    }
    pub fn add(&mut self, entry: ConstantPoolEntry) {
        let take_two_words = matches!(
            &entry,
            ConstantPoolEntry::Long(_) | ConstantPoolEntry::Double(_)
        );
        self.entries.push(ConstantPoolPhysicalEntry::Entry(entry));
        if take_two_words {
            self.entries.push(ConstantPoolPhysicalEntry::PlaceHolder)
        }
    }
    pub fn try_get_string(&self, offset: &ConstantPoolIndex) -> Option<String> {
        if let Some(ConstantPoolEntry::Utf8(value)) = self.try_get(offset) {
            Some(value.clone())
        } else {
            None
        }
    }

    pub fn get_string(&self, offset: &ConstantPoolIndex) -> Result<String> {
        if let ConstantPoolEntry::Utf8(value) = self.get(offset)? {
            Ok(value.clone())
        } else {
            Err(ClassFileError::InvalidClassData(format!(
                "Should be utf8 String at {offset}"
            )))
        }
    }

    pub fn try_get_class_name(&self, offset: &ConstantPoolIndex) -> Option<String> {
        if let Some(ConstantPoolEntry::ClassReference(value)) = self.try_get(offset) {
            self.try_get_string(value)
        } else {
            None
        }
    }

    pub fn get_class_name(&self, offset: &ConstantPoolIndex) -> Result<String> {
        if let ConstantPoolEntry::ClassReference(value) = self.get(offset)? {
            self.get_string(value)
        } else {
            Err(ClassFileError::InvalidClassData(format!(
                "Should be class reference at {offset}"
            )))
        }
    }

    pub fn get(&self, offset: &ConstantPoolIndex) -> Result<&ConstantPoolEntry> {
        self.try_get(offset)
            .ok_or(ClassFileError::InvalidConstantPoolIndexError(*offset))
    }

    pub fn try_get(&self, offset: &ConstantPoolIndex) -> Option<&ConstantPoolEntry> {
        let index = offset.checked_sub(1)? as usize;
        match self.entries.get(index)? {
            ConstantPoolPhysicalEntry::Entry(e) => Some(e),
            ConstantPoolPhysicalEntry::PlaceHolder => None,
        }
    }
}
