use crate::jvm_error::{verify_error, VmError, VmExecResult};
use crate::string_pool::{StringIndex, StringPool};
use bitflags::bitflags;
use class_file_reader::class_file_error::ClassFileError;
use class_file_reader::constant_pool::{
    ConstantPool, ConstantPoolEntry, ConstantPoolPhysicalEntry,
};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

//https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-5.html#jvms-5.4.3.5
#[derive(Debug, PartialEq, Eq)]
pub enum MethodHandlerKind {
    GetField,
    GetStatic,
    PutField,
    PutStatic,
    InvokeVirtual,
    InvokeStatic,
    InvokeSpecial,
    NewInvokeSpecial,
    InvokeInterface,
}

impl MethodHandlerKind {
    pub fn new(kind: u8) -> VmExecResult<MethodHandlerKind> {
        match kind {
            1 => Ok(MethodHandlerKind::GetField),
            2 => Ok(MethodHandlerKind::GetStatic),
            3 => Ok(MethodHandlerKind::PutField),
            4 => Ok(MethodHandlerKind::PutStatic),
            5 => Ok(MethodHandlerKind::InvokeVirtual),
            6 => Ok(MethodHandlerKind::InvokeStatic),
            7 => Ok(MethodHandlerKind::InvokeSpecial),
            8 => Ok(MethodHandlerKind::NewInvokeSpecial),
            9 => Ok(MethodHandlerKind::InvokeInterface),
            _ => Err(VmError::from(ClassFileError::InvalidMethodHandlerKind(kind))),
        }
    }
}

impl Display for MethodHandlerKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            MethodHandlerKind::GetField => write!(f, "getfield C.f:T"),
            MethodHandlerKind::GetStatic => write!(f, "getstatic C.f:T"),
            MethodHandlerKind::PutField => write!(f, "putfield C.f:T"),
            MethodHandlerKind::PutStatic => write!(f, "putstatic C.f:T"),
            MethodHandlerKind::InvokeVirtual => write!(f, "invokevirtual C.m:(A*)T"),
            MethodHandlerKind::InvokeStatic => write!(f, "invokestatic C.m:(A*)T"),
            MethodHandlerKind::InvokeSpecial => write!(f, "invokespecial C.m:(A*)T"),
            MethodHandlerKind::NewInvokeSpecial => {
                write!(f, "new C; dup; invokespecial C.<init>:(A*)V")
            }
            MethodHandlerKind::InvokeInterface => write!(f, "invokeinterface C.m:(A*)T"),
        }
    }
}

/// Constant pool entry with every symbolic reference resolved to its strings.
#[derive(Debug, PartialEq)]
pub enum RuntimeConstantPoolEntry {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    ClassReference(String),
    StringReference(String),
    // class_name, field_name, field_descriptor
    FieldReference(String, String, String),
    // class_name, method_name, method_descriptor
    MethodReference(String, String, String),
    // interface_name, method_name, method_descriptor
    InterfaceMethodReference(String, String, String),
    // name, descriptor
    NameAndTypeDescriptor(String, String),
    MethodHandler(MethodHandlerKind, String, String, String),
    MethodType(String),
    // bootstrap_method_attr_index, name, descriptor
    Dynamic(u16, String, String),
    InvokeDynamic(u16, String, String),
    Module(String),
    Package(String),
}

impl RuntimeConstantPoolEntry {
    pub fn kind_name(&self) -> &'static str {
        match self {
            RuntimeConstantPoolEntry::Utf8(_) => "Utf8",
            RuntimeConstantPoolEntry::Integer(_) => "Integer",
            RuntimeConstantPoolEntry::Float(_) => "Float",
            RuntimeConstantPoolEntry::Long(_) => "Long",
            RuntimeConstantPoolEntry::Double(_) => "Double",
            RuntimeConstantPoolEntry::ClassReference(_) => "Class",
            RuntimeConstantPoolEntry::StringReference(_) => "String",
            RuntimeConstantPoolEntry::FieldReference(..) => "Fieldref",
            RuntimeConstantPoolEntry::MethodReference(..) => "Methodref",
            RuntimeConstantPoolEntry::InterfaceMethodReference(..) => "InterfaceMethodref",
            RuntimeConstantPoolEntry::NameAndTypeDescriptor(..) => "NameAndType",
            RuntimeConstantPoolEntry::MethodHandler(..) => "MethodHandle",
            RuntimeConstantPoolEntry::MethodType(_) => "MethodType",
            RuntimeConstantPoolEntry::Dynamic(..) => "Dynamic",
            RuntimeConstantPoolEntry::InvokeDynamic(..) => "InvokeDynamic",
            RuntimeConstantPoolEntry::Module(_) => "Module",
            RuntimeConstantPoolEntry::Package(_) => "Package",
        }
    }

    fn get_utf8_string(cp: &ConstantPool, offset: &u16) -> VmExecResult<String> {
        Ok(cp.get_string(offset)?)
    }

    fn get_class_name_string(cp: &ConstantPool, offset: &u16) -> VmExecResult<String> {
        Ok(cp.get_class_name(offset)?)
    }

    fn get_name_and_type_string(cp: &ConstantPool, offset: &u16) -> VmExecResult<(String, String)> {
        if let ConstantPoolEntry::NameAndTypeDescriptor(name_idx, type_idx) = cp.get(offset)? {
            Ok((
                Self::get_utf8_string(cp, name_idx)?,
                Self::get_utf8_string(cp, type_idx)?,
            ))
        } else {
            Err(VmError::ClassFormatError(format!(
                "expected NameAndType at index {offset}"
            )))
        }
    }

    fn get_member_strings(cp: &ConstantPool, offset: &u16) -> VmExecResult<(String, String, String)> {
        match cp.get(offset)? {
            ConstantPoolEntry::MethodReference(class_index, name_and_type_index)
            | ConstantPoolEntry::FieldReference(class_index, name_and_type_index)
            | ConstantPoolEntry::InterfaceMethodReference(class_index, name_and_type_index) => {
                let class_name = Self::get_class_name_string(cp, class_index)?;
                let (name, descriptor) = Self::get_name_and_type_string(cp, name_and_type_index)?;
                Ok((class_name, name, descriptor))
            }
            other => Err(VmError::ClassFormatError(format!(
                "expected a member reference at index {offset}, found {}",
                other.kind_name()
            ))),
        }
    }

    fn from(cp: &ConstantPool, entry: &ConstantPoolEntry) -> VmExecResult<RuntimeConstantPoolEntry> {
        let value = match entry {
            ConstantPoolEntry::Utf8(v) => RuntimeConstantPoolEntry::Utf8(v.clone()),
            ConstantPoolEntry::Integer(v) => RuntimeConstantPoolEntry::Integer(*v),
            ConstantPoolEntry::Float(v) => RuntimeConstantPoolEntry::Float(*v),
            ConstantPoolEntry::Long(v) => RuntimeConstantPoolEntry::Long(*v),
            ConstantPoolEntry::Double(v) => RuntimeConstantPoolEntry::Double(*v),
            ConstantPoolEntry::ClassReference(offset) => {
                RuntimeConstantPoolEntry::ClassReference(Self::get_utf8_string(cp, offset)?)
            }
            ConstantPoolEntry::StringReference(offset) => {
                RuntimeConstantPoolEntry::StringReference(Self::get_utf8_string(cp, offset)?)
            }
            ConstantPoolEntry::FieldReference(class_name_idx, name_type_index) => {
                let class_name = Self::get_class_name_string(cp, class_name_idx)?;
                let (name, descriptor) = Self::get_name_and_type_string(cp, name_type_index)?;
                RuntimeConstantPoolEntry::FieldReference(class_name, name, descriptor)
            }
            ConstantPoolEntry::MethodReference(class_name_idx, name_type_index) => {
                let class_name = Self::get_class_name_string(cp, class_name_idx)?;
                let (name, descriptor) = Self::get_name_and_type_string(cp, name_type_index)?;
                RuntimeConstantPoolEntry::MethodReference(class_name, name, descriptor)
            }
            ConstantPoolEntry::InterfaceMethodReference(interface_name_idx, name_type_index) => {
                let interface_name = Self::get_class_name_string(cp, interface_name_idx)?;
                let (name, descriptor) = Self::get_name_and_type_string(cp, name_type_index)?;
                RuntimeConstantPoolEntry::InterfaceMethodReference(interface_name, name, descriptor)
            }
            ConstantPoolEntry::NameAndTypeDescriptor(name_index, descriptor_index) => {
                RuntimeConstantPoolEntry::NameAndTypeDescriptor(
                    Self::get_utf8_string(cp, name_index)?,
                    Self::get_utf8_string(cp, descriptor_index)?,
                )
            }
            ConstantPoolEntry::MethodHandler(reference_kind, reference_index) => {
                let kind = MethodHandlerKind::new(*reference_kind)?;
                let (class_name, member_name, descriptor) =
                    Self::get_member_strings(cp, reference_index)?;
                RuntimeConstantPoolEntry::MethodHandler(kind, class_name, member_name, descriptor)
            }
            ConstantPoolEntry::MethodType(descriptor_index) => {
                RuntimeConstantPoolEntry::MethodType(Self::get_utf8_string(cp, descriptor_index)?)
            }
            ConstantPoolEntry::Dynamic(bootstrap_index, name_and_type_index) => {
                let (name, descriptor) = Self::get_name_and_type_string(cp, name_and_type_index)?;
                RuntimeConstantPoolEntry::Dynamic(*bootstrap_index, name, descriptor)
            }
            ConstantPoolEntry::InvokeDynamic(bootstrap_index, name_and_type_index) => {
                let (name, descriptor) = Self::get_name_and_type_string(cp, name_and_type_index)?;
                RuntimeConstantPoolEntry::InvokeDynamic(*bootstrap_index, name, descriptor)
            }
            ConstantPoolEntry::Module(name_index) => {
                RuntimeConstantPoolEntry::Module(Self::get_utf8_string(cp, name_index)?)
            }
            ConstantPoolEntry::Package(name_index) => {
                RuntimeConstantPoolEntry::Package(Self::get_utf8_string(cp, name_index)?)
            }
        };
        Ok(value)
    }
}

#[derive(Debug)]
pub enum RuntimeConstantPoolPhysicalEntry {
    Entry(RuntimeConstantPoolEntry),
    PlaceHolder,
}

bitflags! {
    /// What resolution learnt about a field or method reference.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MemberFlags: u8 {
        const STATIC = 0x01;
        const FINAL = 0x02;
        const INTRINSIC = 0x04;
        const RESOLVED = 0x80;
    }
}

/// A field or method reference, parsed once and cached per constant pool slot.
#[derive(Debug)]
pub struct ResolvedMember {
    pub class_name: StringIndex,
    pub name: String,
    pub descriptor: String,
    pub flags: Cell<MemberFlags>,
}

impl ResolvedMember {
    pub fn is_resolved(&self) -> bool {
        self.flags.get().contains(MemberFlags::RESOLVED)
    }

    pub fn is_static(&self) -> bool {
        self.flags.get().contains(MemberFlags::STATIC)
    }

    pub fn is_final(&self) -> bool {
        self.flags.get().contains(MemberFlags::FINAL)
    }

    pub fn record_flags(&self, flags: MemberFlags) {
        self.flags.set(flags | MemberFlags::RESOLVED);
    }
}

/// Run-time constant pool of one class.
/// https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-5.html#jvms-5.1
///
/// Every lookup names the instruction that asked for it so that a wrong entry
/// kind surfaces as a `VerifyError` pointing at that instruction.
#[derive(Debug, Default)]
pub struct RuntimeConstantPool {
    entries: Vec<RuntimeConstantPoolPhysicalEntry>,
    members: RefCell<HashMap<u16, Rc<ResolvedMember>>>,
}

impl RuntimeConstantPool {
    pub fn empty() -> RuntimeConstantPool {
        RuntimeConstantPool::default()
    }

    pub fn from(cp: &ConstantPool) -> VmExecResult<RuntimeConstantPool> {
        let mut runtime_cp = Self::empty();
        for entry in &cp.entries {
            let runtime_entry = match entry {
                ConstantPoolPhysicalEntry::Entry(e) => {
                    RuntimeConstantPoolPhysicalEntry::Entry(RuntimeConstantPoolEntry::from(cp, e)?)
                }
                ConstantPoolPhysicalEntry::PlaceHolder => {
                    RuntimeConstantPoolPhysicalEntry::PlaceHolder
                }
            };
            runtime_cp.entries.push(runtime_entry);
        }
        Ok(runtime_cp)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn try_get(&self, index: u16) -> Option<&RuntimeConstantPoolEntry> {
        let offset = index.checked_sub(1)? as usize;
        match self.entries.get(offset)? {
            RuntimeConstantPoolPhysicalEntry::Entry(entry) => Some(entry),
            RuntimeConstantPoolPhysicalEntry::PlaceHolder => None,
        }
    }

    pub fn get(&self, opcode: &str, index: u16) -> VmExecResult<&RuntimeConstantPoolEntry> {
        self.try_get(index)
            .ok_or_else(|| verify_error!("{opcode}: invalid constant pool index {index}"))
    }

    fn mismatch(opcode: &str, expected: &str, index: u16, found: &RuntimeConstantPoolEntry) -> VmError {
        verify_error!(
            "{opcode}: expected {expected} at index {index}, found {}",
            found.kind_name()
        )
    }

    pub fn get_utf8_string(&self, opcode: &str, index: u16) -> VmExecResult<&str> {
        match self.get(opcode, index)? {
            RuntimeConstantPoolEntry::Utf8(value) => Ok(value),
            other => Err(Self::mismatch(opcode, "Utf8", index, other)),
        }
    }

    pub fn get_class_name(&self, opcode: &str, index: u16) -> VmExecResult<&str> {
        match self.get(opcode, index)? {
            RuntimeConstantPoolEntry::ClassReference(class_name) => Ok(class_name),
            other => Err(Self::mismatch(opcode, "Class", index, other)),
        }
    }

    /// Field reference for `getfield`, `putfield`, `getstatic` and `putstatic`.
    pub fn get_field_ref(
        &self,
        opcode: &str,
        index: u16,
        strings: &mut StringPool,
    ) -> VmExecResult<Rc<ResolvedMember>> {
        self.get_member(opcode, index, strings, |entry| {
            matches!(entry, RuntimeConstantPoolEntry::FieldReference(..))
        }, "Fieldref")
    }

    /// Method reference for the invoke instructions. `invokeinterface` only
    /// accepts interface method references; the others accept both kinds.
    pub fn get_method_ref(
        &self,
        opcode: &str,
        index: u16,
        strings: &mut StringPool,
    ) -> VmExecResult<Rc<ResolvedMember>> {
        if opcode == "invokeinterface" {
            return self.get_member(opcode, index, strings, |entry| {
                matches!(entry, RuntimeConstantPoolEntry::InterfaceMethodReference(..))
            }, "InterfaceMethodref");
        }
        self.get_member(opcode, index, strings, |entry| {
            matches!(
                entry,
                RuntimeConstantPoolEntry::MethodReference(..)
                    | RuntimeConstantPoolEntry::InterfaceMethodReference(..)
            )
        }, "Methodref")
    }

    fn get_member<F>(
        &self,
        opcode: &str,
        index: u16,
        strings: &mut StringPool,
        accepts: F,
        expected: &str,
    ) -> VmExecResult<Rc<ResolvedMember>>
    where
        F: FnOnce(&RuntimeConstantPoolEntry) -> bool,
    {
        let entry = self.get(opcode, index)?;
        if !accepts(entry) {
            return Err(Self::mismatch(opcode, expected, index, entry));
        }
        if let Some(member) = self.members.borrow().get(&index) {
            return Ok(member.clone());
        }
        let member = match entry {
            RuntimeConstantPoolEntry::FieldReference(class_name, name, descriptor)
            | RuntimeConstantPoolEntry::MethodReference(class_name, name, descriptor)
            | RuntimeConstantPoolEntry::InterfaceMethodReference(class_name, name, descriptor) => {
                Rc::new(ResolvedMember {
                    class_name: strings.intern(class_name),
                    name: name.clone(),
                    descriptor: descriptor.clone(),
                    flags: Cell::new(MemberFlags::empty()),
                })
            }
            other => return Err(Self::mismatch(opcode, expected, index, other)),
        };
        self.members.borrow_mut().insert(index, member.clone());
        Ok(member)
    }

    #[cfg(test)]
    pub(crate) fn cached_members(&self) -> usize {
        self.members.borrow().len()
    }
}
