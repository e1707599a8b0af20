use crate::runtime_constant_pool::RuntimeConstantPool;
use crate::runtime_field_info::RuntimeFieldInfo;
use crate::runtime_method_info::{method_key, RuntimeMethodInfo};
use crate::string_pool::StringIndex;
use class_file_reader::class_file::ClassAccessFlags;
use indexmap::IndexMap;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

/// Index of a class in the method area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassId(pub(crate) usize);

impl Display for ClassId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "class#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassStatus {
    Loaded,
    Linked,
    Initializing,
    Initialized,
}

/// A loaded class. Loading resolves the superclass and interfaces; static
/// initialization happens on first active use.
#[derive(Debug)]
pub struct Class {
    pub status: ClassStatus,
    pub name: String,
    pub name_index: StringIndex,
    pub constant_pool: Rc<RuntimeConstantPool>,
    pub access_flags: ClassAccessFlags,
    pub super_class: Option<ClassId>,
    pub super_class_name: Option<String>,
    pub interfaces: Vec<ClassId>,
    pub fields: IndexMap<String, RuntimeFieldInfo>,
    // keyed by name + descriptor
    pub methods: IndexMap<String, Rc<RuntimeMethodInfo>>,
    pub source_file: Option<String>,
}

impl Class {
    pub fn is_interface(&self) -> bool {
        self.access_flags.contains(ClassAccessFlags::INTERFACE)
    }

    pub fn is_abstract(&self) -> bool {
        self.access_flags.contains(ClassAccessFlags::ABSTRACT)
    }

    /// True once `<clinit>` has started. A class being initialized counts as
    /// initialized for the thread doing it.
    pub fn is_initialized(&self) -> bool {
        matches!(
            self.status,
            ClassStatus::Initializing | ClassStatus::Initialized
        )
    }

    pub fn get_method(&self, name: &str, descriptor: &str) -> Option<&Rc<RuntimeMethodInfo>> {
        self.methods.get(&method_key(name, descriptor))
    }

    pub fn get_field(&self, name: &str) -> Option<&RuntimeFieldInfo> {
        self.fields.get(name)
    }

    pub fn instance_fields(&self) -> impl Iterator<Item = &RuntimeFieldInfo> {
        self.fields.values().filter(|f| !f.is_static())
    }

    pub fn static_fields(&self) -> impl Iterator<Item = &RuntimeFieldInfo> {
        self.fields.values().filter(|f| f.is_static())
    }
}
