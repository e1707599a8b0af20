use crate::bootstrap_class_loader::{BootstrapClassLoader, SyntheticClass};
use crate::class_finder::ClassPath;
use crate::jvm_error::{VmError, VmExecResult};
use crate::loaded_class::{Class, ClassId, ClassStatus};
use crate::native_method_area::{NativeMethod, NativeMethodArea};
use crate::runtime_constant_pool::RuntimeConstantPool;
use crate::runtime_field_info::RuntimeFieldInfo;
use crate::runtime_method_info::RuntimeMethodInfo;
use crate::string_pool::StringPool;
use class_file_reader::class_file::{ClassAccessFlags, ClassFile};
use class_file_reader::field_info::FieldAccessFlags;
use indexmap::IndexMap;
use log::debug;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// What a method key resolves to.
#[derive(Clone)]
pub enum MethodEntry {
    Bytecode {
        class: ClassId,
        method: Rc<RuntimeMethodInfo>,
    },
    Intrinsic(NativeMethod),
}

impl MethodEntry {
    /// Intrinsics carry no access flags; only bytecode methods can answer.
    pub fn is_static(&self) -> Option<bool> {
        match self {
            MethodEntry::Bytecode { method, .. } => Some(method.is_static()),
            MethodEntry::Intrinsic(_) => None,
        }
    }

    pub fn is_intrinsic(&self) -> bool {
        matches!(self, MethodEntry::Intrinsic(_))
    }
}

/// `class.name(descriptor)`, the key of the method table and of the intrinsic registry.
pub fn qualified_method_key(class_name: &str, name: &str, descriptor: &str) -> String {
    format!("{class_name}.{name}{descriptor}")
}

/// Loaded classes and the method table.
///
/// Classes are addressed by `ClassId` and link to their superclass and
/// interfaces by id, so the hierarchy never holds references into itself.
#[derive(Default)]
pub struct MethodArea {
    class_loader: BootstrapClassLoader,
    classes: Vec<Class>,
    class_index: HashMap<String, ClassId>,
    method_table: HashMap<String, MethodEntry>,
    // classes whose superclasses are still being loaded
    loading: HashSet<String>,
}

impl MethodArea {
    pub fn new(max_java_version: u16) -> MethodArea {
        MethodArea {
            class_loader: BootstrapClassLoader::new(max_java_version),
            ..MethodArea::default()
        }
    }

    pub fn add_class_path(&mut self, class_path: Box<dyn ClassPath>) {
        self.class_loader.add_class_path(class_path);
    }

    pub fn class(&self, class_id: ClassId) -> &Class {
        &self.classes[class_id.0]
    }

    pub(crate) fn class_mut(&mut self, class_id: ClassId) -> &mut Class {
        &mut self.classes[class_id.0]
    }

    pub fn class_by_name(&self, name: &str) -> Option<ClassId> {
        self.class_index.get(name).copied()
    }

    pub fn is_class_loaded(&self, name: &str) -> bool {
        self.class_index.contains_key(name)
    }

    pub fn loaded_classes(&self) -> usize {
        self.classes.len()
    }

    /// Loads `name` and, recursively, its superclass and interfaces.
    pub fn load_class(&mut self, name: &str, strings: &mut StringPool) -> VmExecResult<ClassId> {
        if let Some(class_id) = self.class_index.get(name) {
            return Ok(*class_id);
        }
        if name.starts_with('[') {
            return Err(VmError::ClassNotFound(format!(
                "{name}: array classes have no class record"
            )));
        }
        if !self.loading.insert(name.to_string()) {
            return Err(VmError::ClassFormatError(format!(
                "class circularity while loading {name}"
            )));
        }
        let result = match BootstrapClassLoader::synthetic_class(name) {
            Some(synthetic) => self.define_synthetic_class(synthetic, strings),
            None => match self.class_loader.load_class_file(name)? {
                Some(class_file) => self.define_class(class_file, strings),
                None => Err(VmError::ClassNotFound(name.to_string())),
            },
        };
        self.loading.remove(name);
        result
    }

    fn load_super_types(
        &mut self,
        super_class_name: Option<&str>,
        interface_names: &[String],
        strings: &mut StringPool,
    ) -> VmExecResult<(Option<ClassId>, Vec<ClassId>)> {
        let super_class = match super_class_name {
            Some(super_name) => Some(self.load_class(super_name, strings)?),
            None => None,
        };
        let mut interfaces = Vec::with_capacity(interface_names.len());
        for interface_name in interface_names {
            interfaces.push(self.load_class(interface_name, strings)?);
        }
        Ok((super_class, interfaces))
    }

    fn define_class(&mut self, class_file: ClassFile, strings: &mut StringPool) -> VmExecResult<ClassId> {
        let (super_class, interfaces) = self.load_super_types(
            class_file.super_class_name.as_deref(),
            &class_file.interface_names,
            strings,
        )?;
        let source_file = class_file.source_file();
        let constant_pool = RuntimeConstantPool::from(&class_file.constant_pool)?;
        let mut fields = IndexMap::new();
        for field_info in class_file.field_info {
            let field = RuntimeFieldInfo::from(field_info, &constant_pool)?;
            fields.insert(field.name.clone(), field);
        }
        let mut methods = IndexMap::new();
        for method_info in class_file.method_info {
            let method = RuntimeMethodInfo::from(method_info, &constant_pool)?;
            methods.insert(method.key(), Rc::new(method));
        }
        let class = Class {
            status: ClassStatus::Linked,
            name_index: strings.intern(&class_file.this_class_name),
            name: class_file.this_class_name,
            constant_pool: Rc::new(constant_pool),
            access_flags: class_file.access_flags,
            super_class,
            super_class_name: class_file.super_class_name,
            interfaces,
            fields,
            methods,
            source_file,
        };
        Ok(self.register(class))
    }

    fn define_synthetic_class(
        &mut self,
        synthetic: &SyntheticClass,
        strings: &mut StringPool,
    ) -> VmExecResult<ClassId> {
        let interface_names: Vec<String> =
            synthetic.interfaces.iter().map(|s| s.to_string()).collect();
        let (super_class, interfaces) =
            self.load_super_types(synthetic.super_class, &interface_names, strings)?;
        let mut fields = IndexMap::new();
        for (name, descriptor, is_static) in synthetic.fields {
            let flags = if *is_static {
                FieldAccessFlags::PUBLIC | FieldAccessFlags::STATIC | FieldAccessFlags::FINAL
            } else {
                FieldAccessFlags::PRIVATE
            };
            fields.insert(
                name.to_string(),
                RuntimeFieldInfo::synthetic(name, descriptor, flags)?,
            );
        }
        let access_flags = if synthetic.is_interface {
            ClassAccessFlags::PUBLIC | ClassAccessFlags::INTERFACE | ClassAccessFlags::ABSTRACT
        } else {
            ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER
        };
        let class = Class {
            status: ClassStatus::Linked,
            name: synthetic.name.to_string(),
            name_index: strings.intern(synthetic.name),
            constant_pool: Rc::new(RuntimeConstantPool::empty()),
            access_flags,
            super_class,
            super_class_name: synthetic.super_class.map(str::to_string),
            interfaces,
            fields,
            methods: IndexMap::new(),
            source_file: None,
        };
        Ok(self.register(class))
    }

    fn register(&mut self, class: Class) -> ClassId {
        let class_id = ClassId(self.classes.len());
        debug!("loaded {} as {class_id}", class.name);
        self.class_index.insert(class.name.clone(), class_id);
        self.classes.push(class);
        class_id
    }

    /// Finds `name(descriptor)` starting at `class_id`: the superclass chain
    /// first, then every superinterface. At each class an intrinsic wins over
    /// bytecode. The hit is cached under the key of the requesting class.
    pub fn resolve_method(
        &mut self,
        class_id: ClassId,
        name: &str,
        descriptor: &str,
        natives: &NativeMethodArea,
    ) -> VmExecResult<MethodEntry> {
        let key = qualified_method_key(&self.class(class_id).name, name, descriptor);
        if let Some(entry) = self.method_table.get(&key) {
            return Ok(entry.clone());
        }
        let mut interfaces = Vec::new();
        let mut current = Some(class_id);
        let mut found = None;
        while let Some(id) = current {
            if let Some(entry) = self.method_in_class(id, name, descriptor, natives) {
                found = Some(entry);
                break;
            }
            let class = self.class(id);
            interfaces.extend(class.interfaces.iter().copied());
            current = class.super_class;
        }
        if found.is_none() {
            let mut visited = HashSet::new();
            while let Some(id) = interfaces.pop() {
                if !visited.insert(id) {
                    continue;
                }
                if let Some(entry) = self.method_in_class(id, name, descriptor, natives) {
                    found = Some(entry);
                    break;
                }
                interfaces.extend(self.class(id).interfaces.iter().copied());
            }
        }
        match found {
            Some(entry) => {
                self.method_table.insert(key, entry.clone());
                Ok(entry)
            }
            None => Err(VmError::MethodNotFound(key)),
        }
    }

    /// The method declared by exactly this class, without walking supertypes.
    pub fn method_in_class(
        &self,
        class_id: ClassId,
        name: &str,
        descriptor: &str,
        natives: &NativeMethodArea,
    ) -> Option<MethodEntry> {
        let class = self.class(class_id);
        if let Some(native) = natives.get_method(&class.name, name, descriptor) {
            return Some(MethodEntry::Intrinsic(native));
        }
        class
            .get_method(name, descriptor)
            .filter(|m| m.code.is_some())
            .map(|method| MethodEntry::Bytecode {
                class: class_id,
                method: method.clone(),
            })
    }

    /// Finds the class declaring field `name`, looking at `class_id`, its
    /// interfaces and then its superclasses.
    pub fn resolve_field(
        &self,
        class_id: ClassId,
        name: &str,
    ) -> VmExecResult<(ClassId, &RuntimeFieldInfo)> {
        let mut pending = vec![class_id];
        let mut visited = HashSet::new();
        while let Some(id) = pending.pop() {
            if !visited.insert(id) {
                continue;
            }
            let class = self.class(id);
            if let Some(field) = class.get_field(name) {
                return Ok((id, field));
            }
            if let Some(super_class) = class.super_class {
                pending.push(super_class);
            }
            pending.extend(class.interfaces.iter().rev().copied());
        }
        Err(VmError::FieldNotFound(format!(
            "{}.{name}",
            self.class(class_id).name
        )))
    }

    /// Instance fields of `class_id` and all of its superclasses, superclass first.
    pub fn instance_fields(&self, class_id: ClassId) -> Vec<&RuntimeFieldInfo> {
        let mut chain = Vec::new();
        let mut current = Some(class_id);
        while let Some(id) = current {
            chain.push(id);
            current = self.class(id).super_class;
        }
        chain
            .iter()
            .rev()
            .flat_map(|id| self.class(*id).instance_fields())
            .collect()
    }

    pub fn is_subclass_of(&self, class_id: ClassId, ancestor: &str) -> bool {
        let mut pending = vec![class_id];
        let mut visited = HashSet::new();
        while let Some(id) = pending.pop() {
            if !visited.insert(id) {
                continue;
            }
            let class = self.class(id);
            if class.name == ancestor {
                return true;
            }
            pending.extend(class.super_class);
            pending.extend(class.interfaces.iter().copied());
        }
        false
    }

    /// Whether a value of runtime type `from` may be stored where `to` is
    /// expected. Both are internal names; arrays use descriptors such as `[I`.
    pub fn is_assignable(&self, from: &str, to: &str) -> bool {
        if from == to || to == "java/lang/Object" {
            return true;
        }
        match (from.strip_prefix('['), to.strip_prefix('[')) {
            (Some(from_component), Some(to_component)) => {
                match (
                    reference_component(from_component),
                    reference_component(to_component),
                ) {
                    (Some(from_class), Some(to_class)) => self.is_assignable(from_class, to_class),
                    // primitive components must match exactly
                    _ => false,
                }
            }
            (Some(_), None) => to == "java/lang/Cloneable" || to == "java/io/Serializable",
            (None, Some(_)) => false,
            (None, None) => match self.class_by_name(from) {
                Some(class_id) => self.is_subclass_of(class_id, to),
                None => false,
            },
        }
    }
}

// `Ljava/lang/String;` -> `java/lang/String`, `[I` -> `[I`, primitives -> None
fn reference_component(component: &str) -> Option<&str> {
    if component.starts_with('[') {
        Some(component)
    } else {
        component.strip_prefix('L')?.strip_suffix(';')
    }
}

/// Internal name of the elements of array class `descriptor`.
/// `[Ljava/lang/String;` gives `java/lang/String`, `[[I` gives `[I`.
pub fn array_component_class(descriptor: &str) -> Option<&str> {
    reference_component(descriptor.strip_prefix('[')?)
}

#[cfg(test)]
mod tests {
    use crate::class_finder::InMemoryClassPath;
    use crate::jvm_error::VmError;
    use crate::method_area::{array_component_class, MethodArea, MethodEntry};
    use crate::native_method_area::NativeMethodArea;
    use crate::string_pool::StringPool;

    const HELLO: &[u8] = include_bytes!("../tests/resources/Hello2.class");

    fn area() -> (MethodArea, StringPool) {
        let mut area = MethodArea::new(21);
        let mut class_path = InMemoryClassPath::new();
        class_path.add_class("Hello2", HELLO.to_vec());
        area.add_class_path(Box::new(class_path));
        (area, StringPool::new())
    }

    #[test]
    fn test_class_load() {
        let (mut area, mut strings) = area();
        let hello = area.load_class("Hello2", &mut strings).unwrap();
        let class = area.class(hello);
        assert_eq!("Hello2", class.name);
        assert_eq!(Some("Hello2.java".to_string()), class.source_file);
        let object = area.class_by_name("java/lang/Object").unwrap();
        assert_eq!(Some(object), class.super_class);
        assert_eq!(hello, area.load_class("Hello2", &mut strings).unwrap());
        assert!(matches!(
            area.load_class("Nope", &mut strings),
            Err(VmError::ClassNotFound(_))
        ));
    }

    #[test]
    fn resolves_bytecode_and_intrinsics() {
        let (mut area, mut strings) = area();
        let natives = NativeMethodArea::new_with_default_native();
        let hello = area.load_class("Hello2", &mut strings).unwrap();
        let entry = area
            .resolve_method(hello, "addTwo", "(II)I", &natives)
            .unwrap();
        assert!(matches!(entry, MethodEntry::Bytecode { class, .. } if class == hello));
        assert_eq!(Some(true), entry.is_static());

        // inherited from java/lang/Object
        let entry = area
            .resolve_method(hello, "hashCode", "()I", &natives)
            .unwrap();
        assert!(entry.is_intrinsic());
        assert!(matches!(
            area.resolve_method(hello, "missing", "()V", &natives),
            Err(VmError::MethodNotFound(key)) if key == "Hello2.missing()V"
        ));
    }

    #[test]
    fn exception_hierarchy_assignability() {
        let (mut area, mut strings) = area();
        area.load_class("java/lang/ArrayIndexOutOfBoundsException", &mut strings)
            .unwrap();
        assert!(area.is_assignable(
            "java/lang/ArrayIndexOutOfBoundsException",
            "java/lang/RuntimeException"
        ));
        assert!(area.is_assignable(
            "java/lang/ArrayIndexOutOfBoundsException",
            "java/io/Serializable"
        ));
        assert!(!area.is_assignable(
            "java/lang/ArrayIndexOutOfBoundsException",
            "java/lang/Error"
        ));
        assert!(area.is_assignable("[Ljava/lang/String;", "[Ljava/lang/Object;"));
        assert!(area.is_assignable("[[I", "[Ljava/lang/Object;"));
        assert!(area.is_assignable("[I", "java/lang/Cloneable"));
        assert!(!area.is_assignable("[I", "[J"));
        assert!(!area.is_assignable("[Ljava/lang/Object;", "[Ljava/lang/String;"));
        assert!(!area.is_assignable("java/lang/Object", "[I"));
    }

    #[test]
    fn field_resolution_walks_supertypes() {
        let (mut area, mut strings) = area();
        let npe = area
            .load_class("java/lang/NullPointerException", &mut strings)
            .unwrap();
        let (declaring, field) = area.resolve_field(npe, "message").unwrap();
        assert_eq!("java/lang/Throwable", area.class(declaring).name);
        assert_eq!("Ljava/lang/String;", field.descriptor);
        assert_eq!(1, area.instance_fields(npe).len());
        assert!(matches!(
            area.resolve_field(npe, "cause"),
            Err(VmError::FieldNotFound(_))
        ));
    }

    #[test]
    fn array_components() {
        assert_eq!(Some("java/lang/String"), array_component_class("[Ljava/lang/String;"));
        assert_eq!(Some("[I"), array_component_class("[[I"));
        assert_eq!(None, array_component_class("[I"));
        assert_eq!(None, array_component_class("java/lang/String"));
    }
}
