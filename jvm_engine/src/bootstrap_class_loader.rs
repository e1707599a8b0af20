use crate::class_finder::{ClassFinder, ClassPath};
use crate::jvm_error::{VmError, VmExecResult};
use class_file_reader::class_file::ClassFile;
use class_file_reader::class_file_reader::read_buffer_with_max_version;
use class_file_reader::class_file_version::DEFAULT_MAX_JAVA_VERSION;
use log::debug;

/// A class the engine provides itself. Its methods are all intrinsics.
#[derive(Debug)]
pub struct SyntheticClass {
    pub name: &'static str,
    pub super_class: Option<&'static str>,
    pub interfaces: &'static [&'static str],
    pub is_interface: bool,
    // name, descriptor, is_static
    pub fields: &'static [(&'static str, &'static str, bool)],
}

const fn class(name: &'static str, super_class: &'static str) -> SyntheticClass {
    SyntheticClass {
        name,
        super_class: Some(super_class),
        interfaces: &[],
        is_interface: false,
        fields: &[],
    }
}

const fn interface(name: &'static str) -> SyntheticClass {
    SyntheticClass {
        name,
        super_class: Some("java/lang/Object"),
        interfaces: &[],
        is_interface: true,
        fields: &[],
    }
}

static SYNTHETIC_CLASSES: &[SyntheticClass] = &[
    SyntheticClass {
        name: "java/lang/Object",
        super_class: None,
        interfaces: &[],
        is_interface: false,
        fields: &[],
    },
    interface("java/lang/Cloneable"),
    interface("java/io/Serializable"),
    interface("java/lang/CharSequence"),
    interface("java/lang/Comparable"),
    SyntheticClass {
        name: "java/lang/String",
        super_class: Some("java/lang/Object"),
        interfaces: &[
            "java/io/Serializable",
            "java/lang/Comparable",
            "java/lang/CharSequence",
        ],
        is_interface: false,
        fields: &[],
    },
    SyntheticClass {
        name: "java/lang/Class",
        super_class: Some("java/lang/Object"),
        interfaces: &[],
        is_interface: false,
        fields: &[("name", "Ljava/lang/String;", false)],
    },
    SyntheticClass {
        name: "java/lang/System",
        super_class: Some("java/lang/Object"),
        interfaces: &[],
        is_interface: false,
        fields: &[
            ("out", "Ljava/io/PrintStream;", true),
            ("err", "Ljava/io/PrintStream;", true),
        ],
    },
    SyntheticClass {
        name: "java/io/PrintStream",
        super_class: Some("java/lang/Object"),
        interfaces: &[],
        is_interface: false,
        fields: &[("fd", "I", false)],
    },
    class("java/lang/Math", "java/lang/Object"),
    class("java/lang/Number", "java/lang/Object"),
    class("java/lang/Integer", "java/lang/Number"),
    SyntheticClass {
        name: "java/lang/Throwable",
        super_class: Some("java/lang/Object"),
        interfaces: &["java/io/Serializable"],
        is_interface: false,
        fields: &[("message", "Ljava/lang/String;", false)],
    },
    class("java/lang/Exception", "java/lang/Throwable"),
    class("java/lang/RuntimeException", "java/lang/Exception"),
    class("java/lang/Error", "java/lang/Throwable"),
    class("java/lang/ArithmeticException", "java/lang/RuntimeException"),
    class("java/lang/NullPointerException", "java/lang/RuntimeException"),
    class("java/lang/ClassCastException", "java/lang/RuntimeException"),
    class(
        "java/lang/NegativeArraySizeException",
        "java/lang/RuntimeException",
    ),
    class("java/lang/ArrayStoreException", "java/lang/RuntimeException"),
    class(
        "java/lang/IndexOutOfBoundsException",
        "java/lang/RuntimeException",
    ),
    class(
        "java/lang/ArrayIndexOutOfBoundsException",
        "java/lang/IndexOutOfBoundsException",
    ),
    class(
        "java/lang/StringIndexOutOfBoundsException",
        "java/lang/IndexOutOfBoundsException",
    ),
    class(
        "java/lang/IllegalArgumentException",
        "java/lang/RuntimeException",
    ),
    class(
        "java/lang/NumberFormatException",
        "java/lang/IllegalArgumentException",
    ),
    class(
        "java/lang/UnsupportedOperationException",
        "java/lang/RuntimeException",
    ),
    class("java/lang/VirtualMachineError", "java/lang/Error"),
    class("java/lang/OutOfMemoryError", "java/lang/VirtualMachineError"),
    class("java/lang/StackOverflowError", "java/lang/VirtualMachineError"),
    class("java/lang/LinkageError", "java/lang/Error"),
    class("java/lang/VerifyError", "java/lang/LinkageError"),
    class("java/lang/NoClassDefFoundError", "java/lang/LinkageError"),
    class(
        "java/lang/IncompatibleClassChangeError",
        "java/lang/LinkageError",
    ),
    class(
        "java/lang/NoSuchMethodError",
        "java/lang/IncompatibleClassChangeError",
    ),
    class(
        "java/lang/NoSuchFieldError",
        "java/lang/IncompatibleClassChangeError",
    ),
    class(
        "java/lang/InstantiationError",
        "java/lang/IncompatibleClassChangeError",
    ),
    class("jvm/engine/NativeMethodException", "java/lang/RuntimeException"),
];

/// Loads class files for the method area.
/// https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-5.html#jvms-5.3.1
///
/// The synthetic classes always win over the class path, so a user class can
/// never replace `java/lang/Object` or the exception hierarchy.
pub struct BootstrapClassLoader {
    class_finder: ClassFinder,
    max_java_version: u16,
}

impl Default for BootstrapClassLoader {
    fn default() -> Self {
        BootstrapClassLoader::new(DEFAULT_MAX_JAVA_VERSION)
    }
}

impl BootstrapClassLoader {
    pub fn new(max_java_version: u16) -> BootstrapClassLoader {
        BootstrapClassLoader {
            class_finder: ClassFinder::new(),
            max_java_version,
        }
    }

    pub fn add_class_path(&mut self, path: Box<dyn ClassPath>) {
        self.class_finder.class_paths.push(path);
    }

    pub fn max_java_version(&self) -> u16 {
        self.max_java_version
    }

    pub fn synthetic_class(name: &str) -> Option<&'static SyntheticClass> {
        SYNTHETIC_CLASSES.iter().find(|c| c.name == name)
    }

    pub fn synthetic_classes() -> impl Iterator<Item = &'static SyntheticClass> {
        SYNTHETIC_CLASSES.iter()
    }

    /// Reads and parses `name` from the class path. A class file whose
    /// `this_class` differs from `name` is treated as missing.
    pub fn load_class_file(&self, name: &str) -> VmExecResult<Option<ClassFile>> {
        let bytes = match self.class_finder.find_class(name)? {
            Some(bytes) => bytes,
            None => return Ok(None),
        };
        let class_file = read_buffer_with_max_version(&bytes, self.max_java_version)?;
        if class_file.this_class_name != name {
            return Err(VmError::ClassNotFound(format!(
                "{name} (wrong name: {})",
                class_file.this_class_name
            )));
        }
        debug!(
            "read class file {name}, version {}",
            class_file.version.java_version()
        );
        Ok(Some(class_file))
    }
}
