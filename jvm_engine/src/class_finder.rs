use crate::jvm_error::{VmError, VmExecResult};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::fs;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::PathBuf;
use zip::result::ZipError;
use zip::ZipArchive;

/// Searches the class paths in the order they were added.
#[derive(Default)]
pub struct ClassFinder {
    pub class_paths: Vec<Box<dyn ClassPath>>,
}

impl ClassFinder {
    pub fn new() -> ClassFinder {
        ClassFinder::default()
    }

    pub fn find_class(&self, name: &str) -> VmExecResult<Option<Vec<u8>>> {
        for class_path in &self.class_paths {
            if let Some(v) = class_path.find_class(name)? {
                return Ok(Some(v));
            }
        }
        Ok(None)
    }
}

/// A place class files can be read from, keyed by internal class name.
pub trait ClassPath {
    fn find_class(&self, class_name: &str) -> VmExecResult<Option<Vec<u8>>>;
}

/// A directory of `.class` files laid out by package.
pub struct FileSystemClassPath {
    class_path_root: PathBuf,
}

impl FileSystemClassPath {
    pub fn new(path: &str) -> VmExecResult<FileSystemClassPath> {
        let class_path_root = fs::canonicalize(PathBuf::from(path))
            .map_err(|_| VmError::ClassPathNotExist(path.to_string()))?;
        if !class_path_root.is_dir() {
            Err(VmError::ClassPathNotExist(
                class_path_root.to_string_lossy().to_string(),
            ))
        } else {
            Ok(Self { class_path_root })
        }
    }
}

impl ClassPath for FileSystemClassPath {
    fn find_class(&self, class_name: &str) -> VmExecResult<Option<Vec<u8>>> {
        let mut full_path = self.class_path_root.clone();
        full_path.push(format!("{class_name}.class"));
        if full_path.is_file() {
            fs::read(full_path)
                .map(Some)
                .map_err(|e| VmError::ReadClassBytesError(e.to_string()))
        } else {
            Ok(None)
        }
    }
}

/// A jar file. Entries are read lazily, one class at a time.
pub struct JarFileClassPath {
    jar_file_path: String,
    zip: RefCell<ZipArchive<BufReader<File>>>,
}

impl Debug for JarFileClassPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "JarFileClassPath => {}", &self.jar_file_path)
    }
}

impl JarFileClassPath {
    pub fn new(path: &str) -> VmExecResult<JarFileClassPath> {
        let jar_file_path = fs::canonicalize(PathBuf::from(path))
            .map_err(|_| VmError::JarFileNotExist(path.to_string()))?;
        let file =
            File::open(&jar_file_path).map_err(|e| VmError::ReadJarFileError(e.to_string()))?;
        let zip = ZipArchive::new(BufReader::new(file))
            .map_err(|e| VmError::ReadJarFileError(e.to_string()))?;
        Ok(Self {
            jar_file_path: jar_file_path.to_string_lossy().to_string(),
            zip: RefCell::new(zip),
        })
    }

    fn read_entry(&self, entry_name: &str) -> VmExecResult<Option<Vec<u8>>> {
        match self.zip.borrow_mut().by_name(entry_name) {
            Ok(mut zip_file) => {
                let mut buffer: Vec<u8> = Vec::with_capacity(zip_file.size() as usize);
                zip_file
                    .read_to_end(&mut buffer)
                    .map_err(|e| VmError::ReadClassBytesError(e.to_string()))?;
                Ok(Some(buffer))
            }
            Err(ZipError::FileNotFound) => Ok(None),
            Err(e) => Err(VmError::ReadJarFileError(e.to_string())),
        }
    }

    /// `Main-Class` of the jar manifest, as an internal class name.
    pub fn main_class(&self) -> VmExecResult<Option<String>> {
        let manifest = match self.read_entry("META-INF/MANIFEST.MF")? {
            Some(bytes) => String::from_utf8_lossy(&bytes).to_string(),
            None => return Ok(None),
        };
        Ok(manifest_main_class(&manifest))
    }
}

// manifest lines longer than 72 bytes continue on lines starting with a space
fn manifest_main_class(manifest: &str) -> Option<String> {
    let mut logical_lines: Vec<String> = Vec::new();
    for line in manifest.lines() {
        match (line.strip_prefix(' '), logical_lines.last_mut()) {
            (Some(rest), Some(last)) => last.push_str(rest),
            _ => logical_lines.push(line.to_string()),
        }
    }
    logical_lines.iter().find_map(|line| {
        let value = line.strip_prefix("Main-Class:")?.trim();
        (!value.is_empty()).then(|| value.replace('.', "/"))
    })
}

impl ClassPath for JarFileClassPath {
    fn find_class(&self, class_name: &str) -> VmExecResult<Option<Vec<u8>>> {
        self.read_entry(&format!("{class_name}.class"))
    }
}

/// Class bytes supplied directly, for embedding and tests.
#[derive(Default)]
pub struct InMemoryClassPath {
    classes: HashMap<String, Vec<u8>>,
}

impl InMemoryClassPath {
    pub fn new() -> InMemoryClassPath {
        InMemoryClassPath::default()
    }

    pub fn add_class(&mut self, class_name: &str, bytes: Vec<u8>) {
        self.classes.insert(class_name.to_string(), bytes);
    }
}

impl ClassPath for InMemoryClassPath {
    fn find_class(&self, class_name: &str) -> VmExecResult<Option<Vec<u8>>> {
        Ok(self.classes.get(class_name).cloned())
    }
}
