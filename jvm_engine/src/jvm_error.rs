use class_file_reader::class_file_error::ClassFileError;
use thiserror::Error;

/// Failures that are not Java exceptions. Every variant is fatal to the running thread.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VmError {
    #[error("class not found: {0}")]
    ClassNotFound(String),
    #[error("method not found: {0}")]
    MethodNotFound(String),
    #[error("field not found: {0}")]
    FieldNotFound(String),
    #[error("class format error: {0}")]
    ClassFormatError(String),
    #[error("java.lang.VerifyError: {0}")]
    VerifyError(String),
    #[error("class path does not exist: {0}")]
    ClassPathNotExist(String),
    #[error("jar file does not exist: {0}")]
    JarFileNotExist(String),
    #[error("error reading class bytes: {0}")]
    ReadClassBytesError(String),
    #[error("error reading jar file: {0}")]
    ReadJarFileError(String),
    #[error("I/O error: {0}")]
    Io(String),
}

impl VmError {
    pub fn is_verify_error(&self) -> bool {
        matches!(self, VmError::VerifyError(_))
    }
}

impl From<ClassFileError> for VmError {
    fn from(value: ClassFileError) -> Self {
        VmError::ClassFormatError(value.to_string())
    }
}

impl From<std::io::Error> for VmError {
    fn from(value: std::io::Error) -> Self {
        VmError::Io(value.to_string())
    }
}

pub type VmExecResult<T> = Result<T, VmError>;

/// Shorthand for building a verify error from a format string.
macro_rules! verify_error {
    ($($arg:tt)*) => {
        $crate::jvm_error::VmError::VerifyError(format!($($arg)*))
    };
}
pub(crate) use verify_error;
