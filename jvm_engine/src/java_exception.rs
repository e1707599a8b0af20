use crate::jvm_error::VmError;
use crate::jvm_values::{ObjectRef, Value};

/// Java exceptions the engine itself raises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JavaExceptionKind {
    ArithmeticException,
    ArrayIndexOutOfBoundsException,
    ArrayStoreException,
    ClassCastException,
    IllegalArgumentException,
    IncompatibleClassChangeError,
    InstantiationError,
    NativeMethodException,
    NegativeArraySizeException,
    NoClassDefFoundError,
    NoSuchFieldError,
    NoSuchMethodError,
    NullPointerException,
    NumberFormatException,
    OutOfMemoryError,
    StackOverflowError,
    StringIndexOutOfBoundsException,
    UnsupportedOperationException,
}

impl JavaExceptionKind {
    pub fn class_name(&self) -> &'static str {
        match self {
            JavaExceptionKind::ArithmeticException => "java/lang/ArithmeticException",
            JavaExceptionKind::ArrayIndexOutOfBoundsException => {
                "java/lang/ArrayIndexOutOfBoundsException"
            }
            JavaExceptionKind::ArrayStoreException => "java/lang/ArrayStoreException",
            JavaExceptionKind::ClassCastException => "java/lang/ClassCastException",
            JavaExceptionKind::IllegalArgumentException => "java/lang/IllegalArgumentException",
            JavaExceptionKind::IncompatibleClassChangeError => {
                "java/lang/IncompatibleClassChangeError"
            }
            JavaExceptionKind::InstantiationError => "java/lang/InstantiationError",
            JavaExceptionKind::NativeMethodException => "jvm/engine/NativeMethodException",
            JavaExceptionKind::NegativeArraySizeException => {
                "java/lang/NegativeArraySizeException"
            }
            JavaExceptionKind::NoClassDefFoundError => "java/lang/NoClassDefFoundError",
            JavaExceptionKind::NoSuchFieldError => "java/lang/NoSuchFieldError",
            JavaExceptionKind::NoSuchMethodError => "java/lang/NoSuchMethodError",
            JavaExceptionKind::NullPointerException => "java/lang/NullPointerException",
            JavaExceptionKind::NumberFormatException => "java/lang/NumberFormatException",
            JavaExceptionKind::OutOfMemoryError => "java/lang/OutOfMemoryError",
            JavaExceptionKind::StackOverflowError => "java/lang/StackOverflowError",
            JavaExceptionKind::StringIndexOutOfBoundsException => {
                "java/lang/StringIndexOutOfBoundsException"
            }
            JavaExceptionKind::UnsupportedOperationException => {
                "java/lang/UnsupportedOperationException"
            }
        }
    }
}

/// Everything that can interrupt the execution of one instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum MethodCallError {
    /// Verify errors and fatal runtime errors. Never caught by Java code.
    InternalError(VmError),
    /// An exception object that already lives on the heap, e.g. from `athrow`.
    ExceptionThrown(ObjectRef),
    /// An exception still to be instantiated where it was raised.
    JavaException(JavaExceptionKind, String),
    /// `System.exit` was called.
    Exit(i32),
}

impl MethodCallError {
    pub fn java(kind: JavaExceptionKind, message: impl Into<String>) -> MethodCallError {
        MethodCallError::JavaException(kind, message.into())
    }

    pub fn null_pointer(opcode: &str) -> MethodCallError {
        Self::java(
            JavaExceptionKind::NullPointerException,
            format!("{opcode}: null reference"),
        )
    }
}

impl From<VmError> for MethodCallError {
    fn from(value: VmError) -> Self {
        // linkage failures are Java errors, not VM failures
        match value {
            VmError::ClassNotFound(name) => {
                Self::JavaException(JavaExceptionKind::NoClassDefFoundError, name)
            }
            VmError::MethodNotFound(name) => {
                Self::JavaException(JavaExceptionKind::NoSuchMethodError, name)
            }
            VmError::FieldNotFound(name) => {
                Self::JavaException(JavaExceptionKind::NoSuchFieldError, name)
            }
            other => Self::InternalError(other),
        }
    }
}

pub type InvokeResult<T> = Result<T, MethodCallError>;

pub type InvokeMethodResult = InvokeResult<Option<Value>>;

#[cfg(test)]
mod tests {
    use crate::java_exception::{JavaExceptionKind, MethodCallError};
    use crate::jvm_error::VmError;

    #[test]
    fn linkage_errors_become_java_errors() {
        let error = MethodCallError::from(VmError::ClassNotFound("Foo".to_string()));
        assert_eq!(
            MethodCallError::java(JavaExceptionKind::NoClassDefFoundError, "Foo"),
            error
        );
        let error = MethodCallError::from(VmError::VerifyError("bad".to_string()));
        assert!(matches!(error, MethodCallError::InternalError(_)));
    }

    #[test]
    fn class_names() {
        assert_eq!(
            "java/lang/ArithmeticException",
            JavaExceptionKind::ArithmeticException.class_name()
        );
        assert_eq!(
            "jvm/engine/NativeMethodException",
            JavaExceptionKind::NativeMethodException.class_name()
        );
    }
}
