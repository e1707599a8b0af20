use crate::java_exception::{JavaExceptionKind, MethodCallError};
use crate::jvm_error::VmError;
use crate::jvm_values::{ObjectRef, Value};
use crate::method_area::qualified_method_key;
use crate::natives;
use crate::virtual_machine::VirtualMachine;
use std::collections::HashMap;
use thiserror::Error;

/// How an intrinsic can fail.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NativeError {
    /// Raise `kind` at the call site.
    #[error("{}: {message}", kind.class_name())]
    Exception {
        kind: JavaExceptionKind,
        message: String,
    },
    /// An exception object that already lives on the heap.
    #[error("exception {0}")]
    Thrown(ObjectRef),
    /// Anything else; surfaces as `NativeMethodException`.
    #[error("{0}")]
    Failure(String),
    #[error("exit {0}")]
    Exit(i32),
}

impl NativeError {
    pub fn exception(kind: JavaExceptionKind, message: impl Into<String>) -> NativeError {
        NativeError::Exception {
            kind,
            message: message.into(),
        }
    }
}

impl From<VmError> for NativeError {
    fn from(value: VmError) -> Self {
        NativeError::Failure(value.to_string())
    }
}

impl From<MethodCallError> for NativeError {
    fn from(value: MethodCallError) -> Self {
        match value {
            MethodCallError::InternalError(e) => NativeError::Failure(e.to_string()),
            MethodCallError::ExceptionThrown(object_ref) => NativeError::Thrown(object_ref),
            MethodCallError::JavaException(kind, message) => NativeError::Exception { kind, message },
            MethodCallError::Exit(code) => NativeError::Exit(code),
        }
    }
}

impl From<NativeError> for MethodCallError {
    fn from(value: NativeError) -> Self {
        match value {
            NativeError::Exception { kind, message } => MethodCallError::JavaException(kind, message),
            NativeError::Thrown(object_ref) => MethodCallError::ExceptionThrown(object_ref),
            NativeError::Failure(message) => {
                MethodCallError::java(JavaExceptionKind::NativeMethodException, message)
            }
            NativeError::Exit(code) => MethodCallError::Exit(code),
        }
    }
}

pub type NativeResult = Result<Option<Value>, NativeError>;

/// A Java method implemented by the engine. Instance methods get their
/// receiver as the first argument; the rest follow in declaration order.
pub type NativeMethod = fn(&mut VirtualMachine, Vec<Value>) -> NativeResult;

/// Registry of intrinsics keyed by `class.name(descriptor)`.
pub struct NativeMethodArea {
    native_methods: HashMap<String, NativeMethod>,
}

impl Default for NativeMethodArea {
    fn default() -> Self {
        NativeMethodArea::new_with_default_native()
    }
}

impl NativeMethodArea {
    pub fn new() -> NativeMethodArea {
        NativeMethodArea {
            native_methods: HashMap::new(),
        }
    }

    pub fn new_with_default_native() -> NativeMethodArea {
        let mut area = NativeMethodArea::new();
        natives::register_defaults(&mut area);
        area
    }

    pub fn registry_native_method(
        &mut self,
        class_name: &str,
        method_name: &str,
        method_descriptor: &str,
        method: NativeMethod,
    ) {
        let key = qualified_method_key(class_name, method_name, method_descriptor);
        self.native_methods.insert(key, method);
    }

    pub fn get_method(
        &self,
        class_name: &str,
        method_name: &str,
        method_descriptor: &str,
    ) -> Option<NativeMethod> {
        let key = qualified_method_key(class_name, method_name, method_descriptor);
        self.native_methods.get(&key).copied()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.native_methods.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.native_methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.native_methods.is_empty()
    }
}
