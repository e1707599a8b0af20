use crate::descriptor::java_name;
use crate::stack_frame::StackFrame;
use std::fmt::{Display, Formatter};

/// One line of a Java stack trace, captured when an exception is raised.
#[derive(Debug, Clone, PartialEq)]
pub struct StackTraceElement {
    pub declaring_class: String,
    pub method_name: String,
    pub file_name: Option<String>,
    // 0 when the class has no line number table
    pub line_number: u16,
    pub pc: usize,
}

impl StackTraceElement {
    pub(crate) fn of(frame: &StackFrame) -> StackTraceElement {
        StackTraceElement {
            declaring_class: frame.class_name.clone(),
            method_name: frame.method.name.clone(),
            file_name: frame.source_file.clone(),
            line_number: frame.code.line_number(frame.pc),
            pc: frame.pc,
        }
    }
}

impl Display for StackTraceElement {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "\tat {}.{}(",
            java_name(&self.declaring_class),
            self.method_name
        )?;
        match (&self.file_name, self.line_number) {
            (None, _) => write!(f, "Unknown Source")?,
            (Some(file_name), 0) => write!(f, "{file_name}")?,
            (Some(file_name), line) => write!(f, "{file_name}:{line}")?,
        }
        write!(f, ") [pc {}]", self.pc)
    }
}
