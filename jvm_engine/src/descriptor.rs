use crate::jvm_error::{VmError, VmExecResult};
use crate::jvm_values::Value;
use std::fmt::{Display, Formatter};
use std::str::Chars;

/// A parsed field descriptor.
/// https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.3.2
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
    Object(String),
    Array(Box<FieldType>),
}

impl FieldType {
    pub fn parse(descriptor: &str) -> VmExecResult<FieldType> {
        let mut chars = descriptor.chars();
        let field_type = Self::parse_from(descriptor, &mut chars)?;
        if chars.next().is_some() {
            return Err(invalid_descriptor(descriptor));
        }
        Ok(field_type)
    }

    fn parse_from(descriptor: &str, chars: &mut Chars) -> VmExecResult<FieldType> {
        let field_type = match chars.next() {
            Some('B') => FieldType::Byte,
            Some('C') => FieldType::Char,
            Some('D') => FieldType::Double,
            Some('F') => FieldType::Float,
            Some('I') => FieldType::Int,
            Some('J') => FieldType::Long,
            Some('S') => FieldType::Short,
            Some('Z') => FieldType::Boolean,
            Some('L') => {
                let class_name: String = chars.take_while(|c| *c != ';').collect();
                if class_name.is_empty() {
                    return Err(invalid_descriptor(descriptor));
                }
                FieldType::Object(class_name)
            }
            Some('[') => FieldType::Array(Box::new(Self::parse_from(descriptor, chars)?)),
            _ => return Err(invalid_descriptor(descriptor)),
        };
        Ok(field_type)
    }

    pub fn is_category2(&self) -> bool {
        matches!(self, FieldType::Long | FieldType::Double)
    }

    /// The zero value a field of this type starts with.
    pub fn default_value(&self) -> Value {
        match self {
            FieldType::Byte
            | FieldType::Char
            | FieldType::Int
            | FieldType::Short
            | FieldType::Boolean => Value::Int(0),
            FieldType::Long => Value::Long(0),
            FieldType::Float => Value::Float(0.0),
            FieldType::Double => Value::Double(0.0),
            FieldType::Object(_) | FieldType::Array(_) => Value::Null,
        }
    }

    /// Whether `value` can be stored in a slot of this type.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldType::Long => matches!(value, Value::Long(_)),
            FieldType::Float => matches!(value, Value::Float(_)),
            FieldType::Double => matches!(value, Value::Double(_)),
            FieldType::Object(_) | FieldType::Array(_) => value.is_reference(),
            _ => matches!(value, Value::Int(_)),
        }
    }
}

impl Display for FieldType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::Byte => write!(f, "B"),
            FieldType::Char => write!(f, "C"),
            FieldType::Double => write!(f, "D"),
            FieldType::Float => write!(f, "F"),
            FieldType::Int => write!(f, "I"),
            FieldType::Long => write!(f, "J"),
            FieldType::Short => write!(f, "S"),
            FieldType::Boolean => write!(f, "Z"),
            FieldType::Object(class_name) => write!(f, "L{class_name};"),
            FieldType::Array(component) => write!(f, "[{component}"),
        }
    }
}

/// A parsed method descriptor such as `(IJ[Ljava/lang/String;)V`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub parameters: Vec<FieldType>,
    // None for void
    pub return_type: Option<FieldType>,
}

impl MethodDescriptor {
    pub fn parse(descriptor: &str) -> VmExecResult<MethodDescriptor> {
        let mut chars = descriptor.chars();
        if chars.next() != Some('(') {
            return Err(invalid_descriptor(descriptor));
        }
        let mut parameters = Vec::new();
        loop {
            let rest = chars.as_str();
            if rest.starts_with(')') {
                chars.next();
                break;
            }
            if rest.is_empty() {
                return Err(invalid_descriptor(descriptor));
            }
            parameters.push(FieldType::parse_from(descriptor, &mut chars)?);
        }
        let return_type = if chars.as_str() == "V" {
            None
        } else {
            Some(FieldType::parse(chars.as_str()).map_err(|_| invalid_descriptor(descriptor))?)
        };
        Ok(MethodDescriptor {
            parameters,
            return_type,
        })
    }

    /// Number of operand stack entries the arguments occupy in this interpreter.
    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    /// Number of local variable slots the arguments occupy, long and double counting twice.
    pub fn parameter_slots(&self) -> usize {
        self.parameters
            .iter()
            .map(|p| if p.is_category2() { 2 } else { 1 })
            .sum()
    }
}

fn invalid_descriptor(descriptor: &str) -> VmError {
    VmError::ClassFormatError(format!("invalid descriptor: {descriptor}"))
}

/// `java/lang/String` -> `java.lang.String`, `[I` -> `int[]`
pub fn java_name(internal_name: &str) -> String {
    if internal_name.starts_with('[') {
        if let Ok(field_type) = FieldType::parse(internal_name) {
            return type_display_name(&field_type);
        }
    }
    internal_name.replace('/', ".")
}

fn type_display_name(field_type: &FieldType) -> String {
    match field_type {
        FieldType::Byte => "byte".to_string(),
        FieldType::Char => "char".to_string(),
        FieldType::Double => "double".to_string(),
        FieldType::Float => "float".to_string(),
        FieldType::Int => "int".to_string(),
        FieldType::Long => "long".to_string(),
        FieldType::Short => "short".to_string(),
        FieldType::Boolean => "boolean".to_string(),
        FieldType::Object(class_name) => class_name.replace('/', "."),
        FieldType::Array(component) => format!("{}[]", type_display_name(component)),
    }
}
