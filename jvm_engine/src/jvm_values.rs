use std::fmt::{Display, Formatter};

/// Handle of an object living in the `ObjectHeap`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectRef(pub(crate) u32);

impl ObjectRef {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl Display for ObjectRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "@{:x}", self.0)
    }
}

/// A slot on the operand stack or in a local variable.
///
/// boolean, byte, char and short all ride on `Int`. Long and double take a single
/// operand stack entry; the two slot contract is kept in locals and in the
/// `dup2`/`pop2` family.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Null,
    ObjectRef(ObjectRef),
}

impl Value {
    pub fn is_category2(&self) -> bool {
        matches!(self, Value::Long(_) | Value::Double(_))
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, Value::Null | Value::ObjectRef(_))
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "Int",
            Value::Long(_) => "Long",
            Value::Float(_) => "Float",
            Value::Double(_) => "Double",
            Value::Null => "Null",
            Value::ObjectRef(_) => "Reference",
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            Value::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<ObjectRef> {
        match self {
            Value::ObjectRef(v) => Some(*v),
            _ => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(v) => write!(f, "Int({v})"),
            Value::Long(v) => write!(f, "Long({v})"),
            Value::Float(v) => write!(f, "Float({v})"),
            Value::Double(v) => write!(f, "Double({v})"),
            Value::Null => write!(f, "null"),
            Value::ObjectRef(v) => write!(f, "Ref({v})"),
        }
    }
}

/// `i2b`: keep the low 8 bits, sign extended.
pub fn narrow_to_byte(value: i32) -> i32 {
    value as i8 as i32
}

/// `i2s`: keep the low 16 bits, sign extended.
pub fn narrow_to_short(value: i32) -> i32 {
    value as i16 as i32
}

/// `i2c`: keep the low 16 bits, zero extended.
pub fn narrow_to_char(value: i32) -> i32 {
    value as u16 as i32
}

/// Primitive element types of `newarray`.
/// https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-6.html#jvms-6.5.newarray
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryType {
    Boolean,
    Char,
    Float,
    Double,
    Byte,
    Short,
    Int,
    Long,
}

impl PrimaryType {
    pub fn from_tag(tag: u8) -> Option<PrimaryType> {
        let primary_type = match tag {
            4 => PrimaryType::Boolean,
            5 => PrimaryType::Char,
            6 => PrimaryType::Float,
            7 => PrimaryType::Double,
            8 => PrimaryType::Byte,
            9 => PrimaryType::Short,
            10 => PrimaryType::Int,
            11 => PrimaryType::Long,
            _ => return None,
        };
        Some(primary_type)
    }

    pub fn descriptor(&self) -> char {
        match self {
            PrimaryType::Boolean => 'Z',
            PrimaryType::Char => 'C',
            PrimaryType::Float => 'F',
            PrimaryType::Double => 'D',
            PrimaryType::Byte => 'B',
            PrimaryType::Short => 'S',
            PrimaryType::Int => 'I',
            PrimaryType::Long => 'J',
        }
    }
}
