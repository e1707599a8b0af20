/// Attribute names the reader recognises. Anything else is carried as `Other`.
/// [jvms-4.7](https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.7)
#[derive(Debug, Clone, PartialEq, Eq, strum_macros::Display)]
pub enum AttributeType {
    ConstantValue,
    Code,
    StackMapTable,
    Exceptions,
    InnerClasses,
    EnclosingMethod,
    Synthetic,
    Signature,
    SourceFile,
    SourceDebugExtension,
    LineNumberTable,
    LocalVariableTable,
    LocalVariableTypeTable,
    Deprecated,
    BootstrapMethods,
    MethodParameters,
    NestHost,
    NestMembers,
    Other(String),
}

impl AttributeType {
    pub fn by_name(name: &str) -> AttributeType {
        match name {
            "ConstantValue" => AttributeType::ConstantValue,
            "Code" => AttributeType::Code,
            "StackMapTable" => AttributeType::StackMapTable,
            "Exceptions" => AttributeType::Exceptions,
            "InnerClasses" => AttributeType::InnerClasses,
            "EnclosingMethod" => AttributeType::EnclosingMethod,
            "Synthetic" => AttributeType::Synthetic,
            "Signature" => AttributeType::Signature,
            "SourceFile" => AttributeType::SourceFile,
            "SourceDebugExtension" => AttributeType::SourceDebugExtension,
            "LineNumberTable" => AttributeType::LineNumberTable,
            "LocalVariableTable" => AttributeType::LocalVariableTable,
            "LocalVariableTypeTable" => AttributeType::LocalVariableTypeTable,
            "Deprecated" => AttributeType::Deprecated,
            "BootstrapMethods" => AttributeType::BootstrapMethods,
            "MethodParameters" => AttributeType::MethodParameters,
            "NestHost" => AttributeType::NestHost,
            "NestMembers" => AttributeType::NestMembers,
            other => AttributeType::Other(other.to_string()),
        }
    }
}

/// Raw attribute as it appears in a class, field, method or code structure.
#[derive(Debug, PartialEq)]
pub struct AttributeInfo {
    pub name: AttributeType,
    pub info: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use crate::attribute_info::AttributeType;

    #[test]
    fn known_names_are_recognised() {
        assert_eq!(AttributeType::Code, AttributeType::by_name("Code"));
        assert_eq!(
            AttributeType::LineNumberTable,
            AttributeType::by_name("LineNumberTable")
        );
    }

    #[test]
    fn unknown_names_are_kept() {
        assert_eq!(
            AttributeType::Other("Kotlin".to_string()),
            AttributeType::by_name("Kotlin")
        );
        assert_eq!("SourceFile", AttributeType::SourceFile.to_string());
    }
}
