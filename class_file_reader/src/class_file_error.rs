use thiserror::Error;

/// Models the possible errors returned when reading a .class file
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ClassFileError {
    #[error("invalid class data: {0}")]
    InvalidClassData(String),
    #[error("invalid magic number: {0:#010X}")]
    InvalidMagicNumber(u32),
    #[error("invalid magic number: class data is only {0} bytes long")]
    TruncatedMagicNumber(usize),
    #[error("class file version {major}.{minor}: this JVM supports only Java versions through Java {max_java_version}")]
    UnsupportedVersion {
        major: u16,
        minor: u16,
        max_java_version: u16,
    },

    #[error("constant pool tag not supported: {0}")]
    ConstantPoolTagNotSupport(u8),
    #[error("invalid const pool index {0}")]
    InvalidConstantPoolIndexError(u16),
    #[error("invalid method handler kind {0}")]
    InvalidMethodHandlerKind(u8),

    #[error("unexpected end of data")]
    UnexpectedEndOfData,
    #[error("invalid cesu8 string")]
    InvalidCesu8String,

    #[error("invalid code: {0}")]
    InvalidCode(String),
}

pub type Result<T> = std::result::Result<T, ClassFileError>;
