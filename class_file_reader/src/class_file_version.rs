use crate::class_file_error::{ClassFileError, Result};

/// Newest release this reader understands unless told otherwise.
pub const DEFAULT_MAX_JAVA_VERSION: u16 = 21;

const JDK_1_1_MAJOR: u16 = 45;
// Major versions from Java 5 on are `44 + release`.
const MAJOR_TO_RELEASE_OFFSET: u16 = 44;

//https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.1-200-B.2
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, strum_macros::Display)]
pub enum ClassFileVersion {
    Jdk1_1,
    Jdk1_2,
    Jdk1_3,
    Jdk1_4,
    Jdk5,
    Jdk6,
    Jdk7,
    #[default]
    Jdk8,
    Jdk9,
    Jdk10,
    Jdk11,
    Jdk12,
    Jdk13,
    Jdk14,
    Jdk15,
    Jdk16,
    Jdk17,
    Jdk18,
    Jdk19,
    Jdk20,
    Jdk21,
}

impl ClassFileVersion {
    const ALL: [ClassFileVersion; 21] = [
        ClassFileVersion::Jdk1_1,
        ClassFileVersion::Jdk1_2,
        ClassFileVersion::Jdk1_3,
        ClassFileVersion::Jdk1_4,
        ClassFileVersion::Jdk5,
        ClassFileVersion::Jdk6,
        ClassFileVersion::Jdk7,
        ClassFileVersion::Jdk8,
        ClassFileVersion::Jdk9,
        ClassFileVersion::Jdk10,
        ClassFileVersion::Jdk11,
        ClassFileVersion::Jdk12,
        ClassFileVersion::Jdk13,
        ClassFileVersion::Jdk14,
        ClassFileVersion::Jdk15,
        ClassFileVersion::Jdk16,
        ClassFileVersion::Jdk17,
        ClassFileVersion::Jdk18,
        ClassFileVersion::Jdk19,
        ClassFileVersion::Jdk20,
        ClassFileVersion::Jdk21,
    ];

    /// The class file major version written by this release.
    pub fn major(&self) -> u16 {
        JDK_1_1_MAJOR + *self as u16
    }

    /// Java release number, counting 1.1 through 1.4 as release 1.
    pub fn java_version(&self) -> u16 {
        match self.major() {
            major if major < 49 => 1,
            major => major - MAJOR_TO_RELEASE_OFFSET,
        }
    }

    /// Creates a version from the major and minor versions specified in the class file,
    /// rejecting files newer than `max_java_version`.
    pub fn new(major: u16, minor: u16, max_java_version: u16) -> Result<ClassFileVersion> {
        let unsupported = ClassFileError::UnsupportedVersion {
            major,
            minor,
            max_java_version,
        };
        if major > max_java_version.saturating_add(MAJOR_TO_RELEASE_OFFSET) {
            return Err(unsupported);
        }
        major
            .checked_sub(JDK_1_1_MAJOR)
            .and_then(|offset| Self::ALL.get(offset as usize).copied())
            .ok_or(unsupported)
    }
}
