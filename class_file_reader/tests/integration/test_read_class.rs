use class_file_reader::attribute_info::AttributeType;
use class_file_reader::class_file::ClassAccessFlags;
use class_file_reader::class_file_reader::{read_buffer, read_buffer_with_max_version};
use class_file_reader::class_file_version::ClassFileVersion;
use class_file_reader::instruction::{check_code, read_one_instruction, Instruction};
use class_file_reader::method_info::MethodAccessFlags;

const HELLO2: &[u8] = include_bytes!("../resources/Hello2.class");

#[test]
fn test_read_class() {
    let class = read_buffer(HELLO2).unwrap();
    assert_eq!(ClassAccessFlags::SUPER, class.access_flags);
    assert_eq!(class.version, ClassFileVersion::Jdk11);
    assert_eq!(class.this_class_name, "Hello2");
    assert_eq!(class.super_class_name.as_deref(), Some("java/lang/Object"));
    assert_eq!(class.method_info.len(), 3);
    assert_eq!(class.source_file().as_deref(), Some("Hello2.java"));
    assert!(!class.is_interface());
}

#[test]
fn test_display_summary() {
    let class = read_buffer(HELLO2).unwrap();
    let summary = class.to_string();
    assert!(summary.starts_with("Class Hello2(extends java/lang/Object)\n"));
    assert!(summary.ends_with("methods: 3"));
}

#[test]
fn test_methods_of_hello2() {
    let class = read_buffer(HELLO2).unwrap();
    let main = class
        .method_info
        .iter()
        .find(|m| m.name == "main")
        .unwrap();
    assert_eq!("([Ljava/lang/String;)V", main.descriptor);
    assert!(main
        .access_flags
        .contains(MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC));
    let code = main
        .attributes
        .iter()
        .find(|attr| attr.name == AttributeType::Code)
        .unwrap();
    // max_stack, max_locals, code_length, code
    let code_length = u32::from_be_bytes([code.info[4], code.info[5], code.info[6], code.info[7]]);
    let bytecode = &code.info[8..8 + code_length as usize];
    check_code(bytecode).unwrap();
    assert_eq!(
        (Instruction::Goto(21), 3),
        read_one_instruction(bytecode, 2).unwrap()
    );
    assert_eq!(
        (Instruction::If_icmplt(-21), 3),
        read_one_instruction(bytecode, 26).unwrap()
    );
}

#[test]
fn test_invalid_magic_number() {
    let err = read_buffer(&[0xCA, 0xFE]).unwrap_err();
    assert!(err.to_string().contains("invalid magic number"));
}

#[test]
fn test_unsupported_version() {
    let mut bytes = HELLO2.to_vec();
    bytes[6] = 0;
    bytes[7] = 99;
    let err = read_buffer(&bytes).unwrap_err();
    assert!(err
        .to_string()
        .contains("supports only Java versions through Java 21"));

    let err = read_buffer_with_max_version(HELLO2, 8).unwrap_err();
    assert!(err
        .to_string()
        .contains("supports only Java versions through Java 8"));
}

#[test]
fn test_trailing_bytes_are_rejected() {
    let mut bytes = HELLO2.to_vec();
    bytes.push(0);
    assert!(read_buffer(&bytes).is_err());
}
