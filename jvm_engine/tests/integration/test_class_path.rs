use crate::class_builder::{index, ClassBuilder, Code};
use jvm_engine::class_finder::{FileSystemClassPath, JarFileClassPath};
use jvm_engine::interpreter::ExecutionOutcome;
use jvm_engine::jvm_error::VmError;
use jvm_engine::virtual_machine::{SharedBuffer, VirtualMachine};
use std::fs;
use std::io::Write;
use std::path::Path;
use zip::write::FileOptions;
use zip::ZipWriter;

const HELLO2: &[u8] = include_bytes!("../resources/Hello2.class");
const HELLO2_OUTPUT: &str = "-1\n1\n3\n5\n7\n9\n11\n13\n15\n17\n";

fn greeter() -> Vec<u8> {
    let mut class = ClassBuilder::new("demo/Greeter");
    let out = index(class.field_ref("java/lang/System", "out", "Ljava/io/PrintStream;"));
    let println = index(class.method_ref("java/io/PrintStream", "println", "(Ljava/lang/String;)V"));
    let hi = class.string("hi") as u8;
    class
        .static_method(
            "main",
            "([Ljava/lang/String;)V",
            // System.out.println("hi");
            Code::new(2, 1, [&[0xb2][..], &out, &[0x12, hi, 0xb6], &println, &[0xb1]].concat()),
        )
        .build()
}

fn vm_with_stdout() -> (VirtualMachine, SharedBuffer, SharedBuffer) {
    let mut vm = VirtualMachine::new();
    let stdout = SharedBuffer::new();
    let stderr = SharedBuffer::new();
    vm.set_stdout(Box::new(stdout.clone()));
    vm.set_stderr(Box::new(stderr.clone()));
    (vm, stdout, stderr)
}

fn write_jar(path: &Path, entries: &[(&str, &[u8])]) {
    let mut zip = ZipWriter::new(fs::File::create(path).unwrap());
    for (name, bytes) in entries {
        zip.start_file(*name, FileOptions::default()).unwrap();
        zip.write_all(bytes).unwrap();
    }
    zip.finish().unwrap();
}

#[test]
fn runs_classes_from_a_directory() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("demo")).unwrap();
    fs::write(dir.path().join("demo/Greeter.class"), greeter()).unwrap();
    fs::write(dir.path().join("Hello2.class"), HELLO2).unwrap();

    let (mut vm, stdout, _) = vm_with_stdout();
    vm.add_class_path(Box::new(FileSystemClassPath::new(dir.path().to_str().unwrap()).unwrap()));
    assert_eq!(ExecutionOutcome::Completed(None), vm.run_main("demo.Greeter", &[]));
    assert_eq!(ExecutionOutcome::Completed(None), vm.run_main("Hello2", &[]));
    assert_eq!(format!("hi\n{HELLO2_OUTPUT}"), stdout.contents());
}

#[test]
fn class_file_under_the_wrong_name_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("demo")).unwrap();
    fs::write(dir.path().join("demo/Other.class"), greeter()).unwrap();

    let (mut vm, _, stderr) = vm_with_stdout();
    vm.add_class_path(Box::new(FileSystemClassPath::new(dir.path().to_str().unwrap()).unwrap()));
    let outcome = vm.run_main("demo/Other", &[]);
    assert!(matches!(outcome, ExecutionOutcome::Fatal(VmError::ClassNotFound(_))));
    assert!(stderr.contents().contains("wrong name: demo/Greeter"));
}

#[test]
fn runs_the_main_class_of_a_jar() {
    let dir = tempfile::tempdir().unwrap();
    let jar = dir.path().join("app.jar");
    let greeter = greeter();
    write_jar(
        &jar,
        &[
            ("META-INF/MANIFEST.MF", &b"Manifest-Version: 1.0\r\nMain-Class: demo.Greeter\r\n\r\n"[..]),
            ("demo/Greeter.class", &greeter[..]),
            ("Hello2.class", HELLO2),
        ],
    );

    let jar_path = JarFileClassPath::new(jar.to_str().unwrap()).unwrap();
    let main_class = jar_path.main_class().unwrap().unwrap();
    assert_eq!("demo/Greeter", main_class);

    let (mut vm, stdout, _) = vm_with_stdout();
    vm.add_class_path(Box::new(jar_path));
    assert_eq!(ExecutionOutcome::Completed(None), vm.run_main(&main_class, &[]));
    assert_eq!(ExecutionOutcome::Completed(None), vm.run_main("Hello2", &[]));
    assert_eq!(format!("hi\n{HELLO2_OUTPUT}"), stdout.contents());
}

#[test]
fn earlier_class_path_entries_win() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    fs::create_dir_all(first.path().join("demo")).unwrap();
    fs::write(first.path().join("demo/Greeter.class"), greeter()).unwrap();
    let jar = second.path().join("broken.jar");
    write_jar(&jar, &[("demo/Greeter.class", &b"not a class file"[..])]);

    let (mut vm, stdout, _) = vm_with_stdout();
    vm.add_class_path(Box::new(FileSystemClassPath::new(first.path().to_str().unwrap()).unwrap()));
    vm.add_class_path(Box::new(JarFileClassPath::new(jar.to_str().unwrap()).unwrap()));
    assert_eq!(ExecutionOutcome::Completed(None), vm.run_main("demo.Greeter", &[]));
    assert_eq!("hi\n", stdout.contents());
}

#[test]
fn corrupt_class_file_is_a_format_error() {
    let dir = tempfile::tempdir().unwrap();
    let jar = dir.path().join("broken.jar");
    write_jar(&jar, &[("Broken.class", &[0xca_u8, 0xfe, 0xba, 0xbe, 0, 0][..])]);

    let (mut vm, _, stderr) = vm_with_stdout();
    vm.add_class_path(Box::new(JarFileClassPath::new(jar.to_str().unwrap()).unwrap()));
    let outcome = vm.run_main("Broken", &[]);
    assert!(matches!(outcome, ExecutionOutcome::Fatal(VmError::ClassFormatError(_))));
    assert!(stderr.contents().starts_with("Error: class format error"));
}
