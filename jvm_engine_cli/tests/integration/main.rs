//! Runs the `jvm_engine` binary against real class files.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::write::FileOptions;
use zip::ZipWriter;

const HELLO_OUTPUT: &str = "-1\n1\n3\n5\n7\n9\n11\n13\n15\n17\n";

#[allow(deprecated)]
fn jvm_engine() -> Command {
    let mut command = Command::cargo_bin("jvm_engine").unwrap();
    command.env_remove("JVM_ENGINE_OPTIONS").env_remove("RUST_LOG");
    command
}

fn hello_class() -> Vec<u8> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .join("jvm_engine/tests/resources/Hello2.class");
    fs::read(path).unwrap()
}

fn class_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("Hello2.class"), hello_class()).unwrap();
    dir
}

fn hello_jar(dir: &TempDir, manifest: &str) -> PathBuf {
    let path = dir.path().join("hello.jar");
    let mut zip = ZipWriter::new(fs::File::create(&path).unwrap());
    zip.start_file("META-INF/MANIFEST.MF", FileOptions::default()).unwrap();
    zip.write_all(manifest.as_bytes()).unwrap();
    zip.start_file("Hello2.class", FileOptions::default()).unwrap();
    zip.write_all(&hello_class()).unwrap();
    zip.finish().unwrap();
    path
}

#[test]
fn help_exits_0() {
    jvm_engine()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: jvm_engine"));
}

#[test]
fn missing_main_class_argument_is_a_usage_error() {
    jvm_engine()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage: jvm_engine"));
}

#[test]
fn runs_main_from_a_directory() {
    let dir = class_dir();
    jvm_engine()
        .args(["-cp", dir.path().to_str().unwrap(), "Hello2"])
        .assert()
        .success()
        .stdout(HELLO_OUTPUT)
        .stderr("");
}

#[test]
fn long_classpath_option_and_current_directory() {
    let dir = class_dir();
    jvm_engine()
        .args(["--classpath", dir.path().to_str().unwrap(), "Hello2", "ignored", "-x"])
        .assert()
        .success()
        .stdout(HELLO_OUTPUT);
    jvm_engine()
        .current_dir(dir.path())
        .arg("Hello2")
        .assert()
        .success()
        .stdout(HELLO_OUTPUT);
}

#[test]
fn unknown_class_exits_1() {
    let dir = class_dir();
    jvm_engine()
        .args(["-cp", dir.path().to_str().unwrap(), "demo.Missing"])
        .assert()
        .code(1)
        .stdout("")
        .stderr(predicate::str::contains("Error: class not found: demo/Missing"));
}

#[test]
fn missing_class_path_entry_exits_1() {
    jvm_engine()
        .args(["-cp", "/definitely/not/here", "Hello2"])
        .assert()
        .code(1)
        .stderr("Error: class path does not exist: /definitely/not/here\n");
}

#[test]
fn runs_the_main_class_of_a_jar() {
    let dir = tempfile::tempdir().unwrap();
    let jar = hello_jar(&dir, "Manifest-Version: 1.0\r\nMain-Class: Hello2\r\n\r\n");
    jvm_engine()
        .args(["--jar", jar.to_str().unwrap()])
        .assert()
        .success()
        .stdout(HELLO_OUTPUT);
    // a jar on the class path works like a directory
    jvm_engine()
        .args(["-cp", jar.to_str().unwrap(), "Hello2"])
        .assert()
        .success()
        .stdout(HELLO_OUTPUT);
}

#[test]
fn jar_without_main_class_exits_1() {
    let dir = tempfile::tempdir().unwrap();
    let jar = hello_jar(&dir, "Manifest-Version: 1.0\r\n\r\n");
    jvm_engine()
        .args(["--jar", jar.to_str().unwrap()])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no Main-Class"));
}

#[test]
fn options_from_the_environment() {
    let dir = class_dir();
    jvm_engine()
        .env("JVM_ENGINE_OPTIONS", format!("-cp {}", dir.path().to_str().unwrap()))
        .arg("Hello2")
        .assert()
        .success()
        .stdout(HELLO_OUTPUT);
}

#[test]
fn trace_logs_instructions_to_stderr() {
    let dir = class_dir();
    jvm_engine()
        .args(["--trace", "-cp", dir.path().to_str().unwrap(), "Hello2"])
        .assert()
        .success()
        .stdout(HELLO_OUTPUT)
        .stderr(predicate::str::contains("Hello2.main").and(predicate::str::contains("TOS:")));
}

#[test]
fn old_max_java_version_rejects_the_class() {
    let dir = class_dir();
    jvm_engine()
        .args(["--max-java-version", "1", "-cp", dir.path().to_str().unwrap(), "Hello2"])
        .assert()
        .code(1)
        .stdout("")
        .stderr(predicate::str::starts_with("Error: class format error"));
    jvm_engine()
        .env("JVM_ENGINE_OPTIONS", "--heap-capacity 100")
        .args(["-cp", dir.path().to_str().unwrap(), "Hello2"])
        .assert()
        .success()
        .stdout(HELLO_OUTPUT);
}
