//! Command line launcher for the engine.
//!
//! Exit codes:
//! - 0: the main method returned
//! - 1: bad command line, class path or main class, verify errors
//! - 2: an exception reached the bottom of the stack
//! - n: `System.exit(n)`

use clap::Parser;
use class_file_reader::class_file_version::DEFAULT_MAX_JAVA_VERSION;
use jvm_engine::class_finder::{ClassPath, FileSystemClassPath, JarFileClassPath};
use jvm_engine::interpreter::EXIT_CODE_FATAL;
use jvm_engine::jvm_error::{VmError, VmExecResult};
use jvm_engine::virtual_machine::{VirtualMachine, VmOptions, DEFAULT_HEAP_CAPACITY, DEFAULT_MAX_STACK_DEPTH};
use log::{debug, LevelFilter};
use std::ffi::OsString;
use std::process;

/// Words of this variable are inserted before the command line arguments.
const OPTIONS_ENV: &str = "JVM_ENGINE_OPTIONS";

#[derive(Parser, Debug)]
#[command(name = "jvm_engine")]
#[command(about = "Runs the main method of a Java class", long_about = None)]
#[command(version)]
struct Cli {
    /// Class search path of directories and jar files
    #[arg(long = "classpath", visible_alias = "cp", default_value = ".")]
    classpath: OsString,

    /// Run the Main-Class of this jar file
    #[arg(long)]
    jar: Option<String>,

    /// Log every executed instruction
    #[arg(long)]
    trace: bool,

    /// Newest class file version accepted, as a Java release
    #[arg(long, default_value_t = DEFAULT_MAX_JAVA_VERSION)]
    max_java_version: u16,

    /// Maximum number of live heap objects
    #[arg(long, default_value_t = DEFAULT_HEAP_CAPACITY)]
    heap_capacity: usize,

    /// Maximum depth of the frame stack
    #[arg(long, default_value_t = DEFAULT_MAX_STACK_DEPTH)]
    max_stack_depth: usize,

    /// More logging, may be repeated
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Main class, with dots or slashes, unless --jar is given
    #[arg(required_unless_present = "jar")]
    main_class: Option<String>,

    /// Arguments passed to main
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

impl Cli {
    fn log_level(&self) -> LevelFilter {
        if self.trace {
            return LevelFilter::Trace;
        }
        match self.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    fn vm_options(&self) -> VmOptions {
        VmOptions {
            max_java_version: self.max_java_version,
            trace: self.trace,
            heap_capacity: self.heap_capacity,
            max_stack_depth: self.max_stack_depth,
        }
    }
}

/// Long options followed by a separate value word.
const VALUE_OPTIONS: &[&str] = &[
    "--classpath",
    "--cp",
    "--jar",
    "--max-java-version",
    "--heap-capacity",
    "--max-stack-depth",
];

// program name, then the words of JVM_ENGINE_OPTIONS, then the real arguments.
// The single dash `-cp` and `-classpath` of the java launcher are accepted too.
fn command_line(env_options: Option<String>, mut args: impl Iterator<Item = String>) -> Vec<String> {
    let mut command_line: Vec<String> = args.next().into_iter().collect();
    let mut rest: Vec<String> = Vec::new();
    if let Some(options) = env_options {
        rest.extend(options.split_whitespace().map(str::to_string));
    }
    rest.extend(args);
    let mut words = rest.into_iter();
    while let Some(word) = words.next() {
        if !word.starts_with('-') {
            // the main class: everything after it belongs to the program
            command_line.push(word);
            command_line.extend(words.by_ref());
            break;
        }
        let word = match word.as_str() {
            "-cp" | "-classpath" => "--classpath".to_string(),
            _ => word,
        };
        let takes_value = VALUE_OPTIONS.contains(&word.as_str());
        command_line.push(word);
        if takes_value {
            command_line.extend(words.next());
        }
    }
    command_line
}

fn class_path_entry(path: &str) -> VmExecResult<Box<dyn ClassPath>> {
    if path.ends_with(".jar") {
        Ok(Box::new(JarFileClassPath::new(path)?))
    } else {
        Ok(Box::new(FileSystemClassPath::new(path)?))
    }
}

// builds the machine and works out which class to run and with what arguments
fn prepare(cli: Cli) -> VmExecResult<(VirtualMachine, String, Vec<String>)> {
    let mut vm = VirtualMachine::with_options(cli.vm_options());
    let mut args = cli.args;
    let main_class = match &cli.jar {
        Some(jar) => {
            let jar_path = JarFileClassPath::new(jar)?;
            let main_class = jar_path
                .main_class()?
                .ok_or_else(|| VmError::ReadJarFileError(format!("no Main-Class in {jar}")))?;
            vm.add_class_path(Box::new(jar_path));
            // with --jar every positional is a program argument
            if let Some(first) = cli.main_class {
                args.insert(0, first);
            }
            main_class
        }
        None => cli.main_class.unwrap_or_default(),
    };
    for path in std::env::split_paths(&cli.classpath) {
        let path = path.to_string_lossy().to_string();
        if path.is_empty() {
            continue;
        }
        debug!("class path entry {path}");
        vm.add_class_path(class_path_entry(&path)?);
    }
    Ok((vm, main_class, args))
}

fn main() {
    let cli = Cli::parse_from(command_line(
        std::env::var(OPTIONS_ENV).ok(),
        std::env::args(),
    ));
    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_default_env()
        .init();

    let (mut vm, main_class, args) = match prepare(cli) {
        Ok(prepared) => prepared,
        Err(e) => {
            debug!("{e}");
            eprintln!("Error: {e}");
            process::exit(EXIT_CODE_FATAL);
        }
    };
    let outcome = vm.run_main(&main_class, &args);
    debug!("{main_class} finished with {outcome:?}");
    process::exit(outcome.exit_code());
}
