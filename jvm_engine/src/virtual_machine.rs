use crate::class_finder::ClassPath;
use crate::descriptor::{java_name, FieldType};
use crate::interpreter::{ExecutionOutcome, Interpreter};
use crate::java_exception::{InvokeResult, JavaExceptionKind, MethodCallError};
use crate::jvm_error::{verify_error, VmError, VmExecResult};
use crate::jvm_values::{ObjectRef, Value};
use crate::loaded_class::{ClassId, ClassStatus};
use crate::method_area::{MethodArea, MethodEntry};
use crate::native_method_area::NativeMethodArea;
use crate::object_heap::{ArrayData, Object, ObjectHeap};
use crate::runtime_attribute_info::ConstantValueAttribute;
use crate::stack_frame::StackFrame;
use crate::static_field_area::StaticArea;
use crate::string_pool::StringPool;
use class_file_reader::class_file_version::DEFAULT_MAX_JAVA_VERSION;
use log::{debug, info};
use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;
use std::time::Instant;

pub const DEFAULT_HEAP_CAPACITY: usize = 1 << 20;
pub const DEFAULT_MAX_STACK_DEPTH: usize = 1024;
pub const MAIN_THREAD_ID: u32 = 1;

/// Knobs of one virtual machine instance.
#[derive(Debug, Clone, PartialEq)]
pub struct VmOptions {
    /// Newest class file version accepted, as a Java release number.
    pub max_java_version: u16,
    /// Log every executed instruction at `trace` level.
    pub trace: bool,
    /// Maximum number of live heap objects before `OutOfMemoryError`.
    pub heap_capacity: usize,
    /// Maximum frame stack depth before `StackOverflowError`.
    pub max_stack_depth: usize,
}

impl Default for VmOptions {
    fn default() -> Self {
        VmOptions {
            max_java_version: DEFAULT_MAX_JAVA_VERSION,
            trace: false,
            heap_capacity: DEFAULT_HEAP_CAPACITY,
            max_stack_depth: DEFAULT_MAX_STACK_DEPTH,
        }
    }
}

/// In-memory writer whose clones share one buffer. Lets a caller keep a
/// handle on what the program printed after giving the writer to the VM.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> SharedBuffer {
        SharedBuffer::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).to_string()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// The virtual machine: entry point of the engine.
///
/// Owns the method area, the heap, the static store and the intrinsic
/// registry. Frames are not owned here; each run builds an `Interpreter`
/// with its own frame stack and lends it the machine.
/// https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-5.html#jvms-5.2
pub struct VirtualMachine {
    pub(crate) options: VmOptions,
    pub(crate) method_area: MethodArea,
    pub(crate) object_heap: ObjectHeap,
    pub(crate) static_area: StaticArea,
    pub(crate) native_method_area: NativeMethodArea,
    pub(crate) strings: StringPool,
    pub(crate) start_time: Instant,
    stdout: Box<dyn Write>,
    stderr: Box<dyn Write>,
}

impl Default for VirtualMachine {
    fn default() -> Self {
        VirtualMachine::new()
    }
}

impl VirtualMachine {
    pub fn new() -> VirtualMachine {
        VirtualMachine::with_options(VmOptions::default())
    }

    pub fn with_options(options: VmOptions) -> VirtualMachine {
        VirtualMachine {
            method_area: MethodArea::new(options.max_java_version),
            object_heap: ObjectHeap::new(options.heap_capacity),
            static_area: StaticArea::new(),
            native_method_area: NativeMethodArea::new_with_default_native(),
            strings: StringPool::new(),
            start_time: Instant::now(),
            stdout: Box::new(std::io::stdout()),
            stderr: Box::new(std::io::stderr()),
            options,
        }
    }

    pub fn options(&self) -> &VmOptions {
        &self.options
    }

    pub fn add_class_path(&mut self, class_path: Box<dyn ClassPath>) {
        self.method_area.add_class_path(class_path);
    }

    pub fn set_stdout(&mut self, stdout: Box<dyn Write>) {
        self.stdout = stdout;
    }

    pub fn set_stderr(&mut self, stderr: Box<dyn Write>) {
        self.stderr = stderr;
    }

    pub fn method_area(&self) -> &MethodArea {
        &self.method_area
    }

    pub fn object_heap(&self) -> &ObjectHeap {
        &self.object_heap
    }

    pub fn native_method_area_mut(&mut self) -> &mut NativeMethodArea {
        &mut self.native_method_area
    }

    pub(crate) fn stdout(&mut self) -> &mut dyn Write {
        self.stdout.as_mut()
    }

    pub(crate) fn stderr(&mut self) -> &mut dyn Write {
        self.stderr.as_mut()
    }

    pub fn load_class(&mut self, class_name: &str) -> VmExecResult<ClassId> {
        self.method_area.load_class(class_name, &mut self.strings)
    }

    pub fn resolve_method(
        &mut self,
        class_id: ClassId,
        name: &str,
        descriptor: &str,
    ) -> VmExecResult<MethodEntry> {
        self.method_area
            .resolve_method(class_id, name, descriptor, &self.native_method_area)
    }

    /// Starts initializing `class_id` and its superclasses.
    ///
    /// Static fields get their `ConstantValue` or default and an intrinsic
    /// `<clinit>` runs at once. A bytecode `<clinit>` is handed back as a frame
    /// for the caller to run; the class stays `Initializing` until that frame
    /// returns. Only one class is started per call, so the caller retries
    /// until it gets `None`.
    pub(crate) fn initialize_class(
        &mut self,
        class_id: ClassId,
        thread_id: u32,
    ) -> InvokeResult<Option<StackFrame>> {
        let class = self.method_area.class(class_id);
        if class.is_initialized() {
            return Ok(None);
        }
        if let Some(super_class) = class.super_class {
            if let Some(frame) = self.initialize_class(super_class, thread_id)? {
                return Ok(Some(frame));
            }
        }
        let class = self.method_area.class_mut(class_id);
        class.status = ClassStatus::Initializing;
        debug!("initializing {}", class.name);
        let statics: Vec<(String, FieldType, Option<ConstantValueAttribute>)> = class
            .static_fields()
            .map(|f| (f.name.clone(), f.field_type.clone(), f.constant_value.clone()))
            .collect();
        for (name, field_type, constant_value) in statics {
            let value = match constant_value {
                Some(ConstantValueAttribute::Int(v)) => Value::Int(v),
                Some(ConstantValueAttribute::Float(v)) => Value::Float(v),
                Some(ConstantValueAttribute::Long(v)) => Value::Long(v),
                Some(ConstantValueAttribute::Double(v)) => Value::Double(v),
                Some(ConstantValueAttribute::String(v)) => Value::ObjectRef(self.intern_string(&v)?),
                None => field_type.default_value(),
            };
            self.static_area.set_static_field(class_id, &name, value);
        }
        let clinit =
            self.method_area
                .method_in_class(class_id, "<clinit>", "()V", &self.native_method_area);
        match clinit {
            Some(MethodEntry::Bytecode { class, method }) => Ok(Some(StackFrame::new(
                self,
                class,
                method,
                Vec::new(),
                thread_id,
            )?)),
            Some(MethodEntry::Intrinsic(native)) => {
                native(self, Vec::new()).map_err(MethodCallError::from)?;
                self.mark_initialized(class_id);
                Ok(None)
            }
            None => {
                self.mark_initialized(class_id);
                Ok(None)
            }
        }
    }

    pub(crate) fn mark_initialized(&mut self, class_id: ClassId) {
        let class = self.method_area.class_mut(class_id);
        class.status = ClassStatus::Initialized;
        debug!("initialized {}", class.name);
    }

    // runs every pending <clinit> of `class_id` to completion
    fn ensure_initialized(&mut self, class_id: ClassId) -> Result<(), ExecutionOutcome> {
        loop {
            match self.initialize_class(class_id, MAIN_THREAD_ID) {
                Ok(None) => return Ok(()),
                Ok(Some(frame)) => match Interpreter::new(self, MAIN_THREAD_ID).run_frame(frame) {
                    ExecutionOutcome::Completed(_) => {}
                    outcome => return Err(outcome),
                },
                Err(e) => return Err(Interpreter::new(self, MAIN_THREAD_ID).raise_outside(e)),
            }
        }
    }

    pub fn get_static_field(&self, class_id: ClassId, field_name: &str) -> Option<Value> {
        self.static_area.get_static_field(class_id, field_name)
    }

    pub(crate) fn set_static_field(&mut self, class_id: ClassId, field_name: &str, value: Value) {
        self.static_area.set_static_field(class_id, field_name, value);
    }

    // a fresh instance of `class_id` with every instance field zeroed
    fn instantiate(&self, class_id: ClassId) -> Object {
        let mut object = Object::new(self.method_area.class(class_id).name_index);
        for field in self.method_area.instance_fields(class_id) {
            object.add_field(&field.name, &field.descriptor, field.field_type.default_value());
        }
        object
    }

    fn allocate(&mut self, object: Object) -> InvokeResult<ObjectRef> {
        self.object_heap.allocate(object).ok_or_else(out_of_memory)
    }

    pub fn new_object(&mut self, class_id: ClassId) -> InvokeResult<ObjectRef> {
        let object = self.instantiate(class_id);
        self.allocate(object)
    }

    /// A zero filled array of class `descriptor` with `length` elements. The
    /// element budget is charged before any storage is reserved.
    pub fn new_zeroed_array(&mut self, descriptor: &str, length: usize) -> InvokeResult<ObjectRef> {
        let component = descriptor.strip_prefix('[').unwrap_or(descriptor);
        if !self.object_heap.reserve_elements(length) {
            return Err(out_of_memory());
        }
        let data = ArrayData::try_new(component, length).ok_or_else(out_of_memory)?;
        self.new_array(descriptor, data)
    }

    /// A new array object of class `descriptor`, e.g. `[I`.
    pub fn new_array(&mut self, descriptor: &str, data: ArrayData) -> InvokeResult<ObjectRef> {
        let class_name = self.strings.intern(descriptor);
        self.allocate(Object::new_array(class_name, descriptor, data))
    }

    /// A new, not interned, `java/lang/String`.
    pub fn new_string(&mut self, value: &str) -> InvokeResult<ObjectRef> {
        let class_id = self.load_class("java/lang/String")?;
        let class_name = self.method_area.class(class_id).name_index;
        self.allocate(Object::new_string(class_name, value))
    }

    /// The canonical string object for `value`, as produced by `ldc`.
    pub fn intern_string(&mut self, value: &str) -> InvokeResult<ObjectRef> {
        if let Some(object_ref) = self.static_area.get_string(value) {
            return Ok(object_ref);
        }
        let object_ref = self.new_string(value)?;
        self.static_area.cache_string(value, object_ref);
        Ok(object_ref)
    }

    pub fn string_value(&self, object_ref: ObjectRef) -> VmExecResult<String> {
        let object = self.object_heap.get(object_ref)?;
        if self.strings.get(object.class_name) != "java/lang/String" {
            return Err(verify_error!(
                "expected java/lang/String, found {}",
                self.strings.get(object.class_name)
            ));
        }
        object
            .string_value()
            .ok_or_else(|| verify_error!("string {object_ref} has no value"))
    }

    /// The `java/lang/Class` mirror of `class_name`, one per name.
    pub fn class_object(&mut self, class_name: &str) -> InvokeResult<ObjectRef> {
        if let Some(object_ref) = self.static_area.get_class_object(class_name) {
            return Ok(object_ref);
        }
        let class_id = self.load_class("java/lang/Class")?;
        let object_ref = self.new_object(class_id)?;
        let name = self.intern_string(&java_name(class_name))?;
        self.object_heap
            .get_mut(object_ref)?
            .set_field_value("name", Value::ObjectRef(name));
        self.static_area.cache_class_object(class_name, object_ref);
        Ok(object_ref)
    }

    /// Builds an exception of `kind`. Exceptions bypass the heap budget so
    /// that running out of memory can itself be reported.
    pub fn new_exception(&mut self, kind: JavaExceptionKind, message: &str) -> VmExecResult<ObjectRef> {
        self.new_throwable(kind.class_name(), message)
    }

    pub fn new_throwable(&mut self, class_name: &str, message: &str) -> VmExecResult<ObjectRef> {
        let class_id = self.load_class(class_name)?;
        let mut object = self.instantiate(class_id);
        if !message.is_empty() {
            let string_class = self.load_class("java/lang/String")?;
            let string_class = self.method_area.class(string_class).name_index;
            let message = self
                .object_heap
                .allocate_reserved(Object::new_string(string_class, message));
            object.set_field_value("message", Value::ObjectRef(message));
        }
        Ok(self.object_heap.allocate_reserved(object))
    }

    /// Internal class name of the object, `[I` style for arrays.
    pub fn class_name_of(&self, object_ref: ObjectRef) -> VmExecResult<&str> {
        let object = self.object_heap.get(object_ref)?;
        Ok(self.strings.get(object.class_name))
    }

    pub fn is_instance_of(&self, object_ref: ObjectRef, class_name: &str) -> VmExecResult<bool> {
        let object_class = self.class_name_of(object_ref)?;
        Ok(self.method_area.is_assignable(object_class, class_name))
    }

    /// `getMessage()` of a throwable, None when it has none.
    pub fn throwable_message(&self, object_ref: ObjectRef) -> VmExecResult<Option<String>> {
        match self.object_heap.get(object_ref)?.field_value("message") {
            Some(Value::ObjectRef(message)) => Ok(Some(self.string_value(message)?)),
            _ => Ok(None),
        }
    }

    /// `Throwable.toString()`: `java.lang.ArithmeticException: / by zero`.
    pub fn describe_throwable(&self, object_ref: ObjectRef) -> VmExecResult<String> {
        let class_name = java_name(self.class_name_of(object_ref)?);
        Ok(match self.throwable_message(object_ref)? {
            Some(message) => format!("{class_name}: {message}"),
            None => class_name,
        })
    }

    pub(crate) fn report_fatal(&mut self, error: &VmError) {
        let line = if error.is_verify_error() {
            format!("Exception in thread \"main\" {error}")
        } else {
            format!("Error: {error}")
        };
        debug!("{line}");
        let _ = writeln!(self.stderr, "{line}");
        let _ = self.stderr.flush();
    }

    fn fatal(&mut self, error: VmError) -> ExecutionOutcome {
        self.report_fatal(&error);
        ExecutionOutcome::Fatal(error)
    }

    /// Runs `public static void main(String[])` of `main_class`, which may use
    /// dots or slashes as package separators.
    pub fn run_main(&mut self, main_class: &str, args: &[String]) -> ExecutionOutcome {
        let class_name = main_class.replace('.', "/");
        info!("running {class_name}.main with {} argument(s)", args.len());
        let array = match self.new_string_array(args) {
            Ok(array) => array,
            Err(e) => return Interpreter::new(self, MAIN_THREAD_ID).raise_outside(e),
        };
        self.invoke_static(
            &class_name,
            "main",
            "([Ljava/lang/String;)V",
            vec![Value::ObjectRef(array)],
        )
    }

    fn new_string_array(&mut self, values: &[String]) -> InvokeResult<ObjectRef> {
        let mut elements = Vec::with_capacity(values.len());
        for value in values {
            elements.push(Value::ObjectRef(self.new_string(value)?));
        }
        self.new_array("[Ljava/lang/String;", ArrayData::References(elements))
    }

    /// Runs a static method to completion on a fresh frame stack, initializing
    /// its class first.
    pub fn invoke_static(
        &mut self,
        class_name: &str,
        method_name: &str,
        descriptor: &str,
        args: Vec<Value>,
    ) -> ExecutionOutcome {
        let outcome = self.invoke_static_inner(class_name, method_name, descriptor, args);
        let _ = self.stdout.flush();
        let _ = self.stderr.flush();
        outcome
    }

    fn invoke_static_inner(
        &mut self,
        class_name: &str,
        method_name: &str,
        descriptor: &str,
        args: Vec<Value>,
    ) -> ExecutionOutcome {
        let class_id = match self.load_class(class_name) {
            Ok(class_id) => class_id,
            Err(e) => return self.fatal(e),
        };
        if let Err(outcome) = self.ensure_initialized(class_id) {
            return outcome;
        }
        let entry = match self.resolve_method(class_id, method_name, descriptor) {
            Ok(entry) => entry,
            Err(e) => return self.fatal(e),
        };
        match entry {
            MethodEntry::Intrinsic(native) => match native(self, args) {
                Ok(value) => ExecutionOutcome::Completed(value),
                Err(e) => Interpreter::new(self, MAIN_THREAD_ID).raise_outside(e.into()),
            },
            MethodEntry::Bytecode { class, method } => {
                if !method.is_static() {
                    return self.fatal(VmError::MethodNotFound(format!(
                        "{class_name}.{method_name}{descriptor} is not static"
                    )));
                }
                match StackFrame::new(self, class, method, args, MAIN_THREAD_ID) {
                    Ok(frame) => Interpreter::new(self, MAIN_THREAD_ID).run_frame(frame),
                    Err(e) => self.fatal(e),
                }
            }
        }
    }
}

pub(crate) fn out_of_memory() -> MethodCallError {
    MethodCallError::java(JavaExceptionKind::OutOfMemoryError, "Java heap space")
}
