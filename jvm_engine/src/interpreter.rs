use crate::call_stack::CallStack;
use crate::java_exception::MethodCallError;
use crate::jvm_error::{VmError, VmExecResult};
use crate::jvm_values::{ObjectRef, Value};
use crate::stack_frame::{InstructionResult, StackFrame};
use crate::stack_trace_element::StackTraceElement;
use crate::virtual_machine::{VirtualMachine, MAIN_THREAD_ID};
use class_file_reader::instruction::read_one_instruction;
use log::{debug, trace};

pub const EXIT_CODE_NORMAL: i32 = 0;
pub const EXIT_CODE_FATAL: i32 = 1;
pub const EXIT_CODE_UNCAUGHT_EXCEPTION: i32 = 2;

/// How a run of the interpreter ended.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    /// The bottom frame returned, with its return value.
    Completed(Option<Value>),
    /// No handler caught the exception; its trace was printed.
    UncaughtException(ObjectRef),
    /// Verify errors and other unrecoverable conditions.
    Fatal(VmError),
    /// `System.exit` was called.
    ExitRequested(i32),
}

impl ExecutionOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            ExecutionOutcome::Completed(_) => EXIT_CODE_NORMAL,
            ExecutionOutcome::UncaughtException(_) => EXIT_CODE_UNCAUGHT_EXCEPTION,
            ExecutionOutcome::Fatal(_) => EXIT_CODE_FATAL,
            ExecutionOutcome::ExitRequested(code) => *code,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InterpreterState {
    Running,
    ExceptionPropagating(ObjectRef),
    Exited,
    Fatal,
}

// what the loop does after a step
enum Signal {
    Continue,
    FrameReturned,
    FrameExited(Option<Value>),
    ExceptionRaised(ObjectRef),
    Fatal(VmError),
    ShutdownRequested(i32),
}

/// Fetch-decode-execute loop over one thread's frame stack.
///
/// The interpreter borrows the virtual machine for the duration of a run.
/// Frames only ever talk to the machine through the `&mut VirtualMachine`
/// handed to `execute_instruction`, so there is a single owner of all
/// mutable state at any time.
pub struct Interpreter<'vm> {
    vm: &'vm mut VirtualMachine,
    call_stack: CallStack,
    state: InterpreterState,
    thread_id: u32,
}

impl<'vm> Interpreter<'vm> {
    pub fn new(vm: &'vm mut VirtualMachine, thread_id: u32) -> Interpreter<'vm> {
        let max_depth = vm.options.max_stack_depth;
        Interpreter {
            vm,
            call_stack: CallStack::new(thread_id, max_depth),
            state: InterpreterState::Running,
            thread_id,
        }
    }

    pub fn state(&self) -> InterpreterState {
        self.state
    }

    /// Runs `frame` and everything it calls until it returns or the thread ends.
    pub fn run_frame(mut self, frame: StackFrame) -> ExecutionOutcome {
        let signal = self.push_frame(frame);
        if let Some(outcome) = self.handle(signal) {
            return outcome;
        }
        loop {
            let signal = self.step();
            if let Some(outcome) = self.handle(signal) {
                return outcome;
            }
        }
    }

    /// Reports an error raised before any frame ran, e.g. by a native entry
    /// point or while building the arguments of `main`.
    pub fn raise_outside(mut self, error: MethodCallError) -> ExecutionOutcome {
        let signal = self.signal_for(error);
        self.handle(signal)
            .unwrap_or(ExecutionOutcome::Completed(None))
    }

    fn step(&mut self) -> Signal {
        let frame = match self.call_stack.top_mut() {
            Some(frame) => frame,
            None => return Signal::FrameExited(None),
        };
        let (instruction, length) = match read_one_instruction(&frame.code.code, frame.pc) {
            Ok(decoded) => decoded,
            Err(e) => {
                return Signal::Fatal(VmError::ClassFormatError(format!(
                    "{} pc {}: {e}",
                    frame.method_name(),
                    frame.pc
                )))
            }
        };
        if frame.trace {
            let tos = frame
                .op_stack
                .peek()
                .map_or_else(|_| "empty".to_string(), |v| v.to_string());
            trace!(
                "[thread {}] {} pc {:4} {:<16} TOS: {tos}",
                frame.thread_id,
                frame.method_name(),
                frame.pc,
                instruction.to_string()
            );
        }
        let next_pc = frame.pc + length;
        match frame.execute_instruction(self.vm, &instruction) {
            Ok(InstructionResult::Continue) => {
                frame.pc = next_pc;
                Signal::Continue
            }
            Ok(InstructionResult::Jump(target)) => {
                frame.pc = target;
                Signal::Continue
            }
            Ok(InstructionResult::Invoke(callee)) => {
                frame.return_pc = Some(next_pc);
                self.push_frame(callee)
            }
            Ok(InstructionResult::InitializeClass(clinit)) => {
                // the instruction runs again once the class is initialized
                frame.return_pc = Some(frame.pc);
                self.push_frame(clinit)
            }
            Ok(InstructionResult::ReturnFromMethod(value)) => self.return_from_frame(value),
            Err(MethodCallError::InternalError(VmError::VerifyError(message))) => {
                let mnemonic = instruction.to_string();
                let message = if message.starts_with(&format!("{mnemonic}:")) {
                    message
                } else {
                    format!("{mnemonic}: {message}")
                };
                Signal::Fatal(VmError::VerifyError(message))
            }
            Err(e) => self.signal_for(e),
        }
    }

    fn push_frame(&mut self, frame: StackFrame) -> Signal {
        match self.call_stack.push(frame) {
            Ok(()) => Signal::Continue,
            Err(e) => self.signal_for(e),
        }
    }

    fn return_from_frame(&mut self, value: Option<Value>) -> Signal {
        if let Some(frame) = self.call_stack.pop() {
            if frame.method.name == "<clinit>" {
                self.vm.mark_initialized(frame.class_id);
            }
        }
        let caller = match self.call_stack.top_mut() {
            Some(caller) => caller,
            None => return Signal::FrameExited(value),
        };
        if let Some(return_pc) = caller.return_pc.take() {
            caller.pc = return_pc;
        }
        if let Some(value) = value {
            if let Err(e) = caller.push(value) {
                return self.signal_for(e);
            }
        }
        Signal::FrameReturned
    }

    fn signal_for(&mut self, error: MethodCallError) -> Signal {
        match error {
            MethodCallError::JavaException(kind, message) => {
                debug!("raising {} ({message})", kind.class_name());
                match self.vm.new_exception(kind, &message) {
                    Ok(exception) => Signal::ExceptionRaised(exception),
                    Err(e) => Signal::Fatal(e),
                }
            }
            MethodCallError::ExceptionThrown(exception) => Signal::ExceptionRaised(exception),
            MethodCallError::InternalError(e) => Signal::Fatal(e),
            MethodCallError::Exit(code) => Signal::ShutdownRequested(code),
        }
    }

    fn handle(&mut self, signal: Signal) -> Option<ExecutionOutcome> {
        match signal {
            Signal::Continue | Signal::FrameReturned => None,
            Signal::FrameExited(value) => {
                self.state = InterpreterState::Exited;
                Some(ExecutionOutcome::Completed(value))
            }
            Signal::ExceptionRaised(exception) => match self.propagate(exception) {
                Ok(outcome) => outcome,
                Err(e) => self.handle(Signal::Fatal(e)),
            },
            Signal::Fatal(e) => {
                self.state = InterpreterState::Fatal;
                self.vm.report_fatal(&e);
                Some(ExecutionOutcome::Fatal(e))
            }
            Signal::ShutdownRequested(code) => {
                debug!("exit requested with code {code}");
                self.state = InterpreterState::Exited;
                Some(ExecutionOutcome::ExitRequested(code))
            }
        }
    }

    /// Unwinds to the innermost handler for `exception`. Returns None when
    /// one was found and execution can resume.
    fn propagate(&mut self, exception: ObjectRef) -> VmExecResult<Option<ExecutionOutcome>> {
        self.state = InterpreterState::ExceptionPropagating(exception);
        let stack_trace: Vec<StackTraceElement> =
            self.call_stack.iter().map(StackTraceElement::of).collect();
        let exception_class = self.vm.class_name_of(exception)?.to_string();
        let method_area = &self.vm.method_area;
        while let Some(frame) = self.call_stack.top_mut() {
            let handler = frame
                .code
                .exception_table
                .iter()
                .find(|entry| {
                    entry.covers(frame.pc)
                        && entry
                            .catch_type
                            .as_ref()
                            .map_or(true, |catch_type| {
                                method_area.is_assignable(&exception_class, catch_type)
                            })
                })
                .map(|entry| entry.handler_pc as usize);
            if let Some(handler_pc) = handler {
                debug!(
                    "{exception_class} caught in {} at pc {handler_pc}",
                    frame.method_name()
                );
                frame.op_stack.clear();
                frame.op_stack.push(Value::ObjectRef(exception))?;
                frame.pc = handler_pc;
                frame.return_pc = None;
                self.state = InterpreterState::Running;
                return Ok(None);
            }
            self.call_stack.pop();
        }

        let description = self.vm.describe_throwable(exception)?;
        let thread_name = if self.thread_id == MAIN_THREAD_ID {
            "main".to_string()
        } else {
            format!("Thread-{}", self.thread_id)
        };
        let stderr = self.vm.stderr();
        let _ = writeln!(stderr, "Exception in thread \"{thread_name}\" {description}");
        for element in &stack_trace {
            let _ = writeln!(stderr, "{element}");
        }
        self.state = InterpreterState::Exited;
        Ok(Some(ExecutionOutcome::UncaughtException(exception)))
    }
}
