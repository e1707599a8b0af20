use crate::java_exception::{InvokeResult, JavaExceptionKind, MethodCallError};
use crate::stack_frame::StackFrame;

/// The frames of one thread, innermost last.
pub struct CallStack {
    frames: Vec<StackFrame>,
    thread_id: u32,
    max_depth: usize,
}

impl CallStack {
    pub fn new(thread_id: u32, max_depth: usize) -> CallStack {
        CallStack {
            frames: Vec::new(),
            thread_id,
            max_depth,
        }
    }

    pub fn thread_id(&self) -> u32 {
        self.thread_id
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Pushes a frame. A full stack raises `StackOverflowError` and leaves
    /// the stack as it was.
    pub(crate) fn push(&mut self, frame: StackFrame) -> InvokeResult<()> {
        if self.frames.len() >= self.max_depth {
            return Err(MethodCallError::java(JavaExceptionKind::StackOverflowError, ""));
        }
        self.frames.push(frame);
        Ok(())
    }

    pub(crate) fn pop(&mut self) -> Option<StackFrame> {
        self.frames.pop()
    }

    pub(crate) fn top_mut(&mut self) -> Option<&mut StackFrame> {
        self.frames.last_mut()
    }

    // innermost first
    pub(crate) fn iter(&self) -> impl Iterator<Item = &StackFrame> {
        self.frames.iter().rev()
    }
}
