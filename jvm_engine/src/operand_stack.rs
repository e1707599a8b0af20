use crate::jvm_error::{verify_error, VmExecResult};
use crate::jvm_values::Value;

/// Operand stack of one frame.
///
/// Long and double values take a single entry; the `dup2`/`pop2` family picks
/// its form from the category of the entries it touches.
/// https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-6.html#jvms-6.5.dup2_x2
#[derive(Debug)]
pub struct OperandStack {
    stack: Vec<Value>,
    max_size: usize,
}

impl OperandStack {
    pub(crate) fn new(max_size: usize) -> OperandStack {
        OperandStack {
            stack: Vec::with_capacity(max_size),
            max_size,
        }
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Bottom to top.
    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.stack.iter()
    }

    pub(crate) fn clear(&mut self) {
        self.stack.clear();
    }

    pub(crate) fn push(&mut self, value: Value) -> VmExecResult<()> {
        if self.stack.len() >= self.max_size {
            return Err(verify_error!(
                "operand stack overflow, max_stack is {}",
                self.max_size
            ));
        }
        self.stack.push(value);
        Ok(())
    }

    pub(crate) fn pop(&mut self) -> VmExecResult<Value> {
        self.stack
            .pop()
            .ok_or_else(|| verify_error!("operand stack underflow"))
    }

    pub(crate) fn peek(&self) -> VmExecResult<Value> {
        self.stack
            .last()
            .copied()
            .ok_or_else(|| verify_error!("operand stack underflow"))
    }

    /// Pops `n` values, returned in the order they were pushed.
    pub(crate) fn pop_n(&mut self, n: usize) -> VmExecResult<Vec<Value>> {
        if n > self.stack.len() {
            return Err(verify_error!(
                "operand stack underflow, need {n} values but have {}",
                self.stack.len()
            ));
        }
        Ok(self.stack.split_off(self.stack.len() - n))
    }

    fn pop_category1(&mut self, opcode: &str) -> VmExecResult<Value> {
        let value = self.pop()?;
        if value.is_category2() {
            return Err(verify_error!(
                "{opcode}: expected a category 1 value, found {}",
                value.kind_name()
            ));
        }
        Ok(value)
    }

    fn push_all(&mut self, values: &[Value]) -> VmExecResult<()> {
        for value in values {
            self.push(*value)?;
        }
        Ok(())
    }

    pub(crate) fn pop2(&mut self) -> VmExecResult<()> {
        let value1 = self.pop()?;
        if !value1.is_category2() {
            self.pop_category1("pop2")?;
        }
        Ok(())
    }

    pub(crate) fn dup(&mut self) -> VmExecResult<()> {
        let value1 = self.pop_category1("dup")?;
        self.push_all(&[value1, value1])
    }

    pub(crate) fn dup_x1(&mut self) -> VmExecResult<()> {
        let value1 = self.pop_category1("dup_x1")?;
        let value2 = self.pop_category1("dup_x1")?;
        self.push_all(&[value1, value2, value1])
    }

    pub(crate) fn dup_x2(&mut self) -> VmExecResult<()> {
        let value1 = self.pop_category1("dup_x2")?;
        let value2 = self.pop()?;
        if value2.is_category2() {
            // form 2
            return self.push_all(&[value1, value2, value1]);
        }
        let value3 = self.pop_category1("dup_x2")?;
        self.push_all(&[value1, value3, value2, value1])
    }

    pub(crate) fn dup2(&mut self) -> VmExecResult<()> {
        let value1 = self.pop()?;
        if value1.is_category2() {
            return self.push_all(&[value1, value1]);
        }
        let value2 = self.pop_category1("dup2")?;
        self.push_all(&[value2, value1, value2, value1])
    }

    pub(crate) fn dup2_x1(&mut self) -> VmExecResult<()> {
        let value1 = self.pop()?;
        if value1.is_category2() {
            let value2 = self.pop_category1("dup2_x1")?;
            return self.push_all(&[value1, value2, value1]);
        }
        let value2 = self.pop_category1("dup2_x1")?;
        let value3 = self.pop_category1("dup2_x1")?;
        self.push_all(&[value2, value1, value3, value2, value1])
    }

    pub(crate) fn dup2_x2(&mut self) -> VmExecResult<()> {
        let value1 = self.pop()?;
        let value2 = self.pop()?;
        match (value1.is_category2(), value2.is_category2()) {
            // form 4
            (true, true) => self.push_all(&[value1, value2, value1]),
            // form 2
            (true, false) => {
                let value3 = self.pop_category1("dup2_x2")?;
                self.push_all(&[value1, value3, value2, value1])
            }
            (false, true) => Err(verify_error!(
                "dup2_x2: category 2 value under a category 1 value"
            )),
            (false, false) => {
                let value3 = self.pop()?;
                if value3.is_category2() {
                    // form 3
                    self.push_all(&[value2, value1, value3, value2, value1])
                } else {
                    // form 1
                    let value4 = self.pop_category1("dup2_x2")?;
                    self.push_all(&[value2, value1, value4, value3, value2, value1])
                }
            }
        }
    }

    pub(crate) fn swap(&mut self) -> VmExecResult<()> {
        let value1 = self.pop_category1("swap")?;
        let value2 = self.pop_category1("swap")?;
        self.push_all(&[value1, value2])
    }
}
