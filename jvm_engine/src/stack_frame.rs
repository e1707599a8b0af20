use crate::descriptor::FieldType;
use crate::frame_invoke::InvokeKind;
use crate::java_exception::{InvokeResult, JavaExceptionKind, MethodCallError};
use crate::jvm_error::{verify_error, VmExecResult};
use crate::jvm_values::{narrow_to_byte, narrow_to_char, narrow_to_short, ObjectRef, Value};
use crate::loaded_class::ClassId;
use crate::operand_stack::OperandStack;
use crate::runtime_attribute_info::CodeAttribute;
use crate::runtime_constant_pool::RuntimeConstantPool;
use crate::runtime_method_info::RuntimeMethodInfo;
use crate::virtual_machine::VirtualMachine;
use class_file_reader::instruction::{Instruction, LookupSwitch, TableSwitch};
use std::rc::Rc;

/// What the interpreter loop does after an instruction.
pub(crate) enum InstructionResult {
    /// Fall through to the next instruction.
    Continue,
    /// Continue at an absolute pc.
    Jump(usize),
    /// Run the callee; the caller resumes after the invoke.
    Invoke(StackFrame),
    /// Run a `<clinit>`; the caller re-executes the current instruction.
    InitializeClass(StackFrame),
    ReturnFromMethod(Option<Value>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocalValue {
    Uninitialized,
    Entry(Value),
    // upper half of a long or double
    PlaceHolder,
}

/// Activation record of one bytecode method.
///
/// Locals are pre-sized to `max_locals` and keep the two slot layout of long
/// and double; the operand stack holds them as one entry.
pub struct StackFrame {
    pub(crate) class_id: ClassId,
    pub(crate) class_name: String,
    pub(crate) method: Rc<RuntimeMethodInfo>,
    pub(crate) code: Rc<CodeAttribute>,
    pub(crate) constant_pool: Rc<RuntimeConstantPool>,
    pub(crate) source_file: Option<String>,
    pub(crate) pc: usize,
    // where to resume once the frame above returns
    pub(crate) return_pc: Option<usize>,
    pub(crate) locals: Vec<LocalValue>,
    pub(crate) op_stack: OperandStack,
    pub(crate) thread_id: u32,
    pub(crate) trace: bool,
}

fn type_mismatch(opcode: &str, expected: &str, found: Value) -> MethodCallError {
    MethodCallError::InternalError(verify_error!(
        "{opcode}: expected {expected}, found {}",
        found.kind_name()
    ))
}

fn divide_by_zero() -> MethodCallError {
    MethodCallError::java(JavaExceptionKind::ArithmeticException, "/ by zero")
}

/// Narrows an `Int` to the width of a boolean, byte, char or short slot.
pub(crate) fn narrow_to_type(field_type: &FieldType, value: Value) -> Value {
    match (field_type, value) {
        (FieldType::Boolean, Value::Int(v)) => Value::Int(v & 1),
        (FieldType::Byte, Value::Int(v)) => Value::Int(narrow_to_byte(v)),
        (FieldType::Char, Value::Int(v)) => Value::Int(narrow_to_char(v)),
        (FieldType::Short, Value::Int(v)) => Value::Int(narrow_to_short(v)),
        (_, value) => value,
    }
}

// NaN compares as `nan_result`: -1 for the l variants, 1 for the g variants
fn compare_floating<T: PartialOrd>(value1: T, value2: T, nan_result: i32) -> i32 {
    if value1 > value2 {
        1
    } else if value1 < value2 {
        -1
    } else if value1 == value2 {
        0
    } else {
        nan_result
    }
}

macro_rules! generate_pop {
    ($name:ident, $variant:ident, $type:ty) => {
        pub(crate) fn $name(&mut self, opcode: &str) -> InvokeResult<$type> {
            match self.pop()? {
                Value::$variant(value) => Ok(value),
                other => Err(type_mismatch(opcode, stringify!($variant), other)),
            }
        }
    };
}

macro_rules! generate_load {
    ($name:ident, $variant:ident) => {
        fn $name(&mut self, opcode: &str, index: u16) -> InvokeResult<()> {
            match self.load_local(opcode, index)? {
                value @ Value::$variant(_) => self.push(value),
                other => Err(type_mismatch(opcode, stringify!($variant), other)),
            }
        }
    };
}

macro_rules! generate_store {
    ($name:ident, $pop:ident, $variant:ident) => {
        fn $name(&mut self, opcode: &str, index: u16) -> InvokeResult<()> {
            let value = self.$pop(opcode)?;
            self.store_local(opcode, index, Value::$variant(value))
        }
    };
}

macro_rules! generate_math {
    ($name:ident, $pop:ident, $variant:ident, $type:ty) => {
        fn $name<F>(&mut self, opcode: &str, evaluator: F) -> InvokeResult<()>
        where
            F: FnOnce($type, $type) -> InvokeResult<$type>,
        {
            let value2 = self.$pop(opcode)?;
            let value1 = self.$pop(opcode)?;
            let result = evaluator(value1, value2)?;
            self.push(Value::$variant(result))
        }
    };
}

macro_rules! generate_convert {
    ($name:ident, $pop:ident, $target:ident, $type:ty) => {
        fn $name(&mut self, opcode: &str) -> InvokeResult<()> {
            let value = self.$pop(opcode)?;
            // float to integer casts saturate and map NaN to 0, as d2i and f2l require
            self.push(Value::$target(value as $type))
        }
    };
}

macro_rules! generate_if_cmp {
    ($name:ident, $pop:ident, $type:ty) => {
        fn $name<F>(&mut self, opcode: &str, offset: i16, condition: F) -> InvokeResult<InstructionResult>
        where
            F: FnOnce($type, $type) -> bool,
        {
            let value2 = self.$pop(opcode)?;
            let value1 = self.$pop(opcode)?;
            self.branch_if(opcode, condition(value1, value2), offset as i32)
        }
    };
}

impl StackFrame {
    /// Creates the frame of `method`, spreading `args` over the locals
    /// (receiver first for instance methods).
    pub(crate) fn new(
        vm: &VirtualMachine,
        class_id: ClassId,
        method: Rc<RuntimeMethodInfo>,
        args: Vec<Value>,
        thread_id: u32,
    ) -> VmExecResult<StackFrame> {
        let class = vm.method_area.class(class_id);
        let code = method.code.clone().ok_or_else(|| {
            verify_error!(
                "{}.{}{} has no code",
                class.name,
                method.name,
                method.descriptor
            )
        })?;
        let max_locals = code.max_locals as usize;
        let mut locals = Vec::with_capacity(max_locals);
        for value in args {
            let category2 = value.is_category2();
            locals.push(LocalValue::Entry(value));
            if category2 {
                locals.push(LocalValue::PlaceHolder);
            }
        }
        if locals.len() > max_locals {
            return Err(verify_error!(
                "{}.{}{}: {} argument slots but max_locals is {max_locals}",
                class.name,
                method.name,
                method.descriptor,
                locals.len()
            ));
        }
        locals.resize(max_locals, LocalValue::Uninitialized);
        Ok(StackFrame {
            class_id,
            class_name: class.name.clone(),
            constant_pool: class.constant_pool.clone(),
            source_file: class.source_file.clone(),
            op_stack: OperandStack::new(code.max_stack as usize),
            code,
            method,
            pc: 0,
            return_pc: None,
            locals,
            thread_id,
            trace: vm.options.trace,
        })
    }

    pub(crate) fn method_name(&self) -> String {
        format!("{}.{}", self.class_name, self.method.name)
    }

    pub(crate) fn push(&mut self, value: Value) -> InvokeResult<()> {
        Ok(self.op_stack.push(value)?)
    }

    pub(crate) fn pop(&mut self) -> InvokeResult<Value> {
        Ok(self.op_stack.pop()?)
    }

    generate_pop!(pop_int, Int, i32);
    generate_pop!(pop_long, Long, i64);
    generate_pop!(pop_float, Float, f32);
    generate_pop!(pop_double, Double, f64);

    /// Pops a reference, None for null.
    pub(crate) fn pop_reference(&mut self, opcode: &str) -> InvokeResult<Option<ObjectRef>> {
        match self.pop()? {
            Value::Null => Ok(None),
            Value::ObjectRef(object_ref) => Ok(Some(object_ref)),
            other => Err(type_mismatch(opcode, "Reference", other)),
        }
    }

    /// Pops a reference that must not be null.
    pub(crate) fn pop_object(&mut self, opcode: &str) -> InvokeResult<ObjectRef> {
        self.pop_reference(opcode)?
            .ok_or_else(|| MethodCallError::null_pointer(opcode))
    }

    fn load_local(&self, opcode: &str, index: u16) -> InvokeResult<Value> {
        match self.locals.get(index as usize) {
            Some(LocalValue::Entry(value)) => Ok(*value),
            Some(LocalValue::PlaceHolder) => Err(MethodCallError::InternalError(verify_error!(
                "{opcode}: local {index} is the upper half of a long or double"
            ))),
            Some(LocalValue::Uninitialized) => Err(MethodCallError::InternalError(verify_error!(
                "{opcode}: local {index} is uninitialized"
            ))),
            None => Err(MethodCallError::InternalError(verify_error!(
                "{opcode}: local {index} out of range, max_locals is {}",
                self.locals.len()
            ))),
        }
    }

    pub(crate) fn store_local(&mut self, opcode: &str, index: u16, value: Value) -> InvokeResult<()> {
        let index = index as usize;
        let width = if value.is_category2() { 2 } else { 1 };
        if index + width > self.locals.len() {
            return Err(MethodCallError::InternalError(verify_error!(
                "{opcode}: local {index} out of range, max_locals is {}",
                self.locals.len()
            )));
        }
        // overwriting either half of a long or double kills the other half
        if self.locals[index] == LocalValue::PlaceHolder && index > 0 {
            self.locals[index - 1] = LocalValue::Uninitialized;
        }
        let last = index + width - 1;
        if matches!(self.locals[last], LocalValue::Entry(v) if v.is_category2()) && last + 1 < self.locals.len() {
            self.locals[last + 1] = LocalValue::Uninitialized;
        }
        self.locals[index] = LocalValue::Entry(value);
        if width == 2 {
            self.locals[index + 1] = LocalValue::PlaceHolder;
        }
        Ok(())
    }

    generate_load!(exec_iload, Int);
    generate_load!(exec_lload, Long);
    generate_load!(exec_fload, Float);
    generate_load!(exec_dload, Double);

    fn exec_aload(&mut self, opcode: &str, index: u16) -> InvokeResult<()> {
        match self.load_local(opcode, index)? {
            value @ (Value::Null | Value::ObjectRef(_)) => self.push(value),
            other => Err(type_mismatch(opcode, "Reference", other)),
        }
    }

    generate_store!(exec_istore, pop_int, Int);
    generate_store!(exec_lstore, pop_long, Long);
    generate_store!(exec_fstore, pop_float, Float);
    generate_store!(exec_dstore, pop_double, Double);

    fn exec_astore(&mut self, opcode: &str, index: u16) -> InvokeResult<()> {
        let value = match self.pop_reference(opcode)? {
            Some(object_ref) => Value::ObjectRef(object_ref),
            None => Value::Null,
        };
        self.store_local(opcode, index, value)
    }

    generate_math!(exec_int_math, pop_int, Int, i32);
    generate_math!(exec_long_math, pop_long, Long, i64);
    generate_math!(exec_float_math, pop_float, Float, f32);
    generate_math!(exec_double_math, pop_double, Double, f64);

    fn exec_long_shift<F>(&mut self, opcode: &str, evaluator: F) -> InvokeResult<()>
    where
        F: FnOnce(i64, u32) -> i64,
    {
        let distance = self.pop_int(opcode)?;
        let value = self.pop_long(opcode)?;
        self.push(Value::Long(evaluator(value, (distance & 0x3F) as u32)))
    }

    generate_convert!(exec_i2l, pop_int, Long, i64);
    generate_convert!(exec_i2f, pop_int, Float, f32);
    generate_convert!(exec_i2d, pop_int, Double, f64);
    generate_convert!(exec_l2i, pop_long, Int, i32);
    generate_convert!(exec_l2f, pop_long, Float, f32);
    generate_convert!(exec_l2d, pop_long, Double, f64);
    generate_convert!(exec_f2i, pop_float, Int, i32);
    generate_convert!(exec_f2l, pop_float, Long, i64);
    generate_convert!(exec_f2d, pop_float, Double, f64);
    generate_convert!(exec_d2i, pop_double, Int, i32);
    generate_convert!(exec_d2l, pop_double, Long, i64);
    generate_convert!(exec_d2f, pop_double, Float, f32);

    fn exec_narrow(&mut self, opcode: &str, narrow: fn(i32) -> i32) -> InvokeResult<()> {
        let value = self.pop_int(opcode)?;
        self.push(Value::Int(narrow(value)))
    }

    fn exec_lcmp(&mut self, opcode: &str) -> InvokeResult<()> {
        let value2 = self.pop_long(opcode)?;
        let value1 = self.pop_long(opcode)?;
        self.push(Value::Int(value1.cmp(&value2) as i32))
    }

    fn exec_fcmp(&mut self, opcode: &str, nan_result: i32) -> InvokeResult<()> {
        let value2 = self.pop_float(opcode)?;
        let value1 = self.pop_float(opcode)?;
        self.push(Value::Int(compare_floating(value1, value2, nan_result)))
    }

    fn exec_dcmp(&mut self, opcode: &str, nan_result: i32) -> InvokeResult<()> {
        let value2 = self.pop_double(opcode)?;
        let value1 = self.pop_double(opcode)?;
        self.push(Value::Int(compare_floating(value1, value2, nan_result)))
    }

    /// Absolute target of a branch whose offset is relative to the opcode byte.
    pub(crate) fn branch_target(&self, opcode: &str, offset: i32) -> InvokeResult<usize> {
        let target = self.pc as i64 + offset as i64;
        if target < 0 || target as usize >= self.code.code.len() {
            return Err(MethodCallError::InternalError(verify_error!(
                "{opcode}: branch target {target} outside code of length {}",
                self.code.code.len()
            )));
        }
        Ok(target as usize)
    }

    fn branch_if(&self, opcode: &str, condition: bool, offset: i32) -> InvokeResult<InstructionResult> {
        if condition {
            Ok(InstructionResult::Jump(self.branch_target(opcode, offset)?))
        } else {
            Ok(InstructionResult::Continue)
        }
    }

    generate_if_cmp!(exec_if_icmp, pop_int, i32);
    generate_if_cmp!(exec_if_acmp, pop_reference, Option<ObjectRef>);

    fn exec_if_zero<F>(&mut self, opcode: &str, offset: i16, condition: F) -> InvokeResult<InstructionResult>
    where
        F: FnOnce(i32) -> bool,
    {
        let value = self.pop_int(opcode)?;
        self.branch_if(opcode, condition(value), offset as i32)
    }

    fn exec_if_null(&mut self, opcode: &str, offset: i16, expect_null: bool) -> InvokeResult<InstructionResult> {
        let value = self.pop_reference(opcode)?;
        self.branch_if(opcode, value.is_none() == expect_null, offset as i32)
    }

    fn exec_tableswitch(&mut self, opcode: &str, table: &TableSwitch) -> InvokeResult<InstructionResult> {
        let key = self.pop_int(opcode)?;
        let offset = if key < table.low || key > table.high {
            table.default
        } else {
            let slot = (key as i64 - table.low as i64) as usize;
            *table.offsets.get(slot).ok_or_else(|| {
                MethodCallError::InternalError(verify_error!(
                    "{opcode}: no jump offset for key {key}"
                ))
            })?
        };
        Ok(InstructionResult::Jump(self.branch_target(opcode, offset)?))
    }

    fn exec_lookupswitch(&mut self, opcode: &str, lookup: &LookupSwitch) -> InvokeResult<InstructionResult> {
        let key = self.pop_int(opcode)?;
        let offset = lookup
            .pairs
            .iter()
            .find(|(candidate, _)| *candidate == key)
            .map_or(lookup.default, |(_, offset)| *offset);
        Ok(InstructionResult::Jump(self.branch_target(opcode, offset)?))
    }

    fn exec_iinc(&mut self, opcode: &str, index: u16, delta: i16) -> InvokeResult<()> {
        match self.load_local(opcode, index)? {
            Value::Int(value) => {
                self.store_local(opcode, index, Value::Int(value.wrapping_add(delta as i32)))
            }
            other => Err(type_mismatch(opcode, "Int", other)),
        }
    }

    fn exec_pop(&mut self, opcode: &str) -> InvokeResult<()> {
        let value = self.pop()?;
        if value.is_category2() {
            return Err(type_mismatch(opcode, "a category 1 value", value));
        }
        Ok(())
    }

    // checks the value against the declared return type and narrows sub-int types
    fn return_value(&mut self, opcode: &str, value: Value) -> InvokeResult<InstructionResult> {
        let return_type = self.method.signature.return_type.as_ref().ok_or_else(|| {
            MethodCallError::InternalError(verify_error!(
                "{opcode}: {} is declared void",
                self.method_name()
            ))
        })?;
        if !return_type.accepts(&value) {
            return Err(MethodCallError::InternalError(verify_error!(
                "{opcode}: {} returns {return_type}, found {}",
                self.method_name(),
                value.kind_name()
            )));
        }
        Ok(InstructionResult::ReturnFromMethod(Some(narrow_to_type(
            return_type,
            value,
        ))))
    }

    fn exec_return(&mut self, opcode: &str) -> InvokeResult<InstructionResult> {
        if let Some(return_type) = &self.method.signature.return_type {
            return Err(MethodCallError::InternalError(verify_error!(
                "{opcode}: {} must return {return_type}",
                self.method_name()
            )));
        }
        Ok(InstructionResult::ReturnFromMethod(None))
    }

    /// Executes `instruction`, the one at `self.pc`. The pc itself is moved
    /// by the interpreter according to the result.
    pub(crate) fn execute_instruction(
        &mut self,
        vm: &mut VirtualMachine,
        instruction: &Instruction,
    ) -> InvokeResult<InstructionResult> {
        let opcode = instruction.to_string();
        let opcode = opcode.as_str();
        match instruction {
            Instruction::Nop => {}
            Instruction::Aconst_null => self.push(Value::Null)?,
            Instruction::Iconst_m1 => self.push(Value::Int(-1))?,
            Instruction::Iconst_0 => self.push(Value::Int(0))?,
            Instruction::Iconst_1 => self.push(Value::Int(1))?,
            Instruction::Iconst_2 => self.push(Value::Int(2))?,
            Instruction::Iconst_3 => self.push(Value::Int(3))?,
            Instruction::Iconst_4 => self.push(Value::Int(4))?,
            Instruction::Iconst_5 => self.push(Value::Int(5))?,
            Instruction::Lconst_0 => self.push(Value::Long(0))?,
            Instruction::Lconst_1 => self.push(Value::Long(1))?,
            Instruction::Fconst_0 => self.push(Value::Float(0.0))?,
            Instruction::Fconst_1 => self.push(Value::Float(1.0))?,
            Instruction::Fconst_2 => self.push(Value::Float(2.0))?,
            Instruction::Dconst_0 => self.push(Value::Double(0.0))?,
            Instruction::Dconst_1 => self.push(Value::Double(1.0))?,
            Instruction::Bipush(value) => self.push(Value::Int(*value as i32))?,
            Instruction::Sipush(value) => self.push(Value::Int(*value as i32))?,
            Instruction::Ldc(index) | Instruction::Ldc_w(index) => self.exec_ldc(vm, opcode, *index)?,
            Instruction::Ldc2_w(index) => self.exec_ldc2_w(opcode, *index)?,

            Instruction::Iload(index) => self.exec_iload(opcode, *index)?,
            Instruction::Iload_0 => self.exec_iload(opcode, 0)?,
            Instruction::Iload_1 => self.exec_iload(opcode, 1)?,
            Instruction::Iload_2 => self.exec_iload(opcode, 2)?,
            Instruction::Iload_3 => self.exec_iload(opcode, 3)?,
            Instruction::Lload(index) => self.exec_lload(opcode, *index)?,
            Instruction::Lload_0 => self.exec_lload(opcode, 0)?,
            Instruction::Lload_1 => self.exec_lload(opcode, 1)?,
            Instruction::Lload_2 => self.exec_lload(opcode, 2)?,
            Instruction::Lload_3 => self.exec_lload(opcode, 3)?,
            Instruction::Fload(index) => self.exec_fload(opcode, *index)?,
            Instruction::Fload_0 => self.exec_fload(opcode, 0)?,
            Instruction::Fload_1 => self.exec_fload(opcode, 1)?,
            Instruction::Fload_2 => self.exec_fload(opcode, 2)?,
            Instruction::Fload_3 => self.exec_fload(opcode, 3)?,
            Instruction::Dload(index) => self.exec_dload(opcode, *index)?,
            Instruction::Dload_0 => self.exec_dload(opcode, 0)?,
            Instruction::Dload_1 => self.exec_dload(opcode, 1)?,
            Instruction::Dload_2 => self.exec_dload(opcode, 2)?,
            Instruction::Dload_3 => self.exec_dload(opcode, 3)?,
            Instruction::Aload(index) => self.exec_aload(opcode, *index)?,
            Instruction::Aload_0 => self.exec_aload(opcode, 0)?,
            Instruction::Aload_1 => self.exec_aload(opcode, 1)?,
            Instruction::Aload_2 => self.exec_aload(opcode, 2)?,
            Instruction::Aload_3 => self.exec_aload(opcode, 3)?,

            Instruction::Iaload => self.exec_array_load(vm, opcode, "I")?,
            Instruction::Laload => self.exec_array_load(vm, opcode, "J")?,
            Instruction::Faload => self.exec_array_load(vm, opcode, "F")?,
            Instruction::Daload => self.exec_array_load(vm, opcode, "D")?,
            Instruction::Aaload => self.exec_array_load(vm, opcode, "L[")?,
            Instruction::Baload => self.exec_array_load(vm, opcode, "BZ")?,
            Instruction::Caload => self.exec_array_load(vm, opcode, "C")?,
            Instruction::Saload => self.exec_array_load(vm, opcode, "S")?,

            Instruction::Istore(index) => self.exec_istore(opcode, *index)?,
            Instruction::Istore_0 => self.exec_istore(opcode, 0)?,
            Instruction::Istore_1 => self.exec_istore(opcode, 1)?,
            Instruction::Istore_2 => self.exec_istore(opcode, 2)?,
            Instruction::Istore_3 => self.exec_istore(opcode, 3)?,
            Instruction::Lstore(index) => self.exec_lstore(opcode, *index)?,
            Instruction::Lstore_0 => self.exec_lstore(opcode, 0)?,
            Instruction::Lstore_1 => self.exec_lstore(opcode, 1)?,
            Instruction::Lstore_2 => self.exec_lstore(opcode, 2)?,
            Instruction::Lstore_3 => self.exec_lstore(opcode, 3)?,
            Instruction::Fstore(index) => self.exec_fstore(opcode, *index)?,
            Instruction::Fstore_0 => self.exec_fstore(opcode, 0)?,
            Instruction::Fstore_1 => self.exec_fstore(opcode, 1)?,
            Instruction::Fstore_2 => self.exec_fstore(opcode, 2)?,
            Instruction::Fstore_3 => self.exec_fstore(opcode, 3)?,
            Instruction::Dstore(index) => self.exec_dstore(opcode, *index)?,
            Instruction::Dstore_0 => self.exec_dstore(opcode, 0)?,
            Instruction::Dstore_1 => self.exec_dstore(opcode, 1)?,
            Instruction::Dstore_2 => self.exec_dstore(opcode, 2)?,
            Instruction::Dstore_3 => self.exec_dstore(opcode, 3)?,
            Instruction::Astore(index) => self.exec_astore(opcode, *index)?,
            Instruction::Astore_0 => self.exec_astore(opcode, 0)?,
            Instruction::Astore_1 => self.exec_astore(opcode, 1)?,
            Instruction::Astore_2 => self.exec_astore(opcode, 2)?,
            Instruction::Astore_3 => self.exec_astore(opcode, 3)?,

            Instruction::Iastore => self.exec_array_store(vm, opcode, "I")?,
            Instruction::Lastore => self.exec_array_store(vm, opcode, "J")?,
            Instruction::Fastore => self.exec_array_store(vm, opcode, "F")?,
            Instruction::Dastore => self.exec_array_store(vm, opcode, "D")?,
            Instruction::Aastore => self.exec_array_store(vm, opcode, "L[")?,
            Instruction::Bastore => self.exec_array_store(vm, opcode, "BZ")?,
            Instruction::Castore => self.exec_array_store(vm, opcode, "C")?,
            Instruction::Sastore => self.exec_array_store(vm, opcode, "S")?,

            Instruction::Pop => self.exec_pop(opcode)?,
            Instruction::Pop2 => self.op_stack.pop2()?,
            Instruction::Dup => self.op_stack.dup()?,
            Instruction::Dup_x1 => self.op_stack.dup_x1()?,
            Instruction::Dup_x2 => self.op_stack.dup_x2()?,
            Instruction::Dup2 => self.op_stack.dup2()?,
            Instruction::Dup2_x1 => self.op_stack.dup2_x1()?,
            Instruction::Dup2_x2 => self.op_stack.dup2_x2()?,
            Instruction::Swap => self.op_stack.swap()?,

            Instruction::Iadd => self.exec_int_math(opcode, |v1, v2| Ok(v1.wrapping_add(v2)))?,
            Instruction::Ladd => self.exec_long_math(opcode, |v1, v2| Ok(v1.wrapping_add(v2)))?,
            Instruction::Fadd => self.exec_float_math(opcode, |v1, v2| Ok(v1 + v2))?,
            Instruction::Dadd => self.exec_double_math(opcode, |v1, v2| Ok(v1 + v2))?,
            Instruction::Isub => self.exec_int_math(opcode, |v1, v2| Ok(v1.wrapping_sub(v2)))?,
            Instruction::Lsub => self.exec_long_math(opcode, |v1, v2| Ok(v1.wrapping_sub(v2)))?,
            Instruction::Fsub => self.exec_float_math(opcode, |v1, v2| Ok(v1 - v2))?,
            Instruction::Dsub => self.exec_double_math(opcode, |v1, v2| Ok(v1 - v2))?,
            Instruction::Imul => self.exec_int_math(opcode, |v1, v2| Ok(v1.wrapping_mul(v2)))?,
            Instruction::Lmul => self.exec_long_math(opcode, |v1, v2| Ok(v1.wrapping_mul(v2)))?,
            Instruction::Fmul => self.exec_float_math(opcode, |v1, v2| Ok(v1 * v2))?,
            Instruction::Dmul => self.exec_double_math(opcode, |v1, v2| Ok(v1 * v2))?,
            Instruction::Idiv => self.exec_int_math(opcode, |v1, v2| {
                if v2 == 0 {
                    Err(divide_by_zero())
                } else {
                    Ok(v1.wrapping_div(v2))
                }
            })?,
            Instruction::Ldiv => self.exec_long_math(opcode, |v1, v2| {
                if v2 == 0 {
                    Err(divide_by_zero())
                } else {
                    Ok(v1.wrapping_div(v2))
                }
            })?,
            Instruction::Fdiv => self.exec_float_math(opcode, |v1, v2| Ok(v1 / v2))?,
            Instruction::Ddiv => self.exec_double_math(opcode, |v1, v2| Ok(v1 / v2))?,
            Instruction::Irem => self.exec_int_math(opcode, |v1, v2| {
                if v2 == 0 {
                    Err(divide_by_zero())
                } else {
                    Ok(v1.wrapping_rem(v2))
                }
            })?,
            Instruction::Lrem => self.exec_long_math(opcode, |v1, v2| {
                if v2 == 0 {
                    Err(divide_by_zero())
                } else {
                    Ok(v1.wrapping_rem(v2))
                }
            })?,
            Instruction::Frem => self.exec_float_math(opcode, |v1, v2| Ok(v1 % v2))?,
            Instruction::Drem => self.exec_double_math(opcode, |v1, v2| Ok(v1 % v2))?,
            Instruction::Ineg => {
                let value = self.pop_int(opcode)?;
                self.push(Value::Int(value.wrapping_neg()))?
            }
            Instruction::Lneg => {
                let value = self.pop_long(opcode)?;
                self.push(Value::Long(value.wrapping_neg()))?
            }
            Instruction::Fneg => {
                let value = self.pop_float(opcode)?;
                self.push(Value::Float(-value))?
            }
            Instruction::Dneg => {
                let value = self.pop_double(opcode)?;
                self.push(Value::Double(-value))?
            }

            Instruction::Ishl => self.exec_int_math(opcode, |v1, v2| Ok(v1 << (v2 & 0x1F)))?,
            Instruction::Ishr => self.exec_int_math(opcode, |v1, v2| Ok(v1 >> (v2 & 0x1F)))?,
            Instruction::Iushr => {
                self.exec_int_math(opcode, |v1, v2| Ok(((v1 as u32) >> (v2 & 0x1F)) as i32))?
            }
            Instruction::Lshl => self.exec_long_shift(opcode, |v, s| v << s)?,
            Instruction::Lshr => self.exec_long_shift(opcode, |v, s| v >> s)?,
            Instruction::Lushr => self.exec_long_shift(opcode, |v, s| ((v as u64) >> s) as i64)?,
            Instruction::Iand => self.exec_int_math(opcode, |v1, v2| Ok(v1 & v2))?,
            Instruction::Land => self.exec_long_math(opcode, |v1, v2| Ok(v1 & v2))?,
            Instruction::Ior => self.exec_int_math(opcode, |v1, v2| Ok(v1 | v2))?,
            Instruction::Lor => self.exec_long_math(opcode, |v1, v2| Ok(v1 | v2))?,
            Instruction::Ixor => self.exec_int_math(opcode, |v1, v2| Ok(v1 ^ v2))?,
            Instruction::Lxor => self.exec_long_math(opcode, |v1, v2| Ok(v1 ^ v2))?,
            Instruction::Iinc(index, delta) => self.exec_iinc(opcode, *index, *delta)?,

            Instruction::I2l => self.exec_i2l(opcode)?,
            Instruction::I2f => self.exec_i2f(opcode)?,
            Instruction::I2d => self.exec_i2d(opcode)?,
            Instruction::L2i => self.exec_l2i(opcode)?,
            Instruction::L2f => self.exec_l2f(opcode)?,
            Instruction::L2d => self.exec_l2d(opcode)?,
            Instruction::F2i => self.exec_f2i(opcode)?,
            Instruction::F2l => self.exec_f2l(opcode)?,
            Instruction::F2d => self.exec_f2d(opcode)?,
            Instruction::D2i => self.exec_d2i(opcode)?,
            Instruction::D2l => self.exec_d2l(opcode)?,
            Instruction::D2f => self.exec_d2f(opcode)?,
            Instruction::I2b => self.exec_narrow(opcode, narrow_to_byte)?,
            Instruction::I2c => self.exec_narrow(opcode, narrow_to_char)?,
            Instruction::I2s => self.exec_narrow(opcode, narrow_to_short)?,

            Instruction::Lcmp => self.exec_lcmp(opcode)?,
            Instruction::Fcmpl => self.exec_fcmp(opcode, -1)?,
            Instruction::Fcmpg => self.exec_fcmp(opcode, 1)?,
            Instruction::Dcmpl => self.exec_dcmp(opcode, -1)?,
            Instruction::Dcmpg => self.exec_dcmp(opcode, 1)?,

            Instruction::Ifeq(offset) => return self.exec_if_zero(opcode, *offset, |v| v == 0),
            Instruction::Ifne(offset) => return self.exec_if_zero(opcode, *offset, |v| v != 0),
            Instruction::Iflt(offset) => return self.exec_if_zero(opcode, *offset, |v| v < 0),
            Instruction::Ifge(offset) => return self.exec_if_zero(opcode, *offset, |v| v >= 0),
            Instruction::Ifgt(offset) => return self.exec_if_zero(opcode, *offset, |v| v > 0),
            Instruction::Ifle(offset) => return self.exec_if_zero(opcode, *offset, |v| v <= 0),
            Instruction::If_icmpeq(offset) => return self.exec_if_icmp(opcode, *offset, |v1, v2| v1 == v2),
            Instruction::If_icmpne(offset) => return self.exec_if_icmp(opcode, *offset, |v1, v2| v1 != v2),
            Instruction::If_icmplt(offset) => return self.exec_if_icmp(opcode, *offset, |v1, v2| v1 < v2),
            Instruction::If_icmpge(offset) => return self.exec_if_icmp(opcode, *offset, |v1, v2| v1 >= v2),
            Instruction::If_icmpgt(offset) => return self.exec_if_icmp(opcode, *offset, |v1, v2| v1 > v2),
            Instruction::If_icmple(offset) => return self.exec_if_icmp(opcode, *offset, |v1, v2| v1 <= v2),
            Instruction::If_acmpeq(offset) => return self.exec_if_acmp(opcode, *offset, |v1, v2| v1 == v2),
            Instruction::If_acmpne(offset) => return self.exec_if_acmp(opcode, *offset, |v1, v2| v1 != v2),
            Instruction::Ifnull(offset) => return self.exec_if_null(opcode, *offset, true),
            Instruction::Ifnonnull(offset) => return self.exec_if_null(opcode, *offset, false),
            Instruction::Goto(offset) => {
                return Ok(InstructionResult::Jump(self.branch_target(opcode, *offset as i32)?))
            }
            Instruction::Goto_w(offset) => {
                return Ok(InstructionResult::Jump(self.branch_target(opcode, *offset)?))
            }
            Instruction::Jsr(_) | Instruction::Jsr_w(_) | Instruction::Ret(_) => {
                return Err(MethodCallError::InternalError(verify_error!(
                    "{opcode}: subroutines are not supported"
                )))
            }
            Instruction::Tableswitch(table) => return self.exec_tableswitch(opcode, table),
            Instruction::Lookupswitch(lookup) => return self.exec_lookupswitch(opcode, lookup),

            Instruction::Ireturn => {
                let value = self.pop_int(opcode)?;
                return self.return_value(opcode, Value::Int(value));
            }
            Instruction::Lreturn => {
                let value = self.pop_long(opcode)?;
                return self.return_value(opcode, Value::Long(value));
            }
            Instruction::Freturn => {
                let value = self.pop_float(opcode)?;
                return self.return_value(opcode, Value::Float(value));
            }
            Instruction::Dreturn => {
                let value = self.pop_double(opcode)?;
                return self.return_value(opcode, Value::Double(value));
            }
            Instruction::Areturn => {
                let value = self
                    .pop_reference(opcode)?
                    .map_or(Value::Null, Value::ObjectRef);
                return self.return_value(opcode, value);
            }
            Instruction::Return => return self.exec_return(opcode),

            Instruction::Getstatic(index) => return self.exec_getstatic(vm, opcode, *index),
            Instruction::Putstatic(index) => return self.exec_putstatic(vm, opcode, *index),
            Instruction::Getfield(index) => self.exec_getfield(vm, opcode, *index)?,
            Instruction::Putfield(index) => self.exec_putfield(vm, opcode, *index)?,
            Instruction::Invokevirtual(index) => {
                return self.exec_invoke(vm, opcode, InvokeKind::Virtual, *index)
            }
            Instruction::Invokespecial(index) => {
                return self.exec_invoke(vm, opcode, InvokeKind::Special, *index)
            }
            Instruction::Invokestatic(index) => {
                return self.exec_invoke(vm, opcode, InvokeKind::Static, *index)
            }
            Instruction::Invokeinterface(index, _) => {
                return self.exec_invoke(vm, opcode, InvokeKind::Interface, *index)
            }
            Instruction::Invokedynamic(_) => {
                return Err(MethodCallError::InternalError(verify_error!(
                    "{opcode}: unsupported"
                )))
            }
            Instruction::New(index) => return self.exec_new(vm, opcode, *index),
            Instruction::Newarray(tag) => self.exec_newarray(vm, opcode, *tag)?,
            Instruction::Anewarray(index) => self.exec_anewarray(vm, opcode, *index)?,
            Instruction::Multianewarray(index, dimensions) => {
                self.exec_multianewarray(vm, opcode, *index, *dimensions)?
            }
            Instruction::Arraylength => self.exec_arraylength(vm, opcode)?,
            Instruction::Athrow => return self.exec_athrow(vm, opcode),
            Instruction::Checkcast(index) => self.exec_checkcast(vm, opcode, *index)?,
            Instruction::Instanceof(index) => self.exec_instanceof(vm, opcode, *index)?,
            // single threaded: only the null check is observable
            Instruction::Monitorenter | Instruction::Monitorexit => {
                self.pop_object(opcode)?;
            }
        }
        Ok(InstructionResult::Continue)
    }
}
