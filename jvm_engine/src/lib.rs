//! Execution core of a small Java virtual machine: class loading, the frame
//! stack, the bytecode interpreter and a handful of built-in intrinsics.

pub mod bootstrap_class_loader;
pub mod call_stack;
pub mod class_finder;
pub mod descriptor;
pub mod interpreter;
pub mod java_exception;
pub mod jvm_error;
pub mod jvm_values;
pub mod loaded_class;
pub mod method_area;
pub mod native_method_area;
pub mod object_heap;
pub mod operand_stack;
pub mod runtime_attribute_info;
pub mod runtime_constant_pool;
pub mod runtime_field_info;
pub mod runtime_method_info;
pub mod stack_frame;
pub mod stack_trace_element;
pub mod static_field_area;
pub mod string_pool;
pub mod virtual_machine;

mod frame_arrays;
mod frame_invoke;
mod frame_objects;
mod natives;
