use crate::jvm_values::{ObjectRef, Value};
use crate::loaded_class::ClassId;
use indexmap::IndexMap;
use std::collections::HashMap;

/// Static fields, interned string literals and `java/lang/Class` mirrors.
#[derive(Default)]
pub(crate) struct StaticArea {
    fields: HashMap<ClassId, IndexMap<String, Value>>,
    string_constant_pool: HashMap<String, ObjectRef>,
    class_objects: HashMap<String, ObjectRef>,
}

impl StaticArea {
    pub(crate) fn new() -> StaticArea {
        StaticArea::default()
    }

    pub(crate) fn get_string(&self, value: &str) -> Option<ObjectRef> {
        self.string_constant_pool.get(value).copied()
    }

    pub(crate) fn cache_string(&mut self, value: &str, object_ref: ObjectRef) {
        self.string_constant_pool
            .insert(value.to_string(), object_ref);
    }

    pub(crate) fn get_class_object(&self, class_name: &str) -> Option<ObjectRef> {
        self.class_objects.get(class_name).copied()
    }

    pub(crate) fn cache_class_object(&mut self, class_name: &str, object_ref: ObjectRef) {
        self.class_objects.insert(class_name.to_string(), object_ref);
    }

    pub(crate) fn get_static_field(&self, class_id: ClassId, field_name: &str) -> Option<Value> {
        self.fields.get(&class_id)?.get(field_name).copied()
    }

    pub(crate) fn set_static_field(&mut self, class_id: ClassId, field_name: &str, value: Value) {
        self.fields
            .entry(class_id)
            .or_default()
            .insert(field_name.to_string(), value);
    }
}
