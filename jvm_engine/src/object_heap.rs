use crate::jvm_error::{verify_error, VmExecResult};
use crate::jvm_values::{ObjectRef, Value};
use crate::string_pool::StringIndex;
use indexmap::IndexMap;
use std::collections::VecDeque;

/// How many recent array allocations the heap remembers for diagnostics.
pub const LIVE_ARRAY_LIMIT: usize = 1024;

/// Array elements the heap hands out in total before `OutOfMemoryError`.
pub const ARRAY_ELEMENT_CAPACITY: usize = 1 << 26;

/// Typed element storage of an array object.
///
/// `boolean[]` and `byte[]` share `Bytes`; `char[]`, `short[]` and `int[]` share
/// `Ints`. Narrowing to the element width is applied by the store instructions.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
    Bytes(Vec<i8>),
    Ints(Vec<i32>),
    Longs(Vec<i64>),
    Floats(Vec<f32>),
    Doubles(Vec<f64>),
    References(Vec<Value>),
}

impl ArrayData {
    /// Zero filled storage for elements described by `component`, e.g. `I` or `Ljava/lang/String;`.
    pub fn new(component: &str, length: usize) -> ArrayData {
        match component.chars().next() {
            Some('Z') | Some('B') => ArrayData::Bytes(vec![0; length]),
            Some('C') | Some('S') | Some('I') => ArrayData::Ints(vec![0; length]),
            Some('J') => ArrayData::Longs(vec![0; length]),
            Some('F') => ArrayData::Floats(vec![0.0; length]),
            Some('D') => ArrayData::Doubles(vec![0.0; length]),
            _ => ArrayData::References(vec![Value::Null; length]),
        }
    }

    /// Like [`ArrayData::new`], but None when the host cannot reserve the storage.
    pub fn try_new(component: &str, length: usize) -> Option<ArrayData> {
        fn zeroed<T: Clone>(zero: T, length: usize) -> Option<Vec<T>> {
            let mut elements = Vec::new();
            elements.try_reserve_exact(length).ok()?;
            elements.resize(length, zero);
            Some(elements)
        }

        let data = match component.chars().next() {
            Some('Z') | Some('B') => ArrayData::Bytes(zeroed(0, length)?),
            Some('C') | Some('S') | Some('I') => ArrayData::Ints(zeroed(0, length)?),
            Some('J') => ArrayData::Longs(zeroed(0, length)?),
            Some('F') => ArrayData::Floats(zeroed(0.0, length)?),
            Some('D') => ArrayData::Doubles(zeroed(0.0, length)?),
            _ => ArrayData::References(zeroed(Value::Null, length)?),
        };
        Some(data)
    }

    pub fn len(&self) -> usize {
        match self {
            ArrayData::Bytes(v) => v.len(),
            ArrayData::Ints(v) => v.len(),
            ArrayData::Longs(v) => v.len(),
            ArrayData::Floats(v) => v.len(),
            ArrayData::Doubles(v) => v.len(),
            ArrayData::References(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            ArrayData::Bytes(_) => "byte array",
            ArrayData::Ints(_) => "int array",
            ArrayData::Longs(_) => "long array",
            ArrayData::Floats(_) => "float array",
            ArrayData::Doubles(_) => "double array",
            ArrayData::References(_) => "reference array",
        }
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        let value = match self {
            ArrayData::Bytes(v) => Value::Int(*v.get(index)? as i32),
            ArrayData::Ints(v) => Value::Int(*v.get(index)?),
            ArrayData::Longs(v) => Value::Long(*v.get(index)?),
            ArrayData::Floats(v) => Value::Float(*v.get(index)?),
            ArrayData::Doubles(v) => Value::Double(*v.get(index)?),
            ArrayData::References(v) => *v.get(index)?,
        };
        Some(value)
    }

    pub fn set(&mut self, index: usize, value: Value) -> VmExecResult<()> {
        let length = self.len();
        if index >= length {
            return Err(verify_error!(
                "array store at index {index} beyond length {length}"
            ));
        }
        match (self, value) {
            (ArrayData::Bytes(v), Value::Int(i)) => v[index] = i as i8,
            (ArrayData::Ints(v), Value::Int(i)) => v[index] = i,
            (ArrayData::Longs(v), Value::Long(l)) => v[index] = l,
            (ArrayData::Floats(v), Value::Float(f)) => v[index] = f,
            (ArrayData::Doubles(v), Value::Double(d)) => v[index] = d,
            (ArrayData::References(v), r @ (Value::Null | Value::ObjectRef(_))) => v[index] = r,
            (data, value) => {
                return Err(verify_error!(
                    "cannot store {} into {}",
                    value.kind_name(),
                    data.kind_name()
                ))
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Value(Value),
    Array(ArrayData),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub descriptor: String,
    pub value: FieldValue,
}

/// A heap object. Arrays keep their elements in the `value` field.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    pub class_name: StringIndex,
    pub fields: IndexMap<String, Field>,
    is_array: bool,
}

impl Object {
    pub fn new(class_name: StringIndex) -> Object {
        Object {
            class_name,
            fields: IndexMap::new(),
            is_array: false,
        }
    }

    pub fn new_array(class_name: StringIndex, descriptor: &str, data: ArrayData) -> Object {
        let mut object = Object::new(class_name);
        object.fields.insert(
            "value".to_string(),
            Field {
                descriptor: descriptor.to_string(),
                value: FieldValue::Array(data),
            },
        );
        object.is_array = true;
        object
    }

    /// A `java/lang/String` holding `value` as UTF-8 bytes.
    pub fn new_string(class_name: StringIndex, value: &str) -> Object {
        let mut object = Object::new(class_name);
        object.fields.insert(
            "value".to_string(),
            Field {
                descriptor: "[B".to_string(),
                value: FieldValue::Array(ArrayData::Bytes(
                    value.bytes().map(|b| b as i8).collect(),
                )),
            },
        );
        object
    }

    /// Text of a string object, None when `value` holds no bytes.
    pub fn string_value(&self) -> Option<String> {
        match self.fields.get("value").map(|f| &f.value) {
            Some(FieldValue::Array(ArrayData::Bytes(bytes))) => {
                let bytes: Vec<u8> = bytes.iter().map(|b| *b as u8).collect();
                Some(String::from_utf8_lossy(&bytes).to_string())
            }
            _ => None,
        }
    }

    pub fn add_field(&mut self, name: &str, descriptor: &str, value: Value) {
        self.fields.insert(
            name.to_string(),
            Field {
                descriptor: descriptor.to_string(),
                value: FieldValue::Value(value),
            },
        );
    }

    pub fn field_value(&self, name: &str) -> Option<Value> {
        match &self.fields.get(name)?.value {
            FieldValue::Value(v) => Some(*v),
            FieldValue::Array(_) => None,
        }
    }

    /// Returns false when the object has no scalar field called `name`.
    pub fn set_field_value(&mut self, name: &str, value: Value) -> bool {
        match self.fields.get_mut(name) {
            Some(Field {
                value: FieldValue::Value(v),
                ..
            }) => {
                *v = value;
                true
            }
            _ => false,
        }
    }

    pub fn array(&self) -> Option<&ArrayData> {
        match &self.fields.get("value")?.value {
            FieldValue::Array(data) => Some(data),
            FieldValue::Value(_) => None,
        }
    }

    pub fn array_mut(&mut self) -> Option<&mut ArrayData> {
        match &mut self.fields.get_mut("value")?.value {
            FieldValue::Array(data) => Some(data),
            FieldValue::Value(_) => None,
        }
    }

    pub fn is_array(&self) -> bool {
        self.is_array
    }
}

/// Arena of objects addressed by `ObjectRef`. Nothing is ever freed.
pub struct ObjectHeap {
    objects: Vec<Object>,
    capacity: usize,
    // array elements handed out so far
    elements: usize,
    live_arrays: VecDeque<ObjectRef>,
}

impl ObjectHeap {
    pub(crate) fn new(capacity: usize) -> ObjectHeap {
        ObjectHeap {
            objects: Vec::new(),
            capacity,
            elements: 0,
            live_arrays: VecDeque::new(),
        }
    }

    /// None once the object budget is used up.
    pub fn allocate(&mut self, object: Object) -> Option<ObjectRef> {
        if self.objects.len() >= self.capacity {
            return None;
        }
        Some(self.push(object))
    }

    /// True when `count` more array elements fit in the element budget.
    pub fn has_room_for(&self, count: usize) -> bool {
        count <= ARRAY_ELEMENT_CAPACITY - self.elements
    }

    /// Charges `count` array elements to the element budget before their
    /// storage is built. False, and nothing charged, when they do not fit.
    pub(crate) fn reserve_elements(&mut self, count: usize) -> bool {
        if !self.has_room_for(count) {
            return false;
        }
        self.elements += count;
        true
    }

    /// Allocates past the budget. Used for exception objects so that
    /// `OutOfMemoryError` itself can always be raised.
    pub(crate) fn allocate_reserved(&mut self, object: Object) -> ObjectRef {
        self.push(object)
    }

    fn push(&mut self, object: Object) -> ObjectRef {
        let object_ref = ObjectRef(self.objects.len() as u32);
        if object.is_array() {
            if self.live_arrays.len() == LIVE_ARRAY_LIMIT {
                self.live_arrays.pop_front();
            }
            self.live_arrays.push_back(object_ref);
        }
        self.objects.push(object);
        object_ref
    }

    pub fn get(&self, object_ref: ObjectRef) -> VmExecResult<&Object> {
        self.objects
            .get(object_ref.index())
            .ok_or_else(|| verify_error!("dangling reference {object_ref}"))
    }

    pub fn get_mut(&mut self, object_ref: ObjectRef) -> VmExecResult<&mut Object> {
        self.objects
            .get_mut(object_ref.index())
            .ok_or_else(|| verify_error!("dangling reference {object_ref}"))
    }

    pub fn array(&self, object_ref: ObjectRef) -> VmExecResult<&ArrayData> {
        let object = self.get(object_ref)?;
        object
            .array()
            .filter(|_| object.is_array())
            .ok_or_else(|| verify_error!("{object_ref} is not an array"))
    }

    pub fn array_mut(&mut self, object_ref: ObjectRef) -> VmExecResult<&mut ArrayData> {
        let object = self.get_mut(object_ref)?;
        if !object.is_array() {
            return Err(verify_error!("{object_ref} is not an array"));
        }
        object
            .array_mut()
            .ok_or_else(|| verify_error!("{object_ref} is not an array"))
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recent array allocations, oldest first.
    pub fn live_arrays(&self) -> impl Iterator<Item = &ObjectRef> {
        self.live_arrays.iter()
    }
}

#[cfg(test)]
mod tests {
    use crate::jvm_values::Value;
    use crate::object_heap::{ArrayData, Object, ObjectHeap, ARRAY_ELEMENT_CAPACITY, LIVE_ARRAY_LIMIT};
    use crate::string_pool::StringPool;

    #[test]
    fn array_storage_follows_component_type() {
        assert!(matches!(ArrayData::new("Z", 3), ArrayData::Bytes(v) if v.len() == 3));
        assert!(matches!(ArrayData::new("C", 2), ArrayData::Ints(_)));
        assert!(matches!(ArrayData::new("F", 2), ArrayData::Floats(_)));
        assert!(matches!(ArrayData::new("[I", 2), ArrayData::References(_)));
        assert_eq!(
            Some(Value::Null),
            ArrayData::new("Ljava/lang/String;", 1).get(0)
        );
    }

    #[test]
    fn try_new_matches_new() {
        assert_eq!(Some(ArrayData::new("J", 3)), ArrayData::try_new("J", 3));
        assert_eq!(Some(ArrayData::new("[I", 2)), ArrayData::try_new("[I", 2));
        assert_eq!(None, ArrayData::try_new("J", usize::MAX));
    }

    #[test]
    fn element_budget_is_checked_before_storage() {
        let mut heap = ObjectHeap::new(16);
        assert!(!heap.reserve_elements(ARRAY_ELEMENT_CAPACITY + 1));
        assert!(heap.reserve_elements(ARRAY_ELEMENT_CAPACITY - 10));
        assert!(heap.has_room_for(10));
        assert!(!heap.reserve_elements(11));
        assert!(heap.reserve_elements(10));
        assert!(!heap.has_room_for(1));
    }

    #[test]
    fn byte_arrays_truncate_and_sign_extend() {
        let mut data = ArrayData::new("B", 1);
        data.set(0, Value::Int(200)).unwrap();
        assert_eq!(Some(Value::Int(-56)), data.get(0));
        assert!(data.set(0, Value::Long(1)).is_err());
        assert!(data.set(1, Value::Int(1)).is_err());
        assert_eq!(None, data.get(1));
    }

    #[test]
    fn allocation_respects_budget() {
        let mut strings = StringPool::new();
        let name = strings.intern("Foo");
        let mut heap = ObjectHeap::new(2);
        let first = heap.allocate(Object::new(name)).unwrap();
        let second = heap.allocate(Object::new(name)).unwrap();
        assert_ne!(first, second);
        assert!(heap.allocate(Object::new(name)).is_none());
        let reserved = heap.allocate_reserved(Object::new(name));
        assert_eq!(3, heap.len());
        assert!(heap.get(reserved).is_ok());
    }

    #[test]
    fn fields_and_arrays() {
        let mut strings = StringPool::new();
        let mut heap = ObjectHeap::new(16);
        let mut object = Object::new(strings.intern("Point"));
        object.add_field("x", "I", Value::Int(0));
        let point = heap.allocate(object).unwrap();
        assert!(heap.get_mut(point).unwrap().set_field_value("x", Value::Int(7)));
        assert!(!heap.get_mut(point).unwrap().set_field_value("y", Value::Int(7)));
        assert_eq!(Some(Value::Int(7)), heap.get(point).unwrap().field_value("x"));
        assert!(heap.array(point).is_err());

        let array = Object::new_array(strings.intern("[I"), "[I", ArrayData::new("I", 4));
        let array = heap.allocate(array).unwrap();
        assert_eq!(4, heap.array(array).unwrap().len());
        assert_eq!(vec![&array], heap.live_arrays().collect::<Vec<_>>());
    }

    #[test]
    fn strings_are_not_arrays() {
        let mut strings = StringPool::new();
        let mut heap = ObjectHeap::new(4);
        let hello = heap
            .allocate(Object::new_string(strings.intern("java/lang/String"), "héllo"))
            .unwrap();
        assert_eq!(Some("héllo".to_string()), heap.get(hello).unwrap().string_value());
        assert!(heap.array(hello).is_err());
        assert_eq!(0, heap.live_arrays().count());
    }

    #[test]
    fn live_array_ring_is_bounded() {
        let mut strings = StringPool::new();
        let name = strings.intern("[J");
        let mut heap = ObjectHeap::new(usize::MAX);
        for _ in 0..LIVE_ARRAY_LIMIT + 5 {
            heap.allocate(Object::new_array(name, "[J", ArrayData::new("J", 1)))
                .unwrap();
        }
        assert_eq!(LIVE_ARRAY_LIMIT, heap.live_arrays().count());
        assert_eq!(5, heap.live_arrays().next().unwrap().index());
    }
}
