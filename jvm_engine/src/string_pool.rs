use std::collections::HashMap;
use std::fmt::{Display, Formatter};

/// Stable handle of an interned string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StringIndex(u32);

impl Display for StringIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Intern table for class names and other identifiers.
/// Indexes are never reused, so a `StringIndex` stays valid for the life of the pool.
#[derive(Debug, Default)]
pub struct StringPool {
    strings: Vec<String>,
    indexes: HashMap<String, StringIndex>,
}

impl StringPool {
    pub fn new() -> StringPool {
        StringPool::default()
    }

    pub fn intern(&mut self, value: &str) -> StringIndex {
        if let Some(index) = self.indexes.get(value) {
            return *index;
        }
        let index = StringIndex(self.strings.len() as u32);
        self.strings.push(value.to_string());
        self.indexes.insert(value.to_string(), index);
        index
    }

    pub fn find(&self, value: &str) -> Option<StringIndex> {
        self.indexes.get(value).copied()
    }

    pub fn get(&self, index: StringIndex) -> &str {
        self.strings
            .get(index.0 as usize)
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}
