//! Typed value tree produced by the decoder
//!
//! A closed sum over the seven value kinds the wire format can carry.
//! Containers own their children outright; decoding only moves forward
//! through the buffer so the tree can never contain a cycle.

use std::collections::HashMap;

/// One decoded wire value
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Integer(i64),
    UnsignedInteger(u64),
    Float(f64),
    Boolean(bool),
    /// Byte string, also used for atoms
    Binary(Vec<u8>),
    List(Vec<TypedValue>),
    Map(TypedMap),
}

impl TypedValue {
    /// Short kind name for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            TypedValue::Integer(_) => "integer",
            TypedValue::UnsignedInteger(_) => "unsigned integer",
            TypedValue::Float(_) => "float",
            TypedValue::Boolean(_) => "boolean",
            TypedValue::Binary(_) => "binary",
            TypedValue::List(_) => "list",
            TypedValue::Map(_) => "map",
        }
    }

    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            TypedValue::Binary(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            TypedValue::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_unsigned(&self) -> Option<u64> {
        match self {
            TypedValue::UnsignedInteger(value) => Some(*value),
            _ => None,
        }
    }

    /// Convenience constructor for string payloads
    pub fn binary(bytes: impl Into<Vec<u8>>) -> Self {
        TypedValue::Binary(bytes.into())
    }
}

impl From<&str> for TypedValue {
    fn from(value: &str) -> Self {
        TypedValue::Binary(value.as_bytes().to_vec())
    }
}

impl From<bool> for TypedValue {
    fn from(value: bool) -> Self {
        TypedValue::Boolean(value)
    }
}

impl From<i64> for TypedValue {
    fn from(value: i64) -> Self {
        TypedValue::Integer(value)
    }
}

impl From<u64> for TypedValue {
    fn from(value: u64) -> Self {
        TypedValue::UnsignedInteger(value)
    }
}

/// Hashable projection of a scalar key
///
/// Floats and containers have no total equality, so they are not indexed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyIndex {
    Integer(i64),
    UnsignedInteger(u64),
    Boolean(bool),
    Binary(Vec<u8>),
}

impl KeyIndex {
    fn of(key: &TypedValue) -> Option<Self> {
        match key {
            TypedValue::Integer(v) => Some(KeyIndex::Integer(*v)),
            TypedValue::UnsignedInteger(v) => Some(KeyIndex::UnsignedInteger(*v)),
            TypedValue::Boolean(v) => Some(KeyIndex::Boolean(*v)),
            TypedValue::Binary(bytes) => Some(KeyIndex::Binary(bytes.clone())),
            TypedValue::Float(_) | TypedValue::List(_) | TypedValue::Map(_) => None,
        }
    }
}

/// Ordered key/value association with last-write-wins insertion
///
/// Entries keep the position of the first occurrence of a key; a later
/// entry with an equal key replaces the value in place. Scalar keys are
/// looked up through a hash index, float and container keys by scanning
/// only the entries that hold such keys.
#[derive(Debug, Clone, Default)]
pub struct TypedMap {
    entries: Vec<(TypedValue, TypedValue)>,
    index: HashMap<KeyIndex, usize>,
    unindexed: Vec<usize>,
}

impl PartialEq for TypedMap {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl TypedMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
            unindexed: Vec::new(),
        }
    }

    /// Insert an entry, returning the value it replaced
    pub fn insert(&mut self, key: TypedValue, value: TypedValue) -> Option<TypedValue> {
        if let Some(position) = self.position(&key) {
            return Some(std::mem::replace(&mut self.entries[position].1, value));
        }

        let position = self.entries.len();
        match KeyIndex::of(&key) {
            Some(indexed) => {
                self.index.insert(indexed, position);
            }
            None => self.unindexed.push(position),
        }
        self.entries.push((key, value));
        None
    }

    pub fn get(&self, key: &TypedValue) -> Option<&TypedValue> {
        self.position(key).map(|position| &self.entries[position].1)
    }

    /// Lookup by a byte-string key, the only key kind producers use
    pub fn get_binary(&self, key: &[u8]) -> Option<&TypedValue> {
        self.index
            .get(&KeyIndex::Binary(key.to_vec()))
            .map(|&position| &self.entries[position].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TypedValue, &TypedValue)> {
        self.entries.iter().map(|(key, value)| (key, value))
    }

    fn position(&self, key: &TypedValue) -> Option<usize> {
        match KeyIndex::of(key) {
            Some(indexed) => self.index.get(&indexed).copied(),
            None => self
                .unindexed
                .iter()
                .copied()
                .find(|&position| self.entries[position].0 == *key),
        }
    }
}

impl FromIterator<(TypedValue, TypedValue)> for TypedMap {
    fn from_iter<I: IntoIterator<Item = (TypedValue, TypedValue)>>(iter: I) -> Self {
        let mut map = TypedMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl IntoIterator for TypedMap {
    type Item = (TypedValue, TypedValue);
    type IntoIter = std::vec::IntoIter<(TypedValue, TypedValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
