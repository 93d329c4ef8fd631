use indexmap::IndexMap;

use crate::error::Error;
use crate::object::Object;
use crate::Result;

/// A PDF dictionary: `Name -> Object`. Key order is preserved (not semantically
/// meaningful) via `IndexMap`, which keeps dictionaries stable for round-tripping
/// should a writer ever sit on top of this crate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dictionary(IndexMap<Vec<u8>, Object>);

impl Dictionary {
    pub fn new() -> Self {
        Dictionary(IndexMap::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &[u8]) -> Result<&Object> {
        self.0.get(key).ok_or_else(|| Error::ObjectType { expected: "present key", found: "missing" })
    }

    pub fn get_mut(&mut self, key: &[u8]) -> Option<&mut Object> {
        self.0.get_mut(key)
    }

    pub fn has(&self, key: &[u8]) -> bool {
        self.0.contains_key(key)
    }

    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<Vec<u8>>,
        V: Into<Object>,
    {
        self.0.insert(key.into(), value.into());
    }

    /// Insert a key-value pair, honoring the strict/relaxed duplicate-key policy:
    /// in `strict` mode a repeated key is a parse error, otherwise the
    /// last occurrence wins (the default behavior of plain insertion).
    pub fn insert_checked(&mut self, key: Vec<u8>, value: Object, strict: bool) -> Result<()> {
        if strict && self.0.contains_key(&key) {
            return Err(crate::error::ParseError::DictDuplicateKey.into());
        }
        self.0.insert(key, value);
        Ok(())
    }

    pub fn remove(&mut self, key: &[u8]) -> Option<Object> {
        self.0.shift_remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Vec<u8>, &Object)> {
        self.0.iter()
    }

    pub fn get_type(&self) -> Result<&[u8]> {
        self.get(b"Type").and_then(Object::as_name)
    }

    pub fn has_type(&self, type_name: &[u8]) -> bool {
        self.get_type().map(|t| t == type_name).unwrap_or(false)
    }

    pub fn get_subtype(&self) -> Result<&[u8]> {
        self.get(b"Subtype").and_then(Object::as_name)
    }
}

impl<'a> IntoIterator for &'a Dictionary {
    type Item = (&'a Vec<u8>, &'a Object);
    type IntoIter = indexmap::map::Iter<'a, Vec<u8>, Object>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
