use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Decoded text metadata, keyed by chunk keyword.
///
/// Keys are unique and iterate in the order they were first seen in the
/// file. Inserting an existing key replaces its value in place, so the last
/// chunk with a given keyword wins while keeping the first one's position.
/// Lookups and inserts are O(1), so a file with many chunks parses in
/// linear time.
#[derive(Debug, Clone, Default)]
pub struct MetadataMap {
    entries: IndexMap<String, String>,
}

impl MetadataMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite `key`, returning the previous value if there was one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

// Equal only when the entries match in order, unlike `IndexMap` itself.
impl PartialEq for MetadataMap {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl Eq for MetadataMap {}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MetadataMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl Serialize for MetadataMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overwrite_keeps_position() {
        let mut map = MetadataMap::new();
        assert_eq!(map.insert("a", "1"), None);
        map.insert("b", "2");
        assert_eq!(map.insert("a", "3").as_deref(), Some("1"));

        let entries: Vec<_> = map.iter().collect();
        assert_eq!(entries, [("a", "3"), ("b", "2")]);
    }

    #[test]
    fn from_iter_last_wins() {
        let map: MetadataMap = [("k", "x"), ("k", "y")].into_iter().collect();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("k"), Some("y"));
        assert!(map.contains_key("k"));
        assert!(!map.contains_key("K"));
    }

    #[test]
    fn equality_depends_on_order() {
        let ab: MetadataMap = [("a", "1"), ("b", "2")].into_iter().collect();
        let ba: MetadataMap = [("b", "2"), ("a", "1")].into_iter().collect();
        assert_eq!(ab, ab.clone());
        assert_ne!(ab, ba);
    }

    #[test]
    fn serializes_in_insertion_order() {
        let map: MetadataMap = [("zeta", "1"), ("alpha", "2")].into_iter().collect();
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"zeta":"1","alpha":"2"}"#);
    }
}
