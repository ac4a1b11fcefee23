//! Request and response metadata.
//!
//! # Responsibilities
//! - Hold header-like key/value pairs for incoming and outgoing calls
//! - Canonicalize keys so `content-type` and `Content-Type` address one entry
//! - Keep every value of a repeated key (list semantics)
//!
//! # Design Decisions
//! - Keys are stored in canonical MIME form (`X-Request-Id`)
//! - Ordered map: iteration order is stable across requests
//! - `set` replaces, `append` accumulates

use std::collections::BTreeMap;

/// Case-insensitive multi-valued key/value store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    entries: BTreeMap<String, Vec<String>>,
}

impl Metadata {
    /// Create an empty metadata set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build metadata from `(key, value)` pairs, appending repeated keys.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut md = Self::new();
        for (k, v) in pairs {
            md.append(k.as_ref(), v);
        }
        md
    }

    /// Canonical form of a header key: first letter and every letter
    /// following a hyphen upper-cased, the rest lower-cased.
    pub fn canonical_key(key: &str) -> String {
        let mut out = String::with_capacity(key.len());
        let mut upper = true;
        for c in key.trim().chars() {
            if upper {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            upper = c == '-';
        }
        out
    }

    /// First value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(&Self::canonical_key(key))
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    /// Every value stored under `key`.
    pub fn get_all(&self, key: &str) -> &[String] {
        self.entries
            .get(&Self::canonical_key(key))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Replace all values of `key` with a single value.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.entries
            .insert(Self::canonical_key(key), vec![value.into()]);
    }

    /// Add a value to `key`, keeping existing ones.
    pub fn append(&mut self, key: &str, value: impl Into<String>) {
        self.entries
            .entry(Self::canonical_key(key))
            .or_default()
            .push(value.into());
    }

    /// Remove `key`, returning its values.
    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        self.entries.remove(&Self::canonical_key(key))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(&Self::canonical_key(key))
    }

    /// Copy every key of `other` into `self`, replacing values per key.
    pub fn merge_from(&mut self, other: &Metadata) {
        for (k, v) in &other.entries {
            self.entries.insert(k.clone(), v.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_key() {
        assert_eq!(Metadata::canonical_key("content-type"), "Content-Type");
        assert_eq!(Metadata::canonical_key("X-REQUEST-ID"), "X-Request-Id");
        assert_eq!(Metadata::canonical_key("remoteaddr"), "Remoteaddr");
    }

    #[test]
    fn test_case_insensitive_lookup() {
        let mut md = Metadata::new();
        md.set("content-type", "application/json");
        assert_eq!(md.get("Content-Type"), Some("application/json"));
        assert_eq!(md.get("CONTENT-TYPE"), Some("application/json"));
    }

    #[test]
    fn test_append_keeps_values() {
        let mut md = Metadata::new();
        md.append("key1", "val1");
        md.append("Key1", "val2");
        assert_eq!(md.get_all("key1"), ["val1", "val2"]);
        assert_eq!(md.get("key1"), Some("val1"));

        md.set("key1", "val3");
        assert_eq!(md.get_all("key1"), ["val3"]);
    }

    #[test]
    fn test_merge_from_replaces_per_key() {
        let mut parent = Metadata::from_pairs([("a", "1"), ("b", "2")]);
        let child = Metadata::from_pairs([("b", "3"), ("c", "4")]);
        parent.merge_from(&child);
        assert_eq!(parent.get("a"), Some("1"));
        assert_eq!(parent.get_all("b"), ["3"]);
        assert_eq!(parent.get("c"), Some("4"));
    }

    #[test]
    fn test_missing_key() {
        let md = Metadata::new();
        assert!(md.get("nope").is_none());
        assert!(md.get_all("nope").is_empty());
        assert!(md.is_empty());
    }
}
