//! Flattening of path captures and query pairs into one parameter list.

use percent_encoding::percent_decode_str;
use url::form_urlencoded;

use crate::routing::Captures;

/// Ordered parameter list: key → every value seen for it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatParams(Vec<(String, Vec<String>)>);

impl FlatParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `value` to `key`, keeping earlier values.
    pub fn append(&mut self, key: &str, value: impl Into<String>) {
        match self.0.iter_mut().find(|(k, _)| k == key) {
            Some((_, values)) => values.push(value.into()),
            None => self.0.push((key.to_string(), vec![value.into()])),
        }
    }

    /// Replace every value of `key`.
    pub fn set(&mut self, key: &str, values: Vec<String>) {
        match self.0.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => *existing = values,
            None => self.0.push((key.to_string(), values)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FlatParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (k, v) in iter {
            params.append(&k.into(), v);
        }
        params
    }
}

/// Build the parameter list for a request.
///
/// Path variables come first, percent-decoded; wildcard captures keep
/// their `/` separators. A query key that names a path variable replaces
/// it, repeated query keys accumulate.
pub fn collect(captures: &Captures, query: Option<&str>) -> FlatParams {
    let mut params = FlatParams::new();
    for (name, captured) in captures.iter() {
        params.set(name, vec![percent_decode(&captured.joined())]);
    }

    let Some(query) = query.filter(|q| !q.is_empty()) else {
        return params;
    };

    let mut from_query: Vec<String> = Vec::new();
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        if from_query.iter().any(|k| k == key.as_ref()) {
            params.append(&key, value.into_owned());
        } else {
            params.set(&key, vec![value.into_owned()]);
            from_query.push(key.into_owned());
        }
    }
    params
}

fn percent_decode(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}
