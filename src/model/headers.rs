//! Header map with the sanitation applied before any downstream logic runs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Map from lower-cased header name to its ordered list of values.
///
/// MIME headers may legally repeat, so every name keeps a `Vec` of values in
/// arrival order. Values are expected to pass through [`Headers::sanitize`]
/// before anything downstream (logging, HTTP response headers) inspects them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Headers(BTreeMap<String, Vec<String>>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value under `name` (name is lower-cased on insert).
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.0
            .entry(name.trim().to_lowercase())
            .or_default()
            .push(value.into());
    }

    /// First value for `name`, if any.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .get(&name.to_lowercase())
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    /// All values for `name`, in arrival order.
    pub fn get_all(&self, name: &str) -> &[String] {
        self.0
            .get(&name.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over `(name, values)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Apply [`sanitize_value`] to every value in place.
    pub fn sanitize(&mut self) {
        for values in self.0.values_mut() {
            for value in values.iter_mut() {
                *value = sanitize_value(value);
            }
        }
    }
}

/// Strip unsafe bytes from a protocol header value.
///
/// Control characters (U+0000..U+001F, U+007F..U+009F) are removed, any
/// remaining non-ASCII character becomes `?`, and the result is trimmed.
/// Malformed or adversarial header bytes must not corrupt log output or
/// HTTP response headers assembled later by the caller.
pub fn sanitize_value(value: &str) -> String {
    let cleaned: String = value
        .chars()
        .filter(|c| !matches!(c, '\u{0000}'..='\u{001F}' | '\u{007F}'..='\u{009F}'))
        .map(|c| if c.is_ascii() { c } else { '?' })
        .collect();
    cleaned.trim().to_string()
}
