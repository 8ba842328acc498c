//! Form-encoded request bodies
//!
//! Every platform call is a POST with an `application/x-www-form-urlencoded`
//! body. List-valued parameters are encoded as a JSON-array literal inside a
//! single form value. Entries keep insertion order so tests can assert exact
//! payloads.

use serde::Serialize;

/// Ordered set of form fields for one API call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Form {
    entries: Vec<(String, String)>,
}

impl Form {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, key: &str, value: impl Into<String>) -> Self {
        self.entries.push((key.to_string(), value.into()));
        self
    }

    pub fn uint(self, key: &str, value: u64) -> Self {
        self.text(key, value.to_string())
    }

    pub fn int(self, key: &str, value: i64) -> Self {
        self.text(key, value.to_string())
    }

    pub fn boolean(self, key: &str, value: bool) -> Self {
        self.text(key, if value { "true" } else { "false" })
    }

    /// Add the field only when the value is present and non-empty.
    pub fn opt_text(self, key: &str, value: Option<&str>) -> Self {
        match value {
            Some(v) if !v.is_empty() => self.text(key, v),
            _ => self,
        }
    }

    /// Add the field only when the value is present and non-zero.
    pub fn opt_uint(self, key: &str, value: Option<u64>) -> Self {
        match value {
            Some(v) if v != 0 => self.uint(key, v),
            _ => self,
        }
    }

    /// Encode a list parameter as a JSON-array literal in one form value.
    pub fn json_list<T: Serialize>(self, key: &str, values: &[T]) -> Self {
        // Serializing a slice of plain values cannot fail.
        let literal = serde_json::to_string(values).unwrap_or_else(|_| "[]".to_string());
        self.text(key, literal)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_keep_insertion_order() {
        let form = Form::new()
            .text("name", "web")
            .uint("rgId", 3)
            .boolean("start", false);
        let keys: Vec<_> = form.entries().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["name", "rgId", "start"]);
        assert_eq!(form.get("start"), Some("false"));
    }

    #[test]
    fn lists_become_json_array_literals() {
        let form = Form::new().json_list("extnets", &[7u64, 12]);
        assert_eq!(form.get("extnets"), Some("[7,12]"));
    }

    #[test]
    fn optional_fields_are_skipped_when_empty() {
        let form = Form::new()
            .opt_text("desc", None)
            .opt_text("pool", Some(""))
            .opt_uint("sepId", Some(0))
            .opt_uint("imageId", Some(17));
        assert!(!form.contains("desc"));
        assert!(!form.contains("pool"));
        assert!(!form.contains("sepId"));
        assert_eq!(form.get("imageId"), Some("17"));
    }
}
