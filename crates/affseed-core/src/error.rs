use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Structured failure with a stable code, a human message, and context data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub context: Map<String, Value>,
    /// Inner failures of a composed stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Box<ErrorSet>>,
}

impl ErrorRecord {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: Map::new(),
            source: None,
        }
    }

    /// Attach a context value. Values that fail to serialize are stored as null.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.context.insert(key.into(), value);
        self
    }

    pub fn with_source(mut self, source: ErrorSet) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

/// Ordered collection of failures.
///
/// Validation pushes every failed rule instead of stopping at the first one,
/// so callers see the complete list in one pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Error)]
#[serde(transparent)]
#[error("{}", summarize(.records))]
pub struct ErrorSet {
    records: Vec<ErrorRecord>,
}

impl ErrorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set holding one record.
    pub fn single(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::from(ErrorRecord::new(code, message))
    }

    pub fn push(&mut self, record: ErrorRecord) {
        self.records.push(record);
    }

    /// Add a record without context.
    pub fn add(&mut self, code: impl Into<String>, message: impl Into<String>) {
        self.push(ErrorRecord::new(code, message));
    }

    /// Append all records of another set, keeping order.
    pub fn merge(&mut self, other: ErrorSet) {
        self.records.extend(other.records);
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn records(&self) -> &[ErrorRecord] {
        &self.records
    }

    pub fn codes(&self) -> Vec<&str> {
        self.records.iter().map(|record| record.code.as_str()).collect()
    }

    pub fn has(&self, code: &str) -> bool {
        self.records.iter().any(|record| record.code == code)
    }

    pub fn first(&self) -> Option<&ErrorRecord> {
        self.records.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ErrorRecord> {
        self.records.iter()
    }

    /// Messages of this set followed by the messages of nested sources, depth first.
    pub fn messages(&self) -> Vec<String> {
        let mut out = Vec::new();
        for record in &self.records {
            out.push(record.message.clone());
            if let Some(source) = &record.source {
                out.extend(source.messages());
            }
        }
        out
    }
}

impl From<ErrorRecord> for ErrorSet {
    fn from(record: ErrorRecord) -> Self {
        Self {
            records: vec![record],
        }
    }
}

impl FromIterator<ErrorRecord> for ErrorSet {
    fn from_iter<I: IntoIterator<Item = ErrorRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ErrorSet {
    type Item = ErrorRecord;
    type IntoIter = std::vec::IntoIter<ErrorRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a ErrorSet {
    type Item = &'a ErrorRecord;
    type IntoIter = std::slice::Iter<'a, ErrorRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

fn summarize(records: &[ErrorRecord]) -> String {
    match records {
        [] => "no errors".to_string(),
        [only] => format!("{}: {}", only.code, only.message),
        [first, rest @ ..] => format!("{}: {} (+{} more)", first.code, first.message, rest.len()),
    }
}

/// Result type for host and generator operations.
pub type Result<T> = std::result::Result<T, ErrorSet>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_records_in_order() {
        let mut errors = ErrorSet::new();
        errors.add("first", "first failure");
        errors.push(ErrorRecord::new("second", "second failure").with_context("number", 0));

        assert_eq!(errors.codes(), vec!["first", "second"]);
        assert_eq!(errors.records()[1].context.get("number"), Some(&Value::from(0)));
        assert_eq!(errors.to_string(), "first: first failure (+1 more)");
    }

    #[test]
    fn nested_sources_keep_structure() {
        let inner = ErrorSet::single("inner_failed", "inner stage failed");
        let outer = ErrorSet::from(
            ErrorRecord::new("outer_failed", "outer stage failed").with_source(inner.clone()),
        );

        let source = outer.first().and_then(|record| record.source.as_deref());
        assert_eq!(source, Some(&inner));
        assert_eq!(
            outer.messages(),
            vec!["outer stage failed".to_string(), "inner stage failed".to_string()]
        );
    }

    #[test]
    fn serializes_as_a_plain_list() {
        let errors = ErrorSet::single("bad", "bad input");
        let json = serde_json::to_value(&errors).expect("serialize");
        assert!(json.is_array());
        assert_eq!(json[0]["code"], "bad");
        assert!(json[0].get("context").is_none());
    }
}
