//! Persisted annotation document.
//!
//! The document is a JSON array of entries shaped as
//! `{id, from_name, to_name, type, value}`. Region entries also carry
//! `start`/`end` inside `value`. Documents wrapped as `{"result": [...]}` are
//! accepted on input.
//!
//! Parsing is tolerant per entry: a malformed entry is reported in
//! [`ParsedDocument::skipped`] and the remaining entries still load.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::{AnnotationError, Result};

/// One serialized region or attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub from_name: String,
    #[serde(default)]
    pub to_name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub value: Map<String, Value>,
}

impl StateEntry {
    /// Builds an entry without a persisted id. A non-object `value` yields an
    /// empty value map.
    pub fn new(
        from_name: impl Into<String>,
        to_name: impl Into<String>,
        kind: impl Into<String>,
        value: Value,
    ) -> Self {
        let value = match value {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            id: None,
            from_name: from_name.into(),
            to_name: to_name.into(),
            kind: kind.into(),
            value,
        }
    }

    /// Region entries carry their time bounds in `value`.
    pub fn is_region(&self) -> bool {
        self.value.contains_key("start") && self.value.contains_key("end")
    }
}

/// Diagnostic for an entry that could not be restored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    /// Position of the entry in the source document.
    pub index: usize,
    pub id: Option<String>,
    pub reason: String,
}

impl SkippedEntry {
    pub(crate) fn new(index: usize, id: Option<String>, error: &AnnotationError) -> Self {
        Self {
            index,
            id,
            reason: error.to_string(),
        }
    }
}

/// Outcome of hydrating in-memory state from persisted entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HydrationReport {
    pub restored: usize,
    pub skipped: Vec<SkippedEntry>,
}

impl HydrationReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }

    /// Folds `other` into `self`, keeping diagnostics ordered by index.
    pub fn merge(&mut self, other: HydrationReport) {
        self.restored += other.restored;
        self.skipped.extend(other.skipped);
        self.skipped.sort_by_key(|skipped| skipped.index);
    }
}

/// Entries that parsed, with their source positions, plus the ones that did not.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedDocument {
    pub entries: Vec<(usize, StateEntry)>,
    pub skipped: Vec<SkippedEntry>,
}

impl ParsedDocument {
    pub fn regions(&self) -> impl Iterator<Item = (usize, &StateEntry)> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.is_region())
            .map(|(index, entry)| (*index, entry))
    }

    pub fn attributes(&self) -> impl Iterator<Item = (usize, &StateEntry)> {
        self.entries
            .iter()
            .filter(|(_, entry)| !entry.is_region())
            .map(|(index, entry)| (*index, entry))
    }
}

/// Serialized annotation state ready to be written out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationDocument {
    pub entries: Vec<StateEntry>,
}

impl AnnotationDocument {
    pub fn new(entries: Vec<StateEntry>) -> Self {
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses a document, collecting per-entry failures instead of aborting.
    ///
    /// # Example
    /// ```
    /// use annotation::AnnotationDocument;
    ///
    /// let parsed = AnnotationDocument::parse(
    ///     r#"[{"id": "a1", "from_name": "rating", "to_name": "audio",
    ///          "type": "rating", "value": {"rating": 3}},
    ///         {"id": "b2", "from_name": "rating"}]"#,
    /// )
    /// .expect("document is an array");
    /// assert_eq!(parsed.entries.len(), 1);
    /// assert_eq!(parsed.skipped[0].index, 1);
    /// ```
    pub fn parse(json: &str) -> Result<ParsedDocument> {
        let root: Value = serde_json::from_str(json)?;
        let items = match root {
            Value::Array(items) => items,
            Value::Object(mut object) => match object.remove("result") {
                Some(Value::Array(items)) => items,
                _ => {
                    return Err(AnnotationError::InvalidDocument {
                        reason: "expected an array of entries or an object with a `result` array"
                            .to_owned(),
                    });
                }
            },
            _ => {
                return Err(AnnotationError::InvalidDocument {
                    reason: "expected an array of entries".to_owned(),
                });
            }
        };

        let mut parsed = ParsedDocument::default();
        for (index, item) in items.into_iter().enumerate() {
            let id = item.get("id").and_then(Value::as_str).map(str::to_owned);
            match serde_json::from_value::<StateEntry>(item) {
                Ok(entry) => parsed.entries.push((index, entry)),
                Err(source) => {
                    debug!(index, %source, "skipping malformed document entry");
                    let error = AnnotationError::malformed(source.to_string());
                    parsed.skipped.push(SkippedEntry::new(index, id, &error));
                }
            }
        }
        Ok(parsed)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<ParsedDocument> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| AnnotationError::DocumentIo {
            context: "failed to read annotation document",
            path: path.to_path_buf(),
            source,
        })?;
        let parsed = Self::parse(&text)?;
        info!(
            path = %path.display(),
            entries = parsed.entries.len(),
            skipped = parsed.skipped.len(),
            "annotation document loaded"
        );
        Ok(parsed)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = self.to_json_string()?;
        std::fs::write(path, text).map_err(|source| AnnotationError::DocumentIo {
            context: "failed to write annotation document",
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), entries = self.entries.len(), "annotation document saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{AnnotationDocument, HydrationReport, SkippedEntry, StateEntry};
    use crate::error::AnnotationError;

    #[test]
    fn entry_serializes_with_external_field_names() {
        let mut entry = StateEntry::new("rating", "audio", "rating", json!({ "rating": 4 }));
        entry.id = Some("abc".to_owned());

        let value = serde_json::to_value(&entry).expect("serializable");

        assert_eq!(
            value,
            json!({
                "id": "abc",
                "from_name": "rating",
                "to_name": "audio",
                "type": "rating",
                "value": { "rating": 4 }
            })
        );
    }

    #[test]
    fn parse_accepts_result_wrapper() {
        let parsed = AnnotationDocument::parse(
            r#"{"result": [{"from_name": "r", "to_name": "a", "type": "rating", "value": {"rating": 1}}]}"#,
        )
        .expect("wrapped document");

        assert_eq!(parsed.entries.len(), 1);
        assert_eq!(parsed.entries[0].1.id, None);
    }

    #[test]
    fn parse_rejects_scalar_root() {
        let result = AnnotationDocument::parse("42");
        assert!(matches!(result, Err(AnnotationError::InvalidDocument { .. })));
    }

    #[test]
    fn entry_without_value_is_reported_with_its_id() {
        let parsed = AnnotationDocument::parse(
            r#"[{"id": "x9", "from_name": "r", "to_name": "a", "type": "rating"}]"#,
        )
        .expect("array document");

        assert!(parsed.entries.is_empty());
        assert_eq!(parsed.skipped[0].id.as_deref(), Some("x9"));
        assert!(parsed.skipped[0].reason.contains("value"));
    }

    #[test]
    fn partitions_region_and_attribute_entries() {
        let parsed = AnnotationDocument::parse(
            r#"[
                {"from_name": "label", "to_name": "audio", "type": "labels",
                 "value": {"start": 1.5, "end": 2.0, "labels": ["a"]}},
                {"from_name": "rating", "to_name": "audio", "type": "rating",
                 "value": {"rating": 2}}
            ]"#,
        )
        .expect("array document");

        let regions: Vec<usize> = parsed.regions().map(|(index, _)| index).collect();
        let attributes: Vec<usize> = parsed.attributes().map(|(index, _)| index).collect();
        assert_eq!(regions, vec![0]);
        assert_eq!(attributes, vec![1]);
    }

    #[test]
    fn merge_orders_diagnostics_by_index() {
        let error = AnnotationError::malformed("bad");
        let mut report = HydrationReport {
            restored: 1,
            skipped: vec![SkippedEntry::new(3, None, &error)],
        };
        report.merge(HydrationReport {
            restored: 2,
            skipped: vec![SkippedEntry::new(1, None, &error)],
        });

        assert_eq!(report.restored, 3);
        let indices: Vec<usize> = report.skipped.iter().map(|skip| skip.index).collect();
        assert_eq!(indices, vec![1, 3]);
    }
}
