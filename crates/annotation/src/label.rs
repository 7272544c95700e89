use serde_json::{Map, Value};

use crate::document::StateEntry;
use crate::error::{AnnotationError, Result};
use crate::region::LabelPayload;

/// Region payload that keeps whatever a persisted entry carried.
///
/// Useful when a document has to be loaded and written back without knowing
/// the labeling controls that produced it. Bounds are owned by the region, so
/// `start` and `end` are not kept here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpaqueLabel {
    pub from_name: String,
    pub to_name: String,
    pub kind: String,
    pub value: Map<String, Value>,
}

impl OpaqueLabel {
    pub fn new(
        from_name: impl Into<String>,
        to_name: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            from_name: from_name.into(),
            to_name: to_name.into(),
            kind: kind.into(),
            value: Map::new(),
        }
    }
}

impl LabelPayload for OpaqueLabel {
    fn to_state_json(&self) -> Option<StateEntry> {
        if self.value.is_empty() {
            return None;
        }
        Some(StateEntry {
            id: None,
            from_name: self.from_name.clone(),
            to_name: self.to_name.clone(),
            kind: self.kind.clone(),
            value: self.value.clone(),
        })
    }

    fn from_state_json(&mut self, entry: &StateEntry) -> Result<()> {
        if entry.from_name.is_empty() {
            return Err(AnnotationError::malformed("from_name must not be empty"));
        }
        let mut value = entry.value.clone();
        value.remove("start");
        value.remove("end");

        self.from_name = entry.from_name.clone();
        self.to_name = entry.to_name.clone();
        self.kind = entry.kind.clone();
        self.value = value;
        Ok(())
    }
}
