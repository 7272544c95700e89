//! Labeled-value attributes, modelled on a star rating control.
//!
//! A rating describes another annotated element (`to_name`). It is persisted
//! only while it holds a value; a zero rating is left out of the document.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;
use uuid::Uuid;

use crate::document::{HydrationReport, SkippedEntry, StateEntry};
use crate::error::{AnnotationError, Result};
use crate::region::{LabelPayload, new_persisted_id};

pub const RATING_TYPE: &str = "rating";

/// Icon drawn for each rating step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingIcon {
    #[default]
    Star,
    Heart,
    Fire,
    Smile,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IconSize {
    Small,
    #[default]
    Medium,
    Large,
}

impl IconSize {
    pub fn pixels(self) -> u32 {
        match self {
            Self::Small => 15,
            Self::Medium => 25,
            Self::Large => 40,
        }
    }
}

/// Tag attributes of a rating control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingConfig {
    pub name: String,
    /// Annotated element; falls back to `name` when absent.
    pub to_name: Option<String>,
    pub max_rating: u32,
    pub default_value: u32,
    pub icon: RatingIcon,
    pub size: IconSize,
    pub hotkey: Option<String>,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            name: RATING_TYPE.to_owned(),
            to_name: None,
            max_rating: 5,
            default_value: 0,
            icon: RatingIcon::default(),
            size: IconSize::default(),
            hotkey: None,
        }
    }
}

impl RatingConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Bounded ordinal value in `0..=max_rating`.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingAttribute {
    id: Uuid,
    pub persisted_id: String,
    config: RatingConfig,
    value: u32,
}

impl RatingAttribute {
    pub fn new(config: RatingConfig) -> Self {
        let value = config.default_value.min(config.max_rating);
        Self {
            id: Uuid::new_v4(),
            persisted_id: new_persisted_id(),
            config,
            value,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &RatingConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn to_name(&self) -> &str {
        self.config.to_name.as_deref().unwrap_or(&self.config.name)
    }

    pub fn max(&self) -> u32 {
        self.config.max_rating
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn is_selected(&self) -> bool {
        self.value > 0
    }

    pub fn icon_size_px(&self) -> u32 {
        self.config.size.pixels()
    }

    /// Human-readable value, e.g. `"3 star"`.
    pub fn selected_label(&self) -> String {
        format!("{} star", self.value)
    }

    pub fn set_value(&mut self, value: u32) {
        self.value = value.min(self.max());
    }

    /// Cycles `0 -> 1 -> ... -> max -> 0`.
    pub fn advance(&mut self) {
        self.value = if self.value >= self.max() {
            0
        } else {
            self.value + 1
        };
    }

    pub fn on_hotkey(&mut self) {
        self.advance();
    }

    pub fn unselect_all(&mut self) {
        self.value = 0;
    }

    /// Serialized form, or `None` while no rating is set.
    pub fn to_state_json(&self) -> Option<StateEntry> {
        if self.value == 0 {
            return None;
        }
        let mut entry = StateEntry::new(
            self.name(),
            self.to_name(),
            RATING_TYPE,
            json!({ "rating": self.value }),
        );
        entry.id = Some(self.persisted_id.clone());
        Some(entry)
    }

    /// Restores `persisted_id` (when present) and the rating value.
    ///
    /// The attribute is left untouched when the entry has no usable rating.
    pub fn from_state_json(&mut self, entry: &StateEntry) -> Result<()> {
        let rating = entry
            .value
            .get("rating")
            .ok_or_else(|| AnnotationError::malformed("value.rating is missing"))
            .and_then(parse_rating)?;

        if let Some(id) = &entry.id {
            self.persisted_id = id.clone();
        }
        self.set_value(rating);
        Ok(())
    }
}

impl LabelPayload for RatingAttribute {
    fn to_state_json(&self) -> Option<StateEntry> {
        RatingAttribute::to_state_json(self)
    }

    fn from_state_json(&mut self, entry: &StateEntry) -> Result<()> {
        RatingAttribute::from_state_json(self, entry)
    }
}

fn parse_rating(value: &Value) -> Result<u32> {
    if let Some(rating) = value.as_u64() {
        return Ok(u32::try_from(rating).unwrap_or(u32::MAX));
    }
    match value.as_f64() {
        Some(rating) if rating.is_finite() && rating >= 0.0 => Ok(rating.round() as u32),
        _ => Err(AnnotationError::malformed(format!(
            "value.rating must be a non-negative number, got {value}"
        ))),
    }
}

/// Attributes of one annotation, addressed by control name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeSet {
    attributes: Vec<RatingAttribute>,
}

impl AttributeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds one rating per control named by rating-typed `entries`, for
    /// callers that hold a document but no control configuration.
    ///
    /// The scale is widened past the default when a stored value exceeds it.
    /// Values are not applied; hydrate with [`Self::from_state_json`].
    pub fn infer_ratings<'a>(entries: impl IntoIterator<Item = &'a StateEntry>) -> Self {
        let mut set = Self::new();
        for entry in entries.into_iter().filter(|entry| entry.kind == RATING_TYPE) {
            let stored = entry
                .value
                .get("rating")
                .and_then(|rating| parse_rating(rating).ok())
                .unwrap_or(0);
            if let Some(existing) = set.get_mut(&entry.from_name) {
                existing.config.max_rating = existing.config.max_rating.max(stored);
                continue;
            }
            let defaults = RatingConfig::named(entry.from_name.as_str());
            set.insert(RatingAttribute::new(RatingConfig {
                to_name: (!entry.to_name.is_empty()).then(|| entry.to_name.clone()),
                max_rating: defaults.max_rating.max(stored),
                ..defaults
            }));
        }
        debug!(count = set.len(), "inferred rating controls");
        set
    }

    /// Adds an attribute, replacing any existing one with the same name.
    pub fn insert(&mut self, attribute: RatingAttribute) {
        match self
            .attributes
            .iter_mut()
            .find(|existing| existing.name() == attribute.name())
        {
            Some(existing) => *existing = attribute,
            None => self.attributes.push(attribute),
        }
    }

    pub fn get(&self, name: &str) -> Option<&RatingAttribute> {
        self.attributes.iter().find(|attribute| attribute.name() == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut RatingAttribute> {
        self.attributes
            .iter_mut()
            .find(|attribute| attribute.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RatingAttribute> {
        self.attributes.iter()
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn to_state_json(&self) -> Vec<StateEntry> {
        self.attributes
            .iter()
            .filter_map(RatingAttribute::to_state_json)
            .collect()
    }

    /// Resets every attribute, then restores values routed by `from_name`.
    ///
    /// Entries naming an unknown control, or carrying an unusable value, are
    /// reported as skipped.
    pub fn from_state_json<'a>(
        &mut self,
        entries: impl IntoIterator<Item = (usize, &'a StateEntry)>,
    ) -> HydrationReport {
        for attribute in &mut self.attributes {
            attribute.unselect_all();
        }

        let mut report = HydrationReport::default();
        for (index, entry) in entries {
            let result = match self.get_mut(&entry.from_name) {
                Some(attribute) => attribute.from_state_json(entry),
                None => Err(AnnotationError::malformed(format!(
                    "no control named `{}`",
                    entry.from_name
                ))),
            };
            match result {
                Ok(()) => report.restored += 1,
                Err(error) => {
                    debug!(index, %error, "skipping attribute entry");
                    report
                        .skipped
                        .push(SkippedEntry::new(index, entry.id.clone(), &error));
                }
            }
        }
        report
    }

    /// Advances every attribute bound to `key`. Returns whether any matched.
    pub fn on_hotkey(&mut self, key: &str) -> bool {
        let mut matched = false;
        for attribute in &mut self.attributes {
            if attribute.config.hotkey.as_deref() == Some(key) {
                attribute.on_hotkey();
                matched = true;
            }
        }
        matched
    }
}
