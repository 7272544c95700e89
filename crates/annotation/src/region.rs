//! Time regions and the store that owns their identity and bounds.
//!
//! # Invariants
//! - `RegionId` is generated once and never reused.
//! - Stored bounds satisfy `0 <= start <= end`, and `end <= duration` once the
//!   track duration is known. Inverted input is swapped, not rejected.
//! - Every mutation is published to registered observers in call order.

use std::fmt::{Debug, Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::config::Palette;
use crate::document::{HydrationReport, SkippedEntry, StateEntry};
use crate::error::{AnnotationError, Result};

const PERSISTED_ID_LEN: usize = 10;

/// Opaque identifier for regions, stable for the region's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegionId(Uuid);

impl RegionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RegionId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RegionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// Generates the short identifier written into persisted documents.
pub fn new_persisted_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(PERSISTED_ID_LEN);
    id
}

/// Serialization contract for the annotation carried by a region.
///
/// The same contract is implemented by standalone attributes such as
/// [`crate::attribute::RatingAttribute`].
pub trait LabelPayload {
    /// Returns `None` when there is no recorded value; such regions are left
    /// out of the persisted document.
    fn to_state_json(&self) -> Option<StateEntry>;

    /// Restores the payload from a persisted entry.
    fn from_state_json(&mut self, entry: &StateEntry) -> Result<()>;

    /// Presentation hook for pointer hover. Must not touch region bounds.
    fn on_hover(&mut self, _hovered: bool) {}
}

/// Bounds reported by the rendering surface for a drag-select gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProvisionalBounds {
    pub start: f64,
    pub end: f64,
}

/// What an authorizer hands back when it accepts a provisional region.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionDraft<P> {
    pub payload: P,
    pub color: Option<String>,
    pub selected_color: Option<String>,
}

impl<P> RegionDraft<P> {
    pub fn new(payload: P) -> Self {
        Self {
            payload,
            color: None,
            selected_color: None,
        }
    }
}

/// Sole gate deciding whether a provisional region becomes a domain region.
pub trait RegionAuthorizer<P> {
    fn authorize(&mut self, bounds: &ProvisionalBounds) -> Option<RegionDraft<P>>;
}

impl<P, F> RegionAuthorizer<P> for F
where
    F: FnMut(&ProvisionalBounds) -> Option<RegionDraft<P>>,
{
    fn authorize(&mut self, bounds: &ProvisionalBounds) -> Option<RegionDraft<P>> {
        self(bounds)
    }
}

/// A user-defined, time-bounded annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct Region<P> {
    id: RegionId,
    persisted_id: String,
    start: f64,
    end: f64,
    color: String,
    selected_color: String,
    selected: bool,
    payload: P,
}

impl<P> Region<P> {
    pub fn id(&self) -> RegionId {
        self.id
    }

    pub fn persisted_id(&self) -> &str {
        &self.persisted_id
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn selected_color(&self) -> &str {
        &self.selected_color
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Colour the surface should paint right now.
    pub fn display_color(&self) -> &str {
        if self.selected {
            &self.selected_color
        } else {
            &self.color
        }
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }
}

impl<P: LabelPayload> Region<P> {
    /// Serializes the region, or `None` when its payload has nothing to save.
    pub fn to_state_json(&self) -> Option<StateEntry> {
        let mut entry = self.payload.to_state_json()?;
        entry.id = Some(self.persisted_id.clone());
        entry.value.insert("start".to_owned(), Value::from(self.start));
        entry.value.insert("end".to_owned(), Value::from(self.end));
        Some(entry)
    }
}

/// Notification published by [`RegionStore`] after every mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    Created { id: RegionId, start: f64, end: f64 },
    BoundsChanged { id: RegionId, start: f64, end: f64 },
    SelectionChanged { id: RegionId, selected: bool },
    ColorChanged { id: RegionId },
    PayloadChanged { id: RegionId },
    Removed { id: RegionId },
    Cleared,
}

/// Receives store notifications (rendering projection, persistence, UI).
pub trait StoreObserver {
    fn on_store_event(&mut self, event: &StoreEvent);
}

impl<F> StoreObserver for F
where
    F: FnMut(&StoreEvent),
{
    fn on_store_event(&mut self, event: &StoreEvent) {
        self(event)
    }
}

/// Ordered collection of regions keyed by [`RegionId`].
pub struct RegionStore<P> {
    regions: Vec<Region<P>>,
    duration: Option<f64>,
    palette: Palette,
    observers: Vec<Box<dyn StoreObserver>>,
    outbox: Option<Vec<StoreEvent>>,
}

impl<P> Debug for RegionStore<P>
where
    P: Debug,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionStore")
            .field("regions", &self.regions)
            .field("duration", &self.duration)
            .field("palette", &self.palette)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl<P> RegionStore<P> {
    /// Creates an empty store painting new regions with `palette`.
    pub fn new(palette: Palette) -> Self {
        Self {
            regions: Vec::new(),
            duration: None,
            palette,
            observers: Vec::new(),
            outbox: None,
        }
    }

    /// Registers an observer notified of every subsequent mutation.
    pub fn subscribe(&mut self, observer: Box<dyn StoreObserver>) {
        self.observers.push(observer);
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    pub fn get(&self, id: RegionId) -> Option<&Region<P>> {
        self.regions.iter().find(|region| region.id == id)
    }

    pub fn contains(&self, id: RegionId) -> bool {
        self.index_of(id).is_some()
    }

    /// Regions in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Region<P>> {
        self.regions.iter()
    }

    pub fn selected(&self) -> impl Iterator<Item = &Region<P>> {
        self.regions.iter().filter(|region| region.selected)
    }

    /// Materializes a region through `authorizer`.
    ///
    /// Returns [`AnnotationError::RefusedCreation`] when the authorizer
    /// declines; nothing is stored in that case.
    pub fn create<A>(&mut self, bounds: ProvisionalBounds, authorizer: &mut A) -> Result<RegionId>
    where
        A: RegionAuthorizer<P> + ?Sized,
    {
        let Some(draft) = authorizer.authorize(&bounds) else {
            debug!(
                start = bounds.start,
                end = bounds.end,
                "region creation refused"
            );
            return Err(AnnotationError::RefusedCreation);
        };

        Ok(self.insert(draft, bounds, new_persisted_id()))
    }

    /// Replaces the bounds of one region, swapping and clamping as needed.
    ///
    /// Observers are notified even when the bounds do not change.
    pub fn update_bounds(&mut self, id: RegionId, start: f64, end: f64) -> Result<(f64, f64)> {
        let duration = self.duration;
        let region = self.region_mut(id)?;
        let (start, end) = normalize_bounds(start, end, duration);
        region.start = start;
        region.end = end;

        debug!(%id, start, end, "region bounds updated");
        self.publish(StoreEvent::BoundsChanged { id, start, end });
        Ok((start, end))
    }

    pub fn set_selected(&mut self, id: RegionId, selected: bool) -> Result<()> {
        self.region_mut(id)?.selected = selected;
        self.publish(StoreEvent::SelectionChanged { id, selected });
        Ok(())
    }

    pub fn set_color(&mut self, id: RegionId, color: impl Into<String>) -> Result<()> {
        self.region_mut(id)?.color = color.into();
        self.publish(StoreEvent::ColorChanged { id });
        Ok(())
    }

    /// Mutates the label payload of one region and notifies observers.
    pub fn update_payload<R>(
        &mut self,
        id: RegionId,
        update: impl FnOnce(&mut P) -> R,
    ) -> Result<R> {
        let out = update(&mut self.region_mut(id)?.payload);
        self.publish(StoreEvent::PayloadChanged { id });
        Ok(out)
    }

    pub fn remove(&mut self, id: RegionId) -> Result<Region<P>> {
        let index = self
            .index_of(id)
            .ok_or(AnnotationError::RegionNotFound { id })?;
        let removed = self.regions.remove(index);

        debug!(%id, remaining = self.regions.len(), "region removed");
        self.publish(StoreEvent::Removed { id });
        Ok(removed)
    }

    /// Removes every region.
    pub fn clear(&mut self) {
        self.regions.clear();
        self.publish(StoreEvent::Cleared);
    }

    /// Records the track duration and re-clamps stored regions to it.
    pub fn set_duration(&mut self, duration: f64) {
        if !duration.is_finite() || duration < 0.0 {
            debug!(duration, "ignoring invalid track duration");
            return;
        }
        self.duration = Some(duration);

        let mut changed = Vec::new();
        for region in &mut self.regions {
            let (start, end) = normalize_bounds(region.start, region.end, Some(duration));
            if (start, end) != (region.start, region.end) {
                region.start = start;
                region.end = end;
                changed.push(StoreEvent::BoundsChanged {
                    id: region.id,
                    start,
                    end,
                });
            }
        }
        for event in changed {
            self.publish(event);
        }
    }

    /// Forgets the track duration until the next source reports one.
    pub fn reset_duration(&mut self) {
        if self.duration.take().is_some() {
            debug!("track duration reset");
        }
    }

    pub(crate) fn payload_mut(&mut self, id: RegionId) -> Option<&mut P> {
        self.regions
            .iter_mut()
            .find(|region| region.id == id)
            .map(|region| &mut region.payload)
    }

    /// Starts collecting events for [`Self::drain_events`].
    pub(crate) fn enable_outbox(&mut self) {
        self.outbox.get_or_insert_with(Vec::new);
    }

    pub(crate) fn drain_events(&mut self) -> Vec<StoreEvent> {
        self.outbox.as_mut().map(std::mem::take).unwrap_or_default()
    }

    fn insert(
        &mut self,
        draft: RegionDraft<P>,
        bounds: ProvisionalBounds,
        persisted_id: String,
    ) -> RegionId {
        let (start, end) = normalize_bounds(bounds.start, bounds.end, self.duration);
        let region = Region {
            id: RegionId::new(),
            persisted_id,
            start,
            end,
            color: draft
                .color
                .unwrap_or_else(|| self.palette.region_color.clone()),
            selected_color: draft
                .selected_color
                .unwrap_or_else(|| self.palette.selected_region_color.clone()),
            selected: false,
            payload: draft.payload,
        };
        let id = region.id;
        self.regions.push(region);

        debug!(%id, start, end, count = self.regions.len(), "region created");
        self.publish(StoreEvent::Created { id, start, end });
        id
    }

    fn index_of(&self, id: RegionId) -> Option<usize> {
        self.regions.iter().position(|region| region.id == id)
    }

    fn region_mut(&mut self, id: RegionId) -> Result<&mut Region<P>> {
        self.regions
            .iter_mut()
            .find(|region| region.id == id)
            .ok_or(AnnotationError::RegionNotFound { id })
    }

    fn publish(&mut self, event: StoreEvent) {
        for observer in &mut self.observers {
            observer.on_store_event(&event);
        }
        if let Some(outbox) = self.outbox.as_mut() {
            outbox.push(event);
        }
    }
}

impl<P: LabelPayload> RegionStore<P> {
    /// Serializes every region whose payload has a recorded value.
    pub fn to_state_json(&self) -> Vec<StateEntry> {
        self.regions
            .iter()
            .filter_map(Region::to_state_json)
            .collect()
    }

    /// Replaces the store content with regions restored from `entries`.
    ///
    /// Each item pairs an entry with its position in the source document.
    /// Malformed entries are skipped and reported; the rest still load.
    pub fn from_state_json<'a>(
        &mut self,
        entries: impl IntoIterator<Item = (usize, &'a StateEntry)>,
        mut make_payload: impl FnMut(&StateEntry) -> P,
    ) -> HydrationReport {
        self.clear();

        let mut report = HydrationReport::default();
        for (index, entry) in entries {
            match restore_region(entry, &mut make_payload) {
                Ok((bounds, payload)) => {
                    let persisted_id = entry.id.clone().unwrap_or_else(new_persisted_id);
                    self.insert(RegionDraft::new(payload), bounds, persisted_id);
                    report.restored += 1;
                }
                Err(error) => {
                    debug!(index, %error, "skipping region entry");
                    report.skipped.push(SkippedEntry::new(index, entry.id.clone(), &error));
                }
            }
        }
        report
    }
}

fn restore_region<P: LabelPayload>(
    entry: &StateEntry,
    make_payload: &mut impl FnMut(&StateEntry) -> P,
) -> Result<(ProvisionalBounds, P)> {
    let start = numeric_field(entry, "start")?;
    let end = numeric_field(entry, "end")?;
    let mut payload = make_payload(entry);
    payload.from_state_json(entry)?;
    Ok((ProvisionalBounds { start, end }, payload))
}

fn numeric_field(entry: &StateEntry, key: &str) -> Result<f64> {
    entry
        .value
        .get(key)
        .and_then(Value::as_f64)
        .ok_or_else(|| AnnotationError::malformed(format!("value.{key} must be a number")))
}

/// Orders and clamps bounds: non-finite values become `0`, inverted input is
/// swapped, and both ends are kept within `[0, duration]`.
pub fn normalize_bounds(start: f64, end: f64, duration: Option<f64>) -> (f64, f64) {
    let finite = |value: f64| if value.is_finite() { value } else { 0.0 };
    let (mut start, mut end) = (finite(start), finite(end));
    if start > end {
        std::mem::swap(&mut start, &mut end);
    }

    let upper = duration.unwrap_or(f64::MAX);
    (start.clamp(0.0, upper), end.clamp(0.0, upper))
}
