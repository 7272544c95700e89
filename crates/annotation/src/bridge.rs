//! Translates rendering-surface gestures into store operations and projects
//! store changes back onto the surface.
//!
//! The store stays the single source of truth. The bridge owns the
//! association between surface artifacts and domain regions, and every
//! dispatch ends with a projection pass that drains the store's events and
//! patches the surface accordingly.

use std::collections::{HashMap, VecDeque};
use std::fmt::{Debug, Formatter};

use tracing::debug;

use crate::region::{
    LabelPayload, ProvisionalBounds, RegionAuthorizer, RegionId, RegionStore, StoreEvent,
    StoreObserver,
};
use crate::surface::{ArtifactId, RegionPatch, RenderingSurface, SurfaceEvent};

/// Lifecycle of a region as seen from its surface artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionPhase {
    /// Drawn on the surface, waiting for the authorizer.
    Pending,
    Active,
    Selected,
    /// A drag or resize is in progress.
    Editing,
}

/// Work scheduled during dispatch and executed on the next session tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredTask {
    PlayFrom { region: RegionId },
}

impl DeferredTask {
    pub fn region(&self) -> RegionId {
        match self {
            Self::PlayFrom { region } => *region,
        }
    }
}

pub struct EventBridge<P, A> {
    store: RegionStore<P>,
    authorizer: A,
    regions_by_artifact: HashMap<ArtifactId, RegionId>,
    artifacts_by_region: HashMap<RegionId, ArtifactId>,
    phases: HashMap<ArtifactId, RegionPhase>,
    tasks: VecDeque<DeferredTask>,
    /// Bounds the surface just reported; the matching store event needs no patch.
    echo: Option<(RegionId, f64, f64)>,
}

impl<P, A> Debug for EventBridge<P, A>
where
    P: Debug,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBridge")
            .field("store", &self.store)
            .field("regions_by_artifact", &self.regions_by_artifact)
            .field("phases", &self.phases)
            .field("tasks", &self.tasks)
            .finish_non_exhaustive()
    }
}

impl<P, A> EventBridge<P, A>
where
    P: LabelPayload,
    A: RegionAuthorizer<P>,
{
    pub fn new(mut store: RegionStore<P>, authorizer: A) -> Self {
        store.enable_outbox();
        Self {
            store,
            authorizer,
            regions_by_artifact: HashMap::new(),
            artifacts_by_region: HashMap::new(),
            phases: HashMap::new(),
            tasks: VecDeque::new(),
            echo: None,
        }
    }

    pub fn store(&self) -> &RegionStore<P> {
        &self.store
    }

    pub fn subscribe(&mut self, observer: Box<dyn StoreObserver>) {
        self.store.subscribe(observer);
    }

    /// Region currently painted by `artifact`.
    pub fn region_for(&self, artifact: ArtifactId) -> Option<RegionId> {
        self.regions_by_artifact.get(&artifact).copied()
    }

    pub fn artifact_for(&self, region: RegionId) -> Option<ArtifactId> {
        self.artifacts_by_region.get(&region).copied()
    }

    /// Phase of a live artifact. Removed, refused and unknown artifacts have
    /// none, so their later events are ignored.
    pub fn phase(&self, artifact: ArtifactId) -> Option<RegionPhase> {
        self.phases.get(&artifact).copied()
    }

    /// Hands over every task queued so far.
    pub fn take_due_tasks(&mut self) -> Vec<DeferredTask> {
        self.tasks.drain(..).collect()
    }

    /// Runs `update` against the store, then projects the resulting changes.
    pub fn with_store<S, R>(
        &mut self,
        surface: &mut S,
        update: impl FnOnce(&mut RegionStore<P>) -> R,
    ) -> R
    where
        S: RenderingSurface + ?Sized,
    {
        let out = update(&mut self.store);
        self.project(surface);
        out
    }

    /// Dispatches one region-level surface event.
    ///
    /// Transport events are not handled here and are ignored.
    pub fn handle_region_event<S>(&mut self, surface: &mut S, event: &SurfaceEvent)
    where
        S: RenderingSurface + ?Sized,
    {
        match *event {
            SurfaceEvent::Created {
                artifact,
                start,
                end,
            } => self.on_created(surface, artifact, ProvisionalBounds { start, end }),
            SurfaceEvent::Updating { artifact } => {
                if self.live_region(artifact).is_some() {
                    self.phases.insert(artifact, RegionPhase::Editing);
                }
            }
            SurfaceEvent::Updated {
                artifact,
                start,
                end,
            } => self.on_updated(artifact, start, end),
            SurfaceEvent::Removed { artifact } => self.on_removed(artifact),
            SurfaceEvent::HoverEnter { artifact } => self.on_hover(artifact, true),
            SurfaceEvent::HoverLeave { artifact } => self.on_hover(artifact, false),
            SurfaceEvent::Click { artifact } => self.on_click(artifact),
            SurfaceEvent::DoubleClick { artifact } => {
                if let Some(region) = self.live_region(artifact) {
                    debug!(%region, "queued play from region start");
                    self.tasks.push_back(DeferredTask::PlayFrom { region });
                }
            }
            SurfaceEvent::Ready { .. }
            | SurfaceEvent::Play
            | SurfaceEvent::Pause
            | SurfaceEvent::Position { .. } => {
                debug!(?event, "transport event ignored by region bridge");
            }
        }
        self.project(surface);
    }

    fn on_created<S>(&mut self, surface: &mut S, artifact: ArtifactId, bounds: ProvisionalBounds)
    where
        S: RenderingSurface + ?Sized,
    {
        if self.phases.contains_key(&artifact) {
            debug!(artifact, "duplicate create for known artifact ignored");
            return;
        }
        self.phases.insert(artifact, RegionPhase::Pending);

        match self.store.create(bounds, &mut self.authorizer) {
            Ok(region) => {
                self.regions_by_artifact.insert(artifact, region);
                self.artifacts_by_region.insert(region, artifact);
                self.phases.insert(artifact, RegionPhase::Active);
            }
            Err(error) => {
                debug!(artifact, %error, "discarding provisional region");
                self.phases.remove(&artifact);
                surface.discard_region(artifact);
            }
        }
    }

    fn on_updated(&mut self, artifact: ArtifactId, start: f64, end: f64) {
        let Some(region) = self.live_region(artifact) else {
            return;
        };
        self.echo = Some((region, start, end));
        if self.store.update_bounds(region, start, end).is_err() {
            debug!(%region, "update for region missing from store ignored");
            return;
        }
        let phase = self.resting_phase(region);
        self.phases.insert(artifact, phase);
    }

    fn on_removed(&mut self, artifact: ArtifactId) {
        let Some(region) = self.live_region(artifact) else {
            return;
        };
        // The surface already dropped the artifact; unindex it so the
        // projection does not try to remove it a second time.
        self.unindex(artifact, region);
        if let Err(error) = self.store.remove(region) {
            debug!(%region, %error, "remove for region missing from store ignored");
        }
    }

    fn on_hover(&mut self, artifact: ArtifactId, hovered: bool) {
        let Some(region) = self.live_region(artifact) else {
            return;
        };
        if let Some(payload) = self.store.payload_mut(region) {
            payload.on_hover(hovered);
        }
    }

    fn on_click(&mut self, artifact: ArtifactId) {
        let Some(region) = self.live_region(artifact) else {
            return;
        };
        let was_selected = self
            .store
            .get(region)
            .is_some_and(|stored| stored.is_selected());

        let others: Vec<RegionId> = self
            .store
            .selected()
            .map(|stored| stored.id())
            .filter(|id| *id != region)
            .collect();
        for other in others {
            if let Err(error) = self.store.set_selected(other, false) {
                debug!(region = %other, %error, "deselect skipped");
            }
        }
        if let Err(error) = self.store.set_selected(region, !was_selected) {
            debug!(%region, %error, "selection change skipped");
        }
    }

    /// Region still backed by `artifact`, or `None` (logged) for stale events.
    fn live_region(&self, artifact: ArtifactId) -> Option<RegionId> {
        let region = self.regions_by_artifact.get(&artifact).copied();
        match region {
            Some(region) if self.store.contains(region) => Some(region),
            _ => {
                debug!(artifact, phase = ?self.phase(artifact), "event for unknown artifact ignored");
                None
            }
        }
    }

    fn resting_phase(&self, region: RegionId) -> RegionPhase {
        match self.store.get(region) {
            Some(stored) if stored.is_selected() => RegionPhase::Selected,
            _ => RegionPhase::Active,
        }
    }

    fn unindex(&mut self, artifact: ArtifactId, region: RegionId) {
        self.regions_by_artifact.remove(&artifact);
        self.artifacts_by_region.remove(&region);
        self.phases.remove(&artifact);
    }

    fn cancel_tasks(&mut self, region: RegionId) {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.region() != region);
        let cancelled = before - self.tasks.len();
        if cancelled > 0 {
            debug!(%region, cancelled, "cancelled deferred tasks");
        }
    }

    fn patch_appearance<S>(&self, surface: &mut S, region: RegionId)
    where
        S: RenderingSurface + ?Sized,
    {
        let (Some(artifact), Some(stored)) = (self.artifact_for(region), self.store.get(region))
        else {
            return;
        };
        surface.patch_region(
            artifact,
            RegionPatch::Appearance {
                color: stored.display_color().to_owned(),
                selected: stored.is_selected(),
            },
        );
    }

    fn project<S>(&mut self, surface: &mut S)
    where
        S: RenderingSurface + ?Sized,
    {
        let echo = self.echo.take();
        for event in self.store.drain_events() {
            match event {
                StoreEvent::Created { id, start, end } => {
                    if self.artifact_for(id).is_some() {
                        self.patch_appearance(surface, id);
                        continue;
                    }
                    let Some(stored) = self.store.get(id) else {
                        continue;
                    };
                    let artifact = surface.add_region(start, end, stored.display_color());
                    self.regions_by_artifact.insert(artifact, id);
                    self.artifacts_by_region.insert(id, artifact);
                    self.phases.insert(artifact, RegionPhase::Active);
                }
                StoreEvent::BoundsChanged { id, start, end } => {
                    if echo == Some((id, start, end)) {
                        continue;
                    }
                    if let Some(artifact) = self.artifact_for(id) {
                        debug!(%id, start, end, "projecting corrected bounds");
                        surface.patch_region(artifact, RegionPatch::Bounds { start, end });
                    }
                }
                StoreEvent::SelectionChanged { id, selected } => {
                    if let Some(artifact) = self.artifact_for(id) {
                        if self.phases.get(&artifact) != Some(&RegionPhase::Editing) {
                            let phase = if selected {
                                RegionPhase::Selected
                            } else {
                                RegionPhase::Active
                            };
                            self.phases.insert(artifact, phase);
                        }
                    }
                    self.patch_appearance(surface, id);
                }
                StoreEvent::ColorChanged { id } => self.patch_appearance(surface, id),
                StoreEvent::PayloadChanged { .. } => {}
                StoreEvent::Removed { id } => {
                    self.cancel_tasks(id);
                    if let Some(artifact) = self.artifact_for(id) {
                        self.unindex(artifact, id);
                        surface.remove_region(artifact);
                    }
                }
                StoreEvent::Cleared => {
                    self.tasks.clear();
                    let artifacts: Vec<(ArtifactId, RegionId)> =
                        self.regions_by_artifact.drain().collect();
                    for (artifact, region) in artifacts {
                        self.artifacts_by_region.remove(&region);
                        self.phases.remove(&artifact);
                        surface.remove_region(artifact);
                    }
                }
            }
        }
    }
}
