//! One annotation session: a loaded source, its regions and attributes, and
//! the transport, all driven from the caller's thread.

use std::sync::mpsc::{self, Receiver, Sender};

use tracing::{debug, info, warn};

use crate::attribute::AttributeSet;
use crate::bridge::{DeferredTask, EventBridge};
use crate::config::AnnotatorConfig;
use crate::controller::{PlaybackController, PlaybackState, TransportEvent, TransportObserver};
use crate::document::{AnnotationDocument, HydrationReport, ParsedDocument, StateEntry};
use crate::error::Result;
use crate::region::{LabelPayload, RegionAuthorizer, RegionId, RegionStore, StoreObserver};
use crate::surface::{RenderingSurface, SurfaceEvent};

/// Requests accepted by [`Session::handle_command`].
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Load { source: String },
    SetZoom { px_per_second: f64 },
    ZoomIn,
    ZoomOut,
    SetVolume { volume: f64 },
    SetSpeed { speed: f64 },
    /// 1-based index into the configured speed menu.
    SelectSpeedPreset { key: usize },
    SeekAndPlay { position: f64 },
    DeleteRegion { id: RegionId },
    ClearRegions,
    SetRegionColor { id: RegionId, color: String },
    Hotkey { key: String },
}

/// Clonable handle for driving playback from outside the session.
///
/// Commands sent through it are applied on the next [`Session::tick`].
#[derive(Debug, Clone)]
pub struct PlaybackHandle {
    commands: Sender<Command>,
}

impl PlaybackHandle {
    pub fn new(commands: Sender<Command>) -> Self {
        Self { commands }
    }

    /// Returns `false` once the session is gone.
    pub fn send(&self, command: Command) -> bool {
        self.commands.send(command).is_ok()
    }

    pub fn seek_and_play(&self, position: f64) -> bool {
        self.send(Command::SeekAndPlay { position })
    }
}

pub struct Session<P, S, A, O> {
    config: AnnotatorConfig,
    surface: S,
    bridge: EventBridge<P, A>,
    controller: PlaybackController,
    attributes: AttributeSet,
    observer: O,
    command_tx: Sender<Command>,
    command_rx: Receiver<Command>,
}

impl<P, S, A, O> Session<P, S, A, O>
where
    P: LabelPayload,
    S: RenderingSurface,
    A: RegionAuthorizer<P>,
    O: TransportObserver,
{
    pub fn new(config: AnnotatorConfig, surface: S, authorizer: A, observer: O) -> Self {
        let (command_tx, command_rx) = mpsc::channel();
        let store = RegionStore::new(config.palette.clone());
        Self {
            bridge: EventBridge::new(store, authorizer),
            controller: PlaybackController::new(config.playback.clone()),
            attributes: AttributeSet::new(),
            config,
            surface,
            observer,
            command_tx,
            command_rx,
        }
    }

    pub fn with_attributes(mut self, attributes: AttributeSet) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn handle(&self) -> PlaybackHandle {
        PlaybackHandle::new(self.command_tx.clone())
    }

    pub fn config(&self) -> &AnnotatorConfig {
        &self.config
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn store(&self) -> &RegionStore<P> {
        self.bridge.store()
    }

    pub fn bridge(&self) -> &EventBridge<P, A> {
        &self.bridge
    }

    pub fn playback(&self) -> &PlaybackState {
        self.controller.state()
    }

    pub fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut AttributeSet {
        &mut self.attributes
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// Registers a store observer (persistence, UI) for every later mutation.
    pub fn subscribe(&mut self, observer: Box<dyn StoreObserver>) {
        self.bridge.subscribe(observer);
    }

    /// Dispatches one event emitted by the rendering surface.
    pub fn handle_surface_event(&mut self, event: SurfaceEvent) {
        match event {
            SurfaceEvent::Ready { duration } => {
                self.bridge
                    .with_store(&mut self.surface, |store| store.set_duration(duration));
                let handle = self.handle();
                self.controller
                    .on_ready(duration, &mut self.observer, handle);
            }
            SurfaceEvent::Play => self
                .controller
                .on_transport(TransportEvent::Play, &mut self.observer),
            SurfaceEvent::Pause => self
                .controller
                .on_transport(TransportEvent::Pause, &mut self.observer),
            SurfaceEvent::Position { seconds } => self.controller.on_position(seconds),
            region_event => self
                .bridge
                .handle_region_event(&mut self.surface, &region_event),
        }
    }

    pub fn handle_command(&mut self, command: Command) -> Result<()> {
        debug!(?command, "handling command");
        let surface = &mut self.surface;
        match command {
            Command::Load { source } => {
                self.bridge.with_store(surface, |store| store.reset_duration());
                self.controller
                    .load(surface, &source, &self.config.waveform);
            }
            Command::SetZoom { px_per_second } => {
                self.controller.set_zoom(surface, px_per_second);
            }
            Command::ZoomIn => {
                self.controller.zoom_in(surface);
            }
            Command::ZoomOut => {
                self.controller.zoom_out(surface);
            }
            Command::SetVolume { volume } => {
                self.controller.set_volume(surface, volume);
            }
            Command::SetSpeed { speed } => {
                self.controller.set_speed(surface, speed);
            }
            Command::SelectSpeedPreset { key } => {
                if self.controller.select_speed_preset(surface, key).is_none() {
                    debug!(key, "no speed preset for key");
                }
            }
            Command::SeekAndPlay { position } => {
                self.controller.seek_and_play(surface, position);
            }
            Command::DeleteRegion { id } => {
                self.bridge.with_store(surface, |store| store.remove(id))?;
            }
            Command::ClearRegions => {
                self.bridge.with_store(surface, |store| store.clear());
            }
            Command::SetRegionColor { id, color } => {
                self.bridge
                    .with_store(surface, |store| store.set_color(id, color))?;
            }
            Command::Hotkey { key } => {
                if !self.attributes.on_hotkey(&key) {
                    debug!(key, "hotkey bound to no attribute");
                }
            }
        }
        Ok(())
    }

    /// Applies commands sent through [`PlaybackHandle`]s, then runs the
    /// deferred tasks queued before this call.
    pub fn tick(&mut self) {
        while let Ok(command) = self.command_rx.try_recv() {
            if let Err(error) = self.handle_command(command) {
                warn!(%error, "queued command failed");
            }
        }

        for task in self.bridge.take_due_tasks() {
            match task {
                DeferredTask::PlayFrom { region } => {
                    let Some(start) = self.bridge.store().get(region).map(|stored| stored.start())
                    else {
                        debug!(%region, "deferred play for removed region skipped");
                        continue;
                    };
                    self.controller.seek_and_play(&mut self.surface, start);
                }
            }
        }
    }

    /// Edits the label payload of one region. Observers see `PayloadChanged`.
    pub fn update_region_payload<R>(
        &mut self,
        id: RegionId,
        update: impl FnOnce(&mut P) -> R,
    ) -> Result<R> {
        self.bridge
            .with_store(&mut self.surface, |store| store.update_payload(id, update))
    }

    /// Serializes regions followed by attributes.
    pub fn export_document(&self) -> AnnotationDocument {
        let mut entries: Vec<StateEntry> = self.bridge.store().to_state_json();
        entries.extend(self.attributes.to_state_json());
        AnnotationDocument::new(entries)
    }

    /// Replaces regions and attribute values with the content of `json`.
    ///
    /// Fails only when the document as a whole is unreadable; individual bad
    /// entries are reported in the returned [`HydrationReport`].
    pub fn import_document(
        &mut self,
        json: &str,
        make_payload: impl FnMut(&StateEntry) -> P,
    ) -> Result<HydrationReport> {
        let parsed = AnnotationDocument::parse(json)?;
        Ok(self.import_parsed(&parsed, make_payload))
    }

    /// Replaces regions and attribute values with an already parsed document.
    pub fn import_parsed(
        &mut self,
        parsed: &ParsedDocument,
        make_payload: impl FnMut(&StateEntry) -> P,
    ) -> HydrationReport {
        let mut report = HydrationReport {
            restored: 0,
            skipped: parsed.skipped.clone(),
        };
        let regions = self.bridge.with_store(&mut self.surface, |store| {
            store.from_state_json(parsed.regions(), make_payload)
        });
        report.merge(regions);
        report.merge(self.attributes.from_state_json(parsed.attributes()));

        info!(
            restored = report.restored,
            skipped = report.skipped.len(),
            "annotation document imported"
        );
        report
    }
}
