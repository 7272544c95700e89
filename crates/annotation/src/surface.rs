//! Rendering-surface collaborator: the waveform painter that owns pixel
//! geometry and region artifacts.

use crate::config::WaveformStyle;

/// Surface-side handle of a painted region.
pub type ArtifactId = u64;

/// Events emitted by the rendering surface.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    /// A drag-select gesture finished with provisional bounds.
    Created {
        artifact: ArtifactId,
        start: f64,
        end: f64,
    },
    /// A drag or resize of an existing region is in progress.
    Updating { artifact: ArtifactId },
    /// A drag or resize finished ("update-end").
    Updated {
        artifact: ArtifactId,
        start: f64,
        end: f64,
    },
    Removed { artifact: ArtifactId },
    HoverEnter { artifact: ArtifactId },
    HoverLeave { artifact: ArtifactId },
    Click { artifact: ArtifactId },
    DoubleClick { artifact: ArtifactId },
    Ready { duration: f64 },
    Play,
    Pause,
    Position { seconds: f64 },
}

/// Visual property change pushed to a region artifact.
#[derive(Debug, Clone, PartialEq)]
pub enum RegionPatch {
    Appearance { color: String, selected: bool },
    Bounds { start: f64, end: f64 },
}

/// Operations the engine needs from the rendering surface.
pub trait RenderingSurface {
    /// Starts loading `source`. The surface applies `style`, including the
    /// drag slop for region gestures.
    fn load(&mut self, source: &str, style: &WaveformStyle);

    fn set_zoom(&mut self, px_per_second: f64);

    fn set_volume(&mut self, volume: f64);

    fn set_speed(&mut self, speed: f64);

    fn seek_and_play(&mut self, position_seconds: f64);

    /// Paints a region the user did not draw (e.g. restored from a document).
    fn add_region(&mut self, start: f64, end: f64, color: &str) -> ArtifactId;

    fn patch_region(&mut self, artifact: ArtifactId, patch: RegionPatch);

    /// Drops an artifact whose creation was refused.
    fn discard_region(&mut self, artifact: ArtifactId);

    fn remove_region(&mut self, artifact: ArtifactId);
}

/// Call recorded by [`HeadlessSurface`].
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    Load { source: String, drag_slop_px: u32 },
    SetZoom(f64),
    SetVolume(f64),
    SetSpeed(f64),
    SeekAndPlay(f64),
    AddRegion {
        artifact: ArtifactId,
        start: f64,
        end: f64,
        color: String,
    },
    Patch {
        artifact: ArtifactId,
        patch: RegionPatch,
    },
    Discard(ArtifactId),
    Remove(ArtifactId),
}

/// Surface without a display that records every call it receives.
///
/// Artifacts it allocates start at `first_artifact` so they do not collide
/// with ids a caller assigns to simulated gestures.
#[derive(Debug, Clone, Default)]
pub struct HeadlessSurface {
    calls: Vec<SurfaceCall>,
    next_artifact: ArtifactId,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::with_first_artifact(1 << 32)
    }

    pub fn with_first_artifact(first_artifact: ArtifactId) -> Self {
        Self {
            calls: Vec::new(),
            next_artifact: first_artifact,
        }
    }

    pub fn calls(&self) -> &[SurfaceCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<SurfaceCall> {
        std::mem::take(&mut self.calls)
    }
}

impl RenderingSurface for HeadlessSurface {
    fn load(&mut self, source: &str, style: &WaveformStyle) {
        self.calls.push(SurfaceCall::Load {
            source: source.to_owned(),
            drag_slop_px: style.drag_slop_px,
        });
    }

    fn set_zoom(&mut self, px_per_second: f64) {
        self.calls.push(SurfaceCall::SetZoom(px_per_second));
    }

    fn set_volume(&mut self, volume: f64) {
        self.calls.push(SurfaceCall::SetVolume(volume));
    }

    fn set_speed(&mut self, speed: f64) {
        self.calls.push(SurfaceCall::SetSpeed(speed));
    }

    fn seek_and_play(&mut self, position_seconds: f64) {
        self.calls.push(SurfaceCall::SeekAndPlay(position_seconds));
    }

    fn add_region(&mut self, start: f64, end: f64, color: &str) -> ArtifactId {
        let artifact = self.next_artifact;
        self.next_artifact += 1;
        self.calls.push(SurfaceCall::AddRegion {
            artifact,
            start,
            end,
            color: color.to_owned(),
        });
        artifact
    }

    fn patch_region(&mut self, artifact: ArtifactId, patch: RegionPatch) {
        self.calls.push(SurfaceCall::Patch { artifact, patch });
    }

    fn discard_region(&mut self, artifact: ArtifactId) {
        self.calls.push(SurfaceCall::Discard(artifact));
    }

    fn remove_region(&mut self, artifact: ArtifactId) {
        self.calls.push(SurfaceCall::Remove(artifact));
    }
}
