//! Playback and transport control: zoom, speed, volume and position.
//!
//! Setters are total. Out-of-range input is clamped, non-finite input keeps
//! the current value, and the rendering surface only ever receives values
//! that were stored in [`PlaybackState`].

use tracing::{debug, info, warn};

use crate::config::{PlaybackConfig, WaveformStyle};
use crate::session::PlaybackHandle;
use crate::surface::RenderingSurface;

/// Transport state owned by [`PlaybackController`].
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    pub position_seconds: f64,
    pub zoom_px_per_second: f64,
    pub speed_multiplier: f64,
    pub volume: f64,
    /// Known after the surface reports it is ready.
    pub duration_seconds: Option<f64>,
}

/// Transport change reported by the rendering surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEvent {
    Play,
    Pause,
}

/// External collaborator told about readiness and play/pause.
pub trait TransportObserver {
    /// Called once per loaded source, with a handle for later seek/play.
    fn on_ready(&mut self, handle: PlaybackHandle);

    /// Called for both play and pause.
    fn on_transport_change(&mut self, event: TransportEvent);
}

#[derive(Debug, Clone)]
pub struct PlaybackController {
    config: PlaybackConfig,
    state: PlaybackState,
    ready_notified: bool,
}

impl PlaybackController {
    pub fn new(config: PlaybackConfig) -> Self {
        let (zoom_min, zoom_max) = config.zoom_range();
        let state = PlaybackState {
            position_seconds: 0.0,
            zoom_px_per_second: config.default_zoom.clamp(zoom_min, zoom_max),
            speed_multiplier: if config.default_speed > 0.0 {
                config.default_speed
            } else {
                1.0
            },
            volume: config.default_volume.clamp(0.0, 1.0),
            duration_seconds: None,
        };
        Self {
            config,
            state,
            ready_notified: false,
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    /// Loads a new source and re-applies the current speed.
    pub fn load<S>(&mut self, surface: &mut S, source: &str, style: &WaveformStyle)
    where
        S: RenderingSurface + ?Sized,
    {
        surface.load(source, style);
        surface.set_speed(self.state.speed_multiplier);
        self.state.position_seconds = 0.0;
        self.state.duration_seconds = None;
        self.ready_notified = false;
        info!(source, "media source loaded");
    }

    /// Clamps to the configured zoom range. The surface is only called when
    /// the stored zoom changes. Returns the zoom now in effect.
    pub fn set_zoom<S>(&mut self, surface: &mut S, px_per_second: f64) -> f64
    where
        S: RenderingSurface + ?Sized,
    {
        if !px_per_second.is_finite() {
            debug!(px_per_second, "ignoring non-finite zoom");
            return self.state.zoom_px_per_second;
        }
        let (zoom_min, zoom_max) = self.config.zoom_range();
        let zoom = px_per_second.clamp(zoom_min, zoom_max);
        if zoom != self.state.zoom_px_per_second {
            surface.set_zoom(zoom);
            self.state.zoom_px_per_second = zoom;
            debug!(requested = px_per_second, zoom, "zoom changed");
        }
        zoom
    }

    pub fn zoom_in<S>(&mut self, surface: &mut S) -> f64
    where
        S: RenderingSurface + ?Sized,
    {
        let target = self.state.zoom_px_per_second + self.config.zoom_step;
        self.set_zoom(surface, target)
    }

    pub fn zoom_out<S>(&mut self, surface: &mut S) -> f64
    where
        S: RenderingSurface + ?Sized,
    {
        let target = self.state.zoom_px_per_second - self.config.zoom_step;
        self.set_zoom(surface, target)
    }

    /// Clamps to `[0, 1]`.
    pub fn set_volume<S>(&mut self, surface: &mut S, volume: f64) -> f64
    where
        S: RenderingSurface + ?Sized,
    {
        if !volume.is_finite() {
            debug!(volume, "ignoring non-finite volume");
            return self.state.volume;
        }
        let volume = volume.clamp(0.0, 1.0);
        surface.set_volume(volume);
        self.state.volume = volume;
        volume
    }

    /// Accepts any positive finite multiplier without clamping.
    pub fn set_speed<S>(&mut self, surface: &mut S, speed: f64) -> f64
    where
        S: RenderingSurface + ?Sized,
    {
        if !speed.is_finite() || speed <= 0.0 {
            warn!(speed, "ignoring non-positive playback speed");
            return self.state.speed_multiplier;
        }
        surface.set_speed(speed);
        self.state.speed_multiplier = speed;
        speed
    }

    /// Applies the speed menu entry for a 1-based `key`.
    pub fn select_speed_preset<S>(&mut self, surface: &mut S, key: usize) -> Option<f64>
    where
        S: RenderingSurface + ?Sized,
    {
        let speed = *self.config.speed_menu.get(key.checked_sub(1)?)?;
        Some(self.set_speed(surface, speed))
    }

    /// Seeks to `position_seconds`, clamped to the track, and starts playback.
    pub fn seek_and_play<S>(&mut self, surface: &mut S, position_seconds: f64) -> f64
    where
        S: RenderingSurface + ?Sized,
    {
        let position = if position_seconds.is_finite() {
            position_seconds.max(0.0)
        } else {
            0.0
        };
        let position = match self.state.duration_seconds {
            Some(duration) => position.min(duration),
            None => position,
        };
        surface.seek_and_play(position);
        self.state.position_seconds = position;
        debug!(position, "seek and play");
        position
    }

    /// Records the track duration and notifies `observer` on the first ready
    /// signal after a load.
    pub fn on_ready<O>(&mut self, duration: f64, observer: &mut O, handle: PlaybackHandle)
    where
        O: TransportObserver + ?Sized,
    {
        if duration.is_finite() && duration >= 0.0 {
            self.state.duration_seconds = Some(duration);
        }
        if self.ready_notified {
            debug!(duration, "repeated ready signal ignored");
            return;
        }
        self.ready_notified = true;
        info!(duration, "surface ready");
        observer.on_ready(handle);
    }

    pub fn on_transport<O>(&mut self, event: TransportEvent, observer: &mut O)
    where
        O: TransportObserver + ?Sized,
    {
        debug!(?event, position = self.state.position_seconds, "transport changed");
        observer.on_transport_change(event);
    }

    pub fn on_position(&mut self, seconds: f64) {
        if seconds.is_finite() {
            self.state.position_seconds = seconds.max(0.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PlaybackController, TransportEvent, TransportObserver};
    use crate::config::{PlaybackConfig, WaveformStyle};
    use crate::session::{Command, PlaybackHandle};
    use crate::surface::{HeadlessSurface, SurfaceCall};

    #[derive(Debug, Default)]
    struct RecordingObserver {
        ready: Vec<PlaybackHandle>,
        transport: Vec<TransportEvent>,
    }

    impl TransportObserver for RecordingObserver {
        fn on_ready(&mut self, handle: PlaybackHandle) {
            self.ready.push(handle);
        }

        fn on_transport_change(&mut self, event: TransportEvent) {
            self.transport.push(event);
        }
    }

    fn controller() -> PlaybackController {
        PlaybackController::new(PlaybackConfig::default())
    }

    #[test]
    fn set_zoom_clamps_to_canonical_bounds() {
        let mut surface = HeadlessSurface::new();
        let mut controller = controller();

        assert_eq!(controller.set_zoom(&mut surface, 1000.0), 700.0);
        assert_eq!(controller.set_zoom(&mut surface, -5.0), 200.0);
        assert_eq!(
            surface.calls(),
            &[SurfaceCall::SetZoom(700.0), SurfaceCall::SetZoom(200.0)]
        );
    }

    #[test]
    fn unchanged_zoom_does_not_reach_the_surface() {
        let mut surface = HeadlessSurface::new();
        let mut controller = controller();

        controller.set_zoom(&mut surface, 230.0);

        assert!(surface.calls().is_empty());
        assert_eq!(controller.state().zoom_px_per_second, 230.0);
    }

    #[test]
    fn zoom_steps_clamp_at_the_same_bounds() {
        let mut surface = HeadlessSurface::new();
        let mut controller = controller();

        assert_eq!(controller.zoom_in(&mut surface), 240.0);
        controller.set_zoom(&mut surface, 205.0);
        assert_eq!(controller.zoom_out(&mut surface), 200.0);
        controller.set_zoom(&mut surface, 695.0);
        assert_eq!(controller.zoom_in(&mut surface), 700.0);
    }

    #[test]
    fn volume_is_clamped_and_non_finite_is_ignored() {
        let mut surface = HeadlessSurface::new();
        let mut controller = controller();

        assert_eq!(controller.set_volume(&mut surface, 1.7), 1.0);
        assert_eq!(controller.set_volume(&mut surface, 0.3), 0.3);
        assert_eq!(controller.set_volume(&mut surface, f64::NAN), 0.3);
    }

    #[test]
    fn speed_is_permissive_but_rejects_non_positive() {
        let mut surface = HeadlessSurface::new();
        let mut controller = controller();

        assert_eq!(controller.set_speed(&mut surface, 3.7), 3.7);
        assert_eq!(controller.set_speed(&mut surface, 0.0), 3.7);
        assert_eq!(controller.select_speed_preset(&mut surface, 1), Some(0.5));
        assert_eq!(controller.select_speed_preset(&mut surface, 0), None);
        assert_eq!(controller.select_speed_preset(&mut surface, 6), None);
        assert_eq!(controller.state().speed_multiplier, 0.5);
    }

    #[test]
    fn load_reapplies_current_speed() {
        let mut surface = HeadlessSurface::new();
        let mut controller = controller();
        controller.set_speed(&mut surface, 1.5);
        surface.take_calls();

        let style = WaveformStyle {
            drag_slop_px: 8,
            ..WaveformStyle::default()
        };
        controller.load(&mut surface, "clip.wav", &style);

        assert_eq!(
            surface.calls(),
            &[
                SurfaceCall::Load {
                    source: "clip.wav".to_owned(),
                    drag_slop_px: 8,
                },
                SurfaceCall::SetSpeed(1.5)
            ]
        );
    }

    #[test]
    fn seek_is_clamped_to_known_duration() {
        let mut surface = HeadlessSurface::new();
        let mut observer = RecordingObserver::default();
        let (tx, _rx) = std::sync::mpsc::channel::<Command>();
        let mut controller = controller();
        controller.on_ready(12.0, &mut observer, PlaybackHandle::new(tx));

        assert_eq!(controller.seek_and_play(&mut surface, 30.0), 12.0);
        assert_eq!(controller.seek_and_play(&mut surface, -1.0), 0.0);
    }

    #[test]
    fn ready_is_forwarded_once_and_transport_events_share_one_channel() {
        let mut observer = RecordingObserver::default();
        let (tx, _rx) = std::sync::mpsc::channel::<Command>();
        let mut controller = controller();

        controller.on_ready(10.0, &mut observer, PlaybackHandle::new(tx.clone()));
        controller.on_ready(10.0, &mut observer, PlaybackHandle::new(tx));
        controller.on_transport(TransportEvent::Play, &mut observer);
        controller.on_transport(TransportEvent::Pause, &mut observer);

        assert_eq!(observer.ready.len(), 1);
        assert_eq!(
            observer.transport,
            vec![TransportEvent::Play, TransportEvent::Pause]
        );
    }
}
