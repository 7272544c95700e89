//! Region synchronization and annotation state engine for audio labeling.

pub mod attribute;
pub mod bridge;
pub mod config;
pub mod controller;
pub mod document;
pub mod error;
pub mod label;
pub mod region;
pub mod ruler;
pub mod session;
pub mod surface;

pub use attribute::{AttributeSet, IconSize, RATING_TYPE, RatingAttribute, RatingConfig, RatingIcon};
pub use bridge::{DeferredTask, EventBridge, RegionPhase};
pub use config::{AnnotatorConfig, Palette, PlaybackConfig, RulerStyle, WaveformStyle};
pub use controller::{PlaybackController, PlaybackState, TransportEvent, TransportObserver};
pub use document::{AnnotationDocument, HydrationReport, ParsedDocument, SkippedEntry, StateEntry};
pub use error::{AnnotationError, Result};
pub use label::OpaqueLabel;
pub use region::{
    LabelPayload, ProvisionalBounds, Region, RegionAuthorizer, RegionDraft, RegionId,
    RegionStore, StoreEvent, StoreObserver, normalize_bounds,
};
pub use ruler::{NotchKind, RulerNotch, format_label, notch_interval_seconds, notches};
pub use session::{Command, PlaybackHandle, Session};
pub use surface::{
    ArtifactId, HeadlessSurface, RegionPatch, RenderingSurface, SurfaceCall, SurfaceEvent,
};
