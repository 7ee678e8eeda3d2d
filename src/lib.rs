//! phone-sentinel
//!
//! This crate implements a desk-monitoring pipeline: webcam frames run
//! through an object-detection model, and a cooldown-gated notification
//! fires when a phone shows up while you are supposed to be working.
//!
//! # Architecture
//!
//! Components, leaf-first:
//!
//! - `frame`: immutable captured frames
//! - `ingest`: frame sources (V4L2 webcam, synthetic stub)
//! - `detect`: detector backends (tract ONNX, stub), post-filter
//!   (threshold + NMS + cap), model discovery
//! - `gate`: the cooldown notification gate (the core state machine)
//! - `notify`: notification delivery (log, MQTT)
//! - `overlay`: display-space box planning for a GUI shell
//! - `pipeline`: the single-worker capture loop wiring it all together
//! - `config`: sentineld configuration (JSON file + env overrides)
//!
//! The gate owns the only mutable shared-over-time state (the cooldown
//! timestamp) and lives on the capture-loop thread; GUI and toast
//! surfaces stay behind the `OverlayRenderer` and `Notifier` traits.

pub mod config;
pub mod detect;
pub mod frame;
pub mod gate;
pub mod ingest;
pub mod notify;
pub mod overlay;
pub mod pipeline;

pub use detect::{
    discover_model, filter_detections, BackendRegistry, BoundingBox, Detection, DetectorBackend,
    FilterConfig, FilteredDetections, ModelArtifact, StubBackend,
};
#[cfg(feature = "backend-tract")]
pub use detect::{TractBackend, YoloLayout};
pub use frame::Frame;
pub use gate::{GateConfig, GateOutcome, GateState, NotificationGate};
pub use ingest::{CameraConfig, CameraSource, FrameSource, SourceStats};
pub use notify::{LogNotifier, MqttNotifier, MqttNotifierConfig, Notification, Notifier};
pub use overlay::{plan_overlay, LogRenderer, NullRenderer, OverlayBox, OverlayRenderer, Rgb};
pub use pipeline::{Monitor, PipelineStats};
