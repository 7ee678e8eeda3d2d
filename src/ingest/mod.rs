//! Frame ingestion sources.
//!
//! One source in this daemon: the local webcam (`CameraSource`), with a
//! synthetic `stub://` backend that is always compiled so the pipeline
//! runs without hardware. The V4L2 device backend is feature-gated
//! (`ingest-v4l2`).
//!
//! The ingestion layer is responsible for:
//! - Opening and releasing the device (release happens on drop)
//! - Capturing RGB24 frames in-memory at the target rate
//! - Stamping frames with capture instant and sequence number
//!
//! A transiently unavailable device yields `Ok(None)` from `next_frame`,
//! never an error: the capture loop skips the tick and retries.

mod camera;

pub use camera::{CameraConfig, CameraSource, SourceStats};

use anyhow::Result;

use crate::frame::Frame;

/// A sequence of frames pulled on demand by the capture loop.
pub trait FrameSource: Send {
    /// Open the underlying device. Must be called before `next_frame`.
    fn connect(&mut self) -> Result<()>;

    /// Capture the next frame. `Ok(None)` means the source is
    /// transiently unavailable (not an error).
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Whether the source is producing frames at a healthy rate.
    fn is_healthy(&self) -> bool;

    /// Capture statistics for health logging.
    fn stats(&self) -> SourceStats;
}
