use anyhow::Result;

use crate::detect::result::Detection;

/// Detector backend trait.
///
/// Implementations receive raw RGB24 pixels and return raw (unfiltered)
/// detections in model input coordinate space. Thresholding, non-max
/// suppression and count capping happen downstream in
/// [`filter_detections`](crate::detect::filter_detections), so backends
/// report everything they score.
///
/// Implementations must treat the pixel slice as read-only and ephemeral:
/// no storing it beyond the `detect` call, no disk writes, no network I/O.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Model input dimensions (width, height). Frames are resized to this
    /// before inference; detection coordinates are expressed in it.
    fn input_size(&self) -> (u32, u32);

    /// Run detection on a frame.
    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<Detection>>;

    /// Optional warm-up hook (e.g. first-inference allocation).
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
