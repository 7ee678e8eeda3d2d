//! Captured frame type.
//!
//! Frames are immutable once constructed: the ingest layer builds them,
//! everything downstream borrows them. Pixel data is packed RGB24
//! (`width * height * 3` bytes).

use std::time::{Duration, Instant};

/// One captured image from the camera at a point in time.
///
/// Constructed only by the ingest layer. Downstream consumers (detector,
/// overlay planner) receive `&Frame` and never mutate it.
pub struct Frame {
    /// Private pixel data; exposed read-only via `pixels()`.
    data: Vec<u8>,

    /// Frame dimensions.
    pub width: u32,
    pub height: u32,

    /// Position of this frame in the capture sequence, starting at 1.
    pub sequence: u64,

    /// Monotonic capture instant.
    captured_at: Instant,
}

impl Frame {
    /// Create a new frame. Called only by the ingest layer, which is
    /// responsible for handing over a correctly sized RGB24 buffer.
    pub(crate) fn new(data: Vec<u8>, width: u32, height: u32, sequence: u64) -> Self {
        debug_assert_eq!(
            data.len(),
            width as usize * height as usize * 3,
            "frame buffer must be packed RGB24"
        );
        Self {
            data,
            width,
            height,
            sequence,
            captured_at: Instant::now(),
        }
    }

    /// Read-only view of the RGB24 pixel buffer.
    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    /// Raw byte length (for memory accounting in logs).
    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    /// Monotonic capture instant of this frame.
    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }

    /// Time elapsed since capture.
    pub fn age(&self) -> Duration {
        self.captured_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_exposes_pixels_and_metadata() {
        let data = vec![7u8; 4 * 2 * 3];
        let frame = Frame::new(data, 4, 2, 1);

        assert_eq!(frame.width, 4);
        assert_eq!(frame.height, 2);
        assert_eq!(frame.sequence, 1);
        assert_eq!(frame.byte_len(), 24);
        assert!(frame.pixels().iter().all(|&p| p == 7));
    }

    #[test]
    fn frame_age_is_monotonic() {
        let frame = Frame::new(vec![0u8; 3], 1, 1, 1);
        let first = frame.age();
        let second = frame.age();
        assert!(second >= first);
    }
}
