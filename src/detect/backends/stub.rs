use anyhow::Result;
use std::collections::VecDeque;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{BoundingBox, Detection};

/// Stub backend for tests and `stub://` demo runs.
///
/// With no script it simulates a desk scene: a person is always present,
/// and a phone enters the frame on every `phone_every`-th call. A script
/// (queue of detection sets) overrides the simulation until drained.
pub struct StubBackend {
    script: VecDeque<Vec<Detection>>,
    phone_every: u64,
    call_count: u64,
}

impl StubBackend {
    pub fn new() -> Self {
        Self {
            script: VecDeque::new(),
            phone_every: 25,
            call_count: 0,
        }
    }

    /// Queue exact detection sets to return, in order. Once the script
    /// drains, the backend falls back to the simulated scene.
    pub fn with_script(mut self, sets: Vec<Vec<Detection>>) -> Self {
        self.script = sets.into();
        self
    }

    /// Change how often the simulated phone appears (in calls).
    pub fn with_phone_every(mut self, calls: u64) -> Self {
        self.phone_every = calls.max(1);
        self
    }

    fn simulated_scene(&self) -> Vec<Detection> {
        let mut detections = vec![Detection::new(
            "person",
            0.92,
            BoundingBox::new(104.0, 48.0, 208.0, 336.0),
        )];
        if self.call_count % self.phone_every == 0 {
            detections.push(Detection::new(
                "phone",
                0.81,
                BoundingBox::new(240.0, 280.0, 48.0, 88.0),
            ));
        }
        detections
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn input_size(&self) -> (u32, u32) {
        (416, 416)
    }

    fn detect(&mut self, _pixels: &[u8], _width: u32, _height: u32) -> Result<Vec<Detection>> {
        self.call_count += 1;
        if let Some(set) = self.script.pop_front() {
            return Ok(set);
        }
        Ok(self.simulated_scene())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_sets_are_returned_in_order() {
        let mut backend = StubBackend::new().with_script(vec![
            vec![Detection::new("phone", 0.9, BoundingBox::default())],
            vec![],
        ]);

        let first = backend.detect(&[], 416, 416).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].label, "phone");

        let second = backend.detect(&[], 416, 416).unwrap();
        assert!(second.is_empty());
    }

    #[test]
    fn simulation_emits_phone_periodically() {
        let mut backend = StubBackend::new().with_phone_every(3);

        let mut phone_calls = vec![];
        for call in 1..=6u64 {
            let set = backend.detect(&[], 416, 416).unwrap();
            if set.iter().any(|d| d.label == "phone") {
                phone_calls.push(call);
            }
        }
        assert_eq!(phone_calls, vec![3, 6]);
    }
}
