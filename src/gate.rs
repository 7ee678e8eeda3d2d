//! Notification gate.
//!
//! The one piece of real control logic in the daemon: given each filtered
//! detection set, decide whether a notification may fire, enforcing a
//! minimum interval between notifications. Two states: `Ready` (may fire
//! on a target match) and `Cooling` (matches are observed but do not
//! fire). The gate owns its cooldown state exclusively; nothing else
//! mutates it.
//!
//! Timestamps are supplied by the caller, so tests drive the state
//! machine with synthetic instants instead of sleeping.

use std::time::{Duration, Instant};

use crate::detect::{Detection, FilteredDetections};

/// Gate parameters, fixed at construction.
#[derive(Clone, Debug)]
pub struct GateConfig {
    /// Label that triggers notifications (compared exactly).
    pub target_label: String,
    /// Minimum interval between notifications.
    pub cooldown: Duration,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            target_label: "phone".to_string(),
            cooldown: Duration::from_secs(10),
        }
    }
}

/// Observable gate state at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateState {
    Ready,
    Cooling { remaining: Duration },
}

/// Outcome of feeding one detection set through the gate.
#[derive(Clone, Debug)]
pub enum GateOutcome {
    /// A target match fired; carries the winning detection. At most one
    /// notification fires per invocation.
    Fired(Detection),
    /// A target match was observed but the cooldown has not elapsed.
    Cooling { remaining: Duration },
    /// No valid target match in the set.
    NoMatch,
}

impl GateOutcome {
    pub fn fired(&self) -> bool {
        matches!(self, GateOutcome::Fired(_))
    }
}

/// Cooldown-gated notification decision state machine.
pub struct NotificationGate {
    config: GateConfig,
    /// Instant of the last fired notification. `None` means never fired,
    /// which makes the first match fire immediately.
    last_fired_at: Option<Instant>,
}

impl NotificationGate {
    pub fn new(config: GateConfig) -> Self {
        Self {
            config,
            last_fired_at: None,
        }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Gate state as of `now`.
    pub fn state(&self, now: Instant) -> GateState {
        match self.remaining_cooldown(now) {
            None => GateState::Ready,
            Some(remaining) => GateState::Cooling { remaining },
        }
    }

    /// Feed one detection set through the gate.
    ///
    /// Scans for detections whose label equals the target; among multiple
    /// matches the highest-confidence one wins, making the outcome
    /// independent of detector iteration order. Malformed entries (empty
    /// label, negative or non-finite confidence) are treated as no match,
    /// never as errors.
    ///
    /// Fires only when a match exists and the cooldown has elapsed (or
    /// the gate has never fired). Firing resets the cooldown to `now`;
    /// any other outcome leaves state untouched.
    pub fn observe(&mut self, detections: &FilteredDetections, now: Instant) -> GateOutcome {
        let best_match = detections
            .iter()
            .filter(|d| self.is_target_match(d))
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence));

        let Some(detection) = best_match else {
            return GateOutcome::NoMatch;
        };

        if let Some(remaining) = self.remaining_cooldown(now) {
            return GateOutcome::Cooling { remaining };
        }

        self.last_fired_at = Some(now);
        GateOutcome::Fired(detection.clone())
    }

    fn is_target_match(&self, detection: &Detection) -> bool {
        !detection.label.is_empty()
            && detection.confidence.is_finite()
            && detection.confidence >= 0.0
            && detection.label == self.config.target_label
    }

    fn remaining_cooldown(&self, now: Instant) -> Option<Duration> {
        let last = self.last_fired_at?;
        // saturating_duration_since clamps a `now` before `last` to zero
        // elapsed, keeping the state monotone.
        let elapsed = now.saturating_duration_since(last);
        let remaining = self.config.cooldown.checked_sub(elapsed)?;
        if remaining.is_zero() {
            None
        } else {
            Some(remaining)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{BoundingBox, FilteredDetections};

    fn set(entries: &[(&str, f32)]) -> FilteredDetections {
        FilteredDetections::from_vec(
            entries
                .iter()
                .map(|(label, conf)| Detection::new(*label, *conf, BoundingBox::default()))
                .collect(),
        )
    }

    fn gate() -> NotificationGate {
        NotificationGate::new(GateConfig::default())
    }

    #[test]
    fn no_match_never_fires_and_never_mutates_state() {
        let mut gate = gate();
        let t0 = Instant::now();

        let outcome = gate.observe(&set(&[("person", 0.9)]), t0);
        assert!(matches!(outcome, GateOutcome::NoMatch));
        assert_eq!(gate.state(t0), GateState::Ready);

        // Fire once, then feed a no-match set: cooldown must be untouched.
        assert!(gate.observe(&set(&[("phone", 0.8)]), t0).fired());
        let outcome = gate.observe(&set(&[("person", 0.9)]), t0 + Duration::from_secs(5));
        assert!(matches!(outcome, GateOutcome::NoMatch));
        assert!(gate
            .observe(&set(&[("phone", 0.8)]), t0 + Duration::from_secs(10))
            .fired());
    }

    #[test]
    fn empty_set_is_no_match() {
        let mut gate = gate();
        assert!(matches!(
            gate.observe(&FilteredDetections::empty(), Instant::now()),
            GateOutcome::NoMatch
        ));
    }

    #[test]
    fn first_match_fires_immediately() {
        let mut gate = gate();
        let t0 = Instant::now();

        assert_eq!(gate.state(t0), GateState::Ready);
        let outcome = gate.observe(&set(&[("phone", 0.7)]), t0);
        match outcome {
            GateOutcome::Fired(d) => assert_eq!(d.label, "phone"),
            other => panic!("expected fire, got {:?}", other),
        }
    }

    #[test]
    fn matches_inside_cooldown_do_not_fire() {
        let mut gate = gate();
        let t0 = Instant::now();

        assert!(gate.observe(&set(&[("phone", 0.7)]), t0).fired());
        let outcome = gate.observe(&set(&[("phone", 0.7)]), t0 + Duration::from_secs(5));
        match outcome {
            GateOutcome::Cooling { remaining } => {
                assert_eq!(remaining, Duration::from_secs(5));
            }
            other => panic!("expected cooling, got {:?}", other),
        }
    }

    #[test]
    fn fire_cool_fire_across_the_cooldown_window() {
        // cooldown 10s, constructed ready; fire at t=1, cool at t=5, fire at t=12
        let mut gate = gate();
        let t0 = Instant::now();
        let phone = set(&[("phone", 0.8)]);

        assert!(gate.observe(&phone, t0 + Duration::from_secs(1)).fired());
        assert!(!gate.observe(&phone, t0 + Duration::from_secs(5)).fired());
        assert!(gate.observe(&phone, t0 + Duration::from_secs(12)).fired());
        // last_fired_at is now t=12: t=13 still cools
        assert!(!gate.observe(&phone, t0 + Duration::from_secs(13)).fired());
    }

    #[test]
    fn repeated_calls_at_identical_timestamp_fire_at_most_once() {
        let mut gate = gate();
        let t0 = Instant::now();
        let phone = set(&[("phone", 0.8)]);

        assert!(gate.observe(&phone, t0).fired());
        for _ in 0..10 {
            assert!(!gate.observe(&phone, t0).fired());
        }
    }

    #[test]
    fn boundary_elapsed_exactly_cooldown_fires() {
        let mut gate = gate();
        let t0 = Instant::now();
        let phone = set(&[("phone", 0.8)]);

        assert!(gate.observe(&phone, t0).fired());
        assert!(gate.observe(&phone, t0 + Duration::from_secs(10)).fired());
    }

    #[test]
    fn highest_confidence_match_wins() {
        let mut gate = gate();
        let detections = set(&[("phone", 0.55), ("person", 0.99), ("phone", 0.91)]);

        match gate.observe(&detections, Instant::now()) {
            GateOutcome::Fired(d) => assert_eq!(d.confidence, 0.91),
            other => panic!("expected fire, got {:?}", other),
        }
    }

    #[test]
    fn only_one_notification_per_invocation() {
        let mut gate = gate();
        let detections = set(&[("phone", 0.9), ("phone", 0.8), ("phone", 0.7)]);

        assert!(gate.observe(&detections, Instant::now()).fired());
        // The same set right away must not fire again.
        assert!(!gate.observe(&detections, Instant::now()).fired());
    }

    #[test]
    fn malformed_detections_are_no_match() {
        let mut gate = gate();
        let now = Instant::now();

        assert!(!gate.observe(&set(&[("", 0.9)]), now).fired());
        assert!(!gate.observe(&set(&[("phone", -0.5)]), now).fired());
        assert!(!gate.observe(&set(&[("phone", f32::NAN)]), now).fired());
        // State stayed ready throughout
        assert_eq!(gate.state(now), GateState::Ready);
    }

    #[test]
    fn time_running_backwards_does_not_reopen_gate() {
        let mut gate = gate();
        let t0 = Instant::now() + Duration::from_secs(100);
        let phone = set(&[("phone", 0.8)]);

        assert!(gate.observe(&phone, t0).fired());
        // A now before last_fired_at counts as zero elapsed
        assert!(!gate.observe(&phone, t0 - Duration::from_secs(50)).fired());
    }

    #[test]
    fn state_reports_remaining_cooldown() {
        let mut gate = gate();
        let t0 = Instant::now();
        assert!(gate.observe(&set(&[("phone", 0.8)]), t0).fired());

        match gate.state(t0 + Duration::from_secs(3)) {
            GateState::Cooling { remaining } => assert_eq!(remaining, Duration::from_secs(7)),
            GateState::Ready => panic!("expected cooling"),
        }
        assert_eq!(gate.state(t0 + Duration::from_secs(10)), GateState::Ready);
    }

    #[test]
    fn custom_target_label_is_honored() {
        let mut gate = NotificationGate::new(GateConfig {
            target_label: "laptop".to_string(),
            cooldown: Duration::from_secs(10),
        });
        let now = Instant::now();

        assert!(!gate.observe(&set(&[("phone", 0.9)]), now).fired());
        assert!(gate.observe(&set(&[("laptop", 0.6)]), now).fired());
    }
}
