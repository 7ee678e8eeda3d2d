//! The capture loop.
//!
//! One worker pulls frames sequentially from the source and feeds them
//! through detector → filter → gate, invoking the notifier when the gate
//! fires and handing the filtered set to the overlay renderer each tick.
//! Runs on a dedicated thread, distinct from any UI; the gate's state is
//! owned here and never shared.
//!
//! Collaborator failures never escape the loop (the gate is simply not
//! invoked when upstream fails): a camera hiccup skips the tick, a
//! detector error is logged and counted, a notifier error is logged and
//! the cooldown stays consumed. Cancellation is cooperative, checked
//! between frames; in-flight inference completes first.

use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::detect::{filter_detections, BackendRegistry, FilterConfig};
use crate::gate::{GateOutcome, NotificationGate};
use crate::ingest::FrameSource;
use crate::notify::{Notification, Notifier};
use crate::overlay::{plan_overlay, NullRenderer, OverlayRenderer};

const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);

/// Counters reported when the loop stops.
#[derive(Clone, Copy, Debug, Default)]
pub struct PipelineStats {
    pub frames_processed: u64,
    pub frames_skipped: u64,
    pub detector_errors: u64,
    pub notifications_fired: u64,
    pub notifier_errors: u64,
}

/// Capture → detect → gate → notify pipeline.
pub struct Monitor {
    source: Box<dyn FrameSource>,
    registry: BackendRegistry,
    filter: FilterConfig,
    gate: NotificationGate,
    notifier: Box<dyn Notifier>,
    renderer: Box<dyn OverlayRenderer>,
    /// Display surface dimensions for overlay planning. Defaults to the
    /// camera frame size (1:1 overlay).
    display: Option<(f64, f64)>,
    /// Inline image attached to fired notifications.
    alert_image: Option<std::path::PathBuf>,
    target_fps: u32,
    stats: PipelineStats,
}

impl Monitor {
    pub fn new(
        source: Box<dyn FrameSource>,
        registry: BackendRegistry,
        gate: NotificationGate,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        Self {
            source,
            registry,
            filter: FilterConfig::default(),
            gate,
            notifier,
            renderer: Box::new(NullRenderer),
            display: None,
            alert_image: None,
            target_fps: 10,
            stats: PipelineStats::default(),
        }
    }

    pub fn with_filter(mut self, filter: FilterConfig) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_renderer(mut self, renderer: Box<dyn OverlayRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_display(mut self, width: f64, height: f64) -> Self {
        self.display = Some((width, height));
        self
    }

    pub fn with_target_fps(mut self, fps: u32) -> Self {
        self.target_fps = fps.max(1);
        self
    }

    pub fn with_alert_image(mut self, path: std::path::PathBuf) -> Self {
        self.alert_image = Some(path);
        self
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    /// Run until the cancellation flag is set. Returns the final
    /// counters. The flag is checked between frames only.
    pub fn run(&mut self, cancel: &AtomicBool) -> Result<PipelineStats> {
        self.source.connect()?;
        let pace = Duration::from_millis(1000 / u64::from(self.target_fps.max(1)));
        let mut last_health_log = Instant::now();

        while !cancel.load(Ordering::Relaxed) {
            self.tick();

            if last_health_log.elapsed() >= HEALTH_LOG_INTERVAL {
                let stats = self.source.stats();
                log::info!(
                    "camera health={} frames={} device={}",
                    self.source.is_healthy(),
                    stats.frames_captured,
                    stats.device
                );
                last_health_log = Instant::now();
            }

            std::thread::sleep(pace);
        }

        log::info!(
            "capture loop stopped: {} frames, {} notifications",
            self.stats.frames_processed,
            self.stats.notifications_fired
        );
        Ok(self.stats)
    }

    /// Process a single frame (used by `--once` smoke runs and tests).
    pub fn run_once(&mut self) -> Result<PipelineStats> {
        self.source.connect()?;
        self.tick();
        Ok(self.stats)
    }

    fn tick(&mut self) {
        let frame = match self.source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                self.stats.frames_skipped += 1;
                return;
            }
            Err(e) => {
                log::warn!("frame capture failed: {}", e);
                self.stats.frames_skipped += 1;
                return;
            }
        };

        let raw = match self
            .registry
            .detect(frame.pixels(), frame.width, frame.height)
        {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("detection failed on frame {}: {}", frame.sequence, e);
                self.stats.detector_errors += 1;
                return;
            }
        };
        self.stats.frames_processed += 1;

        let filtered = filter_detections(raw, &self.filter);

        match self.gate.observe(&filtered, Instant::now()) {
            GateOutcome::Fired(detection) => {
                let mut notification = Notification::phone_alert();
                if let Some(image) = &self.alert_image {
                    notification = notification.with_image(image.clone());
                }
                log::info!(
                    "gate fired on frame {}: {} ({:.2}) correlation_id={}",
                    frame.sequence,
                    detection.label,
                    detection.confidence,
                    notification.correlation_id
                );
                self.stats.notifications_fired += 1;
                if let Err(e) = self.notifier.notify(&notification) {
                    // Fire-and-forget: the cooldown stays consumed.
                    log::warn!("notification delivery failed: {}", e);
                    self.stats.notifier_errors += 1;
                }
            }
            GateOutcome::Cooling { remaining } => {
                log::debug!(
                    "target seen on frame {} but cooling for {:.1}s more",
                    frame.sequence,
                    remaining.as_secs_f64()
                );
            }
            GateOutcome::NoMatch => {}
        }

        let (display_w, display_h) = self
            .display
            .unwrap_or((f64::from(frame.width), f64::from(frame.height)));
        let (model_w, model_h) = match self.registry.default_input_size() {
            Ok(size) => size,
            Err(_) => (frame.width, frame.height),
        };
        let boxes = plan_overlay(
            &filtered,
            display_w,
            display_h,
            f64::from(model_w),
            f64::from(model_h),
        );
        self.renderer.render(&boxes, display_w, display_h);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{BoundingBox, Detection, StubBackend};
    use crate::gate::GateConfig;
    use crate::ingest::{CameraConfig, CameraSource};
    use crate::overlay::OverlayBox;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Mutex};

    /// Notifier that records every delivery.
    struct RecordingNotifier {
        delivered: Arc<Mutex<Vec<Notification>>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&mut self, notification: &Notification) -> Result<()> {
            self.delivered.lock().unwrap().push(notification.clone());
            Ok(())
        }
    }

    /// Notifier that always fails delivery.
    struct FailingNotifier;

    impl Notifier for FailingNotifier {
        fn notify(&mut self, _notification: &Notification) -> Result<()> {
            anyhow::bail!("toast service unavailable")
        }
    }

    struct CountingRenderer {
        calls: Arc<AtomicUsize>,
        last_box_count: Arc<AtomicUsize>,
    }

    impl OverlayRenderer for CountingRenderer {
        fn render(&mut self, boxes: &[OverlayBox], _w: f64, _h: f64) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.last_box_count.store(boxes.len(), Ordering::SeqCst);
        }
    }

    fn stub_source() -> Box<dyn FrameSource> {
        Box::new(
            CameraSource::new(CameraConfig {
                device: "stub://test".to_string(),
                ..CameraConfig::default()
            })
            .unwrap(),
        )
    }

    fn phone_set() -> Vec<Detection> {
        vec![Detection::new(
            "phone",
            0.9,
            BoundingBox::new(10.0, 10.0, 40.0, 80.0),
        )]
    }

    fn monitor_with_script(
        script: Vec<Vec<Detection>>,
        notifier: Box<dyn Notifier>,
    ) -> Monitor {
        let mut registry = BackendRegistry::new();
        registry.register(StubBackend::new().with_script(script));
        Monitor::new(
            stub_source(),
            registry,
            NotificationGate::new(GateConfig::default()),
            notifier,
        )
    }

    #[test]
    fn phone_detection_fires_exactly_one_notification() {
        let delivered = Arc::new(Mutex::new(Vec::new()));
        let notifier = Box::new(RecordingNotifier {
            delivered: delivered.clone(),
        });
        // Three phone frames in a row: cooldown permits only the first.
        let mut monitor =
            monitor_with_script(vec![phone_set(), phone_set(), phone_set()], notifier);

        monitor.run_once().unwrap();
        monitor.tick();
        monitor.tick();

        let delivered = delivered.lock().unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].body, "Get off your phone! You are working.");
        assert_eq!(monitor.stats().notifications_fired, 1);
        assert_eq!(monitor.stats().frames_processed, 3);
    }

    #[test]
    fn non_target_detections_do_not_notify() {
        let delivered = Arc::new(Mutex::new(Vec::new()));
        let notifier = Box::new(RecordingNotifier {
            delivered: delivered.clone(),
        });
        let person = vec![Detection::new(
            "person",
            0.95,
            BoundingBox::new(0.0, 0.0, 100.0, 200.0),
        )];
        let mut monitor = monitor_with_script(vec![person.clone(), person], notifier);

        monitor.run_once().unwrap();
        monitor.tick();

        assert!(delivered.lock().unwrap().is_empty());
        assert_eq!(monitor.stats().notifications_fired, 0);
    }

    #[test]
    fn notifier_failure_is_contained_and_counted() {
        let mut monitor = monitor_with_script(vec![phone_set()], Box::new(FailingNotifier));

        monitor.run_once().unwrap();

        let stats = monitor.stats();
        assert_eq!(stats.notifications_fired, 1);
        assert_eq!(stats.notifier_errors, 1);
    }

    #[test]
    fn renderer_sees_filtered_boxes_every_tick() {
        let calls = Arc::new(AtomicUsize::new(0));
        let last_box_count = Arc::new(AtomicUsize::new(0));
        let renderer = Box::new(CountingRenderer {
            calls: calls.clone(),
            last_box_count: last_box_count.clone(),
        });

        let delivered = Arc::new(Mutex::new(Vec::new()));
        let mut monitor = monitor_with_script(
            vec![phone_set()],
            Box::new(RecordingNotifier { delivered }),
        )
        .with_renderer(renderer)
        .with_display(1280.0, 720.0);

        monitor.run_once().unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(last_box_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cancellation_stops_the_loop() {
        let delivered = Arc::new(Mutex::new(Vec::new()));
        let mut monitor = monitor_with_script(
            vec![],
            Box::new(RecordingNotifier { delivered }),
        );

        // Flag already set: the loop must exit without processing frames.
        let cancel = AtomicBool::new(true);
        let stats = monitor.run(&cancel).unwrap();
        assert_eq!(stats.frames_processed, 0);
    }

    #[test]
    fn below_threshold_phone_never_reaches_the_gate() {
        let delivered = Arc::new(Mutex::new(Vec::new()));
        let notifier = Box::new(RecordingNotifier {
            delivered: delivered.clone(),
        });
        let weak_phone = vec![Detection::new(
            "phone",
            0.3,
            BoundingBox::new(10.0, 10.0, 40.0, 80.0),
        )];
        let mut monitor = monitor_with_script(vec![weak_phone], notifier);

        monitor.run_once().unwrap();

        assert!(delivered.lock().unwrap().is_empty());
    }
}
