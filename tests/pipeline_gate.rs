//! End-to-end pipeline runs over the synthetic camera and scripted
//! detector, exercising the whole capture → detect → filter → gate →
//! notify path through the public API.

use anyhow::Result;
use std::sync::{Arc, Mutex};

use phone_sentinel::{
    BackendRegistry, BoundingBox, CameraConfig, CameraSource, Detection, GateConfig, Monitor,
    NotificationGate, Notifier, Notification, StubBackend,
};

#[derive(Default)]
struct RecordingNotifier {
    delivered: Arc<Mutex<Vec<Notification>>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&mut self, notification: &Notification) -> Result<()> {
        self.delivered.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

fn stub_source() -> CameraSource {
    CameraSource::new(CameraConfig {
        device: "stub://integration".to_string(),
        ..CameraConfig::default()
    })
    .expect("stub source")
}

fn phone(confidence: f32) -> Detection {
    Detection::new(
        "phone",
        confidence,
        BoundingBox::new(240.0, 280.0, 48.0, 88.0),
    )
}

#[test]
fn phone_frames_inside_cooldown_notify_once() {
    let delivered = Arc::new(Mutex::new(Vec::new()));
    let notifier = RecordingNotifier {
        delivered: delivered.clone(),
    };

    let mut registry = BackendRegistry::new();
    registry.register(StubBackend::new().with_script(vec![
        vec![phone(0.9)],
        vec![phone(0.85)],
        vec![phone(0.8)],
    ]));

    let mut monitor = Monitor::new(
        Box::new(stub_source()),
        registry,
        NotificationGate::new(GateConfig::default()),
        Box::new(notifier),
    );

    for _ in 0..3 {
        monitor.run_once().expect("tick");
    }

    let delivered = delivered.lock().unwrap();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].title, "phone-sentinel");
    assert!((1..10_000).contains(&delivered[0].correlation_id));

    let stats = monitor.stats();
    assert_eq!(stats.frames_processed, 3);
    assert_eq!(stats.notifications_fired, 1);
    assert_eq!(stats.notifier_errors, 0);
}

#[test]
fn short_cooldown_allows_second_notification() {
    let delivered = Arc::new(Mutex::new(Vec::new()));
    let notifier = RecordingNotifier {
        delivered: delivered.clone(),
    };

    let mut registry = BackendRegistry::new();
    registry.register(StubBackend::new().with_script(vec![vec![phone(0.9)], vec![phone(0.9)]]));

    let mut monitor = Monitor::new(
        Box::new(stub_source()),
        registry,
        NotificationGate::new(GateConfig {
            cooldown: std::time::Duration::from_millis(10),
            ..GateConfig::default()
        }),
        Box::new(notifier),
    );

    monitor.run_once().expect("tick");
    std::thread::sleep(std::time::Duration::from_millis(20));
    monitor.run_once().expect("tick");

    assert_eq!(delivered.lock().unwrap().len(), 2);
}

#[test]
fn sub_threshold_and_wrong_label_frames_stay_silent() {
    let delivered = Arc::new(Mutex::new(Vec::new()));
    let notifier = RecordingNotifier {
        delivered: delivered.clone(),
    };

    let mut registry = BackendRegistry::new();
    registry.register(StubBackend::new().with_script(vec![
        vec![phone(0.2)],
        vec![Detection::new(
            "person",
            0.95,
            BoundingBox::new(0.0, 0.0, 200.0, 400.0),
        )],
        vec![],
    ]));

    let mut monitor = Monitor::new(
        Box::new(stub_source()),
        registry,
        NotificationGate::new(GateConfig::default()),
        Box::new(notifier),
    );

    for _ in 0..3 {
        monitor.run_once().expect("tick");
    }

    assert!(delivered.lock().unwrap().is_empty());
    assert_eq!(monitor.stats().notifications_fired, 0);
}
