//! sentineld - phone-sentinel daemon
//!
//! This daemon:
//! 1. Discovers the detection model (custom export archive, else TinyYOLO)
//! 2. Opens the configured webcam (or a synthetic stub source)
//! 3. Runs the capture → detect → filter → gate loop on one worker
//! 4. Delivers gated notifications via the configured transport
//! 5. Stops cleanly on SIGINT (in-flight inference completes first)

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use phone_sentinel::config::{NotifyMode, SentineldConfig};
use phone_sentinel::{
    BackendRegistry, CameraConfig, CameraSource, FilterConfig, GateConfig, LogNotifier,
    LogRenderer, Monitor, MqttNotifier, MqttNotifierConfig, NotificationGate, Notifier,
    StubBackend,
};

#[derive(Debug, Parser)]
#[command(name = "sentineld", about = "Webcam phone-detection daemon")]
struct Cli {
    /// Path to a JSON config file (overrides SENTINEL_CONFIG).
    #[arg(long)]
    config: Option<String>,

    /// Camera device override (e.g. /dev/video0, index://1, stub://desk).
    #[arg(long)]
    device: Option<String>,

    /// Process a single frame and exit (smoke test).
    #[arg(long)]
    once: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Some(path) = &cli.config {
        std::env::set_var("SENTINEL_CONFIG", path);
    }

    let mut cfg = SentineldConfig::load()?;
    if let Some(device) = cli.device {
        cfg.camera.device = device;
    }

    log::info!("sentineld {} starting", env!("CARGO_PKG_VERSION"));
    log::info!(
        "camera={} target_fps={} gate target='{}' cooldown={}s",
        cfg.camera.device,
        cfg.camera.target_fps,
        cfg.gate.target_label,
        cfg.gate.cooldown.as_secs()
    );

    let registry = build_registry(&cfg)?;

    let source = CameraSource::new(CameraConfig {
        device: cfg.camera.device.clone(),
        target_fps: cfg.camera.target_fps,
        width: cfg.camera.width,
        height: cfg.camera.height,
    })?;

    let gate = NotificationGate::new(GateConfig {
        target_label: cfg.gate.target_label.clone(),
        cooldown: cfg.gate.cooldown,
    });

    let notifier = build_notifier(&cfg)?;

    let mut monitor = Monitor::new(Box::new(source), registry, gate, notifier)
        .with_filter(FilterConfig {
            confidence_threshold: cfg.detection.confidence_threshold,
            max_boxes: cfg.detection.max_boxes,
        })
        .with_target_fps(cfg.camera.target_fps)
        .with_renderer(Box::new(LogRenderer));
    if let Some(image) = cfg.notify.image_path.clone() {
        monitor = monitor.with_alert_image(image);
    }

    if cli.once {
        let stats = monitor.run_once()?;
        log::info!(
            "single frame processed: {} notification(s)",
            stats.notifications_fired
        );
        return Ok(());
    }

    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_handler = cancel.clone();
    ctrlc::set_handler(move || {
        log::info!("shutdown requested");
        cancel_handler.store(true, Ordering::Relaxed);
    })
    .context("install SIGINT handler")?;

    let stats = monitor.run(&cancel)?;
    log::info!(
        "sentineld stopped: {} frames processed, {} skipped, {} notifications ({} delivery errors)",
        stats.frames_processed,
        stats.frames_skipped,
        stats.notifications_fired,
        stats.notifier_errors
    );
    Ok(())
}

/// Build the detector registry. With `backend-tract` enabled the model
/// is discovered on disk; otherwise (or when discovery fails on a stub
/// device) the scripted stub backend runs the pipeline.
#[cfg_attr(not(feature = "backend-tract"), allow(unused_variables))]
fn build_registry(cfg: &SentineldConfig) -> Result<BackendRegistry> {
    let mut registry = BackendRegistry::new();

    #[cfg(feature = "backend-tract")]
    {
        use phone_sentinel::{discover_model, ModelArtifact, TractBackend, YoloLayout};

        match discover_model(&cfg.models_dir) {
            Ok(artifact) => {
                let layout = match artifact.labels()? {
                    Some(labels) => YoloLayout::custom(labels),
                    None => YoloLayout::tiny_yolo_v2(),
                };
                let kind = match &artifact {
                    ModelArtifact::CustomVision { .. } => "custom export",
                    ModelArtifact::TinyYolo { .. } => "TinyYOLO v2",
                };
                let onnx = artifact.onnx_path()?;
                log::info!("loading {} model from {}", kind, onnx.display());
                registry.register(TractBackend::new(&onnx, layout)?);
                return Ok(registry);
            }
            Err(e) if cfg.camera.device.starts_with("stub://") => {
                log::warn!("model discovery failed ({}); using stub detector", e);
            }
            Err(e) => return Err(e),
        }
    }

    registry.register(StubBackend::new());
    log::info!("detector backends: {:?}", registry.list());
    Ok(registry)
}

fn build_notifier(cfg: &SentineldConfig) -> Result<Box<dyn Notifier>> {
    match cfg.notify.mode {
        NotifyMode::Log => Ok(Box::new(LogNotifier)),
        NotifyMode::Mqtt => {
            let notifier = MqttNotifier::connect(MqttNotifierConfig {
                broker: cfg.notify.mqtt_broker.clone(),
                topic: cfg.notify.mqtt_topic.clone(),
                client_id: "phone-sentinel".to_string(),
                allow_remote: cfg.notify.allow_remote,
            })?;
            Ok(Box::new(notifier))
        }
    }
}
