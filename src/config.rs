use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_DEVICE: &str = "stub://desk_camera";
const DEFAULT_TARGET_FPS: u32 = 10;
const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;
const DEFAULT_MODELS_DIR: &str = "models";
const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;
const DEFAULT_MAX_BOXES: usize = 5;
const DEFAULT_TARGET_LABEL: &str = "phone";
const DEFAULT_COOLDOWN_SECS: u64 = 10;
const DEFAULT_MQTT_BROKER: &str = "127.0.0.1:1883";
const DEFAULT_MQTT_TOPIC: &str = "sentinel/notification";

#[derive(Debug, Deserialize, Default)]
struct SentineldConfigFile {
    models_dir: Option<PathBuf>,
    camera: Option<CameraConfigFile>,
    detection: Option<DetectionConfigFile>,
    gate: Option<GateConfigFile>,
    notify: Option<NotifyConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    device: Option<String>,
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectionConfigFile {
    confidence_threshold: Option<f32>,
    max_boxes: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct GateConfigFile {
    target_label: Option<String>,
    cooldown_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct NotifyConfigFile {
    mode: Option<String>,
    mqtt_broker: Option<String>,
    mqtt_topic: Option<String>,
    allow_remote: Option<bool>,
    image_path: Option<PathBuf>,
}

/// How notifications leave the daemon.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotifyMode {
    Log,
    Mqtt,
}

#[derive(Debug, Clone)]
pub struct SentineldConfig {
    pub models_dir: PathBuf,
    pub camera: CameraSettings,
    pub detection: DetectionSettings,
    pub gate: GateSettings,
    pub notify: NotifySettings,
}

#[derive(Debug, Clone)]
pub struct CameraSettings {
    pub device: String,
    pub target_fps: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct DetectionSettings {
    pub confidence_threshold: f32,
    pub max_boxes: usize,
}

#[derive(Debug, Clone)]
pub struct GateSettings {
    pub target_label: String,
    pub cooldown: Duration,
}

#[derive(Debug, Clone)]
pub struct NotifySettings {
    pub mode: NotifyMode,
    pub mqtt_broker: String,
    pub mqtt_topic: String,
    pub allow_remote: bool,
    pub image_path: Option<PathBuf>,
}

impl SentineldConfig {
    /// Load configuration: optional JSON file (`SENTINEL_CONFIG`), then
    /// env overrides, then validation.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("SENTINEL_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: SentineldConfigFile) -> Self {
        let camera = CameraSettings {
            device: file
                .camera
                .as_ref()
                .and_then(|c| c.device.clone())
                .unwrap_or_else(|| DEFAULT_DEVICE.to_string()),
            target_fps: file
                .camera
                .as_ref()
                .and_then(|c| c.target_fps)
                .unwrap_or(DEFAULT_TARGET_FPS),
            width: file
                .camera
                .as_ref()
                .and_then(|c| c.width)
                .unwrap_or(DEFAULT_WIDTH),
            height: file
                .camera
                .as_ref()
                .and_then(|c| c.height)
                .unwrap_or(DEFAULT_HEIGHT),
        };
        let detection = DetectionSettings {
            confidence_threshold: file
                .detection
                .as_ref()
                .and_then(|d| d.confidence_threshold)
                .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD),
            max_boxes: file
                .detection
                .as_ref()
                .and_then(|d| d.max_boxes)
                .unwrap_or(DEFAULT_MAX_BOXES),
        };
        let gate = GateSettings {
            target_label: file
                .gate
                .as_ref()
                .and_then(|g| g.target_label.clone())
                .unwrap_or_else(|| DEFAULT_TARGET_LABEL.to_string()),
            cooldown: Duration::from_secs(
                file.gate
                    .as_ref()
                    .and_then(|g| g.cooldown_secs)
                    .unwrap_or(DEFAULT_COOLDOWN_SECS),
            ),
        };
        let notify = NotifySettings {
            mode: match file.notify.as_ref().and_then(|n| n.mode.as_deref()) {
                Some("mqtt") => NotifyMode::Mqtt,
                _ => NotifyMode::Log,
            },
            mqtt_broker: file
                .notify
                .as_ref()
                .and_then(|n| n.mqtt_broker.clone())
                .unwrap_or_else(|| DEFAULT_MQTT_BROKER.to_string()),
            mqtt_topic: file
                .notify
                .as_ref()
                .and_then(|n| n.mqtt_topic.clone())
                .unwrap_or_else(|| DEFAULT_MQTT_TOPIC.to_string()),
            allow_remote: file
                .notify
                .as_ref()
                .and_then(|n| n.allow_remote)
                .unwrap_or(false),
            image_path: file.notify.and_then(|n| n.image_path),
        };
        Self {
            models_dir: file
                .models_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MODELS_DIR)),
            camera,
            detection,
            gate,
            notify,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(device) = std::env::var("SENTINEL_DEVICE") {
            if !device.trim().is_empty() {
                self.camera.device = device;
            }
        }
        if let Ok(dir) = std::env::var("SENTINEL_MODELS_DIR") {
            if !dir.trim().is_empty() {
                self.models_dir = PathBuf::from(dir);
            }
        }
        if let Ok(label) = std::env::var("SENTINEL_TARGET_LABEL") {
            if !label.trim().is_empty() {
                self.gate.target_label = label;
            }
        }
        if let Ok(cooldown) = std::env::var("SENTINEL_COOLDOWN_SECS") {
            let seconds: u64 = cooldown.parse().map_err(|_| {
                anyhow!("SENTINEL_COOLDOWN_SECS must be an integer number of seconds")
            })?;
            self.gate.cooldown = Duration::from_secs(seconds);
        }
        if let Ok(broker) = std::env::var("SENTINEL_MQTT_BROKER") {
            if !broker.trim().is_empty() {
                self.notify.mqtt_broker = broker;
                self.notify.mode = NotifyMode::Mqtt;
            }
        }
        if let Ok(topic) = std::env::var("SENTINEL_MQTT_TOPIC") {
            if !topic.trim().is_empty() {
                self.notify.mqtt_topic = topic;
            }
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        self.gate.target_label = self.gate.target_label.trim().to_lowercase();
        if self.gate.target_label.is_empty() {
            return Err(anyhow!("gate target_label must not be empty"));
        }
        if self.gate.cooldown.is_zero() {
            return Err(anyhow!("gate cooldown must be greater than zero"));
        }
        if !(self.detection.confidence_threshold > 0.0
            && self.detection.confidence_threshold <= 1.0)
        {
            return Err(anyhow!("detection confidence_threshold must be in (0, 1]"));
        }
        if self.detection.max_boxes == 0 {
            return Err(anyhow!("detection max_boxes must be at least 1"));
        }
        if self.camera.target_fps == 0 {
            return Err(anyhow!("camera target_fps must be greater than zero"));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(anyhow!("camera dimensions must be non-zero"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<SentineldConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_reference_pipeline() {
        let cfg = SentineldConfig::from_file(SentineldConfigFile::default());

        assert_eq!(cfg.gate.target_label, "phone");
        assert_eq!(cfg.gate.cooldown, Duration::from_secs(10));
        assert_eq!(cfg.detection.confidence_threshold, 0.5);
        assert_eq!(cfg.detection.max_boxes, 5);
        assert_eq!(cfg.camera.target_fps, 10);
        assert_eq!(cfg.notify.mode, NotifyMode::Log);
    }

    #[test]
    fn validation_rejects_zero_cooldown() {
        let mut cfg = SentineldConfig::from_file(SentineldConfigFile::default());
        cfg.gate.cooldown = Duration::ZERO;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validation_rejects_bad_threshold() {
        let mut cfg = SentineldConfig::from_file(SentineldConfigFile::default());
        cfg.detection.confidence_threshold = 1.5;
        assert!(cfg.validate().is_err());
        cfg.detection.confidence_threshold = 0.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validation_normalizes_target_label() {
        let mut cfg = SentineldConfig::from_file(SentineldConfigFile::default());
        cfg.gate.target_label = "  Phone ".to_string();
        cfg.validate().unwrap();
        assert_eq!(cfg.gate.target_label, "phone");
    }
}
