//! Notification delivery.
//!
//! The gate decides; a [`Notifier`] delivers. Delivery is fire-and-forget
//! from the pipeline's perspective: a failed delivery is logged and the
//! cooldown stays consumed. Rendering the actual desktop toast is a
//! platform concern and lives behind this trait.

mod mqtt;

pub use mqtt::{MqttNotifier, MqttNotifierConfig};

use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;

use rand::Rng;

/// A notification request handed to a [`Notifier`].
#[derive(Clone, Debug, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    /// Optional inline image for renderers that support one.
    pub image_path: Option<PathBuf>,
    /// Correlates the notification with any action taken on it.
    pub correlation_id: u32,
}

impl Notification {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            image_path: None,
            // Matches the reference app's conversation id range.
            correlation_id: rand::thread_rng().gen_range(1..10_000),
        }
    }

    /// The product message: nag the user off their phone.
    pub fn phone_alert() -> Self {
        Self::new(
            "phone-sentinel",
            "Get off your phone! You are working.",
        )
    }

    pub fn with_image(mut self, path: PathBuf) -> Self {
        self.image_path = Some(path);
        self
    }
}

/// Delivery boundary for notifications.
pub trait Notifier: Send {
    fn notify(&mut self, notification: &Notification) -> Result<()>;
}

/// Notifier that writes to the structured log. The default when no
/// delivery transport is configured; also doubles as a visible trace in
/// demo runs.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&mut self, notification: &Notification) -> Result<()> {
        log::warn!(
            "NOTIFY [{}] {}: {}",
            notification.correlation_id,
            notification.title,
            notification.body
        );
        Ok(())
    }
}
