//! MQTT notification transport.
//!
//! Publishes notification JSON to a broker topic with QoS 1, for setups
//! where a home-automation bus renders the actual alert. The broker must
//! be loopback unless remote delivery is explicitly allowed.

use anyhow::{anyhow, Context, Result};
use rumqttc::v5::{mqttbytes::QoS, Client, Connection, Event, MqttOptions};
use std::time::Duration;

use super::{Notification, Notifier};

const PAYLOAD_ONLINE: &str = "online";
const PAYLOAD_OFFLINE: &str = "offline";

/// Settings for the MQTT notifier.
#[derive(Clone, Debug)]
pub struct MqttNotifierConfig {
    /// Broker address as `host:port`.
    pub broker: String,
    /// Topic notifications are published to.
    pub topic: String,
    /// MQTT client id.
    pub client_id: String,
    /// Permit non-loopback brokers.
    pub allow_remote: bool,
}

impl Default for MqttNotifierConfig {
    fn default() -> Self {
        Self {
            broker: "127.0.0.1:1883".to_string(),
            topic: "sentinel/notification".to_string(),
            client_id: "phone-sentinel".to_string(),
            allow_remote: false,
        }
    }
}

struct MqttEndpoint {
    host: String,
    port: u16,
}

fn parse_endpoint(broker: &str) -> Result<MqttEndpoint> {
    let (host, port) = broker
        .rsplit_once(':')
        .ok_or_else(|| anyhow!("MQTT broker must be host:port, got '{}'", broker))?;
    if host.is_empty() {
        return Err(anyhow!("MQTT broker host is empty in '{}'", broker));
    }
    let port: u16 = port
        .parse()
        .map_err(|_| anyhow!("invalid MQTT broker port in '{}'", broker))?;
    Ok(MqttEndpoint {
        host: host.to_string(),
        port,
    })
}

fn validate_loopback(endpoint: &MqttEndpoint, broker: &str) -> Result<()> {
    let loopback = matches!(endpoint.host.as_str(), "127.0.0.1" | "localhost" | "::1");
    if !loopback {
        return Err(anyhow!(
            "MQTT broker {} is not loopback; set allow_remote to permit it",
            broker
        ));
    }
    Ok(())
}

/// QoS-1 MQTT notifier. Owns the sync client plus a connection poll
/// thread; the thread exits when the client is dropped.
pub struct MqttNotifier {
    client: Client,
    topic: String,
    connection_handle: Option<std::thread::JoinHandle<()>>,
}

impl MqttNotifier {
    pub fn connect(config: MqttNotifierConfig) -> Result<Self> {
        let endpoint = parse_endpoint(&config.broker)?;
        if !config.allow_remote {
            validate_loopback(&endpoint, &config.broker)?;
        }

        let status_topic = format!("{}/status", config.topic);
        let mut options = MqttOptions::new(&config.client_id, &endpoint.host, endpoint.port);
        options.set_keep_alive(Duration::from_secs(60));
        options.set_clean_start(true);
        let will = rumqttc::v5::mqttbytes::v5::LastWill::new(
            status_topic.clone(),
            PAYLOAD_OFFLINE.as_bytes().to_vec(),
            QoS::AtLeastOnce,
            true,
            None,
        );
        options.set_last_will(will);

        let (client, connection) = Client::new(options, 10);
        let connection_handle = Some(spawn_poll_thread(connection));

        client
            .publish(
                status_topic,
                QoS::AtLeastOnce,
                true,
                PAYLOAD_ONLINE.as_bytes().to_vec(),
            )
            .context("publish online status")?;
        log::info!("MQTT notifier connected to {}", config.broker);

        Ok(Self {
            client,
            topic: config.topic,
            connection_handle,
        })
    }
}

fn spawn_poll_thread(mut connection: Connection) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        for event in connection.iter() {
            match event {
                Ok(Event::Incoming(_)) | Ok(Event::Outgoing(_)) => {}
                Err(e) => {
                    log::warn!("MQTT connection error: {}", e);
                    break;
                }
            }
        }
    })
}

impl Notifier for MqttNotifier {
    fn notify(&mut self, notification: &Notification) -> Result<()> {
        let payload = serde_json::to_vec(notification).context("serialize notification")?;
        self.client
            .publish(self.topic.clone(), QoS::AtLeastOnce, false, payload)
            .context("publish notification")?;
        Ok(())
    }
}

impl Drop for MqttNotifier {
    fn drop(&mut self) {
        let _ = self.client.disconnect();
        if let Some(handle) = self.connection_handle.take() {
            let _ = handle.join();
        }
    }
}
