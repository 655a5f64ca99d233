//! Alert sinks.
//!
//! A sink receives one alert string per call. Delivery failures are returned
//! to the caller, which logs and counts them; a sink never sees more than one
//! alert at a time and never learns about its siblings.

use async_trait::async_trait;
use chrono::Local;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::error::{ConfigError, SinkError};

/// Timeout applied to every HTTP delivery.
pub const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Display name used by chat sinks when none is configured.
pub const DEFAULT_BOT_NAME: &str = "SystemMonitor";

#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    async fn deliver(&self, alert: &str) -> Result<(), SinkError>;
}

/// Writes each alert as a line on stdout.
#[derive(Debug, Default)]
pub struct PrintSink;

#[async_trait]
impl AlertSink for PrintSink {
    fn name(&self) -> &str {
        "print"
    }

    async fn deliver(&self, alert: &str) -> Result<(), SinkError> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "{}", alert)?;
        Ok(())
    }
}

/// Emits each alert as a `warn!` event, stripped to ASCII.
#[derive(Debug, Default)]
pub struct LogSink;

impl LogSink {
    pub fn sanitize(alert: &str) -> String {
        alert.chars().filter(char::is_ascii).collect()
    }
}

#[async_trait]
impl AlertSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn deliver(&self, alert: &str) -> Result<(), SinkError> {
        warn!(target: "herakles_sysmon::alert", "{}", Self::sanitize(alert));
        Ok(())
    }
}

/// POSTs `{"alert", "timestamp"}` to a generic webhook.
pub struct WebhookSink {
    url: String,
    client: Client,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>, client: Client) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }

    pub fn payload(&self, alert: &str) -> Value {
        json!({
            "alert": alert,
            "timestamp": Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
        })
    }
}

#[async_trait]
impl AlertSink for WebhookSink {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn deliver(&self, alert: &str) -> Result<(), SinkError> {
        post_json(&self.client, &self.url, &self.payload(alert)).await
    }
}

/// Posts to a Slack incoming webhook.
pub struct SlackSink {
    webhook_url: String,
    username: String,
    channel: Option<String>,
    client: Client,
}

impl SlackSink {
    pub fn new(
        webhook_url: impl Into<String>,
        username: impl Into<String>,
        channel: Option<String>,
        client: Client,
    ) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            username: username.into(),
            channel,
            client,
        }
    }

    pub fn payload(&self, alert: &str) -> Value {
        let mut payload = json!({
            "text": alert,
            "username": self.username,
        });
        if let Some(channel) = &self.channel {
            payload["channel"] = Value::String(channel.clone());
        }
        payload
    }
}

#[async_trait]
impl AlertSink for SlackSink {
    fn name(&self) -> &str {
        "slack"
    }

    async fn deliver(&self, alert: &str) -> Result<(), SinkError> {
        post_json(&self.client, &self.webhook_url, &self.payload(alert)).await
    }
}

/// Posts to a Discord webhook.
pub struct DiscordSink {
    webhook_url: String,
    username: String,
    client: Client,
}

impl DiscordSink {
    pub fn new(webhook_url: impl Into<String>, username: impl Into<String>, client: Client) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            username: username.into(),
            client,
        }
    }

    pub fn payload(&self, alert: &str) -> Value {
        json!({
            "content": alert,
            "username": self.username,
        })
    }
}

#[async_trait]
impl AlertSink for DiscordSink {
    fn name(&self) -> &str {
        "discord"
    }

    async fn deliver(&self, alert: &str) -> Result<(), SinkError> {
        post_json(&self.client, &self.webhook_url, &self.payload(alert)).await
    }
}

async fn post_json(client: &Client, url: &str, payload: &Value) -> Result<(), SinkError> {
    let response = client
        .post(url)
        .timeout(DELIVERY_TIMEOUT)
        .json(payload)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(SinkError::Status(status.as_u16()));
    }
    Ok(())
}

fn default_bot_name() -> String {
    DEFAULT_BOT_NAME.to_string()
}

/// Sink selection as it appears in the configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SinkConfig {
    Print,
    Log,
    Webhook {
        url: String,
    },
    Slack {
        webhook_url: String,
        #[serde(default = "default_bot_name")]
        username: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        channel: Option<String>,
    },
    Discord {
        webhook_url: String,
        #[serde(default = "default_bot_name")]
        username: String,
    },
}

impl SinkConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            SinkConfig::Webhook { url } if url.trim().is_empty() => {
                Err(ConfigError::MissingUrl("webhook"))
            }
            SinkConfig::Slack { webhook_url, .. } if webhook_url.trim().is_empty() => {
                Err(ConfigError::MissingUrl("slack"))
            }
            SinkConfig::Discord { webhook_url, .. } if webhook_url.trim().is_empty() => {
                Err(ConfigError::MissingUrl("discord"))
            }
            _ => Ok(()),
        }
    }
}

/// Instantiates the configured sinks. HTTP sinks share one client.
pub fn build_sinks(configs: &[SinkConfig]) -> Result<Vec<Arc<dyn AlertSink>>, ConfigError> {
    let needs_http = configs.iter().any(|c| {
        matches!(
            c,
            SinkConfig::Webhook { .. } | SinkConfig::Slack { .. } | SinkConfig::Discord { .. }
        )
    });
    let client = if needs_http {
        Some(
            Client::builder()
                .timeout(DELIVERY_TIMEOUT)
                .build()
                .map_err(|e| ConfigError::Load(format!("HTTP client: {}", e)))?,
        )
    } else {
        None
    };

    let mut sinks: Vec<Arc<dyn AlertSink>> = Vec::with_capacity(configs.len());
    for config in configs {
        config.validate()?;
        let client = || client.clone().unwrap_or_default();
        let sink: Arc<dyn AlertSink> = match config {
            SinkConfig::Print => Arc::new(PrintSink),
            SinkConfig::Log => Arc::new(LogSink),
            SinkConfig::Webhook { url } => Arc::new(WebhookSink::new(url.clone(), client())),
            SinkConfig::Slack {
                webhook_url,
                username,
                channel,
            } => Arc::new(SlackSink::new(
                webhook_url.clone(),
                username.clone(),
                channel.clone(),
                client(),
            )),
            SinkConfig::Discord {
                webhook_url,
                username,
            } => Arc::new(DiscordSink::new(
                webhook_url.clone(),
                username.clone(),
                client(),
            )),
        };
        sinks.push(sink);
    }
    Ok(sinks)
}
