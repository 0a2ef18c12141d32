//! Outbound delivery of one-time codes over email, SMS and WhatsApp.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::NotificationConfig;
use crate::domain::Channel;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("No provider endpoint configured for {0}")]
    NotConfigured(Channel),

    #[error("Provider request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Provider answered {0}")]
    Rejected(StatusCode),
}

#[derive(Debug, Clone, Serialize)]
pub struct OutboundMessage {
    pub channel: Channel,
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &OutboundMessage) -> Result<(), DeliveryError>;
}

/// Posts JSON to one provider endpoint per channel.
pub struct HttpNotifier {
    client: Client,
    config: NotificationConfig,
}

#[derive(Serialize)]
struct ProviderPayload<'a> {
    from: &'a str,
    to: &'a str,
    channel: Channel,
    subject: &'a str,
    message: &'a str,
}

impl HttpNotifier {
    pub fn new(config: NotificationConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .user_agent("MercadoBoom/1.0")
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build notification HTTP client: {e}"))?;

        Ok(Self { client, config })
    }

    fn endpoint(&self, channel: Channel) -> Option<&str> {
        match channel {
            Channel::Email => self.config.email_endpoint.as_deref(),
            Channel::Sms => self.config.sms_endpoint.as_deref(),
            Channel::WhatsApp => self.config.whatsapp_endpoint.as_deref(),
        }
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn send(&self, message: &OutboundMessage) -> Result<(), DeliveryError> {
        let endpoint = self
            .endpoint(message.channel)
            .ok_or(DeliveryError::NotConfigured(message.channel))?;

        let payload = ProviderPayload {
            from: &self.config.sender_name,
            to: &message.to,
            channel: message.channel,
            subject: &message.subject,
            message: &message.body,
        };

        let mut request = self.client.post(endpoint).json(&payload);
        if let Some(token) = &self.config.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(DeliveryError::Rejected(response.status()));
        }

        debug!(channel = %message.channel, "Message handed to provider");
        Ok(())
    }
}

/// Development notifier: writes the message to the log instead of sending it.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &OutboundMessage) -> Result<(), DeliveryError> {
        info!(
            channel = %message.channel,
            to = %message.to,
            subject = %message.subject,
            body = %message.body,
            "Outgoing message (log only)"
        );
        Ok(())
    }
}

pub fn from_config(config: &NotificationConfig) -> anyhow::Result<Arc<dyn Notifier>> {
    if config.log_only {
        Ok(Arc::new(LogNotifier))
    } else {
        Ok(Arc::new(HttpNotifier::new(config.clone())?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn http_notifier_without_endpoint_reports_not_configured() {
        let config = NotificationConfig {
            log_only: false,
            email_endpoint: Some("http://127.0.0.1:9/email".to_string()),
            ..NotificationConfig::default()
        };
        let notifier = HttpNotifier::new(config).unwrap();

        let err = notifier
            .send(&OutboundMessage {
                channel: Channel::Sms,
                to: "+525512345678".to_string(),
                subject: "Código".to_string(),
                body: "123456".to_string(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, DeliveryError::NotConfigured(Channel::Sms)));
    }

    #[tokio::test]
    async fn log_notifier_always_succeeds() {
        let message = OutboundMessage {
            channel: Channel::Email,
            to: "ana@example.com".to_string(),
            subject: "Código".to_string(),
            body: "123456".to_string(),
        };
        assert!(LogNotifier.send(&message).await.is_ok());
    }
}
