use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::task::JoinHandle;

use crate::config::TwilioConfig;

#[derive(Debug, thiserror::Error)]
pub enum SmsError {
    #[error("SMS provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("SMS provider rejected the message ({status}): {message}")]
    Rejected { status: u16, message: String },
}

/// Outbound text message delivery.
#[async_trait]
pub trait SmsSender: Send + Sync {
    /// Returns the provider's message id.
    async fn send(&self, to: &str, body: &str) -> Result<String, SmsError>;
}

/// Twilio Programmable Messaging over its REST API.
pub struct TwilioSender {
    http: reqwest::Client,
    config: TwilioConfig,
}

#[derive(Deserialize)]
struct TwilioMessage {
    sid: String,
}

#[derive(Deserialize)]
struct TwilioError {
    message: Option<String>,
}

impl TwilioSender {
    pub fn new(config: TwilioConfig) -> Result<Self, SmsError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self { http, config })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.api_base.trim_end_matches('/'),
            self.config.account_sid
        )
    }
}

#[async_trait]
impl SmsSender for TwilioSender {
    async fn send(&self, to: &str, body: &str) -> Result<String, SmsError> {
        let resp = self
            .http
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&[
                ("To", to),
                ("From", self.config.from_phone.as_str()),
                ("Body", body),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp
                .json::<TwilioError>()
                .await
                .ok()
                .and_then(|e| e.message)
                .unwrap_or_else(|| status.to_string());
            return Err(SmsError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.json::<TwilioMessage>().await?.sid)
    }
}

/// Fire-once delayed sends. Pending sends live only in this process: they
/// are not persisted, not retried, and are lost on restart.
#[derive(Clone)]
pub struct SmsScheduler {
    sender: Arc<dyn SmsSender>,
}

impl SmsScheduler {
    pub fn new(sender: Arc<dyn SmsSender>) -> Self {
        Self { sender }
    }

    /// Detached from the calling request; the handle is only useful to tests.
    pub fn schedule(&self, to: String, body: String, delay: Duration) -> JoinHandle<()> {
        let sender = self.sender.clone();
        tracing::info!(to = %to, delay_ms = delay.as_millis() as u64, "SMS scheduled");

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match sender.send(&to, &body).await {
                Ok(sid) => tracing::info!(to = %to, sid = %sid, "SMS sent"),
                Err(e) => tracing::error!(to = %to, error = %e, "Failed to send SMS"),
            }
        })
    }
}
