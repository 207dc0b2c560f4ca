//! SMS and Kakao delivery through an HTTP messaging gateway.
//!
//! The gateway accepts a JSON POST per message. Failed attempts are retried
//! with exponential backoff (1 s, 2 s, 4 s) before giving up.

use std::time::Duration;

use cruisemall_core::schedule::MessageChannel;
use serde::Serialize;

/// Retry delays in seconds.
const RETRY_DELAYS_SECS: [u64; 3] = [1, 2, 4];

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Gateway returned HTTP {0}")]
    HttpStatus(u16),

    #[error("No gateway configured for {0}")]
    NotConfigured(&'static str),
}

/// Gateway endpoints. Either URL may be absent, in which case that channel
/// is log-only.
#[derive(Debug, Clone, Default)]
pub struct GatewayConfig {
    pub sms_url: Option<String>,
    pub kakao_url: Option<String>,
    pub api_key: Option<String>,
}

impl GatewayConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable            | Default               |
    /// |---------------------|-----------------------|
    /// | `SMS_GATEWAY_URL`   | (none: SMS log-only)  |
    /// | `KAKAO_GATEWAY_URL` | (none: Kakao log-only)|
    /// | `GATEWAY_API_KEY`   | (none)                |
    ///
    /// Returns `None` when neither URL is set.
    pub fn from_env() -> Option<Self> {
        let config = Self {
            sms_url: std::env::var("SMS_GATEWAY_URL").ok().filter(|v| !v.is_empty()),
            kakao_url: std::env::var("KAKAO_GATEWAY_URL").ok().filter(|v| !v.is_empty()),
            api_key: std::env::var("GATEWAY_API_KEY").ok().filter(|v| !v.is_empty()),
        };
        (config.sms_url.is_some() || config.kakao_url.is_some()).then_some(config)
    }

    /// Endpoint for a channel, if configured. Email never goes through the
    /// gateway.
    pub fn url_for(&self, channel: MessageChannel) -> Option<&str> {
        match channel {
            MessageChannel::Sms => self.sms_url.as_deref(),
            MessageChannel::Kakao => self.kakao_url.as_deref(),
            MessageChannel::Email => None,
        }
    }
}

/// JSON body posted to the gateway.
#[derive(Debug, Serialize)]
struct GatewayRequest<'a> {
    channel: &'a str,
    to: &'a str,
    subject: Option<&'a str>,
    text: &'a str,
}

/// Posts SMS / Kakao messages to the configured gateway.
pub struct GatewayDelivery {
    client: reqwest::Client,
    config: GatewayConfig,
}

impl GatewayDelivery {
    pub fn new(config: GatewayConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self { client, config }
    }

    pub fn supports(&self, channel: MessageChannel) -> bool {
        self.config.url_for(channel).is_some()
    }

    /// Send one message, retrying with backoff. Returns the first error
    /// when every attempt fails.
    pub async fn deliver(
        &self,
        channel: MessageChannel,
        to: &str,
        subject: Option<&str>,
        text: &str,
    ) -> Result<(), GatewayError> {
        let url = self
            .config
            .url_for(channel)
            .ok_or(GatewayError::NotConfigured(channel.as_str()))?;
        let request = GatewayRequest {
            channel: channel.as_str(),
            to,
            subject,
            text,
        };

        let mut first_err: Option<GatewayError> = None;

        for (attempt, delay_secs) in RETRY_DELAYS_SECS.iter().enumerate() {
            match self.try_send(url, &request).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        channel = channel.as_str(),
                        error = %e,
                        "Gateway delivery attempt failed, retrying"
                    );
                    first_err.get_or_insert(e);
                    tokio::time::sleep(Duration::from_secs(*delay_secs)).await;
                }
            }
        }

        match self.try_send(url, &request).await {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::error!(channel = channel.as_str(), error = %e, "Gateway delivery failed after all retries");
                Err(first_err.unwrap_or(e))
            }
        }
    }

    async fn try_send(&self, url: &str, request: &GatewayRequest<'_>) -> Result<(), GatewayError> {
        let mut builder = self.client.post(url).json(request);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await?;
        if !response.status().is_success() {
            return Err(GatewayError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}
