//! Routes outbound customer messages to the channel that carries them.

use cruisemall_core::phone::normalize_phone;
use cruisemall_core::schedule::MessageChannel;

use crate::delivery::email::{EmailConfig, EmailDelivery, EmailError};
use crate::delivery::gateway::{GatewayConfig, GatewayDelivery, GatewayError};

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error(transparent)]
    Email(#[from] EmailError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// A rendered message ready to send.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub channel: MessageChannel,
    pub recipient: String,
    pub subject: Option<String>,
    pub body: String,
}

/// How a message left the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Sent,
    /// The channel is not configured; the message was only logged.
    LoggedOnly,
}

/// Address a lead can be reached at on `channel`, if any.
pub fn recipient_for(channel: MessageChannel, phone: &str, email: Option<&str>) -> Option<String> {
    match channel {
        MessageChannel::Email => email
            .map(str::trim)
            .filter(|e| e.contains('@'))
            .map(str::to_string),
        MessageChannel::Sms | MessageChannel::Kakao => normalize_phone(phone),
    }
}

/// Sends [`OutboundMessage`]s over email or the messaging gateway.
#[derive(Default)]
pub struct OutboundDispatcher {
    email: Option<EmailDelivery>,
    gateway: Option<GatewayDelivery>,
}

impl OutboundDispatcher {
    pub fn new(email: Option<EmailConfig>, gateway: Option<GatewayConfig>) -> Self {
        Self {
            email: email.map(EmailDelivery::new),
            gateway: gateway.map(GatewayDelivery::new),
        }
    }

    /// Dispatcher with no channels configured.
    pub fn log_only() -> Self {
        Self::default()
    }

    /// Build from `SMTP_*` and `*_GATEWAY_URL` environment variables.
    pub fn from_env() -> Self {
        Self::new(EmailConfig::from_env(), GatewayConfig::from_env())
    }

    pub async fn send(&self, message: &OutboundMessage) -> Result<DeliveryOutcome, DeliveryError> {
        match message.channel {
            MessageChannel::Email => {
                if let Some(email) = &self.email {
                    email
                        .deliver(&message.recipient, message.subject.as_deref(), &message.body)
                        .await?;
                    return Ok(DeliveryOutcome::Sent);
                }
            }
            channel => {
                if let Some(gateway) = self.gateway.as_ref().filter(|g| g.supports(channel)) {
                    gateway
                        .deliver(
                            channel,
                            &message.recipient,
                            message.subject.as_deref(),
                            &message.body,
                        )
                        .await?;
                    return Ok(DeliveryOutcome::Sent);
                }
            }
        }

        tracing::info!(
            channel = message.channel.as_str(),
            recipient = %message.recipient,
            body_len = message.body.len(),
            "Channel not configured, message logged only"
        );
        Ok(DeliveryOutcome::LoggedOnly)
    }
}
