//! Cruise mall event bus and outbound messaging.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`PlatformEvent`]: the domain event envelope.
//! - [`EventPersistence`]: background service writing every event to the
//!   `events` table.
//! - [`delivery`]: SMTP email and HTTP gateway (SMS / Kakao) channels.
//! - [`OutboundDispatcher`]: routes an [`OutboundMessage`] to the channel
//!   that carries it, logging instead of sending when a channel is not
//!   configured.

pub mod bus;
pub mod delivery;
pub mod dispatcher;
pub mod persistence;

pub use bus::{EventBus, PlatformEvent};
pub use delivery::email::{EmailConfig, EmailDelivery};
pub use delivery::gateway::{GatewayConfig, GatewayDelivery};
pub use dispatcher::{DeliveryError, DeliveryOutcome, OutboundDispatcher, OutboundMessage};
pub use persistence::EventPersistence;
