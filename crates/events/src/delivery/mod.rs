//! External delivery channels for customer messages.

pub mod email;
pub mod gateway;
