//! Messaging provider access for the SMS relay

pub mod config;
pub mod provider;

pub use config::{RelayConfig, SmsCredentials, DEFAULT_API_BASE};
pub use provider::{MessagingProvider, ProviderError, ProviderResponse};
