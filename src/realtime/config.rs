use url::Url;

use super::RealtimeError;
use crate::env::{first_set, process_env, ConfigError, Lookup};

/// Hosted backend endpoint and anonymous key
#[derive(Debug, Clone, PartialEq)]
pub struct BackendConfig {
    pub url: String,
    pub anon_key: String,
}

impl BackendConfig {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anon_key: anon_key.into(),
        }
    }

    /// SUPABASE_URL or EXPO_PUBLIC_SUPABASE_URL
    /// SUPABASE_ANON_KEY or EXPO_PUBLIC_SUPABASE_ANON_KEY
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&process_env)
    }

    pub fn from_lookup(lookup: &impl Lookup) -> Result<Self, ConfigError> {
        let url = first_set(lookup, &["SUPABASE_URL", "EXPO_PUBLIC_SUPABASE_URL"])
            .ok_or(ConfigError::Missing("SUPABASE_URL"))?;
        let anon_key = first_set(lookup, &["SUPABASE_ANON_KEY", "EXPO_PUBLIC_SUPABASE_ANON_KEY"])
            .ok_or(ConfigError::Missing("SUPABASE_ANON_KEY"))?;

        Url::parse(&url).map_err(|_| ConfigError::Invalid {
            key: "SUPABASE_URL",
            value: url.clone(),
        })?;

        Ok(Self { url, anon_key })
    }

    /// Websocket endpoint for change feeds
    pub fn realtime_url(&self) -> Result<Url, RealtimeError> {
        let mut url = self.base()?;
        let scheme = match url.scheme() {
            "https" | "wss" => "wss",
            "http" | "ws" => "ws",
            other => {
                return Err(RealtimeError::Config(format!(
                    "Unsupported backend scheme: {}",
                    other
                )))
            }
        };
        url.set_scheme(scheme)
            .map_err(|_| RealtimeError::Config(format!("Cannot use scheme {}", scheme)))?;
        url.set_path("/realtime/v1/websocket");
        url.query_pairs_mut()
            .clear()
            .append_pair("apikey", &self.anon_key)
            .append_pair("vsn", "1.0.0");
        Ok(url)
    }

    /// REST endpoint for one table
    pub fn rest_url(&self, table: &str) -> Result<Url, RealtimeError> {
        let mut url = self.base()?;
        url.set_path(&format!("/rest/v1/{}", table));
        url.set_query(None);
        Ok(url)
    }

    fn base(&self) -> Result<Url, RealtimeError> {
        Url::parse(&self.url)
            .map_err(|e| RealtimeError::Config(format!("Invalid backend URL: {}", e)))
    }
}
