use std::fmt;

use crate::env::{first_set, process_env, ConfigError, Lookup};

pub const DEFAULT_API_BASE: &str = "https://api.twilio.com";

/// Messaging provider credentials
#[derive(Clone, PartialEq)]
pub struct SmsCredentials {
    pub account_sid: String,
    pub auth_token: String,
    /// Sender number in E.164 form
    pub from: String,
}

impl SmsCredentials {
    /// Read credentials; `None` unless all three values are present.
    ///
    /// Each value accepts two names:
    /// - TWILIO_ACCOUNT_SID or TWILIO_SID
    /// - TWILIO_AUTH_TOKEN or TWILIO_TOKEN
    /// - TWILIO_FROM or TWILIO_PHONE
    pub fn from_lookup(lookup: &impl Lookup) -> Option<Self> {
        Some(Self {
            account_sid: first_set(lookup, &["TWILIO_ACCOUNT_SID", "TWILIO_SID"])?,
            auth_token: first_set(lookup, &["TWILIO_AUTH_TOKEN", "TWILIO_TOKEN"])?,
            from: first_set(lookup, &["TWILIO_FROM", "TWILIO_PHONE"])?,
        })
    }
}

impl fmt::Debug for SmsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmsCredentials")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"<redacted>")
            .field("from", &self.from)
            .finish()
    }
}

/// Relay server configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    pub credentials: Option<SmsCredentials>,
    /// Provider base URL, overridable for testing against a local stand-in
    pub api_base: String,
}

impl RelayConfig {
    /// Create a relay config from environment variables
    /// HOST=0.0.0.0
    /// PORT=3000
    /// TWILIO_ACCOUNT_SID / TWILIO_AUTH_TOKEN / TWILIO_FROM (see [`SmsCredentials`])
    /// TWILIO_API_BASE=https://api.twilio.com
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&process_env)
    }

    pub fn from_lookup(lookup: &impl Lookup) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let host = first_set(lookup, &["HOST"]).unwrap_or(defaults.host);
        let port = match first_set(lookup, &["PORT"]) {
            Some(p) => p.parse().map_err(|_| ConfigError::Invalid {
                key: "PORT",
                value: p,
            })?,
            None => defaults.port,
        };
        let api_base = first_set(lookup, &["TWILIO_API_BASE"])
            .map(|base| base.trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_base);

        Ok(Self {
            host,
            port,
            credentials: SmsCredentials::from_lookup(lookup),
            api_base,
        })
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            credentials: None,
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::map_lookup;

    #[test]
    fn test_credentials_primary_names() {
        let env = map_lookup(&[
            ("TWILIO_ACCOUNT_SID", "AC123"),
            ("TWILIO_AUTH_TOKEN", "secret"),
            ("TWILIO_FROM", "+15550000000"),
        ]);
        let creds = SmsCredentials::from_lookup(&env).unwrap();
        assert_eq!(creds.account_sid, "AC123");
        assert_eq!(creds.auth_token, "secret");
        assert_eq!(creds.from, "+15550000000");
    }

    #[test]
    fn test_credentials_alternate_names() {
        let env = map_lookup(&[
            ("TWILIO_SID", "AC999"),
            ("TWILIO_TOKEN", "tok"),
            ("TWILIO_PHONE", "+15551111111"),
        ]);
        let creds = SmsCredentials::from_lookup(&env).unwrap();
        assert_eq!(creds.account_sid, "AC999");
        assert_eq!(creds.from, "+15551111111");
    }

    #[test]
    fn test_credentials_incomplete() {
        let env = map_lookup(&[("TWILIO_SID", "AC999"), ("TWILIO_TOKEN", "tok")]);
        assert!(SmsCredentials::from_lookup(&env).is_none());
    }

    #[test]
    fn test_debug_redacts_token() {
        let creds = SmsCredentials {
            account_sid: "AC1".to_string(),
            auth_token: "hunter2".to_string(),
            from: "+1".to_string(),
        };
        assert!(!format!("{:?}", creds).contains("hunter2"));
    }

    #[test]
    fn test_relay_config_defaults_and_port() {
        let config = RelayConfig::from_lookup(&map_lookup(&[])).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert!(config.credentials.is_none());

        let config = RelayConfig::from_lookup(&map_lookup(&[
            ("PORT", "8081"),
            ("TWILIO_API_BASE", "http://127.0.0.1:9000/"),
        ]))
        .unwrap();
        assert_eq!(config.port, 8081);
        assert_eq!(config.api_base, "http://127.0.0.1:9000");

        let err = RelayConfig::from_lookup(&map_lookup(&[("PORT", "http")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PORT", .. }));
    }
}
