use serde::Serialize;
use std::time::Duration;

use super::config::SmsCredentials;

/// Client for the messaging provider's REST API
#[derive(Debug, Clone)]
pub struct MessagingProvider {
    http_client: reqwest::Client,
    api_base: String,
    credentials: SmsCredentials,
}

/// Provider reply: status code and decoded JSON body
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

impl ProviderResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Serialize)]
struct MessageForm<'a> {
    #[serde(rename = "To")]
    to: &'a str,
    #[serde(rename = "From")]
    from: &'a str,
    #[serde(rename = "Body")]
    body: &'a str,
}

impl MessagingProvider {
    pub fn new(api_base: impl Into<String>, credentials: SmsCredentials) -> Result<Self, ProviderError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ProviderError::Client(e.to_string()))?;

        Ok(Self {
            http_client,
            api_base: api_base.into(),
            credentials,
        })
    }

    /// Messages endpoint for the configured account
    pub fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base, self.credentials.account_sid
        )
    }

    /// Submit one message. Non-2xx replies are returned, not raised; a body
    /// that is not JSON is an error whatever the status.
    pub async fn send(&self, to: &str, message: &str) -> Result<ProviderResponse, ProviderError> {
        let response = self
            .http_client
            .post(self.messages_url())
            .basic_auth(&self.credentials.account_sid, Some(&self.credentials.auth_token))
            .form(&MessageForm {
                to,
                from: &self.credentials.from,
                body: message,
            })
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProviderError::Body(e.to_string()))?;
        let body = serde_json::from_slice(&bytes).map_err(|e| {
            ProviderError::Decode(format!(
                "status {}: {} ({})",
                status,
                e,
                String::from_utf8_lossy(&bytes).chars().take(200).collect::<String>()
            ))
        })?;

        tracing::debug!(status, to = %to, "Provider replied");

        Ok(ProviderResponse { status, body })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to read provider response: {0}")]
    Body(String),

    #[error("Provider response is not JSON: {0}")]
    Decode(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_url() {
        let provider = MessagingProvider::new(
            "https://api.twilio.com",
            SmsCredentials {
                account_sid: "AC123".to_string(),
                auth_token: "secret".to_string(),
                from: "+15550000000".to_string(),
            },
        )
        .unwrap();

        assert_eq!(
            provider.messages_url(),
            "https://api.twilio.com/2010-04-01/Accounts/AC123/Messages.json"
        );
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_network_error() {
        let provider = MessagingProvider::new(
            "http://127.0.0.1:9",
            SmsCredentials {
                account_sid: "AC123".to_string(),
                auth_token: "secret".to_string(),
                from: "+15550000000".to_string(),
            },
        )
        .unwrap();

        let err = provider.send("+15551234567", "hi").await.unwrap_err();
        assert!(matches!(err, ProviderError::Network(_)));
    }
}
