use std::time::Duration;

use super::config::BackendConfig;
use super::RealtimeError;
use crate::data::{Record, SensorReading};

/// Rows fetched for the initial history view
pub const HISTORY_LIMIT: usize = 50;

/// Read-only access to a readings table over the backend's REST interface
#[derive(Debug, Clone)]
pub struct TableClient {
    http_client: reqwest::Client,
    config: BackendConfig,
}

impl TableClient {
    pub fn new(config: BackendConfig) -> Result<Self, RealtimeError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| RealtimeError::Http(e.to_string()))?;
        Ok(Self {
            http_client,
            config,
        })
    }

    /// Most recent reading by `created_at`
    pub async fn fetch_latest(&self, table: &str) -> Result<Option<SensorReading>, RealtimeError> {
        Ok(self.fetch_recent(table, 1).await?.into_iter().next())
    }

    /// Up to `limit` readings, newest first. Undecodable rows are skipped.
    pub async fn fetch_recent(
        &self,
        table: &str,
        limit: usize,
    ) -> Result<Vec<SensorReading>, RealtimeError> {
        let url = self.config.rest_url(table)?;
        let limit = limit.to_string();

        let response = self
            .http_client
            .get(url.as_str())
            .query(&[
                ("select", "*"),
                ("order", "created_at.desc"),
                ("limit", limit.as_str()),
            ])
            .header("apikey", &self.config.anon_key)
            .bearer_auth(&self.config.anon_key)
            .send()
            .await
            .map_err(|e| RealtimeError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(RealtimeError::Http(format!("{}: {}", status, error_text)));
        }

        let rows: Vec<Record> = response
            .json()
            .await
            .map_err(|e| RealtimeError::Decode(e.to_string()))?;

        Ok(rows
            .iter()
            .filter_map(|row| match SensorReading::from_record(row) {
                Ok(reading) => Some(reading),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping malformed row");
                    None
                }
            })
            .collect())
    }
}
