//! Persistence backend: the opaque key-value store holding overlay state
//!
//! The remote API is form-encoded and keyed by user name. `OverlayBackend`
//! is the seam integration tests and alternate transports implement;
//! `HttpBackend` is the production implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Backend errors
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        BackendError::Request(e.to_string())
    }
}

/// Stored record for one user, as the persistence store returns it.
/// Both fields tolerate being absent or empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(default)]
    pub overlays: Vec<String>,
    #[serde(default)]
    pub rtsp_url: Option<String>,
}

/// The opaque persistence API keyed by user identity
#[async_trait]
pub trait OverlayBackend: Send + Sync {
    /// Fetch the stored record for a user
    async fn fetch_user(&self, user_name: &str) -> Result<UserRecord, BackendError>;

    /// Register a user with a feed locator and initial overlays; the store
    /// echoes the overlays it adopted (possibly empty or absent)
    async fn register_user(
        &self,
        user_name: &str,
        rtsp_url: &str,
        overlays: &[String],
    ) -> Result<UserRecord, BackendError>;

    /// Full-replace push of the user's overlay collection
    async fn put_overlays(&self, user_name: &str, overlays: &[String]) -> Result<(), BackendError>;
}

/// HTTP implementation against the remote store
pub struct HttpBackend {
    http: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(BackendError::from)?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Repeated-key form pairs: `user_name` once, `overlays` once per item
    fn overlay_form<'a>(
        user_name: &'a str,
        overlays: &'a [String],
    ) -> Vec<(&'static str, &'a str)> {
        let mut pairs = vec![("user_name", user_name)];
        pairs.extend(overlays.iter().map(|o| ("overlays", o.as_str())));
        pairs
    }
}

#[async_trait]
impl OverlayBackend for HttpBackend {
    async fn fetch_user(&self, user_name: &str) -> Result<UserRecord, BackendError> {
        let response = self
            .http
            .post(self.url("/get-user"))
            .form(&[("user_name", user_name)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status(status.as_u16()));
        }

        response
            .json::<UserRecord>()
            .await
            .map_err(|e| BackendError::MalformedResponse(e.to_string()))
    }

    async fn register_user(
        &self,
        user_name: &str,
        rtsp_url: &str,
        overlays: &[String],
    ) -> Result<UserRecord, BackendError> {
        let mut pairs = Self::overlay_form(user_name, overlays);
        pairs.insert(1, ("rtsp_url", rtsp_url));

        let response = self
            .http
            .post(self.url("/add-user"))
            .form(&pairs)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status(status.as_u16()));
        }

        response
            .json::<UserRecord>()
            .await
            .map_err(|e| BackendError::MalformedResponse(e.to_string()))
    }

    async fn put_overlays(&self, user_name: &str, overlays: &[String]) -> Result<(), BackendError> {
        let pairs = Self::overlay_form(user_name, overlays);

        let response = self
            .http
            .put(self.url("/overlays"))
            .form(&pairs)
            .send()
            .await?;

        let status = response.status();
        debug!(user = %user_name, count = overlays.len(), %status, "pushed overlay collection");
        if !status.is_success() {
            return Err(BackendError::Status(status.as_u16()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_record_tolerates_missing_fields() {
        let record: UserRecord = serde_json::from_str("{}").unwrap();
        assert!(record.overlays.is_empty());
        assert!(record.rtsp_url.is_none());

        let record: UserRecord =
            serde_json::from_str(r#"{"overlays":["a"],"rtsp_url":"rtsp://cam1"}"#).unwrap();
        assert_eq!(record.overlays, vec!["a".to_string()]);
        assert_eq!(record.rtsp_url.as_deref(), Some("rtsp://cam1"));
    }

    #[test]
    fn test_overlay_form_repeats_key() {
        let overlays = vec!["one".to_string(), "two".to_string()];
        let pairs = HttpBackend::overlay_form("alice", &overlays);
        assert_eq!(
            pairs,
            vec![
                ("user_name", "alice"),
                ("overlays", "one"),
                ("overlays", "two"),
            ]
        );
    }
}
