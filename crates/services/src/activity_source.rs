use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use study_core::model::{Activity, AggregateAtomReport, AtomsInfo, MediaUrlPrefix};

use crate::config::ActivitySourceConfig;
use crate::error::{ActivitySourceError, ProtocolError, TransportError};
use crate::wire::{PickActivityResponse, ReportResultRequest};

const SESSION_TOKEN_HEADER: &str = "X-Session-Token";

/// Credential identifying the learner to the activity backend.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(..)")
    }
}

/// One activity handed out by the picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickedActivity {
    pub media_url_prefix: MediaUrlPrefix,
    pub activity: Activity,
    pub atoms_info: AtomsInfo,
}

/// Remote collaborator that picks activities and receives their results.
///
/// Both calls are atomic request/response operations.
#[async_trait]
pub trait ActivitySource: Send + Sync {
    /// # Errors
    ///
    /// Returns `ActivitySourceError::Transport` on network failure and
    /// `ActivitySourceError::Protocol` if the response cannot be understood.
    async fn pick_activity(&self, token: &SessionToken)
    -> Result<PickedActivity, ActivitySourceError>;

    /// # Errors
    ///
    /// Returns `ActivitySourceError::Transport` on network failure.
    async fn report_result(
        &self,
        token: &SessionToken,
        language_code: &str,
        report: &AggregateAtomReport,
    ) -> Result<(), ActivitySourceError>;
}

/// `ActivitySource` backed by the JSON-over-HTTP study API.
#[derive(Clone)]
pub struct HttpActivitySource {
    client: Client,
    config: ActivitySourceConfig,
}

impl HttpActivitySource {
    /// # Errors
    ///
    /// Returns `TransportError::Http` if the HTTP client cannot be built.
    pub fn new(config: ActivitySourceConfig) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { client, config })
    }

    #[must_use]
    pub fn config(&self) -> &ActivitySourceConfig {
        &self.config
    }

    async fn post<B: Serialize + Sync>(
        &self,
        path: &str,
        token: &SessionToken,
        body: &B,
    ) -> Result<Bytes, TransportError> {
        let url = format!("{}{}", self.config.endpoint.trim_end_matches('/'), path);
        debug!(%url, "posting to study api");

        let response = self
            .client
            .post(url)
            .header(SESSION_TOKEN_HEADER, token.as_str())
            .json(body)
            .send()
            .await
            .map_err(TransportError::from_request)?;

        if !response.status().is_success() {
            return Err(TransportError::HttpStatus(response.status()));
        }

        response.bytes().await.map_err(TransportError::from_request)
    }
}

#[derive(Debug, Serialize)]
struct EmptyRequest {}

#[async_trait]
impl ActivitySource for HttpActivitySource {
    async fn pick_activity(
        &self,
        token: &SessionToken,
    ) -> Result<PickedActivity, ActivitySourceError> {
        let body = self.post("/pick_activity", token, &EmptyRequest {}).await?;
        let resp: PickActivityResponse =
            serde_json::from_slice(&body).map_err(ProtocolError::from)?;
        Ok(PickedActivity::try_from(resp)?)
    }

    async fn report_result(
        &self,
        token: &SessionToken,
        language_code: &str,
        report: &AggregateAtomReport,
    ) -> Result<(), ActivitySourceError> {
        let request = ReportResultRequest::new(language_code, report);
        self.post("/report_result", token, &request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_redacted_in_debug_output() {
        let token = SessionToken::new("secret-value");
        assert_eq!(format!("{token:?}"), "SessionToken(..)");
        assert_eq!(token.as_str(), "secret-value");
    }

    #[test]
    fn client_builds_from_default_config() {
        let source = HttpActivitySource::new(ActivitySourceConfig::default()).unwrap();
        assert_eq!(source.config().endpoint, "http://localhost:4649");
    }
}
