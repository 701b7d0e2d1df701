use crate::api::{ApiError, Result};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Backend status code meaning success
pub const STATUS_OK: i64 = 200;

/// Response envelope shared by every backend endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T = Value> {
    pub status: i64,
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default, alias = "msg")]
    pub message: Option<String>,
}

impl Envelope<Value> {
    /// Unwrap a successful envelope into its typed payload.
    ///
    /// Any status other than 200 becomes [`ApiError::Business`] regardless of
    /// what the payload looks like.
    pub fn into_data<T: DeserializeOwned>(self) -> Result<T> {
        if self.status != STATUS_OK {
            return Err(ApiError::Business {
                status: self.status,
                message: self.message.unwrap_or_default(),
            });
        }

        let data = self.data.unwrap_or(Value::Null);
        serde_json::from_value(data).map_err(|e| ApiError::Parse(format!("payload: {e}")))
    }
}

/// HTTP client wrapper for the backend
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(base_url: impl Into<String>, timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Get the underlying reqwest client
    #[must_use]
    pub const fn inner(&self) -> &Client {
        &self.client
    }

    /// Build full URL from endpoint
    #[must_use]
    pub fn url(&self, endpoint: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let endpoint = endpoint.trim_start_matches('/');
        format!("{base}/{endpoint}")
    }

    /// Execute GET request with query parameters
    pub async fn get_with_params(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<Envelope> {
        let url = self.url(endpoint);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(ApiError::Network)?;

        Self::handle_response(response).await
    }

    /// Execute POST request with a form-urlencoded body
    pub async fn post_form(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<Envelope> {
        let url = self.url(endpoint);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .header("Accept", "application/json")
            .form(params)
            .send()
            .await
            .map_err(ApiError::Network)?;

        Self::handle_response(response).await
    }

    /// Handle response and parse the envelope
    async fn handle_response(response: reqwest::Response) -> Result<Envelope> {
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ApiError::Unauthorized);
        }

        if !status.is_success() {
            let status_code = status.as_u16();
            let body = response.text().await.unwrap_or_default();

            // Error handlers on the backend still answer with an envelope
            if let Ok(mut envelope) = serde_json::from_str::<Envelope>(&body) {
                debug!("HTTP {} carried a backend envelope", status_code);
                if envelope.status == STATUS_OK {
                    envelope.status = i64::from(status_code);
                }
                return Ok(envelope);
            }

            return Err(ApiError::Http {
                status: status_code,
                message: body,
            });
        }

        response
            .json::<Envelope>()
            .await
            .map_err(|e| ApiError::Parse(format!("JSON parse error: {e}")))
    }
}
