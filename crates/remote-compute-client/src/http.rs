//! REST implementation of the inference session API.

use std::time::Duration;

use async_trait::async_trait;
use remote_compute_core::{
    ClientError, CreateSessionRequest, HealthInfo, InferenceClient, ManagerConfig,
    SessionData, SessionStatusSnapshot,
};
use reqwest::{Method, Response, Url};
use serde::de::DeserializeOwned;

/// Inference client speaking JSON over HTTP.
#[derive(Debug, Clone)]
pub struct HttpInferenceClient {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpInferenceClient {
    /// Create a client for the server at `base_url`.
    ///
    /// # Errors
    /// Returns error if the URL cannot be used as a base or the HTTP client
    /// cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ClientError::Other(format!("Invalid server URL {base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::Other(format!(
                "Invalid server URL {base_url}: not a base URL"
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Other(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { http, base_url })
    }

    /// Create a client from manager configuration.
    ///
    /// # Errors
    /// Returns error if the configured URL is invalid.
    pub fn from_config(config: &ManagerConfig) -> Result<Self, ClientError> {
        Self::new(&config.inference_server_url, config.request_timeout)
    }

    /// Base URL requests are resolved against.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&CreateSessionRequest>,
    ) -> Result<Response, ClientError> {
        let url = self.endpoint(segments);
        tracing::debug!(%method, %url, "inference request");

        let mut request = self.http.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ClientError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }
}

#[async_trait]
impl InferenceClient for HttpInferenceClient {
    async fn create_session(
        &self,
        request: &CreateSessionRequest,
    ) -> Result<SessionData, ClientError> {
        let response = self.send(Method::POST, &["sessions"], Some(request)).await?;
        Self::decode(response).await
    }

    async fn start_inference(&self, session_id: &str) -> Result<(), ClientError> {
        self.send(Method::POST, &["sessions", session_id, "start"], None)
            .await
            .map(drop)
    }

    async fn stop_inference(&self, session_id: &str) -> Result<(), ClientError> {
        self.send(Method::POST, &["sessions", session_id, "stop"], None)
            .await
            .map(drop)
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), ClientError> {
        self.send(Method::DELETE, &["sessions", session_id], None)
            .await
            .map(drop)
    }

    async fn get_session_status(
        &self,
        session_id: &str,
    ) -> Result<SessionStatusSnapshot, ClientError> {
        let response = self.send(Method::GET, &["sessions", session_id], None).await?;
        Self::decode::<SessionStatusSnapshot>(response)
            .await
            .map(SessionStatusSnapshot::normalized)
    }

    async fn is_healthy(&self) -> Result<bool, ClientError> {
        match self.send(Method::GET, &["health"], None).await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::debug!("Health probe failed: {e}");
                Ok(false)
            }
        }
    }

    async fn get_health(&self) -> Result<HealthInfo, ClientError> {
        let response = self.send(Method::GET, &["health"], None).await?;
        Self::decode(response).await
    }
}
