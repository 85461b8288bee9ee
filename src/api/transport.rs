//! HTTP seam between the client logic and the network.
//!
//! `ReqwestTransport` talks to the real API; tests plug in an in-process
//! server. Status codes are returned as-is: interpreting 401s and error
//! bodies is the client's job.

use std::time::Duration;

use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

/// One API call, relative to the configured base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body: Some(body),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    /// Parse the body as JSON; an empty body reads as `null`.
    pub fn json_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        if self.body.trim().is_empty() {
            Ok(serde_json::Value::Null)
        } else {
            serde_json::from_str(&self.body)
        }
    }
}

/// The request never produced a response (DNS, connect, timeout, body read).
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request`, attaching `Authorization: Bearer <token>` when given.
    async fn send(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
    ) -> Result<ApiResponse, TransportError>;
}

// ============================================================================
// reqwest backend
// ============================================================================

pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: url::Url,
}

impl ReqwestTransport {
    /// Build a transport rooted at `base_url`. A missing trailing slash is
    /// added so relative endpoint paths join underneath it.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url = url::Url::parse(&normalized)
            .map_err(|e| TransportError(format!("Invalid API URL {:?}: {}", base_url, e)))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError(format!("HTTP client setup failed: {}", e)))?;
        Ok(Self { client, base_url })
    }

    pub fn endpoint(&self, path: &str) -> Result<url::Url, TransportError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| TransportError(format!("Invalid endpoint {:?}: {}", path, e)))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
    ) -> Result<ApiResponse, TransportError> {
        let url = self.endpoint(&request.path)?;
        let mut builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
        };
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| TransportError(format!("Request to {} failed: {}", request.path, e)))?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| TransportError(format!("Reading {} response failed: {}", request.path, e)))?;

        log::debug!("{:?} {} -> {}", request.method, request.path, status);
        Ok(ApiResponse { status, body })
    }
}
