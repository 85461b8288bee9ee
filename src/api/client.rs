//! `PlanClient` and the authenticated request wrapper.
//!
//! Every bearer call goes through [`PlanClient::call`]: attach the stored
//! access token, and on a 401 refresh once and reissue once. There is no
//! retry loop; a second 401 ends the session.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;

use super::session::Session;
use super::token_store::{FileTokenStore, TokenStore};
use super::transport::{ApiRequest, ApiResponse, ReqwestTransport, Transport};
use super::PlanApiError;
use crate::types::Config;

/// Message used when a failed call carries nothing more specific.
pub const REQUEST_FAILED: &str = "Request failed. Please try again.";

pub struct PlanClient {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) session: Session,
}

impl PlanClient {
    pub fn new(transport: Arc<dyn Transport>, store: Arc<dyn TokenStore>) -> Self {
        Self {
            transport,
            session: Session::new(store),
        }
    }

    /// Production client: reqwest transport at `config.api_url`, tokens in the
    /// configured file (or ~/.planview/tokens.json).
    pub fn from_config(config: &Config) -> Result<Self, PlanApiError> {
        let transport = ReqwestTransport::new(
            &config.api_url,
            Duration::from_secs(config.request_timeout_secs.max(1)),
        )
        .map_err(|e| PlanApiError::InvalidInput(e.to_string()))?;
        let store = match &config.token_path {
            Some(path) => FileTokenStore::new(path),
            None => FileTokenStore::default(),
        };
        Ok(Self::new(Arc::new(transport), Arc::new(store)))
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    /// Issue an authenticated request, refreshing and retrying at most once
    /// on 401. Returns only 2xx responses.
    pub async fn call(&self, request: &ApiRequest) -> Result<ApiResponse, PlanApiError> {
        self.call_or(request, REQUEST_FAILED).await
    }

    pub(crate) async fn call_or(
        &self,
        request: &ApiRequest,
        fallback: &str,
    ) -> Result<ApiResponse, PlanApiError> {
        let Some(tokens) = self.session.tokens() else {
            self.session.clear();
            return Err(PlanApiError::NotAuthenticated);
        };

        let response = self.dispatch(request, Some(&tokens.access), fallback).await?;
        if !response.is_unauthorized() {
            return into_success(response, fallback);
        }

        log::info!("{} returned 401; refreshing access token", request.path);
        let refreshed = self.refresh_after(Some(&tokens.access)).await?;

        let retried = self
            .dispatch(request, Some(&refreshed.access), fallback)
            .await?;
        if retried.is_unauthorized() {
            log::warn!(
                "{} still unauthorized after token refresh; ending session",
                request.path
            );
            self.session.clear();
            return Err(PlanApiError::SessionExpired);
        }
        into_success(retried, fallback)
    }

    /// Unauthenticated request (signup, login). Returns only 2xx responses.
    pub(crate) async fn send_public(
        &self,
        request: &ApiRequest,
        fallback: &str,
    ) -> Result<ApiResponse, PlanApiError> {
        let response = self.dispatch(request, None, fallback).await?;
        into_success(response, fallback)
    }

    /// Send through the transport; a transport failure becomes a `Remote`
    /// error with the operation's fallback message.
    pub(crate) async fn dispatch(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
        fallback: &str,
    ) -> Result<ApiResponse, PlanApiError> {
        self.transport.send(request, bearer).await.map_err(|e| {
            log::warn!("{:?} {} failed: {}", request.method, request.path, e);
            PlanApiError::Remote {
                status: None,
                message: fallback.to_string(),
            }
        })
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        fallback: &str,
    ) -> Result<T, PlanApiError> {
        let response = self.call_or(&ApiRequest::get(path), fallback).await?;
        decode(&response, path)
    }
}

impl std::fmt::Debug for PlanClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanClient")
            .field("session", &self.session)
            .finish()
    }
}

fn into_success(response: ApiResponse, fallback: &str) -> Result<ApiResponse, PlanApiError> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(PlanApiError::from_response(
            response.status,
            &response.body,
            fallback,
        ))
    }
}

/// Deserialize a 2xx body, reporting shape mismatches as remote errors.
pub(crate) fn decode<T: DeserializeOwned>(
    response: &ApiResponse,
    path: &str,
) -> Result<T, PlanApiError> {
    serde_json::from_str(&response.body).map_err(|e| {
        log::warn!("Unexpected {} response body: {}", path, e);
        PlanApiError::Remote {
            status: Some(response.status),
            message: format!("Unexpected response from server ({})", path),
        }
    })
}
