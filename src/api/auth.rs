//! Account and token operations: signup, login, logout, refresh.
//!
//! Only `refresh` touches an existing session. A failed refresh always
//! clears the stored pair before reporting `SessionExpired`.

use serde::Deserialize;

use super::client::PlanClient;
use super::transport::ApiRequest;
use super::{PlanApiError, TOKEN_PATH, TOKEN_REFRESH_PATH, USERS_PATH};
use crate::types::{LoginCredentials, SignupRequest, TokenPair};

pub const SIGNUP_FAILED: &str = "Signup failed. Please try again.";
pub const LOGIN_FAILED: &str = "Login failed. Please check your credentials.";
const REFRESH_FAILED: &str = "Failed to refresh token";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access: Option<String>,
    #[serde(default)]
    refresh: Option<String>,
}

impl PlanClient {
    /// Create an account. Does not sign in.
    pub async fn signup(&self, request: &SignupRequest) -> Result<(), PlanApiError> {
        let body = serde_json::to_value(request)?;
        self.send_public(&ApiRequest::post(USERS_PATH, body), SIGNUP_FAILED)
            .await?;
        log::info!("Created account {}", request.username);
        Ok(())
    }

    /// Exchange credentials for a token pair and persist it.
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<TokenPair, PlanApiError> {
        let body = serde_json::to_value(credentials)?;
        let response = self
            .send_public(&ApiRequest::post(TOKEN_PATH, body), LOGIN_FAILED)
            .await?;

        let parsed: TokenResponse =
            serde_json::from_str(&response.body).map_err(|_| PlanApiError::Remote {
                status: Some(response.status),
                message: LOGIN_FAILED.to_string(),
            })?;

        let pair = match (parsed.access, parsed.refresh) {
            (Some(access), Some(refresh)) if !access.is_empty() => TokenPair { access, refresh },
            _ => {
                return Err(PlanApiError::Remote {
                    status: Some(response.status),
                    message: LOGIN_FAILED.to_string(),
                })
            }
        };

        self.session.save(&pair)?;
        log::info!("Signed in as {}", credentials.username);
        Ok(pair)
    }

    /// End the local session. Idempotent.
    pub fn logout(&self) {
        self.session.clear();
        log::info!("Signed out");
    }

    /// Exchange the stored refresh token for a new access token.
    pub async fn refresh(&self) -> Result<TokenPair, PlanApiError> {
        self.refresh_after(None).await
    }

    /// Refresh under the session's refresh lock.
    ///
    /// With `stale_access` set, a caller that lost the race to another
    /// refresh gets the already-refreshed pair instead of refreshing again.
    pub(crate) async fn refresh_after(
        &self,
        stale_access: Option<&str>,
    ) -> Result<TokenPair, PlanApiError> {
        let _guard = self.session.lock_refresh().await;

        let Some(current) = self.session.tokens() else {
            self.session.clear();
            return Err(PlanApiError::SessionExpired);
        };

        if let Some(stale) = stale_access {
            if current.access != stale {
                log::debug!("Access token already refreshed by a concurrent call");
                return Ok(current);
            }
        }

        let exchanged = self.exchange_refresh_token(&current.refresh).await;
        match exchanged {
            Ok(access) => {
                let pair = TokenPair {
                    access,
                    refresh: current.refresh,
                };
                if let Err(e) = self.session.save(&pair) {
                    log::warn!("Could not persist refreshed token: {}", e);
                    self.session.clear();
                    return Err(PlanApiError::SessionExpired);
                }
                log::info!("Access token refreshed");
                Ok(pair)
            }
            Err(e) => {
                log::warn!("Token refresh failed: {}", e);
                self.session.clear();
                Err(PlanApiError::SessionExpired)
            }
        }
    }

    async fn exchange_refresh_token(&self, refresh: &str) -> Result<String, PlanApiError> {
        let request = ApiRequest::post(
            TOKEN_REFRESH_PATH,
            serde_json::json!({ "refresh": refresh }),
        );
        let response = self.send_public(&request, REFRESH_FAILED).await?;
        let parsed: TokenResponse = serde_json::from_str(&response.body)?;
        parsed
            .access
            .filter(|access| !access.is_empty())
            .ok_or_else(|| PlanApiError::Remote {
                status: Some(response.status),
                message: REFRESH_FAILED.to_string(),
            })
    }
}
