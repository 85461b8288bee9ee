//! Client for the PlanView insurance plan API.
//!
//! Session handling lives here: a persisted access/refresh token pair, a
//! single refresh-and-retry on 401, and the dashboard aggregation that reads
//! profile, plans, recommendations and feedback in one go.
//!
//! Modules:
//! - token_store: TokenPair persistence (file + in-memory backends)
//! - session: Session gate and refresh serialization
//! - transport: HTTP seam (reqwest-backed in production)
//! - client: PlanClient and the authenticated request wrapper
//! - auth: signup, login, logout, token refresh
//! - dashboard: dashboard aggregation, feedback, load state
//! - plans: plan listing, comparison, eligibility

pub mod auth;
pub mod client;
pub mod dashboard;
pub mod plans;
pub mod session;
pub mod token_store;
pub mod transport;

#[cfg(test)]
pub(crate) mod fake_server;

pub use client::PlanClient;
pub use dashboard::{DashboardLoader, LoadState};
pub use session::Session;
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use transport::{ApiRequest, ApiResponse, Method, ReqwestTransport, Transport};

// ============================================================================
// Endpoints (relative to the configured API base URL)
// ============================================================================

pub const USERS_PATH: &str = "users/";
pub const TOKEN_PATH: &str = "token/";
pub const TOKEN_REFRESH_PATH: &str = "token/refresh/";
pub const CURRENT_USER_PATH: &str = "users/me/";
pub const PLANS_PATH: &str = "plans/";
pub const RECOMMENDATIONS_PATH: &str = "recommendations/";
pub const FEEDBACK_PATH: &str = "feedback/";
pub const COMPARE_PLANS_PATH: &str = "plans/compare/";

pub fn eligibility_path(plan_id: i64) -> String {
    format!("plans/{}/eligible/", plan_id)
}

// ============================================================================
// Error type
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PlanApiError {
    #[error("Please login to continue")]
    NotAuthenticated,
    #[error("Session expired. Please login again.")]
    SessionExpired,
    #[error("{message}")]
    Remote {
        status: Option<u16>,
        message: String,
    },
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl PlanApiError {
    /// True when the front end should send the user back to login.
    pub fn needs_login(&self) -> bool {
        matches!(
            self,
            PlanApiError::NotAuthenticated | PlanApiError::SessionExpired
        )
    }

    /// HTTP status of a remote failure, when the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            PlanApiError::Remote { status, .. } => *status,
            _ => None,
        }
    }

    /// Build a `Remote` error from a non-2xx response body, falling back to
    /// `fallback` when the body carries no usable message.
    pub fn from_response(status: u16, body: &str, fallback: &str) -> Self {
        PlanApiError::Remote {
            status: Some(status),
            message: remote_message(body).unwrap_or_else(|| fallback.to_string()),
        }
    }
}

/// Aggregate human-readable messages from an error body.
///
/// Field-keyed validation errors (`{"username": ["taken"], "detail": "..."}`)
/// become every value flattened one level and joined with ", ". A bare JSON
/// string or array is used directly. Returns `None` for empty or non-JSON
/// bodies.
pub fn remote_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;

    let mut parts = Vec::new();
    match &value {
        serde_json::Value::Object(map) => {
            for item in map.values() {
                push_flattened(item, &mut parts);
            }
        }
        serde_json::Value::Array(_) => push_flattened(&value, &mut parts),
        serde_json::Value::String(s) => parts.push(s.clone()),
        _ => {}
    }

    let parts: Vec<String> = parts
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

fn push_flattened(value: &serde_json::Value, parts: &mut Vec<String>) {
    match value {
        serde_json::Value::Array(items) => parts.extend(items.iter().map(scalar_text)),
        other => parts.push(scalar_text(other)),
    }
}

fn scalar_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

// ============================================================================
// Tests
// ============================================================================
