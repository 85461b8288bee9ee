use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::util::{deserialize_decimal, deserialize_opt_decimal};

/// Configuration stored in ~/.planview/config.json
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Base URL of the plan API. Endpoint paths are joined onto it.
    #[serde(default = "default_api_url", alias = "api_url")]
    pub api_url: String,
    /// Override for the token file location (defaults to ~/.planview/tokens.json).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_path: Option<String>,
    /// Per-request timeout applied by the HTTP client.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_api_url() -> String {
    "http://127.0.0.1:8000/api/".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            token_path: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

// ============================================================================
// Session tokens
// ============================================================================

/// Access/refresh token pair issued by the `token/` endpoint.
///
/// Persisted as `{"access": "...", "refresh": "..."}`. Both values are opaque.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    #[serde(alias = "accessToken")]
    pub access: String,
    #[serde(alias = "refreshToken")]
    pub refresh: String,
}

// Tokens are credentials; keep them out of debug output and logs.
impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access", &"<redacted>")
            .field("refresh", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginCredentials {
    pub username: String,
    pub password: String,
}

/// Account creation payload for `users/`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medical_history: Option<String>,
}

// ============================================================================
// Dashboard resources
// ============================================================================

/// The signed-in user as returned by `users/me/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default, deserialize_with = "deserialize_opt_decimal")]
    pub budget: Option<f64>,
    #[serde(default)]
    pub family_size: Option<u32>,
    #[serde(default)]
    pub medical_history: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub coverage: String,
    #[serde(deserialize_with = "deserialize_decimal")]
    pub price: f64,
    #[serde(default)]
    pub price_per_month: f64,
    #[serde(default)]
    pub conditions: String,
}

/// A plan as ranked by the recommendation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedPlan {
    #[serde(flatten)]
    pub plan: PlanSummary,
    /// Score in `[0, 1]`; only used for display.
    pub suitability_score: f64,
}

impl RankedPlan {
    /// Suitability as a whole percentage, clamped to 0..=100.
    pub fn suitability_percent(&self) -> u8 {
        (self.suitability_score * 100.0).round().clamp(0.0, 100.0) as u8
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub rating: u8,
    #[serde(default)]
    pub comments: String,
    pub created_at: DateTime<Utc>,
}

/// Body of a feedback submission.
#[derive(Debug, Clone, Serialize)]
pub struct NewFeedback {
    pub rating: u8,
    pub comments: String,
}

/// Everything the dashboard renders, assembled from four independent reads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub user: UserProfile,
    pub plans: Vec<PlanSummary>,
    pub recommendations: Vec<RankedPlan>,
    pub feedback: Vec<FeedbackEntry>,
}

/// Result of `plans/{id}/eligible/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Eligibility {
    pub eligible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
