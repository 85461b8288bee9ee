//! Dashboard aggregation and feedback submission.
//!
//! The four dashboard reads are independent, so they are joined on the
//! current task and all run to completion before the result is judged.
//! Recommendations and feedback are optional: a missing field reads as an
//! empty list instead of failing the dashboard.

use serde::Deserialize;

use super::client::{decode, PlanClient};
use super::transport::ApiRequest;
use super::{
    PlanApiError, CURRENT_USER_PATH, FEEDBACK_PATH, PLANS_PATH, RECOMMENDATIONS_PATH,
};
use crate::types::{
    DashboardSnapshot, FeedbackEntry, NewFeedback, PlanSummary, RankedPlan, UserProfile,
};

const DASHBOARD_FAILED: &str = "Failed to load dashboard. Please try again.";
const FEEDBACK_FAILED: &str = "Failed to submit feedback. Please try again.";

/// `recommendations/` answers either `{"recommended_plans": [...]}` or a bare list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecommendationsBody {
    Bare(Vec<RankedPlan>),
    Wrapped {
        #[serde(default)]
        recommended_plans: Option<Vec<RankedPlan>>,
    },
}

impl RecommendationsBody {
    fn into_plans(self) -> Vec<RankedPlan> {
        match self {
            RecommendationsBody::Bare(plans) => plans,
            RecommendationsBody::Wrapped { recommended_plans } => {
                recommended_plans.unwrap_or_default()
            }
        }
    }
}

impl PlanClient {
    /// Assemble the signed-in user's dashboard.
    ///
    /// `SessionExpired`/`NotAuthenticated` mean "send the user to login";
    /// any other failure is a `Remote` error to display.
    pub async fn fetch_dashboard(&self) -> Result<DashboardSnapshot, PlanApiError> {
        if !self.session.is_authenticated() {
            self.session.clear();
            return Err(PlanApiError::NotAuthenticated);
        }

        let (user, plans, recommendations, feedback) = tokio::join!(
            self.get_json::<UserProfile>(CURRENT_USER_PATH, DASHBOARD_FAILED),
            self.get_json::<Vec<PlanSummary>>(PLANS_PATH, DASHBOARD_FAILED),
            self.fetch_recommendations(),
            self.fetch_feedback(),
        );

        let (user, plans, recommendations, feedback) = match (user, plans, recommendations, feedback)
        {
            (Ok(user), Ok(plans), Ok(recommendations), Ok(feedback)) => {
                (user, plans, recommendations, feedback)
            }
            (user, plans, recommendations, feedback) => {
                return Err(dashboard_failure([
                    user.err(),
                    plans.err(),
                    recommendations.err(),
                    feedback.err(),
                ]));
            }
        };

        log::debug!(
            "Dashboard loaded: {} plans, {} recommendations, {} feedback entries",
            plans.len(),
            recommendations.len(),
            feedback.len()
        );

        Ok(DashboardSnapshot {
            user,
            plans,
            recommendations,
            feedback,
        })
    }

    async fn fetch_recommendations(&self) -> Result<Vec<RankedPlan>, PlanApiError> {
        let response = self
            .call_or(&ApiRequest::get(RECOMMENDATIONS_PATH), DASHBOARD_FAILED)
            .await?;
        if response.body.trim().is_empty() {
            return Ok(Vec::new());
        }
        let body: RecommendationsBody = decode(&response, RECOMMENDATIONS_PATH)?;
        Ok(body.into_plans())
    }

    async fn fetch_feedback(&self) -> Result<Vec<FeedbackEntry>, PlanApiError> {
        let response = self
            .call_or(&ApiRequest::get(FEEDBACK_PATH), DASHBOARD_FAILED)
            .await?;
        let value = response.json_value().unwrap_or(serde_json::Value::Null);
        if !value.is_array() {
            log::debug!("feedback/ returned no list; showing none");
            return Ok(Vec::new());
        }
        decode(&response, FEEDBACK_PATH)
    }

    /// Post a new feedback entry. Ratings outside 1..=5 are rejected before
    /// any request is made. The caller re-fetches the dashboard to see it.
    pub async fn submit_feedback(&self, rating: u8, comments: &str) -> Result<(), PlanApiError> {
        if !(1..=5).contains(&rating) {
            return Err(PlanApiError::InvalidInput(
                "Rating must be between 1 and 5".to_string(),
            ));
        }
        let body = serde_json::to_value(NewFeedback {
            rating,
            comments: comments.to_string(),
        })?;
        self.call_or(&ApiRequest::post(FEEDBACK_PATH, body), FEEDBACK_FAILED)
            .await?;
        log::info!("Submitted {}-star feedback", rating);
        Ok(())
    }
}

/// Pick the error to report for a failed dashboard load. A login failure on
/// any read outranks remote failures on the others.
fn dashboard_failure(errors: [Option<PlanApiError>; 4]) -> PlanApiError {
    let mut first = None;
    for err in errors.into_iter().flatten() {
        if err.needs_login() {
            return err;
        }
        log::warn!("Dashboard read failed: {}", err);
        first.get_or_insert(err);
    }
    first.unwrap_or_else(|| PlanApiError::Remote {
        status: None,
        message: DASHBOARD_FAILED.to_string(),
    })
}

// ============================================================================
// Load state
// ============================================================================

/// Lifecycle of one "load dashboard" action.
///
/// `Success` and `Failed` are terminal; a new action starts over at `Loading`.
#[derive(Debug, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Success(DashboardSnapshot),
    Failed(PlanApiError),
}

impl LoadState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoadState::Success(_) | LoadState::Failed(_))
    }

    /// The front end should navigate to login.
    pub fn needs_login(&self) -> bool {
        matches!(self, LoadState::Failed(e) if e.needs_login())
    }

    /// Message to show for a non-login failure.
    pub fn error_message(&self) -> Option<String> {
        match self {
            LoadState::Failed(e) if !e.needs_login() => Some(e.to_string()),
            _ => None,
        }
    }

    pub fn snapshot(&self) -> Option<&DashboardSnapshot> {
        match self {
            LoadState::Success(snapshot) => Some(snapshot),
            _ => None,
        }
    }
}

impl From<Result<DashboardSnapshot, PlanApiError>> for LoadState {
    fn from(result: Result<DashboardSnapshot, PlanApiError>) -> Self {
        match result {
            Ok(snapshot) => LoadState::Success(snapshot),
            Err(e) => LoadState::Failed(e),
        }
    }
}

/// Drives [`LoadState`] for a dashboard view.
///
/// Dropping the future returned by [`DashboardLoader::load`] abandons the
/// action and cancels its outstanding requests; the state stays `Loading`
/// until the next `load`.
#[derive(Debug, Default)]
pub struct DashboardLoader {
    state: LoadState,
}

impl DashboardLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn into_state(self) -> LoadState {
        self.state
    }

    pub async fn load(&mut self, client: &PlanClient) -> &LoadState {
        self.state = LoadState::Loading;
        self.state = client.fetch_dashboard().await.into();
        &self.state
    }
}
