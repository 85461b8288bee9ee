//! Plan catalogue: listing, side-by-side comparison, eligibility.

use super::client::{decode, PlanClient};
use super::transport::ApiRequest;
use super::{eligibility_path, PlanApiError, COMPARE_PLANS_PATH, PLANS_PATH};
use crate::types::{Eligibility, PlanSummary};

const PLANS_FAILED: &str = "Failed to load plans";
const COMPARE_FAILED: &str = "Failed to compare plans";
const ELIGIBILITY_FAILED: &str = "Failed to check plan eligibility";

impl PlanClient {
    pub async fn list_plans(&self) -> Result<Vec<PlanSummary>, PlanApiError> {
        self.get_json(PLANS_PATH, PLANS_FAILED).await
    }

    /// Fetch the given plans for comparison. Unknown ids are dropped by the
    /// server; an empty id list is rejected locally.
    pub async fn compare_plans(&self, plan_ids: &[i64]) -> Result<Vec<PlanSummary>, PlanApiError> {
        if plan_ids.is_empty() {
            return Err(PlanApiError::InvalidInput("No plan IDs provided".to_string()));
        }
        let request = ApiRequest::post(
            COMPARE_PLANS_PATH,
            serde_json::json!({ "plan_ids": plan_ids }),
        );
        let response = self.call_or(&request, COMPARE_FAILED).await?;
        decode(&response, COMPARE_PLANS_PATH)
    }

    /// Whether the signed-in user's budget covers `plan_id`.
    pub async fn check_eligibility(&self, plan_id: i64) -> Result<Eligibility, PlanApiError> {
        let path = eligibility_path(plan_id);
        let response = self
            .call_or(&ApiRequest::post(path.clone(), serde_json::json!({})), ELIGIBILITY_FAILED)
            .await?;
        decode(&response, &path)
    }
}
