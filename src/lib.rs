//! PlanView client library.
//!
//! Session handling for the insurance-plan API (token storage, refresh and
//! the authenticated request wrapper) plus the dashboard aggregator.

pub mod api;
pub mod state;
pub mod types;
pub mod util;

pub use api::{DashboardLoader, LoadState, PlanApiError, PlanClient};
