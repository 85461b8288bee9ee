//! In-process stand-in for the plan API, used by the client tests.
//!
//! Issues real-looking token pairs, validates bearer tokens, appends posted
//! feedback, and can be told to expire tokens, fail a path with a canned
//! response, or drop a path off the network. Every call yields once so
//! joined requests interleave the way they do over a socket.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use super::client::PlanClient;
use super::token_store::MemoryTokenStore;
use super::transport::{ApiRequest, ApiResponse, Method, Transport, TransportError};
use crate::types::LoginCredentials;

struct Account {
    password: String,
    profile: Value,
}

struct FakeState {
    accounts: HashMap<String, Account>,
    access_tokens: HashMap<String, String>,
    refresh_tokens: HashSet<String>,
    issued: u32,
    reject_all_bearer: bool,
    plans: Vec<Value>,
    recommendations: Value,
    feedback: Value,
    failures: HashMap<String, (u16, String)>,
    offline: HashSet<String>,
    calls: Vec<(Method, String, Option<String>)>,
}

pub(crate) struct FakeApi {
    state: Mutex<FakeState>,
}

fn reply(status: u16, body: Value) -> ApiResponse {
    ApiResponse {
        status,
        body: body.to_string(),
    }
}

fn unauthorized() -> ApiResponse {
    reply(
        401,
        json!({
            "detail": "Given token not valid for any token type",
            "code": "token_not_valid"
        }),
    )
}

impl FakeApi {
    pub fn new() -> Self {
        let mut accounts = HashMap::new();
        accounts.insert(
            "alice".to_string(),
            Account {
                password: "pw".to_string(),
                profile: json!({
                    "id": 1,
                    "username": "alice",
                    "email": "alice@example.com",
                    "name": "Alice Example",
                    "age": 34,
                    "budget": "2500.00",
                    "family_size": 2,
                    "medical_history": "asthma"
                }),
            },
        );

        let plans = vec![
            json!({"id": 1, "name": "Basic Care", "coverage": "Hospital stays",
                   "price": "1200.00", "price_per_month": 100.0, "conditions": "None"}),
            json!({"id": 2, "name": "Family Plus", "coverage": "Family cover",
                   "price": "2400.00", "price_per_month": 200.0, "conditions": "Max 6 members"}),
            json!({"id": 3, "name": "Premium Shield", "coverage": "Comprehensive",
                   "price": 6000.0, "price_per_month": 500.0, "conditions": "Age 18-65"}),
        ];

        let mut first = plans[1].clone();
        first["suitability_score"] = json!(0.92);
        let mut second = plans[0].clone();
        second["suitability_score"] = json!(0.61);

        Self {
            state: Mutex::new(FakeState {
                accounts,
                access_tokens: HashMap::new(),
                refresh_tokens: HashSet::new(),
                issued: 0,
                reject_all_bearer: false,
                plans,
                recommendations: json!({ "recommended_plans": [first, second] }),
                feedback: json!([]),
                failures: HashMap::new(),
                offline: HashSet::new(),
                calls: Vec::new(),
            }),
        }
    }

    /// A client already logged in as alice.
    pub async fn signed_in() -> (Arc<FakeApi>, PlanClient) {
        let api = Arc::new(FakeApi::new());
        let client = PlanClient::new(api.clone(), Arc::new(MemoryTokenStore::new()));
        client
            .login(&LoginCredentials {
                username: "alice".into(),
                password: "pw".into(),
            })
            .await
            .expect("login against fake api");
        api.state.lock().calls.clear();
        (api, client)
    }

    // ------------------------------------------------------------------
    // Scenario controls
    // ------------------------------------------------------------------

    pub fn expire_access_tokens(&self) {
        self.state.lock().access_tokens.clear();
    }

    pub fn revoke_refresh_tokens(&self) {
        self.state.lock().refresh_tokens.clear();
    }

    pub fn reject_all_bearer_tokens(&self) {
        self.state.lock().reject_all_bearer = true;
    }

    pub fn fail_path(&self, path: &str, status: u16, body: &str) {
        self.state
            .lock()
            .failures
            .insert(path.to_string(), (status, body.to_string()));
    }

    pub fn take_offline(&self, path: &str) {
        self.state.lock().offline.insert(path.to_string());
    }

    pub fn set_recommendations(&self, body: Value) {
        self.state.lock().recommendations = body;
    }

    pub fn set_feedback(&self, body: Value) {
        self.state.lock().feedback = body;
    }

    // ------------------------------------------------------------------
    // Call log
    // ------------------------------------------------------------------

    pub fn total_calls(&self) -> usize {
        self.state.lock().calls.len()
    }

    pub fn count(&self, method: Method, path: &str) -> usize {
        self.calls_to(method, path).len()
    }

    /// Bearer tokens sent with each call to `method path`, in order.
    pub fn calls_to(&self, method: Method, path: &str) -> Vec<Option<String>> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|(m, p, _)| *m == method && p == path)
            .map(|(_, _, bearer)| bearer.clone())
            .collect()
    }

    // ------------------------------------------------------------------
    // Routing
    // ------------------------------------------------------------------

    fn handle(&self, request: &ApiRequest, bearer: Option<&str>) -> ApiResponse {
        let mut state = self.state.lock();
        let body = request.body.clone().unwrap_or(Value::Null);

        match (request.method, request.path.as_str()) {
            (Method::Post, "users/") => state.create_account(&body),
            (Method::Post, "token/") => state.obtain_pair(&body),
            (Method::Post, "token/refresh/") => state.refresh_access(&body),
            _ => {
                let Some(username) = state.authorize(bearer) else {
                    return unauthorized();
                };
                state.protected(request.method, &request.path, &username, &body)
            }
        }
    }
}

impl FakeState {
    fn issue_access(&mut self, username: &str) -> String {
        self.issued += 1;
        let access = format!("access-{}", self.issued);
        self.access_tokens.insert(access.clone(), username.to_string());
        access
    }

    fn authorize(&self, bearer: Option<&str>) -> Option<String> {
        if self.reject_all_bearer {
            return None;
        }
        self.access_tokens.get(bearer?).cloned()
    }

    fn create_account(&mut self, body: &Value) -> ApiResponse {
        let username = body["username"].as_str().unwrap_or_default().to_string();
        if username.is_empty() {
            return reply(400, json!({"username": ["This field is required."]}));
        }
        if self.accounts.contains_key(&username) {
            return reply(
                400,
                json!({"username": ["A user with that username already exists."]}),
            );
        }
        let mut profile = body.clone();
        if let Some(map) = profile.as_object_mut() {
            map.remove("password");
        }
        self.accounts.insert(
            username,
            Account {
                password: body["password"].as_str().unwrap_or_default().to_string(),
                profile: profile.clone(),
            },
        );
        reply(201, profile)
    }

    fn obtain_pair(&mut self, body: &Value) -> ApiResponse {
        let username = body["username"].as_str().unwrap_or_default();
        let password = body["password"].as_str().unwrap_or_default();
        let valid = self
            .accounts
            .get(username)
            .map(|a| a.password == password)
            .unwrap_or(false);
        if !valid {
            return reply(
                401,
                json!({"detail": "No active account found with the given credentials"}),
            );
        }
        let username = username.to_string();
        let access = self.issue_access(&username);
        let refresh = format!("refresh-{}:{}", self.issued, username);
        self.refresh_tokens.insert(refresh.clone());
        reply(200, json!({"access": access, "refresh": refresh}))
    }

    fn refresh_access(&mut self, body: &Value) -> ApiResponse {
        let refresh = body["refresh"].as_str().unwrap_or_default();
        if !self.refresh_tokens.contains(refresh) {
            return reply(
                401,
                json!({"detail": "Token is invalid or expired", "code": "token_not_valid"}),
            );
        }
        let username = refresh.rsplit(':').next().unwrap_or_default().to_string();
        let access = self.issue_access(&username);
        reply(200, json!({"access": access}))
    }

    fn protected(&mut self, method: Method, path: &str, username: &str, body: &Value) -> ApiResponse {
        match (method, path) {
            (Method::Get, "users/me/") => match self.accounts.get(username) {
                Some(account) => reply(200, account.profile.clone()),
                None => reply(404, json!({"detail": "Not found."})),
            },
            (Method::Get, "plans/") => reply(200, Value::Array(self.plans.clone())),
            (Method::Get, "recommendations/") => reply(200, self.recommendations.clone()),
            (Method::Get, "feedback/") => reply(200, self.feedback.clone()),
            (Method::Post, "feedback/") => {
                let rating = body["rating"].as_u64().unwrap_or(0);
                if !(1..=5).contains(&rating) {
                    return reply(400, json!({"rating": ["Rating must be between 1 and 5"]}));
                }
                let entries = self.feedback.as_array().map(|a| a.len()).unwrap_or(0);
                let entry = json!({
                    "id": entries + 1,
                    "rating": rating,
                    "comments": body["comments"].clone(),
                    "created_at": chrono::Utc::now().to_rfc3339(),
                });
                if !self.feedback.is_array() {
                    self.feedback = json!([]);
                }
                if let Some(list) = self.feedback.as_array_mut() {
                    list.insert(0, entry.clone());
                }
                reply(201, entry)
            }
            (Method::Post, "plans/compare/") => {
                let ids: Vec<i64> = body["plan_ids"]
                    .as_array()
                    .map(|ids| ids.iter().filter_map(Value::as_i64).collect())
                    .unwrap_or_default();
                if ids.is_empty() {
                    return reply(400, json!({"error": "No plan IDs provided"}));
                }
                let selected: Vec<Value> = self
                    .plans
                    .iter()
                    .filter(|p| p["id"].as_i64().map(|id| ids.contains(&id)).unwrap_or(false))
                    .cloned()
                    .collect();
                reply(200, Value::Array(selected))
            }
            (Method::Post, path) if path.starts_with("plans/") && path.ends_with("/eligible/") => {
                let id = path
                    .trim_start_matches("plans/")
                    .trim_end_matches("/eligible/")
                    .parse::<i64>()
                    .ok();
                let plan = self
                    .plans
                    .iter()
                    .find(|p| id.is_some() && p["id"].as_i64() == id);
                let Some(plan) = plan else {
                    return reply(404, json!({"detail": "Not found."}));
                };
                let price = decimal(&plan["price"]);
                let budget = self
                    .accounts
                    .get(username)
                    .map(|a| decimal(&a.profile["budget"]))
                    .unwrap_or(0.0);
                if budget > 0.0 && budget < price {
                    reply(200, json!({"eligible": false, "reason": "Plan price exceeds budget"}))
                } else {
                    reply(200, json!({"eligible": true}))
                }
            }
            _ => reply(404, json!({"detail": "Not found."})),
        }
    }
}

fn decimal(value: &Value) -> f64 {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
        .unwrap_or(0.0)
}

#[async_trait]
impl Transport for FakeApi {
    async fn send(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
    ) -> Result<ApiResponse, TransportError> {
        self.state.lock().calls.push((
            request.method,
            request.path.clone(),
            bearer.map(str::to_string),
        ));

        tokio::task::yield_now().await;

        let canned = {
            let state = self.state.lock();
            if state.offline.contains(&request.path) {
                return Err(TransportError(format!("connection refused: {}", request.path)));
            }
            state.failures.get(&request.path).cloned()
        };
        if let Some((status, body)) = canned {
            return Ok(ApiResponse { status, body });
        }

        Ok(self.handle(request, bearer))
    }
}
