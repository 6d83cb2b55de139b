//! Common test utilities
//!
//! A fake Belvo API served by axum on an ephemeral port, and an application
//! router wired to it over the in-memory store.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    extract::{Path, Query, State},
    http::{header, HeaderMap, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower::util::ServiceExt;
use uuid::Uuid;

use belvo_bridge::auth::JwtService;
use belvo_bridge::belvo::BelvoClient;
use belvo_bridge::config::{BelvoConfig, BelvoCredentials, JwtConfig};
use belvo_bridge::store::MemoryStore;
use belvo_bridge::{build_router, AppState};

pub const SECRET_ID: &str = "test-id";
pub const SECRET_PASSWORD: &str = "test-secret";
/// `Basic base64("test-id:test-secret")`
const EXPECTED_AUTH: &str = "Basic dGVzdC1pZDp0ZXN0LXNlY3JldA==";

pub const FOREIGN_LINK: &str = "link-of-someone-else";

/// Account whose transactions sum past `Decimal::MAX`
pub const OVERFLOW_ACCOUNT: &str = "acc-overflow";

// =========================================================================
// Fake Belvo
// =========================================================================

/// Upstream state shared between the fake server and the test
#[derive(Default)]
pub struct FakeBelvo {
    /// link id -> institution, in creation order
    links: Mutex<Vec<(String, String)>>,
    /// Institutions whose link creation fails with invalid credentials
    failing: Vec<String>,
    /// Every `GET accounts/` link filter received
    account_queries: Mutex<Vec<Option<String>>>,
}

impl FakeBelvo {
    pub fn failing(institutions: &[&str]) -> Self {
        Self {
            failing: institutions.iter().map(|i| i.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn links(&self) -> Vec<(String, String)> {
        self.links.lock().unwrap().clone()
    }

    pub fn account_queries(&self) -> Vec<Option<String>> {
        self.account_queries.lock().unwrap().clone()
    }

    fn institution_of(&self, link_id: &str) -> Option<String> {
        self.links
            .lock()
            .unwrap()
            .iter()
            .find(|(id, _)| id == link_id)
            .map(|(_, institution)| institution.clone())
    }
}

type Fake = Arc<FakeBelvo>;

fn authorized(headers: &HeaderMap) -> Result<(), Response> {
    match headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        Some(EXPECTED_AUTH) => Ok(()),
        _ => Err((
            StatusCode::UNAUTHORIZED,
            Json(json!([{"code": "authentication_failed", "message": "Invalid credentials"}])),
        )
            .into_response()),
    }
}

async fn create_link(
    State(fake): State<Fake>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(r) = authorized(&headers) {
        return r;
    }

    let institution = body["institution"].as_str().unwrap_or_default().to_string();
    assert_eq!(body["access_mode"], "single");

    if fake.failing.contains(&institution) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!([{
                "code": "invalid_credentials",
                "message": "Invalid credentials provided to login to the institution"
            }])),
        )
            .into_response();
    }

    let id = Uuid::new_v4().to_string();
    fake.links
        .lock()
        .unwrap()
        .push((id.clone(), institution.clone()));

    (
        StatusCode::CREATED,
        Json(json!({
            "id": id,
            "institution": institution,
            "access_mode": "single",
            "status": "valid",
        })),
    )
        .into_response()
}

/// Raw accounts per institution; deliberately not sharing one shape
fn raw_accounts(link_id: &str, institution: &str) -> Vec<Value> {
    match institution {
        "erebor_mx_retail" => vec![
            json!({
                "id": format!("{}-checking", link_id),
                "link": link_id,
                "institution": {"name": "erebor_mx_retail", "type": "bank"},
                "category": "CHECKING_ACCOUNT",
                "type": "Cuentas de efectivo",
                "balance": {"current": 5874.13, "available": 5621.12},
                "currency": "MXN"
            }),
            json!({
                "id": format!("{}-savings", link_id),
                "link": link_id,
                "institution": {"display_name": "Erebor Retail"},
                "category": "SAVINGS_ACCOUNT",
                "balance": {"available": "1200.50"},
                "currency": "MXN"
            }),
        ],
        _ => vec![json!({
            "id": format!("{}-business", link_id),
            "link": {"id": link_id},
            "account_type": "BUSINESS",
            "balances": {"current": 100},
            "currency_code": "USD"
        })],
    }
}

async fn register_accounts(
    State(fake): State<Fake>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(r) = authorized(&headers) {
        return r;
    }
    assert_eq!(body["save_data"], true);

    let link_id = body["link"].as_str().unwrap_or_default();
    match fake.institution_of(link_id) {
        Some(institution) => {
            (StatusCode::CREATED, Json(Value::Array(raw_accounts(link_id, &institution))))
                .into_response()
        }
        None => (
            StatusCode::BAD_REQUEST,
            Json(json!([{"code": "does_not_exist", "message": "Link does not exist"}])),
        )
            .into_response(),
    }
}

async fn list_accounts(
    State(fake): State<Fake>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if let Err(r) = authorized(&headers) {
        return r;
    }

    let link = query.get("link").cloned();
    fake.account_queries.lock().unwrap().push(link.clone());

    let mut results = Vec::new();
    if let Some(link_id) = link {
        if let Some(institution) = fake.institution_of(&link_id) {
            results = raw_accounts(&link_id, &institution);
        }
        // Noise a careless upstream filter might let through
        results.push(json!({"id": "stray", "link": FOREIGN_LINK, "currency": "EUR"}));
        results.push(json!("not an account"));
    }

    Json(json!({
        "count": results.len(),
        "next": null,
        "previous": null,
        "results": results,
    }))
    .into_response()
}

async fn list_institutions(headers: HeaderMap) -> Response {
    if let Err(r) = authorized(&headers) {
        return r;
    }

    Json(json!({
        "count": 2,
        "next": null,
        "previous": null,
        "results": [
            {
                "id": 1,
                "name": "erebor_mx_retail",
                "display_name": "Erebor Retail",
                "type": "bank",
                "logo": "https://statics.sandbox.belvo.io/erebor.svg",
                "country_codes": ["MX"],
                "website": "https://www.erebor.com"
            },
            {
                "id": 2,
                "name": "gotham_mx_business",
                "display_name": "Gotham Business",
                "type": "bank",
                "country_codes": ["MX"]
            }
        ]
    }))
    .into_response()
}

async fn list_transactions(
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if let Err(r) = authorized(&headers) {
        return r;
    }
    for key in ["link", "account", "date_from", "date_to"] {
        assert!(query.contains_key(key), "missing upstream query {}", key);
    }

    if query.get("account").map(String::as_str) == Some(OVERFLOW_ACCOUNT) {
        let huge = "79228162514264337593543950335";
        return Json(json!([
            {"id": "txn-big-1", "amount": huge, "type": "INFLOW"},
            {"id": "txn-big-2", "amount": huge, "type": "INFLOW"}
        ]))
        .into_response();
    }

    Json(json!([
        {
            "id": "txn-1",
            "amount": 1000.50,
            "type": "INFLOW",
            "category": "Income & Payments",
            "description": "SALARY",
            "merchant": {"name": "ACME"},
            "transacted_at": "2024-01-15",
            "status": "PROCESSED"
        },
        {
            "id": "txn-2",
            "amount": 250.25,
            "type": "OUTFLOW",
            "category": "Groceries",
            "transacted_at": "2024-01-16",
            "status": "PROCESSED"
        },
        {
            "id": "txn-3",
            "amount": "49.75",
            "type": "OUTFLOW",
            "transacted_at": "2024-01-17",
            "status": "PENDING"
        }
    ]))
    .into_response()
}

async fn get_transaction(
    State(fake): State<Fake>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if let Err(r) = authorized(&headers) {
        return r;
    }

    let link = match id.as_str() {
        "txn-1" => fake.links().first().map(|(id, _)| id.clone()),
        "txn-foreign" => Some(FOREIGN_LINK.to_string()),
        _ => None,
    };

    match link {
        Some(link) => Json(json!({
            "id": id,
            "account": {
                "id": "acc-1",
                "link": link,
                "institution": {"name": "erebor_mx_retail", "type": "bank"},
                "name": "Cuenta Perfiles",
                "category": "CHECKING_ACCOUNT",
                "balance": {"current": 5874.13},
                "currency": "MXN"
            },
            "amount": 1000.50,
            "currency": "MXN",
            "type": "INFLOW",
            "status": "PROCESSED",
            "transacted_at": "2024-01-15",
            "created_at": "2024-01-15T10:00:00Z"
        }))
        .into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found."}))).into_response(),
    }
}

/// Serve the fake Belvo API and return its base URL
async fn serve_fake_belvo(fake: Fake) -> String {
    let app = Router::new()
        .route("/api/links/", post(create_link))
        .route("/api/accounts/", post(register_accounts).get(list_accounts))
        .route("/api/institutions/", get(list_institutions))
        .route("/api/transactions/", get(list_transactions))
        .route("/api/transactions/:id/", get(get_transaction))
        .with_state(fake);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}/api/", addr)
}

// =========================================================================
// Application under test
// =========================================================================

pub struct TestApp {
    pub router: Router,
    pub belvo: Fake,
    pub state: AppState,
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(FakeBelvo::default()).await
}

pub async fn spawn_app_with(fake: FakeBelvo) -> TestApp {
    let fake = Arc::new(fake);
    let api_url = serve_fake_belvo(fake.clone()).await;

    let jwt = JwtService::new(&JwtConfig {
        secret: "integration-test-secret".to_string(),
        access_ttl: Duration::from_secs(300),
        refresh_ttl: Duration::from_secs(86_400),
    });
    let belvo = BelvoClient::new(&BelvoConfig {
        api_url,
        credentials: BelvoCredentials::new(SECRET_ID, SECRET_PASSWORD),
        timeout: Duration::from_secs(5),
    })
    .unwrap();

    let state = AppState::new(MemoryStore::new(), jwt, belvo).with_exposed_reset_codes(true);

    TestApp {
        router: build_router(state.clone()),
        belvo: fake,
        state,
    }
}

impl TestApp {
    /// Send a request and return the status with the JSON body (`Null` when
    /// the body is empty)
    pub async fn call(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let body = body.map(|body| body.to_string());
        self.call_raw(method, uri, token, body.as_deref()).await
    }

    /// Like `call`, with the body sent verbatim as `application/json`
    pub async fn call_raw(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        (status, json)
    }

    pub async fn register(&self, email: &str, password: &str) -> (StatusCode, Value) {
        self.call(
            "POST",
            "/api/users/",
            None,
            Some(json!({"email": email, "password": password})),
        )
        .await
    }

    pub async fn login(&self, email: &str, password: &str) -> (StatusCode, Value) {
        self.call(
            "POST",
            "/api/auth/login/",
            None,
            Some(json!({"email": email, "password": password})),
        )
        .await
    }

    /// Register and log in; returns the login body
    pub async fn signed_up(&self, email: &str) -> Session {
        let (status, _) = self.register(email, "p").await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = self.login(email, "p").await;
        assert_eq!(status, StatusCode::OK);

        Session {
            user_id: body["user"]["id"].as_str().unwrap().to_string(),
            access: body["tokens"]["access"].as_str().unwrap().to_string(),
            refresh: body["tokens"]["refresh"].as_str().unwrap().to_string(),
        }
    }
}

pub struct Session {
    pub user_id: String,
    pub access: String,
    pub refresh: String,
}
