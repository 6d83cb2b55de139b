//! Belvo API client
//!
//! Thin async wrapper over the Belvo REST API. Every method performs exactly
//! one authenticated request and returns the raw JSON payload; reshaping is
//! left to [`super::normalize`].
//!
//! API reference: https://developers.belvo.com/reference

use reqwest::{Client, Method, RequestBuilder, Url};
use serde::Serialize;
use serde_json::{json, Value as JsonValue};

use crate::config::{BelvoConfig, BelvoCredentials};

use super::BelvoError;

/// Longest upstream error text carried into our own error messages
const MAX_UPSTREAM_MESSAGE: usize = 500;

/// Filters for listing transactions of one account
#[derive(Debug, Clone, Serialize)]
pub struct TransactionQuery {
    pub link: String,
    pub account: String,
    pub date_from: String,
    pub date_to: String,
}

/// Belvo HTTP client
#[derive(Debug, Clone)]
pub struct BelvoClient {
    client: Client,
    base_url: Url,
    credentials: BelvoCredentials,
}

impl BelvoClient {
    /// Create a client for the configured API root and credentials
    pub fn new(config: &BelvoConfig) -> Result<Self, BelvoError> {
        let mut base = config.api_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).map_err(|e| BelvoError::InvalidUrl(e.to_string()))?;

        let client = Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            base_url,
            credentials: config.credentials.clone(),
        })
    }

    /// API root all paths are resolved against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `GET institutions/`
    pub async fn list_institutions(&self) -> Result<JsonValue, BelvoError> {
        let request = self.request(Method::GET, "institutions/")?;
        self.send(request, "list_institutions").await
    }

    /// `POST links/`: connect a user's bank login, single access mode
    pub async fn create_link(
        &self,
        institution: &str,
        username: &str,
        password: &str,
    ) -> Result<JsonValue, BelvoError> {
        let request = self.request(Method::POST, "links/")?.json(&json!({
            "institution": institution,
            "username": username,
            "password": password,
            "access_mode": "single",
        }));
        self.send(request, "create_link").await
    }

    /// `POST accounts/`: have Belvo retrieve and store the link's accounts
    pub async fn register_accounts(&self, link_id: &str) -> Result<JsonValue, BelvoError> {
        let request = self.request(Method::POST, "accounts/")?.json(&json!({
            "link": link_id,
            "save_data": true,
        }));
        self.send(request, "register_accounts").await
    }

    /// `GET accounts/`, filtered to one link when given
    pub async fn list_accounts(&self, link_id: Option<&str>) -> Result<JsonValue, BelvoError> {
        let mut request = self.request(Method::GET, "accounts/")?;
        if let Some(link_id) = link_id {
            request = request.query(&[("link", link_id)]);
        }
        self.send(request, "list_accounts").await
    }

    /// `GET transactions/` for one account and date range
    pub async fn list_transactions(
        &self,
        query: &TransactionQuery,
    ) -> Result<JsonValue, BelvoError> {
        let request = self.request(Method::GET, "transactions/")?.query(query);
        self.send(request, "list_transactions").await
    }

    /// `GET transactions/{id}/`
    pub async fn get_transaction(&self, transaction_id: &str) -> Result<JsonValue, BelvoError> {
        if !is_safe_path_segment(transaction_id) {
            return Err(BelvoError::InvalidUrl(format!(
                "invalid transaction id: {}",
                transaction_id
            )));
        }
        let path = format!("transactions/{}/", transaction_id);
        let request = self.request(Method::GET, &path)?;
        self.send(request, "get_transaction").await
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, BelvoError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| BelvoError::InvalidUrl(e.to_string()))?;

        Ok(self
            .client
            .request(method, url)
            .basic_auth(
                &self.credentials.secret_id,
                Some(&self.credentials.secret_password),
            )
            .header(reqwest::header::ACCEPT, "application/json"))
    }

    async fn send(&self, request: RequestBuilder, operation: &str) -> Result<JsonValue, BelvoError> {
        let start = std::time::Instant::now();

        let response = request.send().await.map_err(|e| {
            tracing::warn!(operation, error = %e, "Belvo request failed");
            BelvoError::Request(e)
        })?;

        let status = response.status();
        tracing::debug!(
            operation,
            status = %status,
            duration_ms = %start.elapsed().as_millis(),
            "Belvo responded"
        );

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = upstream_message(&body)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());
            tracing::warn!(operation, status = %status, message = %message, "Belvo returned an error");
            return Err(BelvoError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(JsonValue::Null);
        }
        serde_json::from_slice(&bytes).map_err(|e| BelvoError::UnexpectedResponse(e.to_string()))
    }
}

/// Items of a list payload: either a bare array or a paginated object with
/// a `results` array. Anything else yields no items.
pub fn results(payload: JsonValue) -> Vec<JsonValue> {
    match payload {
        JsonValue::Array(items) => items,
        JsonValue::Object(mut map) => match map.remove("results") {
            Some(JsonValue::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// Pull a human-readable message out of a Belvo error body.
///
/// Belvo reports errors as `[{"code": .., "message": ..}]`; some endpoints use
/// `{"detail": ..}`. Falls back to the raw (truncated) text.
fn upstream_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    let from_object = |value: &JsonValue| -> Option<String> {
        ["message", "detail", "error"]
            .iter()
            .find_map(|key| value.get(*key).and_then(JsonValue::as_str))
            .map(str::to_string)
    };

    let parsed = match serde_json::from_str::<JsonValue>(body) {
        Ok(JsonValue::Array(items)) => items.first().and_then(from_object),
        Ok(value @ JsonValue::Object(_)) => from_object(&value),
        _ => None,
    };

    Some(parsed.unwrap_or_else(|| body.chars().take(MAX_UPSTREAM_MESSAGE).collect()))
}

fn is_safe_path_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
