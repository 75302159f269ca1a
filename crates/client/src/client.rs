//! Dataset server HTTP client.
//!
//! Every call is a JSON POST answering `{success?, message}`. A missing
//! `success` counts as success; an explicit `false` or a non-2xx status is a
//! failure carrying the server's message.

use std::time::Duration;

use gridedit_engine::save::{Persistence, SaveRequest, SaveResponse};
use reqwest::header::COOKIE;
use serde::{Deserialize, Serialize};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Dataset server API client (blocking).
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::blocking::Client,
    base_url: String,
    session_cookie: Option<String>,
}

/// Error type for server calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Could not reach the server (or build the client)
    Network(String),
    /// Non-2xx status with the server's message (or raw body)
    Http(u16, String),
    /// Response body was not the expected JSON
    Parse(String),
    /// Server answered `success: false`
    Rejected(String),
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Network(msg) => write!(f, "Network error: {}", msg),
            ClientError::Http(code, msg) => write!(f, "HTTP {}: {}", code, msg),
            ClientError::Parse(msg) => write!(f, "Parse error: {}", msg),
            ClientError::Rejected(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ClientError {}

/// Reply to the auxiliary actions (delete, forecast source, retrain).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: String,
}

#[derive(Serialize)]
struct TableBody<'a> {
    table: &'a str,
}

impl ApiClient {
    /// Client for `base_url` with the default timeout.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::new(base_url, DEFAULT_TIMEOUT)
    }

    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(format!("gridedit/{}", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session_cookie: None,
        })
    }

    /// Send this `Cookie` header value with every request.
    pub fn with_session_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.session_cookie = Some(cookie.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Submit an edited table.
    ///
    /// The body's `success` flag is left for the caller to judge.
    pub fn save_table(&self, request: &SaveRequest) -> Result<SaveResponse, ClientError> {
        log::debug!(
            "saving {} rows x {} columns to {}",
            request.debug_info.total_rows,
            request.debug_info.header_count,
            self.base_url
        );
        let resp = self.post_json("/api/save_table", request)?;
        resp.json::<SaveResponse>().map_err(|e| ClientError::Parse(e.to_string()))
    }

    /// Delete an uploaded table.
    pub fn delete_file(&self, table: &str) -> Result<String, ClientError> {
        self.action("/api/delete_file", &TableBody { table })
    }

    /// Use a table as the forecast data source.
    pub fn set_forecast_source(&self, table: &str) -> Result<String, ClientError> {
        self.action("/api/set_forecast_source", &TableBody { table })
    }

    /// Retrain the forecasting model.
    pub fn retrain_model(&self) -> Result<String, ClientError> {
        self.action("/api/retrain_model", &serde_json::json!({}))
    }

    /// POST an action and return the server's message on success.
    fn action<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<String, ClientError> {
        let resp = self.post_json(path, body)?;
        let reply: ActionResponse = resp.json().map_err(|e| ClientError::Parse(e.to_string()))?;
        if reply.success == Some(false) {
            log::warn!("{} rejected: {}", path, reply.message);
            return Err(ClientError::Rejected(reply.message));
        }
        log::info!("{}: {}", path, reply.message);
        Ok(reply.message)
    }

    fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::blocking::Response, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.http.post(&url).json(body);
        if let Some(cookie) = &self.session_cookie {
            req = req.header(COOKIE, cookie);
        }
        let response = req.send().map_err(|e| ClientError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ClientError::Http(status, error_message(&body)));
        }

        Ok(response)
    }
}

impl Persistence for ApiClient {
    type Error = ClientError;

    fn save_table(&self, request: &SaveRequest) -> Result<SaveResponse, ClientError> {
        ApiClient::save_table(self, request)
    }
}

/// Prefer the JSON `message` (or `error`) field of an error body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| {
            json.get("message")
                .or_else(|| json.get("error"))
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.trim().to_string())
}
