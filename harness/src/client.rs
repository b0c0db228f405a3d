//! Thin HTTP client for the defect-tracker API.
//!
//! Every call returns the raw status code and decoded JSON body rather than a
//! typed record: the contract scenarios assert on exactly those two things,
//! including for error responses.

use crate::config::HarnessConfig;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use validators::safe_json_parse;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Status code and body of one API response. Bodies that are empty or not
/// JSON decode to `Value::Null`.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiResponse {
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }
}

/// Query parameters accepted by `GET /api/defects`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DefectQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

impl DefectQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = Some(priority.into());
        self
    }

    pub fn with_page(mut self, page: u32, page_size: u32) -> Self {
        self.page = Some(page);
        self.page_size = Some(page_size);
        self
    }
}

/// Body of `POST /api/defects`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDefect {
    pub project_id: String,
    pub title: String,
    pub description: String,
    pub priority: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http_client: reqwest::Client,
    api_base: String,
}

impl ApiClient {
    pub fn new(config: &HarnessConfig) -> ApiResult<Self> {
        Self::with_timeout(config.api_base(), config.request_timeout())
    }

    /// Client rooted at `api_base` (the URL ending in `/api`).
    pub fn with_timeout(api_base: impl Into<String>, timeout: Duration) -> ApiResult<Self> {
        let api_base = api_base.into().trim_end_matches('/').to_string();
        if api_base.is_empty() {
            return Err(ApiError::InvalidConfig {
                message: "API base URL cannot be empty".to_string(),
            });
        }

        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::InvalidConfig {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            http_client,
            api_base,
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Value for the `Authorization` header the service expects.
    pub fn bearer(user_id: &str) -> String {
        format!("Bearer {}", user_id)
    }

    fn url(&self, route: &str) -> String {
        format!("{}/{}", self.api_base, route.trim_start_matches('/'))
    }

    fn request(&self, method: Method, route: &str, auth: Option<&str>) -> RequestBuilder {
        let builder = self.http_client.request(method, self.url(route));
        match auth {
            Some(user_id) => {
                builder.header(reqwest::header::AUTHORIZATION, Self::bearer(user_id))
            }
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> ApiResult<ApiResponse> {
        let response = builder.send().await?;
        let status = response.status();
        let url = response.url().to_string();
        let text = response.text().await?;
        debug!("{} <- {}", status, url);
        Ok(ApiResponse {
            status,
            body: safe_json_parse(Some(text.as_str()), Value::Null),
        })
    }

    /// `GET` an arbitrary route below the API root, optionally authenticated.
    pub async fn get(&self, route: &str, auth: Option<&str>) -> ApiResult<ApiResponse> {
        self.send(self.request(Method::GET, route, auth)).await
    }

    /// Single probe used by the readiness poll, bounded by its own timeout.
    pub async fn probe(&self, route: &str, timeout: Duration) -> ApiResult<StatusCode> {
        let response = self
            .request(Method::GET, route, None)
            .timeout(timeout)
            .send()
            .await?;
        Ok(response.status())
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        role: Option<&str>,
    ) -> ApiResult<ApiResponse> {
        let mut body = json!({ "email": email, "password": password });
        if let Some(role) = role {
            body["role"] = json!(role);
        }
        self.send(self.request(Method::POST, "register", None).json(&body))
            .await
    }

    pub async fn login(&self, email: &str, password: &str) -> ApiResult<ApiResponse> {
        let body = json!({ "email": email, "password": password });
        self.send(self.request(Method::POST, "login", None).json(&body))
            .await
    }

    pub async fn projects(&self, auth: Option<&str>) -> ApiResult<ApiResponse> {
        self.get("projects", auth).await
    }

    pub async fn defects(
        &self,
        query: &DefectQuery,
        auth: Option<&str>,
    ) -> ApiResult<ApiResponse> {
        self.send(self.request(Method::GET, "defects", auth).query(query))
            .await
    }

    pub async fn create_defect(
        &self,
        defect: &NewDefect,
        auth: Option<&str>,
    ) -> ApiResult<ApiResponse> {
        self.send(self.request(Method::POST, "defects", auth).json(defect))
            .await
    }

    pub async fn defect(&self, id: &str, auth: Option<&str>) -> ApiResult<ApiResponse> {
        self.get(&format!("defects/{}", id), auth).await
    }

    /// Partial update: only the keys present in `changes` are sent.
    pub async fn update_defect(
        &self,
        id: &str,
        changes: &Value,
        auth: Option<&str>,
    ) -> ApiResult<ApiResponse> {
        self.send(
            self.request(Method::PATCH, &format!("defects/{}", id), auth)
                .json(changes),
        )
        .await
    }

    pub async fn stats(&self, auth: Option<&str>) -> ApiResult<ApiResponse> {
        self.get("defects/stats", auth).await
    }

    pub async fn users(&self, auth: Option<&str>) -> ApiResult<ApiResponse> {
        self.get("users", auth).await
    }

    pub async fn engineers(&self, auth: Option<&str>) -> ApiResult<ApiResponse> {
        self.get("users/engineers", auth).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::with_timeout(format!("{}/api", server.uri()), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_client_rejects_empty_base() {
        let result = ApiClient::with_timeout("", Duration::from_secs(1));
        assert!(matches!(result, Err(ApiError::InvalidConfig { .. })));
    }

    #[test]
    fn test_client_from_config() {
        let config = HarnessConfig::default().with_base_url("http://localhost:8080/");
        let client = ApiClient::new(&config).unwrap();
        assert_eq!(client.api_base(), "http://localhost:8080/api");
        assert_eq!(
            client.url("/defects/stats"),
            "http://localhost:8080/api/defects/stats"
        );
        assert_eq!(ApiClient::bearer("u1"), "Bearer u1");
    }

    #[test]
    fn test_defect_query_serializes_camel_case() {
        let query = DefectQuery::new().with_status("new").with_page(1, 5);
        let value = serde_json::to_value(&query).unwrap();
        assert_eq!(value, json!({"status": "new", "page": 1, "pageSize": 5}));
    }

    #[tokio::test]
    async fn test_login_sends_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/login"))
            .and(body_json(json!({"email": "a@example.com", "password": "secret1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "user": {"id": 7, "email": "a@example.com", "role": "user"}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let response = client.login("a@example.com", "secret1").await.unwrap();
        assert_eq!(response.status_code(), 200);
        assert_eq!(response.body["user"]["id"], 7);
    }

    #[tokio::test]
    async fn test_authorization_header_and_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/defects"))
            .and(header("authorization", "Bearer 42"))
            .and(query_param("priority", "high"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [], "total": 0, "page": 1, "pageSize": 20
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let query = DefectQuery::new().with_priority("high");
        let response = client.defects(&query, Some("42")).await.unwrap();
        assert_eq!(response.status_code(), 200);
        assert_eq!(response.body["total"], 0);
    }

    #[tokio::test]
    async fn test_non_json_body_decodes_to_null() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/projects"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let response = client.projects(None).await.unwrap();
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert!(response.body.is_null());
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        // nothing listens on port 9 (discard) in test environments
        let client =
            ApiClient::with_timeout("http://127.0.0.1:9/api", Duration::from_secs(2)).unwrap();
        let result = client.projects(None).await;
        assert!(matches!(result, Err(ApiError::Network(_))));
    }
}
