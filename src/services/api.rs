use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::ApiError;

/// Status and raw body of a records API response. Non-2xx statuses are
/// returned as-is so callers can react to specific codes.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Converts a non-2xx response into `ApiError::Rejected`.
    pub fn error_for_status(self) -> Result<Self, ApiError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ApiError::Rejected {
                status: self.status,
                body: self.body,
            })
        }
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_str(&self.body)
            .map_err(|e| ApiError::Transport(format!("invalid JSON from records API: {e}")))
    }
}

/// REST access to the academic records backend. Paths are relative to the
/// API root, e.g. `materias/` or `reservas/5/`.
#[async_trait]
pub trait AcademicApi: Send + Sync {
    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<ApiResponse, ApiError>;
    async fn post(&self, path: &str, body: &Value) -> Result<ApiResponse, ApiError>;
    async fn delete(&self, path: &str) -> Result<ApiResponse, ApiError>;
}

pub struct RestClient {
    base_url: String,
    client: reqwest::Client,
}

impl RestClient {
    pub fn new(base_url: String) -> Self {
        let base_url = if base_url.ends_with('/') {
            base_url
        } else {
            format!("{base_url}/")
        };
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn read(resp: reqwest::Response) -> Result<ApiResponse, ApiError> {
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        Ok(ApiResponse { status, body })
    }
}

#[async_trait]
impl AcademicApi for RestClient {
    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<ApiResponse, ApiError> {
        let resp = self.client.get(self.url(path)).query(query).send().await?;
        Self::read(resp).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<ApiResponse, ApiError> {
        let resp = self.client.post(self.url(path)).json(body).send().await?;
        Self::read(resp).await
    }

    async fn delete(&self, path: &str) -> Result<ApiResponse, ApiError> {
        let resp = self.client.delete(self.url(path)).send().await?;
        Self::read(resp).await
    }
}
