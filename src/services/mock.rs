use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::ApiError;
use crate::services::api::{AcademicApi, ApiResponse};

/// In-memory `AcademicApi` keyed by `"METHOD path"`. Unknown routes answer
/// 404; an offline mock fails every call with a connection error.
#[derive(Default)]
pub struct MockApi {
    routes: HashMap<String, ApiResponse>,
    offline: bool,
    calls: Mutex<Vec<String>>,
    bodies: Mutex<Vec<Value>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offline() -> Self {
        Self {
            offline: true,
            ..Default::default()
        }
    }

    pub fn route(mut self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.routes
            .insert(format!("{method} {path}"), ApiResponse::new(status, body));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn bodies(&self) -> Vec<Value> {
        self.bodies.lock().unwrap().clone()
    }

    fn respond(&self, method: &str, path: &str, call: String) -> Result<ApiResponse, ApiError> {
        self.calls.lock().unwrap().push(call);
        if self.offline {
            return Err(ApiError::Offline("connection refused".to_string()));
        }
        Ok(self
            .routes
            .get(&format!("{method} {path}"))
            .cloned()
            .unwrap_or_else(|| ApiResponse::new(404, r#"{"detail":"Not found."}"#)))
    }
}

#[async_trait]
impl AcademicApi for MockApi {
    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<ApiResponse, ApiError> {
        let call = if query.is_empty() {
            format!("GET {path}")
        } else {
            let qs: Vec<String> = query.iter().map(|(k, v)| format!("{k}={v}")).collect();
            format!("GET {path}?{}", qs.join("&"))
        };
        self.respond("GET", path, call)
    }

    async fn post(&self, path: &str, body: &Value) -> Result<ApiResponse, ApiError> {
        self.bodies.lock().unwrap().push(body.clone());
        self.respond("POST", path, format!("POST {path}"))
    }

    async fn delete(&self, path: &str) -> Result<ApiResponse, ApiError> {
        self.respond("DELETE", path, format!("DELETE {path}"))
    }
}
