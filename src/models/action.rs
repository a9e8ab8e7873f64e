use serde::Serialize;

/// Reply text paired with an HTTP-style status code.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ActionResult {
    pub message: String,
    pub status: u16,
}

impl ActionResult {
    pub fn new(message: impl Into<String>, status: u16) -> Self {
        Self {
            message: message.into(),
            status,
        }
    }

    pub fn ok(message: impl Into<String>) -> Self {
        Self::new(message, 200)
    }

    pub fn created(message: impl Into<String>) -> Self {
        Self::new(message, 201)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(message, 400)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(message, 404)
    }

    pub fn is_success(&self) -> bool {
        (200..400).contains(&self.status) || self.status == 204
    }
}
