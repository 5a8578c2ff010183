use serde::{Deserialize, Serialize};

/// Uniform response envelope used by every endpoint of the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Best human-readable description of a failed envelope.
    /// Prefers `message`, then `error`, then the supplied fallback.
    pub fn failure_message(&self, fallback: &str) -> String {
        if !self.message.trim().is_empty() {
            self.message.clone()
        } else if let Some(ref error) = self.error {
            error.clone()
        } else {
            fallback.to_string()
        }
    }
}

/// Envelope body for endpoints that return no data
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Empty {}
