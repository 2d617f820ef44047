//! Data Transfer Objects - query strings and auth payloads.

use serde::{Deserialize, Serialize};

/// `?page=N` on every paginated view. Kept raw so that junk falls back to page 1.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: Option<String>,
}

impl PageQuery {
    pub fn page_param(&self) -> Option<&str> {
        self.page.as_deref()
    }
}

/// `?next=/path/` carried through the login flow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NextQuery {
    #[serde(default)]
    pub next: Option<String>,
}

/// Response containing the issued access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    /// Where the client is sent next.
    pub redirect_to: String,
}

/// Liveness document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: String,
}
