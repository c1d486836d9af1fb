//! Saved browser session for X.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::browser::StoredCookie;
use crate::error::Result;

/// Cookie name X uses for the long-lived login.
pub const AUTH_COOKIE: &str = "auth_token";

/// Cookies captured after a successful login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Browser cookies for x.com.
    pub cookies: Vec<StoredCookie>,
    /// When this session was created.
    pub created_at: DateTime<Utc>,
    /// When this session was last confirmed to still be logged in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_validated: Option<DateTime<Utc>>,
}

impl Session {
    /// Create a session from captured cookies.
    #[must_use]
    pub fn new(cookies: Vec<StoredCookie>) -> Self {
        Self {
            cookies,
            created_at: Utc::now(),
            last_validated: None,
        }
    }

    /// Load session from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let session: Self = serde_json::from_str(&content)?;
        Ok(session)
    }

    /// Save session to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// The `auth_token` cookie value, if captured.
    #[must_use]
    pub fn auth_token(&self) -> Option<&str> {
        self.cookies
            .iter()
            .find(|c| c.name == AUTH_COOKIE)
            .map(|c| c.value.as_str())
    }

    /// Whether the session carries the login cookie at all.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.auth_token().is_some_and(|t| !t.is_empty())
    }

    /// Mark the session as validated.
    pub fn mark_validated(&mut self) {
        self.last_validated = Some(Utc::now());
    }
}
