//! Authentication-related data models.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The single credential pair used to log in to the upstream API.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Body sent to the login endpoint
    pub fn to_login_request(&self) -> LoginRequest {
        LoginRequest {
            email: self.username.clone(),
            password: self.password.clone(),
        }
    }
}

// Never print the password, not even in debug logs
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Request model for the upstream login endpoint
#[derive(Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response model of the upstream login endpoint.
///
/// Only `token` is read; any other fields are ignored.
#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_password() {
        let credentials = Credentials::new("api@example.com", "hunter2");
        let printed = format!("{credentials:?}");

        assert!(printed.contains("api@example.com"));
        assert!(!printed.contains("hunter2"));
    }

    #[test]
    fn test_login_request_uses_email_key() {
        let credentials = Credentials::new("api@example.com", "hunter2");
        let json = serde_json::to_value(credentials.to_login_request()).unwrap();

        assert_eq!(
            json,
            serde_json::json!({"email": "api@example.com", "password": "hunter2"})
        );
    }
}
