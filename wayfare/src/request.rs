//! Inbound request and authentication state.

use serde_json::Value;
use wayfare_core::Fields;

/// What the transport hands to the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Extra path after the script, e.g. `/signup`.
    pub path_info: String,
    /// HTTP method, upper case.
    pub method: String,
    /// Submitted fields.
    pub form: Fields,
}

impl Default for Request {
    fn default() -> Self {
        Self::get("")
    }
}

impl Request {
    /// A `GET` request with no fields.
    pub fn get(path_info: impl Into<String>) -> Self {
        Self {
            path_info: path_info.into(),
            method: "GET".to_string(),
            form: Fields::new(),
        }
    }

    /// A `POST` request carrying `form`.
    pub fn post(path_info: impl Into<String>, form: Fields) -> Self {
        Self {
            path_info: path_info.into(),
            method: "POST".to_string(),
            form,
        }
    }

    /// Add one field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.form.insert(key.into(), value.into());
        self
    }
}

/// Result of an authentication attempt.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    /// The authenticated (or attempted) user.
    pub user: Option<String>,
    /// Why authentication failed.
    pub error: Option<String>,
    /// Anything else the auth hooks want to keep.
    pub data: Fields,
}

impl AuthState {
    /// A successful login for `user`.
    pub fn valid(user: impl Into<String>) -> Self {
        Self {
            user: Some(user.into()),
            ..Self::default()
        }
    }

    /// A failed attempt.
    pub fn failed(user: Option<String>, error: impl Into<String>) -> Self {
        Self {
            user,
            error: Some(error.into()),
            data: Fields::new(),
        }
    }

    /// Whether this state grants access.
    pub fn is_valid(&self) -> bool {
        self.user.is_some() && self.error.is_none()
    }
}
