use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::preferences::{PreferenceDocument, PreferenceProfile};

/// Opaque bearer token issued by the service
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value of the `Authorization` header
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Account record returned by the auth endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(alias = "internal_user_id")]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<String>,
    #[serde(flatten)]
    pub profile: PreferenceProfile,
}

impl User {
    pub fn quiz_responses(&self) -> &PreferenceDocument {
        self.profile.quiz_responses()
    }

    /// Calendar date the account was created.
    ///
    /// The service emits ISO-8601 timestamps with or without a UTC offset.
    pub fn member_since(&self) -> Option<NaiveDate> {
        let raw = self.created_at.as_deref()?;
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.date_naive())
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|dt| dt.date()))
            .ok()
    }
}

/// Authenticated identity: token and user are only ever present together
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: AccessToken,
    pub user: User,
}

/// Response of both login and signup
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    #[serde(alias = "token")]
    pub access_token: AccessToken,
    pub user: User,
}

impl From<AuthResponse> for Session {
    fn from(response: AuthResponse) -> Self {
        Session {
            token: response.access_token,
            user: response.user,
        }
    }
}

#[derive(Clone, PartialEq, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

/// Signup payload; only constructible with a completed preference document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignupRequest {
    #[serde(flatten)]
    pub credentials: Credentials,
    pub name: String,
    pub quiz_responses: PreferenceDocument,
}
