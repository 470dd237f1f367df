use std::fmt;

use chrono::{DateTime, Duration, Utc};

/// Conservative validity window for an access token.
/// The service does not announce expiry; a run that outlives this is stale.
const TOKEN_EXPIRY_MINUTES: i64 = 60;

/// Session obtained from a successful login.
///
/// Owned by one pipeline run and passed explicitly to every service call.
/// Never written to disk.
#[derive(Clone)]
pub struct SessionToken {
    access_token: String,
    pub profile_id: String,
    pub profile_name: String,
    pub created_at: DateTime<Utc>,
}

impl SessionToken {
    pub fn new(
        access_token: impl Into<String>,
        profile_id: impl Into<String>,
        profile_name: impl Into<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            profile_id: profile_id.into(),
            profile_name: profile_name.into(),
            created_at: Utc::now(),
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.created_at + Duration::minutes(TOKEN_EXPIRY_MINUTES)
    }

    /// Cookie header expected by the realms service
    pub fn cookie_header(&self, game_version: &str) -> String {
        format!(
            "sid=token:{}:{}; user={}; version={}",
            self.access_token, self.profile_id, self.profile_name, game_version
        )
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionToken")
            .field("access_token", &"<redacted>")
            .field("profile_id", &self.profile_id)
            .field("profile_name", &self.profile_name)
            .field("created_at", &self.created_at)
            .finish()
    }
}
