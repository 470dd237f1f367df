use std::fmt;

use crate::error::{RealmError, RealmResult};
use crate::utils::redact;

/// Account credentials for a single run.
///
/// Held only in memory for the authentication call. `Debug` never shows the
/// password, and shows only the domain of the email.
#[derive(Clone)]
pub struct Credentials {
    email: String,
    password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> RealmResult<Self> {
        let email = email.into().trim().to_string();
        let password = password.into();

        if email.is_empty() {
            return Err(RealmError::Authentication("email must not be empty".to_string()));
        }
        if password.is_empty() {
            return Err(RealmError::Authentication("password must not be empty".to_string()));
        }

        Ok(Self { email, password })
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// Remove any occurrence of the email or password from a diagnostic string
    pub fn scrub(&self, message: &str) -> String {
        redact(message, &[&self.password, &self.email])
    }
}

/// `***@example.com`, or `<redacted>` when there is no domain
fn masked_email(email: &str) -> String {
    match email.rsplit_once('@') {
        Some((_, domain)) if !domain.is_empty() => format!("***@{}", domain),
        _ => "<redacted>".to_string(),
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &masked_email(&self.email))
            .field("password", &"<redacted>")
            .finish()
    }
}
