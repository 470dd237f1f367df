//! HTTP client for the account and realms services.
//!
//! Authentication posts the operator's credentials once and yields a
//! `SessionToken`; every later call carries that token in the realms session
//! cookie.

use std::path::Path;
use std::time::Duration;

use reqwest::{header, Client};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, info, warn};

use super::{ApiError, RealmService};
use crate::archive::{self, Archive, ProgressCallback};
use crate::auth::{Credentials, SessionToken};
use crate::config::ServiceConfig;
use crate::error::{RealmError, RealmResult};
use crate::models::{AuthErrorBody, AuthResponse, BackupDownload, Realm, RealmsResponse};

// ============================================================================
// Constants
// ============================================================================

/// Agent announced to the authentication service
const AGENT_NAME: &str = "Minecraft";
const AGENT_VERSION: u32 = 1;

/// Connection establishment timeout in seconds.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

const USER_AGENT: &str = concat!("download-realm/", env!("CARGO_PKG_VERSION"));

/// Client for the realms service.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct RealmsClient {
    client: Client,
    download_client: Client,
    service: ServiceConfig,
    initial_backoff: Duration,
}

impl RealmsClient {
    pub fn new(service: &ServiceConfig) -> RealmResult<Self> {
        let build = |timeout_secs: u64| {
            Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
                .user_agent(USER_AGENT)
                .build()
                .map_err(|e| {
                    RealmError::Configuration(format!("failed to build HTTP client: {}", e))
                })
        };

        Ok(Self {
            client: build(service.timeout_secs)?,
            download_client: build(service.download_timeout_secs)?,
            service: service.clone(),
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
        })
    }

    /// Check if response is successful, returning an error with body if not.
    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit (should retry),
    /// or Err for other errors.
    async fn check_response_for_retry(
        response: reqwest::Response,
    ) -> Result<Option<reqwest::Response>, ApiError> {
        if response.status().is_success() {
            Ok(Some(response))
        } else if response.status().as_u16() == 429 {
            Ok(None)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        session: &SessionToken,
    ) -> Result<T, ApiError> {
        let mut retries = 0;
        let mut backoff = self.initial_backoff;
        let cookie = session.cookie_header(&self.service.game_version);

        loop {
            let response = self
                .client
                .get(url)
                .header(header::COOKIE, &cookie)
                .send()
                .await?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => {
                    let text = response.text().await?;
                    return serde_json::from_str(&text).map_err(|e| {
                        ApiError::InvalidResponse(format!("unexpected JSON from {}: {}", url, e))
                    });
                }
                None => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited);
                    }
                    warn!(
                        url = url,
                        retry = retries,
                        backoff_ms = backoff.as_millis() as u64,
                        "Rate limited, backing off"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2; // Exponential backoff
                }
            }
        }
    }

    fn backup_url(&self, realm: &Realm, slot: u8) -> String {
        format!(
            "{}/{}/slot/{}/download",
            self.service.realms_url.trim_end_matches('/'),
            realm.id,
            slot
        )
    }

    /// Resolve the download link for the latest backup of a slot
    pub async fn fetch_download_link(
        &self,
        session: &SessionToken,
        realm: &Realm,
        slot: u8,
    ) -> RealmResult<String> {
        let url = self.backup_url(realm, slot);
        let backup: BackupDownload = self.get(&url, session).await.map_err(|e| match e {
            ApiError::NotFound(_) => RealmError::Download(format!(
                "no backup available for {} slot {}",
                realm.label(),
                slot
            )),
            other => other.into_download(),
        })?;

        backup
            .download_link
            .filter(|link| !link.is_empty())
            .ok_or_else(|| {
                RealmError::Download(format!(
                    "service returned no download link for {} slot {}",
                    realm.label(),
                    slot
                ))
            })
    }

    fn describe_auth_failure(status: reqwest::StatusCode, body: &str) -> ApiError {
        let err = ApiError::from_status(status, body);
        if err.is_auth_rejection() {
            return err;
        }
        // Prefer the service's own explanation when it sends one
        match serde_json::from_str::<AuthErrorBody>(body) {
            Ok(AuthErrorBody { error_message: Some(msg), .. }) => ApiError::InvalidResponse(msg),
            _ => err,
        }
    }
}

impl RealmService for RealmsClient {
    async fn authenticate(&self, credentials: &Credentials) -> RealmResult<SessionToken> {
        let payload = json!({
            "username": credentials.email(),
            "password": credentials.password(),
            "clientToken": self.service.client_token,
            "agent": { "name": AGENT_NAME, "version": AGENT_VERSION },
        });

        let response = self
            .client
            .post(&self.service.auth_url)
            .header(header::ACCEPT, "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                RealmError::Authentication(credentials.scrub(&format!(
                    "could not reach authentication service: {}",
                    e
                )))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = Self::describe_auth_failure(status, &body);
            debug!(%status, "Authentication rejected");
            return Err(match err.into_authentication() {
                RealmError::Authentication(msg) => {
                    RealmError::Authentication(credentials.scrub(&msg))
                }
                other => other,
            });
        }

        let auth: AuthResponse = response.json().await.map_err(|e| {
            RealmError::Authentication(format!("unexpected authentication response: {}", e))
        })?;

        let profile = auth.selected_profile.ok_or_else(|| {
            RealmError::Authentication("account has no game profile".to_string())
        })?;

        info!(profile = %profile.name, "Authenticated");
        Ok(SessionToken::new(auth.access_token, profile.id, profile.name))
    }

    async fn list_realms(&self, session: &SessionToken) -> RealmResult<Vec<Realm>> {
        let response: RealmsResponse = self
            .get(&self.service.realms_url, session)
            .await
            .map_err(|e| match e {
                ApiError::Unauthorized => {
                    RealmError::Service("realms service rejected the session".to_string())
                }
                other => other.into_service(),
            })?;

        debug!(count = response.servers.len(), "Realms listed");
        Ok(response.servers)
    }

    async fn download_archive(
        &self,
        session: &SessionToken,
        realm: &Realm,
        slot: u8,
        destination: &Path,
        progress: Option<&ProgressCallback>,
    ) -> RealmResult<Archive> {
        let link = self.fetch_download_link(session, realm, slot).await?;
        archive::download_to(&self.download_client, &link, destination, progress).await
    }
}
