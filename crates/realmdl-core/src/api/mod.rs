//! Realms service access.
//!
//! `RealmService` is the seam the pipeline talks to; `RealmsClient` is the
//! HTTP implementation. The service issues a session token from an email and
//! password, lists the account's realms, and hands out short-lived download
//! links for world backups.

pub mod client;
pub mod error;

use std::path::Path;

pub use client::RealmsClient;
pub use error::ApiError;

use crate::archive::{Archive, ProgressCallback};
use crate::auth::{Credentials, SessionToken};
use crate::error::RealmResult;
use crate::models::Realm;

/// Operations the download pipeline needs from the account service.
#[allow(async_fn_in_trait)]
pub trait RealmService {
    async fn authenticate(&self, credentials: &Credentials) -> RealmResult<SessionToken>;

    async fn list_realms(&self, session: &SessionToken) -> RealmResult<Vec<Realm>>;

    /// Download the latest backup of `slot` to `destination`, overwriting it
    async fn download_archive(
        &self,
        session: &SessionToken,
        realm: &Realm,
        slot: u8,
        destination: &Path,
        progress: Option<&ProgressCallback>,
    ) -> RealmResult<Archive>;
}
