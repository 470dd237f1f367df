//! Data models for the account and realms services.
//!
//! - `Realm`: a hosted world descriptor
//! - Wire responses: `RealmsResponse`, `BackupDownload`, `AuthResponse`

pub mod realm;

pub use realm::{AuthErrorBody, AuthResponse, BackupDownload, GameProfile, Realm, RealmsResponse};
