//! Core library for download-realm.
//!
//! Logs into the realms account service, downloads the latest backup of a
//! hosted realm, extracts it, and hands the world to an external map renderer
//! running locally or on an ssh host.

pub mod api;
pub mod archive;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod publish;
pub mod render;
pub mod selection;
pub mod transport;
pub mod utils;

#[cfg(test)]
mod testing;

pub use api::{RealmService, RealmsClient};
pub use archive::Archive;
pub use auth::{Credentials, SessionToken};
pub use config::Config;
pub use error::{RealmError, RealmResult};
pub use models::Realm;
pub use pipeline::{PipelineEvent, RealmDownloader, RunReport};
pub use render::{ConfiguredRenderer, Renderer};
pub use selection::{RealmPrompt, RealmSelector, SelectionPolicy};
