//! Stage-level error taxonomy for the download pipeline.
//!
//! Every failure in the pipeline is fatal. Each variant names the stage that
//! failed and carries a message that is safe to show to the operator: no
//! credential material ever reaches these strings.

use thiserror::Error;

pub type RealmResult<T> = Result<T, RealmError>;

/// How the operator resolves an ambiguous selection
const SELECTION_HINT: &str = "pass --realm, set realm.select in the config, or use --interactive";

#[derive(Error, Debug)]
pub enum RealmError {
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("realm service error: {0}")]
    Service(String),

    #[error(
        "ambiguous realm selection: {} realms available ({}); {}",
        .available.len(),
        .available.join(", "),
        SELECTION_HINT
    )]
    AmbiguousRealm { available: Vec<String> },

    #[error("download failed: {0}")]
    Download(String),

    #[error("extraction failed: {0}")]
    Extraction(String),

    #[error("{stage} failed: {message}")]
    Render { stage: &'static str, message: String },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("cancelled by operator")]
    Cancelled,
}

impl RealmError {
    pub fn render(message: impl Into<String>) -> Self {
        RealmError::Render {
            stage: "render",
            message: message.into(),
        }
    }

    pub fn publish(message: impl Into<String>) -> Self {
        RealmError::Render {
            stage: "publish",
            message: message.into(),
        }
    }

    /// Name of the pipeline stage that produced this error
    pub fn stage(&self) -> &'static str {
        match self {
            RealmError::Authentication(_) => "authenticate",
            RealmError::Service(_) => "list-realms",
            RealmError::AmbiguousRealm { .. } => "select-realm",
            RealmError::Download(_) => "download",
            RealmError::Extraction(_) => "extract",
            RealmError::Render { stage, .. } => stage,
            RealmError::Configuration(_) => "configuration",
            RealmError::Cancelled => "cancelled",
        }
    }

    /// Process exit status for this failure
    pub fn exit_code(&self) -> u8 {
        match self {
            RealmError::Configuration(_) | RealmError::AmbiguousRealm { .. } => 2,
            RealmError::Authentication(_) => 3,
            RealmError::Service(_) => 4,
            RealmError::Download(_) => 5,
            RealmError::Extraction(_) => 6,
            RealmError::Render { .. } => 7,
            RealmError::Cancelled => 130,
        }
    }
}
