//! Application configuration management.
//!
//! The configuration names the service endpoints, the realm to download, where
//! the archive and extracted world go, how to run the renderer, and the
//! optional ssh hosts used for remote rendering and map publishing.
//!
//! Configuration is read from `~/.config/download-realm/config.json` unless a
//! path is given explicitly. The tool never writes it.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RealmError, RealmResult};
use crate::transport::SshTarget;

/// Application name used for the config directory path
const APP_NAME: &str = "download-realm";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const DEFAULT_AUTH_URL: &str = "https://authserver.mojang.com/authenticate";
const DEFAULT_REALMS_URL: &str = "https://pc.realms.minecraft.net/worlds";
const DEFAULT_CLIENT_TOKEN: &str = "download-realm";
const DEFAULT_GAME_VERSION: &str = "1.16.5";

/// HTTP request timeout for API calls in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Timeout for the whole archive transfer in seconds.
const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 600;

/// Realms expose three world slots plus a minigame slot.
const MAX_SLOT: u8 = 4;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub realm: RealmConfig,
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub renderer: RendererConfig,
    #[serde(default)]
    pub remote: Option<RemoteConfig>,
    #[serde(default)]
    pub publish: Option<PublishConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub auth_url: String,
    pub realms_url: String,
    pub client_token: String,
    pub game_version: String,
    pub timeout_secs: u64,
    pub download_timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            auth_url: DEFAULT_AUTH_URL.to_string(),
            realms_url: DEFAULT_REALMS_URL.to_string(),
            client_token: DEFAULT_CLIENT_TOKEN.to_string(),
            game_version: DEFAULT_GAME_VERSION.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            download_timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RealmConfig {
    /// Realm name or id; required when the account has several realms
    pub select: Option<String>,
    /// World slot whose latest backup is downloaded
    pub slot: u8,
}

impl Default for RealmConfig {
    fn default() -> Self {
        Self { select: None, slot: 1 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    pub output: PathBuf,
    pub extract_dir: PathBuf,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from("world.tar.gz"),
            extract_dir: PathBuf::from("."),
        }
    }
}

/// How to invoke the external renderer.
///
/// Each pass is one invocation; `{config}` and `{world}` in its arguments are
/// replaced with the config file and world directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub enabled: bool,
    pub command: String,
    pub config_file: PathBuf,
    pub passes: Vec<Vec<String>>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: "overviewer.py".to_string(),
            config_file: PathBuf::from("config.py"),
            passes: vec![
                vec!["--config={config}".to_string()],
                vec!["--config={config}".to_string(), "--genpoi".to_string()],
            ],
        }
    }
}

/// Render on a remote host instead of locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(flatten)]
    pub ssh: SshTarget,
    /// Directory on the host that receives the world
    pub remote_dir: String,
}

/// Upload the locally rendered map to a web host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishConfig {
    pub map_dir: PathBuf,
    #[serde(flatten)]
    pub ssh: SshTarget,
    pub destination: String,
}

impl Config {
    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, the default location is used
    /// and a missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> RealmResult<Self> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (Self::default_path()?, false),
        };

        if !path.exists() {
            if required {
                return Err(RealmError::Configuration(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&path).map_err(|e| {
            RealmError::Configuration(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config: Config = serde_json::from_str(&contents).map_err(|e| {
            RealmError::Configuration(format!("failed to parse {}: {}", path.display(), e))
        })?;
        debug!(path = %path.display(), "Config loaded");
        Ok(config)
    }

    pub fn default_path() -> RealmResult<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            RealmError::Configuration("could not find config directory".to_string())
        })?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Check values that would otherwise fail late in the pipeline
    pub fn validate(&self) -> RealmResult<()> {
        let fail = |msg: String| -> RealmResult<()> { Err(RealmError::Configuration(msg)) };

        for (name, url) in [
            ("service.auth_url", &self.service.auth_url),
            ("service.realms_url", &self.service.realms_url),
        ] {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return fail(format!("{} must be an http(s) URL, got `{}`", name, url));
            }
        }
        if self.service.timeout_secs == 0 || self.service.download_timeout_secs == 0 {
            return fail("service timeouts must be greater than zero".to_string());
        }
        if !(1..=MAX_SLOT).contains(&self.realm.slot) {
            return fail(format!(
                "realm.slot must be between 1 and {}, got {}",
                MAX_SLOT, self.realm.slot
            ));
        }
        if self.archive.output.as_os_str().is_empty() {
            return fail("archive.output must not be empty".to_string());
        }

        if self.renderer.enabled {
            if self.renderer.command.trim().is_empty() {
                return fail("renderer.command must not be empty".to_string());
            }
            if self.renderer.passes.is_empty() {
                return fail("renderer.passes must contain at least one pass".to_string());
            }
        }

        if let Some(ref remote) = self.remote {
            remote.ssh.validate("remote")?;
            if remote.remote_dir.trim().is_empty() {
                return fail("remote.remote_dir must not be empty".to_string());
            }
        }

        if let Some(ref publish) = self.publish {
            publish.ssh.validate("publish")?;
            if publish.destination.trim().is_empty() {
                return fail("publish.destination must not be empty".to_string());
            }
            if self.remote.is_some() {
                return fail(concat!(
                    "publish uploads a locally rendered map; ",
                    "it cannot be combined with remote rendering"
                )
                .to_string());
            }
        }

        Ok(())
    }
}
