//! Command-line arguments and how they override the configuration file.

use std::path::PathBuf;

use clap::Parser;
use realmdl_core::Config;

/// Download the latest backup of a hosted realm and render it into a map.
#[derive(Debug, Parser)]
#[command(name = "download-realm", version, about)]
pub struct Cli {
    /// Account email address
    pub email: String,

    /// Account password (prompted for when omitted)
    #[arg(env = "REALM_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Configuration file (default: <config dir>/download-realm/config.json)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Realm to download, by name or id
    #[arg(short, long, value_name = "NAME|ID")]
    pub realm: Option<String>,

    /// Prompt for the realm when several exist
    #[arg(short, long)]
    pub interactive: bool,

    /// Backup slot to download
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u8).range(1..=4))]
    pub slot: Option<u8>,

    /// Where to write the archive
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Directory to extract the world into
    #[arg(long, value_name = "PATH")]
    pub extract_dir: Option<PathBuf>,

    /// Stop after extraction
    #[arg(long)]
    pub no_render: bool,

    /// List realms and exit
    #[arg(short, long)]
    pub list: bool,

    /// Timeout for API calls, in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Also write logs to this file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// CLI values take precedence over the file
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(ref realm) = self.realm {
            config.realm.select = Some(realm.clone());
        }
        if let Some(slot) = self.slot {
            config.realm.slot = slot;
        }
        if let Some(ref output) = self.output {
            config.archive.output = output.clone();
        }
        if let Some(ref dir) = self.extract_dir {
            config.archive.extract_dir = dir.clone();
        }
        if let Some(secs) = self.timeout {
            config.service.timeout_secs = secs;
        }
        if self.no_render {
            config.renderer.enabled = false;
        }
    }
}
