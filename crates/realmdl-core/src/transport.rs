//! ssh and rsync invocation.
//!
//! The remote shell is only a transport: the world is pushed with
//! `rsync -e ssh` and commands run through `ssh` in batch mode, so a missing
//! key fails immediately instead of waiting on a password prompt.

use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::error::{RealmError, RealmResult};
use crate::utils::shell_quote;

/// Seconds allowed for the ssh connection handshake.
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Exit status ssh reports when the connection itself failed.
pub const SSH_CONNECTION_FAILURE: i32 = 255;

fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

fn default_ssh_command() -> String {
    "ssh".to_string()
}

fn default_rsync_command() -> String {
    "rsync".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SshTarget {
    pub host: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub identity_file: Option<PathBuf>,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// ssh client to run, by name or path
    #[serde(default = "default_ssh_command")]
    pub ssh_command: String,
    #[serde(default = "default_rsync_command")]
    pub rsync_command: String,
}

impl SshTarget {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            user: None,
            port: None,
            identity_file: None,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            ssh_command: default_ssh_command(),
            rsync_command: default_rsync_command(),
        }
    }

    pub fn validate(&self, section: &str) -> RealmResult<()> {
        if self.host.trim().is_empty() {
            return Err(RealmError::Configuration(format!(
                "{}.host must not be empty",
                section
            )));
        }
        if self.connect_timeout_secs == 0 {
            return Err(RealmError::Configuration(format!(
                "{}.connect_timeout_secs must be greater than zero",
                section
            )));
        }
        if self.ssh_command.trim().is_empty() || self.rsync_command.trim().is_empty() {
            return Err(RealmError::Configuration(format!(
                "{}.ssh_command and {}.rsync_command must not be empty",
                section, section
            )));
        }
        Ok(())
    }

    /// Check that the ssh and rsync programs can be found
    pub fn require_tools(&self) -> RealmResult<()> {
        require_tool(&self.ssh_command)?;
        require_tool(&self.rsync_command)?;
        Ok(())
    }

    /// `user@host`, or just `host` when no user is configured
    pub fn destination(&self) -> String {
        match self.user {
            Some(ref user) if !user.is_empty() => format!("{}@{}", user, self.host),
            _ => self.host.clone(),
        }
    }

    fn ssh_options(&self) -> Vec<String> {
        let mut opts = vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.connect_timeout_secs),
        ];
        if let Some(port) = self.port {
            opts.push("-p".to_string());
            opts.push(port.to_string());
        }
        if let Some(ref key) = self.identity_file {
            opts.push("-i".to_string());
            opts.push(key.to_string_lossy().into_owned());
        }
        opts
    }

    /// Arguments for `ssh` running `remote_command` on the host
    pub fn ssh_args(&self, remote_command: &str) -> Vec<String> {
        let mut args = self.ssh_options();
        args.push(self.destination());
        args.push(remote_command.to_string());
        args
    }

    /// Remote shell string for rsync's `-e`
    pub fn rsync_shell(&self) -> String {
        let mut parts = vec![shell_quote(&self.ssh_command)];
        parts.extend(self.ssh_options().iter().map(|o| shell_quote(o)));
        parts.join(" ")
    }

    /// Arguments for `rsync` pushing `source` to `remote_path` on the host.
    ///
    /// With `contents_only` the trailing slash form is used, so the contents of
    /// `source` land directly in `remote_path`.
    pub fn rsync_args(
        &self,
        source: &Path,
        remote_path: &str,
        contents_only: bool,
    ) -> Vec<String> {
        let mut source = source.to_string_lossy().into_owned();
        if contents_only && !source.ends_with('/') {
            source.push('/');
        }
        vec![
            "-a".to_string(),
            "--delete".to_string(),
            "--info=progress2".to_string(),
            "-e".to_string(),
            self.rsync_shell(),
            source,
            format!("{}:{}", self.destination(), remote_path),
        ]
    }

    pub async fn run_ssh(&self, remote_command: &str) -> RealmResult<ExitStatus> {
        run_passthrough(&self.ssh_command, &self.ssh_args(remote_command)).await
    }

    pub async fn run_rsync(
        &self,
        source: &Path,
        remote_path: &str,
        contents_only: bool,
    ) -> RealmResult<ExitStatus> {
        let args = self.rsync_args(source, remote_path, contents_only);
        run_passthrough(&self.rsync_command, &args).await
    }
}

/// Run a local program with inherited stdio so its diagnostics reach the
/// operator unmodified. A program missing from PATH is a configuration error.
pub async fn run_passthrough(program: &str, args: &[String]) -> RealmResult<ExitStatus> {
    Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .status()
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                RealmError::Configuration(format!("`{}` not found on PATH", program))
            }
            _ => RealmError::render(format!("failed to start `{}`: {}", program, e)),
        })
}

/// Require a tool to be resolvable before any work starts
pub fn require_tool(program: &str) -> RealmResult<PathBuf> {
    which::which(program)
        .map_err(|_| RealmError::Configuration(format!("`{}` not found on PATH", program)))
}
