use std::path::Path;
use std::process::ExitStatus;

use tracing::info;

use super::{expand_pass, Renderer};
use crate::config::{RemoteConfig, RendererConfig};
use crate::error::{RealmError, RealmResult};
use crate::transport::SSH_CONNECTION_FAILURE;
use crate::utils::shell_quote_path;

/// Pushes the world to an ssh host and runs the renderer there.
///
/// `renderer.command` and `renderer.config_file` name paths on the host.
#[derive(Debug, Clone)]
pub struct RemoteRenderer {
    remote: RemoteConfig,
}

impl RemoteRenderer {
    pub fn new(remote: RemoteConfig) -> Self {
        Self { remote }
    }

    /// Where the world directory lands on the host
    pub fn remote_world_path(&self, world_dir: &Path) -> String {
        let name = world_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "world".to_string());
        format!("{}/{}", self.remote.remote_dir.trim_end_matches('/'), name)
    }

    /// Shell command line for one pass, quoted for the remote shell.
    ///
    /// Arguments starting with `~/` keep the tilde unquoted so paths under
    /// the remote home directory resolve the same way rsync resolves them.
    pub fn remote_command(
        &self,
        config: &RendererConfig,
        pass: &[String],
        remote_world: &str,
    ) -> String {
        let config_file = config.config_file.to_string_lossy();
        std::iter::once(config.command.clone())
            .chain(expand_pass(pass, &config_file, remote_world))
            .map(|arg| shell_quote_path(&arg))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn check_ssh(&self, status: ExitStatus, what: &str) -> RealmResult<()> {
        if status.success() {
            return Ok(());
        }
        if status.code() == Some(SSH_CONNECTION_FAILURE) {
            return Err(RealmError::render(format!(
                "could not establish ssh connection to {} while {}",
                self.remote.ssh.destination(),
                what
            )));
        }
        Err(RealmError::render(format!(
            "{} on {} exited with {}",
            what,
            self.remote.ssh.destination(),
            status
        )))
    }
}

impl Renderer for RemoteRenderer {
    fn preflight(&self, _config: &RendererConfig) -> RealmResult<()> {
        self.remote.ssh.require_tools()
    }

    async fn run(&self, world_dir: &Path, config: &RendererConfig) -> RealmResult<()> {
        let ssh = &self.remote.ssh;
        let remote_dir = self.remote.remote_dir.trim_end_matches('/');

        info!(host = %ssh.destination(), dir = remote_dir, "Preparing remote directory");
        let mkdir = format!("mkdir -p {}", shell_quote_path(remote_dir));
        let status = ssh.run_ssh(&mkdir).await?;
        self.check_ssh(status, "creating the remote directory")?;

        // A directory without a name (".") is pushed by contents
        let remote_world = self.remote_world_path(world_dir);
        let status = if world_dir.file_name().is_some() {
            info!(host = %ssh.destination(), world = %world_dir.display(), "Transferring world");
            ssh.run_rsync(world_dir, &format!("{}/", remote_dir), false).await?
        } else {
            info!(
                host = %ssh.destination(),
                world = %world_dir.display(),
                "Transferring world contents"
            );
            ssh.run_rsync(world_dir, &remote_world, true).await?
        };
        if !status.success() {
            return Err(RealmError::render(format!(
                "transferring the world to {} failed: rsync exited with {}",
                ssh.destination(),
                status
            )));
        }

        let total = config.passes.len();
        for (i, pass) in config.passes.iter().enumerate() {
            let command = self.remote_command(config, pass, &remote_world);
            info!(
                pass = i + 1,
                total,
                host = %ssh.destination(),
                %command,
                "Running remote renderer"
            );

            let status = ssh.run_ssh(&command).await?;
            self.check_ssh(status, &format!("running renderer pass {} of {}", i + 1, total))?;
        }
        Ok(())
    }

    fn is_remote(&self) -> bool {
        true
    }
}
