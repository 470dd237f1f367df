//! Upload of the rendered map to a web host over rsync/ssh.

use tracing::info;

use crate::config::PublishConfig;
use crate::error::{RealmError, RealmResult};

#[derive(Debug, Clone)]
pub struct MapPublisher {
    config: PublishConfig,
}

impl MapPublisher {
    pub fn new(config: PublishConfig) -> Self {
        Self { config }
    }

    pub fn target(&self) -> String {
        format!("{}:{}", self.config.ssh.destination(), self.config.destination)
    }

    pub fn preflight(&self) -> RealmResult<()> {
        self.config.ssh.require_tools()
    }

    /// Mirror the contents of the map directory to the destination
    pub async fn publish(&self) -> RealmResult<()> {
        let map_dir = &self.config.map_dir;
        if !map_dir.is_dir() {
            return Err(RealmError::publish(format!(
                "map directory {} does not exist",
                map_dir.display()
            )));
        }

        info!(source = %map_dir.display(), target = %self.target(), "Uploading map");
        let status = self
            .config
            .ssh
            .run_rsync(map_dir, &self.config.destination, true)
            .await?;

        if !status.success() {
            return Err(RealmError::publish(format!(
                "uploading to {} failed: rsync exited with {}",
                self.target(),
                status
            )));
        }
        Ok(())
    }
}
