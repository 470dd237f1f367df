//! Delegation to the external map renderer.
//!
//! `Renderer` is the capability the pipeline calls. `LocalRenderer` runs the
//! tool on this machine; `RemoteRenderer` pushes the world to an ssh host and
//! runs it there. `ConfiguredRenderer` picks one from the configuration.

pub mod local;
pub mod remote;

use std::path::Path;

pub use local::LocalRenderer;
pub use remote::RemoteRenderer;

use crate::config::{Config, RendererConfig};
use crate::error::RealmResult;

#[allow(async_fn_in_trait)]
pub trait Renderer {
    /// Check that the renderer can run at all, before anything is downloaded
    fn preflight(&self, _config: &RendererConfig) -> RealmResult<()> {
        Ok(())
    }

    async fn run(&self, world_dir: &Path, config: &RendererConfig) -> RealmResult<()>;

    fn is_remote(&self) -> bool {
        false
    }
}

/// Expand `{config}` and `{world}` in a pass's arguments
pub fn expand_pass(pass: &[String], config_file: &str, world_dir: &str) -> Vec<String> {
    pass.iter()
        .map(|arg| arg.replace("{config}", config_file).replace("{world}", world_dir))
        .collect()
}

#[derive(Debug)]
pub enum ConfiguredRenderer {
    Local(LocalRenderer),
    Remote(RemoteRenderer),
}

impl ConfiguredRenderer {
    pub fn from_config(config: &Config) -> Self {
        match config.remote {
            Some(ref remote) => ConfiguredRenderer::Remote(RemoteRenderer::new(remote.clone())),
            None => ConfiguredRenderer::Local(LocalRenderer::new()),
        }
    }
}

impl Renderer for ConfiguredRenderer {
    fn preflight(&self, config: &RendererConfig) -> RealmResult<()> {
        match self {
            ConfiguredRenderer::Local(r) => r.preflight(config),
            ConfiguredRenderer::Remote(r) => r.preflight(config),
        }
    }

    async fn run(&self, world_dir: &Path, config: &RendererConfig) -> RealmResult<()> {
        match self {
            ConfiguredRenderer::Local(r) => r.run(world_dir, config).await,
            ConfiguredRenderer::Remote(r) => r.run(world_dir, config).await,
        }
    }

    fn is_remote(&self) -> bool {
        matches!(self, ConfiguredRenderer::Remote(_))
    }
}
