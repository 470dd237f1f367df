use std::path::Path;

use tracing::info;

use super::{expand_pass, Renderer};
use crate::config::RendererConfig;
use crate::error::{RealmError, RealmResult};
use crate::transport::{require_tool, run_passthrough};

/// Runs the renderer as a child process on this machine.
#[derive(Debug, Default)]
pub struct LocalRenderer;

impl LocalRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl Renderer for LocalRenderer {
    fn preflight(&self, config: &RendererConfig) -> RealmResult<()> {
        require_tool(&config.command)?;
        if !config.config_file.is_file() {
            return Err(RealmError::Configuration(format!(
                "renderer config file not found: {}",
                config.config_file.display()
            )));
        }
        Ok(())
    }

    async fn run(&self, world_dir: &Path, config: &RendererConfig) -> RealmResult<()> {
        let config_file = config.config_file.to_string_lossy();
        let world = world_dir.to_string_lossy();
        let total = config.passes.len();

        for (i, pass) in config.passes.iter().enumerate() {
            let args = expand_pass(pass, &config_file, &world);
            info!(pass = i + 1, total, command = %config.command, ?args, "Running renderer");

            let status = run_passthrough(&config.command, &args).await?;
            if !status.success() {
                return Err(RealmError::render(format!(
                    "`{}` pass {} of {} exited with {}",
                    config.command,
                    i + 1,
                    total,
                    status
                )));
            }
        }
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn config(command: &str, passes: Vec<Vec<&str>>) -> RendererConfig {
        RendererConfig {
            enabled: true,
            command: command.to_string(),
            config_file: PathBuf::from("config.py"),
            passes: passes
                .into_iter()
                .map(|p| p.into_iter().map(String::from).collect())
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_successful_passes() {
        let temp = tempfile::tempdir().unwrap();
        let marker = temp.path().join("rendered");
        let script = format!("echo {{world}} >> {}", marker.display());
        let cfg = config("sh", vec![vec!["-c", script.as_str()], vec!["-c", script.as_str()]]);

        LocalRenderer::new().run(Path::new("/tmp/world"), &cfg).await.unwrap();

        let contents = std::fs::read_to_string(&marker).unwrap();
        assert_eq!(contents, "/tmp/world\n/tmp/world\n");
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_render_error() {
        let cfg = config("sh", vec![vec!["-c", "exit 3"]]);
        let err = LocalRenderer::new().run(Path::new("."), &cfg).await.unwrap_err();
        assert!(matches!(err, RealmError::Render { stage: "render", .. }));
        assert!(err.to_string().contains("pass 1 of 1"));
    }

    #[tokio::test]
    async fn test_stops_at_first_failing_pass() {
        let temp = tempfile::tempdir().unwrap();
        let marker = temp.path().join("second");
        let second = format!("touch {}", marker.display());
        let cfg = config("sh", vec![vec!["-c", "exit 1"], vec!["-c", second.as_str()]]);

        assert!(LocalRenderer::new().run(Path::new("."), &cfg).await.is_err());
        assert!(!marker.exists());
    }

    #[test]
    fn test_preflight_missing_command() {
        let cfg = config("definitely-not-a-renderer-7f3a", vec![vec![]]);
        assert!(matches!(
            LocalRenderer::new().preflight(&cfg),
            Err(RealmError::Configuration(_))
        ));
    }

    #[test]
    fn test_preflight_missing_config_file() {
        let mut cfg = config("sh", vec![vec![]]);
        cfg.config_file = PathBuf::from("/nonexistent/config.py");
        assert!(matches!(
            LocalRenderer::new().preflight(&cfg),
            Err(RealmError::Configuration(ref m)) if m.contains("config file")
        ));
    }

    #[test]
    fn test_preflight_ok() {
        let temp = tempfile::tempdir().unwrap();
        let mut cfg = config("sh", vec![vec![]]);
        cfg.config_file = temp.path().join("config.py");
        std::fs::write(&cfg.config_file, "worlds = {}").unwrap();
        assert!(LocalRenderer::new().preflight(&cfg).is_ok());
    }
}
