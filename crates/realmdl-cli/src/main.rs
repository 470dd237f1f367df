//! download-realm - fetch the latest backup of a hosted realm and render it.
//!
//! Logs in, picks a realm, downloads and extracts its backup archive, then
//! runs the map renderer locally or on an ssh host.

mod cli;
mod display;

use std::fs::OpenOptions;
use std::future::Future;
use std::io;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use realmdl_core::{
    Config, ConfiguredRenderer, Credentials, RealmDownloader, RealmError, RealmPrompt,
    RealmResult, RealmService, RealmsClient, Renderer, RunReport, SelectionPolicy,
};

use cli::Cli;
use display::{DialoguerPrompt, DownloadProgress};

// ============================================================================
// Constants
// ============================================================================

/// Log filter used when RUST_LOG is not set
const DEFAULT_LOG_FILTER: &str = "warn,realmdl_core=info,download_realm=info";

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr; `--log-file` adds a plain-text copy. The returned guard
/// must be held until exit so buffered file output is flushed.
fn init_tracing(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .try_init()
        .context("failed to initialize logging")?;

    Ok(guard)
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let _guard = match init_tracing(cli.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            let err = RealmError::Configuration(format!("{:#}", e));
            display::print_error(&err);
            return ExitCode::from(err.exit_code());
        }
    };
    info!("download-realm starting");

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(stage = e.stage(), "Run failed");
            display::print_error(&e);
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli) -> RealmResult<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply_overrides(&mut config);
    config.validate()?;

    let password = match cli.password {
        Some(ref password) => password.clone(),
        None => read_password(&cli.email)?,
    };
    let credentials = Credentials::new(cli.email.as_str(), password)?;

    let client = RealmsClient::new(&config.service)?;

    let prompt: Option<Box<dyn RealmPrompt + Send + Sync>> = if cli.interactive {
        Some(Box::new(DialoguerPrompt))
    } else {
        None
    };
    let selection = SelectionPolicy::resolve(config.realm.select.as_deref(), prompt)?;
    let renderer = ConfiguredRenderer::from_config(&config);

    let progress = DownloadProgress::new();
    let pipeline = RealmDownloader::new(client, renderer, config, selection)
        .with_progress(progress.callback())
        .with_events(progress.event_printer());

    if cli.list {
        return interruptible(list_realms(&pipeline, &credentials)).await;
    }

    let report = interruptible(pipeline.run(&credentials)).await?;
    print_summary(&report);
    Ok(())
}

/// Password from the terminal, without echo
fn read_password(email: &str) -> RealmResult<String> {
    rpassword::prompt_password(format!("Password for {}: ", email))
        .map_err(|e| RealmError::Authentication(format!("could not read password: {}", e)))
}

/// Run `work` until it finishes or the operator presses Ctrl-C.
///
/// On interrupt the work future is dropped, which removes any partial
/// download and kills running child processes.
async fn interruptible<T>(work: impl Future<Output = RealmResult<T>>) -> RealmResult<T> {
    tokio::select! {
        result = work => result,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted");
            Err(RealmError::Cancelled)
        }
    }
}

async fn list_realms<S: RealmService, R: Renderer>(
    pipeline: &RealmDownloader<S, R>,
    credentials: &Credentials,
) -> RealmResult<()> {
    let session = pipeline.authenticate(credentials).await?;
    let realms = pipeline.list_realms(&session).await?;
    print!("{}", display::realm_table(&realms));
    Ok(())
}

fn print_summary(report: &RunReport) {
    info!(
        realm = %report.realm.label(),
        archive = %report.archive.path.display(),
        world = %report.world_dir.display(),
        rendered = report.rendered,
        published = report.published,
        "Done"
    );
    println!("{}", report.world_dir.display());
}
