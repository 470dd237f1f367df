//! Operator-facing output: stage lines, download progress, realm table and
//! the interactive realm prompt.

use console::style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Select;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use realmdl_core::archive::ProgressCallback;
use realmdl_core::pipeline::EventCallback;
use realmdl_core::utils::{format_bytes, truncate_string};
use realmdl_core::{PipelineEvent, Realm, RealmError, RealmPrompt, RealmResult};

// ============================================================================
// Constants
// ============================================================================

const PROGRESS_TEMPLATE: &str = concat!(
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] ",
    "{bytes}/{total_bytes} ({bytes_per_sec}, {eta})"
);

/// Width of the name column in the realm table
const NAME_WIDTH: usize = 32;

// ============================================================================
// Progress
// ============================================================================

/// Download progress bar shared between the event and progress callbacks
#[derive(Clone)]
pub struct DownloadProgress {
    bar: ProgressBar,
}

impl DownloadProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::hidden();
        let style = ProgressStyle::with_template(PROGRESS_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        bar.set_style(style);
        Self { bar }
    }

    fn start(&self) {
        self.bar.reset();
        self.bar.set_draw_target(ProgressDrawTarget::stderr());
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }

    pub fn callback(&self) -> ProgressCallback {
        let bar = self.bar.clone();
        Box::new(move |written: u64, total: Option<u64>| {
            if let Some(total) = total {
                bar.set_length(total);
            }
            bar.set_position(written);
        })
    }

    /// Event printer that also drives the progress bar
    pub fn event_printer(&self) -> EventCallback {
        let progress = self.clone();
        Box::new(move |event: &PipelineEvent| {
            match event {
                PipelineEvent::DownloadStarted { .. } => {
                    print_event(event);
                    progress.start();
                    return;
                }
                PipelineEvent::Downloaded(_) => progress.finish(),
                _ => {}
            }
            print_event(event);
        })
    }
}

// ============================================================================
// Stage lines
// ============================================================================

fn step(message: impl std::fmt::Display) {
    eprintln!("{} {}", style("==>").green().bold(), message);
}

pub fn print_event(event: &PipelineEvent) {
    match event {
        PipelineEvent::Authenticated { profile } => {
            step(format!("Logged in as {}", style(profile).bold()))
        }
        PipelineEvent::RealmsListed { count } => step(format!("Found {} realm(s)", count)),
        PipelineEvent::RealmSelected(realm) => {
            step(format!("Selected realm {}", style(realm.label()).cyan()))
        }
        PipelineEvent::DownloadStarted { realm, slot } => step(format!(
            "Downloading backup of {} (slot {})",
            realm.label(),
            slot
        )),
        PipelineEvent::Downloaded(archive) => step(format!(
            "Saved {} ({})",
            archive.path.display(),
            format_bytes(archive.bytes)
        )),
        PipelineEvent::Extracted { world_dir } => {
            step(format!("Extracted world to {}", world_dir.display()))
        }
        PipelineEvent::RenderStarted { remote } => {
            if *remote {
                step("Rendering map on remote host")
            } else {
                step("Rendering map")
            }
        }
        PipelineEvent::Rendered => step("Map rendered"),
        PipelineEvent::RenderSkipped => step(style("Rendering skipped").dim()),
        PipelineEvent::PublishStarted { target } => step(format!("Uploading map to {}", target)),
        PipelineEvent::Published => step("Map uploaded"),
    }
}

pub fn print_error(err: &RealmError) {
    eprintln!("{} {}", style("error:").red().bold(), err);
}

// ============================================================================
// Realm table
// ============================================================================

pub fn realm_table(realms: &[Realm]) -> String {
    let mut out = format!(
        "{:>10}  {:<width$}  {:<16}  {}\n",
        "ID",
        "NAME",
        "OWNER",
        "STATE",
        width = NAME_WIDTH
    );
    for realm in realms {
        out.push_str(&format!(
            "{:>10}  {:<width$}  {:<16}  {}\n",
            realm.id,
            truncate_string(&realm.name, NAME_WIDTH),
            truncate_string(realm.owner.as_deref().unwrap_or("-"), 16),
            realm.display_state(),
            width = NAME_WIDTH
        ));
    }
    out
}

// ============================================================================
// Interactive prompt
// ============================================================================

pub struct DialoguerPrompt;

impl RealmPrompt for DialoguerPrompt {
    fn choose(&self, realms: &[Realm]) -> RealmResult<usize> {
        let items: Vec<String> = realms
            .iter()
            .map(|r| format!("{} [{}]", r.label(), r.display_state()))
            .collect();

        Select::with_theme(&ColorfulTheme::default())
            .with_prompt("Select a realm")
            .items(&items)
            .default(0)
            .interact_opt()
            .map_err(|e| RealmError::Configuration(format!("realm prompt failed: {}", e)))?
            .ok_or(RealmError::Cancelled)
    }
}
