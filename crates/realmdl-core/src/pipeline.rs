//! The download pipeline.
//!
//! authenticate -> list realms -> select realm -> download archive ->
//! extract -> render -> publish
//!
//! Each step is also exposed on its own. The session token is created by
//! `authenticate`, passed explicitly to the steps that need it, and dropped
//! when the run ends.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::api::RealmService;
use crate::archive::{self, Archive, ProgressCallback};
use crate::auth::{Credentials, SessionToken};
use crate::config::Config;
use crate::error::{RealmError, RealmResult};
use crate::models::Realm;
use crate::publish::MapPublisher;
use crate::render::Renderer;
use crate::selection::{select_realm, SelectionPolicy};

/// Progress notifications for the operator
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    Authenticated { profile: String },
    RealmsListed { count: usize },
    RealmSelected(Realm),
    DownloadStarted { realm: Realm, slot: u8 },
    Downloaded(Archive),
    Extracted { world_dir: PathBuf },
    RenderStarted { remote: bool },
    Rendered,
    RenderSkipped,
    PublishStarted { target: String },
    Published,
}

pub type EventCallback = Box<dyn Fn(&PipelineEvent) + Send + Sync>;

/// Outcome of a complete run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub realm: Realm,
    pub archive: Archive,
    pub world_dir: PathBuf,
    pub rendered: bool,
    pub published: bool,
}

pub struct RealmDownloader<S, R> {
    service: S,
    renderer: R,
    config: Config,
    selection: SelectionPolicy,
    publisher: Option<MapPublisher>,
    progress: Option<ProgressCallback>,
    on_event: Option<EventCallback>,
}

impl<S: RealmService, R: Renderer> RealmDownloader<S, R> {
    pub fn new(service: S, renderer: R, config: Config, selection: SelectionPolicy) -> Self {
        let publisher = config.publish.clone().map(MapPublisher::new);
        Self {
            service,
            renderer,
            config,
            selection,
            publisher,
            progress: None,
            on_event: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_events(mut self, on_event: EventCallback) -> Self {
        self.on_event = Some(on_event);
        self
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(ref cb) = self.on_event {
            cb(&event);
        }
    }

    fn publishes(&self) -> bool {
        self.publisher.is_some() && !self.renderer.is_remote()
    }

    /// Fail early when the renderer or publisher cannot possibly run
    pub fn preflight(&self) -> RealmResult<()> {
        if self.config.renderer.enabled {
            self.renderer.preflight(&self.config.renderer)?;
            if let Some(ref publisher) = self.publisher {
                if self.renderer.is_remote() {
                    warn!("Map publishing is ignored when rendering remotely");
                } else {
                    publisher.preflight()?;
                }
            }
        }
        Ok(())
    }

    pub async fn authenticate(&self, credentials: &Credentials) -> RealmResult<SessionToken> {
        let session = self.service.authenticate(credentials).await?;
        self.emit(PipelineEvent::Authenticated {
            profile: session.profile_name.clone(),
        });
        Ok(session)
    }

    pub async fn list_realms(&self, session: &SessionToken) -> RealmResult<Vec<Realm>> {
        let realms = self.service.list_realms(session).await?;
        if realms.is_empty() {
            return Err(RealmError::Service("account has no realms".to_string()));
        }
        self.emit(PipelineEvent::RealmsListed { count: realms.len() });
        Ok(realms)
    }

    pub fn select_realm(&self, realms: &[Realm]) -> RealmResult<Realm> {
        let realm = select_realm(realms, &self.selection)?;
        info!(realm = %realm.label(), "Realm selected");
        self.emit(PipelineEvent::RealmSelected(realm.clone()));
        Ok(realm)
    }

    pub async fn download_archive(
        &self,
        session: &SessionToken,
        realm: &Realm,
    ) -> RealmResult<Archive> {
        if session.is_expired() {
            return Err(RealmError::Authentication(
                "session expired before the download started".to_string(),
            ));
        }

        let slot = self.config.realm.slot;
        self.emit(PipelineEvent::DownloadStarted {
            realm: realm.clone(),
            slot,
        });

        let output = &self.config.archive.output;
        let archive = self
            .service
            .download_archive(session, realm, slot, output, self.progress.as_ref())
            .await?;

        info!(path = %archive.path.display(), bytes = archive.bytes, "Archive downloaded");
        self.emit(PipelineEvent::Downloaded(archive.clone()));
        Ok(archive)
    }

    pub async fn extract(&self, archive: &Archive) -> RealmResult<PathBuf> {
        let world_dir = archive::extract(&archive.path, &self.config.archive.extract_dir).await?;
        self.emit(PipelineEvent::Extracted {
            world_dir: world_dir.clone(),
        });
        Ok(world_dir)
    }

    pub async fn render_world(&self, world_dir: &std::path::Path) -> RealmResult<()> {
        self.emit(PipelineEvent::RenderStarted {
            remote: self.renderer.is_remote(),
        });
        self.renderer.run(world_dir, &self.config.renderer).await?;
        self.emit(PipelineEvent::Rendered);
        Ok(())
    }

    /// Upload the rendered map; returns whether anything was published
    pub async fn publish_map(&self) -> RealmResult<bool> {
        let publisher = match self.publisher {
            Some(ref p) if self.publishes() => p,
            _ => return Ok(false),
        };
        self.emit(PipelineEvent::PublishStarted {
            target: publisher.target(),
        });
        publisher.publish().await?;
        self.emit(PipelineEvent::Published);
        Ok(true)
    }

    pub async fn run(&self, credentials: &Credentials) -> RealmResult<RunReport> {
        self.preflight()?;

        let session = self.authenticate(credentials).await?;
        let realms = self.list_realms(&session).await?;
        let realm = self.select_realm(&realms)?;
        let archive = self.download_archive(&session, &realm).await?;
        drop(session);

        let world_dir = self.extract(&archive).await?;

        let rendered = if self.config.renderer.enabled {
            self.render_world(&world_dir).await?;
            true
        } else {
            self.emit(PipelineEvent::RenderSkipped);
            false
        };

        let published = if rendered { self.publish_map().await? } else { false };

        Ok(RunReport {
            realm,
            archive,
            world_dir,
            rendered,
            published,
        })
    }
}
