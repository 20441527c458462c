use std::collections::BTreeMap;
use std::time::Duration;

use crate::view_model::{AppViewModel, InputFileRow, SurfaceView};
use crate::{
    Effect, FileManifest, FileManifestEntry, FormSurface, FormTransform, InputTemplate, PollerState,
    ProjectStatus, StatusCode, StatusView, SurfaceId, TemplateRegistry, UploadOutcome,
};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);
pub const DEFAULT_MAX_LOG_ENTRIES: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub poll_interval: Duration,
    pub max_log_entries: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_log_entries: DEFAULT_MAX_LOG_ENTRIES,
        }
    }
}

/// An input file listed in the project page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotFile {
    pub filename: String,
    pub template_id: Option<String>,
    pub format: Option<String>,
}

/// Project state as of page load.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProjectSnapshot {
    pub status: ProjectStatus,
    pub input_files: Vec<SnapshotFile>,
}

/// Everything needed to start a session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionBootstrap {
    pub templates: Vec<InputTemplate>,
    pub project: ProjectSnapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub surface: Option<SurfaceId>,
    pub text: String,
}

/// Outcome of one file in the most recent upload response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub filename: String,
    pub outcome: UploadOutcome,
    /// False when an accepted file was already in the manifest.
    pub inserted: bool,
}

/// Session state of one project page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    config: SessionConfig,
    loaded: bool,
    pub(crate) registry: TemplateRegistry,
    pub(crate) transform: Option<FormTransform>,
    pub(crate) manifest: FileManifest,
    pub(crate) surfaces: BTreeMap<SurfaceId, FormSurface>,
    stage: StatusCode,
    poller: PollerState,
    status: StatusView,
    notices: Vec<Notice>,
    last_upload: Vec<FileOutcome>,
    in_flight: usize,
    poll_seq: u64,
    pending_poll: Option<u64>,
    dirty: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self::with_config(SessionConfig::default())
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SessionConfig) -> Self {
        Self {
            config,
            loaded: false,
            registry: TemplateRegistry::default(),
            transform: None,
            manifest: FileManifest::default(),
            surfaces: SurfaceId::ALL
                .into_iter()
                .map(|surface| (surface, FormSurface::default()))
                .collect(),
            stage: StatusCode::default(),
            poller: PollerState::default(),
            status: StatusView::default(),
            notices: Vec::new(),
            last_upload: Vec::new(),
            in_flight: 0,
            poll_seq: 0,
            pending_poll: None,
            dirty: false,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    pub fn manifest(&self) -> &FileManifest {
        &self.manifest
    }

    pub fn has_transform(&self) -> bool {
        self.transform.is_some()
    }

    pub fn surface(&self, id: SurfaceId) -> &FormSurface {
        // Every surface is created in `with_config`.
        &self.surfaces[&id]
    }

    pub fn stage(&self) -> StatusCode {
        self.stage
    }

    pub fn poller(&self) -> PollerState {
        self.poller
    }

    pub fn status(&self) -> &StatusView {
        &self.status
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn last_upload(&self) -> &[FileOutcome] {
        &self.last_upload
    }

    /// Requests issued by the session that have not settled yet.
    pub fn pending_requests(&self) -> usize {
        self.in_flight
    }

    /// Ticket of the status poll currently awaited, if any.
    pub fn pending_poll(&self) -> Option<u64> {
        self.pending_poll
    }

    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            loaded: self.loaded,
            template_options: self.registry.selectable_list(),
            surfaces: self
                .surfaces
                .iter()
                .map(|(id, surface)| SurfaceView {
                    surface: *id,
                    template_id: surface.template_id.clone(),
                    markup: surface.markup.clone(),
                    show_parameters: surface.has_parameters(),
                    error: surface.error.clone(),
                    forced_filename: surface.forced_filename.clone(),
                    retry_filename: surface.retry_filename.clone(),
                })
                .collect(),
            input_files: self
                .manifest
                .entries()
                .iter()
                .map(|entry| InputFileRow {
                    filename: entry.filename.clone(),
                    template_label: entry.template_label.clone(),
                    format: entry.format.clone(),
                })
                .collect(),
            stage: self.stage,
            poller: self.poller,
            progress: self.status.progress(),
            status_message: self.status.message().map(ToOwned::to_owned),
            status_log: self.status.log().cloned().collect(),
            status_log_appended: self.status.appended(),
            notices: self.notices.clone(),
            last_upload: self.last_upload.clone(),
            pending_requests: self.in_flight,
            dirty: self.dirty,
        }
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn surface_mut(&mut self, id: SurfaceId) -> &mut FormSurface {
        self.surfaces.entry(id).or_default()
    }

    /// Consecutive identical notices collapse into one, so a failing poll
    /// loop does not flood the list.
    pub(crate) fn push_notice(
        &mut self,
        level: NoticeLevel,
        surface: Option<SurfaceId>,
        text: impl Into<String>,
    ) {
        let notice = Notice {
            level,
            surface,
            text: text.into(),
        };
        if self.notices.last() != Some(&notice) {
            self.notices.push(notice);
        }
        self.dirty = true;
    }

    pub(crate) fn clear_notices(&mut self) {
        if !self.notices.is_empty() {
            self.notices.clear();
            self.dirty = true;
        }
    }

    pub(crate) fn set_last_upload(&mut self, outcomes: Vec<FileOutcome>) {
        self.last_upload = outcomes;
    }

    pub(crate) fn begin_request(&mut self) {
        self.in_flight += 1;
    }

    pub(crate) fn finish_request(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }

    pub(crate) fn load(&mut self, bootstrap: SessionBootstrap) {
        self.registry = TemplateRegistry::from_raw(bootstrap.templates);
        for file in bootstrap.project.input_files {
            let known_label = file
                .template_id
                .as_deref()
                .and_then(|id| self.registry.lookup(id))
                .map(|template| template.label.clone());
            let template_label = known_label.or(file.template_id).unwrap_or_default();
            self.manifest.insert_if_absent(FileManifestEntry {
                filename: file.filename,
                template_label,
                format: file.format,
            });
        }
        self.stage = bootstrap.project.status.code;
        self.status
            .set_initial_progress(bootstrap.project.status.completion);
        self.loaded = true;

        if let Some(id) = self.registry.selectable_list().preselect {
            for surface in self.surfaces.values_mut() {
                surface.template_id = Some(id.clone());
            }
        }
        self.dirty = true;
    }

    pub(crate) fn set_stage(&mut self, stage: StatusCode) {
        self.stage = stage;
    }

    pub(crate) fn set_poller(&mut self, poller: PollerState) {
        if self.poller != poller {
            self.poller = poller;
            self.dirty = true;
        }
    }

    /// Issues the next poll ticket. Any earlier ticket stops being awaited.
    pub(crate) fn schedule_poll(&mut self) -> Effect {
        self.poll_seq += 1;
        self.pending_poll = Some(self.poll_seq);
        Effect::SchedulePoll {
            after: self.config.poll_interval,
            ticket: self.poll_seq,
        }
    }

    /// True when `ticket` is the awaited poll; it is no longer awaited after.
    pub(crate) fn settle_poll(&mut self, ticket: u64) -> bool {
        if self.pending_poll == Some(ticket) {
            self.pending_poll = None;
            true
        } else {
            false
        }
    }

    pub(crate) fn apply_status(&mut self, status: &ProjectStatus) {
        self.status.apply(status, self.config.max_log_entries);
        self.dirty = true;
    }
}
