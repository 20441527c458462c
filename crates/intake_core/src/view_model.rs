use crate::state::{FileOutcome, Notice};
use crate::{LogEntry, PollerState, SelectableList, StatusCode, SurfaceId};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub loaded: bool,
    pub template_options: SelectableList,
    pub surfaces: Vec<SurfaceView>,
    pub input_files: Vec<InputFileRow>,
    pub stage: StatusCode,
    pub poller: PollerState,
    pub progress: u8,
    pub status_message: Option<String>,
    pub status_log: Vec<LogEntry>,
    /// See [`crate::StatusView::appended`].
    pub status_log_appended: usize,
    pub notices: Vec<Notice>,
    pub last_upload: Vec<FileOutcome>,
    pub pending_requests: usize,
    pub dirty: bool,
}

impl AppViewModel {
    pub fn surface(&self, id: SurfaceId) -> Option<&SurfaceView> {
        self.surfaces.iter().find(|view| view.surface == id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceView {
    pub surface: SurfaceId,
    pub template_id: Option<String>,
    pub markup: String,
    /// False when the selected type has no parameters to fill in.
    pub show_parameters: bool,
    pub error: Option<String>,
    pub forced_filename: Option<String>,
    pub retry_filename: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFileRow {
    pub filename: String,
    pub template_label: String,
    pub format: Option<String>,
}
