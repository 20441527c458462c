//! Intake core: pure session state machine for a project's input files and
//! execution status.
mod channel;
mod effect;
mod form;
mod lifecycle;
mod manifest;
mod msg;
mod parameters;
mod state;
mod status;
mod sync;
mod template;
mod update;
mod upload;
mod view_model;

pub use channel::{prepare_request, Submission, UploadChannel};
pub use effect::Effect;
pub use form::{
    render_parameter_form, FormSurface, FormTransform, RenderError, RenderedForm, SurfaceId,
    ARCHIVE_NOTICE,
};
pub use lifecycle::{normalize_project_name, Destination, LifecycleAction};
pub use manifest::{FileManifest, FileManifestEntry};
pub use msg::{Msg, RequestFailure};
pub use parameters::{ParameterChoice, ParameterDescriptor, ParameterField, ParameterKind};
pub use state::{
    AppState, FileOutcome, Notice, NoticeLevel, ProjectSnapshot, SessionBootstrap, SessionConfig,
    SnapshotFile, DEFAULT_MAX_LOG_ENTRIES, DEFAULT_POLL_INTERVAL,
};
pub use status::{LogEntry, PollerState, ProjectStatus, StatusCode, StatusView};
pub use template::{
    ConverterOption, InputSourceOption, InputTemplate, SelectableList, TemplateId,
    TemplateRegistry, ValidationError,
};
pub use update::update;
pub use upload::{
    CreateInputRequest, FileError, FileErrorKind, InputPayload, UploadBatch, UploadOutcome,
    UploadRecord, UploadResponse,
};
pub use view_model::{AppViewModel, InputFileRow, SurfaceView};
