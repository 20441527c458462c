use crate::{
    FormTransform, LifecycleAction, ProjectStatus, SessionBootstrap, Submission, SurfaceId,
    TemplateId, UploadResponse,
};

/// A failed request as seen by the session: the HTTP status when the server
/// answered, and its response text or the transport error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFailure {
    pub status: Option<u16>,
    pub message: String,
}

impl RequestFailure {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Templates and project snapshot arrived; starts the session.
    SessionLoaded(Box<SessionBootstrap>),
    SessionLoadFailed(RequestFailure),
    /// The shared parameter transform arrived.
    TransformLoaded(FormTransform),
    TransformFailed(RequestFailure),
    /// User picked an input type on one of the form surfaces.
    TemplateSelected {
        surface: SurfaceId,
        template_id: TemplateId,
    },
    /// User submitted a file through one of the upload channels.
    SubmitRequested(Submission),
    /// Upload response decoded.
    UploadCompleted {
        surface: SurfaceId,
        response: UploadResponse,
    },
    UploadFailed {
        surface: SurfaceId,
        failure: RequestFailure,
    },
    /// User removed a file from the input table.
    DeleteInputClicked { filename: String },
    DeleteInputSucceeded { filename: String },
    DeleteInputFailed {
        filename: String,
        failure: RequestFailure,
    },
    /// User chose pre-installed data as the whole project input.
    ProjectSourceSelected { source_id: String },
    ProjectSourceAdded,
    ProjectSourceFailed(RequestFailure),
    /// Result of the poll scheduled with `ticket`.
    StatusPolled { ticket: u64, status: ProjectStatus },
    StatusPollFailed { ticket: u64, failure: RequestFailure },
    CreateProjectClicked { name: String },
    AbortClicked,
    DeleteProjectClicked,
    RestartClicked,
    LifecycleSucceeded(LifecycleAction),
    LifecycleFailed {
        action: LifecycleAction,
        failure: RequestFailure,
    },
    NoticesDismissed,
    /// Render tick.
    Tick,
}
