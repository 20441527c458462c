use std::fmt;

use intake_core::{
    FormTransform, LifecycleAction, ProjectStatus, SessionBootstrap, SurfaceId, UploadResponse,
};

/// Completion of one engine command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    SessionLoaded(Result<SessionBootstrap, ServiceError>),
    TransformLoaded(Result<FormTransform, ServiceError>),
    InputCreated {
        surface: SurfaceId,
        result: Result<UploadResponse, ServiceError>,
    },
    InputDeleted {
        filename: String,
        result: Result<(), ServiceError>,
    },
    ProjectSourceSelected(Result<(), ServiceError>),
    StatusPolled {
        ticket: u64,
        result: Result<ProjectStatus, ServiceError>,
    },
    LifecycleCompleted {
        action: LifecycleAction,
        result: Result<(), ServiceError>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceError {
    pub kind: FailureKind,
    pub message: String,
}

impl ServiceError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// HTTP status of the failed call, when the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self.kind {
            FailureKind::HttpStatus(code) => Some(code),
            _ => None,
        }
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

impl std::error::Error for ServiceError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Network,
    /// The server answered but the body could not be understood.
    Protocol,
    Io,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Protocol => write!(f, "protocol error"),
            FailureKind::Io => write!(f, "io error"),
        }
    }
}

/// The engine thread is gone; no further events will arrive.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("the engine thread has stopped")]
pub struct EngineStopped;
