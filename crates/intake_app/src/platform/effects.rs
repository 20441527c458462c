use std::time::Duration;

use intake_core::{Destination, Effect, Msg, RequestFailure};
use intake_engine::{
    EngineEvent, EngineHandle, EngineStopped, FailureKind, ServiceError, ServiceSettings,
};
use intake_logging::{intake_debug, intake_warn};

/// Effects the runner cannot execute itself; the session driver handles them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionControl {
    Reload,
    Navigate(Destination),
}

pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(settings: ServiceSettings) -> Result<Self, ServiceError> {
        Ok(Self {
            engine: EngineHandle::new(settings)?,
        })
    }

    /// Starts a fresh session: results of requests issued for the previous
    /// one are dropped, then the project is loaded again.
    pub fn load_session(&mut self) {
        self.engine.reset();
        self.engine.load_session();
    }

    pub fn enqueue(&self, effects: Vec<Effect>) -> Vec<SessionControl> {
        let mut controls = Vec::new();
        for effect in effects {
            intake_debug!("Effect {:?}", effect);
            match effect {
                Effect::LoadTransform => self.engine.load_transform(),
                Effect::CreateInput(request) => self.engine.create_input(request),
                Effect::DeleteInput { filename } => self.engine.delete_input(filename),
                Effect::SelectProjectSource { source_id } => {
                    self.engine.select_project_source(source_id)
                }
                Effect::SchedulePoll { after, ticket } => self.engine.poll_status(after, ticket),
                Effect::Lifecycle(action) => self.engine.lifecycle(action),
                Effect::Reload => controls.push(SessionControl::Reload),
                Effect::Navigate(destination) => {
                    controls.push(SessionControl::Navigate(destination))
                }
            }
        }
        controls
    }

    /// Next engine completion as a session message, or `None` on timeout.
    pub fn next_msg(&self, timeout: Duration) -> Result<Option<Msg>, EngineStopped> {
        Ok(self.engine.recv_timeout(timeout)?.map(event_to_msg))
    }
}

pub fn event_to_msg(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::SessionLoaded(Ok(bootstrap)) => Msg::SessionLoaded(Box::new(bootstrap)),
        EngineEvent::SessionLoaded(Err(err)) => Msg::SessionLoadFailed(failure(&err)),
        EngineEvent::TransformLoaded(Ok(transform)) => Msg::TransformLoaded(transform),
        EngineEvent::TransformLoaded(Err(err)) => Msg::TransformFailed(failure(&err)),
        EngineEvent::InputCreated { surface, result } => match result {
            Ok(response) => Msg::UploadCompleted { surface, response },
            Err(err) => Msg::UploadFailed {
                surface,
                failure: failure(&err),
            },
        },
        EngineEvent::InputDeleted { filename, result } => match result {
            Ok(()) => Msg::DeleteInputSucceeded { filename },
            Err(err) => Msg::DeleteInputFailed {
                filename,
                failure: failure(&err),
            },
        },
        EngineEvent::ProjectSourceSelected(Ok(())) => Msg::ProjectSourceAdded,
        EngineEvent::ProjectSourceSelected(Err(err)) => Msg::ProjectSourceFailed(failure(&err)),
        EngineEvent::StatusPolled { ticket, result } => match result {
            Ok(status) => Msg::StatusPolled { ticket, status },
            Err(err) => Msg::StatusPollFailed {
                ticket,
                failure: failure(&err),
            },
        },
        EngineEvent::LifecycleCompleted { action, result } => match result {
            Ok(()) => Msg::LifecycleSucceeded(action),
            Err(err) => Msg::LifecycleFailed {
                action,
                failure: failure(&err),
            },
        },
    }
}

/// HTTP failures keep the server's own response text; everything else is
/// described by its kind.
fn failure(err: &ServiceError) -> RequestFailure {
    intake_warn!("Request failed: {}", err);
    match err.kind {
        FailureKind::HttpStatus(code) => RequestFailure::new(Some(code), err.message.clone()),
        _ => RequestFailure::new(None, err.to_string()),
    }
}
