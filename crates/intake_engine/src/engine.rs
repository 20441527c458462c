use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use intake_core::{CreateInputRequest, LifecycleAction};
use intake_logging::{intake_debug, intake_error};

use crate::service::{ProjectService, ReqwestService, ServiceSettings};
use crate::{EngineEvent, EngineStopped, FailureKind, ServiceError};

enum EngineCommand {
    LoadSession,
    LoadTransform,
    CreateInput(CreateInputRequest),
    DeleteInput { filename: String },
    SelectProjectSource { source_id: String },
    PollStatus { after: Duration, ticket: u64 },
    Lifecycle(LifecycleAction),
}

/// Runs service calls on a background tokio runtime. Each command settles
/// with exactly one [`EngineEvent`].
///
/// Commands and their events carry the generation current at submission;
/// after [`EngineHandle::reset`] events of older generations are dropped.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<(u64, EngineCommand)>,
    event_rx: mpsc::Receiver<(u64, EngineEvent)>,
    generation: u64,
}

impl EngineHandle {
    pub fn new(settings: ServiceSettings) -> Result<Self, ServiceError> {
        Self::with_service(Arc::new(ReqwestService::new(settings)?))
    }

    pub fn with_service(service: Arc<dyn ProjectService>) -> Result<Self, ServiceError> {
        let runtime = tokio::runtime::Runtime::new().map_err(|err| {
            ServiceError::new(
                FailureKind::Io,
                format!("unable to start the engine runtime: {err}"),
            )
        })?;
        let (cmd_tx, cmd_rx) = mpsc::channel::<(u64, EngineCommand)>();
        let (event_tx, event_rx) = mpsc::channel();

        thread::spawn(move || {
            while let Ok((generation, command)) = cmd_rx.recv() {
                let service = service.clone();
                let event_tx = event_tx.clone();
                runtime.spawn(async move {
                    let event = handle_command(service.as_ref(), command).await;
                    let _ = event_tx.send((generation, event));
                });
            }
            intake_debug!("Engine command channel closed");
        });

        Ok(Self {
            cmd_tx,
            event_rx,
            generation: 0,
        })
    }

    /// Starts a new generation. Completions of commands submitted before
    /// this call are discarded when they arrive.
    pub fn reset(&mut self) {
        self.generation += 1;
        intake_debug!("Engine generation {}", self.generation);
    }

    fn submit(&self, command: EngineCommand) {
        if self.cmd_tx.send((self.generation, command)).is_err() {
            intake_error!("Engine thread has stopped; command dropped");
        }
    }

    pub fn load_session(&self) {
        self.submit(EngineCommand::LoadSession);
    }

    pub fn load_transform(&self) {
        self.submit(EngineCommand::LoadTransform);
    }

    pub fn create_input(&self, request: CreateInputRequest) {
        self.submit(EngineCommand::CreateInput(request));
    }

    pub fn delete_input(&self, filename: impl Into<String>) {
        self.submit(EngineCommand::DeleteInput {
            filename: filename.into(),
        });
    }

    pub fn select_project_source(&self, source_id: impl Into<String>) {
        self.submit(EngineCommand::SelectProjectSource {
            source_id: source_id.into(),
        });
    }

    /// Polls the project status once `after` has elapsed. The result event
    /// echoes `ticket`.
    pub fn poll_status(&self, after: Duration, ticket: u64) {
        self.submit(EngineCommand::PollStatus { after, ticket });
    }

    pub fn lifecycle(&self, action: LifecycleAction) {
        self.submit(EngineCommand::Lifecycle(action));
    }

    pub fn try_recv(&self) -> Result<Option<EngineEvent>, EngineStopped> {
        loop {
            match self.event_rx.try_recv() {
                Ok((generation, event)) if generation == self.generation => {
                    return Ok(Some(event))
                }
                Ok((_, event)) => self.discard(&event),
                Err(mpsc::TryRecvError::Empty) => return Ok(None),
                Err(mpsc::TryRecvError::Disconnected) => return Err(EngineStopped),
            }
        }
    }

    /// Waits up to `timeout` for the next event of the current generation.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<EngineEvent>, EngineStopped> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.event_rx.recv_timeout(remaining) {
                Ok((generation, event)) if generation == self.generation => {
                    return Ok(Some(event))
                }
                Ok((_, event)) => self.discard(&event),
                Err(mpsc::RecvTimeoutError::Timeout) => return Ok(None),
                Err(mpsc::RecvTimeoutError::Disconnected) => return Err(EngineStopped),
            }
        }
    }

    fn discard(&self, event: &EngineEvent) {
        intake_debug!("Dropping event from an earlier session: {:?}", event);
    }
}

async fn handle_command(service: &dyn ProjectService, command: EngineCommand) -> EngineEvent {
    match command {
        EngineCommand::LoadSession => EngineEvent::SessionLoaded(service.load_session().await),
        EngineCommand::LoadTransform => {
            EngineEvent::TransformLoaded(service.load_transform().await)
        }
        EngineCommand::CreateInput(request) => EngineEvent::InputCreated {
            surface: request.surface,
            result: service.create_input(&request).await,
        },
        EngineCommand::DeleteInput { filename } => {
            let result = service.delete_input(&filename).await;
            EngineEvent::InputDeleted { filename, result }
        }
        EngineCommand::SelectProjectSource { source_id } => {
            EngineEvent::ProjectSourceSelected(service.select_input_source(&source_id).await)
        }
        EngineCommand::PollStatus { after, ticket } => {
            tokio::time::sleep(after).await;
            EngineEvent::StatusPolled {
                ticket,
                result: service.poll_status().await,
            }
        }
        EngineCommand::Lifecycle(action) => {
            let result = service.lifecycle(&action).await;
            EngineEvent::LifecycleCompleted { action, result }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_event_channel_reports_a_stopped_engine() {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        drop(cmd_rx);
        drop(event_tx);
        let engine = EngineHandle {
            cmd_tx,
            event_rx,
            generation: 0,
        };

        engine.load_session();
        assert_eq!(
            engine.recv_timeout(Duration::from_millis(50)),
            Err(EngineStopped)
        );
        assert_eq!(engine.try_recv(), Err(EngineStopped));
    }
}
