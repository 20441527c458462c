use std::time::Duration;

use crate::{CreateInputRequest, Destination, LifecycleAction};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Fetch the shared parameter transform.
    LoadTransform,
    CreateInput(CreateInputRequest),
    DeleteInput { filename: String },
    SelectProjectSource { source_id: String },
    /// Poll status once `after` has elapsed. At most one is outstanding; its
    /// result must come back with the same `ticket`.
    SchedulePoll { after: Duration, ticket: u64 },
    Lifecycle(LifecycleAction),
    /// Discard the session and load the project afresh.
    Reload,
    Navigate(Destination),
}
