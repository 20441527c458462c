use crate::{RequestFailure, ValidationError};

/// Project-level actions outside the upload pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleAction {
    Create { project: String },
    /// Stop execution but keep the project.
    Abort,
    Delete,
    /// Clear outputs so the project can run again.
    Restart,
}

impl LifecycleAction {
    pub fn failure_text(&self, failure: &RequestFailure) -> String {
        if !failure.message.trim().is_empty() {
            return failure.message.trim().to_string();
        }
        let status = failure
            .status
            .map(|code| code.to_string())
            .unwrap_or_else(|| "no response".to_string());
        match self {
            LifecycleAction::Create { .. } => format!(
                "Unable to create project, the server returned an error (HTTP {status}): \
Did you perhaps use spaces or special characters in the ID? Only underscores and \
alphanumeric characters are allowed."
            ),
            LifecycleAction::Abort | LifecycleAction::Delete => {
                format!("Unable to delete project ({status})")
            }
            LifecycleAction::Restart => format!("Unable to delete output files ({status})"),
        }
    }
}

/// Page the session navigates to after an action completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Index,
    Project(String),
}

/// Project ids may not contain spaces; typed spaces become underscores.
pub fn normalize_project_name(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyProjectName);
    }
    Ok(trimmed.replace(' ', "_"))
}
