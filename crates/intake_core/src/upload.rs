use std::path::PathBuf;

use crate::{ParameterDescriptor, SurfaceId, TemplateId};

/// Error kinds the service declares on a rejected file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileErrorKind {
    Validation,
    Metadata,
    Conversion,
}

impl FileErrorKind {
    /// Unknown or missing kinds count as validation failures.
    pub fn from_declared(kind: Option<&str>) -> Self {
        match kind.map(str::to_ascii_lowercase).as_deref() {
            Some("metadata" | "metadataerror") => Self::Metadata,
            Some("conversion" | "conversionerror") => Self::Conversion,
            _ => Self::Validation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileError {
    pub kind: FileErrorKind,
    pub message: String,
}

/// Per-file result record of an upload response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UploadRecord {
    pub template_id: TemplateId,
    pub filename: String,
    pub template_label: String,
    pub format: Option<String>,
    pub source: Option<String>,
    pub errors: Vec<FileError>,
    /// Parameter block echoed by the service, with per-field errors.
    pub parameters: Option<ParameterDescriptor>,
    pub parameters_errored: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Accepted,
    RejectedValidation,
    RejectedParameters(ParameterDescriptor),
    RejectedMetadata,
    RejectedConversion,
}

impl UploadOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, UploadOutcome::Accepted)
    }
}

impl UploadRecord {
    /// File-level errors take precedence over parameter errors; the first
    /// declared error decides the rejection kind.
    pub fn outcome(&self) -> UploadOutcome {
        if let Some(first) = self.errors.first() {
            return match first.kind {
                FileErrorKind::Validation => UploadOutcome::RejectedValidation,
                FileErrorKind::Metadata => UploadOutcome::RejectedMetadata,
                FileErrorKind::Conversion => UploadOutcome::RejectedConversion,
            };
        }
        if self.parameters_errored {
            return UploadOutcome::RejectedParameters(self.parameters.clone().unwrap_or_default());
        }
        UploadOutcome::Accepted
    }
}

/// Decoded upload response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadResponse {
    Files(UploadBatch),
    /// The submitted artifact was an archive that expanded server-side.
    Archive,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UploadBatch {
    pub records: Vec<UploadRecord>,
    /// Errors reported outside any per-file record.
    pub errors: Vec<FileError>,
}

impl UploadBatch {
    pub fn new(records: Vec<UploadRecord>) -> Self {
        Self {
            records,
            errors: Vec::new(),
        }
    }
}

/// Where the content of a new input file comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputPayload {
    LocalFile(PathBuf),
    Url(String),
    Contents(String),
    InputSource(String),
}

/// Normalized "create input file" request produced by every channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateInputRequest {
    pub surface: SurfaceId,
    pub filename: String,
    pub template_id: TemplateId,
    pub payload: InputPayload,
    pub converter: Option<String>,
    pub parameters: Vec<(String, String)>,
}
