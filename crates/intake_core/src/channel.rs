//! Upload channel adapters: every ingestion route is normalized into one
//! [`CreateInputRequest`].

use std::path::PathBuf;

use url::Url;

use crate::{
    CreateInputRequest, InputPayload, SurfaceId, TemplateId, TemplateRegistry, ValidationError,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadChannel {
    /// Direct upload of a local file.
    LocalFile { path: PathBuf },
    /// Server-side fetch of a remote URL.
    Url { url: String },
    /// Inline text typed into the editor.
    Editor { filename: String, contents: String },
    /// Pre-installed data offered by the template.
    ExistingSource { source_id: String, filename: String },
}

impl UploadChannel {
    pub fn surface(&self) -> SurfaceId {
        match self {
            UploadChannel::LocalFile { .. } => SurfaceId::Upload,
            UploadChannel::Url { .. } => SurfaceId::UrlUpload,
            UploadChannel::Editor { .. } => SurfaceId::Editor,
            UploadChannel::ExistingSource { .. } => SurfaceId::InputSource,
        }
    }

    /// Filename the user implied before template constraints are applied.
    pub fn candidate_filename(&self) -> String {
        match self {
            UploadChannel::LocalFile { path } => basename(&path.to_string_lossy()).to_string(),
            UploadChannel::Url { url } => url_filename(url),
            UploadChannel::Editor { filename, .. }
            | UploadChannel::ExistingSource { filename, .. } => filename.trim().to_string(),
        }
    }

    fn payload(&self) -> Result<InputPayload, ValidationError> {
        match self {
            UploadChannel::LocalFile { path } => Ok(InputPayload::LocalFile(path.clone())),
            UploadChannel::Url { url } if !url.trim().is_empty() => {
                Ok(InputPayload::Url(url.trim().to_string()))
            }
            UploadChannel::Editor { contents, .. } if !contents.is_empty() => {
                Ok(InputPayload::Contents(contents.clone()))
            }
            UploadChannel::ExistingSource { source_id, .. } if !source_id.is_empty() => {
                Ok(InputPayload::InputSource(source_id.clone()))
            }
            _ => Err(ValidationError::EmptySource),
        }
    }
}

/// A user's request to add one input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub channel: UploadChannel,
    pub template_id: TemplateId,
    pub converter: Option<String>,
    /// Values the user filled into the parameter form, by field id.
    pub fields: Vec<(String, String)>,
}

impl Submission {
    pub fn new(channel: UploadChannel, template_id: impl Into<TemplateId>) -> Self {
        Self {
            channel,
            template_id: template_id.into(),
            converter: None,
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, id: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((id.into(), value.into()));
        self
    }

    pub fn with_converter(mut self, converter: impl Into<String>) -> Self {
        self.converter = Some(converter.into());
        self
    }
}

/// Validates a submission and builds the request to send.
///
/// `retry_filename` is used when the channel names no file itself, so a
/// resubmission after a parameter error targets the same file.
pub fn prepare_request(
    registry: &TemplateRegistry,
    submission: &Submission,
    retry_filename: Option<&str>,
) -> Result<CreateInputRequest, ValidationError> {
    if submission.template_id.is_empty() {
        return Err(ValidationError::NoTemplateSelected);
    }
    let surface = submission.channel.surface();
    let payload = submission.channel.payload()?;

    let mut candidate = submission.channel.candidate_filename();
    if candidate.is_empty() {
        candidate = retry_filename.unwrap_or_default().to_string();
    }
    let filename = registry.validate_and_normalize_filename(&candidate, &submission.template_id)?;

    let converter = submission
        .converter
        .clone()
        .filter(|converter| !converter.is_empty() && surface.converters_enabled());
    let parameters = submission
        .fields
        .iter()
        .filter(|(id, _)| !id.is_empty() && id != "converter")
        .cloned()
        .collect();

    Ok(CreateInputRequest {
        surface,
        filename,
        template_id: submission.template_id.clone(),
        payload,
        converter,
        parameters,
    })
}

fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

fn url_filename(raw: &str) -> String {
    let raw = raw.trim();
    if let Ok(url) = Url::parse(raw) {
        if let Some(last) = url.path_segments().and_then(|mut segments| segments.next_back()) {
            return last.to_string();
        }
    }
    raw.rsplit('/').next().unwrap_or(raw).to_string()
}
