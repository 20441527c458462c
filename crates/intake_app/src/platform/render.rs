//! Console rendering of the session view.

use intake_core::{
    AppViewModel, NoticeLevel, PollerState, StatusCode, SurfaceId, TemplateRegistry,
    UploadOutcome,
};

/// What has already been written to the console.
#[derive(Debug, Default)]
pub struct ConsoleCursor {
    notices: usize,
    log_appended: usize,
    progress: Option<u8>,
}

impl ConsoleCursor {
    /// Forget printed state after the session was rebuilt.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Lines for everything that changed since the last call.
pub fn render_updates(view: &AppViewModel, cursor: &mut ConsoleCursor) -> Vec<String> {
    let mut lines = Vec::new();

    if view.notices.len() < cursor.notices {
        cursor.notices = 0;
    }
    for notice in &view.notices[cursor.notices..] {
        let level = match notice.level {
            NoticeLevel::Info => "note",
            NoticeLevel::Error => "error",
        };
        match notice.surface {
            Some(surface) => lines.push(format!("{level} [{}]: {}", surface_name(surface), notice.text)),
            None => lines.push(format!("{level}: {}", notice.text)),
        }
    }
    cursor.notices = view.notices.len();

    if view.poller == PollerState::Polling || view.stage == StatusCode::Running {
        if cursor.progress != Some(view.progress) {
            let message = view.status_message.as_deref().unwrap_or("Running");
            lines.push(format!("[{:>3}%] {}", view.progress, message));
            cursor.progress = Some(view.progress);
        }
        // Entries evicted before they were printed are skipped.
        let fresh = view
            .status_log_appended
            .saturating_sub(cursor.log_appended)
            .min(view.status_log.len());
        for entry in &view.status_log[view.status_log.len() - fresh..] {
            lines.push(format!("  {:<20}  {}", entry.timestamp, entry.message));
        }
        cursor.log_appended = view.status_log_appended;
    }
    lines
}

/// Final state of the session.
pub fn render_summary(view: &AppViewModel) -> Vec<String> {
    let mut lines = Vec::new();

    for outcome in &view.last_upload {
        let text = match &outcome.outcome {
            UploadOutcome::Accepted if outcome.inserted => "added".to_string(),
            UploadOutcome::Accepted => "accepted (already listed)".to_string(),
            UploadOutcome::RejectedValidation => "rejected: did not validate".to_string(),
            UploadOutcome::RejectedMetadata => "rejected: metadata error".to_string(),
            UploadOutcome::RejectedConversion => "rejected: conversion failed".to_string(),
            UploadOutcome::RejectedParameters(fragment) => {
                let errors: Vec<_> = fragment
                    .fields
                    .iter()
                    .filter_map(|field| {
                        field
                            .error
                            .as_ref()
                            .map(|error| format!("{}: {}", field.name, error))
                    })
                    .collect();
                format!("rejected: parameter errors ({})", errors.join("; "))
            }
        };
        lines.push(format!("{} {}", outcome.filename, text));
    }

    for surface in &view.surfaces {
        if let Some(error) = &surface.error {
            lines.push(format!("{} form: {}", surface_name(surface.surface), error));
        }
        for error in markup_errors(&surface.markup) {
            lines.push(format!("  {error}"));
        }
    }

    if view.loaded {
        lines.push(format!("Input files ({}):", view.input_files.len()));
        for row in &view.input_files {
            lines.push(format!(
                "  {:<32} {:<24} {}",
                row.filename,
                row.template_label,
                row.format.as_deref().unwrap_or("")
            ));
        }
        let stage = match view.stage {
            StatusCode::NotStarted => "accepting input",
            StatusCode::Running => "running",
            StatusCode::Done => "done",
        };
        match &view.status_message {
            Some(message) => lines.push(format!("Status: {stage} ({}%) {message}", view.progress)),
            None => lines.push(format!("Status: {stage} ({}%)", view.progress)),
        }
    }
    lines
}

pub fn render_templates(registry: &TemplateRegistry) -> Vec<String> {
    let list = registry.selectable_list();
    let mut lines = Vec::new();
    for (id, label) in &list.entries {
        let Some(template) = registry.lookup(id) else {
            continue;
        };
        let mut line = format!("{id:<24} {label}");
        if let Some(filename) = &template.forced_filename {
            line.push_str(&format!(" [file {filename}]"));
        } else if let Some(extension) = &template.forced_extension {
            line.push_str(&format!(" [*.{extension}]"));
        }
        if template.accepts_archive {
            line.push_str(" [archives]");
        }
        if list.preselect.as_deref() == Some(id.as_str()) {
            line.push_str(" (default)");
        }
        lines.push(line);
        for field in &template.parameters.fields {
            lines.push(format!("    -P {}=...  {}", field.id, field.name));
        }
        for converter in &template.converters {
            lines.push(format!("    --converter {}  {}", converter.id, converter.label));
        }
        for source in &template.input_sources {
            lines.push(format!("    source {}  {}", source.id, source.label));
        }
    }
    if lines.is_empty() {
        lines.push("The project accepts no input types.".to_string());
    }
    lines
}

fn surface_name(surface: SurfaceId) -> &'static str {
    match surface {
        SurfaceId::Upload => "upload",
        SurfaceId::UrlUpload => "url",
        SurfaceId::Editor => "editor",
        SurfaceId::InputSource => "source",
    }
}

/// Field errors embedded in rendered form markup.
fn markup_errors(markup: &str) -> Vec<String> {
    const OPEN: &str = "<div class=\"error\">";
    let mut errors = Vec::new();
    let mut rest = markup;
    while let Some(start) = rest.find(OPEN) {
        rest = &rest[start + OPEN.len()..];
        let Some(end) = rest.find("</div>") else {
            break;
        };
        errors.push(unescape(&rest[..end]));
        rest = &rest[end..];
    }
    errors
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
