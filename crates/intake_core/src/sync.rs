//! Upload response processing and manifest synchronization.

use intake_logging::{intake_debug, intake_info};

use crate::state::{FileOutcome, NoticeLevel};
use crate::{
    render_parameter_form, AppState, FileManifestEntry, SurfaceId, UploadBatch, UploadOutcome,
    UploadRecord,
};

/// Applies a decoded upload batch to the session.
///
/// Records are handled in response order. Stale inline errors on `surface`
/// are cleared once, up front, so an error raised by one record is not wiped
/// by the next.
pub(crate) fn process_upload_batch(
    state: &mut AppState,
    surface: SurfaceId,
    batch: UploadBatch,
) -> Vec<FileOutcome> {
    state.surface_mut(surface).clear_errors();

    for error in &batch.errors {
        state.push_notice(NoticeLevel::Error, Some(surface), error.message.clone());
    }

    let mut outcomes = Vec::with_capacity(batch.records.len());
    for record in batch.records {
        let outcome = record.outcome();
        let inserted = match &outcome {
            UploadOutcome::Accepted => accept(state, surface, &record),
            UploadOutcome::RejectedParameters(fragment) => {
                reject_parameters(state, surface, &record, fragment);
                false
            }
            UploadOutcome::RejectedValidation
            | UploadOutcome::RejectedMetadata
            | UploadOutcome::RejectedConversion => {
                intake_info!(
                    "File {} rejected: {:?} ({} error(s))",
                    record.filename,
                    outcome,
                    record.errors.len()
                );
                for error in &record.errors {
                    state.push_notice(NoticeLevel::Error, Some(surface), error.message.clone());
                }
                false
            }
        };
        outcomes.push(FileOutcome {
            filename: record.filename,
            outcome,
            inserted,
        });
    }
    state.mark_dirty();
    outcomes
}

fn accept(state: &mut AppState, surface: SurfaceId, record: &UploadRecord) -> bool {
    let form = state.surface_mut(surface);
    if form.retry_filename.as_deref() == Some(record.filename.as_str()) {
        form.retry_filename = None;
    }

    let inserted = state.manifest.insert_if_absent(FileManifestEntry {
        filename: record.filename.clone(),
        template_label: record.template_label.clone(),
        format: record.format.clone(),
    });
    if inserted {
        intake_info!("Added input file {}", record.filename);
    } else {
        intake_debug!("Input file {} already listed", record.filename);
    }
    inserted
}

fn reject_parameters(
    state: &mut AppState,
    surface: SurfaceId,
    record: &UploadRecord,
    fragment: &crate::ParameterDescriptor,
) {
    intake_info!(
        "Parameter errors for {} ({} field error(s))",
        record.filename,
        fragment.fields.iter().filter(|f| f.error.is_some()).count()
    );
    let rendered = render_parameter_form(
        &state.registry,
        state.transform.as_ref(),
        &record.template_id,
        surface.converters_enabled(),
        Some(fragment),
    );
    let text = format!(
        "There were parameter errors, file {} not uploaded",
        record.filename
    );

    let form = state.surface_mut(surface);
    form.template_id = Some(record.template_id.clone());
    form.show(rendered);
    form.retry_filename = Some(record.filename.clone());
    if form.error.is_none() {
        form.error = Some(text.clone());
    }
    state.push_notice(NoticeLevel::Error, Some(surface), text);
}
