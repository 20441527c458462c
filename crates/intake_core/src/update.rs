use intake_logging::{intake_debug, intake_info, intake_warn};

use crate::state::NoticeLevel;
use crate::sync::process_upload_batch;
use crate::{
    normalize_project_name, prepare_request, render_parameter_form, AppState, Destination, Effect,
    LifecycleAction, Msg, PollerState, RequestFailure, StatusCode, SurfaceId, UploadResponse,
    ValidationError,
};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::SessionLoaded(bootstrap) => {
            state.load(*bootstrap);
            intake_info!(
                "Session loaded: {} template(s), {} input file(s), stage {:?}",
                state.registry().len(),
                state.manifest().len(),
                state.stage()
            );
            let mut effects = Vec::new();
            if !state.has_transform() {
                effects.push(Effect::LoadTransform);
            }
            if state.stage() == StatusCode::Running && state.poller() == PollerState::Idle {
                state.set_poller(PollerState::Polling);
                effects.push(state.schedule_poll());
            }
            effects
        }
        Msg::SessionLoadFailed(failure) => {
            state.push_notice(
                NoticeLevel::Error,
                None,
                format!("Unable to load project: {}", describe(&failure)),
            );
            Vec::new()
        }
        Msg::TransformLoaded(transform) => {
            state.transform = Some(transform);
            // Surfaces with a preselected type could not render until now.
            let selected: Vec<_> = state
                .surfaces
                .iter()
                .filter_map(|(id, surface)| surface.template_id.clone().map(|t| (*id, t)))
                .collect();
            for (surface, template_id) in selected {
                render_surface(&mut state, surface, &template_id);
            }
            state.mark_dirty();
            Vec::new()
        }
        Msg::TransformFailed(failure) => {
            state.push_notice(
                NoticeLevel::Error,
                None,
                format!("Unable to load the parameter form: {}", describe(&failure)),
            );
            Vec::new()
        }
        Msg::TemplateSelected {
            surface,
            template_id,
        } => {
            let forced_filename = state
                .registry()
                .lookup(&template_id)
                .and_then(|template| template.forced_filename.clone());
            let form = state.surface_mut(surface);
            form.template_id = (!template_id.is_empty()).then(|| template_id.clone());
            form.retry_filename = None;
            form.forced_filename = if surface == SurfaceId::Editor {
                forced_filename
            } else {
                None
            };
            render_surface(&mut state, surface, &template_id);
            state.mark_dirty();
            Vec::new()
        }
        Msg::SubmitRequested(submission) => {
            let surface = submission.channel.surface();
            let retry = state.surface(surface).retry_filename.clone();
            match prepare_request(state.registry(), &submission, retry.as_deref()) {
                Ok(request) => {
                    intake_info!(
                        "Submitting {} as {} via {:?}",
                        request.filename,
                        request.template_id,
                        surface
                    );
                    state.surface_mut(surface).clear_errors();
                    state.begin_request();
                    state.mark_dirty();
                    vec![Effect::CreateInput(request)]
                }
                Err(err) => {
                    intake_debug!("Submission on {:?} rejected locally: {}", surface, err);
                    state.surface_mut(surface).error = Some(err.to_string());
                    state.push_notice(NoticeLevel::Error, Some(surface), err.to_string());
                    Vec::new()
                }
            }
        }
        Msg::UploadCompleted { surface, response } => {
            state.finish_request();
            match response {
                UploadResponse::Archive => {
                    intake_info!("Archive accepted on {:?}; reloading project", surface);
                    state.set_last_upload(Vec::new());
                    state.mark_dirty();
                    vec![Effect::Reload]
                }
                UploadResponse::Files(batch) => {
                    let outcomes = process_upload_batch(&mut state, surface, batch);
                    state.set_last_upload(outcomes);
                    Vec::new()
                }
            }
        }
        Msg::UploadFailed { surface, failure } => {
            state.finish_request();
            let text = format!("Submission failed: {}", describe(&failure));
            intake_warn!("{}", text);
            state.surface_mut(surface).error = Some(text.clone());
            state.push_notice(NoticeLevel::Error, Some(surface), text);
            Vec::new()
        }
        Msg::DeleteInputClicked { filename } => {
            if state.manifest.remove(&filename).is_some() {
                intake_info!("Removed input file {}", filename);
            }
            state.begin_request();
            state.mark_dirty();
            vec![Effect::DeleteInput { filename }]
        }
        Msg::DeleteInputSucceeded { filename } => {
            state.finish_request();
            intake_debug!("Remote delete of {} confirmed", filename);
            state.mark_dirty();
            Vec::new()
        }
        Msg::DeleteInputFailed { filename, failure } => {
            state.finish_request();
            state.push_notice(
                NoticeLevel::Error,
                None,
                format!("Unable to delete {filename}: {}", describe(&failure)),
            );
            Vec::new()
        }
        Msg::ProjectSourceSelected { source_id } => {
            if source_id.is_empty() {
                state.push_notice(
                    NoticeLevel::Error,
                    Some(SurfaceId::InputSource),
                    ValidationError::EmptySource.to_string(),
                );
                Vec::new()
            } else {
                state.begin_request();
                state.mark_dirty();
                vec![Effect::SelectProjectSource { source_id }]
            }
        }
        Msg::ProjectSourceAdded => {
            state.finish_request();
            vec![Effect::Reload]
        }
        Msg::ProjectSourceFailed(failure) => {
            state.finish_request();
            let text = if failure.message.trim().is_empty() {
                format!(
                    "Error, unable to add file ({})",
                    failure
                        .status
                        .map(|code| code.to_string())
                        .unwrap_or_else(|| "no response".to_string())
                )
            } else {
                failure.message.trim().to_string()
            };
            state.push_notice(NoticeLevel::Error, Some(SurfaceId::InputSource), text);
            Vec::new()
        }
        Msg::StatusPolled { ticket, status } => {
            if !state.settle_poll(ticket) || state.poller() != PollerState::Polling {
                intake_debug!("Ignoring status for poll {}", ticket);
                return (state, Vec::new());
            }
            state.set_stage(status.code);
            state.apply_status(&status);
            if status.code == StatusCode::Running {
                vec![state.schedule_poll()]
            } else {
                intake_info!("Project left the running stage ({:?})", status.code);
                state.set_poller(PollerState::Terminated);
                vec![Effect::Reload]
            }
        }
        Msg::StatusPollFailed { ticket, failure } => {
            if !state.settle_poll(ticket) || state.poller() != PollerState::Polling {
                intake_debug!("Ignoring failure of poll {}", ticket);
                return (state, Vec::new());
            }
            intake_warn!("Status poll failed: {}", describe(&failure));
            state.push_notice(
                NoticeLevel::Error,
                None,
                format!("Error obtaining status: {}", describe(&failure)),
            );
            vec![state.schedule_poll()]
        }
        Msg::CreateProjectClicked { name } => match normalize_project_name(&name) {
            Ok(project) => start_lifecycle(&mut state, LifecycleAction::Create { project }),
            Err(err) => {
                state.push_notice(NoticeLevel::Error, None, err.to_string());
                Vec::new()
            }
        },
        Msg::AbortClicked => start_lifecycle(&mut state, LifecycleAction::Abort),
        Msg::DeleteProjectClicked => start_lifecycle(&mut state, LifecycleAction::Delete),
        Msg::RestartClicked => start_lifecycle(&mut state, LifecycleAction::Restart),
        Msg::LifecycleSucceeded(action) => {
            state.finish_request();
            state.mark_dirty();
            match action {
                LifecycleAction::Create { project } => {
                    vec![Effect::Navigate(Destination::Project(project))]
                }
                LifecycleAction::Abort | LifecycleAction::Delete => {
                    vec![Effect::Navigate(Destination::Index)]
                }
                LifecycleAction::Restart => vec![Effect::Reload],
            }
        }
        Msg::LifecycleFailed { action, failure } => {
            state.finish_request();
            state.push_notice(NoticeLevel::Error, None, action.failure_text(&failure));
            Vec::new()
        }
        Msg::NoticesDismissed => {
            state.clear_notices();
            Vec::new()
        }
        Msg::Tick => Vec::new(),
    };

    (state, effects)
}

fn render_surface(state: &mut AppState, surface: SurfaceId, template_id: &str) {
    let rendered = render_parameter_form(
        &state.registry,
        state.transform.as_ref(),
        template_id,
        surface.converters_enabled(),
        None,
    );
    state.surface_mut(surface).show(rendered);
}

fn start_lifecycle(state: &mut AppState, action: LifecycleAction) -> Vec<Effect> {
    intake_info!("Lifecycle action requested: {:?}", action);
    state.begin_request();
    state.mark_dirty();
    vec![Effect::Lifecycle(action)]
}

fn describe(failure: &RequestFailure) -> String {
    match (failure.status, failure.message.trim()) {
        (Some(code), "") => format!("the server returned HTTP {code}"),
        (Some(code), message) => format!("{message} (HTTP {code})"),
        (None, "") => "no response from the server".to_string(),
        (None, message) => message.to_string(),
    }
}
