use intake_core::{
    normalize_project_name, update, AppState, Destination, Effect, LifecycleAction, Msg,
    RequestFailure, SurfaceId, ValidationError,
};
use pretty_assertions::assert_eq;

#[test]
fn project_names_are_trimmed_and_spaces_replaced() {
    assert_eq!(normalize_project_name("  my corpus run ").unwrap(), "my_corpus_run");
    assert_eq!(
        normalize_project_name("   "),
        Err(ValidationError::EmptyProjectName)
    );
}

#[test]
fn create_navigates_to_new_project() {
    let (state, effects) = update(
        AppState::new(),
        Msg::CreateProjectClicked {
            name: "test run".to_string(),
        },
    );
    let action = LifecycleAction::Create {
        project: "test_run".to_string(),
    };
    assert_eq!(effects, vec![Effect::Lifecycle(action.clone())]);
    assert_eq!(state.pending_requests(), 1);

    let (state, effects) = update(state, Msg::LifecycleSucceeded(action));
    assert_eq!(
        effects,
        vec![Effect::Navigate(Destination::Project("test_run".to_string()))]
    );
    assert_eq!(state.pending_requests(), 0);
}

#[test]
fn empty_project_name_is_rejected_locally() {
    let (state, effects) = update(
        AppState::new(),
        Msg::CreateProjectClicked {
            name: String::new(),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.notices()[0].text, "No project ID specified");
}

#[test]
fn abort_and_delete_return_to_index_and_restart_reloads() {
    for (msg, action, expected) in [
        (
            Msg::AbortClicked,
            LifecycleAction::Abort,
            Effect::Navigate(Destination::Index),
        ),
        (
            Msg::DeleteProjectClicked,
            LifecycleAction::Delete,
            Effect::Navigate(Destination::Index),
        ),
        (Msg::RestartClicked, LifecycleAction::Restart, Effect::Reload),
    ] {
        let (state, effects) = update(AppState::new(), msg);
        assert_eq!(effects, vec![Effect::Lifecycle(action.clone())]);
        let (_, effects) = update(state, Msg::LifecycleSucceeded(action));
        assert_eq!(effects, vec![expected]);
    }
}

#[test]
fn failures_prefer_server_text_over_fallback() {
    let create = LifecycleAction::Create {
        project: "x".to_string(),
    };
    assert_eq!(
        create.failure_text(&RequestFailure::new(Some(403), "Project already exists")),
        "Project already exists"
    );
    assert!(create
        .failure_text(&RequestFailure::new(Some(403), ""))
        .starts_with("Unable to create project, the server returned an error (HTTP 403)"));
    assert_eq!(
        LifecycleAction::Delete.failure_text(&RequestFailure::new(None, "")),
        "Unable to delete project (no response)"
    );
    assert_eq!(
        LifecycleAction::Restart.failure_text(&RequestFailure::new(Some(500), " ")),
        "Unable to delete output files (500)"
    );

    let (state, _) = update(AppState::new(), Msg::RestartClicked);
    let (state, effects) = update(
        state,
        Msg::LifecycleFailed {
            action: LifecycleAction::Restart,
            failure: RequestFailure::new(Some(500), ""),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(
        state.notices().last().map(|n| n.text.as_str()),
        Some("Unable to delete output files (500)")
    );
}

#[test]
fn project_source_selection_reloads_on_success() {
    let (state, effects) = update(
        AppState::new(),
        Msg::ProjectSourceSelected {
            source_id: "corpus1".to_string(),
        },
    );
    assert_eq!(
        effects,
        vec![Effect::SelectProjectSource {
            source_id: "corpus1".to_string()
        }]
    );
    let (_, effects) = update(state, Msg::ProjectSourceAdded);
    assert_eq!(effects, vec![Effect::Reload]);
}

#[test]
fn project_source_failure_is_reported_on_its_surface() {
    let (state, effects) = update(
        AppState::new(),
        Msg::ProjectSourceSelected {
            source_id: String::new(),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.notices()[0].surface, Some(SurfaceId::InputSource));

    let (state, _) = update(
        state,
        Msg::ProjectSourceFailed(RequestFailure::new(Some(404), "")),
    );
    assert_eq!(
        state.notices().last().map(|n| n.text.as_str()),
        Some("Error, unable to add file (404)")
    );
}
