use std::sync::Once;
use std::time::Duration;

use intake_core::{
    update, AppState, Effect, LogEntry, Msg, PollerState, ProjectSnapshot, ProjectStatus,
    RequestFailure, SessionBootstrap, SessionConfig, StatusCode,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(intake_logging::initialize_for_tests);
}

fn entry(message: &str) -> LogEntry {
    LogEntry {
        message: message.to_string(),
        timestamp: "12/Mar/2024 10:00:00".to_string(),
    }
}

fn running(completion: u8, log: &[&str]) -> ProjectStatus {
    ProjectStatus {
        code: StatusCode::Running,
        message: Some("Processing".to_string()),
        completion,
        log: log.iter().map(|m| entry(m)).collect(),
    }
}

fn session_at(code: StatusCode, config: SessionConfig) -> (AppState, Vec<Effect>) {
    init_logging();
    let bootstrap = SessionBootstrap {
        project: ProjectSnapshot {
            status: ProjectStatus {
                code,
                ..ProjectStatus::default()
            },
            ..ProjectSnapshot::default()
        },
        ..SessionBootstrap::default()
    };
    update(
        AppState::with_config(config),
        Msg::SessionLoaded(Box::new(bootstrap)),
    )
}

fn polls(effects: &[Effect]) -> usize {
    effects
        .iter()
        .filter(|effect| matches!(effect, Effect::SchedulePoll { .. }))
        .count()
}

fn ticket(effects: &[Effect]) -> u64 {
    effects
        .iter()
        .find_map(|effect| match effect {
            Effect::SchedulePoll { ticket, .. } => Some(*ticket),
            _ => None,
        })
        .expect("scheduled poll")
}

/// Answers the poll scheduled in `effects` with `status`.
fn answer(state: AppState, effects: &[Effect], status: ProjectStatus) -> (AppState, Vec<Effect>) {
    update(
        state,
        Msg::StatusPolled {
            ticket: ticket(effects),
            status,
        },
    )
}

#[test]
fn running_project_starts_polling_once() {
    let (state, effects) = session_at(StatusCode::Running, SessionConfig::default());
    assert_eq!(state.poller(), PollerState::Polling);
    assert_eq!(polls(&effects), 1);
    assert!(effects.contains(&Effect::SchedulePoll {
        after: Duration::from_millis(2000),
        ticket: 1,
    }));
    assert_eq!(state.pending_poll(), Some(1));
}

#[test]
fn non_running_project_never_polls() {
    for code in [StatusCode::NotStarted, StatusCode::Done] {
        let (state, effects) = session_at(code, SessionConfig::default());
        assert_eq!(state.poller(), PollerState::Idle);
        assert_eq!(polls(&effects), 0);
    }
}

#[test]
fn progress_follows_polls_and_never_regresses() {
    let (mut state, mut effects) = session_at(StatusCode::Running, SessionConfig::default());
    let mut seen = Vec::new();
    for completion in [10, 45, 30, 80, 0] {
        let (next, next_effects) = answer(state, &effects, running(completion, &[]));
        assert_eq!(polls(&next_effects), 1);
        seen.push(next.status().progress());
        state = next;
        effects = next_effects;
    }
    assert_eq!(seen, vec![10, 45, 45, 80, 80]);
    assert_eq!(state.view().status_message.as_deref(), Some("Processing"));
}

#[test]
fn terminal_status_stops_polling_and_reloads() {
    let (state, effects) = session_at(StatusCode::Running, SessionConfig::default());
    let (state, effects) = answer(state, &effects, running(45, &["started"]));
    let last = ticket(&effects);
    let (state, effects) = answer(
        state,
        &effects,
        ProjectStatus {
            code: StatusCode::Done,
            completion: 100,
            ..ProjectStatus::default()
        },
    );
    assert_eq!(effects, vec![Effect::Reload]);
    assert_eq!(state.poller(), PollerState::Terminated);
    assert_eq!(state.stage(), StatusCode::Done);
    assert_eq!(state.pending_poll(), None);

    // A late result after termination changes nothing.
    let (state, effects) = update(
        state,
        Msg::StatusPolled {
            ticket: last,
            status: running(50, &[]),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.poller(), PollerState::Terminated);
}

#[test]
fn transport_error_keeps_polling() {
    let (state, effects) = session_at(StatusCode::Running, SessionConfig::default());
    let (state, effects) = update(
        state,
        Msg::StatusPollFailed {
            ticket: ticket(&effects),
            failure: RequestFailure::new(Some(502), ""),
        },
    );
    assert_eq!(polls(&effects), 1);
    assert_eq!(state.poller(), PollerState::Polling);
    assert_eq!(
        state.notices().last().map(|n| n.text.as_str()),
        Some("Error obtaining status: the server returned HTTP 502")
    );

    // Repeated failures do not flood the notice list.
    let (state, _) = update(
        state,
        Msg::StatusPollFailed {
            ticket: ticket(&effects),
            failure: RequestFailure::new(Some(502), ""),
        },
    );
    assert_eq!(state.notices().len(), 1);
}

#[test]
fn log_entries_are_appended_in_order_without_duplicates() {
    let (state, effects) = session_at(StatusCode::Running, SessionConfig::default());
    let (state, effects) = answer(state, &effects, running(10, &["a", "b"]));
    let (state, _) = answer(state, &effects, running(20, &["a", "b", "c"]));
    let messages: Vec<_> = state.status().log().map(|e| e.message.clone()).collect();
    assert_eq!(messages, vec!["a", "b", "c"]);
}

#[test]
fn log_view_is_bounded() {
    let config = SessionConfig {
        max_log_entries: 3,
        ..SessionConfig::default()
    };
    let (state, effects) = session_at(StatusCode::Running, config);
    let (state, effects) = answer(state, &effects, running(10, &["1", "2", "3", "4", "5"]));
    let (state, _) = answer(
        state,
        &effects,
        running(20, &["1", "2", "3", "4", "5", "6"]),
    );
    let messages: Vec<_> = state.status().log().map(|e| e.message.clone()).collect();
    assert_eq!(messages, vec!["4", "5", "6"]);
    assert_eq!(state.status().appended(), 6);
}

#[test]
fn shrunken_server_log_replaces_view() {
    let (state, effects) = session_at(StatusCode::Running, SessionConfig::default());
    let (state, effects) = answer(state, &effects, running(10, &["a", "b", "c"]));
    let (state, _) = answer(state, &effects, running(20, &["x"]));
    let messages: Vec<_> = state.status().log().map(|e| e.message.clone()).collect();
    assert_eq!(messages, vec!["x"]);
}

#[test]
fn idle_session_ignores_status_results() {
    let (state, _) = session_at(StatusCode::NotStarted, SessionConfig::default());
    let (state, effects) = update(
        state,
        Msg::StatusPolled {
            ticket: 1,
            status: running(60, &["a"]),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.status().progress(), 0);
    assert_eq!(state.status().log_len(), 0);
}

#[test]
fn unexpected_poll_result_does_not_start_a_second_loop() {
    let (state, effects) = session_at(StatusCode::Running, SessionConfig::default());
    assert_eq!(polls(&effects), 1);
    let awaited = ticket(&effects);

    // A result for a poll this session never scheduled.
    let (state, stray) = update(
        state,
        Msg::StatusPolled {
            ticket: awaited + 7,
            status: running(10, &["stale"]),
        },
    );
    assert!(stray.is_empty());
    assert_eq!(state.status().progress(), 0);
    assert_eq!(state.pending_poll(), Some(awaited));

    // The awaited result continues the single loop.
    let (state, effects) = answer(state, &effects, running(20, &[]));
    assert_eq!(polls(&effects), 1);
    assert_eq!(state.status().progress(), 20);

    // Delivering the same result twice is ignored the second time.
    let (state, repeated) = update(
        state,
        Msg::StatusPolled {
            ticket: awaited,
            status: running(30, &[]),
        },
    );
    assert!(repeated.is_empty());
    assert_eq!(state.status().progress(), 20);
    assert_eq!(state.pending_poll(), Some(ticket(&effects)));
}
