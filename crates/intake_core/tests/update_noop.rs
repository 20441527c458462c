use intake_core::{update, AppState, Effect, Msg};

#[test]
fn tick_leaves_state_unchanged() {
    let state = AppState::new();
    let (next, effects) = update(state.clone(), Msg::Tick);

    assert_eq!(state, next);
    assert!(effects.is_empty());
}

#[test]
fn tick_before_load_emits_nothing() {
    let (next, effects) = update(AppState::new(), Msg::Tick);
    assert!(!next.is_loaded());
    assert_eq!(effects, Vec::<Effect>::new());
}
