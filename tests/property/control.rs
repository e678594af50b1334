use proptest::prelude::*;

use macroguard::engine::{ControlCommand, ControlMode, ExecutionState};

const STATES: [ExecutionState; 7] = [
    ExecutionState::Idle,
    ExecutionState::Running,
    ExecutionState::Paused,
    ExecutionState::Stepping,
    ExecutionState::Completed,
    ExecutionState::Failed,
    ExecutionState::Terminated,
];

const COMMANDS: [ControlCommand; 5] = [
    ControlCommand::Pause,
    ControlCommand::Resume,
    ControlCommand::Step,
    ControlCommand::Stop,
    ControlCommand::Terminate,
];

fn state() -> impl Strategy<Value = ExecutionState> {
    proptest::sample::select(STATES.to_vec())
}

fn command() -> impl Strategy<Value = ControlCommand> {
    proptest::sample::select(COMMANDS.to_vec())
}

fn mode() -> impl Strategy<Value = ControlMode> {
    prop_oneof![
        Just(ControlMode::AutonomousRun),
        Just(ControlMode::DebugInteractive)
    ]
}

/// Where the session ends up once the command takes effect.
fn target(command: ControlCommand) -> ExecutionState {
    match command {
        ControlCommand::Pause => ExecutionState::Paused,
        ControlCommand::Resume => ExecutionState::Running,
        ControlCommand::Step => ExecutionState::Stepping,
        ControlCommand::Stop | ControlCommand::Terminate => ExecutionState::Terminated,
    }
}

proptest! {
    #[test]
    fn available_commands_lead_to_legal_transitions(
        mode in mode(),
        state in state(),
        command in command(),
    ) {
        if command.is_available(mode, state) {
            prop_assert!(state.can_transition_to(target(command)));
        }
    }

    #[test]
    fn nothing_is_available_outside_an_active_session(
        mode in mode(),
        state in state(),
        command in command(),
    ) {
        if !state.is_active() {
            prop_assert!(!command.is_available(mode, state));
        }
    }

    #[test]
    fn random_walks_never_leave_a_terminal_state(
        walk in proptest::collection::vec(state(), 1..20),
    ) {
        let mut current = ExecutionState::Idle;
        for next in walk {
            if current.can_transition_to(next) {
                current = next;
            }
            if current.is_terminal() {
                for other in STATES {
                    prop_assert!(!current.can_transition_to(other));
                }
            }
        }
    }
}
