use crate::domain::{IntentState, Mode};

/// Single-flight phase of the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Transitioning { target: bool },
}

impl Phase {
    pub fn is_transitioning(self) -> bool {
        matches!(self, Self::Transitioning { .. })
    }
}

/// Everything a presentation layer needs, published after every mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub intent: IntentState,
    pub mode: Mode,
    pub phase: Phase,
    /// Pending target while transitioning, otherwise whether Full Awake is on.
    pub switch_on: bool,
    pub pending_restore_message: Option<String>,
    pub blocked_message: Option<String>,
}

impl StatusSnapshot {
    pub fn new(intent: &IntentState, phase: Phase, pending_restore_message: Option<String>) -> Self {
        let mode = Mode::derive(intent);
        let blocked_message =
            (!intent.setup_state.is_ready()).then(|| intent.setup_state.blocked_message());
        Self {
            intent: intent.clone(),
            mode,
            phase,
            switch_on: switch_on(mode, phase),
            pending_restore_message,
            blocked_message,
        }
    }

    pub(super) fn with_phase(&mut self, phase: Phase) {
        self.phase = phase;
        self.switch_on = switch_on(self.mode, phase);
    }
}

fn switch_on(mode: Mode, phase: Phase) -> bool {
    match phase {
        Phase::Transitioning { target } => target,
        Phase::Idle => mode == Mode::FullAwake,
    }
}
