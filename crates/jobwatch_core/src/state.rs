use crate::{Generation, TerminalResult};

/// Where the controller is in the submit → poll → terminate cycle.
///
/// `H` is the poller's handle type; holding it in `Running` is what makes the
/// controller the sole owner of the active timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleState<H> {
    Idle,
    Submitting {
        generation: Generation,
    },
    Running(H),
    Terminated(TerminalResult),
}

impl<H> LifecycleState<H> {
    pub fn phase(&self) -> Phase {
        match self {
            LifecycleState::Idle => Phase::Idle,
            LifecycleState::Submitting { .. } => Phase::Submitting,
            LifecycleState::Running(_) => Phase::Running,
            LifecycleState::Terminated(_) => Phase::Terminated,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self,
            LifecycleState::Submitting { .. } | LifecycleState::Running(_)
        )
    }

    pub fn outcome(&self) -> Option<&TerminalResult> {
        match self {
            LifecycleState::Terminated(result) => Some(result),
            _ => None,
        }
    }
}

/// Handle-free discriminant of [`LifecycleState`], for views and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Submitting,
    Running,
    Terminated,
}
