use crate::{Generation, Phase, TerminalResult};

/// Externally observable snapshot of a controller.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LifecycleView {
    pub phase: Phase,
    pub generation: Generation,
    pub log_lines: Vec<String>,
    pub outcome: Option<TerminalResult>,
    pub consecutive_check_failures: u32,
    pub disposed: bool,
}

impl LifecycleView {
    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Terminated
    }
}
