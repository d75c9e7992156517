use serde::Serialize;

use crate::model::Snapshot;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    ActionInProgress,
    EditingMode,
}

#[derive(Debug, Default)]
pub struct Session {
    acknowledged: Option<Snapshot>,
    phase: Phase,
    suppress_next_change: bool,
}

impl Session {
    pub fn acknowledged(&self) -> Option<&Snapshot> {
        self.acknowledged.as_ref()
    }

    pub fn acknowledge(&mut self, snapshot: Snapshot) {
        self.acknowledged = Some(snapshot);
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    pub fn suppress_next_change(&mut self) {
        self.suppress_next_change = true;
    }

    pub fn is_suppressing(&self) -> bool {
        self.suppress_next_change
    }

    pub fn take_suppression(&mut self) -> bool {
        std::mem::take(&mut self.suppress_next_change)
    }
}
