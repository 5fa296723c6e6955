//! Explicit phase machine for one publish invocation.
//!
//! Sequencing the three-call protocol through a machine makes the point of
//! no return (a created but codeless version record) an explicit, testable
//! state instead of implicit control flow.

use crate::error::{PublishError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishPhase {
    SelectingSource,
    Building,
    Validating,
    Compressing,
    CreatingVersion,
    UploadingCode,
    Finalizing,
    Done,
    Failed,
}

impl PublishPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SelectingSource => "selecting_source",
            Self::Building => "building",
            Self::Validating => "validating",
            Self::Compressing => "compressing",
            Self::CreatingVersion => "creating_version",
            Self::UploadingCode => "uploading_code",
            Self::Finalizing => "finalizing",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

pub struct PhaseMachine {
    current: PublishPhase,
}

impl PhaseMachine {
    pub fn new() -> Self {
        Self {
            current: PublishPhase::SelectingSource,
        }
    }

    pub fn current(&self) -> PublishPhase {
        self.current
    }

    fn allowed_transitions(from: PublishPhase) -> Vec<PublishPhase> {
        use PublishPhase::*;
        match from {
            SelectingSource => vec![Building, Failed],
            // Validating is bypassed entirely when the caller skipped it.
            Building => vec![Validating, Compressing, Failed],
            Validating => vec![Compressing, Failed],
            Compressing => vec![CreatingVersion, Failed],
            CreatingVersion => vec![UploadingCode, Failed],
            UploadingCode => vec![Finalizing, Failed],
            Finalizing => vec![Done, Failed],
            Done | Failed => vec![],
        }
    }

    pub fn can_transition(from: PublishPhase, to: PublishPhase) -> bool {
        Self::allowed_transitions(from).contains(&to)
    }

    pub fn advance(&mut self, to: PublishPhase) -> Result<()> {
        if Self::can_transition(self.current, to) {
            self.current = to;
            Ok(())
        } else {
            Err(PublishError::InvalidTransition {
                from: self.current.as_str(),
                to: to.as_str(),
            })
        }
    }

    /// Moves to `Failed` from any non-terminal phase.
    pub fn fail(&mut self) {
        if !self.current.is_terminal() {
            self.current = PublishPhase::Failed;
        }
    }
}

impl Default for PhaseMachine {
    fn default() -> Self {
        Self::new()
    }
}
