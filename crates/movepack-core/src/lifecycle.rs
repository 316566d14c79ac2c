use crate::CoreError;
use std::fmt;

/// Stages of a build invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStage {
    ResolvingPlan,
    Configuring,
    Provisioning,
    EmittingProcesses,
    Done,
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ResolvingPlan => "resolving-plan",
            Self::Configuring => "configuring",
            Self::Provisioning => "provisioning",
            Self::EmittingProcesses => "emitting-processes",
            Self::Done => "done",
        })
    }
}

pub fn validate_transition(from: BuildStage, to: BuildStage) -> Result<(), CoreError> {
    let valid = matches!(
        (from, to),
        (BuildStage::ResolvingPlan, BuildStage::Configuring | BuildStage::Done)
            | (BuildStage::Configuring, BuildStage::Provisioning)
            | (BuildStage::Provisioning, BuildStage::EmittingProcesses)
            | (BuildStage::EmittingProcesses, BuildStage::Done)
    );

    if valid {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_transitions() {
        assert!(validate_transition(BuildStage::ResolvingPlan, BuildStage::Configuring).is_ok());
        assert!(validate_transition(BuildStage::ResolvingPlan, BuildStage::Done).is_ok()); // not requested
        assert!(validate_transition(BuildStage::Configuring, BuildStage::Provisioning).is_ok());
        assert!(
            validate_transition(BuildStage::Provisioning, BuildStage::EmittingProcesses).is_ok()
        );
        assert!(validate_transition(BuildStage::EmittingProcesses, BuildStage::Done).is_ok());
    }

    #[test]
    fn invalid_transitions() {
        assert!(validate_transition(BuildStage::ResolvingPlan, BuildStage::Provisioning).is_err());
        assert!(validate_transition(BuildStage::Configuring, BuildStage::Done).is_err());
        assert!(validate_transition(BuildStage::Done, BuildStage::ResolvingPlan).is_err());
        assert!(
            validate_transition(BuildStage::EmittingProcesses, BuildStage::Provisioning).is_err()
        );
    }
}
