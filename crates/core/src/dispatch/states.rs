use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle of one `execute` call. Forward-only; the last two are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DispatchState {
    Received,
    ResolvingEntities,
    Validated,
    Executing,
    Completed,
    Failed,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("illegal dispatch transition {from:?} -> {to:?}")]
pub struct TransitionError {
    pub from: DispatchState,
    pub to: DispatchState,
}

impl DispatchState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    fn rank(self) -> u8 {
        match self {
            Self::Received => 0,
            Self::ResolvingEntities => 1,
            Self::Validated => 2,
            Self::Executing => 3,
            Self::Completed | Self::Failed => 4,
        }
    }

    pub fn can_transition_to(self, next: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            Self::Failed => true,
            Self::Completed => self == Self::Executing,
            _ => next.rank() == self.rank() + 1,
        }
    }

    pub fn transition(self, next: Self) -> Result<Self, TransitionError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(TransitionError { from: self, to: next })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DispatchState::{
        Completed, Executing, Failed, Received, ResolvingEntities, Validated,
    };

    #[test]
    fn happy_path_moves_one_step_at_a_time() {
        let path = [Received, ResolvingEntities, Validated, Executing, Completed];
        for pair in path.windows(2) {
            assert_eq!(pair[0].transition(pair[1]), Ok(pair[1]));
        }
        assert!(Received.transition(Validated).is_err());
        assert!(ResolvingEntities.transition(Completed).is_err());
    }

    #[test]
    fn any_live_state_can_fail() {
        for state in [Received, ResolvingEntities, Validated, Executing] {
            assert!(state.can_transition_to(Failed));
        }
    }

    #[test]
    fn terminal_states_never_move_again() {
        for terminal in [Completed, Failed] {
            for next in [Received, ResolvingEntities, Validated, Executing, Completed, Failed] {
                assert!(!terminal.can_transition_to(next));
            }
        }
        assert!(Executing.transition(Received).is_err());
    }
}
