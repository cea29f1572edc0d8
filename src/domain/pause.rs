// Leveling pause: the simulation is paused exactly while someone owes an ability choice.

use crate::domain::state::PlayerId;
use std::collections::BTreeSet;

/// Two-state machine. `Paused` never holds an empty set; removing the last
/// pending player moves back to `Running`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PauseState {
    #[default]
    Running,
    Paused(BTreeSet<PlayerId>),
}

/// Observable result of a pause-state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseTransition {
    Paused,
    Resumed,
    Unchanged,
}

impl PauseState {
    pub fn is_paused(&self) -> bool {
        matches!(self, PauseState::Paused(_))
    }

    pub fn is_pending(&self, player_id: PlayerId) -> bool {
        match self {
            PauseState::Running => false,
            PauseState::Paused(pending) => pending.contains(&player_id),
        }
    }

    pub fn pending(&self) -> Vec<PlayerId> {
        match self {
            PauseState::Running => Vec::new(),
            PauseState::Paused(pending) => pending.iter().copied().collect(),
        }
    }

    /// Adds a player to the pending set. Re-adding a present id is a no-op.
    pub fn add_pending(&mut self, player_id: PlayerId) -> PauseTransition {
        match self {
            PauseState::Running => {
                *self = PauseState::Paused(BTreeSet::from([player_id]));
                PauseTransition::Paused
            }
            PauseState::Paused(pending) => {
                pending.insert(player_id);
                PauseTransition::Unchanged
            }
        }
    }

    /// Removes a player from the pending set and resumes once it empties.
    pub fn remove_pending(&mut self, player_id: PlayerId) -> PauseTransition {
        let PauseState::Paused(pending) = self else {
            return PauseTransition::Unchanged;
        };
        if !pending.remove(&player_id) {
            return PauseTransition::Unchanged;
        }
        if pending.is_empty() {
            *self = PauseState::Running;
            PauseTransition::Resumed
        } else {
            PauseTransition::Unchanged
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_invariant(state: &PauseState) {
        assert_eq!(state.is_paused(), !state.pending().is_empty());
    }

    #[test]
    fn when_first_player_is_added_then_session_pauses() {
        let mut state = PauseState::Running;
        assert_eq!(state.add_pending(7), PauseTransition::Paused);
        assert!(state.is_paused());
        assert!(state.is_pending(7));
        assert_invariant(&state);
    }

    #[test]
    fn when_same_player_is_added_twice_then_nothing_changes() {
        let mut state = PauseState::Running;
        state.add_pending(7);
        assert_eq!(state.add_pending(7), PauseTransition::Unchanged);
        assert_eq!(state.pending(), vec![7]);
    }

    #[test]
    fn when_two_players_pending_then_resume_waits_for_both() {
        let mut state = PauseState::Running;
        state.add_pending(1);
        state.add_pending(2);

        assert_eq!(state.remove_pending(1), PauseTransition::Unchanged);
        assert!(state.is_paused());
        assert_invariant(&state);

        assert_eq!(state.remove_pending(2), PauseTransition::Resumed);
        assert_eq!(state, PauseState::Running);
        assert_invariant(&state);
    }

    #[test]
    fn when_removing_unknown_player_then_nothing_changes() {
        let mut state = PauseState::Running;
        assert_eq!(state.remove_pending(3), PauseTransition::Unchanged);

        state.add_pending(1);
        assert_eq!(state.remove_pending(3), PauseTransition::Unchanged);
        assert!(state.is_paused());
    }
}
