use serde::{Deserialize, Serialize};

/// Two-valued vote on a hot take.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum VoteChoice {
    Agree,
    Disagree,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Vote,
    Like,
}

/// What the UI shows for a reaction target.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ReactionState {
    Vote {
        agree: u32,
        disagree: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        mine: Option<VoteChoice>,
    },
    Like {
        count: u32,
        liked: bool,
    },
}

impl ReactionState {
    pub fn kind(&self) -> ReactionKind {
        match self {
            ReactionState::Vote { .. } => ReactionKind::Vote,
            ReactionState::Like { .. } => ReactionKind::Like,
        }
    }

    /// Re-selecting the current vote withdraws it; selecting the other value
    /// moves it. Returns None when `self` is not a vote.
    pub fn toggled_vote(&self, choice: VoteChoice) -> Option<ReactionState> {
        let ReactionState::Vote { mut agree, mut disagree, mine } = *self else {
            return None;
        };
        match mine {
            Some(VoteChoice::Agree) => agree = agree.saturating_sub(1),
            Some(VoteChoice::Disagree) => disagree = disagree.saturating_sub(1),
            None => {}
        }
        let mine = if mine == Some(choice) {
            None
        } else {
            match choice {
                VoteChoice::Agree => agree = agree.saturating_add(1),
                VoteChoice::Disagree => disagree = disagree.saturating_add(1),
            }
            Some(choice)
        };
        Some(ReactionState::Vote { agree, disagree, mine })
    }

    pub fn toggled_like(&self) -> Option<ReactionState> {
        let ReactionState::Like { count, liked } = *self else {
            return None;
        };
        Some(if liked {
            ReactionState::Like { count: count.saturating_sub(1), liked: false }
        } else {
            ReactionState::Like { count: count.saturating_add(1), liked: true }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vote(agree: u32, disagree: u32, mine: Option<VoteChoice>) -> ReactionState {
        ReactionState::Vote { agree, disagree, mine }
    }

    #[test]
    fn test_vote_select_switch_and_withdraw() {
        let start = vote(3, 1, None);
        let agreed = start.toggled_vote(VoteChoice::Agree).unwrap();
        assert_eq!(agreed, vote(4, 1, Some(VoteChoice::Agree)));

        let switched = agreed.toggled_vote(VoteChoice::Disagree).unwrap();
        assert_eq!(switched, vote(3, 2, Some(VoteChoice::Disagree)));

        let withdrawn = switched.toggled_vote(VoteChoice::Disagree).unwrap();
        assert_eq!(withdrawn, start);
    }

    #[test]
    fn test_like_toggle() {
        let start = ReactionState::Like { count: 0, liked: false };
        let liked = start.toggled_like().unwrap();
        assert_eq!(liked, ReactionState::Like { count: 1, liked: true });
        assert_eq!(liked.toggled_like().unwrap(), start);
        assert!(start.toggled_vote(VoteChoice::Agree).is_none());
    }

    #[test]
    fn test_counters_saturate_at_max() {
        let full = vote(u32::MAX, 0, None);
        assert_eq!(full.toggled_vote(VoteChoice::Agree).unwrap(), vote(u32::MAX, 0, Some(VoteChoice::Agree)));

        let full = vote(0, u32::MAX, Some(VoteChoice::Agree));
        assert_eq!(
            full.toggled_vote(VoteChoice::Disagree).unwrap(),
            vote(0, u32::MAX, Some(VoteChoice::Disagree))
        );

        let likes = ReactionState::Like { count: u32::MAX, liked: false };
        assert_eq!(likes.toggled_like().unwrap(), ReactionState::Like { count: u32::MAX, liked: true });
    }
}
