// Optimistic reactions (votes, likes) on already-published items.
//
// The new value is shown before the backend confirms it. On failure the
// display goes back to exactly the value captured before the change, never a
// recomputation. One mutation per target is in flight at a time; actions on a
// target with a pending mutation are ignored.

use media_compose_backend::{BackendError, SocialBackend};
use media_compose_models::{ReactionKind, ReactionState, VoteChoice};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, warn};

const NOTICE_CAPACITY: usize = 32;

/// A change shown ahead of confirmation. It only exists while the backend
/// call is outstanding; settling removes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptimisticMutation {
    pub target_id: String,
    pub kind: ReactionKind,
    pub prior: ReactionState,
    pub pending: ReactionState,
}

/// Sent to subscribers whenever a mutation is rolled back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackNotice {
    pub target_id: String,
    pub kind: ReactionKind,
    pub restored: ReactionState,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReactionOutcome {
    Confirmed(ReactionState),
    RolledBack { restored: ReactionState, error: BackendError },
    /// A mutation for this target was already pending
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReactionError {
    #[error("no displayed reaction for target {0}")]
    UnknownTarget(String),

    #[error("target {target} does not take {expected:?} reactions")]
    KindMismatch { target: String, expected: ReactionKind },
}

#[derive(Default)]
struct Inner {
    displayed: HashMap<String, ReactionState>,
    pending: HashMap<String, OptimisticMutation>,
}

pub struct OptimisticMutationManager {
    backend: Arc<dyn SocialBackend>,
    inner: Mutex<Inner>,
    notices: broadcast::Sender<RollbackNotice>,
}

impl OptimisticMutationManager {
    pub fn new(backend: Arc<dyn SocialBackend>) -> Self {
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        Self {
            backend,
            inner: Mutex::new(Inner::default()),
            notices,
        }
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Set the confirmed server value for a target. Ignored while a mutation
    /// on that target is pending; the pending result settles it.
    pub fn seed(&self, target_id: impl Into<String>, state: ReactionState) -> bool {
        let target_id = target_id.into();
        let mut inner = self.inner();
        if inner.pending.contains_key(&target_id) {
            return false;
        }
        inner.displayed.insert(target_id, state);
        true
    }

    pub fn displayed(&self, target_id: &str) -> Option<ReactionState> {
        self.inner().displayed.get(target_id).copied()
    }

    pub fn pending(&self, target_id: &str) -> Option<OptimisticMutation> {
        self.inner().pending.get(target_id).cloned()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RollbackNotice> {
        self.notices.subscribe()
    }

    /// Vote on a hot take. Re-selecting the current vote withdraws it.
    pub async fn vote(&self, target_id: &str, choice: VoteChoice) -> Result<ReactionOutcome, ReactionError> {
        let Some(mutation) = self.begin(target_id, ReactionKind::Vote, |state| state.toggled_vote(choice))? else {
            return Ok(ReactionOutcome::Ignored);
        };
        let result = match mutation.pending {
            ReactionState::Vote { mine: Some(choice), .. } => self.backend.set_vote(target_id, choice).await,
            _ => self.backend.unset_vote(target_id).await,
        };
        Ok(self.settle(mutation, result))
    }

    pub async fn toggle_like(&self, target_id: &str) -> Result<ReactionOutcome, ReactionError> {
        let Some(mutation) = self.begin(target_id, ReactionKind::Like, |state| state.toggled_like())? else {
            return Ok(ReactionOutcome::Ignored);
        };
        let result = match mutation.pending {
            ReactionState::Like { liked: true, .. } => self.backend.set_like(target_id).await,
            _ => self.backend.unset_like(target_id).await,
        };
        Ok(self.settle(mutation, result))
    }

    /// Snapshot, compute and apply the new value synchronously. Returns None
    /// when a mutation for the target is already pending.
    fn begin(
        &self,
        target_id: &str,
        kind: ReactionKind,
        transition: impl FnOnce(&ReactionState) -> Option<ReactionState>,
    ) -> Result<Option<OptimisticMutation>, ReactionError> {
        let mut inner = self.inner();
        if inner.pending.contains_key(target_id) {
            debug!(target_id, ?kind, "Mutation already pending, ignoring");
            return Ok(None);
        }
        let prior = *inner
            .displayed
            .get(target_id)
            .ok_or_else(|| ReactionError::UnknownTarget(target_id.to_string()))?;
        let pending = transition(&prior).ok_or_else(|| ReactionError::KindMismatch {
            target: target_id.to_string(),
            expected: kind,
        })?;

        let mutation = OptimisticMutation {
            target_id: target_id.to_string(),
            kind,
            prior,
            pending,
        };
        inner.displayed.insert(target_id.to_string(), pending);
        inner.pending.insert(target_id.to_string(), mutation.clone());
        Ok(Some(mutation))
    }

    fn settle(&self, mutation: OptimisticMutation, result: Result<(), BackendError>) -> ReactionOutcome {
        let mut inner = self.inner();
        inner.pending.remove(&mutation.target_id);
        match result {
            Ok(()) => {
                debug!(target_id = %mutation.target_id, kind = ?mutation.kind, status = "confirmed", "Reaction confirmed");
                ReactionOutcome::Confirmed(mutation.pending)
            }
            Err(error) => {
                inner.displayed.insert(mutation.target_id.clone(), mutation.prior);
                drop(inner);
                warn!(
                    operation = "reaction",
                    target_id = %mutation.target_id,
                    kind = ?mutation.kind,
                    status = "rolled_back",
                    error = %error,
                    "Reaction rolled back"
                );
                // No subscribers is fine
                let _ = self.notices.send(RollbackNotice {
                    target_id: mutation.target_id.clone(),
                    kind: mutation.kind,
                    restored: mutation.prior,
                    error: error.to_string(),
                });
                ReactionOutcome::RolledBack {
                    restored: mutation.prior,
                    error,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use media_compose_backend::{InMemoryBackend, Operation};
    use std::time::Duration;

    fn votes(agree: u32, disagree: u32, mine: Option<VoteChoice>) -> ReactionState {
        ReactionState::Vote { agree, disagree, mine }
    }

    #[tokio::test]
    async fn test_confirmed_vote_keeps_new_value() {
        let backend = Arc::new(InMemoryBackend::new());
        let manager = OptimisticMutationManager::new(backend.clone());
        manager.seed("take-1", votes(10, 3, None));

        let outcome = manager.vote("take-1", VoteChoice::Agree).await.unwrap();

        assert_eq!(outcome, ReactionOutcome::Confirmed(votes(11, 3, Some(VoteChoice::Agree))));
        assert_eq!(manager.displayed("take-1"), Some(votes(11, 3, Some(VoteChoice::Agree))));
        assert_eq!(backend.vote_for("take-1"), Some(VoteChoice::Agree));
        assert!(manager.pending("take-1").is_none());
    }

    #[tokio::test]
    async fn test_rejected_vote_restores_exact_snapshot() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.fail(Operation::SetVote, BackendError::Network("offline".into()));
        let manager = OptimisticMutationManager::new(backend.clone());
        manager.seed("take-1", votes(10, 3, None));
        let mut notices = manager.subscribe();

        let outcome = manager.vote("take-1", VoteChoice::Agree).await.unwrap();

        assert!(matches!(outcome, ReactionOutcome::RolledBack { restored, .. } if restored == votes(10, 3, None)));
        assert_eq!(manager.displayed("take-1"), Some(votes(10, 3, None)));

        let notice = notices.try_recv().unwrap();
        assert_eq!(notice.target_id, "take-1");
        assert_eq!(notice.restored, votes(10, 3, None));
    }

    #[tokio::test]
    async fn test_rejected_switch_does_not_recompute() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.fail(Operation::SetVote, BackendError::Network("offline".into()));
        let manager = OptimisticMutationManager::new(backend);
        // Counts that a naive "undo the delta" would get wrong
        manager.seed("take-2", votes(0, 5, Some(VoteChoice::Disagree)));

        manager.vote("take-2", VoteChoice::Agree).await.unwrap();
        assert_eq!(manager.displayed("take-2"), Some(votes(0, 5, Some(VoteChoice::Disagree))));
    }

    #[tokio::test]
    async fn test_reselecting_withdraws_vote() {
        let backend = Arc::new(InMemoryBackend::new());
        let manager = OptimisticMutationManager::new(backend.clone());
        manager.seed("take-1", votes(4, 1, Some(VoteChoice::Disagree)));

        manager.vote("take-1", VoteChoice::Disagree).await.unwrap();

        assert_eq!(manager.displayed("take-1"), Some(votes(4, 0, None)));
        assert_eq!(backend.calls(Operation::UnsetVote), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_action_while_pending_is_ignored() {
        let backend = Arc::new(InMemoryBackend::new().with_latency(Duration::from_millis(500)));
        let manager = Arc::new(OptimisticMutationManager::new(backend.clone()));
        manager.seed("post-9", ReactionState::Like { count: 7, liked: false });

        let first = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.toggle_like("post-9").await })
        };
        tokio::task::yield_now().await;

        // Applied before confirmation
        assert_eq!(manager.displayed("post-9"), Some(ReactionState::Like { count: 8, liked: true }));
        assert!(manager.pending("post-9").is_some());
        assert!(!manager.seed("post-9", ReactionState::Like { count: 100, liked: false }));

        assert_eq!(manager.toggle_like("post-9").await.unwrap(), ReactionOutcome::Ignored);

        let outcome = first.await.unwrap().unwrap();
        assert_eq!(outcome, ReactionOutcome::Confirmed(ReactionState::Like { count: 8, liked: true }));
        assert_eq!(backend.calls(Operation::SetLike), 1);
    }

    #[tokio::test]
    async fn test_unknown_target_and_kind_mismatch() {
        let manager = OptimisticMutationManager::new(Arc::new(InMemoryBackend::new()));
        assert_eq!(
            manager.toggle_like("missing").await,
            Err(ReactionError::UnknownTarget("missing".into()))
        );

        manager.seed("take-1", votes(0, 0, None));
        assert!(matches!(
            manager.toggle_like("take-1").await,
            Err(ReactionError::KindMismatch { .. })
        ));
        assert!(manager.pending("take-1").is_none());
    }
}
