use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use chrono::Utc;

use crate::errors::PollError;
use crate::poll::ledger::VoteLedger;
use crate::poll::{
    Choice, ChoiceId, DisplayHandle, PollId, PollSpec, DEFAULT_DURATION_SECS, MAX_CHOICES,
    MIN_CHOICES,
};

/// Mutable per-poll state, guarded by the poll's own lock so unrelated polls
/// never contend. The ledger is mutated only by vote intake; `closed` is set
/// only by the countdown's terminal transition.
#[derive(Debug)]
pub struct PollState {
    pub ledger: VoteLedger,
    pub display: Option<DisplayHandle>,
    pub last_footer: Option<String>,
    pub closed: bool,
}

/// One live poll: immutable spec plus lock-guarded state. Shared between the
/// registry, the countdown task, and vote intake.
#[derive(Debug)]
pub struct PollHandle {
    id: PollId,
    spec: PollSpec,
    state: Mutex<PollState>,
}

impl PollHandle {
    pub fn id(&self) -> PollId {
        self.id
    }

    pub fn question(&self) -> &str {
        &self.spec.question
    }

    pub fn choices(&self) -> &[Choice] {
        &self.spec.choices
    }

    pub fn duration_secs(&self) -> u32 {
        self.spec.duration_secs
    }

    pub fn spec(&self) -> &PollSpec {
        &self.spec
    }

    /// Locks the poll state. A poisoned lock yields the inner state anyway:
    /// a panicked vote path must not wedge the countdown.
    pub fn state(&self) -> MutexGuard<'_, PollState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sets the display handle. First write wins; the handle is never
    /// reassigned for the life of the poll.
    pub fn attach_display(&self, handle: DisplayHandle) {
        let mut state = self.state();
        if state.display.is_none() {
            state.display = Some(handle);
        }
    }
}

#[derive(Default)]
struct RegistryInner {
    polls: HashMap<PollId, Arc<PollHandle>>,
    choice_index: HashMap<ChoiceId, PollId>,
}

/// Process-wide table of live polls plus the choice → poll reverse index used
/// to resolve button activations. Both are torn down together, so a removed
/// poll's choices stop resolving immediately.
#[derive(Default)]
pub struct PollRegistry {
    inner: RwLock<RegistryInner>,
}

impl PollRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a poll and its zeroed ledger atomically. Labels are trimmed;
    /// blank labels are discarded before the count check.
    pub fn create(
        &self,
        question: impl Into<String>,
        choice_labels: &[String],
        duration_secs: Option<u32>,
    ) -> Result<Arc<PollHandle>, PollError> {
        let labels: Vec<String> = choice_labels
            .iter()
            .map(|label| label.trim())
            .filter(|label| !label.is_empty())
            .map(str::to_owned)
            .collect();

        if labels.len() < MIN_CHOICES || labels.len() > MAX_CHOICES {
            return Err(PollError::invalid(format!(
                "expected between {MIN_CHOICES} and {MAX_CHOICES} choices, got {}",
                labels.len()
            )));
        }

        let choices: Vec<Choice> =
            labels.into_iter().map(|label| Choice { id: ChoiceId::generate(), label }).collect();
        let ledger = VoteLedger::new(&choices);

        let handle = Arc::new(PollHandle {
            id: PollId::generate(),
            spec: PollSpec {
                question: question.into(),
                choices,
                created_at: Utc::now(),
                duration_secs: duration_secs.unwrap_or(DEFAULT_DURATION_SECS),
            },
            state: Mutex::new(PollState {
                ledger,
                display: None,
                last_footer: None,
                closed: false,
            }),
        });

        let mut inner = self.write();
        for choice in handle.choices() {
            inner.choice_index.insert(choice.id, handle.id());
        }
        inner.polls.insert(handle.id(), Arc::clone(&handle));

        Ok(handle)
    }

    pub fn lookup(&self, poll_id: PollId) -> Option<Arc<PollHandle>> {
        self.read().polls.get(&poll_id).cloned()
    }

    pub fn contains(&self, poll_id: PollId) -> bool {
        self.read().polls.contains_key(&poll_id)
    }

    pub fn find_poll_for_choice(&self, choice_id: ChoiceId) -> Option<PollId> {
        self.read().choice_index.get(&choice_id).copied()
    }

    /// Resolves a choice straight to its owning poll under one read lock, so
    /// the reverse index and the poll table cannot disagree mid-call.
    pub fn resolve_choice(&self, choice_id: ChoiceId) -> Option<Arc<PollHandle>> {
        let inner = self.read();
        let poll_id = inner.choice_index.get(&choice_id)?;
        inner.polls.get(poll_id).cloned()
    }

    /// Removes the poll and its reverse-index entries. Idempotent: removing
    /// an absent id is a no-op, which lets a racing tick and an external
    /// close path both call it.
    pub fn remove(&self, poll_id: PollId) -> bool {
        let mut inner = self.write();
        let Some(handle) = inner.polls.remove(&poll_id) else {
            return false;
        };
        for choice in handle.choices() {
            inner.choice_index.remove(&choice.id);
        }
        true
    }

    pub fn live_poll_count(&self) -> usize {
        self.read().polls.len()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, RegistryInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, RegistryInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}
