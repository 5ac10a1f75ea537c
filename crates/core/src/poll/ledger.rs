use std::collections::{BTreeSet, HashMap, HashSet};

use crate::poll::{ActorId, Choice, ChoiceId};

/// Per-poll vote state. One ledger exists per live poll and is only ever
/// mutated under the owning poll's lock.
///
/// `voted_actors` is the authority for duplicate rejection: membership check
/// and insertion happen in one [`VoteLedger::record`] call, so two racing
/// votes by the same actor can never both pass the check.
#[derive(Debug)]
pub struct VoteLedger {
    count_by_choice: HashMap<ChoiceId, u32>,
    voters_by_choice: HashMap<ChoiceId, BTreeSet<ActorId>>,
    voted_actors: HashSet<ActorId>,
}

impl VoteLedger {
    /// Every choice starts at zero; no key outside `choices` ever appears.
    pub fn new(choices: &[Choice]) -> Self {
        let count_by_choice = choices.iter().map(|choice| (choice.id, 0)).collect();
        let voters_by_choice =
            choices.iter().map(|choice| (choice.id, BTreeSet::new())).collect();
        Self { count_by_choice, voters_by_choice, voted_actors: HashSet::new() }
    }

    /// Records a vote unless the actor has voted before or the choice is
    /// unknown to this poll. Returns whether the vote was recorded.
    pub fn record(&mut self, choice_id: ChoiceId, actor: ActorId) -> bool {
        if !self.count_by_choice.contains_key(&choice_id) {
            return false;
        }
        if !self.voted_actors.insert(actor.clone()) {
            return false;
        }

        *self.count_by_choice.entry(choice_id).or_insert(0) += 1;
        self.voters_by_choice.entry(choice_id).or_default().insert(actor);
        true
    }

    pub fn has_voted(&self, actor: &ActorId) -> bool {
        self.voted_actors.contains(actor)
    }

    pub fn count(&self, choice_id: ChoiceId) -> u32 {
        self.count_by_choice.get(&choice_id).copied().unwrap_or(0)
    }

    pub fn total_votes(&self) -> u32 {
        self.count_by_choice.values().sum()
    }

    pub fn voter_count(&self) -> usize {
        self.voted_actors.len()
    }

    /// Immutable copy handed to renderers so no lock is held across a
    /// display push.
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            count_by_choice: self.count_by_choice.clone(),
            voters_by_choice: self.voters_by_choice.clone(),
            total_votes: self.total_votes(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub count_by_choice: HashMap<ChoiceId, u32>,
    pub voters_by_choice: HashMap<ChoiceId, BTreeSet<ActorId>>,
    pub total_votes: u32,
}

impl LedgerSnapshot {
    pub fn count(&self, choice_id: ChoiceId) -> u32 {
        self.count_by_choice.get(&choice_id).copied().unwrap_or(0)
    }

    pub fn voters(&self, choice_id: ChoiceId) -> impl Iterator<Item = &ActorId> {
        self.voters_by_choice.get(&choice_id).into_iter().flatten()
    }
}
