use std::sync::Arc;

use tracing::{debug, warn};

use crate::poll::registry::PollRegistry;
use crate::poll::render::render_tally;
use crate::poll::{ActorId, ChoiceId, PollDisplay};

/// Outcome of one vote. All three are expected, user-visible results; none
/// of them is an error and none is ever logged as one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoteOutcome {
    Accepted,
    AlreadyVoted,
    PollExpired,
}

impl VoteOutcome {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Accepted => "Your vote has been counted.",
            Self::AlreadyVoted => "You already voted in this poll.",
            Self::PollExpired => "This poll is no longer active.",
        }
    }
}

/// Entry point for button activations. Resolves the owning poll through the
/// registry's reverse index, applies the vote under the poll's own lock, and
/// pushes a best-effort tally refresh.
pub struct VoteIntake {
    registry: Arc<PollRegistry>,
    display: Arc<dyn PollDisplay>,
}

impl VoteIntake {
    pub fn new(registry: Arc<PollRegistry>, display: Arc<dyn PollDisplay>) -> Self {
        Self { registry, display }
    }

    pub async fn cast_vote(&self, choice_id: ChoiceId, actor: ActorId) -> VoteOutcome {
        let Some(poll) = self.registry.resolve_choice(choice_id) else {
            return VoteOutcome::PollExpired;
        };

        // Ledger mutation and the duplicate check happen in one step under
        // the poll lock; the display push happens after the lock is dropped.
        let frame = {
            let mut state = poll.state();
            if state.closed {
                return VoteOutcome::PollExpired;
            }
            if !state.ledger.record(choice_id, actor.clone()) {
                // The reverse index guarantees the choice belongs to this
                // poll, so a rejected record means a repeat voter.
                return VoteOutcome::AlreadyVoted;
            }
            state
                .display
                .clone()
                .map(|handle| (handle, state.ledger.snapshot(), state.last_footer.clone()))
        };

        debug!(poll_id = %poll.id(), actor = %actor, "vote accepted");

        // Re-render with the footer the countdown last published; the vote
        // path never reads or advances the remaining time itself.
        if let Some((handle, snapshot, footer)) = frame {
            let payload = render_tally(poll.question(), poll.choices(), &snapshot, footer.as_deref());
            if let Err(error) = self.display.update(&handle, payload).await {
                warn!(poll_id = %poll.id(), error = %error, "tally refresh dropped after vote");
            }
        }

        VoteOutcome::Accepted
    }
}
