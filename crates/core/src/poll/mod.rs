//! Poll lifecycle engine.
//!
//! A poll is a time-bounded multi-choice vote: the registry owns the live
//! poll table, the ledger records votes, a per-poll countdown task re-renders
//! the tally once per second, and the reporter publishes a ranked summary
//! when the countdown elapses. All state is in-memory and dies with the poll.

pub mod display;
pub mod intake;
pub mod ledger;
pub mod registry;
pub mod render;
pub mod report;
pub mod scheduler;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Process-unique poll identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PollId(Uuid);

impl PollId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for PollId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier of one selectable choice, unique within its poll and opaque to
/// the chat platform (it doubles as the button action id).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChoiceId(Uuid);

impl ChoiceId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(value: &str) -> Option<Self> {
        Uuid::parse_str(value).ok().map(Self)
    }
}

impl fmt::Display for ChoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identity of a voter, as reported by the chat platform.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(String);

impl ActorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Platform mention form, used in the results breakdown.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.0)
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One selectable option, in creation order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Choice {
    pub id: ChoiceId,
    pub label: String,
}

/// Immutable attributes fixed at poll creation.
#[derive(Clone, Debug)]
pub struct PollSpec {
    pub question: String,
    pub choices: Vec<Choice>,
    pub created_at: DateTime<Utc>,
    pub duration_secs: u32,
}

pub const MIN_CHOICES: usize = 1;
pub const MAX_CHOICES: usize = 5;
pub const DEFAULT_DURATION_SECS: u32 = 180;

pub use display::{ChoiceButton, DisplayHandle, DisplayPayload, NoopPollDisplay, PollDisplay, Tone};
pub use intake::{VoteIntake, VoteOutcome};
pub use ledger::{LedgerSnapshot, VoteLedger};
pub use registry::{PollHandle, PollRegistry};
pub use render::{countdown_footer, render_tally};
pub use scheduler::CountdownScheduler;
