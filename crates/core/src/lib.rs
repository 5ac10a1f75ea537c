pub mod config;
pub mod errors;
pub mod poll;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use errors::{DisplayError, PollError};
pub use poll::{
    countdown_footer, render_tally, ActorId, Choice, ChoiceButton, ChoiceId, CountdownScheduler,
    DisplayHandle, DisplayPayload, LedgerSnapshot, NoopPollDisplay, PollDisplay, PollHandle,
    PollId, PollRegistry, Tone, VoteIntake, VoteLedger, VoteOutcome,
};
