use thiserror::Error;

/// Failures surfaced to the poll creator at creation time. Nothing is
/// allocated when creation fails.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PollError {
    #[error("invalid poll: {reason}")]
    InvalidPoll { reason: String },
}

impl PollError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidPoll { reason: reason.into() }
    }
}

/// Failures from the display collaborator. Callers that push frames log these
/// and move on; they never roll back ledger state or stop a countdown.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DisplayError {
    #[error("display create failed: {0}")]
    Create(String),
    #[error("display update failed: {0}")]
    Update(String),
    #[error("display send failed: {0}")]
    Send(String),
}

#[cfg(test)]
mod tests {
    use super::PollError;

    #[test]
    fn invalid_poll_message_carries_reason() {
        let error = PollError::invalid("expected between 1 and 5 choices");
        assert_eq!(error.to_string(), "invalid poll: expected between 1 and 5 choices");
    }
}
