//! Display collaborator seam.
//!
//! The engine never talks to the chat platform directly: it renders
//! [`DisplayPayload`] frames and hands them to an implementation of
//! [`PollDisplay`]. Frames are best-effort; the ledger is the source of truth
//! and a dropped or reordered frame is repaired by the next tick or vote.

use async_trait::async_trait;
use serde::Serialize;

use crate::errors::DisplayError;
use crate::poll::ChoiceId;

/// Opaque reference to the live message a poll owns. Set once at creation,
/// never reassigned.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DisplayHandle {
    pub channel_id: String,
    pub message_id: String,
}

/// Visual register of a frame; the platform layer maps this to embed colors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Live,
    Finished,
    Results,
}

/// A fully rendered frame, ready for the platform layer to publish.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DisplayPayload {
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
    pub tone: Tone,
}

/// Clickable affordance bound to one choice.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChoiceButton {
    pub choice_id: ChoiceId,
    pub label: String,
}

#[async_trait]
pub trait PollDisplay: Send + Sync {
    /// Publish the initial live tally with one button per choice.
    async fn create(
        &self,
        channel_id: &str,
        payload: DisplayPayload,
        affordances: Vec<ChoiceButton>,
    ) -> Result<DisplayHandle, DisplayError>;

    /// Replace the live frame. Fire-and-forget from the engine's view.
    async fn update(
        &self,
        handle: &DisplayHandle,
        payload: DisplayPayload,
    ) -> Result<(), DisplayError>;

    /// Replace the frame and strip the buttons. Used exactly once, at close.
    async fn update_final(
        &self,
        handle: &DisplayHandle,
        payload: DisplayPayload,
    ) -> Result<(), DisplayError>;
}

#[derive(Default)]
pub struct NoopPollDisplay;

#[async_trait]
impl PollDisplay for NoopPollDisplay {
    async fn create(
        &self,
        channel_id: &str,
        _payload: DisplayPayload,
        _affordances: Vec<ChoiceButton>,
    ) -> Result<DisplayHandle, DisplayError> {
        Ok(DisplayHandle { channel_id: channel_id.to_owned(), message_id: "noop".to_owned() })
    }

    async fn update(
        &self,
        _handle: &DisplayHandle,
        _payload: DisplayPayload,
    ) -> Result<(), DisplayError> {
        Ok(())
    }

    async fn update_final(
        &self,
        _handle: &DisplayHandle,
        _payload: DisplayPayload,
    ) -> Result<(), DisplayError> {
        Ok(())
    }
}
