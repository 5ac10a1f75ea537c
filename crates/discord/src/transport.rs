use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use tally_core::{ChoiceButton, DisplayError, DisplayHandle, DisplayPayload, PollDisplay};

use crate::embeds::{buttons_from_affordances, embed_from_payload, Button, Embed};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("message send failed: {0}")]
    Send(String),
    #[error("message edit failed: {0}")]
    Edit(String),
    #[error("message delete failed: {0}")]
    Delete(String),
    #[error("history fetch failed: {0}")]
    History(String),
}

/// Reference to one message the bot owns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageRef {
    pub channel_id: String,
    pub message_id: String,
}

impl From<&DisplayHandle> for MessageRef {
    fn from(handle: &DisplayHandle) -> Self {
        Self { channel_id: handle.channel_id.clone(), message_id: handle.message_id.clone() }
    }
}

/// Outbound message body: plain content, an embed, or both, plus any
/// buttons. Editing with an empty button list strips the components.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OutboundMessage {
    pub content: Option<String>,
    pub embed: Option<Embed>,
    pub buttons: Vec<Button>,
}

impl OutboundMessage {
    pub fn text(content: impl Into<String>) -> Self {
        Self { content: Some(content.into()), ..Self::default() }
    }

    pub fn embed(embed: Embed) -> Self {
        Self { embed: Some(embed), ..Self::default() }
    }

    pub fn with_buttons(mut self, buttons: Vec<Button>) -> Self {
        self.buttons = buttons;
        self
    }
}

/// A message as returned from a channel history page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryMessage {
    pub id: String,
    pub created_at: DateTime<Utc>,
}

/// Outbound channel surface. The real implementation talks to the platform
/// REST API; the engine and the command service only see this trait.
#[async_trait]
pub trait ChannelDisplay: Send + Sync {
    async fn send_message(
        &self,
        channel_id: &str,
        message: OutboundMessage,
    ) -> Result<MessageRef, TransportError>;

    async fn edit_message(
        &self,
        message_ref: &MessageRef,
        message: OutboundMessage,
    ) -> Result<(), TransportError>;

    async fn delete_message(&self, message_ref: &MessageRef) -> Result<(), TransportError>;

    /// One page of history, newest first, at most `limit` entries.
    async fn fetch_history(
        &self,
        channel_id: &str,
        limit: usize,
    ) -> Result<Vec<HistoryMessage>, TransportError>;

    /// Bulk delete, platform-limited to messages younger than 14 days.
    async fn delete_messages(
        &self,
        channel_id: &str,
        message_ids: &[String],
    ) -> Result<(), TransportError>;
}

#[derive(Default)]
pub struct NoopChannelDisplay;

#[async_trait]
impl ChannelDisplay for NoopChannelDisplay {
    async fn send_message(
        &self,
        channel_id: &str,
        _message: OutboundMessage,
    ) -> Result<MessageRef, TransportError> {
        Ok(MessageRef { channel_id: channel_id.to_owned(), message_id: "noop".to_owned() })
    }

    async fn edit_message(
        &self,
        _message_ref: &MessageRef,
        _message: OutboundMessage,
    ) -> Result<(), TransportError> {
        Ok(())
    }

    async fn delete_message(&self, _message_ref: &MessageRef) -> Result<(), TransportError> {
        Ok(())
    }

    async fn fetch_history(
        &self,
        _channel_id: &str,
        _limit: usize,
    ) -> Result<Vec<HistoryMessage>, TransportError> {
        Ok(Vec::new())
    }

    async fn delete_messages(
        &self,
        _channel_id: &str,
        _message_ids: &[String],
    ) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Adapts [`ChannelDisplay`] onto the engine's [`PollDisplay`] seam: frames
/// become embeds, affordances become buttons, and the final update edits the
/// message with an empty component list.
pub struct PollDisplayAdapter {
    display: Arc<dyn ChannelDisplay>,
}

impl PollDisplayAdapter {
    pub fn new(display: Arc<dyn ChannelDisplay>) -> Self {
        Self { display }
    }
}

#[async_trait]
impl PollDisplay for PollDisplayAdapter {
    async fn create(
        &self,
        channel_id: &str,
        payload: DisplayPayload,
        affordances: Vec<ChoiceButton>,
    ) -> Result<DisplayHandle, DisplayError> {
        let message = OutboundMessage::embed(embed_from_payload(payload))
            .with_buttons(buttons_from_affordances(&affordances));
        let message_ref = self
            .display
            .send_message(channel_id, message)
            .await
            .map_err(|error| DisplayError::Create(error.to_string()))?;
        Ok(DisplayHandle {
            channel_id: message_ref.channel_id,
            message_id: message_ref.message_id,
        })
    }

    async fn update(
        &self,
        handle: &DisplayHandle,
        payload: DisplayPayload,
    ) -> Result<(), DisplayError> {
        self.display
            .edit_message(&MessageRef::from(handle), OutboundMessage::embed(embed_from_payload(payload)))
            .await
            .map_err(|error| DisplayError::Update(error.to_string()))
    }

    async fn update_final(
        &self,
        handle: &DisplayHandle,
        payload: DisplayPayload,
    ) -> Result<(), DisplayError> {
        let message =
            OutboundMessage::embed(embed_from_payload(payload)).with_buttons(Vec::new());
        self.display
            .edit_message(&MessageRef::from(handle), message)
            .await
            .map_err(|error| DisplayError::Update(error.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use tally_core::{DisplayPayload, PollDisplay, Tone};

    use super::{
        ChannelDisplay, HistoryMessage, MessageRef, OutboundMessage, PollDisplayAdapter,
        TransportError,
    };

    #[derive(Default)]
    struct RecordingChannel {
        sent: Mutex<Vec<(String, OutboundMessage)>>,
        edited: Mutex<Vec<(MessageRef, OutboundMessage)>>,
    }

    #[async_trait]
    impl ChannelDisplay for RecordingChannel {
        async fn send_message(
            &self,
            channel_id: &str,
            message: OutboundMessage,
        ) -> Result<MessageRef, TransportError> {
            self.sent.lock().expect("sent lock").push((channel_id.to_owned(), message));
            Ok(MessageRef { channel_id: channel_id.to_owned(), message_id: "m-7".to_owned() })
        }

        async fn edit_message(
            &self,
            message_ref: &MessageRef,
            message: OutboundMessage,
        ) -> Result<(), TransportError> {
            self.edited.lock().expect("edited lock").push((message_ref.clone(), message));
            Ok(())
        }

        async fn delete_message(&self, _message_ref: &MessageRef) -> Result<(), TransportError> {
            Ok(())
        }

        async fn fetch_history(
            &self,
            _channel_id: &str,
            _limit: usize,
        ) -> Result<Vec<HistoryMessage>, TransportError> {
            Ok(Vec::new())
        }

        async fn delete_messages(
            &self,
            _channel_id: &str,
            _message_ids: &[String],
        ) -> Result<(), TransportError> {
            Ok(())
        }
    }

    fn payload(tone: Tone) -> DisplayPayload {
        DisplayPayload {
            title: "📊 Poll".to_owned(),
            body: "body".to_owned(),
            footer: None,
            tone,
        }
    }

    #[tokio::test]
    async fn create_sends_embed_with_choice_buttons() {
        let channel = Arc::new(RecordingChannel::default());
        let adapter = PollDisplayAdapter::new(channel.clone());

        let affordance = tally_core::ChoiceButton {
            choice_id: tally_core::ChoiceId::generate(),
            label: "Red".to_owned(),
        };
        let handle = adapter
            .create("chan-1", payload(Tone::Live), vec![affordance.clone()])
            .await
            .expect("create");

        assert_eq!(handle.channel_id, "chan-1");
        assert_eq!(handle.message_id, "m-7");

        let sent = channel.sent.lock().expect("sent lock");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1.buttons.len(), 1);
        assert_eq!(sent[0].1.buttons[0].custom_id, affordance.choice_id.to_string());
    }

    #[tokio::test]
    async fn final_update_strips_buttons() {
        let channel = Arc::new(RecordingChannel::default());
        let adapter = PollDisplayAdapter::new(channel.clone());
        let handle = adapter.create("chan-1", payload(Tone::Live), Vec::new()).await.expect("create");

        adapter.update_final(&handle, payload(Tone::Results)).await.expect("final update");

        let edited = channel.edited.lock().expect("edited lock");
        assert_eq!(edited.len(), 1);
        assert!(edited[0].1.buttons.is_empty());
        assert!(edited[0].1.embed.is_some());
    }
}
