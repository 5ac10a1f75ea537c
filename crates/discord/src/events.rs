use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use tally_core::{ActorId, ChoiceId, VoteIntake};

use crate::commands::{
    CommandParseError, CommandReply, CommandRouteError, CommandRouter, CommandService,
    NoopCommandService, SlashCommandPayload,
};

/// One gateway delivery, acknowledged by envelope id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GatewayEnvelope {
    pub envelope_id: String,
    pub event: GatewayEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GatewayEvent {
    SlashCommand(SlashCommandPayload),
    ComponentInteraction(ComponentInteractionEvent),
    GuildMessage(GuildMessageEvent),
    Unsupported { event_type: String },
}

impl GatewayEvent {
    pub fn event_type(&self) -> GatewayEventType {
        match self {
            Self::SlashCommand(_) => GatewayEventType::SlashCommand,
            Self::ComponentInteraction(_) => GatewayEventType::ComponentInteraction,
            Self::GuildMessage(_) => GatewayEventType::GuildMessage,
            Self::Unsupported { .. } => GatewayEventType::Unsupported,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum GatewayEventType {
    SlashCommand,
    ComponentInteraction,
    GuildMessage,
    Unsupported,
}

/// A button click. `custom_id` carries the choice id for poll buttons.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentInteractionEvent {
    pub channel_id: String,
    pub message_id: String,
    pub user_id: String,
    pub custom_id: String,
    pub interaction_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuildMessageEvent {
    pub channel_id: String,
    pub author_id: String,
    pub author_roles: Vec<String>,
    pub author_is_bot: bool,
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum HandlerResult {
    Responded(CommandReply),
    Processed,
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error(transparent)]
    Parse(#[from] CommandParseError),
    #[error(transparent)]
    Route(#[from] CommandRouteError),
    #[error("guild message handler failure: {0}")]
    GuildMessage(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> GatewayEventType;
    async fn handle(
        &self,
        envelope: &GatewayEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<GatewayEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        envelope: &GatewayEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&envelope.event.event_type()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(envelope, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

pub fn default_dispatcher() -> EventDispatcher {
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(SlashCommandHandler::new(NoopCommandService));
    dispatcher
}

pub struct SlashCommandHandler<S> {
    router: CommandRouter<S>,
}

impl<S> SlashCommandHandler<S>
where
    S: CommandService,
{
    pub fn new(service: S) -> Self {
        Self { router: CommandRouter::new(service) }
    }
}

#[async_trait]
impl<S> EventHandler for SlashCommandHandler<S>
where
    S: CommandService + 'static,
{
    fn event_type(&self) -> GatewayEventType {
        GatewayEventType::SlashCommand
    }

    async fn handle(
        &self,
        envelope: &GatewayEnvelope,
        _ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let GatewayEvent::SlashCommand(payload) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        let reply = self.router.route(payload).await?;
        Ok(HandlerResult::Responded(reply))
    }
}

/// Routes poll-button clicks into vote intake. Clicks whose `custom_id` is
/// not a choice id belong to other features and are ignored.
pub struct ComponentInteractionHandler {
    intake: Arc<VoteIntake>,
}

impl ComponentInteractionHandler {
    pub fn new(intake: Arc<VoteIntake>) -> Self {
        Self { intake }
    }
}

#[async_trait]
impl EventHandler for ComponentInteractionHandler {
    fn event_type(&self) -> GatewayEventType {
        GatewayEventType::ComponentInteraction
    }

    async fn handle(
        &self,
        envelope: &GatewayEnvelope,
        _ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let GatewayEvent::ComponentInteraction(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        let Some(choice_id) = ChoiceId::parse(&event.custom_id) else {
            return Ok(HandlerResult::Ignored);
        };

        let outcome = self.intake.cast_vote(choice_id, ActorId::new(event.user_id.clone())).await;
        Ok(HandlerResult::Responded(CommandReply::text(outcome.user_message())))
    }
}

/// Side channel notified when the watched keyword appears. Implemented by
/// the SMTP alerting component in the server crate.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn notify_raid(&self, message: &str) -> anyhow::Result<()>;
}

#[derive(Default)]
pub struct NoopAlertSink;

#[async_trait]
impl AlertSink for NoopAlertSink {
    async fn notify_raid(&self, _message: &str) -> anyhow::Result<()> {
        Ok(())
    }
}

pub const RAID_KEYWORD: &str = "raid";

/// Watches guild messages for the raid keyword in the configured channel.
/// Only members holding the allowed role are listened to at all, and bot
/// authors are always ignored.
pub struct GuildMessageHandler {
    watch_channel_id: String,
    allowed_role: String,
    alerts: Arc<dyn AlertSink>,
}

impl GuildMessageHandler {
    pub fn new(
        watch_channel_id: impl Into<String>,
        allowed_role: impl Into<String>,
        alerts: Arc<dyn AlertSink>,
    ) -> Self {
        Self {
            watch_channel_id: watch_channel_id.into(),
            allowed_role: allowed_role.into(),
            alerts,
        }
    }

    fn author_allowed(&self, event: &GuildMessageEvent) -> bool {
        event
            .author_roles
            .iter()
            .any(|role| role.eq_ignore_ascii_case(&self.allowed_role))
    }
}

#[async_trait]
impl EventHandler for GuildMessageHandler {
    fn event_type(&self) -> GatewayEventType {
        GatewayEventType::GuildMessage
    }

    async fn handle(
        &self,
        envelope: &GatewayEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let GatewayEvent::GuildMessage(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        if event.author_is_bot || !self.author_allowed(event) {
            return Ok(HandlerResult::Ignored);
        }

        if event.channel_id == self.watch_channel_id
            && event.content.to_lowercase().contains(RAID_KEYWORD)
        {
            info!(
                correlation_id = %ctx.correlation_id,
                channel_id = %event.channel_id,
                "raid keyword observed; notifying alert sink"
            );
            self.alerts
                .notify_raid(&event.content)
                .await
                .map_err(|error| EventHandlerError::GuildMessage(error.to_string()))?;
            return Ok(HandlerResult::Processed);
        }

        Ok(HandlerResult::Ignored)
    }
}
