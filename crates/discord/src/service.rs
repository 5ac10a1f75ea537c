use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use tokio::{sync::Mutex, task::JoinHandle};
use tracing::{info, warn};

use tally_core::{
    countdown_footer, render_tally, ChoiceButton, CountdownScheduler, PollDisplay, PollRegistry,
};

use crate::commands::{CommandReply, CommandRouteError, CommandService, SlashCommandPayload};
use crate::embeds::{
    purge_complete_embed, purge_error_embed, purge_progress_embed, purge_start_embed,
};
use crate::transport::{ChannelDisplay, MessageRef, OutboundMessage};

const WHEEL_CYCLES: u32 = 10;
const WHEEL_BASE_DELAY: Duration = Duration::from_secs(1);
const WHEEL_SLOWDOWN_AFTER: u32 = 7;
const WHEEL_SLOWDOWN_STEP: Duration = Duration::from_millis(500);
const WHEEL_SPINNERS: [char; 4] = ['|', '/', '-', '\\'];

const PICK_MAX_OPTIONS: usize = 10;
const PURGE_PAGE_SIZE: usize = 100;
const BULK_DELETE_MAX_AGE_DAYS: i64 = 14;
const SPAM_PERIOD: Duration = Duration::from_secs(1);
const SPAM_CLEANUP_THROTTLE: Duration = Duration::from_millis(250);

struct SpamSession {
    channel_id: String,
    task: JoinHandle<()>,
    sent: Arc<Mutex<Vec<MessageRef>>>,
}

/// Command handlers wired to the poll engine and the outbound channel.
///
/// Every handler resolves to a [`CommandReply`]; operational failures are
/// logged and surfaced to the invoking user as text rather than bubbling up
/// through the gateway loop.
pub struct BotCommandService {
    registry: Arc<PollRegistry>,
    scheduler: Arc<CountdownScheduler>,
    channel: Arc<dyn ChannelDisplay>,
    poll_display: Arc<dyn PollDisplay>,
    default_duration_secs: u32,
    purge_channel_ids: Vec<String>,
    spam_session: Mutex<Option<SpamSession>>,
}

impl BotCommandService {
    pub fn new(
        registry: Arc<PollRegistry>,
        scheduler: Arc<CountdownScheduler>,
        channel: Arc<dyn ChannelDisplay>,
        poll_display: Arc<dyn PollDisplay>,
        default_duration_secs: u32,
        purge_channel_ids: Vec<String>,
    ) -> Self {
        Self {
            registry,
            scheduler,
            channel,
            poll_display,
            default_duration_secs,
            purge_channel_ids,
            spam_session: Mutex::new(None),
        }
    }

    async fn run_purge(&self, channel_id: &str, progress: &MessageRef) -> Result<usize, String> {
        let mut deleted_total = 0_usize;

        loop {
            let page = self
                .channel
                .fetch_history(channel_id, PURGE_PAGE_SIZE)
                .await
                .map_err(|error| error.to_string())?;

            let cutoff = Utc::now() - chrono::Duration::days(BULK_DELETE_MAX_AGE_DAYS);
            let deletable: Vec<String> = page
                .into_iter()
                .filter(|message| message.id != progress.message_id)
                .filter(|message| message.created_at > cutoff)
                .map(|message| message.id)
                .collect();

            if deletable.is_empty() {
                return Ok(deleted_total);
            }

            self.channel
                .delete_messages(channel_id, &deletable)
                .await
                .map_err(|error| error.to_string())?;
            deleted_total += deletable.len();

            if let Err(error) = self
                .channel
                .edit_message(progress, OutboundMessage::embed(purge_progress_embed(deleted_total)))
                .await
            {
                warn!(channel_id, error = %error, "failed to update purge progress");
            }
        }
    }
}

/// Turns a raw target option into a platform mention. Accepts either a bare
/// user id or an already-formatted `<@id>` mention.
fn mention_for(target: &str) -> String {
    let trimmed = target.trim();
    if trimmed.starts_with("<@") && trimmed.ends_with('>') {
        trimmed.to_owned()
    } else {
        format!("<@{trimmed}>")
    }
}

fn wheel_delay(cycle: u32) -> Duration {
    if cycle > WHEEL_SLOWDOWN_AFTER {
        WHEEL_BASE_DELAY + WHEEL_SLOWDOWN_STEP * (cycle - WHEEL_SLOWDOWN_AFTER)
    } else {
        WHEEL_BASE_DELAY
    }
}

#[async_trait]
impl CommandService for BotCommandService {
    async fn start_poll(
        &self,
        question: String,
        choices: Vec<String>,
        duration_minutes: Option<u32>,
        payload: &SlashCommandPayload,
    ) -> Result<CommandReply, CommandRouteError> {
        let duration_secs = duration_minutes
            .map(|minutes| minutes.saturating_mul(60))
            .unwrap_or(self.default_duration_secs);

        let poll = match self.registry.create(question, &choices, Some(duration_secs)) {
            Ok(poll) => poll,
            Err(error) => return Ok(CommandReply::text(format!("❌ {error}"))),
        };

        let footer = countdown_footer(duration_secs);
        let frame = {
            let mut state = poll.state();
            state.last_footer = Some(footer.clone());
            render_tally(poll.question(), poll.choices(), &state.ledger.snapshot(), Some(&footer))
        };
        let affordances: Vec<ChoiceButton> = poll
            .choices()
            .iter()
            .map(|choice| ChoiceButton { choice_id: choice.id, label: choice.label.clone() })
            .collect();

        let handle = match self.poll_display.create(&payload.channel_id, frame, affordances).await
        {
            Ok(handle) => handle,
            Err(error) => {
                warn!(poll_id = %poll.id(), error = %error, "failed to post poll message");
                self.registry.remove(poll.id());
                return Ok(CommandReply::text("❌ Could not post the poll message."));
            }
        };
        poll.attach_display(handle);

        info!(poll_id = %poll.id(), duration_secs, "poll started");
        self.scheduler.spawn(poll);
        Ok(CommandReply::Silent)
    }

    async fn coin_flip(
        &self,
        _payload: &SlashCommandPayload,
    ) -> Result<CommandReply, CommandRouteError> {
        let heads = rand::thread_rng().gen_bool(0.5);
        Ok(CommandReply::text(if heads { "🪙 Heads!" } else { "🪙 Tails!" }))
    }

    async fn pick(
        &self,
        options: Vec<String>,
        payload: &SlashCommandPayload,
    ) -> Result<CommandReply, CommandRouteError> {
        if options.len() < 2 {
            return Ok(CommandReply::text("❌ Provide at least two options."));
        }
        if options.len() > PICK_MAX_OPTIONS {
            return Ok(CommandReply::text(format!(
                "❌ No more than {PICK_MAX_OPTIONS} options allowed."
            )));
        }

        let wheel = match self
            .channel
            .send_message(
                &payload.channel_id,
                OutboundMessage::text("🎡 Preparing the spinning wheel..."),
            )
            .await
        {
            Ok(message_ref) => message_ref,
            Err(error) => {
                warn!(channel_id = %payload.channel_id, error = %error, "failed to start wheel");
                return Ok(CommandReply::text("❌ Could not start the wheel."));
            }
        };

        let channel = Arc::clone(&self.channel);
        tokio::spawn(async move {
            for cycle in 0..WHEEL_CYCLES {
                tokio::time::sleep(wheel_delay(cycle)).await;
                let spinner = WHEEL_SPINNERS[cycle as usize % WHEEL_SPINNERS.len()];
                let index = rand::thread_rng().gen_range(0..options.len());
                let body = format!(
                    "🎡 **Spinning...** `{spinner}`\n\n➡️ {option}",
                    option = options[index]
                );
                if let Err(error) = channel.edit_message(&wheel, OutboundMessage::text(body)).await
                {
                    warn!(error = %error, "failed to animate wheel frame");
                }
            }

            let winner_index = rand::thread_rng().gen_range(0..options.len());
            let mut body = "🎡 **The wheel has stopped!** 🎉\n\n".to_owned();
            for (index, option) in options.iter().enumerate() {
                if index == winner_index {
                    body.push_str(&format!("➡️ **{option}** 🎉\n"));
                } else {
                    body.push_str(&format!("• {option}\n"));
                }
            }
            if let Err(error) = channel.edit_message(&wheel, OutboundMessage::text(body)).await {
                warn!(error = %error, "failed to announce wheel winner");
            }
        });

        Ok(CommandReply::Silent)
    }

    async fn purge(
        &self,
        payload: &SlashCommandPayload,
    ) -> Result<CommandReply, CommandRouteError> {
        if !self.purge_channel_ids.iter().any(|id| id == &payload.channel_id) {
            return Ok(CommandReply::text("❌ This command is not allowed in this channel."));
        }

        let progress = match self
            .channel
            .send_message(&payload.channel_id, OutboundMessage::embed(purge_start_embed()))
            .await
        {
            Ok(message_ref) => message_ref,
            Err(error) => {
                warn!(channel_id = %payload.channel_id, error = %error, "failed to start purge");
                return Ok(CommandReply::text("❌ Could not start the purge."));
            }
        };

        match self.run_purge(&payload.channel_id, &progress).await {
            Ok(deleted) => {
                info!(channel_id = %payload.channel_id, deleted, "purge complete");
                if let Err(error) = self
                    .channel
                    .edit_message(&progress, OutboundMessage::embed(purge_complete_embed(deleted)))
                    .await
                {
                    warn!(error = %error, "failed to post purge summary");
                }
            }
            Err(detail) => {
                warn!(channel_id = %payload.channel_id, detail, "purge failed");
                if let Err(error) = self
                    .channel
                    .edit_message(&progress, OutboundMessage::embed(purge_error_embed(&detail)))
                    .await
                {
                    warn!(error = %error, "failed to post purge error");
                }
            }
        }

        Ok(CommandReply::Silent)
    }

    async fn spam(
        &self,
        target: String,
        payload: &SlashCommandPayload,
    ) -> Result<CommandReply, CommandRouteError> {
        let mut session = self.spam_session.lock().await;
        if session.is_some() {
            return Ok(CommandReply::text(
                "A spam session is already running. Use /stopspam first.",
            ));
        }

        let mention = mention_for(&target);
        let channel = Arc::clone(&self.channel);
        let channel_id = payload.channel_id.clone();
        let sent: Arc<Mutex<Vec<MessageRef>>> = Arc::new(Mutex::new(Vec::new()));
        let sent_for_task = Arc::clone(&sent);

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(SPAM_PERIOD);
            loop {
                interval.tick().await;
                match channel.send_message(&channel_id, OutboundMessage::text(&*mention)).await {
                    Ok(message_ref) => sent_for_task.lock().await.push(message_ref),
                    Err(error) => warn!(error = %error, "spam send failed"),
                }
            }
        });

        *session =
            Some(SpamSession { channel_id: payload.channel_id.clone(), task, sent });
        info!(target, "spam session started");
        Ok(CommandReply::Silent)
    }

    async fn stop_spam(
        &self,
        _payload: &SlashCommandPayload,
    ) -> Result<CommandReply, CommandRouteError> {
        let Some(session) = self.spam_session.lock().await.take() else {
            return Ok(CommandReply::text("No spam session running."));
        };

        session.task.abort();
        let sent = session.sent.lock().await.split_off(0);
        let total = sent.len();
        for message_ref in &sent {
            if let Err(error) = self.channel.delete_message(message_ref).await {
                warn!(error = %error, "failed to delete spam message");
            }
            tokio::time::sleep(SPAM_CLEANUP_THROTTLE).await;
        }

        info!(channel_id = %session.channel_id, total, "spam session stopped");
        Ok(CommandReply::text(format!("🧹 Spam stopped. Cleaned up {total} messages.")))
    }
}
