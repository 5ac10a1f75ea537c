use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::embeds::{self, Embed};

/// Raw slash-command interaction as delivered by the gateway.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SlashCommandPayload {
    pub command: String,
    pub options: HashMap<String, String>,
    pub channel_id: String,
    pub user_id: String,
    pub interaction_id: String,
}

/// Typed command after classification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BotCommand {
    Poll { question: String, choices: Vec<String>, duration_minutes: Option<u32> },
    CoinFlip,
    Pick { options: Vec<String> },
    Purge,
    Spam { target: String },
    StopSpam,
    Help,
    Unknown { name: String },
}

/// The registered command set, used for registration and the help listing.
pub const COMMAND_CATALOG: &[(&str, &str)] = &[
    ("poll", "Start a timed multi-choice poll with live results"),
    ("coinflip", "Flip a coin"),
    ("pick", "Spin a wheel over a comma-separated list of options"),
    ("purge", "Delete the messages in this channel"),
    ("spam", "Mention a user once per second until stopped"),
    ("stopspam", "Stop the running spam session and clean up"),
    ("help", "List the available commands"),
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("`/{command}` requires the `{option}` option")]
    MissingOption { command: String, option: String },
    #[error("`/{command}` option `{option}` is not a number: `{value}`")]
    InvalidNumber { command: String, option: String, value: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandRouteError {
    #[error("command service failed: {0}")]
    Service(String),
}

/// How a handled command answers the invoking user. `Silent` means the
/// visible response was delivered through the channel directly (the poll
/// embed, the wheel message) and the interaction needs no reply text.
#[derive(Clone, Debug, PartialEq)]
pub enum CommandReply {
    Text(String),
    Embed(Embed),
    Silent,
}

impl CommandReply {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }
}

pub fn classify_command(payload: &SlashCommandPayload) -> Result<BotCommand, CommandParseError> {
    let name = payload.command.trim_start_matches('/').to_ascii_lowercase();
    match name.as_str() {
        "poll" => {
            let question = required_option(payload, &name, "question")?;
            let choices = split_csv(&required_option(payload, &name, "choices")?);
            let duration_minutes = match payload.options.get("duration") {
                None => None,
                Some(value) => Some(value.trim().parse::<u32>().map_err(|_| {
                    CommandParseError::InvalidNumber {
                        command: name.clone(),
                        option: "duration".to_owned(),
                        value: value.clone(),
                    }
                })?),
            };
            Ok(BotCommand::Poll { question, choices, duration_minutes })
        }
        "coinflip" => Ok(BotCommand::CoinFlip),
        "pick" => {
            let options = split_csv(&required_option(payload, &name, "options")?);
            Ok(BotCommand::Pick { options })
        }
        "purge" => Ok(BotCommand::Purge),
        "spam" => {
            let target = required_option(payload, &name, "target")?;
            Ok(BotCommand::Spam { target })
        }
        "stopspam" => Ok(BotCommand::StopSpam),
        "help" => Ok(BotCommand::Help),
        _ => Ok(BotCommand::Unknown { name }),
    }
}

fn required_option(
    payload: &SlashCommandPayload,
    command: &str,
    option: &str,
) -> Result<String, CommandParseError> {
    payload
        .options
        .get(option)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| CommandParseError::MissingOption {
            command: command.to_owned(),
            option: option.to_owned(),
        })
}

fn split_csv(value: &str) -> Vec<String> {
    value.split(',').map(str::trim).filter(|item| !item.is_empty()).map(str::to_owned).collect()
}

#[async_trait]
pub trait CommandService: Send + Sync {
    async fn start_poll(
        &self,
        question: String,
        choices: Vec<String>,
        duration_minutes: Option<u32>,
        payload: &SlashCommandPayload,
    ) -> Result<CommandReply, CommandRouteError>;

    async fn coin_flip(
        &self,
        payload: &SlashCommandPayload,
    ) -> Result<CommandReply, CommandRouteError>;

    async fn pick(
        &self,
        options: Vec<String>,
        payload: &SlashCommandPayload,
    ) -> Result<CommandReply, CommandRouteError>;

    async fn purge(&self, payload: &SlashCommandPayload)
        -> Result<CommandReply, CommandRouteError>;

    async fn spam(
        &self,
        target: String,
        payload: &SlashCommandPayload,
    ) -> Result<CommandReply, CommandRouteError>;

    async fn stop_spam(
        &self,
        payload: &SlashCommandPayload,
    ) -> Result<CommandReply, CommandRouteError>;
}

pub struct CommandRouter<S> {
    service: S,
}

impl<S> CommandRouter<S>
where
    S: CommandService,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }

    pub async fn route(
        &self,
        payload: &SlashCommandPayload,
    ) -> Result<CommandReply, CommandRouteError> {
        let command = match classify_command(payload) {
            Ok(command) => command,
            Err(parse_error) => return Ok(CommandReply::text(format!("❌ {parse_error}"))),
        };

        match command {
            BotCommand::Poll { question, choices, duration_minutes } => {
                self.service.start_poll(question, choices, duration_minutes, payload).await
            }
            BotCommand::CoinFlip => self.service.coin_flip(payload).await,
            BotCommand::Pick { options } => self.service.pick(options, payload).await,
            BotCommand::Purge => self.service.purge(payload).await,
            BotCommand::Spam { target } => self.service.spam(target, payload).await,
            BotCommand::StopSpam => self.service.stop_spam(payload).await,
            BotCommand::Help => Ok(CommandReply::text(embeds::help_text())),
            BotCommand::Unknown { name } => {
                Ok(CommandReply::text(format!("Unsupported command `/{name}`. Try `/help`.")))
            }
        }
    }
}

/// Answers every command with a canned acknowledgement; used in tests and as
/// the default wiring before the real service is attached.
#[derive(Default)]
pub struct NoopCommandService;

#[async_trait]
impl CommandService for NoopCommandService {
    async fn start_poll(
        &self,
        question: String,
        choices: Vec<String>,
        _duration_minutes: Option<u32>,
        _payload: &SlashCommandPayload,
    ) -> Result<CommandReply, CommandRouteError> {
        Ok(CommandReply::text(format!("poll `{question}` with {} choices", choices.len())))
    }

    async fn coin_flip(
        &self,
        _payload: &SlashCommandPayload,
    ) -> Result<CommandReply, CommandRouteError> {
        Ok(CommandReply::text("coinflip"))
    }

    async fn pick(
        &self,
        options: Vec<String>,
        _payload: &SlashCommandPayload,
    ) -> Result<CommandReply, CommandRouteError> {
        Ok(CommandReply::text(format!("pick from {}", options.len())))
    }

    async fn purge(
        &self,
        _payload: &SlashCommandPayload,
    ) -> Result<CommandReply, CommandRouteError> {
        Ok(CommandReply::text("purge"))
    }

    async fn spam(
        &self,
        target: String,
        _payload: &SlashCommandPayload,
    ) -> Result<CommandReply, CommandRouteError> {
        Ok(CommandReply::text(format!("spam {target}")))
    }

    async fn stop_spam(
        &self,
        _payload: &SlashCommandPayload,
    ) -> Result<CommandReply, CommandRouteError> {
        Ok(CommandReply::text("stopspam"))
    }
}
