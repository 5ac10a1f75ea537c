use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use tally_core::config::{AppConfig, ConfigError, LoadOptions};
use tally_core::{CountdownScheduler, PollDisplay, PollRegistry, VoteIntake};
use tally_discord::events::{
    AlertSink, ComponentInteractionHandler, EventDispatcher, GuildMessageHandler,
    SlashCommandHandler,
};
use tally_discord::gateway::GatewayRunner;
use tally_discord::service::BotCommandService;
use tally_discord::transport::{ChannelDisplay, NoopChannelDisplay, PollDisplayAdapter};

use crate::alert::SmtpAlertSink;

pub struct Application {
    pub config: AppConfig,
    pub registry: Arc<PollRegistry>,
    pub gateway_runner: GatewayRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

/// Wires the poll engine, the command service, and the event dispatcher.
/// Transports start in no-op mode; the real gateway session and REST client
/// attach at the [`GatewayRunner`] and [`ChannelDisplay`] seams.
pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let channel: Arc<dyn ChannelDisplay> = Arc::new(NoopChannelDisplay);
    let poll_display: Arc<dyn PollDisplay> =
        Arc::new(PollDisplayAdapter::new(Arc::clone(&channel)));

    let registry = Arc::new(PollRegistry::new());
    let scheduler =
        Arc::new(CountdownScheduler::new(Arc::clone(&registry), Arc::clone(&poll_display)));
    let intake = Arc::new(VoteIntake::new(Arc::clone(&registry), Arc::clone(&poll_display)));
    let alerts: Arc<dyn AlertSink> = Arc::new(SmtpAlertSink::new(config.alert.clone()));

    let service = BotCommandService::new(
        Arc::clone(&registry),
        scheduler,
        Arc::clone(&channel),
        poll_display,
        config.poll.default_duration_secs,
        config.discord.purge_channel_ids.clone(),
    );

    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(SlashCommandHandler::new(service));
    dispatcher.register(ComponentInteractionHandler::new(intake));
    dispatcher.register(GuildMessageHandler::new(
        config.discord.watch_channel_id.clone(),
        config.discord.allowed_role.clone(),
        alerts,
    ));

    info!(
        event_name = "system.bootstrap.dispatcher_wired",
        correlation_id = "bootstrap",
        handlers = dispatcher.handler_count(),
        "event dispatcher wired"
    );

    let gateway_runner = GatewayRunner::with_noop_transport(dispatcher);

    Ok(Application { config, registry, gateway_runner })
}

#[cfg(test)]
mod tests {
    use tally_core::config::{ConfigOverrides, LoadOptions};

    use crate::bootstrap::bootstrap;

    fn valid_overrides() -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                bot_token: Some("test-token".to_string()),
                watch_channel_id: Some("chan-watch".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_without_a_bot_token() {
        let result = bootstrap(LoadOptions::default()).await;

        let message = match result {
            Ok(_) => panic!("bootstrap should fail without a bot token"),
            Err(error) => error.to_string(),
        };
        assert!(message.contains("discord.bot_token"), "got: {message}");
    }

    #[tokio::test]
    async fn bootstrap_wires_the_full_dispatcher() {
        let app = bootstrap(valid_overrides())
            .await
            .expect("bootstrap should succeed with valid overrides");

        assert!(app.gateway_runner.is_noop_transport());
        assert_eq!(app.registry.live_poll_count(), 0);
        assert_eq!(app.config.poll.default_duration_secs, 180);
    }
}
