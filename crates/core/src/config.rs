use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub discord: DiscordConfig,
    pub poll: PollConfig,
    pub alert: AlertConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DiscordConfig {
    pub bot_token: SecretString,
    /// Channel watched for the alert keyword.
    pub watch_channel_id: String,
    /// Role a guild member must hold for prefix commands to be honored.
    pub allowed_role: String,
    /// Channels where the purge command is allowed to run.
    pub purge_channel_ids: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct PollConfig {
    pub default_duration_secs: u32,
}

#[derive(Clone, Debug)]
pub struct AlertConfig {
    pub enabled: bool,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: Option<SecretString>,
    pub recipient: String,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub bot_token: Option<String>,
    pub watch_channel_id: Option<String>,
    pub allowed_role: Option<String>,
    pub default_duration_secs: Option<u32>,
    pub alert_enabled: Option<bool>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            discord: DiscordConfig {
                bot_token: String::new().into(),
                watch_channel_id: String::new(),
                allowed_role: "Bot".to_string(),
                purge_channel_ids: Vec::new(),
            },
            poll: PollConfig { default_duration_secs: crate::poll::DEFAULT_DURATION_SECS },
            alert: AlertConfig {
                enabled: false,
                smtp_host: "smtp.gmail.com".to_string(),
                smtp_port: 587,
                username: String::new(),
                password: None,
                recipient: String::new(),
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("tally.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(discord) = patch.discord {
            if let Some(bot_token_value) = discord.bot_token {
                self.discord.bot_token = secret_value(bot_token_value);
            }
            if let Some(watch_channel_id) = discord.watch_channel_id {
                self.discord.watch_channel_id = watch_channel_id;
            }
            if let Some(allowed_role) = discord.allowed_role {
                self.discord.allowed_role = allowed_role;
            }
            if let Some(purge_channel_ids) = discord.purge_channel_ids {
                self.discord.purge_channel_ids = purge_channel_ids;
            }
        }

        if let Some(poll) = patch.poll {
            if let Some(default_duration_secs) = poll.default_duration_secs {
                self.poll.default_duration_secs = default_duration_secs;
            }
        }

        if let Some(alert) = patch.alert {
            if let Some(enabled) = alert.enabled {
                self.alert.enabled = enabled;
            }
            if let Some(smtp_host) = alert.smtp_host {
                self.alert.smtp_host = smtp_host;
            }
            if let Some(smtp_port) = alert.smtp_port {
                self.alert.smtp_port = smtp_port;
            }
            if let Some(username) = alert.username {
                self.alert.username = username;
            }
            if let Some(password_value) = alert.password {
                self.alert.password = Some(secret_value(password_value));
            }
            if let Some(recipient) = alert.recipient {
                self.alert.recipient = recipient;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("TALLY_DISCORD_BOT_TOKEN") {
            self.discord.bot_token = secret_value(value);
        }
        if let Some(value) = read_env("TALLY_DISCORD_WATCH_CHANNEL_ID") {
            self.discord.watch_channel_id = value;
        }
        if let Some(value) = read_env("TALLY_DISCORD_ALLOWED_ROLE") {
            self.discord.allowed_role = value;
        }
        if let Some(value) = read_env("TALLY_DISCORD_PURGE_CHANNEL_IDS") {
            self.discord.purge_channel_ids =
                value.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_owned).collect();
        }

        if let Some(value) = read_env("TALLY_POLL_DEFAULT_DURATION_SECS") {
            self.poll.default_duration_secs =
                parse_u32("TALLY_POLL_DEFAULT_DURATION_SECS", &value)?;
        }

        if let Some(value) = read_env("TALLY_ALERT_ENABLED") {
            self.alert.enabled = parse_bool("TALLY_ALERT_ENABLED", &value)?;
        }
        if let Some(value) = read_env("TALLY_ALERT_SMTP_HOST") {
            self.alert.smtp_host = value;
        }
        if let Some(value) = read_env("TALLY_ALERT_SMTP_PORT") {
            self.alert.smtp_port = parse_u16("TALLY_ALERT_SMTP_PORT", &value)?;
        }
        if let Some(value) = read_env("TALLY_ALERT_USERNAME") {
            self.alert.username = value;
        }
        if let Some(value) = read_env("TALLY_ALERT_PASSWORD") {
            self.alert.password = Some(secret_value(value));
        }
        if let Some(value) = read_env("TALLY_ALERT_RECIPIENT") {
            self.alert.recipient = value;
        }

        let log_level = read_env("TALLY_LOGGING_LEVEL").or_else(|| read_env("TALLY_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format = read_env("TALLY_LOGGING_FORMAT").or_else(|| read_env("TALLY_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(bot_token) = overrides.bot_token {
            self.discord.bot_token = secret_value(bot_token);
        }
        if let Some(watch_channel_id) = overrides.watch_channel_id {
            self.discord.watch_channel_id = watch_channel_id;
        }
        if let Some(allowed_role) = overrides.allowed_role {
            self.discord.allowed_role = allowed_role;
        }
        if let Some(default_duration_secs) = overrides.default_duration_secs {
            self.poll.default_duration_secs = default_duration_secs;
        }
        if let Some(alert_enabled) = overrides.alert_enabled {
            self.alert.enabled = alert_enabled;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_discord(&self.discord)?;
        validate_poll(&self.poll)?;
        validate_alert(&self.alert)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("tally.toml"), PathBuf::from("config/tally.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_discord(discord: &DiscordConfig) -> Result<(), ConfigError> {
    if discord.bot_token.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "discord.bot_token is required. Get it from the Discord developer portal > Your App > Bot > Token".to_string(),
        ));
    }
    if discord.allowed_role.trim().is_empty() {
        return Err(ConfigError::Validation(
            "discord.allowed_role must not be blank".to_string(),
        ));
    }
    Ok(())
}

fn validate_poll(poll: &PollConfig) -> Result<(), ConfigError> {
    if poll.default_duration_secs == 0 || poll.default_duration_secs > 3_600 {
        return Err(ConfigError::Validation(
            "poll.default_duration_secs must be in range 1..=3600".to_string(),
        ));
    }
    Ok(())
}

fn validate_alert(alert: &AlertConfig) -> Result<(), ConfigError> {
    if !alert.enabled {
        return Ok(());
    }

    if alert.smtp_host.trim().is_empty() {
        return Err(ConfigError::Validation(
            "alert.smtp_host is required when alert.enabled is true".to_string(),
        ));
    }
    if alert.smtp_port == 0 {
        return Err(ConfigError::Validation(
            "alert.smtp_port must be greater than zero".to_string(),
        ));
    }
    if alert.username.trim().is_empty() || alert.recipient.trim().is_empty() {
        return Err(ConfigError::Validation(
            "alert.username and alert.recipient are required when alert.enabled is true"
                .to_string(),
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnvOverride {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    discord: Option<DiscordPatch>,
    poll: Option<PollPatch>,
    alert: Option<AlertPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DiscordPatch {
    bot_token: Option<String>,
    watch_channel_id: Option<String>,
    allowed_role: Option<String>,
    purge_channel_ids: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct PollPatch {
    default_duration_secs: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct AlertPatch {
    enabled: Option<bool>,
    smtp_host: Option<String>,
    smtp_port: Option<u16>,
    username: Option<String>,
    password: Option<String>,
    recipient: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use secrecy::ExposeSecret;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    fn base_options() -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                bot_token: Some("test-token".to_owned()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[test]
    fn defaults_validate_once_a_token_is_supplied() {
        let config = AppConfig::load(base_options()).expect("config should load");
        assert_eq!(config.poll.default_duration_secs, 180);
        assert_eq!(config.discord.allowed_role, "Bot");
        assert_eq!(config.logging.format, LogFormat::Compact);
        assert!(!config.alert.enabled);
    }

    #[test]
    fn missing_bot_token_fails_validation() {
        let result = AppConfig::load(LoadOptions::default());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn file_patch_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            "[discord]\nbot_token = \"from-file\"\npurge_channel_ids = [\"123\"]\n\n\
             [poll]\ndefault_duration_secs = 60\n\n[logging]\nlevel = \"debug\"\nformat = \"json\""
        )
        .expect("write config");

        let config = AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            require_file: true,
            overrides: ConfigOverrides::default(),
        })
        .expect("config should load");

        assert_eq!(config.discord.bot_token.expose_secret(), "from-file");
        assert_eq!(config.discord.purge_channel_ids, vec!["123".to_owned()]);
        assert_eq!(config.poll.default_duration_secs, 60);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn required_file_missing_is_an_error() {
        let result = AppConfig::load(LoadOptions {
            config_path: Some("does/not/exist/tally.toml".into()),
            require_file: true,
            overrides: ConfigOverrides::default(),
        });
        assert!(matches!(result, Err(ConfigError::MissingConfigFile(_))));
    }

    #[test]
    fn alert_enabled_requires_smtp_settings() {
        let mut options = base_options();
        options.overrides.alert_enabled = Some(true);
        let result = AppConfig::load(options);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn zero_duration_fails_validation() {
        let mut options = base_options();
        options.overrides.default_duration_secs = Some(0);
        let result = AppConfig::load(options);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn interpolation_reports_missing_variables() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "[discord]\nbot_token = \"${{TALLY_TEST_UNSET_VAR_XYZ}}\"")
            .expect("write config");

        let result = AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            require_file: true,
            overrides: ConfigOverrides::default(),
        });
        assert!(matches!(result, Err(ConfigError::MissingEnvInterpolation { .. })));
    }
}
