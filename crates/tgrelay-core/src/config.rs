use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_COMPLETION_TIMEOUT_SECS: u64 = 40;
pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 500;
/// Upper bound accepted for `completion.max_retries`.
pub const MAX_RETRIES_LIMIT: u32 = 10;

/// Top-level config (tgrelay.toml + TGRELAY_* env overrides).
///
/// Built once at startup and handed to each component constructor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub commands: CommandsConfig,
    #[serde(default)]
    pub notices: NoticesConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    /// Log raw updates and force debug-level logging.
    #[serde(default)]
    pub debug: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
    /// How long a write waits on a locked database before failing.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl DatabaseConfig {
    /// Create the directory the database file lives in.
    pub fn ensure_parent_dir(&self) -> crate::error::Result<()> {
        if let Some(parent) = std::path::Path::new(&self.path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

/// OpenAI-compatible completion endpoint (OpenRouter, DeepSeek, OpenAI...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_completion_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Deadline for a single completion call.
    #[serde(default = "default_completion_timeout_secs")]
    pub timeout_secs: u64,
    /// Extra attempts after a timed-out call (total attempts = max_retries + 1).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Constant pause between attempts.
    #[serde(default)]
    pub retry_delay_ms: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_completion_base_url(),
            model: default_model(),
            timeout_secs: DEFAULT_COMPLETION_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandsConfig {
    /// Reply with `notices.unknown_command` for commands the bot has not
    /// registered. When false such commands are ignored.
    #[serde(default = "bool_true")]
    pub reply_unknown: bool,
    /// Move the chat transcript to the archive after a command that
    /// produced no reply (e.g. `/restart`).
    #[serde(default = "bool_true")]
    pub archive_on_silent: bool,
    #[serde(default = "default_command_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            reply_unknown: true,
            archive_on_silent: true,
            timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
        }
    }
}

/// User-facing texts sent by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoticesConfig {
    #[serde(default = "default_placeholder")]
    pub placeholder: String,
    #[serde(default = "default_timeout_notice")]
    pub timeout: String,
    #[serde(default = "default_quota_notice")]
    pub quota: String,
    #[serde(default = "default_failure_notice")]
    pub failure: String,
    #[serde(default = "default_unknown_command")]
    pub unknown_command: String,
    #[serde(default = "default_no_commands")]
    pub no_commands: String,
}

impl Default for NoticesConfig {
    fn default() -> Self {
        Self {
            placeholder: default_placeholder(),
            timeout: default_timeout_notice(),
            quota: default_quota_notice(),
            failure: default_failure_notice(),
            unknown_command: default_unknown_command(),
            no_commands: default_no_commands(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "bool_true")]
    pub enabled: bool,
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: DEFAULT_BIND.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default filter directive when RUST_LOG is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit one JSON object per line instead of the human formatter.
    #[serde(default)]
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn bool_true() -> bool {
    true
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}
fn default_completion_timeout_secs() -> u64 {
    DEFAULT_COMPLETION_TIMEOUT_SECS
}
fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}
fn default_command_timeout_secs() -> u64 {
    DEFAULT_COMMAND_TIMEOUT_SECS
}
fn default_completion_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}
fn default_model() -> String {
    "deepseek/deepseek-chat-v3-0324:free".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_placeholder() -> String {
    "Your answer is being generated, please wait!".to_string()
}
fn default_timeout_notice() -> String {
    "Time's up.\nRepeat the question or ask a new one!".to_string()
}
fn default_quota_notice() -> String {
    "Out of tokens! Please try again tomorrow.".to_string()
}
fn default_failure_notice() -> String {
    "Could not process your message, please try again later!".to_string()
}
fn default_unknown_command() -> String {
    "Unknown command. Send /help to see what I can do.".to_string()
}
fn default_no_commands() -> String {
    "This bot has no commands available.".to_string()
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.tgrelay/tgrelay.db", home)
}

impl RelayConfig {
    /// Load config from a TOML file with TGRELAY_* env var overrides.
    ///
    /// Nested keys use a double underscore:
    /// `TGRELAY_TELEGRAM__BOT_TOKEN`, `TGRELAY_COMPLETION__TIMEOUT_SECS`.
    /// A missing file is not an error; env vars alone are enough.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);
        tracing::debug!(path = %path, "loading config");

        let config: RelayConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("TGRELAY_").split("__"))
            .extract()
            .map_err(|e| crate::error::RelayError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject configs the relay cannot start with.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::RelayError;

        if self.telegram.bot_token.trim().is_empty() {
            return Err(RelayError::Config("telegram.bot_token is required".into()));
        }
        if self.completion.api_key.trim().is_empty() {
            return Err(RelayError::Config("completion.api_key is required".into()));
        }
        if self.completion.timeout_secs == 0 {
            return Err(RelayError::Config(
                "completion.timeout_secs must be greater than zero".into(),
            ));
        }
        if self.completion.max_retries > MAX_RETRIES_LIMIT {
            return Err(RelayError::Config(format!(
                "completion.max_retries must be at most {MAX_RETRIES_LIMIT}"
            )));
        }
        Ok(())
    }

    /// Filter directive for the log subscriber. Debug mode wins over `log.level`.
    pub fn log_filter(&self) -> String {
        if self.telegram.debug {
            "debug".to_string()
        } else {
            self.log.level.clone()
        }
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.tgrelay/tgrelay.toml", home)
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = RelayConfig::default();
        assert_eq!(cfg.completion.timeout_secs, 40);
        assert_eq!(cfg.completion.max_retries, 2);
        assert_eq!(cfg.completion.retry_delay_ms, 0);
        assert_eq!(cfg.database.busy_timeout_ms, 500);
        assert!(cfg.commands.reply_unknown);
        assert!(cfg.commands.archive_on_silent);
        assert_eq!(cfg.http.port, DEFAULT_PORT);
    }

    #[test]
    fn missing_tokens_fail_validation() {
        let cfg = RelayConfig::default();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("bot_token"));
    }

    #[test]
    fn loads_toml_with_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "tgrelay.toml",
                r#"
                [telegram]
                bot_token = "123:abc"

                [completion]
                api_key = "sk-test"
                model = "test-model"
                timeout_secs = 10
                "#,
            )?;
            jail.set_env("TGRELAY_COMPLETION__MAX_RETRIES", "5");
            jail.set_env("TGRELAY_TELEGRAM__DEBUG", "true");

            let cfg = RelayConfig::load(Some("tgrelay.toml")).expect("config loads");
            assert_eq!(cfg.telegram.bot_token, "123:abc");
            assert_eq!(cfg.completion.model, "test-model");
            assert_eq!(cfg.completion.timeout_secs, 10);
            assert_eq!(cfg.completion.max_retries, 5);
            assert!(cfg.telegram.debug);
            assert_eq!(cfg.log_filter(), "debug");
            Ok(())
        });
    }

    #[test]
    fn env_alone_is_enough() {
        Jail::expect_with(|jail| {
            jail.set_env("TGRELAY_TELEGRAM__BOT_TOKEN", "1:x");
            jail.set_env("TGRELAY_COMPLETION__API_KEY", "key");

            let cfg = RelayConfig::load(Some("does-not-exist.toml")).expect("config loads");
            assert_eq!(cfg.telegram.bot_token, "1:x");
            assert_eq!(cfg.log_filter(), "info");
            Ok(())
        });
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut cfg = RelayConfig::default();
        cfg.telegram.bot_token = "t".into();
        cfg.completion.api_key = "k".into();
        cfg.completion.timeout_secs = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn database_parent_dir_is_created() {
        Jail::expect_with(|_jail| {
            let db = DatabaseConfig {
                path: "nested/dir/tgrelay.db".into(),
                ..Default::default()
            };
            db.ensure_parent_dir().expect("dir created");
            assert!(std::path::Path::new("nested/dir").is_dir());
            Ok(())
        });
    }

    #[test]
    fn oversized_max_retries_is_rejected() {
        let mut cfg = RelayConfig::default();
        cfg.telegram.bot_token = "t".into();
        cfg.completion.api_key = "k".into();
        cfg.completion.max_retries = MAX_RETRIES_LIMIT;
        assert!(cfg.validate().is_ok());

        cfg.completion.max_retries = u32::MAX;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("max_retries"));
    }
}
