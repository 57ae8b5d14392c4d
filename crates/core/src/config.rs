use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub channel: ChannelConfig,
    pub agent: AgentConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ChannelConfig {
    pub provider: ChannelProvider,
    pub access_token: SecretString,
    pub phone_number_id: Option<String>,
    pub api_base_url: String,
}

#[derive(Clone, Debug)]
pub struct AgentConfig {
    pub store_timeout_ms: u64,
    pub max_line_quantity: u32,
    pub max_tool_rounds: u32,
    pub planner_url: Option<String>,
    pub planner_timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelProvider {
    Log,
    Whatsapp,
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
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub channel_provider: Option<ChannelProvider>,
    pub channel_access_token: Option<String>,
    pub channel_phone_number_id: Option<String>,
    pub store_timeout_ms: Option<u64>,
    pub planner_url: Option<String>,
    pub server_port: Option<u16>,
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
            database: DatabaseConfig {
                url: "sqlite://orderbot.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            channel: ChannelConfig {
                provider: ChannelProvider::Log,
                access_token: String::new().into(),
                phone_number_id: None,
                api_base_url: "https://graph.facebook.com/v21.0".to_string(),
            },
            agent: AgentConfig {
                store_timeout_ms: 5_000,
                max_line_quantity: 50,
                max_tool_rounds: 8,
                planner_url: None,
                planner_timeout_secs: 60,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8001,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for ChannelProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "log" => Ok(Self::Log),
            "whatsapp" => Ok(Self::Whatsapp),
            other => Err(ConfigError::Validation(format!(
                "unsupported channel provider `{other}` (expected log|whatsapp)"
            ))),
        }
    }
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
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("orderbot.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(channel) = patch.channel {
            if let Some(provider) = channel.provider {
                self.channel.provider = provider;
            }
            if let Some(access_token) = channel.access_token {
                self.channel.access_token = secret_value(access_token);
            }
            if let Some(phone_number_id) = channel.phone_number_id {
                self.channel.phone_number_id = Some(phone_number_id);
            }
            if let Some(api_base_url) = channel.api_base_url {
                self.channel.api_base_url = api_base_url;
            }
        }

        if let Some(agent) = patch.agent {
            if let Some(store_timeout_ms) = agent.store_timeout_ms {
                self.agent.store_timeout_ms = store_timeout_ms;
            }
            if let Some(max_line_quantity) = agent.max_line_quantity {
                self.agent.max_line_quantity = max_line_quantity;
            }
            if let Some(max_tool_rounds) = agent.max_tool_rounds {
                self.agent.max_tool_rounds = max_tool_rounds;
            }
            if let Some(planner_url) = agent.planner_url {
                self.agent.planner_url = Some(planner_url);
            }
            if let Some(planner_timeout_secs) = agent.planner_timeout_secs {
                self.agent.planner_timeout_secs = planner_timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
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
        if let Some(value) = read_env("ORDERBOT_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("ORDERBOT_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("ORDERBOT_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("ORDERBOT_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("ORDERBOT_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("ORDERBOT_CHANNEL_PROVIDER") {
            self.channel.provider = value.parse()?;
        }
        let access_token = read_env("ORDERBOT_CHANNEL_ACCESS_TOKEN")
            .or_else(|| read_env("WHATSAPP_ACCESS_TOKEN"));
        if let Some(value) = access_token {
            self.channel.access_token = secret_value(value);
        }
        if let Some(value) = read_env("ORDERBOT_CHANNEL_PHONE_NUMBER_ID") {
            self.channel.phone_number_id = Some(value);
        }
        if let Some(value) = read_env("ORDERBOT_CHANNEL_API_BASE_URL") {
            self.channel.api_base_url = value;
        }

        if let Some(value) = read_env("ORDERBOT_AGENT_STORE_TIMEOUT_MS") {
            self.agent.store_timeout_ms = parse_u64("ORDERBOT_AGENT_STORE_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = read_env("ORDERBOT_AGENT_MAX_LINE_QUANTITY") {
            self.agent.max_line_quantity =
                parse_u32("ORDERBOT_AGENT_MAX_LINE_QUANTITY", &value)?;
        }
        if let Some(value) = read_env("ORDERBOT_AGENT_MAX_TOOL_ROUNDS") {
            self.agent.max_tool_rounds = parse_u32("ORDERBOT_AGENT_MAX_TOOL_ROUNDS", &value)?;
        }
        if let Some(value) = read_env("ORDERBOT_AGENT_PLANNER_URL") {
            self.agent.planner_url = Some(value);
        }
        if let Some(value) = read_env("ORDERBOT_AGENT_PLANNER_TIMEOUT_SECS") {
            self.agent.planner_timeout_secs =
                parse_u64("ORDERBOT_AGENT_PLANNER_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("ORDERBOT_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("ORDERBOT_SERVER_PORT") {
            self.server.port = parse_u16("ORDERBOT_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("ORDERBOT_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("ORDERBOT_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level =
            read_env("ORDERBOT_LOGGING_LEVEL").or_else(|| read_env("ORDERBOT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("ORDERBOT_LOGGING_FORMAT").or_else(|| read_env("ORDERBOT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(provider) = overrides.channel_provider {
            self.channel.provider = provider;
        }
        if let Some(access_token) = overrides.channel_access_token {
            self.channel.access_token = secret_value(access_token);
        }
        if let Some(phone_number_id) = overrides.channel_phone_number_id {
            self.channel.phone_number_id = Some(phone_number_id);
        }
        if let Some(store_timeout_ms) = overrides.store_timeout_ms {
            self.agent.store_timeout_ms = store_timeout_ms;
        }
        if let Some(planner_url) = overrides.planner_url {
            self.agent.planner_url = Some(planner_url);
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_channel(&self.channel)?;
        validate_agent(&self.agent)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("orderbot.toml"), PathBuf::from("config/orderbot.toml")]
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

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_channel(channel: &ChannelConfig) -> Result<(), ConfigError> {
    if channel.provider == ChannelProvider::Log {
        return Ok(());
    }

    if channel.access_token.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "channel.access_token is required for the whatsapp provider. Get it from Meta for Developers > Your App > WhatsApp > API Setup".to_string(),
        ));
    }

    let missing_number =
        channel.phone_number_id.as_ref().map(|value| value.trim().is_empty()).unwrap_or(true);
    if missing_number {
        return Err(ConfigError::Validation(
            "channel.phone_number_id is required for the whatsapp provider".to_string(),
        ));
    }

    let base_url = channel.api_base_url.trim();
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "channel.api_base_url must start with http:// or https://".to_string(),
        ));
    }

    Ok(())
}

fn validate_agent(agent: &AgentConfig) -> Result<(), ConfigError> {
    if agent.store_timeout_ms == 0 || agent.store_timeout_ms > 60_000 {
        return Err(ConfigError::Validation(
            "agent.store_timeout_ms must be in range 1..=60000".to_string(),
        ));
    }

    if agent.max_line_quantity == 0 {
        return Err(ConfigError::Validation(
            "agent.max_line_quantity must be greater than zero".to_string(),
        ));
    }

    if agent.max_tool_rounds == 0 {
        return Err(ConfigError::Validation(
            "agent.max_tool_rounds must be greater than zero".to_string(),
        ));
    }

    if agent.planner_timeout_secs == 0 || agent.planner_timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "agent.planner_timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if let Some(planner_url) = &agent.planner_url {
        if !planner_url.starts_with("http://") && !planner_url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "agent.planner_url must start with http:// or https://".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
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

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    channel: Option<ChannelPatch>,
    agent: Option<AgentPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ChannelPatch {
    provider: Option<ChannelProvider>,
    access_token: Option<String>,
    phone_number_id: Option<String>,
    api_base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AgentPatch {
    store_timeout_ms: Option<u64>,
    max_line_quantity: Option<u32>,
    max_tool_rounds: Option<u32>,
    planner_url: Option<String>,
    planner_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ChannelProvider, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_load_without_any_file_or_env() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.channel.provider == ChannelProvider::Log, "log channel by default")?;
        ensure(config.agent.store_timeout_ms == 5_000, "store timeout defaults to 5s")?;
        ensure(config.agent.max_line_quantity == 50, "line quantity cap defaults to 50")?;
        ensure(matches!(config.logging.format, LogFormat::Compact), "compact logs by default")
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_WA_TOKEN", "EAAG-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("orderbot.toml");
            fs::write(
                &path,
                r#"
[channel]
provider = "whatsapp"
access_token = "${TEST_WA_TOKEN}"
phone_number_id = "1098765"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.channel.access_token.expose_secret() == "EAAG-from-env",
                "access token should be loaded from environment",
            )?;
            ensure(
                config.channel.phone_number_id.as_deref() == Some("1098765"),
                "phone number id should come from the file",
            )?;
            Ok(())
        })();

        clear_vars(&["TEST_WA_TOKEN"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("ORDERBOT_LOG_LEVEL", "warn");
        env::set_var("ORDERBOT_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["ORDERBOT_LOG_LEVEL", "ORDERBOT_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("ORDERBOT_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("ORDERBOT_AGENT_STORE_TIMEOUT_MS", "750");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("orderbot.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"

[agent]
store_timeout_ms = 2000
max_line_quantity = 20

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-override.db",
                "override database url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(config.agent.store_timeout_ms == 750, "env store timeout should win over file")?;
            ensure(config.agent.max_line_quantity == 20, "file value should win over default")?;
            Ok(())
        })();

        clear_vars(&["ORDERBOT_DATABASE_URL", "ORDERBOT_AGENT_STORE_TIMEOUT_MS"]);
        result
    }

    #[test]
    fn whatsapp_provider_without_token_fails_fast() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let error = match AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                channel_provider: Some(ChannelProvider::Whatsapp),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }) {
            Ok(_) => return Err("expected validation failure but config load succeeded".to_string()),
            Err(error) => error,
        };

        let has_message = matches!(
            error,
            ConfigError::Validation(ref message) if message.contains("channel.access_token")
        );
        ensure(has_message, "validation failure should mention channel.access_token")
    }

    #[test]
    fn invalid_numeric_env_override_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("ORDERBOT_AGENT_MAX_TOOL_ROUNDS", "many");
        let result = match AppConfig::load(LoadOptions::default()) {
            Err(ConfigError::InvalidEnvOverride { key, .. }) => {
                ensure(key == "ORDERBOT_AGENT_MAX_TOOL_ROUNDS", "error should name the variable")
            }
            Err(other) => Err(format!("unexpected error: {other}")),
            Ok(_) => Err("expected invalid override error".to_string()),
        };

        clear_vars(&["ORDERBOT_AGENT_MAX_TOOL_ROUNDS"]);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                channel_provider: Some(ChannelProvider::Whatsapp),
                channel_access_token: Some("EAAG-secret-value".to_string()),
                channel_phone_number_id: Some("1098765".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .map_err(|err| format!("config load failed: {err}"))?;
        let debug = format!("{config:?}");

        ensure(!debug.contains("EAAG-secret-value"), "debug output should not contain the token")
    }
}
