use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use orderbot_core::config::AppConfig;
use secrecy::ExposeSecret;
use toml::Value;

use crate::commands::{load_config, CommandResult};

/// One row of the effective-config listing: key, rendered value, env var that overrides it.
struct Field<'a> {
    key: &'static str,
    value: String,
    env_keys: &'a [&'static str],
}

pub fn run() -> CommandResult {
    let config = match load_config("config") {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let path = detect_config_path();
    let doc = path.as_deref().and_then(load_config_file_doc);

    let mut lines =
        vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in fields(&config) {
        let source = field_source(&field, doc.as_ref(), path.as_deref());
        lines.push(format!("- {} = {} (source: {source})", field.key, field.value));
    }

    CommandResult::success("config", lines.join("\n"))
}

fn fields(config: &AppConfig) -> Vec<Field<'static>> {
    vec![
        Field {
            key: "database.url",
            value: config.database.url.clone(),
            env_keys: &["ORDERBOT_DATABASE_URL"],
        },
        Field {
            key: "database.max_connections",
            value: config.database.max_connections.to_string(),
            env_keys: &["ORDERBOT_DATABASE_MAX_CONNECTIONS"],
        },
        Field {
            key: "database.timeout_secs",
            value: config.database.timeout_secs.to_string(),
            env_keys: &["ORDERBOT_DATABASE_TIMEOUT_SECS"],
        },
        Field {
            key: "channel.provider",
            value: format!("{:?}", config.channel.provider),
            env_keys: &["ORDERBOT_CHANNEL_PROVIDER"],
        },
        Field {
            key: "channel.access_token",
            value: redact_secret(config.channel.access_token.expose_secret()),
            env_keys: &["ORDERBOT_CHANNEL_ACCESS_TOKEN", "WHATSAPP_ACCESS_TOKEN"],
        },
        Field {
            key: "channel.phone_number_id",
            value: config.channel.phone_number_id.clone().unwrap_or_else(|| "<unset>".to_string()),
            env_keys: &["ORDERBOT_CHANNEL_PHONE_NUMBER_ID"],
        },
        Field {
            key: "channel.api_base_url",
            value: config.channel.api_base_url.clone(),
            env_keys: &["ORDERBOT_CHANNEL_API_BASE_URL"],
        },
        Field {
            key: "agent.store_timeout_ms",
            value: config.agent.store_timeout_ms.to_string(),
            env_keys: &["ORDERBOT_AGENT_STORE_TIMEOUT_MS"],
        },
        Field {
            key: "agent.max_line_quantity",
            value: config.agent.max_line_quantity.to_string(),
            env_keys: &["ORDERBOT_AGENT_MAX_LINE_QUANTITY"],
        },
        Field {
            key: "agent.max_tool_rounds",
            value: config.agent.max_tool_rounds.to_string(),
            env_keys: &["ORDERBOT_AGENT_MAX_TOOL_ROUNDS"],
        },
        Field {
            key: "agent.planner_url",
            value: config.agent.planner_url.clone().unwrap_or_else(|| "<unset>".to_string()),
            env_keys: &["ORDERBOT_AGENT_PLANNER_URL"],
        },
        Field {
            key: "agent.planner_timeout_secs",
            value: config.agent.planner_timeout_secs.to_string(),
            env_keys: &["ORDERBOT_AGENT_PLANNER_TIMEOUT_SECS"],
        },
        Field {
            key: "server.bind_address",
            value: config.server.bind_address.clone(),
            env_keys: &["ORDERBOT_SERVER_BIND_ADDRESS"],
        },
        Field {
            key: "server.port",
            value: config.server.port.to_string(),
            env_keys: &["ORDERBOT_SERVER_PORT"],
        },
        Field {
            key: "server.graceful_shutdown_secs",
            value: config.server.graceful_shutdown_secs.to_string(),
            env_keys: &["ORDERBOT_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        },
        Field {
            key: "logging.level",
            value: config.logging.level.clone(),
            env_keys: &["ORDERBOT_LOGGING_LEVEL", "ORDERBOT_LOG_LEVEL"],
        },
        Field {
            key: "logging.format",
            value: format!("{:?}", config.logging.format),
            env_keys: &["ORDERBOT_LOGGING_FORMAT", "ORDERBOT_LOG_FORMAT"],
        },
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("orderbot.toml"), PathBuf::from("config/orderbot.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: &Path) -> Option<Value> {
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(field: &Field<'_>, doc: Option<&Value>, path: Option<&Path>) -> String {
    if let Some(env_key) = field.env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if doc.is_some_and(|doc| contains_path(doc, field.key)) {
        let file_path = path
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "config file".to_string());
        return format!("file ({file_path})");
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn redact_secret(secret: &str) -> String {
    let trimmed = secret.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }
    let visible: String = trimmed.chars().take(4).collect();
    format!("{visible}***")
}
