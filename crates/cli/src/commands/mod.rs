pub mod config;
pub mod doctor;
pub mod migrate;
pub mod seed;

use std::future::Future;

use orderbot_core::config::{AppConfig, LoadOptions};
use orderbot_db::{connect_with_settings, DbPool};
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome<'a> {
    command: &'a str,
    status: &'static str,
    error_class: Option<&'a str>,
    message: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload =
            CommandOutcome { command, status: "ok", error_class: None, message: message.into() };
        Self { exit_code: 0, output: serialize_payload(&payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command,
            status: "error",
            error_class: Some(error_class),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(&payload) }
    }
}

/// A failed step inside a command: the error class, a message and the exit code.
pub(crate) type StepFailure = (&'static str, String, u8);

pub(crate) fn step<E: std::fmt::Display>(
    error_class: &'static str,
    exit_code: u8,
) -> impl FnOnce(E) -> StepFailure {
    move |error| (error_class, error.to_string(), exit_code)
}

pub(crate) fn load_config(command: &str) -> Result<AppConfig, CommandResult> {
    AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            2,
        )
    })
}

/// Runs `work` on a fresh current-thread runtime.
pub(crate) fn block_on<T>(
    command: &str,
    work: impl Future<Output = Result<T, StepFailure>>,
) -> Result<T, CommandResult> {
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(
        |error| {
            CommandResult::failure(
                command,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            )
        },
    )?;

    runtime.block_on(work).map_err(|(error_class, message, exit_code)| {
        CommandResult::failure(command, error_class, message, exit_code)
    })
}

pub(crate) async fn open_pool(config: &AppConfig) -> Result<DbPool, StepFailure> {
    connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(step("db_connectivity", 4))
}

fn serialize_payload(payload: &CommandOutcome<'_>) -> String {
    serde_json::to_string(payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::CommandResult;

    #[test]
    fn failure_output_is_single_line_json() {
        let result = CommandResult::failure("seed", "migration", "line one\nline two", 5);

        assert_eq!(result.exit_code, 5);
        assert_eq!(result.output.lines().count(), 1);
        let payload: Value = serde_json::from_str(&result.output).expect("json");
        assert_eq!(payload["error_class"], "migration");
        assert_eq!(payload["message"], "line one\nline two");
    }
}
