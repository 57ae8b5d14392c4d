use std::sync::Arc;
use std::time::Duration;

use orderbot_agent::{
    AgentRuntime, DecisionModel, GuardrailPolicy, HttpDecisionModel, ToolExecutor,
    TurnCoordinator, UnavailableDecisionModel,
};
use orderbot_channel::{delivery_from_config, WhatsAppError};
use orderbot_core::config::{AppConfig, ConfigError};
use orderbot_core::store::{CommerceStore, SessionStore};
use orderbot_db::{connect_with_settings, migrations, DbPool, SqlCommerceStore, SqlSessionStore};
use thiserror::Error;
use tracing::{info, warn};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub runtime: Arc<AgentRuntime>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("channel setup failed: {0}")]
    Channel(#[from] WhatsAppError),
    #[error("planner client setup failed: {0}")]
    Planner(#[source] anyhow::Error),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let delivery = delivery_from_config(&config.channel)?;
    let model = decision_model(&config)?;

    let commerce: Arc<dyn CommerceStore> = Arc::new(SqlCommerceStore::new(db_pool.clone()));
    let sessions: Arc<dyn SessionStore> = Arc::new(SqlSessionStore::new(db_pool.clone()));
    let executor = ToolExecutor::new(
        commerce,
        GuardrailPolicy::new(config.agent.max_line_quantity),
        Duration::from_millis(config.agent.store_timeout_ms),
    );
    let coordinator = Arc::new(TurnCoordinator::new(sessions, executor));
    let runtime =
        Arc::new(AgentRuntime::new(model, coordinator, delivery, config.agent.max_tool_rounds));

    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        channel = ?config.channel.provider,
        planner = config.agent.planner_url.is_some(),
        "agent runtime assembled"
    );

    Ok(Application { config, db_pool, runtime })
}

fn decision_model(config: &AppConfig) -> Result<Arc<dyn DecisionModel>, BootstrapError> {
    match config.agent.planner_url.as_deref() {
        Some(url) => {
            let timeout = Duration::from_secs(config.agent.planner_timeout_secs);
            let model = HttpDecisionModel::new(url, timeout).map_err(BootstrapError::Planner)?;
            Ok(Arc::new(model))
        }
        None => {
            warn!(
                event_name = "system.bootstrap.planner_missing",
                correlation_id = "bootstrap",
                "agent.planner_url is not set; /chat will answer with the fallback reply"
            );
            Ok(Arc::new(UnavailableDecisionModel))
        }
    }
}

#[cfg(test)]
mod tests {
    use orderbot_core::config::{AppConfig, ChannelProvider, ConfigOverrides, LoadOptions};

    use super::{bootstrap_with_config, Application, BootstrapError};

    async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
        bootstrap_with_config(AppConfig::load(options)?).await
    }

    fn overrides(database_url: &str) -> ConfigOverrides {
        ConfigOverrides { database_url: Some(database_url.to_string()), ..ConfigOverrides::default() }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_when_whatsapp_credentials_are_missing() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                channel_provider: Some(ChannelProvider::Whatsapp),
                ..overrides("sqlite::memory:")
            },
            ..LoadOptions::default()
        })
        .await;

        let message = result.err().expect("validation error").to_string();
        assert!(message.contains("channel.access_token"), "message: {message}");
    }

    #[tokio::test]
    async fn bootstrap_migrates_and_assembles_the_runtime() {
        let app = bootstrap(LoadOptions {
            overrides: overrides("sqlite::memory:?cache=shared"),
            ..LoadOptions::default()
        })
        .await
        .expect("bootstrap should succeed with the log channel");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('business', 'menu_item', 'customer_order', 'conversation_session')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("ordering tables after bootstrap");
        assert_eq!(table_count, 4);
        assert!(app.config.agent.planner_url.is_none());

        app.db_pool.close().await;
    }
}
