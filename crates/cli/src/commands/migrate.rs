use orderbot_db::migrations;

use crate::commands::{block_on, load_config, open_pool, step, CommandResult};

pub fn run() -> CommandResult {
    let config = match load_config("migrate") {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let result = block_on("migrate", async {
        let pool = open_pool(&config).await?;
        let applied = migrations::run_pending(&pool)
            .await
            .map_err(step("migration", 5));
        pool.close().await;
        applied
    });

    match result {
        Ok(()) => CommandResult::success("migrate", "applied pending migrations"),
        Err(failure) => failure,
    }
}
