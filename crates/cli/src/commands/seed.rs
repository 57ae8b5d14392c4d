use orderbot_db::{migrations, DemoSeedDataset, VerificationResult};

use crate::commands::{block_on, load_config, open_pool, step, CommandResult, StepFailure};

pub fn run() -> CommandResult {
    let config = match load_config("seed") {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let result = block_on("seed", async {
        let pool = open_pool(&config).await?;
        let outcome = async {
            migrations::run_pending(&pool)
                .await
                .map_err(step("migration", 5))?;
            let seeded = DemoSeedDataset::load(&pool)
                .await
                .map_err(step("seed_execution", 5))?;
            let verification = DemoSeedDataset::verify(&pool)
                .await
                .map_err(step("seed_verification", 6))?;
            if !verification.all_present {
                return Err(("seed_verification", verification_message(&verification), 6));
            }
            Ok::<_, StepFailure>(seeded)
        }
        .await;
        pool.close().await;
        outcome
    });

    match result {
        Ok(seeded) => CommandResult::success(
            "seed",
            format!(
                "demo business {} seeded with {} menu items",
                seeded.business_phone, seeded.menu_items_seeded
            ),
        ),
        Err(failure) => failure,
    }
}

fn verification_message(verification: &VerificationResult) -> String {
    let failed_checks = verification
        .checks
        .iter()
        .filter_map(|(check, passed)| (!passed).then_some(*check))
        .collect::<Vec<_>>();
    if failed_checks.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for checks: {}", failed_checks.join(", "))
    }
}
