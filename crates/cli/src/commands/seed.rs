use super::{
    blocking_runtime, load_config, open_migrated_pool, render_setup_failure, CommandResult,
    SetupFailure,
};
use clerky_core::config::LoadOptions;
use clerky_db::{DemoSeedDataset, SeedResult};

pub fn run(options: LoadOptions) -> CommandResult {
    let config = match load_config("seed", options) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match blocking_runtime("seed") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let outcome: Result<SeedResult, SetupFailure> = runtime.block_on(async {
        let pool = open_migrated_pool(&config).await?;

        let seeded = DemoSeedDataset::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;
        let verification = DemoSeedDataset::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;
        pool.close().await;

        let missing = verification.missing();
        if missing.is_empty() {
            Ok(seeded)
        } else {
            let message = format!("Seed verification failed for checks: {}", missing.join(", "));
            Err(("seed_verification", message, 6u8))
        }
    });

    match outcome {
        Ok(seeded) => CommandResult::success("seed", render_summary(&seeded)),
        Err(failure) => render_setup_failure("seed", failure),
    }
}

fn render_summary(seeded: &SeedResult) -> String {
    let mut lines = vec![format!(
        "demo dataset loaded and verified: {} orders, {} inventory items",
        seeded.orders_seeded.len(),
        seeded.inventory_seeded.len()
    )];
    for row in &seeded.orders_seeded {
        lines.push(format!("  - order {}: {}", row.id, row.description));
    }
    for row in &seeded.inventory_seeded {
        lines.push(format!("  - inventory {}: {}", row.id, row.description));
    }
    lines.join("\n")
}
