use super::{
    blocking_runtime, load_config, open_pool, render_setup_failure, CommandResult, SetupFailure,
};
use clerky_core::config::LoadOptions;
use clerky_db::migrations;

pub fn run(options: LoadOptions) -> CommandResult {
    let config = match load_config("migrate", options) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match blocking_runtime("migrate") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    // Pending count is read before applying so the summary can report how
    // much work this run actually did.
    let applied = runtime.block_on(async {
        let pool = open_pool(&config).await?;

        let before = migrations::status(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;
        pool.close().await;

        Ok::<usize, SetupFailure>(before.pending)
    });

    match applied {
        Ok(0) => CommandResult::success("migrate", "schema already current, nothing applied"),
        Ok(count) => {
            CommandResult::success("migrate", format!("applied {count} pending migrations"))
        }
        Err(failure) => render_setup_failure("migrate", failure),
    }
}
