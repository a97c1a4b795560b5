pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use clerky_core::config::{ConfigOverrides, LoadOptions};

#[derive(Debug, Parser)]
#[command(
    name = "clerky",
    about = "Clerky support agent CLI",
    long_about = "Operate the Clerky monitored support agent: run queries, apply migrations, \
                  load demo data, inspect configuration, and check readiness.",
    after_help = "Examples:\n  clerky ask \"Where is order #12345?\"\n  clerky migrate\n  clerky doctor --json"
)]
pub struct Cli {
    #[arg(long, global = true, value_name = "PATH", help = "Path to the configuration file")]
    config: Option<PathBuf>,
    #[arg(long, global = true, value_name = "URL", help = "Override the database URL")]
    database_url: Option<String>,
    #[arg(long, global = true, value_name = "LEVEL", help = "Override the log level")]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Run one customer query through the monitored agent")]
    Ask {
        #[arg(help = "The customer query text")]
        query: String,
        #[arg(long, help = "Customer identifier attached to the query")]
        customer_id: Option<String>,
        #[arg(long, help = "Emit the query report and metrics snapshot as JSON")]
        json: bool,
    },
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the demo support dataset and verify every row landed")]
    Seed,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate configuration, database connectivity, and migration status")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = LoadOptions {
        config_path: cli.config,
        require_file: false,
        overrides: ConfigOverrides {
            database_url: cli.database_url,
            log_level: cli.log_level,
            ..ConfigOverrides::default()
        },
    };

    let result = match cli.command {
        Command::Ask { query, customer_id, json } => {
            commands::ask::run(options, &query, customer_id.as_deref(), json)
        }
        Command::Migrate => commands::migrate::run(options),
        Command::Seed => commands::seed::run(options),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run(options) }
        }
        Command::Doctor { json } => commands::doctor::run(options, json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
