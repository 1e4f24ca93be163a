pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "craftquote",
    about = "Craftquote operator CLI",
    long_about = "Operate Craftquote migrations, demo seeding, pricing evaluation, config inspection, and readiness checks.",
    after_help = "Examples:\n  craftquote migrate\n  craftquote seed\n  craftquote evaluate --template tpl-dining-table --material oak --quantity 12 --dim width=135\n  craftquote doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo pricing dataset")]
    Seed,
    #[command(about = "Price one quote line against the local rule database")]
    Evaluate(commands::evaluate::EvaluateArgs),
    #[command(about = "Print effective configuration values with secrets redacted")]
    Config,
    #[command(about = "Validate config and database connectivity checks")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Evaluate(args) => commands::evaluate::run(args),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
