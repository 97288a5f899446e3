pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "sierra",
    about = "Sierra Outfitters agent CLI",
    long_about = "Chat with the Sierra Outfitters support agent, check runtime readiness, \
                  and score the dialogue pipeline against the built-in evaluation cases.",
    after_help = "Examples:\n  sierra chat\n  sierra doctor --json\n  sierra eval --category order_status"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Start an interactive chat session on stdin/stdout")]
    Chat,
    #[command(about = "Validate config, data files, and llm fallback readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Score the dialogue pipeline against the built-in evaluation cases")]
    Eval {
        #[arg(long, help = "Only run cases in the given category")]
        category: Option<String>,
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Chat => return commands::chat::run(),
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Eval { category, json } => commands::eval::run(category.as_deref(), json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
