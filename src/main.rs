mod cli;
mod commands;
mod server;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Command};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.command {
        Command::Serve | Command::Watch => "info",
        _ => "warn",
    };

    // Tracing goes to stderr for all commands: warnings only for CLI verbs,
    // info-level progress for serve/watch. Stdout stays clean for command
    // output and the serve protocol.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    match cli.command {
        Command::Init { index } => commands::cmd_init(index, cli.json),
        Command::Index { force, quiet } => commands::cmd_index(force, quiet, cli.json),
        Command::Sync { quiet } => commands::cmd_sync(quiet, cli.json),
        Command::Watch => commands::cmd_watch(),
        Command::Status => commands::cmd_status(cli.json),
        Command::Query { query, kind, limit } => {
            commands::cmd_query(&query, kind.map(Into::into), limit, cli.json)
        }
        Command::Semantic { query, limit } => commands::cmd_semantic(&query, limit, cli.json),
        Command::Context {
            query,
            max_nodes,
            compact,
        } => commands::cmd_context(&query, max_nodes, compact, cli.json),
        Command::Overview => commands::cmd_overview(cli.json),
        Command::Hooks { action } => commands::cmd_hooks(&action, cli.json),
        Command::Serve => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(server::run_server())
        }
        Command::Reset => commands::cmd_reset(cli.json),
    }
}
