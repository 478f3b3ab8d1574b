use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;
mod commands;

use cli::{Cli, Command};

fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.debug);

    let data_dir = commands::data_dir(cli.data_dir.as_deref());
    match cli.command {
        Command::Scan {
            file,
            session,
            external_score,
            report,
            json,
        } => commands::scan(
            &data_dir,
            cli.registry.as_deref(),
            file.as_deref(),
            &session,
            external_score,
            report,
            json,
        ),
        Command::Score {
            session,
            user,
            json,
        } => commands::score(&data_dir, &session, &user, json),
        Command::Leaderboard { limit, json } => commands::leaderboard(&data_dir, limit, json),
        Command::Stats { json } => commands::stats(&data_dir, json),
    }
}

fn setup_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("leakscope=debug")
    } else {
        EnvFilter::new("leakscope=info")
    };

    // Results go to stdout; diagnostics stay on stderr.
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
