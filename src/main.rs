#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::struct_field_names
)]

use anyhow::{Context, Result};
use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use lidwake::commands::Cli;
use lidwake::config::Config;

mod app;

fn log_level(verbose: bool) -> Level {
    let from_env = std::env::var("LIDWAKE_LOG")
        .is_ok_and(|value| value.trim().eq_ignore_ascii_case("debug"));
    if verbose || from_env {
        Level::DEBUG
    } else {
        Level::INFO
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level(cli.verbose))
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    let config = Config::load_or_init()?;
    app::dispatch::dispatch(cli, config).await
}
