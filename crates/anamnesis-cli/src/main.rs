//! Anamnesis CLI - extract a clinical history from a narrative typed on stdin.

use anamnesis_cli::input::read_narrative;
use anamnesis_cli::{run_session, Cli, Config, Formatter};
use clap::Parser;
use std::io;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Diagnostics go to stderr; RUST_LOG wins over -v
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    // Failures are reported, never turned into a non-zero exit status
    if let Err(e) = run(cli).await {
        eprintln!("{}", Formatter::new(false).error(&e.to_string()));
    }
}

async fn run(cli: Cli) -> anamnesis_cli::Result<()> {
    // Load config
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    cli.apply(&mut config);
    config.validate()?;

    let catalog = config.catalog()?;
    let formatter = Formatter::new(config.settings.color);

    println!("{}", formatter.input_prompt());
    let narrative = read_narrative(io::stdin().lock())?;
    if narrative.is_empty() {
        println!("{}", formatter.no_context());
        return Ok(());
    }

    run_session(&config, &catalog, &narrative, io::stdout()).await?;
    Ok(())
}
