use anyhow::{Context, Result};
use clap::Parser;
use peak_cli::{Cli, Commands};
use peak_core::PipelineConfig;
use tracing::{debug, error};
use tracing_subscriber::FmtSubscriber;

mod commands;

fn load_config(cli: &Cli) -> Result<PipelineConfig> {
    match &cli.config {
        Some(path) => PipelineConfig::load_from(path)
            .with_context(|| format!("loading configuration '{}'", path.display())),
        None => Ok(PipelineConfig::default()),
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    debug!(command = ?cli.command, "dispatching");
    match &cli.command {
        Commands::Prepare(args) => commands::prepare::handle(args, &config),
        Commands::Terms(args) => commands::terms::handle(args, &config),
        Commands::Evaluate(args) => commands::evaluate::handle(args, &config),
        Commands::Config { out } => commands::config::handle(out.as_deref(), &config),
    }
}

fn main() {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("setting default subscriber failed: {err}");
    }

    if let Err(err) = run(&cli) {
        error!("{err:#}");
        std::process::exit(1);
    }
}
