#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

use anyhow::Result;
use clap::{Parser, Subcommand};
use sidekick::config::Config;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "sidekick", about = "An always-on screen-watching voice companion", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the companion loop (default)
    Run,
    /// Print the effective configuration
    Config,
    /// Summarize the collected gold dataset
    Dataset {
        #[command(subcommand)]
        command: DatasetCommands,
    },
}

#[derive(Subcommand)]
enum DatasetCommands {
    /// Count total, spoken and silent logged turns
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let cli = Cli::parse();
    let config = Config::load_or_init()?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => sidekick::agent::run(config).await,
        Commands::Config => {
            println!("# {}", config.config_path.display());
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        Commands::Dataset {
            command: DatasetCommands::Stats,
        } => {
            let dir = config.dataset.resolve_dir(&config.workspace_dir);
            let stats = sidekick::dataset::stats(&dir)?;
            println!("dataset: {}", dir.display());
            println!("  total turns:  {}", stats.total);
            println!("  spoken:       {}", stats.spoken);
            println!("  silent:       {}", stats.silent);
            println!("  annotated:    {}", stats.annotated);
            Ok(())
        }
    }
}
