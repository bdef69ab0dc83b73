// src/main.rs

//! Realtor contact enrichment CLI.
//!
//! Each stage can run on its own against explicit input/output tables,
//! or the full pipeline can run end to end with the configured paths.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use realtor_enrich::Result;
use realtor_enrich::models::Config;
use realtor_enrich::pipeline::PipelineRunner;

#[derive(Parser, Debug)]
#[command(
    name = "realtor-enrich",
    version,
    about = "Progressive enrichment pipeline for realtor contact records"
)]

/// CLI Arguments
struct Cli {
    #[arg(short, long, default_value = "data/config.toml")]
    config: String,

    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

/// CLI Commands
#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape the listing index into the base contact table
    Scrape {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Visit personal websites to fill missing emails
    Enrich {
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Search the web for records still missing an email
    Complete {
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run all three stages in sequence
    Pipeline,
    /// Validate the configuration and exit
    Validate,
}

/// Main entry point
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load_or_default(&cli.config);

    // Initialize logging system
    let level = if cli.quiet {
        "warn"
    } else {
        config.logging.level.as_str()
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if matches!(cli.command, Command::Validate) {
        config.validate()?;
        log::info!("configuration OK");
        return Ok(());
    }

    let runner = PipelineRunner::new(config)?;
    match cli.command {
        Command::Scrape { output } => {
            let output = output.unwrap_or_else(|| runner.listing_path());
            runner.run_scrape(&output).await?;
        }
        Command::Enrich { input, output } => {
            let input = input.unwrap_or_else(|| runner.listing_path());
            let output = output.unwrap_or_else(|| runner.enriched_path());
            runner.run_enrich(&input, &output).await?;
        }
        Command::Complete { input, output } => {
            let input = input.unwrap_or_else(|| runner.enriched_path());
            let output = output.unwrap_or_else(|| runner.final_path());
            runner.run_complete(&input, &output).await?;
        }
        Command::Pipeline => runner.run_pipeline().await?,
        // Handled above.
        Command::Validate => {}
    }

    Ok(())
}
