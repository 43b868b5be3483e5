mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "postmetrics-cli")]
#[command(about = "Operator tools for the postmetrics upload service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run metric extraction on local screenshots and print the JSON result
    Extract {
        /// Screenshot files of one piece of content
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },
    /// Resolve a folder path in Drive, creating missing levels, and print its id
    ResolvePath {
        /// Folder names from the top level down (e.g. Acme Launch Jane)
        #[arg(required = true)]
        segments: Vec<String>,
        /// Parent folder id (defaults to DRIVE_ROOT_FOLDER_ID)
        #[arg(long)]
        root: Option<String>,
    },
    /// Load configuration and print it with secrets redacted
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = postmetrics_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Extract { images } => commands::run_extract(&config, &images).await,
        Commands::ResolvePath { segments, root } => {
            commands::run_resolve_path(&config, root.as_deref(), segments).await
        }
        Commands::CheckConfig => {
            commands::run_check_config(&config);
            Ok(())
        }
    }
}
