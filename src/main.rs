//! LegalTrans - Legal Document Translation Comparison
//!
//! This is the main entry point for the LegalTrans application, which
//! translates English legal documents to Ukrainian through three engines
//! and writes a side-by-side DOCX comparison report.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tracing_appender::{non_blocking, rolling};

use legaltrans::cli::{Args, Commands};
use legaltrans::config::Config;
use legaltrans::dispatch::CancelFlag;
use legaltrans::setup::{SetupManager, APP_DIR};
use legaltrans::workflow::Workflow;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Setup logging to both console and file
    setup_logging(args.verbose)?;

    // Load configuration
    let config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            // Try to load config.toml from current directory first
            if std::path::Path::new("config.toml").exists() {
                info!("Found config.toml in current directory, loading...");
                Config::from_file("config.toml")?
            } else {
                Config::default()
            }
        }
    };

    // A Ctrl-C stops new paragraph submissions; in-flight ones drain.
    let cancel = CancelFlag::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, finishing in-flight paragraphs...");
                cancel.cancel();
            }
        });
    }

    let workflow = Workflow::new(config.clone());

    // Execute command
    match args.command {
        Commands::Translate { source, output_dir, workers } => {
            info!("Translating source: {}", source);
            let report_path = workflow
                .translate_source(&source, output_dir.as_deref(), workers, &cancel)
                .await?;
            println!("Report written to {}", report_path.display());
        }
        Commands::Batch { input_dir, output_dir, workers } => {
            info!("Translating directory: {}", input_dir.display());
            let count = workflow
                .translate_directory(&input_dir, output_dir.as_deref(), workers, &cancel)
                .await?;
            println!("Translated {} documents", count);
        }
        Commands::Extract { source, output } => {
            info!("Extracting paragraphs from: {}", source);
            let paragraphs = workflow.extract_only(&source, output.as_deref()).await?;
            if output.is_none() {
                for paragraph in &paragraphs {
                    println!("{}. {}", paragraph.index + 1, paragraph.text);
                }
            }
        }
        Commands::Models { download } => {
            info!("Listing local model files...");

            let setup = SetupManager::new()?;
            let assets = SetupManager::model_assets(&config.local);
            let models_dir = match &config.local.model_dir {
                Some(dir) => PathBuf::from(dir),
                None => setup.models_dir(),
            };

            println!("\nLocal Model Files:");
            println!("{:<20} {:<35} {:<10} {:<10}", "Name", "Filename", "Size (MB)", "Status");
            println!("{}", "-".repeat(80));

            for asset in &assets {
                let local_path = models_dir.join(&asset.filename);
                let status = if local_path.exists() {
                    "Downloaded"
                } else {
                    "Missing"
                };

                println!("{:<20} {:<35} {:<10.1} {:<10}",
                    asset.name, asset.filename, asset.size_mb, status);
            }

            if download {
                info!("Downloading missing model files...");
                setup.ensure_model_assets(&config.local).await?;
                info!("All model files present");
            }
        }
    }

    info!("LegalTrans completed successfully");
    Ok(())
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let app_dir = std::env::current_dir()?.join(APP_DIR);
    let log_dir = app_dir.join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "legaltrans.log");
    let (non_blocking_file, _guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(_guard);

    // Determine log level
    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    // Create console layer
    let console_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true);

    // Create file layer
    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false); // No ANSI colors in file

    // Setup layered subscriber
    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer);

    // Initialize the subscriber
    subscriber.try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized - console: {}, file: {}",
          log_level, log_dir.join("legaltrans.log").display());

    Ok(())
}
