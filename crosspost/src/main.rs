//! crosspost - Publish a message with images to VK, Telegram and Facebook

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use libcrosspost::config::{expand_path, load_dotenv};
use libcrosspost::logging::{LogFormat, LoggingConfig, LOG_FILE_NAME};
use libcrosspost::{create_targets, CrosspostError, Dispatcher, Post, TracingReporter};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "crosspost")]
#[command(about = "Publish a message with images to VK, Telegram and Facebook", long_about = None)]
struct Cli {
    /// Text file with the message to publish
    #[arg(short, long, default_value = "message.txt")]
    file: String,

    /// Directory with the images to attach
    #[arg(short, long, default_value = "images")]
    images: String,

    /// Directory for the log file (defaults to the executable's directory)
    #[arg(short, long)]
    log: Option<String>,

    /// Log line format (text or json)
    #[arg(long, env = "CROSSPOST_LOG_FORMAT", default_value = "text")]
    log_format: LogFormat,

    /// Dotenv file with credentials (defaults to .env when present)
    #[arg(long)]
    env_file: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    // Run the main logic and handle errors
    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        let code = e
            .downcast_ref::<CrosspostError>()
            .map(CrosspostError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let env_file = load_dotenv(cli.env_file.as_deref().map(expand_path).as_deref())?;

    let log_dir = match &cli.log {
        Some(dir) => expand_path(dir),
        None => default_log_dir(),
    };
    let log_path = log_dir.join(LOG_FILE_NAME);
    LoggingConfig::new(cli.log_format, "info".to_string(), cli.verbose, &log_path)
        .init()
        .with_context(|| format!("Failed to initialize logging in {}", log_dir.display()))?;

    if let Some(path) = env_file {
        info!("Loaded environment from {}", path.display());
    }

    let post = match Post::load(&expand_path(&cli.file), &expand_path(&cli.images)).await {
        Ok(post) => post,
        Err(e) => {
            error!("Failed to load post content: {}", e);
            return Err(e.into());
        }
    };
    info!(
        "Loaded post: {} characters, {} images",
        post.message.chars().count(),
        post.images.len()
    );

    let vars: Vec<(String, String)> = std::env::vars().collect();
    let dispatcher = Dispatcher::new(create_targets(&vars), Box::new(TracingReporter));
    let results = dispatcher.dispatch(&post).await;

    // Platform failures are already logged and never change the exit code
    let published = results.iter().filter(|r| r.success).count();
    info!(
        "Publishing finished: {} of {} platforms succeeded",
        published,
        results.len()
    );

    Ok(())
}

/// Directory of the running executable, or the working directory
fn default_log_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."))
}
