use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use stagegate_mentor::{
    cli::{run_chat, ChatOptions},
    config::{Config, LogFormat},
    llm::GeminiClient,
    server::{serve, AppState},
    ConversationOrchestrator,
};

#[derive(Debug, Parser)]
#[command(name = "stagegate-mentor", version, about = "Stage-Gate business idea mentor")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP API
    Serve,
    /// Validate an idea interactively in the terminal
    Chat {
        /// Skip the step-by-step dialogue and get the full research report
        #[arg(long)]
        autopilot: bool,
        /// Target region or city for market research
        #[arg(long)]
        region: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        model = %config.gemini.model,
        "Stage-Gate mentor starting..."
    );

    // Initialize Gemini client
    let client = match GeminiClient::new(&config.gemini, config.request.clone()) {
        Ok(c) => {
            info!(base_url = %config.gemini.base_url, "Gemini client initialized");
            Arc::new(c)
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize Gemini client");
            return Err(e.into());
        }
    };

    match cli.command {
        Command::Serve => {
            let state = Arc::new(AppState::new(config, client));
            if let Err(e) = serve(state).await {
                error!(error = %e, "Server error");
                return Err(e.into());
            }
            info!("Server shutdown complete");
        }
        Command::Chat { autopilot, region } => {
            let orchestrator = ConversationOrchestrator::new(client, &config);
            run_chat(orchestrator, ChatOptions { autopilot, region }).await?;
        }
    }

    Ok(())
}

/// Initialize tracing/logging
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}
