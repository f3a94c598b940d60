//! EduForge CLI
//!
//! Serves the web form, or performs a single generate/review run in the terminal.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use eduforge_pipeline::{ChatCompletionsClient, Config, ContentRequest, Pipeline};
use eduforge_render::{json::JsonGenerator, Panes};
use eduforge_web::{create_router, AppState};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// EduForge - grade-level lesson generator and reviewer
///
/// Generates an explanation and three multiple-choice questions for a topic,
/// has a second model pass review them, and refines once if the review fails.
#[derive(Parser, Debug)]
#[command(name = "eduforge")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (default: eduforge.json in current directory)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Serve the web form (default)
    Serve {
        /// Address to bind (overrides the config file)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides the config file)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run the pipeline once and print the result
    Run {
        /// Grade level, 1-12
        #[arg(short, long)]
        grade: u8,

        /// Lesson topic
        #[arg(short, long)]
        topic: String,

        /// Print the full pipeline state as JSON instead of Markdown
        #[arg(long)]
        json: bool,

        /// Write the output to a file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine.
    dotenv::dotenv().ok();

    let args = Args::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if args.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(config = ?args.config, "Config file");

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref())?;

    match args.command.unwrap_or(Command::Serve {
        host: None,
        port: None,
    }) {
        Command::Serve { host, port } => serve(config, host, port).await,
        Command::Run {
            grade,
            topic,
            json,
            output,
        } => run_once(&config, grade, &topic, json, output.as_deref()).await,
    }
}

/// Builds the production pipeline for `config`.
fn build_pipeline(config: &Config) -> Pipeline {
    let model = Arc::new(ChatCompletionsClient::from_config(config));
    tracing::debug!(endpoint = %model.endpoint(), "Model endpoint");
    Pipeline::from_config(config, model)
}

/// Serves the web form until Ctrl+C.
async fn serve(mut config: Config, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }
    config.validate()?;

    print_config(&config);
    if !config.has_api_key() {
        tracing::warn!(
            env_var = config.provider.api_key_env(),
            "No API key configured; runs will fail until one is set"
        );
    }

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| {
            anyhow::anyhow!(
                "Invalid listen address '{}:{}': {e}\n\nSuggestion: Use an IP address such as 127.0.0.1 for --host",
                config.host,
                config.port
            )
        })?;

    let pipeline = build_pipeline(&config);
    let router = create_router(AppState::new(config, pipeline));

    let listener = TcpListener::bind(addr).await.map_err(|e| {
        anyhow::anyhow!(
            "Failed to bind to {addr}: {e}\n\nSuggestion: Try a different port with --port"
        )
    })?;

    println!();
    println!("EduForge running on http://{addr}");
    println!("Press Ctrl+C to stop");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Resolves when Ctrl+C is received.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
    }
}

/// Performs one run and prints or writes the result.
async fn run_once(
    config: &Config,
    grade: u8,
    topic: &str,
    json: bool,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let request = ContentRequest::new(grade, topic)?;
    let pipeline = build_pipeline(config);

    let state = pipeline.run(request).await?;

    let rendered = if json {
        let generator = JsonGenerator::new(&state);
        if let Some(path) = output {
            generator.write_to_file(path, true)?;
            println!("Wrote {}", path.display());
            return Ok(());
        }
        generator.generate_pretty()?
    } else {
        Panes::from_state(&state).to_document()
    };

    match output {
        Some(path) => {
            std::fs::write(path, rendered).map_err(|e| {
                anyhow::anyhow!("Failed to write '{}': {e}", path.display())
            })?;
            println!("Wrote {}", path.display());
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

/// Loads configuration from an explicit path or the current directory.
fn load_config(config_path: Option<&str>) -> anyhow::Result<Config> {
    match config_path {
        Some(path_str) => {
            let path = Path::new(path_str);
            if !path.exists() {
                anyhow::bail!(
                    "Config file not found: '{}'\n\nSuggestion: Check the path or remove the --config flag to use defaults",
                    path.display()
                );
            }
            let mut config = Config::load_from_file(path)?;
            config.apply_env(|key| std::env::var(key).ok())?;
            Ok(config)
        }
        None => Ok(Config::load()?),
    }
}

/// Prints the effective configuration, without the API key.
fn print_config(config: &Config) {
    println!("Configuration loaded:");
    println!("  LLM provider: {}", config.provider);
    println!("  Model: {}", config.model_name);
    println!("  Endpoint: {}", config.effective_base_url());
    println!("  Max refinement passes: {}", config.max_refinement_passes);
    println!(
        "  API key: {}",
        if config.has_api_key() { "set" } else { "missing" }
    );
}
