//! dreamcatcher CLI entrypoint
//! Parses command-line arguments and runs a dream through the generation orchestrator.
#![deny(unsafe_code)]

// Internal imports (std, crate)
use dreamcatcher::{
    application::{GenerateDreamRequest, GenerateDreamResponse, GenerateDreamUseCase},
    core::Config,
    generation::{CompletionPolicy, GenerationEvent, GenerationOrchestrator, Subscription},
    infrastructure::{FileSystemOutputService, HttpGenerationClient},
    session::SlotStatus,
};
use std::path::PathBuf;
use std::sync::Arc;

// External imports (alphabetized)
use anyhow::Context;
use clap::Parser;
use futures::StreamExt;
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Parser)]
#[command(name = "dreamcatcher")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to <config dir>/dreamcatcher/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Generate tags and four illustrative images for a dream
    Generate(GenerateArgs),
    /// Print the effective configuration as TOML
    Config,
}

#[derive(clap::Args, Debug)]
pub struct GenerateArgs {
    /// The dream, as free text
    #[arg(long)]
    prompt: String,
    /// Directory for images and dream.json (defaults to output.directory)
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Do not write anything to disk
    #[arg(long, conflicts_with = "output_dir")]
    no_save: bool,
    /// How a failed tags call affects the outcome: tags_required or partial_success
    #[arg(long)]
    policy: Option<CompletionPolicy>,
    /// Tag generation service URL
    #[arg(long)]
    tags_url: Option<Url>,
    /// Image generation service URL
    #[arg(long)]
    image_url: Option<Url>,
    /// Per-request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Print the final report as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with default level INFO; stdout is reserved for results
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Generate(args) => run_generate(config, args).await,
        Commands::Config => {
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}

/// Runtime handler for the generate command
async fn run_generate(mut config: Config, args: GenerateArgs) -> anyhow::Result<()> {
    if let Some(url) = args.tags_url {
        config.service.tags_url = url;
    }
    if let Some(url) = args.image_url {
        config.service.image_url = url;
    }
    if let Some(timeout_secs) = args.timeout_secs {
        config.service.timeout_secs = timeout_secs;
    }
    if let Some(policy) = args.policy {
        config.generation.completion_policy = policy;
    }
    config.validate()?;

    info!(
        policy = %config.generation.completion_policy,
        "Starting dreamcatcher"
    );

    let client = HttpGenerationClient::new(&config.service)
        .context("Failed to create generation client")?;
    let orchestrator =
        GenerationOrchestrator::with_policy(Arc::new(client), config.generation.completion_policy);

    let progress = tokio::spawn(print_progress(orchestrator.subscribe()));

    let output_dir = if args.no_save {
        None
    } else {
        Some(args.output_dir.unwrap_or(config.output.directory))
    };

    let use_case = GenerateDreamUseCase::new(orchestrator, Arc::new(FileSystemOutputService::new()));
    let response = use_case
        .execute(GenerateDreamRequest {
            prompt: args.prompt,
            output_dir,
        })
        .await
        .context("Dream generation failed")?;

    // The progress printer stops at the terminal event
    progress.await.context("Progress printer failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_summary(&response);
    }

    if !response.succeeded() {
        let reason = response
            .last_error
            .as_ref()
            .map(|record| format!("{} failed: {}", record.unit, record.error))
            .unwrap_or_else(|| "attempt ended in error".to_string());
        anyhow::bail!("Dream could not be analyzed ({})", reason);
    }

    Ok(())
}

async fn print_progress(mut events: Subscription) {
    while let Some(event) = events.next().await {
        match &event {
            GenerationEvent::StateChanged(state) => eprintln!("state: {}", state),
            GenerationEvent::TagsLoaded(tags) => eprintln!("tags: {}", tags.join(", ")),
            GenerationEvent::ImageLoaded { index, image } => {
                eprintln!("image {} ready ({} bytes)", index, image.len())
            }
            GenerationEvent::ImageFailed { index, error } => {
                eprintln!("image {} failed: {}", index, error)
            }
            GenerationEvent::GenerationFailed { kind, error } => {
                eprintln!("{} failed: {}", kind, error)
            }
        }
        if event.is_terminal() {
            break;
        }
    }
}

fn print_summary(response: &GenerateDreamResponse) {
    println!("Dream: {}", response.prompt);
    println!("Outcome: {}", response.state);
    if response.tags.is_empty() {
        println!("Tags: (none)");
    } else {
        println!("Tags: {}", response.tags.join(", "));
    }
    for image in &response.images {
        match (image.status, &image.path, &image.error) {
            (SlotStatus::Loaded, Some(path), _) => {
                println!("  image {}: {}", image.index, path.display())
            }
            (SlotStatus::Loaded, None, _) => {
                println!("  image {}: {} bytes", image.index, image.bytes.unwrap_or(0))
            }
            (_, _, Some(error)) => println!("  image {}: failed ({})", image.index, error),
            (status, _, None) => println!("  image {}: {:?}", image.index, status),
        }
    }
    if let Some(path) = &response.output_path {
        println!(
            "Wrote {} file(s) to {}",
            response.artifacts_count,
            path.display()
        );
    }
}
