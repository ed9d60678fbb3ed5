//! Galley CLI
//!
//! A command-line tool for compiling markup documents to PDF through
//! the galley pipeline.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use galley::{Config, EXAMPLE_CONFIG, JobStatus, Pipeline, validate};
use tracing::{Level, debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "galley")]
#[command(about = "Compile markup documents to PDF through an external TeX toolchain")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new configuration file
    Init {
        /// Output path (default: galley.toml)
        #[arg(short, long, default_value = "galley.toml")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Probe the TeX toolchain and report its version
    Check,

    /// Validate a markup file against the directive denylist
    Validate {
        /// Markup file to validate
        #[arg(value_name = "FILE")]
        source: PathBuf,
    },

    /// Compile a markup file to PDF
    Compile {
        /// Markup file to compile
        #[arg(value_name = "FILE")]
        source: PathBuf,

        /// Job id used for status tracking and the artifact name
        /// (default: the source file stem)
        #[arg(short, long)]
        job_id: Option<String>,

        /// Where to write the PDF (default: next to the source)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Seconds to wait for the compile to finish
        #[arg(short, long, default_value = "120")]
        wait_secs: u64,
    },

    /// Show the effective configuration
    ShowConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // Load configuration
    let config = if let Some(ref path) = cli.config {
        info!(?path, "loading configuration");
        Config::from_file(path).context("failed to load configuration")?
    } else {
        debug!("using default configuration");
        Config::default()
    };

    match cli.command {
        Commands::Init { output, force } => init_config(&output, force).await,
        Commands::Check => run_check(&config).await,
        Commands::Validate { source } => run_validate(&source).await,
        Commands::Compile {
            source,
            job_id,
            output,
            wait_secs,
        } => run_compile(config, &source, job_id, output, wait_secs).await,
        Commands::ShowConfig => {
            show_config(&config);
            Ok(())
        }
    }
}

async fn run_check(config: &Config) -> Result<()> {
    match galley::probe(&config.compiler_binary(), config.probe_timeout()).await {
        Ok(info) => {
            println!("Toolchain available: {}", info.banner);
            println!("Binary: {}", info.binary.display());
            Ok(())
        }
        Err(err) => {
            eprintln!("Toolchain unavailable: {err}");
            std::process::exit(1);
        }
    }
}

async fn run_validate(source: &Path) -> Result<()> {
    let markup = tokio::fs::read_to_string(source)
        .await
        .context("failed to read source file")?;

    match validate(&markup) {
        Ok(()) => {
            println!("Markup accepted");
            Ok(())
        }
        Err(err) => {
            eprintln!("Markup rejected: {err}");
            std::process::exit(1);
        }
    }
}

async fn run_compile(
    config: Config,
    source: &Path,
    job_id: Option<String>,
    output: Option<PathBuf>,
    wait_secs: u64,
) -> Result<()> {
    let markup = tokio::fs::read_to_string(source)
        .await
        .context("failed to read source file")?;

    let job_id = job_id.unwrap_or_else(|| {
        source
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_owned())
    });

    let pipeline =
        Pipeline::with_memory_store(config).context("failed to open the artifact store")?;

    let receipt = pipeline
        .submit(&job_id, markup)
        .await
        .context("submission rejected")?;
    info!(job_id = %receipt.job_id, banner = %receipt.toolchain.banner, "compile accepted");

    let record = pipeline
        .wait_for_completion(&job_id, Duration::from_secs(wait_secs))
        .await
        .context("compile did not finish in time")?;

    match record.status {
        JobStatus::Success => {
            let pdf = pipeline
                .retrieve(&job_id)
                .await
                .context("artifact missing after success")?;

            let target = output.unwrap_or_else(|| source.with_extension("pdf"));
            tokio::fs::write(&target, &pdf)
                .await
                .context("failed to write PDF")?;

            println!("PDF written to {} ({} bytes)", target.display(), pdf.len());
            Ok(())
        }
        _ => {
            eprintln!("Compilation failed");
            if let Some(log) = record.log {
                eprintln!("\nCompiler log:\n{log}");
            }
            std::process::exit(1);
        }
    }
}

fn show_config(config: &Config) {
    println!("Compiler binary: {}", config.compiler_binary().display());
    println!("Max passes: {}", config.max_passes);
    println!("Pass timeout: {}s", config.pass_timeout_secs);
    println!("Probe timeout: {}s", config.probe_timeout_secs);
    println!("Scratch root: {}", config.scratch_root().display());
    println!("Artifact dir: {}", config.artifact_dir.display());
}

async fn init_config(output: &PathBuf, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists at '{}'. Use --force to overwrite.",
            output.display()
        );
    }

    tokio::fs::write(output, EXAMPLE_CONFIG)
        .await
        .context("failed to write configuration file")?;

    println!("Created configuration file at '{}'", output.display());
    Ok(())
}
