mod cache;
mod provision;
mod read;
mod scan;

use clap::{Parser, Subcommand};
use manscope_core::config::ProvisionConfig;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "manscope",
    version,
    about = "Turns the man pages of every command on PATH into readable resources",
    long_about = "manscope scans the directories on PATH for executables, extracts their man pages \
                  as plain text, keeps them in a local store and serves them to LLM agents over MCP."
)]
pub struct Cli {
    /// Path to a JSON config file (defaults to ~/.manscope/config.json)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory holding extracted man pages (overrides config and environment)
    #[arg(long, global = true, value_name = "DIR")]
    pub store_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the commands found on PATH, grouped by directory
    Scan {
        /// Print the full index as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check whether a command exists on PATH
    Available {
        #[arg(value_name = "COMMAND")]
        command: String,
    },
    /// Extract and store the man pages of the given commands
    Provision {
        #[arg(value_name = "COMMAND", required = true)]
        commands: Vec<String>,
    },
    /// Extract and store the man page of every command on PATH
    #[command(
        long_about = "Rescans PATH and provisions every command found, reusing pages that are \
                            already stored. Press Ctrl-C to stop dispatching new commands."
    )]
    ProvisionAll {
        /// Maximum number of concurrent extractions
        #[arg(long)]
        concurrency: Option<usize>,
        /// Per-command extraction timeout in seconds (0 disables it)
        #[arg(long, value_name = "SECONDS")]
        timeout: Option<u64>,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print a stored man page, or the command listing for doc://all-commands
    Read {
        /// Command name or resource URI
        #[arg(value_name = "COMMAND_OR_URI")]
        identifier: String,
    },
    /// Inspect or clear the man page store
    Cache {
        #[command(subcommand)]
        command: cache::CacheCommands,
    },
    /// Start the Model Context Protocol (MCP) server on stdio
    Mcp,
}

fn resolve_config(cli: &Cli) -> Result<ProvisionConfig, Box<dyn std::error::Error>> {
    let mut config = manscope_runtime::load_config(cli.config.as_deref())?;
    if let Some(dir) = &cli.store_dir {
        config.store_dir = dir.clone();
    }
    Ok(config)
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // stdout carries the protocol in MCP mode.
    let (component, to_stderr) = match &cli.command {
        Commands::Mcp => ("mcp", false),
        _ => ("cli", true),
    };
    let _guard = manscope_runtime::init_logging(component, to_stderr);

    let mut config = resolve_config(&cli)?;
    if let Commands::ProvisionAll {
        timeout: Some(secs),
        ..
    } = &cli.command
    {
        config.extract_timeout_secs = *secs;
    }
    let orchestrator = manscope_runtime::build_default_orchestrator(config);

    let rt = tokio::runtime::Runtime::new()?;

    match cli.command {
        Commands::Scan { json } => rt.block_on(scan::run(orchestrator, json)),
        Commands::Available { command } => rt.block_on(scan::available(orchestrator, command)),
        Commands::Provision { commands } => rt.block_on(provision::run(orchestrator, commands)),
        Commands::ProvisionAll {
            concurrency, json, ..
        } => rt.block_on(provision::run_all(orchestrator, concurrency, json)),
        Commands::Read { identifier } => rt.block_on(read::run(orchestrator, identifier)),
        Commands::Cache { command } => cache::run(orchestrator, command),
        Commands::Mcp => {
            rt.block_on(manscope_mcp::stdio::run_stdio_server(orchestrator))?;
            Ok(())
        }
    }
}
