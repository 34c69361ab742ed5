//! Flowref CLI - inspect variable scopes of workflow graph snapshots

mod commands;

use clap::{Parser, Subcommand};
use flowref::config::{default_config_path, load_config, FlowrefConfig};
use flowref::output::{emit_error, emit_success, OutputMode};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "flowref")]
#[command(version)]
#[command(about = "Variable-reference resolution for node-based workflow graphs")]
#[command(long_about = r#"
Flowref reads a workflow graph snapshot and answers, for any node:
  • which upstream nodes and variables it may reference
  • which nodes reference it
  • which of its references no longer resolve

Example usage:
  flowref scope --graph flow.json --node 7
  flowref refs --graph flow.json --node 3
  flowref check ./flows
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format (overrides the config file)
    #[arg(short, long, global = true, value_enum)]
    format: Option<OutputMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the variables a node may reference
    Scope {
        /// Graph snapshot (defaults to `graph` in the config)
        #[arg(short, long)]
        graph: Option<PathBuf>,

        /// Target node id
        #[arg(short, long)]
        node: String,

        /// Group variables per upstream node, as a reference picker shows them
        #[arg(long)]
        picker: bool,
    },

    /// Find the fields of other nodes that reference a node
    Refs {
        #[arg(short, long)]
        graph: Option<PathBuf>,

        /// Referenced node id
        #[arg(short, long)]
        node: String,
    },

    /// Report dangling references in a snapshot or a directory of snapshots
    Check {
        /// Snapshot file or directory (defaults to `graph` in the config)
        path: Option<PathBuf>,
    },

    /// Check tokens against the scope of a node
    Validate {
        #[arg(short, long)]
        graph: Option<PathBuf>,

        #[arg(short, long)]
        node: String,

        /// Tokens such as `3.result`
        #[arg(short, long, required = true, num_args = 1..)]
        token: Vec<String>,
    },

    /// Show statistics about a snapshot
    Stats {
        #[arg(short, long)]
        graph: Option<PathBuf>,
    },

    /// Watch snapshots and re-check them on every change
    Watch {
        /// Snapshot file or directory (defaults to `graph` in the config)
        path: Option<PathBuf>,

        /// Print this node's scope instead of a check report
        #[arg(short, long)]
        node: Option<String>,
    },

    /// Write a default config file
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    /// Show version information
    Version,
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Scope { .. } => "scope",
            Commands::Refs { .. } => "refs",
            Commands::Check { .. } => "check",
            Commands::Validate { .. } => "validate",
            Commands::Stats { .. } => "stats",
            Commands::Watch { .. } => "watch",
            Commands::Init { .. } => "init",
            Commands::Version => "version",
        }
    }
}

fn graph_path(explicit: Option<PathBuf>, config: &FlowrefConfig) -> anyhow::Result<PathBuf> {
    explicit
        .or_else(|| config.graph_path())
        .ok_or_else(|| anyhow::anyhow!("no graph given (pass --graph or set `graph` in the config)"))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let config = load_config(Some(&config_path))?.unwrap_or_default();
    let output_mode = cli.format.or(config.format).unwrap_or_default();
    let command = cli.command.name();

    match dispatch(cli.command, output_mode, &config, &config_path) {
        Ok(true) => Ok(()),
        Ok(false) => std::process::exit(1),
        Err(e) if !output_mode.is_human() => {
            emit_error(output_mode, command, &format!("{:#}", e))?;
            std::process::exit(1);
        }
        Err(e) => Err(e),
    }
}

/// Runs one command. `Ok(false)` means it completed but found problems.
fn dispatch(
    command: Commands,
    output_mode: OutputMode,
    config: &FlowrefConfig,
    config_path: &Path,
) -> anyhow::Result<bool> {
    match command {
        Commands::Scope { graph, node, picker } => {
            let path = graph_path(graph, config)?;
            commands::run_scope(output_mode, config, &path, &node, picker)?;
        }
        Commands::Refs { graph, node } => {
            let path = graph_path(graph, config)?;
            commands::run_refs(output_mode, &path, &node)?;
        }
        Commands::Check { path } => {
            let path = graph_path(path, config)?;
            return commands::run_check(output_mode, config, &path);
        }
        Commands::Validate { graph, node, token } => {
            let path = graph_path(graph, config)?;
            return commands::run_validate(output_mode, config, &path, &node, &token);
        }
        Commands::Stats { graph } => {
            let path = graph_path(graph, config)?;
            commands::run_stats(output_mode, &path)?;
        }
        Commands::Watch { path, node } => {
            let path = graph_path(path, config)?;
            commands::run_watch(output_mode, config, &path, node.as_deref())?;
        }
        Commands::Init { force } => {
            run_init(output_mode, config_path, force)?;
        }
        Commands::Version => {
            commands::run_version(output_mode)?;
        }
    }
    Ok(true)
}

fn run_init(output_mode: OutputMode, path: &Path, force: bool) -> anyhow::Result<()> {
    let config = FlowrefConfig {
        graph: Some("workflow.json".to_string()),
        format: Some(OutputMode::Human),
        ..Default::default()
    };
    flowref::config::write_config(path, &config, force)?;

    if output_mode.is_human() {
        flowref::ui::success(&format!("Wrote {}", path.display()));
    } else {
        emit_success(output_mode, "init", serde_json::json!({ "path": path.display().to_string() }))?;
    }
    Ok(())
}
