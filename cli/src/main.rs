use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use dvreg_kernel::publish::{preflight, publish, ArtifactKind, PublishCheck, PublishRequest};
use dvreg_kernel::pull::{pull_artifact, pull_file};
use dvreg_kernel::registry::VersionEntry;
use dvreg_kernel::switch::{switch_version, FetchStatus};
use dvreg_kernel::workspace::{Workspace, WorkspaceConfig};

/// Versioned releases of DVC-tracked data and models
#[derive(Parser, Debug)]
#[command(name = "dvreg")]
#[command(about = "Version registry for DVC-tracked data and models", long_about = None)]
struct Cli {
    /// Workspace root (holds the registry and descriptors)
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Path to workspace config JSON
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log delegated commands and registry I/O
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Add and push a file/folder
    AddData(AddArgs),

    /// Add and push an entire model
    AddModel(AddArgs),

    /// Switch to a specific version
    Switch {
        /// Name of the artifact
        name: String,

        /// Version to switch to
        version: String,

        /// Pull data after switching
        #[arg(long)]
        pull: bool,
    },

    /// Pull a specific file or folder from the remote
    PullFile {
        /// Path of the file or folder inside the artifact
        file_path: PathBuf,

        /// Artifact the file belongs to
        model: String,
    },

    /// Pull a specific artifact from the remote
    PullModel {
        /// Artifact that should be pulled
        model: String,
    },

    /// Show the recorded versions of an artifact
    History {
        name: String,

        /// Order by version string instead of publish order
        #[arg(long)]
        sorted: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show the most recently published version of an artifact
    Latest {
        name: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

#[derive(clap::Args, Debug)]
struct AddArgs {
    /// Path to the file or folder
    path: PathBuf,

    /// Version identifier (e.g. v1.0.0)
    version: String,

    /// Artifact name (used for the descriptor file)
    model: String,

    /// Description of the change
    description: String,

    /// Publish an older version without asking
    #[arg(long, short = 'y')]
    yes: bool,
}

#[derive(Debug, Serialize)]
struct HistoryOutput<'a> {
    name: &'a str,
    versions: Vec<&'a VersionEntry>,
}

#[derive(Debug, Serialize)]
struct LatestOutput<'a> {
    name: &'a str,
    version: Option<&'a str>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // ----------------------------
    // Load workspace config
    // ----------------------------
    let config = if let Some(path) = &cli.config {
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str::<WorkspaceConfig>(&data)
            .with_context(|| format!("parsing config {}", path.display()))?
    } else {
        WorkspaceConfig::default_config()
    };
    debug!(?config, root = %cli.root.display(), "workspace config");

    let mut workspace = Workspace::open(cli.root, config);

    // ----------------------------
    // Dispatch
    // ----------------------------
    match cli.command {
        Commands::AddData(args) => run_add(&mut workspace, args, ArtifactKind::Data),
        Commands::AddModel(args) => run_add(&mut workspace, args, ArtifactKind::Model),
        Commands::Switch {
            name,
            version,
            pull,
        } => run_switch(&workspace, &name, &version, pull),
        Commands::PullFile { file_path, model } => {
            let mut tracker = workspace.content_tracker();
            pull_file(&mut tracker, &model, &file_path)?;
            println!("Pulled {} successfully.", file_path.display());
            Ok(())
        }
        Commands::PullModel { model } => {
            let mut tracker = workspace.content_tracker();
            pull_artifact(&mut tracker, &model)?;
            println!("Pulled {model} successfully.");
            Ok(())
        }
        Commands::History { name, sorted, json } => run_history(&workspace, &name, sorted, json),
        Commands::Latest { name, json } => {
            let registry = workspace.load_registry()?;
            let version = registry.latest_version(&name);
            if json {
                let output = LatestOutput {
                    name: &name,
                    version,
                };
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                match version {
                    Some(v) => println!("{v}"),
                    None => bail!("no entries found for `{name}` in registry"),
                }
            }
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn run_add(workspace: &mut Workspace, args: AddArgs, kind: ArtifactKind) -> Result<()> {
    let request = PublishRequest {
        path: args.path,
        version: args.version,
        name: args.model,
        description: args.description,
        kind,
    };

    let confirmed = match preflight(workspace, &request)? {
        PublishCheck::Clear => false,
        PublishCheck::Regression { latest } => {
            println!("Latest version of {} is {latest}", request.name);
            let proceed = args.yes
                || confirm(
                    "You are adding changes to an older version. This may disrupt the model. Proceed? (y/n): ",
                )?;
            if !proceed {
                bail!("Operation cancelled by user.");
            }
            true
        }
    };

    let mut tracker = workspace.content_tracker();
    let mut recorder = workspace.provenance_recorder();
    let outcome = publish(workspace, &mut tracker, &mut recorder, &request, confirmed)?;

    println!(
        "{} '{}' added with version {}.",
        outcome.kind.label(),
        outcome.name,
        outcome.version
    );
    Ok(())
}

fn run_switch(workspace: &Workspace, name: &str, version: &str, pull: bool) -> Result<()> {
    let mut tracker = workspace.content_tracker();
    let outcome = switch_version(workspace, &mut tracker, name, version, pull)?;

    println!(
        "Updated {} to version {} with MD5 {}.",
        outcome.descriptor.display(),
        outcome.version,
        outcome.checksum
    );

    match outcome.fetch {
        FetchStatus::Skipped => {}
        FetchStatus::Fetched => println!("Pulled data for {name} version {}.", outcome.version),
        FetchStatus::Failed(e) => {
            eprintln!("warning: {e}");
            eprintln!("The descriptor was updated; run `dvreg pull-model {name}` to retry.");
        }
    }
    Ok(())
}

fn run_history(workspace: &Workspace, name: &str, sorted: bool, json: bool) -> Result<()> {
    let registry = workspace.load_registry()?;
    let Some(history) = registry.history(name) else {
        bail!("no entries found for `{name}` in registry");
    };

    let versions: Vec<&VersionEntry> = if sorted {
        registry.sorted_versions(name)
    } else {
        history.entries().iter().collect()
    };

    if json {
        let output = HistoryOutput { name, versions };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        for entry in versions {
            println!("{}\t{}\t{}", entry.version, entry.checksum, entry.description);
        }
    }
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt}");
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}
