//! Strata CLI - browse cloud resources as a filesystem tree.
//!
//! Provides commands for:
//! - Listing and walking the projected tree
//! - Reading entry contents and metadata
//! - Deleting objects, prefixes and buckets
//!
//! Providers are loaded from a fixture file describing containers, volumes
//! and buckets.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use strata_core::{OpContext, Timestamp};
use strata_fs::{resolve, Entry, EntryKind, Fixture, Namespace, Node};
use strata_store::{CacheConfig, ListingCache};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Strata filesystem browser.
#[derive(Parser)]
#[command(name = "strata")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Configuration file path
    #[arg(short, long, default_value = "~/.strata/config.toml")]
    config: PathBuf,

    /// Fixture describing the providers (overrides the config file)
    #[arg(short, long)]
    fixture: Option<PathBuf>,

    /// Cancel the command after this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List a directory
    Ls {
        /// Path to list
        #[arg(default_value = "/")]
        path: String,

        /// Show kind, size and modification time
        #[arg(short, long)]
        long: bool,
    },

    /// Show the attributes of an entry
    Stat {
        /// Path of the entry
        path: String,
    },

    /// Print the content of a file
    Cat {
        /// Path of the file
        path: String,
    },

    /// Print the metadata document of an entry
    Meta {
        /// Path of the entry
        path: String,
    },

    /// Delete an entry and everything below it
    Rm {
        /// Path of the entry
        path: String,
    },

    /// Walk a directory recursively
    Tree {
        /// Path to walk
        #[arg(default_value = "/")]
        path: String,

        /// Maximum depth
        #[arg(short, long, default_value = "8")]
        depth: usize,
    },
}

/// CLI configuration.
#[derive(Debug, Clone, Default)]
struct CliConfig {
    /// Listing cache settings
    cache: CacheConfig,
    /// Fixture file
    fixture: Option<PathBuf>,
}

/// Load configuration from TOML file.
fn load_config(path: &PathBuf) -> Result<CliConfig> {
    let path = expand_tilde(path);

    if !path.exists() {
        info!("No config file found at {:?}, using defaults", path);
        return Ok(CliConfig::default());
    }

    let content = std::fs::read_to_string(&path).context("Failed to read config file")?;
    parse_config(&content)
}

fn parse_config(content: &str) -> Result<CliConfig> {
    let toml: toml::Value = content.parse().context("Failed to parse config file")?;

    let mut config = CliConfig::default();

    // Parse [cache] section
    if let Some(cache) = toml.get("cache") {
        config.cache = cache
            .clone()
            .try_into()
            .context("Invalid [cache] section")?;
    }

    // Parse [fixture] section
    if let Some(fixture) = toml.get("fixture") {
        if let Some(path) = fixture.get("path").and_then(|v| v.as_str()) {
            config.fixture = Some(PathBuf::from(path));
        }
    }

    Ok(config)
}

/// Expand ~ to home directory.
fn expand_tilde(path: &PathBuf) -> PathBuf {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.clone()
}

/// Builds the namespace from the configured fixture.
fn build_root(config: &CliConfig) -> Result<Node> {
    let fixture = match &config.fixture {
        Some(path) => {
            let path = expand_tilde(path);
            info!("Loading fixture from {:?}", path);
            Fixture::load(&path).with_context(|| format!("Failed to load fixture {path:?}"))?
        }
        None => {
            warn!("No fixture configured, starting with empty providers");
            Fixture::default()
        }
    };

    let cache = Arc::new(ListingCache::new(config.cache.clone()));
    let (runtime, store) = fixture.into_providers();
    Ok(Namespace::new()
        .with_resources(Arc::new(runtime), cache)
        .with_store(Arc::new(store))
        .into_node())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set up logging")?;

    let mut config = load_config(&cli.config)?;
    if cli.fixture.is_some() {
        config.fixture = cli.fixture.clone();
    }
    let root = build_root(&config)?;

    let ctx = OpContext::new();
    let canceller = ctx.clone();
    let timeout = cli.timeout_ms.map(Duration::from_millis);
    tokio::spawn(async move {
        match timeout {
            Some(limit) => {
                tokio::select! {
                    _ = tokio::time::sleep(limit) => info!("Timeout reached, cancelling"),
                    _ = tokio::signal::ctrl_c() => info!("Interrupted, cancelling"),
                }
            }
            None => {
                let _ = tokio::signal::ctrl_c().await;
                info!("Interrupted, cancelling");
            }
        }
        canceller.cancel();
    });

    match cli.command {
        Commands::Ls { path, long } => cmd_ls(&root, &path, long, &ctx).await,
        Commands::Stat { path } => cmd_stat(&root, &path, &ctx).await,
        Commands::Cat { path } => cmd_cat(&root, &path, &ctx).await,
        Commands::Meta { path } => cmd_meta(&root, &path, &ctx).await,
        Commands::Rm { path } => cmd_rm(&root, &path, &ctx).await,
        Commands::Tree { path, depth } => cmd_tree(&root, &path, depth, &ctx).await,
    }
}

/// Resolves `path`, attaching the path to errors.
async fn lookup(root: &Node, path: &str, ctx: &OpContext) -> Result<Node> {
    resolve(root, path, ctx)
        .await
        .with_context(|| format!("{path}: cannot resolve"))
}

/// Lists `dir` sorted by name.
async fn sorted_children(dir: &Node, ctx: &OpContext) -> Result<Vec<Node>> {
    let mut children = dir
        .list(ctx)
        .await
        .with_context(|| format!("{}: cannot list", display_name(dir)))?;
    children.sort_by(|a, b| a.name().cmp(b.name()));
    Ok(children)
}

fn display_name(node: &Node) -> &str {
    match node.name() {
        "" => "/",
        name => name,
    }
}

fn format_time(time: Option<Timestamp>) -> String {
    time.map(|t| t.to_string()).unwrap_or_else(|| "-".to_string())
}

async fn cmd_ls(root: &Node, path: &str, long: bool, ctx: &OpContext) -> Result<()> {
    let dir = lookup(root, path, ctx).await?;
    let children = sorted_children(&dir, ctx).await?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for child in children {
        if !long {
            writeln!(out, "{}", child.name())?;
            continue;
        }
        let attrs = child.attributes(ctx).await?;
        let kind = match child.kind() {
            EntryKind::Dir => 'd',
            EntryKind::File => '-',
        };
        let size = attrs
            .size
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        writeln!(
            out,
            "{kind} {size:>10} {:>24} {}",
            format_time(attrs.mtime),
            child.name()
        )?;
    }
    Ok(())
}

async fn cmd_stat(root: &Node, path: &str, ctx: &OpContext) -> Result<()> {
    let node = lookup(root, path, ctx).await?;
    let attrs = node.attributes(ctx).await?;
    let caps = node.capabilities();

    println!("Name:         {}", display_name(&node));
    println!("Kind:         {:?}", node.kind());
    println!(
        "Capabilities: list={} read={} delete={}",
        caps.list, caps.read, caps.delete
    );
    if let Some(size) = attrs.size {
        println!("Size:         {size}");
    }
    println!("Modified:     {}", format_time(attrs.mtime));
    println!("Changed:      {}", format_time(attrs.ctime));
    println!("Created:      {}", format_time(attrs.crtime));
    if let Some(description) = node.description() {
        println!();
        print!("{description}");
    }
    Ok(())
}

async fn cmd_cat(root: &Node, path: &str, ctx: &OpContext) -> Result<()> {
    let node = lookup(root, path, ctx).await?;
    let content = node
        .read(ctx)
        .await
        .with_context(|| format!("{path}: cannot read"))?;
    std::io::stdout().write_all(&content)?;
    Ok(())
}

async fn cmd_meta(root: &Node, path: &str, ctx: &OpContext) -> Result<()> {
    let node = lookup(root, path, ctx).await?;
    let document = node.metadata(ctx).await?;
    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(())
}

async fn cmd_rm(root: &Node, path: &str, ctx: &OpContext) -> Result<()> {
    let node = lookup(root, path, ctx).await?;
    if !node.capabilities().delete {
        bail!("{path}: cannot be deleted");
    }

    match node.delete(ctx).await {
        Ok(true) => {
            info!("Deleted {}", path);
            Ok(())
        }
        Ok(false) => bail!("{path}: still present after delete"),
        Err(err) => {
            warn!("Delete of {} failed, re-run to finish: {}", path, err);
            Err(err).with_context(|| format!("{path}: delete failed"))
        }
    }
}

async fn cmd_tree(root: &Node, path: &str, depth: usize, ctx: &OpContext) -> Result<()> {
    let start = lookup(root, path, ctx).await?;
    println!("{}", display_name(&start));

    let mut pending = vec![(start, 0usize)];
    while let Some((dir, level)) = pending.pop() {
        if level >= depth || !dir.capabilities().list {
            continue;
        }
        let children = sorted_children(&dir, ctx).await?;
        // Depth-first output: print now, queue directories in reverse.
        let mut dirs = Vec::new();
        for child in children {
            let indent = "  ".repeat(level + 1);
            match child.kind() {
                EntryKind::Dir => {
                    println!("{indent}{}/", child.name());
                    dirs.push((child, level + 1));
                }
                EntryKind::File => println!("{indent}{}", child.name()),
            }
        }
        pending.extend(dirs.into_iter().rev());
    }
    Ok(())
}
