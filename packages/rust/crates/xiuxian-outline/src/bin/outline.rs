#![allow(missing_docs)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use xiuxian_outline::{
    DirectoryAccess, FilterOptions, GraphSession, IndexBuilder, JsonPageStore, LocalDirectory,
    OutlineConfig, PageContent, PageFlag, PageStore, RebuildOutcome, RenderMode,
    build_candidates, build_listing, render,
};

#[derive(Parser, Debug)]
#[command(
    name = "outline",
    about = "Outline graph CLI: resolve, render and index outline pages",
    arg_required_else_help = true
)]
struct Cli {
    /// Graph root directory (relative config paths resolve against it).
    #[arg(
        long,
        short = 'r',
        value_name = "DIR",
        default_value = ".",
        global = true
    )]
    root: PathBuf,

    /// Sibling journals directory, overriding `graph.journals_dir`.
    #[arg(long, value_name = "DIR", global = true)]
    journals: Option<PathBuf>,

    /// Graph identifier used as the store key prefix.
    #[arg(long, short = 'g', default_value = "default", global = true)]
    graph: String,

    /// Explicit outline config file (YAML).
    #[arg(long = "conf", short = 'c', value_name = "FILE", global = true)]
    config_file: Option<PathBuf>,

    /// Output format.
    #[arg(long, short = 'o', value_enum, default_value_t = OutputFormat::Json, global = true)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the file base names probed for a page name.
    Candidates {
        name: String,
        #[arg(long, default_value_t = false)]
        prefer_journal: bool,
    },
    /// Resolve a page name to its backing file.
    Resolve { name: String },
    /// Parse a page and render it.
    Render {
        name: String,
        #[arg(long, value_enum, default_value_t = ModeArg::Outline)]
        mode: ModeArg,
        /// Filter options file (YAML or JSON); overrides `filters` in the config.
        #[arg(long, value_name = "FILE")]
        filters: Option<PathBuf>,
    },
    /// Rebuild the page index of the graph into a JSON store.
    Index {
        #[arg(long, value_name = "FILE")]
        store: PathBuf,
    },
    /// List indexed pages from a JSON store.
    List {
        #[arg(long, value_name = "FILE")]
        store: PathBuf,
        #[arg(long, default_value_t = false, conflicts_with = "archived")]
        favorites: bool,
        #[arg(long, default_value_t = false)]
        archived: bool,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum ModeArg {
    Outline,
    Plain,
    Summary,
}

impl From<ModeArg> for RenderMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Outline => Self::Outline,
            ModeArg::Plain => Self::Plain,
            ModeArg::Summary => Self::Summary,
        }
    }
}

fn emit<T: Serialize>(value: &T, output: OutputFormat) -> Result<()> {
    let rendered = match output {
        OutputFormat::Json => serde_json::to_string(value),
        OutputFormat::Pretty => serde_json::to_string_pretty(value),
    }
    .context("failed to serialize CLI output as JSON")?;
    println!("{rendered}");
    Ok(())
}

fn load_config(cli: &Cli) -> Result<OutlineConfig> {
    let mut config = match &cli.config_file {
        Some(path) => OutlineConfig::load(path)
            .with_context(|| format!("failed to load outline config {}", path.display()))?,
        None => OutlineConfig::default(),
    }
    .with_env_overrides();
    if let Some(journals) = &cli.journals {
        config.graph.journals_dir = Some(journals.clone());
    }
    Ok(config)
}

fn load_filters(path: &Path) -> Result<FilterOptions> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read filter options {}", path.display()))?;
    if raw.trim().is_empty() {
        return Ok(FilterOptions::default());
    }
    serde_yaml::from_str(&raw)
        .with_context(|| format!("failed to parse filter options {}", path.display()))
}

fn content_state(content: &PageContent) -> &'static str {
    match content {
        PageContent::NotLoaded => "not_loaded",
        PageContent::NotFound => "not_found",
        PageContent::Empty => "empty",
        PageContent::Blocks(_) => "blocks",
    }
}

async fn execute(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let session = GraphSession::local(cli.graph.clone(), &cli.root, &config);

    match &cli.command {
        Command::Candidates {
            name,
            prefer_journal,
        } => {
            let mut options = config.resolver.candidate_options();
            options.prefer_journal |= *prefer_journal;
            emit(
                &json!({
                    "name": name,
                    "candidates": build_candidates(name, options),
                }),
                cli.output,
            )
        }
        Command::Resolve { name } => {
            let payload = match session.resolve_page(name).await {
                Some(file) => json!({
                    "name": name,
                    "found": true,
                    "path": session.access().describe(&file.dir, &file.file_name),
                    "picked_name": file.picked_name,
                    "size": file.info.size,
                    "last_modified": file.info.last_modified,
                }),
                None => json!({ "name": name, "found": false }),
            };
            emit(&payload, cli.output)
        }
        Command::Render {
            name,
            mode,
            filters,
        } => {
            let options = match filters {
                Some(path) => load_filters(path)?,
                None => config.filters.clone(),
            };
            let content = session.load_page(name).await;
            let mode = RenderMode::from(*mode);
            emit(
                &json!({
                    "name": name,
                    "mode": mode,
                    "state": content_state(&content),
                    "text": render(content.blocks(), &options, mode),
                }),
                cli.output,
            )
        }
        Command::Index { store } => {
            let store = Arc::new(
                JsonPageStore::open(store)
                    .with_context(|| format!("failed to open page store {}", store.display()))?,
            );
            let builder = IndexBuilder::new(Arc::clone(&store), config.index.clone())
                .with_excluded_dirs(config.graph.excluded_dirs.clone());
            let outcome = builder
                .rebuild_directory(&session, None)
                .await
                .with_context(|| format!("failed to index graph {}", cli.graph))?;
            store.flush().context("failed to persist page store")?;
            let stats = match outcome {
                RebuildOutcome::Completed(stats) => stats,
                RebuildOutcome::Superseded => anyhow::bail!("index rebuild was superseded"),
            };
            emit(
                &json!({
                    "graph": cli.graph,
                    "store": store.path(),
                    "stats": stats,
                }),
                cli.output,
            )
        }
        Command::List {
            store,
            favorites,
            archived,
        } => {
            let store = JsonPageStore::open(store)
                .with_context(|| format!("failed to open page store {}", store.display()))?;
            let records = if *favorites {
                store.list_flagged(&cli.graph, PageFlag::Favorite)?
            } else if *archived {
                store.list_flagged(&cli.graph, PageFlag::Archived)?
            } else {
                store.list_graph(&cli.graph)?
            };
            let listing = build_listing(records);
            emit(
                &json!({
                    "graph": cli.graph,
                    "pages": listing.pages,
                    "journals": listing.journals,
                }),
                cli.output,
            )
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG overrides; otherwise crate logs at info on stderr.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("xiuxian_outline=info,outline=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    execute(&cli).await
}
