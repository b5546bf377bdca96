//! ctxsearch command-line front end.
//!
//! ```bash
//! ctxsearch semantic "feline pets" -n 5
//! ctxsearch hybrid "stock market" --category finance --semantic-weight 0.5
//! ctxsearch tags finance crypto
//! ctxsearch --no-reset stats
//! ```
//!
//! Unless `startup.reset_on_start` is false (or `--no-reset` is given), each
//! start drops the index, recreates it and loads the sample corpus before
//! running the command.

mod output;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ctxsearch_core::config::{expand_path, Config, Settings};
use ctxsearch_core::corpus::{load_corpus, sample_corpus};
use ctxsearch_core::types::{FusionWeights, HybridQuery, NewDocument, SemanticQuery, TagQuery};
use ctxsearch_engine::SearchEngine;

use crate::output::{format_human, format_stats, to_json, SearchResponse};

#[derive(Parser)]
#[command(name = "ctxsearch", version, about = "Semantic, hybrid and tag search over a local document index")]
struct Cli {
    /// Output JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Keep the existing index instead of resetting it at startup
    #[arg(long, global = true)]
    no_reset: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Drop the index, recreate it and load the sample corpus
    Reset,
    /// Nearest-neighbour search on content embeddings
    Semantic {
        query: String,
        #[arg(short = 'n', long)]
        size: Option<usize>,
        #[arg(long)]
        category: Option<String>,
    },
    /// Weighted sum of vector similarity and fuzzy keyword score
    Hybrid {
        query: String,
        #[arg(short = 'n', long)]
        size: Option<usize>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        semantic_weight: Option<f32>,
        #[arg(long)]
        keyword_weight: Option<f32>,
    },
    /// Documents carrying any of the given tags
    Tags {
        #[arg(required = true)]
        tags: Vec<String>,
        #[arg(short = 'n', long)]
        size: Option<usize>,
    },
    /// Index statistics
    Stats,
    /// Index or replace one document
    Add {
        #[arg(long)]
        id: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Bulk-index a JSON array of documents
    Load { path: PathBuf },
    /// Show one document
    Get { id: String },
    /// Delete one document
    Delete { id: String },
    /// Report whether the index is open
    Health,
}

fn init_logging(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Drop, recreate and seed the index. Any failure aborts startup.
async fn reset_index(engine: &SearchEngine) -> Result<()> {
    let docs = match &engine.settings().startup.sample_corpus {
        Some(path) => load_corpus(&expand_path(path))?,
        None => sample_corpus()?,
    };
    engine.reset(docs).await?;
    Ok(())
}

fn print_search(json: bool, resp: &SearchResponse) {
    if json {
        println!("{}", to_json(resp));
    } else {
        print!("{}", format_human(resp));
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {e}");
        e
    })?;
    let settings = config.settings()?;
    init_logging(&settings);

    let reset = (settings.startup.reset_on_start && !cli.no_reset) || matches!(cli.command, Command::Reset);
    let engine = if reset {
        // the old index is about to be dropped, so it is never opened
        let engine = SearchEngine::load(settings).context("starting search engine")?;
        reset_index(&engine).await.context("startup reset failed")?;
        engine
    } else {
        let engine = SearchEngine::from_settings(settings).await.context("starting search engine")?;
        engine.create_index().await?;
        engine
    };

    let search = engine.settings().search.clone();
    match cli.command {
        Command::Reset => println!("Index '{}' reset", engine.index_name()),
        Command::Semantic { query, size, category } => {
            let start = Instant::now();
            let q = SemanticQuery { text: query.clone(), size: size.unwrap_or(search.default_size), category };
            let results = engine.semantic_search(q).await?;
            print_search(cli.json, &SearchResponse::new(query, "semantic", results, start.elapsed()));
        }
        Command::Hybrid { query, size, category, semantic_weight, keyword_weight } => {
            let start = Instant::now();
            let weights = FusionWeights {
                semantic: semantic_weight.unwrap_or(search.semantic_weight),
                keyword: keyword_weight.unwrap_or(search.keyword_weight),
            };
            let q = HybridQuery { text: query.clone(), size: size.unwrap_or(search.default_size), category, weights };
            let results = engine.hybrid_search(q).await?;
            print_search(cli.json, &SearchResponse::new(query, "hybrid", results, start.elapsed()));
        }
        Command::Tags { tags, size } => {
            let start = Instant::now();
            let label = tags.join(", ");
            let results = engine.search_by_tags(TagQuery { tags, size: size.unwrap_or(search.default_size) }).await?;
            print_search(cli.json, &SearchResponse::new(label, "tag", results, start.elapsed()));
        }
        Command::Stats => {
            let stats = engine.get_statistics().await?;
            if cli.json {
                println!("{}", to_json(&stats));
            } else {
                println!("{}", format_stats(&stats));
            }
        }
        Command::Add { id, title, content, category, tags } => {
            let mut doc = NewDocument::new(id.clone(), title, content).with_tags(tags);
            if let Some(c) = category {
                doc = doc.with_category(c);
            }
            engine.index_document(doc).await?;
            println!("Indexed document '{id}'");
        }
        Command::Load { path } => {
            let docs = load_corpus(&path)?;
            let report = engine.bulk_index_documents(docs).await?;
            if cli.json {
                println!("{}", to_json(&report));
            } else {
                println!("Indexed {} document(s), {} failed", report.indexed.len(), report.failed.len());
                for f in &report.failed {
                    println!("  {}: {}", f.id, f.reason);
                }
            }
        }
        Command::Get { id } => {
            let doc = engine.get_document(&id).await?;
            println!("{}", to_json(&doc));
        }
        Command::Delete { id } => {
            engine.delete_document(&id).await?;
            println!("Deleted document '{id}'");
        }
        Command::Health => {
            let health = engine.health().await;
            if cli.json {
                println!("{}", to_json(&health));
            } else {
                let status = if health.index_open { "ok" } else { "index not open" };
                println!("{}: {status} ({} documents)", health.index_name, health.document_count.unwrap_or(0));
            }
        }
    }
    Ok(())
}
