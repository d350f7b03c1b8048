use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use furnix::{Engine, EngineConfig, IndexManager, IndexPaths, Vector};

/// Furniture catalog retrieval engine
#[derive(Parser, Debug)]
#[command(name = "furnix")]
#[command(about = "Boolean + embedding retrieval over a furniture catalog", long_about = None)]
struct Args {
    /// Directory holding the built index files
    #[arg(short, long, default_value = "./index")]
    index_dir: PathBuf,

    /// JSON file with engine settings (weights, thresholds, scene sizes)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build and save every index from a catalog file
    Build {
        /// Catalog JSON (list of records or object keyed by item id)
        #[arg(long)]
        data_file: PathBuf,

        /// Optional JSON object mapping item ids to image ids
        #[arg(long)]
        image_mapping: Option<PathBuf>,
    },
    /// Evaluate a boolean query and print the matching ids
    Boolean { query: String },
    /// Boolean filter, then rank the matches by distance to a vector
    Search {
        query: String,

        /// Comma-separated ranking vector, e.g. "0.1,0.4,-0.2"
        #[arg(long)]
        vector: String,

        #[arg(short, default_value_t = 10)]
        k: usize,
    },
    /// Items similar to an item, adjusted by preferences
    Similar {
        item_id: String,

        #[arg(long, value_delimiter = ',')]
        liked: Vec<String>,

        #[arg(long, value_delimiter = ',')]
        disliked: Vec<String>,

        /// Rank against these scene items instead of the item itself
        #[arg(long, value_delimiter = ',')]
        scene: Vec<String>,
    },
    /// Propose scenes that go with an item
    GoesWith {
        item_id: String,

        #[arg(long, value_delimiter = ',')]
        scene: Vec<String>,

        #[arg(long, value_delimiter = ',')]
        liked: Vec<String>,

        #[arg(long, value_delimiter = ',')]
        disliked: Vec<String>,

        /// Seed for reproducible sampling
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Print index statistics
    Stats,
}

#[derive(Serialize)]
struct Stats {
    items: usize,
    tokens: usize,
    dim: usize,
    image_items: usize,
    image_dim: usize,
}

fn parse_vector(text: &str) -> anyhow::Result<Vector> {
    let values = text
        .split(',')
        .map(|v| v.trim().parse::<f32>())
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("invalid vector {:?}", text))?;
    if values.is_empty() {
        bail!("empty vector");
    }
    Ok(Vector::new(values))
}

fn load_config(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config: EngineConfig = serde_json::from_str(&text)?;
    config.validate()?;
    Ok(config)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // logs go to stderr so stdout stays machine-readable
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config(args.config.as_deref())?;
    let index_dir = args.index_dir.clone();
    let open_engine = || -> anyhow::Result<Engine> {
        let manager = IndexManager::open(IndexPaths::in_dir(&index_dir))
            .with_context(|| format!("opening index in {}", index_dir.display()))?;
        Ok(Engine::new(manager.snapshot(), config.clone())?)
    };

    match args.command {
        Command::Build {
            data_file,
            image_mapping,
        } => {
            info!("Building index from {:?}", data_file);
            let manager = IndexManager::build_from_catalog(
                IndexPaths::in_dir(&index_dir),
                &data_file,
                image_mapping.as_deref(),
            )?;
            let snapshot = manager.snapshot();
            info!(
                "Index built: {} items, {} tokens",
                snapshot.catalog.len(),
                snapshot.terms.len()
            );
        }
        Command::Boolean { query } => {
            let engine = open_engine()?;
            let mut ids: Vec<String> = engine
                .evaluate_boolean(&query)
                .into_iter()
                .map(|id| id.to_string())
                .collect();
            ids.sort();
            print_json(&ids)?;
        }
        Command::Search { query, vector, k } => {
            let engine = open_engine()?;
            let vector = parse_vector(&vector)?;
            print_json(&engine.retrieve(&query, &vector, k)?)?;
        }
        Command::Similar {
            item_id,
            liked,
            disliked,
            scene,
        } => {
            let engine = open_engine()?;
            let results = if scene.is_empty() {
                engine.get_similar_items(&item_id, &liked, &disliked)?
            } else {
                engine.get_similar_items_with_scene(&item_id, &liked, &disliked, &scene)?
            };
            print_json(&results)?;
        }
        Command::GoesWith {
            item_id,
            scene,
            liked,
            disliked,
            seed,
        } => {
            let engine = open_engine()?;
            let scenes = match seed {
                Some(seed) => engine.goes_with_it_with_rng(
                    &item_id,
                    &liked,
                    &disliked,
                    &scene,
                    &mut StdRng::seed_from_u64(seed),
                )?,
                None => engine.goes_with_it(&item_id, &liked, &disliked, &scene)?,
            };
            print_json(&scenes)?;
        }
        Command::Stats => {
            let engine = open_engine()?;
            let indexes = engine.indexes();
            print_json(&Stats {
                items: indexes.catalog.len(),
                tokens: indexes.terms.len(),
                dim: indexes.vectors.dim(),
                image_items: indexes.image_vectors.as_ref().map_or(0, |v| v.len()),
                image_dim: indexes.image_vectors.as_ref().map_or(0, |v| v.dim()),
            })?;
        }
    }

    Ok(())
}
