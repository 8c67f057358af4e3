//! content-tiers: inspect and operate the tiered media pipeline
//!
//! Resolves entities against the configured tiers and exposes the operator
//! actions on the local cache (show, clear, clear-all, remove, purge).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tracing::info;

use content_tiers::{
    normalize, BackfillController, BackfillOutcome, Config, ContentEditor, HttpRemote,
    HttpRemoteConfig, LocalCache, MediaTier, OfflineRemote, PayloadOptimizer, RemoteStore,
    RemoteTier, Resolver, Rotation, StaticCatalog,
};

#[derive(Parser)]
#[command(name = "content-tiers")]
#[command(about = "Tiered content and media resolution for portal pages")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "content-tiers.toml")]
    config: String,

    /// Local cache directory (overrides config file)
    #[arg(short, long, env = "CONTENT_TIERS_DATA_DIR")]
    data_dir: Option<String>,

    /// Remote store base URL (overrides config file)
    #[arg(long, env = "CONTENT_TIERS_REMOTE_URL")]
    remote_url: Option<String>,

    /// Remote store API key
    #[arg(long, env = "CONTENT_TIERS_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Fallback catalog file replacing the bundled one
    #[arg(long, env = "CONTENT_TIERS_CATALOG")]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve an entity's media through all tiers
    Resolve {
        entity: String,
        /// Write a self-contained remote result into the local cache
        #[arg(long)]
        backfill: bool,
    },
    /// Resolve an entity and print the carousel order as it rotates
    Preview {
        entity: String,
        /// Number of rotation steps to show
        #[arg(long, default_value_t = 3)]
        cycles: usize,
    },
    /// Print the local cache entry for an entity
    Show { entity: String },
    /// List entities with a local cache entry
    Entities,
    /// Drop an entity's local cache entry
    Clear { entity: String },
    /// Drop every local cache entry
    ClearAll,
    /// Remove one local cache reference by position
    Remove { entity: String, index: usize },
    /// Remove every indirection from the local cache
    PurgeIndirections,
    /// Normalize a page document from a JSON file
    Normalize { file: PathBuf },
    /// Load a page document from the remote store, normalized
    Load { page: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("content_tiers=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        Command::Resolve { entity, backfill } => {
            let resolver = build_resolver(&config)?;
            let (resolution, outcome) = if backfill {
                let (resolution, outcome) = resolver.resolve_and_backfill(&entity).await;
                let outcome = outcome?;
                if let (BackfillOutcome::Replaced(_), Some(local)) = (&outcome, resolver.local()) {
                    local.flush()?;
                }
                (resolution, Some(outcome))
            } else {
                (resolver.resolve(&entity).await, None)
            };
            print_json(&json!({
                "entity": entity,
                "tier": resolution.tier,
                "provenance": resolution.provenance(),
                "mayPropagate": resolution.may_propagate(),
                "backfill": outcome.map(|o| format!("{:?}", o)),
                "media": resolution.media,
            }))?;
        }
        Command::Preview { entity, cycles } => {
            let resolution = build_resolver(&config)?.resolve(&entity).await;
            let sources = resolution.media.sources();
            println!("{} ({:?}, from {})", entity, resolution.provenance(), resolution.tier);

            let mut rotation = Rotation::from_config(sources.len(), &config.rotation);
            if let Some(first) = sources.first() {
                println!("[{}] {}", rotation.current(), first);
            }
            if rotation.is_rotating() {
                for _ in 0..cycles {
                    let index = rotation.tick().await;
                    println!("[{}] {}", index, sources[index]);
                }
            }
        }
        Command::Show { entity } => {
            let media = open_local(&config)?.try_get(&entity)?;
            print_json(&json!({ "entity": entity, "media": media }))?;
        }
        Command::Entities => {
            let entities = open_local(&config)?.entities()?;
            print_json(&json!(entities))?;
        }
        Command::Clear { entity } => {
            let controller = build_controller(&config)?;
            controller.clear(&entity)?;
            controller.local().flush()?;
            println!("Cleared {}", entity);
        }
        Command::ClearAll => {
            let controller = build_controller(&config)?;
            let cleared = controller.clear_all()?;
            controller.local().flush()?;
            println!("Cleared {} entities", cleared);
        }
        Command::Remove { entity, index } => {
            let controller = build_controller(&config)?;
            let removed = controller.remove_at(&entity, index)?;
            controller.local().flush()?;
            println!("Removed {} from {}", removed.source, entity);
        }
        Command::PurgeIndirections => {
            let controller = build_controller(&config)?;
            let report = controller.purge_indirections()?;
            controller.local().flush()?;
            print_json(&json!(report))?;
        }
        Command::Normalize { file } => {
            let content = std::fs::read_to_string(&file)?;
            let raw: Value = serde_json::from_str(&content)?;
            let record = normalize(&raw, &config.languages);
            print_json(&record.to_document()?)?;
        }
        Command::Load { page } => {
            let editor = ContentEditor::new(build_remote(&config)?, config.languages.clone())
                .with_updated_by(config.editor.updated_by.clone());
            let record = editor.load(&page).await?;
            print_json(&record.to_document()?)?;
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = if Path::new(&cli.config).exists() {
        Config::load(&cli.config)?
    } else {
        info!("Config file not found, using defaults");
        Config::default()
    };

    // Apply CLI overrides
    if let Some(ref data_dir) = cli.data_dir {
        config.local.path = PathBuf::from(data_dir);
    }
    if let Some(ref url) = cli.remote_url {
        config.remote.base_url = Some(url.clone());
    }
    if let Some(ref key) = cli.api_key {
        config.remote.api_key = Some(key.clone());
    }
    if let Some(ref catalog) = cli.catalog {
        config.fallback.catalog_path = Some(catalog.clone());
    }

    Ok(config)
}

fn open_local(config: &Config) -> anyhow::Result<LocalCache> {
    std::fs::create_dir_all(&config.local.path)?;
    Ok(LocalCache::open(config.local_db_path())?)
}

fn build_remote(config: &Config) -> anyhow::Result<Arc<dyn RemoteStore>> {
    match config.remote.base_url {
        Some(ref base_url) => {
            info!(url = %base_url, "Using remote store");
            Ok(Arc::new(HttpRemote::new(HttpRemoteConfig {
                base_url: base_url.clone(),
                api_key: config.remote.api_key.clone(),
                timeout_secs: config.remote.timeout_secs,
            })?))
        }
        None => {
            info!("No remote store configured, running offline");
            Ok(Arc::new(OfflineRemote))
        }
    }
}

fn build_resolver(config: &Config) -> anyhow::Result<Resolver> {
    let catalog = match config.fallback.catalog_path {
        Some(ref path) => StaticCatalog::load(path)?,
        None => StaticCatalog::bundled()?,
    };
    let remote: Arc<dyn MediaTier> = Arc::new(RemoteTier::new(build_remote(config)?));
    Ok(Resolver::standard(
        Arc::new(open_local(config)?),
        remote,
        Arc::new(catalog),
    )
    .with_optimizer(PayloadOptimizer::from_config(&config.optimize)))
}

fn build_controller(config: &Config) -> anyhow::Result<BackfillController> {
    Ok(BackfillController::new(Arc::new(open_local(config)?))
        .with_optimizer(PayloadOptimizer::from_config(&config.optimize)))
}

fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
