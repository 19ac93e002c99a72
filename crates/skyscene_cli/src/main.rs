//! Command-line driver for the scene controller.
//!
//! # Responsibility
//! - Build stores, cache and controller from a config file and flags.
//! - Run one command after the startup load and print the resulting scene.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use skyscene_core::db::open_db;
use skyscene_core::{
    init_from_config, Category, HttpCategoryStore, LoadOutcome, MutationReport, SceneConfig,
    SceneController, SceneSnapshot, SceneSync, SqliteSceneCache,
};

#[derive(Parser, Debug)]
#[command(name = "skyscene", version)]
struct Cli {
    /// JSON config file; built-in defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// SQLite cache file, overriding `cache.db_path`.
    #[arg(long)]
    cache_db: Option<PathBuf>,

    /// Directory for rolling log files, overriding `log.dir`.
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Log level: trace, debug, info, warn or error.
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load the scene and print it.
    Show,
    /// Add random elements of one kind.
    Add {
        #[arg(value_enum)]
        kind: KindChoice,

        /// Number of elements to add.
        #[arg(long, default_value_t = 1)]
        count: usize,
    },
    /// Remove every element locally and remotely.
    Clear,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KindChoice {
    Bird,
    Cloud,
}

impl From<KindChoice> for Category {
    fn from(kind: KindChoice) -> Self {
        match kind {
            KindChoice::Bird => Category::Bird,
            KindChoice::Cloud => Category::Cloud,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    if init_from_config(&config.log).map_err(anyhow::Error::msg)? {
        info!("event=cli_start module=cli status=ok");
    }

    let controller = build_controller(&config)?;
    let outcome = controller.load().await.context("load scene")?;
    print_load(&outcome);

    match cli.cmd {
        Command::Show => {}
        Command::Add { kind, count } => {
            for _ in 0..count {
                print_mutation("add", &controller.add(kind.into()).await);
            }
        }
        Command::Clear => print_mutation("clear", &controller.clear().await),
    }

    print_snapshot(&controller.snapshot());
    Ok(())
}

fn resolve_config(cli: &Cli) -> anyhow::Result<SceneConfig> {
    let mut config = match cli.config.as_deref() {
        Some(path) => SceneConfig::from_json_file(path)?,
        None => SceneConfig::default(),
    };
    if let Some(path) = cli.cache_db.clone() {
        config.cache.db_path = path;
    }
    if let Some(dir) = cli.log_dir.as_deref() {
        let dir = std::path::absolute(dir)
            .with_context(|| format!("resolve log dir '{}'", dir.display()))?;
        config.log.dir = Some(dir);
    }
    if let Some(level) = cli.log_level.clone() {
        config.log.level = level;
    }
    config.validate()?;
    Ok(config)
}

fn build_controller(config: &SceneConfig) -> anyhow::Result<SceneController<SqliteSceneCache>> {
    let birds = HttpCategoryStore::new(Category::Bird, &config.endpoint(Category::Bird))?;
    let clouds = HttpCategoryStore::new(Category::Cloud, &config.endpoint(Category::Cloud))?;
    let sync = SceneSync::new(Arc::new(birds), Arc::new(clouds))?;

    let db_path = &config.cache.db_path;
    let conn =
        open_db(db_path).with_context(|| format!("open cache db '{}'", db_path.display()))?;
    let cache = SqliteSceneCache::new(conn, config.cache.slot.clone());
    Ok(SceneController::new(sync, cache))
}

fn print_load(outcome: &LoadOutcome) {
    println!(
        "load source={:?} elements={} remote_failed={:?} cache_filled={:?}",
        outcome.source, outcome.element_count, outcome.remote_failed, outcome.cache_filled
    );
    if outcome.cache_malformed {
        println!("load cache=malformed");
    }
    if let Some(status) = outcome.push_status {
        println!("load push={}", status.as_str());
    }
}

fn print_mutation(command: &str, report: &MutationReport) {
    match report.element.as_ref() {
        Some(element) => println!(
            "{command} id={} type={} status={} failed={:?}",
            element.id,
            element.category(),
            report.status.as_str(),
            report.failed
        ),
        None => println!(
            "{command} status={} failed={:?}",
            report.status.as_str(),
            report.failed
        ),
    }
}

fn print_snapshot(snapshot: &SceneSnapshot) {
    for element in &snapshot.elements {
        println!(
            "{} {} at ({}, {}) size={:.2} delay={:.2}s",
            element.category(),
            element.id,
            element.position.x,
            element.position.y,
            element.scale,
            element.animation_delay
        );
    }
    println!(
        "local birds={} clouds={} remote birds={} clouds={} last_status={}",
        snapshot.local_counts.birds,
        snapshot.local_counts.clouds,
        snapshot.remote_counts.birds,
        snapshot.remote_counts.clouds,
        snapshot.last_status.map_or("none", |status| status.as_str())
    );
}
