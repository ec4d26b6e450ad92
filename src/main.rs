use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use newsaggr::config::Config;
use newsaggr::feed::HttpFetcher;
use newsaggr::ingest::{Ingestor, RunResult};
use newsaggr::scheduler::Scheduler;
use newsaggr::storage::{Database, DatabaseError, NewSource, MAX_PAGE_SIZE};
use newsaggr::util::{validate_feed_url, validate_public_feed_url};

/// Get the config directory path (~/.config/newsaggr/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("newsaggr"))
}

#[derive(Parser, Debug)]
#[command(name = "newsaggr", about = "Periodic RSS ingestion into a deduplicated article store")]
struct Args {
    /// Config file (default: ~/.config/newsaggr/config.toml)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest on the configured interval until interrupted (default)
    Run,
    /// Ingest every source once and exit
    Once,
    /// Manage feed sources
    #[command(subcommand)]
    Sources(SourcesCommand),
    /// Browse stored articles
    #[command(subcommand)]
    Articles(ArticlesCommand),
}

#[derive(Subcommand, Debug)]
enum SourcesCommand {
    /// List registered sources
    List,
    /// Register a source (updates provider/category if the link exists)
    Add {
        link: String,
        provider: String,
        category: String,
        /// Allow localhost and private network addresses
        #[arg(long)]
        allow_private: bool,
    },
    /// Delete a source and its articles
    Remove { id: i64 },
}

#[derive(Subcommand, Debug)]
enum ArticlesCommand {
    /// List articles, newest first
    List {
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(i64).range(1..))]
        page: i64,
        #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(i64).range(1..=MAX_PAGE_SIZE))]
        page_size: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config_dir = get_config_dir()?;
    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => config_dir.join("config.toml"),
    };
    let mut config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    config.apply_env();

    let db_path = match &config.database_path {
        Some(path) => path.clone(),
        None => {
            if !config_dir.exists() {
                std::fs::create_dir_all(&config_dir)
                    .context("Failed to create config directory")?;
            }
            config_dir.join("newsaggr.db")
        }
    };
    let db = open_database(&db_path).await?;

    let seeded = db
        .seed_sources(&config.sources)
        .await
        .context("Failed to seed sources")?;
    if seeded > 0 {
        tracing::info!(created = seeded, "Seeded sources from config");
    }

    match args.command.unwrap_or(Command::Run) {
        Command::Run => run_scheduler(db, &config).await,
        Command::Once => run_once(db, &config).await,
        Command::Sources(cmd) => sources_command(&db, cmd).await,
        Command::Articles(cmd) => articles_command(&db, cmd).await,
    }
}

async fn open_database(path: &std::path::Path) -> Result<Database> {
    let path_str = path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    match Database::open(path_str).await {
        Ok(db) => Ok(db),
        Err(DatabaseError::InstanceLocked) => {
            anyhow::bail!("Database {} is locked by another process", path.display())
        }
        Err(e) => Err(anyhow::anyhow!("Failed to open database: {}", e)),
    }
}

fn build_ingestor(db: Database, config: &Config) -> Result<Ingestor> {
    let fetcher = HttpFetcher::with_user_agent(&config.user_agent)
        .context("Failed to build HTTP client")?
        .timeout(config.fetch_timeout())
        .max_feed_size(config.max_feed_bytes);
    let db = Arc::new(db);
    Ok(Ingestor::new(db.clone(), db, Arc::new(fetcher)))
}

async fn run_scheduler(db: Database, config: &Config) -> Result<()> {
    let ingestor = build_ingestor(db, config)?;
    let scheduler = Scheduler::new(config.interval())
        .context("Invalid ingestion interval")?
        .run_on_start(config.run_on_start);

    let handle = scheduler.start(move || {
        let ingestor = ingestor.clone();
        async move { ingestor.run_once().await }
    });

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutdown requested, waiting for any in-flight run");
    handle.shutdown().await;
    Ok(())
}

async fn run_once(db: Database, config: &Config) -> Result<()> {
    let ingestor = build_ingestor(db, config)?;
    let result = ingestor.run_once().await?;
    print_summary(&result);

    if result.all_failed() {
        anyhow::bail!("All {} sources failed", result.sources_attempted);
    }
    Ok(())
}

fn print_summary(result: &RunResult) {
    println!(
        "Sources: {}  failed: {}  articles: {} new of {} seen",
        result.sources_attempted,
        result.failures.len(),
        result.articles_inserted,
        result.articles_submitted
    );
    for failure in &result.failures {
        println!("  {failure}");
    }
}

async fn sources_command(db: &Database, cmd: SourcesCommand) -> Result<()> {
    match cmd {
        SourcesCommand::List => {
            let sources = db.list_sources().await.context("Failed to list sources")?;
            if sources.is_empty() {
                println!("No sources registered.");
            }
            for s in sources {
                println!("{:>4}  {:<12} {:<28} {}", s.id, s.category, s.provider, s.link);
            }
        }
        SourcesCommand::Add {
            link,
            provider,
            category,
            allow_private,
        } => {
            let url = if allow_private {
                validate_feed_url(&link)
            } else {
                validate_public_feed_url(&link)
            }
            .with_context(|| format!("Rejected source link '{link}'"))?;

            let id = db
                .insert_source(&NewSource {
                    link: url.to_string(),
                    provider,
                    category,
                })
                .await
                .context("Failed to register source")?;
            println!("Source {id}: {url}");
        }
        SourcesCommand::Remove { id } => {
            if db.delete_source(id).await.context("Failed to delete source")? {
                println!("Deleted source {id}");
            } else {
                anyhow::bail!("Source {id} not found");
            }
        }
    }
    Ok(())
}

async fn articles_command(db: &Database, cmd: ArticlesCommand) -> Result<()> {
    match cmd {
        ArticlesCommand::List { page, page_size } => {
            let articles = db
                .list_articles(page, page_size)
                .await
                .context("Failed to list articles")?;
            if articles.is_empty() {
                println!("No articles on page {page}.");
            }
            for a in articles {
                println!("{:>6}  [{}] {}", a.id, a.category, a.title);
                println!("        {}", a.url);
                if !a.published_date.is_empty() {
                    println!("        published {}", a.published_date);
                }
                if let Some(image) = a.image {
                    println!("        image {image}");
                }
            }
        }
    }
    Ok(())
}
