use anyhow::{Context, Result};
use chrono::DateTime;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use harvest::auth::api_key_from_header;
use harvest::config::Config;
use harvest::feed::HttpFetcher;
use harvest::scheduler::Scheduler;
use harvest::storage::{Database, StoreError, User};
use harvest::util::validate_feed_url;

const DEFAULT_LOG_FILTER: &str = "harvest=info";

/// Get the config directory path (~/.config/harvest/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("harvest"))
}

fn format_timestamp(secs: i64) -> String {
    DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| secs.to_string())
}

#[derive(Parser, Debug)]
#[command(name = "harvest", version, about = "Periodic RSS scraper")]
struct Args {
    /// Config file (default: ~/.config/harvest/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// SQLite database file, overrides `database_path`
    #[arg(long, global = true, value_name = "FILE")]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserCommand,
    },
    /// Manage feeds
    Feed {
        #[command(subcommand)]
        action: FeedCommand,
    },
    /// Manage the feeds a user follows
    Follow {
        #[command(subcommand)]
        action: FollowCommand,
    },
    /// Show the newest posts from followed feeds
    Posts {
        /// Authorization value: "APIKey <key>"
        #[arg(long)]
        auth: Option<String>,
        #[arg(long, default_value_t = 10)]
        limit: i64,
    },
    /// Scrape feeds on the configured interval
    Scrape {
        /// Run a single round and exit
        #[arg(long)]
        once: bool,
        /// Feeds per round, overrides `concurrency`
        #[arg(long)]
        concurrency: Option<usize>,
        /// Seconds between rounds, overrides `interval_secs`
        #[arg(long, value_name = "SECS")]
        interval: Option<u64>,
    },
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    /// Create a user and print its API key
    Create { name: String },
    /// Show the user an API key belongs to
    Show {
        #[arg(long)]
        auth: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum FeedCommand {
    /// Register a feed and follow it
    Add {
        #[arg(long)]
        auth: Option<String>,
        name: String,
        url: String,
    },
    /// List every registered feed
    List,
}

#[derive(Subcommand, Debug)]
enum FollowCommand {
    /// Follow an existing feed
    Add {
        #[arg(long)]
        auth: Option<String>,
        feed_id: i64,
    },
    /// List followed feeds
    List {
        #[arg(long)]
        auth: Option<String>,
    },
    /// Stop following a feed
    Remove {
        #[arg(long)]
        auth: Option<String>,
        feed_id: i64,
    },
}

/// Resolve the user behind an authorization value.
async fn authenticate(db: &Database, auth: Option<&str>) -> Result<User> {
    let api_key = api_key_from_header(auth.unwrap_or_default()).context("Couldn't get user")?;
    match db.get_user_by_api_key(api_key).await {
        Ok(user) => Ok(user),
        Err(StoreError::NotFound(_)) => anyhow::bail!("Couldn't get user: unknown API key"),
        Err(e) => Err(e).context("Couldn't get user"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_dir = get_config_dir()?;
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let mut config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    // RUST_LOG wins over the config file
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(config.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER))
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Some(database) = &args.database {
        config.database_path = Some(database.clone());
    }
    if let Command::Scrape {
        concurrency,
        interval,
        ..
    } = &args.command
    {
        if let Some(concurrency) = concurrency {
            config.concurrency = *concurrency;
        }
        if let Some(interval) = interval {
            config.interval_secs = *interval;
        }
    }
    config.validate().context("Invalid configuration")?;

    let db_path = config.database_path_or(&config_dir);
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create database directory {}", parent.display())
            })?;
        }
    }

    // SEC-007: The default directory holds API keys, keep it user-only
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if config_dir.exists() {
            if let Err(e) =
                std::fs::set_permissions(&config_dir, std::fs::Permissions::from_mode(0o700))
            {
                tracing::warn!(
                    path = %config_dir.display(),
                    error = %e,
                    "Failed to set config directory permissions to 0700"
                );
            }
        }
    }

    let db_path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?;
    let db = match Database::open(db_path_str).await {
        Ok(db) => db,
        Err(StoreError::InstanceLocked) => {
            eprintln!("Error: The database is locked by another process. Please try again.");
            std::process::exit(1);
        }
        Err(e) => return Err(anyhow::anyhow!("Failed to open database: {}", e)),
    };

    match args.command {
        Command::User { action } => match action {
            UserCommand::Create { name } => {
                let user = db.create_user(&name).await.context("Couldn't create user")?;
                println!("Created user {} (id {})", user.name, user.id);
                println!("API key: {}", user.api_key);
            }
            UserCommand::Show { auth } => {
                let user = authenticate(&db, auth.as_deref()).await?;
                println!("{} (id {})", user.name, user.id);
                println!("Created: {}", format_timestamp(user.created_at));
            }
        },

        Command::Feed { action } => match action {
            FeedCommand::Add { auth, name, url } => {
                let user = authenticate(&db, auth.as_deref()).await?;
                let url = validate_feed_url(&url).context("Couldn't create feed")?;
                let feed = match db.create_feed(user.id, &name, url.as_str()).await {
                    Ok(feed) => feed,
                    Err(StoreError::Duplicate(url)) => {
                        anyhow::bail!("Couldn't create feed: {url} is already registered")
                    }
                    Err(e) => return Err(e).context("Couldn't create feed"),
                };
                println!("Added feed {} (id {}) and followed it", feed.name, feed.id);
            }
            FeedCommand::List => {
                let feeds = db.get_feeds().await.context("Couldn't get feeds")?;
                if feeds.is_empty() {
                    println!("No feeds registered");
                }
                for feed in feeds {
                    let fetched = feed
                        .last_fetched_at
                        .map(format_timestamp)
                        .unwrap_or_else(|| "never".to_string());
                    println!("{:>5}  {}  {}  (fetched: {})", feed.id, feed.name, feed.url, fetched);
                }
            }
        },

        Command::Follow { action } => match action {
            FollowCommand::Add { auth, feed_id } => {
                let user = authenticate(&db, auth.as_deref()).await?;
                let follow = db
                    .create_feed_follow(user.id, feed_id)
                    .await
                    .context("Couldn't create feed follow")?;
                println!("Following feed {} (follow id {})", follow.feed_id, follow.id);
            }
            FollowCommand::List { auth } => {
                let user = authenticate(&db, auth.as_deref()).await?;
                let follows = db
                    .get_feed_follows_for_user(user.id)
                    .await
                    .context("Couldn't get feed follows")?;
                for follow in follows {
                    let feed = db.get_feed(follow.feed_id).await?;
                    println!("{:>5}  {}  {}", feed.id, feed.name, feed.url);
                }
            }
            FollowCommand::Remove { auth, feed_id } => {
                let user = authenticate(&db, auth.as_deref()).await?;
                db.delete_feed_follow(user.id, feed_id)
                    .await
                    .context("Couldn't delete feed follow")?;
                println!("Unfollowed feed {feed_id}");
            }
        },

        Command::Posts { auth, limit } => {
            let user = authenticate(&db, auth.as_deref()).await?;
            let posts = db
                .get_posts_for_user(user.id, limit)
                .await
                .context("Couldn't get posts")?;
            if posts.is_empty() {
                println!("No posts yet");
            }
            for post in posts {
                println!("{}  {}", format_timestamp(post.published_at), post.title);
                println!("    {}", post.url);
                if let Some(description) = &post.description {
                    println!("    {}", description);
                }
            }
        }

        Command::Scrape { once, .. } => {
            let fetcher = HttpFetcher::build(
                &config.user_agent,
                config.fetch_timeout(),
                config.max_feed_bytes,
            )
            .context("Failed to build HTTP client")?;
            let scheduler = Scheduler::new(
                Arc::new(db.clone()),
                Arc::new(fetcher),
                config.scheduler_config(),
            );

            if once {
                let scraped = scheduler.run_round().await;
                println!("Scraped {scraped} feeds");
            } else {
                tokio::select! {
                    _ = scheduler.run() => {}
                    signal = tokio::signal::ctrl_c() => {
                        signal.context("Failed to listen for Ctrl-C")?;
                        tracing::info!("Shutting down");
                    }
                }
            }
        }
    }

    Ok(())
}
