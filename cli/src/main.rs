//! atom-cli - log in from the terminal and like everything once.

use anyhow::{Context, Result};
use atom_client::{ClientConfig, ContentClient};
use atom_common::{Category, HistoryGate};
use atom_store::{NullHistory, SledStore};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "atom-cli")]
#[command(about = "Log in by QR code, then like the newest items in every community")]
#[command(version)]
struct Args {
    /// Number of newest items to consider per category
    #[arg(long, default_value_t = 10, env = "ATOM_POST")]
    post: usize,

    /// Categories to like (notices, moments, ccp-posts, proposals); all when omitted
    #[arg(long = "category", value_delimiter = ',', env = "ATOM_CATEGORIES")]
    categories: Vec<Category>,

    /// Seconds to wait for the QR code to be scanned
    #[arg(long, default_value_t = 300, env = "ATOM_LOGIN_TIMEOUT")]
    login_timeout: u64,

    /// Outbound request timeout in seconds
    #[arg(long, default_value_t = 60, env = "ATOM_TIMEOUT")]
    timeout: u64,

    /// Remember liked items in this sled database across runs
    #[arg(long, env = "ATOM_STORE_PATH")]
    store_path: Option<PathBuf>,

    /// Maximum likes in flight per category
    #[arg(long, env = "ATOM_LIKE_CONCURRENCY")]
    like_concurrency: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("atom_cli=info,atom_client=info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();

    let store = match &args.store_path {
        Some(path) => Some(
            SledStore::open(path).with_context(|| format!("Failed to open store at {}", path.display()))?,
        ),
        None => None,
    };
    let history: Arc<dyn HistoryGate> = match &store {
        Some(store) => Arc::new(store.clone()),
        None => Arc::new(NullHistory),
    };

    let config = ClientConfig {
        request_timeout: Duration::from_secs(args.timeout),
        like_concurrency: args.like_concurrency,
        ..Default::default()
    };
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;
    let client = Arc::new(ContentClient::with_defaults(config, history).context("Failed to build client")?);

    let (url, logged_in) = atom_cli::start_login(&client).await?;
    println!("QR Code: {}", url);

    atom_cli::wait_for_login(&client, logged_in, Duration::from_secs(args.login_timeout)).await?;

    let categories = atom_cli::selected_categories(&args.categories);
    for report in atom_cli::like_everywhere(&client, &categories, args.post).await {
        match &report.error {
            Some(e) => println!("{}: skipped ({})", report.community.name, e),
            None => {
                println!("{}:", report.community.name);
                for (category, n) in &report.liked {
                    println!("  liked {}: {}", category, n);
                }
            }
        }
    }

    client.teardown().await;
    if let Some(store) = store {
        store.flush().await.context("Failed to flush store")?;
    }
    Ok(())
}
