mod sync;

use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgAction, Parser};
use tracing_subscriber::EnvFilter;
use webmention_core::{MentionsClient, StoreFormat};

use crate::sync::engine::{SyncConfig, SyncEngine};

/// Back up webmention.io mentions into local JSON files.
#[derive(Debug, Parser)]
#[command(name = "webmention-backup", version)]
struct Cli {
    /// Store filename
    #[arg(short = 'f', long, default_value = "webmentions.json")]
    filename: String,

    /// API token
    #[arg(short = 't', long)]
    token: Option<String>,

    /// Domain to fetch webmentions for
    #[arg(short = 'd', long)]
    domain: Option<String>,

    /// Use the JF2 endpoint instead of the classic one
    #[arg(long)]
    jf2: bool,

    /// Wrap output in a top-level object (links list or feed)
    #[arg(long, default_value_t = true, action = ArgAction::Set, value_name = "BOOL")]
    tlo: bool,

    /// Indent the JSON written to disk
    #[arg(long)]
    pretty: bool,

    /// Resume from the stored verification timestamp instead of the
    /// highest mention id
    #[arg(long)]
    timestamp: bool,

    /// Directory to look for structure in; when given, mentions are saved
    /// into the subdirectories matching their target paths
    #[arg(long = "content-dir", visible_alias = "cd", value_name = "DIR")]
    content_dir: Option<PathBuf>,

    /// Top-level locale prefixes to drop while saving according to paths
    #[arg(short = 'l', long, value_delimiter = ',', value_name = "LIST")]
    locales: Vec<String>,

    /// Mentions API endpoint
    #[arg(long, value_name = "URL", default_value = webmention_core::DEFAULT_ENDPOINT)]
    endpoint: String,
}

impl Cli {
    fn store_format(&self) -> StoreFormat {
        if !self.tlo {
            StoreFormat::Array
        } else if self.jf2 {
            StoreFormat::Jf2Feed
        } else {
            StoreFormat::Links
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    println!("webmention-backup version {}", env!("CARGO_PKG_VERSION"));

    let client = MentionsClient::with_base_url(
        &cli.endpoint,
        cli.token.clone(),
        cli.domain.clone(),
        cli.jf2,
    )
    .context("could not set up the mentions client")?;

    let config = SyncConfig {
        filename: cli.filename.clone(),
        content_dir: cli.content_dir.clone(),
        locales: cli.locales.clone(),
        format: cli.store_format(),
        pretty: cli.pretty,
        timestamp_cursor: cli.timestamp,
    };
    let engine = SyncEngine::new(client, config);
    let report = engine.run().await?;

    println!("found {} existing webmentions", report.existing);
    if report.fetched == 0 {
        println!("no new webmentions");
    } else if let Some(total) = report.flat_total {
        println!("appending {} new webmentions", report.fetched);
        println!("saved {} webmentions to {}", total, cli.filename);
    } else {
        let root = cli
            .content_dir
            .as_deref()
            .unwrap_or_else(|| std::path::Path::new("."));
        println!(
            "saved {} new webmentions under {}",
            report.fetched,
            root.display()
        );
    }
    println!("all done!");
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("webmention_backup=warn")),
        )
        .init();
}
