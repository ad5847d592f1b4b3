//! news-crawler CLI - search Baidu for news from the command line.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use news_crawler::{CrawlerConfig, NewsCrawler, ResultSet, MAX_RESULTS_CAP};

/// news-crawler - Baidu news search crawler
#[derive(Parser)]
#[command(name = "news-crawler")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for news about a keyword
    Search(SearchArgs),

    /// List configured search endpoints
    Endpoints {
        /// Configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Parser)]
struct SearchArgs {
    /// Search keyword
    keyword: String,

    /// Maximum number of results (capped at 50)
    #[arg(short = 'n', long, default_value = "10")]
    limit: usize,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    /// Configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Per-attempt timeout in seconds, overriding the configuration
    #[arg(short, long)]
    timeout: Option<u64>,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output
    Json,
    /// Compact single-line output
    Compact,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    match cli.command {
        Commands::Search(args) => run_search(args).await,
        Commands::Endpoints { config } => list_endpoints(config),
    }
}

fn load_config(path: Option<PathBuf>) -> Result<CrawlerConfig> {
    let config = match path {
        Some(path) => CrawlerConfig::load(path)?,
        None => CrawlerConfig::default(),
    };
    Ok(config)
}

fn list_endpoints(config: Option<PathBuf>) -> Result<()> {
    let config = load_config(config)?;
    println!("Configured search endpoints:\n");
    for (i, endpoint) in config.endpoints.iter().enumerate() {
        println!(
            "  {}. {} (keyword param: {})",
            i + 1,
            endpoint.base_url,
            endpoint.query_param
        );
    }
    println!();
    println!("Usage: news-crawler search \"西昌\" -n 10");
    Ok(())
}

async fn run_search(args: SearchArgs) -> Result<()> {
    let mut config = load_config(args.config)?;
    if let Some(timeout) = args.timeout {
        config.timeout_secs = timeout;
    }

    let limit = args.limit.min(MAX_RESULTS_CAP);
    let crawler = NewsCrawler::new(config)?;
    let results = crawler.search(&args.keyword, limit).await;

    match args.format {
        OutputFormat::Text => print_text(&args.keyword, &results),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        OutputFormat::Compact => {
            for record in results.items() {
                println!("{}\t{}", record.title, record.url);
            }
        }
    }

    Ok(())
}

fn print_text(keyword: &str, results: &ResultSet) {
    println!(
        "\nNews results for \"{}\" ({} results in {}ms):\n",
        keyword,
        results.count(),
        results.duration_ms()
    );

    for (i, record) in results.items().iter().enumerate() {
        println!("{}. {}", i + 1, record.title);
        println!("   URL: {}", record.url);
        if !record.source.is_empty() {
            println!("   Source: {}", record.source);
        }
        if !record.summary.is_empty() {
            let summary = if record.summary.chars().count() > 150 {
                format!("{}...", record.summary.chars().take(150).collect::<String>())
            } else {
                record.summary.clone()
            };
            println!("   {}", summary);
        }
        if !record.cover.is_empty() {
            println!("   Cover: {}", record.cover);
        }
        println!();
    }
}
