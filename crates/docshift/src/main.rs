//! docshift CLI
//!
//! Migrates documents between Elasticsearch-style clusters and dumps indices.
//! Pedantic lints relaxed for CLI ergonomics.

// CLI tool - relax pedantic lints for ergonomics
#![allow(clippy::pedantic)]

use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use docshift::{FieldMapper, MigrationConfig, Pipeline, StoreClient};

#[derive(Parser)]
#[command(name = "docshift")]
#[command(version)]
#[command(about = "Scroll-driven document migration for Elasticsearch-style stores", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Dry run mode (don't write to destination)
    #[arg(long, global = true)]
    dry_run: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Page size override
    #[arg(long, global = true)]
    page_size: Option<usize>,

    /// Delay between pages in milliseconds
    #[arg(long, env = "DOCSHIFT_DELAY_MS", global = true)]
    delay_ms: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run migration from config file
    Run {
        /// Configuration file path
        #[arg(short, long, value_name = "FILE")]
        config: PathBuf,
    },

    /// Validate configuration file
    Validate {
        /// Configuration file path
        #[arg(short, long, value_name = "FILE")]
        config: PathBuf,
    },

    /// Generate example configuration
    Init {
        /// Output file path
        #[arg(short, long, default_value = "migration.yaml")]
        output: PathBuf,
    },

    /// Print every document of an index as one JSON line
    Dump {
        /// Store URL
        #[arg(short, long)]
        url: String,

        /// Index name
        #[arg(short = 'n', long)]
        index: String,

        /// Optional query (store query DSL, JSON)
        #[arg(short, long)]
        query: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so that `dump` output stays clean; RUST_LOG wins over --verbose
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_directive(cli.verbose)));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let overrides = Overrides {
        dry_run: cli.dry_run,
        page_size: cli.page_size,
        delay: cli.delay_ms.map(Duration::from_millis),
    };

    match cli.command {
        Some(Commands::Run { config }) => {
            run_migration(&config, &overrides).await?;
        }
        Some(Commands::Validate { config }) => {
            validate_config(&config)?;
        }
        Some(Commands::Init { output }) => {
            generate_config(&output)?;
        }
        Some(Commands::Dump { url, index, query }) => {
            dump_index(&url, &index, query.as_deref(), overrides.delay).await?;
        }
        None => {
            // Default: run migration if config provided
            if let Some(config) = cli.config {
                run_migration(&config, &overrides).await?;
            } else {
                eprintln!("Usage: docshift --config <FILE> or docshift <COMMAND>");
                eprintln!("Try 'docshift --help' for more information.");
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn default_log_directive(verbose: bool) -> &'static str {
    if verbose {
        "docshift=debug,info"
    } else {
        "info"
    }
}

struct Overrides {
    dry_run: bool,
    page_size: Option<usize>,
    delay: Option<Duration>,
}

async fn run_migration(config_path: &Path, overrides: &Overrides) -> anyhow::Result<()> {
    info!("Loading configuration from {:?}", config_path);

    let mut config = MigrationConfig::from_file(config_path)?;

    if overrides.dry_run {
        config.options.dry_run = true;
    }
    if let Some(size) = overrides.page_size {
        config.options.page_size = size;
    }
    if let Some(delay) = overrides.delay {
        config.options.scroll_delay = delay;
    }

    let mapper = FieldMapper::new(config.options.field_mappings.clone());
    let pipeline = Pipeline::new(config)?.with_progress(true);
    let stats = pipeline.run(&mapper).await?;

    println!("\n✅ Migration Complete!");
    println!("   Extracted: {}", stats.extracted);
    println!("   Created:   {}", stats.created);
    println!("   Failed:    {}", stats.failed);
    println!("   Pages:     {}", stats.pages);
    println!("   Duration:  {:.2}s", stats.duration_secs);
    println!("   Throughput: {:.0} docs/sec", stats.throughput());

    Ok(())
}

fn validate_config(config_path: &Path) -> anyhow::Result<()> {
    info!("Validating configuration from {:?}", config_path);

    let config = MigrationConfig::from_file(config_path)?;
    config.validate()?;

    println!("✅ Configuration is valid!");
    println!(
        "   Source:      {}/{}/{}",
        config.source.url, config.source.index, config.source.doc_type
    );
    println!(
        "   Destination: {}/{}/{}",
        config.destination.url, config.destination.index, config.destination.doc_type
    );
    println!("   Page size:   {}", config.options.page_size);
    println!(
        "   Delay:       {} ms",
        config.options.scroll_delay.as_millis()
    );

    Ok(())
}

fn generate_config(output: &Path) -> anyhow::Result<()> {
    std::fs::write(output, CONFIG_TEMPLATE)?;
    println!("✅ Generated configuration: {:?}", output);
    println!(
        "   Edit the file and run: docshift run --config {:?}",
        output
    );

    Ok(())
}

async fn dump_index(
    url: &str,
    index: &str,
    query: Option<&str>,
    delay: Option<Duration>,
) -> anyhow::Result<()> {
    docshift::config::validate_url(url)?;

    let mut body = serde_json::json!({});
    if let Some(query) = query {
        body["query"] = serde_json::from_str(query)?;
    }

    let client = StoreClient::new(url);
    let delay = delay.unwrap_or(Duration::ZERO);

    client
        .search_scroll(index, &body, delay, |page| async move {
            let mut out = std::io::stdout().lock();
            for hit in &page.hits {
                serde_json::to_writer(&mut out, hit)?;
                writeln!(out)?;
            }
            Ok(())
        })
        .await?;

    Ok(())
}

const CONFIG_TEMPLATE: &str = r#"# docshift migration configuration
source:
  url: http://localhost:9200
  index: articles_v1
  type: article

destination:
  url: http://localhost:9201
  index: articles_v2
  type: article

options:
  # Documents per scroll page (one bulk request per page)
  page_size: 1000
  # Pause between pages; must stay below keep_alive
  scroll_delay: 0ms
  # Cursor lifetime for the opening search and for each advance
  open_keep_alive: 5m
  keep_alive: 1m
  # Restrict migrated documents (optional)
  # query:
  #   term:
  #     status: published
  # Rename payload fields on the way
  field_mappings: {}
  dry_run: false
"#;
