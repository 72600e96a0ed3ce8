//! wikimirror main entry point
//!
//! This is the command-line interface for the wikimirror offline mirror builder.

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use wikimirror::config::{load_config_with_hash, Config};
use wikimirror::output::print_statistics;
use wikimirror::Mirror;

/// wikimirror: an offline mirror builder for MediaWiki sites
///
/// wikimirror enumerates the articles and redirects of a wiki, rewrites the
/// rendered articles into static documents and stores them, with their
/// media, in a directory tree that can be browsed offline.
#[derive(Parser, Debug)]
#[command(name = "wikimirror")]
#[command(version)]
#[command(about = "Builds an offline mirror of a MediaWiki site", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be mirrored without fetching anything
    #[arg(long, conflicts_with = "catalog_only")]
    dry_run: bool,

    /// Build the catalogs, print their sizes and exit
    #[arg(long, conflicts_with = "dry_run")]
    catalog_only: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.catalog_only {
        handle_catalog_only(config).await?;
    } else {
        handle_mirror(config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("wikimirror=info,warn"),
            1 => EnvFilter::new("wikimirror=debug,info"),
            2 => EnvFilter::new("wikimirror=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the validated configuration
fn handle_dry_run(config: &Config) {
    println!("=== wikimirror Dry Run ===\n");

    println!("Mirror:");
    println!("  Output directory: {}", config.mirror.output_dir);
    println!(
        "  Main page: {}",
        config.mirror.main_page.as_deref().unwrap_or("(from site info)")
    );
    match &config.mirror.articles {
        Some(articles) => println!("  Articles: {} configured", articles.len()),
        None => println!("  Articles: all pages of the mirrored namespaces"),
    }
    if config.mirror.namespaces.is_empty() {
        println!("  Extra namespaces: none");
    } else {
        println!("  Extra namespaces: {}", config.mirror.namespaces.join(", "));
    }
    println!("  Media: {}", if config.mirror.media { "yes" } else { "no" });
    println!(
        "  Concurrency: {} requests, {} articles",
        config.mirror.max_concurrent_requests, config.mirror.max_concurrent_articles
    );
    println!(
        "  Retries: {} (base delay {}ms)",
        config.mirror.max_retries, config.mirror.retry_delay_ms
    );

    println!("\nRemote:");
    println!("  API: {}", config.remote.api_url);
    println!("  Rendering: {}", config.remote.rendering_url);
    println!("  Web: {}", config.remote.web_url);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nTransform:");
    println!(
        "  Removed classes: {}",
        config.transform.css_class_blacklist.join(", ")
    );
    println!(
        "  Removed classes without links: {}",
        config.transform.css_class_blacklist_if_no_link.join(", ")
    );
    println!("  Removed ids: {}", config.transform.id_blacklist.join(", "));

    println!("\n✓ Configuration is valid");
}

/// Handles the --catalog-only mode: builds the catalogs and prints their sizes
async fn handle_catalog_only(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let mirror = Mirror::new(config)?;
    let (site, catalogs) = mirror.build_catalogs().await?;

    println!("=== {} ===\n", site.site_name);
    println!("Main page: {}", site.main_page);
    println!("Direction: {}", site.direction.as_str());
    println!("Articles: {}", catalogs.articles().len());
    println!("Redirects: {}", catalogs.redirects().len());

    Ok(())
}

/// Handles the main mirror operation
async fn handle_mirror(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        "Mirroring {} into {}",
        config.remote.web_url,
        config.mirror.output_dir
    );

    let mirror = Mirror::new(config)?;
    match mirror.run().await {
        Ok(stats) => {
            tracing::info!("Mirror completed successfully");
            print_statistics(&stats);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Mirror failed: {}", e);
            Err(e.into())
        }
    }
}
