//! Sumi-Harvest main entry point
//!
//! This is the command-line interface for the Sumi-Harvest document harvester.

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use sumi_harvest::config::{load_config_with_hash, validate, Config, ProxyEntry};
use sumi_harvest::crawler::{crawl, CrawlMethod, CrawlRequest};
use sumi_harvest::logging::{init_logging, LOG_FILE_NAME};
use sumi_harvest::output::{generate_layout_script, LayoutMode};
use sumi_harvest::proxy::ProxyManager;
use tokio_util::sync::CancellationToken;

/// Sumi-Harvest: A depth-bounded document harvester
///
/// Sumi-Harvest walks a site from a seed URL, records every PDF it finds
/// to a CSV ledger and stores the files on disk.
#[derive(Parser, Debug)]
#[command(name = "sumi-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A depth-bounded document harvester", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl a site and harvest its documents
    Crawl(CrawlArgs),

    /// Print shell commands that give stored files readable names
    Layout {
        /// Output directory of a previous crawl
        #[arg(value_name = "OUTPUT_DIR")]
        output_dir: PathBuf,

        /// Create symlinks instead of copies
        #[arg(long)]
        symlink: bool,
    },
}

#[derive(Args, Debug)]
struct CrawlArgs {
    /// Seed URL
    #[arg(value_name = "URL")]
    url: String,

    /// Path to TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory receiving the ledger, stored files and log
    #[arg(long)]
    output_dir: Option<String>,

    /// Maximum link depth from the seed
    #[arg(long)]
    depth: Option<u32>,

    /// Fetch method: normal or browser
    #[arg(long)]
    method: Option<String>,

    /// WebDriver binary for the browser method
    #[arg(long)]
    driver_path: Option<String>,

    /// Name for the ledger and storage directory (default: seed host)
    #[arg(long)]
    page_name: Option<String>,

    /// Number of concurrent page workers
    #[arg(long)]
    workers: Option<usize>,

    /// Route fetches through the proxy pool
    #[arg(long)]
    use_proxy: bool,

    /// Proxy URL; repeat to build a pool (replaces configured proxies)
    #[arg(long = "proxy", value_name = "URL")]
    proxies: Vec<String>,

    /// Follow links onto other hosts
    #[arg(long)]
    follow_foreign_hosts: bool,

    /// Do not write the log file into the output directory
    #[arg(long)]
    no_logfile: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Layout {
            output_dir,
            symlink,
        } => {
            init_logging(cli.verbose, cli.quiet, None)?;
            handle_layout(&output_dir, symlink)
        }
        Command::Crawl(args) => handle_crawl(args, cli.verbose, cli.quiet).await,
    }
}

/// Handles the layout subcommand: prints one command per stored file
fn handle_layout(output_dir: &Path, symlink: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mode = if symlink {
        LayoutMode::Symlink
    } else {
        LayoutMode::Copy
    };

    match generate_layout_script(output_dir, mode) {
        Ok(commands) => {
            for command in commands {
                println!("{}", command);
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!("Failed to generate layout script: {}", e);
            Err(e.into())
        }
    }
}

/// Loads the optional config file, then lets command-line flags override it
fn resolve_config(args: &CrawlArgs) -> Result<(Config, Option<String>), Box<dyn std::error::Error>> {
    let (mut config, hash) = match &args.config {
        Some(path) => {
            let (config, hash) = load_config_with_hash(path)?;
            (config, Some(hash))
        }
        None => (Config::default(), None),
    };

    if let Some(output_dir) = &args.output_dir {
        config.output.output_dir = output_dir.clone();
    }
    if let Some(depth) = args.depth {
        config.crawler.max_depth = depth;
    }
    if let Some(method) = &args.method {
        config.crawler.method = method.clone();
    }
    if let Some(driver_path) = &args.driver_path {
        config.crawler.driver_path = driver_path.clone();
    }
    if let Some(page_name) = &args.page_name {
        config.output.page_name = Some(page_name.clone());
    }
    if let Some(workers) = args.workers {
        config.crawler.workers = workers;
    }
    if args.use_proxy {
        config.crawler.use_proxy = true;
    }
    if !args.proxies.is_empty() {
        config.proxy = args
            .proxies
            .iter()
            .map(|url| ProxyEntry { url: url.clone() })
            .collect();
    }
    if args.follow_foreign_hosts {
        config.crawler.follow_foreign_hosts = true;
    }
    if args.no_logfile {
        config.output.use_logfile = false;
    }

    validate(&config)?;
    Ok((config, hash))
}

/// Handles the main crawl operation
async fn handle_crawl(
    args: CrawlArgs,
    verbose: u8,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let (config, hash) = match resolve_config(&args) {
        Ok(resolved) => resolved,
        Err(e) => {
            init_logging(verbose, quiet, None)?;
            tracing::error!("Invalid configuration: {}", e);
            return Err(e);
        }
    };

    let output_dir = PathBuf::from(&config.output.output_dir);
    let log_file = config
        .output
        .use_logfile
        .then(|| output_dir.join(LOG_FILE_NAME));
    init_logging(verbose, quiet, log_file.as_deref())?;

    if let Some(hash) = &hash {
        tracing::info!("Configuration loaded (hash: {})", hash);
    }
    tracing::info!(
        "Harvesting {} to {} (depth {}, {} workers, method {})",
        args.url,
        output_dir.display(),
        config.crawler.max_depth,
        config.crawler.workers,
        config.crawler.method
    );

    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, finishing in-flight pages");
            ctrl_c_token.cancel();
        }
    });

    let method: CrawlMethod = config.crawler.method.parse()?;
    let proxies: Arc<ProxyManager> = Arc::new(config.proxy_manager());
    let mut request = CrawlRequest::new(args.url.clone(), output_dir)
        .depth(config.crawler.max_depth)
        .method(method)
        .driver_path(config.crawler.driver_path.clone())
        .use_proxy(config.crawler.use_proxy)
        .follow_foreign_hosts(config.crawler.follow_foreign_hosts)
        .workers(config.crawler.workers)
        .downloader(config.crawler.downloader_config())
        .proxies(proxies)
        .cancel_token(cancel);
    if let Some(page_name) = &config.output.page_name {
        request = request.page_name(page_name.clone());
    }

    match crawl(request).await {
        Ok(report) => {
            tracing::info!(
                "Crawl {}: {} visited, {} recorded, {} stored, {} failed, {} skipped by depth, {} foreign",
                if report.cancelled { "cancelled" } else { "completed" },
                report.visited,
                report.head_handled,
                report.get_handled,
                report.failed,
                report.skipped_depth,
                report.skipped_foreign
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
