mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{collection::CollectionSubcommand, config::ConfigSubcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "custfix",
    about = "Patch placeholder customer names from a lookup collection; extract SKU hotspots from PDFs",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .custfix/)
    #[arg(long, global = true, env = "CUSTFIX_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Without a subcommand, runs one reconciliation pass
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config and create the store
    Init,

    /// Replace placeholder customer names in the source collection
    Reconcile {
        /// Resolve names and report, but write nothing
        #[arg(long)]
        dry_run: bool,

        /// Override the configured strategy (cross-collection or same-record)
        #[arg(long)]
        strategy: Option<custfix_core::config::Strategy>,
    },

    /// Import and inspect store collections
    Collection {
        #[command(subcommand)]
        subcommand: CollectionSubcommand,
    },

    /// Show or validate the project configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Find SKU strings in a PDF and write their bounding boxes as JSON
    Hotspots {
        /// PDF to scan (default: hotspots.pdf from config)
        #[arg(long)]
        pdf: Option<PathBuf>,

        /// SKU to look for; repeatable (default: hotspots.skus from config)
        #[arg(long = "sku", value_name = "SKU")]
        skus: Vec<String>,

        /// Output JSON file (default: hotspots.output from config)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        None => cmd::reconcile::run(&root, false, None, cli.json),
        Some(Commands::Init) => cmd::init::run(&root, cli.json),
        Some(Commands::Reconcile { dry_run, strategy }) => {
            cmd::reconcile::run(&root, dry_run, strategy, cli.json)
        }
        Some(Commands::Collection { subcommand }) => {
            cmd::collection::run(&root, subcommand, cli.json)
        }
        Some(Commands::Config { subcommand }) => cmd::config::run(&root, subcommand, cli.json),
        Some(Commands::Hotspots { pdf, skus, out }) => {
            cmd::hotspots::run(&root, pdf, skus, out, cli.json)
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
