use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use indexer::config::{Config, ConfigOverrides};

#[derive(Parser, Debug)]
#[command(
    name = "indexer",
    about = "Builds and queries an inverted index over a corpus of web documents",
    version = env!("CARGO_PKG_VERSION")
)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Path to a config.toml providing defaults for any flag below
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
enum Commands {
    /// Build partial indexes from a corpus directory then merge them
    /// into a final inverted index.
    Build {
        #[arg(long = "webpages-dir")]
        webpages_dir: Option<PathBuf>,
        #[arg(long = "partial-index-dir")]
        partial_index_dir: Option<PathBuf>,
        #[arg(long = "index-dir")]
        index_dir: Option<PathBuf>,
        #[arg(long = "batch-size")]
        batch_size: Option<usize>,
    },
    /// Interactively query a built index; reads lines from stdin until
    /// `quit`.
    Query {
        #[arg(long = "index-dir")]
        index_dir: Option<PathBuf>,
        #[arg(long = "top-k")]
        top_k: Option<usize>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    match args.command {
        Commands::Build {
            webpages_dir,
            partial_index_dir,
            index_dir,
            batch_size,
        } => {
            let overrides = ConfigOverrides {
                webpages_dir,
                partial_index_dir,
                index_dir,
                batch_size,
                top_k: None,
            };
            let cfg = Config::load(args.config.as_deref(), overrides).context("load config")?;
            indexer::build(&cfg).context("build index")?;
        }
        Commands::Query { index_dir, top_k } => {
            let overrides = ConfigOverrides {
                index_dir,
                top_k,
                ..Default::default()
            };
            let cfg = load_query_config(args.config.as_deref(), overrides)?;
            let stdin = std::io::stdin();
            let stdout = std::io::stdout();
            indexer::query_repl(&cfg, stdin.lock(), stdout.lock()).context("query index")?;
        }
    }

    Ok(())
}

/// `query` only needs `index_dir`; `webpages_dir`/`partial_index_dir`
/// aren't meaningful for this command, so they're filled with
/// placeholders rather than demanded from the operator.
fn load_query_config(
    config_path: Option<&std::path::Path>,
    mut overrides: ConfigOverrides,
) -> anyhow::Result<Config> {
    overrides.webpages_dir.get_or_insert_with(|| PathBuf::from("."));
    overrides
        .partial_index_dir
        .get_or_insert_with(|| PathBuf::from("."));
    Config::load(config_path, overrides).context("load config")
}
