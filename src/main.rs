use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use soundmatch::{
    import_dump, open_service, CancellationToken, QueryDump, QueryOptions, SoundMatchConfig,
};

#[derive(Parser)]
#[command(name = "soundmatch")]
#[command(about = "Match hashed audio fingerprints against a fingerprint index")]
struct Args {
    /// YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert a JSON index dump into a compressed snapshot
    Import {
        /// JSON index dump
        #[arg(long)]
        dump: PathBuf,

        /// Snapshot file to write
        #[arg(long)]
        out: PathBuf,
    },

    /// Query a snapshot and print the ranked result as JSON
    Query {
        /// Snapshot written by `import`
        #[arg(long)]
        index: PathBuf,

        /// JSON query dump
        #[arg(long)]
        query: PathBuf,

        /// Override `fingerprint.max_results`
        #[arg(long)]
        max_results: Option<usize>,

        /// Stop retrieval after this many milliseconds and rank what was found
        #[arg(long)]
        deadline_ms: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;
    init_tracing(&config);

    match args.command {
        Command::Import { dump, out } => {
            let summary = import_dump(&dump, &out, &config.to_compression_config())
                .with_context(|| format!("importing {}", dump.display()))?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Query {
            index,
            query,
            max_results,
            deadline_ms,
        } => {
            let service = open_service(&index, &config.to_compression_config())
                .with_context(|| format!("opening {}", index.display()))?;
            let dump = QueryDump::from_file(&query)?;

            let mut fingerprint = config.to_fingerprint_configuration();
            if let Some(max_results) = max_results {
                fingerprint.max_results = max_results;
            }
            let options = QueryOptions {
                deadline: deadline_ms.map(Duration::from_millis),
            };

            let result = service
                .query_async(dump.fingerprints, fingerprint, options, CancellationToken::new())
                .await?;
            if result.is_partial {
                tracing::warn!("deadline reached, result is partial");
            }
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<SoundMatchConfig> {
    match path {
        Some(path) => SoundMatchConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(SoundMatchConfig::default()),
    }
}

fn init_tracing(config: &SoundMatchConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
