use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bucket_scanner::{
    BucketTarget, CredentialMode, ResultSink, S3ObjectStore, ScanConfig, ScanEngine, ScanSummary,
};

/// Probe S3 buckets for publicly collectable files and arbitrary-file
/// upload. For authorized security testing only.
#[derive(Parser, Debug)]
#[command(name = "bucket-scanner", version, about)]
struct Cli {
    /// File with bucket names, one per line
    #[arg(short = 'l', long = "list", value_name = "FILE")]
    bucket_list: Option<PathBuf>,

    /// File to upload as the write test
    #[arg(short = 'w', long = "write", value_name = "FILE")]
    write: Option<PathBuf>,

    /// Regular expression filter on object keys
    #[arg(short = 'r', long = "regex", default_value = "")]
    regex: String,

    /// Only collect files bigger than this many bytes
    #[arg(short = 's', long = "min-size", default_value_t = 1)]
    min_size: u64,

    /// Only collect files smaller than this many bytes (0 = unbounded)
    #[arg(short = 'm', long = "max-size", default_value_t = 0)]
    max_size: u64,

    /// Number of worker tasks
    #[arg(short = 't', long = "threads", default_value_t = 10)]
    threads: usize,

    /// Combined output file
    #[arg(short = 'o', long = "output", default_value = "output.txt")]
    output: PathBuf,

    /// AWS profile name
    #[arg(short = 'p', long = "profile", default_value = "default")]
    profile: String,

    /// Passive mode: only check bucket readability (can be combined with
    /// the write test)
    #[arg(long = "passive", alias = "pm")]
    passive: bool,

    /// Detailed mode: split outcomes into per-category output files
    #[arg(short = 'd', long = "detailed")]
    detailed: bool,
}

/// Load bucket names, trimmed, empty lines skipped / 加载存储桶名单
fn load_targets(path: &Path) -> anyhow::Result<Vec<BucketTarget>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read bucket list {:?}", path))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(BucketTarget::from)
        .collect())
}

fn closing_words(config: &ScanConfig, summary: &ScanSummary) {
    tracing::info!(
        "Scan finished: {} buckets processed ({} non-existent, {} inaccessible)",
        summary.buckets,
        summary.non_existent,
        summary.inaccessible
    );
    if config.detailed {
        tracing::info!(
            "That's all folks! Sum up of scan can be found in {:?}, {:?}, {:?}, {:?}, {:?}, {:?}, {:?} and {:?}",
            config.outputs.combined,
            config.outputs.listable,
            config.outputs.downloadable,
            config.outputs.non_downloadable,
            config.outputs.writable,
            config.outputs.non_writable,
            config.outputs.non_existent,
            config.outputs.inaccessible,
        );
    } else if config.passive {
        tracing::info!(
            "That's all folks! All listable bucket names can be found in {:?}",
            config.outputs.combined
        );
    } else {
        tracing::info!(
            "That's all folks! All collectable files can be found in {:?}",
            config.outputs.combined
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bucket_scanner=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Bare invocation prints usage and scans nothing
    if std::env::args().len() <= 1 {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    }

    let cli = Cli::parse();
    let Some(list_path) = cli.bucket_list.as_ref() else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    // fatal before any worker starts
    let targets = load_targets(list_path)?;
    if targets.is_empty() {
        tracing::warn!("Bucket list {:?} contains no names, nothing to do", list_path);
        return Ok(());
    }

    let credentials = CredentialMode::resolve(&cli.profile);
    if matches!(credentials, CredentialMode::Anonymous) {
        tracing::info!(
            "All tests will be executed in anonymous mode. \
             Use -p [profile_name] to send requests with your AWS account"
        );
    }

    let config = Arc::new(ScanConfig::build(
        cli.min_size,
        cli.max_size,
        &cli.regex,
        cli.passive,
        cli.detailed,
        cli.threads,
        credentials,
        cli.write.as_deref(),
        cli.output,
    )?);

    tracing::info!(
        "Testing {} buckets on {} workers ({} mode{})",
        targets.len(),
        config.workers,
        if config.passive { "passive" } else { "active" },
        if config.probe.is_some() {
            ", write test enabled"
        } else {
            ""
        },
    );

    let store = Arc::new(S3ObjectStore::new(&config.credentials)?);
    let sink = Arc::new(ResultSink::new(config.outputs.clone()));
    let engine = ScanEngine::new(config.clone(), store, sink);
    let summary = engine.run(targets).await;

    closing_words(&config, &summary);
    Ok(())
}
