use anyhow::Result;
use clap::{Parser, Subcommand};
use netbakeoff::*;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[derive(Parser)]
#[command(name = "netbakeoff")]
#[command(about = "Latency telemetry aggregation and bad-moment scoring")]
#[command(version = version::VERSION)]
struct Cli {
    /// Config file (default: $CONFIG_FILE, then ./config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Append collector records (JSON lines) to the sample store
    Ingest {
        /// Read records from this file instead of stdin
        #[arg(long)]
        input: Option<PathBuf>,

        /// Phase label for this invocation (default: $PHASE, then the phase file)
        #[arg(long)]
        phase: Option<String>,
    },

    /// Aggregate newly completed buckets into the derived cache, once
    Cycle {
        /// Also seal windows ending at or before this instant (epoch ms)
        #[arg(long)]
        as_of_ms: Option<i64>,
    },

    /// Print phase summaries, ranking and LAN/WAN correlation counts as JSON
    Report {
        /// Range start (epoch ms, inclusive)
        #[arg(long)]
        from: Option<i64>,

        /// Range end (epoch ms, exclusive)
        #[arg(long)]
        to: Option<i64>,

        /// Restrict summaries and ranking to one source (lan or wan)
        #[arg(long)]
        source: Option<models::Source>,
    },

    /// Write the recent window of bucket metrics to CSV for the dashboard
    Export {
        /// Window length in hours (default: export.window_hours)
        #[arg(long)]
        window_hours: Option<u32>,

        /// Output path (default: export.path)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Serve the read-only HTTP query API
    Serve,
}

fn now_ms() -> Result<i64> {
    Ok(std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)?
        .as_millis() as i64)
}

async fn open_cache(app_config: &config::AppConfig) -> Result<metrics_cache::MetricsCache> {
    let cache = metrics_cache::MetricsCache::connect(&app_config.cache.path).await?;
    cache.init().await?;
    Ok(cache)
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let app_config = match &cli.config {
        Some(path) => config::AppConfig::load_from_path(&path.to_string_lossy())?,
        None => config::AppConfig::load()?,
    };

    match cli.command {
        Commands::Ingest {
            input,
            phase: phase_arg,
        } => {
            let store = sample_store::SampleStore::open(Path::new(&app_config.store.data_dir))?;
            let label = phase_arg
                .unwrap_or_else(|| phase::current_phase(Path::new(&app_config.store.phase_file)));
            let reader: Box<dyn BufRead> = match input {
                Some(path) => Box::new(std::io::BufReader::new(std::fs::File::open(path)?)),
                None => Box::new(std::io::stdin().lock()),
            };
            let report = ingest::ingest_lines(reader, &label, &store)?;
            anyhow::ensure!(
                report.rejected.is_empty(),
                "{} of {} records rejected",
                report.rejected.len(),
                report.accepted + report.rejected.len()
            );
        }
        Commands::Cycle { as_of_ms } => {
            let store = sample_store::SampleStore::open(Path::new(&app_config.store.data_dir))?;
            let cache = open_cache(&app_config).await?;
            let cycle_config = aggregation_cycle::CycleConfig::from_app(&app_config, as_of_ms)?;
            let report = aggregation_cycle::run_one_cycle(&store, &cache, &cycle_config).await?;
            tracing::info!(
                rebuilt = report.rebuilt,
                buckets_saved = report.buckets_saved,
                bad_buckets = report.bad_buckets,
                insufficient = report.insufficient,
                "cycle complete"
            );
        }
        Commands::Report { from, to, source } => {
            let cache = open_cache(&app_config).await?;
            let range = models::TimeRange::new(from.unwrap_or(i64::MIN), to.unwrap_or(i64::MAX))
                .ok_or_else(|| anyhow::anyhow!("--from must be <= --to"))?;
            let source = source.or(app_config.comparator.source);

            let rows = cache.get_range(range, source, None).await?;
            let summaries = comparator::summarize_phases(&rows);
            let ranking =
                comparator::rank_phases(summaries.clone(), &app_config.comparator.weights);

            let all = cache.get_range(range, None, None).await?;
            let (lan, wan): (Vec<_>, Vec<_>) = all
                .into_iter()
                .map(|r| r.flag)
                .partition(|f| f.bucket.source == models::Source::Lan);
            let counts = correlation::correlation_counts(&correlation::correlate(&lan, &wan));

            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "phases": summaries,
                    "ranking": ranking,
                    "correlation": counts,
                }))?
            );
        }
        Commands::Export {
            window_hours,
            output,
        } => {
            let cache = open_cache(&app_config).await?;
            let path = output.unwrap_or_else(|| PathBuf::from(&app_config.export.path));
            let hours = window_hours.unwrap_or(app_config.export.window_hours);
            export::export_window(&cache, &path, hours, now_ms()?).await?;
        }
        Commands::Serve => {
            let cache = Arc::new(open_cache(&app_config).await?);
            let app = routes::app(cache, app_config.clone());
            let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            tracing::info!("Listening on http://{}", addr);
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = tokio::signal::ctrl_c().await;
                    tracing::info!("Received shutdown signal");
                })
                .await?;
        }
    }

    Ok(())
}
