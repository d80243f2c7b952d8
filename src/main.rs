//! carbon-forecast - emission forecasting and sustainability reports
//!
//! A CLI that runs the multi-agent forecasting pipeline over one emission
//! dataset or a directory of datasets and writes Markdown or JSON reports.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (bad input path, config, write failure, etc.)

use anyhow::{anyhow, Context, Result};
use carbon_forecast::cli::Args;
use carbon_forecast::config::{Config, CONFIG_FILE};
use carbon_forecast::pipeline::run_pipeline;
use carbon_forecast::report::{
    apply_narrative, write_json_report, write_report, NarrativeService, OllamaNarrator,
    ReportEnvelope, ReportFormat,
};
use carbon_forecast::scanner::{DatasetFile, DatasetScanner, ScanConfig};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args)?;

    info!("carbon-forecast v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args).await {
        error!("Forecast failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .carbon-forecast.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to choose the strategy, seed, clamp bounds and narrative service.");
    Ok(())
}

/// Initialize logging; `RUST_LOG` overrides the verbosity flags.
fn init_logging(args: &Args) -> Result<()> {
    let level = args.log_level();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {:#}", e);
            Ok(Config::default())
        }
    }
}

/// Build the narrative service if enabled. A client that cannot be built
/// disables narration instead of failing the run.
fn build_narrator(config: &Config) -> Option<Arc<dyn NarrativeService>> {
    if !config.narrative.enabled {
        return None;
    }

    match OllamaNarrator::new(config.narrator_config()) {
        Ok(narrator) => Some(Arc::new(narrator) as Arc<dyn NarrativeService>),
        Err(e) => {
            warn!("Narrative service unavailable, using templated text: {}", e);
            None
        }
    }
}

/// Run the forecast workflow.
async fn run(args: Args) -> Result<()> {
    let start_time = Instant::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate().context("Invalid configuration")?;

    let input = args
        .input
        .clone()
        .ok_or_else(|| anyhow!("--input is required"))?;

    let batch_output = args.output.clone().unwrap_or_else(|| PathBuf::from("reports"));
    let scanner = DatasetScanner::new(ScanConfig {
        exclude_paths: vec![batch_output.clone()],
        ..ScanConfig::default()
    });
    let files = scanner.scan(&input)?;
    let narrator = build_narrator(&config);

    if input.is_file() {
        let mut output = PathBuf::from(&config.general.output);
        if args.output.is_none() {
            output.set_extension(config.report.format.extension());
        }
        let file = files
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No dataset at {}", input.display()))?;
        run_single(&config, file, &output, narrator).await?;
    } else {
        run_batch(&config, files, &batch_output, narrator, args.quiet).await?;
    }

    println!("   Duration: {:.1}s", start_time.elapsed().as_secs_f64());
    Ok(())
}

/// Forecast one dataset on a blocking thread, then narrate it.
async fn forecast(
    config: &Config,
    file: DatasetFile,
    seed: u64,
    narrator: Option<Arc<dyn NarrativeService>>,
) -> Result<(DatasetFile, ReportEnvelope)> {
    let mut options = config.pipeline_options();
    options.seed = seed;

    let path = file.path.clone();
    let (file, mut report) = tokio::task::spawn_blocking(move || {
        let report = run_pipeline(&file.load(), options);
        (file, report)
    })
    .await
    .with_context(|| format!("Forecast task for {} panicked", path.display()))?;

    apply_narrative(&mut report, narrator.as_deref()).await;
    Ok((file, report))
}

async fn run_single(
    config: &Config,
    file: DatasetFile,
    output: &Path,
    narrator: Option<Arc<dyn NarrativeService>>,
) -> Result<()> {
    println!("🌍 Forecasting {}", file.path.display());
    let (_, report) = forecast(config, file, config.prediction.seed, narrator).await?;

    save_report(&report, config.report.format, output)?;
    print_summary(&report);
    println!("\n✅ Report saved to: {}", output.display());
    Ok(())
}

async fn run_batch(
    config: &Config,
    files: Vec<DatasetFile>,
    output_dir: &Path,
    narrator: Option<Arc<dyn NarrativeService>>,
    quiet: bool,
) -> Result<()> {
    if files.is_empty() {
        warn!("No datasets found");
        println!("   No emission datasets found.");
        return Ok(());
    }

    println!(
        "🌍 Forecasting {} datasets ({} at a time)",
        files.len(),
        config.general.concurrency
    );

    let progress = if quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .context("Invalid progress template")?
                .progress_chars("#>-"),
        );
        pb
    };

    let base_seed = config.prediction.seed;
    let format = config.report.format;

    let mut results = stream::iter(files.into_iter().enumerate().map(|(index, file)| {
        let narrator = narrator.clone();
        forecast(config, file, base_seed.wrapping_add(index as u64), narrator)
    }))
    .buffer_unordered(config.general.concurrency);

    let mut written = 0usize;
    let mut failed = 0usize;
    while let Some(result) = results.next().await {
        match result.and_then(|(file, report)| {
            let path = file.report_path(output_dir, format.extension());
            save_report(&report, format, &path)?;
            Ok(file)
        }) {
            Ok(file) => {
                written += 1;
                progress.set_message(file.relative.display().to_string());
            }
            Err(e) => {
                failed += 1;
                warn!("{:#}", e);
            }
        }
        progress.inc(1);
    }
    progress.finish_with_message("done");

    println!("\n📊 Batch Summary:");
    println!("   Reports written: {}", written);
    if failed > 0 {
        println!("   Failed: {}", failed);
    }
    println!("\n✅ Reports saved to: {}", output_dir.display());
    Ok(())
}

fn save_report(report: &ReportEnvelope, format: ReportFormat, path: &Path) -> Result<()> {
    match format {
        ReportFormat::Markdown => write_report(report, path),
        ReportFormat::Json => write_json_report(report, path),
    }
    .with_context(|| format!("Failed to write report to {}", path.display()))
}

fn print_summary(report: &ReportEnvelope) {
    let forecast = &report.future_predictions.summary;

    println!("\n📊 Forecast Summary:");
    println!("   Model: {}", forecast.strategy);
    println!(
        "   Factories: {} in {} regions",
        forecast.factory_count, forecast.region_count
    );
    println!("   Current: {:.2} t CO2e", forecast.current_emissions_ton);
    println!(
        "   {}: {:.2} t CO2e ({:+.2}%)",
        forecast.target_year, forecast.predicted_emissions_ton, forecast.emission_change_percent
    );
    println!("   Narrative: {}", report.metadata.narrative_source);
}
