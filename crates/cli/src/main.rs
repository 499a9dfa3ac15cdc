//! Employee retention toolkit command line interface
//!
//! Runs the batch pipeline (`etl`, `train`) and the per-employee analysis
//! (`analyze`, `inspect`) against the artifacts named in the configuration.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use retention_core::config::{ConfigOverrides, RetentionConfig};
use retention_core::{analyze_profile, render_text, AnalysisContext, EmployeeProfile};
use retention_etl::{DatasetSource, EtlError, EtlPipeline, LocalFileSource};
use retention_trainer::{write_artifacts, ArtifactPaths, Dataset, GbdtConfig, GbdtTrainer};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "retention")]
#[command(about = "Employee attrition risk analysis", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract, clean and snapshot the raw HR dataset
    Etl(EtlCommand),
    /// Train the attrition model from the cleaned snapshot
    Train(TrainCommand),
    /// Score one employee and explain the result
    Analyze(AnalyzeCommand),
    /// Show the loaded model and schema
    Inspect,
}

#[derive(Args)]
struct EtlCommand {
    /// Directory holding hr_raw.csv
    #[arg(long, value_name = "PATH")]
    raw_dir: Option<PathBuf>,
    /// Directory the snapshot is written to
    #[arg(long, value_name = "PATH")]
    processed_dir: Option<PathBuf>,
    /// Local CSV export to copy in when hr_raw.csv is absent
    #[arg(long, value_name = "PATH")]
    source: Option<PathBuf>,
}

#[derive(Args, Default)]
struct TrainCommand {
    /// Cleaned snapshot (defaults to the ETL output)
    #[arg(short, long, value_name = "PATH")]
    input: Option<PathBuf>,
    /// Output directory for model, hash and columns (default: the configured artifact paths)
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,
    #[arg(long)]
    n_estimators: Option<usize>,
    #[arg(long)]
    max_depth: Option<usize>,
    #[arg(long)]
    learning_rate: Option<f64>,
    #[arg(long)]
    subsample: Option<f64>,
    /// Weight of employees who left
    #[arg(long)]
    positive_weight: Option<f64>,
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args, Default)]
struct AnalyzeCommand {
    /// Employee profile (.toml or .json); flags below override its fields
    #[arg(long, value_name = "PATH")]
    profile: Option<PathBuf>,
    /// Print the report as JSON
    #[arg(long)]
    json: bool,
    #[arg(long)]
    age: Option<i64>,
    #[arg(long)]
    department: Option<String>,
    #[arg(long)]
    job_role: Option<String>,
    #[arg(long)]
    job_level: Option<i64>,
    #[arg(long)]
    marital_status: Option<String>,
    /// Yes or No
    #[arg(long)]
    overtime: Option<String>,
    #[arg(long)]
    monthly_income: Option<i64>,
    #[arg(long)]
    stock_option_level: Option<i64>,
    #[arg(long)]
    distance_from_home: Option<i64>,
    #[arg(long)]
    total_working_years: Option<i64>,
    #[arg(long)]
    years_at_company: Option<i64>,
    #[arg(long)]
    years_since_last_promotion: Option<i64>,
    #[arg(long)]
    environment_satisfaction: Option<i64>,
    #[arg(long)]
    job_satisfaction: Option<i64>,
    #[arg(long)]
    work_life_balance: Option<i64>,
    #[arg(long)]
    job_involvement: Option<i64>,
}

/// Source used when no export is configured; only succeeds if hr_raw.csv
/// is already in place
struct NoSource;

impl DatasetSource for NoSource {
    fn name(&self) -> &str {
        "none"
    }

    fn fetch(&self, _dest_dir: &Path) -> retention_etl::Result<()> {
        Err(EtlError::Source {
            source_name: self.name().to_string(),
            reason: "no --source given and none configured".to_string(),
        })
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, overrides) = load_config(cli.config.as_deref())?;
    init_logging(cli.verbose, &config.logging.level)?;

    match &cli.config {
        Some(path) => info!("Loaded configuration from: {}", path.display()),
        None => info!("Using default configuration"),
    }
    if !overrides.applied.is_empty() {
        info!("Applied configuration overrides: {:?}", overrides.applied);
    }
    for ignored in &overrides.ignored {
        warn!("Ignoring unparsable override {}", ignored);
    }
    for warning in config.validate() {
        warn!("Config: {}", warning);
    }

    match cli.command {
        Commands::Etl(cmd) => handle_etl(cmd, &config),
        Commands::Train(cmd) => handle_train(cmd, &config),
        Commands::Analyze(cmd) => handle_analyze(cmd, &config),
        Commands::Inspect => handle_inspect(&config),
    }
}

/// Read the config file (or defaults) and apply `RETENTION_*` overrides
///
/// Runs before logging is set up, so it logs nothing itself.
fn load_config(path: Option<&Path>) -> Result<(RetentionConfig, ConfigOverrides)> {
    let mut config = match path {
        Some(path) => RetentionConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => RetentionConfig::default(),
    };
    let overrides = config.apply_env_overrides();
    Ok((config, overrides))
}

/// `--verbose` wins, then `RUST_LOG`, then the configured level
fn init_logging(verbose: bool, level: &str) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };

    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

fn handle_etl(cmd: EtlCommand, config: &RetentionConfig) -> Result<()> {
    let mut pipeline = EtlPipeline::from_config(&config.etl);
    if let Some(raw_dir) = cmd.raw_dir {
        pipeline.raw_dir = raw_dir;
    }
    if let Some(processed_dir) = cmd.processed_dir {
        pipeline.processed_dir = processed_dir;
    }

    let summary = match cmd.source.or_else(|| config.etl.source.clone()) {
        Some(path) => pipeline.run(&LocalFileSource::new(path)),
        None => pipeline.run(&NoSource),
    }
    .context("ETL pipeline failed")?;

    println!(
        "Snapshot written to {} ({} rows, {} columns)",
        summary.snapshot_path.display(),
        summary.rows,
        summary.columns
    );
    Ok(())
}

fn handle_train(cmd: TrainCommand, config: &RetentionConfig) -> Result<()> {
    let input = cmd
        .input
        .unwrap_or_else(|| EtlPipeline::from_config(&config.etl).snapshot_path());
    let paths = match cmd.output {
        Some(dir) => ArtifactPaths::in_dir(dir),
        None => ArtifactPaths::from(&config.artifacts),
    };

    let mut params = GbdtConfig::from(&config.training);
    if let Some(n) = cmd.n_estimators {
        params.n_estimators = n;
    }
    if let Some(depth) = cmd.max_depth {
        params.max_depth = depth;
    }
    if let Some(lr) = cmd.learning_rate {
        params.learning_rate = lr;
    }
    if let Some(subsample) = cmd.subsample {
        params.subsample = subsample;
    }
    if let Some(weight) = cmd.positive_weight {
        params.positive_weight = weight;
    }
    if let Some(seed) = cmd.seed {
        params.seed = seed;
    }

    info!("Retention GBDT Trainer v{}", retention_trainer::VERSION);
    info!("Loading dataset from: {}", input.display());
    let dataset = Dataset::from_snapshot(&input).context("Failed to load dataset")?;
    info!(
        "Loaded {} samples with {} features ({:.1}% attrition)",
        dataset.len(),
        dataset.feature_count(),
        dataset.positive_rate() * 100.0
    );
    for stats in dataset.feature_stats() {
        tracing::debug!("  {}: min={}, max={}", stats.name, stats.min, stats.max);
    }

    info!("Training configuration:");
    info!("  Trees: {}", params.n_estimators);
    info!("  Max depth: {}", params.max_depth);
    info!("  Learning rate: {}", params.learning_rate);
    info!("  Subsample: {}", params.subsample);
    info!("  Positive weight: {}", params.positive_weight);
    info!("  Seed: {}", params.seed);

    let trainer = GbdtTrainer::new(params);
    let model = trainer.train(&dataset)?;
    let report = trainer.evaluate(&model, &dataset);
    info!(
        "Training fit: log loss {:.4}, accuracy {:.3}, recall {:.3}",
        report.log_loss, report.accuracy, report.recall
    );

    let artifacts = write_artifacts(&model, &dataset.registry, &paths)?;
    println!("Model: {}", artifacts.model_path.display());
    println!("Columns: {}", artifacts.schema_path.display());
    println!("Hash: {} ({})", artifacts.hash_path.display(), artifacts.model_hash);
    Ok(())
}

fn handle_analyze(cmd: AnalyzeCommand, config: &RetentionConfig) -> Result<()> {
    let profile = build_profile(&cmd)?;
    let ctx = AnalysisContext::load(config).context("Failed to load model artifacts")?;
    let report = analyze_profile(&ctx, &profile)?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_text(&report));
    }
    Ok(())
}

fn handle_inspect(config: &RetentionConfig) -> Result<()> {
    let ctx = AnalysisContext::load(config).context("Failed to load model artifacts")?;
    let model = ctx.model();

    println!("Model:        {}", config.artifacts.model_path.display());
    println!("Model hash:   {}", ctx.model_hash());
    println!("Trees:        {}", model.num_trees());
    println!("Base margin:  {:.6}", model.base_margin);
    println!("Trained rows: {}", model.metadata.training_rows);
    println!("Features:     {}", ctx.registry().len());
    println!("Fingerprint:  {}", ctx.registry().fingerprint());
    println!("Rules:        {}", ctx.knowledge_base().len());
    Ok(())
}

fn load_profile(path: &Path) -> Result<EmployeeProfile> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let profile = match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => toml::from_str(&content)?,
        Some("json") => serde_json::from_str(&content)?,
        _ => bail!("Profile must be a .toml or .json file: {}", path.display()),
    };
    Ok(profile)
}

fn build_profile(cmd: &AnalyzeCommand) -> Result<EmployeeProfile> {
    let mut profile = match &cmd.profile {
        Some(path) => load_profile(path)?,
        None => EmployeeProfile::default(),
    };

    fn set<T: Clone>(field: &mut T, value: &Option<T>) {
        if let Some(value) = value {
            *field = value.clone();
        }
    }

    set(&mut profile.age, &cmd.age);
    set(&mut profile.department, &cmd.department);
    set(&mut profile.jobrole, &cmd.job_role);
    set(&mut profile.joblevel, &cmd.job_level);
    set(&mut profile.maritalstatus, &cmd.marital_status);
    set(&mut profile.overtime, &cmd.overtime);
    set(&mut profile.monthlyincome, &cmd.monthly_income);
    set(&mut profile.stockoptionlevel, &cmd.stock_option_level);
    set(&mut profile.distancefromhome, &cmd.distance_from_home);
    set(&mut profile.totalworkingyears, &cmd.total_working_years);
    set(&mut profile.yearsatcompany, &cmd.years_at_company);
    set(&mut profile.yearssincelastpromotion, &cmd.years_since_last_promotion);
    set(&mut profile.environmentsatisfaction, &cmd.environment_satisfaction);
    set(&mut profile.jobsatisfaction, &cmd.job_satisfaction);
    set(&mut profile.worklifebalance, &cmd.work_life_balance);
    set(&mut profile.jobinvolvement, &cmd.job_involvement);

    Ok(profile)
}
