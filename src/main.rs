//! vaxflow CLI: generate data, train the demand and waste-risk models, and
//! evaluate distribution strategies.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vaxflow::config::PipelineConfig;
use vaxflow::data::{AreaRecord, FieldMap};
use vaxflow::export;
use vaxflow::strategy::batch::BatchReport;
use vaxflow::strategy::StrategyEngine;
use vaxflow::synthetic::SyntheticGenerator;
use vaxflow::trainer::{DualModelTrainer, TrainedPipeline};

#[derive(Parser)]
#[command(name = "vaxflow")]
#[command(about = "Vaccine demand forecasting and waste-risk strategy engine")]
#[command(version)]
struct Cli {
    /// JSON configuration file; absent fields keep their defaults
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Seed for synthetic data (overrides the configuration)
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a labeled synthetic dataset
    Generate {
        /// Number of areas (defaults to the configuration)
        #[arg(short, long)]
        samples: Option<usize>,

        /// Output CSV file
        #[arg(short, long, default_value = "vaccine_data.csv")]
        output: PathBuf,
    },

    /// Train both models and report held-out metrics
    Train {
        /// Write metrics and feature importance as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Train, then evaluate one area
    Strategy {
        /// Area as a JSON object keyed by feature name
        #[arg(short, long)]
        area: Option<String>,
    },

    /// Train, then evaluate every area in a CSV file
    Batch {
        /// Input CSV with one area per row (defaults to 10 synthetic areas)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output CSV for per-row results
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

type BoxResult<T> = Result<T, Box<dyn std::error::Error>>;
type CliResult = BoxResult<()>;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = load_config(cli.config.as_deref(), cli.seed).and_then(|config| {
        match cli.command {
            Commands::Generate { samples, output } => cmd_generate(&config, samples, &output),
            Commands::Train { json } => cmd_train(&config, json.as_deref()),
            Commands::Strategy { area } => cmd_strategy(&config, area.as_deref()),
            Commands::Batch { input, output } => {
                cmd_batch(&config, input.as_deref(), output.as_deref())
            }
        }
    });

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "vaxflow=debug" } else { "vaxflow=info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(path: Option<&Path>, seed: Option<u64>) -> BoxResult<PipelineConfig> {
    let mut config = match path {
        Some(p) => PipelineConfig::from_json_file(p)?,
        None => PipelineConfig::default(),
    };
    if let Some(s) = seed {
        config.generator.seed = s;
    }
    Ok(config)
}

fn train(config: &PipelineConfig) -> BoxResult<TrainedPipeline> {
    let generator = SyntheticGenerator::new(config.generator.clone());
    let df = generator.generate(config.generator.n_samples, config.generator.seed)?;
    Ok(DualModelTrainer::new(config.trainer).train(&df)?)
}

fn cmd_generate(config: &PipelineConfig, samples: Option<usize>, output: &Path) -> CliResult {
    let n = samples.unwrap_or(config.generator.n_samples);
    let generator = SyntheticGenerator::new(config.generator.clone());
    let df = generator.generate(n, config.generator.seed)?;
    export::write_dataset_csv(&df, output)?;

    println!("Generated {n} areas -> {}", output.display());
    println!();
    println!("{:<18} {:>12} {:>12} {:>12} {:>12}", "Column", "Mean", "Std", "Min", "Max");
    for stats in df.describe() {
        println!(
            "{:<18} {:>12.3} {:>12.3} {:>12.3} {:>12.3}",
            stats.name, stats.mean, stats.std, stats.min, stats.max
        );
    }
    Ok(())
}

fn cmd_train(config: &PipelineConfig, json: Option<&Path>) -> CliResult {
    let pipeline = train(config)?;
    let metrics = pipeline.metrics();
    let importance = pipeline.feature_importance();

    println!("Demand model");
    println!("  RMSE: {:.2}", metrics.demand_rmse);
    println!("  MAE:  {:.2}", metrics.demand_mae);
    println!("  R²:   {:.4}", metrics.demand_r2);
    println!();
    println!("Waste-risk model");
    println!("  Accuracy: {:.4}", metrics.risk_accuracy);
    println!();
    println!("{}", metrics.risk_report);
    println!("Confusion matrix (rows = true Low/Medium/High)");
    for i in 0..metrics.confusion_matrix.n_rows() {
        let row: Vec<String> = metrics
            .confusion_matrix
            .row_slice(i)
            .iter()
            .map(|c| format!("{c:>6}"))
            .collect();
        println!("{}", row.join(""));
    }
    println!();
    println!("{:<18} {:>10} {:>10}", "Feature", "Demand", "Waste");
    for row in &importance {
        println!(
            "{:<18} {:>10.4} {:>10.4}",
            row.feature.name(),
            row.demand_importance,
            row.waste_importance
        );
    }

    if let Some(path) = json {
        let report = serde_json::json!({
            "metrics": metrics,
            "feature_importance": importance,
        });
        std::fs::write(path, serde_json::to_string_pretty(&report)?)?;
        println!();
        println!("Report written to {}", path.display());
    }
    Ok(())
}

fn cmd_strategy(config: &PipelineConfig, area: Option<&str>) -> CliResult {
    let record = match area {
        Some(text) => AreaRecord::from_mapping(&serde_json::from_str::<FieldMap>(text)?)?,
        None => AreaRecord::from_array([150_000.0, 0.35, 2500.0, 3.5, 75.0, 0.85, 45.0]),
    };
    let pipeline = train(config)?;
    let engine = StrategyEngine::new().with_demand_threshold(config.demand_threshold);
    let result = engine.evaluate(&record, pipeline.processor(), pipeline.models())?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    println!();
    for code in &result.recommendations {
        println!("  - {code}");
    }
    Ok(())
}

fn cmd_batch(config: &PipelineConfig, input: Option<&Path>, output: Option<&Path>) -> CliResult {
    let rows: Vec<FieldMap> = match input {
        Some(path) => export::read_areas_csv(path)?,
        None => SyntheticGenerator::new(config.generator.clone())
            .generate_areas(10, config.generator.seed.wrapping_add(1))?
            .iter()
            .map(AreaRecord::to_mapping)
            .collect(),
    };
    let pipeline = train(config)?;
    let engine = StrategyEngine::new().with_demand_threshold(config.demand_threshold);
    let results = engine.evaluate_batch(&rows, pipeline.processor(), pipeline.models());

    println!(
        "{:>7} {:>16} {:>10} {:>10}",
        "Area_ID", "Predicted_Demand", "Waste_Risk", "Confidence"
    );
    for row in &results {
        match row.summary() {
            Some(s) => println!(
                "{:>7} {:>16.2} {:>10} {:>10.4}",
                s.area_id,
                s.predicted_demand,
                s.waste_risk.label(),
                s.confidence
            ),
            None => {
                if let Err(e) = &row.outcome {
                    println!("{:>7} failed: {e}", row.area_id);
                }
            }
        }
    }

    let report = BatchReport::aggregate(&results);
    println!();
    println!(
        "{} evaluated, {} failed, total demand {:.2}",
        report.evaluated, report.failed, report.total_predicted_demand
    );

    if let Some(path) = output {
        export::write_batch_csv(&results, path)?;
    }
    Ok(())
}
