use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};
use clap::{Parser, Subcommand};
use tracing::info;

use sales_dashboard::analysis::{AnalysisReport, analyze};
use sales_dashboard::cleaning::{CleaningOptions, clean};
use sales_dashboard::config::PipelineConfig;
use sales_dashboard::dashboard::write_dashboard;
use sales_dashboard::data_generation::GeneratorConfig;
use sales_dashboard::data_ingestion::{open_file, read_cleaned_orders, write_cleaned_orders};
use sales_dashboard::export::export_report;
use sales_dashboard::generate_mock_data;
use sales_dashboard::model::CleanedOrderLine;

/// Synthetic e-commerce sales pipeline: generate, clean, analyze, report
#[derive(Parser, Debug)]
#[command(name = "sales-dashboard")]
struct Cli {
    /// TOML file with pipeline settings
    #[arg(short, long, env = "SALES_DASHBOARD_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a raw order table with injected blanks and duplicates
    Generate {
        #[arg(short, long)]
        records: Option<usize>,
        #[arg(short, long)]
        seed: Option<u64>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Clean a raw order table
    Clean {
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compute and export every summary view of a cleaned table
    Analyze {
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(long)]
        output_dir: Option<PathBuf>,
        #[arg(long)]
        top_n: Option<usize>,
    },

    /// Render the HTML dashboard from a cleaned table
    Dashboard {
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate, clean, analyze and render in one go
    Run,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    let now = Local::now().naive_local();

    match cli.command {
        Commands::Generate {
            records,
            seed,
            output,
        } => {
            config.num_records = records.unwrap_or(config.num_records);
            config.seed = seed.unwrap_or(config.seed);
            config.raw_path = output.unwrap_or(config.raw_path);
            cmd_generate(&config, now)
        }
        Commands::Clean { input, output } => {
            config.raw_path = input.unwrap_or(config.raw_path);
            config.cleaned_path = output.unwrap_or(config.cleaned_path);
            cmd_clean(&config, now).map(|_| ())
        }
        Commands::Analyze {
            input,
            output_dir,
            top_n,
        } => {
            config.cleaned_path = input.unwrap_or(config.cleaned_path);
            config.output_dir = output_dir.unwrap_or(config.output_dir);
            config.top_n = top_n.unwrap_or(config.top_n);
            let lines = load_cleaned(&config)?;
            cmd_analyze(&config, &lines).map(|_| ())
        }
        Commands::Dashboard { input, output } => {
            config.cleaned_path = input.unwrap_or(config.cleaned_path);
            config.dashboard_path = output.unwrap_or(config.dashboard_path);
            let lines = load_cleaned(&config)?;
            let report = analyze(&lines, config.top_n);
            cmd_dashboard(&config, &report, now)
        }
        Commands::Run => {
            cmd_generate(&config, now)?;
            let lines = cmd_clean(&config, now)?;
            let report = cmd_analyze(&config, &lines)?;
            cmd_dashboard(&config, &report, now)
        }
    }
}

fn cmd_generate(config: &PipelineConfig, now: NaiveDateTime) -> Result<()> {
    let generator = GeneratorConfig {
        num_records: config.num_records,
        seed: config.seed,
        missing_rate: config.missing_rate,
        duplicate_rate: config.duplicate_rate,
        history_days: config.history_days,
        as_of: now,
    };
    generate_mock_data(&config.raw_path, &generator).with_context(|| {
        format!("Failed to generate data: {}", config.raw_path.display())
    })?;
    Ok(())
}

fn cmd_clean(config: &PipelineConfig, now: NaiveDateTime) -> Result<Vec<CleanedOrderLine>> {
    let raw = open_file(&config.raw_path)
        .with_context(|| format!("Failed to load raw data: {}", config.raw_path.display()))?;
    let options = CleaningOptions {
        as_of: now,
        outlier_sigma: config.outlier_sigma,
    };
    let table = clean(&raw, &options).context("Cleaning failed")?;
    write_cleaned_orders(&config.cleaned_path, &table.lines).with_context(|| {
        format!("Failed to save cleaned data: {}", config.cleaned_path.display())
    })?;
    Ok(table.lines)
}

fn load_cleaned(config: &PipelineConfig) -> Result<Vec<CleanedOrderLine>> {
    read_cleaned_orders(&config.cleaned_path).with_context(|| {
        format!("Failed to load cleaned data: {}", config.cleaned_path.display())
    })
}

fn cmd_analyze(config: &PipelineConfig, lines: &[CleanedOrderLine]) -> Result<AnalysisReport> {
    let report = analyze(lines, config.top_n);
    export_report(&report, &config.output_dir).with_context(|| {
        format!("Failed to export analysis: {}", config.output_dir.display())
    })?;

    let totals = &report.totals;
    info!(
        revenue = totals.total_revenue,
        orders = totals.total_orders,
        aov = totals.average_order_value,
        products_sold = totals.total_products_sold,
        "analysis complete"
    );
    Ok(report)
}

fn cmd_dashboard(
    config: &PipelineConfig,
    report: &AnalysisReport,
    now: NaiveDateTime,
) -> Result<()> {
    write_dashboard(report, now, &config.dashboard_path).with_context(|| {
        format!("Failed to write dashboard: {}", config.dashboard_path.display())
    })
}
