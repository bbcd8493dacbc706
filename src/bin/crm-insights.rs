//! crm-insights CLI - run the CRM analysis pipeline over a data snapshot
//!
//! ## Example Usage
//!
//! ```bash
//! # Analyse a directory of CSV exports
//! crm-insights run --data-dir ./crm --reference-date 2017-12-31
//!
//! # Read the four tables from SQLite and write JSON
//! crm-insights run --sqlite crm.db --format json --output report.json
//!
//! # Show configuration and enabled features
//! crm-insights info
//! ```

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use crm_insights::config::AnalysisConfig;
use crm_insights::data::{CsvTableProvider, TableProvider};
use crm_insights::pipeline::{AnalysisReport, CrmPipeline};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;

/// crm-insights: batch CRM analytics
#[derive(Parser)]
#[command(name = "crm-insights")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "RFM, churn, CLV, cohort and sales performance analytics", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the four CRM tables and run every analysis
    Run {
        /// Directory holding accounts.csv, sales_pipeline.csv, products.csv, sales_teams.csv
        #[arg(short = 'd', long)]
        data_dir: Option<PathBuf>,

        /// SQLite database holding the four tables
        #[arg(long, conflicts_with = "data_dir")]
        sqlite: Option<PathBuf>,

        /// Date recency is measured from (YYYY-MM-DD, default: today)
        #[arg(short = 'r', long)]
        reference_date: Option<String>,

        /// Days without a purchase before an account counts as churned
        #[arg(long)]
        churn_threshold: Option<i64>,

        /// Customer lifespan in years for CLV
        #[arg(long)]
        lifespan: Option<f64>,

        /// Output format
        #[arg(short = 'f', long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Write the report to a file instead of stdout
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },

    /// Show configuration and enabled features
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Configuration file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Config {
    /// Default CSV directory
    #[serde(default)]
    data_dir: Option<PathBuf>,
    /// Default SQLite database
    #[serde(default)]
    sqlite: Option<PathBuf>,
    #[serde(default)]
    analysis: AnalysisConfig,
}

fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".crm-insights").join("config.toml"))
}

impl Config {
    fn load(path: Option<&Path>) -> Self {
        let path = match path.map(Path::to_path_buf).or_else(default_config_path) {
            Some(p) if p.exists() => p,
            _ => return Config::default(),
        };

        match fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => return config,
                Err(e) => eprintln!("{} Failed to parse config: {}", "Warning:".yellow(), e),
            },
            Err(e) => eprintln!("{} Failed to read config: {}", "Warning:".yellow(), e),
        }
        Config::default()
    }
}

struct RunConfig {
    data_dir: Option<PathBuf>,
    sqlite: Option<PathBuf>,
    reference_date: Option<String>,
    churn_threshold: Option<i64>,
    lifespan: Option<f64>,
    format: OutputFormat,
    output: Option<PathBuf>,
    verbose: bool,
    config: Config,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref());

    if cli.verbose {
        println!(
            "{} v{}",
            "crm-insights".cyan().bold(),
            env!("CARGO_PKG_VERSION")
        );
    }

    let result = match cli.command {
        Commands::Run {
            data_dir,
            sqlite,
            reference_date,
            churn_threshold,
            lifespan,
            format,
            output,
        } => run_analysis(RunConfig {
            data_dir,
            sqlite,
            reference_date,
            churn_threshold,
            lifespan,
            format,
            output,
            verbose: cli.verbose,
            config,
        }),
        Commands::Info => show_info(cli.config.as_deref(), &config),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

fn analysis_config(cfg: &RunConfig) -> Result<AnalysisConfig> {
    let mut analysis = cfg.config.analysis.clone();
    if let Some(date) = &cfg.reference_date {
        let parsed = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .with_context(|| format!("invalid reference date '{}', expected YYYY-MM-DD", date))?;
        analysis.reference_date = Some(parsed);
    }
    if let Some(days) = cfg.churn_threshold {
        analysis.churn_threshold_days = days;
    }
    if let Some(years) = cfg.lifespan {
        analysis.customer_lifespan_years = years;
    }
    Ok(analysis)
}

fn provider(cfg: &RunConfig) -> Result<Box<dyn TableProvider>> {
    let sqlite = cfg.sqlite.clone().or_else(|| {
        cfg.data_dir
            .is_none()
            .then(|| cfg.config.sqlite.clone())
            .flatten()
    });

    if let Some(path) = sqlite {
        return sqlite_provider(&path);
    }
    match cfg.data_dir.clone().or_else(|| cfg.config.data_dir.clone()) {
        Some(dir) => Ok(Box::new(CsvTableProvider::new(dir))),
        None => bail!("no data source: pass --data-dir or --sqlite, or set one in the config file"),
    }
}

#[cfg(feature = "rusqlite-support")]
fn sqlite_provider(path: &Path) -> Result<Box<dyn TableProvider>> {
    Ok(Box::new(crm_insights::data::SqliteTableProvider::new(path)))
}

#[cfg(not(feature = "rusqlite-support"))]
fn sqlite_provider(_path: &Path) -> Result<Box<dyn TableProvider>> {
    bail!("SQLite support not compiled in (enable the rusqlite-support feature)")
}

fn run_analysis(cfg: RunConfig) -> Result<()> {
    let start = Instant::now();
    let pipeline = CrmPipeline::new(analysis_config(&cfg)?)?;
    let provider = provider(&cfg)?;

    if cfg.verbose {
        println!("{} {}", "Source:".bold(), provider.describe());
    }

    let report = pipeline
        .run_with(provider.as_ref())
        .context("failed to load CRM tables")?;

    let rendered = match cfg.format {
        OutputFormat::Json => serde_json::to_string_pretty(&report)?,
        OutputFormat::Text => render_text(&report, cfg.output.is_none()),
    };

    match &cfg.output {
        Some(path) => {
            fs::write(path, rendered)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("{} {}", "Report written to".green(), path.display());
        }
        None => print!("{}", rendered),
    }

    if cfg.verbose {
        let (completed, skipped, failed) = report.status_counts();
        println!(
            "{} {} completed, {} skipped, {} failed in {:.2?}",
            "Stages:".bold(),
            completed.to_string().green(),
            skipped.to_string().yellow(),
            failed.to_string().red(),
            start.elapsed()
        );
    }
    Ok(())
}

fn render_text(report: &AnalysisReport, color: bool) -> String {
    let mut out = String::new();
    let title = format!("CRM Analysis Report ({})", report.reference_date);
    out.push_str(&format!("{}\n", if color { title.cyan().bold().to_string() } else { title }));

    for (heading, body) in report.sections() {
        let underline = "=".repeat(heading.len());
        if color {
            out.push_str(&format!("\n{}\n{}\n", heading.bold(), underline.dimmed()));
        } else {
            out.push_str(&format!("\n{}\n{}\n", heading, underline));
        }
        out.push_str(&body);
    }

    out.push_str(&format!("\nStages\n======\n{}", report.status_table()));
    out
}

fn show_info(config_path: Option<&Path>, config: &Config) -> Result<()> {
    println!(
        "{} {}",
        "crm-insights".cyan().bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("{}", env!("CARGO_PKG_DESCRIPTION"));
    println!();

    let path = config_path.map(Path::to_path_buf).or_else(default_config_path);
    println!("{}", "Configuration".bold());
    println!("{}", "=============".dimmed());
    match path {
        Some(p) => println!(
            "  {} {}{}",
            "Config file:".bold(),
            p.display(),
            if p.exists() { "" } else { " (not found, using defaults)" }
        ),
        None => println!("  {} none", "Config file:".bold()),
    }
    let show = |p: &Option<PathBuf>| p.as_ref().map_or("-".to_string(), |p| p.display().to_string());
    println!("  {} {}", "Data directory:".bold(), show(&config.data_dir));
    println!("  {} {}", "SQLite database:".bold(), show(&config.sqlite));

    let analysis = &config.analysis;
    println!(
        "  {} {}",
        "Reference date:".bold(),
        analysis
            .reference_date
            .map_or("today".to_string(), |d| d.to_string())
    );
    println!("  {} {} days", "Churn threshold:".bold(), analysis.churn_threshold_days);
    println!("  {} {} years", "Customer lifespan:".bold(), analysis.customer_lifespan_years);
    println!("  {} {}", "Significance level:".bold(), analysis.significance_level);
    println!("  {} > {}", "Regression rows:".bold(), analysis.min_regression_rows);
    println!();

    println!("{}", "Features".bold());
    println!("{}", "========".dimmed());
    println!(
        "  {} {}",
        "SQLite source:".bold(),
        feature_status(cfg!(feature = "rusqlite-support"))
    );
    println!("  {} {}", "CLI tools:".bold(), feature_status(cfg!(feature = "cli")));
    Ok(())
}

fn feature_status(enabled: bool) -> colored::ColoredString {
    if enabled {
        "enabled".green()
    } else {
        "disabled".dimmed()
    }
}
