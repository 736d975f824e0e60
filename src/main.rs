use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use price_analyzer::config::{AnalyzerConfig, InputFormat, OutputFormat};
use price_analyzer::{charts, loader, run_sweep, ui, writer};

/// Recommend selling prices from historical transactions
#[derive(Parser)]
#[command(name = "price-analyzer")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "price_analyzer.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the sensitivity sweep and write the results table
    Run {
        /// Transactions file (overrides config)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Input format (overrides config)
        #[arg(long)]
        input_format: Option<InputFormat>,

        /// Results file (overrides config)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Results format (overrides config)
        #[arg(short, long)]
        format: Option<OutputFormat>,

        /// Directory for per-product chart data
        #[arg(long)]
        charts: Option<PathBuf>,

        /// Analyse products in parallel
        #[arg(long)]
        parallel: bool,
    },

    /// Open the interactive viewer
    View {
        /// Transactions file (overrides config)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Validate configuration and print the effective values
    Check,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AnalyzerConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?
        .with_env_override();
    if cli.verbose {
        config.log_level = "debug".to_string();
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Run {
            input,
            input_format,
            output,
            format,
            charts,
            parallel,
        } => {
            if let Some(path) = input {
                config.input.path = path;
            }
            if let Some(f) = input_format {
                config.input.format = f;
            }
            if let Some(path) = output {
                config.output.path = path;
            }
            if let Some(f) = format {
                config.output.format = f;
            }
            if charts.is_some() {
                config.output.charts_dir = charts;
            }
            config.pricing.parallel |= parallel;
            config.validate()?;
            run(&config)
        }
        Commands::View { input } => {
            if let Some(path) = input {
                config.input.path = path;
            }
            config.validate()?;
            view(config)
        }
        Commands::Check => {
            config.validate()?;
            println!("{}", toml::to_string_pretty(&config)?);
            info!("configuration OK");
            Ok(())
        }
    }
}

fn run(config: &AnalyzerConfig) -> anyhow::Result<()> {
    let groups = loader::load_groups(&config.input)
        .with_context(|| format!("reading {}", config.input.path.display()))?;

    let report = run_sweep(&groups, &config.pricing);
    if report.is_empty() {
        warn!("no results produced, check the input data");
        println!("No results produced. Check the input data.");
        return Ok(());
    }

    println!("{}", writer::summary_table(&report.recommendations));
    writer::write_results(&config.output, &report.recommendations)
        .with_context(|| format!("writing {}", config.output.path.display()))?;

    if let Some(dir) = &config.output.charts_dir {
        charts::write_charts(dir, &report.charts)
            .with_context(|| format!("writing charts to {}", dir.display()))?;
    }
    Ok(())
}

fn view(config: AnalyzerConfig) -> anyhow::Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1600.0, 1000.0])
            .with_min_inner_size([1200.0, 700.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Price Analyzer",
        options,
        Box::new(|cc| {
            ui::set_custom_style(&cc.egui_ctx);
            Ok(Box::new(ui::PriceApp::new(config)))
        }),
    )
    .map_err(|e| anyhow::anyhow!("viewer failed: {e}"))
}
