//! Ingredisense - Main CLI Entry Point

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use colored::{ColoredString, Colorize};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use ingredisense::{
    cli::{Args, Commands, Verbosity},
    config::Config,
    decision::{GREEN, RED},
    doctor::Doctor,
    pipeline::Pipeline,
    telemetry::TelemetryDisplay,
    AnalysisResult,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load(args.config.as_deref()).context("failed to load configuration")?;
    config.validate()?;

    let verbosity = if args.quiet || args.verbose > 0 {
        args.verbosity()
    } else {
        Verbosity::from_name(&config.telemetry.default_verbosity).unwrap_or(Verbosity::Normal)
    };
    init_logging(verbosity);

    match &args.command {
        Commands::Analyze { image, health, json } => {
            run_analysis(&config, verbosity, image, health, *json).await?;
        }
        Commands::Category { brand } => {
            run_category(&config, brand).await?;
        }
        Commands::Doctor => {
            run_doctor(&config).await;
        }
        Commands::Config => {
            show_config(&config, args.config.as_deref())?;
        }
    }

    Ok(())
}

fn init_logging(verbosity: Verbosity) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn run_analysis(
    config: &Config,
    verbosity: Verbosity,
    image: &Path,
    health: &str,
    json: bool,
) -> Result<()> {
    let pipeline = Pipeline::from_config(config)?;

    let spinner = if verbosity.show_progress() && !json {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("Analyzing {}...", image.display()));
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    } else {
        None
    };

    let outcome = pipeline.analyze(image, health).await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    let result = match outcome {
        Ok(result) => result,
        Err(e) => {
            eprintln!("{} {}", "❌".red(), e.to_string().as_str().red());
            eprintln!("\nTry a sharper photo with the ingredient list in frame.");
            std::process::exit(1);
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_advisory(&result);
    }

    let display = TelemetryDisplay::new(pipeline.telemetry().clone(), verbosity);
    if config.telemetry.show_summary && display.should_show_details() {
        display.display_summary();

        if verbosity == Verbosity::VeryVerbose {
            for event in pipeline.telemetry().recent_events(20) {
                eprintln!("  {:?}", event);
            }
        }
    }

    Ok(())
}

fn print_advisory(result: &AnalysisResult) {
    let badge = decision_badge(&result.decision_color);

    println!();
    println!("{} {}", badge, result.brand_name.bold());
    println!("{}", "─".repeat(50));
    println!("{}", result.final_conversational_insight);
    println!();

    if !result.product_alternatives.is_empty() {
        println!("{}", "🛒 Alternatives".bold());
        for alternative in &result.product_alternatives {
            println!("  • {}", alternative);
        }
        println!();
    }
}

fn decision_badge(color: &str) -> ColoredString {
    if color.eq_ignore_ascii_case(RED) {
        "● SKIP".red().bold()
    } else if color.eq_ignore_ascii_case(GREEN) {
        "● OK".green().bold()
    } else {
        "● CAUTION".yellow().bold()
    }
}

async fn run_category(config: &Config, brand: &str) -> Result<()> {
    let pipeline = Pipeline::from_config(config)?;
    let category = pipeline.classifier().classify(brand).await;
    println!("{} ({})", category.tag, category.provenance);
    Ok(())
}

async fn run_doctor(config: &Config) {
    let checks = Doctor::new(config).run_diagnostics().await;
    Doctor::display_results(&checks);
    std::process::exit(if Doctor::overall_status(&checks) { 0 } else { 1 });
}

fn show_config(config: &Config, explicit: Option<&Path>) -> Result<()> {
    let location = explicit
        .map(Path::to_path_buf)
        .or_else(Config::default_path)
        .filter(|path| path.exists());

    match location {
        Some(path) => println!("# Loaded from {}", path.display()),
        None => println!("# Built-in defaults"),
    }
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
