//! Cafe Insights: customer segmentation and sales forecasting CLI
//!
//! This is the main entrypoint that orchestrates data loading, analysis,
//! report writing and plotting.

use anyhow::Result;
use cafe_insights::{
    assign_segment, create_decomposition_plot, create_forecast_plot, load_transactions,
    run_analysis, write_report, AnalysisConfig, Args, Metric, SalesReport,
};
use clap::Parser;
use std::path::Path;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();
    init_tracing(args.verbose);

    if args.verbose {
        println!("Cafe Insights - Customer Segmentation and Sales Forecasting");
        println!("============================================================\n");
    }

    let config = args.resolve_config()?;

    // Check if in classification mode
    if let Some((recency, frequency)) = args.parse_classify_values()? {
        run_classify_mode(&config, recency, frequency);
    } else {
        run_full_pipeline(&args, &config)?;
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("cafe_insights={}", default_level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

/// Classify a single customer from its recency and purchase frequency
fn run_classify_mode(config: &AnalysisConfig, recency: i64, frequency: Metric) {
    println!("=== Classification Mode ===");
    println!("Input: recency={} days, frequency={:.3}", recency, frequency);

    let segment = assign_segment(recency, frequency, &config.segments);
    println!("\n✓ Segment: {}", segment);

    let t = &config.segments;
    println!("\nThresholds:");
    println!(
        "  Loyal:   recency <= {} and frequency >= {}",
        t.loyal_max_recency_days, t.loyal_min_frequency
    );
    println!(
        "  Regular: recency <= {} and frequency >= {}",
        t.regular_max_recency_days, t.regular_min_frequency
    );
    println!("  Recent:  recency <= {}", t.recent_max_recency_days);
    println!("  Churned: otherwise");
}

/// Run the full analysis pipeline
fn run_full_pipeline(args: &Args, config: &AnalysisConfig) -> Result<()> {
    println!("=== Full Analysis Pipeline ===\n");

    let start_time = Instant::now();

    // Step 1: Load data
    if args.verbose {
        println!("Step 1: Loading transactions");
        println!("  Input file: {}", args.input.display());
    }

    let data_start = Instant::now();
    let transactions = load_transactions(&args.input)?;
    println!("✓ Data loaded: {} transactions", transactions.len());
    if args.verbose {
        println!("  Loading time: {:.2}s", data_start.elapsed().as_secs_f64());
    }

    // Step 2: Analysis
    if args.verbose {
        println!("\nStep 2: Running analysis");
        println!("  Forecast horizon: {} days", config.forecast.horizon_days);
        println!("  Fill missing dates: {}", config.forecast.fill_missing_dates);
    }

    let analysis_start = Instant::now();
    let report = run_analysis(&transactions, config)?;
    println!("✓ Analysis complete");
    if args.verbose {
        println!("  Analysis time: {:.2}s", analysis_start.elapsed().as_secs_f64());
    }

    print_summary(&report);

    // Step 3: Persist tables
    let written = write_report(&report, &args.output_dir)?;
    println!("\n✓ {} tables written to {}", written.len(), args.output_dir.display());
    if args.verbose {
        for path in &written {
            println!("  {}", path.display());
        }
    }

    // Step 4: Plots
    if let Some(plot_path) = &args.plot {
        create_forecast_plot(&report.history, report.forecast(), plot_path)?;
        println!("✓ Forecast plot saved to: {}", plot_path.display());

        if let Some(decomposition) = report.decomposition() {
            let components_path = components_plot_path(plot_path);
            create_decomposition_plot(decomposition, &components_path)?;
            println!("✓ Components plot saved to: {}", components_path.display());
        }
    }

    println!("\n=== Pipeline Complete ===");
    println!("Total processing time: {:.2}s", start_time.elapsed().as_secs_f64());

    if !report.is_complete() {
        println!("\n! Report is incomplete:");
        for failure in report.stage_failures() {
            println!("  - {}", failure);
        }
    }

    Ok(())
}

fn print_summary(report: &SalesReport) {
    println!("\n=== Overall Metrics ===");
    for (name, value) in report.overall.to_rows() {
        println!("{:<34} {}", name, value);
    }

    println!("\n=== Customer Segments ===");
    let total = report.customers.len();
    for (segment, count) in &report.segment_counts {
        let share = Metric::ratio(*count as f64 * 100.0, total as f64);
        println!("{:<8} {:>6} customers ({:.1}%)", segment.as_str(), count, share);
    }

    println!("\n=== Sales Forecast ===");
    match &report.forecast {
        Ok(forecast) => {
            println!("Forecast Accuracy: {:.1}%", forecast.metrics.confidence_pct());
            println!("RMSE: ${:.2}", forecast.metrics.rmse);
            println!("MAE:  ${:.2}", forecast.metrics.mae);
            println!(
                "Smoothing: alpha={:.3}, beta={:.3}, gamma={:.3}",
                forecast.params.alpha, forecast.params.beta, forecast.params.gamma
            );
        }
        Err(err) => println!("Forecast unavailable: {}", err),
    }

    if let Some(decomposition) = report.decomposition() {
        println!("\n=== Weekly Seasonal Indices ===");
        for (label, index) in decomposition
            .phase_labels()
            .iter()
            .zip(decomposition.seasonal_indices().iter())
        {
            println!("{:<10} {:+.2}", label, index);
        }
    }
}

/// `forecast.png` -> `forecast_components.png`
fn components_plot_path(plot_path: &Path) -> std::path::PathBuf {
    let stem = plot_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "forecast".to_string());
    plot_path.with_file_name(format!("{}_components.png", stem))
}
