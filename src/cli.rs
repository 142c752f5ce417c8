//! Command-line interface definitions and argument parsing

use clap::Parser;
use std::path::PathBuf;

use crate::config::AnalysisConfig;
use crate::metric::Metric;

/// Point-of-sale analytics: customer segments and a weekly-seasonal sales forecast
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input CSV file
    #[arg(short, long, default_value = "cafe_sales_data.csv")]
    pub input: PathBuf,

    /// YAML file overriding bucket boundaries, segment thresholds and forecast settings
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Days to forecast past the last observed date (overrides the config file)
    #[arg(long)]
    pub horizon: Option<usize>,

    /// Directory the result tables are written to
    #[arg(short, long, default_value = "output")]
    pub output_dir: PathBuf,

    /// Output path for the forecast plot
    #[arg(short, long)]
    pub plot: Option<PathBuf>,

    /// Classification mode: provide recency and purchase frequency as "recency,frequency".
    /// Use "undefined" for the frequency of a single-day customer.
    /// Example: --classify "12,0.4"
    #[arg(long)]
    pub classify: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Parse the recency and frequency from the classify string.
    /// Expected format: "recency,frequency"
    pub fn parse_classify_values(&self) -> crate::Result<Option<(i64, Metric)>> {
        let Some(ref classify_str) = self.classify else {
            return Ok(None);
        };

        let parts: Vec<&str> = classify_str.split(',').collect();
        if parts.len() != 2 {
            anyhow::bail!("Classify values must be in format 'recency,frequency'");
        }

        let recency: i64 = parts[0]
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid recency value: {}", parts[0]))?;
        if recency < 0 {
            anyhow::bail!("Recency must be non-negative, got {}", recency);
        }

        let frequency = match parts[1].trim() {
            "undefined" | "inf" | "nan" => Metric::Undefined,
            raw => {
                let value: f64 = raw
                    .parse()
                    .map_err(|_| anyhow::anyhow!("Invalid frequency value: {}", parts[1]))?;
                Metric::from_f64(value)
            }
        };

        Ok(Some((recency, frequency)))
    }

    /// Load the config file if given, then apply command-line overrides.
    pub fn resolve_config(&self) -> crate::Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::load(path)?,
            None => AnalysisConfig::default(),
        };
        if let Some(horizon) = self.horizon {
            config.forecast.horizon_days = horizon;
        }
        config.validate()?;
        Ok(config)
    }
}
