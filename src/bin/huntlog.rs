//! huntlog - Harvest statistics from hunt logsheets
//!
//! Reads the workbook JSON (or CSV exports, or OCR results) of a duck club's
//! daily logsheets and reports per-member, per-guide, per-blind and
//! per-species statistics plus the season trend.

use anyhow::Result;
use clap::{Parser, Subcommand};
use huntlog_stats::pipeline::{
    compute_stats, export_workbook, list_conditions, parse_ocr, ExportConfig, ParseOcrConfig,
    StatsConfig,
};
use huntlog_stats::parse_text;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "huntlog")]
#[command(about = "Harvest statistics from hunt logsheets")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the harvest report
    Stats {
        /// Sheet JSON, sheet CSV, OCR results CSV, or directory of sheet CSVs
        #[arg(short, long)]
        input: PathBuf,

        /// Only count hunts with this condition
        #[arg(short, long, env = "HUNTLOG_CONDITION")]
        condition: Option<String>,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write the harvest statistics to an Excel workbook
    Export {
        /// Sheet JSON, sheet CSV, OCR results CSV, or directory of sheet CSVs
        #[arg(short, long)]
        input: PathBuf,

        /// Output xlsx file
        #[arg(short, long)]
        output: PathBuf,

        /// Only count hunts with this condition
        #[arg(short, long, env = "HUNTLOG_CONDITION")]
        condition: Option<String>,
    },

    /// List the conditions recorded across all sheets
    Conditions {
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Parse an OCR results CSV into structured tables (JSON)
    ParseOcr {
        /// CSV with `filename` and `text` columns
        #[arg(short, long)]
        input: PathBuf,

        /// Output JSON file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Parse one OCR text file and print the recovered table as JSON
    ParseText {
        #[arg(short, long)]
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Stats {
            input,
            condition,
            output,
        } => {
            let report = compute_stats(&StatsConfig { input, condition })?;
            match output {
                Some(path) => {
                    std::fs::write(&path, report)?;
                    eprintln!("Report written to {}", path.display());
                }
                None => print!("{}", report),
            }
        }
        Commands::Export {
            input,
            output,
            condition,
        } => {
            let summary = export_workbook(&ExportConfig {
                stats: StatsConfig { input, condition },
                output,
            })?;
            eprintln!("{}", summary);
        }
        Commands::Conditions { input } => {
            let conditions = list_conditions(&input)?;
            if conditions.is_empty() {
                eprintln!("No conditions recorded");
            }
            for condition in conditions {
                println!("{}", condition);
            }
        }
        Commands::ParseOcr { input, output } => {
            let summary = parse_ocr(&ParseOcrConfig { input, output })?;
            eprintln!("{}", summary);
        }
        Commands::ParseText { input } => {
            let text = std::fs::read_to_string(&input)?;
            let table = parse_text(&text);
            println!("{}", serde_json::to_string_pretty(&table)?);
        }
    }

    Ok(())
}
