mod check;
mod table;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use crms_core::{ChartDocument, Observation, Sticker};
use time::macros::format_description;
use time::Date;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Creighton Model chart evaluator.
#[derive(Parser)]
#[command(name = "crms", version, about = "Creighton Model chart evaluator")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Log evaluation progress to stderr (overridden by RUST_LOG)
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate every cycle of a chart document
    Render {
        /// Path to the chart JSON document
        chart: PathBuf,
    },

    /// Check manually chosen stickers against the computed ones
    Check {
        /// Path to the chart JSON document
        chart: PathBuf,
        /// Check a single day (YYYY-MM-DD) instead of every manual sticker
        #[arg(long, requires = "sticker", value_parser = parse_date)]
        date: Option<Date>,
        /// Sticker to check on --date (e.g. GREEN_BABY)
        #[arg(long, requires = "date")]
        sticker: Option<Sticker>,
    },

    /// Parse an observation code and show what it records
    Observation {
        /// Observation notation, e.g. 10KLX2 or VL0AD
        code: String,
    },
}

fn parse_date(s: &str) -> Result<Date, String> {
    Date::parse(s, format_description!("[year]-[month]-[day]"))
        .map_err(|e| format!("invalid date '{}': {}", s, e))
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Render { chart } => {
            cmd_render(&chart, cli.output, cli.quiet);
        }
        Commands::Check {
            chart,
            date,
            sticker,
        } => {
            let doc = load_chart(&chart, cli.output, cli.quiet);
            let single = date.zip(sticker);
            check::cmd_check(&doc, single, cli.output, cli.quiet);
        }
        Commands::Observation { code } => {
            cmd_observation(&code, cli.output, cli.quiet);
        }
    }
}

/// Read and parse a chart document, exiting on failure.
pub(crate) fn load_chart(path: &Path, output: OutputFormat, quiet: bool) -> ChartDocument {
    let chart_str = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("error reading file '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    match serde_json::from_str::<ChartDocument>(&chart_str) {
        Ok(doc) => {
            debug!(path = %path.display(), cycles = doc.cycles.len(), "loaded chart");
            doc
        }
        Err(e) => {
            let msg = format!("error parsing chart in '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

fn cmd_render(path: &Path, output: OutputFormat, quiet: bool) {
    let doc = load_chart(path, output, quiet);
    let evaluations = match crms_eval::evaluate_document(&doc) {
        Ok(e) => e,
        Err(e) => {
            report_error(&format!("error: {}", e), output, quiet);
            process::exit(1);
        }
    };

    match output {
        OutputFormat::Json => {
            let pretty = serde_json::to_string_pretty(&evaluations)
                .unwrap_or_else(|e| format!("serialization error: {}", e));
            println!("{}", pretty);
        }
        OutputFormat::Text => {
            for (idx, eval) in evaluations.iter().enumerate() {
                if idx > 0 {
                    println!();
                }
                print!("{}", table::render_cycle(eval, quiet));
            }
        }
    }
}

fn cmd_observation(code: &str, output: OutputFormat, quiet: bool) {
    let observation: Observation = match code.parse() {
        Ok(o) => o,
        Err(e) => {
            report_error(&format!("error: {}", e), output, quiet);
            process::exit(1);
        }
    };

    match output {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "observation": observation,
                "has_blood": observation.has_blood(),
                "has_mucus": observation.has_mucus(),
                "peak_type": observation.is_peak_type(),
                "legit_flow": observation.has_legit_flow(),
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&json).unwrap_or_default()
            );
        }
        OutputFormat::Text => {
            println!("{}", observation);
            if !quiet {
                println!("  bleeding:   {}", yes_no(observation.has_blood()));
                println!("  mucus:      {}", yes_no(observation.has_mucus()));
                println!("  peak type:  {}", yes_no(observation.is_peak_type()));
                println!("  legit flow: {}", yes_no(observation.has_legit_flow()));
            }
        }
    }
}

fn yes_no(b: bool) -> &'static str {
    if b {
        "yes"
    } else {
        "no"
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
