//! `crms check`: compare manually chosen stickers with the computed ones.

use std::process;

use crms_core::{ChartDocument, Sticker};
use crms_eval::{explain_mismatch, CycleEvaluation, RenderedEntry};
use serde::Serialize;
use time::Date;

use crate::{report_error, OutputFormat};

/// One checked day.
#[derive(Debug, Serialize)]
pub(crate) struct CheckReport {
    #[serde(with = "crms_core::chart::iso_date")]
    pub date: Date,
    pub chosen: Sticker,
    pub expected: Sticker,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl CheckReport {
    fn is_ok(&self) -> bool {
        self.message.is_none()
    }
}

fn find_entry(evaluations: &[CycleEvaluation], date: Date) -> Option<&RenderedEntry> {
    evaluations.iter().find_map(|eval| eval.entry(date))
}

fn check_entry(entry: &RenderedEntry, chosen: Sticker) -> Result<CheckReport, String> {
    let result = explain_mismatch(chosen, &entry.context)
        .map_err(|e| format!("internal error on {}: {}", entry.date, e))?;
    Ok(CheckReport {
        date: entry.date,
        chosen,
        expected: result.expected,
        message: result.message,
        explanation: result.explanation,
    })
}

/// The days to check: one explicit day, or every day with a manual sticker.
pub(crate) fn collect_reports(
    evaluations: &[CycleEvaluation],
    single: Option<(Date, Sticker)>,
) -> Result<Vec<CheckReport>, String> {
    match single {
        Some((date, sticker)) => {
            let entry = find_entry(evaluations, date)
                .ok_or_else(|| format!("error: no entry on {}", date))?;
            Ok(vec![check_entry(entry, sticker)?])
        }
        None => evaluations
            .iter()
            .flat_map(|eval| eval.entries.iter())
            .filter_map(|entry| entry.manual_sticker.map(|chosen| (entry, chosen)))
            .map(|(entry, chosen)| check_entry(entry, chosen))
            .collect(),
    }
}

pub(crate) fn cmd_check(
    doc: &ChartDocument,
    single: Option<(Date, Sticker)>,
    output: OutputFormat,
    quiet: bool,
) {
    let evaluations = match crms_eval::evaluate_document(doc) {
        Ok(e) => e,
        Err(e) => {
            report_error(&format!("error: {}", e), output, quiet);
            process::exit(1);
        }
    };
    let reports = match collect_reports(&evaluations, single) {
        Ok(r) => r,
        Err(msg) => {
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    let mismatches = reports.iter().filter(|r| !r.is_ok()).count();

    match output {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "checked": reports.len(),
                "mismatches": mismatches,
                "days": reports,
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&json).unwrap_or_default()
            );
        }
        OutputFormat::Text => {
            for report in &reports {
                match &report.message {
                    None => {
                        if !quiet {
                            println!("{}: {} ok", report.date, report.chosen);
                        }
                    }
                    Some(message) => {
                        println!("{}: {}", report.date, message);
                        if let Some(explanation) = &report.explanation {
                            if !quiet {
                                println!("  {}", explanation);
                            }
                        }
                    }
                }
            }
            if !quiet {
                println!("{} checked, {} mismatch(es)", reports.len(), mismatches);
            }
        }
    }

    if mismatches > 0 {
        process::exit(1);
    }
}
