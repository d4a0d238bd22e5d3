//! Plain-text rendering of an evaluated cycle.

use std::fmt::Write;

use crms_core::RuleId;
use crms_eval::{CycleEvaluation, RenderedEntry};

fn codes(rules: &[RuleId]) -> String {
    rules.iter().map(|r| r.code()).collect::<Vec<_>>().join(",")
}

fn row(entry: &RenderedEntry) -> String {
    let mut line = format!(
        "{}  {:>3}  {:<12} {:<11} {:>2}",
        entry.date, entry.entry_num, entry.summary, entry.sticker, entry.peak_day_text
    );
    if !entry.fertility_reasons.is_empty() {
        let _ = write!(line, "  fertile: {}", codes(&entry.fertility_reasons));
    }
    if !entry.infertility_reasons.is_empty() {
        let _ = write!(line, "  infertile: {}", codes(&entry.infertility_reasons));
    }
    if let Some(manual) = entry.manual_sticker {
        if manual != entry.sticker {
            let _ = write!(line, "  (charted {})", manual);
        }
    }
    line.trim_end().to_string()
}

/// Header, one row per entry and, unless `quiet`, the cycle statistics.
pub(crate) fn render_cycle(eval: &CycleEvaluation, quiet: bool) -> String {
    let mut out = String::new();
    let cycle = &eval.cycle;
    let _ = write!(out, "Cycle {} (from {}", cycle.id, cycle.start_date);
    if let Some(end) = cycle.end_date {
        let _ = write!(out, " to {}", end);
    }
    if cycle.is_pregnancy {
        out.push_str(", pregnancy");
    }
    out.push_str(")\n");

    for entry in &eval.entries {
        out.push_str(&row(entry));
        out.push('\n');
    }

    if !quiet {
        let stats = &eval.stats;
        let _ = writeln!(
            out,
            "Observed days: {}  Mucus score: {:.2}",
            stats.days_with_an_observation, stats.mucus_score
        );
        if let Some(pre) = stats.days_pre_peak {
            let _ = write!(out, "Peak on day {}", pre + 1);
            if let Some(post) = stats.days_post_peak {
                let _ = write!(out, ", {} days post-peak", post);
            }
            out.push('\n');
        }
    }
    out
}
