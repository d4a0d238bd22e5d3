//! Mucus cycle score.
//!
//! Scores the six days ending at the peak day. Each mucus day earns
//! points for color, consistency, lubrication and the mucus itself; the
//! total is averaged over the window length.

use crms_core::{days_between, ChartEntry, DischargeType, Modifier, Observation};
use time::Date;

/// Days in the scoring window, the peak day included.
pub const SCORE_WINDOW_DAYS: i64 = 6;

/// Score for the window ending at `peak_day`; 0 without a peak day.
pub fn mucus_score(entries: &[ChartEntry], peak_day: Option<Date>) -> f32 {
    let Some(peak) = peak_day else {
        return 0.0;
    };
    let total: i32 = entries
        .iter()
        .filter(|e| (0..SCORE_WINDOW_DAYS).contains(&days_between(e.date, peak)))
        .filter(|e| e.has_mucus())
        .map(day_points)
        .sum();
    total as f32 / SCORE_WINDOW_DAYS as f32
}

fn day_points(entry: &ChartEntry) -> i32 {
    let Some(discharge) = entry.observation.as_ref().and_then(Observation::discharge) else {
        return 0;
    };
    let has = |m: Modifier| discharge.has(m);
    let mut points = 0;

    // Color. Brown earns nothing.
    if has(Modifier::Cloudy) || has(Modifier::Yellow) {
        points += 2;
    }
    if has(Modifier::Clear) || has(Modifier::CloudyClear) {
        points += 4;
    }

    // Consistency.
    match discharge.kind {
        DischargeType::Sticky => {
            points += 2;
            if has(Modifier::Cloudy) {
                points -= 2;
            }
        }
        DischargeType::Tacky => points += 2,
        DischargeType::Stretchy => points += 4,
        _ => {}
    }

    // Sensation.
    if has(Modifier::Lubricative) {
        points += 4;
    }

    if discharge.has_mucus() {
        points += 2;
        if has(Modifier::Lubricative) {
            points += 2;
        }
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn entry(date: Date, code: &str) -> ChartEntry {
        ChartEntry::observed(date, code.parse().unwrap())
    }

    #[test]
    fn no_peak_scores_zero() {
        let entries = vec![entry(date!(2024 - 01 - 10), "10KLAD")];
        assert_eq!(mucus_score(&entries, None), 0.0);
    }

    #[test]
    fn window_without_mucus_scores_zero() {
        let entries: Vec<_> = (1..=10)
            .map(|d| entry(date!(2024 - 01 - 01) + time::Duration::days(d), "0AD"))
            .collect();
        assert_eq!(mucus_score(&entries, Some(date!(2024 - 01 - 08))), 0.0);
    }

    #[test]
    fn point_table() {
        // 10KL: clear 4 + stretchy 4 + lubricative 4 + mucus 2 + 2.
        assert_eq!(day_points(&entry(date!(2024 - 01 - 01), "10KLAD")), 16);
        // 6C: cloudy 2 + sticky 2 - 2 + mucus 2.
        assert_eq!(day_points(&entry(date!(2024 - 01 - 01), "6CX1")), 4);
        // 8CK: clear-ish 4 + tacky 2 + mucus 2.
        assert_eq!(day_points(&entry(date!(2024 - 01 - 01), "8CKX2")), 8);
        // Dry with yellow still earns the color points.
        assert_eq!(day_points(&entry(date!(2024 - 01 - 01), "0YX1")), 2);
    }

    #[test]
    fn only_the_six_days_ending_at_peak_count() {
        let entries = vec![
            entry(date!(2024 - 01 - 03), "10KLAD"),
            entry(date!(2024 - 01 - 04), "6CX1"),
            entry(date!(2024 - 01 - 09), "10KLAD"),
            entry(date!(2024 - 01 - 10), "10KLAD"),
        ];
        // Window is 01-04 ..= 01-09: 4 + 16.
        let score = mucus_score(&entries, Some(date!(2024 - 01 - 09)));
        assert!((score - 20.0 / 6.0).abs() < f32::EPSILON);
    }
}
