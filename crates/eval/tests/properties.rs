//! Property tests over randomly charted cycles.

use crms_core::{
    BasicInstruction, ChartEntry, Cycle, InstructionHistory, InstructionSet,
    IntercourseTimeOfDay, RuleId, Sticker, YellowStampInstruction,
};
use crms_eval::{classify, evaluate, explain_mismatch, CycleEvaluation, CycleInput, StickerContext};
use proptest::prelude::*;
use time::macros::date;
use time::{Date, Duration};

const START: Date = date!(2024 - 05 - 01);

const CODES: &[&str] = &[
    "H", "M", "L0AD", "VL0AD", "0AD", "6CX1", "8CX1", "10KX1", "10KLX1", "10KLAD",
];

#[derive(Debug, Clone)]
struct Day {
    code: Option<usize>,
    peak: bool,
    point_of_change: bool,
    intercourse: bool,
    same: bool,
}

fn day() -> impl Strategy<Value = Day> {
    (
        proptest::option::weighted(0.9, 0..CODES.len()),
        proptest::bool::weighted(0.1),
        proptest::bool::weighted(0.1),
        proptest::bool::weighted(0.2),
        any::<bool>(),
    )
        .prop_map(|(code, peak, point_of_change, intercourse, same)| Day {
            code,
            peak,
            point_of_change,
            intercourse,
            same,
        })
}

fn chart(days: &[Day]) -> Vec<ChartEntry> {
    days.iter()
        .enumerate()
        .map(|(i, d)| {
            let mut entry = ChartEntry::new(START + Duration::days(i as i64));
            if let Some(idx) = d.code {
                entry.observation = Some(CODES[idx].parse().unwrap());
            }
            entry.peak_day = d.peak;
            entry.point_of_change = d.point_of_change;
            entry.essentially_the_same = d.same;
            if d.intercourse {
                entry.intercourse = IntercourseTimeOfDay::EndOfDay;
            }
            entry
        })
        .collect()
}

fn instructions() -> impl Strategy<Value = InstructionHistory> {
    let all: Vec<RuleId> = RuleId::all().collect();
    proptest::collection::vec(any::<bool>(), all.len()).prop_map(move |mask| {
        let active = all.iter().zip(mask).filter(|(_, on)| *on).map(|(r, _)| *r);
        InstructionHistory::new(vec![InstructionSet::empty(START).with_all(active)]).unwrap()
    })
}

fn context() -> impl Strategy<Value = StickerContext> {
    let all: Vec<RuleId> = RuleId::all().collect();
    (
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
        proptest::sample::subsequence(all.clone(), 0..4),
        proptest::sample::subsequence(all, 0..4),
    )
        .prop_map(
            |(has_observation, has_instructions, has_bleeding, has_mucus, fertile, infertile)| {
                StickerContext {
                    has_observation,
                    has_instructions,
                    has_bleeding,
                    has_mucus,
                    fertility_reasons: fertile,
                    infertility_reasons: infertile,
                }
            },
        )
}

fn run(entries: &[ChartEntry], history: &InstructionHistory) -> CycleEvaluation {
    let cycle = Cycle::new("prop", START);
    evaluate(&CycleInput::new(&cycle, entries, history)).unwrap()
}

proptest! {
    #[test]
    fn evaluation_is_idempotent(
        days in proptest::collection::vec(day(), 0..40),
        history in instructions(),
    ) {
        let entries = chart(&days);
        prop_assert_eq!(run(&entries, &history), run(&entries, &history));
    }

    #[test]
    fn suppressed_rules_never_stay_fertile(
        days in proptest::collection::vec(day(), 1..40),
        history in instructions(),
    ) {
        let eval = run(&chart(&days), &history);
        for entry in &eval.entries {
            for s in &entry.suppressions {
                prop_assert!(!entry.fertility_reasons.contains(&s.rule));
                prop_assert!(entry.infertility_reasons.contains(&s.suppressed_by));
            }
        }
    }

    #[test]
    fn rendered_sticker_matches_its_context(
        days in proptest::collection::vec(day(), 1..40),
        history in instructions(),
    ) {
        let eval = run(&chart(&days), &history);
        for entry in &eval.entries {
            prop_assert_eq!(classify(&entry.context), entry.sticker);
            prop_assert_eq!(entry.background_color, entry.sticker.color());
            prop_assert_eq!(entry.show_baby, entry.sticker.has_baby());
        }
    }

    #[test]
    fn pre_peak_rules_stop_at_the_first_peak(
        days in proptest::collection::vec(day(), 1..40),
        history in instructions(),
    ) {
        let entries = chart(&days);
        let eval = run(&entries, &history);
        let first_peak = entries.iter().find(|e| e.peak_day).map(|e| e.date);
        let pre_peak_only: [RuleId; 6] = [
            BasicInstruction::E1.into(),
            BasicInstruction::E2.into(),
            BasicInstruction::D3.into(),
            BasicInstruction::D4.into(),
            BasicInstruction::K1.into(),
            YellowStampInstruction::YS2A.into(),
        ];
        for entry in &eval.entries {
            if first_peak.is_some_and(|peak| entry.date >= peak) {
                for rule in pre_peak_only {
                    prop_assert!(!entry.fertility_reasons.contains(&rule), "{} on {}", rule, entry.date);
                    prop_assert!(!entry.infertility_reasons.contains(&rule), "{} on {}", rule, entry.date);
                }
            }
        }
    }

    #[test]
    fn classify_is_pure(ctx in context()) {
        prop_assert_eq!(classify(&ctx), classify(&ctx.clone()));
    }

    #[test]
    fn expected_sticker_is_always_accepted(ctx in context()) {
        let result = explain_mismatch(classify(&ctx), &ctx).unwrap();
        prop_assert!(result.is_ok());
    }

    #[test]
    fn every_other_sticker_is_explained(ctx in context()) {
        let expected = classify(&ctx);
        for chosen in Sticker::ALL {
            let result = explain_mismatch(chosen, &ctx).unwrap();
            prop_assert_eq!(result.expected, expected);
            prop_assert_eq!(result.is_ok(), chosen == expected);
        }
    }
}
