//! Single-cycle evaluation.
//!
//! One forward pass over a cycle's entries:
//! 1. Fold the entry into the window tracker
//! 2. Resolve the instruction set in effect on its date
//! 3. Run the rules in document order (D, E, K, YS.1, YS.2, special)
//! 4. Pick the governing count of three
//! 5. Classify and render the day
//!
//! Cycle statistics are computed from the final tracker state.

use crms_core::{
    days_between, validate_entries, BasicInstruction, ChartEntry, ChartError, Cycle,
    InstructionHistory, RuleId, SpecialInstruction, YellowStampInstruction,
};
use tracing::{debug, warn};

use crate::day::DayEvaluation;
use crate::render::{render_entry, CycleEvaluation, CycleStats};
use crate::score::mucus_score;
use crate::window::{Anchor, WindowTracker};

/// Everything one cycle evaluation reads.
#[derive(Debug, Clone, Copy)]
pub struct CycleInput<'a> {
    pub cycle: &'a Cycle,
    pub entries: &'a [ChartEntry],
    pub instructions: &'a InstructionHistory,
    pub previous_cycle: Option<&'a Cycle>,
    /// Final entry of the previous cycle, so that "yesterday" is visible on
    /// the first day.
    pub previous_entry: Option<&'a ChartEntry>,
}

impl<'a> CycleInput<'a> {
    pub fn new(
        cycle: &'a Cycle,
        entries: &'a [ChartEntry],
        instructions: &'a InstructionHistory,
    ) -> Self {
        CycleInput {
            cycle,
            entries,
            instructions,
            previous_cycle: None,
            previous_entry: None,
        }
    }

    /// Attach the preceding cycle and its final entry.
    pub fn after(
        mut self,
        previous_cycle: &'a Cycle,
        previous_entry: Option<&'a ChartEntry>,
    ) -> Self {
        self.previous_cycle = Some(previous_cycle);
        self.previous_entry = previous_entry;
        self
    }
}

/// Evaluate one cycle. Fails before any day is evaluated when the input
/// breaks the ordering contract.
pub fn evaluate(input: &CycleInput<'_>) -> Result<CycleEvaluation, ChartError> {
    if let Err(err) = check_input(input) {
        warn!(cycle = %input.cycle.id, error = %err, "rejected cycle input");
        return Err(err);
    }
    debug!(
        cycle = %input.cycle.id,
        entries = input.entries.len(),
        "evaluating cycle"
    );

    let mut tracker = WindowTracker::new();
    let mut previous = input.previous_entry;
    let mut entries = Vec::with_capacity(input.entries.len());

    for entry in input.entries {
        tracker = tracker.observe(entry);
        let instructions = input.instructions.in_effect(entry.date);
        let mut day = DayEvaluation::new(
            entry,
            input.cycle.start_date,
            &tracker,
            instructions,
            previous,
        );
        apply_rules(&mut day);
        day.resolve_count_of_three();
        entries.push(render_entry(&day, input.previous_cycle));
        previous = Some(entry);
    }

    let last_peak = tracker.last_peak();
    let stats = CycleStats {
        cycle_start_date: input.cycle.start_date,
        is_pregnancy: input.cycle.is_pregnancy,
        days_with_an_observation: tracker.days_with_observation(),
        mucus_score: mucus_score(input.entries, last_peak),
        days_pre_peak: last_peak.map(|peak| days_between(input.cycle.start_date, peak)),
        days_post_peak: last_peak
            .zip(input.cycle.end_date)
            .map(|(peak, end)| days_between(peak, end)),
    };
    debug!(
        cycle = %input.cycle.id,
        observed = stats.days_with_an_observation,
        mucus_score = stats.mucus_score,
        "cycle evaluated"
    );

    Ok(CycleEvaluation {
        cycle: input.cycle.clone(),
        entries,
        stats,
    })
}

fn check_input(input: &CycleInput<'_>) -> Result<(), ChartError> {
    let cycle = input.cycle;
    if let Some(previous) = input.previous_cycle {
        if previous.start_date >= cycle.start_date {
            return Err(ChartError::CyclesOutOfOrder {
                cycle_id: cycle.id.clone(),
                start: cycle.start_date,
                previous_start: previous.start_date,
            });
        }
    }
    if let Some(tail) = input.previous_entry {
        if tail.date >= cycle.start_date {
            return Err(ChartError::EntriesOutOfOrder {
                cycle_id: cycle.id.clone(),
                date: cycle.start_date,
                previous: tail.date,
            });
        }
    }
    validate_entries(cycle, input.entries)
}

// ──────────────────────────────────────────────
// Rules
// ──────────────────────────────────────────────

/// Suppress the group `rule` triggers, if it triggers one.
fn yellow_stamp(day: &mut DayEvaluation<'_>, rule: impl Into<RuleId>) {
    let rule = rule.into();
    if let Some(group) = rule.suppression_group() {
        day.suppress(group, rule);
    }
}

pub(crate) fn apply_rules(day: &mut DayEvaluation<'_>) {
    fertility_rules(day);
    infertility_rules(day);
    basic_yellow_stamps(day);
    yellow_stamp_fertility(day);
    yellow_stamp_infertility(day);
    special_instructions(day);
}

/// Section D.
fn fertility_rules(day: &mut DayEvaluation<'_>) {
    use BasicInstruction::*;

    if day.is_active(D1) && day.in_menstrual_flow {
        day.add_fertility(D1);
    }
    if day.is_active(D2) && day.today_has_mucus && !day.is_post_peak_plus(3) {
        day.add_windowed_fertility(D2, Anchor::PeakDay);
    }
    if day.is_active(D3) && day.is_pre_peak() && (1..3).contains(&day.mucus_run) {
        day.add_fertility(D3);
    }
    if day.is_active(D4)
        && day.is_pre_peak()
        && day.within_count_of_three(Anchor::ConsecutiveMucus)
    {
        day.add_windowed_fertility(D4, Anchor::ConsecutiveMucus);
    }
    if day.is_active(D5) && day.within_count_of_three(Anchor::PeakTypeMucus) {
        day.add_windowed_fertility(D5, Anchor::PeakTypeMucus);
    }
    if day.is_active(D6) && day.within_count_of_three(Anchor::UnusualBleeding) {
        day.add_windowed_fertility(D6, Anchor::UnusualBleeding);
    }
}

/// Section E.
fn infertility_rules(day: &mut DayEvaluation<'_>) {
    use BasicInstruction::*;

    let dry = !day.today_has_mucus;
    if dry && !day.in_menstrual_flow && day.is_pre_peak() {
        for rule in [E1, E2] {
            if day.is_active(rule) {
                day.add_infertility(rule);
            }
        }
    }
    if day.is_active(E3) && day.is_exactly_post_peak_plus(4) {
        day.add_infertility(E3);
    }
    if dry && day.is_post_peak_plus(4) {
        for rule in [E4, E5, E6] {
            if day.is_active(rule) {
                day.add_infertility(rule);
            }
        }
    }
    // E.7 applies whether or not it is listed in the instruction set.
    let spotting = day.todays_flow.is_some_and(|f| !f.is_legit());
    if dry && day.in_menstrual_flow && (spotting || day.today_discharge_blood) {
        day.add_infertility(E7);
    }
}

fn before_point_of_change(day: &DayEvaluation<'_>) -> bool {
    day.effective_point_of_change
        .map_or(true, |poc| day.date < poc)
}

/// Section K.
fn basic_yellow_stamps(day: &mut DayEvaluation<'_>) {
    use BasicInstruction::*;

    if day.is_active(K1)
        && day.is_pre_peak()
        && !day.in_menstrual_flow
        && before_point_of_change(day)
    {
        yellow_stamp(day, K1);
    }
    if day.is_post_peak_plus(4) {
        for rule in [K2, K3, K4] {
            if day.is_active(rule) {
                yellow_stamp(day, rule);
            }
        }
    }
}

/// Special-instruction yellow stamps, section 1.
fn yellow_stamp_fertility(day: &mut DayEvaluation<'_>) {
    use YellowStampInstruction::*;

    if day.is_active(YS1A) && day.in_menstrual_flow {
        day.add_fertility(YS1A);
    }
    let from_point_of_change = day
        .effective_point_of_change
        .is_some_and(|poc| day.date >= poc)
        && day.is_pre_peak();
    if day.is_active(YS1B)
        && (day.within_count_of_three(Anchor::PeakDay) || from_point_of_change)
    {
        day.add_windowed_fertility(YS1B, Anchor::PeakDay);
    }
    let after_away = day
        .last_point_of_change_away
        .is_some_and(|away| days_between(away, day.date) <= 2);
    if day.is_active(YS1C) && after_away {
        day.add_windowed_fertility(YS1C, Anchor::PointOfChange);
    }
    if day.is_active(YS1D) && day.within_count_of_three(Anchor::UnusualBleeding) {
        day.add_windowed_fertility(YS1D, Anchor::UnusualBleeding);
    }
}

/// Special-instruction yellow stamps, section 2.
fn yellow_stamp_infertility(day: &mut DayEvaluation<'_>) {
    use YellowStampInstruction::*;

    if day.is_active(YS2A)
        && day.is_pre_peak()
        && !day.in_menstrual_flow
        && before_point_of_change(day)
    {
        yellow_stamp(day, YS2A);
    }
    if day.is_post_peak_plus(4) {
        for rule in [YS2B, YS2C, YS2D] {
            if day.is_active(rule) {
                yellow_stamp(day, rule);
            }
        }
    }
}

fn special_instructions(day: &mut DayEvaluation<'_>) {
    let rule = SpecialInstruction::BreastfeedingSeminalFluid;
    let peak_type_today = day
        .entry
        .observation
        .as_ref()
        .is_some_and(|o| o.is_peak_type());
    if day.is_active(rule)
        && day.previous_entry_intercourse
        && peak_type_today
        && day.entry.essentially_the_same
    {
        yellow_stamp(day, rule);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crms_core::{InstructionSet, IntercourseTimeOfDay, Sticker};
    use time::macros::date;
    use time::{Date, Duration};

    const START: Date = date!(2024 - 03 - 01);

    /// One entry per day from START; `-` is a day without an observation.
    fn entries(codes: &[&str]) -> Vec<ChartEntry> {
        codes
            .iter()
            .enumerate()
            .map(|(i, code)| {
                let date = START + Duration::days(i as i64);
                match *code {
                    "-" => ChartEntry::new(date),
                    c => ChartEntry::observed(date, c.parse().unwrap()),
                }
            })
            .collect()
    }

    fn history<R: Into<RuleId>>(rules: impl IntoIterator<Item = R>) -> InstructionHistory {
        InstructionHistory::new(vec![InstructionSet::empty(START).with_all(rules)]).unwrap()
    }

    fn run(entries: &[ChartEntry], instructions: &InstructionHistory) -> CycleEvaluation {
        let cycle = Cycle::new("c1", START);
        evaluate(&CycleInput::new(&cycle, entries, instructions)).unwrap()
    }

    fn rules(codes: &[&str]) -> Vec<RuleId> {
        codes.iter().map(|c| c.parse().unwrap()).collect()
    }

    #[test]
    fn empty_cycle() {
        let eval = run(&[], &InstructionHistory::default());
        assert!(eval.entries.is_empty());
        assert_eq!(eval.stats.days_with_an_observation, 0);
        assert_eq!(eval.stats.mucus_score, 0.0);
        assert_eq!(eval.stats.days_pre_peak, None);
    }

    #[test]
    fn menstrual_flow_days() {
        let chart = entries(&["H", "M", "L0AD", "VL0AD", "0AD"]);
        let eval = run(&chart, &history([BasicInstruction::D1, BasicInstruction::E1]));
        for day in &eval.entries[..4] {
            assert_eq!(day.fertility_reasons, rules(&["D.1"]), "{}", day.date);
            assert_eq!(day.sticker, Sticker::Red);
        }
        // Spotting at the tail of the flow.
        assert_eq!(eval.entries[3].infertility_reasons, rules(&["E.7"]));
        assert!(eval.entries[2].infertility_reasons.is_empty());

        let dry = &eval.entries[4];
        assert!(dry.fertility_reasons.is_empty());
        assert_eq!(dry.infertility_reasons, rules(&["E.1"]));
        assert_eq!(dry.sticker, Sticker::Green);
        assert!(dry.modification.all_previous_days_have_had_blood);
    }

    #[test]
    fn short_mucus_runs_and_count_of_three() {
        let chart = entries(&["0AD", "6CX1", "6CX1", "8CX1", "0AD", "0AD", "0AD", "0AD"]);
        let eval = run(
            &chart,
            &history([BasicInstruction::D3, BasicInstruction::D4]),
        );
        let fertile: Vec<Vec<RuleId>> =
            eval.entries.iter().map(|e| e.fertility_reasons.clone()).collect();
        assert_eq!(fertile[0], vec![]);
        assert_eq!(fertile[1], rules(&["D.3"]));
        assert_eq!(fertile[2], rules(&["D.3"]));
        assert_eq!(fertile[3], rules(&["D.4"]));
        assert_eq!(fertile[4], rules(&["D.4"]));
        assert_eq!(fertile[6], rules(&["D.4"]));
        assert_eq!(fertile[7], vec![]);
        assert_eq!(eval.entries[4].peak_day_text, "1");
        assert_eq!(eval.entries[6].peak_day_text, "3");
        assert_eq!(eval.entries[3].peak_day_text, "");
    }

    #[test]
    fn peak_and_post_peak() {
        let mut chart = entries(&[
            "H", "0AD", "10KLAD", "10KLAD", "6CX1", "0AD", "0AD", "0AD", "0AD",
        ]);
        chart[3].peak_day = true;
        let cycle = Cycle::new("c1", START).ending(START + Duration::days(20));
        let instructions = history(rules(&["D.2", "D.5", "E.3", "E.4", "G.1"]));
        let eval = evaluate(&CycleInput::new(&cycle, &chart, &instructions)).unwrap();

        let peak = &eval.entries[3];
        assert_eq!(peak.peak_day_text, "P");
        assert_eq!(peak.fertility_reasons, rules(&["D.2", "D.5"]));
        assert_eq!(peak.sticker, Sticker::GreenBaby);

        // P+3 is still inside the peak count of three.
        assert_eq!(eval.entries[6].fertility_reasons, rules(&["D.5"]));
        assert_eq!(eval.entries[6].peak_day_text, "3");
        assert!(eval.entries[6].modification.should_ask_double_peak_questions);

        let plus4 = &eval.entries[7];
        assert!(plus4.fertility_reasons.is_empty());
        assert_eq!(plus4.infertility_reasons, rules(&["E.3"]));
        assert_eq!(eval.entries[8].infertility_reasons, rules(&["E.4"]));

        assert_eq!(eval.stats.days_pre_peak, Some(3));
        assert_eq!(eval.stats.days_post_peak, Some(17));
        // 10KL, 10KL: 16 each, 6C on 03-05 falls after the peak.
        assert!((eval.stats.mucus_score - 32.0 / 6.0).abs() < f32::EPSILON);
    }

    #[test]
    fn pre_peak_yellow_stamps_suppress() {
        let chart = entries(&["H", "0AD", "6CX1", "6CX1", "6CX1"]);
        let eval = run(&chart, &history(rules(&["D.1", "D.3", "D.4", "K.1"])));
        let day = &eval.entries[4];
        assert!(day.fertility_reasons.is_empty());
        assert_eq!(day.infertility_reasons, rules(&["K.1"]));
        assert_eq!(
            day.suppressions
                .iter()
                .map(|s| (s.rule, s.suppressed_by))
                .collect::<Vec<_>>(),
            vec![(RuleId::Basic(BasicInstruction::D4), RuleId::Basic(BasicInstruction::K1))]
        );
        assert_eq!(day.sticker, Sticker::Yellow);
        assert_eq!(day.count_of_three, None);
        assert!(day.instruction_summary.contains("Impact of Yellow Stamps:"));
        // K.1 never touches menstrual flow.
        assert_eq!(eval.entries[0].fertility_reasons, rules(&["D.1"]));
    }

    #[test]
    fn point_of_change_lifts_pre_peak_yellow() {
        let mut chart = entries(&["0AD", "6CX1", "6CX1", "10KX1", "10KX1", "0AD", "0AD"]);
        chart[2].point_of_change = true;
        chart[4].point_of_change = true;
        let eval = run(&chart, &history(rules(&["D.3", "YS.1.B", "YS.1.C", "YS.2.A"])));

        // Before the point of change: yellow stamps apply.
        assert_eq!(eval.entries[1].infertility_reasons, rules(&["YS.2.A"]));
        assert!(eval.entries[1].fertility_reasons.is_empty());

        // From the point of change toward fertility.
        let toward = &eval.entries[2];
        assert_eq!(toward.poc_summary, "POC↑");
        assert_eq!(toward.fertility_reasons, rules(&["D.3", "YS.1.B"]));
        assert!(toward.infertility_reasons.is_empty());

        // Back toward the basic infertile pattern: count of three from the
        // point of change itself.
        let away = &eval.entries[4];
        assert_eq!(away.poc_summary, "POC↓");
        assert_eq!(away.fertility_reasons, rules(&["YS.1.C"]));
        assert_eq!(away.peak_day_text, "1");
        assert_eq!(eval.entries[6].fertility_reasons, rules(&["YS.1.C"]));
        assert_eq!(eval.entries[6].peak_day_text, "3");
    }

    #[test]
    fn breastfeeding_seminal_fluid() {
        let mut chart = entries(&["0AD", "10KX1", "10KX1"]);
        chart[0].intercourse = IntercourseTimeOfDay::EndOfDay;
        chart[1].essentially_the_same = true;
        let instructions = history(rules(&["D.5", "BREASTFEEDING_SEMINAL_FLUID"]));
        let eval = run(&chart, &instructions);

        let day = &eval.entries[1];
        assert!(day.fertility_reasons.is_empty());
        assert_eq!(day.infertility_reasons, rules(&["BREASTFEEDING_SEMINAL_FLUID"]));
        assert!(day.modification.should_ask_essential_sameness_if_mucus);
        assert_eq!(day.essential_sameness_summary, "yes");
        assert_eq!(day.sticker, Sticker::Yellow);

        // No intercourse the day before.
        assert_eq!(eval.entries[2].fertility_reasons, rules(&["D.5"]));
    }

    #[test]
    fn yesterday_reaches_into_previous_cycle() {
        let previous = Cycle::new("c0", START - Duration::days(28));
        let tail = ChartEntry::observed(START - Duration::days(1), "0AD".parse().unwrap())
            .intercourse(IntercourseTimeOfDay::AnyTime);
        let mut chart = entries(&["10KX1"]);
        chart[0].essentially_the_same = true;
        let instructions = history(rules(&["BREASTFEEDING_SEMINAL_FLUID"]));
        let cycle = Cycle::new("c1", START);
        let input = CycleInput::new(&cycle, &chart, &instructions).after(&previous, Some(&tail));
        let eval = evaluate(&input).unwrap();
        assert_eq!(
            eval.entries[0].infertility_reasons,
            rules(&["BREASTFEEDING_SEMINAL_FLUID"])
        );
        assert!(eval.entries[0].modification.has_previous_cycle);
        assert!(eval.entries[0].modification.is_first_entry);
    }

    #[test]
    fn seminal_fluid_looks_back_across_an_uncharted_day() {
        let mut chart = vec![
            ChartEntry::observed(START, "0AD".parse().unwrap())
                .intercourse(IntercourseTimeOfDay::EndOfDay),
            ChartEntry::observed(START + Duration::days(2), "10KX1".parse().unwrap()),
        ];
        chart[1].essentially_the_same = true;
        let instructions = history(rules(&["D.5", "BREASTFEEDING_SEMINAL_FLUID"]));
        let eval = run(&chart, &instructions);

        let day = &eval.entries[1];
        assert!(day.modification.should_ask_essential_sameness_if_mucus);
        assert_eq!(day.essential_sameness_summary, "yes");
        assert!(day.fertility_reasons.is_empty());
        assert_eq!(day.infertility_reasons, rules(&["BREASTFEEDING_SEMINAL_FLUID"]));
        assert_eq!(day.sticker, Sticker::Yellow);
    }

    #[test]
    fn instruction_versions_apply_from_their_start() {
        let chart = entries(&["0AD", "0AD", "0AD"]);
        let instructions = InstructionHistory::new(vec![
            InstructionSet::empty(START + Duration::days(1)).with(BasicInstruction::E1),
            InstructionSet::empty(START + Duration::days(2)).with(BasicInstruction::E2),
        ])
        .unwrap();
        let eval = run(&chart, &instructions);
        assert_eq!(eval.entries[0].sticker, Sticker::Grey);
        assert!(!eval.entries[0].context.has_instructions);
        assert_eq!(eval.entries[1].infertility_reasons, rules(&["E.1"]));
        assert_eq!(eval.entries[2].infertility_reasons, rules(&["E.2"]));
    }

    #[test]
    fn rejects_bad_input() {
        let cycle = Cycle::new("c1", START);
        let instructions = InstructionHistory::default();
        let mut chart = entries(&["0AD", "0AD"]);
        chart.swap(0, 1);
        assert!(matches!(
            evaluate(&CycleInput::new(&cycle, &chart, &instructions)),
            Err(ChartError::EntriesOutOfOrder { .. })
        ));

        let later = Cycle::new("c0", START + Duration::days(3));
        let chart = entries(&["0AD"]);
        let input = CycleInput::new(&cycle, &chart, &instructions).after(&later, None);
        assert!(matches!(
            evaluate(&input),
            Err(ChartError::CyclesOutOfOrder { .. })
        ));
    }
}
