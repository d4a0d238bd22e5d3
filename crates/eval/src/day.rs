//! Per-day evaluation state.
//!
//! A `DayEvaluation` is built for one entry from the window tracker after
//! that entry has been folded in, then filled in by the rules and turned
//! into a `RenderedEntry`. It does not outlive the scan step.

use std::collections::BTreeMap;

use crms_core::{
    days_between, BasicInstruction, ChartEntry, Flow, InstructionSet, Observation, RuleId,
    SpecialInstruction, SuppressionGroup,
};
use serde::{Serialize, Serializer};
use time::Date;
use tracing::trace;

use crate::window::{Anchor, WindowTracker, COUNT_OF_THREE_SPAN};

/// Insertion-ordered set of rule identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReasonSet(Vec<RuleId>);

impl ReasonSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when `rule` was already present.
    pub fn insert(&mut self, rule: RuleId) -> bool {
        if self.0.contains(&rule) {
            return false;
        }
        self.0.push(rule);
        true
    }

    /// Returns true when `rule` was present.
    pub fn remove(&mut self, rule: RuleId) -> bool {
        match self.0.iter().position(|r| *r == rule) {
            Some(idx) => {
                self.0.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, rule: RuleId) -> bool {
        self.0.contains(&rule)
    }

    pub fn iter(&self) -> impl Iterator<Item = RuleId> + '_ {
        self.0.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn to_vec(&self) -> Vec<RuleId> {
        self.0.clone()
    }
}

impl Serialize for ReasonSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl FromIterator<RuleId> for ReasonSet {
    fn from_iter<I: IntoIterator<Item = RuleId>>(iter: I) -> Self {
        let mut set = ReasonSet::new();
        for rule in iter {
            set.insert(rule);
        }
        set
    }
}

/// The count of three currently governing a fertile day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CountOfThree {
    pub days: i64,
    pub rule: RuleId,
}

#[derive(Debug)]
pub struct DayEvaluation<'a> {
    pub entry: &'a ChartEntry,
    pub date: Date,
    pub entry_num: i64,
    /// `None` when no instruction set has started yet.
    pub instructions: Option<&'a InstructionSet>,
    pub first_peak: Option<Date>,
    pub last_peak: Option<Date>,
    pub counts: BTreeMap<Anchor, i64>,
    pub mucus_run: u32,
    pub today_has_mucus: bool,
    pub today_discharge_blood: bool,
    pub todays_flow: Option<Flow>,
    pub in_menstrual_flow: bool,
    pub has_had_legit_flow: bool,
    pub all_previous_days_bled: bool,
    pub previous_entry_intercourse: bool,
    pub effective_point_of_change: Option<Date>,
    pub last_point_of_change_toward: Option<Date>,
    pub last_point_of_change_away: Option<Date>,
    pub fertility: ReasonSet,
    pub infertility: ReasonSet,
    pub suppressed: BTreeMap<RuleId, RuleId>,
    count_of_three_tags: Vec<(RuleId, Anchor)>,
    pub count_of_three: Option<CountOfThree>,
}

impl<'a> DayEvaluation<'a> {
    /// Snapshot the tracker for `entry`, which must already have been
    /// observed by it.
    pub fn new(
        entry: &'a ChartEntry,
        cycle_start: Date,
        tracker: &WindowTracker,
        instructions: Option<&'a InstructionSet>,
        previous_entry: Option<&ChartEntry>,
    ) -> Self {
        let date = entry.date;
        let counts = Anchor::ALL
            .iter()
            .filter_map(|a| tracker.days_since(*a, date).map(|d| (*a, d)))
            .collect();
        let observation = entry.observation.as_ref();
        DayEvaluation {
            entry,
            date,
            entry_num: days_between(cycle_start, date) + 1,
            instructions,
            first_peak: tracker.first_peak(),
            last_peak: tracker.last_peak(),
            counts,
            mucus_run: tracker.mucus_run(),
            today_has_mucus: entry.has_mucus(),
            today_discharge_blood: observation.is_some_and(|o| o.discharge_has_blood()),
            todays_flow: observation.and_then(Observation::flow),
            in_menstrual_flow: tracker.in_menstrual_flow(),
            has_had_legit_flow: tracker.has_had_legit_flow(),
            all_previous_days_bled: tracker.all_bled_before_yesterday(date),
            previous_entry_intercourse: previous_entry.is_some_and(ChartEntry::had_intercourse),
            effective_point_of_change: tracker.effective_point_of_change(),
            last_point_of_change_toward: tracker.last_point_of_change_toward(),
            last_point_of_change_away: tracker.last_point_of_change_away(),
            fertility: ReasonSet::new(),
            infertility: ReasonSet::new(),
            suppressed: BTreeMap::new(),
            count_of_three_tags: Vec::new(),
            count_of_three: None,
        }
    }

    // ── Activation ───────────────────────────────────────────────────

    pub fn has_instructions(&self) -> bool {
        self.instructions.is_some()
    }

    pub fn is_active(&self, rule: impl Into<RuleId>) -> bool {
        let rule = rule.into();
        self.instructions.is_some_and(|set| set.is_active(rule))
    }

    pub fn any_active(&self, rules: &[RuleId]) -> bool {
        self.instructions.is_some_and(|set| set.any_active(rules))
    }

    // ── Cycle position ───────────────────────────────────────────────

    /// No peak yet, or before the first one.
    pub fn is_pre_peak(&self) -> bool {
        self.first_peak.map_or(true, |peak| self.date < peak)
    }

    pub fn is_peak_day(&self) -> bool {
        self.last_peak == Some(self.date)
    }

    pub fn is_post_peak(&self) -> bool {
        self.is_post_peak_plus(0)
    }

    /// Strictly after the most recent peak plus `days`.
    pub fn is_post_peak_plus(&self, days: i64) -> bool {
        self.last_peak
            .is_some_and(|peak| days_between(peak, self.date) > days)
    }

    pub fn is_exactly_post_peak_plus(&self, days: i64) -> bool {
        self.last_peak
            .is_some_and(|peak| days_between(peak, self.date) == days)
    }

    pub fn count(&self, anchor: Anchor) -> Option<i64> {
        self.counts.get(&anchor).copied()
    }

    pub fn within_count_of_three(&self, anchor: Anchor) -> bool {
        self.count(anchor)
            .is_some_and(|days| days < COUNT_OF_THREE_SPAN)
    }

    pub fn is_point_of_change_toward(&self) -> bool {
        self.last_point_of_change_toward == Some(self.date)
    }

    pub fn is_point_of_change_away(&self) -> bool {
        self.last_point_of_change_away == Some(self.date)
    }

    // ── Outcomes ─────────────────────────────────────────────────────

    pub fn add_fertility(&mut self, rule: impl Into<RuleId>) {
        let rule = rule.into();
        if self.fertility.insert(rule) {
            trace!(date = %self.date, rule = %rule, "fertility rule fired");
        }
    }

    /// Add a fertility reason governed by the count of three of `anchor`.
    pub fn add_windowed_fertility(&mut self, rule: impl Into<RuleId>, anchor: Anchor) {
        let rule = rule.into();
        self.add_fertility(rule);
        if !self.count_of_three_tags.iter().any(|(r, _)| *r == rule) {
            self.count_of_three_tags.push((rule, anchor));
        }
    }

    pub fn add_infertility(&mut self, rule: impl Into<RuleId>) {
        let rule = rule.into();
        if self.infertility.insert(rule) {
            trace!(date = %self.date, rule = %rule, "infertility rule fired");
        }
    }

    /// Remove the members of `group` from the fertility reasons, crediting
    /// `suppressor`, which always becomes an infertility reason.
    pub fn suppress(&mut self, group: SuppressionGroup, suppressor: impl Into<RuleId>) {
        let suppressor = suppressor.into();
        for member in group.members() {
            let rule = RuleId::Basic(*member);
            if self.fertility.remove(rule) {
                self.count_of_three_tags.retain(|(r, _)| *r != rule);
                self.suppressed.insert(rule, suppressor);
                trace!(
                    date = %self.date,
                    rule = %rule,
                    suppressor = %suppressor,
                    "fertility rule suppressed"
                );
            }
        }
        self.add_infertility(suppressor);
    }

    /// Pick the governing count of three among the surviving tagged rules:
    /// the smallest count, first tagged on ties.
    pub fn resolve_count_of_three(&mut self) {
        let mut best: Option<CountOfThree> = None;
        for (rule, anchor) in &self.count_of_three_tags {
            let Some(days) = self.count(*anchor) else {
                continue;
            };
            if best.map_or(true, |b| days < b.days) {
                best = Some(CountOfThree { days, rule: *rule });
            }
        }
        self.count_of_three = best;
    }

    // ── Derived text ─────────────────────────────────────────────────

    pub fn peak_day_text(&self) -> String {
        if !self.entry.has_observation() {
            return String::new();
        }
        if self.is_peak_day() {
            return "P".to_string();
        }
        if self.fertility.is_empty() {
            return String::new();
        }
        match self.count_of_three {
            Some(c) if c.days > 0 => c.days.to_string(),
            _ => String::new(),
        }
    }

    pub fn poc_summary(&self) -> &'static str {
        if self.is_point_of_change_toward() {
            "POC↑"
        } else if self.is_point_of_change_away() {
            "POC↓"
        } else {
            ""
        }
    }

    pub fn instruction_summary(&self) -> String {
        if !self.entry.has_observation() {
            return "Please provide an observation by clicking edit below.".to_string();
        }
        let mut sections = vec![format!(
            "Status: {}",
            if self.fertility.is_empty() {
                "Infertile"
            } else {
                "Fertile"
            }
        )];
        if !self.fertility.is_empty() {
            sections.push(reason_section("Fertility Reasons:", &self.fertility));
        }
        if !self.infertility.is_empty() {
            sections.push(reason_section("Infertility Reasons:", &self.infertility));
        }
        if !self.suppressed.is_empty() {
            let mut lines = vec!["Impact of Yellow Stamps:".to_string()];
            for (rule, by) in &self.suppressed {
                lines.push(format!(" - {} inhibited by {}", rule.summary(), by.summary()));
            }
            sections.push(lines.join("\n"));
        }
        sections.join("\n\n")
    }

    pub fn should_ask_essential_sameness(&self) -> bool {
        if self.is_active(SpecialInstruction::BreastfeedingSeminalFluid)
            && self.previous_entry_intercourse
        {
            return true;
        }
        self.is_active(BasicInstruction::K1)
            && self.is_pre_peak()
            && (!self.in_menstrual_flow || self.has_had_legit_flow)
    }

    pub fn should_ask_double_peak_questions(&self) -> bool {
        self.is_active(BasicInstruction::G1) && self.is_exactly_post_peak_plus(3)
    }

    pub fn essential_sameness_summary(&self) -> &'static str {
        if !(self.should_ask_essential_sameness() && self.entry.has_mucus()) {
            return "";
        }
        if self.entry.essentially_the_same {
            "yes"
        } else {
            "no"
        }
    }
}

fn reason_section(title: &str, reasons: &ReasonSet) -> String {
    let mut lines = vec![title.to_string()];
    lines.extend(reasons.iter().map(|r| format!(" - {}", r.summary())));
    lines.join("\n")
}
