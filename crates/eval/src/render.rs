//! Evaluation output: rendered entries and cycle statistics.

use crms_core::chart::iso_date;
use crms_core::{BasicInstruction, Cycle, IntercourseTimeOfDay, RuleId, Sticker, StickerColor};
use serde::Serialize;
use time::Date;

use crate::day::{CountOfThree, DayEvaluation};
use crate::sticker::{classify, StickerContext};

/// A fertility rule switched off by a yellow stamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Suppression {
    pub rule: RuleId,
    pub suppressed_by: RuleId,
}

/// Which clarifying questions a consumer should ask when the entry is
/// edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryModificationContext {
    pub has_previous_cycle: bool,
    pub previous_cycle_is_pregnancy: bool,
    pub is_first_entry: bool,
    pub all_previous_days_have_had_blood: bool,
    pub should_ask_essential_sameness_if_mucus: bool,
    pub should_ask_double_peak_questions: bool,
}

/// One evaluated day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedEntry {
    #[serde(with = "iso_date")]
    pub date: Date,
    pub entry_num: i64,
    pub summary: String,
    pub sticker: Sticker,
    pub background_color: StickerColor,
    pub show_baby: bool,
    pub context: StickerContext,
    pub manual_sticker: Option<Sticker>,
    pub peak_day_text: String,
    pub fertility_reasons: Vec<RuleId>,
    pub infertility_reasons: Vec<RuleId>,
    pub suppressions: Vec<Suppression>,
    pub count_of_three: Option<CountOfThree>,
    pub poc_summary: String,
    pub intercourse: IntercourseTimeOfDay,
    pub instruction_summary: String,
    pub essential_sameness_summary: String,
    pub modification: EntryModificationContext,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleStats {
    #[serde(with = "iso_date")]
    pub cycle_start_date: Date,
    pub is_pregnancy: bool,
    pub days_with_an_observation: usize,
    pub mucus_score: f32,
    pub days_pre_peak: Option<i64>,
    pub days_post_peak: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleEvaluation {
    pub cycle: Cycle,
    pub entries: Vec<RenderedEntry>,
    pub stats: CycleStats,
}

impl CycleEvaluation {
    pub fn entry(&self, date: Date) -> Option<&RenderedEntry> {
        self.entries
            .binary_search_by_key(&date, |e| e.date)
            .ok()
            .map(|idx| &self.entries[idx])
    }
}

const PENDING_POST_PEAK_YELLOW: [BasicInstruction; 3] =
    [BasicInstruction::K2, BasicInstruction::K3, BasicInstruction::K4];

/// The classifier's view of the day. Its infertility reasons are the
/// yellow-stamp triggers only. Active post-peak yellow stamps count from
/// the day after the peak, before they take effect at peak+4.
pub fn sticker_context(day: &DayEvaluation<'_>) -> StickerContext {
    let mut infertility_reasons: Vec<RuleId> = day
        .infertility
        .iter()
        .filter(|r| r.suppression_group().is_some())
        .collect();
    if day.is_post_peak() && !day.is_post_peak_plus(4) {
        for rule in PENDING_POST_PEAK_YELLOW {
            let rule = RuleId::Basic(rule);
            if day.is_active(rule) && !infertility_reasons.contains(&rule) {
                infertility_reasons.push(rule);
            }
        }
    }
    StickerContext {
        has_observation: day.entry.has_observation(),
        has_instructions: day.has_instructions(),
        has_bleeding: day.entry.has_blood(),
        has_mucus: day.entry.has_mucus(),
        fertility_reasons: day.fertility.to_vec(),
        infertility_reasons,
    }
}

pub(crate) fn render_entry(
    day: &DayEvaluation<'_>,
    previous_cycle: Option<&Cycle>,
) -> RenderedEntry {
    let entry = day.entry;
    let context = sticker_context(day);
    let sticker = classify(&context);
    RenderedEntry {
        date: entry.date,
        entry_num: day.entry_num,
        summary: entry.summary(),
        sticker,
        background_color: sticker.color(),
        show_baby: sticker.has_baby(),
        context,
        manual_sticker: entry.manual_sticker,
        peak_day_text: day.peak_day_text(),
        fertility_reasons: day.fertility.to_vec(),
        infertility_reasons: day.infertility.to_vec(),
        suppressions: day
            .suppressed
            .iter()
            .map(|(rule, by)| Suppression {
                rule: *rule,
                suppressed_by: *by,
            })
            .collect(),
        count_of_three: day.count_of_three,
        poc_summary: day.poc_summary().to_string(),
        intercourse: entry.intercourse,
        instruction_summary: day.instruction_summary(),
        essential_sameness_summary: day.essential_sameness_summary().to_string(),
        modification: EntryModificationContext {
            has_previous_cycle: previous_cycle.is_some(),
            previous_cycle_is_pregnancy: previous_cycle.is_some_and(|c| c.is_pregnancy),
            is_first_entry: day.entry_num == 1,
            all_previous_days_have_had_blood: day.all_previous_days_bled,
            should_ask_essential_sameness_if_mucus: day.should_ask_essential_sameness(),
            should_ask_double_peak_questions: day.should_ask_double_peak_questions(),
        },
    }
}
