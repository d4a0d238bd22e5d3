//! Cycles, chart entries and stickers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::Date;

use crate::error::ChartError;
use crate::instructions::InstructionSet;
use crate::observation::Observation;

time::serde::format_description!(pub iso_date, Date, "[year]-[month]-[day]");

/// Whole days from `from` to `to` (negative when `to` is earlier).
pub fn days_between(from: Date, to: Date) -> i64 {
    (to - from).whole_days()
}

/// A menstrual cycle. A cycle without an end date is still open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cycle {
    pub id: String,
    #[serde(with = "iso_date")]
    pub start_date: Date,
    #[serde(with = "iso_date::option", default)]
    pub end_date: Option<Date>,
    #[serde(default)]
    pub is_pregnancy: bool,
}

impl Cycle {
    pub fn new(id: impl Into<String>, start_date: Date) -> Self {
        Cycle {
            id: id.into(),
            start_date,
            end_date: None,
            is_pregnancy: false,
        }
    }

    pub fn ending(mut self, end_date: Date) -> Self {
        self.end_date = Some(end_date);
        self
    }

    pub fn pregnancy(mut self) -> Self {
        self.is_pregnancy = true;
        self
    }

    pub fn contains(&self, date: Date) -> bool {
        date >= self.start_date && !matches!(self.end_date, Some(end) if date > end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntercourseTimeOfDay {
    #[default]
    None,
    AnyTime,
    EndOfDay,
}

/// One day of charting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartEntry {
    #[serde(with = "iso_date")]
    pub date: Date,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observation: Option<Observation>,
    #[serde(default)]
    pub peak_day: bool,
    #[serde(default)]
    pub point_of_change: bool,
    #[serde(default)]
    pub unusual_bleeding: bool,
    #[serde(default)]
    pub intercourse: IntercourseTimeOfDay,
    #[serde(default)]
    pub essentially_the_same: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_sticker: Option<Sticker>,
}

impl ChartEntry {
    pub fn new(date: Date) -> Self {
        ChartEntry {
            date,
            observation: None,
            peak_day: false,
            point_of_change: false,
            unusual_bleeding: false,
            intercourse: IntercourseTimeOfDay::None,
            essentially_the_same: false,
            manual_sticker: None,
        }
    }

    pub fn observed(date: Date, observation: Observation) -> Self {
        ChartEntry::new(date).with_observation(observation)
    }

    pub fn with_observation(mut self, observation: Observation) -> Self {
        self.observation = Some(observation);
        self
    }

    pub fn peak(mut self) -> Self {
        self.peak_day = true;
        self
    }

    pub fn point_of_change(mut self) -> Self {
        self.point_of_change = true;
        self
    }

    pub fn unusual_bleeding(mut self) -> Self {
        self.unusual_bleeding = true;
        self
    }

    pub fn intercourse(mut self, time_of_day: IntercourseTimeOfDay) -> Self {
        self.intercourse = time_of_day;
        self
    }

    pub fn essentially_the_same(mut self) -> Self {
        self.essentially_the_same = true;
        self
    }

    pub fn sticker(mut self, sticker: Sticker) -> Self {
        self.manual_sticker = Some(sticker);
        self
    }

    pub fn has_observation(&self) -> bool {
        self.observation.is_some()
    }

    pub fn has_mucus(&self) -> bool {
        self.observation.as_ref().is_some_and(Observation::has_mucus)
    }

    pub fn has_blood(&self) -> bool {
        self.observation.as_ref().is_some_and(Observation::has_blood)
    }

    pub fn had_intercourse(&self) -> bool {
        self.intercourse != IntercourseTimeOfDay::None
    }

    /// List text: the observation notation, with ` I` when intercourse was
    /// recorded.
    pub fn summary(&self) -> String {
        let mut text = match &self.observation {
            Some(o) => o.to_string(),
            None => "----".to_string(),
        };
        if self.had_intercourse() {
            text.push_str(" I");
        }
        text
    }
}

/// Background colors a sticker can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StickerColor {
    Red,
    Green,
    Yellow,
    White,
    Grey,
}

/// The daily classification stamped on the chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Sticker {
    Red,
    Green,
    GreenBaby,
    Yellow,
    YellowBaby,
    WhiteBaby,
    Grey,
}

impl Sticker {
    pub const ALL: [Sticker; 7] = [
        Sticker::Red,
        Sticker::Green,
        Sticker::GreenBaby,
        Sticker::Yellow,
        Sticker::YellowBaby,
        Sticker::WhiteBaby,
        Sticker::Grey,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Sticker::Red => "RED",
            Sticker::Green => "GREEN",
            Sticker::GreenBaby => "GREEN_BABY",
            Sticker::Yellow => "YELLOW",
            Sticker::YellowBaby => "YELLOW_BABY",
            Sticker::WhiteBaby => "WHITE_BABY",
            Sticker::Grey => "GREY",
        }
    }

    pub fn color(self) -> StickerColor {
        match self {
            Sticker::Red => StickerColor::Red,
            Sticker::Green | Sticker::GreenBaby => StickerColor::Green,
            Sticker::Yellow | Sticker::YellowBaby => StickerColor::Yellow,
            Sticker::WhiteBaby => StickerColor::White,
            Sticker::Grey => StickerColor::Grey,
        }
    }

    pub fn has_baby(self) -> bool {
        matches!(
            self,
            Sticker::GreenBaby | Sticker::YellowBaby | Sticker::WhiteBaby
        )
    }
}

impl fmt::Display for Sticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for Sticker {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace(['-', ' '], "_");
        Sticker::ALL
            .into_iter()
            .find(|st| st.name().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| ChartError::UnknownSticker(s.to_string()))
    }
}

/// A cycle together with its entries, as supplied by an entry source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleChart {
    pub cycle: Cycle,
    #[serde(default)]
    pub entries: Vec<ChartEntry>,
}

impl CycleChart {
    pub fn new(cycle: Cycle, entries: Vec<ChartEntry>) -> Self {
        CycleChart { cycle, entries }
    }

    pub fn validate(&self) -> Result<(), ChartError> {
        validate_entries(&self.cycle, &self.entries)
    }
}

/// Check that `entries` are strictly ascending and inside `cycle`.
pub fn validate_entries(cycle: &Cycle, entries: &[ChartEntry]) -> Result<(), ChartError> {
    let mut previous: Option<Date> = None;
    for entry in entries {
        if let Some(prev) = previous {
            if entry.date == prev {
                return Err(ChartError::DuplicateEntry {
                    cycle_id: cycle.id.clone(),
                    date: entry.date,
                });
            }
            if entry.date < prev {
                return Err(ChartError::EntriesOutOfOrder {
                    cycle_id: cycle.id.clone(),
                    date: entry.date,
                    previous: prev,
                });
            }
        }
        if !cycle.contains(entry.date) {
            return Err(ChartError::EntryOutsideCycle {
                cycle_id: cycle.id.clone(),
                date: entry.date,
            });
        }
        previous = Some(entry.date);
    }
    Ok(())
}

/// Everything needed to chart a user: instruction history and cycles in
/// chronological order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartDocument {
    #[serde(default)]
    pub instructions: Vec<InstructionSet>,
    #[serde(default)]
    pub cycles: Vec<CycleChart>,
}
