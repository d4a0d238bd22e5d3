//! Rolling-window anchors for counts of three.
//!
//! `WindowTracker` is the accumulator threaded through a cycle scan: each
//! step consumes it together with the next entry and returns the updated
//! tracker. Queries are answered relative to an arbitrary day.

use crms_core::{days_between, ChartEntry};
use serde::Serialize;
use time::Date;

/// Days since an anchor strictly below this are inside its count of three.
pub const COUNT_OF_THREE_SPAN: i64 = 4;

/// The events that start a count of three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    PeakDay,
    ConsecutiveMucus,
    PeakTypeMucus,
    UnusualBleeding,
    PointOfChange,
}

impl Anchor {
    pub const ALL: [Anchor; 5] = [
        Anchor::PeakDay,
        Anchor::ConsecutiveMucus,
        Anchor::PeakTypeMucus,
        Anchor::UnusualBleeding,
        Anchor::PointOfChange,
    ];
}

/// Trigger histories and running counters for one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowTracker {
    peak_days: Vec<Date>,
    toward: Vec<Date>,
    away: Vec<Date>,
    unusual_bleeding: Vec<Date>,
    mucus_run: u32,
    last_long_mucus_run_day: Option<Date>,
    last_peak_type_mucus: Option<Date>,
    seen_legit_flow: bool,
    first_day_without_flow: Option<Date>,
    days_with_observation: usize,
}

impl WindowTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one entry into the tracker. Entries must arrive in ascending
    /// date order.
    pub fn observe(mut self, entry: &ChartEntry) -> Self {
        let date = entry.date;

        if entry.peak_day {
            self.peak_days.push(date);
        }
        if entry.point_of_change {
            // Alternates by count, regardless of the gap between points.
            if self.toward.len() == self.away.len() {
                self.toward.push(date);
            } else {
                self.away.push(date);
            }
        }
        if entry.unusual_bleeding {
            self.unusual_bleeding.push(date);
        }

        let mut bled = false;
        match &entry.observation {
            None => self.mucus_run = 0,
            Some(observation) => {
                self.days_with_observation += 1;
                bled = observation.has_blood();
                self.seen_legit_flow |= observation.has_legit_flow();
                if observation.has_mucus() {
                    self.mucus_run += 1;
                    if self.mucus_run >= 3 {
                        self.last_long_mucus_run_day = Some(date);
                    }
                    if observation.is_peak_type() {
                        self.last_peak_type_mucus = Some(date);
                    }
                } else {
                    self.mucus_run = 0;
                }
            }
        }
        if !bled && self.first_day_without_flow.is_none() {
            self.first_day_without_flow = Some(date);
        }
        self
    }

    pub fn first_peak(&self) -> Option<Date> {
        self.peak_days.first().copied()
    }

    pub fn last_peak(&self) -> Option<Date> {
        self.peak_days.last().copied()
    }

    pub fn last_point_of_change_toward(&self) -> Option<Date> {
        self.toward.last().copied()
    }

    pub fn last_point_of_change_away(&self) -> Option<Date> {
        self.away.last().copied()
    }

    /// The most recent point of change toward fertility, while it has not
    /// been answered by a point of change away.
    pub fn effective_point_of_change(&self) -> Option<Date> {
        if self.toward.len() == self.away.len() {
            return None;
        }
        self.last_point_of_change_toward()
    }

    /// Length of the current run of consecutive mucus days.
    pub fn mucus_run(&self) -> u32 {
        self.mucus_run
    }

    /// True while every entry so far has shown flow or bleeding.
    pub fn in_menstrual_flow(&self) -> bool {
        self.first_day_without_flow.is_none()
    }

    /// True when every entry dated before the day preceding `date` showed
    /// flow or bleeding.
    pub fn all_bled_before_yesterday(&self, date: Date) -> bool {
        match self.first_day_without_flow {
            None => true,
            Some(dry) => days_between(dry, date) <= 1,
        }
    }

    pub fn has_had_legit_flow(&self) -> bool {
        self.seen_legit_flow
    }

    pub fn days_with_observation(&self) -> usize {
        self.days_with_observation
    }

    /// Days from the anchor's start to `date`. The point-of-change count
    /// starts on the point of change itself, so its anchor is the day
    /// before.
    pub fn days_since(&self, anchor: Anchor, date: Date) -> Option<i64> {
        match anchor {
            Anchor::PeakDay => self.last_peak().map(|d| days_between(d, date)),
            Anchor::ConsecutiveMucus => self.last_long_mucus_run_day.map(|d| days_between(d, date)),
            Anchor::PeakTypeMucus => self.last_peak_type_mucus.map(|d| days_between(d, date)),
            Anchor::UnusualBleeding => self
                .unusual_bleeding
                .last()
                .map(|d| days_between(*d, date)),
            Anchor::PointOfChange => self
                .last_point_of_change_away()
                .map(|d| days_between(d, date) + 1),
        }
    }

    pub fn within_count_of_three(&self, anchor: Anchor, date: Date) -> bool {
        self.days_since(anchor, date)
            .is_some_and(|days| days < COUNT_OF_THREE_SPAN)
    }
}
