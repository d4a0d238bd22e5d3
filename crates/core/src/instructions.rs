//! Versioned instruction sets.
//!
//! An `InstructionSet` activates a list of rules from its start date
//! until the next set starts. `InstructionHistory` holds a user's sets in
//! ascending start order and answers which one is in effect on a date.

use serde::{Deserialize, Serialize};
use time::Date;

use crate::chart::iso_date;
use crate::error::ChartError;
use crate::rules::{BasicInstruction, RuleId, SpecialInstruction, YellowStampInstruction};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionSet {
    #[serde(with = "iso_date")]
    pub start_date: Date,
    #[serde(default)]
    pub basic: Vec<BasicInstruction>,
    #[serde(default)]
    pub special: Vec<SpecialInstruction>,
    #[serde(default)]
    pub yellow_stamp: Vec<YellowStampInstruction>,
}

impl InstructionSet {
    /// A set with no active rules.
    pub fn empty(start_date: Date) -> Self {
        InstructionSet {
            start_date,
            basic: Vec::new(),
            special: Vec::new(),
            yellow_stamp: Vec::new(),
        }
    }

    /// Activate `rule`; activating twice is a no-op.
    pub fn with(mut self, rule: impl Into<RuleId>) -> Self {
        match rule.into() {
            RuleId::Basic(i) if !self.basic.contains(&i) => self.basic.push(i),
            RuleId::Special(i) if !self.special.contains(&i) => self.special.push(i),
            RuleId::YellowStamp(i) if !self.yellow_stamp.contains(&i) => {
                self.yellow_stamp.push(i)
            }
            _ => {}
        }
        self
    }

    pub fn with_all<I, R>(self, rules: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<RuleId>,
    {
        rules.into_iter().fold(self, |set, r| set.with(r))
    }

    pub fn is_active(&self, rule: impl Into<RuleId>) -> bool {
        match rule.into() {
            RuleId::Basic(i) => self.basic.contains(&i),
            RuleId::Special(i) => self.special.contains(&i),
            RuleId::YellowStamp(i) => self.yellow_stamp.contains(&i),
        }
    }

    pub fn any_active(&self, rules: &[RuleId]) -> bool {
        rules.iter().any(|r| self.is_active(*r))
    }

    /// Active rules in document order: basic, special, yellow stamp.
    pub fn active_rules(&self) -> impl Iterator<Item = RuleId> + '_ {
        self.basic
            .iter()
            .copied()
            .map(RuleId::Basic)
            .chain(self.special.iter().copied().map(RuleId::Special))
            .chain(self.yellow_stamp.iter().copied().map(RuleId::YellowStamp))
    }

    pub fn is_empty(&self) -> bool {
        self.basic.is_empty() && self.special.is_empty() && self.yellow_stamp.is_empty()
    }
}

/// A user's instruction sets, strictly ascending by start date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstructionHistory {
    sets: Vec<InstructionSet>,
}

impl InstructionHistory {
    /// Accepts sets that are already sorted with unique start dates.
    pub fn new(sets: Vec<InstructionSet>) -> Result<Self, ChartError> {
        for pair in sets.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.start_date == prev.start_date {
                return Err(ChartError::DuplicateInstructions {
                    date: next.start_date,
                });
            }
            if next.start_date < prev.start_date {
                return Err(ChartError::InstructionsOutOfOrder {
                    date: next.start_date,
                    previous: prev.start_date,
                });
            }
        }
        Ok(InstructionHistory { sets })
    }

    /// The set with the greatest start date on or before `date`.
    pub fn in_effect(&self, date: Date) -> Option<&InstructionSet> {
        let idx = self.sets.partition_point(|s| s.start_date <= date);
        idx.checked_sub(1).map(|i| &self.sets[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &InstructionSet> {
        self.sets.iter()
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}
