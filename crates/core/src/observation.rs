//! Observations and the CrMS observation notation.
//!
//! An observation is written `[flow][discharge][modifiers][frequency]`,
//! e.g. `H`, `L0AD`, `6CX1`, `10KLAD`, `VL10CKX2`. Parsing is case and
//! whitespace insensitive; `Display` renders the canonical form, which
//! parses back to the same value.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ObservationError;

/// Menstrual flow intensity, ordered from spotting to heavy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flow {
    VeryLight,
    Light,
    Moderate,
    Heavy,
}

impl Flow {
    pub fn code(self) -> &'static str {
        match self {
            Flow::VeryLight => "VL",
            Flow::Light => "L",
            Flow::Moderate => "M",
            Flow::Heavy => "H",
        }
    }

    /// Light, moderate and heavy flow count as menstrual flow; spotting
    /// does not.
    pub fn is_legit(self) -> bool {
        self >= Flow::Light
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DischargeType {
    Dry,
    Damp,
    Wet,
    Shiny,
    Sticky,
    Tacky,
    Stretchy,
    DampLubricative,
    ShinyLubricative,
    WetLubricative,
}

// Longest codes first so that `10DL` is not read as `10` + `DL`.
const DISCHARGE_CODES: &[(&str, DischargeType)] = &[
    ("10DL", DischargeType::DampLubricative),
    ("10SL", DischargeType::ShinyLubricative),
    ("10WL", DischargeType::WetLubricative),
    ("10", DischargeType::Stretchy),
    ("2W", DischargeType::Wet),
    ("0", DischargeType::Dry),
    ("2", DischargeType::Damp),
    ("4", DischargeType::Shiny),
    ("6", DischargeType::Sticky),
    ("8", DischargeType::Tacky),
];

impl DischargeType {
    pub fn code(self) -> &'static str {
        DISCHARGE_CODES
            .iter()
            .find(|(_, t)| *t == self)
            .map(|(c, _)| *c)
            .unwrap_or("?")
    }

    /// 6, 8, 10 and the lubricative 10s.
    pub fn has_mucus(self) -> bool {
        self >= DischargeType::Sticky
    }

    pub fn is_lubricative(self) -> bool {
        matches!(
            self,
            DischargeType::DampLubricative
                | DischargeType::ShinyLubricative
                | DischargeType::WetLubricative
        )
    }

    fn is_peak_type(self) -> bool {
        self == DischargeType::Stretchy || self.is_lubricative()
    }
}

/// Color, clarity and sensation codes. Declaration order is the order
/// used when rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modifier {
    Clear,
    CloudyClear,
    Cloudy,
    Gummy,
    Lubricative,
    Pasty,
    Yellow,
    Brown,
    Red,
}

const MODIFIER_CODES: &[(&str, Modifier)] = &[
    ("CK", Modifier::CloudyClear),
    ("K", Modifier::Clear),
    ("C", Modifier::Cloudy),
    ("G", Modifier::Gummy),
    ("L", Modifier::Lubricative),
    ("P", Modifier::Pasty),
    ("Y", Modifier::Yellow),
    ("B", Modifier::Brown),
    ("R", Modifier::Red),
];

impl Modifier {
    pub fn code(self) -> &'static str {
        MODIFIER_CODES
            .iter()
            .find(|(_, m)| *m == self)
            .map(|(c, _)| *c)
            .unwrap_or("?")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Once,
    Twice,
    ThreeTimes,
    AllDay,
}

const FREQUENCY_CODES: &[(&str, Frequency)] = &[
    ("X1", Frequency::Once),
    ("X2", Frequency::Twice),
    ("X3", Frequency::ThreeTimes),
    ("AD", Frequency::AllDay),
];

impl Frequency {
    pub fn code(self) -> &'static str {
        FREQUENCY_CODES
            .iter()
            .find(|(_, f)| *f == self)
            .map(|(c, _)| *c)
            .unwrap_or("?")
    }
}

/// Discharge type plus its modifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DischargeSummary {
    pub kind: DischargeType,
    pub modifiers: BTreeSet<Modifier>,
}

impl DischargeSummary {
    pub fn new(kind: DischargeType) -> Self {
        DischargeSummary {
            kind,
            modifiers: BTreeSet::new(),
        }
    }

    pub fn with(mut self, modifier: Modifier) -> Self {
        self.modifiers.insert(modifier);
        self
    }

    pub fn has(&self, modifier: Modifier) -> bool {
        self.modifiers.contains(&modifier)
    }

    pub fn has_mucus(&self) -> bool {
        self.kind.has_mucus()
    }

    /// Brown or red bleeding recorded alongside the discharge.
    pub fn has_blood(&self) -> bool {
        self.has(Modifier::Brown) || self.has(Modifier::Red)
    }

    /// Stretchy or lubricative mucus, or mucus that is clear or
    /// lubricative.
    pub fn is_peak_type(&self) -> bool {
        self.has_mucus()
            && (self.kind.is_peak_type()
                || self.has(Modifier::Clear)
                || self.has(Modifier::Lubricative))
    }
}

/// A single day's observation.
///
/// Every value renders to notation that parses back: flow alone is only H
/// or M, and a discharge always has a frequency.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Observation {
    flow: Option<Flow>,
    discharge: Option<DischargeSummary>,
    frequency: Option<Frequency>,
}

impl Observation {
    /// Flow without a discharge description; only heavy and moderate flow
    /// may be recorded this way.
    pub fn flow_only(flow: Flow) -> Result<Self, ObservationError> {
        match flow {
            Flow::Heavy | Flow::Moderate => Ok(Observation {
                flow: Some(flow),
                discharge: None,
                frequency: None,
            }),
            Flow::Light | Flow::VeryLight => Err(ObservationError::MissingDischarge {
                input: flow.code().to_string(),
                flow: flow.code().to_string(),
            }),
        }
    }

    pub fn with_discharge(
        flow: Option<Flow>,
        discharge: DischargeSummary,
        frequency: Frequency,
    ) -> Self {
        Observation {
            flow,
            discharge: Some(discharge),
            frequency: Some(frequency),
        }
    }

    pub fn flow(&self) -> Option<Flow> {
        self.flow
    }

    pub fn discharge(&self) -> Option<&DischargeSummary> {
        self.discharge.as_ref()
    }

    pub fn frequency(&self) -> Option<Frequency> {
        self.frequency
    }

    pub fn has_mucus(&self) -> bool {
        self.discharge.as_ref().is_some_and(DischargeSummary::has_mucus)
    }

    /// Any flow, or brown/red bleeding in the discharge.
    pub fn has_blood(&self) -> bool {
        self.flow.is_some() || self.discharge_has_blood()
    }

    pub fn discharge_has_blood(&self) -> bool {
        self.discharge
            .as_ref()
            .is_some_and(DischargeSummary::has_blood)
    }

    pub fn is_peak_type(&self) -> bool {
        self.discharge
            .as_ref()
            .is_some_and(DischargeSummary::is_peak_type)
    }

    pub fn has_legit_flow(&self) -> bool {
        self.flow.is_some_and(Flow::is_legit)
    }
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(flow) = self.flow {
            f.write_str(flow.code())?;
        }
        if let Some(discharge) = &self.discharge {
            f.write_str(discharge.kind.code())?;
            for m in &discharge.modifiers {
                f.write_str(m.code())?;
            }
        }
        if let Some(frequency) = self.frequency {
            f.write_str(frequency.code())?;
        }
        Ok(())
    }
}

/// Cursor over the normalized notation.
struct Scanner<'a> {
    input: &'a str,
    normalized: String,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str) -> Self {
        let normalized: String = input
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| c.to_ascii_uppercase())
            .collect();
        Scanner {
            input,
            normalized,
            pos: 0,
        }
    }

    fn rest(&self) -> &str {
        &self.normalized[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.normalized.len()
    }

    fn take<T: Copy>(&mut self, table: &[(&str, T)]) -> Option<T> {
        let (code, value) = table.iter().find(|(c, _)| self.rest().starts_with(c))?;
        self.pos += code.len();
        Some(*value)
    }

    fn unexpected(&self) -> ObservationError {
        let found = self.rest().chars().next().map(String::from).unwrap_or_default();
        ObservationError::UnexpectedInput {
            input: self.input.to_string(),
            position: self.pos,
            found,
        }
    }
}

const FLOW_CODES: &[(&str, Flow)] = &[
    ("VL", Flow::VeryLight),
    ("H", Flow::Heavy),
    ("M", Flow::Moderate),
    ("L", Flow::Light),
];

impl FromStr for Observation {
    type Err = ObservationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut scanner = Scanner::new(s);
        if scanner.at_end() {
            return Err(ObservationError::Empty);
        }
        if !scanner.normalized.is_ascii() {
            return Err(scanner.unexpected());
        }

        let flow = scanner.take(FLOW_CODES);

        if scanner.at_end() {
            return match flow {
                Some(f @ (Flow::Heavy | Flow::Moderate)) => Observation::flow_only(f),
                Some(f) => Err(ObservationError::MissingDischarge {
                    input: s.to_string(),
                    flow: f.code().to_string(),
                }),
                None => Err(ObservationError::Empty),
            };
        }

        let kind =
            scanner
                .take(DISCHARGE_CODES)
                .ok_or_else(|| ObservationError::UnknownDischarge {
                    input: s.to_string(),
                    position: scanner.pos,
                })?;
        let mut discharge = DischargeSummary::new(kind);
        while let Some(m) = scanner.take(MODIFIER_CODES) {
            discharge.modifiers.insert(m);
        }

        if scanner.at_end() {
            return Err(ObservationError::MissingFrequency {
                input: s.to_string(),
            });
        }
        let frequency = scanner
            .take(FREQUENCY_CODES)
            .ok_or_else(|| scanner.unexpected())?;

        if !scanner.at_end() {
            return Err(scanner.unexpected());
        }

        Ok(Observation::with_discharge(flow, discharge, frequency))
    }
}

impl TryFrom<String> for Observation {
    type Error = ObservationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Observation> for String {
    fn from(o: Observation) -> Self {
        o.to_string()
    }
}
