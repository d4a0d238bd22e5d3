//! The rule catalog: every charting instruction the engine knows about.
//!
//! Instructions come in three families. Each identifier carries a stable
//! code (the one used in instruction documents and summaries), a fixed
//! description and, for the yellow-stamp instructions, the suppression
//! group it triggers. The catalog is closed: adding an instruction means
//! adding a variant here and a precondition in the evaluator.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ChartError;

macro_rules! rule_family {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $variant:ident => ($code:literal, $desc:literal), )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub enum $name {
            $( $variant, )+
        }

        impl $name {
            /// Every member of the family, in document order.
            pub const ALL: &'static [$name] = &[ $( $name::$variant, )+ ];

            pub fn code(self) -> &'static str {
                match self {
                    $( $name::$variant => $code, )+
                }
            }

            pub fn description(self) -> &'static str {
                match self {
                    $( $name::$variant => $desc, )+
                }
            }
        }

        impl FromStr for $name {
            type Err = ChartError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $name::ALL
                    .iter()
                    .copied()
                    .find(|r| r.code().eq_ignore_ascii_case(s.trim()))
                    .ok_or_else(|| ChartError::UnknownRule(s.to_string()))
            }
        }

        impl TryFrom<String> for $name {
            type Error = ChartError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                s.parse()
            }
        }

        impl From<$name> for String {
            fn from(r: $name) -> Self {
                r.code().to_string()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.code())
            }
        }
    };
}

rule_family! {
    /// Section D (fertility), E (infertility), G (double peak) and K
    /// (yellow stamp) instructions.
    BasicInstruction {
        D1 => ("D.1", "Every day of menstrual flow"),
        D2 => ("D.2", "Days of mucus through the peak day and the count of three that follows"),
        D3 => ("D.3", "1 or 2 days of non-peak mucus before the peak day"),
        D4 => ("D.4", "3 or more consecutive days of non-peak mucus before the peak day, plus a count of three"),
        D5 => ("D.5", "A day of peak-type mucus, plus a count of three"),
        D6 => ("D.6", "Unusual bleeding, plus a count of three"),
        E1 => ("E.1", "Dry days before the peak day: end of day, alternate days"),
        E2 => ("E.2", "Dry days before the peak day: end of day, every day"),
        E3 => ("E.3", "The 4th day after the peak day"),
        E4 => ("E.4", "Dry days after the 4th day past peak: end of day, alternate days"),
        E5 => ("E.5", "Dry days after the 4th day past peak: end of day, every day"),
        E6 => ("E.6", "Dry days after the 4th day past peak: any time of day"),
        E7 => ("E.7", "Very light, brown or black bleeding at the end of menstrual flow"),
        G1 => ("G.1", "Double peak questions on the 3rd day after the peak day"),
        K1 => ("K.1", "Pre-peak yellow stamps for the essentially-same discharge"),
        K2 => ("K.2", "Post-peak yellow stamps: end of day"),
        K3 => ("K.3", "Post-peak yellow stamps: end of day, alternate days"),
        K4 => ("K.4", "Post-peak yellow stamps: any time of day"),
    }
}

rule_family! {
    /// Named exceptions layered over the basic instructions.
    SpecialInstruction {
        BreastfeedingSeminalFluid => ("BREASTFEEDING_SEMINAL_FLUID", "Yellow stamps for seminal fluid while breastfeeding"),
    }
}

rule_family! {
    /// Special-instruction yellow stamps: section 1 (fertility) and
    /// section 2 (infertility).
    YellowStampInstruction {
        YS1A => ("YS.1.A", "Menstrual flow"),
        YS1B => ("YS.1.B", "From the point of change through the peak day and the count of three"),
        YS1C => ("YS.1.C", "Count of three after a point of change back to the basic infertile pattern"),
        YS1D => ("YS.1.D", "Unusual bleeding, plus a count of three"),
        YS2A => ("YS.2.A", "Pre-peak yellow stamps before the point of change"),
        YS2B => ("YS.2.B", "Post-peak yellow stamps: end of day"),
        YS2C => ("YS.2.C", "Post-peak yellow stamps: end of day, alternate days"),
        YS2D => ("YS.2.D", "Post-peak yellow stamps: any time of day"),
    }
}

/// The fertility instructions a yellow stamp can switch off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuppressionGroup {
    PrePeakYellow,
    PostPeakYellow,
}

const PRE_PEAK_SUPPRESSIBLE: &[BasicInstruction] = &[
    BasicInstruction::D2,
    BasicInstruction::D3,
    BasicInstruction::D4,
    BasicInstruction::D5,
    BasicInstruction::D6,
];

const POST_PEAK_SUPPRESSIBLE: &[BasicInstruction] = &[BasicInstruction::D5, BasicInstruction::D6];

impl SuppressionGroup {
    /// Members of the group, in document order.
    pub fn members(self) -> &'static [BasicInstruction] {
        match self {
            SuppressionGroup::PrePeakYellow => PRE_PEAK_SUPPRESSIBLE,
            SuppressionGroup::PostPeakYellow => POST_PEAK_SUPPRESSIBLE,
        }
    }
}

impl BasicInstruction {
    /// Groups this instruction belongs to.
    pub fn suppression_groups(self) -> Vec<SuppressionGroup> {
        [
            SuppressionGroup::PrePeakYellow,
            SuppressionGroup::PostPeakYellow,
        ]
        .into_iter()
        .filter(|g| g.members().contains(&self))
        .collect()
    }
}

/// Any instruction from any family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RuleId {
    Basic(BasicInstruction),
    Special(SpecialInstruction),
    YellowStamp(YellowStampInstruction),
}

impl RuleId {
    /// Every identifier in the catalog, basic first.
    pub fn all() -> impl Iterator<Item = RuleId> {
        BasicInstruction::ALL
            .iter()
            .copied()
            .map(RuleId::Basic)
            .chain(SpecialInstruction::ALL.iter().copied().map(RuleId::Special))
            .chain(
                YellowStampInstruction::ALL
                    .iter()
                    .copied()
                    .map(RuleId::YellowStamp),
            )
    }

    pub fn code(self) -> &'static str {
        match self {
            RuleId::Basic(i) => i.code(),
            RuleId::Special(i) => i.code(),
            RuleId::YellowStamp(i) => i.code(),
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            RuleId::Basic(i) => i.description(),
            RuleId::Special(i) => i.description(),
            RuleId::YellowStamp(i) => i.description(),
        }
    }

    /// One-line form used in summaries: `D.1: Every day of menstrual flow`.
    pub fn summary(self) -> String {
        format!("{}: {}", self.code(), self.description())
    }

    /// The group of fertility instructions this rule suppresses when it
    /// fires, if it is a yellow stamp.
    pub fn suppression_group(self) -> Option<SuppressionGroup> {
        use BasicInstruction::*;
        use YellowStampInstruction::*;
        match self {
            RuleId::Basic(K1) => Some(SuppressionGroup::PrePeakYellow),
            RuleId::Basic(K2 | K3 | K4) => Some(SuppressionGroup::PostPeakYellow),
            RuleId::YellowStamp(YS2A) => Some(SuppressionGroup::PrePeakYellow),
            RuleId::YellowStamp(YS2B | YS2C | YS2D) => Some(SuppressionGroup::PostPeakYellow),
            RuleId::Special(SpecialInstruction::BreastfeedingSeminalFluid) => {
                Some(SuppressionGroup::PrePeakYellow)
            }
            _ => None,
        }
    }
}

impl From<BasicInstruction> for RuleId {
    fn from(i: BasicInstruction) -> Self {
        RuleId::Basic(i)
    }
}

impl From<SpecialInstruction> for RuleId {
    fn from(i: SpecialInstruction) -> Self {
        RuleId::Special(i)
    }
}

impl From<YellowStampInstruction> for RuleId {
    fn from(i: YellowStampInstruction) -> Self {
        RuleId::YellowStamp(i)
    }
}

impl FromStr for RuleId {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RuleId::all()
            .find(|r| r.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ChartError::UnknownRule(s.to_string()))
    }
}

impl TryFrom<String> for RuleId {
    type Error = ChartError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<RuleId> for String {
    fn from(r: RuleId) -> Self {
        r.code().to_string()
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
