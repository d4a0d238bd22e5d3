//! crms-core: the CrMS charting data model.
//!
//! Provides the plain in-memory entities the evaluator consumes:
//!
//! - [`Observation`] -- a day's observation, parsed from CrMS notation
//! - [`ChartEntry`], [`Cycle`], [`CycleChart`], [`ChartDocument`]
//! - [`RuleId`] and its families -- the static rule catalog
//! - [`InstructionSet`], [`InstructionHistory`] -- versioned rule activations
//! - [`Sticker`], [`StickerColor`]
//!
//! Nothing here performs I/O.

pub mod chart;
pub mod error;
pub mod instructions;
pub mod observation;
pub mod rules;

// ── Convenience re-exports ───────────────────────────────────────────

pub use chart::{
    days_between, validate_entries, ChartDocument, ChartEntry, Cycle, CycleChart,
    IntercourseTimeOfDay, Sticker, StickerColor,
};
pub use error::{ChartError, ObservationError};
pub use instructions::{InstructionHistory, InstructionSet};
pub use observation::{DischargeSummary, DischargeType, Flow, Frequency, Modifier, Observation};
pub use rules::{
    BasicInstruction, RuleId, SpecialInstruction, SuppressionGroup, YellowStampInstruction,
};
