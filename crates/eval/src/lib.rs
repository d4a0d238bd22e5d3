//! CrMS cycle evaluator -- turns a cycle's chart entries and the user's
//! instruction history into per-day stickers, reasons and cycle
//! statistics.
//!
//! The evaluator is a single forward scan per cycle. Rolling windows
//! ("counts of three") are tracked by a [`window::WindowTracker`] threaded
//! through the scan; each day's rules run against a
//! [`day::DayEvaluation`] and the result is classified by the fixed
//! decision tree in [`sticker`].
//!
//! Nothing here performs I/O or installs a tracing subscriber.

pub mod batch;
pub mod day;
pub mod evaluator;
pub mod render;
pub mod score;
pub mod sticker;
pub mod window;

pub use batch::{document_inputs, evaluate_all, evaluate_document};
pub use day::CountOfThree;
pub use evaluator::{evaluate, CycleInput};
pub use render::{
    sticker_context, CycleEvaluation, CycleStats, EntryModificationContext, RenderedEntry,
    Suppression,
};
pub use score::mucus_score;
pub use sticker::{
    classify, explain_mismatch, select, CheckResult, ClassifierError, Selection, StickerContext,
};
pub use window::{Anchor, WindowTracker};
