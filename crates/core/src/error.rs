use time::Date;

/// Errors raised while parsing observation notation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ObservationError {
    #[error("observation is empty")]
    Empty,

    /// No known discharge code starts at `position`.
    #[error("unknown discharge code in '{input}' at position {position}")]
    UnknownDischarge { input: String, position: usize },

    /// Light and very light flow must be followed by a discharge description.
    #[error("flow '{flow}' in '{input}' requires a discharge description")]
    MissingDischarge { input: String, flow: String },

    #[error("discharge in '{input}' requires a frequency (X1, X2, X3 or AD)")]
    MissingFrequency { input: String },

    #[error("unexpected '{found}' in '{input}' at position {position}")]
    UnexpectedInput {
        input: String,
        position: usize,
        found: String,
    },
}

/// Input contract violations. The engine never coerces bad input; these
/// are returned before any day is evaluated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChartError {
    #[error("entry {date} is outside cycle '{cycle_id}'")]
    EntryOutsideCycle { cycle_id: String, date: Date },

    #[error("entry {date} in cycle '{cycle_id}' follows later entry {previous}")]
    EntriesOutOfOrder {
        cycle_id: String,
        date: Date,
        previous: Date,
    },

    #[error("duplicate entry {date} in cycle '{cycle_id}'")]
    DuplicateEntry { cycle_id: String, date: Date },

    #[error("instructions starting {date} follow later instructions starting {previous}")]
    InstructionsOutOfOrder { date: Date, previous: Date },

    #[error("duplicate instructions starting {date}")]
    DuplicateInstructions { date: Date },

    #[error("cycle '{cycle_id}' starts {start} but its previous cycle starts {previous_start}")]
    CyclesOutOfOrder {
        cycle_id: String,
        start: Date,
        previous_start: Date,
    },

    #[error("unknown rule identifier '{0}'")]
    UnknownRule(String),

    #[error("unknown sticker '{0}'")]
    UnknownSticker(String),
}
