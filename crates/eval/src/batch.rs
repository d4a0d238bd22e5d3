//! Whole-document evaluation.
//!
//! Cycles are independent once their predecessor is known, so they are
//! evaluated in parallel on the rayon pool and collected in input order.

use crms_core::{ChartDocument, ChartError, InstructionHistory};
use rayon::prelude::*;
use tracing::debug;

use crate::evaluator::{evaluate, CycleInput};
use crate::render::CycleEvaluation;

/// Evaluate every input; one result per input, in the same order.
pub fn evaluate_all(inputs: &[CycleInput<'_>]) -> Vec<Result<CycleEvaluation, ChartError>> {
    debug!(cycles = inputs.len(), "evaluating cycles");
    inputs.par_iter().map(evaluate).collect()
}

/// Build one input per cycle in `doc`, each linked to the cycle before it.
pub fn document_inputs<'a>(
    doc: &'a ChartDocument,
    instructions: &'a InstructionHistory,
) -> Vec<CycleInput<'a>> {
    let mut inputs = Vec::with_capacity(doc.cycles.len());
    for (idx, chart) in doc.cycles.iter().enumerate() {
        let input = CycleInput::new(&chart.cycle, &chart.entries, instructions);
        let input = match idx.checked_sub(1).map(|p| &doc.cycles[p]) {
            Some(previous) => input.after(&previous.cycle, previous.entries.last()),
            None => input,
        };
        inputs.push(input);
    }
    inputs
}

/// Evaluate a whole chart document. The first failing cycle, in document
/// order, fails the call.
pub fn evaluate_document(doc: &ChartDocument) -> Result<Vec<CycleEvaluation>, ChartError> {
    let instructions = InstructionHistory::new(doc.instructions.clone())?;
    let inputs = document_inputs(doc, &instructions);
    evaluate_all(&inputs).into_iter().collect()
}
