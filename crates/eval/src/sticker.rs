//! Sticker classification.
//!
//! A fixed binary decision tree maps a day's `StickerContext` to one of
//! the seven stickers. The tree is a const arena: nodes are addressed by
//! index and carry their parent's index, so a leaf can be walked back to
//! the root.
//!
//! `explain_mismatch` compares a manually chosen sticker with the computed
//! one and cites the decision that rules the choice out:
//!
//! ```text
//! Can't be RED, today doesn't have bleeding [bleeding]
//! ```

use crms_core::{RuleId, Sticker};
use serde::{Deserialize, Serialize};

/// The boolean features a sticker is derived from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StickerContext {
    pub has_observation: bool,
    pub has_instructions: bool,
    pub has_bleeding: bool,
    pub has_mucus: bool,
    #[serde(default)]
    pub fertility_reasons: Vec<RuleId>,
    #[serde(default)]
    pub infertility_reasons: Vec<RuleId>,
}

/// Decision-tree invariant violations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassifierError {
    #[error("no leaf for sticker {0}")]
    MissingLeaf(Sticker),

    #[error("node {child} is not a child of its parent {parent}")]
    Detached { child: usize, parent: usize },

    #[error("no divergence between the paths to {chosen} and {expected}")]
    NoDivergence { chosen: Sticker, expected: Sticker },
}

// ──────────────────────────────────────────────
// Criteria
// ──────────────────────────────────────────────

pub(crate) const BLEEDING_POSITIVE: &str = "Observation had either H, M, L, VL, B or R";
pub(crate) const BLEEDING_NEGATIVE: &str =
    "No signs of bleeding present in observation (i.e., H, M, L, VL, B or R)";
pub(crate) const MUCUS_POSITIVE: &str = "Observation had either 6, 8 or 10";
pub(crate) const MUCUS_NEGATIVE: &str =
    "No signs of mucus present in observation (i.e., 6, 8 or 10)";
pub(crate) const FERTILE_POSITIVE: &str = "Active fertility instructions: ";
pub(crate) const FERTILE_NEGATIVE: &str = "No fertility instructions (D.1 - D.6) are active";
pub(crate) const INFERTILE_POSITIVE: &str = "Active special instructions: ";
pub(crate) const INFERTILE_NEGATIVE: &str =
    "No special instructions apply to warrant yellow stamps";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Criterion {
    /// Observation recorded and an instruction set in effect.
    Charted,
    Bleeding,
    Mucus,
    Infertile,
    Fertile,
}

impl Criterion {
    fn holds(self, ctx: &StickerContext) -> bool {
        match self {
            Criterion::Charted => ctx.has_observation && ctx.has_instructions,
            Criterion::Bleeding => ctx.has_bleeding,
            Criterion::Mucus => ctx.has_mucus,
            Criterion::Infertile => !ctx.infertility_reasons.is_empty(),
            Criterion::Fertile => !ctx.fertility_reasons.is_empty(),
        }
    }

    fn label(self) -> &'static str {
        match self {
            Criterion::Charted => "[observation & instructions]",
            Criterion::Bleeding => "[bleeding]",
            Criterion::Mucus => "[mucus]",
            Criterion::Infertile => "[yellow stamps]",
            Criterion::Fertile => "[fertility]",
        }
    }

    /// How the day reads when the criterion evaluates to `outcome`.
    fn reason(self, outcome: bool, ctx: &StickerContext) -> String {
        let text = match (self, outcome) {
            (Criterion::Charted, true) => "has observation and has instructions",
            (Criterion::Charted, false) => {
                let mut missing = Vec::new();
                if !ctx.has_observation {
                    missing.push("doesn't have observation");
                }
                if !ctx.has_instructions {
                    missing.push("doesn't have instructions");
                }
                return missing.join(" and ");
            }
            (Criterion::Bleeding, true) => "has bleeding",
            (Criterion::Bleeding, false) => "doesn't have bleeding",
            (Criterion::Mucus, true) => "has mucus",
            (Criterion::Mucus, false) => "doesn't have mucus",
            (Criterion::Infertile, true) => "has active special instructions",
            (Criterion::Infertile, false) => "doesn't have active special instructions",
            (Criterion::Fertile, true) => "is fertile",
            (Criterion::Fertile, false) => "isn't fertile",
        };
        text.to_string()
    }

    fn explanation(self, outcome: bool, ctx: &StickerContext) -> String {
        match (self, outcome) {
            (Criterion::Charted, _) => String::new(),
            (Criterion::Bleeding, true) => BLEEDING_POSITIVE.to_string(),
            (Criterion::Bleeding, false) => BLEEDING_NEGATIVE.to_string(),
            (Criterion::Mucus, true) => MUCUS_POSITIVE.to_string(),
            (Criterion::Mucus, false) => MUCUS_NEGATIVE.to_string(),
            (Criterion::Infertile, true) => {
                format!("{}{}", INFERTILE_POSITIVE, describe(&ctx.infertility_reasons))
            }
            (Criterion::Infertile, false) => INFERTILE_NEGATIVE.to_string(),
            (Criterion::Fertile, true) => {
                format!("{}{}", FERTILE_POSITIVE, describe(&ctx.fertility_reasons))
            }
            (Criterion::Fertile, false) => FERTILE_NEGATIVE.to_string(),
        }
    }
}

fn describe(rules: &[RuleId]) -> String {
    rules
        .iter()
        .map(|r| r.description())
        .collect::<Vec<_>>()
        .join(", ")
}

// ──────────────────────────────────────────────
// Tree
// ──────────────────────────────────────────────

type NodeId = usize;

#[derive(Debug, Clone, Copy)]
enum Node {
    Leaf(Sticker),
    Decision {
        criterion: Criterion,
        on_true: NodeId,
        on_false: NodeId,
    },
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    node: Node,
    parent: Option<NodeId>,
}

const fn decision(
    criterion: Criterion,
    on_true: NodeId,
    on_false: NodeId,
    parent: Option<NodeId>,
) -> Slot {
    Slot {
        node: Node::Decision {
            criterion,
            on_true,
            on_false,
        },
        parent,
    }
}

const fn leaf(sticker: Sticker, parent: NodeId) -> Slot {
    Slot {
        node: Node::Leaf(sticker),
        parent: Some(parent),
    }
}

const ROOT: NodeId = 0;

#[rustfmt::skip]
const TREE: [Slot; 17] = [
    /*  0 */ decision(Criterion::Charted, 1, 2, None),
    /*  1 */ decision(Criterion::Bleeding, 3, 4, Some(0)),
    /*  2 */ leaf(Sticker::Grey, 0),
    /*  3 */ leaf(Sticker::Red, 1),
    /*  4 */ decision(Criterion::Mucus, 5, 6, Some(1)),
    /*  5 */ decision(Criterion::Infertile, 7, 8, Some(4)),
    /*  6 */ decision(Criterion::Infertile, 9, 10, Some(4)),
    /*  7 */ decision(Criterion::Fertile, 11, 12, Some(5)),
    /*  8 */ decision(Criterion::Fertile, 13, 14, Some(5)),
    /*  9 */ leaf(Sticker::WhiteBaby, 6),
    /* 10 */ decision(Criterion::Fertile, 15, 16, Some(6)),
    /* 11 */ leaf(Sticker::YellowBaby, 7),
    /* 12 */ leaf(Sticker::Yellow, 7),
    /* 13 */ leaf(Sticker::GreenBaby, 8),
    /* 14 */ leaf(Sticker::Green, 8),
    /* 15 */ leaf(Sticker::GreenBaby, 10),
    /* 16 */ leaf(Sticker::Green, 10),
];

/// Walk from the root, returning the leaf reached, its sticker and the
/// reason text of every decision taken on the way.
fn walk(ctx: &StickerContext) -> (NodeId, Sticker, Vec<String>) {
    let mut id = ROOT;
    let mut matched = Vec::new();
    loop {
        match TREE[id].node {
            Node::Leaf(sticker) => return (id, sticker, matched),
            Node::Decision {
                criterion,
                on_true,
                on_false,
            } => {
                let outcome = criterion.holds(ctx);
                matched.push(criterion.reason(outcome, ctx));
                id = if outcome { on_true } else { on_false };
            }
        }
    }
}

fn sticker_at(id: NodeId) -> Option<Sticker> {
    match TREE[id].node {
        Node::Leaf(sticker) => Some(sticker),
        Node::Decision { .. } => None,
    }
}

fn ancestors(id: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut current = TREE[id].parent;
    while let Some(parent) = current {
        out.push(parent);
        current = TREE[parent].parent;
    }
    out
}

fn depth(id: NodeId) -> usize {
    ancestors(id).len()
}

/// Which branch of `parent` leads to `child`.
fn branch_to(parent: NodeId, child: NodeId) -> Result<bool, ClassifierError> {
    match TREE[parent].node {
        Node::Decision { on_true, .. } if on_true == child => Ok(true),
        Node::Decision { on_false, .. } if on_false == child => Ok(false),
        _ => Err(ClassifierError::Detached { child, parent }),
    }
}

/// Walk up from `leaf` until reaching a node in `stop`, returning that
/// node and the branch the walk arrived from.
fn divergence(
    leaf: NodeId,
    stop: &[NodeId],
) -> Result<Option<(NodeId, bool)>, ClassifierError> {
    let mut current = leaf;
    while let Some(parent) = TREE[current].parent {
        let branch = branch_to(parent, current)?;
        if stop.contains(&parent) {
            return Ok(Some((parent, branch)));
        }
        current = parent;
    }
    Ok(None)
}

// ──────────────────────────────────────────────
// Public API
// ──────────────────────────────────────────────

/// The sticker for `ctx`.
pub fn classify(ctx: &StickerContext) -> Sticker {
    walk(ctx).1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub sticker: Sticker,
    /// Reason text of each decision on the path, root first.
    pub matched_criteria: Vec<String>,
}

pub fn select(ctx: &StickerContext) -> Selection {
    let (_, sticker, matched_criteria) = walk(ctx);
    Selection {
        sticker,
        matched_criteria,
    }
}

/// Outcome of checking a manual sticker against the computed one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub expected: Sticker,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl CheckResult {
    pub fn is_ok(&self) -> bool {
        self.message.is_none()
    }
}

/// Check `chosen` against the sticker computed for `ctx`, citing the
/// decision that excludes it when they differ.
///
/// A sticker with several leaves is explained from the leaf whose paths
/// split from the expected one deepest in the tree.
pub fn explain_mismatch(
    chosen: Sticker,
    ctx: &StickerContext,
) -> Result<CheckResult, ClassifierError> {
    let (expected_leaf, expected, _) = walk(ctx);
    if chosen == expected {
        return Ok(CheckResult {
            expected,
            message: None,
            explanation: None,
        });
    }

    let stop = ancestors(expected_leaf);
    let leaves: Vec<NodeId> = (0..TREE.len())
        .filter(|id| sticker_at(*id) == Some(chosen))
        .collect();
    if leaves.is_empty() {
        return Err(ClassifierError::MissingLeaf(chosen));
    }

    let mut best: Option<(NodeId, bool)> = None;
    for leaf in leaves {
        if let Some((node, branch)) = divergence(leaf, &stop)? {
            if best.map_or(true, |(b, _)| depth(node) > depth(b)) {
                best = Some((node, branch));
            }
        }
    }
    let (node, branch) = best.ok_or(ClassifierError::NoDivergence { chosen, expected })?;
    let Node::Decision { criterion, .. } = TREE[node].node else {
        return Err(ClassifierError::NoDivergence { chosen, expected });
    };

    // The expected path leaves the node on the other branch, which is how
    // today actually evaluates.
    let actual = !branch;
    Ok(CheckResult {
        expected,
        message: Some(format!(
            "Can't be {}, today {} {}",
            chosen.name(),
            criterion.reason(actual, ctx),
            criterion.label()
        )),
        explanation: Some(criterion.explanation(actual, ctx)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crms_core::{BasicInstruction, YellowStampInstruction};

    fn charted() -> StickerContext {
        StickerContext {
            has_observation: true,
            has_instructions: true,
            ..StickerContext::default()
        }
    }

    fn d1() -> RuleId {
        RuleId::Basic(BasicInstruction::D1)
    }

    fn k2() -> RuleId {
        RuleId::Basic(BasicInstruction::K2)
    }

    #[test]
    fn parents_match_children() {
        for (id, slot) in TREE.iter().enumerate() {
            if let Node::Decision {
                on_true, on_false, ..
            } = slot.node
            {
                assert_eq!(TREE[on_true].parent, Some(id));
                assert_eq!(TREE[on_false].parent, Some(id));
            }
        }
        assert_eq!(TREE[ROOT].parent, None);
        for sticker in Sticker::ALL {
            assert!(
                (0..TREE.len()).any(|id| sticker_at(id) == Some(sticker)),
                "{} has no leaf",
                sticker
            );
        }
    }

    #[test]
    fn grey_without_observation_or_instructions() {
        assert_eq!(classify(&StickerContext::default()), Sticker::Grey);
        let no_instructions = StickerContext {
            has_observation: true,
            has_bleeding: true,
            ..StickerContext::default()
        };
        assert_eq!(classify(&no_instructions), Sticker::Grey);
    }

    #[test]
    fn bleeding_wins_over_everything_else() {
        let ctx = StickerContext {
            has_bleeding: true,
            has_mucus: true,
            fertility_reasons: vec![d1()],
            infertility_reasons: vec![k2()],
            ..charted()
        };
        assert_eq!(classify(&ctx), Sticker::Red);
    }

    #[test]
    fn dry_days() {
        assert_eq!(classify(&charted()), Sticker::Green);
        let fertile = StickerContext {
            fertility_reasons: vec![d1()],
            ..charted()
        };
        assert_eq!(classify(&fertile), Sticker::GreenBaby);
        let yellow = StickerContext {
            infertility_reasons: vec![k2()],
            ..charted()
        };
        assert_eq!(classify(&yellow), Sticker::WhiteBaby);
    }

    #[test]
    fn mucus_days() {
        let mucus = StickerContext {
            has_mucus: true,
            ..charted()
        };
        assert_eq!(classify(&mucus), Sticker::Green);
        let yellow = StickerContext {
            infertility_reasons: vec![k2()],
            ..mucus.clone()
        };
        assert_eq!(classify(&yellow), Sticker::Yellow);
        let yellow_baby = StickerContext {
            fertility_reasons: vec![RuleId::Basic(BasicInstruction::D2)],
            ..yellow
        };
        assert_eq!(classify(&yellow_baby), Sticker::YellowBaby);
    }

    #[test]
    fn select_reports_path() {
        let ctx = StickerContext {
            has_mucus: true,
            infertility_reasons: vec![k2()],
            ..charted()
        };
        let selection = select(&ctx);
        assert_eq!(selection.sticker, Sticker::Yellow);
        assert_eq!(
            selection.matched_criteria,
            vec![
                "has observation and has instructions",
                "doesn't have bleeding",
                "has mucus",
                "has active special instructions",
                "isn't fertile"
            ]
        );
    }

    #[test]
    fn matching_choice_is_ok() {
        let result = explain_mismatch(Sticker::Green, &charted()).unwrap();
        assert!(result.is_ok());
        assert_eq!(result.expected, Sticker::Green);
    }

    #[test]
    fn red_on_a_dry_day() {
        let result = explain_mismatch(Sticker::Red, &charted()).unwrap();
        assert!(!result.is_ok());
        assert_eq!(result.expected, Sticker::Green);
        assert_eq!(
            result.message.as_deref(),
            Some("Can't be RED, today doesn't have bleeding [bleeding]")
        );
        assert_eq!(result.explanation.as_deref(), Some(BLEEDING_NEGATIVE));
    }

    #[test]
    fn grey_when_charted() {
        let result = explain_mismatch(Sticker::Grey, &charted()).unwrap();
        assert_eq!(
            result.message.as_deref(),
            Some("Can't be GREY, today has observation and has instructions [observation & instructions]")
        );
    }

    #[test]
    fn missing_instructions_are_named() {
        let ctx = StickerContext {
            has_observation: true,
            ..StickerContext::default()
        };
        let result = explain_mismatch(Sticker::Green, &ctx).unwrap();
        assert_eq!(result.expected, Sticker::Grey);
        assert_eq!(
            result.message.as_deref(),
            Some("Can't be GREEN, today doesn't have instructions [observation & instructions]")
        );
    }

    #[test]
    fn duplicate_leaf_explained_from_deepest_split() {
        // Dry and fertile: GREEN_BABY on the no-mucus side. Choosing GREEN
        // is best explained by the fertility decision right above it, not
        // by the mucus decision.
        let ctx = StickerContext {
            fertility_reasons: vec![d1()],
            ..charted()
        };
        let result = explain_mismatch(Sticker::Green, &ctx).unwrap();
        assert_eq!(result.expected, Sticker::GreenBaby);
        assert_eq!(
            result.message.as_deref(),
            Some("Can't be GREEN, today is fertile [fertility]")
        );
        assert_eq!(
            result.explanation.as_deref(),
            Some("Active fertility instructions: Every day of menstrual flow")
        );
    }

    #[test]
    fn yellow_needs_special_instructions() {
        let ctx = StickerContext {
            has_mucus: true,
            ..charted()
        };
        let result = explain_mismatch(Sticker::Yellow, &ctx).unwrap();
        assert_eq!(
            result.message.as_deref(),
            Some("Can't be YELLOW, today doesn't have active special instructions [yellow stamps]")
        );
        assert_eq!(result.explanation.as_deref(), Some(INFERTILE_NEGATIVE));
    }

    #[test]
    fn white_baby_on_a_mucus_day() {
        let ctx = StickerContext {
            has_mucus: true,
            infertility_reasons: vec![RuleId::YellowStamp(YellowStampInstruction::YS2B)],
            ..charted()
        };
        let result = explain_mismatch(Sticker::WhiteBaby, &ctx).unwrap();
        assert_eq!(result.expected, Sticker::Yellow);
        assert_eq!(
            result.message.as_deref(),
            Some("Can't be WHITE_BABY, today has mucus [mucus]")
        );
        assert_eq!(result.explanation.as_deref(), Some(MUCUS_POSITIVE));
    }
}
