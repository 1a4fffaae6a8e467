//! Dependency inference: which tool's output plausibly feeds which
//! tool's input.
//!
//! For every output field F of tool A and input field G of every other
//! tool B, a confidence is fused from three signals — field-name
//! similarity, type compatibility, and description-token overlap — and
//! edges at or above [`CONFIDENCE_THRESHOLD`] are retained. Exact
//! field-name collisions are the strongest signal in practice, so an
//! exact-name pairing floors the confidence at the high-confidence line
//! regardless of the other signals.

use tracing::debug;

use toolvet_core::{text, Dependency, ToolSpec};

/// Edges below this are dropped.
pub const CONFIDENCE_THRESHOLD: f64 = 0.6;

/// Floor for exact field-name pairings.
const EXACT_NAME_FLOOR: f64 = 0.8;

const NAME_WEIGHT: f64 = 0.4;
const DESCRIPTION_WEIGHT: f64 = 0.3;
const EXACT_MATCH_BONUS: f64 = 0.15;

/// Propose the weighted dependency graph over a tool set. Self-edges are
/// never emitted; a tool pair may carry several edges binding different
/// field combinations. Output order follows tool and field declaration
/// order, so the edge list is deterministic.
pub fn infer_dependencies(tools: &[ToolSpec]) -> Vec<Dependency> {
    let mut edges = Vec::new();
    for from in tools {
        for to in tools {
            if from.name == to.name {
                continue;
            }
            let overlap = text::jaccard(&from.description_tokens, &to.description_tokens);
            for output in &from.outputs {
                for input in &to.inputs {
                    let confidence =
                        field_confidence(&output.name, &output.field_type, &input.name, &input.field_type, overlap);
                    if confidence >= CONFIDENCE_THRESHOLD {
                        edges.push(Dependency::new(
                            &from.name,
                            &output.name,
                            &to.name,
                            &input.name,
                            confidence,
                        ));
                    }
                }
            }
        }
    }
    debug!(edges = edges.len(), tools = tools.len(), "inferred dependency graph");
    edges
}

fn field_confidence(
    from_name: &str,
    from_type: &str,
    to_name: &str,
    to_type: &str,
    description_overlap: f64,
) -> f64 {
    let name = name_similarity(from_name, to_name);
    let type_score = type_compatibility(from_type, to_type);

    let mut confidence =
        name * NAME_WEIGHT + type_score + description_overlap * DESCRIPTION_WEIGHT;
    if name == 1.0 && type_score >= 0.0 {
        confidence += EXACT_MATCH_BONUS;
    }
    if name == 1.0 {
        confidence = confidence.max(EXACT_NAME_FLOOR);
    }
    confidence.clamp(0.0, 1.0)
}

/// Similarity of two field names in [0, 1].
///
/// Lowercased and trimmed; 1.0 for equality, 0.8 when one contains the
/// other and the shorter has length >= 3, 0.7 for containment below that,
/// otherwise Jaccard over word tokens of length > 2.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    if a.contains(&b) || b.contains(&a) {
        let shorter = a.len().min(b.len());
        return if shorter >= 3 { 0.8 } else { 0.7 };
    }
    text::jaccard(&text::word_tokens(&a), &text::word_tokens(&b))
}

/// Type compatibility score for an output feeding an input.
///
/// 0.3 exact, 0.2 for safe widenings, -0.5 for known-incompatible pairs,
/// 0 otherwise (including `any` on either side).
pub fn type_compatibility(from: &str, to: &str) -> f64 {
    if from == to {
        return 0.3;
    }
    if is_safe_widening(from, to) {
        return 0.2;
    }
    if is_known_incompatible(from, to) {
        return -0.5;
    }
    0.0
}

/// Whether an output of type `from` can safely feed an input of type `to`.
/// Used by the chaining rules; `any` on either side never counts as a
/// mismatch.
pub fn is_type_compatible(from: &str, to: &str) -> bool {
    from == to || from == "any" || to == "any" || is_safe_widening(from, to)
}

fn is_safe_widening(from: &str, to: &str) -> bool {
    matches!(
        (from, to),
        ("number", "string")
            | ("integer", "string")
            | ("integer", "number")
            | ("array", "string")
            | ("object", "string")
    )
}

fn is_known_incompatible(from: &str, to: &str) -> bool {
    matches!(
        (from, to),
        ("string", "number")
            | ("string", "integer")
            | ("number", "boolean")
            | ("integer", "boolean")
    )
}
