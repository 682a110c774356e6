//! Method-string interop for lineage documents written before tiers were typed.
//!
//! Older documents only carry a free-text method such as `"Analyst Brain"` or
//! `"Safe Parent Fallback (depth=2)"`. This is the single place such strings are
//! parsed; everything else dispatches on [`MappingEvidence`].

use crate::mapping::{mapping_confidence, MappingEvidence};
use crate::{Confidence, Scored};

/// Confidence assigned to a method string nothing here recognizes.
const UNKNOWN_METHOD_HUNDREDTHS: u32 = 60;

/// Recover typed evidence from a legacy method string.
///
/// Returns `None` for text that names no known method.
pub fn evidence_from_method(method: &str) -> Option<MappingEvidence> {
    let lower = method.trim().to_lowercase();

    if lower.is_empty() || lower.contains("unmapped") {
        return Some(MappingEvidence::Unmapped);
    }
    if lower.contains("brain") || lower.contains("user memory") || lower.contains("override") {
        return Some(MappingEvidence::Override);
    }
    if lower.contains("alias") {
        return Some(MappingEvidence::Alias);
    }
    if lower.contains("exact") || lower.contains("standard label") {
        return Some(MappingEvidence::ExactLabel);
    }
    if lower.contains("fuzzy") {
        let score = number_after(&lower, "score")
            .or_else(|| number_after(&lower, "conf="))
            .unwrap_or(0.0);
        return Some(MappingEvidence::Fuzzy { score });
    }
    if lower.contains("keyword") || lower.contains("partial") {
        return Some(MappingEvidence::Keyword);
    }
    if lower.contains("safe parent") || lower.contains("hierarchy") || lower.contains("fallback")
    {
        let depth = if lower.contains("depth=") {
            number_after(&lower, "depth=")
                .filter(|d| *d >= 0.0 && d.fract() == 0.0)
                .map(|d| d as usize)
                .unwrap_or(1)
        } else {
            0
        };
        return Some(MappingEvidence::Hierarchy { depth });
    }
    None
}

/// Score a legacy method string. Unknown methods get 0.60.
pub fn score_method(method: &str) -> Scored {
    match evidence_from_method(method) {
        Some(evidence) => mapping_confidence(&evidence),
        None => Scored::new(
            Confidence::from_hundredths(UNKNOWN_METHOD_HUNDREDTHS),
            format!("Unknown mapping method: {method}"),
        ),
    }
}

fn number_after(text: &str, marker: &str) -> Option<f64> {
    let start = text.find(marker)? + marker.len();
    let digits: String = text[start..]
        .trim_start_matches([' ', '='])
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    digits.parse().ok()
}
