//! Per-code coding counts.

use crate::model::annotation::Coding;
use crate::model::code::{Code, CodeId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Coding count of one code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeFrequency {
    pub code_id: CodeId,
    pub name: String,
    pub color: String,
    pub count: u64,
}

/// Counts codings per code.
///
/// `codes` must be in insertion order. Every code appears in the result,
/// sorted by descending count with ties kept in insertion order. Codings of
/// unknown codes are ignored.
pub fn code_frequencies(codes: &[Code], codings: &[Coding]) -> Vec<CodeFrequency> {
    let mut counts: HashMap<CodeId, u64> = HashMap::with_capacity(codes.len());
    for coding in codings {
        *counts.entry(coding.code_id).or_default() += 1;
    }

    let mut frequencies = codes
        .iter()
        .map(|code| CodeFrequency {
            code_id: code.id,
            name: code.name.clone(),
            color: code.color.clone(),
            count: counts.get(&code.id).copied().unwrap_or(0),
        })
        .collect::<Vec<_>>();
    // `sort_by` is stable, so equal counts keep insertion order.
    frequencies.sort_by(|left, right| right.count.cmp(&left.count));
    frequencies
}

/// First `n` entries of an already sorted frequency list.
pub fn top_codes(frequencies: &[CodeFrequency], n: usize) -> &[CodeFrequency] {
    &frequencies[..n.min(frequencies.len())]
}
