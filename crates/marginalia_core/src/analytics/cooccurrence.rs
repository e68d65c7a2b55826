//! Code co-occurrence matrices.
//!
//! # Invariants
//! - Matrices are square over the top-N codes and symmetric.
//! - The diagonal holds raw coding frequency.

use crate::analytics::frequency::{code_frequencies, top_codes, CodeFrequency};
use crate::config::DEFAULT_PROXIMITY_WINDOW;
use crate::model::annotation::{Coding, Span};
use crate::model::code::{Code, CodeId};
use crate::model::document::DocumentId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// How proximate coding pairs contribute to a segment-mode cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProximityCounting {
    /// Every proximate pair adds 1.
    #[default]
    EveryPair,
    /// A document adds at most 1 to each cell.
    OncePerDocument,
}

/// Segment-mode tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProximityOptions {
    /// Maximum gap in chars between two codings that still co-occur.
    pub window: usize,
    pub counting: ProximityCounting,
}

impl Default for ProximityOptions {
    fn default() -> Self {
        Self {
            window: DEFAULT_PROXIMITY_WINDOW,
            counting: ProximityCounting::default(),
        }
    }
}

/// Square co-occurrence matrix over `codes`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CooccurrenceMatrix {
    /// Row and column labels, in frequency order.
    pub codes: Vec<CodeFrequency>,
    pub cells: Vec<Vec<u64>>,
}

impl CooccurrenceMatrix {
    fn zeroed(codes: Vec<CodeFrequency>) -> Self {
        let size = codes.len();
        let mut cells = vec![vec![0; size]; size];
        for (index, code) in codes.iter().enumerate() {
            cells[index][index] = code.count;
        }
        Self { codes, cells }
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn get(&self, row: usize, column: usize) -> Option<u64> {
        self.cells.get(row)?.get(column).copied()
    }

    /// Cell value by code ids; `None` when either code is not a label.
    pub fn value_for(&self, left: CodeId, right: CodeId) -> Option<u64> {
        let row = self.position(left)?;
        let column = self.position(right)?;
        self.get(row, column)
    }

    pub fn position(&self, code_id: CodeId) -> Option<usize> {
        self.codes.iter().position(|code| code.code_id == code_id)
    }

    pub fn is_symmetric(&self) -> bool {
        (0..self.len()).all(|row| {
            (0..row).all(|column| self.cells[row][column] == self.cells[column][row])
        })
    }

    fn bump(&mut self, row: usize, column: usize, amount: u64) {
        self.cells[row][column] += amount;
        self.cells[column][row] += amount;
    }
}

/// Document-mode matrix: off-diagonal cells count documents containing both
/// codes.
pub fn document_cooccurrence(codes: &[Code], codings: &[Coding], top_n: usize) -> CooccurrenceMatrix {
    let frequencies = code_frequencies(codes, codings);
    let mut matrix = CooccurrenceMatrix::zeroed(top_codes(&frequencies, top_n).to_vec());
    let index = label_index(&matrix);

    let mut present: HashMap<DocumentId, BTreeSet<usize>> = HashMap::new();
    for coding in codings {
        if let Some(position) = index.get(&coding.code_id) {
            present.entry(coding.document_id).or_default().insert(*position);
        }
    }
    for positions in present.values() {
        let positions = positions.iter().copied().collect::<Vec<_>>();
        for (offset, row) in positions.iter().enumerate() {
            for column in &positions[offset + 1..] {
                matrix.bump(*row, *column, 1);
            }
        }
    }
    matrix
}

/// Segment-mode matrix: off-diagonal cells count coding pairs in the same
/// document that overlap or lie within `options.window` chars.
pub fn segment_cooccurrence(
    codes: &[Code],
    codings: &[Coding],
    top_n: usize,
    options: ProximityOptions,
) -> CooccurrenceMatrix {
    let frequencies = code_frequencies(codes, codings);
    let mut matrix = CooccurrenceMatrix::zeroed(top_codes(&frequencies, top_n).to_vec());
    let index = label_index(&matrix);

    let mut by_document: HashMap<DocumentId, Vec<(usize, Span)>> = HashMap::new();
    for coding in codings {
        if let Some(position) = index.get(&coding.code_id) {
            by_document
                .entry(coding.document_id)
                .or_default()
                .push((*position, coding.span()));
        }
    }

    for entries in by_document.values() {
        let mut pairs: HashMap<(usize, usize), u64> = HashMap::new();
        for (offset, (left_code, left_span)) in entries.iter().enumerate() {
            for (right_code, right_span) in &entries[offset + 1..] {
                if left_code == right_code || left_span.gap_to(right_span) > options.window {
                    continue;
                }
                let key = (*left_code.min(right_code), *left_code.max(right_code));
                *pairs.entry(key).or_default() += 1;
            }
        }
        for ((row, column), count) in pairs {
            let amount = match options.counting {
                ProximityCounting::EveryPair => count,
                ProximityCounting::OncePerDocument => 1,
            };
            matrix.bump(row, column, amount);
        }
    }
    matrix
}

fn label_index(matrix: &CooccurrenceMatrix) -> HashMap<CodeId, usize> {
    matrix
        .codes
        .iter()
        .enumerate()
        .map(|(position, code)| (code.code_id, position))
        .collect()
}
