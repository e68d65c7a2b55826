//! Code x document heatmap.

use crate::analytics::frequency::{code_frequencies, top_codes, CodeFrequency};
use crate::model::annotation::Coding;
use crate::model::code::{Code, CodeId};
use crate::model::document::DocumentId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Coding count of one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentCount {
    pub document_id: DocumentId,
    pub count: u64,
}

/// Top codes by top documents.
///
/// `cells[row][column]` counts codings of `codes[row]` in
/// `documents[column]`. Totals are taken over this submatrix only, so
/// `sum(row_totals) == sum(column_totals) == total`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Heatmap {
    pub codes: Vec<CodeFrequency>,
    pub documents: Vec<DocumentCount>,
    pub cells: Vec<Vec<u64>>,
    pub row_totals: Vec<u64>,
    pub column_totals: Vec<u64>,
    pub total: u64,
}

/// Builds the heatmap.
///
/// `document_ids` gives document insertion order; it breaks ties between
/// documents with equal coding counts. Documents without codings are left
/// out, as are codings of documents missing from `document_ids`.
///
/// Columns are the `document_limit` documents with the most codings across
/// every code, not only the selected rows. A column can therefore be all
/// zeros when a document's codings all belong to codes outside the top
/// `code_limit`. Totals cover the displayed cells only.
pub fn code_document_heatmap(
    codes: &[Code],
    codings: &[Coding],
    document_ids: &[DocumentId],
    code_limit: usize,
    document_limit: usize,
) -> Heatmap {
    let frequencies = code_frequencies(codes, codings);
    let codes = top_codes(&frequencies, code_limit).to_vec();

    let mut per_document: HashMap<DocumentId, u64> = HashMap::new();
    for coding in codings {
        *per_document.entry(coding.document_id).or_default() += 1;
    }
    let mut documents = document_ids
        .iter()
        .filter_map(|id| {
            per_document.get(id).map(|count| DocumentCount {
                document_id: *id,
                count: *count,
            })
        })
        .collect::<Vec<_>>();
    documents.sort_by(|left, right| right.count.cmp(&left.count));
    documents.truncate(document_limit);

    let rows: HashMap<CodeId, usize> = codes
        .iter()
        .enumerate()
        .map(|(row, code)| (code.code_id, row))
        .collect();
    let columns: HashMap<DocumentId, usize> = documents
        .iter()
        .enumerate()
        .map(|(column, document)| (document.document_id, column))
        .collect();

    let mut cells = vec![vec![0u64; documents.len()]; codes.len()];
    for coding in codings {
        if let (Some(row), Some(column)) =
            (rows.get(&coding.code_id), columns.get(&coding.document_id))
        {
            cells[*row][*column] += 1;
        }
    }

    let row_totals = cells.iter().map(|row| row.iter().sum()).collect::<Vec<u64>>();
    let column_totals = (0..documents.len())
        .map(|column| cells.iter().map(|row| row[column]).sum())
        .collect::<Vec<u64>>();
    let total = row_totals.iter().sum();

    Heatmap {
        codes,
        documents,
        cells,
        row_totals,
        column_totals,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::code_document_heatmap;
    use crate::model::annotation::Coding;
    use crate::model::code::Code;
    use uuid::Uuid;

    fn coding(code: &Code, document_id: Uuid) -> Coding {
        Coding {
            id: Uuid::new_v4(),
            code_id: code.id,
            document_id,
            start: 0,
            end: 1,
            text: String::new(),
        }
    }

    #[test]
    fn excludes_uncoded_documents_and_orders_ties_by_insertion() {
        let x = Code::new("X", "#111111", None).unwrap();
        let y = Code::new("Y", "#222222", None).unwrap();
        let (d1, d2, d3) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let codings = vec![coding(&x, d2), coding(&y, d3), coding(&x, d3)];

        let heatmap = code_document_heatmap(&[x.clone(), y.clone()], &codings, &[d1, d2, d3], 10, 10);
        let columns = heatmap
            .documents
            .iter()
            .map(|document| document.document_id)
            .collect::<Vec<_>>();
        assert_eq!(columns, vec![d3, d2]);
        assert_eq!(heatmap.cells, vec![vec![1, 1], vec![1, 0]]);
        assert_eq!(heatmap.row_totals, vec![2, 1]);
        assert_eq!(heatmap.column_totals, vec![2, 1]);
        assert_eq!(heatmap.total, 3);
    }

    #[test]
    fn limits_shrink_the_submatrix_and_its_totals() {
        let x = Code::new("X", "#111111", None).unwrap();
        let y = Code::new("Y", "#222222", None).unwrap();
        let (d1, d2) = (Uuid::new_v4(), Uuid::new_v4());
        let codings = vec![coding(&x, d1), coding(&x, d1), coding(&y, d2)];

        let heatmap = code_document_heatmap(&[x, y], &codings, &[d1, d2], 1, 1);
        assert_eq!(heatmap.cells, vec![vec![2]]);
        assert_eq!(heatmap.total, 2);
    }

    #[test]
    fn busiest_document_can_be_an_empty_column_under_top_codes() {
        let x = Code::new("X", "#111111", None).unwrap();
        let y = Code::new("Y", "#222222", None).unwrap();
        let (d1, d2, d3, d4) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let codings = vec![
            coding(&x, d1),
            coding(&x, d3),
            coding(&x, d4),
            coding(&y, d2),
            coding(&y, d2),
        ];

        let heatmap = code_document_heatmap(&[x.clone(), y], &codings, &[d1, d2, d3, d4], 1, 2);
        assert_eq!(heatmap.codes[0].code_id, x.id);
        let columns = heatmap
            .documents
            .iter()
            .map(|document| document.document_id)
            .collect::<Vec<_>>();
        assert_eq!(columns, vec![d2, d1]);
        assert_eq!(heatmap.cells, vec![vec![0, 1]]);
        assert_eq!(heatmap.column_totals, vec![0, 1]);
        assert_eq!(heatmap.total, 1);
    }
}
