use marginalia_core::{
    AnnotationError, AnnotationRepository, CodeId, Document, DocumentId, OrphanReference,
    ParaphraseDraft, Workspace,
};
use uuid::Uuid;

fn setup() -> (Workspace, DocumentId, CodeId) {
    let mut workspace = Workspace::new();
    let document = workspace
        .add_document(Document::new("The cat sat on the mat."))
        .unwrap();
    let code = workspace.taxonomy().add_code("Animal", "#aa5500", None).unwrap();
    (workspace, document, code.id)
}

fn draft(document_id: DocumentId, start: usize, end: usize, text: &str) -> ParaphraseDraft {
    ParaphraseDraft {
        document_id,
        start,
        end,
        paraphrase_text: text.to_string(),
        generalization: None,
        category_id: None,
    }
}

#[test]
fn create_coding_captures_snapshot_text() {
    let (mut workspace, document, code) = setup();
    let coding = workspace.intervals().create_coding(code, document, 4, 7).unwrap();

    assert_eq!(coding.text, "cat");
    assert_eq!(coding.code_id, code);
    assert_eq!(workspace.annotations().get_coding(coding.id), Some(coding));
}

#[test]
fn create_coding_rejects_bad_ranges_without_mutation() {
    let (mut workspace, document, code) = setup();
    let mut intervals = workspace.intervals();

    assert_eq!(
        intervals.create_coding(code, document, 5, 5).unwrap_err(),
        AnnotationError::InvalidRange { start: 5, end: 5 }
    );
    assert_eq!(
        intervals.create_coding(code, document, 7, 3).unwrap_err(),
        AnnotationError::InvalidRange { start: 7, end: 3 }
    );
    assert_eq!(
        intervals.create_coding(code, document, 0, 24).unwrap_err(),
        AnnotationError::OutOfBounds { end: 24, length: 23 }
    );
    assert_eq!(workspace.annotations().coding_count(), 0);
}

#[test]
fn create_coding_names_the_orphan_reference() {
    let (mut workspace, document, code) = setup();
    let missing_code = Uuid::new_v4();
    let missing_document = Uuid::new_v4();
    let mut intervals = workspace.intervals();

    assert_eq!(
        intervals
            .create_coding(missing_code, document, 0, 3)
            .unwrap_err(),
        AnnotationError::OrphanReference(OrphanReference::Code(missing_code))
    );
    assert_eq!(
        intervals
            .create_coding(code, missing_document, 0, 3)
            .unwrap_err(),
        AnnotationError::OrphanReference(OrphanReference::Document(missing_document))
    );
}

#[test]
fn whole_document_span_is_valid() {
    let (mut workspace, document, code) = setup();
    let coding = workspace
        .intervals()
        .create_coding(code, document, 0, 23)
        .unwrap();
    assert_eq!(coding.text, "The cat sat on the mat.");
}

#[test]
fn paraphrase_is_trimmed_and_blank_text_rejected() {
    let (mut workspace, document, _) = setup();
    let mut intervals = workspace.intervals();

    let mut input = draft(document, 0, 11, "  A feline rested.  ");
    input.generalization = Some("   ".to_string());
    let paraphrase = intervals.create_paraphrase(input).unwrap();
    assert_eq!(paraphrase.original_text, "The cat sat");
    assert_eq!(paraphrase.paraphrase_text, "A feline rested.");
    assert_eq!(paraphrase.generalization, None);

    assert_eq!(
        intervals
            .create_paraphrase(draft(document, 0, 3, " \n "))
            .unwrap_err(),
        AnnotationError::EmptyParaphrase
    );
}

#[test]
fn update_paraphrase_keeps_span() {
    let (mut workspace, document, _) = setup();
    let mut intervals = workspace.intervals();
    let paraphrase = intervals
        .create_paraphrase(draft(document, 4, 11, "animal rests"))
        .unwrap();

    let updated = intervals
        .update_paraphrase(paraphrase.id, "pet sits", Some("rest"))
        .unwrap();
    assert_eq!(updated.start, 4);
    assert_eq!(updated.end, 11);
    assert_eq!(updated.paraphrase_text, "pet sits");
    assert_eq!(updated.generalization.as_deref(), Some("rest"));

    let missing = Uuid::new_v4();
    assert_eq!(
        intervals.update_paraphrase(missing, "x", None).unwrap_err(),
        AnnotationError::ParaphraseNotFound(missing)
    );
}

#[test]
fn remove_missing_ids_report_not_found() {
    let (mut workspace, document, code) = setup();
    let mut intervals = workspace.intervals();
    let coding = intervals.create_coding(code, document, 0, 3).unwrap();

    intervals.remove_coding(coding.id).unwrap();
    assert_eq!(
        intervals.remove_coding(coding.id).unwrap_err(),
        AnnotationError::CodingNotFound(coding.id)
    );
    let missing = Uuid::new_v4();
    assert_eq!(
        intervals.remove_paraphrase(missing).unwrap_err(),
        AnnotationError::ParaphraseNotFound(missing)
    );
}

#[test]
fn list_by_document_orders_by_span() {
    let (mut workspace, document, code) = setup();
    let other = workspace.add_document(Document::new("unrelated")).unwrap();
    let mut intervals = workspace.intervals();

    let late = intervals.create_coding(code, document, 8, 11).unwrap();
    let early = intervals.create_coding(code, document, 0, 3).unwrap();
    intervals.create_coding(code, other, 0, 9).unwrap();
    let paraphrase = intervals
        .create_paraphrase(draft(document, 4, 7, "feline"))
        .unwrap();

    let listed = intervals.list_by_document(document).unwrap();
    let ids = listed.codings.iter().map(|coding| coding.id).collect::<Vec<_>>();
    assert_eq!(ids, vec![early.id, late.id]);
    assert_eq!(listed.paraphrases.len(), 1);
    assert_eq!(listed.paraphrases[0].id, paraphrase.id);
    assert_eq!(listed.len(), 3);

    assert_eq!(intervals.codings_for_code(code).unwrap().len(), 3);
}

#[test]
fn overlapping_codings_of_same_code_coexist() {
    let (mut workspace, document, code) = setup();
    let mut intervals = workspace.intervals();
    intervals.create_coding(code, document, 0, 7).unwrap();
    intervals.create_coding(code, document, 4, 11).unwrap();

    let at_five = intervals.annotations_at(document, 5).unwrap();
    assert_eq!(at_five.codings.len(), 2);
    let at_end = intervals.annotations_at(document, 11).unwrap();
    assert!(at_end.is_empty());
}

#[test]
fn multibyte_offsets_count_chars() {
    let mut workspace = Workspace::new();
    let document = workspace.add_document(Document::new("naïve café")).unwrap();
    let code = workspace.taxonomy().add_code("Word", "#000000", None).unwrap();

    let coding = workspace
        .intervals()
        .create_coding(code.id, document, 6, 10)
        .unwrap();
    assert_eq!(coding.text, "café");
}
