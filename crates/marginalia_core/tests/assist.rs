use marginalia_core::{
    AnnotationError, AnnotationRepository, Document, SuggestedCoding, SuggestedParaphrase,
    SuggestionOutcome, Workspace,
};

#[test]
fn accepted_and_rejected_suggestions_are_reported_in_order() {
    let mut workspace = Workspace::new();
    let document = workspace
        .add_document(Document::new("I was worried about money."))
        .unwrap();
    let code = workspace.taxonomy().add_code("Worry", "#cc3300", None).unwrap();

    let suggestions = vec![
        SuggestedCoding {
            code_id: code.id,
            start: 6,
            end: 13,
            text: "worried".to_string(),
        },
        SuggestedCoding {
            code_id: code.id,
            start: 20,
            end: 25,
            text: "mone".to_string(),
        },
        SuggestedCoding {
            code_id: code.id,
            start: 20,
            end: 40,
            text: "money.".to_string(),
        },
    ];
    let outcomes = workspace.accept_suggested_codings(document, &suggestions);

    assert!(outcomes[0].is_accepted());
    assert_eq!(
        outcomes[1],
        SuggestionOutcome::Rejected(AnnotationError::TextMismatch { start: 20, end: 25 })
    );
    assert!(matches!(
        outcomes[2],
        SuggestionOutcome::Rejected(AnnotationError::OutOfBounds { .. })
    ));
    assert_eq!(workspace.annotations().coding_count(), 1);
    assert_eq!(workspace.annotations().list_codings()[0].text, "worried");
}

#[test]
fn paraphrase_suggestions_use_manual_validation() {
    let mut workspace = Workspace::new();
    let document = workspace
        .add_document(Document::new("The budget was tight."))
        .unwrap();

    let outcomes = workspace.accept_suggested_paraphrases(
        document,
        &[
            SuggestedParaphrase {
                start: 0,
                end: 10,
                paraphrase_text: " Money ".to_string(),
                generalization: Some("finances".to_string()),
                category_id: None,
            },
            SuggestedParaphrase {
                start: 0,
                end: 10,
                paraphrase_text: "  ".to_string(),
                generalization: None,
                category_id: None,
            },
        ],
    );

    let SuggestionOutcome::Accepted(id) = outcomes[0] else {
        panic!("first suggestion should be accepted");
    };
    assert_eq!(
        outcomes[1],
        SuggestionOutcome::Rejected(AnnotationError::EmptyParaphrase)
    );
    let paraphrase = workspace.annotations().get_paraphrase(id).unwrap();
    assert_eq!(paraphrase.original_text, "The budget");
    assert_eq!(paraphrase.paraphrase_text, "Money");
}

#[test]
fn suggestion_wire_shape_is_camel_case() {
    let suggestion: SuggestedCoding = serde_json::from_str(
        r#"{ "codeId": "6f1c7a3e-4b8e-4a57-9f3b-2d1a0c9e8b71", "start": 1, "end": 4, "text": "abc" }"#,
    )
    .unwrap();
    assert_eq!(suggestion.end, 4);

    let value = serde_json::to_value(&suggestion).unwrap();
    assert!(value.get("codeId").is_some());
    assert!(value.get("code_id").is_none());
}
