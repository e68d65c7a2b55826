use marginalia_core::{
    AnnotationRepository, CodeRecord, CodeRepository, CodingRecord, Document, DocumentId,
    ImportBatch, ImportError, ImportRecordKind, ParaphraseRecord, ProjectBundle, Workspace,
};
use std::io::Write;
use uuid::Uuid;

fn workspace_with(text: &str) -> (Workspace, DocumentId) {
    let mut workspace = Workspace::new();
    let document = workspace.add_document(Document::new(text)).unwrap();
    (workspace, document)
}

fn code_record(name: &str, parent_id: Option<Uuid>) -> CodeRecord {
    CodeRecord {
        id: Uuid::new_v4(),
        name: name.to_string(),
        color: "#336699".to_string(),
        parent_id,
    }
}

fn coding_record(code_id: Uuid, document_id: DocumentId, start: usize, end: usize) -> CodingRecord {
    CodingRecord {
        id: Uuid::new_v4(),
        code_id,
        document_id,
        start,
        end,
        text: None,
    }
}

#[test]
fn valid_batch_commits_everything() {
    let (mut workspace, document) = workspace_with("Interview transcript text.");
    // Child listed before its parent.
    let parent = code_record("Theme", None);
    let child = code_record("Subtheme", Some(parent.id));
    let batch = ImportBatch {
        codes: vec![child.clone(), parent.clone()],
        codings: vec![CodingRecord {
            text: Some("Interview".to_string()),
            ..coding_record(child.id, document, 0, 9)
        }],
        paraphrases: vec![ParaphraseRecord {
            id: Uuid::new_v4(),
            document_id: document,
            start: 10,
            end: 20,
            original_text: None,
            paraphrase_text: "a transcript".to_string(),
            generalization: Some("record".to_string()),
            category_id: None,
        }],
    };

    let report = workspace.import(&batch).unwrap();
    assert_eq!((report.codes, report.codings, report.paraphrases), (2, 1, 1));
    assert_eq!(
        workspace.codes().get_code(child.id).unwrap().parent_id,
        Some(parent.id)
    );
    let listed = workspace.annotations().annotations_for_document(document);
    assert_eq!(listed.codings[0].text, "Interview");
    assert_eq!(listed.paraphrases[0].original_text, "transcript");
}

#[test]
fn any_failure_rejects_whole_batch_and_reports_each_record() {
    let (mut workspace, document) = workspace_with("short");
    let good = code_record("Good", None);
    let blank = code_record("   ", None);
    let batch = ImportBatch {
        codes: vec![good.clone(), blank.clone()],
        codings: vec![
            coding_record(good.id, document, 0, 5),
            coding_record(good.id, document, 3, 99),
            coding_record(Uuid::new_v4(), document, 0, 1),
        ],
        paraphrases: Vec::new(),
    };
    let version = workspace.version();

    let err = workspace.import(&batch).unwrap_err();
    let failures = err.failures();
    assert!(matches!(err, ImportError::Rejected(_)));
    assert_eq!(failures.len(), 3);
    assert_eq!(failures[0].kind, ImportRecordKind::Code);
    assert_eq!(failures[0].id, blank.id);
    assert_eq!((failures[1].kind, failures[1].index), (ImportRecordKind::Coding, 1));
    assert_eq!((failures[2].kind, failures[2].index), (ImportRecordKind::Coding, 2));

    assert!(workspace.codes().is_empty());
    assert_eq!(workspace.annotations().coding_count(), 0);
    assert_eq!(workspace.version(), version);
}

#[test]
fn cyclic_parent_chain_in_batch_is_rejected() {
    let (mut workspace, _) = workspace_with("text");
    let mut first = code_record("First", None);
    let second = code_record("Second", Some(first.id));
    first.parent_id = Some(second.id);

    let err = workspace
        .import(&ImportBatch {
            codes: vec![first, second],
            ..ImportBatch::default()
        })
        .unwrap_err();
    assert_eq!(err.failures().len(), 2);
    assert!(err.failures()[0].reason.contains("cycle"));
}

#[test]
fn duplicate_ids_and_text_mismatch_are_rejected() {
    let (mut workspace, document) = workspace_with("abcdef");
    let existing = workspace.taxonomy().add_code("Existing", "#000000", None).unwrap();
    let duplicate = CodeRecord {
        id: existing.id,
        ..code_record("Again", None)
    };
    let mismatched = CodingRecord {
        text: Some("zzz".to_string()),
        ..coding_record(existing.id, document, 0, 3)
    };
    let batch = ImportBatch {
        codes: vec![duplicate],
        codings: vec![mismatched.clone(), mismatched],
        paraphrases: Vec::new(),
    };

    let err = workspace.import(&batch).unwrap_err();
    let reasons = err
        .failures()
        .iter()
        .map(|failure| failure.reason.as_str())
        .collect::<Vec<_>>();
    assert_eq!(reasons.len(), 3);
    assert!(reasons[0].contains("duplicate code id"));
    assert!(reasons[1].contains("does not match"));
    assert!(reasons[2].contains("duplicate coding id"));
    assert_eq!(workspace.codes().len(), 1);
}

#[test]
fn parent_may_reference_existing_code() {
    let (mut workspace, _) = workspace_with("text");
    let root = workspace.taxonomy().add_code("Root", "#000000", None).unwrap();
    let child = code_record("Child", Some(root.id));

    workspace
        .import(&ImportBatch {
            codes: vec![child.clone()],
            ..ImportBatch::default()
        })
        .unwrap();
    assert_eq!(workspace.codes().list_children(Some(root.id))[0].id, child.id);
}

#[test]
fn unknown_document_is_reported() {
    let (mut workspace, _) = workspace_with("text");
    let code = code_record("Code", None);
    let missing = Uuid::new_v4();
    let batch = ImportBatch {
        codes: vec![code.clone()],
        codings: vec![coding_record(code.id, missing, 0, 1)],
        paraphrases: Vec::new(),
    };

    let err = workspace.import(&batch).unwrap_err();
    assert_eq!(err.failures().len(), 1);
    assert!(err.failures()[0].reason.contains(&missing.to_string()));
}

#[test]
fn batch_decodes_from_json_file() {
    let code_id = Uuid::new_v4();
    let document_id = Uuid::new_v4();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r##"{{
            "codes": [{{ "id": "{code_id}", "name": "Joy", "color": "#FFCC00" }}],
            "codings": [{{
                "id": "{coding_id}", "codeId": "{code_id}", "documentId": "{document_id}",
                "start": 0, "end": 5, "text": "Happy"
            }}]
        }}"##,
        coding_id = Uuid::new_v4()
    )
    .unwrap();

    let batch = ImportBatch::from_path(file.path()).unwrap();
    assert_eq!(batch.codes.len(), 1);
    assert!(batch.paraphrases.is_empty());

    let mut workspace = Workspace::new();
    workspace
        .add_document(Document::with_id(document_id, "Happy days"))
        .unwrap();
    workspace.import(&batch).unwrap();
    assert_eq!(workspace.codes().get_code(code_id).unwrap().color, "#ffcc00");

    assert!(matches!(
        ImportBatch::from_json_str("{ not json"),
        Err(ImportError::Decode(_))
    ));
    assert!(matches!(
        ImportBatch::from_path(file.path().with_extension("missing")),
        Err(ImportError::Io { .. })
    ));
}

#[test]
fn bundle_builds_workspace_with_config() {
    let document_id = Uuid::new_v4();
    let code_id = Uuid::new_v4();
    let json = format!(
        r##"{{
            "documents": [{{ "id": "{document_id}", "text": "We felt hopeful." }}],
            "batch": {{
                "codes": [{{ "id": "{code_id}", "name": "Hope", "color": "#00aa00" }}],
                "codings": [{{
                    "id": "{coding_id}", "codeId": "{code_id}",
                    "documentId": "{document_id}", "start": 8, "end": 15
                }}]
            }},
            "config": {{ "analytics": {{ "topN": 2 }} }}
        }}"##,
        coding_id = Uuid::new_v4()
    );

    let bundle = ProjectBundle::from_json_str(&json).unwrap();
    let workspace = Workspace::from_bundle(bundle).unwrap();
    assert_eq!(workspace.config().analytics.top_n, 2);
    assert_eq!(workspace.frequencies()[0].count, 1);
    assert_eq!(workspace.annotations().list_codings()[0].text, "hopeful");
}
