use marginalia_core::{Code, CodeDeletePolicy, Coding, CoreConfig, Paraphrase};
use serde_json::json;
use uuid::Uuid;

#[test]
fn root_code_omits_parent_id() {
    let code = Code::new("Theme", "#abc", None).unwrap();
    let value = serde_json::to_value(&code).unwrap();

    assert_eq!(value["name"], "Theme");
    assert_eq!(value["color"], "#aabbcc");
    assert!(value.get("parentId").is_none());

    let child = Code::new("Sub", "#abcdef", Some(code.id)).unwrap();
    let value = serde_json::to_value(&child).unwrap();
    assert_eq!(value["parentId"], json!(code.id));
}

#[test]
fn coding_and_paraphrase_use_camel_case_fields() {
    let document_id = Uuid::new_v4();
    let coding = Coding {
        id: Uuid::new_v4(),
        code_id: Uuid::new_v4(),
        document_id,
        start: 2,
        end: 5,
        text: "abc".to_string(),
    };
    let value = serde_json::to_value(&coding).unwrap();
    assert_eq!(value["documentId"], json!(document_id));
    assert_eq!(value["codeId"], json!(coding.code_id));

    let paraphrase: Paraphrase = serde_json::from_value(json!({
        "id": Uuid::new_v4(),
        "documentId": document_id,
        "start": 0,
        "end": 3,
        "originalText": "abc",
        "paraphraseText": "letters"
    }))
    .unwrap();
    assert_eq!(paraphrase.generalization, None);
    assert_eq!(paraphrase.category_id, None);
}

#[test]
fn config_round_trips_through_json() {
    let mut config = CoreConfig::default();
    config.taxonomy.delete_policy = CodeDeletePolicy::Cascade;

    let text = serde_json::to_string(&config).unwrap();
    assert!(text.contains("\"deletePolicy\":\"cascade\""));
    assert_eq!(CoreConfig::from_json_str(&text).unwrap(), config);
}
