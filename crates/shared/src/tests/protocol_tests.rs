use super::*;
use chrono::TimeZone;

#[test]
fn list_response_decodes_server_shape() {
    let raw = r#"{
        "data": [
            {"id": "294", "title": "Dog", "description": "Good boy", "url": "https://i.example/dog.png", "ts": 1620000000000000}
        ],
        "after": "294"
    }"#;
    let page: ImagePage = serde_json::from_str(raw).expect("decode page");
    assert_eq!(page.data.len(), 1);
    assert_eq!(page.data[0].id, ImageId::new("294"));
    assert_eq!(
        page.data[0].created_at,
        Utc.timestamp_opt(1_620_000_000, 0).single().expect("ts")
    );
    assert_eq!(page.after, Some(Cursor::new("294")));
    assert!(page.has_next());
}

#[test]
fn null_or_missing_after_marks_last_page() {
    let explicit: ImagePage = serde_json::from_str(r#"{"data": [], "after": null}"#).expect("null");
    let missing: ImagePage = serde_json::from_str(r#"{"data": []}"#).expect("missing");
    assert!(!explicit.has_next());
    assert!(!missing.has_next());
}
