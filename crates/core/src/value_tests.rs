use super::*;
use serde_json::json;

#[test]
fn round_trips_through_json() {
    let original = json!({"a": 1, "b": [true, null, "x"]});
    let tagged = TaggedValue::from_json(original.clone());
    assert_eq!(tagged.to_json(), original);
}

#[test]
fn narrowing_helpers_return_none_for_wrong_shape() {
    let tagged = TaggedValue::from_json(json!("hello"));
    assert_eq!(tagged.as_str(), Some("hello"));
    assert_eq!(tagged.as_bool(), None);
    assert_eq!(tagged.as_i64(), None);
}

#[test]
fn object_get_finds_nested_field() {
    let tagged = TaggedValue::from_json(json!({"notification": {"id": 7}}));
    let id = tagged.get("notification").and_then(|v| v.get("id")).and_then(|v| v.as_i64());
    assert_eq!(id, Some(7));
}
