use super::*;

#[test]
fn chat_key_prefers_message_id() {
    assert_eq!(chat_key(Some("m1"), "r1"), "chat:message:m1");
}

#[test]
fn chat_key_falls_back_to_request_id() {
    assert_eq!(chat_key(None, "r1"), "chat:request:r1");
}

#[test]
fn file_op_key_distinguishes_save_and_delete() {
    assert_eq!(file_op_key(FileOp::Save, "r1", "doc1"), "doc.save:r1:doc1");
    assert_eq!(file_op_key(FileOp::Delete, "r1", "doc1"), "doc.delete:r1:doc1");
}

#[test]
fn notification_key_uses_id_and_version() {
    assert_eq!(notification_key(Some("n1"), Some("2026-01-01"), 5), "notification:id:n1:v:2026-01-01");
}

#[test]
fn notification_key_falls_back_to_signal_id() {
    assert_eq!(notification_key(None, None, 5), "signal:5");
}
