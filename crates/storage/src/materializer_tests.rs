use super::*;
use agentmc_core::hash::{absent_hash, sha256_hex};
use tempfile::TempDir;

#[tokio::test]
async fn materialize_file_writes_content_and_returns_hash() {
    let dir = TempDir::new().unwrap();
    let result = materialize_file(dir.path(), "AGENTS.md", "hello").await.unwrap();
    assert_eq!(tokio::fs::read_to_string(&result.path).await.unwrap(), "hello");
    assert_eq!(result.base_hash, sha256_hex(b"hello"));
}

#[tokio::test]
async fn materialize_file_creates_nested_directories() {
    let dir = TempDir::new().unwrap();
    let result = materialize_file(dir.path(), "skills/nested/doc.md", "body").await.unwrap();
    assert!(result.path.exists());
}

#[tokio::test]
async fn path_escape_is_refused() {
    let dir = TempDir::new().unwrap();
    let err = materialize_file(dir.path(), "../escape.md", "x").await.unwrap_err();
    assert!(matches!(err, MaterializeError::PathEscapesWorkspace(_)));
}

#[tokio::test]
async fn current_hash_is_absent_sentinel_for_missing_file() {
    let dir = TempDir::new().unwrap();
    let hash = current_hash(dir.path(), "missing.md").await.unwrap();
    assert_eq!(hash, absent_hash());
}

#[tokio::test]
async fn save_managed_file_succeeds_when_base_hash_matches_absent() {
    let dir = TempDir::new().unwrap();
    let result = save_managed_file(dir.path(), "doc.md", &absent_hash(), "new body").await.unwrap();
    assert_eq!(result.base_hash, sha256_hex(b"new body"));
}

#[tokio::test]
async fn save_managed_file_conflicts_on_mismatched_hash() {
    let dir = TempDir::new().unwrap();
    materialize_file(dir.path(), "doc.md", "original").await.unwrap();
    let err = save_managed_file(dir.path(), "doc.md", "wrong-hash", "new body").await.unwrap_err();
    match err {
        MaterializeError::Conflict { current_hash } => assert_eq!(current_hash, sha256_hex(b"original")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn save_managed_file_overwrites_when_hash_matches() {
    let dir = TempDir::new().unwrap();
    materialize_file(dir.path(), "doc.md", "original").await.unwrap();
    let base_hash = sha256_hex(b"original");
    save_managed_file(dir.path(), "doc.md", &base_hash, "updated").await.unwrap();
    let path = dir.path().join("doc.md");
    assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "updated");
}

#[tokio::test]
async fn remove_file_requires_existence() {
    let dir = TempDir::new().unwrap();
    let err = remove_file(dir.path(), "missing.md", &absent_hash()).await.unwrap_err();
    assert!(matches!(err, MaterializeError::NotFound(_)));
}

#[tokio::test]
async fn remove_file_conflicts_on_mismatched_hash() {
    let dir = TempDir::new().unwrap();
    materialize_file(dir.path(), "doc.md", "body").await.unwrap();
    let err = remove_file(dir.path(), "doc.md", "wrong").await.unwrap_err();
    assert!(matches!(err, MaterializeError::Conflict { .. }));
}

#[tokio::test]
async fn remove_file_deletes_when_hash_matches() {
    let dir = TempDir::new().unwrap();
    materialize_file(dir.path(), "doc.md", "body").await.unwrap();
    let base_hash = sha256_hex(b"body");
    remove_file(dir.path(), "doc.md", &base_hash).await.unwrap();
    assert!(!dir.path().join("doc.md").exists());
}
