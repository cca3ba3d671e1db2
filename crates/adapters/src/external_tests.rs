use super::*;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use tempfile::NamedTempFile;

fn script(body: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "#!/bin/sh").unwrap();
    writeln!(file, "{body}").unwrap();
    file.as_file().set_permissions(std::fs::Permissions::from_mode(0o755)).unwrap();
    file
}

#[test]
fn parse_output_prefers_content_field() {
    let bytes = br#"{"content": "hello", "text": "ignored"}"#;
    assert_eq!(parse_output(bytes), "hello");
}

#[test]
fn parse_output_falls_back_to_raw_trimmed_stdout() {
    assert_eq!(parse_output(b"  plain text reply \n"), "plain text reply");
}

#[tokio::test]
async fn run_parses_json_stdout() {
    let file = script(r#"echo '{"content":"engine reply"}'"#);
    let result = run(
        file.path().to_str().unwrap(),
        SessionId::from(1),
        "req-1",
        "hello",
        Duration::from_secs(5),
    )
    .await
    .unwrap();
    assert_eq!(result.content, "engine reply");
}

#[tokio::test]
async fn run_surfaces_nonzero_exit() {
    let file = script("exit 2");
    let err = run(
        file.path().to_str().unwrap(),
        SessionId::from(1),
        "req-1",
        "hello",
        Duration::from_secs(5),
    )
    .await
    .unwrap_err();
    match err {
        ExternalRunError::NonZeroExit(code) => assert_eq!(code, 2),
        other => panic!("unexpected error: {other:?}"),
    }
}
