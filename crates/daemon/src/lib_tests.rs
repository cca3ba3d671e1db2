use super::*;
use serial_test::serial;

fn clear_all() {
    for (key, _) in std::env::vars() {
        if key.starts_with("AGENTMC_") {
            std::env::remove_var(key);
        }
    }
}

#[tokio::test]
#[serial]
async fn run_errors_immediately_when_no_credential_is_configured() {
    clear_all();
    let (_tx, rx) = oneshot::channel();

    let result = run(rx).await;

    assert!(result.is_err());
    let err = result.unwrap_err();
    assert_eq!(err.kind, RuntimeErrorKind::Configuration);
}
