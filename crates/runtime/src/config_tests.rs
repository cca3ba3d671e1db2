use super::*;

#[test]
fn gateway_exec_timeout_adds_thirty_second_margin() {
    assert_eq!(RuntimeConfig::gateway_exec_timeout(Duration::from_secs(90)), Duration::from_secs(120));
}

#[test]
fn session_poller_backoff_has_a_floor() {
    let mut config = RuntimeConfig { session_poll_interval: Duration::from_millis(100), ..Default::default() };
    assert_eq!(config.session_poller_backoff(), Duration::from_secs(4));
    config.session_poll_interval = Duration::from_secs(3);
    assert_eq!(config.session_poller_backoff(), Duration::from_secs(9));
}

#[test]
fn signal_poll_backoff_has_a_floor() {
    let config = RuntimeConfig { fallback_poll_interval: Duration::from_millis(500), ..Default::default() };
    assert_eq!(config.signal_poll_backoff(), Duration::from_millis(2500));
}
