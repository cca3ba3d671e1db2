use super::*;
use agentmc_core::SocketAuth;
use agentmc_hub::fake::FakeHubClient;
use agentmc_hub::types::RequestedSessionsResponse;
use std::sync::atomic::{AtomicUsize, Ordering};

fn auth() -> SocketAuth {
    SocketAuth {
        channel: "private-session-1".to_string(),
        event: "signal".to_string(),
        key: "key".to_string(),
        host: "hub.example.com".to_string(),
        scheme: "https".to_string(),
        port: 443,
        path: "/ws".to_string(),
        cluster: "mt1".to_string(),
    }
}

fn session(id: u64) -> Session {
    Session { id: SessionId(id), socket: auth(), requested_by_user_id: None, status: "requested".to_string() }
}

#[test]
fn sorts_sessions_descending_by_id() {
    let mut sessions = vec![session(1), session(3), session(2)];
    sort_sessions_descending(&mut sessions);
    assert_eq!(sessions.iter().map(|s| s.id.get()).collect::<Vec<_>>(), vec![3, 2, 1]);
}

#[test]
fn new_session_ids_excludes_known() {
    let sessions = vec![session(1), session(2), session(3)];
    let mut known = HashSet::new();
    known.insert(SessionId(2));
    let fresh = new_session_ids(&sessions, &known);
    assert_eq!(fresh, vec![SessionId(1), SessionId(3)]);
}

struct CountingSink {
    count: AtomicUsize,
}

impl ErrorSink for CountingSink {
    fn report(&self, _error: RuntimeError) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn spawns_one_worker_per_new_session_and_stops_on_shutdown() {
    let hub = FakeHubClient::new();
    hub.requested_sessions.lock().push_back(RequestedSessionsResponse { sessions: vec![session(1), session(2)] });

    let (spawn_tx, mut spawn_rx) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let sink = CountingSink { count: AtomicUsize::new(0) };

    let handle = tokio::spawn(async move {
        run(&hub, 10, Duration::from_millis(5), Duration::from_secs(4), spawn_tx, &sink, shutdown_rx).await;
        sink
    });

    let mut seen = HashSet::new();
    seen.insert(spawn_rx.recv().await.unwrap().id);
    seen.insert(spawn_rx.recv().await.unwrap().id);
    assert_eq!(seen, HashSet::from([SessionId(1), SessionId(2)]));

    shutdown_tx.send(()).unwrap();
    let sink = handle.await.unwrap();
    assert_eq!(sink.count.load(Ordering::SeqCst), 0);
}

#[test]
fn log_rate_limiter_suppresses_within_window() {
    let mut limiter = LogRateLimiter::new();
    let t0 = Instant::now();
    assert!(limiter.should_log(t0));
    assert!(!limiter.should_log(t0 + Duration::from_secs(1)));
    assert!(limiter.should_log(t0 + Duration::from_secs(6)));
}
