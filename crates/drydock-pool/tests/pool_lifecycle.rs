//! Integration tests for the pool lifecycle with MemoryReviewClient.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};

use drydock_core::{ChangeId, ChangeStatus};
use drydock_pool::{GateConfig, PoolConfig, PoolError, TreeGate, UnreachablePolicy, ValidationPool};
use drydock_review::fakes::{MemoryReviewClient, ScriptedChange};

/// Serve canned HTTP responses with the given tree state on a local port
/// until the listener is dropped.
async fn serve_tree_state(state: &'static str) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind failed");
    let addr = listener.local_addr().expect("no local addr");
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let body = format!("{{\"general_state\":\"{}\"}}", state);
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });
    format!("http://{}/current?format=json", addr)
}

async fn gate_reporting(state: &'static str) -> TreeGate {
    let url = serve_tree_state(state).await;
    TreeGate::new(GateConfig {
        status_url: url,
        max_attempts: 3,
        backoff_base_ms: 1,
        request_timeout_ms: 2_000,
        on_unreachable: UnreachablePolicy::FailOpen,
    })
}

fn id(n: &str) -> ChangeId {
    ChangeId::new("platform/build", n, "deadbeef")
}

/// Workspace root with the staged project present.
fn workspace() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir failed");
    std::fs::create_dir_all(dir.path().join("platform/build")).expect("mkdir failed");
    dir
}

/// Test: acquisition under an open tree fetches, filters, and binds.
#[tokio::test]
async fn test_acquire_open_tree() {
    let gate = gate_reporting("open").await;
    let client = Arc::new(MemoryReviewClient::new());
    client.stage(ScriptedChange::new(id("1")));
    client.stage(ScriptedChange::new(ChangeId::new(
        "third_party/gone",
        "2",
        "bbb",
    )));

    let root = workspace();
    let pool = ValidationPool::acquire(
        &gate,
        client.clone(),
        "main",
        root.path(),
        false,
        &PoolConfig::default(),
    )
    .await
    .expect("acquire failed");

    // The change outside the workspace is filtered out.
    assert_eq!(pool.len(), 1);
    assert_eq!(pool.entries()[0].change.id(), &id("1"));
    assert_eq!(pool.entries()[0].status, ChangeStatus::Pending);
    assert_eq!(client.list_calls(), 1);
}

/// Test: a closed tree blocks acquisition before any review query.
#[tokio::test]
async fn test_acquire_closed_tree_fetches_nothing() {
    let gate = gate_reporting("closed").await;
    let client = Arc::new(MemoryReviewClient::new());
    client.stage(ScriptedChange::new(id("1")));

    let root = workspace();
    let err = ValidationPool::acquire(
        &gate,
        client.clone(),
        "main",
        root.path(),
        false,
        &PoolConfig::default(),
    )
    .await
    .expect_err("acquire should fail");

    assert!(err.is_tree_closed());
    assert_eq!(client.list_calls(), 0, "no review query under a closed tree");
}

/// Test: one failing change is isolated; the rest of the pool proceeds.
#[tokio::test]
async fn test_apply_partial_failure_isolated() {
    let gate = gate_reporting("open").await;
    let client = Arc::new(MemoryReviewClient::new());
    let good_a = ScriptedChange::new(id("1"));
    let bad = ScriptedChange::failing_apply(id("2"));
    let good_b = ScriptedChange::new(id("3"));
    for change in [good_a.clone(), bad.clone(), good_b.clone()] {
        client.stage(change);
    }

    let root = workspace();
    let mut pool = ValidationPool::acquire(
        &gate,
        client.clone(),
        "main",
        root.path(),
        false,
        &PoolConfig::default(),
    )
    .await
    .expect("acquire failed");
    assert_eq!(pool.len(), 3);

    let repo = tempfile::tempdir().expect("tempdir failed");
    assert!(pool.apply_into_repo(repo.path()).await, "two changes remain");

    assert_eq!(pool.len(), 2);
    assert_eq!(bad.could_not_apply_calls(), 1, "exactly one notification");
    assert_eq!(good_a.could_not_apply_calls(), 0);
    assert_eq!(good_b.could_not_apply_calls(), 0);

    // The evicted change does not reappear in the submit iteration.
    pool.submit(&gate).await.expect("submit failed");
    assert_eq!(bad.submit_calls(), 0);
    assert_eq!(good_a.submit_calls(), 1);
    assert_eq!(good_b.submit_calls(), 1);
    assert_eq!(client.submitted(), vec![id("1"), id("3")]);
}

/// Test: every change is attempted even when one submit fails.
/// Regression pin for the corrected early-return in the submit loop.
#[tokio::test]
async fn test_submit_attempts_every_change() {
    let gate = gate_reporting("open").await;
    let client = Arc::new(MemoryReviewClient::new());
    let a = ScriptedChange::new(id("1"));
    let b = ScriptedChange::new(id("2"));
    let c = ScriptedChange::new(id("3"));
    for change in [a.clone(), b.clone(), c.clone()] {
        client.stage(change);
    }
    client.reject_submit_for(id("2"));

    let root = workspace();
    let mut pool = ValidationPool::acquire(
        &gate,
        client.clone(),
        "main",
        root.path(),
        false,
        &PoolConfig::default(),
    )
    .await
    .expect("acquire failed");

    let repo = tempfile::tempdir().expect("tempdir failed");
    pool.apply_into_repo(repo.path()).await;

    let submitted = pool.submit(&gate).await.expect("submit failed");
    assert!(submitted, "submit reports success once the pool was iterated");

    assert_eq!(a.submit_calls(), 1);
    assert_eq!(b.submit_calls(), 1);
    assert_eq!(c.submit_calls(), 1);
    assert_eq!(b.could_not_submit_calls(), 1);
    assert_eq!(a.could_not_submit_calls(), 0);
    assert_eq!(c.could_not_submit_calls(), 0);

    let statuses: Vec<ChangeStatus> = pool.entries().iter().map(|e| e.status).collect();
    assert_eq!(
        statuses,
        vec![
            ChangeStatus::Submitted,
            ChangeStatus::SubmitFailed,
            ChangeStatus::Submitted
        ]
    );
    assert_eq!(client.submitted(), vec![id("1"), id("3")]);
}

/// Test: a tree that closed between apply and submit blocks all submits.
#[tokio::test]
async fn test_submit_closed_tree_submits_nothing() {
    let open_gate = gate_reporting("open").await;
    let closed_gate = gate_reporting("closed").await;
    let client = Arc::new(MemoryReviewClient::new());
    let change = ScriptedChange::new(id("1"));
    client.stage(change.clone());

    let root = workspace();
    let mut pool = ValidationPool::acquire(
        &open_gate,
        client.clone(),
        "main",
        root.path(),
        false,
        &PoolConfig::default(),
    )
    .await
    .expect("acquire failed");

    let repo = tempfile::tempdir().expect("tempdir failed");
    pool.apply_into_repo(repo.path()).await;

    let err = pool
        .submit(&closed_gate)
        .await
        .expect_err("submit should fail");
    assert!(matches!(err, PoolError::TreeClosed));
    assert_eq!(change.submit_calls(), 0);
    assert!(client.submitted().is_empty());
}

/// Test: dry run suppresses mutating calls but not advisory ones.
#[tokio::test]
async fn test_dryrun_suppresses_mutations() {
    let gate = gate_reporting("open").await;
    let client = Arc::new(MemoryReviewClient::new());
    let good = ScriptedChange::new(id("1"));
    let bad = ScriptedChange::failing_apply(id("2"));
    client.stage(good.clone());
    client.stage(bad.clone());

    let root = workspace();
    let mut pool = ValidationPool::acquire(
        &gate,
        client.clone(),
        "main",
        root.path(),
        true,
        &PoolConfig::default(),
    )
    .await
    .expect("acquire failed");
    assert!(pool.dryrun());

    let repo = tempfile::tempdir().expect("tempdir failed");
    pool.apply_into_repo(repo.path()).await;
    pool.submit(&gate).await.expect("submit failed");

    assert!(
        client.submitted().is_empty(),
        "no mutating call reaches the review system in dry run"
    );
    // Advisory notification for the apply failure still fired.
    assert_eq!(bad.could_not_apply_calls(), 1);
    assert_eq!(client.reviews().len(), 1);
    assert_eq!(pool.entries()[0].status, ChangeStatus::Submitted);
}

/// Test: validation failure notifies every change in the pool, once each.
#[tokio::test]
async fn test_validation_failure_notifies_whole_pool() {
    let gate = gate_reporting("open").await;
    let client = Arc::new(MemoryReviewClient::new());
    let a = ScriptedChange::new(id("1"));
    let b = ScriptedChange::new(id("2"));
    client.stage(a.clone());
    client.stage(b.clone());

    let root = workspace();
    let mut pool = ValidationPool::acquire(
        &gate,
        client.clone(),
        "main",
        root.path(),
        false,
        &PoolConfig::default(),
    )
    .await
    .expect("acquire failed");

    let repo = tempfile::tempdir().expect("tempdir failed");
    pool.apply_into_repo(repo.path()).await;
    pool.handle_validation_failure().await;

    assert_eq!(a.could_not_verify_calls(), 1);
    assert_eq!(b.could_not_verify_calls(), 1);
    assert!(pool
        .entries()
        .iter()
        .all(|e| e.status == ChangeStatus::ValidationFailed));
}

/// Test: snapshot capture and replay rebuild an equivalent pool without a
/// gate check.
#[tokio::test]
async fn test_snapshot_replay_round_trip() {
    let gate = gate_reporting("open").await;
    let client = Arc::new(MemoryReviewClient::new());
    client.stage(ScriptedChange::new(id("1")));
    client.stage(ScriptedChange::new(id("2")));

    let root = workspace();
    let pool = ValidationPool::acquire(
        &gate,
        client.clone(),
        "main",
        root.path(),
        false,
        &PoolConfig::default(),
    )
    .await
    .expect("acquire failed");

    let dir = tempfile::tempdir().expect("tempdir failed");
    let path: PathBuf = dir.path().join("pool.json");
    pool.to_snapshot().save(&path).expect("save failed");

    let snapshot = drydock_review::PoolSnapshot::load(&path).expect("load failed");
    let replayed =
        ValidationPool::acquire_from_snapshot(&snapshot, client, false, &PoolConfig::default())
            .await
            .expect("replay failed");

    assert_eq!(replayed.fingerprint(), pool.fingerprint());
    assert_eq!(replayed.len(), 2);
    assert_eq!(replayed.branch(), "main");
}
