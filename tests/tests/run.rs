mod utils;
use utils::*;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wsst::prelude::*;
use wsst::{BoxFuture, RunError, CONNECTION_CLOSED, CONNECTION_OPENED};

#[scenario(description = "Checkpoint after 50ms, close after another 50ms", path = "/echo")]
async fn step_then_close(connection: &mut Connection, checkpoints: Checkpoints) -> ScenarioResult {
    tokio::time::sleep(Duration::from_millis(50)).await;
    checkpoints.checkpoint("step1");
    tokio::time::sleep(Duration::from_millis(50)).await;
    connection.close().await?;
    Ok(())
}

#[scenario(path = "/echo")]
async fn four_echoes(connection: &mut Connection, checkpoints: Checkpoints) -> ScenarioResult {
    for i in 0..4 {
        connection.send(format!("message {i}")).await?;
        let reply = connection.recv_text().await?;
        assert_eq!(reply, format!("message {i}"));
        checkpoints.checkpoint(format!("Echo {i}"));
    }
    connection.close().await?;
    Ok(())
}

#[scenario(path = "/close/ms/50")]
async fn wait_for_server(_connection: &mut Connection, checkpoints: Checkpoints) -> ScenarioResult {
    checkpoints.checkpoint("Waiting for server");
    Ok(())
}

#[scenario(path = "/close/ms/50")]
async fn busy_when_server_closes(
    _connection: &mut Connection,
    checkpoints: Checkpoints,
) -> ScenarioResult {
    checkpoints.checkpoint("Waiting");
    tokio::time::sleep(Duration::from_millis(400)).await;
    checkpoints.checkpoint("Done waiting");
    Ok(())
}

#[scenario(path = "/close/ms/50")]
async fn read_until_server_closes(
    connection: &mut Connection,
    checkpoints: Checkpoints,
) -> ScenarioResult {
    checkpoints.checkpoint("Listening");
    connection.recv_text().await?;
    checkpoints.checkpoint("Unexpected message");
    Ok(())
}

#[scenario(path = "/echo")]
async fn never_close(_connection: &mut Connection, _checkpoints: Checkpoints) -> ScenarioResult {
    Ok(())
}

#[scenario(path = "/echo")]
async fn failing(connection: &mut Connection, _checkpoints: Checkpoints) -> ScenarioResult {
    if connection.index() == 1 {
        return Err("boom".into());
    }
    connection.close().await?;
    Ok(())
}

#[scenario(path = "/echo")]
async fn panicking(_connection: &mut Connection, _checkpoints: Checkpoints) -> ScenarioResult {
    panic!("scenario bug");
}

/// Records the first message received on every connection.
struct FirstMessage {
    received: Arc<Mutex<Vec<String>>>,
}

impl Scenario for FirstMessage {
    fn name(&self) -> &str {
        "first_message"
    }

    fn path(&self) -> Option<&str> {
        Some("/query")
    }

    fn init<'a>(
        &'a self,
        connection: &'a mut Connection,
        checkpoints: Checkpoints,
    ) -> BoxFuture<'a, ScenarioResult> {
        Box::pin(async move {
            let text = connection.recv_text().await?;
            checkpoints.checkpoint("Query received");
            self.received.lock().unwrap().push(text);
            connection.close().await?;
            Ok(())
        })
    }
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn three_connections_step_then_close() {
    let addr = init().await;

    let result = LoadTest::new(&ws_url(addr), Arc::new(step_then_close()))
        .run(n(3))
        .await
        .unwrap();

    assert_eq!(result.connections, 3);
    assert_eq!(result.scenario, "step_then_close");
    assert_eq!(result.url, format!("ws://{addr}/echo"));

    let labels: Vec<_> = result.checkpoints.iter().map(|c| c.label.as_str()).collect();
    assert_eq!(labels, vec![CONNECTION_OPENED, "step1", CONNECTION_CLOSED]);

    let opened = &result.checkpoints[0];
    assert!(opened.min >= Duration::from_millis(50), "{opened:?}");
    assert!(opened.avg < Duration::from_millis(500), "{opened:?}");

    let step = &result.checkpoints[1];
    assert!(step.min >= Duration::from_millis(50), "{step:?}");
    assert!(step.avg < Duration::from_millis(500), "{step:?}");

    let closed = &result.checkpoints[2];
    assert_eq!(closed.max, Duration::ZERO);

    assert!(result.min >= Duration::from_millis(100));
    assert!(result.min <= result.avg && result.avg <= result.max);
    assert!(result.total >= result.max);
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn scenario_checkpoints_are_kept_in_order() {
    let addr = init().await;

    let result = LoadTest::new(&ws_url(addr), Arc::new(four_echoes()))
        .run(n(5))
        .await
        .unwrap();

    let labels: Vec<_> = result.checkpoints.iter().map(|c| c.label.as_str()).collect();
    assert_eq!(
        labels,
        vec![
            CONNECTION_OPENED,
            "Echo 0",
            "Echo 1",
            "Echo 2",
            "Echo 3",
            CONNECTION_CLOSED
        ]
    );
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn server_side_close_completes_the_run() {
    let addr = init().await;

    let result = LoadTest::new(&ws_url(addr), Arc::new(wait_for_server()))
        .run(n(4))
        .await
        .unwrap();

    assert_eq!(result.checkpoints.len(), 3);
    assert_eq!(result.checkpoints[1].label, "Waiting for server");
    assert!(result.checkpoints[1].min >= Duration::from_millis(40));
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn server_close_is_timed_while_the_scenario_is_busy() {
    let addr = init().await;

    let result = LoadTest::new(&ws_url(addr), Arc::new(busy_when_server_closes()))
        .run(n(3))
        .await
        .unwrap();

    let labels: Vec<_> = result.checkpoints.iter().map(|c| c.label.as_str()).collect();
    assert_eq!(labels, vec![CONNECTION_OPENED, "Waiting", CONNECTION_CLOSED]);
    assert!(result.max < Duration::from_millis(200), "{result}");
    assert!(result.checkpoints[1].max < Duration::from_millis(200), "{result}");
    assert!(result.total < Duration::from_millis(300), "{result}");
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn server_close_during_recv_completes_the_run() {
    let addr = init().await;

    let result = LoadTest::new(&ws_url(addr), Arc::new(read_until_server_closes()))
        .run(n(3))
        .await
        .unwrap();

    assert_eq!(result.connections, 3);
    let labels: Vec<_> = result.checkpoints.iter().map(|c| c.label.as_str()).collect();
    assert_eq!(labels, vec![CONNECTION_OPENED, "Listening", CONNECTION_CLOSED]);
    assert!(result.checkpoints[1].min >= Duration::from_millis(40), "{result}");
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn params_are_appended_to_every_connection() {
    let addr = init().await;

    let received = Arc::new(Mutex::new(vec![]));
    let scenario = Arc::new(FirstMessage {
        received: received.clone(),
    });
    let params: BTreeMap<String, String> = [("token".to_string(), "abc".to_string())].into();

    LoadTest::new(&format!("ws://{addr}"), scenario.clone())
        .params(Arc::new(params))
        .run(n(3))
        .await
        .unwrap();
    assert_eq!(*received.lock().unwrap(), vec!["token=abc"; 3]);

    received.lock().unwrap().clear();
    let per_index = |index: usize| vec![("user".to_string(), format!("u{index}"))];
    LoadTest::new(&format!("ws://{addr}"), scenario)
        .params(Arc::new(per_index))
        .run(n(3))
        .await
        .unwrap();

    let users: BTreeSet<_> = received.lock().unwrap().iter().cloned().collect();
    assert_eq!(
        users,
        BTreeSet::from(["user=u0".to_string(), "user=u1".into(), "user=u2".into()])
    );
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn scenario_error_aborts_the_run() {
    let addr = init().await;

    let err = LoadTest::new(&ws_url(addr), Arc::new(failing()))
        .run(n(3))
        .await
        .unwrap_err();

    match err {
        RunError::Scenario { index, source } => {
            assert_eq!(index, 1);
            assert_eq!(source.to_string(), "boom");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn scenario_panic_aborts_the_run() {
    let addr = init().await;

    let err = LoadTest::new(&ws_url(addr), Arc::new(panicking()))
        .run(n(2))
        .await
        .unwrap_err();

    assert!(matches!(err, RunError::Panicked { .. }), "{err}");
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn refused_connections_stall_without_timeout() {
    init().await;

    // Grab a free port and release it so nothing is listening there.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let test = LoadTest::new(&ws_url(addr), Arc::new(step_then_close()));
    let stalled = tokio::time::timeout(Duration::from_millis(500), test.run(n(2))).await;
    assert!(stalled.is_err(), "run should never complete");

    let err = test
        .timeout(Duration::from_millis(500))
        .run(n(2))
        .await
        .unwrap_err();
    match err {
        RunError::Stalled {
            requested,
            opened,
            closed,
            ..
        } => assert_eq!((requested, opened, closed), (2, 0, 0)),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
#[ntest::timeout(10_000)]
async fn open_connections_stall_until_timeout() {
    let addr = init().await;

    let err = LoadTest::new(&ws_url(addr), Arc::new(never_close()))
        .timeout(Duration::from_millis(500))
        .run(n(2))
        .await
        .unwrap_err();

    match err {
        RunError::Stalled { opened, closed, .. } => assert_eq!((opened, closed), (2, 0)),
        other => panic!("unexpected error: {other}"),
    }
}
