mod utils;
use utils::*;

use std::sync::{Arc, Mutex};
use wsst::prelude::*;
use wsst::BoxFuture;

/// Logs every scenario start so the interleaving of runs can be checked.
struct Journal {
    events: Arc<Mutex<Vec<String>>>,
}

impl Scenario for Journal {
    fn name(&self) -> &str {
        "journal"
    }

    fn path(&self) -> Option<&str> {
        Some("/echo")
    }

    fn init<'a>(
        &'a self,
        connection: &'a mut Connection,
        checkpoints: Checkpoints,
    ) -> BoxFuture<'a, ScenarioResult> {
        Box::pin(async move {
            self.events.lock().unwrap().push("init".to_string());
            connection.send("ping").await?;
            connection.recv_text().await?;
            checkpoints.checkpoint("Pong");
            connection.close().await?;
            Ok(())
        })
    }
}

#[tokio::test]
#[ntest::timeout(20_000)]
async fn runs_are_sequential_and_ordered() {
    let addr = init().await;

    let events = Arc::new(Mutex::new(vec![]));
    let scenario = Arc::new(Journal {
        events: events.clone(),
    });

    let callback_events = events.clone();
    let results = LoadTest::new(&ws_url(addr), scenario)
        .run_sequence_with(&[n(1), n(5), n(2)], move |result| {
            callback_events
                .lock()
                .unwrap()
                .push(format!("done {}", result.connections));
        })
        .await
        .unwrap();

    let connections: Vec<_> = results.iter().map(|r| r.connections).collect();
    assert_eq!(connections, vec![1, 5, 2]);

    let mut expected = vec!["init".to_string(), "done 1".to_string()];
    expected.extend(std::iter::repeat("init".to_string()).take(5));
    expected.push("done 5".to_string());
    expected.extend(std::iter::repeat("init".to_string()).take(2));
    expected.push("done 2".to_string());
    assert_eq!(*events.lock().unwrap(), expected);

    for result in &results {
        assert_eq!(result.checkpoints.len(), 3);
        assert_eq!(result.checkpoints[1].label, "Pong");
    }
}

#[tokio::test]
#[ntest::timeout(20_000)]
async fn run_sequence_without_callback() {
    let addr = init().await;

    let scenario = Arc::new(Journal {
        events: Arc::new(Mutex::new(vec![])),
    });
    let results = LoadTest::new(&ws_url(addr), scenario)
        .run_sequence(&[n(3), n(1)])
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].connections, 3);
    assert_eq!(results[1].connections, 1);
}
