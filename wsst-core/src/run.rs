//! Connection orchestration for a single run.
use crate::aggregate::{aggregate, AggregateResult};
use crate::checkpoint::{CheckpointLog, Checkpoints};
use crate::connection::{disconnected, Connection};
use crate::error::RunError;
use crate::params::{connection_url, ConnectionParams};
use crate::scenario::{Scenario, ScenarioError};
use crate::{CONNECTION_CLOSED, CONNECTION_OPENED};
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::{Id, JoinSet};
use tokio::time::Instant;
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, trace, warn, Instrument};
use url::Url;

/// Lifecycle events sent by connection tasks to the run that owns them.
#[derive(Debug)]
pub(crate) enum RunEvent {
    Opened {
        index: usize,
        at: Instant,
    },
    Checkpoint {
        index: usize,
        label: String,
        at: Instant,
    },
    Closed {
        index: usize,
        at: Instant,
    },
    Failed {
        index: usize,
        error: ScenarioError,
    },
}

/// A run is complete once every requested connection has both opened and closed.
///
/// Counters only grow and each connection opens before it closes, so this holds for exactly one
/// disconnect per run: the last one.
pub fn is_complete(opened: usize, closed: usize, requested: usize) -> bool {
    opened == closed && opened == requested && closed == requested
}

/// Counters and checkpoint logs of one run. Only the orchestrator loop mutates it.
#[derive(Debug)]
pub struct RunState {
    requested: usize,
    opened: usize,
    closed: usize,
    started: Instant,
    logs: Vec<CheckpointLog>,
    closed_flags: Vec<bool>,
}

impl RunState {
    pub fn new(requested: usize, started: Instant) -> Self {
        Self {
            requested,
            opened: 0,
            closed: 0,
            started,
            logs: vec![CheckpointLog::new(); requested],
            closed_flags: vec![false; requested],
        }
    }

    pub fn open(&mut self, index: usize, at: Instant) {
        self.opened += 1;
        self.logs[index].record(CONNECTION_OPENED, at);

        #[cfg(feature = "metrics")]
        metrics::counter!("wsst_connections_opened").increment(1);
    }

    pub fn checkpoint(&mut self, index: usize, label: String, at: Instant) {
        if self.closed_flags[index] {
            warn!("Ignoring checkpoint `{label}` on closed connection #{index}");
            return;
        }
        self.logs[index].record(label, at);
    }

    /// Record the disconnect of `index` and report whether the run just completed.
    pub fn close(&mut self, index: usize, at: Instant) -> bool {
        self.logs[index].record(CONNECTION_CLOSED, at);
        self.closed_flags[index] = true;
        self.closed += 1;

        #[cfg(feature = "metrics")]
        metrics::counter!("wsst_connections_closed").increment(1);

        self.is_complete()
    }

    pub fn is_complete(&self) -> bool {
        is_complete(self.opened, self.closed, self.requested)
    }

    pub fn opened(&self) -> usize {
        self.opened
    }

    pub fn closed(&self) -> usize {
        self.closed
    }

    pub fn requested(&self) -> usize {
        self.requested
    }

    pub fn logs(&self) -> &[CheckpointLog] {
        &self.logs
    }

    pub fn finish(&self, scenario: &str, url: &str, at: Instant) -> AggregateResult {
        let total = at.saturating_duration_since(self.started);
        aggregate(scenario, url, &self.logs, total)
    }

    fn stalled(&self, timeout: Duration) -> RunError {
        RunError::Stalled {
            timeout,
            requested: self.requested,
            opened: self.opened,
            closed: self.closed,
        }
    }
}

/// Load test of one scenario against one target.
///
/// # Example
/// ```no_run
/// use std::num::NonZeroUsize;
/// use std::sync::Arc;
/// use wsst_core::{LoadTest, Scenario};
///
/// async fn example(scenario: Arc<dyn Scenario>) {
///     let result = LoadTest::new("ws://localhost:8080", scenario)
///         .run(NonZeroUsize::new(100).unwrap())
///         .await
///         .unwrap();
///
///     println!("{result}");
/// }
/// ```
#[derive(Clone)]
pub struct LoadTest {
    url: String,
    scenario: Arc<dyn Scenario>,
    params: Option<Arc<dyn ConnectionParams>>,
    timeout: Option<Duration>,
}

impl LoadTest {
    pub fn new(url: &str, scenario: Arc<dyn Scenario>) -> Self {
        Self {
            url: url.to_string(),
            scenario,
            params: None,
            timeout: None,
        }
    }

    /// Append the provider's query parameters to every connection URL.
    pub fn params(mut self, params: Arc<dyn ConnectionParams>) -> Self {
        self.params = Some(params);
        self
    }

    /// Give up on a run that has not completed after `timeout`.
    ///
    /// Without a timeout, a connection that never opens or never closes stalls the run forever.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn scenario(&self) -> &dyn Scenario {
        self.scenario.as_ref()
    }

    /// Target URL including the scenario path.
    pub fn target(&self) -> String {
        format!("{}{}", self.url, self.scenario.path().unwrap_or_default())
    }

    /// Open `connections` connections, run the scenario on each and aggregate their checkpoints.
    #[instrument(name = "run", skip_all, fields(scenario = self.scenario.name(), connections = connections.get()))]
    pub async fn run(&self, connections: NonZeroUsize) -> Result<AggregateResult, RunError> {
        let target = self.target();
        let base = Url::parse(&target).map_err(|source| RunError::InvalidUrl {
            url: target.clone(),
            source,
        })?;

        info!("Scenario: {}", self.scenario.name());
        if !self.scenario.description().is_empty() {
            info!("{}", self.scenario.description());
        }
        info!("Starting test for {connections} connections...");

        let requested = connections.get();
        let mut state = RunState::new(requested, Instant::now());
        let (tx, mut rx) = unbounded_channel();
        let mut tasks = JoinSet::new();
        let mut task_index = HashMap::with_capacity(requested);

        for index in 0..requested {
            let url = connection_url(&base, self.params.as_deref(), index);
            let handle = tasks.spawn(
                drive_connection(index, url, self.scenario.clone(), tx.clone())
                    .in_current_span(),
            );
            task_index.insert(handle.id(), index);
        }

        let outcome = match self.timeout {
            Some(timeout) => {
                let events = process_events(&mut state, &mut rx, &mut tasks, &task_index);
                let res = tokio::time::timeout(timeout, events).await;
                match res {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        warn!("Run did not complete within {timeout:?}");
                        Err(state.stalled(timeout))
                    }
                }
            }
            None => process_events(&mut state, &mut rx, &mut tasks, &task_index).await,
        };
        tasks.abort_all();
        drop(tx);

        let completed_at = outcome?;
        let result = state.finish(self.scenario.name(), &target, completed_at);
        info!(
            "Test completed in {}",
            humantime::format_duration(Duration::from_millis(result.total.as_millis() as u64))
        );
        Ok(result)
    }
}

/// Apply events to the run state until the run completes, a scenario fails or a connection task
/// panics. Returns the completion instant.
async fn process_events(
    state: &mut RunState,
    rx: &mut UnboundedReceiver<RunEvent>,
    tasks: &mut JoinSet<()>,
    task_index: &HashMap<Id, usize>,
) -> Result<Instant, RunError> {
    loop {
        tokio::select! {
            Some(event) = rx.recv() => match event {
                RunEvent::Opened { index, at } => {
                    state.open(index, at);
                    trace!("Connection #{index} opened ({}/{})", state.opened(), state.requested());
                }
                RunEvent::Checkpoint { index, label, at } => state.checkpoint(index, label, at),
                RunEvent::Closed { index, at } => {
                    let complete = state.close(index, at);
                    trace!("Connection #{index} closed ({}/{})", state.closed(), state.requested());
                    if complete {
                        return Ok(Instant::now());
                    }
                }
                RunEvent::Failed { index, error } => {
                    error!("Scenario failed on connection #{index}: {error}");
                    return Err(RunError::Scenario { index, source: error });
                }
            },
            Some(joined) = tasks.join_next_with_id(), if !tasks.is_empty() => {
                if let Err(err) = joined {
                    if err.is_panic() {
                        let index = task_index.get(&err.id()).copied().unwrap_or_default();
                        error!("Connection task #{index} panicked");
                        return Err(RunError::Panicked { index });
                    }
                }
            }
        }
    }
}

/// Scenario runtime for one connection: connect, run the scenario, then wait for the disconnect.
///
/// The disconnect is timestamped when the transport reports it. A scenario still running at that
/// point is cancelled, and an error it returned after the disconnect is not a failure.
async fn drive_connection(
    index: usize,
    url: Url,
    scenario: Arc<dyn Scenario>,
    tx: UnboundedSender<RunEvent>,
) {
    let mut connection = match Connection::open(index, url).await {
        Ok(connection) => connection,
        Err(err) => {
            // NOTE: No retries. The connection never opens and the run cannot complete.
            warn!("Connection #{index} failed to open: {err}");
            return;
        }
    };

    let _ = tx.send(RunEvent::Opened {
        index,
        at: Instant::now(),
    });

    let disconnect = connection.disconnect();
    let checkpoints = Checkpoints::new(index, tx.clone(), disconnect.clone());
    let closed_at = tokio::select! {
        res = scenario.init(&mut connection, checkpoints) => {
            if let Err(error) = res {
                if !connection.is_closed() {
                    let _ = tx.send(RunEvent::Failed { index, error });
                    return;
                }
                debug!("Connection #{index} scenario ended by the disconnect: {error}");
            }
            disconnected(disconnect).await
        }
        at = disconnected(disconnect.clone()) => {
            debug!("Connection #{index} closed while the scenario was running");
            at
        }
    };

    let _ = tx.send(RunEvent::Closed {
        index,
        at: closed_at,
    });
}
