use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::connection::Disconnect;
use crate::run::RunEvent;

/// A single named interval within a connection's lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    pub label: String,
    pub start: Instant,
    pub end: Instant,
    pub duration: Duration,
}

impl Checkpoint {
    fn open(label: String, at: Instant) -> Self {
        Self {
            label,
            start: at,
            end: at,
            duration: Duration::ZERO,
        }
    }

    fn close(&mut self, at: Instant) {
        self.end = at;
        self.duration = at.saturating_duration_since(self.start);
    }
}

/// Ordered checkpoint log of one connection.
///
/// Recording a checkpoint closes the previous one, so only the last entry is ever "open". The last
/// entry of a finished connection ("Connection closed") is never closed and keeps a zero duration.
#[derive(Debug, Clone, Default)]
pub struct CheckpointLog {
    checkpoints: Vec<Checkpoint>,
}

impl CheckpointLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, label: impl Into<String>, at: Instant) {
        if let Some(last) = self.checkpoints.last_mut() {
            last.close(at);

            #[cfg(feature = "metrics")]
            metrics::histogram!("wsst_checkpoint_duration", "label" => last.label.clone())
                .record(last.duration.as_secs_f64());
        }

        self.checkpoints.push(Checkpoint::open(label.into(), at));
    }

    /// Time between the start of the first checkpoint and the end of the last one.
    pub fn total(&self) -> Duration {
        match (self.checkpoints.first(), self.checkpoints.last()) {
            (Some(first), Some(last)) => last.end.saturating_duration_since(first.start),
            _ => Duration::ZERO,
        }
    }

    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&Checkpoint> {
        self.checkpoints.get(position)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Checkpoint> {
        self.checkpoints.iter()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.checkpoints.iter().map(|c| c.label.as_str()).collect()
    }
}

/// Checkpoint capability handed to a scenario, bound to one connection.
///
/// The timestamp is taken when [`Checkpoints::checkpoint`] is called; the entry itself is appended
/// by the run that owns the connection.
#[derive(Debug, Clone)]
pub struct Checkpoints {
    index: usize,
    tx: UnboundedSender<RunEvent>,
    disconnect: Disconnect,
}

impl Checkpoints {
    pub(crate) fn new(
        index: usize,
        tx: UnboundedSender<RunEvent>,
        disconnect: Disconnect,
    ) -> Self {
        Self {
            index,
            tx,
            disconnect,
        }
    }

    /// Index of the connection these checkpoints belong to.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Mark progress on this connection.
    pub fn checkpoint(&self, label: impl Into<String>) {
        let label = label.into();
        if self.disconnect.borrow().is_some() {
            warn!(
                "Ignoring checkpoint `{label}` on closed connection #{}",
                self.index
            );
            return;
        }
        debug!("Checkpoint (conn #{}): {}", self.index, label);

        // The run is gone once it completed or failed; late checkpoints are meaningless then.
        let _ = self.tx.send(RunEvent::Checkpoint {
            index: self.index,
            label,
            at: Instant::now(),
        });
    }
}
