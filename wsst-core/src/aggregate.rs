//! Cross-connection statistics produced at the end of a run.
use crate::checkpoint::CheckpointLog;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSecondsWithFrac};
use std::fmt;
use std::time::Duration;

/// Result of a single run.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub connections: usize,
    pub scenario: String,
    pub url: String,
    /// Wall-time from run start to the last disconnect.
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub total: Duration,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub avg: Duration,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub min: Duration,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub max: Duration,
    pub checkpoints: Vec<CheckpointStats>,
}

/// Statistics for one checkpoint position, aligned across connections.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointStats {
    pub label: String,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub avg: Duration,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub min: Duration,
    #[serde_as(as = "DurationMilliSecondsWithFrac<f64>")]
    pub max: Duration,
}

/// Min/max/sum accumulator. Averages divide by the requested connection count, not by the number
/// of samples seen.
#[derive(Debug, Default, Clone, Copy)]
struct Accumulator {
    sum: Duration,
    min: Option<Duration>,
    max: Option<Duration>,
}

impl Accumulator {
    fn push(&mut self, value: Duration) {
        self.sum += value;
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
    }

    fn avg(&self, count: usize) -> Duration {
        if count == 0 {
            return Duration::ZERO;
        }
        let nanos = self.sum.as_nanos() / count as u128;
        Duration::from_nanos(nanos.min(u64::MAX as u128) as u64)
    }

    fn min(&self) -> Duration {
        self.min.unwrap_or_default()
    }

    fn max(&self) -> Duration {
        self.max.unwrap_or_default()
    }
}

/// Reduce the checkpoint logs of every connection of a run.
///
/// Checkpoints are aligned by position: position `j` of every connection contributes to entry `j`
/// of the result, whatever its label. The label of an entry is taken from the first connection
/// that has a checkpoint at that position.
pub fn aggregate(
    scenario: &str,
    url: &str,
    logs: &[CheckpointLog],
    total: Duration,
) -> AggregateResult {
    let count = logs.len();
    let mut totals = Accumulator::default();
    let mut positions: Vec<(String, Accumulator)> = vec![];

    for log in logs {
        totals.push(log.total());

        for (position, checkpoint) in log.iter().enumerate() {
            if position == positions.len() {
                positions.push((checkpoint.label.clone(), Accumulator::default()));
            }
            positions[position].1.push(checkpoint.duration);
        }
    }

    AggregateResult {
        connections: count,
        scenario: scenario.to_string(),
        url: url.to_string(),
        total,
        avg: totals.avg(count),
        min: totals.min(),
        max: totals.max(),
        checkpoints: positions
            .into_iter()
            .map(|(label, acc)| CheckpointStats {
                label,
                avg: acc.avg(count),
                min: acc.min(),
                max: acc.max(),
            })
            .collect(),
    }
}

fn millis(d: Duration) -> String {
    format!("{:.3}", d.as_secs_f64() * 1e3)
}

fn rounded(d: Duration) -> humantime::FormattedDuration {
    humantime::format_duration(Duration::from_millis(d.as_millis() as u64))
}

impl fmt::Display for AggregateResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const RULE: &str = "--------------------------------------------------";

        writeln!(f, "Test completed!")?;
        writeln!(f, "{RULE}")?;
        writeln!(f, "Connections:                 {}", self.connections)?;
        writeln!(f, "Total test time:             {}", rounded(self.total))?;
        writeln!(f, "Average time per connection: {}", rounded(self.avg))?;
        writeln!(f, "Minimum connection time:     {}", rounded(self.min))?;
        writeln!(f, "Maximum connection time:     {}", rounded(self.max))?;
        writeln!(f, "{RULE}")?;
        writeln!(f)?;
        writeln!(f, "Time profiler (ms):")?;

        let heading = ["Average", "Minimum", "Maximum", "Name"];
        let rows: Vec<[String; 4]> = self
            .checkpoints
            .iter()
            .map(|c| [millis(c.avg), millis(c.min), millis(c.max), c.label.clone()])
            .collect();

        let mut widths = heading.map(str::len);
        for row in &rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let border = widths
            .iter()
            .map(|w| "-".repeat(w + 2))
            .collect::<Vec<_>>()
            .join("+");
        writeln!(f, "+{border}+")?;
        writeln!(
            f,
            "| {:^w0$} | {:^w1$} | {:^w2$} | {:^w3$} |",
            heading[0],
            heading[1],
            heading[2],
            heading[3],
            w0 = widths[0],
            w1 = widths[1],
            w2 = widths[2],
            w3 = widths[3],
        )?;
        writeln!(f, "+{border}+")?;
        for row in &rows {
            writeln!(
                f,
                "| {:>w0$} | {:>w1$} | {:>w2$} | {:<w3$} |",
                row[0],
                row[1],
                row[2],
                row[3],
                w0 = widths[0],
                w1 = widths[1],
                w2 = widths[2],
                w3 = widths[3],
            )?;
        }
        write!(f, "+{border}+")
    }
}
