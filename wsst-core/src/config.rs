use crate::DEFAULT_CONNECTIONS;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSecondsWithFrac};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

/// Everything needed to kick off one or more runs of a scenario.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub url: String,
    pub scenario: String,
    /// One run per entry, executed in order.
    pub connections: Vec<NonZeroUsize>,
    pub output: Option<PathBuf>,
    pub params_file: Option<PathBuf>,
    #[serde_as(as = "Option<DurationSecondsWithFrac<f64>>")]
    pub timeout: Option<Duration>,
}

impl RunConfig {
    pub fn new(url: &str, scenario: &str) -> Self {
        Self {
            url: url.to_string(),
            scenario: scenario.to_string(),
            connections: vec![DEFAULT_CONNECTIONS],
            output: None,
            params_file: None,
            timeout: None,
        }
    }

    pub fn is_multi_run(&self) -> bool {
        self.connections.len() > 1
    }
}
