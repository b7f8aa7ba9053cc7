use crate::scenario::ScenarioError;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("Invalid connection URL `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Scenario failed on connection #{index}: {source}")]
    Scenario {
        index: usize,
        #[source]
        source: ScenarioError,
    },

    #[error("Connection task #{index} panicked")]
    Panicked { index: usize },

    #[error(
        "Run did not complete within {timeout:?}: {opened}/{requested} opened, {closed}/{requested} closed"
    )]
    Stalled {
        timeout: Duration,
        requested: usize,
        opened: usize,
        closed: usize,
    },
}

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Error in Tungstenite: {0}")]
    Tungstenite(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Connection is closed")]
    Closed,

    #[error("Unexpected message type, expected {expected}")]
    UnexpectedMessage { expected: &'static str },
}
