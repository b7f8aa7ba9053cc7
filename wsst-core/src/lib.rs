//! Engine of the wsst WebSocket stress tester.
//!
//! A [`LoadTest`] opens N independent connections to a target, runs a [`Scenario`] on each of
//! them, records the [`Checkpoints`] the scenario marks, and reduces every connection's checkpoint
//! log into an [`AggregateResult`] once the last connection has closed.
mod aggregate;
mod checkpoint;
mod config;
mod connection;
mod constants;
mod error;
mod params;
mod run;
mod scenario;
mod sequence;

pub use aggregate::*;
pub use checkpoint::*;
pub use config::*;
pub use connection::Connection;
pub use constants::*;
pub use error::*;
pub use params::ConnectionParams;
pub use run::{is_complete, LoadTest, RunState};
pub use scenario::*;

pub use futures_util::future::BoxFuture;
pub use tokio_tungstenite::tungstenite::Message;
