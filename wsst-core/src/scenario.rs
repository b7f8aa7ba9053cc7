//! Scenario definitions
//!
//! A scenario describes what a single connection does once it is open. It is handed the
//! [`Connection`] together with the [`Checkpoints`] capability for that connection, and may send
//! and receive messages, mark checkpoints, and close the connection.
use crate::checkpoint::Checkpoints;
use crate::connection::Connection;
use futures_util::future::BoxFuture;
use std::fmt;

/// Error type scenarios are free to return. Any error aborts the run.
pub type ScenarioError = Box<dyn std::error::Error + Send + Sync>;
pub type ScenarioResult = Result<(), ScenarioError>;

/// Behaviour run on every connection of a load test.
///
/// `init` is called exactly once per connection, right after it opens. The connection stays open
/// after `init` returns until either side closes it.
///
/// # Example
/// ```no_run
/// use wsst_core::{BoxFuture, Checkpoints, Connection, Scenario, ScenarioResult};
///
/// struct Echo;
///
/// impl Scenario for Echo {
///     fn name(&self) -> &str {
///         "echo"
///     }
///
///     fn init<'a>(
///         &'a self,
///         connection: &'a mut Connection,
///         checkpoints: Checkpoints,
///     ) -> BoxFuture<'a, ScenarioResult> {
///         Box::pin(async move {
///             connection.send("ping").await?;
///             connection.recv_text().await?;
///             checkpoints.checkpoint("Echo received");
///             connection.close().await?;
///             Ok(())
///         })
///     }
/// }
/// ```
pub trait Scenario: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Path appended to the target URL for every connection of this scenario.
    fn path(&self) -> Option<&str> {
        None
    }

    fn init<'a>(
        &'a self,
        connection: &'a mut Connection,
        checkpoints: Checkpoints,
    ) -> BoxFuture<'a, ScenarioResult>;
}

/// Signature of the functions wrapped by [`FnScenario`].
pub type ScenarioFn =
    for<'a> fn(&'a mut Connection, Checkpoints) -> BoxFuture<'a, ScenarioResult>;

/// Scenario backed by a plain function. Not intended for manual creation, use the
/// `#[scenario]` macro which generates these.
#[derive(Clone)]
pub struct FnScenario {
    name: String,
    description: String,
    path: Option<String>,
    func: ScenarioFn,
}

impl FnScenario {
    #[doc(hidden)]
    pub fn new(name: &str, func: ScenarioFn) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            path: None,
            func,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_path(mut self, path: &str) -> Self {
        self.path = if path.is_empty() {
            None
        } else {
            Some(path.to_string())
        };
        self
    }
}

impl Scenario for FnScenario {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    fn init<'a>(
        &'a self,
        connection: &'a mut Connection,
        checkpoints: Checkpoints,
    ) -> BoxFuture<'a, ScenarioResult> {
        (self.func)(connection, checkpoints)
    }
}

impl fmt::Debug for FnScenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnScenario")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("path", &self.path)
            .finish()
    }
}
