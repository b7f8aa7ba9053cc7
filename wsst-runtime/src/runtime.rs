//! Default wsst runtime
//!
//! Parses the command line, resolves the scenario from the registry, runs one test (or one test
//! per entry of `--connections-list`), prints the report of each run and optionally writes the
//! results to a JSON file.
use crate::error::RuntimeError;
use crate::output::write_json;
use crate::params::load_params_file;
use crate::registry::ScenarioRegistry;
use clap::Parser;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
#[allow(unused)]
use tracing::{debug, error, info, instrument, warn};
use wsst_core::{AggregateResult, LoadTest, RunConfig, Scenario, DEFAULT_CONNECTIONS};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Stress test for applications that use WebSockets",
    after_help = "Example:\n  wsst --connections 100 ws://localhost:8080 my_scenario"
)]
struct WsstCli {
    /// Target WebSocket URL.
    url: String,

    /// Name of the scenario to run on every connection.
    scenario: String,

    /// Single test for the given count of connections.
    #[arg(short, long, default_value_t = DEFAULT_CONNECTIONS)]
    connections: NonZeroUsize,

    /// Multiple tests, one per count of connections (-l 1,10,100,1000).
    #[arg(short('l'), long, value_delimiter = ',', conflicts_with = "connections")]
    connections_list: Vec<NonZeroUsize>,

    /// File to save the JSON results to.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON object of query params added to every connection URL.
    #[arg(short('p'), long)]
    connection_params_file: Option<PathBuf>,

    /// Give up on a run that has not completed in time (e.g. `30s`, `2m`).
    #[arg(short, long, value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,
}

impl WsstCli {
    fn into_config(self) -> RunConfig {
        let mut config = RunConfig::new(&self.url, &self.scenario);
        if !self.connections_list.is_empty() {
            config.connections = self.connections_list;
        } else {
            config.connections = vec![self.connections];
        }
        config.output = self.output;
        config.params_file = self.connection_params_file;
        config.timeout = self.timeout;
        config
    }
}

/// Default wsst runtime.
///
/// # Example
///
/// ```ignore
/// use wsst::prelude::*;
///
/// #[tokio::main]
/// async fn main() {
///     if let Err(err) = WsstRuntime::new().with_args().run().await {
///         eprintln!("{err}");
///         std::process::exit(1);
///     }
/// }
///
/// #[scenario(description = "Send one message and wait for the echo", path = "/echo")]
/// async fn echo(connection: &mut Connection, checkpoints: Checkpoints) -> ScenarioResult {
///     connection.send("hello").await?;
///     connection.recv_text().await?;
///     checkpoints.checkpoint("Echo received");
///     connection.close().await?;
///     Ok(())
/// }
/// ```
pub struct WsstRuntime {
    config: Option<RunConfig>,
    registry: ScenarioRegistry,
}

impl Default for WsstRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl WsstRuntime {
    /// Runtime knowing every scenario linked into the binary.
    pub fn new() -> Self {
        Self {
            config: None,
            registry: ScenarioRegistry::linked(),
        }
    }

    /// Use the default CLI arguments for wsst.
    ///
    /// `<URL> <SCENARIO>` positional arguments, then
    ///
    /// `-c`, `--connections` for a single run (default `100`)
    ///
    /// `-l`, `--connections-list` for one run per comma separated count
    ///
    /// `-o`, `--output` to write the results as JSON
    ///
    /// `-p`, `--connection-params-file` for query params added to every connection
    ///
    /// `-t`, `--timeout` to give up on a stalled run
    ///
    /// # Example
    /// ```ignore
    /// $ ./my_load_test -c 500 ws://localhost:8080 chat
    /// $ ./my_load_test -l 1,10,100 -o results.json ws://localhost:8080 chat
    /// ```
    pub fn with_args(mut self) -> Self {
        self.config = Some(WsstCli::parse().into_config());
        self
    }

    pub fn config(mut self, config: RunConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Make a scenario available in addition to the linked ones.
    pub fn scenario(mut self, scenario: Arc<dyn Scenario>) -> Self {
        self.registry.register(scenario);
        self
    }

    pub fn registry(&self) -> &ScenarioRegistry {
        &self.registry
    }

    #[instrument(name = "wsst", skip_all)]
    pub async fn run(self) -> Result<Vec<AggregateResult>, RuntimeError> {
        let config = self
            .config
            .ok_or(RuntimeError::MissingArgument("run configuration"))?;
        info!("Running {} with config {:?}", config.scenario, &config);

        let scenario = self.registry.get(&config.scenario)?;
        let mut test = LoadTest::new(&config.url, scenario);

        if let Some(path) = &config.params_file {
            let params = load_params_file(path)?;
            debug!("Connection params: {params:?}");
            test = test.params(Arc::new(params));
        }

        if let Some(timeout) = config.timeout {
            test = test.timeout(timeout);
        }

        let results = test
            .run_sequence_with(&config.connections, |result| println!("{result}\n"))
            .await?;

        if let Some(path) = &config.output {
            write_json(path, &results)?;
        }

        Ok(results)
    }
}
