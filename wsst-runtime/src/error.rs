use std::path::PathBuf;
use thiserror::Error;
use wsst_core::RunError;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Missing {0}. Use `with_args()` or set it explicitly.")]
    MissingArgument(&'static str),

    #[error("No scenario named `{name}`. Known scenarios: {known}")]
    NoScenario { name: String, known: String },

    #[error("Unable to read connection params file {path}: {source}")]
    ParamsFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Connection params file {path} is not a JSON object: {source}")]
    ParamsFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Connection param `{key}` must be a string, number or boolean")]
    ParamsValue { key: String },

    #[error("Unable to write results to {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to serialize results: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Run(#[from] RunError),
}
