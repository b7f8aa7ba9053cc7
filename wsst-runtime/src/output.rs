use crate::error::RuntimeError;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;
use wsst_core::AggregateResult;

/// Write results as a JSON array, one entry per run.
pub fn write_json(path: &Path, results: &[AggregateResult]) -> Result<(), RuntimeError> {
    let io_err = |source: std::io::Error| RuntimeError::Output {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, results).map_err(|err| {
        if err.is_io() {
            io_err(err.into())
        } else {
            RuntimeError::Serialize(err)
        }
    })?;
    writer.flush().map_err(io_err)?;

    info!("Results written to {}", path.display());
    Ok(())
}
