//! Result printing: one JSON object per line, then a profiling summary.

use std::io::{self, Write};
use std::time::Duration;

use navgraph_core::graph::ResultCollection;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("output error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Write every entity of `batch` as a single-line JSON object. Returns the
/// number of lines written.
pub fn write_batch(out: &mut impl Write, batch: &ResultCollection) -> Result<usize, OutputError> {
    let mut written = 0;
    for entity in batch.iter() {
        serde_json::to_writer(&mut *out, entity.as_ref())?;
        out.write_all(b"\n")?;
        written += 1;
    }
    out.flush()?;
    Ok(written)
}

pub fn summary_line(batch_size: usize, target: &str, elapsed: Duration, total: usize) -> String {
    format!(
        "Batch size: {batch_size} Target: {target} Time: {:.3} Sec. Total found: {total}",
        elapsed.as_secs_f64()
    )
}
