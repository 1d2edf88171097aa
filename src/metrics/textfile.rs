//! Prometheus textfile export
//!
//! A smoke run is a batch job, so instead of serving `/metrics` the final
//! counters are written in text exposition format for the node exporter's
//! textfile collector to pick up.

use prometheus::{Encoder, TextEncoder};
use std::path::Path;

/// Encode every registered metric in text exposition format
pub fn render() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

/// Write the exposition to `path`.
///
/// The text goes to a sibling `.tmp` file first and is renamed into place,
/// so the collector never reads a half-written file.
pub async fn write_textfile(path: &Path) -> std::io::Result<()> {
    let text = render().map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    let tmp = path.with_extension("prom.tmp");
    tokio::fs::write(&tmp, text).await?;
    tokio::fs::rename(&tmp, path).await
}
