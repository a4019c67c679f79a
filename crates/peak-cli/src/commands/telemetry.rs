use std::{path::Path, time::Instant};

use peak_cli::manifest::{IssueCounts, ManifestEntry, RunStatus};
use peak_core::Diagnostics;
use tracing::debug;

/// Record a manifest for a finished command; failures to record are
/// printed, never raised.
pub fn record_run_timed(
    out: &Path,
    command: &str,
    params: &[(&str, &str)],
    start: Instant,
    diag: &Diagnostics,
    result: &anyhow::Result<()>,
) {
    let status = if result.is_ok() {
        RunStatus::Success
    } else {
        RunStatus::Failure
    };
    let mut entry = ManifestEntry::new(command, out, status).with_params(params);
    entry.duration_ms = Some(start.elapsed().as_millis());
    entry.issues = IssueCounts {
        warnings: diag.warning_count(),
        errors: diag.error_count(),
    };
    match entry.write_beside(out) {
        Ok(path) => debug!(manifest = %path.display(), "recorded run manifest"),
        Err(err) => eprintln!("Failed to record run manifest: {err:#}"),
    }
}
