use std::io::{self, Write};

use anyhow::Result;
use peak_core::{Diagnostics, Severity, StationId};
use tabwriter::TabWriter;
use tracing::{error, warn};

/// File-name stem for a station: `STRATTON CB 4041` → `stratton_cb_4041`.
pub fn station_slug(station: &StationId) -> String {
    station
        .as_str()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Log every collected issue, then print per-category counts on stderr.
pub fn report_diagnostics(diag: &Diagnostics) {
    for issue in &diag.issues {
        match issue.severity {
            Severity::Warning => warn!("{issue}"),
            Severity::Error => error!("{issue}"),
        }
    }
    if !diag.has_issues() {
        return;
    }
    eprintln!("{}", diag.summary());
    for (category, (warnings, errors)) in diag.category_counts() {
        eprintln!("  {category}: {warnings} warning(s), {errors} error(s)");
    }
}

/// Print rows as an aligned table on stdout.
pub fn print_table(header: &[String], rows: &[Vec<String>]) -> Result<()> {
    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "{}", header.join("\t"))?;
    for row in rows {
        writeln!(writer, "{}", row.join("\t"))?;
    }
    writer.flush()?;
    Ok(())
}
