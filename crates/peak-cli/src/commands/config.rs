use std::{path::Path, time::Instant};

use anyhow::{Context, Result};
use peak_core::{Diagnostics, PipelineConfig};

use crate::commands::telemetry::record_run_timed;

pub fn handle(out: Option<&Path>, config: &PipelineConfig) -> Result<()> {
    match out {
        Some(path) => {
            let start = Instant::now();
            let result = config
                .save_to(path)
                .with_context(|| format!("writing {}", path.display()));
            record_run_timed(path, "config", &[], start, &Diagnostics::new(), &result);
            result?;
            println!("Wrote configuration to {}", path.display());
        }
        None => {
            let mut diag = Diagnostics::new();
            for (from, to) in config.nearby.one_way_edges() {
                diag.warn_for("nearby", &format!("one-way edge to {to}"), from.as_str());
            }
            print!("{}", config.to_toml_string()?);
            if diag.has_issues() {
                eprintln!("{diag}");
            }
        }
    }
    Ok(())
}
