use std::{fs, time::Instant};

use anyhow::{Context, Result};
use peak_algo::{assemble_terms, read_table};
use peak_cli::TermsArgs;
use peak_core::{Diagnostics, PipelineConfig, StationId};
use serde_json::json;

use crate::commands::telemetry::record_run_timed;

pub fn handle(args: &TermsArgs, config: &PipelineConfig) -> Result<()> {
    let start = Instant::now();
    let diag = Diagnostics::new();
    let result = run(args, config);
    if let Some(out) = &args.out {
        record_run_timed(
            out,
            "terms",
            &[("table", args.table.display().to_string().as_str())],
            start,
            &diag,
            &result,
        );
    }
    result
}

fn run(args: &TermsArgs, config: &PipelineConfig) -> Result<()> {
    let table = read_table(&args.table)?;
    let features = table.features();
    let columns = features.column_names();
    let num_fixed_col = args
        .num_fixed_col
        .unwrap_or_else(|| leading_fixed_columns(&columns, config));
    let spec = assemble_terms(&columns, num_fixed_col, &config.terms, config.gam)?;

    let terms: Vec<_> = spec
        .terms()
        .iter()
        .zip(spec.describe(&columns))
        .map(|(term, names)| json!({ "features": term.features, "columns": names }))
        .collect();
    let doc = json!({
        "num_fixed_col": num_fixed_col,
        "lam": spec.lam,
        "n_splines": spec.n_splines,
        "terms": terms,
    });
    let rendered = serde_json::to_string_pretty(&doc)?;
    match &args.out {
        Some(out) => {
            fs::write(out, rendered).with_context(|| format!("writing {}", out.display()))?;
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

/// Count of columns before the first one named after a known station.
fn leading_fixed_columns(columns: &[&str], config: &PipelineConfig) -> usize {
    let is_station = |name: &str| {
        let id = StationId::new(name);
        config.nearby.contains(&id) || config.phases.values().any(|roster| roster.contains(&id))
    };
    columns
        .iter()
        .position(|c| is_station(c))
        .unwrap_or(columns.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearby_columns_start_at_first_station_name() {
        let config = PipelineConfig::default();
        let columns = ["prev_2_mo", "national", "BRADLEY STOKE CB 8"];
        assert_eq!(leading_fixed_columns(&columns, &config), 2);
        assert_eq!(leading_fixed_columns(&columns[..2], &config), 2);
    }

    #[test]
    fn stations_outside_any_roster_still_end_the_fixed_block() {
        let config = PipelineConfig::default();
        let columns = ["prev_2_mo", "national", "month", "HEMYOCK CB 56_24"];
        assert_eq!(leading_fixed_columns(&columns, &config), 3);
    }
}
