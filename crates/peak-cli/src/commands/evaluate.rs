use std::{path::Path, time::Instant};

use anyhow::{bail, Context, Result};
use csv::Writer;
use peak_algo::{
    generate_predictions, score_methods, ErrorTable, MethodCall, StationEvaluation,
};
use peak_cli::EvaluateArgs;
use peak_core::{Diagnostics, PipelineConfig};
use peak_io::{load_combined_loads, read_predictions, read_solution, write_submission, DataLayout};
use tracing::info;

use crate::commands::telemetry::record_run_timed;
use crate::commands::util::{print_table, report_diagnostics};

pub fn handle(args: &EvaluateArgs, config: &PipelineConfig) -> Result<()> {
    let start = Instant::now();
    let mut diag = Diagnostics::new();
    let result = run(args, config, &mut diag);
    report_diagnostics(&diag);
    let target = args.out.as_deref().or(args.submission.as_deref());
    if let Some(out) = target {
        let phase = args.phase.to_string();
        record_run_timed(
            out,
            "evaluate",
            &[
                ("data", args.data.display().to_string().as_str()),
                ("phase", phase.as_str()),
                ("predictions", args.predictions.display().to_string().as_str()),
                ("method", args.method.as_str()),
            ],
            start,
            &diag,
            &result,
        );
    }
    result
}

fn run(args: &EvaluateArgs, config: &PipelineConfig, diag: &mut Diagnostics) -> Result<()> {
    let layout = DataLayout::new(&args.data);
    let roster = config.phase_stations(args.phase).to_vec();
    let stations = config.resolve_stations(args.phase, &args.stations, diag);
    if stations.is_empty() {
        bail!("no stations selected for phase {}", args.phase);
    }
    let days = config.evaluation.days_per_station;

    let forecasts = read_predictions(&args.predictions, diag)?;
    let combined = load_combined_loads(&layout, args.phase, &roster, diag)?;
    let solution_path = args
        .solution
        .clone()
        .unwrap_or_else(|| layout.solution_file(args.phase));
    // solution blocks follow the full roster
    let truth = read_solution(&solution_path, &roster, days, diag)?;

    let mut evaluations = Vec::new();
    for station in &stations {
        match (forecasts.get(station), combined.get(station), truth.get(station)) {
            (Some(forecast), Some(c), Some(t)) => evaluations.push(StationEvaluation {
                station,
                forecast,
                combined: c,
                truth: t,
            }),
            _ => diag.error_for(
                "evaluate",
                "missing forecast, combined load or solution",
                station.as_str(),
            ),
        }
    }
    if evaluations.is_empty() {
        bail!("no station has forecast, combined load and solution");
    }

    let table = score_methods(
        &evaluations,
        &config.evaluation.candidates,
        config.evaluation.apply_abs,
        diag,
    );
    print_error_table(&table)?;
    if let Some((method, error)) = table.best_method() {
        println!("Best method: {method} (MSE {error:.4})");
    }
    if let Some(out) = &args.out {
        write_error_table(&table, out)?;
    }

    if let Some(dir) = &args.submission {
        let call = MethodCall::resolve(&args.method, args.window, diag);
        let daily = generate_predictions(&call, &forecasts, &combined, diag);
        let path = write_submission(
            &layout.template_file(args.phase),
            dir,
            args.phase,
            &roster,
            &daily,
            days,
            config.evaluation.apply_abs,
        )?;
        info!(method = %call.key(), path = %path.display(), "submission written");
        println!("Submission csv dumped to: {}", path.display());
    }
    Ok(())
}

fn print_error_table(table: &ErrorTable) -> Result<()> {
    let mut header = vec!["STATION".to_string()];
    header.extend(table.methods.iter().cloned());
    let rows: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|row| {
            std::iter::once(row.label.clone())
                .chain(row.errors.iter().map(|e| format!("{e:.4}")))
                .collect()
        })
        .collect();
    print_table(&header, &rows)
}

fn write_error_table(table: &ErrorTable, out: &Path) -> Result<()> {
    let mut wtr = Writer::from_path(out).with_context(|| format!("creating {}", out.display()))?;
    wtr.write_record(std::iter::once("station").chain(table.methods.iter().map(String::as_str)))?;
    for row in &table.rows {
        wtr.write_record(
            std::iter::once(row.label.clone()).chain(row.errors.iter().map(|e| e.to_string())),
        )?;
    }
    wtr.flush()?;
    Ok(())
}
