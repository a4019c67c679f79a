use std::{fs, time::Instant};

use anyhow::{bail, Context, Result};
use peak_algo::{
    assemble_terms, pack_datasets, persist_table, preprocess, DatasetBuilder, OutputStage,
};
use peak_cli::PrepareArgs;
use peak_core::{Diagnostics, PipelineConfig};
use peak_io::{load_phase, DataLayout};
use tracing::info;

use crate::commands::telemetry::record_run_timed;
use crate::commands::util::{print_table, report_diagnostics, station_slug};

pub fn handle(args: &PrepareArgs, config: &PipelineConfig) -> Result<()> {
    let start = Instant::now();
    let mut diag = Diagnostics::new();
    let result = run(args, config, &mut diag);
    report_diagnostics(&diag);
    let phase = args.phase.to_string();
    let stations = args.stations.join(",");
    record_run_timed(
        &args.out,
        "prepare",
        &[
            ("data", args.data.display().to_string().as_str()),
            ("phase", phase.as_str()),
            ("stations", stations.as_str()),
            ("format", args.format.extension()),
            ("raw_input", if args.raw_input { "true" } else { "false" }),
        ],
        start,
        &diag,
        &result,
    );
    result
}

fn run(args: &PrepareArgs, config: &PipelineConfig, diag: &mut Diagnostics) -> Result<()> {
    let mut config = config.clone();
    if args.raw_input {
        config.smooth_input = false;
    }
    info!(phase = args.phase, data = %args.data.display(), "preparing datasets");

    let layout = DataLayout::new(&args.data);
    let mut data = load_phase(&layout, args.phase, &args.stations, &config, diag)?;
    let national = preprocess(&mut data.records, &data.national, &config, diag);
    let datasets = pack_datasets(
        &DatasetBuilder::new(&config),
        &data.stations,
        &data.records,
        &national,
        diag,
    );
    if datasets.is_empty() {
        bail!("no station datasets were built");
    }

    fs::create_dir_all(&args.out)
        .with_context(|| format!("creating output directory '{}'", args.out.display()))?;
    let ext = args.format.extension();
    let mut summary = Vec::new();
    for (station, dataset) in &datasets {
        let slug = station_slug(station);
        persist_table(
            &dataset.train,
            &args.out.join(format!("{slug}_train.{ext}")),
            OutputStage::DatasetTrain,
        )?;
        persist_table(
            &dataset.test,
            &args.out.join(format!("{slug}_test.{ext}")),
            OutputStage::DatasetTest,
        )?;

        let features = dataset.train.features();
        let spec = assemble_terms(
            &features.column_names(),
            dataset.num_fixed_col,
            &config.terms,
            config.gam,
        )?;
        let terms_path = args.out.join(format!("{slug}_terms.json"));
        fs::write(&terms_path, spec.to_json()?)
            .with_context(|| format!("writing {}", terms_path.display()))?;

        summary.push(vec![
            station.to_string(),
            dataset.train.height().to_string(),
            dataset.test.height().to_string(),
            dataset.num_fixed_col.to_string(),
            spec.len().to_string(),
        ]);
    }
    print_table(
        &["STATION", "TRAIN ROWS", "TEST ROWS", "FIXED COLS", "TERMS"].map(String::from),
        &summary,
    )?;
    Ok(())
}
