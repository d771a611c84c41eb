mod parameters;
mod simulate;

use anyhow::{Context, Result};
use clap::Parser;
use fluotrace_common::{CommonEngineOpts, TIME_SUB_UNITS, init_tracer};
use parameters::{IsolateParameters, Mode, StatsParameters, ViewParameters};
use std::{
    io::{BufWriter, Write},
    path::Path,
};
use trace_engine::{EngineConfig, TraceSession, View, summarise_columns};
use tracing::{debug, info, level_filters::LevelFilter};

#[derive(Debug, Parser)]
#[clap(author, version, about)]
struct Cli {
    #[clap(flatten)]
    common_engine_opts: CommonEngineOpts,

    /// Write logs to stderr without colour codes.
    #[clap(long, env)]
    no_ansi: bool,

    #[command(subcommand)]
    mode: Mode,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    let tracer = init_tracer!(LevelFilter::INFO, !args.no_ansi);
    debug!(service = tracer.service_name(), ?args, "Arguments parsed");
    let config = EngineConfig::from(&args.common_engine_opts);

    match args.mode {
        Mode::Summary(parameters) => {
            let mut session = TraceSession::new(config);
            println!("{}", open(&mut session, &parameters.file)?);
        }
        Mode::View(parameters) => run_view(TraceSession::new(config), &parameters)?,
        Mode::Isolate(parameters) => run_isolate(TraceSession::new(config), &parameters)?,
        Mode::Stats(parameters) => run_stats(&parameters)?,
        Mode::Simulate(parameters) => simulate::simulate(&parameters)?,
    }
    Ok(())
}

fn open(session: &mut TraceSession, file: &Path) -> Result<trace_engine::TraceSummary> {
    session
        .open(file)
        .with_context(|| format!("Cannot open trace {}", file.display()))
}

fn run_view(mut session: TraceSession, parameters: &ViewParameters) -> Result<()> {
    open(&mut session, &parameters.file)?;
    if let (Some(from), Some(to)) = (parameters.from, parameters.to) {
        let range = session.zoom((from, to))?;
        info!(%range, "Selection zoomed");
    }
    let view = session.view(parameters.points, parameters.window)?;
    write_view(&mut BufWriter::new(std::io::stdout().lock()), view)?;
    Ok(())
}

/// Prints the window as CSV, with time rescaled for display.
fn write_view<W: Write>(writer: &mut W, view: &View) -> Result<()> {
    writeln!(
        writer,
        "time,fluorescence,pmt,smoothed_fluorescence,smoothed_pmt"
    )?;
    for (record, (smoothed_fluo, smoothed_pmt)) in view
        .samples
        .records()
        .zip(view.smoothed_fluo.iter().zip(&view.smoothed_pmt))
    {
        writeln!(
            writer,
            "{},{},{},{smoothed_fluo},{smoothed_pmt}",
            record.time / TIME_SUB_UNITS,
            record.fluo,
            record.pmt
        )?;
    }
    writer.flush()?;
    Ok(())
}

fn run_isolate(mut session: TraceSession, parameters: &IsolateParameters) -> Result<()> {
    let summary = open(&mut session, &parameters.file)?;
    let isolation = session.isolate(parameters.threshold, parameters.window)?;
    let output = parameters.output_path();
    session
        .export(&output)
        .with_context(|| format!("Cannot export features to {}", output.display()))?;
    println!("{summary}");
    println!("{isolation}");
    println!("Features written to {}", output.display());
    Ok(())
}

fn run_stats(parameters: &StatsParameters) -> Result<()> {
    let summaries = summarise_columns(&parameters.file, parameters.min_count)
        .with_context(|| format!("Cannot summarise {}", parameters.file.display()))?;
    for summary in summaries {
        println!("{summary}");
    }
    Ok(())
}
