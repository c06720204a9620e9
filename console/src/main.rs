use anyhow::Context;
use bridge::http::{default_bind_address, HttpBridge};
use bridge::model::DisplayModel;
use clap::Parser;
use config::Preferences;
use generator::scenario::{build_sheet, ScenarioConfig};
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::runner::Runner;
use workflow::sheet::Sheet;

mod bridge;
mod config;
mod generator;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Line-of-bearing triangulation driver")]
struct Args {
    /// Load preferences from YAML
    #[arg(long)]
    config: Option<PathBuf>,
    /// Write the effective preferences to YAML and continue
    #[arg(long)]
    save_config: Option<PathBuf>,
    /// Observation sheet to triangulate (YAML, or JSON by extension)
    #[arg(long)]
    sheet: Option<PathBuf>,
    /// Synthetic scenario config (YAML) to generate and triangulate
    #[arg(long)]
    synthetic: Option<PathBuf>,
    /// Write the generated synthetic sheet here
    #[arg(long)]
    emit_sheet: Option<PathBuf>,
    /// Override the fix threshold, in meters
    #[arg(long)]
    threshold: Option<f64>,
    /// Write a JSON report of the triangulated signals
    #[arg(long)]
    report: Option<PathBuf>,
    /// Keep the HTTP bridge alive for incoming sheets
    #[arg(long, default_value_t = false)]
    serve: bool,
    #[arg(long, default_value_t = default_bind_address())]
    bind: SocketAddr,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut prefs = match &args.config {
        Some(path) => Preferences::load(path)?,
        None => Preferences::default(),
    };
    if let Some(threshold) = args.threshold {
        prefs.geo.cut_threshold = threshold;
        prefs.validate().context("applying --threshold")?;
    }
    if let Some(path) = &args.save_config {
        prefs.save(path)?;
    }

    let runner = Arc::new(Runner::new(prefs)?);
    let bridge = HttpBridge::new(runner.clone());

    let sheet = match (&args.sheet, &args.synthetic) {
        (Some(path), _) => Some(Sheet::load(path)?),
        (None, Some(path)) => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("reading scenario {}", path.display()))?;
            let scenario: ScenarioConfig = serde_yaml::from_str(&contents)
                .with_context(|| format!("parsing scenario {}", path.display()))?;
            let sheet = build_sheet(&scenario, runner.model())?;
            if let Some(out) = &args.emit_sheet {
                sheet.save(out)?;
            }
            Some(sheet)
        }
        (None, None) => None,
    };

    if let Some(sheet) = sheet {
        let result = runner.ingest(&sheet)?;
        for outcome in &result.outcomes {
            println!("{}", runner.describe(&result.log, outcome));
        }
        let tally = result.tally;
        println!(
            "Batch -> processed {}, fixes {}, cuts {}, ambiguous {}, errors {}",
            tally.processed(),
            tally.fix,
            tally.cut,
            tally.ambiguous_cut,
            tally.errors
        );
        if let Some(path) = &args.report {
            result.write_report(path)?;
        }
        bridge.publish(DisplayModel::from_run(&runner, &result));
    }

    if args.serve {
        bridge.serve(args.bind);
        println!("HTTP bridge on http://{} (Ctrl+C to stop)...", args.bind);
        let runtime = TokioBuilder::new_current_thread()
            .enable_all()
            .build()
            .context("creating runtime for signal handling")?;
        runtime.block_on(async {
            signal::ctrl_c().await.context("awaiting Ctrl+C to exit")?;
            Ok::<(), anyhow::Error>(())
        })?;
    }

    Ok(())
}
