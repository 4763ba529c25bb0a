use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use fitness_report::{run_pipeline, Catalog, RenderConfig, RunConfig};

#[derive(Parser)]
#[command(name = "fitness-report")]
#[command(version)]
#[command(about = "Reproducible chart and table reports over a fitness dataset", long_about = None)]
struct Cli {
    /// Tabular dataset (.csv, .json or .parquet).
    #[arg(long, value_name = "FILE", env = "FITNESS_REPORT_DATA", default_value = "data/set.csv")]
    data: PathBuf,

    /// Output root; images go to img/, tables to tab/.
    #[arg(long, value_name = "DIR", env = "FITNESS_REPORT_OUT", default_value = "out")]
    out: PathBuf,

    /// "all" or a comma-separated list of step names.
    #[arg(long, env = "FITNESS_REPORT_STEPS", default_value = "all")]
    steps: String,

    /// Which bundled step set to run.
    #[arg(long, value_enum, default_value_t = Catalog::Gym)]
    catalog: Catalog,

    /// Show each chart in a window and wait for it to be closed.
    #[arg(long, action = ArgAction::SetTrue)]
    show: bool,

    /// Also open each saved image in the system viewer.
    #[arg(long, action = ArgAction::SetTrue)]
    open_after: bool,

    /// JSON file with image size and text-table format.
    #[arg(long, value_name = "FILE")]
    render_config: Option<PathBuf>,

    /// List the steps of the selected catalog and exit.
    #[arg(long, action = ArgAction::SetTrue)]
    list: bool,

    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    if cli.list {
        let registry = fitness_report::catalog::registry(cli.catalog)?;
        for name in registry.names() {
            println!("{name}");
        }
        return Ok(());
    }

    let render = match &cli.render_config {
        Some(path) => RenderConfig::from_json_file(path)
            .with_context(|| format!("reading render config {}", path.display()))?,
        None => RenderConfig::default(),
    };

    let config = RunConfig {
        data: cli.data,
        out: cli.out,
        steps: cli.steps,
        show: cli.show,
        open_after: cli.open_after,
        catalog: cli.catalog,
        render,
    };

    let report = run_pipeline(&config)?;
    println!(
        "done: {} step(s), {} file(s) under {}",
        report.manifests.len(),
        report.artifact_file_count(),
        config.out.display()
    );
    Ok(())
}
