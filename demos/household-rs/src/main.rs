pub mod household;
pub mod logging;
pub mod output;
pub mod parameters;

use std::error::Error;
use std::process::ExitCode;

use hh_foi::{Environment, TimelineConfig};
use household::HouseholdModel;
use log::{LevelFilter, error, info};
use parameters::Parameters;

fn run() -> Result<(), Box<dyn Error>> {
    let ctx = Environment::from_stdin()?;

    let level = ctx
        .input_json()
        .get("log_level")
        .and_then(|v| v.as_str())
        .unwrap_or("info")
        .parse::<LevelFilter>()?;
    logging::init(level)?;

    let ctx = ctx.with_input_type::<Parameters>()?;
    let mut parameters = ctx.input.clone().ok_or("missing input")?;
    parameters.seed = ctx.seed;
    // A timeline file overrides the inline timeline section
    if ctx.files.contains_key("timeline") {
        parameters.timeline = ctx.load_toml::<TimelineConfig>("timeline")?;
    }
    info!(
        "run {} (replicate {}, seed {})",
        ctx.input_digest(),
        ctx.replicate,
        ctx.seed
    );

    let output = HouseholdModel::simulate(&parameters)?;
    ctx.write_csv("household_output.csv", &output::HEADERS, &output.rows())?;
    ctx.write_provenance("household_run.toml")?;
    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
