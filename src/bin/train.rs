//! Offline trainer: reads the labeled CSV and writes model, scaler and
//! feature-name artifacts to the working directory.

use anyhow::Result;
use structopt::StructOpt;

use student_pass_predictor::{trainer, PredictorConfig};

#[derive(StructOpt, Debug)]
#[structopt(name = "train")]
struct Cli {
    /// Path to config file; built-in defaults apply when it is absent
    #[structopt(short, long, default_value = "predictor.toml")]
    config: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Cli::from_args();
    let cfg = PredictorConfig::load_or_default(&args.config)?;

    log::info!("Starting model training...");
    trainer::run(&cfg)?;
    log::info!("Training complete.");
    Ok(())
}
