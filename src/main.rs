//! Predictor service: loads the trained artifacts and serves `POST /predict`.

use anyhow::Result;
use std::sync::Arc;
use structopt::StructOpt;
use tokio::signal;

use student_pass_predictor::{api, ArtifactPaths, PredictorConfig, PredictorContext};

#[derive(StructOpt, Debug)]
#[structopt(name = "student_pass_predictor")]
struct Cli {
    /// Path to config file; built-in defaults apply when it is absent
    #[structopt(short, long, default_value = "predictor.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Cli::from_args();
    let cfg = PredictorConfig::load_or_default(&args.config)?;

    let ctx = Arc::new(PredictorContext::load(&ArtifactPaths::from_config(&cfg)));
    let app = api::router(ctx);

    let listener = tokio::net::TcpListener::bind(&cfg.listen_addr).await?;
    log::info!("Predictor listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = signal::ctrl_c().await;
            log::info!("Shutdown signal received");
        })
        .await?;
    Ok(())
}
