mod config;
mod main_lib;

use config::Config;
use main_lib::{init_tracing, run, write_report};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing();
    tracing::info!(
        "Valuing {} with allocation {}",
        config.prices_csv.display(),
        config.weights_csv.display()
    );
    let report = run(&config).await?;
    write_report(&config, &report)?;
    Ok(())
}
