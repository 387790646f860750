pub mod api;
pub mod attempt;
pub mod core;
pub mod schemas;

pub(crate) mod cli;

#[cfg(test)]
mod test_support;

use crate::core::{config::Settings, telemetry};

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    tracing::info!(
        environment = %settings.runtime().environment.as_str(),
        api = %settings.api().base_url,
        "Exam portal client starting"
    );

    cli::run(&settings).await
}
