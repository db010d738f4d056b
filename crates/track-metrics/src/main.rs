use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use track_metrics::{config::ServerConfig, run_server};

fn init_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().pretty())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let config = ServerConfig::from_env();
    tracing::info!(?config, "starting track-metrics");

    run_server(config).await
}
