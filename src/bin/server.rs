use rt_whiteboard::config::ServerConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> rt_whiteboard::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;
    tracing::info!(
        knowledge = %config.knowledge_url,
        api_key_set = config.api_key.is_some(),
        "Starting whiteboard backend"
    );
    rt_whiteboard::server::serve(config).await
}
