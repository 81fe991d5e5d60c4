//! feed-push service
//!
//! Configuration comes from the environment (and `.env`), optionally layered
//! over a JSON file named by `FEED_PUSH_CONFIG`. Logging is controlled with
//! `RUST_LOG`.

use feed_push::{Config, FeedPush, run_with_shutdown};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("feed_push=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;
    config.validate()?;

    let service = FeedPush::new(config).await?;
    run_with_shutdown(service).await?;

    Ok(())
}
