use std::sync::Arc;

use anyhow::Context as _;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use geoproxy::app;
use geoproxy::cache::{Cache, MemoryCache, RedisCache};
use geoproxy::config::{CacheBackend, Config};
use geoproxy::geocode::Geocoder;
use geoproxy::server::Server;
use geoproxy::upstream::GoogleMapsClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    };

    let cache: Arc<dyn Cache> = match config.cache_backend {
        CacheBackend::Redis => Arc::new(
            RedisCache::connect(&config.redis_url())
                .await
                .context("failed to connect to redis")?,
        ),
        CacheBackend::Memory => {
            warn!("using in-process cache; entries are not shared between instances");
            Arc::new(MemoryCache::new())
        }
    };

    let provider = GoogleMapsClient::new(config.api_key.clone(), config.maps_base_url.clone())
        .context("failed to build provider client")?;

    let geocoder = Geocoder::new(cache, Arc::new(provider));
    let router = Arc::new(app::router(Arc::new(geocoder)));

    let server = Server::bind(config.listen_addr()).await?;

    server
        .run_until(
            move |req| {
                let router = Arc::clone(&router);
                async move { router.route(req).await }
            },
            shutdown_signal(),
        )
        .await?;

    info!("server stopped");
    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        // Without a signal handler, keep serving until killed.
        std::future::pending::<()>().await;
    }
}
