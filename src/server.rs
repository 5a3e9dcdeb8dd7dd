//! Application entry: tracing setup, background sync and the HTTP API

use std::net::SocketAddr;
use std::sync::Arc;

use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::{self, ApiState};
use crate::config::Config;
use crate::presence::{CoordinatorSettings, PresenceCoordinator, PresenceSyncer, SessionClient};

/// Install the fmt subscriber. `RUST_LOG` overrides the default filter.
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sagemcom_presence=info,tower_http=debug".into()),
        )
        .try_init();
}

/// Run the presence service against `client` until the server stops.
///
/// Spawns the background syncer; with the server disabled this waits on the
/// syncer alone.
pub async fn serve(config: Config, client: Arc<dyn SessionClient>) -> anyhow::Result<()> {
    let coordinator = Arc::new(PresenceCoordinator::new(
        client,
        CoordinatorSettings::from(&config.sync),
    ));
    let syncer = Arc::new(PresenceSyncer::new(
        coordinator,
        config.sync.interval(),
        config.sync.initial_delay(),
    ));

    let sync_task = tokio::spawn(syncer.clone().start());
    tracing::info!("Background sync started");

    if !config.server.enabled {
        sync_task.await?;
        return Ok(());
    }

    let app = api::routes(ApiState::new(syncer)).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let served = axum::serve(listener, app).await;

    sync_task.abort();
    served?;
    Ok(())
}
