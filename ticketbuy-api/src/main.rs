use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ticketbuy_api::{app, AppState, AuthConfig};
use ticketbuy_store::app_config::{Backend, Config};
use ticketbuy_store::{
    DbClient, RedisClient, StoreBookingStore, StorePromotionRepository, StoreRouteRepository, StoreTripRepository,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ticketbuy_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Ticketbuy API on port {}", config.server.port);

    let auth = AuthConfig {
        secret: config.auth.jwt_secret.clone(),
    };
    let max_seats = config.booking.max_seats_per_booking;

    let mut app_state = match config.database.backend {
        Backend::Postgres => {
            let db = DbClient::new(&config.database.url, config.database.max_connections)
                .await
                .context("Failed to connect to PostgreSQL")?;
            db.migrate().await.context("Failed to run migrations")?;

            AppState::new(
                Arc::new(StoreRouteRepository::new(db.pool.clone())),
                Arc::new(StoreTripRepository::new(db.pool.clone())),
                Arc::new(StorePromotionRepository::new(db.pool.clone())),
                Arc::new(StoreBookingStore::new(db.pool.clone())),
                auth,
                max_seats,
            )?
        }
        Backend::Memory => {
            tracing::warn!("Using the in-memory backend; data is lost on restart");
            AppState::in_memory(auth, max_seats)?
        }
    };

    match config.redis.url.as_deref() {
        Some(url) => match RedisClient::new(url) {
            Ok(redis) => {
                app_state = app_state.with_rate_limit(Arc::new(redis), config.rate_limit.clone());
            }
            Err(e) => tracing::warn!("Redis unavailable, rate limiting disabled: {}", e),
        },
        None => tracing::info!("No Redis configured, rate limiting disabled"),
    }

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
