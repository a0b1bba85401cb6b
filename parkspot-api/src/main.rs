use anyhow::Context;
use parkspot_api::{app, AppState, AuthConfig};
use parkspot_booking::{MemoryLedger, ReservationService};
use parkspot_catalog::{PricingEngine, SlotRegistry};
use parkspot_core::ReservationLedger;
use parkspot_store::{Config, DbClient, PgLedger, RedisClient};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parkspot_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Parkspot API on port {}", config.server.port);

    let registry = Arc::new(SlotRegistry::from_specs(&config.catalog.lots).context("Invalid lot catalog")?);

    let ledger: Arc<dyn ReservationLedger> = match config.database.url.as_deref() {
        Some(url) => {
            let db = DbClient::new(url, &config.database)
                .await
                .context("Failed to connect to Postgres")?;
            db.migrate().await.context("Failed to run migrations")?;
            tracing::info!("Using Postgres reservation ledger");
            Arc::new(PgLedger::new(db.pool.clone()))
        }
        None => {
            tracing::warn!("No database configured, reservations are kept in memory only");
            Arc::new(MemoryLedger::new())
        }
    };

    let redis = match config.redis.url.as_deref() {
        Some(url) => Some(Arc::new(
            RedisClient::new(url).await.context("Failed to configure Redis")?,
        )),
        None => None,
    };

    let service = ReservationService::new(
        registry,
        ledger,
        PricingEngine::new(config.business_rules.pricing()),
        config.business_rules.booking_policy(),
    );

    let app_state = AppState {
        service: Arc::new(service),
        redis,
        business_rules: config.business_rules.clone(),
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
        },
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}
