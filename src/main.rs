use service_store::configuration::get_configuration;
use service_store::startup::{connect_pool, migrate_until_ready, run};
use service_store::telemetry::{get_subscriber, init_subscriber};
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = get_subscriber("service-store".into(), "info".into());
    init_subscriber(subscriber);

    let settings = get_configuration()?;

    tracing::info!(
        db_host = %settings.database.host,
        db_port = settings.database.port,
        db_name = %settings.database.database_name,
        "Connecting to PostgreSQL"
    );

    let pg_pool = connect_pool(&settings.database);
    migrate_until_ready(&pg_pool, Duration::from_secs(settings.bootstrap_retry_secs)).await;

    run(pg_pool, settings).await
}
