use service_store::configuration::{get_configuration, DatabaseSettings};
use service_store::services::ServiceStore;
use sqlx::{Connection, Executor, PgConnection, PgPool};

pub async fn spawn_store() -> Option<ServiceStore> {
    let mut configuration = get_configuration().expect("Failed to get configuration");
    configuration.database.database_name = uuid::Uuid::new_v4().to_string();

    match configure_database(&configuration.database).await {
        Ok(pool) => Some(ServiceStore::new(pool)),
        Err(err) => {
            eprintln!("Skipping tests: failed to connect to postgres: {}", err);
            None
        }
    }
}

pub async fn configure_database(config: &DatabaseSettings) -> Result<PgPool, sqlx::Error> {
    let mut connection = PgConnection::connect(&config.connection_string_without_db()).await?;

    connection
        .execute(format!(r#"CREATE DATABASE "{}""#, config.database_name).as_str())
        .await?;

    let connection_pool = PgPool::connect(&config.connection_string()).await?;

    sqlx::migrate!("./migrations")
        .run(&connection_pool)
        .await?;

    Ok(connection_pool)
}

#[allow(dead_code)]
pub async fn set_environment_status(pool: &PgPool, name: &str, status: &str) {
    sqlx::query("UPDATE environments SET status = $2 WHERE name = $1")
        .bind(name)
        .bind(status)
        .execute(pool)
        .await
        .expect("Failed to update environment status");
}

#[allow(dead_code)]
pub async fn environment_status(pool: &PgPool, name: &str) -> String {
    sqlx::query_scalar::<_, String>("SELECT status FROM environments WHERE name = $1")
        .bind(name)
        .fetch_one(pool)
        .await
        .expect("Failed to read environment status")
}

#[allow(dead_code)]
pub async fn count(pool: &PgPool, sql: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(sql)
        .fetch_one(pool)
        .await
        .expect("Failed to count rows")
}
