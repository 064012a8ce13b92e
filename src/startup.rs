use crate::configuration::{DatabaseSettings, Settings};
use crate::handlers::{self, ServiceHandler, ROUTING_PATTERN};
use crate::helpers::MqManager;
use crate::services::ServiceStore;
use futures_lite::stream::StreamExt;
use lapin::message::Delivery;
use lapin::options::{BasicAckOptions, BasicConsumeOptions};
use lapin::types::FieldTable;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

pub fn connect_pool(settings: &DatabaseSettings) -> PgPool {
    let connect_options = PgConnectOptions::new()
        .host(&settings.host)
        .port(settings.port)
        .username(&settings.username)
        .password(&settings.password)
        .database(&settings.database_name)
        .ssl_mode(PgSslMode::Disable);

    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect_lazy_with(connect_options)
}

/// Runs the embedded migrations, retrying until the database accepts them.
pub async fn migrate_until_ready(pool: &PgPool, retry: Duration) {
    loop {
        match sqlx::migrate!("./migrations").run(pool).await {
            Ok(()) => {
                tracing::info!("Database schema is up to date");
                return;
            }
            Err(err) => {
                tracing::warn!("could not run migrations, retrying: {:?}", err);
                tokio::time::sleep(retry).await;
            }
        }
    }
}

/// Consumes service requests until the consumer ends or Ctrl-C is received.
/// Every delivery is handled on its own task.
pub async fn run(pg_pool: PgPool, settings: Settings) -> anyhow::Result<()> {
    let mq_manager = Arc::new(MqManager::try_new(settings.amqp.connection_string())?);
    let channel = mq_manager
        .consume(
            &settings.listener.exchange,
            &settings.listener.queue,
            ROUTING_PATTERN,
        )
        .await
        .map_err(anyhow::Error::msg)?;

    let mut consumer = channel
        .basic_consume(
            &settings.listener.queue,
            &settings.listener.consumer_tag,
            BasicConsumeOptions::default(),
            FieldTable::default(),
        )
        .await?;

    let handler = Arc::new(ServiceHandler::new(ServiceStore::new(pg_pool.clone())));
    tracing::info!(
        exchange = %settings.listener.exchange,
        queue = %settings.listener.queue,
        "Listening for service requests"
    );

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            delivery = consumer.next() => {
                match delivery {
                    Some(Ok(delivery)) => {
                        let handler = handler.clone();
                        let mq_manager = mq_manager.clone();
                        tokio::spawn(async move { dispatch(&handler, &mq_manager, delivery).await });
                    }
                    Some(Err(err)) => tracing::error!("receiving message {:?}", err),
                    None => {
                        tracing::warn!("Consumer stream ended");
                        break;
                    }
                }
            }
            _ = &mut shutdown => {
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    pg_pool.close().await;
    Ok(())
}

async fn dispatch(handler: &ServiceHandler, mq_manager: &MqManager, delivery: Delivery) {
    let subject = delivery.routing_key.as_str();
    let body = match handler.handle(subject, &delivery.data).await {
        Ok(body) => body,
        Err(err) => {
            tracing::error!(subject, "request failed: {}", err);
            handlers::failure(&err)
        }
    };

    if let Some(reply_to) = delivery.properties.reply_to() {
        let correlation_id = delivery.properties.correlation_id().clone();
        if let Err(err) = mq_manager
            .reply(reply_to.as_str(), correlation_id, &body)
            .await
        {
            tracing::error!(subject, "could not send reply: {}", err);
        }
    }

    if let Err(err) = delivery.ack(BasicAckOptions::default()).await {
        tracing::error!(subject, "acknowledging message {:?}", err);
    }
}
