use deadpool_lapin::{Config, CreatePoolError, Object, Pool, Runtime};
use lapin::types::{FieldTable, ShortString};
use lapin::{options::*, BasicProperties, Channel, ExchangeKind};

#[derive(Debug)]
pub struct MqManager {
    pool: Pool,
}

impl MqManager {
    pub fn try_new(url: String) -> Result<Self, std::io::Error> {
        let mut cfg = Config::default();
        cfg.url = Some(url);
        let pool = cfg.create_pool(Some(Runtime::Tokio1)).map_err(|err| {
            tracing::error!("{:?}", err);

            match err {
                CreatePoolError::Config(_) => {
                    std::io::Error::new(std::io::ErrorKind::Other, "config error")
                }
                CreatePoolError::Build(_) => {
                    std::io::Error::new(std::io::ErrorKind::Other, "build error")
                }
            }
        })?;

        Ok(Self { pool })
    }

    async fn get_connection(&self) -> Result<Object, String> {
        self.pool.get().await.map_err(|err| {
            let msg = format!("getting connection from pool {:?}", err);
            tracing::error!(msg);
            msg
        })
    }

    async fn create_channel(&self) -> Result<Channel, String> {
        self.get_connection()
            .await?
            .create_channel()
            .await
            .map_err(|err| {
                let msg = format!("creating RabbitMQ channel {:?}", err);
                tracing::error!(msg);
                msg
            })
    }

    /// Answers an RPC style request on its `reply_to` queue.
    pub async fn reply(
        &self,
        reply_to: &str,
        correlation_id: Option<ShortString>,
        payload: &[u8],
    ) -> Result<(), String> {
        let mut properties =
            BasicProperties::default().with_content_type(ShortString::from("application/json"));
        if let Some(correlation_id) = correlation_id {
            properties = properties.with_correlation_id(correlation_id);
        }

        self.create_channel()
            .await?
            .basic_publish(
                "",
                reply_to,
                BasicPublishOptions::default(),
                payload,
                properties,
            )
            .await
            .map(|_confirm| ())
            .map_err(|err| {
                tracing::error!("publishing reply {:?}", err);
                format!("publishing reply {:?}", err)
            })
    }

    /// Declares the topic exchange and a durable queue bound to it, and
    /// returns the channel to consume from.
    pub async fn consume(
        &self,
        exchange_name: &str,
        queue_name: &str,
        routing_key: &str,
    ) -> Result<Channel, String> {
        let channel = self.create_channel().await?;

        channel
            .exchange_declare(
                exchange_name,
                ExchangeKind::Topic,
                ExchangeDeclareOptions {
                    passive: false,
                    durable: true,
                    auto_delete: false,
                    internal: false,
                    nowait: false,
                },
                FieldTable::default(),
            )
            .await
            .map_err(|err| format!("declaring exchange {} {:?}", exchange_name, err))?;

        channel
            .queue_declare(
                queue_name,
                QueueDeclareOptions {
                    passive: false,
                    durable: true,
                    exclusive: false,
                    auto_delete: false,
                    nowait: false,
                },
                FieldTable::default(),
            )
            .await
            .map_err(|err| format!("declaring queue {} {:?}", queue_name, err))?;

        channel
            .queue_bind(
                queue_name,
                exchange_name,
                routing_key,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|err| format!("binding queue {} {:?}", queue_name, err))?;

        Ok(channel)
    }
}
