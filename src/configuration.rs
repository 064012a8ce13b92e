use serde;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub amqp: AmqpSettings,
    pub listener: ListenerSettings,
    #[serde(default = "default_bootstrap_retry_secs")]
    pub bootstrap_retry_secs: u64,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub database_name: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct AmqpSettings {
    pub username: String,
    pub password: String,
    pub host: String,
    pub port: u16,
}

/// Where inbound requests are consumed from.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ListenerSettings {
    pub exchange: String,
    pub queue: String,
    #[serde(default = "default_consumer_tag")]
    pub consumer_tag: String,
}

fn default_bootstrap_retry_secs() -> u64 {
    10
}

fn default_max_connections() -> u32 {
    10
}

fn default_consumer_tag() -> String {
    "service_store_listener".to_string()
}

impl DatabaseSettings {
    // Connection string: postgresql://<username>:<password>@<host>:<port>/<database_name>
    pub fn connection_string(&self) -> String {
        format!(
            "postgresql://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name,
        )
    }

    pub fn connection_string_without_db(&self) -> String {
        format!(
            "postgresql://{}:{}@{}:{}",
            self.username, self.password, self.host, self.port,
        )
    }
}

impl AmqpSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "amqp://{}:{}@{}:{}/%2f",
            self.username, self.password, self.host, self.port,
        )
    }
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // configuration.yaml in the working directory, overridden by APP_* variables,
    // e.g. APP_DATABASE__HOST=db
    config::Config::builder()
        .add_source(config::File::with_name("configuration"))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?
        .try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn database() -> DatabaseSettings {
        DatabaseSettings {
            username: "postgres".to_string(),
            password: "secret".to_string(),
            host: "db".to_string(),
            port: 5433,
            database_name: "service_store".to_string(),
            max_connections: 10,
        }
    }

    #[test]
    fn database_connection_strings() {
        let db = database();
        assert_eq!(
            db.connection_string(),
            "postgresql://postgres:secret@db:5433/service_store"
        );
        assert_eq!(
            db.connection_string_without_db(),
            "postgresql://postgres:secret@db:5433"
        );
    }

    #[test]
    fn amqp_connection_string_uses_default_vhost() {
        let amqp = AmqpSettings {
            username: "guest".to_string(),
            password: "guest".to_string(),
            host: "mq".to_string(),
            port: 5672,
        };
        assert_eq!(amqp.connection_string(), "amqp://guest:guest@mq:5672/%2f");
    }

    #[test]
    fn optional_settings_fall_back_to_defaults() {
        let settings: Settings = serde_json::from_value(serde_json::json!({
            "database": {
                "username": "postgres",
                "password": "postgres",
                "host": "localhost",
                "port": 5432,
                "database_name": "service_store"
            },
            "amqp": {"username": "guest", "password": "guest", "host": "localhost", "port": 5672},
            "listener": {"exchange": "service_store", "queue": "service_store"}
        }))
        .unwrap();

        assert_eq!(settings.bootstrap_retry_secs, 10);
        assert_eq!(settings.database.max_connections, 10);
        assert_eq!(settings.listener.consumer_tag, "service_store_listener");
    }
}
