pub mod build;
pub mod environment;
pub mod service_view;

use async_trait::async_trait;
use sqlx::PgConnection;

use crate::models::Map;

/// Persistence capability of a stored record kind.
///
/// Runs on a bare connection so the same record can be written inside a
/// caller's transaction or directly on a pooled connection.
#[async_trait]
pub trait Record: Sized + Send {
    /// Inserts the record when it has no id yet, updates it otherwise.
    async fn save(&mut self, conn: &mut PgConnection) -> Result<(), sqlx::Error>;

    async fn delete(self, conn: &mut PgConnection) -> Result<(), sqlx::Error>;
}

// Maps are bound as text and cast to `json` so key order is kept.
pub(crate) fn json_text(map: &Map) -> Result<String, sqlx::Error> {
    serde_json::to_string(map).map_err(|err| sqlx::Error::Encode(Box::new(err)))
}
