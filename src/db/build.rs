use crate::db::{json_text, Record};
use crate::models;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgExecutor};
use tracing::Instrument;

pub async fn fetch_by_uuid<'e, E>(executor: E, uuid: &str) -> Result<Option<models::Build>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    tracing::debug!("Fetch build by uuid: {}", uuid);
    sqlx::query_as::<_, models::Build>(
        r#"
        SELECT id, uuid, environment_id, user_id, type AS kind, status, definition, mapping,
               created_at, updated_at
        FROM builds
        WHERE uuid = $1
        LIMIT 1
        "#,
    )
    .bind(uuid)
    .fetch_optional(executor)
    .await
    .map_err(|err| {
        tracing::error!("Failed to fetch build {}: {:?}", uuid, err);
        err
    })
}

pub async fn fetch_by_environment<'e, E>(
    executor: E,
    environment_id: i32,
) -> Result<Vec<models::Build>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let query_span = tracing::info_span!("Fetch builds by environment id", environment_id);
    sqlx::query_as::<_, models::Build>(
        r#"
        SELECT id, uuid, environment_id, user_id, type AS kind, status, definition, mapping,
               created_at, updated_at
        FROM builds
        WHERE environment_id = $1
        ORDER BY created_at DESC, id DESC
        "#,
    )
    .bind(environment_id)
    .fetch_all(executor)
    .instrument(query_span)
    .await
    .map_err(|err| {
        tracing::error!("Failed to fetch builds, error: {:?}", err);
        err
    })
}

#[async_trait]
impl Record for models::Build {
    async fn save(&mut self, conn: &mut PgConnection) -> Result<(), sqlx::Error> {
        let mapping = json_text(&self.mapping)?;

        if self.id == 0 {
            let query_span = tracing::info_span!("Saving new build into the database", uuid = %self.uuid);
            let (id, created_at, updated_at) = sqlx::query_as::<_, (i32, DateTime<Utc>, DateTime<Utc>)>(
                r#"
                INSERT INTO builds (uuid, environment_id, user_id, type, status, definition, mapping)
                VALUES ($1, $2, $3, $4, $5, $6, $7::json)
                RETURNING id, created_at, updated_at;
                "#,
            )
            .bind(&self.uuid)
            .bind(self.environment_id)
            .bind(self.user_id)
            .bind(&self.kind)
            .bind(&self.status)
            .bind(&self.definition)
            .bind(mapping)
            .fetch_one(&mut *conn)
            .instrument(query_span)
            .await
            .map_err(|err| {
                tracing::error!("Failed to insert build: {:?}", err);
                err
            })?;

            self.id = id;
            self.created_at = created_at;
            self.updated_at = updated_at;
            return Ok(());
        }

        let query_span = tracing::info_span!("Updating build", id = self.id);
        let (updated_at,) = sqlx::query_as::<_, (DateTime<Utc>,)>(
            r#"
            UPDATE builds
            SET
                user_id = $2,
                type = $3,
                status = $4,
                definition = $5,
                mapping = $6::json,
                updated_at = clock_timestamp()
            WHERE id = $1
            RETURNING updated_at
            "#,
        )
        .bind(self.id)
        .bind(self.user_id)
        .bind(&self.kind)
        .bind(&self.status)
        .bind(&self.definition)
        .bind(mapping)
        .fetch_one(&mut *conn)
        .instrument(query_span)
        .await
        .map_err(|err| {
            tracing::error!("Failed to update build {}: {:?}", self.id, err);
            err
        })?;

        self.updated_at = updated_at;
        Ok(())
    }

    async fn delete(self, conn: &mut PgConnection) -> Result<(), sqlx::Error> {
        tracing::info!("Delete build {}", self.uuid);
        sqlx::query("DELETE FROM builds WHERE id = $1")
            .bind(self.id)
            .execute(&mut *conn)
            .await
            .map(|_| ())
            .map_err(|err| {
                tracing::error!("Failed to delete build {}: {:?}", self.id, err);
                err
            })
    }
}
