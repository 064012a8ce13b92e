use crate::db::{json_text, Record};
use crate::models;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgExecutor};
use tracing::Instrument;

const SELECT_ENVIRONMENT: &str = r#"
    SELECT id, name, datacenter_id, type AS kind, options, credentials, status,
           created_at, updated_at
    FROM environments
"#;

pub async fn fetch_by_name<'e, E>(
    executor: E,
    name: &str,
) -> Result<Option<models::Environment>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    tracing::debug!("Fetch environment by name: {}", name);
    let sql = format!("{} WHERE name = $1 LIMIT 1", SELECT_ENVIRONMENT);
    sqlx::query_as::<_, models::Environment>(&sql)
        .bind(name)
        .fetch_optional(executor)
        .await
        .map_err(|err| {
            tracing::error!("Failed to fetch environment {}: {:?}", name, err);
            err
        })
}

pub async fn update_status<'e, E>(executor: E, id: i32, status: &str) -> Result<(), sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let query_span = tracing::info_span!("Updating environment status", id, status);
    sqlx::query(
        r#"
        UPDATE environments
        SET status = $2, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(status)
    .execute(executor)
    .instrument(query_span)
    .await
    .map(|_| ())
    .map_err(|err| {
        tracing::error!("Failed to update environment status: {:?}", err);
        err
    })
}

/// Replaces the options and/or credentials of one environment. `None` keeps
/// the stored value. Status and the other columns are never written here, so
/// a concurrent status change is not overwritten.
pub async fn update_payload<'e, E>(
    executor: E,
    id: i32,
    options: Option<&models::Map>,
    credentials: Option<&models::Map>,
) -> Result<(), sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let options = options.map(json_text).transpose()?;
    let credentials = credentials.map(json_text).transpose()?;

    let query_span = tracing::info_span!("Updating environment payload", id);
    sqlx::query(
        r#"
        UPDATE environments
        SET
            options = COALESCE($2::json, options),
            credentials = COALESCE($3::json, credentials),
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(options)
    .bind(credentials)
    .execute(executor)
    .instrument(query_span)
    .await
    .map(|_| ())
    .map_err(|err| {
        tracing::error!("Failed to update environment {} payload: {:?}", id, err);
        err
    })
}

#[async_trait]
impl Record for models::Environment {
    async fn save(&mut self, conn: &mut PgConnection) -> Result<(), sqlx::Error> {
        let options = json_text(&self.options)?;
        let credentials = json_text(&self.credentials)?;

        if self.id == 0 {
            let query_span = tracing::info_span!("Saving new environment into the database");
            let (id, created_at, updated_at) = sqlx::query_as::<_, (i32, DateTime<Utc>, DateTime<Utc>)>(
                r#"
                INSERT INTO environments (name, datacenter_id, type, options, credentials, status)
                VALUES ($1, $2, $3, $4::json, $5::json, $6)
                RETURNING id, created_at, updated_at;
                "#,
            )
            .bind(&self.name)
            .bind(self.datacenter_id)
            .bind(&self.kind)
            .bind(options)
            .bind(credentials)
            .bind(&self.status)
            .fetch_one(&mut *conn)
            .instrument(query_span)
            .await
            .map_err(|err| {
                tracing::error!("Failed to insert environment: {:?}", err);
                err
            })?;

            self.id = id;
            self.created_at = created_at;
            self.updated_at = updated_at;
            return Ok(());
        }

        let query_span = tracing::info_span!("Updating environment", id = self.id);
        let (updated_at,) = sqlx::query_as::<_, (DateTime<Utc>,)>(
            r#"
            UPDATE environments
            SET
                name = $2,
                datacenter_id = $3,
                type = $4,
                options = $5::json,
                credentials = $6::json,
                status = $7,
                updated_at = NOW()
            WHERE id = $1
            RETURNING updated_at
            "#,
        )
        .bind(self.id)
        .bind(&self.name)
        .bind(self.datacenter_id)
        .bind(&self.kind)
        .bind(options)
        .bind(credentials)
        .bind(&self.status)
        .fetch_one(&mut *conn)
        .instrument(query_span)
        .await
        .map_err(|err| {
            tracing::error!("Failed to update environment {}: {:?}", self.id, err);
            err
        })?;

        tracing::info!("Environment {} has been updated", self.id);
        self.updated_at = updated_at;
        Ok(())
    }

    // builds go with it through ON DELETE CASCADE
    async fn delete(self, conn: &mut PgConnection) -> Result<(), sqlx::Error> {
        tracing::info!("Delete environment {} ({})", self.id, self.name);
        sqlx::query("DELETE FROM environments WHERE id = $1")
            .bind(self.id)
            .execute(&mut *conn)
            .await
            .map(|_| ())
            .map_err(|err| {
                tracing::error!("Failed to delete environment {}: {:?}", self.id, err);
                err
            })
    }
}
