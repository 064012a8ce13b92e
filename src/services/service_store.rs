//! Service store - environment and build lifecycle
//!
//! Every write that may start a build runs in one serializable transaction.
//! The "one build in progress per environment" rule is enforced by the status
//! gate together with the store's isolation level; there is no in-process lock.

use crate::db::{self, Record};
use crate::forms::ServiceView;
use crate::models::{self, BuildStatus, EnvironmentStatus};
use crate::services::error::{Result, ServiceError};
use sqlx::{PgConnection, PgPool, Postgres, Transaction};

/// Decides whether a new build may start from the environment's current status.
///
/// Returns the status the environment moves to.
pub fn status_gate(current: &str) -> Result<EnvironmentStatus> {
    match current.parse::<EnvironmentStatus>() {
        Ok(EnvironmentStatus::Initializing)
        | Ok(EnvironmentStatus::Done)
        | Ok(EnvironmentStatus::Errored) => Ok(EnvironmentStatus::InProgress),
        Ok(EnvironmentStatus::InProgress) => Err(ServiceError::Conflict),
        Err(_) => Err(ServiceError::InvalidState(current.to_string())),
    }
}

#[derive(Debug, Clone)]
pub struct ServiceStore {
    pool: PgPool,
}

impl ServiceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Views matching the request, most recent version first. An empty list
    /// is a valid answer.
    #[tracing::instrument(name = "Find services", skip(self, view))]
    pub async fn find(&self, view: &ServiceView) -> Result<Vec<ServiceView>> {
        Ok(db::service_view::find(&self.pool, view).await?)
    }

    /// The stored view for the request's build uuid, or its environment name.
    pub async fn get(&self, view: &ServiceView) -> Result<Option<ServiceView>> {
        let stored = db::service_view::fetch_by_key(&self.pool, view).await?;
        Ok(stored.filter(ServiceView::has_id))
    }

    /// Decodes the request and replaces it with the stored view.
    ///
    /// `Ok(None)` means nothing with that identity is stored.
    #[tracing::instrument(name = "Load service from input", skip(self, body))]
    pub async fn load_from_input(&self, body: &[u8]) -> Result<Option<ServiceView>> {
        let view = ServiceView::decode(body)?;
        self.get(&view).await
    }

    /// Creates the environment if needed and, when the request carries build
    /// information, starts a new build.
    ///
    /// On success `view` carries the new build's id, version and status.
    /// On failure nothing written by this call survives.
    #[tracing::instrument(name = "Save service", skip(self, view), fields(name = %view.name, uuid = %view.uuid))]
    pub async fn save(&self, view: &mut ServiceView) -> Result<()> {
        if view.name.is_empty() {
            return Err(ServiceError::Validation(
                "service name was not specified".to_string(),
            ));
        }

        let mut tx = begin_serializable(&self.pool).await?;
        let outcome = create_or_advance(&mut tx, view).await;
        finish(tx, outcome).await
    }

    /// Replaces options and/or credentials of the named environment, creating
    /// the environment when it does not exist yet. No other field and no
    /// build is touched.
    #[tracing::instrument(name = "Update service", skip(self, body))]
    pub async fn update(&self, body: &[u8]) -> Result<ServiceView> {
        let view = ServiceView::decode(body)?;
        if view.name.is_empty() {
            return Err(ServiceError::Validation(
                "service name was not specified".to_string(),
            ));
        }

        // an omitted map leaves the stored one alone
        let options = Some(&view.options).filter(|map| !map.is_empty());
        let credentials = Some(&view.credentials).filter(|map| !map.is_empty());

        let mut conn = self.pool.acquire().await?;
        match db::environment::fetch_by_name(&mut *conn, &view.name).await? {
            Some(env) => {
                db::environment::update_payload(&mut *conn, env.id, options, credentials).await?
            }
            None => {
                let mut env = models::Environment {
                    name: view.name.clone(),
                    options: options.cloned().unwrap_or_default(),
                    credentials: credentials.cloned().unwrap_or_default(),
                    ..Default::default()
                };
                env.save(&mut conn).await?;
            }
        }

        Ok(view)
    }

    /// Deletes the named environment together with its builds.
    #[tracing::instrument(name = "Delete service", skip(self, view), fields(name = %view.name))]
    pub async fn delete(&self, view: &ServiceView) -> Result<()> {
        if view.name.is_empty() {
            return Err(ServiceError::Validation(
                "service name was not specified".to_string(),
            ));
        }

        let mut conn = self.pool.acquire().await?;
        let env = db::environment::fetch_by_name(&mut *conn, &view.name)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("service {} not found", view.name)))?;

        env.delete(&mut conn).await?;
        Ok(())
    }

    /// Finishes a build: the build and its environment move to `done` or
    /// `errored`, which lets the next build start.
    #[tracing::instrument(name = "Set build status", skip(self, view), fields(uuid = %view.uuid, status = %view.status))]
    pub async fn set_status(&self, view: &ServiceView) -> Result<ServiceView> {
        if view.uuid.is_empty() {
            return Err(ServiceError::Validation(
                "build id was not specified".to_string(),
            ));
        }
        let status = match view.status.parse::<BuildStatus>() {
            Ok(BuildStatus::Done) => EnvironmentStatus::Done,
            Ok(BuildStatus::Errored) => EnvironmentStatus::Errored,
            _ => {
                return Err(ServiceError::Validation(format!(
                    "build status can only be set to done or errored, got {:?}",
                    view.status
                )))
            }
        };

        let mut tx = begin_serializable(&self.pool).await?;
        let outcome = finish_build(&mut tx, &view.uuid, status).await;
        finish(tx, outcome).await?;

        let key = ServiceView {
            uuid: view.uuid.clone(),
            ..Default::default()
        };
        self.get(&key)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("build {} not found", view.uuid)))
    }
}

async fn begin_serializable(pool: &PgPool) -> Result<Transaction<'static, Postgres>> {
    let mut tx = pool.begin().await.map_err(|err| {
        tracing::error!("Failed to begin transaction: {:?}", err);
        err
    })?;

    sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
        .execute(&mut *tx)
        .await?;

    Ok(tx)
}

// Commits when every step succeeded, otherwise rolls back. A failing rollback
// is logged; the caller still gets the error that caused it.
async fn finish<T>(tx: Transaction<'static, Postgres>, outcome: Result<T>) -> Result<T> {
    match outcome {
        Ok(value) => {
            tx.commit().await.map_err(|err| {
                tracing::error!("Failed to commit transaction: {:?}", err);
                err
            })?;
            Ok(value)
        }
        Err(err) => {
            tracing::error!("Rolling back: {}", err);
            if let Err(rollback_err) = tx.rollback().await {
                tracing::error!("Failed to roll back transaction: {:?}", rollback_err);
            }
            Err(err)
        }
    }
}

async fn create_or_advance(conn: &mut PgConnection, view: &mut ServiceView) -> Result<()> {
    let mut env = match db::environment::fetch_by_name(&mut *conn, &view.name).await? {
        Some(env) => env,
        None => {
            let mut env = models::Environment::from(&*view);
            env.save(conn).await?;
            env
        }
    };

    if !view.is_build_request() {
        tracing::info!("No build requested, environment {} only", env.name);
        return Ok(());
    }

    let next = status_gate(&env.status)?.to_string();
    db::environment::update_status(&mut *conn, env.id, &next).await?;
    env.status = next;

    let mut build = models::Build::from(&*view);
    build.environment_id = env.id;
    build.save(conn).await?;

    view.id = build.id;
    view.version = Some(build.created_at);
    view.status = build.status;

    if view.credentials.is_empty() {
        return Ok(());
    }

    db::environment::update_payload(&mut *conn, env.id, None, Some(&view.credentials)).await?;
    Ok(())
}

async fn finish_build(conn: &mut PgConnection, uuid: &str, status: EnvironmentStatus) -> Result<()> {
    let mut build = db::build::fetch_by_uuid(&mut *conn, uuid)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("build {} not found", uuid)))?;

    // a finished build is final; only the running one may release the environment
    if build.status != BuildStatus::InProgress.to_string() {
        return Err(ServiceError::Validation(format!(
            "build {} is not in progress, its status is {}",
            uuid, build.status
        )));
    }

    build.status = status.to_string();
    build.save(conn).await?;
    db::environment::update_status(&mut *conn, build.environment_id, &build.status).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_allows_new_build_from_idle_states() {
        for status in ["initializing", "done", "errored"] {
            assert_eq!(
                status_gate(status).unwrap(),
                EnvironmentStatus::InProgress,
                "{} should allow a new build",
                status
            );
        }
    }

    #[test]
    fn gate_rejects_build_in_progress() {
        assert!(matches!(status_gate("in_progress"), Err(ServiceError::Conflict)));
    }

    #[test]
    fn gate_rejects_unknown_state() {
        match status_gate("paused") {
            Err(ServiceError::InvalidState(status)) => assert_eq!(status, "paused"),
            other => panic!("expected invalid state, got {:?}", other),
        }
        assert!(matches!(status_gate(""), Err(ServiceError::InvalidState(_))));
    }
}
