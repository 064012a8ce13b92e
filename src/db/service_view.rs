use crate::forms::ServiceView;
use sqlx::PgExecutor;
use tracing::Instrument;

const SELECT_VIEW: &str = r#"
    SELECT
        builds.id AS id,
        builds.uuid AS uuid,
        builds.user_id AS user_id,
        builds.status AS status,
        builds.definition AS definition,
        builds.mapping AS mapping,
        builds.created_at AS version,
        environments.name AS name,
        environments.datacenter_id AS datacenter_id,
        environments.options AS options,
        environments.credentials AS credentials,
        environments.type AS kind
    FROM environments
    INNER JOIN builds ON (builds.environment_id = environments.id)
"#;

const ORDER_BY_VERSION: &str = " ORDER BY version DESC, builds.id DESC";

/// The single filter a search request resolves to.
///
/// Criteria are mutually exclusive; the first one present in the request wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceFilter<'a> {
    BuildIds(&'a [String]),
    Names(&'a [String]),
    NameAndBuild { name: &'a str, uuid: &'a str },
    Name(&'a str),
    Build(&'a str),
    Datacenter(i32),
    All,
}

impl<'a> ServiceFilter<'a> {
    pub fn from_view(view: &'a ServiceView) -> Self {
        if !view.ids.is_empty() {
            ServiceFilter::BuildIds(&view.ids)
        } else if !view.names.is_empty() {
            ServiceFilter::Names(&view.names)
        } else if !view.name.is_empty() {
            if view.uuid.is_empty() {
                ServiceFilter::Name(&view.name)
            } else {
                ServiceFilter::NameAndBuild {
                    name: &view.name,
                    uuid: &view.uuid,
                }
            }
        } else if !view.uuid.is_empty() {
            ServiceFilter::Build(&view.uuid)
        } else if view.datacenter_id != 0 {
            ServiceFilter::Datacenter(view.datacenter_id)
        } else {
            ServiceFilter::All
        }
    }

    /// Lookup key of a single stored view: build uuid first, then environment name.
    pub fn key(view: &'a ServiceView) -> Option<Self> {
        if !view.uuid.is_empty() {
            Some(ServiceFilter::Build(&view.uuid))
        } else if !view.name.is_empty() {
            Some(ServiceFilter::Name(&view.name))
        } else {
            None
        }
    }

    pub fn clause(&self) -> &'static str {
        match self {
            ServiceFilter::BuildIds(_) => " WHERE builds.uuid = ANY($1)",
            ServiceFilter::Names(_) => " WHERE environments.name = ANY($1)",
            ServiceFilter::NameAndBuild { .. } => {
                " WHERE environments.name = $1 AND builds.uuid = $2"
            }
            ServiceFilter::Name(_) => " WHERE environments.name = $1",
            ServiceFilter::Build(_) => " WHERE builds.uuid = $1",
            ServiceFilter::Datacenter(_) => " WHERE environments.datacenter_id = $1",
            ServiceFilter::All => "",
        }
    }

    fn sql(&self, limit: Option<i64>) -> String {
        let mut sql = format!("{}{}{}", SELECT_VIEW, self.clause(), ORDER_BY_VERSION);
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        sql
    }

    async fn fetch<'e, E>(&self, executor: E, limit: Option<i64>) -> Result<Vec<ServiceView>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let sql = self.sql(limit);
        let query = sqlx::query_as::<_, ServiceView>(&sql);
        let query = match self {
            ServiceFilter::BuildIds(ids) => query.bind(ids.to_vec()),
            ServiceFilter::Names(names) => query.bind(names.to_vec()),
            ServiceFilter::NameAndBuild { name, uuid } => query.bind(*name).bind(*uuid),
            ServiceFilter::Name(name) => query.bind(*name),
            ServiceFilter::Build(uuid) => query.bind(*uuid),
            ServiceFilter::Datacenter(datacenter_id) => query.bind(*datacenter_id),
            ServiceFilter::All => query,
        };

        query.fetch_all(executor).await
    }
}

/// All views matching the request, newest version first.
pub async fn find<'e, E>(executor: E, view: &ServiceView) -> Result<Vec<ServiceView>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let filter = ServiceFilter::from_view(view);
    let query_span = tracing::info_span!("Find services", filter = ?filter);
    filter
        .fetch(executor, None)
        .instrument(query_span)
        .await
        .map_err(|err| {
            tracing::error!("Failed to find services, error: {:?}", err);
            err
        })
}

/// The latest stored view for the request's uuid or name.
///
/// Returns `None` when the request carries neither key or nothing matches.
pub async fn fetch_by_key<'e, E>(
    executor: E,
    view: &ServiceView,
) -> Result<Option<ServiceView>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let filter = match ServiceFilter::key(view) {
        Some(filter) => filter,
        None => return Ok(None),
    };

    let query_span = tracing::info_span!("Fetch service", filter = ?filter);
    filter
        .fetch(executor, Some(1))
        .instrument(query_span)
        .await
        .map(|views| views.into_iter().next())
        .map_err(|err| {
            tracing::error!("Failed to fetch service, error: {:?}", err);
            err
        })
}
