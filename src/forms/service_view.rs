use crate::models::{self, BuildStatus, EnvironmentStatus, Map};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An environment joined with its most relevant build.
///
/// This is the only shape exchanged with callers, both as request and as
/// reply. `ids` and `names` are bulk filters and never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(default)]
pub struct ServiceView {
    /// Internal build id, zero when the view is not backed by a stored row.
    #[serde(skip)]
    pub id: i32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    #[sqlx(skip)]
    pub ids: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    #[sqlx(skip)]
    pub names: Vec<String>,
    #[serde(rename = "id")]
    pub uuid: String,
    pub user_id: i32,
    pub datacenter_id: i32,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub version: Option<DateTime<Utc>>,
    pub status: String,
    #[sqlx(json)]
    pub options: Map,
    #[sqlx(json)]
    pub credentials: Map,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub definition: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    #[sqlx(json)]
    pub mapping: Map,
}

impl ServiceView {
    /// Decodes a wire payload. A malformed payload is an error, never a
    /// partially filled view.
    pub fn decode(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice::<ServiceView>(body).map_err(|err| {
            tracing::error!("decoding service view: {:?}", err);
            err
        })
    }

    pub fn has_id(&self) -> bool {
        self.id != 0
    }

    /// A request without build uuid and build type only touches the
    /// environment shell.
    pub fn is_build_request(&self) -> bool {
        !self.uuid.is_empty() || !self.kind.is_empty()
    }
}

impl From<&ServiceView> for models::Environment {
    fn from(val: &ServiceView) -> Self {
        let mut env = models::Environment::new(val.name.clone(), val.datacenter_id, val.kind.clone());
        env.options = val.options.clone();
        env.credentials = val.credentials.clone();
        env.status = EnvironmentStatus::Initializing.to_string();
        env
    }
}

impl From<&ServiceView> for models::Build {
    fn from(val: &ServiceView) -> Self {
        models::Build {
            uuid: val.uuid.clone(),
            user_id: val.user_id,
            kind: val.kind.clone(),
            status: BuildStatus::InProgress.to_string(),
            definition: val.definition.clone(),
            mapping: val.mapping.clone(),
            ..Default::default()
        }
    }
}
