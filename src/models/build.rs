use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::Map;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildStatus {
    #[serde(rename = "in_progress")]
    InProgress,
    #[serde(rename = "done")]
    Done,
    #[serde(rename = "errored")]
    Errored,
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildStatus::InProgress => write!(f, "in_progress"),
            BuildStatus::Done => write!(f, "done"),
            BuildStatus::Errored => write!(f, "errored"),
        }
    }
}

impl FromStr for BuildStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(BuildStatus::InProgress),
            "done" => Ok(BuildStatus::Done),
            "errored" => Ok(BuildStatus::Errored),
            other => Err(format!("unknown build status: {:?}", other)),
        }
    }
}

/// One initialize/update attempt of an environment.
///
/// `created_at` is assigned by the database and is the build's version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Build {
    pub id: i32,
    pub uuid: String,
    pub environment_id: i32,
    pub user_id: i32,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
    pub definition: String,
    #[sqlx(json)]
    pub mapping: Map,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for Build {
    fn default() -> Self {
        Build {
            id: 0,
            uuid: String::new(),
            environment_id: 0,
            user_id: 0,
            kind: String::new(),
            status: BuildStatus::InProgress.to_string(),
            definition: String::new(),
            mapping: Map::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}
