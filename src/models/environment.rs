use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::Map;

/// Lifecycle status of an environment, stored as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnvironmentStatus {
    #[serde(rename = "initializing")]
    Initializing,
    #[serde(rename = "in_progress")]
    InProgress,
    #[serde(rename = "done")]
    Done,
    #[serde(rename = "errored")]
    Errored,
}

impl fmt::Display for EnvironmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvironmentStatus::Initializing => write!(f, "initializing"),
            EnvironmentStatus::InProgress => write!(f, "in_progress"),
            EnvironmentStatus::Done => write!(f, "done"),
            EnvironmentStatus::Errored => write!(f, "errored"),
        }
    }
}

impl FromStr for EnvironmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initializing" => Ok(EnvironmentStatus::Initializing),
            "in_progress" => Ok(EnvironmentStatus::InProgress),
            "done" => Ok(EnvironmentStatus::Done),
            "errored" => Ok(EnvironmentStatus::Errored),
            other => Err(format!("unknown environment status: {:?}", other)),
        }
    }
}

// A named deployment target. `status` keeps the raw stored value so that
// unexpected values surface at the status gate instead of at decode time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Environment {
    pub id: i32,
    pub name: String,
    pub datacenter_id: i32,
    #[serde(rename = "type")]
    pub kind: String,
    #[sqlx(json)]
    pub options: Map,
    #[sqlx(json)]
    pub credentials: Map,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Environment {
    pub fn new(name: String, datacenter_id: i32, kind: String) -> Self {
        Self {
            name,
            datacenter_id,
            kind,
            ..Default::default()
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Environment {
            id: 0,
            name: String::new(),
            datacenter_id: 0,
            kind: String::new(),
            options: Map::new(),
            credentials: Map::new(),
            status: EnvironmentStatus::Initializing.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}
