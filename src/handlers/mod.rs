//! Binds inbound messages to service store operations.
//!
//! A handler receives the routing key and the raw payload and answers with
//! the encoded reply body, or with an error that the transport turns into a
//! failure reply.

use crate::forms::ServiceView;
use crate::services::{Result, ServiceError, ServiceStore};
use serde::Serialize;
use std::str::FromStr;

/// Routing key pattern the listener queue is bound with.
pub const ROUTING_PATTERN: &str = "service.#";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subject {
    Get,
    Find,
    Create,
    Update,
    Delete,
    SetStatus,
}

impl FromStr for Subject {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "service.get" => Ok(Subject::Get),
            "service.find" => Ok(Subject::Find),
            "service.create" => Ok(Subject::Create),
            "service.update" => Ok(Subject::Update),
            "service.delete" => Ok(Subject::Delete),
            "service.set.status" => Ok(Subject::SetStatus),
            other => Err(format!("unknown subject {:?}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServiceHandler {
    store: ServiceStore,
}

impl ServiceHandler {
    pub fn new(store: ServiceStore) -> Self {
        Self { store }
    }

    #[tracing::instrument(name = "Handle message", skip(self, body))]
    pub async fn handle(&self, subject: &str, body: &[u8]) -> Result<Vec<u8>> {
        let subject = subject.parse::<Subject>().map_err(ServiceError::Validation)?;

        match subject {
            Subject::Get => {
                let view = self
                    .store
                    .load_from_input(body)
                    .await?
                    .ok_or_else(|| ServiceError::NotFound("service not found".to_string()))?;
                encode(&view)
            }
            Subject::Find => {
                let request = ServiceView::decode(body)?;
                encode(&self.store.find(&request).await?)
            }
            Subject::Create => {
                let mut view = ServiceView::decode(body)?;
                self.store.save(&mut view).await?;
                encode(&view)
            }
            Subject::Update => encode(&self.store.update(body).await?),
            Subject::Delete => {
                let view = ServiceView::decode(body)?;
                self.store.delete(&view).await?;
                encode(&view)
            }
            Subject::SetStatus => {
                let view = ServiceView::decode(body)?;
                encode(&self.store.set_status(&view).await?)
            }
        }
    }
}

fn encode<T: ?Sized + Serialize>(reply: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(reply).map_err(ServiceError::Encode)
}

/// Body of a failure reply: `{"error": "<message>"}`.
pub fn failure(err: &ServiceError) -> Vec<u8> {
    serde_json::json!({ "error": err.to_string() })
        .to_string()
        .into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_subjects() {
        assert_eq!("service.get".parse::<Subject>(), Ok(Subject::Get));
        assert_eq!("service.find".parse::<Subject>(), Ok(Subject::Find));
        assert_eq!("service.create".parse::<Subject>(), Ok(Subject::Create));
        assert_eq!("service.update".parse::<Subject>(), Ok(Subject::Update));
        assert_eq!("service.delete".parse::<Subject>(), Ok(Subject::Delete));
        assert_eq!("service.set.status".parse::<Subject>(), Ok(Subject::SetStatus));
    }

    #[test]
    fn rejects_unknown_subject() {
        assert!("service.purge".parse::<Subject>().is_err());
        assert!("build.get".parse::<Subject>().is_err());
    }

    #[test]
    fn failure_body_carries_message() {
        let body = failure(&ServiceError::Conflict);
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            value["error"],
            "could not create environment build: service in progress"
        );
    }
}
