pub mod error;
mod service_store;

pub use error::{Result, ServiceError};
pub use service_store::*;
