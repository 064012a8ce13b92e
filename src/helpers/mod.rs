pub mod mq_manager;

pub use mq_manager::MqManager;
