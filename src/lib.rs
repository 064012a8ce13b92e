pub mod configuration;
pub mod db;
pub mod forms;
pub mod handlers;
pub mod helpers;
pub mod models;
pub mod services;
pub mod startup;
pub mod telemetry;
