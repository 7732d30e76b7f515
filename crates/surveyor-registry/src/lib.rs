pub mod auth;
pub mod config;
pub mod error;
pub mod forms;
pub mod storage;
pub mod telemetry;
