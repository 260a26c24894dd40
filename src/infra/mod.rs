pub mod error;
pub mod health;
pub mod http;
pub mod repo;
pub mod telemetry;
