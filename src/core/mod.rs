pub mod config;
pub mod context;
pub mod metrics;
pub mod security;
pub(crate) mod shutdown;
pub mod telemetry;
pub mod time;
