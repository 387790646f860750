mod parsing;
mod settings;
mod types;

pub use types::{
    ApiSettings, AttemptSettings, ConfigError, CredentialSettings, Environment, RuntimeSettings,
    Settings, TelemetrySettings,
};
