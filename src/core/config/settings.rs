use super::parsing::{
    env_optional, env_or_default, has_http_scheme, normalize_prefix, parse_bool,
    parse_environment, parse_positive_u64,
};
use super::types::{
    ApiSettings, AttemptSettings, ConfigError, CredentialSettings, RuntimeSettings, Settings,
    TelemetrySettings,
};

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let environment = parse_environment(
            env_optional("EXAM_CLIENT_ENV").or_else(|| env_optional("ENVIRONMENT")),
        );
        let strict_config = env_optional("EXAM_CLIENT_STRICT_CONFIG")
            .map(|value| parse_bool(&value))
            .unwrap_or(false)
            || environment.is_production();

        let base_url = env_or_default("EXAM_API_BASE_URL", "http://localhost:5000");
        let prefix = normalize_prefix(&env_or_default("EXAM_API_PREFIX", "/api"));
        let request_timeout_seconds = parse_positive_u64(
            "EXAM_API_TIMEOUT_SECONDS",
            env_or_default("EXAM_API_TIMEOUT_SECONDS", "30"),
        )?;
        let connect_timeout_seconds = parse_positive_u64(
            "EXAM_API_CONNECT_TIMEOUT_SECONDS",
            env_or_default("EXAM_API_CONNECT_TIMEOUT_SECONDS", "10"),
        )?;
        let user_agent = env_or_default(
            "EXAM_CLIENT_USER_AGENT",
            concat!("exam-portal-client/", env!("CARGO_PKG_VERSION")),
        );

        let confirm_submit = env_optional("EXAM_ATTEMPT_CONFIRM_SUBMIT")
            .map(|value| parse_bool(&value))
            .unwrap_or(true);

        let username = env_optional("EXAM_CLIENT_USERNAME");
        let password = env_optional("EXAM_CLIENT_PASSWORD");
        let exam_id = env_optional("EXAM_ID");

        let log_level = env_or_default("EXAM_CLIENT_LOG_LEVEL", "info");
        let json =
            env_optional("EXAM_CLIENT_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings {
                base_url: base_url.trim_end_matches('/').to_string(),
                prefix,
                request_timeout_seconds,
                connect_timeout_seconds,
                user_agent,
            },
            attempt: AttemptSettings { confirm_submit },
            credentials: CredentialSettings { username, password, exam_id },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;

        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !has_http_scheme(&self.api.base_url) {
            return Err(ConfigError::InvalidBaseUrl(self.api.base_url.clone()));
        }

        if self.runtime.strict_config {
            if !self.api.base_url.starts_with("https://") {
                return Err(ConfigError::InvalidBaseUrl(self.api.base_url.clone()));
            }
            if self.api.prefix.is_empty() {
                return Err(ConfigError::InvalidPrefix(self.api.prefix.clone()));
            }
        }

        Ok(())
    }

    pub fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    pub fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub fn attempt(&self) -> &AttemptSettings {
        &self.attempt
    }

    pub fn credentials(&self) -> &CredentialSettings {
        &self.credentials
    }

    pub fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }
}
