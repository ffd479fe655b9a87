use std::env;

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Settings {
    runtime: RuntimeSettings,
    database: DatabaseSettings,
    ai: AiSettings,
    engine: EngineSettings,
    telemetry: TelemetrySettings,
}

#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub environment: Environment,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub postgres_server: String,
    pub postgres_port: u16,
    pub postgres_user: String,
    pub postgres_password: String,
    pub postgres_db: String,
    pub database_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AiSettings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub request_timeout_seconds: u64,
}

/// Tunables of the assessment engine itself.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Target size of a selected question set.
    pub questions_per_attempt: usize,
    /// Capacity of the shared recency buffer used by formal selection.
    pub recency_capacity: usize,
    /// Percentage of the possible marks needed to pass a formal test.
    pub passing_score_percent: f64,
}

#[derive(Debug, Clone)]
pub struct TelemetrySettings {
    pub log_level: String,
    pub json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Staging,
    Test,
}

impl Environment {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Staging => "staging",
            Self::Test => "test",
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let environment = parse_environment(
            env_optional("SMARTTEST_ENV").or_else(|| env_optional("ENVIRONMENT")),
        );

        let postgres_server = env_or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = parse_u16("POSTGRES_PORT", env_or_default("POSTGRES_PORT", "5432"))?;
        let postgres_user = env_or_default("POSTGRES_USER", "smarttest");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "smarttest_db");
        let database_url = env_optional("DATABASE_URL");

        let api_key = env_or_default("OPENAI_API_KEY", "");
        let base_url = env_or_default("OPENAI_BASE_URL", "https://api.openai.com/v1");
        let model = env_or_default("AI_MODEL", "gpt-4o-mini");
        let max_tokens = parse_u32("AI_MAX_TOKENS", env_or_default("AI_MAX_TOKENS", "2000"))?;
        let temperature =
            parse_f64("AI_TEMPERATURE", env_or_default("AI_TEMPERATURE", "0.2"))?;
        let request_timeout_seconds =
            parse_u64("AI_REQUEST_TIMEOUT", env_or_default("AI_REQUEST_TIMEOUT", "60"))?;

        let questions_per_attempt = parse_usize(
            "SMARTTEST_QUESTIONS_PER_ATTEMPT",
            env_or_default("SMARTTEST_QUESTIONS_PER_ATTEMPT", "10"),
        )?;
        if questions_per_attempt == 0 {
            return Err(ConfigError::InvalidValue {
                field: "SMARTTEST_QUESTIONS_PER_ATTEMPT",
                value: "0".to_string(),
            });
        }
        let recency_capacity = parse_usize(
            "SMARTTEST_RECENCY_CAPACITY",
            env_or_default("SMARTTEST_RECENCY_CAPACITY", "30"),
        )?;
        let passing_score_percent = parse_f64(
            "SMARTTEST_PASSING_PERCENT",
            env_or_default("SMARTTEST_PASSING_PERCENT", "60"),
        )?;
        if !(0.0..=100.0).contains(&passing_score_percent) {
            return Err(ConfigError::InvalidValue {
                field: "SMARTTEST_PASSING_PERCENT",
                value: passing_score_percent.to_string(),
            });
        }

        let log_level = env_or_default("SMARTTEST_LOG_LEVEL", "info");
        let json = env_optional("SMARTTEST_LOG_JSON")
            .map(|value| parse_bool(&value))
            .unwrap_or(false);

        Ok(Self {
            runtime: RuntimeSettings { environment },
            database: DatabaseSettings {
                postgres_server,
                postgres_port,
                postgres_user,
                postgres_password,
                postgres_db,
                database_url,
            },
            ai: AiSettings {
                api_key,
                base_url,
                model,
                max_tokens,
                temperature,
                request_timeout_seconds,
            },
            engine: EngineSettings {
                questions_per_attempt,
                recency_capacity,
                passing_score_percent,
            },
            telemetry: TelemetrySettings { log_level, json },
        })
    }

    pub fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    pub fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub fn ai(&self) -> &AiSettings {
        &self.ai
    }

    pub fn engine(&self) -> &EngineSettings {
        &self.engine
    }

    pub fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }
}

impl DatabaseSettings {
    pub fn database_url(&self) -> String {
        if let Some(url) = &self.database_url {
            return url.clone();
        }

        format!(
            "postgresql://{}:{}@{}:{}/{}",
            self.postgres_user,
            self.postgres_password,
            self.postgres_server,
            self.postgres_port,
            self.postgres_db
        )
    }
}

fn env_optional(key: &str) -> Option<String> {
    env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

fn env_or_default(key: &str, default: &str) -> String {
    env_optional(key).unwrap_or_else(|| default.to_string())
}

fn parse_u16(field: &'static str, value: String) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidValue { field, value })
}

fn parse_u32(field: &'static str, value: String) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidValue { field, value })
}

fn parse_u64(field: &'static str, value: String) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidValue { field, value })
}

fn parse_usize(field: &'static str, value: String) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidValue { field, value })
}

fn parse_f64(field: &'static str, value: String) -> Result<f64, ConfigError> {
    value.parse::<f64>().map_err(|_| ConfigError::InvalidValue { field, value })
}

fn parse_bool(value: &str) -> bool {
    matches!(value, "1" | "true" | "TRUE" | "yes" | "YES" | "on" | "ON")
}

fn parse_environment(value: Option<String>) -> Environment {
    match value.as_deref().map(|item| item.to_lowercase()) {
        Some(ref val) if val == "production" || val == "prod" => Environment::Production,
        Some(ref val) if val == "staging" => Environment::Staging,
        Some(ref val) if val == "test" || val == "testing" => Environment::Test,
        _ => Environment::Development,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bool_variants() {
        assert!(parse_bool("1"));
        assert!(parse_bool("true"));
        assert!(parse_bool("YES"));
        assert!(parse_bool("on"));
        assert!(!parse_bool("false"));
        assert!(!parse_bool("0"));
    }

    #[test]
    fn parse_environment_variants() {
        assert_eq!(parse_environment(Some("prod".to_string())), Environment::Production);
        assert_eq!(parse_environment(Some("production".to_string())), Environment::Production);
        assert_eq!(parse_environment(Some("staging".to_string())), Environment::Staging);
        assert_eq!(parse_environment(Some("testing".to_string())), Environment::Test);
        assert_eq!(parse_environment(None), Environment::Development);
    }

    #[test]
    fn database_url_prefers_explicit_url() {
        let settings = DatabaseSettings {
            postgres_server: "db".to_string(),
            postgres_port: 5432,
            postgres_user: "u".to_string(),
            postgres_password: "p".to_string(),
            postgres_db: "d".to_string(),
            database_url: Some("postgresql://explicit/url".to_string()),
        };
        assert_eq!(settings.database_url(), "postgresql://explicit/url");
    }

    #[test]
    fn database_url_assembles_from_parts() {
        let settings = DatabaseSettings {
            postgres_server: "db".to_string(),
            postgres_port: 5433,
            postgres_user: "u".to_string(),
            postgres_password: "p".to_string(),
            postgres_db: "d".to_string(),
            database_url: None,
        };
        assert_eq!(settings.database_url(), "postgresql://u:p@db:5433/d");
    }

    #[test]
    fn invalid_numeric_value_is_rejected() {
        let err = parse_u16("POSTGRES_PORT", "not-a-port".to_string()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "POSTGRES_PORT", .. }));
    }
}
