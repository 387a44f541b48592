use std::env;

use chrono::Duration;

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub order_expiry_secs: i64,
    pub notify_attempts: u32,
    pub notification_buffer_size: usize,
    pub code_seed: Option<u64>,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        let log_format = match env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            Ok("compact") | Err(_) => LogFormat::Compact,
            Ok(other) => {
                return Err(AppError::Internal(format!(
                    "invalid LOG_FORMAT: {other}, expected compact or json"
                )));
            }
        };

        let config = Self {
            http_port: parse_or_default("HTTP_PORT", 8080)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_format,
            order_expiry_secs: parse_or_default("ORDER_EXPIRY_SECS", 15 * 60)?,
            notify_attempts: parse_or_default("NOTIFY_ATTEMPTS", 3)?,
            notification_buffer_size: parse_or_default("NOTIFICATION_BUFFER_SIZE", 1024)?,
            code_seed: parse_optional("CODE_SEED")?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Range checks that parsing alone cannot express.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.order_expiry_secs <= 0 {
            return Err(AppError::Internal(
                "invalid ORDER_EXPIRY_SECS: must be > 0".to_string(),
            ));
        }
        if self.notify_attempts == 0 {
            return Err(AppError::Internal(
                "invalid NOTIFY_ATTEMPTS: must be > 0".to_string(),
            ));
        }
        if self.notification_buffer_size == 0 {
            return Err(AppError::Internal(
                "invalid NOTIFICATION_BUFFER_SIZE: must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn order_expiry(&self) -> Duration {
        Duration::seconds(self.order_expiry_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 8080,
            log_level: "info".to_string(),
            log_format: LogFormat::Compact,
            order_expiry_secs: 15 * 60,
            notify_attempts: 3,
            notification_buffer_size: 1024,
            code_seed: None,
        }
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    Ok(parse_optional(key)?.unwrap_or(default))
}

fn parse_optional<T>(key: &str) -> Result<Option<T>, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(None),
    }
}
