use std::{env, fmt, str::FromStr};

use listpoint_error::{bail, ListpointResult, StatusCode};
use serde::{Deserialize, Serialize};

/// Переменная окружения с уровнем логирования.
pub const ENV_LOG_LEVEL: &str = "LISTPOINT_LOG_LEVEL";
/// Переменная окружения с форматом вывода.
pub const ENV_LOG_FORMAT: &str = "LISTPOINT_LOG_FORMAT";

const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Формат вывода событий.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

impl LogFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pretty => "pretty",
            Self::Compact => "compact",
            Self::Json => "json",
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Настройки логирования для бинарников и демо.
///
/// Библиотека сама подписчика не устанавливает, это делает
/// [`init_logging`](super::init_logging).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Уровень для крейта `listpoint` (`trace` ... `error`).
    pub level: String,
    pub format: LogFormat,
    pub with_ansi: bool,
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            with_ansi: true,
            with_target: true,
        }
    }
}

impl LoggingConfig {
    /// Применяет `LISTPOINT_LOG_LEVEL` и `LISTPOINT_LOG_FORMAT`, если они
    /// заданы. Некорректный формат игнорируется.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = env::var(ENV_LOG_LEVEL) {
            self.level = level.trim().to_ascii_lowercase();
        }
        if let Ok(format) = env::var(ENV_LOG_FORMAT) {
            if let Ok(format) = format.parse() {
                self.format = format;
            }
        }
    }

    /// Проверяет уровень логирования.
    pub fn validate(&self) -> ListpointResult<()> {
        let level = self.level.trim().to_ascii_lowercase();
        if !LEVELS.contains(&level.as_str()) {
            bail!(
                StatusCode::InvalidConfig,
                "invalid log level '{}', expected one of {:?}",
                self.level,
                LEVELS
            );
        }
        Ok(())
    }

    /// Директива `EnvFilter`: уровень для крейта, `warn` для остальных.
    pub fn build_filter_directive(&self) -> String {
        format!("warn,listpoint={}", self.level.trim().to_ascii_lowercase())
    }
}
