use std::path::Path;

use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment, File};
use listpoint_error::{GenericError, ListpointResult, StackError, StatusCode};
use serde::{Deserialize, Serialize};

use crate::endpoint::StrategyKind;

/// Префикс переменных окружения (`LISTPOINT_STRATEGY=round_robin`).
pub const ENV_PREFIX: &str = "LISTPOINT";

/// Базовое имя необязательного файла настроек в текущем каталоге
/// (`listpoint.toml`, `listpoint.yaml`, ...).
pub const DEFAULT_FILE_STEM: &str = "listpoint";

/// Настройки создаваемых endpoint'ов.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointSettings {
    /// Начальная ёмкость журнала, выделяемая при `start`.
    pub initial_log_capacity: usize,
    /// Политика рассылки сообщений потребителям.
    pub strategy: StrategyKind,
    /// Запускать ли endpoint сразу после создания в каталоге.
    pub auto_start: bool,
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            initial_log_capacity: 0,
            strategy: StrategyKind::Broadcast,
            auto_start: true,
        }
    }
}

impl EndpointSettings {
    /// Загружает настройки: значения по умолчанию, затем необязательный
    /// `listpoint.*` из текущего каталога, затем переменные окружения.
    pub fn load() -> ListpointResult<Self> {
        let cfg = Self::builder()
            .and_then(|b| {
                b.add_source(File::with_name(DEFAULT_FILE_STEM).required(false))
                    .add_source(env_source())
                    .build()
            })
            .map_err(config_error)?;

        cfg.try_deserialize().map_err(config_error)
    }

    /// То же, что [`load`](Self::load), но файл задан явно и обязателен.
    pub fn load_from(path: impl AsRef<Path>) -> ListpointResult<Self> {
        let path = path.as_ref();
        let cfg = Self::builder()
            .and_then(|b| {
                b.add_source(File::from(path).required(true))
                    .add_source(env_source())
                    .build()
            })
            .map_err(|e| config_error(e).context(format!("settings file {}", path.display())))?;

        cfg.try_deserialize().map_err(config_error)
    }

    fn builder() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let defaults = Self::default();
        Config::builder()
            .set_default("initial_log_capacity", defaults.initial_log_capacity as u64)?
            .set_default("strategy", defaults.strategy.as_str())?
            .set_default("auto_start", defaults.auto_start)
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX).try_parsing(true)
}

fn config_error(err: ConfigError) -> StackError {
    GenericError::new(StatusCode::InvalidConfig, err.to_string()).into()
}
