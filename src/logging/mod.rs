pub mod config;
mod filters;
mod formatter;

pub use config::{LogFormat, LoggingConfig, ENV_LOG_FORMAT, ENV_LOG_LEVEL};
use listpoint_error::{GenericError, ListpointResult, StatusCode};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Устанавливает глобальный подписчик `tracing` по конфигурации.
///
/// Сначала применяются переопределения из окружения, затем конфиг
/// проверяется. Повторная инициализация возвращает ошибку
/// [`StatusCode::AlreadyExists`].
pub fn init_logging(mut config: LoggingConfig) -> ListpointResult<()> {
    config.apply_env_overrides();
    config.validate()?;

    let env_filter = filters::build_filter_from_config(&config);
    let fmt_layer = formatter::build_formatter_from_config(&config);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| GenericError::new(StatusCode::AlreadyExists, e.to_string()))?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        log_level = %config.level,
        format = %config.format,
        "Logging system initialized"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    #[serial]
    fn test_init_logging_rejects_invalid_level() {
        std::env::remove_var(ENV_LOG_LEVEL);
        let cfg = LoggingConfig {
            level: "chatty".into(),
            ..LoggingConfig::default()
        };
        let err = init_logging(cfg).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::InvalidConfig);
    }

    /// Тест проверяет, что вторая инициализация не паникует, а возвращает
    /// ошибку.
    #[test]
    #[serial]
    fn test_second_init_is_error() {
        std::env::remove_var(ENV_LOG_LEVEL);
        std::env::remove_var(ENV_LOG_FORMAT);
        let cfg = LoggingConfig {
            format: LogFormat::Compact,
            with_ansi: false,
            ..LoggingConfig::default()
        };

        // Первый вызов может упасть, если подписчик уже поставлен другим тестом
        let _ = init_logging(cfg.clone());
        let err = init_logging(cfg).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::AlreadyExists);
    }
}
