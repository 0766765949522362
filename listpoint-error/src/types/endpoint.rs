use std::any::Any;

use thiserror::Error;

use crate::{ErrorExt, StackError, StatusCode};

/// Ошибки endpoint'а: жизненный цикл и доставка сообщений потребителям.
///
/// Регистрация и отписка потребителей никогда не завершаются ошибкой,
/// поэтому отдельного варианта для них нет.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum EndpointError {
    /// `send` вызван, когда endpoint остановлен (журнала нет).
    #[error("endpoint '{endpoint}' is not active")]
    Inactive { endpoint: String },

    /// Обработчик потребителя вернул ошибку во время рассылки. Остальные
    /// потребители для этого сообщения пропущены.
    #[error("consumer #{consumer} ({name}) failed: {source}")]
    ConsumerFailed {
        consumer: u64,
        name: String,
        #[source]
        source: StackError,
    },

    /// Пустой или некорректный идентификатор endpoint'а.
    #[error("invalid endpoint identity '{identity}'")]
    InvalidIdentity { identity: String },
}

impl EndpointError {
    /// Короткая стабильная метка (snake_case) для логов.
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::Inactive { .. } => "endpoint_inactive",
            Self::ConsumerFailed { .. } => "endpoint_consumer_failed",
            Self::InvalidIdentity { .. } => "endpoint_invalid_identity",
        }
    }
}

impl ErrorExt for EndpointError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Inactive { .. } => StatusCode::EndpointInactive,
            Self::ConsumerFailed { .. } => StatusCode::ConsumerFailed,
            Self::InvalidIdentity { .. } => StatusCode::InvalidArgs,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn client_message(&self) -> String {
        match self {
            Self::Inactive { endpoint } => format!("Endpoint '{endpoint}' is stopped"),
            Self::ConsumerFailed { consumer, .. } => format!("Consumer #{consumer} failed"),
            Self::InvalidIdentity { .. } => "Invalid endpoint identity".to_string(),
        }
    }

    fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        let mut tags = vec![
            ("error_type", "endpoint".to_string()),
            ("status_code", self.status_code().to_string()),
            ("label", self.as_label().to_string()),
        ];

        match self {
            Self::Inactive { endpoint } => tags.push(("endpoint", endpoint.clone())),
            Self::ConsumerFailed { consumer, name, .. } => {
                tags.push(("consumer", consumer.to_string()));
                tags.push(("consumer_name", name.clone()));
            }
            Self::InvalidIdentity { .. } => {}
        }

        tags
    }
}
