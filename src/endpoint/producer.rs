use std::sync::Arc;

use listpoint_error::ListpointResult;

use super::{Endpoint, Message};

/// Пишущая сторона endpoint'а.
///
/// Без буферизации и пакетирования: `send` выполняется синхронно до конца
/// рассылки, включая работу всех обработчиков потребителей.
#[derive(Debug, Clone)]
pub struct Producer {
    endpoint: Arc<Endpoint>,
}

impl Producer {
    pub(crate) fn new(endpoint: Arc<Endpoint>) -> Self {
        Self { endpoint }
    }

    /// Отправляет сообщение. См. [`Endpoint::on_message`].
    pub fn send(
        &self,
        message: Message,
    ) -> ListpointResult<()> {
        self.endpoint.on_message(message)
    }

    pub fn endpoint(&self) -> &Arc<Endpoint> {
        &self.endpoint
    }
}
