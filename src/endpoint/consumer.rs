use std::{fmt, sync::Arc};

use parking_lot::Mutex;

use super::{ConsumerId, Endpoint, Processor};

/// Читающая сторона endpoint'а.
///
/// `start` регистрирует обработчик в реестре потребителей, `stop` снимает
/// его. Пока потребитель зарегистрирован, обработчик вызывается ровно один
/// раз на каждое разосланное сообщение.
///
/// Отписка происходит автоматически при `Drop`.
///
/// `start` и `stop` упорядочены отдельным мьютексом жизненного цикла.
/// Мьютекс с токеном регистрации во время обращений к endpoint'у не
/// удерживается, поэтому слушатели событий могут опрашивать `id` и
/// `is_started` того же потребителя.
pub struct Consumer {
    endpoint: Arc<Endpoint>,
    processor: Arc<dyn Processor>,
    registration: Mutex<Option<ConsumerId>>,
    lifecycle: Mutex<()>,
}

impl Consumer {
    pub(crate) fn new(
        endpoint: Arc<Endpoint>,
        processor: Arc<dyn Processor>,
    ) -> Self {
        Self {
            endpoint,
            processor,
            registration: Mutex::new(None),
            lifecycle: Mutex::new(()),
        }
    }

    /// Регистрирует потребителя и возвращает его токен. Если потребитель уже
    /// запущен, возвращает существующий токен.
    pub fn start(&self) -> ConsumerId {
        let _lifecycle = self.lifecycle.lock();
        if let Some(id) = self.id() {
            return id;
        }
        let id = self.endpoint.register_consumer(Arc::clone(&self.processor));
        *self.registration.lock() = Some(id);
        id
    }

    /// Снимает регистрацию. Возвращает `false`, если потребитель не был
    /// запущен.
    pub fn stop(&self) -> bool {
        let _lifecycle = self.lifecycle.lock();
        let taken = self.registration.lock().take();
        match taken {
            Some(id) => self.endpoint.deregister_consumer(id),
            None => false,
        }
    }

    pub fn is_started(&self) -> bool {
        self.registration.lock().is_some()
    }

    /// Текущий токен регистрации.
    pub fn id(&self) -> Option<ConsumerId> {
        *self.registration.lock()
    }

    pub fn name(&self) -> &str {
        self.processor.name()
    }

    pub fn endpoint(&self) -> &Arc<Endpoint> {
        &self.endpoint
    }
}

impl Drop for Consumer {
    fn drop(&mut self) {
        if let Some(id) = self.registration.get_mut().take() {
            self.endpoint.deregister_consumer(id);
        }
    }
}

impl fmt::Debug for Consumer {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("endpoint", &self.endpoint.identity())
            .field("name", &self.name())
            .field("registration", &self.id())
            .finish()
    }
}
