use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use listpoint_error::{EndpointError, ListpointResult};
use parking_lot::RwLock;
use tracing::{debug, trace};

use super::{
    Consumer, ConsumerId, ConsumerRegistry, EndpointEvent, EndpointListener, ListenerId,
    ListenerSet, Message, MessageLog, Processor, Producer,
};
use crate::config::EndpointSettings;

/// Состояние жизненного цикла endpoint'а.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointState {
    /// Журнала нет, `send` отклоняется.
    Inactive,
    /// Журнал существует, сообщения записываются и рассылаются.
    Active,
}

impl EndpointState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::Active => "active",
        }
    }
}

impl fmt::Display for EndpointState {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Счётчики endpoint'а.
#[derive(Debug, Default)]
pub struct EndpointStats {
    /// Сообщения, записанные в журнал.
    pub sends_accepted: AtomicU64,
    /// `send`, отклонённые из-за остановленного endpoint'а.
    pub sends_rejected: AtomicU64,
    /// Рассылки, прерванные ошибкой потребителя.
    pub dispatch_failures: AtomicU64,
}

/// Снимок [`EndpointStats`] на момент вызова.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub sends_accepted: u64,
    pub sends_rejected: u64,
    pub dispatch_failures: u64,
}

impl EndpointStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            sends_accepted: self.sends_accepted.load(Ordering::Relaxed),
            sends_rejected: self.sends_rejected.load(Ordering::Relaxed),
            dispatch_failures: self.dispatch_failures.load(Ordering::Relaxed),
        }
    }
}

/// Именованный канал, который записывает каждое сообщение в журнал и
/// синхронно рассылает его всем зарегистрированным потребителям.
///
/// Журнал существует только в состоянии [`EndpointState::Active`]; реестр
/// потребителей живёт всё время жизни endpoint'а и не зависит от
/// `start`/`stop`. Endpoint раздаётся как `Arc<Endpoint>` и безопасно
/// разделяется между потоками.
///
/// # Синхронизация
/// `send` берёт read-лок на слот журнала только на время `append`, поэтому
/// отправители не мешают друг другу. `stop` берёт write-лок: отправка,
/// совпавшая со остановкой, либо успевает записать сообщение до очистки,
/// либо получает [`EndpointError::Inactive`]. `snapshot` держит read-лок
/// только пока клонирует `Arc` журнала, а копирует уже без лока. Рассылка
/// выполняется без лока, так что обработчики могут вызывать любые методы
/// endpoint'а.
pub struct Endpoint {
    identity: Arc<str>,
    log: RwLock<Option<Arc<MessageLog>>>,
    registry: ConsumerRegistry,
    listeners: ListenerSet,
    stats: EndpointStats,
    initial_log_capacity: usize,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl Endpoint {
    /// Создаёт остановленный endpoint с настройками по умолчанию.
    pub fn new(identity: impl Into<Arc<str>>) -> Self {
        Self::with_settings(identity, &EndpointSettings::default())
    }

    /// Создаёт остановленный endpoint с заданной стратегией рассылки и
    /// начальной ёмкостью журнала.
    ///
    /// `auto_start` здесь не учитывается: им пользуется
    /// [`EndpointDirectory`](super::EndpointDirectory).
    pub fn with_settings(
        identity: impl Into<Arc<str>>,
        settings: &EndpointSettings,
    ) -> Self {
        Self {
            identity: identity.into(),
            log: RwLock::new(None),
            registry: ConsumerRegistry::with_strategy(settings.strategy.build()),
            listeners: ListenerSet::new(),
            stats: EndpointStats::default(),
            initial_log_capacity: settings.initial_log_capacity,
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Всегда `true`: на один идентификатор должен приходиться один экземпляр.
    pub fn is_singleton(&self) -> bool {
        true
    }

    /// Переводит endpoint в `Active` с новым пустым журналом.
    ///
    /// Повторный вызов на запущенном endpoint'е ничего не делает и
    /// возвращает `false`.
    pub fn start(&self) -> bool {
        {
            let mut slot = self.log.write();
            if slot.is_some() {
                return false;
            }
            *slot = Some(Arc::new(MessageLog::with_capacity(
                self.initial_log_capacity,
            )));
        }

        debug!(endpoint = %self.identity, "Endpoint started");
        self.listeners.notify(&EndpointEvent::Started {
            endpoint: Arc::clone(&self.identity),
        });
        true
    }

    /// Очищает и освобождает журнал, переводя endpoint в `Inactive`.
    ///
    /// Потребители остаются зарегистрированными. Возвращает количество
    /// удалённых сообщений; на остановленном endpoint'е ничего не делает и
    /// возвращает `0`.
    pub fn stop(&self) -> usize {
        let discarded = {
            let mut slot = self.log.write();
            match slot.take() {
                // Снимок, начатый до остановки, может ещё держать журнал.
                Some(log) => match Arc::try_unwrap(log) {
                    Ok(mut log) => log.clear(),
                    Err(shared) => shared.len(),
                },
                None => return 0,
            }
        };

        debug!(endpoint = %self.identity, discarded, "Endpoint stopped");
        self.listeners.notify(&EndpointEvent::Stopped {
            endpoint: Arc::clone(&self.identity),
            discarded,
        });
        discarded
    }

    pub fn state(&self) -> EndpointState {
        if self.log.read().is_some() {
            EndpointState::Active
        } else {
            EndpointState::Inactive
        }
    }

    pub fn is_active(&self) -> bool {
        self.state() == EndpointState::Active
    }

    /// Снимок журнала в порядке поступления.
    ///
    /// Для остановленного endpoint'а возвращает пустой вектор: отсутствие
    /// журнала и пустой журнал для инструментов просмотра неотличимы.
    pub fn snapshot(&self) -> Vec<Message> {
        let log = self.log.read().clone();
        log.map(|log| log.snapshot()).unwrap_or_default()
    }

    /// Количество сообщений в журнале (`0`, если endpoint остановлен).
    pub fn log_len(&self) -> usize {
        self.log.read().as_ref().map_or(0, |log| log.len())
    }

    /// Принимает сообщение от продюсера: записывает его в журнал и
    /// синхронно рассылает потребителям в текущем потоке.
    ///
    /// # Ошибки
    /// - [`EndpointError::Inactive`], если endpoint остановлен; в журнал
    ///   ничего не пишется.
    /// - [`EndpointError::ConsumerFailed`] с контекстом endpoint'а, если
    ///   обработчик вернул ошибку. Сообщение при этом уже в журнале, а
    ///   оставшиеся потребители его не получают.
    pub fn on_message(
        &self,
        message: Message,
    ) -> ListpointResult<()> {
        {
            let slot = self.log.read();
            let Some(log) = slot.as_ref() else {
                self.stats.sends_rejected.fetch_add(1, Ordering::Relaxed);
                return Err(EndpointError::Inactive {
                    endpoint: self.identity.to_string(),
                }
                .into());
            };
            log.append(message.clone());
        }
        self.stats.sends_accepted.fetch_add(1, Ordering::Relaxed);
        trace!(
            endpoint = %self.identity,
            message_id = %message.id(),
            len = message.len(),
            "Message accepted"
        );

        self.registry.dispatch(&message).map_err(|err| {
            self.stats.dispatch_failures.fetch_add(1, Ordering::Relaxed);
            err.context(format!("endpoint '{}'", self.identity))
        })
    }

    /// Создаёт продюсера, пишущего в этот endpoint.
    pub fn create_producer(self: &Arc<Self>) -> Producer {
        Producer::new(Arc::clone(self))
    }

    /// Создаёт потребителя с указанным обработчиком. Потребитель не
    /// зарегистрирован, пока не вызван [`Consumer::start`].
    pub fn create_consumer<P>(
        self: &Arc<Self>,
        processor: P,
    ) -> Consumer
    where
        P: Processor,
    {
        Consumer::new(Arc::clone(self), Arc::new(processor))
    }

    /// Регистрирует обработчик в реестре потребителей.
    pub fn register_consumer(
        &self,
        processor: Arc<dyn Processor>,
    ) -> ConsumerId {
        let name = processor.name().to_string();
        let id = self.registry.register(processor);

        debug!(endpoint = %self.identity, consumer = %id, name = %name, "Consumer registered");
        self.listeners.notify(&EndpointEvent::ConsumerRegistered {
            endpoint: Arc::clone(&self.identity),
            consumer: id,
        });
        id
    }

    /// Удаляет потребителя. Неизвестный токен игнорируется (`false`).
    pub fn deregister_consumer(
        &self,
        id: ConsumerId,
    ) -> bool {
        if !self.registry.deregister(id) {
            return false;
        }

        debug!(endpoint = %self.identity, consumer = %id, "Consumer deregistered");
        self.listeners.notify(&EndpointEvent::ConsumerDeregistered {
            endpoint: Arc::clone(&self.identity),
            consumer: id,
        });
        true
    }

    pub fn consumer_count(&self) -> usize {
        self.registry.len()
    }

    pub fn strategy_name(&self) -> &'static str {
        self.registry.strategy_name()
    }

    pub fn stats(&self) -> &EndpointStats {
        &self.stats
    }

    /// Подписывает наблюдателя на переходы состояния.
    pub fn add_listener(
        &self,
        listener: Arc<dyn EndpointListener>,
    ) -> ListenerId {
        self.listeners.add(listener)
    }

    pub fn remove_listener(
        &self,
        id: ListenerId,
    ) -> bool {
        self.listeners.remove(id)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для Endpoint
////////////////////////////////////////////////////////////////////////////////

impl fmt::Debug for Endpoint {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("identity", &self.identity)
            .field("state", &self.state())
            .field("log_len", &self.log_len())
            .field("registry", &self.registry)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::sync::{atomic::AtomicUsize, Mutex};

    use listpoint_error::{GenericError, StatusCode};

    use super::*;
    use crate::endpoint::StrategyKind;

    fn payloads(messages: &[Message]) -> Vec<String> {
        messages
            .iter()
            .map(|m| String::from_utf8_lossy(m.payload()).into_owned())
            .collect()
    }

    fn active(identity: &str) -> Arc<Endpoint> {
        let endpoint = Arc::new(Endpoint::new(identity));
        endpoint.start();
        endpoint
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<EndpointEvent>>);

    impl EndpointListener for Recorder {
        fn on_event(
            &self,
            event: &EndpointEvent,
        ) {
            self.0.lock().unwrap().push(event.clone());
        }
    }

    #[test]
    fn test_new_endpoint_is_inactive() {
        let endpoint = Endpoint::new("tap");
        assert_eq!(endpoint.identity(), "tap");
        assert!(endpoint.is_singleton());
        assert_eq!(endpoint.state(), EndpointState::Inactive);
        assert!(endpoint.snapshot().is_empty());
        assert_eq!(endpoint.log_len(), 0);
        assert_eq!(endpoint.strategy_name(), "broadcast");
    }

    /// Тест проверяет, что отправка в остановленный endpoint отклоняется и
    /// ничего не пишет в журнал.
    #[test]
    fn test_send_while_inactive_fails() {
        let endpoint = Endpoint::new("tap");
        let err = endpoint.on_message(Message::new("A")).unwrap_err();

        assert_eq!(err.status_code(), StatusCode::EndpointInactive);
        assert!(matches!(
            err.downcast_ref::<EndpointError>(),
            Some(EndpointError::Inactive { endpoint }) if endpoint == "tap"
        ));
        assert_eq!(endpoint.stats().snapshot().sends_rejected, 1);

        endpoint.start();
        assert!(endpoint.snapshot().is_empty());
    }

    #[test]
    fn test_snapshot_preserves_send_order() {
        let endpoint = active("tap");
        for p in ["a", "b", "c"] {
            endpoint.on_message(Message::new(p)).unwrap();
        }

        assert_eq!(payloads(&endpoint.snapshot()), vec!["a", "b", "c"]);
        assert_eq!(endpoint.log_len(), 3);
        assert_eq!(endpoint.stats().snapshot().sends_accepted, 3);
    }

    /// Тест проверяет, что stop/start даёт пустой журнал, а повторный start
    /// и повторный stop ничего не делают.
    #[test]
    fn test_restart_discards_history() {
        let endpoint = active("tap");
        endpoint.on_message(Message::new("old")).unwrap();

        assert!(!endpoint.start());
        assert_eq!(endpoint.log_len(), 1);

        assert_eq!(endpoint.stop(), 1);
        assert_eq!(endpoint.stop(), 0);
        assert!(endpoint.start());
        assert!(endpoint.snapshot().is_empty());
    }

    /// Тест проверяет, что stop не отписывает потребителей.
    #[test]
    fn test_stop_keeps_consumers_registered() {
        let endpoint = active("tap");
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = Arc::clone(&seen);
        endpoint.register_consumer(Arc::new(move |_: &Message| -> ListpointResult<()> {
            seen_clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));

        endpoint.stop();
        assert_eq!(endpoint.consumer_count(), 1);

        endpoint.start();
        endpoint.on_message(Message::new("again")).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    /// Тест проверяет, что ошибка потребителя доходит до отправителя с
    /// контекстом endpoint'а, а сообщение остаётся в журнале.
    #[test]
    fn test_consumer_error_propagates_with_context() {
        let endpoint = active("audit");
        endpoint.register_consumer(Arc::new(|_: &Message| -> ListpointResult<()> {
            Err(GenericError::new(StatusCode::InvalidValue, "rejected").into())
        }));

        let err = endpoint.on_message(Message::new("x")).unwrap_err();

        assert_eq!(err.status_code(), StatusCode::ConsumerFailed);
        assert!(err
            .contexts()
            .iter()
            .any(|c| c.message == "endpoint 'audit'"));
        assert_eq!(endpoint.log_len(), 1);
        assert_eq!(endpoint.stats().snapshot().dispatch_failures, 1);
    }

    /// Тест проверяет, что обработчик может обращаться к endpoint'у во время
    /// рассылки без взаимной блокировки.
    #[test]
    fn test_processor_may_call_back_into_endpoint() {
        let endpoint = active("tap");
        let observed = Arc::new(AtomicUsize::new(0));
        {
            let inner = Arc::clone(&endpoint);
            let observed = Arc::clone(&observed);
            endpoint.register_consumer(Arc::new(move |_: &Message| -> ListpointResult<()> {
                observed.store(inner.snapshot().len(), Ordering::SeqCst);
                Ok(())
            }));
        }

        endpoint.on_message(Message::new("x")).unwrap();
        assert_eq!(observed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_listeners_observe_transitions() {
        let endpoint = Endpoint::new("tap");
        let recorder = Arc::new(Recorder::default());
        let listener = endpoint.add_listener(recorder.clone());

        endpoint.start();
        let id = endpoint.register_consumer(Arc::new(|_: &Message| -> ListpointResult<()> {
            Ok(())
        }));
        endpoint.on_message(Message::new("x")).unwrap();
        assert!(endpoint.deregister_consumer(id));
        assert!(!endpoint.deregister_consumer(id));
        endpoint.stop();

        assert!(endpoint.remove_listener(listener));
        endpoint.start();

        let tap: Arc<str> = Arc::from("tap");
        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec![
                EndpointEvent::Started { endpoint: tap.clone() },
                EndpointEvent::ConsumerRegistered {
                    endpoint: tap.clone(),
                    consumer: id
                },
                EndpointEvent::ConsumerDeregistered {
                    endpoint: tap.clone(),
                    consumer: id
                },
                EndpointEvent::Stopped {
                    endpoint: tap,
                    discarded: 1
                },
            ]
        );
    }

    #[test]
    fn test_with_settings_applies_strategy() {
        let settings = EndpointSettings {
            strategy: StrategyKind::RoundRobin,
            initial_log_capacity: 16,
            ..EndpointSettings::default()
        };
        let endpoint = Endpoint::with_settings("rr", &settings);
        assert_eq!(endpoint.strategy_name(), "round_robin");
        assert!(!endpoint.is_active());
    }
}
