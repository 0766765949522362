use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use listpoint_error::ListpointResult;
use serde::{Deserialize, Serialize};

use super::{ConsumerEntry, Message};

/// Политика распределения сообщения между активными потребителями.
///
/// Реестр потребителей передаёт стратегии неизменяемый снимок списка
/// потребителей; стратегия решает, кому и в каком порядке доставить
/// сообщение. Жизненный цикл и журнал endpoint'а от стратегии не зависят.
pub trait DistributionStrategy: Send + Sync + 'static {
    /// Доставляет сообщение выбранным потребителям синхронно, в текущем
    /// потоке. Первая ошибка потребителя прерывает рассылку.
    fn dispatch(
        &self,
        message: &Message,
        consumers: &[ConsumerEntry],
    ) -> ListpointResult<()>;

    /// Короткое имя стратегии для логов и статистики.
    fn name(&self) -> &'static str;
}

/// Рассылка каждому активному потребителю (broadcast).
///
/// Порядок обхода потребителей не является частью контракта. При первой
/// ошибке оставшиеся потребители для этого сообщения пропускаются.
#[derive(Debug, Default, Clone, Copy)]
pub struct Broadcast;

impl DistributionStrategy for Broadcast {
    fn dispatch(
        &self,
        message: &Message,
        consumers: &[ConsumerEntry],
    ) -> ListpointResult<()> {
        for consumer in consumers {
            consumer.deliver(message)?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "broadcast"
    }
}

/// Доставка ровно одному потребителю, по кругу.
#[derive(Debug, Default)]
pub struct RoundRobin {
    cursor: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DistributionStrategy for RoundRobin {
    fn dispatch(
        &self,
        message: &Message,
        consumers: &[ConsumerEntry],
    ) -> ListpointResult<()> {
        if consumers.is_empty() {
            return Ok(());
        }
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % consumers.len();
        consumers[idx].deliver(message)
    }

    fn name(&self) -> &'static str {
        "round_robin"
    }
}

/// Выбор стратегии из конфигурации.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[default]
    Broadcast,
    RoundRobin,
}

impl StrategyKind {
    pub fn build(self) -> Arc<dyn DistributionStrategy> {
        match self {
            Self::Broadcast => Arc::new(Broadcast),
            Self::RoundRobin => Arc::new(RoundRobin::new()),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Broadcast => "broadcast",
            Self::RoundRobin => "round_robin",
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use listpoint_error::{EndpointError, GenericError, StatusCode};
    use rstest::rstest;

    use super::*;
    use crate::endpoint::{ConsumerId, Processor};

    /// Потребитель, записывающий свой номер в общий журнал вызовов.
    fn recorder(
        tag: u64,
        calls: &Arc<Mutex<Vec<u64>>>,
    ) -> ConsumerEntry {
        let calls = Arc::clone(calls);
        let processor: Arc<dyn Processor> = Arc::new(move |_: &Message| -> ListpointResult<()> {
            calls.lock().unwrap().push(tag);
            Ok(())
        });
        ConsumerEntry::new(ConsumerId::from_raw(tag), processor)
    }

    fn failing(tag: u64) -> ConsumerEntry {
        let processor: Arc<dyn Processor> = Arc::new(|_: &Message| -> ListpointResult<()> {
            Err(GenericError::new(StatusCode::InvalidValue, "boom").into())
        });
        ConsumerEntry::new(ConsumerId::from_raw(tag), processor)
    }

    /// Тест проверяет, что broadcast доставляет сообщение всем потребителям
    /// ровно один раз.
    #[test]
    fn test_broadcast_reaches_everyone() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let consumers = vec![recorder(1, &calls), recorder(2, &calls), recorder(3, &calls)];

        Broadcast.dispatch(&Message::new("m"), &consumers).unwrap();

        let mut got = calls.lock().unwrap().clone();
        got.sort_unstable();
        assert_eq!(got, vec![1, 2, 3]);
    }

    /// Тест проверяет fail-fast: после ошибки остальные потребители не
    /// вызываются, а ошибка содержит номер упавшего потребителя.
    #[test]
    fn test_broadcast_fails_fast() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let consumers = vec![recorder(1, &calls), failing(2), recorder(3, &calls)];

        let err = Broadcast
            .dispatch(&Message::new("m"), &consumers)
            .unwrap_err();

        assert_eq!(err.status_code(), StatusCode::ConsumerFailed);
        match err.downcast_ref::<EndpointError>() {
            Some(EndpointError::ConsumerFailed { consumer, .. }) => assert_eq!(*consumer, 2),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(*calls.lock().unwrap(), vec![1]);
    }

    #[test]
    fn test_broadcast_without_consumers_is_ok() {
        assert!(Broadcast.dispatch(&Message::new("m"), &[]).is_ok());
        assert!(RoundRobin::new().dispatch(&Message::new("m"), &[]).is_ok());
    }

    /// Тест проверяет, что round-robin доставляет каждое сообщение ровно
    /// одному потребителю и чередует их.
    #[test]
    fn test_round_robin_rotates() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let consumers = vec![recorder(1, &calls), recorder(2, &calls)];
        let strategy = RoundRobin::new();

        for _ in 0..4 {
            strategy.dispatch(&Message::new("m"), &consumers).unwrap();
        }

        assert_eq!(*calls.lock().unwrap(), vec![1, 2, 1, 2]);
    }

    #[rstest]
    #[case(StrategyKind::Broadcast, "broadcast")]
    #[case(StrategyKind::RoundRobin, "round_robin")]
    fn test_kind_builds_named_strategy(
        #[case] kind: StrategyKind,
        #[case] expected: &str,
    ) {
        assert_eq!(kind.as_str(), expected);
        assert_eq!(kind.build().name(), expected);
    }

    #[test]
    fn test_default_kind_is_broadcast() {
        assert_eq!(StrategyKind::default(), StrategyKind::Broadcast);
    }
}
