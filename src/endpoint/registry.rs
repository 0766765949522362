use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use arc_swap::ArcSwap;
use listpoint_error::{EndpointError, ListpointResult};

use super::{Broadcast, DistributionStrategy, Message, Processor};

/// Непрозрачный токен регистрации потребителя.
///
/// Выдаётся при регистрации и используется для отписки. Идентификаторы
/// монотонно растут и не переиспользуются в пределах одного реестра.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConsumerId(u64);

impl ConsumerId {
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConsumerId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Зарегистрированный потребитель: идентификатор и его обработчик.
#[derive(Clone)]
pub struct ConsumerEntry {
    id: ConsumerId,
    processor: Arc<dyn Processor>,
}

impl ConsumerEntry {
    pub fn new(
        id: ConsumerId,
        processor: Arc<dyn Processor>,
    ) -> Self {
        Self { id, processor }
    }

    pub fn id(&self) -> ConsumerId {
        self.id
    }

    pub fn name(&self) -> &str {
        self.processor.name()
    }

    /// Передаёт сообщение обработчику. Ошибка обработчика оборачивается в
    /// [`EndpointError::ConsumerFailed`].
    pub fn deliver(
        &self,
        message: &Message,
    ) -> ListpointResult<()> {
        self.processor.process(message).map_err(|source| {
            EndpointError::ConsumerFailed {
                consumer: self.id.as_u64(),
                name: self.name().to_string(),
                source,
            }
            .into()
        })
    }
}

impl fmt::Debug for ConsumerEntry {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("ConsumerEntry")
            .field("id", &self.id)
            .field("name", &self.name())
            .finish()
    }
}

/// Реестр активных потребителей (broadcast-группа).
///
/// Список потребителей хранится как copy-on-write снимок в [`ArcSwap`]:
/// `dispatch` читает снимок без блокировок, а `register`/`deregister`
/// публикуют новую копию. Потребитель, зарегистрированный или удалённый во
/// время идущей рассылки, может получить или не получить это сообщение, но
/// рассылка никогда не видит реестр в промежуточном состоянии. Обработчики
/// могут регистрировать и удалять потребителей из самого `dispatch`.
pub struct ConsumerRegistry {
    consumers: ArcSwap<Vec<ConsumerEntry>>,
    next_id: AtomicU64,
    strategy: Arc<dyn DistributionStrategy>,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl ConsumerRegistry {
    /// Создаёт пустой реестр с broadcast-рассылкой.
    pub fn new() -> Self {
        Self::with_strategy(Arc::new(Broadcast))
    }

    pub fn with_strategy(strategy: Arc<dyn DistributionStrategy>) -> Self {
        Self {
            consumers: ArcSwap::from_pointee(Vec::new()),
            next_id: AtomicU64::new(0),
            strategy,
        }
    }

    /// Добавляет обработчик в набор активных и возвращает токен для отписки.
    pub fn register(
        &self,
        processor: Arc<dyn Processor>,
    ) -> ConsumerId {
        let id = ConsumerId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let entry = ConsumerEntry::new(id, processor);

        self.consumers.rcu(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(entry.clone());
            next
        });

        id
    }

    /// Удаляет потребителя. Для неизвестного или уже удалённого токена
    /// ничего не делает и возвращает `false`.
    pub fn deregister(
        &self,
        id: ConsumerId,
    ) -> bool {
        let mut removed = false;
        self.consumers.rcu(|current| {
            let next: Vec<ConsumerEntry> = current.iter().filter(|e| e.id != id).cloned().collect();
            removed = next.len() != current.len();
            next
        });
        removed
    }

    /// Рассылает сообщение по снимку текущих потребителей согласно стратегии.
    ///
    /// Выполняется синхронно, в потоке вызывающего. Ошибки потребителей не
    /// перехватываются.
    pub fn dispatch(
        &self,
        message: &Message,
    ) -> ListpointResult<()> {
        let consumers = self.consumers.load_full();
        self.strategy.dispatch(message, &consumers)
    }

    pub fn len(&self) -> usize {
        self.consumers.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.consumers.load().is_empty()
    }

    pub fn contains(
        &self,
        id: ConsumerId,
    ) -> bool {
        self.consumers.load().iter().any(|e| e.id == id)
    }

    /// Идентификаторы текущих потребителей.
    pub fn ids(&self) -> Vec<ConsumerId> {
        self.consumers.load().iter().map(ConsumerEntry::id).collect()
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для ConsumerRegistry
////////////////////////////////////////////////////////////////////////////////

impl Default for ConsumerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConsumerRegistry {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("ConsumerRegistry")
            .field("consumers", &self.ids())
            .field("strategy", &self.strategy.name())
            .finish()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
