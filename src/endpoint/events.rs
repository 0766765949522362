use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use arc_swap::ArcSwap;

use super::ConsumerId;

/// Переход состояния endpoint'а, о котором уведомляются слушатели.
///
/// Слушатели видят только жизненный цикл и изменения реестра потребителей,
/// сами сообщения через них не проходят.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointEvent {
    /// Endpoint запущен, журнал пуст.
    Started { endpoint: Arc<str> },
    /// Endpoint остановлен, `discarded` сообщений удалено из журнала.
    Stopped { endpoint: Arc<str>, discarded: usize },
    ConsumerRegistered {
        endpoint: Arc<str>,
        consumer: ConsumerId,
    },
    ConsumerDeregistered {
        endpoint: Arc<str>,
        consumer: ConsumerId,
    },
}

impl EndpointEvent {
    /// Идентификатор endpoint'а, породившего событие.
    pub fn endpoint(&self) -> &str {
        match self {
            Self::Started { endpoint }
            | Self::Stopped { endpoint, .. }
            | Self::ConsumerRegistered { endpoint, .. }
            | Self::ConsumerDeregistered { endpoint, .. } => endpoint,
        }
    }

    /// Короткая метка события (snake_case).
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Started { .. } => "started",
            Self::Stopped { .. } => "stopped",
            Self::ConsumerRegistered { .. } => "consumer_registered",
            Self::ConsumerDeregistered { .. } => "consumer_deregistered",
        }
    }
}

/// Наблюдатель за состоянием endpoint'а.
///
/// Вызывается синхронно, в потоке, выполнившем переход, уже после того как
/// переход завершён.
pub trait EndpointListener: Send + Sync + 'static {
    fn on_event(
        &self,
        event: &EndpointEvent,
    );

    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Токен подписки слушателя.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type ListenerEntry = (ListenerId, Arc<dyn EndpointListener>);

/// Набор слушателей с copy-on-write списком, как и у реестра потребителей.
pub(crate) struct ListenerSet {
    listeners: ArcSwap<Vec<ListenerEntry>>,
    next_id: AtomicU64,
}

impl ListenerSet {
    pub(crate) fn new() -> Self {
        Self {
            listeners: ArcSwap::from_pointee(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    pub(crate) fn add(
        &self,
        listener: Arc<dyn EndpointListener>,
    ) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.listeners.rcu(|current| {
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push((id, Arc::clone(&listener)));
            next
        });
        id
    }

    pub(crate) fn remove(
        &self,
        id: ListenerId,
    ) -> bool {
        let mut removed = false;
        self.listeners.rcu(|current| {
            let next: Vec<ListenerEntry> =
                current.iter().filter(|(lid, _)| *lid != id).cloned().collect();
            removed = next.len() != current.len();
            next
        });
        removed
    }

    pub(crate) fn notify(
        &self,
        event: &EndpointEvent,
    ) {
        let listeners = self.listeners.load_full();
        for (_, listener) in listeners.iter() {
            tracing::trace!(listener = listener.name(), kind = event.kind(), "Notify listener");
            listener.on_event(event);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.load().len()
    }
}
