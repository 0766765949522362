//! Endpoint с журналом и broadcast-рассылкой.
//!
//! Слои снизу вверх: [`Message`] и [`MessageLog`], реестр потребителей с
//! подключаемой [`DistributionStrategy`], ручки [`Producer`]/[`Consumer`] и
//! фасад [`Endpoint`], управляющий жизненным циклом журнала.
//! [`EndpointDirectory`] выдаёт один экземпляр на идентификатор.

pub mod channel;
pub mod consumer;
pub mod directory;
pub mod events;
pub mod log;
pub mod message;
pub mod processor;
pub mod producer;
pub mod registry;
pub mod strategy;

pub use channel::{Endpoint, EndpointState, EndpointStats, StatsSnapshot};
pub use consumer::Consumer;
pub use directory::EndpointDirectory;
pub use events::{EndpointEvent, EndpointListener, ListenerId};
pub(crate) use events::ListenerSet;
pub use log::MessageLog;
pub use message::Message;
pub use processor::Processor;
pub use producer::Producer;
pub use registry::{ConsumerEntry, ConsumerId, ConsumerRegistry};
pub use strategy::{Broadcast, DistributionStrategy, RoundRobin, StrategyKind};
