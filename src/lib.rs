//! Listpoint: in-process endpoint, который записывает каждое сообщение в
//! журнал и синхронно рассылает его всем зарегистрированным потребителям.
//!
//! ```ignore
//! use std::sync::Arc;
//! use listpoint::{Endpoint, ListpointResult, Message};
//!
//! let endpoint = Arc::new(Endpoint::new("orders"));
//! endpoint.start();
//!
//! let consumer = endpoint.create_consumer(|msg: &Message| -> ListpointResult<()> {
//!     println!("got {} bytes", msg.len());
//!     Ok(())
//! });
//! consumer.start();
//!
//! endpoint.create_producer().send(Message::new("A"))?;
//! assert_eq!(endpoint.snapshot().len(), 1);
//! ```

/// Endpoint settings loading (defaults, file, environment).
pub mod config;
/// Endpoint core: message log, consumer registry, producer/consumer handles.
pub mod endpoint;
/// Tracing bootstrap for binaries (formatting, filters).
pub mod logging;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

/// config
pub use config::EndpointSettings;
/// Endpoint API.
pub use endpoint::{
    Broadcast, Consumer, ConsumerEntry, ConsumerId, ConsumerRegistry, DistributionStrategy,
    Endpoint, EndpointDirectory, EndpointEvent, EndpointListener, EndpointState, EndpointStats,
    ListenerId, Message, MessageLog, Processor, Producer, RoundRobin, StatsSnapshot,
    StrategyKind,
};
/// Error types and result alias.
pub use listpoint_error::{
    bail, ensure, EndpointError, ErrorExt, GenericError, ListpointResult, ResultExt, StackError,
    StatusCode,
};
/// Logging bootstrap.
pub use logging::{init_logging, LogFormat, LoggingConfig};
