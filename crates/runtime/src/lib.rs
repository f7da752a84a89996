//! Session pooling and request-dispatch engine for protocol clients.
//!
//! A protocol client that holds many long-lived, stateful connections
//! ("sessions") to remote servers multiplexes its synchronous and
//! asynchronous request/response traffic through this crate:
//!
//! - [`SessionPool`] owns the live sessions, their activity counts, and the
//!   acquire/release/garbage-collect protocol, including manual (pinned)
//!   lifecycles and the periodic housekeeping pass.
//! - [`TransactionRegistry`] correlates asynchronous requests with their
//!   out-of-band completions.
//! - [`Dispatcher`] is the generic invoke operation: it splits a
//!   multi-target request into per-server invocations via the service's
//!   [`InvocationBuilder`], drives each one over a pooled session, and
//!   assembles the aggregate result.
//! - [`EventSink`] consumes status-change and completion events posted by
//!   transports and forwards correlated notifications to the outward
//!   [`ClientNotifier`].
//!
//! The wire protocol itself is not implemented here; it enters through the
//! [`SessionTransport`] / [`SessionConnector`] capability seam.

mod dispatcher;
mod error;
mod events;
mod pool;
mod service;
mod session;
#[cfg(test)]
mod testing;
mod transactions;

pub use dispatcher::Dispatcher;
pub use error::{Error, Result};
pub use events::{ClientNotifier, ConnectionEvent, EventSender, EventSink, event_channel};
pub use pool::{SessionGuard, SessionPool};
pub use service::{
	Invocation, InvocationBuilder, RequestLevel, Service, ServiceRequest, ServiceResult,
};
pub use session::{Session, SessionConnector, SessionTransport};
pub use transactions::TransactionRegistry;

// Re-export the shared data types for downstream convenience
pub use switchboard_protocol as protocol;
