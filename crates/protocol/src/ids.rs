//! Opaque correlation handles used across the engine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Handle naming one pooled session.
///
/// Assigned by the pool when the session is created, unique for the pool's
/// lifetime, and never reused while the session entry exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub u32);

impl fmt::Display for ConnectionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Client-generated correlation token for an in-flight asynchronous request.
///
/// Monotonically increasing per dispatcher instance. Wraparound at the range
/// limit is an accepted edge case and not specially handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(pub u32);

impl fmt::Display for TransactionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Caller-assigned handle correlating a request with its eventual outcome.
///
/// The transaction registry maps [`TransactionId`] back to this handle when
/// an asynchronous completion arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestHandle(pub u64);

impl fmt::Display for RequestHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}
