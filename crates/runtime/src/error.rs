use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failure kinds surfaced by the engine.
///
/// Every public operation returns one of these through [`Result`]; nothing
/// panics across the engine boundary.
#[derive(Debug, Error)]
pub enum Error {
	/// No usable session for the requested server.
	#[error("connection failed: {0}")]
	Connection(String),

	/// The request shape is not dispatchable (e.g. asynchronous fan-out).
	#[error("unsupported request: {0}")]
	Unsupported(String),

	/// Unknown connection id or unresolved transaction.
	#[error("not found: {0}")]
	NotFound(String),

	/// An internal invariant was violated (e.g. releasing a fully-released
	/// session). Fatal to the operation, never to the process.
	#[error("programming error: {0}")]
	Programming(String),

	/// Opaque failure surfaced by the transport, passed through unmodified.
	#[error("transport error: {0}")]
	Transport(String),
}

impl Error {
	/// Returns `true` for [`Error::Connection`].
	pub fn is_connection(&self) -> bool {
		matches!(self, Error::Connection(_))
	}

	/// Returns `true` for [`Error::Programming`].
	pub fn is_programming(&self) -> bool {
		matches!(self, Error::Programming(_))
	}

	/// Returns `true` for [`Error::NotFound`].
	pub fn is_not_found(&self) -> bool {
		matches!(self, Error::NotFound(_))
	}

	/// Returns `true` for [`Error::Unsupported`].
	pub fn is_unsupported(&self) -> bool {
		matches!(self, Error::Unsupported(_))
	}
}
