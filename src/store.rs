//! Storage contracts and built-in store implementations for cached access tickets.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{AccessTicket, TicketKey},
};

/// Boxed future returned by [`TicketStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend contract implemented by ticket caches.
///
/// Stores hold at most one ticket per [`TicketKey`]; saving replaces the previous record.
pub trait TicketStore
where
	Self: Send + Sync,
{
	/// Persists or replaces the ticket filed under its (service, environment) key.
	fn save(&self, ticket: AccessTicket) -> StoreFuture<'_, ()>;

	/// Fetches the ticket associated with the key, if present.
	fn fetch<'a>(&'a self, key: &'a TicketKey) -> StoreFuture<'a, Option<AccessTicket>>;

	/// Removes the ticket associated with the key and returns it, if present.
	fn remove<'a>(&'a self, key: &'a TicketKey) -> StoreFuture<'a, Option<AccessTicket>>;

	/// Drops every stored ticket.
	fn clear(&self) -> StoreFuture<'_, ()>;

	/// Returns a snapshot of every stored ticket.
	fn entries(&self) -> StoreFuture<'_, Vec<AccessTicket>>;
}

/// Error type produced by [`TicketStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn store_error_converts_into_broker_error_with_source() {
		let store_error = StoreError::Backend { message: "disk unavailable".into() };
		let broker_error: Error = store_error.clone().into();

		assert!(matches!(broker_error, Error::Storage(_)));
		assert!(broker_error.to_string().contains("disk unavailable"));
		assert!(broker_error.is_retryable());

		let source = StdError::source(&broker_error)
			.expect("Broker error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}
}
