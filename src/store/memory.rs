//! Thread-safe in-memory [`TicketStore`] implementation; the broker's default cache.

// self
use crate::{
	_prelude::*,
	auth::{AccessTicket, TicketKey},
	store::{StoreError, StoreFuture, TicketStore},
};

type StoreMap = Arc<RwLock<HashMap<TicketKey, AccessTicket>>>;

/// Process-local ticket cache. Contents are lost when the process exits.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Number of cached tickets.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when no ticket is cached.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	fn save_now(map: StoreMap, ticket: AccessTicket) -> Result<(), StoreError> {
		map.write().insert(ticket.key(), ticket);

		Ok(())
	}

	fn fetch_now(map: StoreMap, key: TicketKey) -> Option<AccessTicket> {
		map.read().get(&key).cloned()
	}

	fn remove_now(map: StoreMap, key: TicketKey) -> Option<AccessTicket> {
		map.write().remove(&key)
	}
}
impl TicketStore for MemoryStore {
	fn save(&self, ticket: AccessTicket) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move { Self::save_now(map, ticket) })
	}

	fn fetch<'a>(&'a self, key: &'a TicketKey) -> StoreFuture<'a, Option<AccessTicket>> {
		let map = self.0.clone();
		let key = key.to_owned();

		Box::pin(async move { Ok(Self::fetch_now(map, key)) })
	}

	fn remove<'a>(&'a self, key: &'a TicketKey) -> StoreFuture<'a, Option<AccessTicket>> {
		let map = self.0.clone();
		let key = key.to_owned();

		Box::pin(async move { Ok(Self::remove_now(map, key)) })
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			map.write().clear();

			Ok(())
		})
	}

	fn entries(&self) -> StoreFuture<'_, Vec<AccessTicket>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.read().values().cloned().collect()) })
	}
}
