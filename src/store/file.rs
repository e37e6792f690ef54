//! File-backed [`TicketStore`] so tickets survive process restarts.
//!
//! The identity service refuses to issue a second ticket for a service while one is still valid,
//! so persisting the cache avoids being locked out for the rest of a ticket's lifetime after a
//! restart.

// std
use std::{
	fs::{self, File},
	io::Write,
};
// self
use crate::{
	_prelude::*,
	auth::{AccessTicket, TicketKey},
	store::{StoreError, StoreFuture, TicketStore},
};

/// Persists tickets to a JSON file after each mutation.
///
/// A mutation only reaches the in-memory view once its snapshot has been written, so a failed
/// write leaves both the file and the cache as they were.
///
/// Writes go to a sibling temporary file which then replaces the snapshot, so a crash never
/// leaves a truncated file behind.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<HashMap<TicketKey, AccessTicket>>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = Self::load_snapshot(&path)?;

		tracing::debug!(
			path = %path.display(),
			tickets = snapshot.len(),
			"opened ticket file store"
		);

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Location of the JSON snapshot.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(path: &Path) -> Result<HashMap<TicketKey, AccessTicket>, StoreError> {
		if !path.exists() {
			return Ok(HashMap::new());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		if bytes.is_empty() {
			return Ok(HashMap::new());
		}

		let tickets: Vec<AccessTicket> =
			serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
				message: format!("Failed to parse {}: {e}", path.display()),
			})?;

		Ok(tickets.into_iter().map(|ticket| (ticket.key(), ticket)).collect())
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist_locked(
		&self,
		contents: &HashMap<TicketKey, AccessTicket>,
	) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let snapshot: Vec<_> = contents.values().collect();
		let serialized =
			serde_json::to_vec_pretty(&snapshot).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize store snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl TicketStore for FileStore {
	fn save(&self, ticket: AccessTicket) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();
			let mut next = guard.clone();

			next.insert(ticket.key(), ticket);
			self.persist_locked(&next)?;

			*guard = next;

			Ok(())
		})
	}

	fn fetch<'a>(&'a self, key: &'a TicketKey) -> StoreFuture<'a, Option<AccessTicket>> {
		Box::pin(async move { Ok(self.inner.read().get(key).cloned()) })
	}

	fn remove<'a>(&'a self, key: &'a TicketKey) -> StoreFuture<'a, Option<AccessTicket>> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			if !guard.contains_key(key) {
				return Ok(None);
			}

			let mut next = guard.clone();
			let removed = next.remove(key);

			self.persist_locked(&next)?;

			*guard = next;

			Ok(removed)
		})
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			self.persist_locked(&HashMap::new())?;
			guard.clear();

			Ok(())
		})
	}

	fn entries(&self) -> StoreFuture<'_, Vec<AccessTicket>> {
		Box::pin(async move { Ok(self.inner.read().values().cloned().collect()) })
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	use tokio::runtime::Runtime;
	// self
	use super::*;
	use crate::auth::ServiceId;

	fn build_ticket(service: &str, environment: Environment) -> AccessTicket {
		let service = ServiceId::new(service).expect("Failed to build service fixture.");

		AccessTicket::builder(service, environment)
			.token("file-token")
			.signature("file-sign")
			.generation_time(macros::datetime!(2025-01-15 10:00 -3))
			.expiration_time(macros::datetime!(2025-01-15 22:00 -3))
			.build()
			.expect("Failed to build file-store ticket fixture.")
	}

	#[test]
	fn save_and_reload_round_trip() {
		let dir = tempfile::tempdir().expect("Failed to create temporary directory.");
		let path = dir.path().join("nested").join("tickets.json");
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");
		let ticket = build_ticket("wsfe", Environment::Production);
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file store test.");

		rt.block_on(store.save(ticket.clone())).expect("Failed to save fixture ticket.");
		drop(store);

		let reopened = FileStore::open(&path).expect("Failed to reopen file store snapshot.");
		let fetched = rt
			.block_on(reopened.fetch(&ticket.key()))
			.expect("Failed to fetch fixture ticket from file store.")
			.expect("File store lost ticket after reopen.");

		assert_eq!(fetched.token.expose(), "file-token");
		assert_eq!(fetched.signature.expose(), "file-sign");
		assert_eq!(fetched.expiration_time, ticket.expiration_time);
		assert!(!path.with_extension("tmp").exists());
	}

	#[test]
	fn clear_persists_an_empty_snapshot() {
		let dir = tempfile::tempdir().expect("Failed to create temporary directory.");
		let path = dir.path().join("tickets.json");
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file store test.");

		rt.block_on(store.save(build_ticket("wsfe", Environment::Testing)))
			.expect("Failed to save first ticket.");
		rt.block_on(store.save(build_ticket("ws_sr_padron_a13", Environment::Testing)))
			.expect("Failed to save second ticket.");
		rt.block_on(store.clear()).expect("Failed to clear file store.");

		let reopened = FileStore::open(&path).expect("Failed to reopen file store snapshot.");

		assert!(rt.block_on(reopened.entries()).expect("Entries should load.").is_empty());
	}

	#[test]
	fn failed_writes_leave_the_cache_unchanged() {
		let dir = tempfile::tempdir().expect("Failed to create temporary directory.");
		let path = dir.path().join("tickets.json");
		let store = FileStore::open(&path).expect("Failed to open file store snapshot.");
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file store test.");
		let kept = build_ticket("ws_sr_padron_a13", Environment::Testing);

		rt.block_on(store.save(kept.clone())).expect("Failed to save first ticket.");
		fs::remove_file(&path).expect("Failed to remove snapshot.");
		fs::create_dir(&path).expect("Failed to replace snapshot with a directory.");
		fs::write(path.join("blocker"), b"x").expect("Failed to populate blocking directory.");

		let rejected = build_ticket("wsfe", Environment::Testing);
		let err = rt
			.block_on(store.save(rejected.clone()))
			.expect_err("Saving over a directory should fail.");

		assert!(matches!(err, StoreError::Backend { .. }));
		assert!(
			rt.block_on(store.fetch(&rejected.key())).expect("Fetch should succeed.").is_none()
		);

		rt.block_on(store.remove(&kept.key())).expect_err("Removing should fail to persist.");
		rt.block_on(store.clear()).expect_err("Clearing should fail to persist.");

		let remaining = rt.block_on(store.entries()).expect("Entries should load.");

		assert_eq!(remaining.len(), 1);
		assert_eq!(remaining[0].key(), kept.key());
	}

	#[test]
	fn corrupt_snapshots_are_serialization_errors() {
		let dir = tempfile::tempdir().expect("Failed to create temporary directory.");
		let path = dir.path().join("tickets.json");

		fs::write(&path, b"{not json").expect("Failed to write corrupt snapshot.");

		let err = FileStore::open(&path).expect_err("Corrupt snapshot must not load.");

		assert!(matches!(err, StoreError::Serialization { .. }));
	}
}
