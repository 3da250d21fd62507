//! Thread-safe in-memory [`ExpiringCache`] implementation for embedding and tests.

// self
use crate::{
	_prelude::*,
	cache::{CacheError, CacheFuture, ExpiringCache},
};

#[derive(Clone, Debug)]
struct Entry {
	expires_at: OffsetDateTime,
	payload: Vec<u8>,
}

type EntryMap = Arc<RwLock<HashMap<String, Entry>>>;

/// In-process cache that applies the same per-entry expiry rules as [`FileCache`](super::FileCache).
#[derive(Clone, Debug, Default)]
pub struct MemoryCache(EntryMap);
impl MemoryCache {
	/// Returns the expiry recorded for `key`, even if it already passed.
	pub fn expiry_of(&self, key: &str) -> Option<OffsetDateTime> {
		self.0.read().get(key).map(|entry| entry.expires_at)
	}

	/// Returns the raw payload stored for `key`, ignoring expiry.
	pub fn payload_of(&self, key: &str) -> Option<Vec<u8>> {
		self.0.read().get(key).map(|entry| entry.payload.clone())
	}

	fn read_now(map: &EntryMap, key: &str, now: OffsetDateTime) -> Result<Vec<u8>, CacheError> {
		let guard = map.read();
		let entry = guard.get(key).ok_or(CacheError::Miss)?;

		if entry.expires_at <= now {
			return Err(CacheError::Expired { expired_at: entry.expires_at });
		}

		Ok(entry.payload.clone())
	}
}
impl ExpiringCache for MemoryCache {
	fn read<'a>(&'a self, key: &'a str) -> CacheFuture<'a, Vec<u8>> {
		Box::pin(async move { Self::read_now(&self.0, key, OffsetDateTime::now_utc()) })
	}

	fn write<'a>(
		&'a self,
		key: &'a str,
		expires_at: OffsetDateTime,
		payload: Vec<u8>,
	) -> CacheFuture<'a, ()> {
		Box::pin(async move {
			self.0.write().insert(key.to_owned(), Entry { expires_at, payload });

			Ok(())
		})
	}
}
