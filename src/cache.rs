//! Expiring key-value cache contract and built-in backends for issued access tokens.

pub mod file;
pub mod memory;

pub use file::FileCache;
pub use memory::MemoryCache;

// self
use crate::{_prelude::*, auth::AccessToken};

/// Boxed future returned by [`ExpiringCache`] operations.
pub type CacheFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, CacheError>> + 'a + Send>>;

/// Keyed byte storage where every entry carries its own absolute expiry.
///
/// Backends never return an entry whose expiry is at or before the current instant; such
/// entries surface as [`CacheError::Expired`].
pub trait ExpiringCache
where
	Self: Send + Sync,
{
	/// Reads the bytes stored under `key`.
	fn read<'a>(&'a self, key: &'a str) -> CacheFuture<'a, Vec<u8>>;

	/// Stores `payload` under `key` until `expires_at`, replacing any previous entry.
	fn write<'a>(
		&'a self,
		key: &'a str,
		expires_at: OffsetDateTime,
		payload: Vec<u8>,
	) -> CacheFuture<'a, ()>;
}

/// Error type produced by [`ExpiringCache`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum CacheError {
	/// Nothing is stored under the key.
	#[error("Cache entry is missing.")]
	Miss,
	/// The entry exists but its expiry has passed.
	#[error("Cache entry expired at {expired_at}.")]
	Expired {
		/// Expiry instant recorded with the entry.
		#[serde(with = "time::serde::timestamp")]
		expired_at: OffsetDateTime,
	},
	/// Serialization failures surfaced by the backend or the payload codec.
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
impl CacheError {
	/// Returns `true` for the "nothing usable stored" variants.
	pub fn is_miss(&self) -> bool {
		matches!(self, Self::Miss | Self::Expired { .. })
	}
}

/// Outcome of consulting the cache for an access token.
///
/// [`CacheLookup::Miss`] and [`CacheLookup::Error`] both lead to a fresh exchange; keeping them
/// apart lets callers observe swallowed backend failures.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CacheLookup {
	/// A stored token that is usable right now.
	Hit(AccessToken),
	/// No entry, an expired entry, or a stored token that is no longer usable.
	Miss,
	/// The backend failed or the stored payload could not be decoded.
	Error(CacheError),
}
impl CacheLookup {
	/// Reads `key` from `cache` and classifies the result at `now`.
	pub async fn read(cache: &dyn ExpiringCache, key: &str, now: OffsetDateTime) -> Self {
		let bytes = match cache.read(key).await {
			Ok(bytes) => bytes,
			Err(e) if e.is_miss() => return Self::Miss,
			Err(e) => return Self::Error(e),
		};

		match serde_json::from_slice::<AccessToken>(&bytes) {
			Ok(token) if token.is_usable_at(now) => Self::Hit(token),
			Ok(_) => Self::Miss,
			Err(e) => Self::Error(CacheError::Serialization {
				message: format!("Failed to decode cached access token: {e}"),
			}),
		}
	}
}
