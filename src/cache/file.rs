//! File-backed [`ExpiringCache`] that keeps one JSON envelope per key.
//!
//! Each entry lives at `<dir>/<fingerprint>.json`, where the fingerprint is the URL-safe
//! base64 SHA-256 digest of the key, so arbitrary keys map onto portable file names.
//! The envelope records the key, its absolute expiry (Unix seconds), and the payload as
//! base64. Writes go through a temporary file and a rename.

// std
use std::{
	fs::{self, File},
	io::{ErrorKind, Write},
};
// crates.io
use base64::{
	Engine,
	engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
};
use sha2::{Digest, Sha256};
// self
use crate::{
	_prelude::*,
	cache::{CacheError, CacheFuture, ExpiringCache, MemoryCache},
};

/// Directory name used under the platform cache directory by [`FileCache::open_default`].
pub const DEFAULT_CACHE_DIR: &str = "copilot-broker";

#[derive(Serialize, Deserialize)]
struct Envelope {
	key: String,
	#[serde(with = "time::serde::timestamp")]
	expires_at: OffsetDateTime,
	payload: String,
}

/// Persists cache entries as individual files under a directory.
#[derive(Clone, Debug)]
pub struct FileCache {
	dir: PathBuf,
}
impl FileCache {
	/// Opens (or creates) a cache rooted at `dir`.
	pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
		let dir = dir.into();

		Self::ensure_dir(&dir)?;

		Ok(Self { dir })
	}

	/// Opens the cache under the platform cache directory (`~/.cache/copilot-broker` on Linux).
	pub fn open_default() -> Result<Self, CacheError> {
		let base = dirs::cache_dir().ok_or_else(|| CacheError::Backend {
			message: "Unable to determine the user cache directory".into(),
		})?;

		Self::open(base.join(DEFAULT_CACHE_DIR))
	}

	/// Opens the default cache, or keeps tokens in process memory when it cannot be opened.
	///
	/// Only opening falls back; write failures of an opened cache still surface to callers.
	pub fn open_default_or_memory() -> Arc<dyn ExpiringCache> {
		Self::or_memory(Self::open_default())
	}

	/// Opens a cache rooted at `dir`, or an in-memory one when `dir` is unusable.
	pub fn open_or_memory(dir: impl Into<PathBuf>) -> Arc<dyn ExpiringCache> {
		Self::or_memory(Self::open(dir))
	}

	fn or_memory(opened: Result<Self, CacheError>) -> Arc<dyn ExpiringCache> {
		match opened {
			Ok(cache) => Arc::new(cache),
			Err(_e) => {
				#[cfg(feature = "tracing")]
				tracing::warn!(error = %_e, "file cache unavailable; keeping tokens in memory");

				Arc::new(MemoryCache::default())
			},
		}
	}

	/// Directory holding the entries.
	pub fn dir(&self) -> &Path {
		&self.dir
	}

	/// Path of the file that stores `key`.
	pub fn entry_path(&self, key: &str) -> PathBuf {
		let digest = Sha256::digest(key.as_bytes());

		self.dir.join(format!("{}.json", URL_SAFE_NO_PAD.encode(digest)))
	}

	fn ensure_dir(dir: &Path) -> Result<(), CacheError> {
		fs::create_dir_all(dir).map_err(|e| CacheError::Backend {
			message: format!("Failed to create cache directory {}: {e}", dir.display()),
		})
	}

	fn read_now(&self, key: &str, now: OffsetDateTime) -> Result<Vec<u8>, CacheError> {
		let path = self.entry_path(key);
		let bytes = match fs::read(&path) {
			Ok(bytes) => bytes,
			Err(e) if e.kind() == ErrorKind::NotFound => return Err(CacheError::Miss),
			Err(e) =>
				return Err(CacheError::Backend {
					message: format!("Failed to read {}: {e}", path.display()),
				}),
		};
		let envelope: Envelope =
			serde_json::from_slice(&bytes).map_err(|e| CacheError::Serialization {
				message: format!("Failed to parse {}: {e}", path.display()),
			})?;

		if envelope.key != key {
			return Err(CacheError::Miss);
		}
		if envelope.expires_at <= now {
			return Err(CacheError::Expired { expired_at: envelope.expires_at });
		}

		STANDARD.decode(envelope.payload.as_bytes()).map_err(|e| CacheError::Serialization {
			message: format!("Failed to decode payload in {}: {e}", path.display()),
		})
	}

	fn write_now(
		&self,
		key: &str,
		expires_at: OffsetDateTime,
		payload: &[u8],
	) -> Result<(), CacheError> {
		Self::ensure_dir(&self.dir)?;

		let envelope =
			Envelope { key: key.to_owned(), expires_at, payload: STANDARD.encode(payload) };
		let serialized = serde_json::to_vec(&envelope).map_err(|e| CacheError::Serialization {
			message: format!("Failed to serialize cache entry: {e}"),
		})?;
		let path = self.entry_path(key);
		let mut tmp_path = path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| CacheError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| CacheError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| CacheError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &path).map_err(|e| CacheError::Backend {
			message: format!("Failed to replace {}: {e}", path.display()),
		})
	}
}
impl ExpiringCache for FileCache {
	fn read<'a>(&'a self, key: &'a str) -> CacheFuture<'a, Vec<u8>> {
		Box::pin(async move { self.read_now(key, OffsetDateTime::now_utc()) })
	}

	fn write<'a>(
		&'a self,
		key: &'a str,
		expires_at: OffsetDateTime,
		payload: Vec<u8>,
	) -> CacheFuture<'a, ()> {
		Box::pin(async move { self.write_now(key, expires_at, &payload) })
	}
}
