//! Path-keyed storage contract supplied by the host, plus built-in implementations.

pub mod file;
pub mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::_prelude::*;

/// Boxed future returned by [`Storage`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Opaque key/value storage keyed by slash-separated paths.
///
/// The backend relies on the host to serialize individual read-modify-write sequences; two
/// writers to the same path race with last-write-wins semantics.
pub trait Storage
where
	Self: Send + Sync,
{
	/// Returns the bytes stored at `path`, if any.
	fn get<'a>(&'a self, path: &'a str) -> StoreFuture<'a, Option<Vec<u8>>>;

	/// Stores `value` at `path`, replacing any previous entry.
	fn put<'a>(&'a self, path: &'a str, value: Vec<u8>) -> StoreFuture<'a, ()>;

	/// Removes the entry at `path`. Deleting an absent path succeeds.
	fn delete<'a>(&'a self, path: &'a str) -> StoreFuture<'a, ()>;

	/// Lists the direct children of `prefix` (which should end with `/`), sorted.
	fn list<'a>(&'a self, prefix: &'a str) -> StoreFuture<'a, Vec<String>>;
}

/// Error type produced by [`Storage`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced while encoding or decoding records.
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

/// Reads and decodes a JSON record stored at `path`.
pub async fn get_json<T>(storage: &dyn Storage, path: &str) -> Result<Option<T>, StoreError>
where
	T: DeserializeOwned,
{
	let Some(bytes) = storage.get(path).await? else {
		return Ok(None);
	};

	serde_json::from_slice(&bytes).map(Some).map_err(|e| StoreError::Serialization {
		message: format!("Failed to decode {path}: {e}"),
	})
}

/// Encodes `value` as JSON and stores it at `path`.
pub async fn put_json<T>(storage: &dyn Storage, path: &str, value: &T) -> Result<(), StoreError>
where
	T: Serialize + Sync + ?Sized,
{
	let bytes = serde_json::to_vec(value).map_err(|e| StoreError::Serialization {
		message: format!("Failed to encode {path}: {e}"),
	})?;

	storage.put(path, bytes).await
}

/// Returns the direct child segment of `key` under `prefix`, if `key` lives there.
pub(crate) fn child_of<'a>(prefix: &str, key: &'a str) -> Option<&'a str> {
	let rest = key.strip_prefix(prefix)?;

	match rest.split_once('/') {
		Some((head, _)) if !head.is_empty() => Some(head),
		Some(_) => None,
		None if rest.is_empty() => None,
		None => Some(rest),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use std::error::Error as StdError;

	#[test]
	fn store_error_converts_into_backend_error_with_source() {
		let store_error = StoreError::Backend { message: "disk unavailable".into() };
		let err: Error = store_error.clone().into();

		assert!(matches!(err, Error::Storage(_)));
		assert!(err.to_string().contains("disk unavailable"));

		let source = StdError::source(&err)
			.expect("Backend error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}

	#[test]
	fn child_of_returns_direct_children_only() {
		assert_eq!(child_of("roles/", "roles/readers"), Some("readers"));
		assert_eq!(child_of("roles/", "roles/team/readers"), Some("team"));
		assert_eq!(child_of("roles/", "roles/"), None);
		assert_eq!(child_of("roles/", "config/admin"), None);
	}
}
