//! Thread-safe in-memory [`Storage`] implementation for embedding and tests.

// std
use std::collections::BTreeSet;
// self
use crate::{
	_prelude::*,
	store::{self, Storage, StoreError, StoreFuture},
};

type StoreMap = Arc<RwLock<BTreeMap<String, Vec<u8>>>>;

/// Storage backend that keeps entries in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage(StoreMap);
impl MemoryStorage {
	/// Returns `true` if an entry exists at `path`.
	pub fn contains(&self, path: &str) -> bool {
		self.0.read().contains_key(path)
	}

	/// Number of stored entries.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	fn list_now(map: &StoreMap, prefix: &str) -> Vec<String> {
		let guard = map.read();
		let children: BTreeSet<_> =
			guard.keys().filter_map(|key| store::child_of(prefix, key)).collect();

		children.into_iter().map(str::to_owned).collect()
	}
}
impl Storage for MemoryStorage {
	fn get<'a>(&'a self, path: &'a str) -> StoreFuture<'a, Option<Vec<u8>>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.read().get(path).cloned()) })
	}

	fn put<'a>(&'a self, path: &'a str, value: Vec<u8>) -> StoreFuture<'a, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			map.write().insert(path.to_owned(), value);

			Ok(())
		})
	}

	fn delete<'a>(&'a self, path: &'a str) -> StoreFuture<'a, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			map.write().remove(path);

			Ok(())
		})
	}

	fn list<'a>(&'a self, prefix: &'a str) -> StoreFuture<'a, Vec<String>> {
		let map = self.0.clone();

		Box::pin(async move { Ok::<_, StoreError>(Self::list_now(&map, prefix)) })
	}
}
