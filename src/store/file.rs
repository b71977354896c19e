//! Simple file-backed [`Storage`] for single-node deployments.

// std
use std::{
	collections::BTreeSet,
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD};
// self
use crate::{
	_prelude::*,
	store::{self, Storage, StoreError, StoreFuture},
};

type Snapshot = BTreeMap<String, Vec<u8>>;

/// Persists every entry to a JSON snapshot (values base64-encoded) after each mutation.
#[derive(Clone, Debug)]
pub struct FileStorage {
	path: PathBuf,
	inner: Arc<RwLock<Snapshot>>,
}
impl FileStorage {
	/// Opens the snapshot at `path`, loading existing entries; a missing file starts empty.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_dir(&path)?;

		let snapshot = if path.exists() { Self::load_snapshot(&path)? } else { Snapshot::new() };

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	fn load_snapshot(path: &Path) -> Result<Snapshot, StoreError> {
		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Cannot read storage snapshot {}: {e}", path.display()),
		})?;

		if bytes.is_empty() {
			return Ok(Snapshot::new());
		}

		let encoded: BTreeMap<String, String> =
			serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
				message: format!("Storage snapshot {} is not valid JSON: {e}", path.display()),
			})?;

		encoded
			.into_iter()
			.map(|(key, value)| {
				STANDARD.decode(value.as_bytes()).map(|decoded| (key.clone(), decoded)).map_err(
					|e| StoreError::Serialization {
						message: format!("Entry {key} in {} is not base64: {e}", path.display()),
					},
				)
			})
			.collect()
	}

	fn ensure_parent_dir(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Cannot create storage directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn flush_snapshot(&self, contents: &Snapshot) -> Result<(), StoreError> {
		Self::ensure_parent_dir(&self.path)?;

		let encoded: BTreeMap<&str, String> =
			contents.iter().map(|(key, value)| (key.as_str(), STANDARD.encode(value))).collect();
		let serialized =
			serde_json::to_vec_pretty(&encoded).map_err(|e| StoreError::Serialization {
				message: format!("Cannot encode storage snapshot: {e}"),
			})?;
		let tmp_path = self.path.with_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Cannot create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Cannot write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Cannot flush {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Cannot swap snapshot into {}: {e}", self.path.display()),
		})
	}
}
impl Storage for FileStorage {
	fn get<'a>(&'a self, path: &'a str) -> StoreFuture<'a, Option<Vec<u8>>> {
		Box::pin(async move { Ok(self.inner.read().get(path).cloned()) })
	}

	fn put<'a>(&'a self, path: &'a str, value: Vec<u8>) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			guard.insert(path.to_owned(), value);
			self.flush_snapshot(&guard)
		})
	}

	fn delete<'a>(&'a self, path: &'a str) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			if guard.remove(path).is_some() {
				self.flush_snapshot(&guard)?;
			}

			Ok(())
		})
	}

	fn list<'a>(&'a self, prefix: &'a str) -> StoreFuture<'a, Vec<String>> {
		Box::pin(async move {
			let guard = self.inner.read();
			let children: BTreeSet<_> =
				guard.keys().filter_map(|key| store::child_of(prefix, key)).collect();

			Ok(children.into_iter().map(str::to_owned).collect())
		})
	}
}
