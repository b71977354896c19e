//! Short-lived Artifactory access tokens brokered as leased secrets. An administrative credential
//! is exchanged for scoped tokens per role, and every lease TTL is negotiated across the host
//! ceiling, the backend config, and the role config.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod backend;
pub mod config;
pub mod error;
pub mod http;
pub mod id;
pub mod lease;
pub mod obs;
pub mod secret;
pub mod store;
pub mod system;
pub mod ttl;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		backend::{Backend, Operation, Request, Response},
		http::ReqwestArtifactoryClient,
		store::{MemoryStorage, Storage},
		system::{StaticSystemView, SystemView},
	};

	/// Backend type alias used by reqwest-backed integration tests.
	pub type ReqwestTestBackend = Backend<ReqwestArtifactoryClient>;

	/// Builds a backend wired to an in-memory store, the default 768h ceiling, and a reqwest
	/// client with a short timeout so unreachable test URLs fail fast.
	pub fn build_reqwest_test_backend() -> (ReqwestTestBackend, Arc<MemoryStorage>) {
		build_reqwest_test_backend_with_system(StaticSystemView::default())
	}

	/// Same as [`build_reqwest_test_backend`] but with a caller-supplied system view.
	pub fn build_reqwest_test_backend_with_system(
		system: impl 'static + SystemView,
	) -> (ReqwestTestBackend, Arc<MemoryStorage>) {
		let storage_backend = Arc::new(MemoryStorage::default());
		let storage: Arc<dyn Storage> = storage_backend.clone();
		let system: Arc<dyn SystemView> = Arc::new(system);
		let client = ReqwestArtifactoryClient::with_timeout(std::time::Duration::from_secs(5))
			.expect("Failed to build Reqwest client for tests.");
		let backend = Backend::with_client(storage, system, client);

		(backend, storage_backend)
	}

	/// Builds a write request from a JSON object literal.
	pub fn write_request(path: &str, data: serde_json::Value) -> Request {
		let data = match data {
			serde_json::Value::Object(map) => map,
			other => panic!("Write payload must be a JSON object, got {other}."),
		};

		Request::new(Operation::Write, path).with_data(data)
	}

	/// Builds a read request for the provided path.
	pub fn read_request(path: &str) -> Request {
		Request::new(Operation::Read, path)
	}

	/// Reads an integer field out of a response, panicking with a readable message otherwise.
	pub fn response_i64(response: &Response, field: &str) -> i64 {
		response
			.data
			.get(field)
			.and_then(serde_json::Value::as_i64)
			.unwrap_or_else(|| panic!("Response field `{field}` should be an integer."))
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::RwLock;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
