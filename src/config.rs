//! Persisted backend and role records plus the typed adapter over [`Storage`].

// self
use crate::{
	_prelude::*,
	http::Endpoint,
	id::RoleName,
	secret::TokenSecret,
	store::{self, Storage},
	ttl::{self, ResolvedTtls},
};

/// Storage path of the admin config record.
pub const ADMIN_CONFIG_PATH: &str = "config/admin";
/// Storage prefix under which role records live.
pub const ROLE_PREFIX: &str = "roles/";

/// Administrative identity and backend-wide TTL bounds.
///
/// `max_ttl` is stored as configured (absent means "inherit the live ceiling"); `default_ttl` is
/// stored after the write-time cap.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
	/// Admin credential exchanged for scoped tokens.
	pub access_token: TokenSecret,
	/// Artifactory base URL.
	pub url: String,
	/// Backend default TTL.
	#[serde(default, with = "ttl::opt_seconds")]
	pub default_ttl: Option<Duration>,
	/// Backend max TTL.
	#[serde(default, with = "ttl::opt_seconds")]
	pub max_ttl: Option<Duration>,
}
impl BackendConfig {
	/// Effective TTLs under the current ceiling.
	pub fn effective_ttls(&self, system_ceiling: Duration) -> ResolvedTtls {
		ttl::clamp_backend_ttls(system_ceiling, self.default_ttl, self.max_ttl)
	}

	/// Parses the stored base URL.
	pub fn endpoint(&self) -> Result<Endpoint> {
		Ok(Endpoint::parse(&self.url)?)
	}
}

/// Scoped identity on the remote service plus role-level TTL bounds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleConfig {
	/// Artifactory username the token is minted for.
	pub username: String,
	/// Artifactory scope string (for example `member-of-groups:readers`).
	pub scope: String,
	/// Role default TTL.
	#[serde(default, with = "ttl::opt_seconds")]
	pub default_ttl: Option<Duration>,
	/// Role max TTL.
	#[serde(default, with = "ttl::opt_seconds")]
	pub max_ttl: Option<Duration>,
	/// Whether issued leases may be renewed.
	#[serde(default)]
	pub refreshable: bool,
}
impl RoleConfig {
	/// Effective TTLs under the backend's effective max.
	pub fn effective_ttls(&self, backend_max: Duration) -> ResolvedTtls {
		ttl::clamp_role_ttls(backend_max, self.default_ttl, self.max_ttl)
	}
}

/// Typed read/write of [`BackendConfig`] and [`RoleConfig`] over a host [`Storage`].
#[derive(Clone)]
pub struct ConfigStore {
	storage: Arc<dyn Storage>,
}
impl ConfigStore {
	/// Wraps the host storage.
	pub fn new(storage: Arc<dyn Storage>) -> Self {
		Self { storage }
	}

	/// Loads the admin config, if one was written.
	pub async fn backend_config(&self) -> Result<Option<BackendConfig>> {
		Ok(store::get_json(self.storage.as_ref(), ADMIN_CONFIG_PATH).await?)
	}

	/// Loads the admin config or fails with [`Error::NotFound`].
	pub async fn require_backend_config(&self) -> Result<BackendConfig> {
		self.backend_config()
			.await?
			.ok_or_else(|| Error::not_found("admin config", ADMIN_CONFIG_PATH))
	}

	/// Creates or overwrites the admin config.
	pub async fn save_backend_config(&self, config: &BackendConfig) -> Result<()> {
		Ok(store::put_json(self.storage.as_ref(), ADMIN_CONFIG_PATH, config).await?)
	}

	/// Deletes the admin config.
	pub async fn delete_backend_config(&self) -> Result<()> {
		Ok(self.storage.delete(ADMIN_CONFIG_PATH).await?)
	}

	/// Loads a role, if it exists.
	pub async fn role(&self, name: &RoleName) -> Result<Option<RoleConfig>> {
		Ok(store::get_json(self.storage.as_ref(), &role_path(name)).await?)
	}

	/// Creates or overwrites a role.
	pub async fn save_role(&self, name: &RoleName, role: &RoleConfig) -> Result<()> {
		Ok(store::put_json(self.storage.as_ref(), &role_path(name), role).await?)
	}

	/// Deletes a role.
	pub async fn delete_role(&self, name: &RoleName) -> Result<()> {
		Ok(self.storage.delete(&role_path(name)).await?)
	}

	/// Lists stored role names in sorted order; entries with invalid names are skipped.
	pub async fn role_names(&self) -> Result<Vec<RoleName>> {
		let keys = self.storage.list(ROLE_PREFIX).await?;

		Ok(keys.into_iter().filter_map(|key| RoleName::new(key).ok()).collect())
	}
}
impl Debug for ConfigStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("ConfigStore(..)")
	}
}

/// Storage path for a role record.
pub fn role_path(name: &RoleName) -> String {
	format!("{ROLE_PREFIX}{name}")
}
