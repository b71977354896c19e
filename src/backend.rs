//! Host-facing facade: routes path-addressed requests to the config, role, and issuance handlers
//! and exposes the renew/revoke callbacks for issued leases.
//!
//! Routes:
//!
//! | Path            | Operations            |
//! |-----------------|-----------------------|
//! | `config/admin`  | read, write, delete   |
//! | `roles/`        | list                  |
//! | `roles/<name>`  | read, write, delete   |
//! | `token/<name>`  | read, write (issue)   |
//! | `version`       | read                  |

pub mod fields;

pub use fields::*;

// crates.io
use serde_json::{Map, Value, json};
// self
use crate::{
	_prelude::*,
	config::{ADMIN_CONFIG_PATH, BackendConfig, ConfigStore, ROLE_PREFIX, RoleConfig},
	error::ValidationError,
	http::{ArtifactoryClient, Endpoint, VersionInfo},
	id::RoleName,
	lease::{self, IssuedLease, Renewal},
	obs::{self, OpKind, OpOutcome, OpSpan},
	secret::TokenSecret,
	store::Storage,
	system::SystemView,
	ttl,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestArtifactoryClient;

#[cfg(feature = "reqwest")]
/// Backend specialized for the crate's default reqwest transport.
pub type ReqwestBackend = Backend<ReqwestArtifactoryClient>;

/// Operation requested by the host for a path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
	/// Read a record or trigger a read-style action.
	Read,
	/// Create or update a record, or trigger issuance.
	Write,
	/// Remove a record.
	Delete,
	/// Enumerate child records.
	List,
}
impl Operation {
	/// Returns a stable label for error messages.
	pub const fn as_str(self) -> &'static str {
		match self {
			Operation::Read => "read",
			Operation::Write => "write",
			Operation::Delete => "delete",
			Operation::List => "list",
		}
	}
}
impl Display for Operation {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Path-addressed request delivered by the host.
#[derive(Clone, Debug, PartialEq)]
pub struct Request {
	/// Requested operation.
	pub operation: Operation,
	/// Path relative to the backend mount.
	pub path: String,
	/// Request payload (write operations only).
	pub data: Map<String, Value>,
}
impl Request {
	/// Creates a request without payload.
	pub fn new(operation: Operation, path: impl Into<String>) -> Self {
		Self { operation, path: path.into(), data: Map::new() }
	}

	/// Replaces the request payload.
	pub fn with_data(mut self, data: Map<String, Value>) -> Self {
		self.data = data;

		self
	}

	/// Sets a single payload field.
	pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.data.insert(key.into(), value.into());

		self
	}
}

/// Response returned to the host.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Response {
	/// Response payload.
	pub data: Map<String, Value>,
	/// Non-fatal notes, such as TTLs capped to a parent bound.
	pub warnings: Vec<String>,
	/// Lease produced by a `token/<role>` request.
	pub secret: Option<IssuedLease>,
}
impl Response {
	fn with_data(data: Value) -> Self {
		let data = match data {
			Value::Object(map) => map,
			_ => Map::new(),
		};

		Self { data, ..Default::default() }
	}

	fn with_warnings(mut self, warnings: Vec<String>) -> Self {
		self.warnings = warnings;

		self
	}

	/// Returns `true` when the response carries no payload, warnings, or secret.
	pub fn is_empty(&self) -> bool {
		self.data.is_empty() && self.warnings.is_empty() && self.secret.is_none()
	}
}

#[derive(Debug)]
enum Route {
	AdminConfig,
	Roles,
	Role(RoleName),
	Token(RoleName),
	Version,
}
impl Route {
	fn parse(path: &str) -> Result<Self> {
		let trimmed = path.trim_start_matches('/');
		let name = |raw: &str| RoleName::new(raw).map_err(ValidationError::from);

		match trimmed {
			ADMIN_CONFIG_PATH => Ok(Self::AdminConfig),
			"roles" | ROLE_PREFIX => Ok(Self::Roles),
			"version" => Ok(Self::Version),
			_ =>
				if let Some(raw) = trimmed.strip_prefix(ROLE_PREFIX) {
					Ok(Self::Role(name(raw)?))
				} else if let Some(raw) = trimmed.strip_prefix("token/") {
					Ok(Self::Token(name(raw)?))
				} else {
					Err(Error::UnsupportedPath { path: path.to_owned() })
				},
		}
	}
}

/// Secrets backend brokering Artifactory access tokens.
///
/// The backend holds no state of its own beyond the host storage handle: every request re-reads
/// the records it needs, so concurrent requests only ever race at the storage layer.
pub struct Backend<C>
where
	C: ?Sized + ArtifactoryClient,
{
	/// Client used for every outbound Artifactory call.
	pub client: Arc<C>,
	/// Live view of host-wide settings.
	pub system: Arc<dyn SystemView>,
	configs: ConfigStore,
}
impl<C> Backend<C>
where
	C: ?Sized + ArtifactoryClient,
{
	/// Creates a backend that reuses the caller-provided Artifactory client.
	pub fn with_client(
		storage: Arc<dyn Storage>,
		system: Arc<dyn SystemView>,
		client: impl Into<Arc<C>>,
	) -> Self {
		Self { client: client.into(), system, configs: ConfigStore::new(storage) }
	}

	/// Typed access to the persisted admin and role records.
	pub fn configs(&self) -> &ConfigStore {
		&self.configs
	}

	/// Dispatches a host request to the matching handler.
	pub async fn handle_request(&self, request: Request) -> Result<Response> {
		let Request { operation, path, data } = request;

		match (Route::parse(&path)?, operation) {
			(Route::AdminConfig, Operation::Read) => self.read_admin_config().await,
			(Route::AdminConfig, Operation::Write) =>
				self.write_admin_config(fields::decode(data)?).await,
			(Route::AdminConfig, Operation::Delete) => self.delete_admin_config().await,
			(Route::Roles, Operation::List) => self.list_roles().await,
			(Route::Role(name), Operation::Read) => self.read_role(&name).await,
			(Route::Role(name), Operation::Write) =>
				self.write_role(&name, fields::decode(data)?).await,
			(Route::Role(name), Operation::Delete) => self.delete_role(&name).await,
			(Route::Token(name), Operation::Read | Operation::Write) => {
				let lease = self.issue_token(&name).await?;
				let data = json!({
					"access_token": lease.token.expose(),
					"lease_id": lease.lease_id.to_string(),
					"role": lease.role_name.to_string(),
					"username": lease.username,
					"scope": lease.scope,
					"ttl": lease.ttl.whole_seconds(),
					"max_ttl": lease.max_ttl.whole_seconds(),
					"renewable": lease.renewable,
				});
				let warnings = lease.warnings.clone();

				Ok(Response { secret: Some(lease), ..Response::with_data(data).with_warnings(warnings) })
			},
			(Route::Version, Operation::Read) => {
				let info = self.version().await?;

				Ok(Response::with_data(json!({ "version": info.version, "revision": info.revision })))
			},
			(_, operation) =>
				Err(Error::UnsupportedOperation { path, operation: operation.as_str() }),
		}
	}

	/// Creates or partially updates the admin config.
	///
	/// The first write must carry `access_token` and `url`. `max_ttl` above the live ceiling is
	/// rejected; `default_ttl` above the effective max is capped and reported in `warnings`. A
	/// `null` TTL clears the stored value.
	pub async fn write_admin_config(&self, input: AdminConfigInput) -> Result<Response> {
		observe(OpKind::AdminConfig, "write_admin_config", async move {
			let existing = self.configs.backend_config().await?;
			let access_token = fields::non_blank(input.access_token)
				.map(TokenSecret::new)
				.or_else(|| existing.as_ref().map(|c| c.access_token.clone()))
				.filter(|token| !token.is_blank())
				.ok_or(ValidationError::MissingField { field: "access_token" })?;
			let url = fields::non_blank(input.url)
				.or_else(|| existing.as_ref().map(|c| c.url.clone()))
				.ok_or(ValidationError::MissingField { field: "url" })?;

			Endpoint::parse(&url)?;

			let default_ttl =
				fields::merge_ttl(input.default_ttl, existing.as_ref().and_then(|c| c.default_ttl));
			let max_ttl =
				fields::merge_ttl(input.max_ttl, existing.as_ref().and_then(|c| c.max_ttl));
			let resolved =
				ttl::resolve_backend_ttls(self.system.max_lease_ttl(), default_ttl, max_ttl)?;
			let config = BackendConfig {
				access_token,
				url,
				default_ttl: default_ttl.map(|_| resolved.default_ttl),
				max_ttl,
			};

			self.configs.save_backend_config(&config).await?;

			for warning in &resolved.warnings {
				obs::warn(OpKind::AdminConfig, warning);
			}

			Ok(Response::default().with_warnings(resolved.warnings))
		})
		.await
	}

	/// Reads the admin config with its effective TTLs. The credential is reported only as a
	/// SHA-256 digest.
	pub async fn read_admin_config(&self) -> Result<Response> {
		observe(OpKind::AdminConfig, "read_admin_config", async move {
			let config = self.configs.require_backend_config().await?;
			let effective = config.effective_ttls(self.system.max_lease_ttl());

			Ok(Response::with_data(json!({
				"url": config.url,
				"default_ttl": effective.default_ttl.whole_seconds(),
				"max_ttl": effective.max_ttl.whole_seconds(),
				"access_token_sha256": config.access_token.sha256_hex(),
			}))
			.with_warnings(effective.warnings))
		})
		.await
	}

	/// Removes the admin config. Roles are kept but cannot issue until a new config is written.
	pub async fn delete_admin_config(&self) -> Result<Response> {
		observe(OpKind::AdminConfig, "delete_admin_config", async move {
			self.configs.delete_backend_config().await?;

			Ok(Response::default())
		})
		.await
	}

	/// Creates or partially updates a role.
	///
	/// Requires an admin config. Both TTL violations are rejected and leave the stored role, if
	/// any, untouched. A `null` TTL clears the stored value.
	pub async fn write_role(&self, name: &RoleName, input: RoleInput) -> Result<Response> {
		observe(OpKind::Role, "write_role", async move {
			let backend = self.configs.require_backend_config().await?;
			let existing = self.configs.role(name).await?;
			let username = fields::non_blank(input.username)
				.or_else(|| existing.as_ref().map(|r| r.username.clone()))
				.ok_or(ValidationError::MissingField { field: "username" })?;
			let scope = fields::non_blank(input.scope)
				.or_else(|| existing.as_ref().map(|r| r.scope.clone()))
				.ok_or(ValidationError::MissingField { field: "scope" })?;
			let default_ttl =
				fields::merge_ttl(input.default_ttl, existing.as_ref().and_then(|r| r.default_ttl));
			let max_ttl =
				fields::merge_ttl(input.max_ttl, existing.as_ref().and_then(|r| r.max_ttl));
			let refreshable = input
				.refreshable
				.or_else(|| existing.as_ref().map(|r| r.refreshable))
				.unwrap_or(false);
			let backend_ttls = backend.effective_ttls(self.system.max_lease_ttl());

			ttl::resolve_role_ttls(backend_ttls.max_ttl, default_ttl, max_ttl)?;

			let role = RoleConfig { username, scope, default_ttl, max_ttl, refreshable };

			self.configs.save_role(name, &role).await?;

			Ok(Response::default().with_warnings(backend_ttls.warnings))
		})
		.await
	}

	/// Reads a role with its effective TTLs under the current backend config.
	pub async fn read_role(&self, name: &RoleName) -> Result<Response> {
		observe(OpKind::Role, "read_role", async move {
			let role = self
				.configs
				.role(name)
				.await?
				.ok_or_else(|| Error::not_found("role", name.to_string()))?;
			let ceiling = self.system.max_lease_ttl();
			let backend_ttls = match self.configs.backend_config().await? {
				Some(backend) => backend.effective_ttls(ceiling),
				None => ttl::clamp_backend_ttls(ceiling, None, None),
			};
			let effective = role.effective_ttls(backend_ttls.max_ttl);
			let mut warnings = backend_ttls.warnings;

			warnings.extend(effective.warnings);

			Ok(Response::with_data(json!({
				"username": role.username,
				"scope": role.scope,
				"default_ttl": effective.default_ttl.whole_seconds(),
				"max_ttl": effective.max_ttl.whole_seconds(),
				"refreshable": role.refreshable,
			}))
			.with_warnings(warnings))
		})
		.await
	}

	/// Deletes a role. Leases already issued for it stay valid until revoked or expired.
	pub async fn delete_role(&self, name: &RoleName) -> Result<Response> {
		observe(OpKind::Role, "delete_role", async move {
			self.configs.delete_role(name).await?;

			Ok(Response::default())
		})
		.await
	}

	/// Lists role names in sorted order under the `keys` field.
	pub async fn list_roles(&self) -> Result<Response> {
		observe(OpKind::Role, "list_roles", async move {
			let names = self.configs.role_names().await?;
			let keys = names.iter().map(AsRef::<str>::as_ref).collect::<Vec<_>>();

			Ok(Response::with_data(json!({ "keys": keys })))
		})
		.await
	}

	/// Issues a token for the named role.
	pub async fn issue_token(&self, name: &RoleName) -> Result<IssuedLease> {
		observe(OpKind::Issue, "issue_token", async move {
			let backend = self.configs.require_backend_config().await?;
			let role = self
				.configs
				.role(name)
				.await?
				.ok_or_else(|| Error::not_found("role", name.to_string()))?;

			lease::issue(self.client.as_ref(), self.system.max_lease_ttl(), &backend, name, &role)
				.await
		})
		.await
	}

	/// Renewal callback: recomputes the lease's bounds under the current configuration.
	pub async fn renew(&self, issued: &IssuedLease) -> Result<Renewal> {
		observe(OpKind::Renew, "renew", async move {
			let backend = self.configs.require_backend_config().await?;
			let role = self.configs.role(&issued.role_name).await?;
			let renewal =
				lease::renew(issued, self.system.max_lease_ttl(), &backend, role.as_ref())?;

			for warning in &renewal.warnings {
				obs::warn(OpKind::Renew, warning);
			}

			Ok(renewal)
		})
		.await
	}

	/// Revocation callback: best-effort remote revocation of the lease's token.
	///
	/// An error is returned when Artifactory could not be reached, but the host should drop the
	/// lease regardless.
	pub async fn revoke(&self, issued: &IssuedLease) -> Result<()> {
		observe(OpKind::Revoke, "revoke", async move {
			let backend = self.configs.require_backend_config().await?;

			lease::revoke(self.client.as_ref(), &backend, issued).await
		})
		.await
	}

	/// Connectivity check against the configured Artifactory instance.
	pub async fn version(&self) -> Result<VersionInfo> {
		observe(OpKind::Version, "version", async move {
			let backend = self.configs.require_backend_config().await?;
			let endpoint = backend.endpoint()?;

			Ok(self.client.version(&endpoint, &backend.access_token).await?)
		})
		.await
	}
}
#[cfg(feature = "reqwest")]
impl Backend<ReqwestArtifactoryClient> {
	/// Creates a backend with its own reqwest-backed client.
	pub fn new(storage: Arc<dyn Storage>, system: Arc<dyn SystemView>) -> Self {
		Self::with_client(storage, system, ReqwestArtifactoryClient::default())
	}
}
impl<C> Debug for Backend<C>
where
	C: ?Sized + ArtifactoryClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Backend")
			.field("configs", &self.configs)
			.field("max_lease_ttl", &self.system.max_lease_ttl())
			.finish()
	}
}

async fn observe<T, Fut>(kind: OpKind, stage: &'static str, fut: Fut) -> Result<T>
where
	Fut: Future<Output = Result<T>>,
{
	let span = OpSpan::new(kind, stage);

	obs::record_op_outcome(kind, OpOutcome::Attempt);

	let result = span.instrument(fut).await;

	match &result {
		Ok(_) => obs::record_op_outcome(kind, OpOutcome::Success),
		Err(_) => obs::record_op_outcome(kind, OpOutcome::Failure),
	}

	result
}
