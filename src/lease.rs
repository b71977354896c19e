//! Token issuance and the renew/revoke callbacks the host invokes on issued leases.
//!
//! The lease ceiling always comes from the local TTL chain (ceiling, then backend, then role).
//! The `expires_in` reported by Artifactory is kept for diagnostics and never used as a bound.

// self
use crate::{
	_prelude::*,
	config::{BackendConfig, RoleConfig},
	error::{UpstreamError, ValidationError},
	http::{self, ArtifactoryClient, TokenRequest},
	id::{LeaseId, RoleName},
	obs::{self, OpKind},
	secret::TokenSecret,
	ttl,
};

/// Secret handed to the host after a successful issuance.
///
/// The host owns the lease lifecycle; the backend never mutates it and only recomputes bounds when
/// asked to renew.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedLease {
	/// Identifier the host keys renew/revoke callbacks on.
	pub lease_id: LeaseId,
	/// Minted access token.
	pub token: TokenSecret,
	/// Initial lease TTL (the role's effective default).
	#[serde(with = "ttl::seconds")]
	pub ttl: Duration,
	/// Lease ceiling measured from `issued_at`.
	#[serde(with = "ttl::seconds")]
	pub max_ttl: Duration,
	/// Copied from the role's `refreshable` flag.
	pub renewable: bool,
	/// Role the lease was issued for; used for renewal lookups.
	pub role_name: RoleName,
	/// Artifactory username the token belongs to.
	pub username: String,
	/// Artifactory scope the token was requested with.
	pub scope: String,
	/// Issuance instant.
	#[serde(with = "time::serde::rfc3339")]
	pub issued_at: OffsetDateTime,
	/// Lifetime reported by Artifactory; informational only.
	#[serde(default, with = "ttl::opt_seconds")]
	pub reported_expires_in: Option<Duration>,
	/// Notes about TTLs that were capped while issuing.
	#[serde(default)]
	pub warnings: Vec<String>,
}
impl IssuedLease {
	/// Instant the initial TTL runs out.
	pub fn expires_at(&self) -> OffsetDateTime {
		self.issued_at + self.ttl
	}

	/// Instant past which no renewal may extend the lease.
	pub fn ceiling_at(&self) -> OffsetDateTime {
		self.issued_at + self.max_ttl
	}
}

/// Bounds reported back to the host on renewal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Renewal {
	/// TTL to grant for this renewal step (the role's current effective default).
	pub ttl: Duration,
	/// Current lease ceiling measured from the original issuance.
	pub max_ttl: Duration,
	/// Notes about TTLs that were capped under the current configuration.
	pub warnings: Vec<String>,
}
impl Renewal {
	/// TTL the host should grant at `now`, so the total lifetime never passes the renewed ceiling.
	pub fn grant_at(&self, issued_at: OffsetDateTime, now: OffsetDateTime) -> Duration {
		let remaining = issued_at + self.max_ttl - now;

		self.ttl.min(remaining).max(Duration::ZERO)
	}
}

/// Mints a token for `role` and wraps it in a lease bounded by the local TTL chain.
///
/// No local state changes; the only side effect is the remote call.
pub async fn issue<C>(
	client: &C,
	system_ceiling: Duration,
	backend: &BackendConfig,
	role_name: &RoleName,
	role: &RoleConfig,
) -> Result<IssuedLease>
where
	C: ?Sized + ArtifactoryClient,
{
	let endpoint = backend.endpoint()?;
	let backend_ttls = backend.effective_ttls(system_ceiling);
	let role_ttls = role.effective_ttls(backend_ttls.max_ttl);
	let request = TokenRequest {
		username: role.username.clone(),
		scope: role.scope.clone(),
		expires_in: role_ttls.max_ttl,
		refreshable: role.refreshable,
	};
	let created = client.create_token(&endpoint, &backend.access_token, &request).await?;

	if created.access_token.is_blank() {
		return Err(UpstreamError::EmptyToken { endpoint: http::label::TOKEN }.into());
	}

	let mut warnings = backend_ttls.warnings;

	warnings.extend(role_ttls.warnings);

	for warning in &warnings {
		obs::warn(OpKind::Issue, warning);
	}

	Ok(IssuedLease {
		lease_id: LeaseId::generate(),
		token: created.access_token,
		ttl: role_ttls.default_ttl,
		max_ttl: role_ttls.max_ttl,
		renewable: role.refreshable,
		role_name: role_name.clone(),
		username: role.username.clone(),
		scope: role.scope.clone(),
		issued_at: OffsetDateTime::now_utc(),
		reported_expires_in: created.expires_in,
		warnings,
	})
}

/// Recomputes a lease's bounds against the *current* backend and role configuration.
///
/// `role` is `None` when the role has been deleted since issuance. Elapsed time is not tracked
/// here; see [`Renewal::grant_at`].
pub fn renew(
	lease: &IssuedLease,
	system_ceiling: Duration,
	backend: &BackendConfig,
	role: Option<&RoleConfig>,
) -> Result<Renewal, ValidationError> {
	if !lease.renewable {
		return Err(ValidationError::NotRenewable { lease_id: lease.lease_id.to_string() });
	}

	let role =
		role.ok_or_else(|| ValidationError::RoleRemoved { role: lease.role_name.to_string() })?;
	let backend_ttls = backend.effective_ttls(system_ceiling);
	let role_ttls = role.effective_ttls(backend_ttls.max_ttl);
	let mut warnings = backend_ttls.warnings;

	warnings.extend(role_ttls.warnings);

	Ok(Renewal { ttl: role_ttls.default_ttl, max_ttl: role_ttls.max_ttl, warnings })
}

/// Best-effort remote revocation of a lease's token.
///
/// A failure is logged and returned, but the host must still drop the lease locally; an
/// unavailable Artifactory never blocks local teardown.
pub async fn revoke<C>(client: &C, backend: &BackendConfig, lease: &IssuedLease) -> Result<()>
where
	C: ?Sized + ArtifactoryClient,
{
	let endpoint = backend.endpoint()?;

	client.revoke_token(&endpoint, &backend.access_token, &lease.token).await.map_err(|err| {
		obs::warn(
			OpKind::Revoke,
			&format!(
				"remote revocation of lease {} (token {}) failed: {err}",
				lease.lease_id,
				lease.token.fingerprint()
			),
		);

		err.into()
	})
}
