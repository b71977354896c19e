//! Optional observability helpers for backend operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `artifactory_secrets.op` with the `op`
//!   (operation) and `stage` (call site) fields, plus `warn` events for capped TTLs and failed
//!   best-effort revocations.
//! - Enable `metrics` to increment the `artifactory_secrets_op_total` counter for every
//!   attempt/success/failure, labeled by `op` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Backend operations observed by the facade.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
	/// `config/admin` reads, writes, and deletes.
	AdminConfig,
	/// `roles/*` reads, writes, deletes, and lists.
	Role,
	/// `token/<role>` issuance.
	Issue,
	/// Host renewal callback.
	Renew,
	/// Host revocation callback.
	Revoke,
	/// Connectivity check against the version endpoint.
	Version,
}
impl OpKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpKind::AdminConfig => "admin_config",
			OpKind::Role => "role",
			OpKind::Issue => "issue",
			OpKind::Renew => "renew",
			OpKind::Revoke => "revoke",
			OpKind::Version => "version",
		}
	}
}
impl Display for OpKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpOutcome {
	/// Entry to a backend operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl OpOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpOutcome::Attempt => "attempt",
			OpOutcome::Success => "success",
			OpOutcome::Failure => "failure",
		}
	}
}
impl Display for OpOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
