//! Backend-level error types shared across the resolver, issuer, stores, and facade.

// self
use crate::_prelude::*;

/// Backend-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical backend error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Configuration violates a TTL or field invariant; nothing was persisted.
	#[error(transparent)]
	Validation(#[from] ValidationError),
	/// Remote service unreachable or returned a failure.
	#[error(transparent)]
	Upstream(#[from] UpstreamError),
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem (client construction and similar).
	#[error(transparent)]
	Config(#[from] ConfigError),

	/// Referenced record does not exist.
	#[error("No {kind} named `{name}` is configured.")]
	NotFound {
		/// Record kind (`admin config`, `role`).
		kind: &'static str,
		/// Record name or path.
		name: String,
	},
	/// Request path does not match any route.
	#[error("Unsupported path `{path}`.")]
	UnsupportedPath {
		/// Path as received from the host.
		path: String,
	},
	/// Route exists but does not accept the requested operation.
	#[error("Path `{path}` does not support the {operation} operation.")]
	UnsupportedOperation {
		/// Path as received from the host.
		path: String,
		/// Operation label.
		operation: &'static str,
	},
}
impl Error {
	/// Builds a [`Error::NotFound`] for the provided record kind.
	pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
		Self::NotFound { kind, name: name.into() }
	}

	/// Returns `true` for caller-fixable configuration errors.
	pub fn is_validation(&self) -> bool {
		matches!(self, Self::Validation(_))
	}

	/// Returns `true` when the remote service caused the failure.
	pub fn is_upstream(&self) -> bool {
		matches!(self, Self::Upstream(_))
	}

	/// Returns `true` when a referenced role or admin config is absent.
	pub fn is_not_found(&self) -> bool {
		matches!(self, Self::NotFound { .. })
	}
}

/// Configuration or TTL invariant violations raised before anything is persisted.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ValidationError {
	/// Backend `max_ttl` is larger than the host ceiling.
	#[error("max_ttl ({max_ttl}s) exceeds system limit ({ceiling}s).")]
	MaxTtlExceedsSystem {
		/// Requested backend max TTL in seconds.
		max_ttl: i64,
		/// Live system ceiling in seconds.
		ceiling: i64,
	},
	/// Role `max_ttl` is larger than the backend's effective max TTL.
	#[error("role max_ttl ({max_ttl}s) exceeds backend max_ttl ({backend_max_ttl}s).")]
	RoleMaxTtlExceedsBackend {
		/// Requested role max TTL in seconds.
		max_ttl: i64,
		/// Backend effective max TTL in seconds.
		backend_max_ttl: i64,
	},
	/// Role `default_ttl` is larger than the role's effective max TTL.
	#[error("role default_ttl ({default_ttl}s) exceeds role max_ttl ({max_ttl}s).")]
	RoleDefaultTtlExceedsMax {
		/// Requested role default TTL in seconds.
		default_ttl: i64,
		/// Role effective max TTL in seconds.
		max_ttl: i64,
	},
	/// A TTL field was negative.
	#[error("{field} must not be negative.")]
	NegativeTtl {
		/// Field name.
		field: &'static str,
	},
	/// A required field was absent on first write.
	#[error("Missing required field `{field}`.")]
	MissingField {
		/// Field name.
		field: &'static str,
	},
	/// A field could not be decoded.
	#[error("Invalid value for `{field}`: {reason}.")]
	InvalidField {
		/// Field path reported by the decoder.
		field: String,
		/// Decoder message.
		reason: String,
	},
	/// Base URL is malformed or uses an unsupported scheme.
	#[error("Invalid url `{url}`: {reason}.")]
	InvalidUrl {
		/// URL as supplied.
		url: String,
		/// Why the URL was rejected.
		reason: String,
	},
	/// Role name failed identifier validation.
	#[error(transparent)]
	InvalidName(#[from] crate::id::IdentifierError),
	/// Renewal targeted a role that no longer exists.
	#[error("Role `{role}` no longer exists; the lease cannot be renewed.")]
	RoleRemoved {
		/// Role name recorded on the lease.
		role: String,
	},
	/// Renewal targeted a lease issued as non-renewable.
	#[error("Lease `{lease_id}` is not renewable.")]
	NotRenewable {
		/// Lease identifier.
		lease_id: String,
	},
}

/// Remote service failures. Reported separately from [`ValidationError`] so callers can tell a
/// bad config apart from an unavailable Artifactory.
#[derive(Debug, ThisError)]
pub enum UpstreamError {
	/// Remote returned a non-success status.
	#[error("Artifactory {endpoint} endpoint returned HTTP {status}: {body}.")]
	Status {
		/// Endpoint label.
		endpoint: &'static str,
		/// HTTP status code.
		status: u16,
		/// Truncated response body.
		body: String,
	},
	/// Remote responded with JSON that could not be decoded.
	#[error("Artifactory {endpoint} endpoint returned malformed JSON.")]
	Parse {
		/// Endpoint label.
		endpoint: &'static str,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code.
		status: u16,
	},
	/// Remote answered successfully but without a usable token.
	#[error("Artifactory {endpoint} endpoint returned an empty access token.")]
	EmptyToken {
		/// Endpoint label.
		endpoint: &'static str,
	},
	/// Call exceeded the configured deadline.
	#[error("Request to the Artifactory {endpoint} endpoint timed out.")]
	Timeout {
		/// Endpoint label.
		endpoint: &'static str,
	},
	/// Transport failure before a response arrived.
	#[error("Artifactory {endpoint} endpoint is unreachable.")]
	Transport {
		/// Endpoint label.
		endpoint: &'static str,
		/// Underlying transport failure.
		#[source]
		source: TransportError,
	},
}
impl UpstreamError {
	/// HTTP status attached to the failure, when one was received.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Status { status, .. } | Self::Parse { status, .. } => Some(*status),
			Self::EmptyToken { .. } | Self::Timeout { .. } | Self::Transport { .. } => None,
		}
	}
}

/// Local configuration failures that are neither caller input nor remote outages.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures raised by the HTTP client.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling Artifactory.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
