//! TTL negotiation across the host ceiling, the backend config, and a role config.
//!
//! Each scope nests inside the *resolved* bounds of its parent:
//!
//! ```text
//! system ceiling >= backend max_ttl >= role max_ttl >= role default_ttl
//!                   backend max_ttl >= backend default_ttl
//! ```
//!
//! Two families of functions live here:
//!
//! - [`resolve_backend_ttls`] and [`resolve_role_ttls`] run when a config is written. Backend
//!   `max_ttl` above the ceiling is rejected, backend `default_ttl` above its max is capped with a
//!   warning, and both role violations are rejected.
//! - [`clamp_backend_ttls`] and [`clamp_role_ttls`] run when a lease is issued or renewed. The
//!   ceiling may have shrunk since the config was written, so stored values are only ever reduced
//!   to the live parent bound and never rejected.
//!
//! An absent value inherits the parent's effective value. Zero is a valid explicit value.
//! Equality with a bound is always permitted.

// self
use crate::{_prelude::*, error::ValidationError};

/// Effective `(default_ttl, max_ttl)` pair plus any non-fatal warnings produced on the way.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedTtls {
	/// Effective default TTL (`0 <= default_ttl <= max_ttl`).
	pub default_ttl: Duration,
	/// Effective max TTL (never above the parent bound).
	pub max_ttl: Duration,
	/// Human-readable notes about values that were capped.
	pub warnings: Vec<String>,
}
impl ResolvedTtls {
	fn new(default_ttl: Duration, max_ttl: Duration, warnings: Vec<String>) -> Self {
		Self { default_ttl, max_ttl, warnings }
	}
}

/// Resolves a backend config write against the live system ceiling.
///
/// `max_ttl` above the ceiling is a hard error: it would let an administrator grant more than
/// the deployment permits. `default_ttl` above the effective max is only a fallback, so it is
/// capped and reported as a warning.
pub fn resolve_backend_ttls(
	system_ceiling: Duration,
	configured_default: Option<Duration>,
	configured_max: Option<Duration>,
) -> Result<ResolvedTtls, ValidationError> {
	ensure_non_negative("default_ttl", configured_default)?;
	ensure_non_negative("max_ttl", configured_max)?;

	if let Some(max) = configured_max.filter(|max| *max > system_ceiling) {
		return Err(ValidationError::MaxTtlExceedsSystem {
			max_ttl: max.whole_seconds(),
			ceiling: system_ceiling.whole_seconds(),
		});
	}

	let max_ttl = configured_max.unwrap_or(system_ceiling);
	let mut warnings = Vec::new();
	let default_ttl = match configured_default {
		Some(default) if default > max_ttl => {
			let bound = if configured_max.is_some() { "max_ttl" } else { "system max_ttl" };

			warnings.push(format!(
				"default_ttl ({}s) capped to {bound} ({}s)",
				default.whole_seconds(),
				max_ttl.whole_seconds()
			));

			max_ttl
		},
		Some(default) => default,
		None => max_ttl,
	};

	Ok(ResolvedTtls::new(default_ttl, max_ttl, warnings))
}

/// Resolves a role config write against the backend's effective max TTL.
///
/// Both violations are hard errors here; default and max describe the same token, so an
/// inconsistent pair is a misconfiguration for the caller to fix.
pub fn resolve_role_ttls(
	backend_max: Duration,
	configured_default: Option<Duration>,
	configured_max: Option<Duration>,
) -> Result<ResolvedTtls, ValidationError> {
	ensure_non_negative("default_ttl", configured_default)?;
	ensure_non_negative("max_ttl", configured_max)?;

	if let Some(max) = configured_max.filter(|max| *max > backend_max) {
		return Err(ValidationError::RoleMaxTtlExceedsBackend {
			max_ttl: max.whole_seconds(),
			backend_max_ttl: backend_max.whole_seconds(),
		});
	}

	let max_ttl = configured_max.unwrap_or(backend_max);

	if let Some(default) = configured_default.filter(|default| *default > max_ttl) {
		return Err(ValidationError::RoleDefaultTtlExceedsMax {
			default_ttl: default.whole_seconds(),
			max_ttl: max_ttl.whole_seconds(),
		});
	}

	Ok(ResolvedTtls::new(configured_default.unwrap_or(max_ttl), max_ttl, Vec::new()))
}

/// Derives the backend's effective TTLs at use time, capping stored values to the live ceiling.
pub fn clamp_backend_ttls(
	system_ceiling: Duration,
	stored_default: Option<Duration>,
	stored_max: Option<Duration>,
) -> ResolvedTtls {
	clamp(Layer::Backend, system_ceiling, stored_default, stored_max)
}

/// Derives a role's effective TTLs at use time, capping stored values to the backend max.
pub fn clamp_role_ttls(
	backend_max: Duration,
	stored_default: Option<Duration>,
	stored_max: Option<Duration>,
) -> ResolvedTtls {
	clamp(Layer::Role, backend_max, stored_default, stored_max)
}

#[derive(Clone, Copy)]
enum Layer {
	Backend,
	Role,
}
impl Layer {
	const fn prefix(self) -> &'static str {
		match self {
			Self::Backend => "",
			Self::Role => "role ",
		}
	}

	const fn parent(self) -> &'static str {
		match self {
			Self::Backend => "system max_ttl",
			Self::Role => "backend max_ttl",
		}
	}
}

fn clamp(
	layer: Layer,
	parent_max: Duration,
	stored_default: Option<Duration>,
	stored_max: Option<Duration>,
) -> ResolvedTtls {
	let parent_max = parent_max.max(Duration::ZERO);
	let mut warnings = Vec::new();
	let max_ttl = match stored_max {
		Some(max) if max > parent_max => {
			warnings.push(format!(
				"{}max_ttl ({}s) reduced to {} ({}s)",
				layer.prefix(),
				max.whole_seconds(),
				layer.parent(),
				parent_max.whole_seconds()
			));

			parent_max
		},
		Some(max) => max.max(Duration::ZERO),
		None => parent_max,
	};
	let default_ttl = match stored_default {
		Some(default) if default > max_ttl => {
			warnings.push(format!(
				"{}default_ttl ({}s) reduced to max_ttl ({}s)",
				layer.prefix(),
				default.whole_seconds(),
				max_ttl.whole_seconds()
			));

			max_ttl
		},
		Some(default) => default.max(Duration::ZERO),
		None => max_ttl,
	};

	ResolvedTtls::new(default_ttl, max_ttl, warnings)
}

fn ensure_non_negative(
	field: &'static str,
	value: Option<Duration>,
) -> Result<(), ValidationError> {
	match value {
		Some(ttl) if ttl.is_negative() => Err(ValidationError::NegativeTtl { field }),
		_ => Ok(()),
	}
}

/// Serde adapter persisting a [`Duration`] as whole seconds.
pub(crate) mod seconds {
	// crates.io
	use serde::{Deserializer, Serializer};
	// self
	use crate::_prelude::*;

	pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_i64(value.whole_seconds())
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
	where
		D: Deserializer<'de>,
	{
		Ok(Duration::seconds(i64::deserialize(deserializer)?))
	}
}

/// Serde adapter persisting an optional [`Duration`] as whole seconds; `null` means "inherit".
pub(crate) mod opt_seconds {
	// crates.io
	use serde::{Deserializer, Serializer};
	// self
	use crate::_prelude::*;

	pub fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		value.map(|ttl| ttl.whole_seconds()).serialize(serializer)
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
	where
		D: Deserializer<'de>,
	{
		Ok(Option::<i64>::deserialize(deserializer)?.map(Duration::seconds))
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const CEILING: Duration = Duration::hours(768);
	const FIVE_MIN: Duration = Duration::minutes(5);
	const SECOND: Duration = Duration::SECOND;

	#[test]
	fn backend_max_above_ceiling_is_rejected() {
		let err = resolve_backend_ttls(CEILING, None, Some(CEILING + SECOND))
			.expect_err("Backend max above the ceiling must fail.");

		assert!(matches!(err, ValidationError::MaxTtlExceedsSystem { .. }));
		assert!(err.to_string().contains("exceeds system limit"));
	}

	#[test]
	fn backend_default_above_ceiling_is_capped_with_warning() {
		let resolved = resolve_backend_ttls(CEILING, Some(CEILING + SECOND), None)
			.expect("Backend default above the ceiling should be capped, not rejected.");

		assert_eq!(resolved.default_ttl, CEILING);
		assert_eq!(resolved.max_ttl, CEILING);
		assert_eq!(resolved.warnings.len(), 1);
		assert!(resolved.warnings[0].contains("capped to system max_ttl"));
	}

	#[test]
	fn backend_default_above_backend_max_is_capped_with_warning() {
		let resolved = resolve_backend_ttls(CEILING, Some(FIVE_MIN + SECOND), Some(FIVE_MIN))
			.expect("Backend default above its max should be capped.");

		assert_eq!(resolved.default_ttl, FIVE_MIN);
		assert_eq!(resolved.max_ttl, FIVE_MIN);
		assert!(resolved.warnings[0].contains("capped to max_ttl"));
	}

	#[test]
	fn backend_values_equal_to_ceiling_pass_silently() {
		let resolved = resolve_backend_ttls(CEILING, Some(CEILING), Some(CEILING))
			.expect("Values equal to the ceiling are permitted.");

		assert_eq!(resolved, ResolvedTtls::new(CEILING, CEILING, Vec::new()));
	}

	#[test]
	fn backend_absent_values_inherit_and_zero_is_explicit() {
		let inherited = resolve_backend_ttls(CEILING, None, None)
			.expect("Absent values should inherit the ceiling.");

		assert_eq!((inherited.default_ttl, inherited.max_ttl), (CEILING, CEILING));

		let zero = resolve_backend_ttls(CEILING, Some(Duration::ZERO), None)
			.expect("Zero default is a valid explicit value.");

		assert_eq!(zero.default_ttl, Duration::ZERO);
		assert_eq!(zero.max_ttl, CEILING);
	}

	#[test]
	fn negative_values_are_rejected() {
		assert_eq!(
			resolve_backend_ttls(CEILING, Some(-SECOND), None),
			Err(ValidationError::NegativeTtl { field: "default_ttl" })
		);
		assert_eq!(
			resolve_role_ttls(CEILING, None, Some(-SECOND)),
			Err(ValidationError::NegativeTtl { field: "max_ttl" })
		);
	}

	#[test]
	fn role_max_above_backend_max_is_rejected() {
		let err = resolve_role_ttls(FIVE_MIN, None, Some(FIVE_MIN + SECOND))
			.expect_err("Role max above the backend max must fail.");

		assert_eq!(
			err,
			ValidationError::RoleMaxTtlExceedsBackend { max_ttl: 301, backend_max_ttl: 300 }
		);
	}

	#[test]
	fn role_default_above_role_max_is_rejected() {
		let err = resolve_role_ttls(FIVE_MIN, Some(FIVE_MIN + SECOND), Some(FIVE_MIN))
			.expect_err("Role default above the role max must fail.");

		assert!(matches!(err, ValidationError::RoleDefaultTtlExceedsMax { .. }));

		let err = resolve_role_ttls(FIVE_MIN, Some(FIVE_MIN + SECOND), None)
			.expect_err("Role default above the inherited max must fail as well.");

		assert!(matches!(err, ValidationError::RoleDefaultTtlExceedsMax { max_ttl: 300, .. }));
	}

	#[test]
	fn role_absent_values_inherit_backend_max() {
		let resolved =
			resolve_role_ttls(FIVE_MIN, None, None).expect("Empty role TTLs should inherit.");

		assert_eq!((resolved.default_ttl, resolved.max_ttl), (FIVE_MIN, FIVE_MIN));

		let resolved = resolve_role_ttls(FIVE_MIN, None, Some(Duration::minutes(4)))
			.expect("Role max below the backend max should pass.");

		assert_eq!(resolved.default_ttl, Duration::minutes(4));
	}

	#[test]
	fn resolution_is_deterministic() {
		let first = resolve_backend_ttls(CEILING, Some(FIVE_MIN + SECOND), Some(FIVE_MIN));
		let second = resolve_backend_ttls(CEILING, Some(FIVE_MIN + SECOND), Some(FIVE_MIN));

		assert_eq!(first, second);
	}

	#[test]
	fn clamping_follows_a_shrinking_ceiling() {
		let backend = clamp_backend_ttls(Duration::hours(1), Some(Duration::hours(2)), Some(CEILING));

		assert_eq!(backend.max_ttl, Duration::hours(1));
		assert_eq!(backend.default_ttl, Duration::hours(1));
		assert_eq!(backend.warnings.len(), 2);

		let role = clamp_role_ttls(backend.max_ttl, None, Some(Duration::minutes(90)));

		assert_eq!(role.max_ttl, Duration::hours(1));
		assert!(role.warnings[0].starts_with("role max_ttl"));
	}

	#[test]
	fn clamping_keeps_values_within_bounds_untouched() {
		let role = clamp_role_ttls(Duration::minutes(10), Some(FIVE_MIN), Some(Duration::minutes(9)));

		assert_eq!(role, ResolvedTtls::new(FIVE_MIN, Duration::minutes(9), Vec::new()));
	}
}
