//! Host-supplied view of deployment-wide lease limits.

// self
use crate::_prelude::*;

/// Default deployment ceiling (32 days).
pub const DEFAULT_MAX_LEASE_TTL: Duration = Duration::hours(768);

/// Live view of the host's lease limits.
///
/// The ceiling can slide at runtime, so the backend asks for it on every request instead of
/// caching it.
pub trait SystemView
where
	Self: Send + Sync,
{
	/// Hard upper bound no configured or issued TTL may exceed.
	fn max_lease_ttl(&self) -> Duration;
}

/// Fixed ceiling, adjustable at runtime for embedding and tests.
#[derive(Debug)]
pub struct StaticSystemView {
	max_lease_ttl: RwLock<Duration>,
}
impl StaticSystemView {
	/// Creates a view with the provided ceiling.
	pub fn new(max_lease_ttl: Duration) -> Self {
		Self { max_lease_ttl: RwLock::new(max_lease_ttl) }
	}

	/// Replaces the ceiling; subsequent requests observe the new value.
	pub fn set_max_lease_ttl(&self, max_lease_ttl: Duration) {
		*self.max_lease_ttl.write() = max_lease_ttl;
	}
}
impl Default for StaticSystemView {
	fn default() -> Self {
		Self::new(DEFAULT_MAX_LEASE_TTL)
	}
}
impl SystemView for StaticSystemView {
	fn max_lease_ttl(&self) -> Duration {
		*self.max_lease_ttl.read()
	}
}
impl<T> SystemView for Arc<T>
where
	T: ?Sized + SystemView,
{
	fn max_lease_ttl(&self) -> Duration {
		self.as_ref().max_lease_ttl()
	}
}
