//! Redacting wrapper for the admin credential and issued access tokens.

// crates.io
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

/// Token secret that never prints its value; only the SHA-256 digest may be surfaced.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a raw token value.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Raw token value, for the wire only.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Lowercase hex SHA-256 of the secret, safe for responses and logs.
	pub fn sha256_hex(&self) -> String {
		Sha256::digest(self.0.as_bytes()).iter().map(|byte| format!("{byte:02x}")).collect()
	}

	/// First 12 hex characters of [`sha256_hex`](Self::sha256_hex) for log correlation.
	pub fn fingerprint(&self) -> String {
		let mut digest = self.sha256_hex();

		digest.truncate(12);

		digest
	}

	/// Returns `true` when the secret is empty or whitespace.
	pub fn is_blank(&self) -> bool {
		self.0.trim().is_empty()
	}
}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}
