//! Strongly typed identifiers for roles and issued leases.

// std
use std::{borrow::Borrow, ops::Deref};
// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
// self
use crate::_prelude::*;

macro_rules! def_id {
	($name:ident, $doc:literal, $kind:literal) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Validates and wraps the provided value.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				let raw = value.as_ref();

				validate($kind, raw)?;

				Ok(Self(raw.to_owned()))
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				validate($kind, &value)?;

				Ok(Self(value))
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
	};
}

const MAX_IDENTIFIER_CHARS: usize = 128;
const LEASE_ID_BYTES: usize = 18;

/// Why a role name or lease identifier was rejected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// Nothing but whitespace.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier (role, lease).
		kind: &'static str,
	},
	/// Embedded whitespace.
	#[error("{kind} identifier contains whitespace.")]
	ContainsWhitespace {
		/// Kind of identifier (role, lease).
		kind: &'static str,
	},
	/// Path separators would escape the storage prefix.
	#[error("{kind} identifier cannot contain `/`.")]
	ContainsSeparator {
		/// Kind of identifier (role, lease).
		kind: &'static str,
	},
	/// Longer than the storage key budget.
	#[error("{kind} identifier exceeds {max} characters.")]
	TooLong {
		/// Kind of identifier (role, lease).
		kind: &'static str,
		/// Character limit.
		max: usize,
	},
}

def_id!(RoleName, "Name of a configured role; doubles as its storage key suffix.", "Role");
def_id!(LeaseId, "Opaque identifier the host uses to key renew/revoke callbacks.", "Lease");
impl LeaseId {
	/// Generates a fresh random URL-safe identifier.
	pub fn generate() -> Self {
		let mut bytes = [0_u8; LEASE_ID_BYTES];

		rand::rng().fill_bytes(&mut bytes);

		Self(URL_SAFE_NO_PAD.encode(bytes))
	}
}

fn validate(kind: &'static str, raw: &str) -> Result<(), IdentifierError> {
	if raw.trim().is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if raw.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace { kind });
	}
	if raw.contains('/') {
		return Err(IdentifierError::ContainsSeparator { kind });
	}
	if raw.chars().count() > MAX_IDENTIFIER_CHARS {
		return Err(IdentifierError::TooLong { kind, max: MAX_IDENTIFIER_CHARS });
	}

	Ok(())
}
