//! Request payload decoding for the facade routes.

// crates.io
use serde::{Deserializer, de::DeserializeOwned};
use serde_json::{Map, Value};
// self
use crate::{_prelude::*, error::ValidationError};

/// Fields accepted on `config/admin` writes.
///
/// Absent fields keep their stored values. An explicit `null` TTL clears the stored value so the
/// backend inherits from the system ceiling again.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct AdminConfigInput {
	/// Admin credential; required on first write.
	#[serde(default)]
	pub access_token: Option<String>,
	/// Artifactory base URL; required on first write.
	#[serde(default)]
	pub url: Option<String>,
	/// Backend default TTL.
	#[serde(default, deserialize_with = "present")]
	pub default_ttl: Option<Option<Ttl>>,
	/// Backend max TTL.
	#[serde(default, deserialize_with = "present")]
	pub max_ttl: Option<Option<Ttl>>,
}

/// Fields accepted on `roles/<name>` writes.
///
/// Absent fields keep their stored values. An explicit `null` TTL clears the stored value so the
/// role inherits from the backend again.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RoleInput {
	/// Artifactory username; required on creation.
	#[serde(default)]
	pub username: Option<String>,
	/// Artifactory scope; required on creation.
	#[serde(default)]
	pub scope: Option<String>,
	/// Role default TTL.
	#[serde(default, deserialize_with = "present")]
	pub default_ttl: Option<Option<Ttl>>,
	/// Role max TTL.
	#[serde(default, deserialize_with = "present")]
	pub max_ttl: Option<Option<Ttl>>,
	/// Whether leases may be renewed.
	#[serde(default)]
	pub refreshable: Option<bool>,
}

/// TTL field accepting integer seconds (`300`, `"300"`) or human-readable text (`"5m"`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawTtl")]
pub struct Ttl(pub Duration);
impl Ttl {
	/// Returns the decoded duration.
	pub fn get(self) -> Duration {
		self.0
	}
}
impl From<Duration> for Ttl {
	fn from(value: Duration) -> Self {
		Self(value)
	}
}
impl TryFrom<RawTtl> for Ttl {
	type Error = String;

	fn try_from(raw: RawTtl) -> Result<Self, Self::Error> {
		match raw {
			RawTtl::Seconds(secs) => Ok(Self(Duration::seconds(secs))),
			RawTtl::Fractional(secs) if secs.is_finite() => Ok(Self(Duration::seconds(secs as i64))),
			RawTtl::Fractional(secs) => Err(format!("{secs} is not a finite number of seconds")),
			RawTtl::Text(text) => parse_text(&text),
		}
	}
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTtl {
	Seconds(i64),
	Fractional(f64),
	Text(String),
}

fn parse_text(text: &str) -> Result<Ttl, String> {
	let trimmed = text.trim();

	if let Ok(secs) = trimmed.parse::<i64>() {
		return Ok(Ttl(Duration::seconds(secs)));
	}

	let parsed = humantime::parse_duration(trimmed).map_err(|e| e.to_string())?;

	Duration::try_from(parsed).map(Ttl).map_err(|e| e.to_string())
}

/// Marks a field as present, keeping an explicit `null` distinct from an absent key.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
	D: Deserializer<'de>,
	T: Deserialize<'de>,
{
	Option::<T>::deserialize(deserializer).map(Some)
}

/// Applies a partial TTL update: absent keeps `stored`, `null` clears it.
pub(crate) fn merge_ttl(update: Option<Option<Ttl>>, stored: Option<Duration>) -> Option<Duration> {
	match update {
		Some(value) => value.map(Ttl::get),
		None => stored,
	}
}

/// Decodes a request payload, naming the offending field on failure.
pub fn decode<T>(data: Map<String, Value>) -> Result<T, ValidationError>
where
	T: DeserializeOwned,
{
	serde_path_to_error::deserialize(Value::Object(data)).map_err(|err| {
		ValidationError::InvalidField {
			field: err.path().to_string(),
			reason: err.into_inner().to_string(),
		}
	})
}

/// Returns the trimmed value, or `None` if it is absent or blank.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
	value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}
