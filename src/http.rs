//! Remote Artifactory client contract and its reqwest-backed implementation.
//!
//! The backend only depends on [`ArtifactoryClient`]; [`ReqwestArtifactoryClient`] is the default
//! transport. Every call is a single round trip without retries, so failures surface to the caller
//! immediately. Dropping a returned future cancels the in-flight request and leaves no partial
//! state behind.

// self
use crate::{
	_prelude::*,
	error::{TransportError, UpstreamError, ValidationError},
	secret::TokenSecret,
};

/// Boxed future returned by [`ArtifactoryClient`] calls.
pub type ClientFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, UpstreamError>> + 'a + Send>>;

const TOKEN_PATH: &str = "api/security/token";
const REVOKE_PATH: &str = "api/security/token/revoke";
const VERSION_PATH: &str = "api/system/version";
const BODY_PREVIEW_LIMIT: usize = 512;

/// Endpoint labels used in [`UpstreamError`] values.
pub mod label {
	/// Token creation endpoint.
	pub const TOKEN: &str = "token";
	/// Token revocation endpoint.
	pub const REVOKE: &str = "revoke";
	/// Version endpoint.
	pub const VERSION: &str = "version";
}

/// Artifactory operations the backend consumes.
pub trait ArtifactoryClient
where
	Self: 'static + Send + Sync,
{
	/// Mints a token for `request.username` / `request.scope` using the admin credential.
	fn create_token<'a>(
		&'a self,
		endpoint: &'a Endpoint,
		admin: &'a TokenSecret,
		request: &'a TokenRequest,
	) -> ClientFuture<'a, CreatedToken>;

	/// Invalidates a previously minted token.
	fn revoke_token<'a>(
		&'a self,
		endpoint: &'a Endpoint,
		admin: &'a TokenSecret,
		token: &'a TokenSecret,
	) -> ClientFuture<'a, ()>;

	/// Fetches the service version; used for connectivity checks only.
	fn version<'a>(
		&'a self,
		endpoint: &'a Endpoint,
		admin: &'a TokenSecret,
	) -> ClientFuture<'a, VersionInfo>;
}

/// Validated Artifactory base URL with its derived API endpoints.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
	base: Url,
	token: Url,
	revoke: Url,
	version: Url,
}
impl Endpoint {
	/// Parses a base URL such as `https://artifactory.example.com/artifactory`.
	pub fn parse(raw: &str) -> Result<Self, ValidationError> {
		let invalid = |reason: String| ValidationError::InvalidUrl { url: raw.to_owned(), reason };
		let mut base = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;

		if !matches!(base.scheme(), "http" | "https") {
			return Err(invalid(format!("unsupported scheme `{}`", base.scheme())));
		}
		if base.host_str().is_none_or(str::is_empty) {
			return Err(invalid("missing host".into()));
		}
		if !base.path().ends_with('/') {
			let path = format!("{}/", base.path());

			base.set_path(&path);
		}

		base.set_query(None);
		base.set_fragment(None);

		let join = |path: &str| base.join(path).map_err(|e| invalid(e.to_string()));
		let token = join(TOKEN_PATH)?;
		let revoke = join(REVOKE_PATH)?;
		let version = join(VERSION_PATH)?;

		Ok(Self { base, token, revoke, version })
	}

	/// Normalized base URL (always ends with `/`).
	pub fn base(&self) -> &Url {
		&self.base
	}

	/// Token creation URL.
	pub fn token_url(&self) -> &Url {
		&self.token
	}

	/// Token revocation URL.
	pub fn revoke_url(&self) -> &Url {
		&self.revoke
	}

	/// Version URL.
	pub fn version_url(&self) -> &Url {
		&self.version
	}
}

/// Parameters sent to the token creation endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenRequest {
	/// Artifactory username the token is minted for.
	pub username: String,
	/// Artifactory scope string.
	pub scope: String,
	/// Requested lifetime on the remote side.
	pub expires_in: Duration,
	/// Ask Artifactory for a refreshable token.
	pub refreshable: bool,
}
impl TokenRequest {
	/// Form fields in wire order.
	pub fn form(&self) -> [(&'static str, String); 4] {
		[
			("username", self.username.clone()),
			("scope", self.scope.clone()),
			("expires_in", self.expires_in.whole_seconds().max(0).to_string()),
			("refreshable", self.refreshable.to_string()),
		]
	}
}

/// Token minted by Artifactory.
#[derive(Clone, Debug)]
pub struct CreatedToken {
	/// Access token value.
	pub access_token: TokenSecret,
	/// Lifetime reported by the remote; informational only.
	pub expires_in: Option<Duration>,
	/// Scope echoed by the remote.
	pub scope: Option<String>,
	/// Token type echoed by the remote.
	pub token_type: Option<String>,
	/// Refresh token, when one was requested.
	pub refresh_token: Option<TokenSecret>,
}
impl From<CreateTokenResponse> for CreatedToken {
	fn from(raw: CreateTokenResponse) -> Self {
		Self {
			access_token: TokenSecret::new(raw.access_token),
			expires_in: raw
				.expires_in
				.and_then(|secs| i64::try_from(secs).ok())
				.map(Duration::seconds),
			scope: raw.scope,
			token_type: raw.token_type,
			refresh_token: raw.refresh_token.map(TokenSecret::new),
		}
	}
}

/// Wire shape of a token creation response.
#[derive(Debug, Deserialize)]
struct CreateTokenResponse {
	access_token: String,
	#[serde(default)]
	expires_in: Option<u64>,
	#[serde(default)]
	scope: Option<String>,
	#[serde(default)]
	token_type: Option<String>,
	#[serde(default)]
	refresh_token: Option<String>,
}

/// Version payload reported by Artifactory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
	/// Release version (for example `7.19.10`).
	pub version: String,
	/// Build revision.
	#[serde(default)]
	pub revision: Option<String>,
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Token endpoints answer directly, so clients built through [`with_timeout`](Self::with_timeout)
/// never follow redirects. The configured timeout doubles as the per-call deadline.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestArtifactoryClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestArtifactoryClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client with redirects disabled and the provided deadline per call.
	pub fn with_timeout(timeout: std::time::Duration) -> Result<Self, crate::error::ConfigError> {
		let client = ReqwestClient::builder()
			.redirect(reqwest::redirect::Policy::none())
			.timeout(timeout)
			.build()?;

		Ok(Self(client))
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestArtifactoryClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl ArtifactoryClient for ReqwestArtifactoryClient {
	fn create_token<'a>(
		&'a self,
		endpoint: &'a Endpoint,
		admin: &'a TokenSecret,
		request: &'a TokenRequest,
	) -> ClientFuture<'a, CreatedToken> {
		Box::pin(async move {
			let response = self
				.0
				.post(endpoint.token_url().clone())
				.bearer_auth(admin.expose())
				.form(&request.form())
				.send()
				.await
				.map_err(|e| map_reqwest_error(label::TOKEN, e))?;
			let (status, body) = read_success(label::TOKEN, response).await?;
			let raw: CreateTokenResponse = decode(label::TOKEN, status, &body)?;

			Ok(raw.into())
		})
	}

	fn revoke_token<'a>(
		&'a self,
		endpoint: &'a Endpoint,
		admin: &'a TokenSecret,
		token: &'a TokenSecret,
	) -> ClientFuture<'a, ()> {
		Box::pin(async move {
			let response = self
				.0
				.post(endpoint.revoke_url().clone())
				.bearer_auth(admin.expose())
				.form(&[("token", token.expose())])
				.send()
				.await
				.map_err(|e| map_reqwest_error(label::REVOKE, e))?;

			read_success(label::REVOKE, response).await?;

			Ok(())
		})
	}

	fn version<'a>(
		&'a self,
		endpoint: &'a Endpoint,
		admin: &'a TokenSecret,
	) -> ClientFuture<'a, VersionInfo> {
		Box::pin(async move {
			let response = self
				.0
				.get(endpoint.version_url().clone())
				.bearer_auth(admin.expose())
				.send()
				.await
				.map_err(|e| map_reqwest_error(label::VERSION, e))?;
			let (status, body) = read_success(label::VERSION, response).await?;

			decode(label::VERSION, status, &body)
		})
	}
}

#[cfg(feature = "reqwest")]
async fn read_success(
	endpoint: &'static str,
	response: reqwest::Response,
) -> Result<(u16, Vec<u8>), UpstreamError> {
	let status = response.status();
	let body = response.bytes().await.map_err(|e| map_reqwest_error(endpoint, e))?.to_vec();

	if !status.is_success() {
		return Err(UpstreamError::Status {
			endpoint,
			status: status.as_u16(),
			body: body_preview(&body),
		});
	}

	Ok((status.as_u16(), body))
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(endpoint: &'static str, err: ReqwestError) -> UpstreamError {
	if err.is_timeout() {
		return UpstreamError::Timeout { endpoint };
	}

	UpstreamError::Transport { endpoint, source: TransportError::from(err) }
}

/// Decodes a JSON body, reporting the failing field path.
pub(crate) fn decode<T>(
	endpoint: &'static str,
	status: u16,
	body: &[u8],
) -> Result<T, UpstreamError>
where
	T: for<'de> Deserialize<'de>,
{
	let mut deserializer = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| UpstreamError::Parse { endpoint, source, status })
}

/// Lossy UTF-8 preview of a response body, capped for diagnostics.
pub(crate) fn body_preview(body: &[u8]) -> String {
	let text = String::from_utf8_lossy(body);
	let trimmed = text.trim();

	match trimmed.char_indices().nth(BODY_PREVIEW_LIMIT) {
		Some((idx, _)) => format!("{}…", &trimmed[..idx]),
		None => trimmed.to_owned(),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const CANONICAL_TOKEN: &str = r#"{
		"access_token": "eyXsdgbtybbeeyh...",
		"expires_in": 0,
		"scope": "api:* member-of-groups:example",
		"token_type": "Bearer",
		"refresh_token": "fgsfgsdugh8dgu9s8gy9hsg..."
	}"#;

	#[test]
	fn endpoint_joins_api_paths_under_base_path() {
		let endpoint = Endpoint::parse("https://repo.example.com/artifactory")
			.expect("Base URL with a path should parse.");

		assert_eq!(endpoint.base().as_str(), "https://repo.example.com/artifactory/");
		assert_eq!(
			endpoint.token_url().as_str(),
			"https://repo.example.com/artifactory/api/security/token"
		);
		assert_eq!(
			endpoint.revoke_url().as_str(),
			"https://repo.example.com/artifactory/api/security/token/revoke"
		);
		assert_eq!(
			endpoint.version_url().as_str(),
			"https://repo.example.com/artifactory/api/system/version"
		);
	}

	#[test]
	fn endpoint_rejects_unsupported_urls() {
		assert!(matches!(
			Endpoint::parse("ftp://repo.example.com"),
			Err(ValidationError::InvalidUrl { .. })
		));
		assert!(matches!(Endpoint::parse("not a url"), Err(ValidationError::InvalidUrl { .. })));
		assert!(Endpoint::parse("https://127.0.0.1").is_ok());
	}

	#[test]
	fn canonical_response_decodes() {
		let raw: CreateTokenResponse = decode(label::TOKEN, 200, CANONICAL_TOKEN.as_bytes())
			.expect("Canonical Artifactory response should decode.");
		let token = CreatedToken::from(raw);

		assert_eq!(token.access_token.expose(), "eyXsdgbtybbeeyh...");
		assert_eq!(token.expires_in, Some(Duration::ZERO));
		assert_eq!(token.token_type.as_deref(), Some("Bearer"));
		assert!(token.refresh_token.is_some());
	}

	#[test]
	fn decode_reports_failing_field() {
		let err = decode::<CreateTokenResponse>(label::TOKEN, 200, br#"{"access_token": 7}"#)
			.expect_err("Numeric access_token should fail to decode.");

		match err {
			UpstreamError::Parse { source, status, .. } => {
				assert_eq!(status, 200);
				assert_eq!(source.path().to_string(), "access_token");
			},
			other => panic!("Unexpected error: {other:?}."),
		}
	}

	#[test]
	fn token_request_form_uses_whole_seconds() {
		let request = TokenRequest {
			username: "ci".into(),
			scope: "member-of-groups:readers".into(),
			expires_in: Duration::minutes(9),
			refreshable: true,
		};
		let form = request.form();

		assert_eq!(form[2], ("expires_in", "540".to_owned()));
		assert_eq!(form[3], ("refreshable", "true".to_owned()));
	}

	#[test]
	fn body_preview_truncates_long_bodies() {
		let body = "x".repeat(BODY_PREVIEW_LIMIT + 10);
		let preview = body_preview(body.as_bytes());

		assert_eq!(preview.chars().count(), BODY_PREVIEW_LIMIT + 1);
		assert!(preview.ends_with('…'));
	}
}
