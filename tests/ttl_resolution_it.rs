// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use artifactory_secrets::{
	_preludet::*,
	backend::{Operation, Request},
	error::ValidationError,
	store::Storage,
	system::{DEFAULT_MAX_LEASE_TTL, StaticSystemView},
};

const SYSTEM_MAX: i64 = DEFAULT_MAX_LEASE_TTL.whole_seconds();

fn admin(extra: serde_json::Value) -> serde_json::Value {
	let mut data = json!({
		"access_token": "test-access-token",
		"url": "https://127.0.0.1",
	});

	if let (Some(base), serde_json::Value::Object(extra)) = (data.as_object_mut(), extra) {
		base.extend(extra);
	}

	data
}

async fn configured_backend(extra: serde_json::Value) -> ReqwestTestBackend {
	let (backend, _) = build_reqwest_test_backend();

	backend
		.handle_request(write_request("config/admin", admin(extra)))
		.await
		.expect("Admin config fixture should be accepted.");

	backend
}

async fn mock_token(server: &MockServer) -> httpmock::Mock<'_> {
	server
		.mock_async(|when, then| {
			when.method(POST).path("/api/security/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"eyXsdgbtybbeeyh\",\"expires_in\":0,\"scope\":\"api:* member-of-groups:example\",\"token_type\":\"Bearer\",\"refresh_token\":\"fgsfgsdugh8dgu9s8gy9hsg\"}",
			);
		})
		.await
}

#[tokio::test]
async fn backend_max_ttl_above_system_is_rejected() {
	let (backend, storage) = build_reqwest_test_backend();
	let err = backend
		.handle_request(write_request("config/admin", admin(json!({ "max_ttl": SYSTEM_MAX + 1 }))))
		.await
		.expect_err("Backend max_ttl above the system ceiling must be rejected.");

	assert!(matches!(err, Error::Validation(ValidationError::MaxTtlExceedsSystem { .. })));
	assert!(err.to_string().contains("exceeds system limit"));
	assert!(storage.is_empty());
}

#[tokio::test]
async fn backend_default_ttl_above_system_is_capped() {
	let (backend, _) = build_reqwest_test_backend();
	let written = backend
		.handle_request(write_request(
			"config/admin",
			admin(json!({ "default_ttl": SYSTEM_MAX + 1 })),
		))
		.await
		.expect("Default above the ceiling should be capped, not rejected.");

	assert!(!written.warnings.is_empty());

	let read = backend
		.handle_request(read_request("config/admin"))
		.await
		.expect("Reading the admin config should succeed.");

	assert_eq!(response_i64(&read, "default_ttl"), SYSTEM_MAX);
	assert_eq!(response_i64(&read, "max_ttl"), SYSTEM_MAX);
}

#[tokio::test]
async fn backend_default_ttl_above_backend_max_is_capped() {
	let (backend, _) = build_reqwest_test_backend();
	let written = backend
		.handle_request(write_request(
			"config/admin",
			admin(json!({ "max_ttl": "5m", "default_ttl": 301 })),
		))
		.await
		.expect("Default above the backend max should be capped, not rejected.");

	assert!(written.warnings.iter().any(|w| w.contains("capped to max_ttl")));

	let read = backend
		.handle_request(read_request("config/admin"))
		.await
		.expect("Reading the admin config should succeed.");

	assert_eq!(response_i64(&read, "default_ttl"), 300);
}

#[tokio::test]
async fn backend_ttls_may_equal_system_ceiling() {
	let (backend, _) = build_reqwest_test_backend();
	let written = backend
		.handle_request(write_request(
			"config/admin",
			admin(json!({ "default_ttl": SYSTEM_MAX, "max_ttl": SYSTEM_MAX })),
		))
		.await
		.expect("TTLs equal to the ceiling should be accepted.");

	assert!(written.is_empty());
}

#[tokio::test]
async fn rewriting_the_same_admin_config_is_idempotent() {
	let (backend, storage) = build_reqwest_test_backend();
	let payload = admin(json!({ "max_ttl": 600, "default_ttl": 900 }));

	backend
		.handle_request(write_request("config/admin", payload.clone()))
		.await
		.expect("First write should succeed.");

	let first = storage.get("config/admin").await.expect("Storage read should succeed.");

	backend
		.handle_request(write_request("config/admin", payload))
		.await
		.expect("Second write should succeed.");

	let second = storage.get("config/admin").await.expect("Storage read should succeed.");

	assert_eq!(first, second);
}

#[tokio::test]
async fn rewriting_the_same_role_is_idempotent() {
	let (backend, storage) = build_reqwest_test_backend();
	let role = json!({
		"username": "test-username",
		"scope": "test-scope",
		"default_ttl": "5m",
		"max_ttl": 540,
	});

	backend
		.handle_request(write_request("config/admin", admin(json!({ "max_ttl": "10m" }))))
		.await
		.expect("Admin config fixture should be accepted.");
	backend
		.handle_request(write_request("roles/test-role", role.clone()))
		.await
		.expect("First role write should succeed.");

	let first = storage.get("roles/test-role").await.expect("Storage read should succeed.");
	let first_read = backend
		.handle_request(read_request("roles/test-role"))
		.await
		.expect("Reading the role should succeed.");

	backend
		.handle_request(write_request("roles/test-role", role))
		.await
		.expect("Second role write should succeed.");

	let second = storage.get("roles/test-role").await.expect("Storage read should succeed.");
	let second_read = backend
		.handle_request(read_request("roles/test-role"))
		.await
		.expect("Reading the role should succeed.");

	assert!(first.is_some());
	assert_eq!(first, second);
	assert_eq!(response_i64(&first_read, "default_ttl"), 300);
	assert_eq!(response_i64(&first_read, "max_ttl"), 540);
	assert_eq!(response_i64(&second_read, "default_ttl"), 300);
	assert_eq!(response_i64(&second_read, "max_ttl"), 540);
}

#[tokio::test]
async fn null_ttls_restore_inheritance() {
	let backend = configured_backend(json!({ "max_ttl": "10m", "default_ttl": "5m" })).await;

	backend
		.handle_request(write_request(
			"roles/test-role",
			json!({ "username": "test-username", "scope": "test-scope", "max_ttl": "9m" }),
		))
		.await
		.expect("Role fixture should be accepted.");
	backend
		.handle_request(write_request("roles/test-role", json!({ "max_ttl": null })))
		.await
		.expect("Clearing the role max should be accepted.");

	let role = backend
		.handle_request(read_request("roles/test-role"))
		.await
		.expect("Reading the role should succeed.");

	assert_eq!(response_i64(&role, "max_ttl"), 600);
	assert_eq!(response_i64(&role, "default_ttl"), 600);
	assert_eq!(role.data["username"], "test-username");

	backend
		.handle_request(write_request(
			"config/admin",
			json!({ "max_ttl": null, "default_ttl": null }),
		))
		.await
		.expect("Clearing the backend TTLs should keep the stored credential.");

	let read = backend
		.handle_request(read_request("config/admin"))
		.await
		.expect("Reading the admin config should succeed.");

	assert_eq!(response_i64(&read, "max_ttl"), SYSTEM_MAX);
	assert_eq!(response_i64(&read, "default_ttl"), SYSTEM_MAX);
}

#[tokio::test]
async fn role_max_ttl_above_backend_max_is_rejected() {
	let backend = configured_backend(json!({ "max_ttl": 300 })).await;
	let err = backend
		.handle_request(write_request(
			"roles/test-role",
			json!({
				"role": "test-role",
				"username": "test-username",
				"scope": "test-scope",
				"max_ttl": 301,
			}),
		))
		.await
		.expect_err("Role max_ttl above the backend max must be rejected.");

	assert!(matches!(err, Error::Validation(ValidationError::RoleMaxTtlExceedsBackend { .. })));

	let missing = backend
		.handle_request(read_request("roles/test-role"))
		.await
		.expect_err("A rejected role must not be persisted.");

	assert!(missing.is_not_found());
}

#[tokio::test]
async fn default_ttl_equal_to_system_ceiling_without_backend_max() {
	let backend = configured_backend(json!({ "default_ttl": SYSTEM_MAX })).await;
	let read = backend
		.handle_request(read_request("config/admin"))
		.await
		.expect("Reading the admin config should succeed.");

	assert_eq!(response_i64(&read, "default_ttl"), SYSTEM_MAX);
}

#[tokio::test]
async fn role_default_ttl_above_role_max_is_rejected() {
	let backend = configured_backend(json!({ "max_ttl": 300 })).await;
	let err = backend
		.handle_request(write_request(
			"roles/test-role",
			json!({
				"username": "test-username",
				"scope": "test-scope",
				"max_ttl": 300,
				"default_ttl": 301,
			}),
		))
		.await
		.expect_err("Role default_ttl above the role max must be rejected.");

	assert!(matches!(err, Error::Validation(ValidationError::RoleDefaultTtlExceedsMax { .. })));
}

#[tokio::test]
async fn role_without_max_issues_with_system_ceiling() {
	let server = MockServer::start_async().await;
	let backend = configured_backend(json!({ "url": server.base_url() })).await;

	backend
		.handle_request(write_request(
			"roles/test-role",
			json!({ "username": "test-username", "scope": "test-scope" }),
		))
		.await
		.expect("Role without TTLs should be accepted.");

	let mock = mock_token(&server).await;
	let issued = backend
		.handle_request(Request::new(Operation::Write, "token/test-role"))
		.await
		.expect("Issuance should succeed.");
	let lease = issued.secret.as_ref().expect("Issuance should return a lease.");

	assert_eq!(lease.max_ttl, DEFAULT_MAX_LEASE_TTL);
	assert_eq!(lease.reported_expires_in, Some(Duration::ZERO));

	mock.assert_async().await;
}

#[tokio::test]
async fn role_max_below_backend_max_bounds_the_lease() {
	let server = MockServer::start_async().await;
	let backend = configured_backend(json!({ "url": server.base_url(), "max_ttl": "10m" })).await;

	backend
		.handle_request(write_request(
			"roles/test-role",
			json!({
				"username": "test-username",
				"scope": "test-scope",
				"refreshable": true,
				"max_ttl": "9m",
			}),
		))
		.await
		.expect("Role below the backend max should be accepted.");

	let mock = mock_token(&server).await;
	let issued = backend
		.handle_request(Request::new(Operation::Write, "token/test-role"))
		.await
		.expect("Issuance should succeed.");
	let lease = issued.secret.as_ref().expect("Issuance should return a lease.");

	assert_eq!(lease.max_ttl, Duration::minutes(9));
	assert!(lease.renewable);
	assert_eq!(response_i64(&issued, "max_ttl"), 540);

	mock.assert_async().await;
}

#[tokio::test]
async fn shrinking_ceiling_rejects_stale_backend_max_on_rewrite() {
	let system = Arc::new(StaticSystemView::new(Duration::hours(2)));
	let (backend, _) = build_reqwest_test_backend_with_system(system.clone());

	backend
		.handle_request(write_request("config/admin", admin(json!({ "max_ttl": "1h" }))))
		.await
		.expect("Backend max below the ceiling should be accepted.");

	system.set_max_lease_ttl(Duration::minutes(30));

	let read = backend
		.handle_request(read_request("config/admin"))
		.await
		.expect("Reading the admin config should succeed.");

	assert_eq!(response_i64(&read, "max_ttl"), 1_800);
	assert!(!read.warnings.is_empty());

	let err = backend
		.handle_request(write_request("config/admin", json!({ "url": "https://127.0.0.2" })))
		.await
		.expect_err("Rewriting with a stored max above the new ceiling must fail.");

	assert!(err.is_validation());
}

#[tokio::test]
async fn negative_ttls_are_rejected() {
	let (backend, _) = build_reqwest_test_backend();
	let err = backend
		.handle_request(write_request("config/admin", admin(json!({ "default_ttl": -1 }))))
		.await
		.expect_err("Negative TTLs must be rejected.");

	assert_eq!(
		err.to_string(),
		ValidationError::NegativeTtl { field: "default_ttl" }.to_string()
	);
}
