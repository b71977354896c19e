//! Configures the backend against a mocked Artifactory, creates a role, issues a token, renews it,
//! and revokes it again.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde_json::json;
// self
use artifactory_secrets::{
	backend::{Operation, ReqwestBackend, Request},
	store::{MemoryStorage, Storage},
	system::{StaticSystemView, SystemView},
};

fn write(path: &str, data: serde_json::Value) -> Request {
	let request = Request::new(Operation::Write, path);

	match data {
		serde_json::Value::Object(map) => request.with_data(map),
		_ => request,
	}
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/security/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-token\",\"expires_in\":0,\"scope\":\"member-of-groups:readers\",\"token_type\":\"Bearer\"}",
			);
		})
		.await;
	let revoke_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/security/token/revoke");
			then.status(200).body("Token revoked");
		})
		.await;
	let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::default());
	let system: Arc<dyn SystemView> = Arc::new(StaticSystemView::default());
	let backend = ReqwestBackend::new(storage, system);
	let configured = backend
		.handle_request(write(
			"config/admin",
			json!({
				"access_token": "admin-token",
				"url": server.base_url(),
				"max_ttl": "1h",
				"default_ttl": "2h",
			}),
		))
		.await?;

	println!("Admin config warnings: {:?}", configured.warnings);

	backend
		.handle_request(write(
			"roles/readers",
			json!({
				"username": "ci-bot",
				"scope": "member-of-groups:readers",
				"default_ttl": "10m",
				"max_ttl": "30m",
				"refreshable": true,
			}),
		))
		.await?;

	let issued = backend.handle_request(Request::new(Operation::Write, "token/readers")).await?;
	let lease = issued.secret.ok_or_else(|| color_eyre::eyre::eyre!("Issuance returned no lease."))?;

	println!(
		"Issued lease {} for {} (ttl {}, max {}).",
		lease.lease_id, lease.username, lease.ttl, lease.max_ttl
	);

	let renewal = backend.renew(&lease).await?;

	println!("Renewal grants {} up to {}.", renewal.ttl, renewal.max_ttl);

	backend.revoke(&lease).await?;

	token_mock.assert_async().await;
	revoke_mock.assert_async().await;

	Ok(())
}
