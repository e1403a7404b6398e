// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use firebase_rules_client::{
	_preludet::*,
	auth::ProjectId,
	auth_config::{AuthConfigClient, AuthConfigUpdate},
	lock::KeyedLocks,
};

fn client(server: &MockServer) -> (AuthConfigClient, ProjectId) {
	let config = test_config(&server.base_url());
	let http = build_test_http_client(&config);
	let project = ProjectId::new("demo-project").expect("Fixture project should be valid.");

	(AuthConfigClient::new(http, config.identity_platform_base_path, KeyedLocks::default()), project)
}

#[tokio::test]
async fn read_maps_missing_email_section_to_disabled() {
	let server = MockServer::start_async().await;
	let (auth_config, project) = client(&server);
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/v2/projects/demo-project/config");
			then.status(200).json_body(json!({
				"name": "projects/demo-project/config",
				"signIn": { "anonymous": { "enabled": false } },
				"authorizedDomains": ["localhost", "demo-project.firebaseapp.com"]
			}));
		})
		.await;
	let config = auth_config
		.read(&project)
		.await
		.expect("Read should succeed.")
		.expect("Config should exist.");

	mock.assert_async().await;
	assert!(!config.email_enabled());
	assert_eq!(config.name, "projects/demo-project/config");
	assert_eq!(config.authorized_domains.len(), 2);
}

#[tokio::test]
async fn update_patches_the_masked_fields_then_reads_back() {
	let server = MockServer::start_async().await;
	let (auth_config, project) = client(&server);
	let patch = server
		.mock_async(|when, then| {
			when.method(PATCH)
				.path("/v2/projects/demo-project/config")
				.query_param("updateMask", "signIn.email,authorizedDomains")
				.json_body(json!({
					"signIn": { "email": { "enabled": true, "passwordRequired": true } },
					"authorizedDomains": ["example.com"]
				}));
			then.status(200).json_body(json!({ "name": "projects/demo-project/config" }));
		})
		.await;
	let read = server
		.mock_async(|when, then| {
			when.method(GET).path("/v2/projects/demo-project/config");
			then.status(200).json_body(json!({
				"name": "projects/demo-project/config",
				"signIn": { "email": { "enabled": true, "passwordRequired": true } },
				"authorizedDomains": ["example.com"]
			}));
		})
		.await;
	let update =
		AuthConfigUpdate { email_enabled: true, authorized_domains: vec!["example.com".into()] };
	let config = auth_config
		.apply(&project, &update)
		.await
		.expect("Update should succeed.")
		.expect("Config should exist after the update.");

	patch.assert_async().await;
	read.assert_async().await;
	assert!(config.email_enabled());
	assert_eq!(config.authorized_domains, vec!["example.com".to_owned()]);
}

#[tokio::test]
async fn missing_config_reads_as_absent() {
	let server = MockServer::start_async().await;
	let (auth_config, project) = client(&server);

	server
		.mock_async(|when, then| {
			when.path("/v2/projects/demo-project/config");
			then.status(404).json_body(json!({
				"error": { "code": 404, "message": "CONFIGURATION_NOT_FOUND", "status": "NOT_FOUND" }
			}));
		})
		.await;

	assert_eq!(auth_config.read(&project).await.expect("Not found is not an error."), None);
	assert_eq!(
		auth_config
			.update(&project, &AuthConfigUpdate::default())
			.await
			.expect("Not found is not an error."),
		None
	);
}

#[tokio::test]
async fn delete_is_a_no_op() {
	let server = MockServer::start_async().await;
	let (auth_config, project) = client(&server);
	let any = server
		.mock_async(|when, then| {
			when.path("/v2/projects/demo-project/config");
			then.status(500);
		})
		.await;

	auth_config.delete(&project).await.expect("Delete always succeeds.");
	any.assert_calls_async(0).await;
}
