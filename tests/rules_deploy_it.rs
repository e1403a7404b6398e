// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use firebase_rules_client::{
	_preludet::*,
	auth::ProjectId,
	error::{DeploymentError, DeploymentPhase},
	lock::KeyedLocks,
	rules::{RuleFamily, RuleState, RulesClient},
};

const FIRESTORE_RULES: &str = "rules_version = '2';\nservice cloud.firestore {\n  match /databases/{database}/documents {\n    match /{document=**} {\n      allow read, write: if false;\n    }\n  }\n}\n";

fn client(server: &MockServer) -> (RulesClient, ProjectId) {
	let config = test_config(&server.base_url());
	let http = build_test_http_client(&config);
	let project = ProjectId::new("demo-project").expect("Fixture project should be valid.");

	(RulesClient::new(http, config.rules_base_path, KeyedLocks::default()), project)
}

fn bearer() -> String {
	format!("Bearer {TEST_TOKEN}")
}

#[tokio::test]
async fn deploy_then_read_returns_the_deployed_text() {
	let server = MockServer::start_async().await;
	let (rules, project) = client(&server);
	let create = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/v1/projects/demo-project/rulesets")
				.header("authorization", bearer())
				.json_body(json!({
					"source": { "files": [{ "name": "firestore.rules", "content": FIRESTORE_RULES }] }
				}));
			then.status(200).json_body(json!({
				"name": "projects/demo-project/rulesets/new-ruleset",
				"source": { "files": [{ "name": "firestore.rules", "content": FIRESTORE_RULES }] },
				"createTime": "2024-05-01T10:00:00.000000Z"
			}));
		})
		.await;
	let release = server
		.mock_async(|when, then| {
			when.method(PATCH)
				.path("/v1/projects/demo-project/releases/cloud.firestore")
				.query_param("updateMask", "rulesetName")
				.json_body(json!({
					"release": {
						"name": "projects/demo-project/releases/cloud.firestore",
						"rulesetName": "projects/demo-project/rulesets/new-ruleset"
					},
					"updateMask": "rulesetName"
				}));
			then.status(200).json_body(json!({
				"name": "projects/demo-project/releases/cloud.firestore",
				"rulesetName": "projects/demo-project/rulesets/new-ruleset",
				"createTime": "2021-12-15T18:57:44.361618Z",
				"updateTime": "2024-05-01T10:00:01.000000Z"
			}));
		})
		.await;
	let list = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/projects/demo-project/releases");
			then.status(200).json_body(json!({
				"releases": [
					{
						"name": "projects/demo-project/releases/cloud.firestore-old",
						"rulesetName": "projects/demo-project/rulesets/old-ruleset",
						"createTime": "2021-12-15T18:57:44.361618Z"
					},
					{
						"name": "projects/demo-project/releases/cloud.firestore",
						"rulesetName": "projects/demo-project/rulesets/new-ruleset",
						"createTime": "2024-05-01T10:00:00.500000Z"
					},
					{
						"name": "projects/demo-project/releases/firebase.storage/demo-project.appspot.com",
						"rulesetName": "projects/demo-project/rulesets/storage-ruleset",
						"createTime": "2025-01-01T00:00:00Z"
					}
				]
			}));
		})
		.await;
	let fetch = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/projects/demo-project/rulesets/new-ruleset");
			then.status(200).json_body(json!({
				"name": "projects/demo-project/rulesets/new-ruleset",
				"source": { "files": [{ "name": "firestore.rules", "content": FIRESTORE_RULES, "fingerprint": "abc=" }] },
				"createTime": "2024-05-01T10:00:00.000000Z"
			}));
		})
		.await;
	let state = rules
		.apply(&project, RuleFamily::Firestore, FIRESTORE_RULES)
		.await
		.expect("Deployment should succeed.");

	create.assert_async().await;
	release.assert_async().await;
	list.assert_async().await;
	fetch.assert_async().await;
	assert_eq!(
		state,
		Some(RuleState {
			ruleset_name: "projects/demo-project/rulesets/new-ruleset".into(),
			content: FIRESTORE_RULES.into(),
		})
	);
}

#[tokio::test]
async fn storage_rules_release_through_the_default_bucket() {
	let server = MockServer::start_async().await;
	let (rules, project) = client(&server);
	let create = server
		.mock_async(|when, then| {
			when.method(POST).path("/v1/projects/demo-project/rulesets");
			then.status(200).json_body(json!({
				"name": "projects/demo-project/rulesets/storage-ruleset",
				"source": { "files": [{ "name": "storage.rules", "content": "service firebase.storage {}" }] }
			}));
		})
		.await;
	let release = server
		.mock_async(|when, then| {
			when.method(PATCH)
				.path("/v1/projects/demo-project/releases/firebase.storage/demo-project.appspot.com");
			then.status(200).json_body(json!({
				"name": "projects/demo-project/releases/firebase.storage/demo-project.appspot.com",
				"rulesetName": "projects/demo-project/rulesets/storage-ruleset",
				"createTime": "2021-12-15T02:42:56.748909Z"
			}));
		})
		.await;
	let released = rules
		.deploy(&project, RuleFamily::Storage, "service firebase.storage {}")
		.await
		.expect("Storage deployment should succeed.");

	create.assert_async().await;
	release.assert_async().await;
	assert_eq!(released.ruleset_name, "projects/demo-project/rulesets/storage-ruleset");
}

#[tokio::test]
async fn failed_create_never_touches_the_release() {
	let server = MockServer::start_async().await;
	let (rules, project) = client(&server);
	let create = server
		.mock_async(|when, then| {
			when.method(POST).path("/v1/projects/demo-project/rulesets");
			then.status(400).json_body(json!({
				"error": { "code": 400, "message": "Syntax error on line 2.", "status": "INVALID_ARGUMENT" }
			}));
		})
		.await;
	let release = server
		.mock_async(|when, then| {
			when.method(PATCH).path("/v1/projects/demo-project/releases/cloud.firestore");
			then.status(200);
		})
		.await;
	let err = rules
		.deploy(&project, RuleFamily::Firestore, "not rules")
		.await
		.expect_err("Rejected ruleset must fail the deployment.");

	create.assert_async().await;
	release.assert_calls_async(0).await;

	match err {
		Error::Deployment(DeploymentError { phase, ruleset, source }) => {
			assert_eq!(phase, DeploymentPhase::Create);
			assert_eq!(ruleset, None);
			assert!(
				matches!(*source, Error::Api { status: 400, ref message, .. } if message == "Syntax error on line 2."),
				"Unexpected source: {source:?}"
			);
		},
		other => panic!("Unexpected error: {other:?}"),
	}
}

#[tokio::test]
async fn failed_release_reports_the_orphaned_ruleset() {
	let server = MockServer::start_async().await;
	let (rules, project) = client(&server);

	server
		.mock_async(|when, then| {
			when.method(POST).path("/v1/projects/demo-project/rulesets");
			then.status(200).json_body(json!({
				"name": "projects/demo-project/rulesets/orphan",
				"source": { "files": [{ "name": "firestore.rules", "content": FIRESTORE_RULES }] }
			}));
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(PATCH).path("/v1/projects/demo-project/releases/cloud.firestore");
			then.status(403).json_body(json!({
				"error": { "code": 403, "message": "The caller does not have permission", "status": "PERMISSION_DENIED" }
			}));
		})
		.await;

	let err = rules
		.deploy(&project, RuleFamily::Firestore, FIRESTORE_RULES)
		.await
		.expect_err("Rejected release must fail the deployment.");

	match err {
		Error::Deployment(err) => {
			assert_eq!(err.phase, DeploymentPhase::Release);
			assert_eq!(err.ruleset.as_deref(), Some("projects/demo-project/rulesets/orphan"));
			assert!(err.to_string().contains("projects/demo-project/rulesets/orphan"));
		},
		other => panic!("Unexpected error: {other:?}"),
	}
}

#[tokio::test]
async fn read_follows_release_pages() {
	let server = MockServer::start_async().await;
	let (rules, project) = client(&server);
	let second = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/v1/projects/demo-project/releases")
				.query_param("pageToken", "page-2");
			then.status(200).json_body(json!({
				"releases": [{
					"name": "projects/demo-project/releases/firebase.storage/demo-project.appspot.com",
					"rulesetName": "projects/demo-project/rulesets/cf5bfeae-f139-4c2e-9d05-2805ab316a2f",
					"createTime": "2021-12-15T02:42:56.748909Z"
				}]
			}));
		})
		.await;
	let first = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/v1/projects/demo-project/releases")
				.query_param_missing("pageToken");
			then.status(200).json_body(json!({
				"releases": [{
					"name": "projects/demo-project/releases/cloud.firestore",
					"rulesetName": "projects/demo-project/rulesets/016ba66a-680d-4b81-9217-5c754f558abd",
					"createTime": "2021-12-15T18:57:44.361618Z"
				}],
				"nextPageToken": "page-2"
			}));
		})
		.await;
	let ruleset = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/v1/projects/demo-project/rulesets/cf5bfeae-f139-4c2e-9d05-2805ab316a2f");
			then.status(200).json_body(json!({
				"name": "projects/demo-project/rulesets/cf5bfeae-f139-4c2e-9d05-2805ab316a2f",
				"source": { "files": [{ "name": "storage.rules", "content": "service firebase.storage {}" }] }
			}));
		})
		.await;
	let state = rules
		.read(&project, RuleFamily::Storage)
		.await
		.expect("Read should succeed.")
		.expect("Storage rules should be released.");

	first.assert_async().await;
	second.assert_async().await;
	ruleset.assert_async().await;
	assert_eq!(state.content, "service firebase.storage {}");
}

#[tokio::test]
async fn read_reports_absence_instead_of_failing() {
	let server = MockServer::start_async().await;
	let (rules, project) = client(&server);

	server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/projects/demo-project/releases");
			then.status(200).json_body(json!({
				"releases": [{
					"name": "projects/demo-project/releases/cloud.firestore",
					"rulesetName": "projects/demo-project/rulesets/gone",
					"createTime": "2021-12-15T18:57:44.361618Z"
				}]
			}));
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/projects/demo-project/rulesets/gone");
			then.status(404).json_body(json!({
				"error": { "code": 404, "message": "Ruleset not found.", "status": "NOT_FOUND" }
			}));
		})
		.await;

	assert_eq!(
		rules.read(&project, RuleFamily::Storage).await.expect("Missing family is not an error."),
		None
	);
	assert_eq!(
		rules.read(&project, RuleFamily::Firestore).await.expect("Vanished ruleset is not an error."),
		None
	);
}

#[tokio::test]
async fn rulesets_without_files_are_rejected() {
	let server = MockServer::start_async().await;
	let (rules, project) = client(&server);

	server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/projects/demo-project/releases");
			then.status(200).json_body(json!({
				"releases": [{
					"name": "projects/demo-project/releases/cloud.firestore",
					"rulesetName": "projects/demo-project/rulesets/empty",
					"createTime": "2021-12-15T18:57:44.361618Z"
				}]
			}));
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/projects/demo-project/rulesets/empty");
			then.status(200).json_body(json!({
				"name": "projects/demo-project/rulesets/empty",
				"source": { "files": [] }
			}));
		})
		.await;

	let err = rules
		.read(&project, RuleFamily::Firestore)
		.await
		.expect_err("A ruleset without files cannot be read back.");

	assert!(matches!(err, Error::UnexpectedShape { .. }), "Unexpected error: {err:?}");
}

#[tokio::test]
async fn delete_leaves_server_state_unchanged() {
	let server = MockServer::start_async().await;
	let (rules, project) = client(&server);
	let list = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/projects/demo-project/releases");
			then.status(200).json_body(json!({
				"releases": [{
					"name": "projects/demo-project/releases/cloud.firestore",
					"rulesetName": "projects/demo-project/rulesets/live",
					"createTime": "2021-12-15T18:57:44.361618Z"
				}]
			}));
		})
		.await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/projects/demo-project/rulesets/live");
			then.status(200).json_body(json!({
				"name": "projects/demo-project/rulesets/live",
				"source": { "files": [{ "name": "firestore.rules", "content": FIRESTORE_RULES }] }
			}));
		})
		.await;

	let creates = server
		.mock_async(|when, then| {
			when.method(POST);
			then.status(500);
		})
		.await;
	let patches = server
		.mock_async(|when, then| {
			when.method(PATCH);
			then.status(500);
		})
		.await;
	let deletes = server
		.mock_async(|when, then| {
			when.method(DELETE);
			then.status(500);
		})
		.await;
	let before = rules.read(&project, RuleFamily::Firestore).await.expect("Read should succeed.");

	rules.delete(&project, RuleFamily::Firestore).await.expect("Delete always succeeds.");

	let after = rules.read(&project, RuleFamily::Firestore).await.expect("Read should succeed.");

	assert_eq!(before, after);
	assert!(before.is_some());
	list.assert_calls_async(2).await;
	creates.assert_calls_async(0).await;
	patches.assert_calls_async(0).await;
	deletes.assert_calls_async(0).await;
}
