//! Deploys Firestore rules against a local mock of the Firebase Rules API and prints the live
//! ruleset read back from the server.
//!
//! Pass a rules file path as the first argument to deploy its contents instead of the built-in
//! sample.

// std
use std::{env, fs};
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde_json::json;
// self
use firebase_rules_client::{
	config::{Config, ProcessEnv},
	obs::LogConfig,
	rules::RuleFamily,
	session::Session,
};

const SAMPLE_RULES: &str = "rules_version = '2';\nservice cloud.firestore {\n  match /databases/{database}/documents {\n    match /{document=**} {\n      allow read, write: if false;\n    }\n  }\n}\n";

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;
	LogConfig::from_env().init()?;

	let content = match env::args().nth(1) {
		Some(path) => fs::read_to_string(path)?,
		None => SAMPLE_RULES.to_owned(),
	};
	let server = MockServer::start_async().await;
	let ruleset = "projects/demo-project/rulesets/demo-ruleset";
	let release = "projects/demo-project/releases/cloud.firestore";
	let userinfo = server
		.mock_async(|when, then| {
			when.method(GET).path("/userinfo");
			then.status(200).json_body(json!({ "email": "demo@example.com" }));
		})
		.await;
	let create = server
		.mock_async(|when, then| {
			when.method(POST).path("/v1/projects/demo-project/rulesets");
			then.status(200).json_body(json!({
				"name": ruleset,
				"source": { "files": [{ "name": "firestore.rules", "content": content }] },
				"createTime": "2026-01-01T00:00:00Z"
			}));
		})
		.await;
	let patch = server
		.mock_async(|when, then| {
			when.method(PATCH).path(format!("/v1/{release}"));
			then.status(200).json_body(json!({
				"name": release,
				"rulesetName": ruleset,
				"createTime": "2026-01-01T00:00:00Z"
			}));
		})
		.await;
	let list = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/projects/demo-project/releases");
			then.status(200).json_body(json!({
				"releases": [{
					"name": release,
					"rulesetName": ruleset,
					"createTime": "2026-01-01T00:00:00Z"
				}]
			}));
		})
		.await;
	let get = server
		.mock_async(|when, then| {
			when.method(GET).path(format!("/v1/{ruleset}"));
			then.status(200).json_body(json!({
				"name": ruleset,
				"source": { "files": [{ "name": "firestore.rules", "content": content }] }
			}));
		})
		.await;
	let base = server.base_url();
	let config = Config {
		access_token: Some("demo-access".into()),
		project: Some("demo-project".into()),
		rules_base_path: format!("{base}/v1/"),
		userinfo_endpoint: format!("{base}/userinfo"),
		..Config::default()
	}
	.with_env_defaults(&ProcessEnv)?;
	let session = Session::load(config).await?;
	let project = session.project(None)?;
	let state = session.rules().apply(&project, RuleFamily::Firestore, &content).await?;

	match state {
		Some(state) => println!("Live ruleset {}:\n{}", state.ruleset_name, state.content),
		None => println!("No live ruleset after the deploy."),
	}

	userinfo.assert_async().await;
	create.assert_async().await;
	patch.assert_async().await;
	list.assert_async().await;
	get.assert_async().await;

	Ok(())
}
