// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use firebase_rules_client::{
	_preludet::*,
	auth::{ScopeSet, ServiceAccount},
	config::Config,
	credentials::{CredentialResolver, TokenSourceKind},
	error::CredentialError,
	http::TransportChain,
	obs::LogConfig,
};

const TARGET: &str = "deployer@demo-project.iam.gserviceaccount.com";
const DELEGATE: &str = "hop@demo-project.iam.gserviceaccount.com";

fn resolver(config: &Config) -> CredentialResolver {
	let transport = TransportChain::from_config(config, &LogConfig::default())
		.token_transport()
		.expect("Token transport should build.");

	CredentialResolver::from_config(config, transport)
}

fn impersonating(server: &MockServer) -> Config {
	Config {
		impersonate_service_account: Some(
			ServiceAccount::new(TARGET).expect("Fixture target should be valid."),
		),
		impersonate_service_account_delegates: vec![
			ServiceAccount::new(DELEGATE).expect("Fixture delegate should be valid."),
		],
		..test_config(&server.base_url())
	}
}

#[tokio::test]
async fn impersonation_mints_with_the_source_token_and_caches() {
	let server = MockServer::start_async().await;
	let config = impersonating(&server);
	let mint = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(format!("/iam/v1/projects/-/serviceAccounts/{TARGET}:generateAccessToken"))
				.header("authorization", format!("Bearer {TEST_TOKEN}"))
				.json_body(json!({
					"delegates": [format!("projects/-/serviceAccounts/{DELEGATE}")],
					"scope": [
						"https://www.googleapis.com/auth/cloud-platform",
						"https://www.googleapis.com/auth/userinfo.email"
					],
					"lifetime": "3600s"
				}));
			then.status(200).json_body(json!({
				"accessToken": "impersonated-token",
				"expireTime": "2099-01-01T00:00:00Z"
			}));
		})
		.await;
	let source = resolver(&config)
		.resolve(&ScopeSet::default_scopes(), false)
		.await
		.expect("Impersonated source should resolve.");

	assert_eq!(source.kind(), TokenSourceKind::Impersonated);

	for _ in 0..2 {
		let token = source.token().await.expect("Impersonated token should mint.");

		assert_eq!(token.secret.expose(), "impersonated-token");
	}

	mint.assert_calls_async(1).await;
}

#[tokio::test]
async fn rejected_impersonation_surfaces_the_iam_message() {
	let server = MockServer::start_async().await;
	let config = impersonating(&server);

	server
		.mock_async(|when, then| {
			when.method(POST)
				.path(format!("/iam/v1/projects/-/serviceAccounts/{TARGET}:generateAccessToken"));
			then.status(403).json_body(json!({
				"error": {
					"code": 403,
					"message": "Permission 'iam.serviceAccounts.getAccessToken' denied",
					"status": "PERMISSION_DENIED"
				}
			}));
		})
		.await;

	let source = resolver(&config)
		.resolve(&ScopeSet::default_scopes(), false)
		.await
		.expect("Resolution itself does not mint.");
	let err = source.token().await.expect_err("Rejected impersonation must fail.");

	assert!(
		matches!(
			err,
			Error::Credential(CredentialError::Exchange { status: 403, ref message, .. })
				if message.contains("iam.serviceAccounts.getAccessToken")
		),
		"Unexpected error: {err:?}"
	);
}

#[tokio::test]
async fn authorized_user_credentials_refresh_at_the_token_uri() {
	let server = MockServer::start_async().await;
	let credentials = json!({
		"type": "authorized_user",
		"client_id": "client.apps.googleusercontent.com",
		"client_secret": "client-secret",
		"refresh_token": "1//refresh",
		"token_uri": server.url("/token")
	});
	let config = Config {
		access_token: None,
		credentials: Some(credentials.to_string()),
		..test_config(&server.base_url())
	};
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/token")
				.body_includes("grant_type=refresh_token")
				.body_includes("client_id=client.apps.googleusercontent.com");
			then.status(200).json_body(json!({
				"access_token": "user-token",
				"token_type": "Bearer",
				"expires_in": 3600
			}));
		})
		.await;
	let source = resolver(&config)
		.resolve(&ScopeSet::default_scopes(), false)
		.await
		.expect("Authorized user credentials should resolve.");

	assert_eq!(source.kind(), TokenSourceKind::AuthorizedUser);

	let token = source.token().await.expect("Refresh grant should succeed.");
	let cached = source.token().await.expect("Cached token should be served.");

	refresh.assert_calls_async(1).await;
	assert_eq!(token.secret.expose(), "user-token");
	assert!(token.expires_at.is_some());
	assert_eq!(token, cached);
}

#[tokio::test]
async fn rejected_refresh_is_a_credential_error() {
	let server = MockServer::start_async().await;
	let credentials = json!({
		"type": "authorized_user",
		"client_id": "client",
		"client_secret": "secret",
		"refresh_token": "revoked",
		"token_uri": server.url("/token")
	});
	let config = Config {
		access_token: None,
		credentials: Some(credentials.to_string()),
		..test_config(&server.base_url())
	};

	server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(400).json_body(json!({
				"error": "invalid_grant",
				"error_description": "Token has been expired or revoked."
			}));
		})
		.await;

	let source = resolver(&config)
		.resolve(&ScopeSet::default_scopes(), false)
		.await
		.expect("Credentials should resolve.");
	let err = source.token().await.expect_err("Revoked refresh token must fail.");

	assert!(
		matches!(
			err,
			Error::Credential(CredentialError::Exchange { status: 400, ref message, .. })
				if message.starts_with("invalid_grant")
		),
		"Unexpected error: {err:?}"
	);
}

#[tokio::test]
async fn impersonated_credential_files_wrap_their_source() {
	let server = MockServer::start_async().await;
	let credentials = json!({
		"type": "impersonated_service_account",
		"service_account_impersonation_url": server.url(format!("/iam/v1/projects/-/serviceAccounts/{TARGET}:generateAccessToken")),
		"delegates": [],
		"source_credentials": {
			"type": "authorized_user",
			"client_id": "client",
			"client_secret": "secret",
			"refresh_token": "refresh",
			"token_uri": server.url("/token")
		}
	});
	let config = Config {
		access_token: None,
		credentials: Some(credentials.to_string()),
		..test_config(&server.base_url())
	};
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).json_body(json!({
				"access_token": "source-token",
				"token_type": "Bearer",
				"expires_in": 3600
			}));
		})
		.await;
	let mint = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(format!("/iam/v1/projects/-/serviceAccounts/{TARGET}:generateAccessToken"))
				.header("authorization", "Bearer source-token");
			then.status(200).json_body(json!({
				"accessToken": "file-impersonated",
				"expireTime": "2099-01-01T00:00:00Z"
			}));
		})
		.await;
	let source = resolver(&config)
		.resolve(&ScopeSet::default_scopes(), true)
		.await
		.expect("Impersonated credential file should resolve.");
	let token = source.token().await.expect("Chained token should mint.");

	refresh.assert_async().await;
	mint.assert_async().await;
	assert_eq!(source.kind(), TokenSourceKind::Impersonated);
	assert_eq!(token.secret.expose(), "file-impersonated");
}

#[tokio::test]
async fn configured_impersonation_wraps_credentials_documents() {
	let server = MockServer::start_async().await;
	let credentials = json!({
		"type": "authorized_user",
		"client_id": "client",
		"client_secret": "secret",
		"refresh_token": "refresh",
		"token_uri": server.url("/token")
	});
	let config = Config {
		access_token: None,
		credentials: Some(credentials.to_string()),
		..impersonating(&server)
	};
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path("/token").body_includes("grant_type=refresh_token");
			then.status(200).json_body(json!({
				"access_token": "user-token",
				"token_type": "Bearer",
				"expires_in": 3600
			}));
		})
		.await;
	let mint = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(format!("/iam/v1/projects/-/serviceAccounts/{TARGET}:generateAccessToken"))
				.header("authorization", "Bearer user-token");
			then.status(200).json_body(json!({
				"accessToken": "impersonated-from-user",
				"expireTime": "2099-01-01T00:00:00Z"
			}));
		})
		.await;
	let resolver = resolver(&config);
	let scopes = ScopeSet::default_scopes();
	let initial =
		resolver.resolve(&scopes, true).await.expect("Initial credentials should resolve.");

	assert_eq!(initial.kind(), TokenSourceKind::AuthorizedUser);

	let effective =
		resolver.resolve(&scopes, false).await.expect("Impersonated credentials should resolve.");

	assert_eq!(effective.kind(), TokenSourceKind::Impersonated);

	let token = effective.token().await.expect("Impersonated token should mint.");

	refresh.assert_calls_async(1).await;
	mint.assert_calls_async(1).await;
	assert_eq!(token.secret.expose(), "impersonated-from-user");
}
