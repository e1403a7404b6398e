//! Service account impersonation through IAM Credentials `generateAccessToken`.

// crates.io
use reqwest::{
	Method,
	header::{AUTHORIZATION, HeaderValue},
};
// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, ServiceAccount},
	credentials::{AccessToken, TokenCache, TokenFuture, TokenSource, TokenSourceKind},
	error::{CredentialError, TransportError},
	http::{self, Transport},
};

/// Lifetime requested for impersonated tokens.
pub const IMPERSONATED_TOKEN_LIFETIME: &str = "3600s";

const GENERATE_ACCESS_TOKEN_SUFFIX: &str = ":generateAccessToken";

/// Mints short-lived tokens for a target service account using the caller's own token as bearer.
///
/// Every identity in `delegates` must hold `roles/iam.serviceAccountTokenCreator` on the next one,
/// ending at the target.
pub struct ImpersonatedTokenSource {
	source: Arc<dyn TokenSource>,
	url: Url,
	delegates: Vec<ServiceAccount>,
	scopes: ScopeSet,
	transport: Arc<dyn Transport>,
	cache: TokenCache,
}
impl ImpersonatedTokenSource {
	/// Targets `target` through the IAM Credentials API at `iam_base_path`.
	pub fn new(
		source: Arc<dyn TokenSource>,
		target: &ServiceAccount,
		delegates: Vec<ServiceAccount>,
		scopes: ScopeSet,
		iam_base_path: &str,
		transport: Arc<dyn Transport>,
	) -> Result<Self> {
		let url = http::endpoint(
			iam_base_path,
			&format!("{}{GENERATE_ACCESS_TOKEN_SUFFIX}", target.resource_name()),
		)?;

		Ok(Self { source, url, delegates, scopes, transport, cache: TokenCache::default() })
	}

	/// Uses a full `generateAccessToken` URL, as carried by `impersonated_service_account` files.
	pub fn from_url(
		source: Arc<dyn TokenSource>,
		url: &str,
		delegates: Vec<ServiceAccount>,
		scopes: ScopeSet,
		transport: Arc<dyn Transport>,
	) -> Result<Self, CredentialError> {
		let invalid = || CredentialError::InvalidImpersonationUrl { url: url.to_owned() };
		let parsed = Url::parse(url).map_err(|_| invalid())?;

		if !parsed.path().ends_with(GENERATE_ACCESS_TOKEN_SUFFIX) {
			return Err(invalid());
		}

		Ok(Self { source, url: parsed, delegates, scopes, transport, cache: TokenCache::default() })
	}

	/// Endpoint receiving the mint requests.
	pub fn url(&self) -> &Url {
		&self.url
	}

	async fn mint(&self) -> Result<AccessToken> {
		let bearer = self.source.token().await?;
		let body = GenerateAccessTokenRequest {
			delegates: self.delegates.iter().map(ServiceAccount::resource_name).collect(),
			scope: self.scopes.as_strs(),
			lifetime: IMPERSONATED_TOKEN_LIFETIME,
		};
		let mut request = http::json_request(Method::POST, self.url.clone(), Some(&body))?;
		let mut authorization =
			HeaderValue::from_str(&bearer.secret.bearer()).map_err(CredentialError::provider)?;

		authorization.set_sensitive(true);
		request.headers_mut().insert(AUTHORIZATION, authorization);

		let response = self.transport.round_trip(request).await?;
		let status = response.status();
		let bytes = response.bytes().await.map_err(|e| TransportError::network(&self.url, e))?;

		if !status.is_success() {
			return Err(CredentialError::Exchange {
				endpoint: self.url.to_string(),
				status: status.as_u16(),
				message: http::error_message(&bytes),
			}
			.into());
		}

		let minted: GenerateAccessTokenResponse = http::decode_json(&self.url, &bytes)?;

		tracing::debug!(
			url = %self.url,
			expires_at = %minted.expire_time,
			"Minted impersonated token."
		);

		Ok(AccessToken::new(minted.access_token).with_expiry(minted.expire_time))
	}
}
impl TokenSource for ImpersonatedTokenSource {
	fn token(&self) -> TokenFuture<'_> {
		Box::pin(self.cache.get_or_fetch(self.mint()))
	}

	fn kind(&self) -> TokenSourceKind {
		TokenSourceKind::Impersonated
	}
}
impl Debug for ImpersonatedTokenSource {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ImpersonatedTokenSource")
			.field("url", &self.url.as_str())
			.field("delegates", &self.delegates)
			.field("source", &self.source.kind())
			.finish_non_exhaustive()
	}
}

#[derive(Serialize)]
struct GenerateAccessTokenRequest<'a> {
	#[serde(skip_serializing_if = "Vec::is_empty")]
	delegates: Vec<String>,
	scope: Vec<&'a str>,
	lifetime: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateAccessTokenResponse {
	access_token: String,
	#[serde(with = "time::serde::rfc3339")]
	expire_time: OffsetDateTime,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{_preludet::*, credentials::StaticTokenSource, http::TransportChain, obs::LogConfig};

	fn transport() -> Arc<dyn Transport> {
		TransportChain::from_config(&test_config("http://127.0.0.1:1"), &LogConfig::default())
			.token_transport()
			.expect("Token transport should build.")
	}

	#[test]
	fn target_url_uses_project_wildcard() {
		let target = ServiceAccount::new("deployer@demo.iam.gserviceaccount.com")
			.expect("Fixture service account should be valid.");
		let source = ImpersonatedTokenSource::new(
			Arc::new(StaticTokenSource::new("t")),
			&target,
			Vec::new(),
			ScopeSet::default_scopes(),
			"https://iamcredentials.googleapis.com/v1/",
			transport(),
		)
		.expect("Impersonated source should build.");

		assert_eq!(
			source.url().as_str(),
			"https://iamcredentials.googleapis.com/v1/projects/-/serviceAccounts/deployer@demo.iam.gserviceaccount.com:generateAccessToken"
		);
		assert_eq!(source.kind(), TokenSourceKind::Impersonated);
	}

	#[test]
	fn file_urls_must_target_generate_access_token() {
		let build = |url: &str| {
			ImpersonatedTokenSource::from_url(
				Arc::new(StaticTokenSource::new("t")),
				url,
				Vec::new(),
				ScopeSet::default_scopes(),
				transport(),
			)
		};

		assert!(build("https://iamcredentials.googleapis.com/v1/projects/-/serviceAccounts/a@b:generateAccessToken").is_ok());
		assert!(matches!(
			build("https://iamcredentials.googleapis.com/v1/projects/-/serviceAccounts/a@b"),
			Err(CredentialError::InvalidImpersonationUrl { .. })
		));
		assert!(build("::").is_err());
	}

	#[test]
	fn request_body_carries_delegate_resource_names() {
		let body = GenerateAccessTokenRequest {
			delegates: vec!["projects/-/serviceAccounts/hop@p.iam.gserviceaccount.com".into()],
			scope: vec!["https://www.googleapis.com/auth/cloud-platform"],
			lifetime: IMPERSONATED_TOKEN_LIFETIME,
		};
		let json = serde_json::to_value(&body).expect("Body should serialize.");

		assert_eq!(json["lifetime"], "3600s");
		assert_eq!(json["delegates"][0], "projects/-/serviceAccounts/hop@p.iam.gserviceaccount.com");

		let empty = GenerateAccessTokenRequest { delegates: Vec::new(), ..body };

		assert!(serde_json::to_value(&empty).expect("Body should serialize.").get("delegates").is_none());
	}
}
