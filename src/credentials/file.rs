//! Credentials JSON documents and inline-or-path loading.

// std
use std::{fs, path::PathBuf};
// crates.io
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, ServiceAccount},
	credentials::{
		AuthorizedUserTokenSource, ImpersonatedTokenSource, ServiceAccountTokenSource, TokenSource,
	},
	error::CredentialError,
	http::Transport,
};

/// Default Google OAuth token endpoint for refresh-token grants.
pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Returns the file contents when `raw` names an existing file (with `~/` expansion), otherwise
/// `raw` itself.
pub fn path_or_contents(raw: &str) -> Result<String, CredentialError> {
	let path = expand_home(raw);

	match fs::metadata(&path) {
		Ok(meta) if meta.is_file() => fs::read_to_string(&path)
			.map_err(|source| CredentialError::Read { path: path.display().to_string(), source }),
		_ => Ok(raw.to_owned()),
	}
}

/// Parsed credentials document, discriminated by its `type` field.
#[derive(Clone, Debug)]
pub enum CredentialsFile {
	/// `service_account` key; the original JSON is kept for the token provider.
	ServiceAccount {
		/// Service account email.
		client_email: String,
		/// Raw key document.
		raw: String,
	},
	/// `authorized_user` refresh-token credentials.
	AuthorizedUser(AuthorizedUserKey),
	/// `impersonated_service_account` document wrapping source credentials.
	ImpersonatedServiceAccount {
		/// Full `generateAccessToken` URL of the target.
		service_account_impersonation_url: String,
		/// Ordered delegation chain.
		delegates: Vec<ServiceAccount>,
		/// Credentials the impersonation starts from.
		source_credentials: Box<CredentialsFile>,
	},
}
impl CredentialsFile {
	/// Parses a credentials document; `content` is echoed in errors for diagnostics.
	pub fn parse(content: &str) -> Result<Self, CredentialError> {
		let de = &mut serde_json::Deserializer::from_str(content);
		let value: Value = serde_path_to_error::deserialize(de).map_err(|source| {
			CredentialError::MalformedJson { content: content.to_owned(), source }
		})?;

		Self::from_value(value, content)
	}

	fn from_value(value: Value, content: &str) -> Result<Self, CredentialError> {
		let malformed =
			|source| CredentialError::MalformedJson { content: content.to_owned(), source };
		let tag: TypeTag = serde_path_to_error::deserialize(&value).map_err(malformed)?;

		match tag.kind.as_str() {
			"service_account" => {
				let key: ServiceAccountKey =
					serde_path_to_error::deserialize(&value).map_err(malformed)?;

				Ok(Self::ServiceAccount { client_email: key.client_email, raw: value.to_string() })
			},
			"authorized_user" =>
				Ok(Self::AuthorizedUser(serde_path_to_error::deserialize(&value).map_err(malformed)?)),
			"impersonated_service_account" => {
				let key: ImpersonatedKey =
					serde_path_to_error::deserialize(&value).map_err(malformed)?;
				let delegates = key
					.delegates
					.iter()
					.map(|delegate| delegate.rsplit('/').next().unwrap_or(delegate))
					.map(ServiceAccount::new)
					.collect::<Result<Vec<_>, _>>()
					.map_err(|_| CredentialError::InvalidImpersonationUrl {
						url: key.service_account_impersonation_url.clone(),
					})?;

				Ok(Self::ImpersonatedServiceAccount {
					service_account_impersonation_url: key.service_account_impersonation_url,
					delegates,
					source_credentials: Box::new(Self::from_value(key.source_credentials, content)?),
				})
			},
			other => Err(CredentialError::UnsupportedType { kind: other.to_owned() }),
		}
	}

	/// Builds the token source this document describes.
	pub fn into_source(
		self,
		scopes: &ScopeSet,
		transport: &Arc<dyn Transport>,
	) -> Result<Arc<dyn TokenSource>> {
		let source: Arc<dyn TokenSource> = match self {
			Self::ServiceAccount { raw, .. } =>
				Arc::new(ServiceAccountTokenSource::from_json(&raw, scopes.clone())?),
			Self::AuthorizedUser(key) =>
				Arc::new(AuthorizedUserTokenSource::new(key, transport.clone())?),
			Self::ImpersonatedServiceAccount {
				service_account_impersonation_url,
				delegates,
				source_credentials,
			} => {
				let inner = source_credentials.into_source(scopes, transport)?;

				Arc::new(ImpersonatedTokenSource::from_url(
					inner,
					&service_account_impersonation_url,
					delegates,
					scopes.clone(),
					transport.clone(),
				)?)
			},
		};

		Ok(source)
	}
}

/// Fields of an `authorized_user` document.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct AuthorizedUserKey {
	/// OAuth client identifier.
	pub client_id: String,
	/// OAuth client secret.
	pub client_secret: String,
	/// Long-lived refresh token.
	pub refresh_token: String,
	/// Token endpoint.
	#[serde(default = "default_token_uri")]
	pub token_uri: String,
}
impl Debug for AuthorizedUserKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthorizedUserKey")
			.field("client_id", &self.client_id)
			.field("token_uri", &self.token_uri)
			.finish_non_exhaustive()
	}
}

#[derive(Deserialize)]
struct TypeTag {
	#[serde(rename = "type")]
	kind: String,
}

#[derive(Deserialize)]
struct ServiceAccountKey {
	client_email: String,
	#[allow(dead_code)]
	private_key: String,
}

#[derive(Deserialize)]
struct ImpersonatedKey {
	service_account_impersonation_url: String,
	#[serde(default)]
	delegates: Vec<String>,
	source_credentials: Value,
}

fn default_token_uri() -> String {
	GOOGLE_TOKEN_URI.into()
}

fn expand_home(raw: &str) -> PathBuf {
	if let Some(rest) = raw.strip_prefix("~/")
		&& let Some(home) = std::env::var_os("HOME")
	{
		return PathBuf::from(home).join(rest);
	}

	PathBuf::from(raw)
}
