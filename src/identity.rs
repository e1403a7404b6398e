//! Bootstrap identity reporting.
//!
//! Runs before the final transport chain exists, over an auth-only client, so the lookup never
//! shows up in request logs.

// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, ServiceAccount},
	credentials::{CredentialResolver, TokenSource},
	error::ConfigError,
	http::TransportChain,
};

/// Identities observed while bootstrapping a session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IdentityReport {
	/// Email behind the initial credentials; `None` when the lookup failed.
	pub original: Option<String>,
	/// Service account assumed for API calls, when impersonating.
	pub impersonated: Option<ServiceAccount>,
}
impl IdentityReport {
	/// Identity that API calls are attributed to.
	pub fn effective(&self) -> Option<&str> {
		match &self.impersonated {
			Some(target) => Some(target.as_ref()),
			None => self.original.as_deref(),
		}
	}
}

/// Result of the bootstrap step: what was reported plus the token source for the final chain.
pub struct Bootstrap {
	/// Logged identities.
	pub identity: IdentityReport,
	/// Operational token source, impersonated when a target is configured.
	pub source: Arc<dyn TokenSource>,
}
impl Debug for Bootstrap {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Bootstrap")
			.field("identity", &self.identity)
			.field("source", &self.source.kind())
			.finish()
	}
}

/// Reports who the session acts as.
#[derive(Debug)]
pub struct IdentityLogger<'a> {
	chain: &'a TransportChain,
	userinfo: Url,
}
impl<'a> IdentityLogger<'a> {
	/// Looks identities up at `userinfo_endpoint` through auth-only clients built from `chain`.
	pub fn new(chain: &'a TransportChain, userinfo_endpoint: &str) -> Result<Self> {
		let userinfo = Url::parse(userinfo_endpoint).map_err(|_| ConfigError::InvalidEndpoint {
			name: "userinfo_endpoint",
			value: userinfo_endpoint.to_owned(),
		})?;

		Ok(Self { chain, userinfo })
	}

	/// Logs the caller identity and returns the operational token source.
	///
	/// Credential resolution failures are fatal. Identity lookup failures are logged as warnings
	/// and leave [`IdentityReport::original`] empty.
	pub async fn report(
		&self,
		resolver: &CredentialResolver,
		scopes: &ScopeSet,
	) -> Result<Bootstrap> {
		let initial = resolver.resolve(scopes, true).await?;
		let original = self.lookup(initial.clone()).await;
		let shown = original.as_deref().unwrap_or("<unknown>");

		let Some(target) = resolver.impersonation() else {
			tracing::info!(identity = shown, "Using this identity: {shown}.");

			return Ok(Bootstrap {
				identity: IdentityReport { original, impersonated: None },
				source: initial,
			});
		};

		tracing::info!(
			original = shown,
			impersonated = %target.target,
			"Configured with service account impersonation, original identity: {shown}, impersonated identity: {}.",
			target.target
		);

		let impersonated = Some(target.target.clone());
		let source = resolver.resolve(scopes, false).await?;

		Ok(Bootstrap { identity: IdentityReport { original, impersonated }, source })
	}

	async fn lookup(&self, source: Arc<dyn TokenSource>) -> Option<String> {
		match self.fetch_email(source).await {
			Ok(email) => Some(email),
			Err(e) => {
				tracing::warn!(
					error = %e,
					"Error retrieving userinfo for the configured credentials; is the `userinfo.email` scope enabled?"
				);

				None
			},
		}
	}

	async fn fetch_email(&self, source: Arc<dyn TokenSource>) -> Result<String> {
		#[derive(Deserialize)]
		struct UserInfo {
			#[serde(default)]
			email: String,
		}

		let client = self.chain.build_bootstrap(source)?;
		let info: UserInfo = client.get(self.userinfo.clone()).await?;

		if info.email.is_empty() {
			return Err(Error::UnexpectedShape {
				resource: self.userinfo.to_string(),
				reason: "userinfo response carries no email".into(),
			});
		}

		Ok(info.email)
	}
}
