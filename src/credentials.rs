//! Credential resolution: turns configured secrets and ambient defaults into a [`TokenSource`].
//!
//! [`CredentialResolver::resolve`] walks [`CredentialStrategy::CONDITIONAL`] and the first strategy
//! that applies wins, falling back to [`CredentialStrategy::FALLBACK`]:
//!
//! 1. a static access token (inline or path-referenced),
//! 2. a credentials JSON document (inline or path-referenced),
//! 3. impersonation of ambient credentials, when only a target is configured,
//! 4. ambient default credentials.
//!
//! Strategies 1 and 2 are re-wrapped in an [`ImpersonatedTokenSource`] when impersonation is
//! configured, unless the caller asks for the initial credentials only. Identity reporting relies
//! on that switch to learn the pre-impersonation caller.

pub mod ambient;
pub mod file;
pub mod impersonate;
pub mod service_account;
pub mod user;

pub use ambient::*;
pub use file::*;
pub use impersonate::*;
pub use service_account::*;
pub use user::*;

// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, ServiceAccount, TokenSecret},
	config::Config,
	http::Transport,
};

/// Boxed future resolving to an access token.
pub type TokenFuture<'a> = Pin<Box<dyn Future<Output = Result<AccessToken>> + 'a + Send>>;

/// Tokens expiring within this window are refreshed before use.
pub const TOKEN_REFRESH_MARGIN: Duration = Duration::seconds(60);

/// Bearer token plus its expiry when the issuer reported one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessToken {
	/// The bearer secret.
	pub secret: TokenSecret,
	/// Absolute expiry; `None` when the source manages freshness itself.
	pub expires_at: Option<OffsetDateTime>,
}
impl AccessToken {
	/// Token without a known expiry.
	pub fn new(secret: impl Into<String>) -> Self {
		Self { secret: TokenSecret::new(secret), expires_at: None }
	}

	/// Sets the absolute expiry.
	pub fn with_expiry(mut self, expires_at: OffsetDateTime) -> Self {
		self.expires_at = Some(expires_at);

		self
	}

	/// Returns `true` when the token outlives `now + margin`.
	pub fn is_fresh_at(&self, now: OffsetDateTime, margin: Duration) -> bool {
		self.expires_at.is_none_or(|expires_at| expires_at - margin > now)
	}
}

/// Kind of credential backing a token source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenSourceKind {
	/// Static access token.
	Static,
	/// Service account key.
	ServiceAccount,
	/// OAuth refresh token of an end user.
	AuthorizedUser,
	/// Short-lived token minted by impersonating a service account.
	Impersonated,
	/// Ambient application default credentials.
	AmbientDefault,
}

/// Mints bearer tokens for outbound requests.
pub trait TokenSource
where
	Self: 'static + Send + Sync,
{
	/// Returns a token valid for at least the next request.
	fn token(&self) -> TokenFuture<'_>;

	/// Kind of credential behind this source.
	fn kind(&self) -> TokenSourceKind;
}

/// Source returning a fixed, caller-supplied access token.
#[derive(Clone, Debug)]
pub struct StaticTokenSource {
	token: AccessToken,
}
impl StaticTokenSource {
	/// Wraps a raw access token.
	pub fn new(token: impl Into<String>) -> Self {
		Self { token: AccessToken::new(token) }
	}
}
impl TokenSource for StaticTokenSource {
	fn token(&self) -> TokenFuture<'_> {
		Box::pin(async move { Ok(self.token.clone()) })
	}

	fn kind(&self) -> TokenSourceKind {
		TokenSourceKind::Static
	}
}

/// Single-flight cache for short-lived tokens.
#[derive(Debug, Default)]
pub(crate) struct TokenCache {
	slot: AsyncMutex<Option<AccessToken>>,
}
impl TokenCache {
	/// Returns the cached token while fresh, otherwise awaits `fetch` under the lock.
	pub(crate) async fn get_or_fetch<F>(&self, fetch: F) -> Result<AccessToken>
	where
		F: Future<Output = Result<AccessToken>>,
	{
		let mut slot = self.slot.lock().await;

		if let Some(token) = slot.as_ref()
			&& token.is_fresh_at(OffsetDateTime::now_utc(), TOKEN_REFRESH_MARGIN)
		{
			return Ok(token.clone());
		}

		let token = fetch.await?;

		*slot = Some(token.clone());

		Ok(token)
	}
}

/// One rule of the credential precedence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CredentialStrategy {
	/// Static access token from configuration.
	AccessToken,
	/// Credentials JSON document from configuration.
	CredentialsJson,
	/// Impersonation target configured without explicit credentials.
	ImpersonationOnly,
	/// Ambient application default credentials.
	AmbientDefault,
}
impl CredentialStrategy {
	/// Strategies that apply only when their inputs are configured, first match wins.
	pub const CONDITIONAL: [Self; 3] =
		[Self::AccessToken, Self::CredentialsJson, Self::ImpersonationOnly];
	/// Strategy used when no conditional one applies.
	pub const FALLBACK: Self = Self::AmbientDefault;
}

/// Impersonation target plus its delegation chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImpersonationTarget {
	/// Service account whose identity is assumed.
	pub target: ServiceAccount,
	/// Ordered intermediate identities, each allowed to impersonate the next.
	pub delegates: Vec<ServiceAccount>,
}

/// Resolves configured credentials into a token source.
pub struct CredentialResolver {
	access_token: Option<String>,
	credentials: Option<String>,
	impersonation: Option<ImpersonationTarget>,
	iam_base_path: String,
	transport: Arc<dyn Transport>,
	ambient: Arc<dyn AmbientProvider>,
}
impl CredentialResolver {
	/// Captures the credential inputs of `config`; `transport` carries token exchanges.
	pub fn from_config(config: &Config, transport: Arc<dyn Transport>) -> Self {
		Self {
			access_token: config.access_token.clone().filter(|token| !token.is_empty()),
			credentials: config.credentials.clone().filter(|credentials| !credentials.is_empty()),
			impersonation: config.impersonate_service_account.clone().map(|target| {
				ImpersonationTarget {
					target,
					delegates: config.impersonate_service_account_delegates.clone(),
				}
			}),
			iam_base_path: config.iam_credentials_base_path.clone(),
			transport,
			ambient: Arc::new(GcpAmbientProvider::default()),
		}
	}

	/// Replaces the ambient default-credentials provider.
	pub fn with_ambient_provider(mut self, ambient: Arc<dyn AmbientProvider>) -> Self {
		self.ambient = ambient;

		self
	}

	/// Returns the configured impersonation target, if any.
	pub fn impersonation(&self) -> Option<&ImpersonationTarget> {
		self.impersonation.as_ref()
	}

	/// Resolves a token source for `scopes`.
	///
	/// With `initial_only` set, impersonation is skipped so the caller receives the credentials the
	/// impersonation would start from.
	pub async fn resolve(
		&self,
		scopes: &ScopeSet,
		initial_only: bool,
	) -> Result<Arc<dyn TokenSource>> {
		for strategy in CredentialStrategy::CONDITIONAL {
			if let Some(source) = self.apply(strategy, scopes, initial_only).await? {
				tracing::debug!(
					?strategy,
					kind = ?source.kind(),
					initial_only,
					"Resolved credentials."
				);

				return Ok(source);
			}
		}

		let source = self.ambient.discover(scopes).await?;

		tracing::debug!(
			strategy = ?CredentialStrategy::FALLBACK,
			kind = ?source.kind(),
			initial_only,
			"Resolved credentials."
		);

		Ok(source)
	}

	/// Runs one strategy; `None` means it does not apply to the current configuration.
	pub async fn apply(
		&self,
		strategy: CredentialStrategy,
		scopes: &ScopeSet,
		initial_only: bool,
	) -> Result<Option<Arc<dyn TokenSource>>> {
		let source = match strategy {
			CredentialStrategy::AccessToken => {
				let Some(raw) = &self.access_token else { return Ok(None) };
				let token = path_or_contents(raw)?;

				Arc::new(StaticTokenSource::new(token.trim())) as Arc<dyn TokenSource>
			},
			CredentialStrategy::CredentialsJson => {
				let Some(raw) = &self.credentials else { return Ok(None) };
				let content = path_or_contents(raw)?;

				CredentialsFile::parse(&content)?.into_source(scopes, &self.transport)?
			},
			CredentialStrategy::ImpersonationOnly => {
				if self.impersonation.is_none() || initial_only {
					return Ok(None);
				}

				let ambient = self.ambient.discover(scopes).await?;

				return Ok(Some(self.impersonate(ambient, scopes)?));
			},
			CredentialStrategy::AmbientDefault =>
				return Ok(Some(self.ambient.discover(scopes).await?)),
		};

		if initial_only || self.impersonation.is_none() {
			return Ok(Some(source));
		}

		Ok(Some(self.impersonate(source, scopes)?))
	}

	fn impersonate(
		&self,
		source: Arc<dyn TokenSource>,
		scopes: &ScopeSet,
	) -> Result<Arc<dyn TokenSource>> {
		let Some(target) = &self.impersonation else { return Ok(source) };
		let impersonated = ImpersonatedTokenSource::new(
			source,
			&target.target,
			target.delegates.clone(),
			scopes.clone(),
			&self.iam_base_path,
			self.transport.clone(),
		)?;

		Ok(Arc::new(impersonated))
	}
}
impl Debug for CredentialResolver {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialResolver")
			.field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
			.field("credentials", &self.credentials.as_ref().map(|_| "<redacted>"))
			.field("impersonation", &self.impersonation)
			.field("iam_base_path", &self.iam_base_path)
			.finish_non_exhaustive()
	}
}
