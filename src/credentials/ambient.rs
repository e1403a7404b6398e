//! Ambient application default credentials.

// crates.io
use gcp_auth::TokenProvider;
// self
use crate::{
	_prelude::*,
	auth::ScopeSet,
	credentials::{AccessToken, TokenFuture, TokenSource, TokenSourceKind},
	error::CredentialError,
};

/// Boxed future resolving to the discovered ambient token source.
pub type AmbientFuture<'a> =
	Pin<Box<dyn Future<Output = Result<Arc<dyn TokenSource>>> + 'a + Send>>;

/// Discovers credentials from the environment (ADC file, gcloud, metadata server).
pub trait AmbientProvider
where
	Self: 'static + Send + Sync,
{
	/// Returns a token source for `scopes`, or [`CredentialError::NoDefaultCredentials`].
	fn discover<'a>(&'a self, scopes: &'a ScopeSet) -> AmbientFuture<'a>;
}

/// Default provider backed by `gcp_auth`'s discovery chain; the discovered provider is memoized.
#[derive(Default)]
pub struct GcpAmbientProvider {
	discovered: AsyncMutex<Option<Arc<dyn TokenProvider>>>,
}
impl AmbientProvider for GcpAmbientProvider {
	fn discover<'a>(&'a self, scopes: &'a ScopeSet) -> AmbientFuture<'a> {
		Box::pin(async move {
			let mut discovered = self.discovered.lock().await;
			let provider = match discovered.as_ref() {
				Some(provider) => provider.clone(),
				None => {
					let provider = gcp_auth::provider()
						.await
						.map_err(|e| CredentialError::NoDefaultCredentials { source: Box::new(e) })?;

					*discovered = Some(provider.clone());

					provider
				},
			};

			let source: Arc<dyn TokenSource> =
				Arc::new(AmbientTokenSource { provider, scopes: scopes.clone() });

			Ok(source)
		})
	}
}
impl Debug for GcpAmbientProvider {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("GcpAmbientProvider(..)")
	}
}

/// Token source over a discovered `gcp_auth` provider.
pub struct AmbientTokenSource {
	provider: Arc<dyn TokenProvider>,
	scopes: ScopeSet,
}
impl TokenSource for AmbientTokenSource {
	fn token(&self) -> TokenFuture<'_> {
		Box::pin(async move {
			let scopes = self.scopes.as_strs();
			let token = self.provider.token(&scopes).await.map_err(CredentialError::provider)?;

			Ok(AccessToken::new(token.as_str()))
		})
	}

	fn kind(&self) -> TokenSourceKind {
		TokenSourceKind::AmbientDefault
	}
}
impl Debug for AmbientTokenSource {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AmbientTokenSource").field("scopes", &self.scopes).finish_non_exhaustive()
	}
}
