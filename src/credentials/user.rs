//! End-user refresh-token credentials (`authorized_user` documents).

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	credentials::{AuthorizedUserKey, TokenCache, TokenFuture, TokenSource, TokenSourceKind},
	error::CredentialError,
	http::Transport,
	oauth::RefreshExchange,
};

/// Mints access tokens from a refresh token, caching each until shortly before it expires.
#[derive(Debug)]
pub struct AuthorizedUserTokenSource {
	exchange: RefreshExchange,
	refresh_token: TokenSecret,
	cache: TokenCache,
}
impl AuthorizedUserTokenSource {
	/// Builds the source from an `authorized_user` document.
	pub fn new(
		key: AuthorizedUserKey,
		transport: Arc<dyn Transport>,
	) -> Result<Self, CredentialError> {
		let exchange =
			RefreshExchange::new(&key.client_id, &key.client_secret, &key.token_uri, transport)?;

		Ok(Self {
			exchange,
			refresh_token: TokenSecret::new(key.refresh_token),
			cache: TokenCache::default(),
		})
	}
}
impl TokenSource for AuthorizedUserTokenSource {
	fn token(&self) -> TokenFuture<'_> {
		Box::pin(self.cache.get_or_fetch(self.exchange.refresh(self.refresh_token.expose())))
	}

	fn kind(&self) -> TokenSourceKind {
		TokenSourceKind::AuthorizedUser
	}
}
