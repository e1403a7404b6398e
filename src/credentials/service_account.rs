//! Service account key credentials backed by `gcp_auth`.

// crates.io
use gcp_auth::{CustomServiceAccount, TokenProvider};
// self
use crate::{
	_prelude::*,
	auth::ScopeSet,
	credentials::{AccessToken, TokenFuture, TokenSource, TokenSourceKind},
	error::CredentialError,
};

/// Signs JWT assertions with a service account key; `gcp_auth` caches the minted tokens.
pub struct ServiceAccountTokenSource {
	account: CustomServiceAccount,
	scopes: ScopeSet,
}
impl ServiceAccountTokenSource {
	/// Loads a `service_account` key document.
	pub fn from_json(raw: &str, scopes: ScopeSet) -> Result<Self, CredentialError> {
		let account = CustomServiceAccount::from_json(raw).map_err(CredentialError::provider)?;

		Ok(Self { account, scopes })
	}
}
impl TokenSource for ServiceAccountTokenSource {
	fn token(&self) -> TokenFuture<'_> {
		Box::pin(async move {
			let scopes = self.scopes.as_strs();
			let token = self.account.token(&scopes).await.map_err(CredentialError::provider)?;

			Ok(AccessToken::new(token.as_str()))
		})
	}

	fn kind(&self) -> TokenSourceKind {
		TokenSourceKind::ServiceAccount
	}
}
impl Debug for ServiceAccountTokenSource {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ServiceAccountTokenSource").field("scopes", &self.scopes).finish()
	}
}
