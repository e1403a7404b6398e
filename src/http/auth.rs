//! Innermost wrapper attaching bearer credentials from a token source.

// crates.io
use reqwest::{
	Request,
	header::{AUTHORIZATION, HeaderValue},
};
// self
use crate::{
	_prelude::*,
	credentials::TokenSource,
	error::CredentialError,
	http::{Transport, TransportFuture},
};

/// Sets `Authorization: Bearer <token>` on every request before delegating to `inner`.
pub struct AuthTransport<T> {
	inner: T,
	source: Arc<dyn TokenSource>,
}
impl<T> AuthTransport<T>
where
	T: Transport,
{
	/// Wraps `inner` with credentials minted by `source`.
	pub fn new(inner: T, source: Arc<dyn TokenSource>) -> Self {
		Self { inner, source }
	}
}
impl<T> Transport for AuthTransport<T>
where
	T: Transport,
{
	fn round_trip(&self, mut request: Request) -> TransportFuture<'_> {
		Box::pin(async move {
			let token = self.source.token().await?;
			let mut value =
				HeaderValue::from_str(&token.secret.bearer()).map_err(CredentialError::provider)?;

			value.set_sensitive(true);
			request.headers_mut().insert(AUTHORIZATION, value);

			self.inner.round_trip(request).await
		})
	}
}
impl<T> Debug for AuthTransport<T> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthTransport").field("source", &self.source.kind()).finish()
	}
}
