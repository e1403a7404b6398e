//! OAuth 2.0 refresh-token exchange routed through the crate's transport layers.

pub use oauth2;

// crates.io
use oauth2::{
	AsyncHttpClient, AuthType, ClientId, ClientSecret, EndpointNotSet, EndpointSet,
	HttpClientError, HttpRequest, HttpResponse, RefreshToken, RequestTokenError, TokenResponse,
	TokenUrl,
	basic::{BasicClient, BasicErrorResponse, BasicRequestTokenError},
};
// self
use crate::{
	_prelude::*,
	credentials::AccessToken,
	error::{ConfigError, CredentialError, TransportError},
	http::{ResponseMetadata, ResponseMetadataSlot, Transport},
};

type ConfiguredBasicClient =
	BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Exchanges a long-lived refresh token for access tokens at a fixed token endpoint.
pub struct RefreshExchange {
	oauth_client: ConfiguredBasicClient,
	transport: Arc<dyn Transport>,
	endpoint: String,
}
impl RefreshExchange {
	/// Configures the exchange; client credentials travel in the request body.
	pub fn new(
		client_id: &str,
		client_secret: &str,
		token_uri: &str,
		transport: Arc<dyn Transport>,
	) -> Result<Self, CredentialError> {
		let token_url = TokenUrl::new(token_uri.to_owned()).map_err(CredentialError::provider)?;
		let oauth_client = BasicClient::new(ClientId::new(client_id.to_owned()))
			.set_client_secret(ClientSecret::new(client_secret.to_owned()))
			.set_token_uri(token_url)
			.set_auth_type(AuthType::RequestBody);

		Ok(Self { oauth_client, transport, endpoint: token_uri.to_owned() })
	}

	/// Runs the `refresh_token` grant.
	pub async fn refresh(&self, refresh_token: &str) -> Result<AccessToken> {
		let meta = ResponseMetadataSlot::default();
		let handle = InstrumentedHandle { transport: self.transport.clone(), slot: meta.clone() };
		let secret = RefreshToken::new(refresh_token.to_owned());
		let response = self
			.oauth_client
			.exchange_refresh_token(&secret)
			.request_async(&handle)
			.await
			.map_err(|err| map_request_error(&self.endpoint, meta.take(), err))?;
		let issued_at = OffsetDateTime::now_utc();
		let token = AccessToken::new(response.access_token().secret().as_str());

		match response.expires_in().and_then(|ttl| Duration::try_from(ttl).ok()) {
			Some(ttl) => Ok(token.with_expiry(issued_at + ttl)),
			None => Ok(token),
		}
	}
}
impl Debug for RefreshExchange {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshExchange").field("endpoint", &self.endpoint).finish_non_exhaustive()
	}
}

/// [`AsyncHttpClient`] adapter sending `oauth2` requests through a [`Transport`] while recording
/// response metadata.
#[derive(Clone)]
struct InstrumentedHandle {
	transport: Arc<dyn Transport>,
	slot: ResponseMetadataSlot,
}
impl<'c> AsyncHttpClient<'c> for InstrumentedHandle {
	type Error = HttpClientError<Error>;
	type Future = Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		Box::pin(async move {
			self.slot.take();

			let request = reqwest::Request::try_from(request)
				.map_err(|e| Box::new(Error::from(ConfigError::from(e))))?;
			let url = request.url().clone();
			let response = self.transport.round_trip(request).await.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();

			self.slot.store(ResponseMetadata { status: Some(status.as_u16()) });

			let body = response
				.bytes()
				.await
				.map_err(|e| Box::new(Error::from(TransportError::network(&url, e))))?;
			let mut converted = HttpResponse::new(body.to_vec());

			*converted.status_mut() = status;
			*converted.headers_mut() = headers;

			Ok(converted)
		})
	}
}

fn map_request_error(
	endpoint: &str,
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<Error>>,
) -> Error {
	let status = meta.and_then(|meta| meta.status).unwrap_or_default();
	let exchange = |message: String| {
		Error::from(CredentialError::Exchange { endpoint: endpoint.to_owned(), status, message })
	};

	match err {
		RequestTokenError::ServerResponse(response) => exchange(server_message(&response)),
		RequestTokenError::Request(HttpClientError::Reqwest(inner)) => *inner,
		RequestTokenError::Request(HttpClientError::Io(e)) => TransportError::Io(e).into(),
		RequestTokenError::Request(HttpClientError::Http(e)) =>
			ConfigError::http_client_build(e).into(),
		RequestTokenError::Request(other) => exchange(other.to_string()),
		RequestTokenError::Parse(e, _) => exchange(format!("Token response is malformed: {e}")),
		RequestTokenError::Other(message) => exchange(message),
	}
}

fn server_message(response: &BasicErrorResponse) -> String {
	match response.error_description() {
		Some(description) => format!("{}: {description}", response.error().as_ref()),
		None => response.error().as_ref().to_owned(),
	}
}
