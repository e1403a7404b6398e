//! Outbound HTTP stack shared by every API call.
//!
//! Requests flow through a fixed chain of [`Transport`] layers, outermost first:
//! [`HeaderTransport`] → [`RetryTransport`] → [`LoggingTransport`] → [`AuthTransport`] →
//! [`BaseTransport`]. Header injection therefore applies to every retried attempt, and the logging
//! layer observes each attempt exactly as it leaves for the wire (minus the bearer token). Use
//! [`TransportChain`] to compose the layers and [`HttpClient`] to issue typed JSON calls over them.

pub mod auth;
pub mod chain;
pub mod headers;
pub mod logging;
pub mod retry;

pub use auth::*;
pub use chain::*;
pub use headers::*;
pub use logging::*;
pub use retry::*;

// crates.io
use reqwest::{
	Body, Method, Request, Response, StatusCode,
	header::{CONTENT_TYPE, HeaderMap, HeaderValue, RETRY_AFTER},
};
use serde::de::DeserializeOwned;
use time::format_description::well_known::Rfc2822;
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransportError},
};

/// Boxed future returned by [`Transport::round_trip`].
pub type TransportFuture<'a> = Pin<Box<dyn Future<Output = Result<Response>> + 'a + Send>>;

/// One layer of the outbound request pipeline.
///
/// Layers own their inner layer and must be `Send + Sync + 'static` so a composed chain can be
/// shared by concurrent operations behind an [`Arc`].
pub trait Transport
where
	Self: 'static + Send + Sync,
{
	/// Sends `request` and resolves to the raw response.
	fn round_trip(&self, request: Request) -> TransportFuture<'_>;
}
impl<T> Transport for Arc<T>
where
	T: ?Sized + Transport,
{
	fn round_trip(&self, request: Request) -> TransportFuture<'_> {
		(**self).round_trip(request)
	}
}

/// Innermost layer executing requests on a reqwest client.
#[derive(Clone, Debug)]
pub struct BaseTransport {
	client: ReqwestClient,
}
impl BaseTransport {
	/// Wraps an existing reqwest client.
	pub fn new(client: ReqwestClient) -> Self {
		Self { client }
	}

	/// Builds a client bounding every round trip by `timeout`.
	pub fn with_timeout(timeout: StdDuration, user_agent: &str) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder().timeout(timeout).user_agent(user_agent).build()?;

		Ok(Self { client })
	}
}
impl Transport for BaseTransport {
	fn round_trip(&self, request: Request) -> TransportFuture<'_> {
		Box::pin(async move {
			let url = request.url().clone();

			self.client
				.execute(request)
				.await
				.map_err(|e| Error::from(TransportError::network(&url, e)))
		})
	}
}

/// Typed JSON client over a composed transport chain.
#[derive(Clone)]
pub struct HttpClient {
	transport: Arc<dyn Transport>,
}
impl HttpClient {
	/// Wraps a transport (usually produced by [`TransportChain`]).
	pub fn new(transport: impl Transport) -> Self {
		Self { transport: Arc::new(transport) }
	}

	/// Sends a prepared request through the chain without status handling.
	pub async fn send(&self, request: Request) -> Result<Response> {
		self.transport.round_trip(request).await
	}

	/// `GET` returning a decoded JSON body.
	pub async fn get<T>(&self, url: Url) -> Result<T>
	where
		T: DeserializeOwned,
	{
		self.execute(Method::GET, url, None::<&()>).await
	}

	/// `POST` with a JSON body, returning a decoded JSON body.
	pub async fn post<B, T>(&self, url: Url, body: &B) -> Result<T>
	where
		B: ?Sized + Serialize,
		T: DeserializeOwned,
	{
		self.execute(Method::POST, url, Some(body)).await
	}

	/// `PATCH` with a JSON body, returning a decoded JSON body.
	pub async fn patch<B, T>(&self, url: Url, body: &B) -> Result<T>
	where
		B: ?Sized + Serialize,
		T: DeserializeOwned,
	{
		self.execute(Method::PATCH, url, Some(body)).await
	}

	/// Issues a JSON request and maps the response into the crate's error taxonomy.
	///
	/// `404` maps to [`Error::NotFound`], any other non-success status to [`Error::Api`] with the
	/// message from Google's error envelope, and undecodable bodies to [`Error::Decode`].
	pub async fn execute<B, T>(&self, method: Method, url: Url, body: Option<&B>) -> Result<T>
	where
		B: ?Sized + Serialize,
		T: DeserializeOwned,
	{
		let request = json_request(method, url.clone(), body)?;
		let response = self.send(request).await?;
		let status = response.status();
		let bytes = response.bytes().await.map_err(|e| TransportError::network(&url, e))?;

		if status == StatusCode::NOT_FOUND {
			return Err(Error::NotFound { resource: url.to_string() });
		}
		if !status.is_success() {
			return Err(Error::Api {
				resource: url.to_string(),
				status: status.as_u16(),
				message: error_message(&bytes),
			});
		}

		decode_json(&url, &bytes)
	}
}
impl Debug for HttpClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("HttpClient(..)")
	}
}

/// Captures metadata from the most recent HTTP response for downstream error mapping.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadata {
	/// HTTP status code returned by the endpoint, if available.
	pub status: Option<u16>,
}

/// Thread-safe slot for sharing [`ResponseMetadata`] between transport and error layers.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadataSlot(Arc<Mutex<Option<ResponseMetadata>>>);
impl ResponseMetadataSlot {
	/// Stores new metadata for the current request.
	pub fn store(&self, meta: ResponseMetadata) {
		*self.0.lock() = Some(meta);
	}

	/// Returns the captured metadata, if any, consuming it from the slot.
	pub fn take(&self) -> Option<ResponseMetadata> {
		self.0.lock().take()
	}
}

/// Joins a relative API path onto a configured base path.
pub fn endpoint(base: &str, path: &str) -> Result<Url> {
	let invalid = || ConfigError::InvalidEndpoint { name: "base_path", value: base.to_owned() };
	let base = Url::parse(base).map_err(|_| invalid())?;

	Ok(base.join(path).map_err(|_| invalid())?)
}

/// Decodes a JSON body, recording the failing path.
pub fn decode_json<T>(url: &Url, bytes: &[u8]) -> Result<T>
where
	T: DeserializeOwned,
{
	let de = &mut serde_json::Deserializer::from_slice(bytes);

	serde_path_to_error::deserialize(de)
		.map_err(|source| Error::Decode { resource: url.to_string(), source })
}

/// Parses a `Retry-After` header given as seconds or an RFC 2822 date.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u32>() {
		return Some(Duration::seconds(secs.into()));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}

pub(crate) fn json_request<B>(method: Method, url: Url, body: Option<&B>) -> Result<Request>
where
	B: ?Sized + Serialize,
{
	let mut request = Request::new(method, url);

	if let Some(body) = body {
		let bytes = serde_json::to_vec(body).map_err(ConfigError::http_client_build)?;

		request.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
		*request.body_mut() = Some(Body::from(bytes));
	}

	Ok(request)
}

pub(crate) fn error_message(bytes: &[u8]) -> String {
	#[derive(Deserialize)]
	struct Envelope {
		error: EnvelopeBody,
	}
	#[derive(Deserialize)]
	struct EnvelopeBody {
		message: String,
	}

	match serde_json::from_slice::<Envelope>(bytes) {
		Ok(envelope) => envelope.error.message,
		Err(_) => String::from_utf8_lossy(bytes).trim().to_owned(),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn retry_after_parses_seconds_and_dates() {
		let mut headers = HeaderMap::new();

		headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));

		assert_eq!(parse_retry_after(&headers), Some(Duration::seconds(7)));

		headers.insert(RETRY_AFTER, HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"));

		assert_eq!(parse_retry_after(&headers), None, "Past dates carry no delay.");

		headers.insert(RETRY_AFTER, HeaderValue::from_static("soon"));

		assert_eq!(parse_retry_after(&headers), None);
	}

	#[test]
	fn error_message_prefers_google_envelope() {
		let body = br#"{"error":{"code":403,"message":"The caller does not have permission","status":"PERMISSION_DENIED"}}"#;

		assert_eq!(error_message(body), "The caller does not have permission");
		assert_eq!(error_message(b"upstream timeout\n"), "upstream timeout");
	}

	#[test]
	fn endpoint_joins_relative_paths() {
		let url = endpoint("https://firebaserules.googleapis.com/v1/", "projects/p/rulesets")
			.expect("Endpoint should join.");

		assert_eq!(url.as_str(), "https://firebaserules.googleapis.com/v1/projects/p/rulesets");
		assert!(endpoint("not a url", "x").is_err());
	}

	#[test]
	fn decode_reports_json_path() {
		#[derive(Debug, Deserialize)]
		struct Shape {
			#[allow(dead_code)]
			name: String,
		}

		let url = Url::parse("https://example.com/x").expect("Fixture URL should parse.");
		let err = decode_json::<Shape>(&url, br#"{"name":7}"#)
			.expect_err("Numeric name should fail to decode.");

		match err {
			Error::Decode { source, .. } => assert_eq!(source.path().to_string(), "name"),
			other => panic!("Unexpected error: {other:?}"),
		}
	}
}
