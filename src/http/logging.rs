//! Request/response dump layer, active only in verbose mode.

// crates.io
use reqwest::{Request, Response};
// self
use crate::{
	_prelude::*,
	error::TransportError,
	http::{Transport, TransportFuture},
	obs::LogConfig,
};

/// Logs each request and response at `debug` when [`LogConfig::verbose`] is set.
///
/// The layer sits inside the bearer-free portion of the chain, so dumps never carry credentials.
/// Response bodies are buffered to be logged and handed back to the caller unchanged.
#[derive(Debug)]
pub struct LoggingTransport<T> {
	inner: T,
	log: LogConfig,
}
impl<T> LoggingTransport<T>
where
	T: Transport,
{
	/// Wraps `inner` using the provided logging configuration.
	pub fn new(inner: T, log: LogConfig) -> Self {
		Self { inner, log }
	}

	fn emit(&self, message: String) {
		if self.log.allows(&message) {
			tracing::debug!("{message}");
		}
	}
}
impl<T> Transport for LoggingTransport<T>
where
	T: Transport,
{
	fn round_trip(&self, request: Request) -> TransportFuture<'_> {
		if !self.log.verbose {
			return self.inner.round_trip(request);
		}

		Box::pin(async move {
			let method = request.method().clone();
			let url = request.url().clone();
			let body = request
				.body()
				.and_then(|body| body.as_bytes())
				.map(|bytes| String::from_utf8_lossy(bytes).into_owned())
				.unwrap_or_default();

			self.emit(format!("--> {method} {url}\n{body}"));

			let response = match self.inner.round_trip(request).await {
				Ok(response) => response,
				Err(e) => {
					self.emit(format!("<-- {method} {url} failed: {e}"));

					return Err(e);
				},
			};
			let status = response.status();
			let version = response.version();
			let headers = response.headers().clone();
			let bytes = response.bytes().await.map_err(|e| TransportError::network(&url, e))?;

			self.emit(format!("<-- {status} {method} {url}\n{}", String::from_utf8_lossy(&bytes)));

			let mut rebuilt = oauth2::http::Response::new(bytes);

			*rebuilt.status_mut() = status;
			*rebuilt.version_mut() = version;
			*rebuilt.headers_mut() = headers;

			Ok(Response::from(rebuilt))
		})
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use reqwest::Method;
	// self
	use super::*;

	struct Echo;
	impl Transport for Echo {
		fn round_trip(&self, request: Request) -> TransportFuture<'_> {
			Box::pin(async move {
				let body = request.body().and_then(|b| b.as_bytes()).unwrap_or_default().to_vec();
				let mut response = oauth2::http::Response::new(body);

				*response.status_mut() = reqwest::StatusCode::CREATED;

				Ok(Response::from(response))
			})
		}
	}

	#[tokio::test]
	async fn verbose_mode_preserves_response_body() {
		let transport = LoggingTransport::new(Echo, LogConfig::from_directives("debug"));
		let mut request = Request::new(
			Method::POST,
			Url::parse("https://example.com/v1/x").expect("Fixture URL should parse."),
		);

		*request.body_mut() = Some(r#"{"k":"v"}"#.into());

		let response = transport.round_trip(request).await.expect("Echo should succeed.");

		assert_eq!(response.status(), reqwest::StatusCode::CREATED);
		assert_eq!(response.text().await.expect("Body should be readable."), r#"{"k":"v"}"#);
	}
}
