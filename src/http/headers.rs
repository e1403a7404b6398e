//! Outermost wrapper injecting static, configuration-derived headers.

// crates.io
use reqwest::{
	Request,
	header::{HeaderMap, HeaderName, HeaderValue},
};
// self
use crate::{
	_prelude::*,
	config::Config,
	error::ConfigError,
	http::{Transport, TransportFuture},
};

/// Header carrying the operator-supplied justification for the call.
pub const REQUEST_REASON_HEADER: &str = "x-goog-request-reason";
/// Header billing quota and charges to a project other than the resource's own.
pub const USER_PROJECT_HEADER: &str = "x-goog-user-project";

/// Static header set resolved once from configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StaticHeaders {
	/// Value for `X-Goog-Request-Reason`.
	pub request_reason: Option<String>,
	/// Value for `X-Goog-User-Project`.
	pub user_project: Option<String>,
}
impl StaticHeaders {
	/// Derives the header set: the user-project header requires both the override flag and a
	/// non-empty billing project.
	pub fn from_config(config: &Config) -> Self {
		let request_reason = config.request_reason.clone().filter(|reason| !reason.is_empty());
		let user_project = if config.user_project_override {
			config.billing_project.clone().filter(|project| !project.is_empty())
		} else {
			None
		};

		Self { request_reason, user_project }
	}

	/// Materializes the configured headers.
	pub fn to_header_map(&self) -> Result<HeaderMap, ConfigError> {
		let mut map = HeaderMap::new();

		for (name, value) in [
			(REQUEST_REASON_HEADER, &self.request_reason),
			(USER_PROJECT_HEADER, &self.user_project),
		] {
			let Some(value) = value else { continue };
			let value = HeaderValue::from_str(value).map_err(ConfigError::http_client_build)?;

			map.insert(HeaderName::from_static(name), value);
		}

		Ok(map)
	}
}

/// Sets every configured header on each request, overwriting caller-supplied values.
#[derive(Debug)]
pub struct HeaderTransport<T> {
	inner: T,
	headers: HeaderMap,
}
impl<T> HeaderTransport<T>
where
	T: Transport,
{
	/// Wraps `inner` with a fixed header map.
	pub fn new(inner: T, headers: HeaderMap) -> Self {
		Self { inner, headers }
	}
}
impl<T> Transport for HeaderTransport<T>
where
	T: Transport,
{
	fn round_trip(&self, mut request: Request) -> TransportFuture<'_> {
		for (name, value) in &self.headers {
			request.headers_mut().insert(name.clone(), value.clone());
		}

		self.inner.round_trip(request)
	}
}
