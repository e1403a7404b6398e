//! Composition of the transport layers in their fixed order.

// self
use crate::{
	_prelude::*,
	config::Config,
	credentials::TokenSource,
	http::{
		AuthTransport, BaseTransport, HeaderTransport, HttpClient, LoggingTransport, RetryPolicy,
		RetryTransport, StaticHeaders, Transport,
	},
	obs::LogConfig,
};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Builder for the outbound transport chain.
///
/// [`build`](Self::build) wraps, innermost first: bearer authentication, logging, retry, and
/// static headers. The order is fixed; callers only choose the inputs.
#[derive(Clone, Debug)]
pub struct TransportChain {
	timeout: StdDuration,
	headers: StaticHeaders,
	retry: RetryPolicy,
	log: LogConfig,
	client: Option<ReqwestClient>,
}
impl TransportChain {
	/// Captures the per-request timeout, header set, and retry policy from `config`.
	pub fn from_config(config: &Config, log: &LogConfig) -> Self {
		Self {
			timeout: config.request_timeout,
			headers: StaticHeaders::from_config(config),
			retry: config.retry.clone(),
			log: log.clone(),
			client: None,
		}
	}

	/// Uses a caller-provided reqwest client instead of building one; its own timeout applies.
	pub fn with_client(mut self, client: ReqwestClient) -> Self {
		self.client = Some(client);

		self
	}

	/// Overrides the retry policy.
	pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
		self.retry = retry;

		self
	}

	/// Composes the full chain over `source`.
	pub fn build(&self, source: Arc<dyn TokenSource>) -> Result<HttpClient> {
		let auth = AuthTransport::new(self.base()?, source);
		let logging = LoggingTransport::new(auth, self.log.clone());
		let retry = RetryTransport::new(logging, self.retry.clone());
		let headers = HeaderTransport::new(retry, self.headers.to_header_map()?);

		Ok(HttpClient::new(headers))
	}

	/// Authenticated client without logging, retry, or header layers, used for diagnostics that
	/// must stay out of request logs.
	pub fn build_bootstrap(&self, source: Arc<dyn TokenSource>) -> Result<HttpClient> {
		Ok(HttpClient::new(AuthTransport::new(self.base()?, source)))
	}

	/// Unauthenticated retrying transport used by token exchanges, which attach their own
	/// credentials.
	pub fn token_transport(&self) -> Result<Arc<dyn Transport>> {
		Ok(Arc::new(RetryTransport::new(self.base()?, self.retry.clone())))
	}

	fn base(&self) -> Result<BaseTransport> {
		match &self.client {
			Some(client) => Ok(BaseTransport::new(client.clone())),
			None => Ok(BaseTransport::with_timeout(self.timeout, USER_AGENT)?),
		}
	}
}
