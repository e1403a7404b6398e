//! Boundary to the request batcher that coalesces small administrative calls.
//!
//! Only the enqueue contract lives here; [`ImmediateBatcher`] sends every request on its own.

// crates.io
use serde_json::Value;
// self
use crate::{_prelude::*, error::ConfigError};

/// Boxed future resolved once a batched request has been answered.
pub type BatchFuture<'a> = Pin<Box<dyn Future<Output = Result<Value>> + 'a + Send>>;

/// Sends a (possibly combined) body and resolves to the raw response body.
pub type SendFn = Arc<dyn Fn(Value) -> BatchFuture<'static> + Send + Sync>;

/// Batching settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchingConfig {
	/// How long a batch stays open before it is flushed.
	#[serde(with = "crate::config::duration_str")]
	pub send_after: StdDuration,
	/// Whether requests sharing a batch key are combined at all.
	pub enable_batching: bool,
}
impl BatchingConfig {
	/// Parses `send_after` written as `<n>ms`, `<n>s`, or `<n>m`.
	pub fn parse(send_after: &str, enable_batching: bool) -> Result<Self, ConfigError> {
		let send_after = crate::config::parse_duration(send_after)
			.ok_or_else(|| ConfigError::InvalidSendAfter { value: send_after.to_owned() })?;

		Ok(Self { send_after, enable_batching })
	}
}
impl Default for BatchingConfig {
	fn default() -> Self {
		Self { send_after: StdDuration::from_secs(3), enable_batching: true }
	}
}

/// A request handed to the batcher.
pub struct BatchRequest {
	/// Requests sharing this key may be combined.
	pub batch_key: String,
	/// Request body.
	pub body: Value,
	/// Identifier for diagnostics.
	pub debug_id: String,
	/// Sends a body once the batch flushes.
	pub send: SendFn,
}
impl Debug for BatchRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("BatchRequest")
			.field("batch_key", &self.batch_key)
			.field("debug_id", &self.debug_id)
			.finish_non_exhaustive()
	}
}

/// Enqueue contract of the request batcher.
pub trait RequestBatcher
where
	Self: 'static + Send + Sync,
{
	/// Enqueues `request` and resolves to the response for this request.
	fn enqueue(&self, request: BatchRequest) -> BatchFuture<'_>;
}

/// Batcher that sends every request immediately.
#[derive(Clone, Debug, Default)]
pub struct ImmediateBatcher {
	config: BatchingConfig,
}
impl ImmediateBatcher {
	/// Creates a pass-through batcher; `config` is recorded for diagnostics only.
	pub fn new(config: BatchingConfig) -> Self {
		Self { config }
	}
}
impl RequestBatcher for ImmediateBatcher {
	fn enqueue(&self, request: BatchRequest) -> BatchFuture<'_> {
		Box::pin(async move {
			tracing::debug!(
				batch_key = %request.batch_key,
				debug_id = %request.debug_id,
				enable_batching = self.config.enable_batching,
				"Sending request without batching."
			);

			(request.send)(request.body).await
		})
	}
}
