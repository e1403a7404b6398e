//! Bounded retry with full-jitter backoff for transient failures.

// crates.io
use rand::Rng;
use reqwest::{Request, StatusCode};
// self
use crate::{
	_prelude::*,
	http::{Transport, TransportFuture, parse_retry_after},
	obs,
};

/// Statuses retried by [`RetryTransport`].
pub const RETRYABLE_STATUSES: [StatusCode; 5] = [
	StatusCode::TOO_MANY_REQUESTS,
	StatusCode::INTERNAL_SERVER_ERROR,
	StatusCode::BAD_GATEWAY,
	StatusCode::SERVICE_UNAVAILABLE,
	StatusCode::GATEWAY_TIMEOUT,
];

/// Retry budget and backoff bounds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
	/// Total attempts including the first one; `1` disables retries.
	pub max_attempts: u32,
	/// Upper bound of the first backoff window; doubles on every attempt.
	#[serde(with = "crate::config::duration_str")]
	pub base_delay: StdDuration,
	/// Cap applied to computed windows and to server `Retry-After` hints.
	#[serde(with = "crate::config::duration_str")]
	pub max_delay: StdDuration,
}
impl RetryPolicy {
	/// Policy that sends every request exactly once.
	pub fn disabled() -> Self {
		Self { max_attempts: 1, ..Self::default() }
	}

	/// Full-jitter delay before the attempt following `attempt` (1-based).
	pub fn backoff(&self, attempt: u32) -> StdDuration {
		let window = self.window(attempt);
		let window_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX);

		if window_ms == 0 {
			return StdDuration::ZERO;
		}

		StdDuration::from_millis(rand::rng().random_range(0..=window_ms))
	}

	fn window(&self, attempt: u32) -> StdDuration {
		let factor = 1_u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);

		self.base_delay.saturating_mul(factor).min(self.max_delay)
	}

	fn server_hint(&self, hint: Duration) -> Option<StdDuration> {
		StdDuration::try_from(hint).ok().map(|delay| delay.min(self.max_delay))
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_attempts: 4,
			base_delay: StdDuration::from_millis(500),
			max_delay: StdDuration::from_secs(30),
		}
	}
}

/// Resends requests that failed with a retryable status or a transient transport error.
///
/// Exhausting the budget on a retryable status returns the last response so callers see the
/// server's own error body; exhausting it on a transport error returns that error.
#[derive(Debug)]
pub struct RetryTransport<T> {
	inner: T,
	policy: RetryPolicy,
}
impl<T> RetryTransport<T>
where
	T: Transport,
{
	/// Wraps `inner` with the provided policy.
	pub fn new(inner: T, policy: RetryPolicy) -> Self {
		Self { inner, policy }
	}
}
impl<T> Transport for RetryTransport<T>
where
	T: Transport,
{
	fn round_trip(&self, request: Request) -> TransportFuture<'_> {
		Box::pin(async move {
			let max_attempts = self.policy.max_attempts.max(1);
			let mut attempt = 1;

			loop {
				let last = attempt >= max_attempts;
				// Streaming bodies cannot be replayed; send them once.
				let Some(current) = request.try_clone() else {
					return self.inner.round_trip(request).await;
				};
				let delay = match self.inner.round_trip(current).await {
					Ok(response) if !last && RETRYABLE_STATUSES.contains(&response.status()) => {
						let delay = parse_retry_after(response.headers())
							.and_then(|hint| self.policy.server_hint(hint))
							.unwrap_or_else(|| self.policy.backoff(attempt));

						tracing::warn!(
							url = %request.url(),
							status = response.status().as_u16(),
							attempt,
							?delay,
							"Retrying request after retryable status."
						);
						obs::record_http_retry("status");

						delay
					},
					Err(Error::Transport(e)) if !last && e.is_transient() => {
						let delay = self.policy.backoff(attempt);

						tracing::warn!(
							url = %request.url(),
							error = %e,
							attempt,
							?delay,
							"Retrying request after transient transport failure."
						);
						obs::record_http_retry("transport");

						delay
					},
					outcome => return outcome,
				};

				tokio::time::sleep(delay).await;

				attempt += 1;
			}
		})
	}
}
