//! Authenticated request layer and two-phase rules deployment for Firebase projects: resolve
//! credentials (with service-account impersonation), compose the outbound transport chain, and
//! point named releases at freshly created, immutable rulesets.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod auth_config;
pub mod batch;
pub mod config;
pub mod credentials;
pub mod error;
pub mod http;
pub mod identity;
pub mod lock;
pub mod oauth;
pub mod obs;
pub mod rules;
pub mod session;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		config::Config,
		credentials::{StaticTokenSource, TokenSource},
		http::{HttpClient, RetryPolicy, TransportChain},
		obs::LogConfig,
	};

	/// Static bearer token attached by every test client.
	pub const TEST_TOKEN: &str = "test-access-token";

	/// Builds a config whose endpoints all point at the provided mock server base URL.
	pub fn test_config(base: &str) -> Config {
		let base = base.trim_end_matches('/');

		Config {
			access_token: Some(TEST_TOKEN.into()),
			project: Some("demo-project".into()),
			rules_base_path: format!("{base}/v1/"),
			identity_platform_base_path: format!("{base}/v2/"),
			iam_credentials_base_path: format!("{base}/iam/v1/"),
			userinfo_endpoint: format!("{base}/userinfo"),
			retry: fast_retry_policy(),
			..Config::default()
		}
	}

	/// Retry policy with millisecond delays so retry tests stay fast.
	pub fn fast_retry_policy() -> RetryPolicy {
		RetryPolicy {
			max_attempts: 3,
			base_delay: StdDuration::from_millis(1),
			max_delay: StdDuration::from_millis(5),
		}
	}

	/// Static token source used by the integration tests.
	pub fn test_token_source() -> Arc<dyn TokenSource> {
		Arc::new(StaticTokenSource::new(TEST_TOKEN))
	}

	/// Builds the full transport chain over a static token with the provided config.
	pub fn build_test_http_client(config: &Config) -> HttpClient {
		TransportChain::from_config(config, &LogConfig::default())
			.build(test_token_source())
			.expect("Failed to build the test transport chain.")
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
		time::Duration as StdDuration,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::Mutex;
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, firebase_rules_client as _, httpmock as _};
