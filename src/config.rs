//! Session configuration, environment defaults, and validation.

pub mod env;

pub use env::*;

// self
use crate::{
	_prelude::*,
	auth::{ProjectId, ScopeSet, ServiceAccount},
	batch::BatchingConfig,
	error::ConfigError,
	http::RetryPolicy,
	obs::LogConfig,
};

/// Default Firebase Rules API base path.
pub const DEFAULT_RULES_BASE_PATH: &str = "https://firebaserules.googleapis.com/v1/";
/// Default Identity Platform admin API base path.
pub const DEFAULT_IDENTITY_PLATFORM_BASE_PATH: &str = "https://identitytoolkit.googleapis.com/v2/";
/// Default IAM Credentials API base path.
pub const DEFAULT_IAM_CREDENTIALS_BASE_PATH: &str = "https://iamcredentials.googleapis.com/v1/";
/// Default OpenID Connect userinfo endpoint used for identity reporting.
pub const DEFAULT_USERINFO_ENDPOINT: &str = "https://openidconnect.googleapis.com/v1/userinfo";
/// Default bound for a single HTTP round trip.
pub const DEFAULT_REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(120);

/// Everything a session needs to authenticate and reach the backing APIs.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
	/// Static OAuth access token; takes precedence over every other credential.
	pub access_token: Option<String>,
	/// Credentials JSON, inline or as a path to a file.
	pub credentials: Option<String>,
	/// Service account to impersonate for API calls.
	pub impersonate_service_account: Option<ServiceAccount>,
	/// Ordered delegation chain ending at the impersonation target.
	pub impersonate_service_account_delegates: Vec<ServiceAccount>,
	/// Default project for operations that do not name one.
	pub project: Option<String>,
	/// Project billed when `user_project_override` is set.
	pub billing_project: Option<String>,
	/// Default region; a self-link is reduced to its name by [`Config::validate`].
	pub region: Option<String>,
	/// Default zone.
	pub zone: Option<String>,
	/// OAuth scopes requested for every token.
	pub scopes: Vec<String>,
	/// Sends `X-Goog-User-Project` with the billing project.
	pub user_project_override: bool,
	/// Bound for a single HTTP round trip.
	#[serde(with = "duration_str")]
	pub request_timeout: StdDuration,
	/// Justification sent as `X-Goog-Request-Reason`.
	pub request_reason: Option<String>,
	/// Base path of the Firebase Rules API.
	pub rules_base_path: String,
	/// Base path of the Identity Platform admin API.
	pub identity_platform_base_path: String,
	/// Base path of the IAM Credentials API.
	pub iam_credentials_base_path: String,
	/// Userinfo endpoint queried for identity reporting.
	pub userinfo_endpoint: String,
	/// Retry policy applied by the transport chain.
	pub retry: RetryPolicy,
	/// Batching settings handed to the request batcher.
	pub batching: BatchingConfig,
	/// Logging settings threaded into the transport chain.
	pub log: LogConfig,
}
impl Config {
	/// Fills unset fields from environment variables, first non-empty variable wins.
	pub fn with_env_defaults(mut self, env: &impl EnvSource) -> Result<Self, ConfigError> {
		if self.access_token.is_none() && self.credentials.is_none() {
			self.credentials = env.first_of(CREDENTIALS_ENV_VARS);
			self.access_token = env.first_of(ACCESS_TOKEN_ENV_VARS);
		}
		if self.impersonate_service_account.is_none()
			&& let Some(target) = env.first_of(IMPERSONATE_SERVICE_ACCOUNT_ENV_VARS)
		{
			self.impersonate_service_account = Some(ServiceAccount::new(target)?);
		}

		fill(&mut self.project, env, PROJECT_ENV_VARS);
		fill(&mut self.billing_project, env, BILLING_PROJECT_ENV_VARS);
		fill(&mut self.region, env, REGION_ENV_VARS);
		fill(&mut self.zone, env, ZONE_ENV_VARS);
		fill(&mut self.request_reason, env, REQUEST_REASON_ENV_VARS);

		if !self.user_project_override
			&& let Some(flag) = env.first_of(USER_PROJECT_OVERRIDE_ENV_VARS)
		{
			self.user_project_override = matches!(flag.as_str(), "true" | "1");
		}
		if self.rules_base_path == DEFAULT_RULES_BASE_PATH
			&& let Some(custom) = env.first_of(RULES_CUSTOM_ENDPOINT_ENV_VARS)
		{
			self.rules_base_path = custom;
		}

		Ok(self)
	}

	/// Normalizes derived fields and rejects malformed values.
	pub fn validate(&mut self) -> Result<(), ConfigError> {
		if self.scopes.is_empty() {
			self.scopes = ScopeSet::default_scopes().as_slice().to_vec();
		}

		self.scope_set()?;

		for (name, value) in [
			("rules_custom_endpoint", &self.rules_base_path),
			("identity_platform_custom_endpoint", &self.identity_platform_base_path),
			("iam_credentials_custom_endpoint", &self.iam_credentials_base_path),
		] {
			validate_base_path(name, value)?;
		}

		Url::parse(&self.userinfo_endpoint).map_err(|_| ConfigError::InvalidEndpoint {
			name: "userinfo_endpoint",
			value: self.userinfo_endpoint.clone(),
		})?;

		if let Some(project) = &self.project {
			ProjectId::new(project)?;
		}
		if let Some(region) = &self.region {
			self.region = Some(last_segment(region).to_owned());
		}

		Ok(())
	}

	/// Normalized scope set; defaults apply when none are configured.
	pub fn scope_set(&self) -> Result<ScopeSet, ConfigError> {
		if self.scopes.is_empty() {
			return Ok(ScopeSet::default_scopes());
		}

		Ok(ScopeSet::new(self.scopes.iter().cloned())?)
	}

	/// Resolves the project for an operation: the explicit override, else the configured default.
	pub fn project_id(&self, explicit: Option<&str>) -> Result<ProjectId, ConfigError> {
		let raw = explicit
			.filter(|value| !value.is_empty())
			.or(self.project.as_deref().filter(|value| !value.is_empty()))
			.ok_or(ConfigError::MissingProject)?;

		Ok(ProjectId::new(raw)?)
	}
}
impl Default for Config {
	fn default() -> Self {
		Self {
			access_token: None,
			credentials: None,
			impersonate_service_account: None,
			impersonate_service_account_delegates: Vec::new(),
			project: None,
			billing_project: None,
			region: None,
			zone: None,
			scopes: Vec::new(),
			user_project_override: false,
			request_timeout: DEFAULT_REQUEST_TIMEOUT,
			request_reason: None,
			rules_base_path: DEFAULT_RULES_BASE_PATH.into(),
			identity_platform_base_path: DEFAULT_IDENTITY_PLATFORM_BASE_PATH.into(),
			iam_credentials_base_path: DEFAULT_IAM_CREDENTIALS_BASE_PATH.into(),
			userinfo_endpoint: DEFAULT_USERINFO_ENDPOINT.into(),
			retry: RetryPolicy::default(),
			batching: BatchingConfig::default(),
			log: LogConfig::default(),
		}
	}
}

/// Parses durations written as `<n>ms`, `<n>s`, or `<n>m`.
pub fn parse_duration(raw: &str) -> Option<StdDuration> {
	let raw = raw.trim();
	let (digits, unit) = raw.split_at(raw.find(|c: char| !c.is_ascii_digit())?);
	let value = digits.parse::<u64>().ok()?;

	match unit {
		"ms" => Some(StdDuration::from_millis(value)),
		"s" => Some(StdDuration::from_secs(value)),
		"m" => Some(StdDuration::from_secs(value.checked_mul(60)?)),
		_ => None,
	}
}

/// Serde adapter for durations written as strings like `"120s"`.
pub mod duration_str {
	// crates.io
	use serde::{Deserializer, Serializer, de::Error as DeError};
	// self
	use crate::_prelude::*;

	/// Serializes as whole milliseconds, e.g. `"500ms"`.
	pub fn serialize<S>(value: &StdDuration, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&format!("{}ms", value.as_millis()))
	}

	/// Deserializes `<n>ms`, `<n>s`, or `<n>m`.
	pub fn deserialize<'de, D>(deserializer: D) -> Result<StdDuration, D::Error>
	where
		D: Deserializer<'de>,
	{
		let raw = String::deserialize(deserializer)?;

		super::parse_duration(&raw)
			.ok_or_else(|| DeError::custom(format!("invalid duration {raw:?}")))
	}
}

fn fill(slot: &mut Option<String>, env: &impl EnvSource, keys: &[&str]) {
	if slot.as_deref().is_none_or(str::is_empty) {
		*slot = env.first_of(keys);
	}
}

fn validate_base_path(name: &'static str, value: &str) -> Result<(), ConfigError> {
	let invalid = || ConfigError::InvalidEndpoint { name, value: value.to_owned() };
	let url = Url::parse(value).map_err(|_| invalid())?;
	let path = url.path();
	let trimmed = path.strip_suffix('/').ok_or_else(invalid)?;

	match trimmed.rsplit_once('/') {
		Some((_, segment)) if !segment.is_empty() => Ok(()),
		_ => Err(invalid()),
	}
}

fn last_segment(value: &str) -> &str {
	value.rsplit('/').next().unwrap_or(value)
}
