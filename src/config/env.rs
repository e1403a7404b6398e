//! Environment variable lookups backing configuration defaults.

// self
use crate::_prelude::*;

/// Credentials JSON content or path.
pub const CREDENTIALS_ENV_VARS: &[&str] =
	&["GOOGLE_CREDENTIALS", "GOOGLE_CLOUD_KEYFILE_JSON", "GCLOUD_KEYFILE_JSON"];
/// Static OAuth access token.
pub const ACCESS_TOKEN_ENV_VARS: &[&str] = &["GOOGLE_OAUTH_ACCESS_TOKEN"];
/// Impersonation target.
pub const IMPERSONATE_SERVICE_ACCOUNT_ENV_VARS: &[&str] = &["GOOGLE_IMPERSONATE_SERVICE_ACCOUNT"];
/// Default project.
pub const PROJECT_ENV_VARS: &[&str] =
	&["GOOGLE_PROJECT", "GOOGLE_CLOUD_PROJECT", "GCLOUD_PROJECT", "CLOUDSDK_CORE_PROJECT"];
/// Billing project.
pub const BILLING_PROJECT_ENV_VARS: &[&str] = &["GOOGLE_BILLING_PROJECT"];
/// Default region.
pub const REGION_ENV_VARS: &[&str] = &["GOOGLE_REGION", "GCLOUD_REGION", "CLOUDSDK_COMPUTE_REGION"];
/// Default zone.
pub const ZONE_ENV_VARS: &[&str] = &["GOOGLE_ZONE", "GCLOUD_ZONE", "CLOUDSDK_COMPUTE_ZONE"];
/// Request reason header value.
pub const REQUEST_REASON_ENV_VARS: &[&str] = &["CLOUDSDK_CORE_REQUEST_REASON"];
/// Billing-project override flag.
pub const USER_PROJECT_OVERRIDE_ENV_VARS: &[&str] = &["USER_PROJECT_OVERRIDE"];
/// Custom Firebase Rules endpoint; the `SIDKIK_`-prefixed name is accepted as well.
pub const RULES_CUSTOM_ENDPOINT_ENV_VARS: &[&str] =
	&["FIREBASE_RULES_CUSTOM_ENDPOINT", "SIDKIK_FIREBASE_RULES_CUSTOM_ENDPOINT"];

/// Read-only view over environment variables.
pub trait EnvSource {
	/// Returns the value of `key`, if set.
	fn var(&self, key: &str) -> Option<String>;

	/// Returns the first non-empty value among `keys`, in order.
	fn first_of(&self, keys: &[&str]) -> Option<String> {
		keys.iter().filter_map(|key| self.var(key)).find(|value| !value.is_empty())
	}
}

/// The process environment.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessEnv;
impl EnvSource for ProcessEnv {
	fn var(&self, key: &str) -> Option<String> {
		std::env::var(key).ok()
	}
}

impl EnvSource for HashMap<String, String> {
	fn var(&self, key: &str) -> Option<String> {
		self.get(key).cloned()
	}
}

impl EnvSource for BTreeMap<&str, &str> {
	fn var(&self, key: &str) -> Option<String> {
		self.get(key).map(|value| (*value).to_owned())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn first_non_empty_value_wins() {
		let env = BTreeMap::from([("GOOGLE_REGION", ""), ("GCLOUD_REGION", "asia-east1")]);

		assert_eq!(env.first_of(REGION_ENV_VARS).as_deref(), Some("asia-east1"));
		assert_eq!(env.first_of(ZONE_ENV_VARS), None);
	}
}
