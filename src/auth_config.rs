//! Identity Platform project configuration: email sign-in and authorized domains.

// self
use crate::{
	_prelude::*,
	auth::ProjectId,
	http::{self, HttpClient},
	lock::KeyedLocks,
	obs::{self, OperationKind, OperationOutcome, OperationSpan},
};

const UPDATE_MASK: &str = "signIn.email,authorizedDomains";

/// Project-level Identity Platform config as returned by the admin API.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
	/// `projects/{project}/config`.
	#[serde(default)]
	pub name: String,
	/// Sign-in settings.
	#[serde(default)]
	pub sign_in: SignInConfig,
	/// Domains allowed to complete sign-in redirects.
	#[serde(default)]
	pub authorized_domains: Vec<String>,
}
impl AuthConfig {
	/// Whether email sign-in is enabled; a missing email section counts as disabled.
	pub fn email_enabled(&self) -> bool {
		self.sign_in.email.as_ref().is_some_and(|email| email.enabled)
	}
}

/// `signIn` section of [`AuthConfig`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInConfig {
	/// Email/password provider settings.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub email: Option<EmailSignIn>,
}

/// Email provider settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailSignIn {
	/// Provider enabled.
	#[serde(default)]
	pub enabled: bool,
	/// Passwords required (as opposed to email links only).
	#[serde(default)]
	pub password_required: bool,
}

/// Desired state written by [`AuthConfigClient::update`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthConfigUpdate {
	/// Enables email sign-in with passwords.
	pub email_enabled: bool,
	/// Replaces the authorized domain list.
	pub authorized_domains: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthConfigPatch<'a> {
	sign_in: SignInConfig,
	authorized_domains: &'a [String],
}
impl<'a> From<&'a AuthConfigUpdate> for AuthConfigPatch<'a> {
	fn from(update: &'a AuthConfigUpdate) -> Self {
		Self {
			sign_in: SignInConfig {
				email: Some(EmailSignIn {
					enabled: update.email_enabled,
					password_required: update.email_enabled,
				}),
			},
			authorized_domains: &update.authorized_domains,
		}
	}
}

/// Client for the Identity Platform `projects/{project}/config` resource.
#[derive(Clone, Debug)]
pub struct AuthConfigClient {
	http: HttpClient,
	base_path: String,
	locks: KeyedLocks,
}
impl AuthConfigClient {
	/// Issues requests through `http` against `base_path`.
	pub fn new(http: HttpClient, base_path: impl Into<String>, locks: KeyedLocks) -> Self {
		Self { http, base_path: base_path.into(), locks }
	}

	/// Reads the project config; `None` when it does not exist.
	pub async fn read(&self, project: &ProjectId) -> Result<Option<AuthConfig>> {
		const KIND: OperationKind = OperationKind::AuthConfigRead;

		let span = OperationSpan::new(KIND, "read");

		obs::record_operation_outcome(KIND, OperationOutcome::Attempt);

		let result = span.instrument(self.fetch(project)).await;

		obs::record_operation_outcome(KIND, OperationOutcome::of(&result));

		result
	}

	/// Writes email sign-in and authorized domains, then reads the config back.
	pub async fn update(
		&self,
		project: &ProjectId,
		update: &AuthConfigUpdate,
	) -> Result<Option<AuthConfig>> {
		const KIND: OperationKind = OperationKind::AuthConfigUpdate;

		let span = OperationSpan::new(KIND, "update");

		obs::record_operation_outcome(KIND, OperationOutcome::Attempt);

		let result = span
			.instrument(async move {
				let mut url = self.url(project)?;
				let _guard = self.locks.lock(url.path()).await;

				url.query_pairs_mut().append_pair("updateMask", UPDATE_MASK);

				let patch = AuthConfigPatch::from(update);

				match self.http.patch::<_, serde_json::Value>(url, &patch).await {
					Ok(_) => tracing::info!(project = %project, "Updated auth config."),
					Err(e) if e.is_not_found() => return Ok(None),
					Err(e) => return Err(e),
				}

				self.fetch(project).await
			})
			.await;

		obs::record_operation_outcome(KIND, OperationOutcome::of(&result));

		result
	}

	/// Creation and update share the same partial write.
	pub async fn apply(
		&self,
		project: &ProjectId,
		update: &AuthConfigUpdate,
	) -> Result<Option<AuthConfig>> {
		self.update(project, update).await
	}

	/// Leaves the config in place; a project always has one.
	pub async fn delete(&self, project: &ProjectId) -> Result<()> {
		const KIND: OperationKind = OperationKind::AuthConfigDelete;

		obs::record_operation_outcome(KIND, OperationOutcome::Attempt);

		let _span = OperationSpan::new(KIND, "delete").entered();

		tracing::info!(project = %project, "Not deleting auth config; the project keeps its config.");
		obs::record_operation_outcome(KIND, OperationOutcome::Success);

		Ok(())
	}

	async fn fetch(&self, project: &ProjectId) -> Result<Option<AuthConfig>> {
		match self.http.get(self.url(project)?).await {
			Ok(config) => Ok(Some(config)),
			Err(e) if e.is_not_found() => Ok(None),
			Err(e) => Err(e),
		}
	}

	fn url(&self, project: &ProjectId) -> Result<Url> {
		http::endpoint(&self.base_path, &format!("projects/{project}/config"))
	}
}
