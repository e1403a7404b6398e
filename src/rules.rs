//! Firebase security rules: two-phase deployment and read-back of the live ruleset.
//!
//! A deployment first creates an immutable [`Ruleset`], then repoints the family's [`Release`] at
//! it. Rulesets are never deleted, so removing rules is a no-op that leaves the latest release in
//! place. [`latest_active`] decides which ruleset is live from the release history.

pub mod deploy;
pub mod model;
pub mod read;
pub mod resolver;

pub use model::*;
pub use read::*;
pub use resolver::*;

// self
use crate::{
	_prelude::*,
	auth::ProjectId,
	http::{self, HttpClient},
	lock::KeyedLocks,
	obs::{self, OperationKind, OperationOutcome, OperationSpan},
};

/// Rule family deployed through its own release.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RuleFamily {
	/// Cloud Firestore security rules.
	Firestore,
	/// Cloud Storage for Firebase security rules.
	Storage,
}
impl RuleFamily {
	/// Source file name recorded inside the ruleset.
	pub const fn file_name(self) -> &'static str {
		match self {
			Self::Firestore => "firestore.rules",
			Self::Storage => "storage.rules",
		}
	}

	/// Substring identifying this family's releases.
	pub const fn discriminator(self) -> &'static str {
		match self {
			Self::Firestore => "cloud.firestore",
			Self::Storage => "firebase.storage",
		}
	}

	/// Release id; storage rules are released per default bucket.
	pub fn release_id(self, project: &ProjectId) -> String {
		match self {
			Self::Firestore => self.discriminator().to_owned(),
			Self::Storage => format!("{}/{project}.appspot.com", self.discriminator()),
		}
	}

	/// Full release name, `projects/{project}/releases/{release-id}`.
	pub fn release_name(self, project: &ProjectId) -> String {
		format!("projects/{project}/releases/{}", self.release_id(project))
	}
}
impl Display for RuleFamily {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.file_name())
	}
}

/// Client for the Firebase Rules API.
#[derive(Clone, Debug)]
pub struct RulesClient {
	http: HttpClient,
	base_path: String,
	locks: KeyedLocks,
}
impl RulesClient {
	/// Issues requests through `http` against `base_path`; `locks` serializes deployments per
	/// release.
	pub fn new(http: HttpClient, base_path: impl Into<String>, locks: KeyedLocks) -> Self {
		Self { http, base_path: base_path.into(), locks }
	}

	/// Deploys `content` and returns the converged state read back from the server.
	pub async fn apply(
		&self,
		project: &ProjectId,
		family: RuleFamily,
		content: &str,
	) -> Result<Option<RuleState>> {
		self.deploy(project, family, content).await?;
		self.read(project, family).await
	}

	/// Leaves rules untouched: a family always needs an active ruleset, so the newest one stays.
	pub async fn delete(&self, project: &ProjectId, family: RuleFamily) -> Result<()> {
		const KIND: OperationKind = OperationKind::RulesDelete;

		let span = OperationSpan::new(KIND, "delete");

		obs::record_operation_outcome(KIND, OperationOutcome::Attempt);

		span.instrument(async {
			tracing::info!(
				project = %project,
				family = %family,
				"Not deleting rules; the newest ruleset stays the active release."
			);
		})
		.await;

		obs::record_operation_outcome(KIND, OperationOutcome::Success);

		Ok(())
	}

	fn url(&self, path: &str) -> Result<Url> {
		http::endpoint(&self.base_path, path)
	}
}
