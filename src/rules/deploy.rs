//! Create-then-release deployment.

// self
use crate::{
	_prelude::*,
	auth::ProjectId,
	error::DeploymentError,
	obs::{self, OperationKind, OperationOutcome, OperationSpan},
	rules::{
		Release, RuleFamily, RulesClient, Ruleset,
		model::{ReleasePointer, UpdateReleaseRequest},
	},
};

const RULESET_NAME_MASK: &str = "rulesetName";

impl RulesClient {
	/// Creates a ruleset holding `content` and points the family release at it.
	///
	/// A failed create aborts before the release is touched. A failed release reports the
	/// orphaned ruleset name; nothing is rolled back.
	pub async fn deploy(
		&self,
		project: &ProjectId,
		family: RuleFamily,
		content: &str,
	) -> Result<Release> {
		const KIND: OperationKind = OperationKind::RulesDeploy;

		let span = OperationSpan::new(KIND, "deploy");

		obs::record_operation_outcome(KIND, OperationOutcome::Attempt);

		let result = span
			.instrument(async move {
				let release_name = family.release_name(project);
				let _guard = self.locks.lock(&release_name).await;
				let ruleset = self
					.create_ruleset(project, family, content)
					.await
					.map_err(DeploymentError::create)?;

				tracing::debug!(ruleset = %ruleset.name, release = %release_name, "Created ruleset.");

				let release = self
					.update_release(project, family, &release_name, &ruleset.name)
					.await
					.map_err(|e| DeploymentError::release(ruleset.name.clone(), e))?;

				tracing::info!(
					ruleset = %release.ruleset_name,
					release = %release.name,
					"Released new ruleset."
				);

				Ok(release)
			})
			.await;

		obs::record_operation_outcome(KIND, OperationOutcome::of(&result));

		result
	}

	async fn create_ruleset(
		&self,
		project: &ProjectId,
		family: RuleFamily,
		content: &str,
	) -> Result<Ruleset> {
		let url = self.url(&format!("projects/{project}/rulesets"))?;
		let ruleset: Ruleset =
			self.http.post(url.clone(), &Ruleset::single(family.file_name(), content)).await?;

		if ruleset.name.is_empty() {
			return Err(Error::UnexpectedShape {
				resource: url.to_string(),
				reason: "created ruleset has no name".into(),
			});
		}

		Ok(ruleset)
	}

	async fn update_release(
		&self,
		project: &ProjectId,
		family: RuleFamily,
		release_name: &str,
		ruleset_name: &str,
	) -> Result<Release> {
		let mut url = self.url(&format!("projects/{project}/releases/{}", family.release_id(project)))?;

		url.query_pairs_mut().append_pair("updateMask", RULESET_NAME_MASK);

		let body = UpdateReleaseRequest {
			release: ReleasePointer { name: release_name, ruleset_name },
			update_mask: RULESET_NAME_MASK,
		};

		self.http.patch(url, &body).await
	}
}
