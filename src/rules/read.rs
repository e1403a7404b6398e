//! Read-back of the live ruleset for a family.

// self
use crate::{
	_prelude::*,
	auth::ProjectId,
	obs::{self, OperationKind, OperationOutcome, OperationSpan},
	rules::{ListReleasesResponse, Release, RuleFamily, RulesClient, Ruleset, latest_active},
};

/// Live ruleset of a family as currently released.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuleState {
	/// `projects/{project}/rulesets/{uuid}`.
	pub ruleset_name: String,
	/// Rules text of the ruleset's first source file.
	pub content: String,
}

impl RulesClient {
	/// Reads the live ruleset of `family`.
	///
	/// Returns `None` when the family has no release yet or the resources vanished in the
	/// meantime.
	pub async fn read(&self, project: &ProjectId, family: RuleFamily) -> Result<Option<RuleState>> {
		const KIND: OperationKind = OperationKind::RulesRead;

		let span = OperationSpan::new(KIND, "read");

		obs::record_operation_outcome(KIND, OperationOutcome::Attempt);

		let result = span
			.instrument(async move {
				let releases = match self.list_releases(project).await {
					Ok(releases) => releases,
					Err(e) if e.is_not_found() => return Ok(None),
					Err(e) => return Err(e),
				};
				let Some(ruleset_name) = latest_active(&releases, family.discriminator()) else {
					tracing::debug!(project = %project, family = %family, "No release for family.");

					return Ok(None);
				};
				let url = self.url(ruleset_name)?;
				let ruleset: Ruleset = match self.http.get(url.clone()).await {
					Ok(ruleset) => ruleset,
					Err(e) if e.is_not_found() => return Ok(None),
					Err(e) => return Err(e),
				};
				let content = ruleset.first_content().ok_or_else(|| Error::UnexpectedShape {
					resource: url.to_string(),
					reason: "ruleset has no source files".into(),
				})?;

				tracing::debug!(ruleset = ruleset_name, "Read live ruleset.");

				Ok(Some(RuleState {
					ruleset_name: ruleset_name.to_owned(),
					content: content.to_owned(),
				}))
			})
			.await;

		obs::record_operation_outcome(KIND, OperationOutcome::of(&result));

		result
	}

	/// Lists every release of `project`, following `nextPageToken`.
	pub async fn list_releases(&self, project: &ProjectId) -> Result<Vec<Release>> {
		let mut releases = Vec::new();
		let mut page_token: Option<String> = None;

		loop {
			let mut url = self.url(&format!("projects/{project}/releases"))?;

			if let Some(token) = &page_token {
				url.query_pairs_mut().append_pair("pageToken", token);
			}

			let page: ListReleasesResponse = self.http.get(url).await?;

			releases.extend(page.releases);

			match page.next_page_token.filter(|token| !token.is_empty()) {
				Some(token) => page_token = Some(token),
				None => return Ok(releases),
			}
		}
	}
}
