//! Selection of the live ruleset from a release history.

// self
use crate::rules::Release;

/// Returns the ruleset of the most recently created release whose name contains `discriminator`.
///
/// The history may arrive in any order. Releases sharing the newest `create_time` resolve to the
/// one listed first by the server, since the sort is stable.
pub fn latest_active<'a>(releases: &'a [Release], discriminator: &str) -> Option<&'a str> {
	let mut matching =
		releases.iter().filter(|release| release.name.contains(discriminator)).collect::<Vec<_>>();

	matching.sort_by(|a, b| b.create_time.cmp(&a.create_time));

	matching.first().map(|release| release.ruleset_name.as_str())
}
