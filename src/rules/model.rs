//! Wire shapes of the Firebase Rules API.

// self
use crate::_prelude::*;

/// Immutable ruleset; `name` and `create_time` are assigned by the server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ruleset {
	/// `projects/{project}/rulesets/{uuid}`.
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub name: String,
	/// Rule sources.
	pub source: Source,
	/// Creation time.
	#[serde(
		default,
		with = "time::serde::rfc3339::option",
		skip_serializing_if = "Option::is_none"
	)]
	pub create_time: Option<OffsetDateTime>,
}
impl Ruleset {
	/// Unsaved ruleset holding a single source file.
	pub fn single(file_name: &str, content: &str) -> Self {
		Self {
			name: String::new(),
			source: Source {
				files: vec![SourceFile {
					name: file_name.to_owned(),
					content: content.to_owned(),
					fingerprint: None,
				}],
			},
			create_time: None,
		}
	}

	/// Content of the first source file.
	pub fn first_content(&self) -> Option<&str> {
		self.source.files.first().map(|file| file.content.as_str())
	}
}

/// Ordered source files of a ruleset.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
	/// Files in declaration order.
	#[serde(default)]
	pub files: Vec<SourceFile>,
}

/// One rules source file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
	/// File name, e.g. `firestore.rules`.
	pub name: String,
	/// Rules text.
	pub content: String,
	/// Server-computed fingerprint.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub fingerprint: Option<String>,
}

/// Named pointer from a rule family to its active ruleset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
	/// `projects/{project}/releases/{release-id}`.
	pub name: String,
	/// Ruleset the release points at.
	pub ruleset_name: String,
	/// Creation time of the release.
	#[serde(with = "time::serde::rfc3339")]
	pub create_time: OffsetDateTime,
	/// Last repoint time.
	#[serde(
		default,
		with = "time::serde::rfc3339::option",
		skip_serializing_if = "Option::is_none"
	)]
	pub update_time: Option<OffsetDateTime>,
}

/// One page of `projects/{project}/releases`.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListReleasesResponse {
	/// Releases on this page, in server order.
	#[serde(default)]
	pub releases: Vec<Release>,
	/// Token for the next page; absent or empty on the last one.
	#[serde(default)]
	pub next_page_token: Option<String>,
}

/// `PATCH` body repointing a release.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateReleaseRequest<'a> {
	pub(crate) release: ReleasePointer<'a>,
	pub(crate) update_mask: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReleasePointer<'a> {
	pub(crate) name: &'a str,
	pub(crate) ruleset_name: &'a str,
}
