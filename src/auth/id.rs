//! Strongly typed identifiers for projects and service accounts.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

macro_rules! def_id {
	($name:ident, $doc:literal, $kind:literal, $check:path) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Creates a new identifier after validation.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				let view = value.as_ref();

				validate_view($kind, view)?;
				$check(view)?;

				Ok(Self(view.to_owned()))
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				validate_view($kind, &value)?;
				$check(&value)?;

				Ok(Self(value))
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
	};
}

const IDENTIFIER_MAX_LEN: usize = 128;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier (project, service account).
		kind: &'static str,
	},
	/// The identifier contains whitespace characters.
	#[error("{kind} identifier contains whitespace.")]
	ContainsWhitespace {
		/// Kind of identifier (project, service account).
		kind: &'static str,
	},
	/// The identifier exceeded the allowed character count.
	#[error("{kind} identifier exceeds {max} characters.")]
	TooLong {
		/// Kind of identifier (project, service account).
		kind: &'static str,
		/// Maximum permitted character count.
		max: usize,
	},
	/// The identifier contains a path separator and would escape its URL segment.
	#[error("{kind} identifier cannot contain '/'.")]
	ContainsSlash {
		/// Kind of identifier (project, service account).
		kind: &'static str,
	},
	/// Service accounts are addressed by email.
	#[error("Service account `{value}` is not an email address.")]
	NotAnEmail {
		/// Offending value.
		value: String,
	},
}

def_id! { ProjectId, "Google Cloud project identifier used in resource names.", "Project", check_project }
def_id! { ServiceAccount, "Service account email, the target or a delegate of impersonation.", "ServiceAccount", check_service_account }
impl ServiceAccount {
	/// IAM resource name with the project wildcard, as expected by IAM Credentials.
	pub fn resource_name(&self) -> String {
		format!("projects/-/serviceAccounts/{}", self.0)
	}
}

fn validate_view(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace { kind });
	}
	if view.len() > IDENTIFIER_MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: IDENTIFIER_MAX_LEN });
	}
	if view.contains('/') {
		return Err(IdentifierError::ContainsSlash { kind });
	}

	Ok(())
}

fn check_project(_: &str) -> Result<(), IdentifierError> {
	Ok(())
}

fn check_service_account(view: &str) -> Result<(), IdentifierError> {
	match view.split_once('@') {
		Some((user, domain)) if !user.is_empty() && !domain.is_empty() => Ok(()),
		_ => Err(IdentifierError::NotAnEmail { value: view.to_owned() }),
	}
}
