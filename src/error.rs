//! Crate-level error types shared by credentials, transport, and the rules protocol.

// std
use std::io::ErrorKind;
// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Credential material is missing, malformed, or was rejected.
	#[error(transparent)]
	Credential(#[from] CredentialError),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeout) that survived the retry layer.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Two-phase deployment failed; the phase tells whether a ruleset was orphaned.
	#[error(transparent)]
	Deployment(#[from] DeploymentError),

	/// Backing resource does not exist.
	#[error("Resource {resource} was not found.")]
	NotFound {
		/// URL or name of the missing resource.
		resource: String,
	},
	/// Backend answered with a non-success status.
	#[error("Request to {resource} failed with HTTP {status}: {message}.")]
	Api {
		/// URL of the failing request.
		resource: String,
		/// HTTP status code.
		status: u16,
		/// Message extracted from the error envelope, or the raw body.
		message: String,
	},
	/// Response body does not match the expected schema.
	#[error("Response from {resource} could not be decoded.")]
	Decode {
		/// URL of the request whose response failed to decode.
		resource: String,
		/// Structured decode failure including the JSON path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Response decoded but lacks data the operation requires.
	#[error("Response from {resource} has an unexpected shape: {reason}.")]
	UnexpectedShape {
		/// URL or name of the resource.
		resource: String,
		/// What was missing or inconsistent.
		reason: String,
	},
}
impl Error {
	/// Returns `true` when the error reports a missing backing resource.
	pub fn is_not_found(&self) -> bool {
		matches!(self, Self::NotFound { .. })
	}
}

/// Failures raised while resolving credentials into a token source.
#[derive(Debug, ThisError)]
pub enum CredentialError {
	/// A path-referenced credential file exists but could not be read.
	#[error("Failed to read credentials from {path}.")]
	Read {
		/// Path that failed to load.
		path: String,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// Credential content is not a valid credentials document.
	#[error("Unable to parse credentials from '{content}'.")]
	MalformedJson {
		/// Offending content, kept for diagnostics.
		content: String,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Credentials document declares a type this crate cannot use.
	#[error("Credentials of type `{kind}` are not supported.")]
	UnsupportedType {
		/// The `type` field of the document.
		kind: String,
	},
	/// Impersonation URL inside an `impersonated_service_account` document is unusable.
	#[error("Service account impersonation URL `{url}` is invalid.")]
	InvalidImpersonationUrl {
		/// Offending URL.
		url: String,
	},
	/// No ambient default credentials could be discovered.
	#[error(
		"Attempted to load application default credentials since neither `credentials` nor `access_token` was set. No credentials loaded. To use your gcloud credentials, run 'gcloud auth application-default login'."
	)]
	NoDefaultCredentials {
		/// Discovery failure reported by the default-credentials provider.
		#[source]
		source: BoxError,
	},
	/// Token provider failed to mint a token.
	#[error("Token provider failed to issue an access token.")]
	Provider {
		/// Provider-specific failure.
		#[source]
		source: BoxError,
	},
	/// Token endpoint rejected the exchange.
	#[error("Token endpoint {endpoint} rejected the exchange with HTTP {status}: {message}.")]
	Exchange {
		/// Endpoint that rejected the request.
		endpoint: String,
		/// HTTP status code, when available.
		status: u16,
		/// Body or error message returned upstream.
		message: String,
	},
	/// Token exchange failed at the transport layer.
	#[error("Token endpoint could not be reached.")]
	Transport(#[from] TransportError),
}
impl CredentialError {
	/// Wraps a token provider failure.
	pub fn provider(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Provider { source: Box::new(src) }
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// No project was configured or supplied for the operation.
	#[error("Project is not set; configure `project` or one of the project environment variables.")]
	MissingProject,
	/// A custom endpoint does not have the expected `<scheme>://host/.../<version>/` shape.
	#[error("Endpoint `{name}` has an invalid value `{value}`.")]
	InvalidEndpoint {
		/// Configuration key of the endpoint.
		name: &'static str,
		/// Offending value.
		value: String,
	},
	/// A configured scope is invalid.
	#[error("Requested scopes are invalid.")]
	InvalidScope(#[from] crate::auth::ScopeValidationError),
	/// A configured identifier is invalid.
	#[error("Configured identifier is invalid.")]
	InvalidIdentifier(#[from] crate::auth::IdentifierError),
	/// Batching configuration could not be parsed.
	#[error("Unable to parse duration from 'send_after' value {value:?}.")]
	InvalidSendAfter {
		/// Offending value.
		value: String,
	},
	/// Tracing subscriber could not be installed.
	#[error("Log subscriber could not be installed.")]
	LoggerInit {
		/// Underlying subscriber failure.
		#[source]
		source: BoxError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling {url}.")]
	Network {
		/// Request URL.
		url: String,
		/// Transport-specific network error.
		#[source]
		source: ReqwestError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred during transport.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a reqwest failure for the given URL.
	pub fn network(url: &Url, source: ReqwestError) -> Self {
		Self::Network { url: url.to_string(), source }
	}

	/// Classifies the failure as transient (safe to resend) or fatal.
	pub fn is_transient(&self) -> bool {
		match self {
			Self::Network { source, .. } =>
				source.is_timeout() || source.is_connect() || chain_has_transient_io(source),
			Self::Io(e) => is_transient_io(e.kind()),
		}
	}
}

/// Phase of the two-phase rules deployment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeploymentPhase {
	/// Creating the immutable ruleset.
	Create,
	/// Repointing the release at the new ruleset.
	Release,
}
impl Display for DeploymentPhase {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Create => f.write_str("create"),
			Self::Release => f.write_str("release"),
		}
	}
}

/// Deployment failure tagged with the phase that failed.
#[derive(Debug, ThisError)]
#[error("Rules deployment failed during the {phase} phase{}.", orphan_suffix(.ruleset))]
pub struct DeploymentError {
	/// Phase that failed.
	pub phase: DeploymentPhase,
	/// Ruleset created in phase one and left unreferenced when phase two failed.
	pub ruleset: Option<String>,
	/// Underlying failure.
	#[source]
	pub source: Box<Error>,
}
impl DeploymentError {
	/// Failure while creating the ruleset; nothing was left behind.
	pub fn create(source: Error) -> Self {
		Self { phase: DeploymentPhase::Create, ruleset: None, source: Box::new(source) }
	}

	/// Failure while patching the release; `ruleset` is now orphaned.
	pub fn release(ruleset: impl Into<String>, source: Error) -> Self {
		Self {
			phase: DeploymentPhase::Release,
			ruleset: Some(ruleset.into()),
			source: Box::new(source),
		}
	}
}

fn orphan_suffix(ruleset: &Option<String>) -> String {
	match ruleset {
		Some(name) => format!(" (ruleset {name} was created but is not released)"),
		None => String::new(),
	}
}

fn chain_has_transient_io(err: &ReqwestError) -> bool {
	let mut source = StdError::source(err);

	while let Some(cause) = source {
		if let Some(io) = cause.downcast_ref::<std::io::Error>()
			&& is_transient_io(io.kind())
		{
			return true;
		}
		if cause.to_string().contains("connection reset") {
			return true;
		}

		source = cause.source();
	}

	false
}

fn is_transient_io(kind: ErrorKind) -> bool {
	matches!(
		kind,
		ErrorKind::ConnectionReset
			| ErrorKind::ConnectionAborted
			| ErrorKind::ConnectionRefused
			| ErrorKind::BrokenPipe
			| ErrorKind::UnexpectedEof
			| ErrorKind::TimedOut
	)
}
