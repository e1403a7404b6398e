// crates.io
use time::macros::format_description;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt::time::UtcTime};
// self
use crate::{_prelude::*, error::ConfigError};

/// Log lines carrying this text are gRPC-style connection teardown noise and are never emitted.
pub const SUPPRESSED_LOG_FRAGMENT: &str = "transport is closing";

/// Logging configuration threaded explicitly into the transport chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
	/// Enables request/response dumps in the logging transport.
	pub verbose: bool,
	/// `EnvFilter` directives used by [`LogConfig::init`].
	pub directives: String,
}
impl LogConfig {
	const ENV_KEY: &'static str = "RUST_LOG";

	/// Reads `RUST_LOG`, falling back to `info`.
	pub fn from_env() -> Self {
		match std::env::var(Self::ENV_KEY) {
			Ok(directives) if !directives.trim().is_empty() => Self::from_directives(directives),
			_ => Self::default(),
		}
	}

	/// Builds a config from filter directives; `verbose` is set when they enable `debug` or `trace`.
	pub fn from_directives(directives: impl Into<String>) -> Self {
		let directives = directives.into();
		let verbose = EnvFilter::try_new(&directives)
			.ok()
			.and_then(|filter| filter.max_level_hint())
			.is_some_and(|level| level >= LevelFilter::DEBUG);

		Self { verbose, directives }
	}

	/// Returns `true` when a message may be logged.
	pub fn allows(&self, message: &str) -> bool {
		!message.contains(SUPPRESSED_LOG_FRAGMENT)
	}

	/// Installs a global fmt subscriber with a `YYYY/MM/DD HH:MM:SS` UTC timer.
	pub fn init(&self) -> Result<(), ConfigError> {
		let filter = EnvFilter::try_new(&self.directives)
			.map_err(|e| ConfigError::LoggerInit { source: Box::new(e) })?;

		tracing_subscriber::fmt()
			.with_env_filter(filter)
			.with_timer(UtcTime::new(format_description!(
				"[year]/[month]/[day] [hour]:[minute]:[second]"
			)))
			.try_init()
			.map_err(|source| ConfigError::LoggerInit { source })
	}
}
impl Default for LogConfig {
	fn default() -> Self {
		Self { verbose: false, directives: "info".into() }
	}
}
