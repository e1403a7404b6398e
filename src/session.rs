//! Session bootstrap: configuration to authenticated API clients.

// self
use crate::{
	_prelude::*,
	auth::ProjectId,
	auth_config::AuthConfigClient,
	batch::{ImmediateBatcher, RequestBatcher},
	config::Config,
	credentials::{AmbientProvider, CredentialResolver},
	http::{HttpClient, TransportChain},
	identity::{IdentityLogger, IdentityReport},
	lock::KeyedLocks,
	obs::{self, OperationKind, OperationOutcome, OperationSpan},
	rules::RulesClient,
};

/// Resolved credentials plus the clients built over the final transport chain.
///
/// The token source and HTTP client are immutable after [`Session::load`], so one session can be
/// shared across concurrent operations.
#[derive(Clone)]
pub struct Session {
	config: Config,
	identity: IdentityReport,
	http: HttpClient,
	rules: RulesClient,
	auth_config: AuthConfigClient,
	batcher: Arc<dyn RequestBatcher>,
}
impl Session {
	/// Validates `config`, reports the caller identity, and builds the clients.
	pub async fn load(config: Config) -> Result<Self> {
		Self::load_with(config, None).await
	}

	/// Same as [`Session::load`] with a custom ambient default-credentials provider.
	pub async fn load_with(
		mut config: Config,
		ambient: Option<Arc<dyn AmbientProvider>>,
	) -> Result<Self> {
		const KIND: OperationKind = OperationKind::SessionLoad;

		let span = OperationSpan::new(KIND, "load");

		obs::record_operation_outcome(KIND, OperationOutcome::Attempt);

		let result = span
			.instrument(async move {
				config.validate()?;

				let scopes = config.scope_set()?;
				let chain = TransportChain::from_config(&config, &config.log);
				let mut resolver =
					CredentialResolver::from_config(&config, chain.token_transport()?);

				if let Some(ambient) = ambient {
					resolver = resolver.with_ambient_provider(ambient);
				}

				let bootstrap = IdentityLogger::new(&chain, &config.userinfo_endpoint)?
					.report(&resolver, &scopes)
					.await?;
				let http = chain.build(bootstrap.source)?;
				let locks = KeyedLocks::default();
				let rules =
					RulesClient::new(http.clone(), config.rules_base_path.clone(), locks.clone());
				let auth_config = AuthConfigClient::new(
					http.clone(),
					config.identity_platform_base_path.clone(),
					locks,
				);
				let batcher = Arc::new(ImmediateBatcher::new(config.batching.clone()));

				Ok(Self { config, identity: bootstrap.identity, http, rules, auth_config, batcher })
			})
			.await;

		obs::record_operation_outcome(KIND, OperationOutcome::of(&result));

		result
	}

	/// Effective project: `explicit` when non-empty, else the configured default.
	pub fn project(&self, explicit: Option<&str>) -> Result<ProjectId> {
		Ok(self.config.project_id(explicit)?)
	}

	/// Validated configuration the session was built from.
	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Identities reported during bootstrap.
	pub fn identity(&self) -> &IdentityReport {
		&self.identity
	}

	/// Client over the full transport chain.
	pub fn http(&self) -> &HttpClient {
		&self.http
	}

	/// Firebase Rules client.
	pub fn rules(&self) -> &RulesClient {
		&self.rules
	}

	/// Identity Platform config client.
	pub fn auth_config(&self) -> &AuthConfigClient {
		&self.auth_config
	}

	/// Request batcher for administrative calls.
	pub fn batcher(&self) -> &Arc<dyn RequestBatcher> {
		&self.batcher
	}
}
impl Debug for Session {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Session")
			.field("project", &self.config.project)
			.field("identity", &self.identity)
			.finish_non_exhaustive()
	}
}
