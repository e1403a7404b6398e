//! Per-resource lock registry serializing mutations that target the same remote name.

// crates.io
use async_lock::MutexGuardArc;
// self
use crate::_prelude::*;

/// Guard held while a mutation on one resource name is in flight.
pub type KeyedGuard = MutexGuardArc<()>;

/// Registry of async mutexes keyed by resource name.
///
/// Clones share the same registry, so one instance can be injected into every client touching the
/// same resources. Entries are never evicted; the registry grows with the number of distinct
/// resource names a process touches.
#[derive(Clone, Debug, Default)]
pub struct KeyedLocks {
	guards: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}
impl KeyedLocks {
	/// Returns the mutex for `key`, creating it on first use.
	pub fn guard(&self, key: &str) -> Arc<AsyncMutex<()>> {
		let mut guards = self.guards.lock();

		guards.entry(key.to_owned()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
	}

	/// Waits until no other holder of `key` is active and returns the owning guard.
	pub async fn lock(&self, key: &str) -> KeyedGuard {
		self.guard(key).lock_arc().await
	}

	/// Number of keys seen so far.
	pub fn len(&self) -> usize {
		self.guards.lock().len()
	}

	/// Returns `true` when no key was ever locked.
	pub fn is_empty(&self) -> bool {
		self.guards.lock().is_empty()
	}
}
