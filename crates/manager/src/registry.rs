//! Name-indexed manager registry and the façade built on it.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::Mutex;

use crate::{Manager, ManagerError, Payload, RegistryConfig, Reply, Request, Result, Ticket};

/// Shared registry state. Managers hold a weak reference to it.
#[derive(Debug, Default)]
pub(crate) struct RegistryShared {
	managers: Mutex<HashMap<String, Arc<Manager>>>,
	config: RegistryConfig,
}

impl RegistryShared {
	/// Removes `name` if it still maps to `manager`.
	pub(crate) fn remove(&self, name: &str, manager: &Manager) {
		let mut managers = self.managers.lock();
		if managers.get(name).is_some_and(|entry| std::ptr::eq(Arc::as_ptr(entry), manager)) {
			managers.remove(name);
			tracing::debug!(manager = name, "manager.remove");
		}
	}
}

/// Name → manager lookup table.
///
/// Cloning is cheap and yields a handle to the same table. Every name-based
/// method resolves the manager under the registry lock, releases it, and
/// then forwards to the [`Manager`] method of the same name.
#[derive(Debug, Clone, Default)]
pub struct Registry {
	shared: Arc<RegistryShared>,
}

impl Registry {
	/// Creates an empty registry with default configuration.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates an empty registry with explicit configuration.
	pub fn with_config(config: RegistryConfig) -> Self {
		Self {
			shared: Arc::new(RegistryShared {
				managers: Mutex::new(HashMap::new()),
				config,
			}),
		}
	}

	/// Configuration applied to managers created by this registry.
	pub fn config(&self) -> &RegistryConfig {
		&self.shared.config
	}

	/// Creates and registers a manager that has not been started.
	///
	/// `buffer_size` is the number of requests the mailbox holds before
	/// senders start waiting. Fails without touching the registry if the name
	/// is taken.
	pub fn new_manager(&self, name: impl Into<String>, buffer_size: usize) -> Result<Arc<Manager>> {
		let name = name.into();
		let mut managers = self.shared.managers.lock();
		if managers.contains_key(&name) {
			return Err(ManagerError::AlreadyExists { name });
		}

		let manager = Arc::new(Manager::new(
			name.clone(),
			buffer_size,
			self.shared.config.report_errors,
			Arc::downgrade(&self.shared),
		));
		managers.insert(name.clone(), Arc::clone(&manager));
		tracing::debug!(manager = %name, buffer_size = manager.buffer_size(), "manager.create");
		Ok(manager)
	}

	/// Creates a manager with the configured default buffer size.
	pub fn new_manager_default(&self, name: impl Into<String>) -> Result<Arc<Manager>> {
		self.new_manager(name, self.shared.config.default_buffer_size)
	}

	/// Looks up a manager by name.
	pub fn manager(&self, name: &str) -> Result<Arc<Manager>> {
		self.shared
			.managers
			.lock()
			.get(name)
			.cloned()
			.ok_or_else(|| ManagerError::NotFound { name: name.to_string() })
	}

	/// Returns true if `name` is registered.
	pub fn contains(&self, name: &str) -> bool {
		self.shared.managers.lock().contains_key(name)
	}

	/// Registered names, sorted.
	pub fn names(&self) -> Vec<String> {
		let mut names: Vec<_> = self.shared.managers.lock().keys().cloned().collect();
		names.sort();
		names
	}

	/// Number of registered managers.
	pub fn len(&self) -> usize {
		self.shared.managers.lock().len()
	}

	/// Returns true if no manager is registered.
	pub fn is_empty(&self) -> bool {
		self.shared.managers.lock().is_empty()
	}

	/// Enqueues a request on the named manager. See [`Manager::send`].
	pub async fn send(&self, name: &str, route: impl Into<String>, payload: Payload) -> Result<Ticket> {
		self.manager(name)?.send(route, payload).await
	}

	/// Sends to the named manager and waits for the resolved response.
	pub async fn ask(&self, name: &str, route: impl Into<String>, payload: Payload) -> Result<Payload> {
		self.manager(name)?.ask(route, payload).await
	}

	/// Enqueues a caller-built request on the named manager.
	pub async fn send_request(&self, name: &str, request: Request) -> Result<Ticket> {
		self.manager(name)?.send_request(request).await
	}

	/// Sends a caller-built request to the named manager and waits for the
	/// resolved response.
	pub async fn ask_request(&self, name: &str, request: Request) -> Result<Payload> {
		self.manager(name)?.ask_request(request).await
	}

	/// Attaches a handler on the named manager. See [`Manager::attach`].
	pub fn attach<S, F>(&self, name: &str, route: impl Into<String>, handler: F) -> Result<()>
	where
		S: Send + 'static,
		F: Fn(&mut S, Payload) -> anyhow::Result<Reply> + Send + Sync + 'static,
	{
		self.manager(name)?.attach(route, handler)
	}

	/// Detaches a route. Returns whether a handler was attached.
	pub fn detach(&self, name: &str, route: &str) -> Result<bool> {
		Ok(self.manager(name)?.detach(route))
	}

	/// Spawns the manager's dispatch loop on its own thread with `state` and
	/// returns immediately.
	pub fn start<S>(&self, name: &str, state: S) -> Result<JoinHandle<()>>
	where
		S: Send + 'static,
	{
		self.manager(name)?.start(state)
	}

	/// Stops the named manager's dispatch loop. See [`Manager::kill`].
	pub async fn kill(&self, name: &str) -> Result<()> {
		self.manager(name)?.kill().await
	}

	/// Unregisters the named manager; fails while it is running.
	pub fn remove(&self, name: &str) -> Result<()> {
		self.manager(name)?.remove()
	}

	/// Stops the named manager, then unregisters it.
	pub async fn kill_and_remove(&self, name: &str) -> Result<()> {
		self.manager(name)?.kill_and_remove().await
	}
}
