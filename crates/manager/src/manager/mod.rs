//! Manager actor: a named owner of state that serves requests one at a time.

use std::any::{Any, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use std::thread::JoinHandle;

use parking_lot::Mutex;

use crate::mailbox::{MailboxReceiver, MailboxSendError, MailboxSender, mailbox};
use crate::registry::RegistryShared;
use crate::request::KILL_ROUTE;
use crate::{ManagerError, Payload, Reply, Request, Result, Ticket};

mod dispatch;

/// Result of one type-erased handler invocation.
enum Invocation {
	Done(anyhow::Result<Reply>),
	StateMismatch(&'static str),
}

type ErasedHandler = Arc<dyn Fn(&mut dyn Any, Payload) -> Invocation + Send + Sync>;

/// Lifecycle of a manager's dispatch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
	/// Created, loop not started. Requests queue up in the mailbox.
	Idle,
	/// Loop is serving requests.
	Running,
	/// Loop has exited after a kill request.
	Stopped,
}

struct ManagerInner {
	routes: HashMap<String, ErasedHandler>,
	lifecycle: Lifecycle,
	mailbox: Option<MailboxReceiver>,
}

/// Named actor owning one piece of state.
///
/// All access to the state goes through handlers attached by route. The
/// dispatch loop runs exactly one handler at a time, so handlers never need
/// to synchronize over the state themselves.
pub struct Manager {
	name: String,
	tx: MailboxSender,
	inner: Mutex<ManagerInner>,
	report_errors: bool,
	registry: Weak<RegistryShared>,
}

impl fmt::Debug for Manager {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Manager")
			.field("name", &self.name)
			.field("buffer_size", &self.tx.capacity())
			.field("lifecycle", &self.lifecycle())
			.finish_non_exhaustive()
	}
}

impl Manager {
	pub(crate) fn new(name: String, buffer_size: usize, report_errors: bool, registry: Weak<RegistryShared>) -> Self {
		let (tx, rx) = mailbox(buffer_size);
		Self {
			name,
			tx,
			inner: Mutex::new(ManagerInner {
				routes: HashMap::new(),
				lifecycle: Lifecycle::Idle,
				mailbox: Some(rx),
			}),
			report_errors,
			registry,
		}
	}

	/// Manager name.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Mailbox capacity.
	pub fn buffer_size(&self) -> usize {
		self.tx.capacity()
	}

	/// Number of requests waiting in the mailbox.
	pub fn pending(&self) -> usize {
		self.tx.pending()
	}

	/// Current lifecycle state.
	pub fn lifecycle(&self) -> Lifecycle {
		self.inner.lock().lifecycle
	}

	/// Returns true while the dispatch loop is serving requests.
	pub fn is_running(&self) -> bool {
		self.lifecycle() == Lifecycle::Running
	}

	/// Attached route names, sorted.
	pub fn routes(&self) -> Vec<String> {
		let mut routes: Vec<_> = self.inner.lock().routes.keys().cloned().collect();
		routes.sort();
		routes
	}

	/// Attaches a handler, replacing any handler already on `route`.
	///
	/// The handler receives the state the manager is started with; `S` must
	/// match that type or requests on this route fail with
	/// [`ManagerError::StateMismatch`]. A request that is already being
	/// dispatched keeps the handler it started with.
	pub fn attach<S, F>(&self, route: impl Into<String>, handler: F) -> Result<()>
	where
		S: Send + 'static,
		F: Fn(&mut S, Payload) -> anyhow::Result<Reply> + Send + Sync + 'static,
	{
		let route = route.into();
		if route == KILL_ROUTE {
			return Err(ManagerError::ReservedRoute { route });
		}

		let erased: ErasedHandler = Arc::new(move |state: &mut dyn Any, payload| match state.downcast_mut::<S>() {
			Some(state) => Invocation::Done(handler(state, payload)),
			None => Invocation::StateMismatch(type_name::<S>()),
		});
		let replaced = self.inner.lock().routes.insert(route.clone(), erased).is_some();
		tracing::trace!(manager = %self.name, route = %route, replaced, "manager.attach");
		Ok(())
	}

	/// Removes a route. Returns whether a handler was attached.
	pub fn detach(&self, route: &str) -> bool {
		let removed = self.inner.lock().routes.remove(route).is_some();
		tracing::trace!(manager = %self.name, route, removed, "manager.detach");
		removed
	}

	fn handler(&self, route: &str) -> Option<ErasedHandler> {
		self.inner.lock().routes.get(route).cloned()
	}

	/// Runs the dispatch loop on the calling thread until a kill request
	/// arrives.
	///
	/// Blocks the thread for the lifetime of the manager. Use [`Self::start`]
	/// from async code.
	///
	/// Fails with [`ManagerError::AlreadyStarted`] if the loop was started
	/// before.
	///
	/// # Panics
	///
	/// Panics when called from within an async runtime.
	pub fn run<S>(&self, state: S) -> Result<()>
	where
		S: Send + 'static,
	{
		let rx = self.begin()?;
		self.serve(rx, state);
		Ok(())
	}

	/// Spawns the dispatch loop on a dedicated thread and returns
	/// immediately.
	///
	/// Each manager owns its thread, so a handler that blocks only delays
	/// requests to its own manager.
	pub fn start<S>(self: &Arc<Self>, state: S) -> Result<JoinHandle<()>>
	where
		S: Send + 'static,
	{
		let rx = self.begin()?;
		let manager = Arc::clone(self);
		crate::spawn::spawn_named_thread(&self.name, move || manager.serve(rx, state)).map_err(|source| {
			self.inner.lock().lifecycle = Lifecycle::Stopped;
			ManagerError::Spawn {
				name: self.name.clone(),
				source,
			}
		})
	}

	/// Enqueues a request without waiting for its response. Waits for
	/// mailbox capacity when full.
	pub async fn send(&self, route: impl Into<String>, payload: Payload) -> Result<Ticket> {
		self.send_request(Request::new(route, payload)).await
	}

	/// Enqueues a caller-built request. Waits for mailbox capacity when full.
	pub async fn send_request(&self, request: Request) -> Result<Ticket> {
		let (envelope, ticket) = request.into_parts();
		tracing::trace!(manager = %self.name, route = %envelope.route, "manager.send");
		self.tx.send(envelope).await.map_err(|err| self.send_error(err))?;
		Ok(ticket)
	}

	/// Enqueues a request without waiting for capacity.
	///
	/// Usable from synchronous handlers, e.g. to forward work to another
	/// manager and reply with the resulting [`Ticket`].
	pub fn try_send(&self, route: impl Into<String>, payload: Payload) -> Result<Ticket> {
		self.try_send_request(Request::new(route, payload))
	}

	/// Non-blocking variant of [`Self::send_request`].
	pub fn try_send_request(&self, request: Request) -> Result<Ticket> {
		let (envelope, ticket) = request.into_parts();
		tracing::trace!(manager = %self.name, route = %envelope.route, "manager.try_send");
		self.tx.try_send(envelope).map_err(|err| self.send_error(err))?;
		Ok(ticket)
	}

	/// Sends a request and waits for its resolved response.
	pub async fn ask(&self, route: impl Into<String>, payload: Payload) -> Result<Payload> {
		self.send(route, payload).await?.wait().await
	}

	/// Sends a caller-built request and waits for its resolved response.
	pub async fn ask_request(&self, request: Request) -> Result<Payload> {
		self.send_request(request).await?.wait().await
	}

	/// Stops the dispatch loop and waits until it has exited.
	///
	/// Requests queued behind the kill request are answered with
	/// [`ManagerError::Stopped`]. Killing a manager that already stopped fails
	/// with the same error. A manager that was never started only stops once
	/// it is started.
	pub async fn kill(&self) -> Result<()> {
		self.ask_request(Request::kill()).await.map(drop)
	}

	/// Removes this manager from its registry.
	///
	/// Does not stop the loop; fails with [`ManagerError::StillRunning`] while
	/// it runs.
	pub fn remove(&self) -> Result<()> {
		if self.is_running() {
			return Err(ManagerError::StillRunning { name: self.name.clone() });
		}
		if let Some(registry) = self.registry.upgrade() {
			registry.remove(&self.name, self);
		}
		Ok(())
	}

	/// Kills the manager, then removes it from its registry.
	pub async fn kill_and_remove(&self) -> Result<()> {
		self.kill().await?;
		self.remove()
	}

	fn send_error(&self, err: MailboxSendError) -> ManagerError {
		match err {
			MailboxSendError::Closed => ManagerError::Stopped { name: self.name.clone() },
			MailboxSendError::Full => ManagerError::MailboxFull { name: self.name.clone() },
		}
	}
}
