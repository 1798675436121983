//! Error types shared by managers, requests and the registry.

use thiserror::Error;

/// Errors surfaced by manager operations and request responses.
///
/// Registry-level failures (`AlreadyExists`, `NotFound`, `StillRunning`) are
/// returned directly from the call that caused them. Dispatch failures
/// (`RouteNotFound`, `Handler`, `HandlerPanicked`, `StateMismatch`) only ever
/// reach the caller waiting on the affected request.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ManagerError {
	/// A manager with this name is already registered.
	#[error("manager `{name}` already exists")]
	AlreadyExists { name: String },

	/// No manager with this name is registered.
	#[error("manager `{name}` is not registered or has been removed")]
	NotFound { name: String },

	/// The request route has no attached handler.
	#[error("no function named `{route}` on manager `{manager}`")]
	RouteNotFound { manager: String, route: String },

	/// The handler returned an error.
	#[error("handler `{route}` on manager `{manager}` failed: {source}")]
	Handler {
		manager: String,
		route: String,
		source: anyhow::Error,
	},

	/// The handler panicked while processing the request.
	#[error("handler `{route}` on manager `{manager}` panicked: {message}")]
	HandlerPanicked { manager: String, route: String, message: String },

	/// The handler was attached for a different state type than the one the
	/// manager was started with.
	#[error("handler `{route}` on manager `{manager}` expects state of type `{expected}`")]
	StateMismatch {
		manager: String,
		route: String,
		expected: &'static str,
	},

	/// Removal was attempted while the dispatch loop is still running.
	#[error("manager `{name}` is currently running")]
	StillRunning { name: String },

	/// The dispatch loop was already started once.
	#[error("manager `{name}` has already been started")]
	AlreadyStarted { name: String },

	/// The manager stopped before it could process the request.
	#[error("manager `{name}` has stopped")]
	Stopped { name: String },

	/// Non-blocking send hit a full mailbox.
	#[error("mailbox of manager `{name}` is full")]
	MailboxFull { name: String },

	/// The route name is reserved for internal control requests.
	#[error("route `{route}` is reserved")]
	ReservedRoute { route: String },

	/// A payload did not hold the requested type.
	#[error("payload is not of type `{expected}`")]
	PayloadType { expected: &'static str },

	/// The request was dropped without ever receiving a response.
	#[error("request `{route}` was dropped without a response")]
	Abandoned { route: String },

	/// The OS refused to spawn the dispatch thread.
	#[error("failed to spawn dispatch thread for manager `{name}`: {source}")]
	Spawn {
		name: String,
		#[source]
		source: std::io::Error,
	},
}

impl ManagerError {
	/// Returns true for errors produced while dispatching a request, as
	/// opposed to errors returned at the call site.
	pub fn is_dispatch_error(&self) -> bool {
		matches!(
			self,
			Self::RouteNotFound { .. } | Self::Handler { .. } | Self::HandlerPanicked { .. } | Self::StateMismatch { .. }
		)
	}
}

/// Convenience alias for manager results.
pub type Result<T, E = ManagerError> = std::result::Result<T, E>;
