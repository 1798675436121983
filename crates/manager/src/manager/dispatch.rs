//! Dispatch loop: one request at a time against the owned state.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use super::{Invocation, Lifecycle, Manager};
use crate::mailbox::MailboxReceiver;
use crate::request::{Envelope, Responder};
use crate::{ManagerError, Payload, Reply, Response};

impl Manager {
	/// Claims the mailbox receiver and marks the manager running.
	pub(super) fn begin(&self) -> Result<MailboxReceiver, ManagerError> {
		let mut inner = self.inner.lock();
		if inner.lifecycle != Lifecycle::Idle {
			return Err(ManagerError::AlreadyStarted { name: self.name.clone() });
		}
		let Some(rx) = inner.mailbox.take() else {
			return Err(ManagerError::AlreadyStarted { name: self.name.clone() });
		};
		inner.lifecycle = Lifecycle::Running;
		Ok(rx)
	}

	/// Serves requests on the calling thread until a kill request arrives.
	///
	/// Blocks on the mailbox, so it must run on a thread outside any async
	/// runtime.
	pub(super) fn serve<S>(&self, mut rx: MailboxReceiver, mut state: S)
	where
		S: Send + 'static,
	{
		tracing::debug!(manager = %self.name, "manager.start");

		let mut killer: Option<Responder> = None;
		while let Some(envelope) = rx.blocking_recv() {
			if envelope.is_kill() {
				killer = Some(envelope.responder);
				break;
			}
			let Envelope { route, payload, responder } = envelope;
			let response = self.dispatch(&mut state, &route, payload);
			responder.respond(response);
		}

		let abandoned = rx.close_and_drain();
		if !abandoned.is_empty() {
			tracing::debug!(manager = %self.name, count = abandoned.len(), "manager.drain");
		}
		for envelope in abandoned {
			envelope.responder.respond(Response::err(ManagerError::Stopped { name: self.name.clone() }));
		}

		self.inner.lock().lifecycle = Lifecycle::Stopped;
		tracing::debug!(manager = %self.name, "manager.stop");

		// Answer the kill only once the stop is observable.
		if let Some(killer) = killer {
			killer.respond(Response::ok(Reply::empty()));
		}
	}

	fn dispatch<S>(&self, state: &mut S, route: &str, payload: Payload) -> Response
	where
		S: Send + 'static,
	{
		tracing::trace!(manager = %self.name, route, "manager.dispatch");
		let outcome = match self.handler(route) {
			None => Err(ManagerError::RouteNotFound {
				manager: self.name.clone(),
				route: route.to_string(),
			}),
			Some(handler) => {
				let state: &mut dyn Any = state;
				match panic::catch_unwind(AssertUnwindSafe(|| handler(state, payload))) {
					Ok(Invocation::Done(Ok(reply))) => Ok(reply),
					Ok(Invocation::Done(Err(source))) => Err(ManagerError::Handler {
						manager: self.name.clone(),
						route: route.to_string(),
						source,
					}),
					Ok(Invocation::StateMismatch(expected)) => Err(ManagerError::StateMismatch {
						manager: self.name.clone(),
						route: route.to_string(),
						expected,
					}),
					Err(panic) => Err(ManagerError::HandlerPanicked {
						manager: self.name.clone(),
						route: route.to_string(),
						message: panic_message(&*panic),
					}),
				}
			}
		};

		if let Err(err) = &outcome
			&& self.report_errors
		{
			tracing::warn!(manager = %self.name, route, error = %err, "manager.dispatch.error");
		}
		Response::from(outcome)
	}
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
	if let Some(msg) = panic.downcast_ref::<&str>() {
		(*msg).to_string()
	} else if let Some(msg) = panic.downcast_ref::<String>() {
		msg.clone()
	} else {
		"non-string panic payload".to_string()
	}
}
