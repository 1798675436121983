//! Request/response rendezvous protocol.
//!
//! A [`Request`] is split when it is enqueued: the route, payload and
//! responder travel through the manager mailbox as an [`Envelope`], while the
//! caller keeps the [`Ticket`]. The responder is consumed by the single post
//! it performs, so a rendezvous slot is written at most once.

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::oneshot;

use crate::{ManagerError, Payload};

/// Route reserved for the internal stop request.
pub const KILL_ROUTE: &str = "state|kill-manager";

/// Successful handler output.
#[derive(Debug)]
pub enum Reply {
	/// Terminal value.
	Value(Payload),
	/// Another in-flight request whose response becomes this one.
	Pending(Ticket),
	/// A response produced elsewhere, resolved in turn.
	Nested(Box<Response>),
}

impl Reply {
	/// Wraps a terminal value.
	pub fn value<T>(value: T) -> Self
	where
		T: Any + Send,
	{
		Self::Value(Payload::new(value))
	}

	/// Terminal reply without a value.
	pub const fn empty() -> Self {
		Self::Value(Payload::empty())
	}
}

impl From<Payload> for Reply {
	fn from(payload: Payload) -> Self {
		Self::Value(payload)
	}
}

impl From<Ticket> for Reply {
	fn from(ticket: Ticket) -> Self {
		Self::Pending(ticket)
	}
}

impl From<Response> for Reply {
	fn from(response: Response) -> Self {
		Self::Nested(Box::new(response))
	}
}

/// Outcome posted into a request's rendezvous slot.
#[derive(Debug)]
pub struct Response {
	outcome: Result<Reply, ManagerError>,
}

impl Response {
	/// Successful response.
	pub fn ok(reply: impl Into<Reply>) -> Self {
		Self { outcome: Ok(reply.into()) }
	}

	/// Failed response.
	pub fn err(error: ManagerError) -> Self {
		Self { outcome: Err(error) }
	}

	/// Returns true if the response carries a reply.
	pub fn is_ok(&self) -> bool {
		self.outcome.is_ok()
	}

	/// Returns true if the response carries an error.
	pub fn is_err(&self) -> bool {
		self.outcome.is_err()
	}

	/// Error carried by this response, if any. Nested responses are not
	/// inspected.
	pub fn error(&self) -> Option<&ManagerError> {
		self.outcome.as_ref().err()
	}

	/// Returns the outcome without unwrapping nested replies.
	pub fn into_result(self) -> Result<Reply, ManagerError> {
		self.outcome
	}

	/// Follows pending tickets and nested responses until a terminal value or
	/// an error is reached.
	pub async fn resolve(self) -> Result<Payload, ManagerError> {
		let mut outcome = self.outcome;
		loop {
			outcome = match outcome {
				Err(err) => return Err(err),
				Ok(Reply::Value(payload)) => return Ok(payload),
				Ok(Reply::Pending(ticket)) => ticket.response().await.outcome,
				Ok(Reply::Nested(response)) => response.outcome,
			};
		}
	}
}

impl From<Result<Reply, ManagerError>> for Response {
	fn from(outcome: Result<Reply, ManagerError>) -> Self {
		Self { outcome }
	}
}

/// Writing half of a rendezvous slot.
#[derive(Debug)]
pub(crate) struct Responder {
	tx: oneshot::Sender<Response>,
	ready: Arc<AtomicBool>,
}

impl Responder {
	/// Posts the response. Never blocks; a caller that dropped its ticket
	/// simply never sees it.
	pub(crate) fn respond(self, response: Response) {
		let _ = self.tx.send(response);
		self.ready.store(true, Ordering::Release);
	}
}

/// Caller-side handle for a request that has been enqueued.
#[derive(Debug)]
pub struct Ticket {
	route: String,
	rx: oneshot::Receiver<Response>,
	ready: Arc<AtomicBool>,
}

impl Ticket {
	/// Route of the request this ticket belongs to.
	pub fn route(&self) -> &str {
		&self.route
	}

	/// Returns true once the manager has posted a response. Does not consume it.
	pub fn has_data(&self) -> bool {
		self.ready.load(Ordering::Acquire)
	}

	/// Waits for the raw response without unwrapping nested replies.
	///
	/// Resolves to [`ManagerError::Abandoned`] if the responder was dropped
	/// without posting.
	pub async fn response(self) -> Response {
		match self.rx.await {
			Ok(response) => response,
			Err(_) => Response::err(ManagerError::Abandoned { route: self.route }),
		}
	}

	/// Waits for the response and resolves it to a terminal value or error.
	pub async fn wait(self) -> Result<Payload, ManagerError> {
		self.response().await.resolve().await
	}
}

/// Mailbox item: everything the dispatch loop needs to serve one request.
#[derive(Debug)]
pub(crate) struct Envelope {
	pub(crate) route: String,
	pub(crate) payload: Payload,
	pub(crate) responder: Responder,
}

impl Envelope {
	pub(crate) fn is_kill(&self) -> bool {
		self.route == KILL_ROUTE
	}
}

/// A unit of work: route, payload and a fresh rendezvous slot.
#[derive(Debug)]
pub struct Request {
	envelope: Envelope,
	ticket: Ticket,
}

impl Request {
	/// Creates a request with a fresh one-shot rendezvous slot.
	pub fn new(route: impl Into<String>, payload: Payload) -> Self {
		let route = route.into();
		let (tx, rx) = oneshot::channel();
		let ready = Arc::new(AtomicBool::new(false));
		Self {
			envelope: Envelope {
				route: route.clone(),
				payload,
				responder: Responder {
					tx,
					ready: Arc::clone(&ready),
				},
			},
			ticket: Ticket { route, rx, ready },
		}
	}

	pub(crate) fn kill() -> Self {
		Self::new(KILL_ROUTE, Payload::empty())
	}

	/// Route the request is addressed to.
	pub fn route(&self) -> &str {
		&self.envelope.route
	}

	/// Payload handed to the handler.
	pub fn payload(&self) -> &Payload {
		&self.envelope.payload
	}

	pub(crate) fn into_parts(self) -> (Envelope, Ticket) {
		(self.envelope, self.ticket)
	}
}
