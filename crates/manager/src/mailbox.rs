//! Bounded manager mailbox.
//!
//! Producers wait for capacity when the mailbox is full; messages are never
//! dropped while it is open. Once closed, queued messages can still be drained
//! and every later send fails with [`MailboxSendError::Closed`].

use tokio::sync::mpsc;

use crate::request::Envelope;

/// Mailbox send error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MailboxSendError {
	/// Mailbox is closed.
	Closed,
	/// Queue is full and non-blocking send was used.
	Full,
}

/// Creates a bounded mailbox. Capacity is clamped to at least one slot.
pub(crate) fn mailbox(capacity: usize) -> (MailboxSender, MailboxReceiver) {
	let capacity = capacity.max(1);
	let (tx, rx) = mpsc::channel(capacity);
	(MailboxSender { tx, capacity }, MailboxReceiver { rx })
}

/// Multi-producer mailbox sender.
#[derive(Debug, Clone)]
pub(crate) struct MailboxSender {
	tx: mpsc::Sender<Envelope>,
	capacity: usize,
}

impl MailboxSender {
	/// Enqueue, waiting for capacity when full.
	pub(crate) async fn send(&self, envelope: Envelope) -> Result<(), MailboxSendError> {
		self.tx.send(envelope).await.map_err(|_| MailboxSendError::Closed)
	}

	/// Non-blocking enqueue.
	pub(crate) fn try_send(&self, envelope: Envelope) -> Result<(), MailboxSendError> {
		self.tx.try_send(envelope).map_err(|err| match err {
			mpsc::error::TrySendError::Full(_) => MailboxSendError::Full,
			mpsc::error::TrySendError::Closed(_) => MailboxSendError::Closed,
		})
	}

	pub(crate) const fn capacity(&self) -> usize {
		self.capacity
	}

	/// Number of queued messages.
	pub(crate) fn pending(&self) -> usize {
		self.tx.max_capacity() - self.tx.capacity()
	}
}

/// Single-consumer mailbox receiver owned by the dispatch loop.
#[derive(Debug)]
pub(crate) struct MailboxReceiver {
	rx: mpsc::Receiver<Envelope>,
}

impl MailboxReceiver {
	/// Blocks the current thread until the next message arrives. Returns
	/// `None` once closed and drained.
	///
	/// # Panics
	///
	/// Panics when called from within an async runtime.
	pub(crate) fn blocking_recv(&mut self) -> Option<Envelope> {
		self.rx.blocking_recv()
	}

	/// Closes the mailbox and hands back everything still queued, in order.
	///
	/// Waits for senders that already hold a slot to finish writing, so no
	/// accepted message is lost.
	pub(crate) fn close_and_drain(&mut self) -> Vec<Envelope> {
		self.rx.close();
		let mut drained = Vec::new();
		while let Some(envelope) = self.rx.blocking_recv() {
			drained.push(envelope);
		}
		drained
	}
}
