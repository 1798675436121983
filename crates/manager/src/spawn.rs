//! Dedicated threads for dispatch loops.
//!
//! Handlers are synchronous and may block, so each running manager gets its
//! own OS thread instead of sharing async runtime workers.

use std::thread::JoinHandle;

use tracing::Dispatch;

/// Spawns `f` on a thread named after the manager.
///
/// The caller's tracing dispatcher is installed on the new thread, so events
/// from the dispatch loop reach the same subscriber as the code that started
/// it.
pub(crate) fn spawn_named_thread<F, R>(manager: &str, f: F) -> std::io::Result<JoinHandle<R>>
where
	F: FnOnce() -> R + Send + 'static,
	R: Send + 'static,
{
	tracing::trace!(manager, "manager.spawn_thread");
	let dispatch = tracing::dispatcher::get_default(Dispatch::clone);
	let name: String = format!("manager-{manager}").chars().filter(|c| *c != '\0').collect();
	std::thread::Builder::new()
		.name(name)
		.spawn(move || tracing::dispatcher::with_default(&dispatch, f))
}

#[cfg(test)]
mod tests {
	use super::spawn_named_thread;

	#[test]
	fn thread_carries_manager_name() {
		let handle = spawn_named_thread("ledger", || std::thread::current().name().map(str::to_owned)).unwrap();
		assert_eq!(handle.join().unwrap().as_deref(), Some("manager-ledger"));
	}

	#[test]
	fn interior_nul_is_stripped_from_thread_name() {
		let handle = spawn_named_thread("bad\0name", || std::thread::current().name().map(str::to_owned)).unwrap();
		assert_eq!(handle.join().unwrap().as_deref(), Some("manager-badname"));
	}
}
