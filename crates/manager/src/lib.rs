//! Named in-process state managers.
//!
//! A [`Manager`] owns one piece of mutable state and serves requests against
//! it strictly one at a time from a bounded FIFO mailbox, so handlers mutate
//! the state without any locking of their own. Managers are created through
//! a [`Registry`], which lets unrelated parts of a program reach a manager by
//! name.
//!
//! Requests carry a route and a type-erased [`Payload`]. Sending returns a
//! [`Ticket`] that can be polled with [`Ticket::has_data`] or awaited with
//! [`Ticket::wait`]; a handler may answer with another pending ticket or a
//! nested [`Response`], which waiting resolves down to the terminal value.
//!
//! ```no_run
//! use steward_manager::{Payload, Registry, Reply};
//!
//! # async fn demo() -> steward_manager::Result<()> {
//! let registry = Registry::new();
//! let jobs = registry.new_manager("jobs", 8)?;
//! jobs.attach("push", |queue: &mut Vec<String>, payload: Payload| {
//! 	queue.push(payload.downcast::<String>()?);
//! 	Ok(Reply::value(queue.len()))
//! })?;
//! jobs.start(Vec::<String>::new())?;
//!
//! let len = registry.ask("jobs", "push", Payload::new(String::from("build"))).await?;
//! assert_eq!(len.downcast::<usize>()?, 1);
//! registry.kill_and_remove("jobs").await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod mailbox;
mod manager;
mod payload;
mod registry;
mod request;
mod spawn;

pub use config::{ConfigError, DEFAULT_BUFFER_SIZE, RegistryConfig};
pub use error::{ManagerError, Result};
pub use manager::{Lifecycle, Manager};
pub use payload::Payload;
pub use registry::Registry;
pub use request::{KILL_ROUTE, Reply, Request, Response, Ticket};
