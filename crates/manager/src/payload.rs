use std::any::{Any, type_name};
use std::fmt;

use crate::ManagerError;

/// Type-erased value carried by requests and responses.
///
/// Handlers decide per route which concrete type they expect and recover it
/// with [`Payload::downcast`]. An empty payload stands in for "no value".
#[derive(Default)]
pub struct Payload {
	value: Option<Box<dyn Any + Send>>,
}

impl Payload {
	/// Wraps one value.
	pub fn new<T>(value: T) -> Self
	where
		T: Any + Send,
	{
		Self {
			value: Some(Box::new(value)),
		}
	}

	/// Creates a payload carrying no value.
	pub const fn empty() -> Self {
		Self { value: None }
	}

	/// Returns true when no value is carried.
	pub fn is_empty(&self) -> bool {
		self.value.is_none()
	}

	/// Returns true when the carried value is a `T`.
	pub fn is<T>(&self) -> bool
	where
		T: Any,
	{
		self.value.as_ref().is_some_and(|value| value.is::<T>())
	}

	/// Borrows the carried value as a `T`.
	pub fn downcast_ref<T>(&self) -> Option<&T>
	where
		T: Any,
	{
		self.value.as_ref().and_then(|value| value.downcast_ref::<T>())
	}

	/// Mutably borrows the carried value as a `T`.
	pub fn downcast_mut<T>(&mut self) -> Option<&mut T>
	where
		T: Any,
	{
		self.value.as_mut().and_then(|value| value.downcast_mut::<T>())
	}

	/// Takes the carried value out as a `T`.
	///
	/// On a type mismatch the payload is consumed and a
	/// [`ManagerError::PayloadType`] is returned.
	pub fn downcast<T>(self) -> Result<T, ManagerError>
	where
		T: Any,
	{
		let mismatch = || ManagerError::PayloadType { expected: type_name::<T>() };
		let value = self.value.ok_or_else(mismatch)?;
		value.downcast::<T>().map(|value| *value).map_err(|_| mismatch())
	}
}

impl fmt::Debug for Payload {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.value {
			Some(_) => f.write_str("Payload(..)"),
			None => f.write_str("Payload(empty)"),
		}
	}
}
