//! Registry-wide configuration.

use serde::Deserialize;
use thiserror::Error;

/// Default mailbox capacity for [`crate::Registry::new_manager_default`].
pub const DEFAULT_BUFFER_SIZE: usize = 64;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error parsing TOML syntax or field types.
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),

	/// A field holds a value outside its allowed range.
	#[error("invalid value for '{field}': {reason}")]
	InvalidValue { field: &'static str, reason: &'static str },
}

/// Settings shared by every manager created through one registry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
	/// Whether dispatch errors are written to the tracing sink.
	pub report_errors: bool,
	/// Mailbox capacity used when no explicit buffer size is given.
	pub default_buffer_size: usize,
}

impl Default for RegistryConfig {
	fn default() -> Self {
		Self {
			report_errors: true,
			default_buffer_size: DEFAULT_BUFFER_SIZE,
		}
	}
}

impl RegistryConfig {
	/// Parses configuration from TOML text. Missing fields keep their defaults.
	pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
		let config: Self = toml::from_str(input)?;
		if config.default_buffer_size == 0 {
			return Err(ConfigError::InvalidValue {
				field: "default_buffer_size",
				reason: "must be > 0",
			});
		}
		Ok(config)
	}

	/// Sets the error reporting toggle.
	#[must_use]
	pub fn report_errors(mut self, enabled: bool) -> Self {
		self.report_errors = enabled;
		self
	}

	/// Sets the default mailbox capacity.
	///
	/// # Panics
	///
	/// Panics if `size` is zero.
	#[must_use]
	pub fn default_buffer_size(mut self, size: usize) -> Self {
		assert!(size > 0, "buffer size must be > 0");
		self.default_buffer_size = size;
		self
	}
}
