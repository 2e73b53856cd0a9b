use std::path::PathBuf;

use crate::defaults::DefaultsOrigin;

/// Settings for opening an [`Inlist`](crate::Inlist).
///
/// The default reads bundled defaults from `./defaults`, writes back to the
/// source file, and leaves vectors collapsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessOptions {
	/// Where [`persist`](crate::Inlist::persist) writes. `None` means the source file.
	pub output: Option<PathBuf>,
	/// Run vector expansion right after loading.
	pub expand_vectors: bool,
	/// Re-derive defaults tables instead of trusting the cache.
	pub reload_defaults: bool,
	/// Omit the `eos` and `kap` sections.
	pub legacy: bool,
	/// Keep coercion and expansion notices out of the log.
	pub suppress_warnings: bool,
	/// Where defaults files are read from.
	pub origin: DefaultsOrigin,
}

impl Default for AccessOptions {
	fn default() -> Self {
		Self {
			output: None,
			expand_vectors: false,
			reload_defaults: false,
			legacy: false,
			suppress_warnings: false,
			origin: DefaultsOrigin::Bundled {
				root: PathBuf::from("defaults"),
			},
		}
	}
}

impl AccessOptions {
	/// Sets the output path.
	pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
		self.output = Some(output.into());
		self
	}

	/// Enables or disables vector expansion on load.
	pub fn with_expand_vectors(mut self, expand: bool) -> Self {
		self.expand_vectors = expand;
		self
	}

	/// Enables or disables defaults re-derivation.
	pub fn with_reload_defaults(mut self, reload: bool) -> Self {
		self.reload_defaults = reload;
		self
	}

	/// Enables or disables legacy mode.
	pub fn with_legacy(mut self, legacy: bool) -> Self {
		self.legacy = legacy;
		self
	}

	/// Enables or disables notice logging.
	pub fn with_suppress_warnings(mut self, suppress: bool) -> Self {
		self.suppress_warnings = suppress;
		self
	}

	/// Sets where defaults come from.
	pub fn with_origin(mut self, origin: DefaultsOrigin) -> Self {
		self.origin = origin;
		self
	}

	/// Reads defaults from the installation named by `MESA_DIR`.
	pub fn with_environment(self, use_environment: bool) -> Self {
		if use_environment {
			self.with_origin(DefaultsOrigin::Environment)
		} else {
			self
		}
	}
}
