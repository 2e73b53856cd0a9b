//! Defaults loading.
//!
//! Every section has a defaults file declaring each recognised key with its
//! default value, one assignment per line:
//!
//! ```text
//! ! comment
//! initial_mass = 1
//! x_ctrl(1:num_x_ctrls) = 0d0
//! ```
//!
//! The loader locates the file, drops comment and blank lines, substitutes
//! array-length placeholders such as `num_x_ctrls` with concrete numbers,
//! wraps the remaining lines in a `&group ... /` block and parses it into a
//! [`DefaultTable`]. Parsed tables go through a [`DefaultsCache`]; the reload
//! flag bypasses and then refreshes the cache.
//!
//! # Locations
//!
//! - [`DefaultsOrigin::Bundled`]: `<root>/mesa-r15140/` (or `mesa-r10108/` in
//!   legacy mode) holds all five files.
//! - [`DefaultsOrigin::Environment`]: `$MESA_DIR/star/defaults/` for
//!   `star_job`, `controls` and `pgstar`, `$MESA_DIR/eos/defaults/` and
//!   `$MESA_DIR/kap/defaults/` for the other two.
//! - [`DefaultsOrigin::Installation`]: like `Environment`, with the
//!   installation directory given explicitly.

mod cache;
mod table;

#[cfg(test)]
mod tests;

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::debug;

pub use cache::{CacheKey, DefaultsCache, FileCache, MemoryCache, VersionTag};
pub use table::DefaultTable;

use crate::error::{AccessError, Result};
use crate::section::Section;

/// Environment variable pointing at the simulation code's installation.
pub const INSTALL_DIR_VAR: &str = "MESA_DIR";

/// Placeholder for the length of the `x_ctrl`-style arrays and its value.
pub const NUM_X_CTRLS: (&str, usize) = ("num_x_ctrls", 10);

/// Where defaults files are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultsOrigin {
	/// Release-specific copies shipped alongside the tool.
	Bundled {
		/// Directory containing `mesa-r15140/` and `mesa-r10108/`.
		root: PathBuf,
	},
	/// The installation named by [`INSTALL_DIR_VAR`].
	Environment,
	/// An installation directory given explicitly.
	Installation {
		/// The installation root (what `MESA_DIR` would point at).
		dir: PathBuf,
	},
}

/// Validates an installation directory taken from the environment.
///
/// # Errors
///
/// [`AccessError::EnvironmentNotConfigured`] if the variable is unset or empty,
/// [`AccessError::DirectoryNotFound`] if it points nowhere.
pub fn resolve_install_dir(value: Option<OsString>) -> Result<PathBuf> {
	let dir = value
		.filter(|v| !v.is_empty())
		.map(PathBuf::from)
		.ok_or(AccessError::EnvironmentNotConfigured {
			var: INSTALL_DIR_VAR,
		})?;
	if !dir.is_dir() {
		return Err(AccessError::DirectoryNotFound(dir));
	}
	Ok(dir)
}

/// Directory holding `section`'s defaults inside an installation.
fn install_section_dir(install: &Path, section: Section) -> Result<PathBuf> {
	if !install.is_dir() {
		return Err(AccessError::DirectoryNotFound(install.to_path_buf()));
	}
	let dir = install.join(section.install_subdir());
	if !dir.is_dir() {
		return Err(AccessError::DirectoryNotFound(dir));
	}
	Ok(dir)
}

/// Turns the text of a defaults file into a table.
///
/// Comment and blank lines are dropped and each `(token, value)` placeholder is
/// replaced textually before parsing.
///
/// # Errors
///
/// Returns [`AccessError::Parse`] (attributed to `path`) on malformed lines.
pub fn parse_defaults(
	section: Section,
	text: &str,
	placeholders: &[(String, usize)],
	path: &Path,
) -> Result<DefaultTable> {
	let mut wrapped = format!("&{}\n", section.group_name());
	for line in text.lines() {
		let line = line.trim();
		if line.is_empty() || line.starts_with('!') {
			continue;
		}
		let mut line = line.to_string();
		for (token, value) in placeholders {
			if line.contains(token.as_str()) {
				line = line.replace(token.as_str(), &value.to_string());
			}
		}
		wrapped.push_str(&line);
		wrapped.push('\n');
	}
	wrapped.push_str("/\n");

	let namelist = inlist_namelist::parse(&wrapped).map_err(|error| AccessError::Parse {
		path: path.to_path_buf(),
		error,
	})?;
	let table = namelist
		.group(section.group_name())
		.map(|group| DefaultTable::from_group(section, group))
		.unwrap_or_else(|| DefaultTable::from_entries::<&str, _>(section, []));
	Ok(table)
}

/// Builds [`DefaultTable`]s for sections, reading through a cache.
#[derive(Debug)]
pub struct DefaultsLoader<C = FileCache> {
	origin: DefaultsOrigin,
	tag: VersionTag,
	reload: bool,
	placeholders: Vec<(String, usize)>,
	cache: C,
}

impl DefaultsLoader<FileCache> {
	/// Creates a loader that caches next to the defaults files.
	pub fn new(origin: DefaultsOrigin, legacy: bool) -> Self {
		Self::with_cache(origin, legacy, FileCache)
	}
}

impl<C: DefaultsCache> DefaultsLoader<C> {
	/// Creates a loader with a specific cache.
	pub fn with_cache(origin: DefaultsOrigin, legacy: bool, cache: C) -> Self {
		Self {
			origin,
			tag: VersionTag::for_legacy(legacy),
			reload: false,
			placeholders: vec![(NUM_X_CTRLS.0.to_string(), NUM_X_CTRLS.1)],
			cache,
		}
	}

	/// Re-derive tables from the defaults files, ignoring and overwriting the cache.
	pub fn reload(mut self, reload: bool) -> Self {
		self.reload = reload;
		self
	}

	/// Adds (or overrides) a placeholder substitution.
	pub fn placeholder(mut self, token: impl Into<String>, value: usize) -> Self {
		let token = token.into();
		self.placeholders.retain(|(t, _)| *t != token);
		self.placeholders.push((token, value));
		self
	}

	/// Release family this loader reads.
	pub fn tag(&self) -> VersionTag {
		self.tag
	}

	/// Returns true in legacy mode.
	pub fn is_legacy(&self) -> bool {
		self.tag == VersionTag::Legacy
	}

	/// The cache backing this loader.
	pub fn cache(&self) -> &C {
		&self.cache
	}

	/// Directory that holds `section`'s defaults file.
	///
	/// # Errors
	///
	/// Fails when the environment variable is unset or a directory on the way
	/// does not exist.
	pub fn defaults_dir(&self, section: Section) -> Result<PathBuf> {
		match &self.origin {
			DefaultsOrigin::Bundled { root } => {
				let dir = root.join(format!("mesa-{}", self.tag.label()));
				if !dir.is_dir() {
					return Err(AccessError::DirectoryNotFound(dir));
				}
				Ok(dir)
			}
			DefaultsOrigin::Environment => {
				let install = resolve_install_dir(std::env::var_os(INSTALL_DIR_VAR))?;
				install_section_dir(&install, section)
			}
			DefaultsOrigin::Installation { dir } => install_section_dir(dir, section),
		}
	}

	/// Path of `section`'s defaults file.
	pub fn source_path(&self, section: Section) -> Result<PathBuf> {
		Ok(self.defaults_dir(section)?.join(section.defaults_file()))
	}

	/// Loads the table for a section given by name.
	///
	/// # Errors
	///
	/// [`AccessError::InvalidSection`] for unknown names, otherwise as [`Self::load`].
	pub fn load_named(&mut self, name: &str) -> Result<DefaultTable> {
		self.load(name.parse()?)
	}

	/// Loads the table for `section`.
	///
	/// # Errors
	///
	/// Fails when the defaults location cannot be resolved, the file is missing
	/// or malformed, or the cache cannot be written.
	pub fn load(&mut self, section: Section) -> Result<DefaultTable> {
		let source = self.source_path(section)?;
		let key = CacheKey {
			section,
			tag: self.tag,
			source,
		};

		if !self.reload {
			if let Some(table) = self.cache.load(&key) {
				return Ok(table);
			}
		}

		let text = std::fs::read_to_string(&key.source).map_err(|e| AccessError::io(&key.source, e))?;
		let table = parse_defaults(section, &text, &self.placeholders, &key.source)?;
		debug!(
			section = %section,
			keys = table.len(),
			path = %key.source.display(),
			"parsed defaults"
		);
		self.cache.store(&key, &table)?;
		Ok(table)
	}
}
