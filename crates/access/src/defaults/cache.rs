//! Read-through caches for parsed defaults tables.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap as HashMap;
use tracing::{debug, warn};

use super::DefaultTable;
use crate::error::{AccessError, Result};
use crate::section::Section;

/// Release family the defaults belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionTag {
	/// Releases with `eos` and `kap` sections (r15140 and later).
	Current,
	/// Older releases without `eos` and `kap`.
	Legacy,
}

impl VersionTag {
	/// Selects the tag for the legacy flag.
	pub fn for_legacy(legacy: bool) -> Self {
		if legacy { VersionTag::Legacy } else { VersionTag::Current }
	}

	/// Release label used in directory and cache file names.
	pub fn label(self) -> &'static str {
		match self {
			VersionTag::Current => "r15140",
			VersionTag::Legacy => "r10108",
		}
	}
}

/// Identifies one cached defaults table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
	/// Section the table declares.
	pub section: Section,
	/// Release family.
	pub tag: VersionTag,
	/// Defaults file the table is derived from.
	pub source: PathBuf,
}

/// Storage for parsed defaults, consulted before re-reading a defaults file.
pub trait DefaultsCache {
	/// Returns the cached table, or `None` on a miss.
	///
	/// Unreadable or undecodable entries count as misses.
	fn load(&self, key: &CacheKey) -> Option<DefaultTable>;

	/// Stores (or replaces) the table for `key`.
	///
	/// # Errors
	///
	/// Returns an error if the entry cannot be encoded or written.
	fn store(&mut self, key: &CacheKey, table: &DefaultTable) -> Result<()>;
}

/// Cache that keeps a postcard-encoded table next to each defaults file,
/// named `<defaults file>.<release>.cache`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileCache;

impl FileCache {
	/// Path of the cache file for `key`.
	pub fn path_for(key: &CacheKey) -> PathBuf {
		let mut name = OsString::from(key.source.as_os_str());
		name.push(format!(".{}.cache", key.tag.label()));
		PathBuf::from(name)
	}

	fn read(path: &Path) -> Option<DefaultTable> {
		let bytes = match std::fs::read(path) {
			Ok(bytes) => bytes,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
			Err(e) => {
				warn!(path = %path.display(), error = %e, "unreadable defaults cache, ignoring");
				return None;
			}
		};
		match postcard::from_bytes::<DefaultTable>(&bytes) {
			Ok(table) => Some(table),
			Err(e) => {
				warn!(path = %path.display(), error = %e, "corrupt defaults cache, ignoring");
				None
			}
		}
	}
}

impl DefaultsCache for FileCache {
	fn load(&self, key: &CacheKey) -> Option<DefaultTable> {
		let path = Self::path_for(key);
		let table = Self::read(&path)?;
		if table.section() != key.section {
			warn!(path = %path.display(), "defaults cache holds another section, ignoring");
			return None;
		}
		debug!(section = %key.section, path = %path.display(), "defaults cache hit");
		Some(table)
	}

	fn store(&mut self, key: &CacheKey, table: &DefaultTable) -> Result<()> {
		let path = Self::path_for(key);
		let bytes = postcard::to_stdvec(table).map_err(|error| AccessError::CacheEncode {
			path: path.clone(),
			error,
		})?;
		std::fs::write(&path, bytes).map_err(|e| AccessError::io(&path, e))?;
		debug!(section = %key.section, path = %path.display(), "defaults cache written");
		Ok(())
	}
}

/// In-process cache keyed by section and release, for tests and embedders
/// that should not touch the filesystem.
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
	tables: HashMap<(Section, VersionTag), DefaultTable>,
}

impl MemoryCache {
	/// Creates an empty cache.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the stored table for a section and release.
	pub fn get(&self, section: Section, tag: VersionTag) -> Option<&DefaultTable> {
		self.tables.get(&(section, tag))
	}

	/// Seeds the cache directly.
	pub fn insert(&mut self, tag: VersionTag, table: DefaultTable) {
		self.tables.insert((table.section(), tag), table);
	}

	/// Number of stored tables.
	pub fn len(&self) -> usize {
		self.tables.len()
	}

	/// Returns true if nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.tables.is_empty()
	}
}

impl DefaultsCache for MemoryCache {
	fn load(&self, key: &CacheKey) -> Option<DefaultTable> {
		self.tables.get(&(key.section, key.tag)).cloned()
	}

	fn store(&mut self, key: &CacheKey, table: &DefaultTable) -> Result<()> {
		self.tables.insert((key.section, key.tag), table.clone());
		Ok(())
	}
}
