//! Locating and tidying run output.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use globset::{Glob, GlobMatcher};
use inlist_access::Inlist;
use inlist_namelist::Value;
use tracing::debug;

use crate::error::{Result, RunError};

/// Profile name prefix used when the inlist does not set `profile_data_prefix`.
pub const DEFAULT_PROFILE_PREFIX: &str = "profile";
/// Log directory used when the inlist does not set `log_directory`.
pub const DEFAULT_LOG_DIRECTORY: &str = "LOGS";

/// Which output directories [`cleanup`] leaves alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Keep {
	/// Keep `png/*.png`.
	pub png: bool,
	/// Keep `LOGS/*.data` and `LOGS/*.index`.
	pub logs: bool,
	/// Keep everything in `photos/`.
	pub photos: bool,
}

impl Default for Keep {
	fn default() -> Self {
		Self {
			png: false,
			logs: false,
			photos: true,
		}
	}
}

/// Newest profile written by a run of `inlist`, relative to `work_dir`.
///
/// Looks for `<profile_data_prefix>*.data` inside `log_directory`, falling back
/// to [`DEFAULT_PROFILE_PREFIX`] and [`DEFAULT_LOG_DIRECTORY`] when the inlist
/// does not set them. The prefix is matched literally. Returns `None` when
/// nothing matches.
///
/// # Errors
///
/// Fails on unknown keys or unreadable directories.
pub fn latest_log(inlist: &Inlist, work_dir: &Path) -> Result<Option<PathBuf>> {
	let prefix = string_or(inlist, "profile_data_prefix", DEFAULT_PROFILE_PREFIX)?;
	let directory = string_or(inlist, "log_directory", DEFAULT_LOG_DIRECTORY)?;
	let matcher = Glob::new(&format!("{}*.data", globset::escape(&prefix)))?.compile_matcher();
	let dir = work_dir.join(directory);
	let latest = newest_matching(&dir, Some(&matcher))?;
	debug!(dir = %dir.display(), latest = ?latest, "latest log");
	Ok(latest)
}

/// String value of `key`, or `fallback` when the inlist does not set it.
pub(crate) fn string_or(inlist: &Inlist, key: &str, fallback: &str) -> Result<String> {
	Ok(match inlist.get_or(key, fallback)? {
		Value::String(s) => s,
		other => other.to_string(),
	})
}

/// Newest regular file in `dir` by modification time, optionally filtered by
/// file name. A missing directory yields `None`.
pub fn newest_matching(dir: &Path, matcher: Option<&GlobMatcher>) -> Result<Option<PathBuf>> {
	let entries = match fs::read_dir(dir) {
		Ok(entries) => entries,
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
		Err(e) => return Err(RunError::io(dir, e)),
	};

	let mut newest: Option<(SystemTime, PathBuf)> = None;
	for entry in entries {
		let entry = entry.map_err(|e| RunError::io(dir, e))?;
		let path = entry.path();
		let meta = entry.metadata().map_err(|e| RunError::io(&path, e))?;
		if !meta.is_file() {
			continue;
		}
		if let Some(matcher) = matcher {
			if !matcher.is_match(entry.file_name()) {
				continue;
			}
		}
		let modified = meta.modified().map_err(|e| RunError::io(&path, e))?;
		let newer = newest
			.as_ref()
			.is_none_or(|(time, best)| (modified, &path) > (*time, best));
		if newer {
			newest = Some((modified, path));
		}
	}
	Ok(newest.map(|(_, path)| path))
}

/// Removes plot images, log data and photos from `work_dir`, except what
/// `keep` protects. Returns the number of files removed.
///
/// # Errors
///
/// Fails if a directory cannot be listed or a file cannot be removed.
pub fn cleanup(work_dir: &Path, keep: Keep) -> Result<usize> {
	let mut removed = 0;
	if !keep.png {
		removed += remove_matching(&work_dir.join("png"), |name| name.ends_with(".png"))?;
	}
	if !keep.logs {
		removed += remove_matching(&work_dir.join(DEFAULT_LOG_DIRECTORY), |name| {
			name.ends_with(".data") || name.ends_with(".index")
		})?;
	}
	if !keep.photos {
		removed += remove_matching(&work_dir.join("photos"), |_| true)?;
	}
	debug!(removed, "cleaned up output");
	Ok(removed)
}

fn remove_matching(dir: &Path, wanted: impl Fn(&str) -> bool) -> Result<usize> {
	if !dir.is_dir() {
		return Ok(0);
	}
	let mut removed = 0;
	for entry in fs::read_dir(dir).map_err(|e| RunError::io(dir, e))? {
		let entry = entry.map_err(|e| RunError::io(dir, e))?;
		let path = entry.path();
		if !path.is_file() || !wanted(&entry.file_name().to_string_lossy()) {
			continue;
		}
		fs::remove_file(&path).map_err(|e| RunError::io(&path, e))?;
		removed += 1;
	}
	Ok(removed)
}

/// Copies the contents of `src` into `dst` recursively, creating `dst`.
pub(crate) fn copy_dir(src: &Path, dst: &Path) -> Result<()> {
	fs::create_dir_all(dst).map_err(|e| RunError::io(dst, e))?;
	for entry in fs::read_dir(src).map_err(|e| RunError::io(src, e))? {
		let entry = entry.map_err(|e| RunError::io(src, e))?;
		let from = entry.path();
		let to = dst.join(entry.file_name());
		if from.is_dir() {
			copy_dir(&from, &to)?;
		} else {
			fs::copy(&from, &to).map_err(|e| RunError::io(&from, e))?;
		}
	}
	Ok(())
}

/// Removes `path` if it is a file.
pub(crate) fn remove_file(path: &Path) -> Result<()> {
	if path.is_file() {
		fs::remove_file(path).map_err(|e| RunError::io(path, e))?;
		debug!(path = %path.display(), "removed");
	}
	Ok(())
}

#[cfg(test)]
mod tests;
