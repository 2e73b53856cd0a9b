//! Error types for inlist access.

use std::path::PathBuf;

use inlist_namelist::{ParseError, ValueType};
use thiserror::Error;

/// Errors that can occur while loading defaults or reading and editing an inlist.
#[derive(Debug, Error)]
pub enum AccessError {
	/// The key is not declared in any loaded defaults table.
	#[error("'{key}' is not a known inlist key{}", suggestion.as_ref().map(|s| format!(" (did you mean '{s}'?)")).unwrap_or_default())]
	UnknownKey {
		/// The unrecognized key.
		key: String,
		/// A declared key close to the requested one, if any.
		suggestion: Option<String>,
	},

	/// The key is declared but the loaded inlist does not set it.
	#[error("'{key}' is not set in the inlist")]
	ValueNotSet {
		/// The requested key.
		key: String,
	},

	/// Deleting a declared key that the loaded inlist does not contain.
	#[error("'{key}' is not in the current inlist")]
	KeyNotPresent {
		/// The key that was to be removed.
		key: String,
	},

	/// A value's type is incompatible with the declared default.
	#[error("type mismatch for '{key}': expected {expected}, got {got}")]
	TypeMismatch {
		/// The key being set.
		key: String,
		/// Type of the declared default (element type for vectors).
		expected: ValueType,
		/// Type of the supplied value.
		got: ValueType,
	},

	/// An indexed key whose declared default is not an array.
	#[error("'{key}' is indexed but its default is not an array")]
	NotAVector {
		/// The indexed key.
		key: String,
	},

	/// A vector index beyond what the namelist reader accepts back.
	#[error("index of '{key}' exceeds the maximum of {max}")]
	IndexOutOfRange {
		/// The indexed key.
		key: String,
		/// Largest accepted index.
		max: usize,
	},

	/// A section name outside the five recognized groups.
	#[error("invalid section '{0}' (expected star_job, controls, pgstar, eos or kap)")]
	InvalidSection(String),

	/// Defaults resolution needs an environment variable that is not set.
	#[error("{var} is not set in the environment")]
	EnvironmentNotConfigured {
		/// Name of the missing variable.
		var: &'static str,
	},

	/// A directory needed to locate defaults does not exist.
	#[error("directory {} does not exist", .0.display())]
	DirectoryNotFound(PathBuf),

	/// A file needed to load defaults or an inlist does not exist.
	#[error("file {} does not exist", .0.display())]
	FileNotFound(PathBuf),

	/// Error reading or writing a file.
	#[error("I/O error on {}: {error}", path.display())]
	Io {
		/// Path of the file involved.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// Namelist syntax error in an inlist or defaults file.
	#[error("failed to parse {}: {error}", path.display())]
	Parse {
		/// Path of the offending file.
		path: PathBuf,
		/// The underlying parse error.
		error: ParseError,
	},

	/// A defaults table could not be encoded for the cache.
	#[error("failed to encode defaults cache {}: {error}", path.display())]
	CacheEncode {
		/// Path of the cache file.
		path: PathBuf,
		/// The underlying encoding error.
		error: postcard::Error,
	},
}

impl AccessError {
	pub(crate) fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
		let path = path.into();
		if error.kind() == std::io::ErrorKind::NotFound {
			return AccessError::FileNotFound(path);
		}
		AccessError::Io { path, error }
	}
}

/// Result type for inlist access operations.
pub type Result<T> = std::result::Result<T, AccessError>;
