//! Error types for run orchestration.

use std::path::PathBuf;

use inlist_access::AccessError;
use thiserror::Error;

/// Errors that can occur while preparing, running or inspecting a run.
#[derive(Debug, Error)]
pub enum RunError {
	/// Reading or editing an inlist failed.
	#[error(transparent)]
	Access(#[from] AccessError),

	/// Error reading, writing, copying or removing a file.
	#[error("I/O error on {}: {error}", path.display())]
	Io {
		/// Path of the file involved.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// A build or run script is not present in the work directory.
	#[error("{} not found, build star first", .0.display())]
	ExecutableMissing(PathBuf),

	/// The external program could not be started.
	#[error("failed to start {}: {error}", program.display())]
	Spawn {
		/// The program that failed to start.
		program: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// A run in a sequence did not reach its goal; later inlists were skipped.
	#[error("aborting since {} failed to converge", inlist.display())]
	NotConverged {
		/// The inlist whose run failed.
		inlist: PathBuf,
	},

	/// The requested restart photo does not exist.
	#[error("photo {} not found", .0.display())]
	PhotoNotFound(PathBuf),

	/// The photos directory is missing or empty.
	#[error("no photos in {}", .0.display())]
	NoPhotos(PathBuf),

	/// A profile file does not have the expected header layout.
	#[error("malformed profile header in {}: {message}", path.display())]
	ProfileHeader {
		/// Path of the profile.
		path: PathBuf,
		/// What is wrong with it.
		message: String,
	},

	/// A profile header lacks a required column.
	#[error("profile {} has no '{name}' header entry", path.display())]
	MissingHeader {
		/// Path of the profile.
		path: PathBuf,
		/// The header name.
		name: String,
	},

	/// A log file name pattern could not be compiled.
	#[error("invalid log pattern: {0}")]
	Pattern(#[from] globset::Error),
}

impl RunError {
	pub(crate) fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
		RunError::Io {
			path: path.into(),
			error,
		}
	}
}

/// Result type for run orchestration.
pub type Result<T> = std::result::Result<T, RunError>;
