//! The run orchestrator.
//!
//! A [`Runner`] works inside one run directory, the layout the simulation code
//! expects:
//!
//! ```text
//! work_dir/
//!   star        built executable
//!   mk, re      build and restart scripts
//!   inlist      the inlist the executable reads
//!   LOGS/       history and profiles
//!   photos/     restart snapshots
//! ```
//!
//! Each run copies its inlist to `inlist`, adjusts the run-control keys, writes
//! it back, launches `./star` and decides from the output files whether the
//! run converged.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::time::{Duration, Instant};

use chrono::{DateTime, Local, TimeDelta};
use inlist_access::{AccessError, AccessOptions, Inlist, Section, Value};
use tracing::{info, warn};

use crate::error::{Result, RunError};
use crate::logs::{self, Keep};
use crate::profile::ProfileHeader;

/// Name of the inlist the executable reads.
pub const WORKING_INLIST: &str = "inlist";
/// Photo written by the executable for restarts.
pub const RESTART_PHOTO: &str = "restart_photo";
/// Profile name used when the inlist does not set `filename_for_profile_when_terminate`.
pub const DEFAULT_PROFILE_NAME: &str = "profile.data";
/// History name used when the inlist does not set `star_history_name`.
pub const DEFAULT_HISTORY_NAME: &str = "history.data";

const RULE: &str = "%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%%";

/// Settings shared by every run of a [`Runner`].
#[derive(Debug, Clone)]
pub struct RunnerOptions {
	/// Directory holding the executable, scripts and output.
	pub work_dir: PathBuf,
	/// Value written to `pgstar_flag`.
	pub pgstar: bool,
	/// Value written to `pause_before_terminate`.
	pub pause: bool,
	/// How inlists are opened. The output path is always the working inlist.
	pub access: AccessOptions,
}

impl Default for RunnerOptions {
	fn default() -> Self {
		Self {
			work_dir: PathBuf::from("."),
			pgstar: true,
			pause: true,
			access: AccessOptions::default().with_expand_vectors(true).with_environment(true),
		}
	}
}

/// Why a run did not converge.
#[derive(Debug, Clone, PartialEq)]
pub enum Failure {
	/// The terminal profile was not written.
	MissingProfile(PathBuf),
	/// The star stopped before `max_age`.
	TooYoung {
		/// Age recorded in the terminal profile.
		star_age: f64,
		/// Age the run was meant to reach.
		max_age: f64,
	},
	/// The final model was not saved.
	MissingModel(PathBuf),
}

impl std::fmt::Display for Failure {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Failure::MissingProfile(path) => write!(f, "could not find profile {}", path.display()),
			Failure::TooYoung { star_age, max_age } => {
				write!(f, "star age is {star_age:.2E}, while max age is {max_age:.2E}")
			}
			Failure::MissingModel(path) => write!(f, "could not find model {}", path.display()),
		}
	}
}

/// Result of one run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
	/// The inlist that was run.
	pub inlist: PathBuf,
	/// When the executable was started.
	pub started: DateTime<Local>,
	/// Wall-clock duration of the executable.
	pub elapsed: Duration,
	/// Exit status of the executable.
	pub status: ExitStatus,
	/// `None` when the run converged.
	pub failure: Option<Failure>,
}

impl RunOutcome {
	/// Returns true if the run reached its goal.
	pub fn converged(&self) -> bool {
		self.failure.is_none()
	}
}

/// Formats a duration as `h:mm:ss`.
pub fn format_elapsed(elapsed: Duration) -> String {
	let delta = TimeDelta::from_std(elapsed).unwrap_or(TimeDelta::MAX);
	let hours = delta.num_hours();
	let minutes = delta.num_minutes() % 60;
	let seconds = delta.num_seconds() % 60;
	format!("{hours}:{minutes:02}:{seconds:02}")
}

/// Runs inlists and manages the run directory.
#[derive(Debug)]
pub struct Runner {
	options: RunnerOptions,
	last_inlist: Option<PathBuf>,
	model_name: String,
	profile_name: String,
	history_name: String,
	summary: Vec<RunOutcome>,
}

impl Runner {
	/// Creates a runner.
	pub fn new(options: RunnerOptions) -> Self {
		Self {
			options,
			last_inlist: None,
			model_name: String::new(),
			profile_name: String::new(),
			history_name: String::new(),
			summary: Vec::new(),
		}
	}

	/// Outcomes of the runs so far, in order.
	pub fn summary(&self) -> &[RunOutcome] {
		&self.summary
	}

	/// Model file name of the last prepared run.
	pub fn model_name(&self) -> &str {
		&self.model_name
	}

	/// Terminal profile name of the last prepared run.
	pub fn profile_name(&self) -> &str {
		&self.profile_name
	}

	/// History file name of the last prepared run.
	pub fn history_name(&self) -> &str {
		&self.history_name
	}

	/// Runs `inlists` in order, stopping at the first that does not converge.
	///
	/// With `check_age` a run converges when its terminal profile reached
	/// `max_age`; otherwise when it saved its final model.
	///
	/// # Errors
	///
	/// [`RunError::NotConverged`] names the failed inlist; its outcome is the
	/// last entry of [`summary`](Self::summary). Other errors come from
	/// preparing the inlist or starting the executable.
	pub fn run<P: AsRef<Path>>(&mut self, inlists: &[P], check_age: bool) -> Result<&[RunOutcome]> {
		let first = self.summary.len();
		for inlist in inlists {
			let inlist = inlist.as_ref();
			let outcome = self.run_one(inlist, check_age)?;
			let converged = outcome.converged();
			self.summary.push(outcome);
			if !converged {
				return Err(RunError::NotConverged {
					inlist: inlist.to_path_buf(),
				});
			}
		}
		if inlists.len() > 1 {
			info!(count = inlists.len(), "finished running inlists");
		}
		Ok(&self.summary[first..])
	}

	/// Prepares the working inlist from `source` and launches the executable.
	fn run_one(&mut self, source: &Path, check_age: bool) -> Result<RunOutcome> {
		self.last_inlist = Some(source.to_path_buf());
		let inlist = self.prepare(source)?;

		let work_dir = self.options.work_dir.clone();
		logs::remove_file(&work_dir.join(&self.model_name))?;
		logs::remove_file(&work_dir.join(&self.profile_name))?;

		info!(inlist = %source.display(), "running");
		let started = Local::now();
		let clock = Instant::now();
		let status = self.launch("star", &[])?;
		let elapsed = clock.elapsed();
		if !status.success() {
			warn!(%status, "star exited unsuccessfully");
		}

		let failure = if check_age {
			self.check_age(&inlist)?
		} else {
			let model = work_dir.join(&self.model_name);
			(!model.is_file()).then_some(Failure::MissingModel(model))
		};

		let outcome = RunOutcome {
			inlist: source.to_path_buf(),
			started,
			elapsed,
			status,
			failure,
		};
		report(&outcome);
		Ok(outcome)
	}

	/// Copies `source` to the working inlist and sets the run-control keys.
	fn prepare(&mut self, source: &Path) -> Result<Inlist> {
		let work_dir = &self.options.work_dir;
		let working = work_dir.join(WORKING_INLIST);
		let source = if source.is_absolute() {
			source.to_path_buf()
		} else {
			work_dir.join(source)
		};

		if source != working {
			logs::remove_file(&working)?;
			fs::copy(&source, &working).map_err(|e| RunError::io(&source, e))?;
		}
		logs::remove_file(&work_dir.join(RESTART_PHOTO))?;

		let options = self.options.access.clone().with_output(&working);
		let mut inlist = Inlist::open(&working, options)?;

		self.model_name = inlist.get_as::<String>("save_model_filename")?;
		self.profile_name = logs::string_or(&inlist, "filename_for_profile_when_terminate", DEFAULT_PROFILE_NAME)?;
		self.history_name = logs::string_or(&inlist, "star_history_name", DEFAULT_HISTORY_NAME)?;

		inlist.set("pause_before_terminate", self.options.pause)?;
		inlist.set("pgstar_flag", self.options.pgstar)?;
		inlist.persist()?;
		Ok(inlist)
	}

	fn check_age(&self, inlist: &Inlist) -> Result<Option<Failure>> {
		let profile = self.options.work_dir.join(&self.profile_name);
		if !profile.is_file() {
			return Ok(Some(Failure::MissingProfile(profile)));
		}
		let header = ProfileHeader::read(&profile)?;
		let star_age = header.star_age().ok_or_else(|| RunError::MissingHeader {
			path: profile.clone(),
			name: "star_age".to_string(),
		})?;
		let max_age = max_age(inlist)?;
		if star_age < max_age {
			return Ok(Some(Failure::TooYoung { star_age, max_age }));
		}
		Ok(None)
	}

	/// Restarts the last run from `photos/<photo>`.
	///
	/// # Errors
	///
	/// [`RunError::PhotoNotFound`] if the photo does not exist, or the errors
	/// of launching `./re`.
	pub fn restart(&mut self, photo: &str) -> Result<ExitStatus> {
		let photo_path = self.options.work_dir.join("photos").join(photo);
		if !photo_path.is_file() {
			return Err(RunError::PhotoNotFound(photo_path));
		}
		self.restore_working_inlist()?;
		info!(photo, "restarting");
		self.launch("re", &[photo])
	}

	/// Restarts the last run from the newest photo.
	///
	/// # Errors
	///
	/// [`RunError::NoPhotos`] if there is nothing to restart from.
	pub fn restart_latest(&mut self) -> Result<ExitStatus> {
		let photos = self.options.work_dir.join("photos");
		let latest = logs::newest_matching(&photos, None)?.ok_or_else(|| RunError::NoPhotos(photos.clone()))?;
		let name = latest
			.file_name()
			.map(|n| n.to_string_lossy().into_owned())
			.ok_or_else(|| RunError::NoPhotos(photos))?;
		self.restart(&name)
	}

	fn restore_working_inlist(&self) -> Result<()> {
		let working = self.options.work_dir.join(WORKING_INLIST);
		if working.is_file() {
			return Ok(());
		}
		if let Some(last) = &self.last_inlist {
			let last = self.options.work_dir.join(last);
			fs::copy(&last, &working).map_err(|e| RunError::io(&last, e))?;
		}
		Ok(())
	}

	/// Builds the executable with `./mk`.
	///
	/// # Errors
	///
	/// [`RunError::ExecutableMissing`] if the script is absent.
	pub fn make(&self) -> Result<ExitStatus> {
		info!("building star");
		self.launch("mk", &[])
	}

	/// Removes plot images, log data and photos except what `keep` protects.
	///
	/// # Errors
	///
	/// Fails if a file cannot be removed.
	pub fn cleanup(&self, keep: Keep) -> Result<usize> {
		logs::cleanup(&self.options.work_dir, keep)
	}

	/// Copies `LOGS/` into `dest` and moves the terminal profile there.
	///
	/// # Errors
	///
	/// Fails if the working inlist cannot be read (when no run was prepared
	/// yet) or files cannot be copied.
	pub fn copy_logs(&mut self, dest: &Path) -> Result<()> {
		let work_dir = self.options.work_dir.clone();
		if self.profile_name.is_empty() {
			let working = work_dir.join(WORKING_INLIST);
			let inlist = Inlist::open(&working, self.options.access.clone())?;
			self.profile_name = logs::string_or(&inlist, "filename_for_profile_when_terminate", DEFAULT_PROFILE_NAME)?;
		}

		let dest = work_dir.join(dest);
		logs::copy_dir(&work_dir.join(logs::DEFAULT_LOG_DIRECTORY), &dest)?;
		let profile = work_dir.join(&self.profile_name);
		if profile.is_file() {
			let target = dest.join(&self.profile_name);
			fs::rename(&profile, &target).map_err(|e| RunError::io(&profile, e))?;
		}
		info!(dest = %dest.display(), "copied logs");
		Ok(())
	}

	/// Runs `./<script>` inside the work directory and waits for it.
	fn launch(&self, script: &str, args: &[&str]) -> Result<ExitStatus> {
		let dir = std::path::absolute(&self.options.work_dir).map_err(|e| RunError::io(&self.options.work_dir, e))?;
		let program = dir.join(script);
		if !program.is_file() {
			return Err(RunError::ExecutableMissing(program));
		}
		Command::new(&program)
			.args(args)
			.current_dir(&dir)
			.status()
			.map_err(|error| RunError::Spawn { program, error })
	}
}

/// `max_age` from the inlist, or its declared default.
fn max_age(inlist: &Inlist) -> Result<f64> {
	match inlist.get_as::<f64>("max_age") {
		Err(AccessError::ValueNotSet { key }) => inlist
			.defaults(Section::Controls)
			.and_then(|t| t.get("max_age"))
			.and_then(Value::as_float)
			.ok_or(RunError::Access(AccessError::ValueNotSet { key })),
		other => Ok(other?),
	}
}

fn report(outcome: &RunOutcome) {
	let elapsed = format_elapsed(outcome.elapsed);
	info!("{RULE}");
	match &outcome.failure {
		None => info!("evolving the star took {elapsed} h:mm:ss"),
		Some(failure) => {
			info!("{failure}");
			info!("failed to complete {} after {elapsed} h:mm:ss", outcome.inlist.display());
		}
	}
	info!("{RULE}");
}

#[cfg(all(test, unix))]
mod tests;
