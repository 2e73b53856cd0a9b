//! Command-line interface of the `inlist` binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use inlist_access::{AccessOptions, DefaultsOrigin, Inlist, Value};

use crate::error::Result;
use crate::logs::{self, Keep};
use crate::run::{Runner, RunnerOptions, format_elapsed};

#[derive(Parser, Debug)]
#[command(name = "inlist")]
#[command(about = "Edit stellar-evolution inlists and drive runs")]
#[command(version)]
/// Command-line arguments.
pub struct Cli {
	/// Subcommand to execute.
	#[command(subcommand)]
	pub command: Command,

	/// Settings for opening inlists.
	#[command(flatten)]
	pub access: AccessArgs,

	/// Run directory holding `star`, `mk`, `re` and the output directories
	#[arg(short = 'C', long, value_name = "DIR", default_value = ".", global = true)]
	pub dir: PathBuf,

	/// Verbose logging
	#[arg(short, long, global = true)]
	pub verbose: bool,
}

/// Flags that map onto [`AccessOptions`].
#[derive(Args, Debug, Clone, Default)]
pub struct AccessArgs {
	/// Read defaults from a bundled tree (`<DIR>/mesa-r15140`, `<DIR>/mesa-r10108`)
	#[arg(long, value_name = "DIR", global = true, conflicts_with = "mesa_dir")]
	pub defaults: Option<PathBuf>,

	/// Installation to read defaults from instead of $MESA_DIR
	#[arg(long, value_name = "DIR", global = true)]
	pub mesa_dir: Option<PathBuf>,

	/// Omit the eos and kap sections (releases before r15140)
	#[arg(long, global = true)]
	pub legacy: bool,

	/// Re-derive defaults tables instead of using the caches
	#[arg(long, global = true)]
	pub reload_defaults: bool,

	/// Keep vectors collapsed when opening inlists
	#[arg(long, global = true)]
	pub no_expand: bool,

	/// Do not report int/float coercions
	#[arg(long, global = true)]
	pub quiet: bool,
}

impl AccessArgs {
	/// Builds the accessor options these flags describe.
	pub fn options(&self) -> AccessOptions {
		let origin = match (&self.defaults, &self.mesa_dir) {
			(Some(root), _) => DefaultsOrigin::Bundled { root: root.clone() },
			(None, Some(dir)) => DefaultsOrigin::Installation { dir: dir.clone() },
			(None, None) => DefaultsOrigin::Environment,
		};
		AccessOptions::default()
			.with_origin(origin)
			.with_legacy(self.legacy)
			.with_reload_defaults(self.reload_defaults)
			.with_expand_vectors(!self.no_expand)
			.with_suppress_warnings(self.quiet)
	}
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
	/// Run one or more inlists in order, stopping at the first failure
	Run {
		/// Inlists to run
		#[arg(required = true)]
		inlists: Vec<PathBuf>,
		/// Disable pgstar plots
		#[arg(long)]
		no_pgstar: bool,
		/// Do not wait for input when the run terminates
		#[arg(long)]
		no_pause: bool,
		/// Judge success by the saved model instead of the final age
		#[arg(long)]
		no_check_age: bool,
	},
	/// Print parameter values
	Get {
		/// Inlist to read
		inlist: PathBuf,
		/// Keys to print
		#[arg(required = true)]
		keys: Vec<String>,
	},
	/// Set parameter values and write the inlist
	Set {
		/// Inlist to edit
		inlist: PathBuf,
		/// Assignments such as `initial_mass=2d0` or `x_ctrl(3)=0.5`
		#[arg(required = true, value_parser = parse_assignment)]
		assignments: Vec<(String, Value)>,
		/// Write to this file instead of the inlist
		#[arg(short, long, value_name = "PATH")]
		output: Option<PathBuf>,
	},
	/// Remove parameters and write the inlist
	Unset {
		/// Inlist to edit
		inlist: PathBuf,
		/// Keys to remove
		#[arg(required = true)]
		keys: Vec<String>,
		/// Write to this file instead of the inlist
		#[arg(short, long, value_name = "PATH")]
		output: Option<PathBuf>,
	},
	/// Rewrite an inlist with one line per vector element
	Expand {
		/// Inlist to rewrite
		inlist: PathBuf,
		/// Write to this file instead of the inlist
		#[arg(short, long, value_name = "PATH")]
		output: Option<PathBuf>,
	},
	/// Restart from a photo (the newest one if omitted)
	Restart {
		/// Photo name inside `photos/`
		photo: Option<String>,
	},
	/// Build the star executable
	Make,
	/// Delete plot images and log data
	Cleanup {
		/// Keep png/*.png
		#[arg(long)]
		keep_png: bool,
		/// Keep LOGS/*.data and LOGS/*.index
		#[arg(long)]
		keep_logs: bool,
		/// Delete photos/ as well
		#[arg(long)]
		remove_photos: bool,
	},
	/// Copy LOGS and the terminal profile into a directory
	CopyLogs {
		/// Destination directory
		dest: PathBuf,
	},
	/// Print the newest profile written by a run of an inlist
	LatestLog {
		/// Inlist that configured the run
		#[arg(default_value = "inlist")]
		inlist: PathBuf,
	},
	/// Print protosolar-scaled X and Y for a metallicity
	Composition {
		/// Heavy-element mass fraction
		z: f64,
	},
}

/// Parses `key=value`, reading the value with namelist syntax.
pub fn parse_assignment(text: &str) -> std::result::Result<(String, Value), String> {
	let (key, value) = text
		.split_once('=')
		.ok_or_else(|| format!("expected KEY=VALUE, got '{text}'"))?;
	let key = key.trim();
	if key.is_empty() {
		return Err(format!("missing key in '{text}'"));
	}
	let parsed = inlist_namelist::parse(&format!("&arg\n v = {value}\n/\n")).map_err(|e| e.to_string())?;
	let value = parsed
		.group("arg")
		.and_then(|g| g.get("v"))
		.cloned()
		.ok_or_else(|| format!("missing value in '{text}'"))?;
	Ok((key.to_string(), value))
}

impl Cli {
	/// Executes the selected subcommand, printing results to stdout.
	///
	/// # Errors
	///
	/// Returns the first error raised by the accessor or the runner.
	pub fn execute(self) -> Result<()> {
		let access = self.access.options();
		let work_dir = self.dir;
		let in_dir = |path: PathBuf| if path.is_absolute() { path } else { work_dir.join(path) };

		match self.command {
			Command::Run {
				inlists,
				no_pgstar,
				no_pause,
				no_check_age,
			} => {
				let mut runner = Runner::new(RunnerOptions {
					work_dir: work_dir.clone(),
					pgstar: !no_pgstar,
					pause: !no_pause,
					access,
				});
				let outcomes = runner.run(&inlists, !no_check_age)?;
				for outcome in outcomes {
					println!("{}\t{}", outcome.inlist.display(), format_elapsed(outcome.elapsed));
				}
			}
			Command::Get { inlist, keys } => {
				let inlist = Inlist::open(in_dir(inlist), access)?;
				for key in keys {
					println!("{key} = {}", inlist.get(&key)?);
				}
			}
			Command::Set {
				inlist,
				assignments,
				output,
			} => {
				let mut inlist = Inlist::open(in_dir(inlist), with_output(access, output.map(in_dir)))?;
				for (key, value) in assignments {
					inlist.set(&key, value)?;
				}
				inlist.persist()?;
			}
			Command::Unset { inlist, keys, output } => {
				let mut inlist = Inlist::open(in_dir(inlist), with_output(access, output.map(in_dir)))?;
				for key in keys {
					inlist.remove(&key)?;
				}
				inlist.persist()?;
			}
			Command::Expand { inlist, output } => {
				let mut inlist = Inlist::open(in_dir(inlist), with_output(access, output.map(in_dir)))?;
				inlist.fix_vectors();
				inlist.persist()?;
			}
			Command::Restart { photo } => {
				let mut runner = Runner::new(RunnerOptions {
					work_dir: work_dir.clone(),
					access,
					..RunnerOptions::default()
				});
				match photo {
					Some(photo) => runner.restart(&photo)?,
					None => runner.restart_latest()?,
				};
			}
			Command::Make => {
				let runner = Runner::new(RunnerOptions {
					work_dir: work_dir.clone(),
					access,
					..RunnerOptions::default()
				});
				runner.make()?;
			}
			Command::Cleanup {
				keep_png,
				keep_logs,
				remove_photos,
			} => {
				let removed = logs::cleanup(
					&work_dir,
					Keep {
						png: keep_png,
						logs: keep_logs,
						photos: !remove_photos,
					},
				)?;
				println!("removed {removed} files");
			}
			Command::CopyLogs { dest } => {
				let mut runner = Runner::new(RunnerOptions {
					work_dir: work_dir.clone(),
					access,
					..RunnerOptions::default()
				});
				runner.copy_logs(&dest)?;
			}
			Command::LatestLog { inlist } => {
				let inlist = Inlist::open(in_dir(inlist), access)?;
				match logs::latest_log(&inlist, &work_dir)? {
					Some(path) => println!("{}", path.display()),
					None => tracing::warn!("no profiles found"),
				}
			}
			Command::Composition { z } => {
				let x = crate::composition::hydrogen_fraction(z);
				let y = crate::composition::helium_fraction(z);
				println!("initial_z = {z}\ninitial_y = {y}\nX = {x}");
			}
		}
		Ok(())
	}
}

fn with_output(options: AccessOptions, output: Option<PathBuf>) -> AccessOptions {
	match output {
		Some(path) => options.with_output(path),
		None => options,
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use rstest::rstest;

	use super::*;

	#[rstest]
	#[case("initial_mass=2d0", "initial_mass", Value::Float(2.0))]
	#[case("x_ctrl(3) = 0.5", "x_ctrl(3)", Value::Float(0.5))]
	#[case("pgstar_flag=.true.", "pgstar_flag", Value::Bool(true))]
	#[case("log_directory='LOGS_1'", "log_directory", Value::from("LOGS_1"))]
	#[case("max_model_number=100", "max_model_number", Value::Int(100))]
	fn assignments(#[case] text: &str, #[case] key: &str, #[case] value: Value) {
		assert_eq!(parse_assignment(text).unwrap(), (key.to_string(), value));
	}

	#[rstest]
	#[case("initial_mass")]
	#[case("=1")]
	#[case("initial_mass='open")]
	fn bad_assignments(#[case] text: &str) {
		assert!(parse_assignment(text).is_err());
	}

	#[test]
	fn global_flags_build_options() {
		let cli = Cli::try_parse_from([
			"inlist",
			"get",
			"inlist_project",
			"initial_mass",
			"--defaults",
			"data",
			"--legacy",
			"--no-expand",
		])
		.unwrap();
		let options = cli.access.options();
		assert_eq!(options.origin, DefaultsOrigin::Bundled { root: "data".into() });
		assert!(options.legacy);
		assert!(!options.expand_vectors);
		assert!(!options.reload_defaults);
	}

	#[test]
	fn environment_is_the_default_origin() {
		let cli = Cli::try_parse_from(["inlist", "-v", "make"]).unwrap();
		assert!(cli.verbose);
		assert_eq!(cli.access.options().origin, DefaultsOrigin::Environment);
		assert!(cli.access.options().expand_vectors);
	}

	#[test]
	fn set_collects_typed_assignments() {
		let cli = Cli::try_parse_from(["inlist", "set", "inlist_1", "initial_z=0.02", "x_ctrl(1)=1", "-o", "out"])
			.unwrap();
		let Command::Set {
			assignments, output, ..
		} = cli.command
		else {
			panic!("expected set");
		};
		assert_eq!(
			assignments,
			[
				("initial_z".to_string(), Value::Float(0.02)),
				("x_ctrl(1)".to_string(), Value::Int(1)),
			]
		);
		assert_eq!(output, Some(PathBuf::from("out")));
	}

	#[test]
	fn run_requires_an_inlist() {
		assert!(Cli::try_parse_from(["inlist", "run"]).is_err());
	}
}
