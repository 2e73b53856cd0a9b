use std::fs;
use std::os::unix::fs::PermissionsExt;

use inlist_access::Inlist;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use super::*;
use crate::test_support::bundled_options;

const PROFILE_HEADER: &str = "\
          1          2
model_number   star_age
        1000    2.5E+09
";

fn script(dir: &Path, name: &str, body: &str) {
	let path = dir.join(name);
	fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
	let mut perms = fs::metadata(&path).unwrap().permissions();
	perms.set_mode(0o755);
	fs::set_permissions(&path, perms).unwrap();
}

fn runner(dir: &TempDir) -> Runner {
	Runner::new(RunnerOptions {
		work_dir: dir.path().to_path_buf(),
		pgstar: false,
		pause: false,
		access: bundled_options(dir.path()),
	})
}

fn project(dir: &TempDir, name: &str, model: &str, extra_controls: &str) {
	fs::write(
		dir.path().join(name),
		format!(
			"&star_job\n    save_model_when_terminate = .true.\n    save_model_filename = '{model}'\n    pgstar_flag = .true.\n/\n\n&controls\n    initial_mass = 2.0\n{extra_controls}/\n"
		),
	)
	.unwrap();
}

#[test]
fn prepares_working_inlist() {
	let dir = TempDir::new().unwrap();
	project(&dir, "inlist_project", "final.mod", "");
	fs::write(dir.path().join("restart_photo"), "stale").unwrap();
	script(dir.path(), "star", "touch final.mod");

	let mut runner = runner(&dir);
	runner.run(&["inlist_project"], false).unwrap();

	assert!(!dir.path().join("restart_photo").exists());
	let working = Inlist::open(dir.path().join("inlist"), bundled_options(dir.path())).unwrap();
	assert_eq!(working.get_as::<bool>("pgstar_flag").unwrap(), false);
	assert_eq!(working.get_as::<bool>("pause_before_terminate").unwrap(), false);
	assert_eq!(working.get_as::<f64>("initial_mass").unwrap(), 2.0);

	let source = fs::read_to_string(dir.path().join("inlist_project")).unwrap();
	assert!(source.contains("pgstar_flag = .true."));

	assert_eq!(runner.model_name(), "final.mod");
	assert_eq!(runner.profile_name(), "profile.data");
	assert_eq!(runner.history_name(), "history.data");
}

#[test]
fn model_check_removes_stale_model() {
	let dir = TempDir::new().unwrap();
	project(&dir, "inlist_project", "final.mod", "");
	fs::write(dir.path().join("final.mod"), "old").unwrap();
	script(dir.path(), "star", "exit 0");

	let mut runner = runner(&dir);
	let err = runner.run(&["inlist_project"], false).unwrap_err();
	assert!(matches!(err, RunError::NotConverged { .. }));
	assert_eq!(
		runner.summary()[0].failure,
		Some(Failure::MissingModel(dir.path().join("final.mod")))
	);
}

#[test]
fn sequence_stops_at_first_failure() {
	let dir = TempDir::new().unwrap();
	project(&dir, "inlist_1", "final.mod", "");
	project(&dir, "inlist_2", "other.mod", "");
	project(&dir, "inlist_3", "final.mod", "");
	script(dir.path(), "star", "touch final.mod");

	let mut runner = runner(&dir);
	match runner.run(&["inlist_1", "inlist_2", "inlist_3"], false) {
		Err(RunError::NotConverged { inlist }) => assert_eq!(inlist, Path::new("inlist_2")),
		other => panic!("unexpected result: {other:?}"),
	}
	let converged: Vec<bool> = runner.summary().iter().map(RunOutcome::converged).collect();
	assert_eq!(converged, [true, false]);
}

#[test]
fn age_check_compares_profile_with_max_age() {
	let dir = TempDir::new().unwrap();
	fs::write(dir.path().join("profile_header"), PROFILE_HEADER).unwrap();
	script(dir.path(), "star", "cp profile_header final_profile.data");

	project(
		&dir,
		"inlist_young",
		"final.mod",
		"    filename_for_profile_when_terminate = 'final_profile.data'\n    max_age = 1d10\n",
	);
	project(
		&dir,
		"inlist_old",
		"final.mod",
		"    filename_for_profile_when_terminate = 'final_profile.data'\n    max_age = 1d9\n",
	);

	let mut runner = runner(&dir);
	let outcomes = runner.run(&["inlist_old"], true).unwrap();
	assert!(outcomes[0].converged());
	assert!(outcomes[0].status.success());

	let err = runner.run(&["inlist_young"], true).unwrap_err();
	assert!(matches!(err, RunError::NotConverged { .. }));
	assert_eq!(
		runner.summary()[1].failure,
		Some(Failure::TooYoung {
			star_age: 2.5e9,
			max_age: 1e10,
		})
	);
}

#[test]
fn age_check_uses_declared_max_age_and_needs_profile() {
	let dir = TempDir::new().unwrap();
	script(dir.path(), "star", "exit 0");
	project(&dir, "inlist_project", "final.mod", "");

	let mut runner = runner(&dir);
	runner.run(&["inlist_project"], true).unwrap_err();
	assert_eq!(
		runner.summary()[0].failure,
		Some(Failure::MissingProfile(dir.path().join("profile.data")))
	);

	fs::write(dir.path().join("profile_header"), PROFILE_HEADER).unwrap();
	script(dir.path(), "star", "cp profile_header profile.data");
	runner.run(&["inlist_project"], true).unwrap_err();
	assert_eq!(
		runner.summary()[1].failure,
		Some(Failure::TooYoung {
			star_age: 2.5e9,
			max_age: 1e36,
		})
	);
}

#[test]
fn missing_executable() {
	let dir = TempDir::new().unwrap();
	project(&dir, "inlist_project", "final.mod", "");
	let mut runner = runner(&dir);
	assert!(matches!(
		runner.run(&["inlist_project"], false),
		Err(RunError::ExecutableMissing(path)) if path.ends_with("star")
	));
	assert!(matches!(runner.make(), Err(RunError::ExecutableMissing(_))));
}

#[test]
fn make_runs_build_script() {
	let dir = TempDir::new().unwrap();
	script(dir.path(), "mk", "touch star");
	assert!(runner(&dir).make().unwrap().success());
	assert!(dir.path().join("star").is_file());
}

#[test]
fn restart_from_named_and_latest_photo() {
	let dir = TempDir::new().unwrap();
	script(dir.path(), "re", "touch \"restarted_$1\"");
	fs::create_dir_all(dir.path().join("photos")).unwrap();
	let old = fs::File::create(dir.path().join("photos/x100")).unwrap();
	old.set_modified(std::time::SystemTime::now() - Duration::from_secs(60)).unwrap();
	fs::File::create(dir.path().join("photos/x200")).unwrap();

	let mut runner = runner(&dir);
	runner.restart("x100").unwrap();
	assert!(dir.path().join("restarted_x100").is_file());

	runner.restart_latest().unwrap();
	assert!(dir.path().join("restarted_x200").is_file());

	assert!(matches!(runner.restart("x999"), Err(RunError::PhotoNotFound(_))));
}

#[test]
fn restart_without_photos() {
	let dir = TempDir::new().unwrap();
	script(dir.path(), "re", "exit 0");
	assert!(matches!(runner(&dir).restart_latest(), Err(RunError::NoPhotos(_))));
}

#[test]
fn copy_logs_moves_terminal_profile() {
	let dir = TempDir::new().unwrap();
	project(
		&dir,
		"inlist",
		"final.mod",
		"    filename_for_profile_when_terminate = 'final_profile.data'\n",
	);
	fs::create_dir_all(dir.path().join("LOGS")).unwrap();
	fs::write(dir.path().join("LOGS/history.data"), "h").unwrap();
	fs::write(dir.path().join("final_profile.data"), "p").unwrap();

	let mut runner = runner(&dir);
	runner.copy_logs(Path::new("run_1")).unwrap();
	assert!(dir.path().join("run_1/history.data").is_file());
	assert!(dir.path().join("run_1/final_profile.data").is_file());
	assert!(!dir.path().join("final_profile.data").exists());
	assert!(dir.path().join("LOGS/history.data").is_file());
}

#[test]
fn elapsed_formatting() {
	assert_eq!(format_elapsed(Duration::from_secs(0)), "0:00:00");
	assert_eq!(format_elapsed(Duration::from_millis(61_500)), "0:01:01");
	assert_eq!(format_elapsed(Duration::from_secs(3 * 3600 + 25 * 60 + 7)), "3:25:07");
}
