#![allow(unused_crate_dependencies)]
//! Reading and rewriting a realistic multi-group inlist.

use inlist_namelist::{IndexWindow, Namelist, Value, scan_windows};
use pretty_assertions::assert_eq;

const INLIST: &str = "
! inlist to evolve a 15 solar mass star

&star_job
  ! see star/defaults/star_job.defaults

  ! begin with a pre-main sequence model
    create_pre_main_sequence_model = .true.

  ! save a model at the end of the run
    save_model_when_terminate = .false.
    save_model_filename = '15M_at_TAMS.mod'

  ! display on-screen plots
    pgstar_flag = .true.

/ ! end of star_job namelist


&controls
  ! starting specifications
    initial_mass = 15 ! in Msun units
    initial_z = 0.014d0

  ! when to stop
    xa_central_lower_limit_species(1) = 'h1'
    xa_central_lower_limit(1) = 1d-3

  ! wind
    x_ctrl(1) = 0.5, x_ctrl(2) = 1.0d-2
    x_ctrl(4) = 2

/ ! end of controls namelist


&pgstar
/ ! end of pgstar namelist
";

#[test]
fn reads_a_project_inlist() {
	let nml: Namelist = INLIST.parse().unwrap();
	assert_eq!(nml.groups().map(|(name, _)| name).collect::<Vec<_>>(), ["star_job", "controls", "pgstar"]);

	let star_job = nml.group("star_job").unwrap();
	assert_eq!(star_job.get("save_model_filename"), Some(&Value::from("15M_at_TAMS.mod")));
	assert_eq!(star_job.get("pgstar_flag"), Some(&Value::Bool(true)));

	let controls = nml.group("controls").unwrap();
	assert_eq!(controls.get("initial_mass"), Some(&Value::Int(15)));
	assert_eq!(controls.get("initial_z"), Some(&Value::Float(0.014)));
	assert_eq!(
		controls.get("xa_central_lower_limit_species"),
		Some(&Value::Sequence(vec![Some(Value::from("h1"))]))
	);
	assert_eq!(
		controls.get("x_ctrl"),
		Some(&Value::Sequence(vec![
			Some(Value::Float(0.5)),
			Some(Value::Float(1e-2)),
			None,
			Some(Value::Int(2)),
		]))
	);
	assert!(nml.group("pgstar").unwrap().is_empty());
}

#[test]
fn windows_follow_the_source_lines() {
	let windows = scan_windows(INLIST);
	assert_eq!(windows.get("xa_central_lower_limit"), Some(&IndexWindow { min: 1, max: 1 }));
	// Only the first assignment on a line is classified.
	assert_eq!(windows.get("x_ctrl"), Some(&IndexWindow { min: 1, max: 4 }));
}

#[test]
fn rewrite_is_stable() {
	let nml: Namelist = INLIST.parse().unwrap();
	let written = nml.to_string();
	let reread: Namelist = written.parse().unwrap();
	assert_eq!(reread, nml);
	assert_eq!(reread.to_string(), written);
	assert!(written.contains("    x_ctrl(4) = 2\n"));
	assert!(!written.contains("x_ctrl(3)"));
}
