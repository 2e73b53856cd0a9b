//! Fixtures shared by the unit tests.

use std::fs;
use std::path::Path;

use inlist_access::{AccessOptions, DefaultsOrigin};

const STAR_JOB: &str = "\
save_model_when_terminate = .false.
save_model_filename = 'undefined'
pause_before_terminate = .false.
pgstar_flag = .false.
";

const CONTROLS: &str = "\
initial_mass = 1d0
max_age = 1d36
log_directory = 'LOGS'
profile_data_prefix = 'profile'
filename_for_profile_when_terminate = ''
star_history_name = 'history.data'
x_ctrl(1:num_x_ctrls) = 0d0
";

/// Writes a bundled defaults tree under `root/defaults` and returns options
/// reading from it.
pub(crate) fn bundled_options(root: &Path) -> AccessOptions {
	let bundle = root.join("defaults/mesa-r15140");
	fs::create_dir_all(&bundle).unwrap();
	fs::write(bundle.join("star_job.defaults"), STAR_JOB).unwrap();
	fs::write(bundle.join("controls.defaults"), CONTROLS).unwrap();
	fs::write(bundle.join("pgstar.defaults"), "pgstar_interval = 2\n").unwrap();
	fs::write(bundle.join("eos.defaults"), "use_freeeos = .true.\n").unwrap();
	fs::write(bundle.join("kap.defaults"), "kap_file_prefix = 'gs98'\n").unwrap();
	AccessOptions::default().with_origin(DefaultsOrigin::Bundled {
		root: root.join("defaults"),
	})
}
