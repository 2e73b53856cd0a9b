use std::fs;
use std::path::Path;

use inlist_namelist::Value;
use pretty_assertions::assert_eq;
use rstest::rstest;
use tempfile::TempDir;

use super::*;

const CONTROLS_DEFAULTS: &str = "\
! output controls
initial_mass = 1
initial_z = 0.02d0

max_age = 1d36
x_ctrl(1:num_x_ctrls) = 0d0
x_integer_ctrl(1:num_x_ctrls) = 0
log_directory = 'LOGS'
";

const STAR_JOB_DEFAULTS: &str = "\
save_model_when_terminate = .false.
save_model_filename = 'final.mod'
pgstar_flag = .false.
";

fn write_install(root: &Path) {
	let star = root.join("star/defaults");
	fs::create_dir_all(&star).unwrap();
	fs::write(star.join("controls.defaults"), CONTROLS_DEFAULTS).unwrap();
	fs::write(star.join("star_job.defaults"), STAR_JOB_DEFAULTS).unwrap();
	fs::write(star.join("pgstar.defaults"), "pgstar_interval = 2\n").unwrap();
}

fn installation(dir: &TempDir) -> DefaultsOrigin {
	DefaultsOrigin::Installation {
		dir: dir.path().to_path_buf(),
	}
}

#[test]
fn parses_defaults_with_placeholders() {
	let table = parse_defaults(
		Section::Controls,
		CONTROLS_DEFAULTS,
		&[("num_x_ctrls".to_string(), 10)],
		Path::new("controls.defaults"),
	)
	.unwrap();

	assert_eq!(table.get("initial_mass"), Some(&Value::Int(1)));
	assert_eq!(table.get("initial_z"), Some(&Value::Float(0.02)));
	assert_eq!(table.get("log_directory"), Some(&Value::from("LOGS")));
	assert_eq!(table.sequence_len("x_ctrl"), Some(10));
	assert_eq!(table.sequence_len("x_integer_ctrl"), Some(10));
	assert_eq!(table.scalar_default("x_ctrl"), Some(&Value::Float(0.0)));
	assert_eq!(table.sequence_len("initial_mass"), None);
	assert_eq!(
		table.keys().collect::<Vec<_>>(),
		["initial_mass", "initial_z", "max_age", "x_ctrl", "x_integer_ctrl", "log_directory"]
	);
}

#[test]
fn malformed_defaults_report_the_file() {
	let err = parse_defaults(Section::Kap, "kap_file_prefix = 'unterminated\n", &[], Path::new("kap.defaults"))
		.unwrap_err();
	match err {
		AccessError::Parse { path, .. } => assert_eq!(path, Path::new("kap.defaults")),
		other => panic!("unexpected error: {other}"),
	}
}

#[test]
fn unset_environment_is_reported() {
	assert!(matches!(
		resolve_install_dir(None),
		Err(AccessError::EnvironmentNotConfigured { var: "MESA_DIR" })
	));
	assert!(matches!(
		resolve_install_dir(Some(OsString::new())),
		Err(AccessError::EnvironmentNotConfigured { .. })
	));
}

#[test]
fn missing_install_dir_is_reported() {
	let dir = TempDir::new().unwrap();
	let gone = dir.path().join("mesa");
	match resolve_install_dir(Some(gone.clone().into_os_string())) {
		Err(AccessError::DirectoryNotFound(path)) => assert_eq!(path, gone),
		other => panic!("unexpected result: {other:?}"),
	}
	assert_eq!(resolve_install_dir(Some(dir.path().as_os_str().to_owned())).unwrap(), dir.path());
}

#[rstest]
#[case(Section::StarJob, "star/defaults/star_job.defaults")]
#[case(Section::Controls, "star/defaults/controls.defaults")]
#[case(Section::Pgstar, "star/defaults/pgstar.defaults")]
#[case(Section::Eos, "eos/defaults/eos.defaults")]
#[case(Section::Kap, "kap/defaults/kap.defaults")]
fn installation_layout(#[case] section: Section, #[case] relative: &str) {
	let dir = TempDir::new().unwrap();
	for sub in ["star/defaults", "eos/defaults", "kap/defaults"] {
		fs::create_dir_all(dir.path().join(sub)).unwrap();
	}
	let loader = DefaultsLoader::with_cache(installation(&dir), false, MemoryCache::new());
	assert_eq!(loader.source_path(section).unwrap(), dir.path().join(relative));
}

#[test]
fn missing_section_dir_is_reported() {
	let dir = TempDir::new().unwrap();
	write_install(dir.path());
	let mut loader = DefaultsLoader::with_cache(installation(&dir), false, MemoryCache::new());
	match loader.load(Section::Eos) {
		Err(AccessError::DirectoryNotFound(path)) => assert_eq!(path, dir.path().join("eos/defaults")),
		other => panic!("unexpected result: {other:?}"),
	}
}

#[test]
fn missing_defaults_file_is_reported() {
	let dir = TempDir::new().unwrap();
	fs::create_dir_all(dir.path().join("kap/defaults")).unwrap();
	let mut loader = DefaultsLoader::with_cache(installation(&dir), false, MemoryCache::new());
	match loader.load(Section::Kap) {
		Err(AccessError::FileNotFound(path)) => {
			assert_eq!(path, dir.path().join("kap/defaults/kap.defaults"))
		}
		other => panic!("unexpected result: {other:?}"),
	}
}

#[rstest]
#[case(false, "mesa-r15140")]
#[case(true, "mesa-r10108")]
fn bundled_layout(#[case] legacy: bool, #[case] release: &str) {
	let dir = TempDir::new().unwrap();
	let bundle = dir.path().join(release);
	fs::create_dir_all(&bundle).unwrap();
	fs::write(bundle.join("star_job.defaults"), STAR_JOB_DEFAULTS).unwrap();

	let origin = DefaultsOrigin::Bundled {
		root: dir.path().to_path_buf(),
	};
	let mut loader = DefaultsLoader::with_cache(origin, legacy, MemoryCache::new());
	let table = loader.load(Section::StarJob).unwrap();
	assert_eq!(table.get("save_model_filename"), Some(&Value::from("final.mod")));
	assert_eq!(loader.is_legacy(), legacy);
}

#[test]
fn missing_bundle_is_reported() {
	let dir = TempDir::new().unwrap();
	let origin = DefaultsOrigin::Bundled {
		root: dir.path().to_path_buf(),
	};
	let loader = DefaultsLoader::with_cache(origin, true, MemoryCache::new());
	assert!(matches!(
		loader.defaults_dir(Section::Controls),
		Err(AccessError::DirectoryNotFound(path)) if path == dir.path().join("mesa-r10108")
	));
}

#[test]
fn named_sections() {
	let dir = TempDir::new().unwrap();
	write_install(dir.path());
	let mut loader = DefaultsLoader::with_cache(installation(&dir), false, MemoryCache::new());
	assert_eq!(loader.load_named("PGSTAR").unwrap().get("pgstar_interval"), Some(&Value::Int(2)));
	assert!(matches!(loader.load_named("binary"), Err(AccessError::InvalidSection(name)) if name == "binary"));
}

#[test]
fn cache_hit_skips_parsing() {
	let dir = TempDir::new().unwrap();
	write_install(dir.path());

	let seeded = DefaultTable::from_entries(Section::Controls, [("initial_mass", Value::Float(7.0))]);
	let mut cache = MemoryCache::new();
	cache.insert(VersionTag::Current, seeded.clone());

	let mut loader = DefaultsLoader::with_cache(installation(&dir), false, cache);
	assert_eq!(loader.load(Section::Controls).unwrap(), seeded);
}

#[test]
fn reload_bypasses_and_refreshes_cache() {
	let dir = TempDir::new().unwrap();
	write_install(dir.path());

	let seeded = DefaultTable::from_entries(Section::Controls, [("initial_mass", Value::Float(7.0))]);
	let mut cache = MemoryCache::new();
	cache.insert(VersionTag::Current, seeded.clone());

	let mut loader = DefaultsLoader::with_cache(installation(&dir), false, cache).reload(true);
	let table = loader.load(Section::Controls).unwrap();
	assert_eq!(table.get("initial_mass"), Some(&Value::Int(1)));
	assert_eq!(loader.cache().get(Section::Controls, VersionTag::Current), Some(&table));
}

#[test]
fn placeholder_override() {
	let dir = TempDir::new().unwrap();
	write_install(dir.path());
	let mut loader =
		DefaultsLoader::with_cache(installation(&dir), false, MemoryCache::new()).placeholder("num_x_ctrls", 3);
	let table = loader.load(Section::Controls).unwrap();
	assert_eq!(table.sequence_len("x_ctrl"), Some(3));
}

#[test]
fn file_cache_round_trip() {
	let dir = TempDir::new().unwrap();
	write_install(dir.path());

	let mut loader = DefaultsLoader::new(installation(&dir), false);
	let first = loader.load(Section::StarJob).unwrap();

	let cache_file = dir.path().join("star/defaults/star_job.defaults.r15140.cache");
	assert!(cache_file.exists());

	// Changing the source is invisible until a reload.
	fs::write(
		dir.path().join("star/defaults/star_job.defaults"),
		"save_model_filename = 'other.mod'\n",
	)
	.unwrap();
	assert_eq!(loader.load(Section::StarJob).unwrap(), first);

	let mut reloading = DefaultsLoader::new(installation(&dir), false).reload(true);
	let fresh = reloading.load(Section::StarJob).unwrap();
	assert_eq!(fresh.get("save_model_filename"), Some(&Value::from("other.mod")));
	assert_eq!(loader.load(Section::StarJob).unwrap(), fresh);
}

#[test]
fn corrupt_file_cache_is_a_miss() {
	let dir = TempDir::new().unwrap();
	write_install(dir.path());
	let cache_file = dir.path().join("star/defaults/pgstar.defaults.r15140.cache");
	fs::write(&cache_file, [0xff, 0xff, 0xff]).unwrap();

	let mut loader = DefaultsLoader::new(installation(&dir), false);
	let table = loader.load(Section::Pgstar).unwrap();
	assert_eq!(table.get("pgstar_interval"), Some(&Value::Int(2)));

	let bytes = fs::read(&cache_file).unwrap();
	let decoded: DefaultTable = postcard::from_bytes(&bytes).unwrap();
	assert_eq!(decoded, table);
}

#[test]
fn legacy_and_current_caches_are_separate() {
	let key = |tag| CacheKey {
		section: Section::Controls,
		tag,
		source: "/x/controls.defaults".into(),
	};
	assert_eq!(
		FileCache::path_for(&key(VersionTag::Current)),
		Path::new("/x/controls.defaults.r15140.cache")
	);
	assert_eq!(
		FileCache::path_for(&key(VersionTag::Legacy)),
		Path::new("/x/controls.defaults.r10108.cache")
	);
}
