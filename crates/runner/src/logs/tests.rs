use std::fs::{self, File};
use std::time::{Duration, SystemTime};

use inlist_access::Inlist;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use super::*;
use crate::test_support::bundled_options;

fn touch(path: &Path, age_secs: u64) {
	fs::create_dir_all(path.parent().unwrap()).unwrap();
	let file = File::create(path).unwrap();
	file.set_modified(SystemTime::now() - Duration::from_secs(age_secs)).unwrap();
}

fn open(dir: &TempDir, text: &str) -> Inlist {
	let path = dir.path().join("inlist");
	fs::write(&path, text).unwrap();
	Inlist::open(&path, bundled_options(dir.path())).unwrap()
}

#[test]
fn latest_log_uses_fallback_names() {
	let dir = TempDir::new().unwrap();
	touch(&dir.path().join("LOGS/profile1.data"), 30);
	touch(&dir.path().join("LOGS/profile2.data"), 10);
	touch(&dir.path().join("LOGS/history.data"), 0);
	touch(&dir.path().join("LOGS/profiles.index"), 0);

	let inlist = open(&dir, "&controls\n/\n");
	assert_eq!(
		latest_log(&inlist, dir.path()).unwrap(),
		Some(dir.path().join("LOGS/profile2.data"))
	);
}

#[test]
fn latest_log_follows_inlist_settings() {
	let dir = TempDir::new().unwrap();
	touch(&dir.path().join("LOGS_2/prof_7.data"), 5);
	touch(&dir.path().join("LOGS_2/profile9.data"), 0);

	let inlist = open(
		&dir,
		"&controls\n    log_directory = 'LOGS_2'\n    profile_data_prefix = 'prof_'\n/\n",
	);
	assert_eq!(
		latest_log(&inlist, dir.path()).unwrap(),
		Some(dir.path().join("LOGS_2/prof_7.data"))
	);
}

#[test]
fn latest_log_matches_prefix_literally() {
	let dir = TempDir::new().unwrap();
	touch(&dir.path().join("LOGS/run[1]_3.data"), 20);
	touch(&dir.path().join("LOGS/run1_4.data"), 0);
	touch(&dir.path().join("LOGS/runX_5.data"), 0);

	let inlist = open(&dir, "&controls\n    profile_data_prefix = 'run[1]_'\n/\n");
	assert_eq!(
		latest_log(&inlist, dir.path()).unwrap(),
		Some(dir.path().join("LOGS/run[1]_3.data"))
	);

	let inlist = open(&dir, "&controls\n    profile_data_prefix = 'run?_'\n/\n");
	assert_eq!(latest_log(&inlist, dir.path()).unwrap(), None);
}

#[test]
fn latest_log_without_logs() {
	let dir = TempDir::new().unwrap();
	let inlist = open(&dir, "&controls\n/\n");
	assert_eq!(latest_log(&inlist, dir.path()).unwrap(), None);
}

#[test]
fn newest_file_ignores_directories() {
	let dir = TempDir::new().unwrap();
	touch(&dir.path().join("photos/x100"), 20);
	touch(&dir.path().join("photos/x200"), 5);
	fs::create_dir_all(dir.path().join("photos/nested")).unwrap();
	assert_eq!(
		newest_matching(&dir.path().join("photos"), None).unwrap(),
		Some(dir.path().join("photos/x200"))
	);
}

#[test]
fn cleanup_respects_keep_flags() {
	let dir = TempDir::new().unwrap();
	let root = dir.path();
	for name in ["png/grid_001.png", "png/notes.txt", "LOGS/profile1.data", "LOGS/profiles.index", "LOGS/keep.txt", "photos/x100"] {
		touch(&root.join(name), 0);
	}

	assert_eq!(cleanup(root, Keep::default()).unwrap(), 3);
	assert!(!root.join("png/grid_001.png").exists());
	assert!(root.join("png/notes.txt").exists());
	assert!(!root.join("LOGS/profile1.data").exists());
	assert!(root.join("LOGS/keep.txt").exists());
	assert!(root.join("photos/x100").exists());

	let keep_all_but_photos = Keep {
		png: true,
		logs: true,
		photos: false,
	};
	assert_eq!(cleanup(root, keep_all_but_photos).unwrap(), 1);
	assert!(!root.join("photos/x100").exists());
}

#[test]
fn copy_dir_is_recursive() {
	let dir = TempDir::new().unwrap();
	touch(&dir.path().join("LOGS/history.data"), 0);
	touch(&dir.path().join("LOGS/sub/profile1.data"), 0);
	copy_dir(&dir.path().join("LOGS"), &dir.path().join("saved")).unwrap();
	assert!(dir.path().join("saved/history.data").is_file());
	assert!(dir.path().join("saved/sub/profile1.data").is_file());
}
