//! Fortran namelist documents.
//!
//! This crate reads and writes the namelist dialect used by stellar-evolution
//! inlists:
//!
//! ```text
//! &controls
//!     ! comment
//!     initial_mass = 1.0
//!     x_ctrl(1) = 0.5
//!     x_ctrl(2) = 1d-3
//! /
//! ```
//!
//! - **Values**: [`Value`] is a closed tagged type (logical, integer, real,
//!   string, sequence) shared with the configuration layer.
//! - **Vectors**: indexed assignments `name(i) = v` collapse into one
//!   [`Value::Sequence`] per base; [`vector`] holds the key grammar and the
//!   present-index window scan.
//! - **Writing**: [`Namelist`] renders back to text through [`Display`](core::fmt::Display),
//!   with reals in `.3e` exponential form.
//!
//! Group and key names are case-insensitive in Fortran; the reader stores them
//! lowercased.

mod parse;
pub mod value;
pub mod vector;
mod write;

use indexmap::IndexMap;
use rustc_hash::FxHashMap as HashMap;

pub use parse::{MAX_INDEX, ParseError, parse};
pub use value::{Compatibility, FromValue, Value, ValueType};
pub use vector::{IndexWindow, VectorKey, check_vector, scan_windows, vector_key};
pub use write::format_real;

/// Result type for namelist parsing.
pub type Result<T> = std::result::Result<T, ParseError>;

/// A parsed namelist file: an ordered set of named groups.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Namelist {
	groups: IndexMap<String, Group>,
}

impl Namelist {
	/// Creates an empty namelist.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the group with the given (lowercase) name.
	pub fn group(&self, name: &str) -> Option<&Group> {
		self.groups.get(name)
	}

	/// Returns the group with the given (lowercase) name mutably.
	pub fn group_mut(&mut self, name: &str) -> Option<&mut Group> {
		self.groups.get_mut(name)
	}

	/// Returns the named group, appending an empty one if it does not exist.
	pub fn group_or_insert(&mut self, name: &str) -> &mut Group {
		self.groups.entry(name.to_string()).or_default()
	}

	/// Inserts or replaces a whole group.
	pub fn insert_group(&mut self, name: impl Into<String>, group: Group) {
		self.groups.insert(name.into(), group);
	}

	/// Iterates over groups in file order.
	pub fn groups(&self) -> impl Iterator<Item = (&str, &Group)> {
		self.groups.iter().map(|(name, group)| (name.as_str(), group))
	}

	/// Number of groups.
	pub fn len(&self) -> usize {
		self.groups.len()
	}

	/// Returns true if the namelist has no groups.
	pub fn is_empty(&self) -> bool {
		self.groups.is_empty()
	}
}

impl core::str::FromStr for Namelist {
	type Err = ParseError;

	fn from_str(input: &str) -> Result<Self> {
		parse(input)
	}
}

/// One `&name ... /` group: ordered key/value entries.
///
/// Sequence entries remember the index of their first element, so that a
/// source which only assigns `arr(4)` and `arr(5)` is written back with the
/// same indices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Group {
	entries: IndexMap<String, Value>,
	start_index: HashMap<String, usize>,
}

impl Group {
	/// Creates an empty group.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the value stored under `key`.
	pub fn get(&self, key: &str) -> Option<&Value> {
		self.entries.get(key)
	}

	/// Returns the value stored under `key` mutably.
	pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
		self.entries.get_mut(key)
	}

	/// Returns true if `key` has an entry.
	pub fn contains_key(&self, key: &str) -> bool {
		self.entries.contains_key(key)
	}

	/// Inserts or replaces an entry, keeping the position of an existing key.
	///
	/// A sequence inserted under a new key starts at index 1.
	pub fn insert(&mut self, key: impl Into<String>, value: Value) {
		self.entries.insert(key.into(), value);
	}

	/// Inserts a sequence whose element 0 corresponds to index `start`.
	pub fn insert_sequence(&mut self, key: impl Into<String>, start: usize, items: Vec<Option<Value>>) {
		let key = key.into();
		if start == 1 {
			self.start_index.remove(&key);
		} else {
			self.start_index.insert(key.clone(), start);
		}
		self.entries.insert(key, Value::Sequence(items));
	}

	/// Removes an entry, preserving the order of the remaining ones.
	pub fn remove(&mut self, key: &str) -> Option<Value> {
		self.start_index.remove(key);
		self.entries.shift_remove(key)
	}

	/// Index of element 0 of the sequence stored under `key` (1 unless recorded otherwise).
	pub fn start_index(&self, key: &str) -> usize {
		self.start_index.get(key).copied().unwrap_or(1)
	}

	/// Iterates over entries in insertion order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
		self.entries.iter().map(|(key, value)| (key.as_str(), value))
	}

	/// Iterates over keys in insertion order.
	pub fn keys(&self) -> impl Iterator<Item = &str> {
		self.entries.keys().map(String::as_str)
	}

	/// Number of entries.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Returns true if the group has no entries.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}
