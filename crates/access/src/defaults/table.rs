use indexmap::IndexMap;
use inlist_namelist::{Group, Value};
use serde::{Deserialize, Serialize};

use crate::section::Section;

/// Declared parameters of one section and their default values.
///
/// Built once from a defaults file (or decoded from a cache) and never mutated
/// afterwards. Keys are lowercase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultTable {
	section: Section,
	entries: IndexMap<String, Value>,
}

impl DefaultTable {
	/// Builds a table from the parsed defaults group.
	pub fn from_group(section: Section, group: &Group) -> Self {
		let entries = group
			.iter()
			.map(|(key, value)| (key.to_string(), value.clone()))
			.collect();
		Self { section, entries }
	}

	/// Builds a table from explicit entries. Keys are lowercased.
	pub fn from_entries<K, I>(section: Section, entries: I) -> Self
	where
		K: AsRef<str>,
		I: IntoIterator<Item = (K, Value)>,
	{
		let entries = entries
			.into_iter()
			.map(|(key, value)| (key.as_ref().to_ascii_lowercase(), value))
			.collect();
		Self { section, entries }
	}

	/// Section this table declares.
	pub fn section(&self) -> Section {
		self.section
	}

	/// Default value of `key`.
	pub fn get(&self, key: &str) -> Option<&Value> {
		self.entries.get(key)
	}

	/// Returns true if `key` is declared.
	pub fn contains_key(&self, key: &str) -> bool {
		self.entries.contains_key(key)
	}

	/// Declared keys in file order.
	pub fn keys(&self) -> impl Iterator<Item = &str> {
		self.entries.keys().map(String::as_str)
	}

	/// Number of declared keys.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Returns true if nothing is declared.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Declared length of an array default, `None` for scalars.
	pub fn sequence_len(&self, key: &str) -> Option<usize> {
		self.get(key).and_then(Value::as_sequence).map(<[_]>::len)
	}

	/// Element 0 of an array default (or the scalar default itself).
	pub fn scalar_default(&self, key: &str) -> Option<&Value> {
		match self.get(key)? {
			Value::Sequence(items) => items.first().and_then(Option::as_ref),
			scalar => Some(scalar),
		}
	}
}
