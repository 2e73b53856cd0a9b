//! The configuration accessor.
//!
//! An [`Inlist`] owns a parsed inlist, the defaults tables of every available
//! section, and the key to section index built from those tables. All reads
//! and edits are validated against the defaults; nothing reaches disk until
//! [`Inlist::persist`].
//!
//! # Keys
//!
//! Keys are case-insensitive. A key is first looked up as given, then
//! lowercased, then split as a vector key `base(index)`. A key declared by more
//! than one section belongs to the first of `controls`, `pgstar`, `star_job`,
//! `eos`, `kap`.
//!
//! # Vectors
//!
//! The reader collapses `x_ctrl(1) = ...`, `x_ctrl(2) = ...` into one sequence
//! stored under `x_ctrl`. The *present-index window* of each base (the range
//! of indices the source file actually assigns) is computed once on load and
//! decides whether an indexed [`set`](Inlist::set) merges into that sequence or
//! becomes a standalone `base(index)` entry. [`fix_vectors`](Inlist::fix_vectors)
//! unfolds every collapsed sequence into standalone entries.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use inlist_namelist::{
	Compatibility, FromValue, Group, IndexWindow, MAX_INDEX, Namelist, Value, ValueType, check_vector,
	scan_windows, vector_key,
};
use rustc_hash::FxHashMap as HashMap;
use tracing::{debug, info, warn};

use crate::defaults::{DefaultTable, DefaultsCache, DefaultsLoader};
use crate::error::{AccessError, Result};
use crate::notice::Notice;
use crate::options::AccessOptions;
use crate::section::Section;


/// A key resolved against the defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Resolved {
	section: Section,
	/// Declared key (the base for vector keys).
	base: String,
	/// 1-based index for vector keys.
	index: Option<usize>,
}

impl Resolved {
	/// Key as stored for a standalone entry.
	fn entry_key(&self) -> String {
		match self.index {
			Some(index) => vector_key(&self.base, index),
			None => self.base.clone(),
		}
	}
}

/// A loaded inlist validated against its section defaults.
#[derive(Debug)]
pub struct Inlist {
	source: PathBuf,
	output: PathBuf,
	namelist: Namelist,
	defaults: Vec<DefaultTable>,
	index: HashMap<String, Section>,
	windows: BTreeMap<String, IndexWindow>,
	expanded: bool,
	suppress_warnings: bool,
	notices: Vec<Notice>,
}

impl Inlist {
	/// Opens `source`, loading defaults through a loader that caches next to
	/// the defaults files.
	///
	/// # Errors
	///
	/// Fails if defaults cannot be resolved or loaded, if the source cannot be
	/// read or parsed, or if it assigns a key no section declares.
	pub fn open(source: impl AsRef<Path>, options: AccessOptions) -> Result<Self> {
		let mut loader = DefaultsLoader::new(options.origin.clone(), options.legacy).reload(options.reload_defaults);
		Self::open_with(source, options, &mut loader)
	}

	/// Opens `source` using an existing defaults loader.
	///
	/// The loader's own legacy and reload settings decide which tables it
	/// produces; `options.legacy` still decides which sections are requested.
	///
	/// # Errors
	///
	/// As [`Inlist::open`].
	pub fn open_with<C: DefaultsCache>(
		source: impl AsRef<Path>,
		options: AccessOptions,
		loader: &mut DefaultsLoader<C>,
	) -> Result<Self> {
		let source = source.as_ref().to_path_buf();
		let text = std::fs::read_to_string(&source).map_err(|e| AccessError::io(&source, e))?;
		let namelist = inlist_namelist::parse(&text).map_err(|error| AccessError::Parse {
			path: source.clone(),
			error,
		})?;

		let mut defaults = Vec::new();
		for section in Section::available(options.legacy) {
			defaults.push(loader.load(section)?);
		}

		let mut index = HashMap::default();
		for table in &defaults {
			for key in table.keys() {
				index.entry(key.to_string()).or_insert(table.section());
			}
		}

		let output = options.output.unwrap_or_else(|| source.clone());
		let mut inlist = Self {
			source,
			output,
			namelist,
			defaults,
			index,
			windows: scan_windows(&text),
			expanded: false,
			suppress_warnings: options.suppress_warnings,
			notices: Vec::new(),
		};
		inlist.validate_source(options.legacy)?;
		debug!(
			source = %inlist.source.display(),
			groups = inlist.namelist.len(),
			vectors = inlist.windows.len(),
			"loaded inlist"
		);

		if options.expand_vectors {
			inlist.fix_vectors();
		}
		Ok(inlist)
	}

	/// Rejects groups outside the available sections and undeclared keys.
	fn validate_source(&self, legacy: bool) -> Result<()> {
		for (name, group) in self.namelist.groups() {
			let known = Section::available(legacy).any(|s| s.group_name() == name);
			if !known {
				return Err(AccessError::InvalidSection(name.to_string()));
			}
			for key in group.keys() {
				let base = check_vector(key).base;
				if !self.index.contains_key(base) {
					return Err(self.unknown_key(key));
				}
			}
		}
		Ok(())
	}

	/// Path the inlist was read from.
	pub fn source(&self) -> &Path {
		&self.source
	}

	/// Path [`persist`](Self::persist) writes to.
	pub fn output(&self) -> &Path {
		&self.output
	}

	/// The loaded namelist.
	pub fn namelist(&self) -> &Namelist {
		&self.namelist
	}

	/// Defaults table of `section`, if it was loaded.
	pub fn defaults(&self, section: Section) -> Option<&DefaultTable> {
		self.defaults.iter().find(|t| t.section() == section)
	}

	/// Sections whose defaults were loaded, in precedence order.
	pub fn sections(&self) -> impl Iterator<Item = Section> + '_ {
		self.defaults.iter().map(DefaultTable::section)
	}

	/// Present-index window of a vector base in the source file.
	pub fn window(&self, base: &str) -> Option<IndexWindow> {
		self.windows.get(&base.to_ascii_lowercase()).copied()
	}

	/// Returns true once [`fix_vectors`](Self::fix_vectors) has run.
	pub fn is_expanded(&self) -> bool {
		self.expanded
	}

	/// Notices raised so far, oldest first.
	pub fn notices(&self) -> &[Notice] {
		&self.notices
	}

	/// Drains the collected notices.
	pub fn take_notices(&mut self) -> Vec<Notice> {
		std::mem::take(&mut self.notices)
	}

	/// Section owning `key`.
	///
	/// # Errors
	///
	/// [`AccessError::UnknownKey`] if no section declares the key.
	pub fn section_of(&self, key: &str) -> Result<Section> {
		self.resolve(key).map(|r| r.section)
	}

	/// Current value of `key`.
	///
	/// For a vector key the standalone `base(index)` entry wins; otherwise the
	/// element at `index` of the collapsed sequence is returned when `index`
	/// lies in the base's window.
	///
	/// # Errors
	///
	/// [`AccessError::UnknownKey`] for undeclared keys,
	/// [`AccessError::NotAVector`] when indexing a scalar parameter and
	/// [`AccessError::ValueNotSet`] when the inlist does not assign the key.
	pub fn get(&self, key: &str) -> Result<&Value> {
		let resolved = self.resolve(key)?;
		let not_set = || AccessError::ValueNotSet { key: key.to_string() };
		let group = self.namelist.group(resolved.section.group_name()).ok_or_else(not_set)?;

		let Some(index) = resolved.index else {
			return group.get(&resolved.base).ok_or_else(not_set);
		};
		if let Some(value) = group.get(&resolved.entry_key()) {
			return Ok(value);
		}
		self.collapsed_element(group, &resolved.base, index).ok_or_else(not_set)
	}

	/// Current value of `key` converted to `T`.
	///
	/// Integers are accepted where a real is requested.
	///
	/// # Errors
	///
	/// As [`get`](Self::get), plus [`AccessError::TypeMismatch`] if the stored
	/// value is not a `T`.
	pub fn get_as<T: FromValue>(&self, key: &str) -> Result<T> {
		let value = self.get(key)?;
		T::from_value(value).ok_or_else(|| AccessError::TypeMismatch {
			key: key.to_string(),
			expected: T::value_type(),
			got: value.value_type(),
		})
	}

	/// Current value of `key`, or `fallback` when the inlist does not set it.
	///
	/// # Errors
	///
	/// Every error of [`get`](Self::get) except [`AccessError::ValueNotSet`].
	pub fn get_or(&self, key: &str, fallback: impl Into<Value>) -> Result<Value> {
		match self.get(key) {
			Ok(value) => Ok(value.clone()),
			Err(AccessError::ValueNotSet { .. }) => Ok(fallback.into()),
			Err(e) => Err(e),
		}
	}

	/// Validates `value` against the default of `key` and stores it.
	///
	/// An integer given for a real parameter (or the reverse) is stored as
	/// given and raises a [`Notice::Coercion`].
	///
	/// An indexed key whose base is held as a collapsed sequence is merged into
	/// that sequence when the index lies inside the base's window; absent or
	/// falsy elements of the sequence are then backfilled with the scalar
	/// default. Outside the window the value becomes a standalone
	/// `base(index)` entry.
	///
	/// # Errors
	///
	/// [`AccessError::UnknownKey`], [`AccessError::NotAVector`],
	/// [`AccessError::IndexOutOfRange`] or [`AccessError::TypeMismatch`].
	pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<()> {
		let value = value.into();
		let resolved = self.resolve(key)?;
		let default = self.declared(&resolved)?.clone();
		self.check_type(key, &resolved, &default, &value)?;

		let group_name = resolved.section.group_name();
		let indexed = resolved.entry_key();
		let window = self.window(&resolved.base);
		let group = self.namelist.group_or_insert(group_name);

		if let Some(index) = resolved.index {
			if !group.contains_key(&indexed)
				&& merge_into_sequence(group, &resolved.base, index, window, &value, &default)
			{
				debug!(key = %indexed, section = %resolved.section, "merged into collapsed vector");
				return Ok(());
			}
		}

		debug!(key = %indexed, section = %resolved.section, "set");
		group.insert(indexed, value);
		Ok(())
	}

	/// Removes `key` from the inlist.
	///
	/// A plain vector base removes its collapsed sequence and every standalone
	/// `base(index)` entry. An indexed key removes the standalone entry if
	/// there is one, otherwise it clears that element of the collapsed
	/// sequence.
	///
	/// # Errors
	///
	/// [`AccessError::UnknownKey`] for undeclared keys and
	/// [`AccessError::KeyNotPresent`] when the inlist does not contain the key.
	pub fn remove(&mut self, key: &str) -> Result<()> {
		let resolved = self.resolve(key)?;
		let not_present = || AccessError::KeyNotPresent { key: key.to_string() };
		let group = self
			.namelist
			.group_mut(resolved.section.group_name())
			.ok_or_else(not_present)?;

		let removed = match resolved.index {
			Some(index) => {
				group.remove(&resolved.entry_key()).is_some() || clear_element(group, &resolved.base, index)
			}
			None => {
				let prefix = format!("{}(", resolved.base);
				let indexed: Vec<String> = group
					.keys()
					.filter(|k| k.starts_with(&prefix) && check_vector(k).base == resolved.base)
					.map(str::to_string)
					.collect();
				let mut removed = group.remove(&resolved.base).is_some();
				for key in indexed {
					removed |= group.remove(&key).is_some();
				}
				removed
			}
		};

		if !removed {
			return Err(not_present());
		}
		debug!(key, section = %resolved.section, "removed");
		Ok(())
	}

	/// Unfolds every collapsed vector into standalone `base(index)` entries.
	///
	/// Applies to the bases that appear in vector-key form in the source file.
	/// Absent elements produce no entry. Running it a second time changes
	/// nothing and raises [`Notice::VectorsAlreadyExpanded`].
	pub fn fix_vectors(&mut self) {
		if self.expanded {
			self.notice(Notice::VectorsAlreadyExpanded);
			return;
		}

		let mut expanded = 0usize;
		for base in self.windows.keys() {
			let Some(section) = self.index.get(base.as_str()) else {
				continue;
			};
			let Some(group) = self.namelist.group_mut(section.group_name()) else {
				continue;
			};
			if !matches!(group.get(base), Some(Value::Sequence(_))) {
				continue;
			}
			let start = group.start_index(base);
			let Some(Value::Sequence(items)) = group.remove(base) else {
				continue;
			};
			for (pos, item) in items.into_iter().enumerate() {
				if let Some(item) = item {
					group.insert(vector_key(base, start + pos), item);
				}
			}
			expanded += 1;
		}

		self.expanded = true;
		debug!(vectors = expanded, "expanded vectors");
	}

	/// Renders the inlist as namelist text.
	pub fn to_namelist_string(&self) -> String {
		self.namelist.to_string()
	}

	/// Writes the inlist to its output path.
	///
	/// # Errors
	///
	/// Returns [`AccessError::Io`] if the file cannot be written.
	pub fn persist(&self) -> Result<()> {
		std::fs::write(&self.output, self.to_namelist_string()).map_err(|e| AccessError::io(&self.output, e))?;
		info!(path = %self.output.display(), "wrote inlist");
		Ok(())
	}

	/// Maps a key to its owning section and declared base.
	fn resolve(&self, key: &str) -> Result<Resolved> {
		let trimmed = key.trim();
		if let Some(&section) = self.index.get(trimmed) {
			return Ok(Resolved {
				section,
				base: trimmed.to_string(),
				index: None,
			});
		}

		let lower = trimmed.to_ascii_lowercase();
		if let Some(&section) = self.index.get(&lower) {
			return Ok(Resolved {
				section,
				base: lower,
				index: None,
			});
		}

		let split = check_vector(&lower);
		if let Some(index) = split.index {
			let compact: String = lower.chars().filter(|c| !c.is_whitespace()).collect();
			if compact == vector_key(split.base, index) {
				if let Some(&section) = self.index.get(split.base) {
					if index > MAX_INDEX {
						return Err(AccessError::IndexOutOfRange {
							key: compact,
							max: MAX_INDEX,
						});
					}
					let resolved = Resolved {
						section,
						base: split.base.to_string(),
						index: Some(index),
					};
					self.declared(&resolved)?;
					return Ok(resolved);
				}
			}
		}

		Err(self.unknown_key(key))
	}

	/// Declared default of a resolved key.
	fn declared(&self, resolved: &Resolved) -> Result<&Value> {
		let default = self
			.defaults(resolved.section)
			.and_then(|t| t.get(&resolved.base))
			.ok_or_else(|| self.unknown_key(&resolved.base))?;
		if let (Some(index), false) = (resolved.index, matches!(default, Value::Sequence(_))) {
			return Err(AccessError::NotAVector {
				key: vector_key(&resolved.base, index),
			});
		}
		Ok(default)
	}

	fn unknown_key(&self, key: &str) -> AccessError {
		let key = key.trim().to_ascii_lowercase();
		let suggestion = self
			.defaults
			.iter()
			.flat_map(DefaultTable::keys)
			.min_by_key(|k| strsim::levenshtein(&key, k))
			.filter(|k| strsim::levenshtein(&key, k) <= 3)
			.map(str::to_string);
		AccessError::UnknownKey { key, suggestion }
	}

	/// Checks `value` against the declared default of `resolved`.
	fn check_type(&mut self, key: &str, resolved: &Resolved, default: &Value, value: &Value) -> Result<()> {
		let expected = match (resolved.index, default) {
			(Some(_), Value::Sequence(_)) => default.element_type(),
			_ => Some(default.value_type()),
		};
		let Some(expected) = expected else {
			return Ok(());
		};

		if expected == ValueType::Sequence {
			let Value::Sequence(items) = value else {
				return Err(AccessError::TypeMismatch {
					key: key.to_string(),
					expected,
					got: value.value_type(),
				});
			};
			let Some(element) = default.element_type() else {
				return Ok(());
			};
			for item in items.iter().flatten() {
				self.check_scalar(key, element, item.value_type())?;
			}
			return Ok(());
		}
		self.check_scalar(key, expected, value.value_type())
	}

	fn check_scalar(&mut self, key: &str, expected: ValueType, got: ValueType) -> Result<()> {
		match expected.compatibility(got) {
			Compatibility::Exact => Ok(()),
			Compatibility::Coerced => {
				self.notice(Notice::Coercion {
					key: key.to_string(),
					expected,
					got,
				});
				Ok(())
			}
			Compatibility::Incompatible => Err(AccessError::TypeMismatch {
				key: key.to_string(),
				expected,
				got,
			}),
		}
	}

	/// Element `index` of the collapsed sequence under `base`, inside its window.
	fn collapsed_element<'a>(&self, group: &'a Group, base: &str, index: usize) -> Option<&'a Value> {
		let Value::Sequence(items) = group.get(base)? else {
			return None;
		};
		let start = group.start_index(base);
		let window = self
			.window(base)
			.unwrap_or_else(|| sequence_window(start, items.len()));
		if !window.contains(index) || index < start {
			return None;
		}
		items.get(index - start)?.as_ref()
	}

	fn notice(&mut self, notice: Notice) {
		if !self.suppress_warnings {
			match &notice {
				Notice::Coercion { .. } => warn!("{notice}"),
				Notice::VectorsAlreadyExpanded => info!("{notice}"),
			}
		}
		self.notices.push(notice);
	}
}

/// Window spanned by a sequence that has no indexed assignments in the source.
fn sequence_window(start: usize, len: usize) -> IndexWindow {
	IndexWindow {
		min: start,
		max: start + len.saturating_sub(1),
	}
}

/// Writes `value` at `index` of the collapsed sequence under `base`.
///
/// Returns false, leaving the group untouched, when `base` holds no sequence
/// or `index` lies outside the window.
fn merge_into_sequence(
	group: &mut Group,
	base: &str,
	index: usize,
	window: Option<IndexWindow>,
	value: &Value,
	default: &Value,
) -> bool {
	let start = group.start_index(base);
	let Some(Value::Sequence(items)) = group.get_mut(base) else {
		return false;
	};
	let window = window.unwrap_or_else(|| sequence_window(start, items.len()));
	if !window.contains(index) || index < start {
		return false;
	}

	let pos = index - start;
	if items.len() <= pos {
		items.resize(pos + 1, None);
	}
	items[pos] = Some(value.clone());

	let fill = default.first_element().cloned();
	for (i, item) in items.iter_mut().enumerate() {
		if i == pos {
			continue;
		}
		if item.as_ref().is_none_or(Value::is_falsy) {
			item.clone_from(&fill);
		}
	}
	true
}

/// Clears element `index` of the collapsed sequence under `base`, dropping
/// the sequence once nothing is left. Returns false if nothing was there.
fn clear_element(group: &mut Group, base: &str, index: usize) -> bool {
	let start = group.start_index(base);
	let Some(Value::Sequence(items)) = group.get_mut(base) else {
		return false;
	};
	let Some(slot) = index.checked_sub(start).and_then(|pos| items.get_mut(pos)) else {
		return false;
	};
	if slot.take().is_none() {
		return false;
	}
	if items.iter().all(Option::is_none) {
		group.remove(base);
	}
	true
}
