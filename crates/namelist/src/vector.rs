//! Vector-key grammar.
//!
//! Fortran array parameters appear in namelists as `name(index) = value`. A
//! key of that shape is a *vector key*; `name` is its base and `index` is
//! 1-based. The grammar is:
//!
//! ```text
//! vector-key = identifier ws* "(" ws* digits ws* ")"
//! identifier = (letter | "_") (letter | digit | "_")*
//! ```
//!
//! [`check_vector`] searches for the first match anywhere in its input, so it
//! can be applied to a whole source line as well as to an isolated key.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;


static VECTOR_KEY: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"([A-Za-z_][A-Za-z0-9_]*)\s*\(\s*([0-9]+)\s*\)").expect("vector-key pattern is valid")
});

/// Result of classifying a key (or a line) against the vector-key grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorKey<'a> {
	/// The identifier before the parenthesis, or the whole input when it is not
	/// a vector key.
	pub base: &'a str,
	/// The parsed index, present only for vector keys.
	pub index: Option<usize>,
}

impl VectorKey<'_> {
	/// Returns true if the input matched the vector-key grammar.
	pub fn is_vector(&self) -> bool {
		self.index.is_some()
	}
}

/// Classifies `text` against the vector-key grammar.
///
/// Pure: the same input always yields the same result and nothing is touched
/// besides the input slice. Indices too large for `usize` are treated as a
/// non-match.
pub fn check_vector(text: &str) -> VectorKey<'_> {
	let matched = VECTOR_KEY.captures(text).and_then(|caps| {
		let base = caps.get(1)?.as_str();
		let index = caps.get(2)?.as_str().parse::<usize>().ok()?;
		Some(VectorKey {
			base,
			index: Some(index),
		})
	});
	matched.unwrap_or(VectorKey {
		base: text,
		index: None,
	})
}

/// Builds the fully-indexed key `base(index)`.
pub fn vector_key(base: &str, index: usize) -> String {
	format!("{base}({index})")
}

/// Contiguous range of indices a vector base actually uses in a source file.
///
/// This is deliberately *not* the declared length of the default array: a
/// source that only sets `arr(1)..arr(3)` has the window `1..=3` even when the
/// default declares ten elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexWindow {
	/// Lowest index present.
	pub min: usize,
	/// Highest index present.
	pub max: usize,
}

impl IndexWindow {
	/// Creates a window covering a single index.
	pub fn single(index: usize) -> Self {
		Self {
			min: index,
			max: index,
		}
	}

	/// Widens the window so that it covers `index`.
	pub fn include(&mut self, index: usize) {
		self.min = self.min.min(index);
		self.max = self.max.max(index);
	}

	/// Returns true if `index` lies inside the window.
	pub fn contains(&self, index: usize) -> bool {
		(self.min..=self.max).contains(&index)
	}

	/// Position of `index` within a collapsed sequence that starts at `min`.
	pub fn position(&self, index: usize) -> Option<usize> {
		self.contains(index).then(|| index - self.min)
	}

	/// Index corresponding to position `pos` of a collapsed sequence.
	pub fn index_at(&self, pos: usize) -> usize {
		self.min + pos
	}

	/// Number of indices in the window.
	pub fn len(&self) -> usize {
		self.max - self.min + 1
	}

	/// Always false; a window covers at least one index.
	pub fn is_empty(&self) -> bool {
		false
	}
}

/// Scans namelist source text for vector assignments and returns the present
/// index window of every base, keyed by lowercased base name.
///
/// Comment lines, blank lines and group delimiters are skipped, and only the
/// left-hand side of an assignment is classified, so a string value that looks
/// like `name(3)` is not mistaken for a key.
pub fn scan_windows(source: &str) -> BTreeMap<String, IndexWindow> {
	let mut windows: BTreeMap<String, IndexWindow> = BTreeMap::new();
	for line in source.lines() {
		let line = line.trim();
		if line.is_empty() || line.starts_with('!') || line.starts_with('&') || line.starts_with('$') {
			continue;
		}
		let Some((lhs, _)) = line.split_once('=') else {
			continue;
		};
		let key = check_vector(lhs);
		let Some(index) = key.index else {
			continue;
		};
		windows
			.entry(key.base.to_lowercase())
			.and_modify(|w| w.include(index))
			.or_insert_with(|| IndexWindow::single(index));
	}
	windows
}
