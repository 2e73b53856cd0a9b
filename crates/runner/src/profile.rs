//! Header block of profile output files.
//!
//! A profile starts with three header lines: column numbers, header names and
//! header values. The data table follows after a blank line and is not read
//! here.
//!
//! ```text
//!            1              2                  3
//!   model_number      num_zones           star_age
//!           1000           1234  4.567000000000E+09
//! ```

use std::path::Path;

use inlist_namelist::Value;

use crate::error::{Result, RunError};

/// Named values from a profile header.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileHeader {
	entries: Vec<(String, Value)>,
}

impl ProfileHeader {
	/// Reads the header of the profile at `path`.
	///
	/// # Errors
	///
	/// Fails if the file cannot be read or the header is malformed.
	pub fn read(path: &Path) -> Result<Self> {
		let text = std::fs::read_to_string(path).map_err(|e| RunError::io(path, e))?;
		Self::parse(&text).map_err(|message| RunError::ProfileHeader {
			path: path.to_path_buf(),
			message,
		})
	}

	/// Parses header lines 2 and 3 of profile text.
	pub fn parse(text: &str) -> std::result::Result<Self, String> {
		let mut lines = text.lines().skip(1);
		let (Some(names), Some(values)) = (lines.next(), lines.next()) else {
			return Err("expected at least three header lines".to_string());
		};
		let names = split_fields(names);
		let values = split_fields(values);
		if names.is_empty() {
			return Err("no header names".to_string());
		}
		if names.len() != values.len() {
			return Err(format!("{} header names but {} values", names.len(), values.len()));
		}
		let entries = names
			.into_iter()
			.zip(values)
			.map(|(name, value)| (name.to_ascii_lowercase(), parse_field(&value)))
			.collect();
		Ok(Self { entries })
	}

	/// Value of the header entry `name` (case-insensitive).
	pub fn get(&self, name: &str) -> Option<&Value> {
		self.entries
			.iter()
			.find(|(n, _)| n.eq_ignore_ascii_case(name))
			.map(|(_, v)| v)
	}

	/// Numeric value of the header entry `name`.
	pub fn get_f64(&self, name: &str) -> Option<f64> {
		self.get(name).and_then(Value::as_float)
	}

	/// Header names in file order.
	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.entries.iter().map(|(n, _)| n.as_str())
	}

	/// Age of the star when the profile was written, in years.
	pub fn star_age(&self) -> Option<f64> {
		self.get_f64("star_age")
	}
}

/// Splits on whitespace, keeping double-quoted fields whole.
fn split_fields(line: &str) -> Vec<String> {
	let mut fields = Vec::new();
	let mut current = String::new();
	let mut quoted = false;
	for ch in line.chars() {
		match ch {
			'"' => {
				quoted = !quoted;
				current.push(ch);
			}
			c if c.is_whitespace() && !quoted => {
				if !current.is_empty() {
					fields.push(std::mem::take(&mut current));
				}
			}
			c => current.push(c),
		}
	}
	if !current.is_empty() {
		fields.push(current);
	}
	fields
}

fn parse_field(field: &str) -> Value {
	if let Ok(v) = field.parse::<i64>() {
		return Value::Int(v);
	}
	if let Ok(v) = field.replace(['d', 'D'], "e").parse::<f64>() {
		return Value::Float(v);
	}
	Value::String(field.trim_matches('"').to_string())
}
