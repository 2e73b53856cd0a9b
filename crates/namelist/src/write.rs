//! Namelist writer.

use core::fmt::{self, Display, Write};

use crate::{Group, Namelist, Value};


const INDENT: &str = "    ";

/// Formats a real in exponential notation with three digits after the point
/// and a signed, at least two-digit exponent (`1.000e+00`).
pub fn format_real(value: f64) -> String {
	if value.is_nan() {
		return "nan".to_string();
	}
	if value.is_infinite() {
		return if value > 0.0 { "inf" } else { "-inf" }.to_string();
	}
	let formatted = format!("{value:.3e}");
	let Some((mantissa, exponent)) = formatted.split_once('e') else {
		return formatted;
	};
	let exponent: i32 = exponent.parse().unwrap_or(0);
	let sign = if exponent < 0 { '-' } else { '+' };
	format!("{mantissa}e{sign}{:02}", exponent.unsigned_abs())
}

fn write_scalar(out: &mut impl Write, value: &Value) -> fmt::Result {
	match value {
		Value::Bool(true) => out.write_str(".true."),
		Value::Bool(false) => out.write_str(".false."),
		Value::Int(v) => write!(out, "{v}"),
		Value::Float(v) => out.write_str(&format_real(*v)),
		Value::String(v) => write!(out, "'{}'", v.replace('\'', "''")),
		Value::Sequence(items) => {
			for (pos, item) in items.iter().enumerate() {
				if pos > 0 {
					out.write_str(", ")?;
				}
				if let Some(item) = item {
					write_scalar(out, item)?;
				}
			}
			Ok(())
		}
	}
}

fn write_group(out: &mut impl Write, name: &str, group: &Group) -> fmt::Result {
	writeln!(out, "&{name}")?;
	for (key, value) in group.iter() {
		match value {
			Value::Sequence(items) => {
				let start = group.start_index(key);
				for (pos, item) in items.iter().enumerate() {
					let Some(item) = item else {
						continue;
					};
					write!(out, "{INDENT}{key}({}) = ", start + pos)?;
					write_scalar(out, item)?;
					out.write_char('\n')?;
				}
			}
			scalar => {
				write!(out, "{INDENT}{key} = ")?;
				write_scalar(out, scalar)?;
				out.write_char('\n')?;
			}
		}
	}
	out.write_str("/\n")
}

/// Formats a value the way it appears on the right-hand side of an
/// assignment. Sequences render as a comma-separated list with absent
/// elements left empty.
impl Display for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write_scalar(f, self)
	}
}

impl Display for Namelist {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for (pos, (name, group)) in self.groups().enumerate() {
			if pos > 0 {
				f.write_char('\n')?;
			}
			write_group(f, name, group)?;
		}
		Ok(())
	}
}
