use serde::{Deserialize, Serialize};

/// The value of a namelist entry.
///
/// Sequences hold scalar elements only. An element is `None` when the index it
/// stands for was never assigned, which happens when a source file sets
/// `arr(1)` and `arr(3)` but not `arr(2)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
	/// Fortran logical.
	Bool(bool),
	/// Fortran integer.
	Int(i64),
	/// Fortran real (single or double precision).
	Float(f64),
	/// Fortran character string.
	String(String),
	/// Array parameter, element 0 at the entry's start index.
	Sequence(Vec<Option<Value>>),
}

impl Value {
	/// Returns the boolean value if this is a `Bool` variant.
	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Value::Bool(v) => Some(*v),
			_ => None,
		}
	}

	/// Returns the integer value if this is an `Int` variant.
	pub fn as_int(&self) -> Option<i64> {
		match self {
			Value::Int(v) => Some(*v),
			_ => None,
		}
	}

	/// Returns the value as a float, widening integers.
	pub fn as_float(&self) -> Option<f64> {
		match self {
			Value::Float(v) => Some(*v),
			Value::Int(v) => Some(*v as f64),
			_ => None,
		}
	}

	/// Returns the string value if this is a `String` variant.
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Value::String(v) => Some(v),
			_ => None,
		}
	}

	/// Returns the elements if this is a `Sequence` variant.
	pub fn as_sequence(&self) -> Option<&[Option<Value>]> {
		match self {
			Value::Sequence(v) => Some(v),
			_ => None,
		}
	}

	/// Returns the tag of this value.
	pub fn value_type(&self) -> ValueType {
		match self {
			Value::Bool(_) => ValueType::Bool,
			Value::Int(_) => ValueType::Int,
			Value::Float(_) => ValueType::Float,
			Value::String(_) => ValueType::String,
			Value::Sequence(_) => ValueType::Sequence,
		}
	}

	/// Returns the scalar type carried by this value.
	///
	/// For a sequence this is the type of its first present element, or `None`
	/// when every element is absent.
	pub fn element_type(&self) -> Option<ValueType> {
		match self {
			Value::Sequence(items) => items.iter().flatten().map(Value::value_type).next(),
			other => Some(other.value_type()),
		}
	}

	/// Returns the first present element of a sequence, or the value itself for
	/// a scalar.
	pub fn first_element(&self) -> Option<&Value> {
		match self {
			Value::Sequence(items) => items.iter().flatten().next(),
			other => Some(other),
		}
	}

	/// Reports whether the value counts as "empty" when backfilling a vector.
	///
	/// False, zero, the empty string and the empty sequence are falsy.
	pub fn is_falsy(&self) -> bool {
		match self {
			Value::Bool(v) => !v,
			Value::Int(v) => *v == 0,
			Value::Float(v) => *v == 0.0,
			Value::String(v) => v.is_empty(),
			Value::Sequence(v) => v.is_empty(),
		}
	}
}

impl From<bool> for Value {
	fn from(v: bool) -> Self {
		Value::Bool(v)
	}
}

impl From<i64> for Value {
	fn from(v: i64) -> Self {
		Value::Int(v)
	}
}

impl From<i32> for Value {
	fn from(v: i32) -> Self {
		Value::Int(i64::from(v))
	}
}

impl From<f64> for Value {
	fn from(v: f64) -> Self {
		Value::Float(v)
	}
}

impl From<String> for Value {
	fn from(v: String) -> Self {
		Value::String(v)
	}
}

impl From<&str> for Value {
	fn from(v: &str) -> Self {
		Value::String(v.to_string())
	}
}

impl<T: Into<Value>> From<Vec<T>> for Value {
	fn from(v: Vec<T>) -> Self {
		Value::Sequence(v.into_iter().map(|item| Some(item.into())).collect())
	}
}

/// The tag of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
	/// Logical.
	Bool,
	/// Integer.
	Int,
	/// Real.
	Float,
	/// Character string.
	String,
	/// Array of scalars.
	Sequence,
}

/// Outcome of checking a given value type against an expected one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compatibility {
	/// Same tag.
	Exact,
	/// Integer where a real is expected, or the reverse. Accepted with a notice.
	Coerced,
	/// Anything else.
	Incompatible,
}

impl ValueType {
	/// Returns a human-readable name for the type.
	pub fn name(self) -> &'static str {
		match self {
			ValueType::Bool => "bool",
			ValueType::Int => "int",
			ValueType::Float => "float",
			ValueType::String => "string",
			ValueType::Sequence => "sequence",
		}
	}

	/// Checks whether a value of type `given` may be stored where `self` is expected.
	pub fn compatibility(self, given: ValueType) -> Compatibility {
		match (self, given) {
			(expected, given) if expected == given => Compatibility::Exact,
			(ValueType::Float, ValueType::Int) | (ValueType::Int, ValueType::Float) => {
				Compatibility::Coerced
			}
			_ => Compatibility::Incompatible,
		}
	}
}

impl core::fmt::Display for ValueType {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.write_str(self.name())
	}
}

// Seal the FromValue trait to prevent external implementations.
mod sealed {
	pub trait Sealed {}
	impl Sealed for i64 {}
	impl Sealed for f64 {}
	impl Sealed for bool {}
	impl Sealed for String {}
}

/// Trait for scalar types that can be extracted from a [`Value`].
pub trait FromValue: sealed::Sealed + Sized {
	/// Extracts the value, returning `None` if the type doesn't match.
	fn from_value(value: &Value) -> Option<Self>;

	/// Returns the `ValueType` corresponding to this Rust type.
	fn value_type() -> ValueType;
}

impl FromValue for i64 {
	fn from_value(value: &Value) -> Option<Self> {
		value.as_int()
	}

	fn value_type() -> ValueType {
		ValueType::Int
	}
}

impl FromValue for f64 {
	fn from_value(value: &Value) -> Option<Self> {
		value.as_float()
	}

	fn value_type() -> ValueType {
		ValueType::Float
	}
}

impl FromValue for bool {
	fn from_value(value: &Value) -> Option<Self> {
		value.as_bool()
	}

	fn value_type() -> ValueType {
		ValueType::Bool
	}
}

impl FromValue for String {
	fn from_value(value: &Value) -> Option<Self> {
		value.as_str().map(|s| s.to_string())
	}

	fn value_type() -> ValueType {
		ValueType::String
	}
}
