//! Non-fatal notices raised while editing an inlist.

use inlist_namelist::ValueType;

/// Non-fatal condition encountered by an [`Inlist`](crate::Inlist).
///
/// Notices are collected on the accessor and, unless warnings are suppressed,
/// logged as they happen. They never stop an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
	/// A real was stored where an integer is declared, or the reverse.
	Coercion {
		/// The key as given by the caller.
		key: String,
		/// Type of the declared default.
		expected: ValueType,
		/// Type of the stored value.
		got: ValueType,
	},
	/// Vector expansion was requested again on an already expanded inlist.
	VectorsAlreadyExpanded,
}

impl std::fmt::Display for Notice {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Notice::Coercion { key, expected, got } => {
				write!(f, "'{key}' expects {expected}, storing the given {got} as is")
			}
			Notice::VectorsAlreadyExpanded => f.write_str("vectors are already expanded"),
		}
	}
}
