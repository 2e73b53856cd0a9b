//! Initial composition from metallicity.
//!
//! Hydrogen and helium fractions are scaled so that their ratio matches the
//! protosolar mixture while `X + Y + Z = 1`.

/// Protosolar helium mass fraction.
pub const PROTOSOLAR_Y: f64 = 0.275;
/// Protosolar hydrogen mass fraction.
pub const PROTOSOLAR_X: f64 = 0.705;

/// Hydrogen mass fraction `X` for heavy-element fraction `z`.
pub fn hydrogen_fraction(z: f64) -> f64 {
	let eta = PROTOSOLAR_Y / PROTOSOLAR_X;
	(1.0 - z) / (1.0 + eta)
}

/// Helium mass fraction `Y` for heavy-element fraction `z`.
pub fn helium_fraction(z: f64) -> f64 {
	1.0 - z - hydrogen_fraction(z)
}
