//! The five parameter sections of an inlist.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AccessError;

/// One of the fixed namelist groups an inlist may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Section {
	/// Run control (`&star_job`): model loading/saving, pgstar switch, pauses.
	StarJob,
	/// Output and evolution control (`&controls`).
	Controls,
	/// Plotting control (`&pgstar`).
	Pgstar,
	/// Equation of state (`&eos`). Absent in legacy releases.
	Eos,
	/// Opacity (`&kap`). Absent in legacy releases.
	Kap,
}

impl Section {
	/// Every section, in key-resolution precedence order.
	pub const ALL: [Section; 5] = [
		Section::Controls,
		Section::Pgstar,
		Section::StarJob,
		Section::Eos,
		Section::Kap,
	];

	/// Sections available in legacy mode or the current release.
	pub fn available(legacy: bool) -> impl Iterator<Item = Section> {
		Self::ALL.into_iter().filter(move |s| !legacy || !s.is_modern_only())
	}

	/// Namelist group name.
	pub fn group_name(self) -> &'static str {
		match self {
			Section::StarJob => "star_job",
			Section::Controls => "controls",
			Section::Pgstar => "pgstar",
			Section::Eos => "eos",
			Section::Kap => "kap",
		}
	}

	/// File name of the defaults declaration for this section.
	pub fn defaults_file(self) -> &'static str {
		match self {
			Section::StarJob => "star_job.defaults",
			Section::Controls => "controls.defaults",
			Section::Pgstar => "pgstar.defaults",
			Section::Eos => "eos.defaults",
			Section::Kap => "kap.defaults",
		}
	}

	/// Subdirectory of the installation that holds this section's defaults.
	pub fn install_subdir(self) -> &'static str {
		match self {
			Section::StarJob | Section::Controls | Section::Pgstar => "star/defaults",
			Section::Eos => "eos/defaults",
			Section::Kap => "kap/defaults",
		}
	}

	/// Returns true for sections introduced after the legacy releases.
	pub fn is_modern_only(self) -> bool {
		matches!(self, Section::Eos | Section::Kap)
	}
}

impl core::fmt::Display for Section {
	fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
		f.write_str(self.group_name())
	}
}

impl FromStr for Section {
	type Err = AccessError;

	fn from_str(name: &str) -> Result<Self, Self::Err> {
		Section::ALL
			.into_iter()
			.find(|s| s.group_name().eq_ignore_ascii_case(name.trim()))
			.ok_or_else(|| AccessError::InvalidSection(name.to_string()))
	}
}
