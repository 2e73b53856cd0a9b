//! Defaults-validated access to stellar-evolution inlists.
//!
//! An inlist is a Fortran namelist with up to five groups (`star_job`,
//! `controls`, `pgstar`, `eos`, `kap`). Every parameter a group may hold is
//! declared, with its default value, in a per-section defaults file shipped
//! with the simulation code. This crate:
//!
//! - loads those declarations into [`DefaultTable`]s ([`defaults`]), caching
//!   them through a pluggable [`DefaultsCache`];
//! - opens an inlist as an [`Inlist`], which resolves keys to sections, checks
//!   values against the declared types and folds or unfolds vector keys;
//! - writes the result back with [`Inlist::persist`].
//!
//! ```no_run
//! use inlist_access::{AccessOptions, Inlist};
//!
//! let mut inlist = Inlist::open("inlist_project", AccessOptions::default())?;
//! inlist.set("initial_mass", 2.0)?;
//! inlist.set("x_ctrl(2)", 0.5)?;
//! inlist.persist()?;
//! # Ok::<(), inlist_access::AccessError>(())
//! ```

pub mod defaults;
mod error;
mod inlist;
mod notice;
mod options;
mod section;

pub use defaults::{
	CacheKey, DefaultTable, DefaultsCache, DefaultsLoader, DefaultsOrigin, FileCache, MemoryCache, VersionTag,
};
pub use error::{AccessError, Result};
pub use inlist::Inlist;
pub use inlist_namelist::{FromValue, Value, ValueType};
pub use notice::Notice;
pub use options::AccessOptions;
pub use section::Section;
