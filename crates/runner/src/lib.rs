//! Run orchestration for stellar-evolution inlists.
//!
//! Drives the simulation executable in a run directory: prepares the working
//! inlist through [`inlist_access`], launches `./star`, judges convergence from
//! the output files and manages logs and restart photos.
//!
//! - [`run`]: the [`Runner`] and its outcomes
//! - [`logs`]: latest-profile lookup and output cleanup
//! - [`profile`]: profile header reader
//! - [`composition`]: protosolar hydrogen and helium fractions
//! - [`cli`]: the `inlist` command line

pub mod cli;
pub mod composition;
mod error;
pub mod logs;
pub mod profile;
pub mod run;

#[cfg(test)]
mod test_support;

pub use error::{Result, RunError};
pub use run::{Failure, RunOutcome, Runner, RunnerOptions};
