//! Execution of external programs described as argument lists.
//!
//! Commands are modelled as [`Invocation`] values and executed through the
//! [`CommandRunner`] trait, so callers can swap the host implementation
//! ([`SystemRunner`]) for a scripted one in tests.
//!
//! # Example
//!
//! ```rust,no_run
//! use pgcluster_process::{CommandRunner, Invocation, Result, SystemRunner};
//!
//! async fn version() -> Result<String> {
//!     let output = SystemRunner::new()
//!         .run(&Invocation::new("pg_config").arg("--version"))
//!         .await?;
//!
//!     Ok(output.stdout)
//! }
//! ```
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_pub_crate)]

mod error;
mod invocation;
mod runner;

pub use error::{Error, Result};
pub use invocation::{ExitCode, Invocation, Output};
pub use runner::{CommandRunner, SystemRunner};
