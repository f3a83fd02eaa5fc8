//! Manages a local PostgreSQL cluster through the `postgresql-common` tooling.
//!
//! The [`ClusterController`] creates a cluster with `pg_createcluster`, drives
//! it with `pg_ctlcluster`, drops it with `pg_dropcluster`, provisions the
//! application roles and databases over a client connection, and writes the
//! small config files applications and the server need.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_pub_crate)]

mod client_auth;
mod commands;
mod controller;
mod db_config;
mod error;
mod options;
mod provision;
mod version;

pub use client_auth::{ClientAuthWriter, PgHbaWriter};
pub use commands::{CONF_ROOT_ENV, ClusterCommands, CtlAction};
pub use controller::{
    ClusterController, ClusterControllerOptions, ClusterStatus, DeleteOutcome, InitOutcome,
    REQUIREMENTS, StartOutcome,
};
pub use db_config::{DatabaseConfigFile, DatabaseProfile};
pub use error::Error;
pub use options::{ClusterConfig, ClusterOptions, ClusterPaths};
pub use provision::{
    Credentials, ProvisionRequest, Provisioner, SqlxProvisioner, database_statements,
    quote_identifier, quote_literal, role_statements,
};
pub use version::MajorVersion;
