use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::db_config::DatabaseConfigFile;
use crate::error::Error;

/// Names, address and flags for the managed cluster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterOptions {
    /// Name of the application database. Also used as the cluster name.
    pub db_name: String,

    /// Name of the test database.
    pub test_db_name: String,

    /// Application role.
    pub db_user: String,

    /// Test role.
    pub test_db_user: String,

    /// Host the cluster listens on.
    pub host: String,

    /// Port the cluster listens on.
    pub port: u16,

    /// Whether `delete` drops the cluster and removes its files, and whether an
    /// existing database config file is overwritten instead of loaded.
    pub delete_existing_data: bool,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            db_name: "app".to_string(),
            test_db_name: "app_test".to_string(),
            db_user: "app".to_string(),
            test_db_user: "app_test".to_string(),
            host: "127.0.0.1".to_string(),
            port: 5433,
            delete_existing_data: false,
        }
    }
}

/// Filesystem locations used by the cluster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterPaths {
    /// Cluster data directory (`-D`). Its existence means the cluster was created.
    pub data_dir: PathBuf,

    /// Local configuration root. Cluster configs live under `.local/etc/postgresql`.
    pub local_conf: PathBuf,

    /// Database config file recording the chosen names and ports.
    pub db_config: PathBuf,
}

impl ClusterPaths {
    /// The directory passed to the tooling as `PG_CLUSTER_CONF_ROOT`.
    #[must_use]
    pub fn cluster_conf_root(&self) -> PathBuf {
        self.local_conf.join(".local").join("etc").join("postgresql")
    }

    /// Server log file inside the data directory.
    #[must_use]
    pub fn log_file(&self) -> PathBuf {
        self.data_dir.join("log")
    }
}

/// Resolved, immutable configuration for one controller.
#[derive(Clone, Debug)]
pub struct ClusterConfig {
    cluster_conf_root: PathBuf,
    load_error: Option<String>,
    loaded_file: Option<DatabaseConfigFile>,
    options: ClusterOptions,
    paths: ClusterPaths,
}

impl ClusterConfig {
    /// Builds the configuration from caller options, or from the database
    /// config file when it exists and `delete_existing_data` is unset.
    ///
    /// A file that cannot be loaded leaves the caller options in place; the
    /// failure is kept and reported by [`ClusterConfig::check_loaded`].
    #[must_use]
    pub fn resolve(options: ClusterOptions, paths: ClusterPaths) -> Self {
        let mut load_error = None;
        let mut loaded_file = None;
        let mut options = options;

        if paths.db_config.exists() && !options.delete_existing_data {
            info!("loading database config from {}", paths.db_config.display());
            match DatabaseConfigFile::load(&paths.db_config) {
                Ok(file) => {
                    options = file.apply_to(options);
                    loaded_file = Some(file);
                }
                Err(e) => {
                    warn!("{}", e);
                    load_error = Some(e.to_string());
                }
            }
        }

        Self {
            cluster_conf_root: paths.cluster_conf_root(),
            load_error,
            loaded_file,
            options,
            paths,
        }
    }

    /// Fails if the database config file existed but could not be loaded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigLoad`] carrying the original failure.
    pub fn check_loaded(&self) -> Result<(), Error> {
        match &self.load_error {
            Some(reason) => Err(Error::ConfigLoad(
                self.paths.db_config.clone(),
                reason.clone(),
            )),
            None => Ok(()),
        }
    }

    /// The effective options.
    #[must_use]
    pub const fn options(&self) -> &ClusterOptions {
        &self.options
    }

    /// The filesystem locations.
    #[must_use]
    pub const fn paths(&self) -> &ClusterPaths {
        &self.paths
    }

    /// The data directory.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.paths.data_dir
    }

    /// The cluster config root handed to the tooling.
    #[must_use]
    pub fn cluster_conf_root(&self) -> &Path {
        &self.cluster_conf_root
    }

    /// Whether the options came from an existing database config file.
    #[must_use]
    pub const fn loaded_from_file(&self) -> bool {
        self.loaded_file.is_some()
    }

    /// The database config file the options were loaded from, if any.
    #[must_use]
    pub const fn loaded_file(&self) -> Option<&DatabaseConfigFile> {
        self.loaded_file.as_ref()
    }
}
