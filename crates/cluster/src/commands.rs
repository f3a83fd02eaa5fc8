//! Invocations of the `postgresql-common` cluster tooling.

use std::path::PathBuf;

use pgcluster_process::Invocation;

use crate::options::ClusterConfig;
use crate::version::MajorVersion;

/// Environment variable telling the tooling where cluster configs live.
pub const CONF_ROOT_ENV: &str = "PG_CLUSTER_CONF_ROOT";

/// Actions accepted by `pg_ctlcluster`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CtlAction {
    /// Start the server.
    Start,

    /// Stop the server.
    Stop,

    /// Reload the server configuration.
    Reload,

    /// Query whether the server runs.
    Status,
}

impl CtlAction {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Reload => "reload",
            Self::Status => "status",
        }
    }

    const fn writes_log(self) -> bool {
        matches!(self, Self::Start | Self::Reload)
    }
}

/// Builds command lines for one cluster.
#[derive(Clone, Debug)]
pub struct ClusterCommands {
    cluster_name: String,
    conf_root: PathBuf,
    data_dir: PathBuf,
    log_file: PathBuf,
    os_user: String,
    port: u16,
    version: MajorVersion,
}

impl ClusterCommands {
    /// Creates the builder for `config` at `version`, owned by `os_user`.
    #[must_use]
    pub fn new(config: &ClusterConfig, version: MajorVersion, os_user: &str) -> Self {
        Self {
            cluster_name: config.options().db_name.clone(),
            conf_root: config.cluster_conf_root().to_path_buf(),
            data_dir: config.data_dir().to_path_buf(),
            log_file: config.paths().log_file(),
            os_user: os_user.to_string(),
            port: config.options().port,
            version,
        }
    }

    fn base(&self, program: &str) -> Invocation {
        Invocation::new(program).env(CONF_ROOT_ENV, &self.conf_root)
    }

    /// `pg_createcluster` for a new cluster with trust authentication.
    #[must_use]
    pub fn create_cluster(&self) -> Invocation {
        self.base("pg_createcluster")
            .arg(format!("--user={}", self.os_user))
            .arg("-l")
            .arg(&self.log_file)
            .arg("-d")
            .arg(&self.data_dir)
            .args(["-s", "/tmp", "--encoding=UTF8"])
            .arg(self.version.as_str())
            .arg(&self.cluster_name)
            .arg("--")
            .arg(format!("--username={}", self.os_user))
            .args(["--auth-host=trust", "--auth-local=trust"])
    }

    /// `pg_ctlcluster` performing `action`.
    #[must_use]
    pub fn ctl(&self, action: CtlAction) -> Invocation {
        let invocation = self
            .base("pg_ctlcluster")
            .arg(self.version.as_str())
            .arg(&self.cluster_name)
            .arg(action.as_str())
            .arg("--")
            .arg("-o")
            .arg(format!("-p {}", self.port))
            .arg("-D")
            .arg(&self.data_dir);

        if action.writes_log() {
            invocation.arg("-l").arg(&self.log_file)
        } else {
            invocation
        }
    }

    /// `pg_dropcluster` for this cluster.
    #[must_use]
    pub fn drop_cluster(&self) -> Invocation {
        self.base("pg_dropcluster")
            .arg(self.version.as_str())
            .arg(&self.cluster_name)
    }

    /// Directory holding this cluster's `postgresql.conf` and `pg_hba.conf`.
    #[must_use]
    pub fn cluster_conf_dir(&self) -> PathBuf {
        self.conf_root
            .join(self.version.as_str())
            .join(&self.cluster_name)
    }
}
