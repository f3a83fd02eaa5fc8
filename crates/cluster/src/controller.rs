use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use pgcluster_process::{CommandRunner, ExitCode, Invocation};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};

use crate::client_auth::ClientAuthWriter;
use crate::commands::{ClusterCommands, CtlAction};
use crate::db_config::DatabaseConfigFile;
use crate::error::Error;
use crate::options::ClusterConfig;
use crate::provision::{Credentials, ProvisionRequest, Provisioner};
use crate::version::MajorVersion;

/// External executables the controller depends on.
pub const REQUIREMENTS: [&str; 5] = [
    "psql",
    "pg_ctlcluster",
    "pg_dropcluster",
    "pg_createcluster",
    "pg_config",
];

/// `pg_ctlcluster start` exits with this code when the server already runs.
const ALREADY_RUNNING_CODE: i32 = 2;

/// Result of starting the cluster.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartOutcome {
    /// The server was started.
    Success,

    /// The server was already running.
    AlreadyRunning,

    /// The server could not be started.
    Failed(ExitCode),
}

impl StartOutcome {
    /// Classifies a `pg_ctlcluster start` exit code.
    #[must_use]
    pub const fn from_exit_code(code: ExitCode) -> Self {
        match code.0 {
            Some(0) => Self::Success,
            Some(ALREADY_RUNNING_CODE) => Self::AlreadyRunning,
            _ => Self::Failed(code),
        }
    }

    /// True unless the start failed.
    #[must_use]
    pub const fn is_success(self) -> bool {
        !matches!(self, Self::Failed(_))
    }
}

impl fmt::Display for StartOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("database started"),
            Self::AlreadyRunning => f.write_str("database already started"),
            Self::Failed(code) => write!(f, "database failed to start ({code})"),
        }
    }
}

/// Whether a cluster exists and runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClusterStatus {
    /// No data directory.
    NotFound(PathBuf),

    /// The server runs.
    Running(PathBuf),

    /// The data directory exists but the server is down.
    NotRunning(PathBuf),
}

impl fmt::Display for ClusterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(dir) => write!(f, "No database found at {}", dir.display()),
            Self::Running(dir) => write!(f, "Database started at {}", dir.display()),
            Self::NotRunning(dir) => write!(f, "Database is not running at {}", dir.display()),
        }
    }
}

/// What `init` did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InitOutcome {
    /// A cluster already existed; it was only started.
    Existing(StartOutcome),

    /// A new cluster was created, provisioned and reloaded.
    Created,
}

/// What `delete` did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// There was no data directory.
    NothingToDelete,

    /// The server was stopped; data was kept.
    Stopped,

    /// The server was stopped and the cluster and its files removed.
    Deleted,
}

/// Options for building a [`ClusterController`].
pub struct ClusterControllerOptions {
    /// Writes `pg_hba.conf`.
    pub client_auth_writer: Arc<dyn ClientAuthWriter>,

    /// Resolved cluster configuration.
    pub config: ClusterConfig,

    /// Cluster owner. Defaults to the current OS user.
    pub os_user: Option<String>,

    /// Creates roles and databases.
    pub provisioner: Arc<dyn Provisioner>,

    /// Runs the cluster tooling.
    pub runner: Arc<dyn CommandRunner>,
}

/// Drives the lifecycle of one local cluster through the `pg_*cluster` tools.
pub struct ClusterController {
    client_auth_writer: Arc<dyn ClientAuthWriter>,
    commands: ClusterCommands,
    config: ClusterConfig,
    os_user: String,
    provisioner: Arc<dyn Provisioner>,
    runner: Arc<dyn CommandRunner>,
    version: MajorVersion,
}

impl ClusterController {
    /// Creates a controller, detecting the installed PostgreSQL major version.
    ///
    /// # Errors
    ///
    /// Returns an error if `pg_config --version` cannot be run or parsed, or
    /// if the current OS user cannot be resolved.
    pub async fn new(
        ClusterControllerOptions {
            client_auth_writer,
            config,
            os_user,
            provisioner,
            runner,
        }: ClusterControllerOptions,
    ) -> Result<Self, Error> {
        let version = MajorVersion::detect(runner.as_ref()).await?;
        let os_user = match os_user {
            Some(user) => user,
            None => current_os_user()?,
        };
        let commands = ClusterCommands::new(&config, version.clone(), &os_user);

        Ok(Self {
            client_auth_writer,
            commands,
            config,
            os_user,
            provisioner,
            runner,
            version,
        })
    }

    /// External executables the controller needs on `PATH`.
    #[must_use]
    pub const fn requirements() -> &'static [&'static str] {
        &REQUIREMENTS
    }

    /// Requirements that cannot be found on `PATH`.
    #[must_use]
    pub fn missing_requirements() -> Vec<&'static str> {
        REQUIREMENTS
            .into_iter()
            .filter(|program| which::which(program).is_err())
            .collect()
    }

    /// The detected PostgreSQL major version.
    #[must_use]
    pub const fn version(&self) -> &MajorVersion {
        &self.version
    }

    /// The resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &ClusterConfig {
        &self.config
    }

    fn data_dir(&self) -> &Path {
        self.config.data_dir()
    }

    fn cluster_exists(&self) -> bool {
        self.data_dir().exists()
    }

    async fn run(&self, invocation: &Invocation) -> Result<ExitCode, Error> {
        let output = self.runner.run(invocation).await?;
        debug!("`{}` finished with {}", invocation, output.status);
        Ok(output.status)
    }

    async fn run_checked(&self, invocation: &Invocation) -> Result<(), Error> {
        let code = self.run(invocation).await?;
        if code.success() {
            Ok(())
        } else {
            Err(Error::CommandFailed {
                command: invocation.to_string(),
                code,
            })
        }
    }

    /// Creates, starts and provisions the cluster; only starts it if the data
    /// directory already exists.
    ///
    /// # Errors
    ///
    /// Returns an error if any step of creating the cluster fails. Starting an
    /// existing cluster reports failure through [`StartOutcome`] instead.
    pub async fn init(&self, admin_password: &str, test_password: &str) -> Result<InitOutcome, Error> {
        if self.cluster_exists() {
            info!(
                "found a database at {}, checking to see if it is started",
                self.data_dir().display()
            );
            return Ok(InitOutcome::Existing(self.start().await?));
        }

        self.config.check_loaded()?;
        self.write_db_config(admin_password, test_password)?;

        info!("creating database at {}", self.data_dir().display());
        tokio::fs::create_dir_all(self.data_dir())
            .await
            .map_err(|e| Error::Io("failed to create data directory", e))?;
        tokio::fs::create_dir_all(self.config.cluster_conf_root())
            .await
            .map_err(|e| Error::Io("failed to create cluster config root", e))?;

        self.run_checked(&self.commands.create_cluster()).await?;
        self.append_port_directive().await?;

        let started = self.start().await?;
        if !started.is_success() {
            return Err(Error::StartFailed(self.data_dir().to_path_buf()));
        }

        self.create_db_users(admin_password, test_password).await?;
        self.write_client_auth_config().await?;

        let reloaded = self.restart().await?;
        if !reloaded.success() {
            warn!("reloading the database configuration failed with {}", reloaded);
        }

        Ok(InitOutcome::Created)
    }

    /// Stops the cluster and, with `delete_existing_data`, drops it and removes
    /// its files.
    ///
    /// # Errors
    ///
    /// Returns an error if a command cannot be run or a file cannot be removed.
    pub async fn delete(&self) -> Result<DeleteOutcome, Error> {
        if !self.cluster_exists() {
            info!("no data at {}, doing nothing", self.data_dir().display());
            return Ok(DeleteOutcome::NothingToDelete);
        }

        let stopped = self.stop().await?;
        if !stopped.success() {
            debug!("stop finished with {}", stopped);
        }

        if !self.config.options().delete_existing_data {
            return Ok(DeleteOutcome::Stopped);
        }

        info!("deleting all data at {}", self.data_dir().display());
        let dropped = self.run(&self.commands.drop_cluster()).await?;
        if !dropped.success() {
            warn!("pg_dropcluster finished with {}", dropped);
        }

        remove_dir_if_exists(self.data_dir()).await?;
        remove_dir_if_exists(self.config.cluster_conf_root()).await?;

        match tokio::fs::remove_file(&self.config.paths().db_config).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(Error::Io("failed to remove database config", e)),
        }

        Ok(DeleteOutcome::Deleted)
    }

    /// Deletes, then initialises the cluster.
    ///
    /// # Errors
    ///
    /// Returns the first error from either phase.
    pub async fn reinit(
        &self,
        admin_password: &str,
        test_password: &str,
    ) -> Result<InitOutcome, Error> {
        self.delete().await?;
        self.init(admin_password, test_password).await
    }

    /// Starts the cluster.
    ///
    /// # Errors
    ///
    /// Returns an error only if `pg_ctlcluster` cannot be run.
    pub async fn start(&self) -> Result<StartOutcome, Error> {
        info!("starting database at {}", self.data_dir().display());

        let code = self.run(&self.commands.ctl(CtlAction::Start)).await?;
        let outcome = StartOutcome::from_exit_code(code);

        match outcome {
            StartOutcome::Success => info!("success"),
            StartOutcome::AlreadyRunning => {
                info!("database already started at {}", self.data_dir().display());
            }
            StartOutcome::Failed(code) => error!("failed to start database: {}", code),
        }

        Ok(outcome)
    }

    /// Stops the cluster, returning the raw exit code.
    ///
    /// # Errors
    ///
    /// Returns an error only if `pg_ctlcluster` cannot be run.
    pub async fn stop(&self) -> Result<ExitCode, Error> {
        info!("stopping database at {}", self.data_dir().display());
        self.run(&self.commands.ctl(CtlAction::Stop)).await
    }

    /// Reloads the cluster configuration, returning the raw exit code.
    ///
    /// # Errors
    ///
    /// Returns an error only if `pg_ctlcluster` cannot be run.
    pub async fn restart(&self) -> Result<ExitCode, Error> {
        info!("reloading database at {}", self.data_dir().display());
        self.run(&self.commands.ctl(CtlAction::Reload)).await
    }

    /// Reports whether the cluster exists and runs.
    ///
    /// # Errors
    ///
    /// Returns an error only if `pg_ctlcluster` cannot be run.
    pub async fn status(&self) -> Result<ClusterStatus, Error> {
        let data_dir = self.data_dir().to_path_buf();

        if !self.cluster_exists() {
            return Ok(ClusterStatus::NotFound(data_dir));
        }

        let code = self.run(&self.commands.ctl(CtlAction::Status)).await?;
        if code.success() {
            Ok(ClusterStatus::Running(data_dir))
        } else {
            Ok(ClusterStatus::NotRunning(data_dir))
        }
    }

    /// Writes `pg_hba.conf` into the cluster's config directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer fails.
    pub async fn write_client_auth_config(&self) -> Result<PathBuf, Error> {
        let path = self.commands.cluster_conf_dir().join("pg_hba.conf");
        self.client_auth_writer
            .write(&path, self.config.options())
            .await?;
        Ok(path)
    }

    fn write_db_config(&self, admin_password: &str, test_password: &str) -> Result<(), Error> {
        let path = &self.config.paths().db_config;
        info!("writing database config to {}", path.display());
        self.config
            .loaded_file()
            .cloned()
            .unwrap_or_else(|| DatabaseConfigFile::from_options(self.config.options()))
            .with_passwords(admin_password, test_password)
            .save(path)
    }

    async fn append_port_directive(&self) -> Result<(), Error> {
        let conf_dir = self.commands.cluster_conf_dir();
        tokio::fs::create_dir_all(&conf_dir)
            .await
            .map_err(|e| Error::Io("failed to create cluster config directory", e))?;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(conf_dir.join("postgresql.conf"))
            .await
            .map_err(|e| Error::Io("failed to open postgresql.conf", e))?;

        file.write_all(format!("port = {}\n", self.config.options().port).as_bytes())
            .await
            .map_err(|e| Error::Io("failed to append to postgresql.conf", e))?;
        file.flush()
            .await
            .map_err(|e| Error::Io("failed to flush postgresql.conf", e))
    }

    async fn create_db_users(&self, admin_password: &str, test_password: &str) -> Result<(), Error> {
        let options = self.config.options();
        let request = ProvisionRequest {
            host: &options.host,
            port: options.port,
            superuser: &self.os_user,
            admin: Credentials {
                user: &options.db_user,
                password: admin_password,
                database: &options.db_name,
            },
            test: Credentials {
                user: &options.test_db_user,
                password: test_password,
                database: &options.test_db_name,
            },
        };

        self.provisioner.provision(&request).await
    }
}

async fn remove_dir_if_exists(path: &Path) -> Result<(), Error> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::Io("failed to remove directory", e)),
    }
}

fn current_os_user() -> Result<String, Error> {
    let uid = nix::unistd::getuid();
    nix::unistd::User::from_uid(uid)
        .map_err(|e| Error::UnknownUser(e.to_string()))?
        .map(|user| user.name)
        .ok_or_else(|| Error::UnknownUser(format!("no passwd entry for uid {uid}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use pgcluster_process_mock::{Journal, MockRunner};
    use tempfile::{TempDir, tempdir};
    use tracing_test::traced_test;

    use crate::client_auth::PgHbaWriter;
    use crate::options::{ClusterOptions, ClusterPaths};

    struct JournalProvisioner(Journal);

    #[async_trait]
    impl Provisioner for JournalProvisioner {
        async fn provision(&self, request: &ProvisionRequest<'_>) -> Result<(), Error> {
            self.0.note(format!(
                "provision {}:{} {}",
                request.admin.user, request.test.user, request.admin.password
            ));
            Ok(())
        }
    }

    fn paths(root: &TempDir) -> ClusterPaths {
        ClusterPaths {
            data_dir: root.path().join("db"),
            local_conf: root.path().join("home"),
            db_config: root.path().join("config").join("database.yml"),
        }
    }

    async fn controller(
        runner: &MockRunner,
        paths: ClusterPaths,
        options: ClusterOptions,
    ) -> ClusterController {
        ClusterController::new(ClusterControllerOptions {
            client_auth_writer: Arc::new(PgHbaWriter),
            config: ClusterConfig::resolve(options, paths),
            os_user: Some("dev".to_string()),
            provisioner: Arc::new(JournalProvisioner(runner.journal())),
            runner: Arc::new(runner.clone()),
        })
        .await
        .unwrap()
    }

    fn runner() -> MockRunner {
        MockRunner::with_pg_config("PostgreSQL 13.2 (Debian 13.2-1)\n")
    }

    #[tokio::test]
    async fn test_new_detects_version() {
        let dir = tempdir().unwrap();
        let runner = runner();

        let controller = controller(&runner, paths(&dir), ClusterOptions::default()).await;

        assert_eq!(controller.version().as_str(), "13");
        assert_eq!(runner.journal().labels(), vec!["pg_config"]);
    }

    #[tokio::test]
    async fn test_new_fails_on_unparseable_version() {
        let dir = tempdir().unwrap();
        let runner = MockRunner::with_pg_config("something else entirely\n");

        let result = ClusterController::new(ClusterControllerOptions {
            client_auth_writer: Arc::new(PgHbaWriter),
            config: ClusterConfig::resolve(ClusterOptions::default(), paths(&dir)),
            os_user: Some("dev".to_string()),
            provisioner: Arc::new(JournalProvisioner(runner.journal())),
            runner: Arc::new(runner.clone()),
        })
        .await;

        assert!(matches!(result, Err(Error::VersionParse(_))));
    }

    #[tokio::test]
    async fn test_init_creates_cluster_in_order() {
        let dir = tempdir().unwrap();
        let paths = paths(&dir);
        let runner = runner();
        let controller = controller(&runner, paths.clone(), ClusterOptions::default()).await;

        let outcome = controller.init("adminpw", "testpw").await.unwrap();

        assert_eq!(outcome, InitOutcome::Created);
        assert_eq!(
            runner.journal().labels(),
            vec![
                "pg_config",
                "pg_createcluster",
                "pg_ctlcluster start",
                "provision app:app_test adminpw",
                "pg_ctlcluster reload",
            ]
        );
        assert!(paths.data_dir.is_dir());

        let conf_dir = paths.cluster_conf_root().join("13").join("app");
        let postgresql_conf = std::fs::read_to_string(conf_dir.join("postgresql.conf")).unwrap();
        assert_eq!(postgresql_conf, "port = 5433\n");
        assert!(conf_dir.join("pg_hba.conf").is_file());

        let recorded = DatabaseConfigFile::load(&paths.db_config).unwrap();
        assert_eq!(recorded.production.port, 5433);
        assert_eq!(recorded.production.password.as_deref(), Some("adminpw"));
        assert_eq!(recorded.test.password.as_deref(), Some("testpw"));
    }

    #[tokio::test]
    async fn test_init_with_existing_data_dir_only_starts() {
        let dir = tempdir().unwrap();
        let paths = paths(&dir);
        std::fs::create_dir_all(&paths.data_dir).unwrap();
        let runner = runner();
        let controller = controller(&runner, paths.clone(), ClusterOptions::default()).await;

        let outcome = controller.init("adminpw", "testpw").await.unwrap();

        assert_eq!(outcome, InitOutcome::Existing(StartOutcome::Success));
        assert_eq!(
            runner.journal().labels(),
            vec!["pg_config", "pg_ctlcluster start"]
        );
        assert!(!paths.db_config.exists());
        assert!(!paths.cluster_conf_root().exists());
    }

    #[tokio::test]
    async fn test_init_keeps_loaded_config_and_uses_its_port() {
        let dir = tempdir().unwrap();
        let paths = paths(&dir);
        let recorded = DatabaseConfigFile::from_options(&ClusterOptions {
            port: 6001,
            ..ClusterOptions::default()
        });
        recorded.save(&paths.db_config).unwrap();
        let runner = runner();
        let controller = controller(&runner, paths.clone(), ClusterOptions::default()).await;

        controller.init("adminpw", "testpw").await.unwrap();

        let start = runner
            .invocations()
            .into_iter()
            .find(|i| i.arguments().iter().any(|a| a == "start"))
            .unwrap();
        assert!(start.arguments().iter().any(|a| a == "-p 6001"));
        assert_eq!(
            DatabaseConfigFile::load(&paths.db_config).unwrap(),
            recorded.with_passwords("adminpw", "testpw")
        );
    }

    #[tokio::test]
    async fn test_init_records_the_passwords_it_provisions() {
        let dir = tempdir().unwrap();
        let paths = paths(&dir);
        DatabaseConfigFile::from_options(&ClusterOptions::default())
            .with_passwords("recorded", "recorded-test")
            .save(&paths.db_config)
            .unwrap();
        let runner = runner();
        let controller = controller(&runner, paths.clone(), ClusterOptions::default()).await;

        controller.init("flag-pw", "recorded-test").await.unwrap();

        assert!(
            runner
                .journal()
                .labels()
                .contains(&"provision app:app_test flag-pw".to_string())
        );
        let recorded = DatabaseConfigFile::load(&paths.db_config).unwrap();
        assert_eq!(recorded.production.password.as_deref(), Some("flag-pw"));
        assert_eq!(recorded.test.password.as_deref(), Some("recorded-test"));
    }

    #[tokio::test]
    async fn test_unreadable_config_only_blocks_cluster_creation() {
        let dir = tempdir().unwrap();
        let paths = paths(&dir);
        std::fs::create_dir_all(paths.db_config.parent().unwrap()).unwrap();
        std::fs::write(&paths.db_config, "not: [valid").unwrap();
        let runner = runner();
        let controller = controller(&runner, paths.clone(), ClusterOptions::default()).await;

        let result = controller.init("adminpw", "testpw").await;
        assert!(matches!(result, Err(Error::ConfigLoad(..))));
        assert!(!paths.data_dir.exists());

        std::fs::create_dir_all(&paths.data_dir).unwrap();
        assert_eq!(
            controller.status().await.unwrap(),
            ClusterStatus::Running(paths.data_dir.clone())
        );
        assert_eq!(controller.delete().await.unwrap(), DeleteOutcome::Stopped);
        assert_eq!(
            runner.journal().labels(),
            vec!["pg_config", "pg_ctlcluster status", "pg_ctlcluster stop"]
        );
    }

    #[tokio::test]
    async fn test_init_stops_when_createcluster_fails() {
        let dir = tempdir().unwrap();
        let runner = runner();
        runner.respond_code("pg_createcluster", None, 1);
        let controller = controller(&runner, paths(&dir), ClusterOptions::default()).await;

        let result = controller.init("adminpw", "testpw").await;

        assert!(matches!(result, Err(Error::CommandFailed { .. })));
        assert_eq!(runner.journal().labels(), vec!["pg_config", "pg_createcluster"]);
    }

    #[tokio::test]
    async fn test_init_stops_when_start_fails() {
        let dir = tempdir().unwrap();
        let runner = runner();
        runner.respond_code("pg_ctlcluster", Some("start"), 1);
        let controller = controller(&runner, paths(&dir), ClusterOptions::default()).await;

        let result = controller.init("adminpw", "testpw").await;

        assert!(matches!(result, Err(Error::StartFailed(_))));
        assert_eq!(
            runner.journal().labels(),
            vec!["pg_config", "pg_createcluster", "pg_ctlcluster start"]
        );
    }

    #[tokio::test]
    async fn test_start_exit_codes() {
        let dir = tempdir().unwrap();

        for (code, expected) in [
            (0, StartOutcome::Success),
            (2, StartOutcome::AlreadyRunning),
            (1, StartOutcome::Failed(ExitCode(Some(1)))),
            (3, StartOutcome::Failed(ExitCode(Some(3)))),
        ] {
            let runner = runner();
            runner.respond_code("pg_ctlcluster", Some("start"), code);
            let controller = controller(&runner, paths(&dir), ClusterOptions::default()).await;

            let outcome = controller.start().await.unwrap();

            assert_eq!(outcome, expected);
            assert_eq!(outcome.is_success(), code == 0 || code == 2);
        }
    }

    #[tokio::test]
    async fn test_stop_and_restart_return_raw_codes() {
        let dir = tempdir().unwrap();
        let runner = runner();
        runner.respond_code("pg_ctlcluster", Some("stop"), 3);
        runner.respond_code("pg_ctlcluster", Some("reload"), 0);
        let controller = controller(&runner, paths(&dir), ClusterOptions::default()).await;

        assert_eq!(controller.stop().await.unwrap(), ExitCode(Some(3)));
        assert_eq!(controller.restart().await.unwrap(), ExitCode::SUCCESS);
    }

    #[tokio::test]
    async fn test_status() {
        let dir = tempdir().unwrap();
        let paths = paths(&dir);
        let runner = runner();
        let controller = controller(&runner, paths.clone(), ClusterOptions::default()).await;

        let missing = controller.status().await.unwrap();
        assert_eq!(missing, ClusterStatus::NotFound(paths.data_dir.clone()));
        assert_eq!(
            missing.to_string(),
            format!("No database found at {}", paths.data_dir.display())
        );
        assert_eq!(runner.count("pg_ctlcluster", None), 0);

        std::fs::create_dir_all(&paths.data_dir).unwrap();
        assert_eq!(
            controller.status().await.unwrap(),
            ClusterStatus::Running(paths.data_dir.clone())
        );

        runner.respond_code("pg_ctlcluster", Some("status"), 3);
        assert_eq!(
            controller.status().await.unwrap(),
            ClusterStatus::NotRunning(paths.data_dir.clone())
        );
    }

    #[tokio::test]
    #[traced_test]
    async fn test_delete_without_data_dir_is_noop() {
        let dir = tempdir().unwrap();
        let runner = runner();
        let controller = controller(&runner, paths(&dir), ClusterOptions::default()).await;

        let outcome = controller.delete().await.unwrap();

        assert_eq!(outcome, DeleteOutcome::NothingToDelete);
        assert_eq!(runner.journal().labels(), vec!["pg_config"]);
        assert!(logs_contain("doing nothing"));
    }

    #[tokio::test]
    async fn test_delete_keeps_data_without_flag() {
        let dir = tempdir().unwrap();
        let paths = paths(&dir);
        std::fs::create_dir_all(&paths.data_dir).unwrap();
        std::fs::create_dir_all(paths.cluster_conf_root()).unwrap();
        DatabaseConfigFile::from_options(&ClusterOptions::default())
            .save(&paths.db_config)
            .unwrap();
        let runner = runner();
        let controller = controller(&runner, paths.clone(), ClusterOptions::default()).await;

        let outcome = controller.delete().await.unwrap();

        assert_eq!(outcome, DeleteOutcome::Stopped);
        assert_eq!(
            runner.journal().labels(),
            vec!["pg_config", "pg_ctlcluster stop"]
        );
        assert!(paths.data_dir.exists());
        assert!(paths.cluster_conf_root().exists());
        assert!(paths.db_config.exists());
    }

    #[tokio::test]
    async fn test_delete_with_flag_removes_everything() {
        let dir = tempdir().unwrap();
        let paths = paths(&dir);
        std::fs::create_dir_all(paths.data_dir.join("base")).unwrap();
        std::fs::create_dir_all(paths.cluster_conf_root().join("13")).unwrap();
        DatabaseConfigFile::from_options(&ClusterOptions::default())
            .save(&paths.db_config)
            .unwrap();
        let runner = runner();
        let options = ClusterOptions {
            delete_existing_data: true,
            ..ClusterOptions::default()
        };
        let controller = controller(&runner, paths.clone(), options).await;

        let outcome = controller.delete().await.unwrap();

        assert_eq!(outcome, DeleteOutcome::Deleted);
        assert_eq!(
            runner.journal().labels(),
            vec!["pg_config", "pg_ctlcluster stop", "pg_dropcluster"]
        );
        assert!(!paths.data_dir.exists());
        assert!(!paths.cluster_conf_root().exists());
        assert!(!paths.db_config.exists());
    }

    #[tokio::test]
    async fn test_reinit_deletes_before_init() {
        let dir = tempdir().unwrap();
        let paths = paths(&dir);
        std::fs::create_dir_all(&paths.data_dir).unwrap();
        let runner = runner();
        let options = ClusterOptions {
            delete_existing_data: true,
            ..ClusterOptions::default()
        };
        let controller = controller(&runner, paths.clone(), options).await;

        let outcome = controller.reinit("adminpw", "testpw").await.unwrap();

        assert_eq!(outcome, InitOutcome::Created);
        assert_eq!(
            runner.journal().labels(),
            vec![
                "pg_config",
                "pg_ctlcluster stop",
                "pg_dropcluster",
                "pg_createcluster",
                "pg_ctlcluster start",
                "provision app:app_test adminpw",
                "pg_ctlcluster reload",
            ]
        );
        assert!(paths.data_dir.is_dir());
        assert!(paths.db_config.is_file());
    }

    #[tokio::test]
    async fn test_reinit_without_flag_only_restarts_existing_cluster() {
        let dir = tempdir().unwrap();
        let paths = paths(&dir);
        std::fs::create_dir_all(&paths.data_dir).unwrap();
        let runner = runner();
        let controller = controller(&runner, paths, ClusterOptions::default()).await;

        let outcome = controller.reinit("adminpw", "testpw").await.unwrap();

        assert_eq!(outcome, InitOutcome::Existing(StartOutcome::Success));
        assert_eq!(
            runner.journal().labels(),
            vec!["pg_config", "pg_ctlcluster stop", "pg_ctlcluster start"]
        );
    }

    #[tokio::test]
    async fn test_write_client_auth_config_path() {
        let dir = tempdir().unwrap();
        let paths = paths(&dir);
        let runner = runner();
        let controller = controller(&runner, paths.clone(), ClusterOptions::default()).await;

        let path = controller.write_client_auth_config().await.unwrap();

        assert_eq!(
            path,
            paths.cluster_conf_root().join("13").join("app").join("pg_hba.conf")
        );
        assert!(path.is_file());
    }

    #[test]
    fn test_requirements() {
        assert_eq!(
            ClusterController::requirements(),
            ["psql", "pg_ctlcluster", "pg_dropcluster", "pg_createcluster", "pg_config"]
        );
        assert!(ClusterController::missing_requirements().len() <= REQUIREMENTS.len());
    }

    #[test]
    fn test_start_outcome_messages() {
        assert_eq!(StartOutcome::Success.to_string(), "database started");
        assert_eq!(
            StartOutcome::Failed(ExitCode(Some(1))).to_string(),
            "database failed to start (exit code 1)"
        );
    }
}
