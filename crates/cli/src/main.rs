//! CLI binary to manage a local PostgreSQL cluster.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_pub_crate)]

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use console::style;
use pgcluster::{
    ClusterConfig, ClusterController, ClusterControllerOptions, ClusterOptions, ClusterPaths,
    ClusterStatus, DeleteOutcome, InitOutcome, PgHbaWriter, SqlxProvisioner, StartOutcome,
};
use pgcluster_process::{ExitCode, SystemRunner};
use rand::Rng;
use rand::distributions::Alphanumeric;
use tracing::info;

const GENERATED_PASSWORD_LEN: usize = 24;

/// CLI-specific error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Cluster library error
    #[error(transparent)]
    Cluster(#[from] pgcluster::Error),

    /// A `pg_ctlcluster` action exited unsuccessfully
    #[error("{0} failed with {1}")]
    Ctl(&'static str, ExitCode),

    /// Required executables are not installed
    #[error("missing required executables: {0}")]
    MissingRequirements(String),

    /// The database did not start
    #[error("database failed to start ({0})")]
    StartFailed(ExitCode),
}

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Admin role password (generated or taken from the database config if unset)
    #[arg(long, env = "PGCLUSTER_ADMIN_PASSWORD", global = true)]
    admin_password: Option<String>,

    /// Cluster data directory
    #[arg(
        long,
        default_value = "/tmp/pgcluster/db",
        env = "PGCLUSTER_DATA_DIR",
        global = true
    )]
    data_dir: PathBuf,

    /// Database config file recording names, ports and credentials
    #[arg(
        long,
        default_value = "/tmp/pgcluster/database.yml",
        env = "PGCLUSTER_DB_CONFIG",
        global = true
    )]
    db_config: PathBuf,

    /// Application database name (also the cluster name)
    #[arg(long, default_value = "app", env = "PGCLUSTER_DB_NAME", global = true)]
    db_name: String,

    /// Application role
    #[arg(long, default_value = "app", env = "PGCLUSTER_DB_USER", global = true)]
    db_user: String,

    /// Drop the cluster and its files on delete, and overwrite the database config
    #[arg(long, env = "PGCLUSTER_DELETE_EXISTING_DATA", global = true)]
    delete_existing_data: bool,

    /// Host the cluster listens on
    #[arg(long, default_value = "127.0.0.1", env = "PGCLUSTER_HOST", global = true)]
    host: String,

    /// Local configuration root; cluster configs go under .local/etc/postgresql
    #[arg(
        long,
        default_value = "/tmp/pgcluster",
        env = "PGCLUSTER_LOCAL_CONF",
        global = true
    )]
    local_conf: PathBuf,

    /// Port the cluster listens on
    #[arg(long, default_value_t = 5433, env = "PGCLUSTER_PORT", global = true)]
    port: u16,

    /// Test database name
    #[arg(
        long,
        default_value = "app_test",
        env = "PGCLUSTER_TEST_DB_NAME",
        global = true
    )]
    test_db_name: String,

    /// Test role
    #[arg(
        long,
        default_value = "app_test",
        env = "PGCLUSTER_TEST_DB_USER",
        global = true
    )]
    test_db_user: String,

    /// Test role password (generated or taken from the database config if unset)
    #[arg(long, env = "PGCLUSTER_TEST_PASSWORD", global = true)]
    test_password: Option<String>,
}

#[derive(Clone, Copy, Debug, Subcommand)]
enum Command {
    /// Create, start and provision the cluster (or start an existing one)
    Init,

    /// Start the cluster
    Start,

    /// Stop the cluster
    Stop,

    /// Reload the cluster configuration
    Restart,

    /// Report whether the cluster exists and runs
    Status,

    /// Stop the cluster, dropping it with --delete-existing-data
    Delete,

    /// Delete, then init
    Reinit,

    /// Check that the required executables are installed
    Requirements,
}

struct Passwords {
    admin: String,
    test: String,
}

fn generate_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

fn resolve_passwords(args: &Args, config: &ClusterConfig) -> Passwords {
    let recorded = config.loaded_file();

    let admin = args
        .admin_password
        .clone()
        .or_else(|| recorded.and_then(|file| file.production.password.clone()))
        .unwrap_or_else(generate_password);
    let test = args
        .test_password
        .clone()
        .or_else(|| recorded.and_then(|file| file.test.password.clone()))
        .unwrap_or_else(generate_password);

    Passwords { admin, test }
}

fn cluster_config(args: &Args) -> ClusterConfig {
    let options = ClusterOptions {
        db_name: args.db_name.clone(),
        test_db_name: args.test_db_name.clone(),
        db_user: args.db_user.clone(),
        test_db_user: args.test_db_user.clone(),
        host: args.host.clone(),
        port: args.port,
        delete_existing_data: args.delete_existing_data,
    };
    let paths = ClusterPaths {
        data_dir: args.data_dir.clone(),
        local_conf: args.local_conf.clone(),
        db_config: args.db_config.clone(),
    };

    ClusterConfig::resolve(options, paths)
}

fn check_requirements() -> Result<(), Error> {
    let missing = ClusterController::missing_requirements();

    for program in ClusterController::requirements() {
        if missing.contains(program) {
            println!("{} {}", style("missing").red().bold(), program);
        } else {
            println!("{} {}", style("found").green().bold(), program);
        }
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::MissingRequirements(missing.join(", ")))
    }
}

fn report_start(outcome: StartOutcome) -> Result<(), Error> {
    match outcome {
        StartOutcome::Success => {
            println!("{}", style(outcome).green().bold());
            Ok(())
        }
        StartOutcome::AlreadyRunning => {
            println!("{}", style(outcome).yellow());
            Ok(())
        }
        StartOutcome::Failed(code) => {
            println!("{}", style(outcome).red().bold());
            Err(Error::StartFailed(code))
        }
    }
}

fn report_init(outcome: InitOutcome, config: &ClusterConfig) -> Result<(), Error> {
    match outcome {
        InitOutcome::Existing(start) => report_start(start),
        InitOutcome::Created => {
            println!(
                "{} database created at {}, credentials written to {}",
                style("success").green().bold(),
                config.data_dir().display(),
                style(config.paths().db_config.display()).cyan()
            );
            Ok(())
        }
    }
}

fn report_ctl(action: &'static str, code: ExitCode) -> Result<(), Error> {
    if code.success() {
        println!("{} {}", style(action).green().bold(), style("ok").green());
        Ok(())
    } else {
        println!("{} {}", style(action).red().bold(), code);
        Err(Error::Ctl(action, code))
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize tracing for better logging
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    if matches!(args.command, Command::Requirements) {
        return check_requirements();
    }

    let config = cluster_config(&args);
    let passwords = resolve_passwords(&args, &config);

    let controller = ClusterController::new(ClusterControllerOptions {
        client_auth_writer: Arc::new(PgHbaWriter),
        config: config.clone(),
        os_user: None,
        provisioner: Arc::new(SqlxProvisioner),
        runner: Arc::new(SystemRunner::new()),
    })
    .await?;

    info!(
        "managing PostgreSQL {} cluster {}",
        controller.version(),
        config.options().db_name
    );

    match args.command {
        Command::Init => {
            let outcome = controller.init(&passwords.admin, &passwords.test).await?;
            report_init(outcome, &config)
        }
        Command::Reinit => {
            let outcome = controller.reinit(&passwords.admin, &passwords.test).await?;
            report_init(outcome, &config)
        }
        Command::Start => report_start(controller.start().await?),
        Command::Stop => report_ctl("stop", controller.stop().await?),
        Command::Restart => report_ctl("reload", controller.restart().await?),
        Command::Status => {
            let status = controller.status().await?;
            match status {
                ClusterStatus::Running(_) => println!("{}", style(&status).green()),
                ClusterStatus::NotRunning(_) => println!("{}", style(&status).yellow()),
                ClusterStatus::NotFound(_) => println!("{}", style(&status).red()),
            }
            Ok(())
        }
        Command::Delete => {
            match controller.delete().await? {
                DeleteOutcome::NothingToDelete => println!(
                    "No data at {}, doing nothing",
                    config.data_dir().display()
                ),
                DeleteOutcome::Stopped => println!(
                    "Database at {} stopped; data kept (pass --delete-existing-data to remove it)",
                    config.data_dir().display()
                ),
                DeleteOutcome::Deleted => println!(
                    "{} all data at {}",
                    style("deleted").red().bold(),
                    config.data_dir().display()
                ),
            }
            Ok(())
        }
        Command::Requirements => check_requirements(),
    }
}
