//! The YAML file recording how applications reach the cluster.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::options::ClusterOptions;

const ADAPTER: &str = "postgresql";
const POOL: u32 = 256;
const TIMEOUT_SECS: u32 = 5;

/// Connection settings for one database.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub struct DatabaseProfile {
    /// Always `postgresql`.
    pub adapter: String,

    /// Database name.
    pub database: String,

    /// Role used to connect.
    pub username: String,

    /// Password of `username`, when recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Host the cluster listens on.
    pub host: String,

    /// Port the cluster listens on.
    pub port: u16,

    /// Connection pool size hint for clients.
    pub pool: u32,

    /// Connect timeout hint for clients, in seconds.
    pub timeout: u32,
}

impl DatabaseProfile {
    fn new(database: &str, username: &str, options: &ClusterOptions) -> Self {
        Self {
            adapter: ADAPTER.to_string(),
            database: database.to_string(),
            username: username.to_string(),
            password: None,
            host: options.host.clone(),
            port: options.port,
            pool: POOL,
            timeout: TIMEOUT_SECS,
        }
    }
}

/// Database config file with a `production` and a `test` profile.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub struct DatabaseConfigFile {
    /// Application database.
    pub production: DatabaseProfile,

    /// Test database.
    pub test: DatabaseProfile,
}

impl DatabaseConfigFile {
    /// Describes the databases `options` will create.
    #[must_use]
    pub fn from_options(options: &ClusterOptions) -> Self {
        Self {
            production: DatabaseProfile::new(&options.db_name, &options.db_user, options),
            test: DatabaseProfile::new(&options.test_db_name, &options.test_db_user, options),
        }
    }

    /// Records the passwords of both roles.
    #[must_use]
    pub fn with_passwords(mut self, admin_password: &str, test_password: &str) -> Self {
        self.production.password = Some(admin_password.to_string());
        self.test.password = Some(test_password.to_string());
        self
    }

    /// Overrides names, host and port in `options` with the recorded values.
    #[must_use]
    pub fn apply_to(&self, options: ClusterOptions) -> ClusterOptions {
        ClusterOptions {
            db_name: self.production.database.clone(),
            test_db_name: self.test.database.clone(),
            db_user: self.production.username.clone(),
            test_db_user: self.test.username.clone(),
            host: self.production.host.clone(),
            port: self.production.port,
            ..options
        }
    }

    /// Reads the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigLoad`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigLoad(path.to_path_buf(), e.to_string()))?;

        serde_yaml::from_str(&contents)
            .map_err(|e| Error::ConfigLoad(path.to_path_buf(), e.to_string()))
    }

    /// Writes the file to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or any filesystem operation fails.
    pub fn save(&self, path: &Path) -> Result<(), Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Io("failed to create database config directory", e))?;
        }

        let contents = serde_yaml::to_string(self)?;
        std::fs::write(path, contents).map_err(|e| Error::Io("failed to write database config", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::tempdir;

    #[test]
    fn test_profiles_follow_options() {
        let options = ClusterOptions {
            db_name: "shop".to_string(),
            test_db_name: "shop_test".to_string(),
            db_user: "shop_rw".to_string(),
            test_db_user: "shop_test_rw".to_string(),
            port: 6543,
            ..ClusterOptions::default()
        };

        let file = DatabaseConfigFile::from_options(&options);

        assert_eq!(file.production.database, "shop");
        assert_eq!(file.production.username, "shop_rw");
        assert_eq!(file.test.database, "shop_test");
        assert_eq!(file.test.username, "shop_test_rw");
        assert_eq!(file.test.port, 6543);
        assert_eq!(file.production.adapter, "postgresql");
    }

    #[test]
    fn test_passwords_are_optional() {
        let without = serde_yaml::to_string(&DatabaseConfigFile::from_options(
            &ClusterOptions::default(),
        ))
        .unwrap();
        let with = DatabaseConfigFile::from_options(&ClusterOptions::default())
            .with_passwords("adminpw", "testpw");

        assert!(!without.contains("password"));
        assert_eq!(with.production.password.as_deref(), Some("adminpw"));
        assert_eq!(with.test.password.as_deref(), Some("testpw"));
    }

    #[test]
    fn test_apply_keeps_delete_flag() {
        let recorded = DatabaseConfigFile::from_options(&ClusterOptions {
            port: 7000,
            ..ClusterOptions::default()
        });
        let options = ClusterOptions {
            delete_existing_data: true,
            port: 5433,
            ..ClusterOptions::default()
        };

        let applied = recorded.apply_to(options);

        assert_eq!(applied.port, 7000);
        assert!(applied.delete_existing_data);
    }

    #[test]
    fn test_save_creates_parent_and_loads_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config").join("database.yml");
        let file = DatabaseConfigFile::from_options(&ClusterOptions::default());

        file.save(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("production:"));
        assert!(contents.contains("port: 5433"));
        assert_eq!(DatabaseConfigFile::load(&path).unwrap(), file);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();

        let result = DatabaseConfigFile::load(&dir.path().join("absent.yml"));

        assert!(matches!(result, Err(Error::ConfigLoad(..))));
    }
}
