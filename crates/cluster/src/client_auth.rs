use std::fmt::Write as _;
use std::path::Path;

use async_trait::async_trait;
use tracing::info;

use crate::error::Error;
use crate::options::ClusterOptions;

/// Writes the client authentication config (`pg_hba.conf`) of a cluster.
#[async_trait]
pub trait ClientAuthWriter
where
    Self: Send + Sync + 'static,
{
    /// Writes the config for `options` to `path`.
    async fn write(&self, path: &Path, options: &ClusterOptions) -> Result<(), Error>;
}

/// Default writer: password auth over loopback for the application roles,
/// trust for local sockets.
#[derive(Clone, Debug, Default)]
pub struct PgHbaWriter;

/// Quotes a `pg_hba.conf` token. The file format has no escape for `"`.
fn hba_token(name: &str) -> Result<String, Error> {
    if name.contains('"') {
        return Err(Error::InvalidHbaName(name.to_string()));
    }
    Ok(format!("\"{name}\""))
}

impl PgHbaWriter {
    /// Renders the file contents for `options`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHbaName`] if a database or role name contains `"`.
    pub fn render(options: &ClusterOptions) -> Result<String, Error> {
        let mut contents =
            "# TYPE  DATABASE        USER            ADDRESS                 METHOD\n".to_string();

        let entries = [
            (options.db_name.as_str(), options.db_user.as_str()),
            (options.test_db_name.as_str(), options.test_db_user.as_str()),
            ("postgres", options.db_user.as_str()),
            ("postgres", options.test_db_user.as_str()),
        ];

        for address in ["127.0.0.1/32", "::1/128"] {
            for (database, user) in entries {
                let _ = writeln!(
                    contents,
                    "host    {:<15} {:<15} {:<23} md5",
                    hba_token(database)?,
                    hba_token(user)?,
                    address
                );
            }
            let _ = writeln!(
                contents,
                "host    {:<15} {:<15} {:<23} trust",
                "template1", "all", address
            );
        }

        contents.push_str("local   all             all                                     trust\n");
        Ok(contents)
    }
}

#[async_trait]
impl ClientAuthWriter for PgHbaWriter {
    async fn write(&self, path: &Path, options: &ClusterOptions) -> Result<(), Error> {
        let contents = Self::render(options)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Io("failed to create cluster config directory", e))?;
        }

        tokio::fs::write(path, contents)
            .await
            .map_err(|e| Error::Io("failed to write pg_hba.conf", e))?;

        info!("wrote client authentication config to {}", path.display());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::tempdir;

    #[test]
    fn test_render_grants_each_role_its_database() {
        let contents = PgHbaWriter::render(&ClusterOptions::default()).unwrap();

        assert!(contents.starts_with("# TYPE"));
        assert!(contents.contains("host    \"app\"           \"app\"           127.0.0.1/32            md5"));
        assert!(contents.contains("host    \"app_test\"      \"app_test\"      ::1/128                 md5"));
        assert!(contents.contains("host    \"postgres\"      \"app\"           127.0.0.1/32            md5"));
        assert!(contents.ends_with("local   all             all                                     trust\n"));
    }

    #[test]
    fn test_render_quotes_names_verbatim() {
        let options = ClusterOptions {
            db_user: "odd name".to_string(),
            ..ClusterOptions::default()
        };

        let contents = PgHbaWriter::render(&options).unwrap();

        assert!(contents.contains("\"odd name\"      127.0.0.1/32"));
    }

    #[tokio::test]
    async fn test_write_rejects_double_quotes_in_names() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pg_hba.conf");
        let options = ClusterOptions {
            db_user: "odd\"name".to_string(),
            ..ClusterOptions::default()
        };

        let result = PgHbaWriter.write(&path, &options).await;

        assert!(matches!(result, Err(Error::InvalidHbaName(name)) if name == "odd\"name"));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_write_creates_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("13").join("app").join("pg_hba.conf");

        PgHbaWriter.write(&path, &ClusterOptions::default()).await.unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, PgHbaWriter::render(&ClusterOptions::default()).unwrap());
    }
}
