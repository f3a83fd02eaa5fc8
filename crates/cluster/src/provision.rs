//! Creation of the application roles and databases.

use async_trait::async_trait;
use sqlx::postgres::PgConnectOptions;
use sqlx::{Connection, Executor, PgConnection};
use tracing::{debug, info};

use crate::error::Error;

/// A role, its password and the database it owns.
#[derive(Clone, Copy, Debug)]
pub struct Credentials<'a> {
    /// Role name.
    pub user: &'a str,

    /// Role password.
    pub password: &'a str,

    /// Database created by this role.
    pub database: &'a str,
}

/// Everything needed to provision a freshly created cluster.
#[derive(Clone, Copy, Debug)]
pub struct ProvisionRequest<'a> {
    /// Host the cluster listens on.
    pub host: &'a str,

    /// Port the cluster listens on.
    pub port: u16,

    /// Cluster superuser, reachable without a password.
    pub superuser: &'a str,

    /// Application role and database.
    pub admin: Credentials<'a>,

    /// Test role and database.
    pub test: Credentials<'a>,
}

/// Creates roles and databases in a running cluster.
#[async_trait]
pub trait Provisioner
where
    Self: Send + Sync + 'static,
{
    /// Creates both roles, grants them `CREATEDB`, sets their passwords and
    /// creates both databases.
    async fn provision(&self, request: &ProvisionRequest<'_>) -> Result<(), Error>;
}

/// Quotes an SQL identifier.
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quotes an SQL string literal.
#[must_use]
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Role statements, run as the superuser, for both roles of `request`.
#[must_use]
pub fn role_statements(request: &ProvisionRequest<'_>) -> Vec<String> {
    let roles = [request.admin, request.test];
    let mut statements = Vec::with_capacity(roles.len() * 3);

    for role in roles {
        statements.push(format!(
            "CREATE USER {} WITH PASSWORD {}",
            quote_identifier(role.user),
            quote_literal(role.password)
        ));
    }
    for role in roles {
        statements.push(format!("ALTER ROLE {} CREATEDB", quote_identifier(role.user)));
    }
    for role in roles {
        statements.push(format!(
            "ALTER ROLE {} WITH PASSWORD {}",
            quote_identifier(role.user),
            quote_literal(role.password)
        ));
    }

    statements
}

/// Database statements, run as the application role.
#[must_use]
pub fn database_statements(request: &ProvisionRequest<'_>) -> Vec<String> {
    [request.admin.database, request.test.database]
        .into_iter()
        .map(|database| format!("CREATE DATABASE {}", quote_identifier(database)))
        .collect()
}

/// Provisions over a PostgreSQL client connection using `sqlx`.
#[derive(Clone, Debug, Default)]
pub struct SqlxProvisioner;

impl SqlxProvisioner {
    async fn execute_all(
        options: PgConnectOptions,
        statements: Vec<String>,
    ) -> Result<(), Error> {
        let mut conn = PgConnection::connect_with(&options).await?;

        for statement in statements {
            debug!("executing: {}", statement.split(" PASSWORD ").next().unwrap_or_default());
            conn.execute(statement.as_str()).await?;
        }

        conn.close().await?;

        Ok(())
    }
}

#[async_trait]
impl Provisioner for SqlxProvisioner {
    async fn provision(&self, request: &ProvisionRequest<'_>) -> Result<(), Error> {
        info!("creating database users");

        let superuser = PgConnectOptions::new()
            .host(request.host)
            .port(request.port)
            .username(request.superuser)
            .database("postgres");
        Self::execute_all(superuser, role_statements(request)).await?;

        info!("creating databases");

        let admin = PgConnectOptions::new()
            .host(request.host)
            .port(request.port)
            .username(request.admin.user)
            .password(request.admin.password)
            .database("postgres");
        Self::execute_all(admin, database_statements(request)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ProvisionRequest<'static> {
        ProvisionRequest {
            host: "127.0.0.1",
            port: 5433,
            superuser: "dev",
            admin: Credentials {
                user: "app",
                password: "s3cret",
                database: "app",
            },
            test: Credentials {
                user: "app_test",
                password: "it's",
                database: "app_test",
            },
        }
    }

    #[test]
    fn test_quoting() {
        assert_eq!(quote_identifier("app"), "\"app\"");
        assert_eq!(quote_identifier("a\"b"), "\"a\"\"b\"");
        assert_eq!(quote_literal("it's"), "'it''s'");
    }

    #[test]
    fn test_role_statements_order() {
        let statements = role_statements(&request());

        assert_eq!(
            statements,
            vec![
                "CREATE USER \"app\" WITH PASSWORD 's3cret'",
                "CREATE USER \"app_test\" WITH PASSWORD 'it''s'",
                "ALTER ROLE \"app\" CREATEDB",
                "ALTER ROLE \"app_test\" CREATEDB",
                "ALTER ROLE \"app\" WITH PASSWORD 's3cret'",
                "ALTER ROLE \"app_test\" WITH PASSWORD 'it''s'",
            ]
        );
    }

    #[test]
    fn test_database_statements() {
        assert_eq!(
            database_statements(&request()),
            vec!["CREATE DATABASE \"app\"", "CREATE DATABASE \"app_test\""]
        );
    }
}
