//! PostgreSQL migration system for schema management.
//!
//! Compile-time embedded migrations that upgrade the artifact schema when a
//! backend is constructed. The artifact schema spans two tables (records and
//! blobs), so migration SQL uses `{records}` and `{blobs}` placeholders that
//! are substituted from the configured table prefix.
//!
//! # Usage
//!
//! ```rust,ignore
//! use lodestore::storage::migrations::{Migration, MigrationRunner};
//!
//! const MIGRATIONS: &[Migration] = &[
//!     Migration {
//!         version: 1,
//!         description: "Initial tables",
//!         sql: "CREATE TABLE IF NOT EXISTS {records} (id TEXT PRIMARY KEY);",
//!     },
//! ];
//!
//! let runner = MigrationRunner::new(pool, "artifacts");
//! runner.run(MIGRATIONS).await?;
//! ```

#[cfg(feature = "postgres")]
mod implementation {
    use crate::{Error, Result};
    use deadpool_postgres::Pool;

    /// A single migration with version and SQL.
    #[derive(Debug, Clone, Copy)]
    pub struct Migration {
        /// Migration version (sequential, starting at 1).
        pub version: i32,
        /// Human-readable description.
        pub description: &'static str,
        /// SQL to apply (may contain multiple statements separated by
        /// semicolons). `{records}` and `{blobs}` are substituted with the
        /// prefixed table names.
        pub sql: &'static str,
    }

    /// Runs migrations for a prefixed pair of artifact tables.
    pub struct MigrationRunner {
        pool: Pool,
        table_prefix: String,
    }

    impl MigrationRunner {
        /// Creates a new migration runner.
        #[must_use]
        pub fn new(pool: Pool, table_prefix: impl Into<String>) -> Self {
            Self {
                pool,
                table_prefix: table_prefix.into(),
            }
        }

        /// The records table name.
        #[must_use]
        pub fn records_table(&self) -> String {
            format!("{}_records", self.table_prefix)
        }

        /// The blobs table name.
        #[must_use]
        pub fn blobs_table(&self) -> String {
            format!("{}_blobs", self.table_prefix)
        }

        /// Runs all pending migrations.
        ///
        /// # Errors
        ///
        /// Returns an error if a migration fails; a failed migration rolls
        /// back in full.
        pub async fn run(&self, migrations: &[Migration]) -> Result<()> {
            let mut client = self.pool.get().await.map_err(|e| Error::Connection {
                operation: "migration_get_connection".to_string(),
                cause: e.to_string(),
            })?;

            self.ensure_migrations_table(&client).await?;
            let current_version = self.get_current_version(&client).await?;

            for migration in migrations {
                if migration.version > current_version {
                    self.apply_migration(&mut client, migration).await?;
                }
            }

            Ok(())
        }

        /// Returns the name of the migrations tracking table.
        fn migrations_table_name(&self) -> String {
            format!("{}_schema_migrations", self.table_prefix)
        }

        /// Ensures the tracking table exists.
        async fn ensure_migrations_table(&self, client: &deadpool_postgres::Object) -> Result<()> {
            let migrations_table = self.migrations_table_name();

            let sql = format!(
                r"
                CREATE TABLE IF NOT EXISTS {migrations_table} (
                    version INTEGER PRIMARY KEY,
                    description TEXT NOT NULL,
                    applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )
                "
            );

            client
                .execute(&sql, &[])
                .await
                .map_err(|e| Error::Connection {
                    operation: "create_migrations_table".to_string(),
                    cause: e.to_string(),
                })?;

            Ok(())
        }

        /// Gets the current schema version.
        async fn get_current_version(&self, client: &deadpool_postgres::Object) -> Result<i32> {
            let migrations_table = self.migrations_table_name();
            let sql = format!("SELECT COALESCE(MAX(version), 0) FROM {migrations_table}");

            let version: i32 = client
                .query_one(&sql, &[])
                .await
                .map(|row| row.get(0))
                .unwrap_or(0);

            Ok(version)
        }

        /// Applies a single migration within a transaction.
        ///
        /// All statements and the version record commit together; a failure
        /// anywhere rolls the whole migration back, so the schema never ends
        /// up half-upgraded.
        async fn apply_migration(
            &self,
            client: &mut deadpool_postgres::Object,
            migration: &Migration,
        ) -> Result<()> {
            let migrations_table = self.migrations_table_name();

            let sql = migration
                .sql
                .replace("{records}", &self.records_table())
                .replace("{blobs}", &self.blobs_table());

            let tx = client.transaction().await.map_err(|e| Error::Connection {
                operation: format!("migration_v{}_begin_tx", migration.version),
                cause: e.to_string(),
            })?;

            for statement in sql.split(';') {
                let statement = statement.trim();
                if statement.is_empty() {
                    continue;
                }

                tx.execute(statement, &[])
                    .await
                    .map_err(|e| Error::Connection {
                        operation: format!(
                            "migration_v{}: {}",
                            migration.version, migration.description
                        ),
                        cause: e.to_string(),
                    })?;
            }

            let record_sql =
                format!("INSERT INTO {migrations_table} (version, description) VALUES ($1, $2)");

            tx.execute(&record_sql, &[&migration.version, &migration.description])
                .await
                .map_err(|e| Error::Connection {
                    operation: "record_migration".to_string(),
                    cause: e.to_string(),
                })?;

            tx.commit().await.map_err(|e| Error::Connection {
                operation: format!("migration_v{}_commit", migration.version),
                cause: e.to_string(),
            })?;

            tracing::info!(
                version = migration.version,
                description = migration.description,
                prefix = self.table_prefix,
                "Applied migration"
            );

            Ok(())
        }
    }

    /// Maximum version across a set of migrations.
    #[must_use]
    pub fn max_version(migrations: &[Migration]) -> i32 {
        migrations.iter().map(|m| m.version).max().unwrap_or(0)
    }
}

#[cfg(feature = "postgres")]
pub use implementation::{Migration, MigrationRunner, max_version};

#[cfg(not(feature = "postgres"))]
mod stub {
    /// A single migration with version and SQL (stub).
    #[derive(Debug, Clone, Copy)]
    pub struct Migration {
        /// Migration version.
        pub version: i32,
        /// Human-readable description.
        pub description: &'static str,
        /// SQL to apply.
        pub sql: &'static str,
    }

    /// Maximum version across a set of migrations.
    #[must_use]
    pub const fn max_version(migrations: &[Migration]) -> i32 {
        let mut max = 0;
        let mut i = 0;
        while i < migrations.len() {
            if migrations[i].version > max {
                max = migrations[i].version;
            }
            i += 1;
        }
        max
    }
}

#[cfg(not(feature = "postgres"))]
pub use stub::{Migration, max_version};
