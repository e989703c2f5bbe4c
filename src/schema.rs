//! Benchmark table definition and per-engine DDL.

use crate::keygen::KeyType;

/// Name of the benchmark table (and, on the server engines, the database
/// holding it).
pub const TABLE_NAME: &str = "signals";

/// SQL dialect a schema is rendered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlDialect {
    Sqlite,
    Postgres,
    MariaDb,
}

/// Rendered DDL for the benchmark table.
#[derive(Debug, Clone)]
pub struct TableSchema {
    create_sql: String,
    drop_sql: String,
}

impl TableSchema {
    pub fn create_sql(&self) -> &str {
        &self.create_sql
    }

    pub fn drop_sql(&self) -> &str {
        &self.drop_sql
    }
}

/// Builds the fixed benchmark table shape for one dialect.
///
/// The table always has the generator's key as primary key, a string
/// timestamp and a bounded payload column. The `clustered` option makes
/// the primary key the clustering key on engines where that is a choice;
/// SQLite expresses it as `WITHOUT ROWID`, the server engines ignore it
/// (InnoDB always clusters on the primary key, Postgres never does).
pub struct SchemaBuilder {
    dialect: SqlDialect,
    clustered: bool,
}

impl SchemaBuilder {
    pub fn new(dialect: SqlDialect) -> Self {
        Self {
            dialect,
            clustered: false,
        }
    }

    pub fn clustered(mut self, clustered: bool) -> Self {
        self.clustered = clustered;
        self
    }

    pub fn build(&self, key_type: KeyType) -> TableSchema {
        let mut create_sql = format!(
            "CREATE TABLE {TABLE_NAME} (\
             id {} NOT NULL, \
             time_created VARCHAR(64), \
             data VARCHAR(10240), \
             PRIMARY KEY (id))",
            key_column_type(self.dialect, key_type),
        );
        if self.clustered && self.dialect == SqlDialect::Sqlite {
            create_sql.push_str(" WITHOUT ROWID");
        }

        TableSchema {
            create_sql,
            drop_sql: format!("DROP TABLE IF EXISTS {TABLE_NAME}"),
        }
    }
}

fn key_column_type(dialect: SqlDialect, key_type: KeyType) -> String {
    match (key_type, dialect) {
        (KeyType::BigInt, _) => "BIGINT".to_string(),
        (KeyType::Binary(_), SqlDialect::Sqlite) => "BLOB".to_string(),
        (KeyType::Binary(len), SqlDialect::MariaDb) => format!("BINARY({len})"),
        // No fixed-length binary type; the writer keeps every value at
        // the declared width.
        (KeyType::Binary(_), SqlDialect::Postgres) => "BYTEA".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clustered_sqlite_table_drops_the_rowid() {
        let schema = SchemaBuilder::new(SqlDialect::Sqlite)
            .clustered(true)
            .build(KeyType::BigInt);
        assert!(schema.create_sql().ends_with("WITHOUT ROWID"));

        let schema = SchemaBuilder::new(SqlDialect::Sqlite).build(KeyType::BigInt);
        assert!(!schema.create_sql().contains("WITHOUT ROWID"));
    }

    #[test]
    fn clustering_is_a_no_op_on_server_engines() {
        for dialect in [SqlDialect::Postgres, SqlDialect::MariaDb] {
            let schema = SchemaBuilder::new(dialect)
                .clustered(true)
                .build(KeyType::BigInt);
            assert!(!schema.create_sql().contains("WITHOUT ROWID"));
        }
    }

    #[test]
    fn binary_keys_map_to_the_engine_native_type() {
        let key = KeyType::Binary(16);
        assert_eq!("BLOB", key_column_type(SqlDialect::Sqlite, key));
        assert_eq!("BINARY(16)", key_column_type(SqlDialect::MariaDb, key));
        assert_eq!("BYTEA", key_column_type(SqlDialect::Postgres, key));
    }

    #[test]
    fn integer_keys_are_bigint_everywhere() {
        for dialect in [SqlDialect::Sqlite, SqlDialect::Postgres, SqlDialect::MariaDb] {
            assert_eq!("BIGINT", key_column_type(dialect, KeyType::BigInt));
        }
    }

    #[test]
    fn drop_is_tolerant_of_a_missing_table() {
        let schema = SchemaBuilder::new(SqlDialect::Postgres).build(KeyType::BigInt);
        assert_eq!("DROP TABLE IF EXISTS signals", schema.drop_sql());
    }
}
