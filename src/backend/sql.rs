//! SQL text for the relational backends.
//!
//! Statements are written by hand rather than produced by a query builder:
//! the bulk path must be one statement with a fixed shape regardless of row
//! count, which builders render as N-row VALUES lists with 7N parameters.

use std::time::Duration;

const COLUMNS: &str = r#"created_at, updated_at, start_time, "interval", area, source, value"#;
const CONFLICT: &str = r#"ON CONFLICT (start_time, "interval", area) DO UPDATE
SET updated_at = EXCLUDED.updated_at, source = EXCLUDED.source, value = EXCLUDED.value"#;

/// Statements for one table, rendered once at construction.
#[derive(Debug, Clone)]
pub struct Statements {
    /// Double-quoted table identifier, also passed as a `regclass` parameter.
    pub table: String,
    pub upsert_single: String,
    pub upsert_bulk: String,
    pub select_ordered: String,
}

impl Statements {
    /// `table` must already be a plain identifier.
    pub fn new(table: &str) -> Self {
        let table = format!("\"{table}\"");
        let upsert_single = format!(
            "INSERT INTO {table} ({COLUMNS})\nVALUES ($1, $2, $3, $4, $5, $6, $7)\n{CONFLICT}"
        );
        let upsert_bulk = format!(
            "INSERT INTO {table} ({COLUMNS})\n\
             SELECT * FROM UNNEST($1::timestamptz[], $2::timestamptz[], $3::timestamptz[], \
             $4::bigint[], $5::text[], $6::text[], $7::float8[])\n{CONFLICT}"
        );
        let select_ordered =
            format!("SELECT {COLUMNS} FROM {table} ORDER BY start_time DESC LIMIT $1");
        Self {
            table,
            upsert_single,
            upsert_bulk,
            select_ordered,
        }
    }

    pub fn drop_table(&self) -> String {
        format!("DROP TABLE IF EXISTS {}", self.table)
    }

    pub fn create_table(&self) -> String {
        format!(
            r#"CREATE TABLE {} (
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL,
    start_time TIMESTAMPTZ NOT NULL,
    "interval" BIGINT NOT NULL,
    area TEXT NOT NULL,
    source TEXT NOT NULL,
    value DOUBLE PRECISION NOT NULL,
    PRIMARY KEY (start_time, "interval", area)
)"#,
            self.table
        )
    }

    pub fn create_start_time_index(&self) -> String {
        let bare = self.table.trim_matches('"');
        format!(
            "CREATE INDEX \"idx_{bare}_start_time\" ON {} (start_time)",
            self.table
        )
    }

    pub fn create_extension() -> &'static str {
        "CREATE EXTENSION IF NOT EXISTS timescaledb"
    }

    pub fn create_hypertable(&self, chunk_interval: Duration) -> String {
        format!(
            "SELECT create_hypertable('{}', 'start_time', chunk_time_interval => INTERVAL '{} seconds')",
            self.table,
            chunk_interval.as_secs()
        )
    }

    pub fn enable_compression(&self) -> String {
        format!("ALTER TABLE {} SET (timescaledb.compress)", self.table)
    }

    /// One row per chunk; `$1` is [`Statements::table`].
    pub fn compress_chunks() -> &'static str {
        "SELECT compress_chunk(c, if_not_compressed => true)::text FROM show_chunks($1::text::regclass) c"
    }

    /// Plain table size including indexes and TOAST; `$1` is [`Statements::table`].
    pub fn total_relation_size() -> &'static str {
        "SELECT pg_total_relation_size($1::text::regclass)"
    }

    /// Size of every chunk of a hypertable; `$1` is [`Statements::table`].
    pub fn hypertable_size() -> &'static str {
        "SELECT hypertable_size($1::text::regclass)"
    }
}
