//! SQL for the single-row counter table.
//! Statements use `$n` placeholders, understood by both PostgreSQL and SQLite.

pub const COUNTER_TABLE: &str = "count";

pub const CREATE_COUNTER_TABLE: &str = "CREATE TABLE count (id INTEGER PRIMARY KEY, count INTEGER)";

pub const SELECT_COUNTER_ROWS: &str = "SELECT id, count FROM count";

pub const DELETE_COUNTER_ROWS: &str = "DELETE FROM count";

pub const INSERT_COUNTER_ROW: &str = "INSERT INTO count (id, count) VALUES ($1, $2)";

pub const UPDATE_COUNTER_ROW: &str = "UPDATE count SET count = $1 WHERE id = $2";

/// SQLSTATE `undefined_table`.
pub const PG_UNDEFINED_TABLE: &str = "42P01";
