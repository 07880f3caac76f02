use crate::value::Value;
use privvy_common::{Position, PrivvyError};

/// The contact point between the language core and an actual SQL engine.
/// `DatabaseConnection` and `Model` never see `rusqlite`/`postgres` types
/// directly — they drive this trait, so adding a third backend is a matter
/// of one new impl, not touching the host objects.
pub trait SqlBackend {
    /// The parameter placeholder for position `index` (zero-based) in a
    /// generated statement — `?` for SQLite, `%s` for PostgreSQL.
    fn placeholder(&self, index: usize) -> String;

    /// Run a statement expected to produce rows, converting each row into
    /// a `Value::Map` keyed by column name.
    fn query(&self, sql: &str, params: &[Value], position: Position) -> Result<Vec<Value>, PrivvyError>;

    /// Run a statement not expected to produce rows (INSERT/UPDATE/DELETE/
    /// DDL), returning the number of affected rows.
    fn execute(&self, sql: &str, params: &[Value], position: Position) -> Result<i64, PrivvyError>;

    /// The row id generated by the most recent `execute`, or `Value::Null`
    /// when the backend doesn't expose one (PostgreSQL without a
    /// `RETURNING` clause, which the ORM surface never adds).
    fn last_insert_id(&self) -> Value;

    fn commit(&self, position: Position) -> Result<(), PrivvyError>;
    fn rollback(&self, position: Position) -> Result<(), PrivvyError>;
}

/// Double-quote a SQL identifier, escaping embedded quotes by doubling
/// them — the same convention both backends use for column/table names.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
