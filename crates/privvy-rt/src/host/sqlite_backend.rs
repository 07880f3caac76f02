use super::backend::SqlBackend;
use crate::value::{MapKey, Value, ValueMap};
use privvy_common::{Position, PrivvyError, RuntimeError, TypeError};
use rusqlite::types::{Value as SqliteValue, ValueRef};
use rusqlite::{params_from_iter, Connection};
use std::cell::RefCell;

pub struct SqliteBackend {
    connection: RefCell<Connection>,
}

impl SqliteBackend {
    pub fn open(path: &str, position: Position) -> Result<SqliteBackend, PrivvyError> {
        let connection = Connection::open(path)
            .map_err(|e| RuntimeError::new(format!("failed to open SQLite database '{path}': {e}"), position))?;
        Ok(SqliteBackend { connection: RefCell::new(connection) })
    }
}

fn to_sqlite_param(value: &Value, position: Position) -> Result<SqliteValue, PrivvyError> {
    match value {
        Value::Null => Ok(SqliteValue::Null),
        Value::Bool(b) => Ok(SqliteValue::Integer(if *b { 1 } else { 0 })),
        Value::Int(n) => Ok(SqliteValue::Integer(*n)),
        Value::Float(n) => Ok(SqliteValue::Real(*n)),
        Value::String(s) => Ok(SqliteValue::Text(s.to_string())),
        other => Err(TypeError::new(format!("cannot use a {} as a SQL parameter", other.type_name()), position).into()),
    }
}

fn from_sqlite_value(value: ValueRef<'_>, position: Position) -> Result<Value, PrivvyError> {
    match value {
        ValueRef::Null => Ok(Value::Null),
        ValueRef::Integer(n) => Ok(Value::Int(n)),
        ValueRef::Real(n) => Ok(Value::Float(n)),
        ValueRef::Text(bytes) => Ok(Value::string(String::from_utf8_lossy(bytes).into_owned())),
        ValueRef::Blob(_) => Err(RuntimeError::new("BLOB columns are not representable as a Privvy value", position).into()),
    }
}

impl SqlBackend for SqliteBackend {
    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn query(&self, sql: &str, params: &[Value], position: Position) -> Result<Vec<Value>, PrivvyError> {
        let connection = self.connection.borrow();
        let mut statement =
            connection.prepare(sql).map_err(|e| RuntimeError::new(format!("query failed: {e}"), position))?;
        let column_names: Vec<String> = statement.column_names().iter().map(|s| s.to_string()).collect();
        let bound = params.iter().map(|v| to_sqlite_param(v, position)).collect::<Result<Vec<_>, _>>()?;
        let mut rows = statement
            .query(params_from_iter(bound.iter()))
            .map_err(|e| RuntimeError::new(format!("query failed: {e}"), position))?;
        let mut results = Vec::new();
        while let Some(row) = rows.next().map_err(|e| RuntimeError::new(format!("query failed: {e}"), position))? {
            let mut map = ValueMap::default();
            for (index, name) in column_names.iter().enumerate() {
                let cell = row.get_ref(index).map_err(|e| RuntimeError::new(format!("query failed: {e}"), position))?;
                map.insert(MapKey::String(name.as_str().into()), from_sqlite_value(cell, position)?);
            }
            results.push(Value::map(map));
        }
        Ok(results)
    }

    /// Rolls back on failure before propagating the error, matching the
    /// reference ORM's `execute` wrapping every statement in a rollback
    /// guard rather than leaving a failed statement's transaction open.
    fn execute(&self, sql: &str, params: &[Value], position: Position) -> Result<i64, PrivvyError> {
        let bound = params.iter().map(|v| to_sqlite_param(v, position)).collect::<Result<Vec<_>, _>>()?;
        let result = {
            let connection = self.connection.borrow();
            connection
                .execute(sql, params_from_iter(bound.iter()))
                .map_err(|e| RuntimeError::new(format!("execute failed: {e}"), position))
        };
        match result {
            Ok(affected) => Ok(affected as i64),
            Err(e) => {
                let _ = self.rollback(position);
                Err(e.into())
            }
        }
    }

    fn last_insert_id(&self) -> Value {
        Value::Int(self.connection.borrow().last_insert_rowid())
    }

    fn commit(&self, _position: Position) -> Result<(), PrivvyError> {
        // rusqlite runs each statement in autocommit mode unless a
        // transaction is explicitly opened, which the ORM surface never
        // does, so there is nothing to flush here.
        Ok(())
    }

    fn rollback(&self, _position: Position) -> Result<(), PrivvyError> {
        Ok(())
    }
}
