use super::backend::SqlBackend;
use super::postgres_backend::PostgresBackend;
use super::sqlite_backend::SqliteBackend;
use crate::value::{HostObject, NativeFunction, Value};
use privvy_common::{Position, PrivvyError, RuntimeError, TypeError};
use std::rc::Rc;

/// An open connection to a SQLite or PostgreSQL database. Which backend
/// is live is determined once, from the connection string, at
/// construction — everything afterwards goes through `SqlBackend`.
pub struct DatabaseConnection {
    backend: Rc<dyn SqlBackend>,
}

impl DatabaseConnection {
    pub fn connect(connection_string: &str, position: Position) -> Result<DatabaseConnection, PrivvyError> {
        let backend: Rc<dyn SqlBackend> = if let Some(path) = connection_string.strip_prefix("sqlite://") {
            Rc::new(SqliteBackend::open(path, position)?)
        } else if connection_string.ends_with(".db") || connection_string == ":memory:" {
            Rc::new(SqliteBackend::open(connection_string, position)?)
        } else if connection_string.starts_with("postgresql://") || connection_string.starts_with("postgres://") {
            Rc::new(PostgresBackend::connect(connection_string, position)?)
        } else {
            return Err(RuntimeError::new(
                format!("unsupported database type for connection string '{connection_string}'; use 'sqlite://path.db' or 'postgresql://...'"),
                position,
            )
            .into());
        };
        Ok(DatabaseConnection { backend })
    }

    pub(super) fn backend(&self) -> Rc<dyn SqlBackend> {
        self.backend.clone()
    }
}

fn expect_sql_args(args: &[Value], position: Position, method: &str) -> Result<(Rc<str>, Vec<Value>), PrivvyError> {
    let Some(Value::String(sql)) = args.first() else {
        return Err(TypeError::new(format!("{method}() requires a SQL string as its first argument"), position).into());
    };
    Ok((sql.clone(), args[1..].to_vec()))
}

impl HostObject for DatabaseConnection {
    fn type_name(&self) -> &'static str {
        "Database"
    }

    fn get(&self, name: &str, position: Position) -> Result<Value, PrivvyError> {
        let backend = self.backend();
        match name {
            "query" => {
                let backend = backend.clone();
                Ok(NativeFunction::value("query", move |args, position| {
                    let (sql, params) = expect_sql_args(args, position, "query")?;
                    let rows = backend.query(&sql, &params, position)?;
                    Ok(Value::array(rows))
                }))
            }
            "execute" => {
                let backend = backend.clone();
                Ok(NativeFunction::value("execute", move |args, position| {
                    let (sql, params) = expect_sql_args(args, position, "execute")?;
                    Ok(Value::Int(backend.execute(&sql, &params, position)?))
                }))
            }
            "commit" => {
                let backend = backend.clone();
                Ok(NativeFunction::value("commit", move |_args, position| {
                    backend.commit(position)?;
                    Ok(Value::Null)
                }))
            }
            "rollback" => {
                let backend = backend.clone();
                Ok(NativeFunction::value("rollback", move |_args, position| {
                    backend.rollback(position)?;
                    Ok(Value::Null)
                }))
            }
            "close" => Ok(NativeFunction::value("close", |_args, _position| Ok(Value::Null))),
            other => Err(RuntimeError::new(format!("Database has no attribute '{other}'"), position).into()),
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Recover the `DatabaseConnection` behind a `Value::HostObject` argument,
/// the way every `Model` method's first argument is expected to be one.
pub(super) fn expect_database<'a>(value: &'a Value, position: Position) -> Result<&'a DatabaseConnection, PrivvyError> {
    match value {
        Value::HostObject(host) => host
            .as_any()
            .downcast_ref::<DatabaseConnection>()
            .ok_or_else(|| TypeError::new("expected a Database connection", position).into()),
        other => Err(TypeError::new(format!("expected a Database connection, got a {}", other.type_name()), position).into()),
    }
}

pub(super) fn database_backend(db: &DatabaseConnection) -> Rc<dyn SqlBackend> {
    db.backend()
}
