use super::backend::SqlBackend;
use crate::value::{MapKey, Value, ValueMap};
use privvy_common::{Position, PrivvyError, RuntimeError, TypeError};
use postgres::types::{ToSql, Type};
use postgres::{Client, NoTls, Row};
use std::cell::RefCell;

pub struct PostgresBackend {
    client: RefCell<Client>,
}

impl PostgresBackend {
    pub fn connect(connection_string: &str, position: Position) -> Result<PostgresBackend, PrivvyError> {
        let client = Client::connect(connection_string, NoTls)
            .map_err(|e| RuntimeError::new(format!("failed to connect to PostgreSQL: {e}"), position))?;
        Ok(PostgresBackend { client: RefCell::new(client) })
    }
}

fn to_postgres_param(value: &Value, position: Position) -> Result<Box<dyn ToSql + Sync>, PrivvyError> {
    match value {
        Value::Null => Ok(Box::new(Option::<String>::None)),
        Value::Bool(b) => Ok(Box::new(*b)),
        Value::Int(n) => Ok(Box::new(*n)),
        Value::Float(n) => Ok(Box::new(*n)),
        Value::String(s) => Ok(Box::new(s.to_string())),
        other => Err(TypeError::new(format!("cannot use a {} as a SQL parameter", other.type_name()), position).into()),
    }
}

/// PostgreSQL rows are statically typed per column, so extracting a value
/// means matching the column's wire type before calling `Row::get` rather
/// than relying on a single generic that could panic on mismatch.
fn from_postgres_row(row: &Row, index: usize, position: Position) -> Result<Value, PrivvyError> {
    let column_type = row.columns()[index].type_();
    let value = match column_type {
        &Type::BOOL => row.get::<_, Option<bool>>(index).map(Value::Bool),
        &Type::INT2 => row.get::<_, Option<i16>>(index).map(|n| Value::Int(n as i64)),
        &Type::INT4 => row.get::<_, Option<i32>>(index).map(|n| Value::Int(n as i64)),
        &Type::INT8 => row.get::<_, Option<i64>>(index).map(Value::Int),
        &Type::FLOAT4 => row.get::<_, Option<f32>>(index).map(|n| Value::Float(n as f64)),
        &Type::FLOAT8 => row.get::<_, Option<f64>>(index).map(Value::Float),
        &Type::TEXT | &Type::VARCHAR | &Type::BPCHAR | &Type::NAME => row.get::<_, Option<String>>(index).map(Value::string),
        other => return Err(RuntimeError::new(format!("unsupported PostgreSQL column type '{other}'"), position).into()),
    };
    Ok(value.unwrap_or(Value::Null))
}

impl SqlBackend for PostgresBackend {
    fn placeholder(&self, _index: usize) -> String {
        "%s".to_string()
    }

    fn query(&self, sql: &str, params: &[Value], position: Position) -> Result<Vec<Value>, PrivvyError> {
        let mut client = self.client.borrow_mut();
        let bound = params.iter().map(|v| to_postgres_param(v, position)).collect::<Result<Vec<_>, _>>()?;
        let refs: Vec<&(dyn ToSql + Sync)> = bound.iter().map(|p| p.as_ref()).collect();
        let rows = client.query(sql, &refs).map_err(|e| RuntimeError::new(format!("query failed: {e}"), position))?;
        let mut results = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut map = ValueMap::default();
            for (index, column) in row.columns().iter().enumerate() {
                map.insert(MapKey::String(column.name().into()), from_postgres_row(row, index, position)?);
            }
            results.push(Value::map(map));
        }
        Ok(results)
    }

    /// Rolls back on failure before propagating the error. Without this
    /// a failed statement inside a `BEGIN` leaves PostgreSQL's
    /// transaction aborted until the script itself calls `rollback()`,
    /// unlike the reference ORM which always issues it automatically.
    fn execute(&self, sql: &str, params: &[Value], position: Position) -> Result<i64, PrivvyError> {
        let bound = params.iter().map(|v| to_postgres_param(v, position)).collect::<Result<Vec<_>, _>>()?;
        let refs: Vec<&(dyn ToSql + Sync)> = bound.iter().map(|p| p.as_ref()).collect();
        let result = {
            let mut client = self.client.borrow_mut();
            client.execute(sql, &refs).map_err(|e| RuntimeError::new(format!("execute failed: {e}"), position))
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
        // The ORM surface never appends `RETURNING id`, matching the
        // reference implementation's psycopg2 behavior where `lastrowid`
        // is unavailable on PostgreSQL cursors.
        Value::Null
    }

    fn commit(&self, position: Position) -> Result<(), PrivvyError> {
        self.client
            .borrow_mut()
            .simple_query("COMMIT")
            .map_err(|e| RuntimeError::new(format!("commit failed: {e}"), position))?;
        Ok(())
    }

    fn rollback(&self, position: Position) -> Result<(), PrivvyError> {
        self.client
            .borrow_mut()
            .simple_query("ROLLBACK")
            .map_err(|e| RuntimeError::new(format!("rollback failed: {e}"), position))?;
        Ok(())
    }
}
