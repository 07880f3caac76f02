use super::backend::quote_identifier;
use super::database::{database_backend, expect_database};
use crate::value::{HostObject, NativeFunction, Value};
use privvy_common::{Position, PrivvyError, RuntimeError, TypeError};

/// A table/field-type descriptor created by the `Model(tableName, fields)`
/// builtin. It knows nothing about any particular `Database` connection —
/// every method takes one as its first argument, matching the reference
/// implementation's ORM surface.
pub struct Model {
    table_name: String,
    fields: Vec<(String, String)>,
}

impl Model {
    pub fn new(table_name: impl Into<String>, fields: Vec<(String, String)>) -> Model {
        Model { table_name: table_name.into(), fields }
    }

    fn create_table_sql(&self) -> String {
        let field_defs: Vec<String> =
            self.fields.iter().map(|(name, sql_type)| format!("{} {sql_type}", quote_identifier(name))).collect();
        format!("CREATE TABLE IF NOT EXISTS {} ({})", quote_identifier(&self.table_name), field_defs.join(", "))
    }
}

fn expect_map_arg(value: &Value, position: Position, context: &str) -> Result<Vec<(String, Value)>, PrivvyError> {
    match value {
        Value::Map(entries) => Ok(entries.borrow().iter().map(|(k, v)| (k.to_string(), v.clone())).collect()),
        other => Err(TypeError::new(format!("{context} expects a map, got a {}", other.type_name()), position).into()),
    }
}

impl HostObject for Model {
    fn type_name(&self) -> &'static str {
        "Model"
    }

    fn get(&self, name: &str, position: Position) -> Result<Value, PrivvyError> {
        let table_name = self.table_name.clone();
        match name {
            "migrate" => {
                let sql = self.create_table_sql();
                Ok(NativeFunction::value("migrate", move |args, position| {
                    if args.len() != 1 {
                        return Err(TypeError::new("migrate() requires 1 argument (database connection)", position).into());
                    }
                    let db = expect_database(&args[0], position)?;
                    database_backend(db).execute(&sql, &[], position)?;
                    Ok(Value::Null)
                }))
            }
            "create" => Ok(NativeFunction::value("create", move |args, position| {
                if args.len() != 2 {
                    return Err(TypeError::new("create() requires 2 arguments (database, data)", position).into());
                }
                let db = expect_database(&args[0], position)?;
                let fields = expect_map_arg(&args[1], position, "create()")?;
                let backend = database_backend(db);
                let columns: Vec<String> = fields.iter().map(|(k, _)| quote_identifier(k)).collect();
                let placeholders: Vec<String> = (0..fields.len()).map(|i| backend.placeholder(i)).collect();
                let values: Vec<Value> = fields.iter().map(|(_, v)| v.clone()).collect();
                let sql = format!(
                    "INSERT INTO {} ({}) VALUES ({})",
                    quote_identifier(&table_name),
                    columns.join(", "),
                    placeholders.join(", ")
                );
                backend.execute(&sql, &values, position)?;
                Ok(backend.last_insert_id())
            })),
            "find" => Ok(NativeFunction::value("find", move |args, position| {
                if args.len() != 2 {
                    return Err(TypeError::new("find() requires 2 arguments (database, id)", position).into());
                }
                let db = expect_database(&args[0], position)?;
                let backend = database_backend(db);
                let sql = format!("SELECT * FROM {} WHERE {} = {}", quote_identifier(&table_name), quote_identifier("id"), backend.placeholder(0));
                let mut rows = backend.query(&sql, &args[1..2], position)?;
                Ok(if rows.is_empty() { Value::Null } else { rows.remove(0) })
            })),
            "findBy" => Ok(NativeFunction::value("findBy", move |args, position| {
                if args.len() != 3 {
                    return Err(TypeError::new("findBy() requires 3 arguments (database, field, value)", position).into());
                }
                let db = expect_database(&args[0], position)?;
                let field = expect_string(&args[1], position, "findBy()")?;
                let backend = database_backend(db);
                let sql = format!(
                    "SELECT * FROM {} WHERE {} = {}",
                    quote_identifier(&table_name),
                    quote_identifier(&field),
                    backend.placeholder(0)
                );
                Ok(Value::array(backend.query(&sql, &args[2..3], position)?))
            })),
            "all" => Ok(NativeFunction::value("all", move |args, position| {
                if args.len() != 1 {
                    return Err(TypeError::new("all() requires 1 argument (database)", position).into());
                }
                let db = expect_database(&args[0], position)?;
                let sql = format!("SELECT * FROM {}", quote_identifier(&table_name));
                Ok(Value::array(database_backend(db).query(&sql, &[], position)?))
            })),
            "where" => Ok(NativeFunction::value("where", move |args, position| {
                if args.len() < 2 {
                    return Err(TypeError::new("where() requires at least 2 arguments (database, condition, ...params)", position).into());
                }
                let db = expect_database(&args[0], position)?;
                let condition = expect_string(&args[1], position, "where()")?;
                let sql = format!("SELECT * FROM {} WHERE {condition}", quote_identifier(&table_name));
                Ok(Value::array(database_backend(db).query(&sql, &args[2..], position)?))
            })),
            "update" => Ok(NativeFunction::value("update", move |args, position| {
                if args.len() != 3 {
                    return Err(TypeError::new("update() requires 3 arguments (database, id, data)", position).into());
                }
                let db = expect_database(&args[0], position)?;
                let fields = expect_map_arg(&args[2], position, "update()")?;
                let backend = database_backend(db);
                let set_clauses: Vec<String> =
                    fields.iter().enumerate().map(|(i, (k, _))| format!("{} = {}", quote_identifier(k), backend.placeholder(i))).collect();
                let mut values: Vec<Value> = fields.iter().map(|(_, v)| v.clone()).collect();
                let id_placeholder = backend.placeholder(values.len());
                values.push(args[1].clone());
                let sql = format!(
                    "UPDATE {} SET {} WHERE {} = {id_placeholder}",
                    quote_identifier(&table_name),
                    set_clauses.join(", "),
                    quote_identifier("id")
                );
                Ok(Value::Int(backend.execute(&sql, &values, position)?))
            })),
            "delete" => Ok(NativeFunction::value("delete", move |args, position| {
                if args.len() != 2 {
                    return Err(TypeError::new("delete() requires 2 arguments (database, id)", position).into());
                }
                let db = expect_database(&args[0], position)?;
                let backend = database_backend(db);
                let sql = format!("DELETE FROM {} WHERE {} = {}", quote_identifier(&table_name), quote_identifier("id"), backend.placeholder(0));
                Ok(Value::Int(backend.execute(&sql, &args[1..2], position)?))
            })),
            "count" => Ok(NativeFunction::value("count", move |args, position| {
                if args.len() != 1 {
                    return Err(TypeError::new("count() requires 1 argument (database)", position).into());
                }
                let db = expect_database(&args[0], position)?;
                let sql = format!("SELECT COUNT(*) AS count FROM {}", quote_identifier(&table_name));
                let rows = database_backend(db).query(&sql, &[], position)?;
                let row = rows.into_iter().next().ok_or_else(|| RuntimeError::new("count query returned no rows", position))?;
                let Value::Map(entries) = row else { unreachable!("query rows are always maps") };
                let result = entries.borrow().iter().next().map(|(_, v)| v.clone()).unwrap_or(Value::Int(0));
                Ok(result)
            })),
            "drop" => Ok(NativeFunction::value("drop", move |args, position| {
                if args.len() != 1 {
                    return Err(TypeError::new("drop() requires 1 argument (database)", position).into());
                }
                let db = expect_database(&args[0], position)?;
                let sql = format!("DROP TABLE IF EXISTS {}", quote_identifier(&table_name));
                database_backend(db).execute(&sql, &[], position)?;
                Ok(Value::Null)
            })),
            other => Err(RuntimeError::new(format!("Model has no attribute '{other}'"), position).into()),
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

fn expect_string(value: &Value, position: Position, context: &str) -> Result<String, PrivvyError> {
    match value {
        Value::String(s) => Ok(s.to_string()),
        other => Err(TypeError::new(format!("{context} expects a string, got a {}", other.type_name()), position).into()),
    }
}
