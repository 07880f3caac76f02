use crate::environment::Environment;
use crate::host::{DatabaseConnection, Model};
use crate::value::{MapKey, NativeFunction, Value, ValueMap};
use privvy_common::{Position, PrivvyError, RuntimeError, TypeError};
use std::cell::RefCell;
use std::rc::Rc;

/// Install every builtin the language defines into a fresh global scope.
/// Called once, by `Interpreter::new`.
pub fn install(globals: &Rc<RefCell<Environment>>) {
    let mut scope = globals.borrow_mut();
    scope.define("print", print_fn());
    scope.define("len", len_fn());
    scope.define("str", str_fn());
    scope.define("int", int_fn());
    scope.define("float", float_fn());
    scope.define("dict", dict_fn());
    scope.define("Database", database_fn());
    scope.define("Model", model_fn());
}

fn print_fn() -> Value {
    NativeFunction::value("print", |args, _position| {
        let rendered: Vec<String> = args.iter().map(Value::to_display_string).collect();
        println!("{}", rendered.join(" "));
        Ok(Value::Null)
    })
}

fn len_fn() -> Value {
    NativeFunction::value("len", |args, position| {
        let [arg] = require_arity(args, "len", position)?;
        match arg {
            Value::Array(items) => Ok(Value::Int(items.borrow().len() as i64)),
            Value::String(s) => Ok(Value::Int(s.chars().count() as i64)),
            other => Err(TypeError::new(format!("len() is not supported for a {}", other.type_name()), position).into()),
        }
    })
}

fn str_fn() -> Value {
    NativeFunction::value("str", |args, position| {
        let [arg] = require_arity(args, "str", position)?;
        Ok(Value::string(arg.to_display_string()))
    })
}

fn int_fn() -> Value {
    NativeFunction::value("int", |args, position| {
        let [arg] = require_arity(args, "int", position)?;
        match arg {
            Value::Int(n) => Ok(Value::Int(*n)),
            Value::Float(n) => Ok(Value::Int(*n as i64)),
            Value::Bool(b) => Ok(Value::Int(if *b { 1 } else { 0 })),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| RuntimeError::new(format!("cannot convert '{s}' to int"), position).into()),
            other => Err(TypeError::new(format!("cannot convert a {} to int", other.type_name()), position).into()),
        }
    })
}

fn float_fn() -> Value {
    NativeFunction::value("float", |args, position| {
        let [arg] = require_arity(args, "float", position)?;
        match arg {
            Value::Int(n) => Ok(Value::Float(*n as f64)),
            Value::Float(n) => Ok(Value::Float(*n)),
            Value::Bool(b) => Ok(Value::Float(if *b { 1.0 } else { 0.0 })),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| RuntimeError::new(format!("cannot convert '{s}' to float"), position).into()),
            other => Err(TypeError::new(format!("cannot convert a {} to float", other.type_name()), position).into()),
        }
    })
}

fn dict_fn() -> Value {
    NativeFunction::value("dict", |args, position| {
        let [arg] = require_arity(args, "dict", position)?;
        let Value::Array(items) = arg else {
            return Err(TypeError::new("dict() argument must be an array", position).into());
        };
        let items = items.borrow();
        if items.len() % 2 != 0 {
            return Err(RuntimeError::new("dict() array must have even length (key-value pairs)", position).into());
        }
        let mut map = ValueMap::default();
        for pair in items.chunks(2) {
            let key = match &pair[0] {
                Value::String(s) => MapKey::String(s.clone()),
                Value::Int(n) => MapKey::Int(*n),
                other => return Err(TypeError::new(format!("cannot use a {} as a map key", other.type_name()), position).into()),
            };
            map.insert(key, pair[1].clone());
        }
        Ok(Value::map(map))
    })
}

fn database_fn() -> Value {
    NativeFunction::value("Database", |args, position| {
        let [arg] = require_arity(args, "Database", position)?;
        let Value::String(connection_string) = arg else {
            return Err(TypeError::new("Database() requires a connection string argument", position).into());
        };
        let connection = DatabaseConnection::connect(connection_string, position)?;
        Ok(Value::HostObject(Rc::new(connection)))
    })
}

fn model_fn() -> Value {
    NativeFunction::value("Model", |args, position| {
        if args.len() != 2 {
            return Err(TypeError::new("Model() takes exactly 2 arguments (table_name, fields)", position).into());
        }
        let Value::String(table_name) = &args[0] else {
            return Err(TypeError::new("first argument to Model() must be a string (table name)", position).into());
        };
        let Value::Map(entries) = &args[1] else {
            return Err(TypeError::new("second argument to Model() must be a map (field definitions)", position).into());
        };
        let mut fields = Vec::new();
        for (key, value) in entries.borrow().iter() {
            let Value::String(sql_type) = value else {
                return Err(TypeError::new("each field definition must be a string naming its SQL type", position).into());
            };
            fields.push((key.to_string(), sql_type.to_string()));
        }
        Ok(Value::HostObject(Rc::new(Model::new(table_name.to_string(), fields))))
    })
}

/// Checked destructuring for builtins that take a fixed argument count —
/// avoids every builtin re-writing the same `if args.len() != N` check.
fn require_arity<'a, const N: usize>(args: &'a [Value], name: &str, position: Position) -> Result<[&'a Value; N], PrivvyError> {
    if args.len() != N {
        return Err(TypeError::new(format!("{name}() takes exactly {N} argument(s), got {}", args.len()), position).into());
    }
    Ok(std::array::from_fn(|i| &args[i]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::Interpreter;
    use privvy_parser::{Node, Parser};

    fn run(source: &str) -> Result<Option<Value>, PrivvyError> {
        let interpreter = Interpreter::new();
        let program = Parser::parse_source(source)?;
        let statements = match &program {
            Node::Program { statements } => statements,
            _ => unreachable!(),
        };
        let mut last = None;
        for statement in statements {
            last = interpreter.interpret_repl_statement(statement, &interpreter.globals)?;
        }
        Ok(last)
    }

    #[test]
    fn len_reports_array_and_string_length() {
        assert!(matches!(run("len([1, 2, 3])").unwrap().unwrap(), Value::Int(3)));
        assert!(matches!(run("len(\"hello\")").unwrap().unwrap(), Value::Int(5)));
    }

    #[test]
    fn len_rejects_unsupported_types() {
        assert!(run("len(5)").is_err());
    }

    #[test]
    fn str_renders_numbers_and_booleans() {
        let value = run("str(3.0)").unwrap().unwrap();
        assert!(matches!(value, Value::String(s) if &*s == "3.0"));
    }

    #[test]
    fn int_truncates_floats_and_parses_strings() {
        assert!(matches!(run("int(9.7)").unwrap().unwrap(), Value::Int(9)));
        assert!(matches!(run("int(\"42\")").unwrap().unwrap(), Value::Int(42)));
    }

    #[test]
    fn int_rejects_non_numeric_strings() {
        assert!(run("int(\"not a number\")").is_err());
    }

    #[test]
    fn dict_builds_a_map_from_alternating_pairs() {
        let value = run("dict([\"a\", 1, \"b\", 2])").unwrap().unwrap();
        let Value::Map(entries) = value else { panic!("expected a map") };
        assert_eq!(entries.borrow().len(), 2);
    }

    #[test]
    fn dict_rejects_odd_length_arrays() {
        assert!(run("dict([\"a\", 1, \"b\"])").is_err());
    }

    #[test]
    fn database_rejects_unrecognized_connection_strings() {
        assert!(run("Database(\"redis://localhost\")").is_err());
    }

    #[test]
    fn database_opens_an_in_memory_sqlite_connection() {
        assert!(run("Database(\":memory:\")").is_ok());
    }
}
