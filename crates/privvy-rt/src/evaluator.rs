use crate::environment::Environment;
use crate::value::{ClassValue, FunctionValue, InstanceValue, MapKey, Value};
use privvy_common::{Position, PrivvyError, RuntimeError, TypeError};
use privvy_parser::ast::{BinaryOperator, Node, UnaryOperator};
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;

/// What a statement produced: either it ran to completion, or it hit a
/// `return` that must unwind to the nearest enclosing function call.
/// Modeled as a value rather than an exception type because Rust has no
/// cheap throw/catch — the call sites that should stop unwinding
/// (`call_function`, the constructor body, the top-level program) are
/// exactly the ones that pattern-match `Signal::Return` instead of
/// propagating it.
enum Signal {
    Normal,
    Return(Value),
}

/// Walks a parsed program against a persistent global scope. Holds no
/// other interpreter state — every recursive call thread the scope it
/// should run in explicitly, so nested blocks never need to save and
/// restore a shared "current environment" field.
pub struct Interpreter {
    pub globals: Rc<RefCell<Environment>>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        let globals = Environment::new(None);
        crate::builtins::install(&globals);
        Interpreter { globals }
    }

    /// Run every top-level statement of `program` against the global
    /// scope. A `return` that escapes all the way to the top is a
    /// runtime error — there is no function call to unwind to.
    pub fn interpret(&self, program: &Node) -> Result<(), PrivvyError> {
        let statements = match program {
            Node::Program { statements } => statements,
            other => panic!("interpret expects a Program node, got {other:?}"),
        };
        let globals = self.globals.clone();
        for statement in statements {
            if let Signal::Return(_) = self.execute(statement, &globals)? {
                return Err(RuntimeError::new("cannot use 'return' outside a function", statement.position()).into());
            }
        }
        Ok(())
    }

    /// Execute one top-level statement against a caller-supplied scope,
    /// as the REPL does line by line. Returns the statement's value when
    /// it was a bare expression (and not null) — declarations and control
    /// structures never produce output of their own.
    pub fn interpret_repl_statement(
        &self,
        node: &Node,
        env: &Rc<RefCell<Environment>>,
    ) -> Result<Option<Value>, PrivvyError> {
        let is_declarative = matches!(
            node,
            Node::VarDeclaration { .. }
                | Node::FunctionDeclaration { .. }
                | Node::ClassDeclaration { .. }
                | Node::IfStatement { .. }
                | Node::WhileStatement { .. }
                | Node::ForStatement { .. }
        );
        if is_declarative {
            self.execute(node, env)?;
            return Ok(None);
        }
        if matches!(node, Node::ReturnStatement { .. }) {
            return Err(RuntimeError::new("cannot use 'return' outside a function", node.position()).into());
        }
        let value = self.evaluate(node, env)?;
        if matches!(value, Value::Null) {
            Ok(None)
        } else {
            Ok(Some(value))
        }
    }

    fn execute(&self, node: &Node, env: &Rc<RefCell<Environment>>) -> Result<Signal, PrivvyError> {
        match node {
            Node::VarDeclaration { name, initializer, .. } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr, env)?,
                    None => Value::Null,
                };
                env.borrow_mut().define(name.clone(), value);
                Ok(Signal::Normal)
            }
            Node::FunctionDeclaration { name, parameters, body, .. } => {
                let function = Rc::new(FunctionValue {
                    name: name.clone(),
                    parameters: parameters.clone(),
                    body: body.clone(),
                    closure: env.clone(),
                });
                env.borrow_mut().define(name.clone(), Value::Function(function));
                Ok(Signal::Normal)
            }
            Node::ClassDeclaration { name, superclass, constructor, methods, position } => {
                self.execute_class_declaration(name, superclass.as_deref(), constructor.as_deref(), methods, *position, env)
            }
            Node::IfStatement { condition, then_branch, else_branch, .. } => {
                if self.evaluate(condition, env)?.is_truthy() {
                    self.execute_block(then_branch, &Environment::new(Some(env.clone())))
                } else if let Some(else_branch) = else_branch {
                    self.execute_block(else_branch, &Environment::new(Some(env.clone())))
                } else {
                    Ok(Signal::Normal)
                }
            }
            Node::WhileStatement { condition, body, .. } => {
                while self.evaluate(condition, env)?.is_truthy() {
                    let iteration_env = Environment::new(Some(env.clone()));
                    match self.execute_block(body, &iteration_env)? {
                        Signal::Normal => {}
                        signal @ Signal::Return(_) => return Ok(signal),
                    }
                }
                Ok(Signal::Normal)
            }
            Node::ForStatement { initializer, condition, increment, body, .. } => {
                let loop_env = Environment::new(Some(env.clone()));
                if let Some(init) = initializer {
                    self.execute(init, &loop_env)?;
                }
                loop {
                    let should_continue = match condition {
                        Some(cond) => self.evaluate(cond, &loop_env)?.is_truthy(),
                        None => true,
                    };
                    if !should_continue {
                        break;
                    }
                    let iteration_env = Environment::new(Some(loop_env.clone()));
                    match self.execute_block(body, &iteration_env)? {
                        Signal::Normal => {}
                        signal @ Signal::Return(_) => return Ok(signal),
                    }
                    if let Some(incr) = increment {
                        self.evaluate(incr, &loop_env)?;
                    }
                }
                Ok(Signal::Normal)
            }
            Node::ReturnStatement { value, .. } => {
                let result = match value {
                    Some(expr) => self.evaluate(expr, env)?,
                    None => Value::Null,
                };
                Ok(Signal::Return(result))
            }
            Node::Program { .. } => panic!("a Program node cannot appear nested inside a statement"),
            expression => {
                self.evaluate(expression, env)?;
                Ok(Signal::Normal)
            }
        }
    }

    fn execute_block(&self, statements: &[Node], env: &Rc<RefCell<Environment>>) -> Result<Signal, PrivvyError> {
        for statement in statements {
            match self.execute(statement, env)? {
                Signal::Normal => {}
                signal @ Signal::Return(_) => return Ok(signal),
            }
        }
        Ok(Signal::Normal)
    }

    #[allow(clippy::too_many_arguments)]
    fn execute_class_declaration(
        &self,
        name: &str,
        superclass_name: Option<&str>,
        constructor: Option<&Node>,
        methods: &[Node],
        position: Position,
        env: &Rc<RefCell<Environment>>,
    ) -> Result<Signal, PrivvyError> {
        let superclass = match superclass_name {
            Some(sup_name) => match Environment::get(env, sup_name, position)? {
                Value::Class(class) => Some(class),
                other => return Err(TypeError::new(format!("superclass '{sup_name}' is not a class ({})", other.type_name()), position).into()),
            },
            None => None,
        };
        let constructor = constructor.map(|ctor| {
            let (parameters, body) = match ctor {
                Node::FunctionDeclaration { parameters, body, .. } => (parameters.clone(), body.clone()),
                other => panic!("constructor must parse as a function declaration, got {other:?}"),
            };
            Rc::new(FunctionValue { name: "constructor".to_string(), parameters, body, closure: env.clone() })
        });
        let mut method_table = FxHashMap::default();
        for method in methods {
            let (method_name, parameters, body) = match method {
                Node::FunctionDeclaration { name, parameters, body, .. } => (name.clone(), parameters.clone(), body.clone()),
                other => panic!("class method must parse as a function declaration, got {other:?}"),
            };
            let closure = env.clone();
            method_table.insert(method_name.clone(), Rc::new(FunctionValue { name: method_name, parameters, body, closure }));
        }
        let class = Rc::new(ClassValue { name: name.to_string(), superclass, constructor, methods: method_table });
        env.borrow_mut().define(name.to_string(), Value::Class(class));
        Ok(Signal::Normal)
    }

    fn evaluate(&self, node: &Node, env: &Rc<RefCell<Environment>>) -> Result<Value, PrivvyError> {
        match node {
            Node::NumberLiteral { value, .. } => Ok(match value {
                privvy_common::NumberLiteral::Int(n) => Value::Int(*n),
                privvy_common::NumberLiteral::Float(n) => Value::Float(*n),
            }),
            Node::StringLiteral { value, .. } => Ok(Value::string(value.clone())),
            Node::BooleanLiteral { value, .. } => Ok(Value::Bool(*value)),
            Node::NullLiteral { .. } => Ok(Value::Null),
            Node::Identifier { name, position } => Ok(Environment::get(env, name, *position)?),
            Node::ThisExpression { position } => Ok(Environment::get(env, "this", *position)?),
            Node::BinaryOp { left, operator, right, position } => self.evaluate_binary(left, *operator, right, *position, env),
            Node::UnaryOp { operator, operand, position } => self.evaluate_unary(*operator, operand, *position, env),
            Node::ArrayLiteral { elements, .. } => {
                let mut items = Vec::with_capacity(elements.len());
                for element in elements {
                    items.push(self.evaluate(element, env)?);
                }
                Ok(Value::array(items))
            }
            Node::ArrayAccess { array, index, position } => self.evaluate_array_access(array, index, *position, env),
            Node::MemberAccess { object, property, position } => {
                let receiver = self.evaluate(object, env)?;
                self.get_member(&receiver, property, *position)
            }
            Node::FunctionCall { callee, arguments, position } => self.evaluate_call(callee, arguments, *position, env),
            Node::NewExpression { class_name, arguments, position } => self.evaluate_new(class_name, arguments, *position, env),
            Node::Assignment { target, value, position } => self.evaluate_assignment(target, value, *position, env),
            other @ (Node::VarDeclaration { .. }
            | Node::FunctionDeclaration { .. }
            | Node::ClassDeclaration { .. }
            | Node::IfStatement { .. }
            | Node::WhileStatement { .. }
            | Node::ForStatement { .. }
            | Node::ReturnStatement { .. }
            | Node::Program { .. }) => panic!("{other:?} is a statement, not an expression"),
        }
    }

    fn evaluate_binary(
        &self,
        left: &Node,
        operator: BinaryOperator,
        right: &Node,
        position: Position,
        env: &Rc<RefCell<Environment>>,
    ) -> Result<Value, PrivvyError> {
        // `and`/`or` short-circuit and must not evaluate their right side
        // unconditionally, so they're handled before the shared left/right
        // evaluation the other operators share.
        match operator {
            BinaryOperator::And => {
                let left_value = self.evaluate(left, env)?;
                if !left_value.is_truthy() {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(self.evaluate(right, env)?.is_truthy()))
            }
            BinaryOperator::Or => {
                let left_value = self.evaluate(left, env)?;
                if left_value.is_truthy() {
                    Ok(left_value)
                } else {
                    self.evaluate(right, env)
                }
            }
            _ => {
                let left_value = self.evaluate(left, env)?;
                let right_value = self.evaluate(right, env)?;
                apply_binary_operator(operator, left_value, right_value, position)
            }
        }
    }

    fn evaluate_unary(
        &self,
        operator: UnaryOperator,
        operand: &Node,
        position: Position,
        env: &Rc<RefCell<Environment>>,
    ) -> Result<Value, PrivvyError> {
        let value = self.evaluate(operand, env)?;
        match operator {
            UnaryOperator::Negate => match value {
                Value::Int(n) => Ok(Value::Int(-n)),
                Value::Float(n) => Ok(Value::Float(-n)),
                other => Err(TypeError::new(format!("cannot negate a {}", other.type_name()), position).into()),
            },
            UnaryOperator::Not => Ok(Value::Bool(!value.is_truthy())),
        }
    }

    fn evaluate_array_access(
        &self,
        array: &Node,
        index: &Node,
        position: Position,
        env: &Rc<RefCell<Environment>>,
    ) -> Result<Value, PrivvyError> {
        let container = self.evaluate(array, env)?;
        let index_value = self.evaluate(index, env)?;
        match &container {
            Value::Array(items) => {
                let items = items.borrow();
                let idx = indexable_position(expect_int_index(&index_value, position)?, items.len(), position)?;
                Ok(items[idx].clone())
            }
            Value::String(s) => {
                let chars: Vec<char> = s.chars().collect();
                let idx = indexable_position(expect_int_index(&index_value, position)?, chars.len(), position)?;
                Ok(Value::string(chars[idx].to_string()))
            }
            Value::Map(entries) => {
                let key = value_to_map_key(&index_value, position)?;
                entries
                    .borrow()
                    .get(&key)
                    .cloned()
                    .ok_or_else(|| RuntimeError::new(format!("no entry for key '{key}' in map"), position).into())
            }
            other => Err(TypeError::new(format!("cannot index into a {}", other.type_name()), position).into()),
        }
    }

    fn get_member(&self, receiver: &Value, property: &str, position: Position) -> Result<Value, PrivvyError> {
        match receiver {
            Value::Instance(instance) => {
                if let Some(field) = instance.borrow().fields.get(property) {
                    return Ok(field.clone());
                }
                let class = instance.borrow().class.clone();
                match class.find_method(property) {
                    Some(method) => Ok(self.bind_method(&method, receiver.clone())),
                    None => Err(RuntimeError::new(format!("undefined property '{property}'"), position).into()),
                }
            }
            Value::HostObject(host) => host.get(property, position),
            other => Err(TypeError::new(format!("cannot access property '{property}' on a {}", other.type_name()), position).into()),
        }
    }

    fn bind_method(&self, method: &Rc<FunctionValue>, receiver: Value) -> Value {
        let bound_env = Environment::new(Some(method.closure.clone()));
        bound_env.borrow_mut().define("this", receiver);
        Value::Function(Rc::new(FunctionValue {
            name: method.name.clone(),
            parameters: method.parameters.clone(),
            body: method.body.clone(),
            closure: bound_env,
        }))
    }

    fn evaluate_call(
        &self,
        callee: &Node,
        arguments: &[Node],
        position: Position,
        env: &Rc<RefCell<Environment>>,
    ) -> Result<Value, PrivvyError> {
        let callee_value = self.evaluate(callee, env)?;
        let mut args = Vec::with_capacity(arguments.len());
        for argument in arguments {
            args.push(self.evaluate(argument, env)?);
        }
        self.call_value(&callee_value, args, position)
    }

    /// Invoke any callable value. Exposed beyond `evaluate_call` because
    /// host objects (`Database`, `Model`) hand back native functions that
    /// must be callable the same way user-defined ones are.
    pub fn call_value(&self, callee: &Value, args: Vec<Value>, position: Position) -> Result<Value, PrivvyError> {
        match callee {
            Value::Function(function) => self.call_function(function, args, position),
            Value::NativeFunction(native) => (native.func)(&args, position),
            other => Err(TypeError::new(format!("{} is not callable", other.type_name()), position).into()),
        }
    }

    fn call_function(&self, function: &Rc<FunctionValue>, args: Vec<Value>, position: Position) -> Result<Value, PrivvyError> {
        if args.len() != function.parameters.len() {
            return Err(TypeError::new(
                format!("function '{}' expects {} argument(s), got {}", function.name, function.parameters.len(), args.len()),
                position,
            )
            .into());
        }
        let call_env = Environment::new(Some(function.closure.clone()));
        {
            let mut scope = call_env.borrow_mut();
            for (param, arg) in function.parameters.iter().zip(args) {
                scope.define(param.clone(), arg);
            }
        }
        match self.execute_block(&function.body, &call_env)? {
            Signal::Return(value) => Ok(value),
            Signal::Normal => Ok(Value::Null),
        }
    }

    fn evaluate_new(
        &self,
        class_name: &str,
        arguments: &[Node],
        position: Position,
        env: &Rc<RefCell<Environment>>,
    ) -> Result<Value, PrivvyError> {
        let class = match Environment::get(env, class_name, position)? {
            Value::Class(class) => class,
            other => return Err(TypeError::new(format!("'{class_name}' is not a class ({})", other.type_name()), position).into()),
        };
        let mut args = Vec::with_capacity(arguments.len());
        for argument in arguments {
            args.push(self.evaluate(argument, env)?);
        }
        let instance = Rc::new(RefCell::new(InstanceValue { class: class.clone(), fields: FxHashMap::default() }));
        if let Some(constructor) = &class.constructor {
            if args.len() != constructor.parameters.len() {
                return Err(TypeError::new(
                    format!("constructor for '{class_name}' expects {} argument(s), got {}", constructor.parameters.len(), args.len()),
                    position,
                )
                .into());
            }
            let bound_env = Environment::new(Some(constructor.closure.clone()));
            {
                let mut scope = bound_env.borrow_mut();
                scope.define("this", Value::Instance(instance.clone()));
                for (param, arg) in constructor.parameters.iter().zip(args) {
                    scope.define(param.clone(), arg);
                }
            }
            // A `return` inside a constructor just stops initialization early;
            // its value is discarded, matching the reference interpreter.
            self.execute_block(&constructor.body, &bound_env)?;
        }
        // No constructor: extra arguments are silently discarded,
        // matching the reference interpreter's `PrivvyClass.call`.
        Ok(Value::Instance(instance))
    }

    fn evaluate_assignment(
        &self,
        target: &Node,
        value: &Node,
        position: Position,
        env: &Rc<RefCell<Environment>>,
    ) -> Result<Value, PrivvyError> {
        let new_value = self.evaluate(value, env)?;
        match target {
            Node::Identifier { name, position: id_position } => {
                Environment::set(env, name, new_value.clone(), *id_position)?;
                Ok(new_value)
            }
            Node::MemberAccess { object, property, position: member_position } => {
                let receiver = self.evaluate(object, env)?;
                match receiver {
                    Value::Instance(instance) => {
                        instance.borrow_mut().fields.insert(property.clone(), new_value.clone());
                        Ok(new_value)
                    }
                    other => Err(TypeError::new(format!("cannot set property '{property}' on a {}", other.type_name()), *member_position).into()),
                }
            }
            Node::ArrayAccess { array, index, position: index_position } => {
                let container = self.evaluate(array, env)?;
                let index_value = self.evaluate(index, env)?;
                match container {
                    Value::Array(items) => {
                        let mut items = items.borrow_mut();
                        let idx = indexable_position(expect_int_index(&index_value, *index_position)?, items.len(), *index_position)?;
                        items[idx] = new_value.clone();
                        Ok(new_value)
                    }
                    other => Err(TypeError::new(format!("cannot index-assign into a {}", other.type_name()), *index_position).into()),
                }
            }
            other => Err(TypeError::new("invalid assignment target", other.position()).into()),
        }
    }
}

fn expect_int_index(value: &Value, position: Position) -> Result<i64, PrivvyError> {
    match value {
        Value::Int(n) => Ok(*n),
        other => Err(TypeError::new(format!("expected an integer index, got a {}", other.type_name()), position).into()),
    }
}

fn indexable_position(index: i64, len: usize, position: Position) -> Result<usize, PrivvyError> {
    if index < 0 || index as usize >= len {
        return Err(RuntimeError::new(format!("index {index} out of range (length {len})"), position).into());
    }
    Ok(index as usize)
}

fn value_to_map_key(value: &Value, position: Position) -> Result<MapKey, PrivvyError> {
    match value {
        Value::String(s) => Ok(MapKey::String(s.clone())),
        Value::Int(n) => Ok(MapKey::Int(*n)),
        other => Err(TypeError::new(format!("cannot use a {} as a map key", other.type_name()), position).into()),
    }
}

fn is_number(value: &Value) -> bool {
    matches!(value, Value::Int(_) | Value::Float(_))
}

fn as_f64(value: &Value) -> f64 {
    match value {
        Value::Int(n) => *n as f64,
        Value::Float(n) => *n,
        other => panic!("as_f64 called on a non-numeric {other:?}"),
    }
}

/// Single dispatch point for binary-operator semantics, keyed on
/// `(operator, left kind, right kind)`. `and`/`or` never reach here — they
/// short-circuit in `evaluate_binary` before either side is forced.
fn apply_binary_operator(operator: BinaryOperator, left: Value, right: Value, position: Position) -> Result<Value, PrivvyError> {
    use BinaryOperator::*;
    match operator {
        Add => match (&left, &right) {
            (Value::String(a), Value::String(b)) => Ok(Value::string(format!("{a}{b}"))),
            (l, r) if is_number(l) && is_number(r) => Ok(numeric_binary(Add, l, r)),
            _ => Err(TypeError::new(format!("cannot add a {} and a {}", left.type_name(), right.type_name()), position).into()),
        },
        Subtract | Multiply | Modulo => match (&left, &right) {
            (l, r) if is_number(l) && is_number(r) => Ok(numeric_binary(operator, l, r)),
            _ => Err(TypeError::new(format!("'{}' requires numbers, got a {} and a {}", operator_symbol(operator), left.type_name(), right.type_name()), position).into()),
        },
        Divide => match (&left, &right) {
            (l, r) if is_number(l) && is_number(r) => numeric_divide(l, r, position),
            _ => Err(TypeError::new(format!("'/' requires numbers, got a {} and a {}", left.type_name(), right.type_name()), position).into()),
        },
        Equal => Ok(Value::Bool(left.structural_eq(&right))),
        NotEqual => Ok(Value::Bool(!left.structural_eq(&right))),
        LessThan | LessEqual | GreaterThan | GreaterEqual => compare(operator, &left, &right, position),
        And | Or => unreachable!("and/or are handled by the short-circuit path in evaluate_binary"),
    }
}

fn operator_symbol(operator: BinaryOperator) -> &'static str {
    use BinaryOperator::*;
    match operator {
        Add => "+",
        Subtract => "-",
        Multiply => "*",
        Divide => "/",
        Modulo => "%",
        Equal => "==",
        NotEqual => "!=",
        LessThan => "<",
        LessEqual => "<=",
        GreaterThan => ">",
        GreaterEqual => ">=",
        And => "and",
        Or => "or",
    }
}

fn numeric_binary(operator: BinaryOperator, left: &Value, right: &Value) -> Value {
    use BinaryOperator::*;
    if let (Value::Int(a), Value::Int(b)) = (left, right) {
        return match operator {
            Add => Value::Int(a + b),
            Subtract => Value::Int(a - b),
            Multiply => Value::Int(a * b),
            Modulo => Value::Int(a % b),
            _ => unreachable!(),
        };
    }
    let (a, b) = (as_f64(left), as_f64(right));
    match operator {
        Add => Value::Float(a + b),
        Subtract => Value::Float(a - b),
        Multiply => Value::Float(a * b),
        Modulo => Value::Float(a % b),
        _ => unreachable!(),
    }
}

fn numeric_divide(left: &Value, right: &Value, position: Position) -> Result<Value, PrivvyError> {
    let divisor = as_f64(right);
    if divisor == 0.0 {
        return Err(RuntimeError::new("division by zero", position).into());
    }
    Ok(Value::Float(as_f64(left) / divisor))
}

fn compare(operator: BinaryOperator, left: &Value, right: &Value, position: Position) -> Result<Value, PrivvyError> {
    use std::cmp::Ordering;
    let ordering = match (left, right) {
        (Value::String(a), Value::String(b)) => a.as_ref().cmp(b.as_ref()),
        (l, r) if is_number(l) && is_number(r) => as_f64(l).partial_cmp(&as_f64(r)).unwrap_or(Ordering::Equal),
        _ => return Err(TypeError::new(format!("cannot compare a {} and a {}", left.type_name(), right.type_name()), position).into()),
    };
    let result = match operator {
        BinaryOperator::LessThan => ordering == Ordering::Less,
        BinaryOperator::LessEqual => ordering != Ordering::Greater,
        BinaryOperator::GreaterThan => ordering == Ordering::Greater,
        BinaryOperator::GreaterEqual => ordering != Ordering::Less,
        _ => unreachable!(),
    };
    Ok(Value::Bool(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use privvy_parser::Parser;

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
    fn arithmetic_promotes_to_float_on_mixed_operands() {
        let value = run("1 + 2.5").unwrap().unwrap();
        assert!(matches!(value, Value::Float(f) if f == 3.5));
    }

    #[test]
    fn integer_division_always_yields_float() {
        let value = run("7 / 2").unwrap().unwrap();
        assert!(matches!(value, Value::Float(f) if (f - 3.5).abs() < 1e-9));
    }

    #[test]
    fn division_by_zero_is_a_runtime_error() {
        assert!(run("1 / 0").is_err());
    }

    #[test]
    fn or_is_value_preserving_not_boolean_coercing() {
        let value = run("0 or \"fallback\"").unwrap().unwrap();
        assert!(matches!(value, Value::String(s) if &*s == "fallback"));
    }

    #[test]
    fn and_short_circuits_without_evaluating_right_side() {
        let value = run("false and (1 / 0)").unwrap().unwrap();
        assert!(matches!(value, Value::Bool(false)));
    }

    #[test]
    fn closure_counter_increments_across_calls() {
        let value = run(
            r#"
            fun makeCounter() {
                let count = 0
                fun increment() {
                    count = count + 1
                    return count
                }
                return increment
            }
            let counter = makeCounter()
            counter()
            counter()
            counter()
            "#,
        )
        .unwrap()
        .unwrap();
        assert!(matches!(value, Value::Int(3)));
    }

    #[test]
    fn inheritance_dispatches_to_overridden_method_and_this_binds_correctly() {
        let value = run(
            r#"
            class Animal {
                constructor(name) {
                    this.name = name
                }
                speak() {
                    return this.name + " makes a sound"
                }
            }
            class Dog extends Animal {
                speak() {
                    return this.name + " barks"
                }
            }
            let d = new Dog("Rex")
            d.speak()
            "#,
        )
        .unwrap()
        .unwrap();
        assert!(matches!(value, Value::String(s) if &*s == "Rex barks"));
    }

    #[test]
    fn new_on_a_class_with_no_constructor_discards_extra_arguments() {
        let value = run(
            r#"
            class Empty { }
            let e = new Empty(1, 2, 3)
            str(e)
            "#,
        )
        .unwrap()
        .unwrap();
        assert!(matches!(value, Value::String(s) if s.starts_with("<instance Empty>")));
    }

    #[test]
    fn for_loop_gives_each_iteration_a_fresh_scope() {
        let value = run(
            r#"
            let fns = []
            for (let i = 0; i < 3; i = i + 1) {
                let captured = i
                fun report() {
                    return captured
                }
                fns[i] = report
            }
            fns
            "#,
        );
        assert!(value.is_ok());
    }

    #[test]
    fn array_index_assignment_mutates_in_place() {
        let value = run(
            r#"
            let xs = [1, 2, 3]
            xs[1] = 99
            xs
            "#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(value.to_display_string(), "[1, 99, 3]");
    }

    #[test]
    fn out_of_range_array_access_is_a_runtime_error() {
        assert!(run("let xs = [1, 2] xs[5]").is_err());
    }

    #[test]
    fn calling_a_non_callable_value_is_a_type_error() {
        assert!(run("let x = 5 x()").is_err());
    }

    #[test]
    fn unbound_name_read_is_a_name_error() {
        assert!(run("missingName").is_err());
    }

    #[test]
    fn assignment_to_unbound_name_does_not_implicitly_declare() {
        assert!(run("missingName = 1").is_err());
    }
}
