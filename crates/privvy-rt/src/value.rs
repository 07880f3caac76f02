use crate::environment::Environment;
use privvy_common::{Position, PrivvyError};
use privvy_parser::ast::Node;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A key usable in a Privvy `Map`. Only strings and integers are
/// supported as keys; any other value used for indexing a map is a
/// type error at the call site, not here.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum MapKey {
    String(Rc<str>),
    Int(i64),
}

impl fmt::Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapKey::String(s) => write!(f, "{s}"),
            MapKey::Int(n) => write!(f, "{n}"),
        }
    }
}

pub type ValueMap = FxHashMap<MapKey, Value>;

/// A user-defined function: its declaration AST plus the environment it
/// closed over at definition time. Calling it creates a fresh scope
/// parented on `closure`, never on the caller's scope — this is what
/// makes closures capture their *defining* environment.
pub struct FunctionValue {
    pub name: String,
    pub parameters: Vec<String>,
    pub body: Vec<Node>,
    pub closure: Rc<RefCell<Environment>>,
}

impl fmt::Debug for FunctionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.name)
    }
}

/// A builtin or host-provided callable. Boxes a closure rather than a
/// function pointer so host objects (database handles, model
/// descriptors) can capture their own state when producing a callable
/// from `MemberAccess`.
pub struct NativeFunction {
    pub name: String,
    pub func: Box<dyn Fn(&[Value], Position) -> Result<Value, PrivvyError>>,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn {}>", self.name)
    }
}

impl NativeFunction {
    pub fn value(name: impl Into<String>, func: impl Fn(&[Value], Position) -> Result<Value, PrivvyError> + 'static) -> Value {
        Value::NativeFunction(Rc::new(NativeFunction { name: name.into(), func: Box::new(func) }))
    }
}

#[derive(Debug)]
pub struct ClassValue {
    pub name: String,
    pub superclass: Option<Rc<ClassValue>>,
    pub constructor: Option<Rc<FunctionValue>>,
    pub methods: FxHashMap<String, Rc<FunctionValue>>,
}

impl ClassValue {
    /// Instance field, then own methods, then superclass methods
    /// recursively — the lookup order spelled out for method dispatch.
    pub fn find_method(&self, name: &str) -> Option<Rc<FunctionValue>> {
        if let Some(method) = self.methods.get(name) {
            return Some(method.clone());
        }
        self.superclass.as_ref().and_then(|sup| sup.find_method(name))
    }
}

#[derive(Debug)]
pub struct InstanceValue {
    pub class: Rc<ClassValue>,
    pub fields: FxHashMap<String, Value>,
}

/// The capability shape the evaluator expects of a host object: a value
/// that exposes callable members by name. `Database` connections and
/// `Model` descriptors are the only two host objects the language
/// defines, but the evaluator never needs to know which one it's
/// holding — it only ever calls `get`.
pub trait HostObject {
    fn type_name(&self) -> &'static str;
    fn get(&self, name: &str, position: Position) -> Result<Value, PrivvyError>;

    /// Lets a builtin that receives a `Value::HostObject` argument (such as
    /// `Model`'s methods receiving a `Database` connection) recover the
    /// concrete type behind the trait object.
    fn as_any(&self) -> &dyn std::any::Any;
}

#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(Rc<str>),
    Array(Rc<RefCell<Vec<Value>>>),
    Map(Rc<RefCell<ValueMap>>),
    Function(Rc<FunctionValue>),
    NativeFunction(Rc<NativeFunction>),
    Class(Rc<ClassValue>),
    Instance(Rc<RefCell<InstanceValue>>),
    HostObject(Rc<dyn HostObject>),
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(n) => write!(f, "Int({n})"),
            Value::Float(n) => write!(f, "Float({n})"),
            Value::String(s) => write!(f, "String({s:?})"),
            Value::Array(_) => write!(f, "Array(..)"),
            Value::Map(_) => write!(f, "Map(..)"),
            Value::Function(fun) => write!(f, "{fun:?}"),
            Value::NativeFunction(fun) => write!(f, "{fun:?}"),
            Value::Class(c) => write!(f, "Class({})", c.name),
            Value::Instance(i) => write!(f, "Instance({})", i.borrow().class.name),
            Value::HostObject(h) => write!(f, "HostObject({})", h.type_name()),
        }
    }
}

impl Value {
    pub fn string(s: impl Into<String>) -> Value {
        Value::String(Rc::from(s.into()))
    }

    pub fn array(items: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn map(entries: ValueMap) -> Value {
        Value::Map(Rc::new(RefCell::new(entries)))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) | Value::Float(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Function(_) | Value::NativeFunction(_) => "function",
            Value::Class(_) => "class",
            Value::Instance(_) => "instance",
            Value::HostObject(h) => h.type_name(),
        }
    }

    /// `null`/`false` are falsy; so are numeric zero and the empty
    /// string; everything else (including empty arrays/maps) is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(n) => *n != 0.0,
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Canonical string form used by `str`, `print`, and string
    /// concatenation.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(n) => n.to_string(),
            Value::Float(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    format!("{n:.1}")
                } else {
                    n.to_string()
                }
            }
            Value::String(s) => s.to_string(),
            Value::Array(items) => {
                let parts: Vec<String> = items.borrow().iter().map(Value::to_display_string).collect();
                format!("[{}]", parts.join(", "))
            }
            Value::Map(entries) => {
                let parts: Vec<String> =
                    entries.borrow().iter().map(|(k, v)| format!("{k}: {}", v.to_display_string())).collect();
                format!("{{{}}}", parts.join(", "))
            }
            Value::Function(fun) => format!("<fn {}>", fun.name),
            Value::NativeFunction(fun) => format!("<native fn {}>", fun.name),
            Value::Class(c) => format!("<class {}>", c.name),
            Value::Instance(i) => format!("<instance {}>", i.borrow().class.name),
            Value::HostObject(h) => format!("<{}>", h.type_name()),
        }
    }

    /// Structural equality on primitives; reference identity on
    /// instances, classes, and functions — two distinct instances are
    /// never equal even with identical fields.
    pub fn structural_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => *a as f64 == *b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Map(a), Value::Map(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::NativeFunction(a), Value::NativeFunction(b)) => Rc::ptr_eq(a, b),
            (Value::HostObject(a), Value::HostObject(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_matches_spec_table() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(!Value::Float(0.0).is_truthy());
        assert!(!Value::string("").is_truthy());
        assert!(Value::Int(1).is_truthy());
        assert!(Value::array(vec![]).is_truthy());
        assert!(Value::map(ValueMap::default()).is_truthy());
    }

    #[test]
    fn float_display_keeps_one_decimal_for_whole_numbers() {
        assert_eq!(Value::Float(3.0).to_display_string(), "3.0");
        assert_eq!(Value::Float(3.5).to_display_string(), "3.5");
    }

    #[test]
    fn distinct_instances_are_never_equal() {
        let class = Rc::new(ClassValue { name: "A".into(), superclass: None, constructor: None, methods: FxHashMap::default() });
        let a = Value::Instance(Rc::new(RefCell::new(InstanceValue { class: class.clone(), fields: FxHashMap::default() })));
        let b = Value::Instance(Rc::new(RefCell::new(InstanceValue { class, fields: FxHashMap::default() })));
        assert!(!a.structural_eq(&b));
        assert!(a.structural_eq(&a.clone()));
    }

    #[test]
    fn mixed_int_float_equality_compares_numerically() {
        assert!(Value::Int(2).structural_eq(&Value::Float(2.0)));
    }

    #[test]
    fn find_method_recurses_through_superclass() {
        let base_method = Rc::new(FunctionValue {
            name: "greet".into(),
            parameters: vec![],
            body: vec![],
            closure: Environment::new(None),
        });
        let mut base_methods = FxHashMap::default();
        base_methods.insert("greet".to_string(), base_method);
        let base = Rc::new(ClassValue { name: "Base".into(), superclass: None, constructor: None, methods: base_methods });
        let derived = ClassValue { name: "Derived".into(), superclass: Some(base), constructor: None, methods: FxHashMap::default() };
        assert!(derived.find_method("greet").is_some());
        assert!(derived.find_method("missing").is_none());
    }
}
