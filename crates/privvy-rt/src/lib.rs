//! Value model, lexical environments, tree-walking evaluator, and the
//! `Database`/`Model` host objects for the Privvy scripting language.

pub mod builtins;
pub mod environment;
pub mod evaluator;
pub mod host;
pub mod value;

pub use environment::Environment;
pub use evaluator::Interpreter;
pub use value::{ClassValue, FunctionValue, HostObject, InstanceValue, MapKey, NativeFunction, Value, ValueMap};
