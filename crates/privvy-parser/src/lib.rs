//! AST node model and recursive-descent parser for the Privvy scripting
//! language.

pub mod ast;
pub mod parser;

pub use ast::{BinaryOperator, Node, UnaryOperator};
pub use parser::Parser;
