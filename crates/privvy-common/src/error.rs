use crate::span::Position;
use std::fmt;

/// The specific ways lexing can fail.
#[derive(Debug, Clone, PartialEq)]
pub enum LexErrorKind {
    UnexpectedCharacter(char),
    UnterminatedString,
    InvalidNumberLiteral(String),
}

impl fmt::Display for LexErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexErrorKind::UnexpectedCharacter(c) => write!(f, "unexpected character: {c:?}"),
            LexErrorKind::UnterminatedString => write!(f, "unterminated string"),
            LexErrorKind::InvalidNumberLiteral(s) => write!(f, "invalid number literal: {s}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub kind: LexErrorKind,
    pub position: Position,
}

impl LexError {
    pub fn new(kind: LexErrorKind, position: Position) -> Self {
        Self { kind, position }
    }
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Lexical error at {}: {}", self.position, self.kind)
    }
}

impl std::error::Error for LexError {}

/// A syntactic error: unexpected token, missing delimiter, malformed
/// construct. Carries a human-readable message rather than a structured
/// kind because the parser's failure sites are too varied to usefully
/// enumerate, matching how the reference parser raises a single
/// `SyntaxError(message)` from every `consume`/`error` call site.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub position: Position,
}

impl ParseError {
    pub fn new(message: impl Into<String>, position: Position) -> Self {
        Self { message: message.into(), position }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Syntax error at {}: {}", self.position, self.message)
    }
}

impl std::error::Error for ParseError {}

/// A read or assignment of a name unbound anywhere on the scope chain.
#[derive(Debug, Clone, PartialEq)]
pub struct NameError {
    pub name: String,
    pub position: Position,
}

impl NameError {
    pub fn new(name: impl Into<String>, position: Position) -> Self {
        Self { name: name.into(), position }
    }
}

impl fmt::Display for NameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name error at {}: '{}' is not defined", self.position, self.name)
    }
}

impl std::error::Error for NameError {}

/// An operator, call, member access, index, or `new` applied to a value
/// of the wrong shape, or an argument-count mismatch.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeError {
    pub message: String,
    pub position: Position,
}

impl TypeError {
    pub fn new(message: impl Into<String>, position: Position) -> Self {
        Self { message: message.into(), position }
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type error at {}: {}", self.position, self.message)
    }
}

impl std::error::Error for TypeError {}

/// Every other failure the evaluator can raise during execution: division
/// by zero, out-of-range indexing, `return` outside a function, a host
/// object propagating a backend failure.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError {
    pub message: String,
    pub position: Position,
}

impl RuntimeError {
    pub fn new(message: impl Into<String>, position: Position) -> Self {
        Self { message: message.into(), position }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Runtime error at {}: {}", self.position, self.message)
    }
}

impl std::error::Error for RuntimeError {}

/// The unified error type crossing the lexer/parser/evaluator boundary,
/// used by drivers (the CLI, the REPL) that need one type to report
/// regardless of which stage failed.
#[derive(Debug, Clone, PartialEq)]
pub enum PrivvyError {
    Lex(LexError),
    Parse(ParseError),
    Name(NameError),
    Type(TypeError),
    Runtime(RuntimeError),
}

impl PrivvyError {
    pub fn position(&self) -> Position {
        match self {
            PrivvyError::Lex(e) => e.position,
            PrivvyError::Parse(e) => e.position,
            PrivvyError::Name(e) => e.position,
            PrivvyError::Type(e) => e.position,
            PrivvyError::Runtime(e) => e.position,
        }
    }
}

impl fmt::Display for PrivvyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrivvyError::Lex(e) => write!(f, "{e}"),
            PrivvyError::Parse(e) => write!(f, "{e}"),
            PrivvyError::Name(e) => write!(f, "{e}"),
            PrivvyError::Type(e) => write!(f, "{e}"),
            PrivvyError::Runtime(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for PrivvyError {}

impl From<LexError> for PrivvyError {
    fn from(e: LexError) -> Self {
        PrivvyError::Lex(e)
    }
}

impl From<ParseError> for PrivvyError {
    fn from(e: ParseError) -> Self {
        PrivvyError::Parse(e)
    }
}

impl From<NameError> for PrivvyError {
    fn from(e: NameError) -> Self {
        PrivvyError::Name(e)
    }
}

impl From<TypeError> for PrivvyError {
    fn from(e: TypeError) -> Self {
        PrivvyError::Type(e)
    }
}

impl From<RuntimeError> for PrivvyError {
    fn from(e: RuntimeError) -> Self {
        PrivvyError::Runtime(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lex_error_display() {
        let e = LexError::new(LexErrorKind::UnexpectedCharacter('@'), Position::new(1, 5));
        assert_eq!(e.to_string(), "Lexical error at 1:5: unexpected character: '@'");
    }

    #[test]
    fn lex_error_kind_display_all_variants() {
        assert_eq!(LexErrorKind::UnterminatedString.to_string(), "unterminated string");
        assert_eq!(
            LexErrorKind::InvalidNumberLiteral("1.2.3".into()).to_string(),
            "invalid number literal: 1.2.3"
        );
    }

    #[test]
    fn parse_error_display() {
        let e = ParseError::new("expected ')'", Position::new(2, 10));
        assert_eq!(e.to_string(), "Syntax error at 2:10: expected ')'");
    }

    #[test]
    fn name_error_display() {
        let e = NameError::new("foo", Position::new(4, 1));
        assert_eq!(e.to_string(), "Name error at 4:1: 'foo' is not defined");
    }

    #[test]
    fn privvy_error_unifies_and_forwards_position() {
        let e: PrivvyError = RuntimeError::new("division by zero", Position::new(9, 3)).into();
        assert_eq!(e.position(), Position::new(9, 3));
        assert_eq!(e.to_string(), "Runtime error at 9:3: division by zero");
    }
}
