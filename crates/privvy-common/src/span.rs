use std::fmt;

/// A 1-based source position: the line and column of a single character.
///
/// Privvy tracks position directly while scanning rather than deriving it
/// from byte offsets after the fact, since the lexer already walks the
/// source character by character and column tracking falls out for free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    pub const fn start() -> Self {
        Self { line: 1, column: 1 }
    }

    /// Advance past a single character, handling the line reset on `\n`.
    pub fn advance(self, ch: char) -> Self {
        if ch == '\n' {
            Position { line: self.line + 1, column: 1 }
        } else {
            Position { line: self.line, column: self.column + 1 }
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_is_one_one() {
        assert_eq!(Position::start(), Position::new(1, 1));
    }

    #[test]
    fn advance_increments_column() {
        let p = Position::start().advance('x');
        assert_eq!(p, Position::new(1, 2));
    }

    #[test]
    fn advance_on_newline_resets_column_and_bumps_line() {
        let p = Position::new(3, 7).advance('\n');
        assert_eq!(p, Position::new(4, 1));
    }

    #[test]
    fn display_format() {
        assert_eq!(Position::new(2, 5).to_string(), "2:5");
    }
}
