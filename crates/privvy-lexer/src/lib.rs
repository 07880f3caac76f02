//! Tokenizer for the Privvy scripting language. Converts source text
//! into a stream of [`Token`]s, failing on the first malformed
//! character, number, or string.

mod cursor;

use cursor::Cursor;
use privvy_common::{keyword_from_str, LexError, LexErrorKind, NumberLiteral, Position, Token, TokenKind};

/// Tokenizes Privvy source text.
///
/// Implements `Iterator<Item = Result<Token, LexError>>` so callers can
/// either pull tokens lazily or collect the whole stream with
/// [`Lexer::tokenize`]. Once an error or the `Eof` token has been
/// produced, the iterator is exhausted.
pub struct Lexer<'src> {
    cursor: Cursor<'src>,
    done: bool,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self { cursor: Cursor::new(source), done: false }
    }

    /// Tokenize the entire source, stopping at the first error.
    pub fn tokenize(source: &'src str) -> Result<Vec<Token>, LexError> {
        Lexer::new(source).collect()
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.cursor.peek() {
                Some(' ') | Some('\t') | Some('\r') => {
                    self.cursor.advance();
                }
                Some('/') if self.cursor.peek_next() == Some('/') => {
                    while !matches!(self.cursor.peek(), None | Some('\n')) {
                        self.cursor.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn lex_number(&mut self, start: Position) -> Result<Token, LexError> {
        let text = self.cursor.eat_while(|c| c.is_ascii_digit() || c == '.');
        let literal = if text.contains('.') {
            text.parse::<f64>()
                .map(NumberLiteral::Float)
                .map_err(|_| LexError::new(LexErrorKind::InvalidNumberLiteral(text.clone()), start))?
        } else {
            text.parse::<i64>()
                .map(NumberLiteral::Int)
                .map_err(|_| LexError::new(LexErrorKind::InvalidNumberLiteral(text.clone()), start))?
        };
        Ok(Token::new(TokenKind::Number(literal), start))
    }

    fn lex_string(&mut self, start: Position) -> Result<Token, LexError> {
        let quote = self.cursor.advance().expect("caller already peeked a quote");
        let mut value = String::new();
        loop {
            match self.cursor.peek() {
                None => return Err(LexError::new(LexErrorKind::UnterminatedString, start)),
                Some(c) if c == quote => {
                    self.cursor.advance();
                    break;
                }
                Some('\\') => {
                    self.cursor.advance();
                    match self.cursor.advance() {
                        None => return Err(LexError::new(LexErrorKind::UnterminatedString, start)),
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some('r') => value.push('\r'),
                        Some('\\') => value.push('\\'),
                        Some('"') => value.push('"'),
                        Some('\'') => value.push('\''),
                        Some(other) => value.push(other),
                    }
                }
                Some(c) => {
                    value.push(c);
                    self.cursor.advance();
                }
            }
        }
        Ok(Token::new(TokenKind::String(value), start))
    }

    fn lex_identifier(&mut self, start: Position) -> Token {
        let first = self.cursor.advance().expect("caller already peeked an ident start");
        let mut text = String::new();
        text.push(first);
        text.push_str(&self.cursor.eat_while(|c| c.is_alphanumeric() || c == '_'));
        let kind = keyword_from_str(&text).unwrap_or(TokenKind::Identifier(text));
        Token::new(kind, start)
    }

    /// Consume a second character if it matches `expected`, returning
    /// `then` on success and `otherwise` if it doesn't (or there is none).
    fn lex_maybe_two_char(&mut self, expected: char, then: TokenKind, otherwise: TokenKind) -> TokenKind {
        if self.cursor.peek() == Some(expected) {
            self.cursor.advance();
            then
        } else {
            otherwise
        }
    }

    fn produce(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace_and_comments();
        let start = self.cursor.position();

        let Some(c) = self.cursor.peek() else {
            return Ok(Token::new(TokenKind::Eof, start));
        };

        if c == '\n' {
            self.cursor.advance();
            return Ok(Token::new(TokenKind::Newline, start));
        }
        if c.is_ascii_digit() {
            return self.lex_number(start);
        }
        if c == '"' || c == '\'' {
            return self.lex_string(start);
        }
        if c.is_alphabetic() || c == '_' {
            return Ok(self.lex_identifier(start));
        }

        self.cursor.advance();
        let kind = match c {
            '+' => TokenKind::Plus,
            '-' => self.lex_maybe_two_char('>', TokenKind::Arrow, TokenKind::Minus),
            '*' => TokenKind::Multiply,
            '/' => TokenKind::Divide,
            '%' => TokenKind::Modulo,
            '=' => self.lex_maybe_two_char('=', TokenKind::Equal, TokenKind::Assign),
            '!' => self.lex_maybe_two_char('=', TokenKind::NotEqual, TokenKind::Not),
            '<' => self.lex_maybe_two_char('=', TokenKind::LessEqual, TokenKind::LessThan),
            '>' => self.lex_maybe_two_char('=', TokenKind::GreaterEqual, TokenKind::GreaterThan),
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            '[' => TokenKind::LeftBracket,
            ']' => TokenKind::RightBracket,
            ',' => TokenKind::Comma,
            '.' => TokenKind::Dot,
            ';' => TokenKind::Semicolon,
            ':' => TokenKind::Colon,
            other => return Err(LexError::new(LexErrorKind::UnexpectedCharacter(other), start)),
        };
        Ok(Token::new(kind, start))
    }
}

impl<'src> Iterator for Lexer<'src> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.produce() {
            Ok(token) => {
                if token.kind == TokenKind::Eof {
                    self.done = true;
                }
                Some(Ok(token))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn empty_source_is_just_eof() {
        assert_eq!(kinds(""), vec![TokenKind::Eof]);
    }

    #[test]
    fn skips_whitespace_and_comments() {
        assert_eq!(kinds("  // hi\n let"), vec![TokenKind::Newline, TokenKind::Let, TokenKind::Eof]);
    }

    #[test]
    fn integer_and_float_numbers() {
        assert_eq!(
            kinds("1 2.5"),
            vec![
                TokenKind::Number(NumberLiteral::Int(1)),
                TokenKind::Number(NumberLiteral::Float(2.5)),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn string_with_escapes() {
        let tokens = Lexer::tokenize(r#""a\nb\tc""#).unwrap();
        assert_eq!(tokens[0].kind, TokenKind::String("a\nb\tc".to_string()));
    }

    #[test]
    fn single_quoted_string_passes_through_unknown_escape() {
        let tokens = Lexer::tokenize(r"'a\qb'").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::String("aqb".to_string()));
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let err = Lexer::tokenize("\"abc").unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnterminatedString);
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(
            kinds("let fun notAKeyword"),
            vec![
                TokenKind::Let,
                TokenKind::Fun,
                TokenKind::Identifier("notAKeyword".to_string()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn not_and_bang_both_lex_to_not() {
        assert_eq!(kinds("not !"), vec![TokenKind::Not, TokenKind::Not, TokenKind::Eof]);
    }

    #[test]
    fn two_char_operators_are_promoted() {
        assert_eq!(
            kinds("== != <= >= ->"),
            vec![
                TokenKind::Equal,
                TokenKind::NotEqual,
                TokenKind::LessEqual,
                TokenKind::GreaterEqual,
                TokenKind::Arrow,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn minus_without_gt_stays_minus() {
        assert_eq!(kinds("- 1"), vec![TokenKind::Minus, TokenKind::Number(NumberLiteral::Int(1)), TokenKind::Eof]);
    }

    #[test]
    fn unexpected_character_is_an_error_with_position() {
        let err = Lexer::tokenize("let x = @").unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnexpectedCharacter('@'));
        assert_eq!(err.position, Position::new(1, 9));
    }

    #[test]
    fn newline_resets_line_and_column_for_subsequent_tokens() {
        let tokens = Lexer::tokenize("let\nx").unwrap();
        let ident = tokens.iter().find(|t| matches!(t.kind, TokenKind::Identifier(_))).unwrap();
        assert_eq!(ident.position, Position::new(2, 1));
    }

    #[test]
    fn final_token_is_always_eof() {
        let tokens = Lexer::tokenize("let x = 1 + 2").unwrap();
        assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
    }
}
