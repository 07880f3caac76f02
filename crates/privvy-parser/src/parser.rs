use crate::ast::{BinaryOperator, Node, UnaryOperator};
use privvy_common::{ParseError, Position, PrivvyError, Token, TokenKind};
use privvy_lexer::Lexer;

/// Recursive-descent parser over a token stream, producing a `Program`
/// node. Precedence is encoded directly in the call chain
/// (`parse_assignment` → `parse_or` → … → `parse_primary`) rather than
/// through a table, matching the grammar's own layered description.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

type ParseResult<T> = Result<T, ParseError>;

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Tokenize and parse `source` in one step.
    pub fn parse_source(source: &str) -> Result<Node, PrivvyError> {
        let tokens = Lexer::tokenize(source)?;
        Ok(Parser::new(tokens).parse_program()?)
    }

    fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn position(&self) -> Position {
        self.current().position
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current().kind, TokenKind::Eof)
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        if !self.is_at_end() {
            self.pos += 1;
        }
        token
    }

    fn check_kind(&self, sample: &TokenKind) -> bool {
        std::mem::discriminant(&self.current().kind) == std::mem::discriminant(sample)
    }

    fn matches(&mut self, sample: &TokenKind) -> bool {
        if self.check_kind(sample) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, sample: TokenKind, message: &str) -> ParseResult<Token> {
        if self.check_kind(&sample) {
            Ok(self.advance())
        } else {
            Err(ParseError::new(message.to_string(), self.position()))
        }
    }

    fn skip_newlines(&mut self) {
        while matches!(self.current().kind, TokenKind::Newline) {
            self.advance();
        }
    }

    // ── Program and statements ──────────────────────────────────────

    pub fn parse_program(&mut self) -> ParseResult<Node> {
        let mut statements = Vec::new();
        self.skip_newlines();
        while !self.is_at_end() {
            statements.push(self.parse_statement()?);
            self.skip_newlines();
        }
        Ok(Node::Program { statements })
    }

    fn parse_statement(&mut self) -> ParseResult<Node> {
        match &self.current().kind {
            TokenKind::Let => self.parse_var_declaration(),
            TokenKind::Fun => self.parse_function_declaration(),
            TokenKind::Class => self.parse_class_declaration(),
            TokenKind::If => self.parse_if_statement(),
            TokenKind::While => self.parse_while_statement(),
            TokenKind::For => self.parse_for_statement(),
            TokenKind::Return => self.parse_return_statement(),
            TokenKind::Import | TokenKind::Export => {
                Err(ParseError::new(format!("'{}' is reserved and has no statement form", self.current().kind.describe()), self.position()))
            }
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_var_declaration(&mut self) -> ParseResult<Node> {
        let position = self.position();
        self.advance(); // 'let'
        let name = self.parse_identifier_name("expected variable name after 'let'")?;
        let initializer = if self.matches(&TokenKind::Assign) {
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };
        Ok(Node::VarDeclaration { name, initializer, position })
    }

    fn parse_identifier_name(&mut self, message: &str) -> ParseResult<String> {
        match &self.current().kind {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(ParseError::new(message.to_string(), self.position())),
        }
    }

    fn parse_function_declaration(&mut self) -> ParseResult<Node> {
        let position = self.position();
        self.advance(); // 'fun'
        let name = self.parse_identifier_name("expected function name after 'fun'")?;
        let parameters = self.parse_parameter_list()?;
        let body = self.parse_block()?;
        Ok(Node::FunctionDeclaration { name, parameters, body, position })
    }

    fn parse_parameter_list(&mut self) -> ParseResult<Vec<String>> {
        self.consume(TokenKind::LeftParen, "expected '(' before parameter list")?;
        let mut params = Vec::new();
        if !self.check_kind(&TokenKind::RightParen) {
            loop {
                params.push(self.parse_identifier_name("expected parameter name")?);
                if !self.matches(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "expected ')' after parameter list")?;
        Ok(params)
    }

    fn parse_class_declaration(&mut self) -> ParseResult<Node> {
        let position = self.position();
        self.advance(); // 'class'
        let name = self.parse_identifier_name("expected class name after 'class'")?;
        let superclass = if self.matches(&TokenKind::Extends) {
            Some(self.parse_identifier_name("expected superclass name after 'extends'")?)
        } else {
            None
        };
        self.consume(TokenKind::LeftBrace, "expected '{' to start class body")?;
        self.skip_newlines();

        let mut constructor = None;
        let mut methods = Vec::new();
        while !self.check_kind(&TokenKind::RightBrace) && !self.is_at_end() {
            if matches!(self.current().kind, TokenKind::Constructor) {
                constructor = Some(Box::new(self.parse_constructor()?));
            } else if matches!(self.current().kind, TokenKind::Fun) {
                methods.push(self.parse_function_declaration()?);
            } else {
                return Err(ParseError::new("expected a method or constructor in class body".to_string(), self.position()));
            }
            self.skip_newlines();
        }
        self.consume(TokenKind::RightBrace, "expected '}' to close class body")?;
        Ok(Node::ClassDeclaration { name, superclass, constructor, methods, position })
    }

    fn parse_constructor(&mut self) -> ParseResult<Node> {
        let position = self.position();
        self.advance(); // 'constructor'
        let parameters = self.parse_parameter_list()?;
        let body = self.parse_block()?;
        Ok(Node::FunctionDeclaration { name: "constructor".to_string(), parameters, body, position })
    }

    fn parse_if_statement(&mut self) -> ParseResult<Node> {
        let position = self.position();
        self.advance(); // 'if'
        self.consume(TokenKind::LeftParen, "expected '(' after 'if'")?;
        let condition = Box::new(self.parse_expression()?);
        self.consume(TokenKind::RightParen, "expected ')' after if condition")?;
        let then_branch = self.parse_block()?;
        self.skip_newlines_if_else_follows();
        let else_branch = if self.matches(&TokenKind::Else) {
            Some(self.parse_block()?)
        } else {
            None
        };
        Ok(Node::IfStatement { condition, then_branch, else_branch, position })
    }

    /// Newlines are allowed between a closing `}` and a following `else`.
    fn skip_newlines_if_else_follows(&mut self) {
        let mut lookahead = self.pos;
        while matches!(self.tokens[lookahead].kind, TokenKind::Newline) {
            lookahead += 1;
        }
        if matches!(self.tokens[lookahead].kind, TokenKind::Else) {
            self.pos = lookahead;
        }
    }

    fn parse_while_statement(&mut self) -> ParseResult<Node> {
        let position = self.position();
        self.advance(); // 'while'
        self.consume(TokenKind::LeftParen, "expected '(' after 'while'")?;
        let condition = Box::new(self.parse_expression()?);
        self.consume(TokenKind::RightParen, "expected ')' after while condition")?;
        let body = self.parse_block()?;
        Ok(Node::WhileStatement { condition, body, position })
    }

    fn parse_for_statement(&mut self) -> ParseResult<Node> {
        let position = self.position();
        self.advance(); // 'for'
        self.consume(TokenKind::LeftParen, "expected '(' after 'for'")?;

        let initializer = if self.check_kind(&TokenKind::Semicolon) {
            None
        } else if matches!(self.current().kind, TokenKind::Let) {
            Some(Box::new(self.parse_var_declaration()?))
        } else {
            Some(Box::new(self.parse_expression()?))
        };
        self.consume(TokenKind::Semicolon, "expected ';' after for-loop initializer")?;

        let condition = if self.check_kind(&TokenKind::Semicolon) {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };
        self.consume(TokenKind::Semicolon, "expected ';' after for-loop condition")?;

        let increment = if self.check_kind(&TokenKind::RightParen) {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };
        self.consume(TokenKind::RightParen, "expected ')' after for-loop clauses")?;

        let body = self.parse_block()?;
        Ok(Node::ForStatement { initializer, condition, increment, body, position })
    }

    fn parse_return_statement(&mut self) -> ParseResult<Node> {
        let position = self.position();
        self.advance(); // 'return'
        let at_statement_end = matches!(self.current().kind, TokenKind::Newline | TokenKind::RightBrace | TokenKind::Eof);
        let value = if at_statement_end { None } else { Some(Box::new(self.parse_expression()?)) };
        Ok(Node::ReturnStatement { value, position })
    }

    fn parse_expression_statement(&mut self) -> ParseResult<Node> {
        self.parse_expression()
    }

    fn parse_block(&mut self) -> ParseResult<Vec<Node>> {
        self.consume(TokenKind::LeftBrace, "expected '{' to start a block")?;
        self.skip_newlines();
        let mut statements = Vec::new();
        while !self.check_kind(&TokenKind::RightBrace) && !self.is_at_end() {
            statements.push(self.parse_statement()?);
            self.skip_newlines();
        }
        self.consume(TokenKind::RightBrace, "expected '}' to close block")?;
        Ok(statements)
    }

    // ── Expressions, by ascending precedence ────────────────────────

    fn parse_expression(&mut self) -> ParseResult<Node> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> ParseResult<Node> {
        let target = self.parse_or()?;
        if self.matches(&TokenKind::Assign) {
            let position = target.position();
            let value = Box::new(self.parse_assignment()?);
            return Ok(Node::Assignment { target: Box::new(target), value, position });
        }
        Ok(target)
    }

    fn parse_or(&mut self) -> ParseResult<Node> {
        let mut left = self.parse_and()?;
        while matches!(self.current().kind, TokenKind::Or) {
            let position = self.position();
            self.advance();
            let right = self.parse_and()?;
            left = Node::BinaryOp { left: Box::new(left), operator: BinaryOperator::Or, right: Box::new(right), position };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> ParseResult<Node> {
        let mut left = self.parse_equality()?;
        while matches!(self.current().kind, TokenKind::And) {
            let position = self.position();
            self.advance();
            let right = self.parse_equality()?;
            left = Node::BinaryOp { left: Box::new(left), operator: BinaryOperator::And, right: Box::new(right), position };
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> ParseResult<Node> {
        let mut left = self.parse_comparison()?;
        loop {
            let operator = match self.current().kind {
                TokenKind::Equal => BinaryOperator::Equal,
                TokenKind::NotEqual => BinaryOperator::NotEqual,
                _ => break,
            };
            let position = self.position();
            self.advance();
            let right = self.parse_comparison()?;
            left = Node::BinaryOp { left: Box::new(left), operator, right: Box::new(right), position };
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> ParseResult<Node> {
        let mut left = self.parse_addition()?;
        loop {
            let operator = match self.current().kind {
                TokenKind::LessThan => BinaryOperator::LessThan,
                TokenKind::LessEqual => BinaryOperator::LessEqual,
                TokenKind::GreaterThan => BinaryOperator::GreaterThan,
                TokenKind::GreaterEqual => BinaryOperator::GreaterEqual,
                _ => break,
            };
            let position = self.position();
            self.advance();
            let right = self.parse_addition()?;
            left = Node::BinaryOp { left: Box::new(left), operator, right: Box::new(right), position };
        }
        Ok(left)
    }

    fn parse_addition(&mut self) -> ParseResult<Node> {
        let mut left = self.parse_multiplication()?;
        loop {
            let operator = match self.current().kind {
                TokenKind::Plus => BinaryOperator::Add,
                TokenKind::Minus => BinaryOperator::Subtract,
                _ => break,
            };
            let position = self.position();
            self.advance();
            let right = self.parse_multiplication()?;
            left = Node::BinaryOp { left: Box::new(left), operator, right: Box::new(right), position };
        }
        Ok(left)
    }

    fn parse_multiplication(&mut self) -> ParseResult<Node> {
        let mut left = self.parse_unary()?;
        loop {
            let operator = match self.current().kind {
                TokenKind::Multiply => BinaryOperator::Multiply,
                TokenKind::Divide => BinaryOperator::Divide,
                TokenKind::Modulo => BinaryOperator::Modulo,
                _ => break,
            };
            let position = self.position();
            self.advance();
            let right = self.parse_unary()?;
            left = Node::BinaryOp { left: Box::new(left), operator, right: Box::new(right), position };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> ParseResult<Node> {
        let operator = match self.current().kind {
            TokenKind::Minus => Some(UnaryOperator::Negate),
            TokenKind::Not => Some(UnaryOperator::Not),
            _ => None,
        };
        if let Some(operator) = operator {
            let position = self.position();
            self.advance();
            let operand = Box::new(self.parse_unary()?);
            return Ok(Node::UnaryOp { operator, operand, position });
        }
        self.parse_call()
    }

    fn parse_call(&mut self) -> ParseResult<Node> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.current().kind {
                TokenKind::LeftParen => {
                    let position = expr.position();
                    let arguments = self.parse_argument_list()?;
                    expr = Node::FunctionCall { callee: Box::new(expr), arguments, position };
                }
                TokenKind::Dot => {
                    let position = expr.position();
                    self.advance();
                    let property = self.parse_identifier_name("expected property name after '.'")?;
                    expr = Node::MemberAccess { object: Box::new(expr), property, position };
                }
                TokenKind::LeftBracket => {
                    let position = expr.position();
                    self.advance();
                    let index = Box::new(self.parse_expression()?);
                    self.consume(TokenKind::RightBracket, "expected ']' after index expression")?;
                    expr = Node::ArrayAccess { array: Box::new(expr), index, position };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_argument_list(&mut self) -> ParseResult<Vec<Node>> {
        self.consume(TokenKind::LeftParen, "expected '(' to start argument list")?;
        let mut args = Vec::new();
        if !self.check_kind(&TokenKind::RightParen) {
            loop {
                args.push(self.parse_expression()?);
                if !self.matches(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "expected ')' after argument list")?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> ParseResult<Node> {
        let position = self.position();
        match self.current().kind.clone() {
            TokenKind::Number(value) => {
                self.advance();
                Ok(Node::NumberLiteral { value, position })
            }
            TokenKind::String(value) => {
                self.advance();
                Ok(Node::StringLiteral { value, position })
            }
            TokenKind::True => {
                self.advance();
                Ok(Node::BooleanLiteral { value: true, position })
            }
            TokenKind::False => {
                self.advance();
                Ok(Node::BooleanLiteral { value: false, position })
            }
            TokenKind::Null => {
                self.advance();
                Ok(Node::NullLiteral { position })
            }
            TokenKind::This => {
                self.advance();
                Ok(Node::ThisExpression { position })
            }
            TokenKind::New => {
                self.advance();
                let class_name = self.parse_identifier_name("expected class name after 'new'")?;
                let arguments = self.parse_argument_list()?;
                Ok(Node::NewExpression { class_name, arguments, position })
            }
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(Node::Identifier { name, position })
            }
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.consume(TokenKind::RightParen, "expected ')' after expression")?;
                Ok(expr)
            }
            TokenKind::LeftBracket => {
                self.advance();
                let mut elements = Vec::new();
                if !self.check_kind(&TokenKind::RightBracket) {
                    loop {
                        elements.push(self.parse_expression()?);
                        if !self.matches(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.consume(TokenKind::RightBracket, "expected ']' after array elements")?;
                Ok(Node::ArrayLiteral { elements, position })
            }
            other => Err(ParseError::new(format!("unexpected token '{}'", other.describe()), position)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Node {
        Parser::parse_source(source).unwrap_or_else(|e| panic!("parse failed: {e}"))
    }

    #[test]
    fn parses_var_declaration_with_initializer() {
        let program = parse("let x = 1 + 2");
        match program {
            Node::Program { statements } => {
                assert_eq!(statements.len(), 1);
                assert!(matches!(statements[0], Node::VarDeclaration { .. }));
            }
            _ => panic!("expected Program"),
        }
    }

    #[test]
    fn assignment_is_right_associative() {
        let program = parse("a = b = 1");
        let Node::Program { statements } = program else { panic!() };
        let Node::Assignment { value, .. } = &statements[0] else { panic!("expected assignment") };
        assert!(matches!(**value, Node::Assignment { .. }));
    }

    #[test]
    fn precedence_climbs_correctly() {
        // 1 + 2 * 3 should parse as 1 + (2 * 3)
        let program = parse("1 + 2 * 3");
        let Node::Program { statements } = program else { panic!() };
        let Node::BinaryOp { operator, right, .. } = &statements[0] else { panic!("expected binary op") };
        assert_eq!(*operator, BinaryOperator::Add);
        assert!(matches!(**right, Node::BinaryOp { operator: BinaryOperator::Multiply, .. }));
    }

    #[test]
    fn call_dot_and_index_chain() {
        let program = parse("a.b()[0]");
        let Node::Program { statements } = program else { panic!() };
        assert!(matches!(statements[0], Node::ArrayAccess { .. }));
    }

    #[test]
    fn return_with_no_expression_before_brace() {
        let program = parse("fun f() { return }");
        let Node::Program { statements } = program else { panic!() };
        let Node::FunctionDeclaration { body, .. } = &statements[0] else { panic!() };
        assert!(matches!(body[0], Node::ReturnStatement { value: None, .. }));
    }

    #[test]
    fn class_with_constructor_and_superclass() {
        let program = parse("class B extends A { constructor() { } fun m() { return 1 } }");
        let Node::Program { statements } = program else { panic!() };
        let Node::ClassDeclaration { superclass, constructor, methods, .. } = &statements[0] else { panic!() };
        assert_eq!(superclass.as_deref(), Some("A"));
        assert!(constructor.is_some());
        assert_eq!(methods.len(), 1);
    }

    #[test]
    fn for_loop_with_all_clauses() {
        let program = parse("for (let i = 0; i < 3; i = i + 1) { print(i) }");
        let Node::Program { statements } = program else { panic!() };
        assert!(matches!(statements[0], Node::ForStatement { .. }));
    }

    #[test]
    fn newlines_are_tolerated_around_braces() {
        let program = parse("if (true)\n{\nlet x = 1\n}\n");
        let Node::Program { statements } = program else { panic!() };
        assert!(matches!(statements[0], Node::IfStatement { .. }));
    }

    #[test]
    fn import_keyword_in_statement_position_is_a_syntax_error() {
        let err = Parser::parse_source("import foo").unwrap_err();
        assert!(err.to_string().contains("reserved"));
    }

    #[test]
    fn unexpected_token_reports_position() {
        let err = Parser::parse_source("let x = )").unwrap_err();
        assert!(err.to_string().contains("1:9"));
    }
}
