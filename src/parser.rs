use std::{mem, rc::Rc};

use tracing::{debug, trace};

use crate::{
    ast::{Block, Expression, FunctionLiteral, InfixOperator, PrefixOperator, Program, Statement},
    lexer::Lexer,
    token::{Token, TokenKind},
};

/// Binding power of operators, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    Lowest,
    Equals,
    LessGreater,
    Sum,
    Product,
    Prefix,
    Call,
    Index,
}

impl Precedence {
    fn of(kind: TokenKind) -> Self {
        match kind {
            TokenKind::Eq | TokenKind::NotEq => Self::Equals,
            TokenKind::Lt | TokenKind::Gt => Self::LessGreater,
            TokenKind::Plus | TokenKind::Minus => Self::Sum,
            TokenKind::Slash | TokenKind::Asterisk | TokenKind::Percent => Self::Product,
            TokenKind::LeftParen => Self::Call,
            TokenKind::LeftBracket => Self::Index,
            _ => Self::Lowest,
        }
    }
}

fn infix_operator(kind: TokenKind) -> Option<InfixOperator> {
    Some(match kind {
        TokenKind::Plus => InfixOperator::Plus,
        TokenKind::Minus => InfixOperator::Minus,
        TokenKind::Asterisk => InfixOperator::Asterisk,
        TokenKind::Slash => InfixOperator::Slash,
        TokenKind::Percent => InfixOperator::Percent,
        TokenKind::Lt => InfixOperator::Lt,
        TokenKind::Gt => InfixOperator::Gt,
        TokenKind::Eq => InfixOperator::Eq,
        TokenKind::NotEq => InfixOperator::NotEq,
        _ => return None,
    })
}

/// Every parse function hands back `None` after recording what went wrong.
type ParseResult<T> = Option<T>;

/// Pratt parser over a two-token window of the lexer's output.
///
/// Parsing never aborts: failures are collected and a best-effort tree is
/// returned alongside them, so callers must check the errors before
/// trusting the program.
pub struct Parser<'src> {
    lexer: Lexer<'src>,
    current: Token<'src>,
    next: Token<'src>,
    errors: Vec<String>,
}

impl<'src> Parser<'src> {
    pub fn new(mut lexer: Lexer<'src>) -> Self {
        let current = lexer.next_token();
        let next = lexer.next_token();

        Self { lexer, current, next, errors: Vec::new() }
    }

    pub fn parse_program(mut self) -> (Program, Vec<String>) {
        let mut statements = Vec::new();

        while self.current.kind != TokenKind::Eof {
            if let Some(statement) = self.parse_statement() {
                statements.push(statement);
            }
            self.advance();
        }

        if !self.errors.is_empty() {
            debug!(count = self.errors.len(), "parse finished with errors");
        }
        (Program { statements }, self.errors)
    }

    fn advance(&mut self) {
        self.current = mem::replace(&mut self.next, self.lexer.next_token());
    }

    /// Advances onto the next token if it has the expected kind, records an
    /// error otherwise.
    fn expect(&mut self, kind: TokenKind) -> ParseResult<()> {
        if self.next.kind == kind {
            self.advance();
            return Some(());
        }

        self.errors.push(format!("expected next token to be {}, got {} instead", kind, self.next.kind));
        None
    }

    fn skip_semicolon(&mut self) {
        if self.next.kind == TokenKind::Semicolon {
            self.advance();
        }
    }

    fn parse_statement(&mut self) -> ParseResult<Statement> {
        match self.current.kind {
            TokenKind::Let => self.parse_declaration(true),
            TokenKind::Const => self.parse_declaration(false),
            TokenKind::Return => self.parse_return(),
            TokenKind::While => self.parse_while(),
            TokenKind::Identifier if self.next.kind == TokenKind::Assign => self.parse_reassign(),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_declaration(&mut self, mutable: bool) -> ParseResult<Statement> {
        self.expect(TokenKind::Identifier)?;
        let name = self.current.lexeme.to_owned();
        self.expect(TokenKind::Assign)?;
        self.advance();

        let value = self.parse_expression(Precedence::Lowest)?;
        self.skip_semicolon();

        Some(Statement::Let { name, value, mutable })
    }

    fn parse_reassign(&mut self) -> ParseResult<Statement> {
        let name = self.current.lexeme.to_owned();
        self.expect(TokenKind::Assign)?;
        self.advance();

        let value = self.parse_expression(Precedence::Lowest)?;
        self.skip_semicolon();

        Some(Statement::Reassign { name, value })
    }

    fn parse_return(&mut self) -> ParseResult<Statement> {
        self.advance();

        let value = self.parse_expression(Precedence::Lowest)?;
        self.skip_semicolon();

        Some(Statement::Return(value))
    }

    fn parse_while(&mut self) -> ParseResult<Statement> {
        self.expect(TokenKind::LeftParen)?;
        self.advance();

        let condition = self.parse_expression(Precedence::Lowest)?;
        self.expect(TokenKind::RightParen)?;
        self.expect(TokenKind::LeftBrace)?;

        let body = self.parse_block();
        self.skip_semicolon();

        Some(Statement::While { condition, body })
    }

    fn parse_expression_statement(&mut self) -> ParseResult<Statement> {
        let expression = self.parse_expression(Precedence::Lowest)?;
        self.skip_semicolon();

        Some(Statement::Expression(expression))
    }

    /// Parses statements after the current `{` up to the matching `}`.
    ///
    /// Running out of input ends the block without complaint.
    fn parse_block(&mut self) -> Block {
        self.advance();

        let mut statements = Vec::new();
        while !matches!(self.current.kind, TokenKind::RightBrace | TokenKind::Eof) {
            if let Some(statement) = self.parse_statement() {
                statements.push(statement);
            }
            self.advance();
        }

        Block { statements }
    }

    fn parse_expression(&mut self, precedence: Precedence) -> ParseResult<Expression> {
        let mut left = self.parse_prefix()?;

        while precedence < Precedence::of(self.next.kind) {
            trace!(operator = %self.next.kind, "folding infix expression");
            self.advance();

            left = match self.current.kind {
                TokenKind::LeftParen => self.parse_call(left)?,
                TokenKind::LeftBracket => self.parse_index(left)?,
                kind => match infix_operator(kind) {
                    Some(operator) => self.parse_infix(left, operator)?,
                    None => return Some(left),
                },
            };
        }

        Some(left)
    }

    fn parse_prefix(&mut self) -> ParseResult<Expression> {
        match self.current.kind {
            TokenKind::Identifier => Some(Expression::Identifier(self.current.lexeme.to_owned())),
            TokenKind::Integer => self.parse_numeric_literal(),
            TokenKind::True => Some(Expression::Boolean(true)),
            TokenKind::False => Some(Expression::Boolean(false)),
            TokenKind::String => Some(self.parse_string_literal()),
            TokenKind::Bang => self.parse_prefix_operator(PrefixOperator::Bang),
            TokenKind::Minus => self.parse_prefix_operator(PrefixOperator::Minus),
            TokenKind::LeftParen => self.parse_grouped(),
            TokenKind::If => self.parse_if(),
            TokenKind::Function => self.parse_function_literal(),
            TokenKind::LeftBracket => self.parse_expression_list(TokenKind::RightBracket).map(Expression::Array),
            TokenKind::LeftBrace => self.parse_dictionary_literal(),
            kind => {
                self.errors.push(format!("no prefix parse function for {kind} found"));
                None
            }
        }
    }

    /// An integer lexeme followed by `.` and a second integer lexeme is fused
    /// into a single float literal.
    fn parse_numeric_literal(&mut self) -> ParseResult<Expression> {
        let whole = self.current.lexeme;

        if self.next.kind != TokenKind::Dot {
            return match whole.parse() {
                Ok(value) => Some(Expression::Integer(value)),
                Err(_) => {
                    self.errors.push(format!("could not parse {whole} as an integer"));
                    None
                }
            };
        }

        self.advance();
        self.advance();

        let fraction = self.current.lexeme;
        let parsed = match self.current.kind {
            TokenKind::Integer => format!("{whole}.{fraction}")
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite()),
            _ => None,
        };

        match parsed {
            Some(value) => Some(Expression::Float(value)),
            None => {
                self.errors.push(format!("could not parse {fraction} as a float"));
                None
            }
        }
    }

    fn parse_string_literal(&self) -> Expression {
        let lexeme = self.current.lexeme;
        Expression::String(lexeme[1..lexeme.len() - 1].to_owned())
    }

    fn parse_prefix_operator(&mut self, operator: PrefixOperator) -> ParseResult<Expression> {
        self.advance();

        let operand = self.parse_expression(Precedence::Prefix)?;
        Some(Expression::Prefix { operator, operand: Box::new(operand) })
    }

    fn parse_infix(&mut self, left: Expression, operator: InfixOperator) -> ParseResult<Expression> {
        let precedence = Precedence::of(self.current.kind);
        self.advance();

        let right = self.parse_expression(precedence)?;
        Some(Expression::Infix { left: Box::new(left), operator, right: Box::new(right) })
    }

    fn parse_grouped(&mut self) -> ParseResult<Expression> {
        self.advance();

        let expression = self.parse_expression(Precedence::Lowest)?;
        self.expect(TokenKind::RightParen)?;

        Some(expression)
    }

    fn parse_if(&mut self) -> ParseResult<Expression> {
        self.expect(TokenKind::LeftParen)?;
        self.advance();

        let condition = self.parse_expression(Precedence::Lowest)?;
        self.expect(TokenKind::RightParen)?;
        self.expect(TokenKind::LeftBrace)?;
        let consequence = self.parse_block();

        let alternative = if self.next.kind == TokenKind::Else {
            self.advance();
            self.expect(TokenKind::LeftBrace)?;
            Some(self.parse_block())
        } else {
            None
        };

        Some(Expression::If { condition: Box::new(condition), consequence, alternative })
    }

    fn parse_function_literal(&mut self) -> ParseResult<Expression> {
        self.expect(TokenKind::LeftParen)?;
        let parameters = self.parse_function_parameters()?;
        self.expect(TokenKind::LeftBrace)?;
        let body = self.parse_block();

        Some(Expression::Function(FunctionLiteral {
            parameters: parameters.into(),
            body: Rc::new(body),
        }))
    }

    fn parse_function_parameters(&mut self) -> ParseResult<Vec<String>> {
        let mut parameters = Vec::new();

        if self.next.kind == TokenKind::RightParen {
            self.advance();
            return Some(parameters);
        }

        self.expect(TokenKind::Identifier)?;
        parameters.push(self.current.lexeme.to_owned());

        while self.next.kind == TokenKind::Comma {
            self.advance();
            self.expect(TokenKind::Identifier)?;
            parameters.push(self.current.lexeme.to_owned());
        }

        self.expect(TokenKind::RightParen)?;
        Some(parameters)
    }

    fn parse_call(&mut self, callee: Expression) -> ParseResult<Expression> {
        let arguments = self.parse_expression_list(TokenKind::RightParen)?;
        Some(Expression::Call { callee: Box::new(callee), arguments })
    }

    fn parse_index(&mut self, collection: Expression) -> ParseResult<Expression> {
        self.advance();

        let index = self.parse_expression(Precedence::Lowest)?;
        self.expect(TokenKind::RightBracket)?;

        Some(Expression::Index { collection: Box::new(collection), index: Box::new(index) })
    }

    /// Comma separated expressions after the current opening delimiter.
    fn parse_expression_list(&mut self, end: TokenKind) -> ParseResult<Vec<Expression>> {
        let mut expressions = Vec::new();

        if self.next.kind == end {
            self.advance();
            return Some(expressions);
        }

        self.advance();
        expressions.push(self.parse_expression(Precedence::Lowest)?);

        while self.next.kind == TokenKind::Comma {
            self.advance();
            self.advance();
            expressions.push(self.parse_expression(Precedence::Lowest)?);
        }

        self.expect(end)?;
        Some(expressions)
    }

    fn parse_dictionary_literal(&mut self) -> ParseResult<Expression> {
        let mut entries = Vec::new();

        while self.next.kind != TokenKind::RightBrace {
            self.advance();
            let key = self.parse_expression(Precedence::Lowest)?;
            self.expect(TokenKind::Colon)?;
            self.advance();
            let value = self.parse_expression(Precedence::Lowest)?;
            entries.push((key, value));

            if self.next.kind != TokenKind::RightBrace {
                self.expect(TokenKind::Comma)?;
            }
        }

        self.expect(TokenKind::RightBrace)?;
        Some(Expression::Dictionary(entries))
    }
}

/// Lexes and parses a whole source unit.
pub fn parse(input: &str) -> (Program, Vec<String>) {
    Parser::new(Lexer::new(input)).parse_program()
}

#[cfg(test)]
mod tests {
    use anyhow::bail;
    use pretty_assertions::assert_eq;

    use super::*;

    fn parse_ok(input: &str) -> anyhow::Result<Program> {
        let (program, errors) = parse(input);
        if !errors.is_empty() {
            bail!("Parsing {:?} failed: {:?}", input, errors);
        }
        Ok(program)
    }

    fn single_expression(input: &str) -> anyhow::Result<Expression> {
        let mut program = parse_ok(input)?;
        match (program.statements.pop(), program.statements.is_empty()) {
            (Some(Statement::Expression(expression)), true) => Ok(expression),
            (statement, _) => bail!("Expected a single expression statement, got {:?}", statement),
        }
    }

    fn identifier(name: &str) -> Expression {
        Expression::Identifier(name.to_owned())
    }

    fn infix(left: Expression, operator: InfixOperator, right: Expression) -> Expression {
        Expression::Infix { left: Box::new(left), operator, right: Box::new(right) }
    }

    #[test]
    fn declarations() -> anyhow::Result<()> {
        let program = parse_ok("let x = 5; const y = true let foobar = y;")?;
        assert_eq!(program.statements, vec![
            Statement::Let { name: "x".into(), value: Expression::Integer(5), mutable: true },
            Statement::Let { name: "y".into(), value: Expression::Boolean(true), mutable: false },
            Statement::Let { name: "foobar".into(), value: identifier("y"), mutable: true },
        ]);
        Ok(())
    }

    #[test]
    fn reassignment_is_recognized_by_lookahead() -> anyhow::Result<()> {
        let program = parse_ok("x = x + 1; x == 1")?;
        assert_eq!(program.statements, vec![
            Statement::Reassign {
                name: "x".into(),
                value: infix(identifier("x"), InfixOperator::Plus, Expression::Integer(1)),
            },
            Statement::Expression(infix(identifier("x"), InfixOperator::Eq, Expression::Integer(1))),
        ]);
        Ok(())
    }

    #[test]
    fn return_and_while() -> anyhow::Result<()> {
        let program = parse_ok("while (i < 3) { i = i + 1; } return i;")?;
        assert_eq!(program.to_string(), "while ((i < 3)) { i = (i + 1); } return i;");

        let program = parse_ok("while (x) { x = false; }; x")?;
        assert_eq!(program.statements.len(), 2);
        Ok(())
    }

    #[test]
    fn operator_precedence() -> anyhow::Result<()> {
        let cases = [
            ("-a * b", "((-a) * b)"),
            ("!-a", "(!(-a))"),
            ("a + b + c", "((a + b) + c)"),
            ("a + b - c", "((a + b) - c)"),
            ("a * b * c", "((a * b) * c)"),
            ("a * b / c", "((a * b) / c)"),
            ("a + b / c", "(a + (b / c))"),
            ("2 * 3 % 4 * 2", "(((2 * 3) % 4) * 2)"),
            ("a + b * c + d / e - f", "(((a + (b * c)) + (d / e)) - f)"),
            ("5 > 4 == 3 < 4", "((5 > 4) == (3 < 4))"),
            ("5 < 4 != 3 > 4", "((5 < 4) != (3 > 4))"),
            ("3 + 4 * 5 == 3 * 1 + 4 * 5", "((3 + (4 * 5)) == ((3 * 1) + (4 * 5)))"),
            ("true", "true"),
            ("3 > 5 == false", "((3 > 5) == false)"),
            ("1 + (2 + 3) + 4", "((1 + (2 + 3)) + 4)"),
            ("(5 + 5) * 2", "((5 + 5) * 2)"),
            ("-(5 + 5)", "(-(5 + 5))"),
            ("!(true == true)", "(!(true == true))"),
            ("a + add(b * c) + d", "((a + add((b * c))) + d)"),
            ("add(a, b, 1, 2 * 3, 4 + 5, add(6, 7 * 8))", "add(a, b, 1, (2 * 3), (4 + 5), add(6, (7 * 8)))"),
            ("add(a + b + c * d / f + g)", "add((((a + b) + ((c * d) / f)) + g))"),
            ("a * [1, 2, 3, 4][b * c] * d", "((a * ([1, 2, 3, 4][(b * c)])) * d)"),
            ("add(a * b[2], b[1], 2 * [1, 2][1])", "add((a * (b[2])), (b[1]), (2 * ([1, 2][1])))"),
        ];

        for (input, expected) in cases {
            assert_eq!(single_expression(input)?.to_string(), expected, "input: {input}");
        }
        Ok(())
    }

    #[test]
    fn float_literals_are_fused_from_three_tokens() -> anyhow::Result<()> {
        assert_eq!(single_expression("3.25")?, Expression::Float(3.25));
        assert_eq!(single_expression("2.2 * 2")?, infix(Expression::Float(2.2), InfixOperator::Asterisk, Expression::Integer(2)));
        assert_eq!(single_expression("-1.5")?.to_string(), "(-1.5)");
        Ok(())
    }

    #[test]
    fn literals() -> anyhow::Result<()> {
        assert_eq!(single_expression("\"hello world\"")?, Expression::String("hello world".into()));
        assert_eq!(single_expression("[]")?, Expression::Array(vec![]));
        assert_eq!(single_expression("{}")?, Expression::Dictionary(vec![]));
        assert_eq!(
            single_expression("{\"one\": 1, two: 1 + 1, 3: [3]}")?.to_string(),
            "{\"one\": 1, two: (1 + 1), 3: [3]}"
        );
        Ok(())
    }

    #[test]
    fn if_expressions() -> anyhow::Result<()> {
        let expression = single_expression("if (x < y) { x } else { y }")?;
        assert_eq!(expression, Expression::If {
            condition: Box::new(infix(identifier("x"), InfixOperator::Lt, identifier("y"))),
            consequence: Block { statements: vec![Statement::Expression(identifier("x"))] },
            alternative: Some(Block { statements: vec![Statement::Expression(identifier("y"))] }),
        });

        let expression = single_expression("if (x) { x; }")?;
        assert!(matches!(expression, Expression::If { alternative: None, .. }));
        Ok(())
    }

    #[test]
    fn function_literals() -> anyhow::Result<()> {
        let expected = [("fn() {}", "fn() {}"), ("fn(x) {}", "fn(x) {}"), ("fn(x, y, z) { x + y; }", "fn(x, y, z) { (x + y); }")];
        for (input, rendered) in expected {
            assert_eq!(single_expression(input)?.to_string(), rendered);
        }

        match single_expression("fn(x, y) { return x; }")? {
            Expression::Function(literal) => assert_eq!(&*literal.parameters, ["x".to_owned(), "y".to_owned()]),
            other => bail!("Expected a function literal, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn calls_and_indexes() -> anyhow::Result<()> {
        assert_eq!(single_expression("fn(x) { x; }(5)")?.to_string(), "fn(x) { x; }(5)");
        assert_eq!(single_expression("f()()")?.to_string(), "f()()");
        assert_eq!(single_expression("a[0][1]")?.to_string(), "((a[0])[1])");
        Ok(())
    }

    #[test]
    fn unterminated_blocks_end_silently() -> anyhow::Result<()> {
        let program = parse_ok("let f = fn(x) { x + 1")?;
        assert_eq!(program.to_string(), "let f = fn(x) { (x + 1); };");
        Ok(())
    }

    #[test]
    fn errors_are_collected() {
        let (_, errors) = parse("let = 5; let x 5; let 838383;");
        assert_eq!(errors, vec![
            "expected next token to be IDENT, got = instead",
            "no prefix parse function for = found",
            "expected next token to be =, got INT instead",
            "expected next token to be IDENT, got INT instead",
        ]);
    }

    #[test]
    fn lexer_errors_surface_as_missing_prefix() {
        let (_, errors) = parse("1 + @");
        assert_eq!(errors, vec!["no prefix parse function for ERROR found"]);

        let (_, errors) = parse("\"open");
        assert_eq!(errors, vec!["no prefix parse function for ERROR found"]);
    }

    #[test]
    fn numeric_errors() {
        let (_, errors) = parse("99999999999999999999");
        assert_eq!(errors, vec!["could not parse 99999999999999999999 as an integer"]);

        let (_, errors) = parse("1.x");
        assert_eq!(errors, vec!["could not parse x as a float"]);

        let huge = format!("{}.5", "9".repeat(400));
        let (_, errors) = parse(&huge);
        assert_eq!(errors, vec!["could not parse 5 as a float"]);
    }

    #[test]
    fn dictionary_entries_need_separators() {
        let (_, errors) = parse("{1: 2 3: 4}");
        assert_eq!(errors.first().map(String::as_str), Some("expected next token to be ,, got INT instead"));
    }

    #[test]
    fn rendering_round_trips() -> anyhow::Result<()> {
        let sources = [
            "let add = fn(a, b) { return a + b; }; add(1, 2 * 3);",
            "const xs = [1, 2.5, \"three\", {\"k\": -4}]; xs[3][\"k\"];",
            "let i = 0; while (i < 10) { i = i + 1; if (i % 2 == 0) { puts(i) } else { 0 } }",
            "!(-a + b) * c(d)[e] / 1.0",
            "fn() {}()",
            "9223372036854775807.5",
            "if (x) { } else { if (y) { z } }",
        ];

        for source in sources {
            let program = parse_ok(source)?;
            let rendered = program.to_string();
            let reparsed = parse_ok(&rendered)?;
            assert_eq!(program, reparsed, "rendered as {rendered}");
        }
        Ok(())
    }
}
