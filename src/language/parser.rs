use crate::language::{
    ast::*,
    errors::SyntaxError,
    lexer::Lexer,
    span::Positioned,
    token::{KeywordTable, Token, TokenKind},
};
use std::rc::Rc;
use tracing::{debug, trace};

/// Identifiers newcomers from other languages reach for instead of `variable`.
const FOREIGN_DECLARATION_WORDS: &[&str] = &["constante", "const", "let", "var"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Lowest = 1,
    Equals,
    LessGreater,
    Sum,
    Product,
    Prefix,
    Call,
    // `o` and `y` bind tighter than calls.
    Or,
    And,
}

fn precedence_of(kind: TokenKind) -> Precedence {
    match kind {
        TokenKind::Eq | TokenKind::NotEq => Precedence::Equals,
        TokenKind::Lt | TokenKind::Gt | TokenKind::LtEq | TokenKind::GtEq => {
            Precedence::LessGreater
        }
        TokenKind::Plus
        | TokenKind::Minus
        | TokenKind::PlusEq
        | TokenKind::MinusEq
        | TokenKind::AsteriskEq
        | TokenKind::SlashEq => Precedence::Sum,
        TokenKind::Asterisk | TokenKind::Slash => Precedence::Product,
        TokenKind::LParen | TokenKind::LBracket | TokenKind::Dot => Precedence::Call,
        TokenKind::Or => Precedence::Or,
        TokenKind::And => Precedence::And,
        _ => Precedence::Lowest,
    }
}

fn has_prefix(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Ident
            | TokenKind::Number
            | TokenKind::String
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Bang
            | TokenKind::Minus
            | TokenKind::Not
            | TokenKind::LParen
            | TokenKind::LBracket
            | TokenKind::LBrace
            | TokenKind::If
            | TokenKind::While
            | TokenKind::Do
            | TokenKind::For
            | TokenKind::Function
    )
}

fn infix_operator(kind: TokenKind) -> Option<InfixOp> {
    let op = match kind {
        TokenKind::Plus => InfixOp::Add,
        TokenKind::Minus => InfixOp::Sub,
        TokenKind::Asterisk => InfixOp::Mul,
        TokenKind::Slash => InfixOp::Div,
        TokenKind::Lt => InfixOp::Lt,
        TokenKind::Gt => InfixOp::Gt,
        TokenKind::LtEq => InfixOp::LtEq,
        TokenKind::GtEq => InfixOp::GtEq,
        TokenKind::Eq => InfixOp::Eq,
        TokenKind::NotEq => InfixOp::NotEq,
        TokenKind::And => InfixOp::And,
        TokenKind::Or => InfixOp::Or,
        TokenKind::PlusEq => InfixOp::Compound(AssignOp::Add),
        TokenKind::MinusEq => InfixOp::Compound(AssignOp::Sub),
        TokenKind::AsteriskEq => InfixOp::Compound(AssignOp::Mul),
        TokenKind::SlashEq => InfixOp::Compound(AssignOp::Div),
        _ => return None,
    };
    Some(op)
}

fn has_infix(kind: TokenKind) -> bool {
    infix_operator(kind).is_some()
        || matches!(kind, TokenKind::LParen | TokenKind::LBracket | TokenKind::Dot)
}

fn assign_operator(kind: TokenKind) -> Option<AssignOp> {
    match kind {
        TokenKind::Assign => Some(AssignOp::Assign),
        TokenKind::PlusEq => Some(AssignOp::Add),
        TokenKind::MinusEq => Some(AssignOp::Sub),
        TokenKind::AsteriskEq => Some(AssignOp::Mul),
        TokenKind::SlashEq => Some(AssignOp::Div),
        _ => None,
    }
}

/// Pratt parser with two tokens of lookahead.
///
/// Parse functions return `None` after reporting an error; the caller moves on
/// to the next statement so that later errors are still collected.
pub struct Parser {
    lexer: Lexer,
    keywords: KeywordTable,
    current: Token,
    peek: Token,
    errors: Vec<SyntaxError>,
}

impl Parser {
    pub fn new(lexer: Lexer) -> Self {
        let keywords = lexer.keywords();
        let placeholder = Token::new(TokenKind::Eof, "", 1, 1);
        let mut parser = Self {
            lexer,
            keywords,
            current: placeholder.clone(),
            peek: placeholder,
            errors: Vec::new(),
        };
        parser.advance();
        parser.advance();
        parser
    }

    pub fn into_errors(self) -> Vec<SyntaxError> {
        self.errors
    }

    pub fn parse_program(&mut self) -> Program {
        let mut statements = Vec::new();
        while !self.current_is(TokenKind::Eof) {
            self.parse_statement_into(&mut statements);
            self.advance();
        }
        debug!(
            statements = statements.len(),
            errors = self.errors.len(),
            "parsed program"
        );
        Program { statements }
    }

    /// Returns `true` when recovery stopped on a `}` it did not consume.
    fn parse_statement_into(&mut self, statements: &mut Vec<Node>) -> bool {
        let reported = self.errors.len();
        match self.parse_statement() {
            Some(statement) => {
                statements.push(statement);
                false
            }
            None if self.errors.len() > reported => self.recover(),
            None => false,
        }
    }

    fn parse_statement(&mut self) -> Option<Node> {
        match self.current.kind {
            TokenKind::Semicolon => None,
            TokenKind::Let => self.parse_let(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Domain => self.parse_domain(),
            TokenKind::Ident if self.peek.kind.is_assignment() => self.parse_assignment(),
            TokenKind::Ident
                if self.peek_is(TokenKind::Ident)
                    && FOREIGN_DECLARATION_WORDS.contains(&self.current.literal.as_str()) =>
            {
                self.report_foreign_declaration();
                None
            }
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_let(&mut self) -> Option<Node> {
        let position = self.current.position();
        if self.peek_is_reserved() {
            let message = format!(
                "no se puede usar la palabra reservada '{}' como nombre de variable",
                self.peek.literal
            );
            self.report(SyntaxError::new(message, self.peek.position()));
            return None;
        }
        if !self.expect_peek(TokenKind::Ident) {
            return None;
        }
        let name = self.current_identifier();
        if !self.expect_peek(TokenKind::Assign) {
            return None;
        }
        self.advance();
        let mut value = self.parse_expression(Precedence::Lowest)?;
        if let NodeKind::Function(literal) = &mut value.kind {
            if let Some(literal) = Rc::get_mut(literal) {
                literal.name = Some(name.name.clone());
            }
        }
        self.skip_semicolon();
        Some(Node::new(
            NodeKind::Let {
                name,
                value: Box::new(value),
            },
            position,
        ))
    }

    fn parse_assignment(&mut self) -> Option<Node> {
        let position = self.current.position();
        let name = self.current_identifier();
        self.advance();
        let operator = assign_operator(self.current.kind)?;
        self.advance();
        let value = self.parse_expression(Precedence::Lowest)?;
        self.skip_semicolon();
        Some(Node::new(
            NodeKind::Assignment {
                name,
                operator,
                value: Box::new(value),
            },
            position,
        ))
    }

    fn parse_return(&mut self) -> Option<Node> {
        let position = self.current.position();
        self.advance();
        let value = self.parse_expression(Precedence::Lowest)?;
        self.skip_semicolon();
        Some(Node::new(
            NodeKind::Return {
                value: Box::new(value),
            },
            position,
        ))
    }

    fn parse_domain(&mut self) -> Option<Node> {
        let position = self.current.position();
        if self.peek_is_reserved() {
            let message = format!(
                "no se puede usar la palabra reservada '{}' como nombre de variable",
                self.peek.literal
            );
            self.report(SyntaxError::new(message, self.peek.position()));
            return None;
        }
        if !self.expect_peek(TokenKind::Ident) {
            return None;
        }
        let name = self.current_identifier();
        if !self.expect_peek(TokenKind::LBrace) {
            return None;
        }
        let body = self.parse_block()?;
        self.skip_semicolon();
        Some(Node::new(NodeKind::Domain { name, body }, position))
    }

    fn parse_expression_statement(&mut self) -> Option<Node> {
        let position = self.current.position();
        let expression = self.parse_expression(Precedence::Lowest)?;
        self.skip_semicolon();
        Some(Node::new(
            NodeKind::Expression(Box::new(expression)),
            position,
        ))
    }

    /// Parses statements up to the closing `}`. Expects `current` on the
    /// opening `{` and leaves it on the closing one.
    fn parse_block(&mut self) -> Option<Block> {
        let position = self.current.position();
        self.advance();
        let mut statements = Vec::new();
        while !self.current_is(TokenKind::RBrace) {
            if self.current_is(TokenKind::Eof) {
                self.report_expected(TokenKind::RBrace, &self.current.clone());
                return None;
            }
            if !self.parse_statement_into(&mut statements) {
                self.advance();
            }
        }
        Some(Block {
            statements,
            position,
        })
    }

    fn parse_expression(&mut self, precedence: Precedence) -> Option<Node> {
        trace!(
            kind = %self.current.kind,
            line = self.current.line,
            column = self.current.column,
            "parse_expression"
        );
        if !has_prefix(self.current.kind) {
            let message = format!(
                "no se encontró ninguna función de parseo para el token {}",
                self.current.literal
            );
            self.report(SyntaxError::new(message, self.current.position()));
            return None;
        }
        let mut left = self.parse_prefix()?;

        while !self.peek_is(TokenKind::Semicolon) && precedence < self.peek_precedence() {
            if !has_infix(self.peek.kind) {
                return Some(left);
            }
            self.advance();
            left = self.parse_infix(left)?;
        }
        Some(left)
    }

    fn parse_prefix(&mut self) -> Option<Node> {
        let position = self.current.position();
        match self.current.kind {
            TokenKind::Ident => Some(Node::new(
                NodeKind::Identifier(self.current.literal.clone()),
                position,
            )),
            TokenKind::Number => self.parse_number(),
            TokenKind::String => Some(Node::new(
                NodeKind::String(self.current.literal.clone()),
                position,
            )),
            TokenKind::True | TokenKind::False => Some(Node::new(
                NodeKind::Boolean(self.current_is(TokenKind::True)),
                position,
            )),
            TokenKind::Bang | TokenKind::Minus | TokenKind::Not => self.parse_prefix_operator(),
            TokenKind::LParen => self.parse_grouped(),
            TokenKind::LBracket => {
                let elements = self.parse_expression_list(TokenKind::RBracket)?;
                Some(Node::new(NodeKind::Array(elements), position))
            }
            TokenKind::LBrace => self.parse_dictionary(),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::Do => self.parse_do_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Function => self.parse_function(),
            _ => None,
        }
    }

    fn parse_infix(&mut self, left: Node) -> Option<Node> {
        let position = self.current.position();
        match self.current.kind {
            TokenKind::LParen => {
                let arguments = self.parse_expression_list(TokenKind::RParen)?;
                Some(Node::new(
                    NodeKind::Call {
                        callee: Box::new(left),
                        arguments,
                    },
                    position,
                ))
            }
            TokenKind::LBracket => {
                self.advance();
                let index = self.parse_expression(Precedence::Lowest)?;
                if !self.expect_peek(TokenKind::RBracket) {
                    return None;
                }
                Some(Node::new(
                    NodeKind::Index {
                        target: Box::new(left),
                        index: Box::new(index),
                    },
                    position,
                ))
            }
            TokenKind::Dot => {
                if !self.expect_peek(TokenKind::Ident) {
                    return None;
                }
                let property = self.current_identifier();
                Some(Node::new(
                    NodeKind::Member {
                        object: Box::new(left),
                        property,
                    },
                    position,
                ))
            }
            kind => {
                let operator = infix_operator(kind)?;
                let precedence = precedence_of(kind);
                self.advance();
                let right = self.parse_expression(precedence)?;
                Some(Node::new(
                    NodeKind::Infix {
                        left: Box::new(left),
                        operator,
                        right: Box::new(right),
                    },
                    position,
                ))
            }
        }
    }

    fn parse_number(&mut self) -> Option<Node> {
        match self.current.literal.parse::<f64>() {
            Ok(value) => Some(Node::new(NodeKind::Number(value), self.current.position())),
            Err(_) => {
                let message = format!(
                    "no se pudo interpretar {} como número",
                    self.current.literal
                );
                self.report(SyntaxError::new(message, self.current.position()));
                None
            }
        }
    }

    fn parse_prefix_operator(&mut self) -> Option<Node> {
        let position = self.current.position();
        let operator = match self.current.kind {
            TokenKind::Bang => PrefixOp::Bang,
            TokenKind::Not => PrefixOp::Not,
            _ => PrefixOp::Negate,
        };
        self.advance();
        let right = self.parse_expression(Precedence::Prefix)?;
        Some(Node::new(
            NodeKind::Prefix {
                operator,
                right: Box::new(right),
            },
            position,
        ))
    }

    fn parse_grouped(&mut self) -> Option<Node> {
        self.advance();
        let expression = self.parse_expression(Precedence::Lowest)?;
        if !self.expect_peek(TokenKind::RParen) {
            return None;
        }
        Some(expression)
    }

    /// Comma-separated expressions up to `end`. Expects `current` on the
    /// opening delimiter and leaves it on `end`.
    fn parse_expression_list(&mut self, end: TokenKind) -> Option<Vec<Node>> {
        let mut list = Vec::new();
        if self.peek_is(end) {
            self.advance();
            return Some(list);
        }
        self.advance();
        list.push(self.parse_list_element(end)?);
        while self.peek_is(TokenKind::Comma) {
            self.advance();
            self.advance();
            list.push(self.parse_list_element(end)?);
        }
        if !self.expect_peek(end) {
            return None;
        }
        Some(list)
    }

    /// A reserved word standing alone as an element is a misused name, even
    /// when it would otherwise start its own construct.
    fn parse_list_element(&mut self, end: TokenKind) -> Option<Node> {
        let is_value = matches!(self.current.kind, TokenKind::True | TokenKind::False);
        let stands_alone = self.peek_is(TokenKind::Comma) || self.peek_is(end);
        let misused = if has_prefix(self.current.kind) {
            !is_value && stands_alone
        } else {
            true
        };
        if misused && self.keywords.is_reserved(&self.current.literal) {
            let message = format!(
                "no se puede usar la palabra reservada {} como identificador",
                self.current.literal
            );
            self.report(SyntaxError::new(message, self.current.position()));
            return None;
        }
        self.parse_expression(Precedence::Lowest)
    }

    fn parse_dictionary(&mut self) -> Option<Node> {
        let position = self.current.position();
        let mut pairs = Vec::new();
        while !self.peek_is(TokenKind::RBrace) {
            self.advance();
            let key = self.parse_expression(Precedence::Lowest)?;
            if !self.expect_peek(TokenKind::Colon) {
                return None;
            }
            self.advance();
            let value = self.parse_expression(Precedence::Lowest)?;
            pairs.push((key, value));
            if !self.peek_is(TokenKind::RBrace) && !self.expect_peek(TokenKind::Comma) {
                return None;
            }
        }
        self.advance();
        Some(Node::new(NodeKind::Dictionary(pairs), position))
    }

    /// `(condition) {` followed by the block; leaves `current` on `}`.
    fn parse_condition_and_block(&mut self) -> Option<(Node, Block)> {
        if !self.expect_peek(TokenKind::LParen) {
            return None;
        }
        self.advance();
        let condition = self.parse_expression(Precedence::Lowest)?;
        if !self.expect_peek(TokenKind::RParen) {
            return None;
        }
        if !self.expect_peek(TokenKind::LBrace) {
            return None;
        }
        let block = self.parse_block()?;
        Some((condition, block))
    }

    fn parse_if(&mut self) -> Option<Node> {
        let position = self.current.position();
        let (condition, consequence) = self.parse_condition_and_block()?;

        let mut branches = Vec::new();
        while self.peek_is(TokenKind::ElseIf) {
            self.advance();
            let branch_position = self.current.position();
            let (branch_condition, branch_block) = self.parse_condition_and_block()?;
            branches.push((branch_position, branch_condition, branch_block));
        }

        let mut alternative = None;
        if self.peek_is(TokenKind::Else) {
            self.advance();
            if self.peek_is(TokenKind::If) {
                self.advance();
                alternative = Some(Box::new(self.parse_if()?));
            } else {
                if !self.expect_peek(TokenKind::LBrace) {
                    return None;
                }
                let block = self.parse_block()?;
                let block_position = block.position;
                alternative = Some(Box::new(Node::new(NodeKind::Block(block), block_position)));
            }
        }

        // Each `o_si` becomes an `If` nested in the alternative slot of the
        // previous branch; `si_no` sits innermost.
        for (branch_position, branch_condition, branch_block) in branches.into_iter().rev() {
            alternative = Some(Box::new(Node::new(
                NodeKind::If {
                    condition: Box::new(branch_condition),
                    consequence: branch_block,
                    alternative,
                },
                branch_position,
            )));
        }

        Some(Node::new(
            NodeKind::If {
                condition: Box::new(condition),
                consequence,
                alternative,
            },
            position,
        ))
    }

    fn parse_while(&mut self) -> Option<Node> {
        let position = self.current.position();
        let (condition, body) = self.parse_condition_and_block()?;
        Some(Node::new(
            NodeKind::While {
                condition: Box::new(condition),
                body,
            },
            position,
        ))
    }

    fn parse_do_while(&mut self) -> Option<Node> {
        let position = self.current.position();
        if !self.expect_peek(TokenKind::LBrace) {
            return None;
        }
        let body = self.parse_block()?;
        if !self.expect_peek(TokenKind::While) {
            return None;
        }
        self.advance();
        let condition = self.parse_expression(Precedence::Lowest)?;
        Some(Node::new(
            NodeKind::DoWhile {
                body,
                condition: Box::new(condition),
            },
            position,
        ))
    }

    fn parse_for(&mut self) -> Option<Node> {
        let position = self.current.position();
        if !self.expect_peek(TokenKind::LParen) {
            return None;
        }

        let mut initializer = None;
        if self.peek_is(TokenKind::Let) {
            self.advance();
            initializer = Some(Box::new(self.parse_let()?));
            if !self.current_is(TokenKind::Semicolon) && !self.expect_peek(TokenKind::Semicolon) {
                return None;
            }
        } else if !self.expect_peek(TokenKind::Semicolon) {
            return None;
        }

        let mut condition = None;
        if !self.peek_is(TokenKind::Semicolon) {
            self.advance();
            condition = Some(Box::new(self.parse_expression(Precedence::Lowest)?));
        }
        if !self.expect_peek(TokenKind::Semicolon) {
            return None;
        }

        let mut increment = None;
        if !self.peek_is(TokenKind::RParen) {
            self.advance();
            let node = if self.current_is(TokenKind::Ident) && self.peek.kind.is_assignment() {
                self.parse_assignment()?
            } else {
                self.parse_expression(Precedence::Lowest)?
            };
            increment = Some(Box::new(node));
        }
        if !self.expect_peek(TokenKind::RParen) {
            return None;
        }

        if !self.expect_peek(TokenKind::LBrace) {
            return None;
        }
        let body = self.parse_block()?;
        Some(Node::new(
            NodeKind::For {
                initializer,
                condition,
                increment,
                body,
            },
            position,
        ))
    }

    fn parse_function(&mut self) -> Option<Node> {
        let position = self.current.position();
        if !self.expect_peek(TokenKind::LParen) {
            return None;
        }
        let parameters = self.parse_parameters()?;
        if !self.expect_peek(TokenKind::LBrace) {
            return None;
        }
        let body = self.parse_block()?;
        let literal = FunctionLiteral {
            parameters,
            body,
            name: None,
            position,
        };
        Some(Node::new(NodeKind::Function(Rc::new(literal)), position))
    }

    fn parse_parameters(&mut self) -> Option<Vec<Identifier>> {
        let mut parameters = Vec::new();
        if self.peek_is(TokenKind::RParen) {
            self.advance();
            return Some(parameters);
        }
        self.advance();
        parameters.push(self.parse_parameter()?);
        while self.peek_is(TokenKind::Comma) {
            self.advance();
            self.advance();
            parameters.push(self.parse_parameter()?);
        }
        if !self.expect_peek(TokenKind::RParen) {
            return None;
        }
        Some(parameters)
    }

    fn parse_parameter(&mut self) -> Option<Identifier> {
        if self.current_is(TokenKind::Ident) {
            return Some(self.current_identifier());
        }
        let message = if self.keywords.is_reserved(&self.current.literal) {
            format!(
                "no se puede usar la palabra reservada '{}' como nombre de parámetro",
                self.current.literal
            )
        } else {
            format!(
                "se esperaba un nombre de parámetro pero se obtuvo {}",
                self.current.kind
            )
        };
        self.report(SyntaxError::new(message, self.current.position()));
        None
    }

    fn report_foreign_declaration(&mut self) {
        let word = self.current.literal.clone();
        let message = format!(
            "'{word}' no es una palabra clave válida para declarar variables. ¿Quisiste decir 'variable'?"
        );
        self.report(
            SyntaxError::new(message, self.current.position())
                .with_help(format!("escribe `variable {}` en su lugar", self.peek.literal)),
        );
    }

    /// Skips the rest of a broken statement, leaving `current` on its last
    /// token: a `;` at the statement's own nesting level, or the token before
    /// the `}` that closes the enclosing block. When the statement broke on
    /// that `}` itself, `current` stays on it and `true` is returned.
    fn recover(&mut self) -> bool {
        let broke_on_current = self
            .errors
            .last()
            .is_some_and(|err| err.position == self.current.position());
        if self.current_is(TokenKind::RBrace) && broke_on_current {
            trace!(
                line = self.current.line,
                column = self.current.column,
                "recovered on closing brace"
            );
            return true;
        }
        let mut depth = 0usize;
        while !self.current_is(TokenKind::Eof) {
            if depth == 0
                && (self.current_is(TokenKind::Semicolon)
                    || matches!(self.peek.kind, TokenKind::RBrace | TokenKind::Eof))
            {
                break;
            }
            self.advance();
            match self.current.kind {
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace => depth = depth.saturating_sub(1),
                _ => {}
            }
        }
        trace!(line = self.current.line, column = self.current.column, "recovered");
        false
    }

    fn current_identifier(&self) -> Identifier {
        Identifier {
            name: self.current.literal.clone(),
            position: self.current.position(),
        }
    }

    fn advance(&mut self) {
        let next = self.lexer.next_token();
        self.current = std::mem::replace(&mut self.peek, next);
    }

    fn current_is(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn peek_is(&self, kind: TokenKind) -> bool {
        self.peek.kind == kind
    }

    fn peek_is_reserved(&self) -> bool {
        self.peek.kind != TokenKind::Ident && self.keywords.is_reserved(&self.peek.literal)
    }

    fn peek_precedence(&self) -> Precedence {
        precedence_of(self.peek.kind)
    }

    fn skip_semicolon(&mut self) {
        if self.peek_is(TokenKind::Semicolon) {
            self.advance();
        }
    }

    fn expect_peek(&mut self, kind: TokenKind) -> bool {
        if self.peek_is(kind) {
            self.advance();
            true
        } else {
            let actual = self.peek.clone();
            self.report_expected(kind, &actual);
            false
        }
    }

    fn report_expected(&mut self, expected: TokenKind, actual: &Token) {
        let message = format!(
            "se esperaba que el siguiente token fuera {expected} pero se obtuvo {}",
            actual.kind
        );
        self.report(SyntaxError::new(message, actual.position()));
    }

    fn report(&mut self, err: SyntaxError) {
        debug!(
            line = err.position.line,
            column = err.position.column,
            message = %err.message,
            "parse error"
        );
        self.errors.push(err);
    }
}

/// Parses `source` with the standard keyword table.
pub fn parse_source(source: &str) -> (Program, Vec<SyntaxError>) {
    let mut parser = Parser::new(Lexer::new(source));
    let program = parser.parse_program();
    (program, parser.into_errors())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::span::Position;
    use pretty_assertions::assert_eq;

    fn parse_ok(source: &str) -> Program {
        let (program, errors) = parse_source(source);
        assert!(errors.is_empty(), "unexpected parse errors: {:?}", errors);
        program
    }

    fn messages(source: &str) -> Vec<String> {
        parse_source(source)
            .1
            .into_iter()
            .map(|err| err.message)
            .collect()
    }

    fn expression(node: &Node) -> &Node {
        match &node.kind {
            NodeKind::Expression(inner) => inner,
            other => panic!("expected expression statement, found {:?}", other),
        }
    }

    fn render(node: &Node) -> String {
        match &node.kind {
            NodeKind::Identifier(name) => name.clone(),
            NodeKind::Number(value) => format_number(*value),
            NodeKind::Boolean(true) => "verdadero".to_string(),
            NodeKind::Boolean(false) => "falso".to_string(),
            NodeKind::Prefix { operator, right } => format!("({}{})", operator, render(right)),
            NodeKind::Infix {
                left,
                operator,
                right,
            } => format!("({} {} {})", render(left), operator, render(right)),
            NodeKind::Call { callee, arguments } => {
                let args: Vec<String> = arguments.iter().map(render).collect();
                format!("{}({})", render(callee), args.join(", "))
            }
            NodeKind::Index { target, index } => format!("({}[{}])", render(target), render(index)),
            NodeKind::Member { object, property } => {
                format!("{}.{}", render(object), property.name)
            }
            other => format!("{:?}", other),
        }
    }

    #[test]
    fn let_statement_records_name_and_value() {
        let program = parse_ok("variable x = 5;");
        assert_eq!(program.statements.len(), 1);
        match &program.statements[0].kind {
            NodeKind::Let { name, value } => {
                assert_eq!(name.name, "x");
                assert_eq!(name.position, Position::new(1, 10));
                assert!(matches!(value.kind, NodeKind::Number(v) if v == 5.0));
            }
            other => panic!("expected let, found {:?}", other),
        }
    }

    #[test]
    fn operator_precedence_follows_the_table() {
        let cases = [
            ("-a * b", "((-a) * b)"),
            ("a + b * c", "(a + (b * c))"),
            ("a + b - c", "((a + b) - c)"),
            ("5 > 4 == 3 < 4", "((5 > 4) == (3 < 4))"),
            ("a * b[0]", "(a * (b[0]))"),
            ("suma(a, b * c)", "suma(a, (b * c))"),
            ("no verdadero", "(noverdadero)"),
            ("(a + b) * c", "((a + b) * c)"),
            ("calc.suma(1)", "calc.suma(1)"),
        ];
        for (source, expected) in cases {
            let program = parse_ok(source);
            let rendered = render(expression(&program.statements[0]));
            assert_eq!(rendered, expected, "source: {}", source);
        }
    }

    #[test]
    fn logical_operators_bind_tighter_than_comparison() {
        let program = parse_ok("a == b y c");
        assert_eq!(render(expression(&program.statements[0])), "(a == (b y c))");
    }

    #[test]
    fn compound_operator_parses_as_infix_in_expression_position() {
        let program = parse_ok("(i += 1)");
        match &expression(&program.statements[0]).kind {
            NodeKind::Infix { operator, .. } => {
                assert_eq!(*operator, InfixOp::Compound(AssignOp::Add))
            }
            other => panic!("expected infix, found {:?}", other),
        }
    }

    #[test]
    fn assignment_statements_keep_their_operator() {
        let program = parse_ok("x = 1; x += 2; x -= 3; x *= 4; x /= 5");
        let operators: Vec<AssignOp> = program
            .statements
            .iter()
            .map(|statement| match &statement.kind {
                NodeKind::Assignment { operator, .. } => *operator,
                other => panic!("expected assignment, found {:?}", other),
            })
            .collect();
        assert_eq!(
            operators,
            vec![
                AssignOp::Assign,
                AssignOp::Add,
                AssignOp::Sub,
                AssignOp::Mul,
                AssignOp::Div
            ]
        );
    }

    #[test]
    fn elseif_chain_nests_in_alternative_slot() {
        let program = parse_ok("si (a) { 1 } o_si (b) { 2 } o_si (c) { 3 } si_no { 4 }");
        let NodeKind::If { alternative, .. } = &expression(&program.statements[0]).kind else {
            panic!("expected if");
        };
        let first = alternative.as_ref().expect("first o_si");
        let NodeKind::If {
            condition,
            alternative,
            ..
        } = &first.kind
        else {
            panic!("expected nested if, found {:?}", first.kind);
        };
        assert_eq!(render(condition), "b");
        let second = alternative.as_ref().expect("second o_si");
        let NodeKind::If {
            condition,
            alternative,
            ..
        } = &second.kind
        else {
            panic!("expected nested if");
        };
        assert_eq!(render(condition), "c");
        let last = alternative.as_ref().expect("si_no block");
        assert!(matches!(last.kind, NodeKind::Block(ref block) if block.statements.len() == 1));
    }

    #[test]
    fn loops_parse_their_parts() {
        let program = parse_ok(
            "mientras (x < 3) { x = x + 1; } hacer { x = x - 1; } mientras (x > 0) \
             para (variable i = 0; i < 5; i += 1) { suma = suma + i; } para (;;) { 1 }",
        );
        assert_eq!(program.statements.len(), 4);
        assert!(matches!(
            expression(&program.statements[0]).kind,
            NodeKind::While { .. }
        ));
        assert!(matches!(
            expression(&program.statements[1]).kind,
            NodeKind::DoWhile { .. }
        ));
        match &expression(&program.statements[2]).kind {
            NodeKind::For {
                initializer,
                condition,
                increment,
                body,
            } => {
                assert!(matches!(
                    initializer.as_deref().map(|n| &n.kind),
                    Some(NodeKind::Let { .. })
                ));
                assert!(condition.is_some());
                assert!(matches!(
                    increment.as_deref().map(|n| &n.kind),
                    Some(NodeKind::Assignment { .. })
                ));
                assert_eq!(body.statements.len(), 1);
            }
            other => panic!("expected for, found {:?}", other),
        }
        match &expression(&program.statements[3]).kind {
            NodeKind::For {
                initializer,
                condition,
                increment,
                ..
            } => {
                assert!(initializer.is_none() && condition.is_none() && increment.is_none());
            }
            other => panic!("expected for, found {:?}", other),
        }
    }

    #[test]
    fn let_bound_function_records_its_name() {
        let program = parse_ok("variable suma = procedimiento(a, b) { regresa a + b; };");
        let NodeKind::Let { value, .. } = &program.statements[0].kind else {
            panic!("expected let");
        };
        let NodeKind::Function(literal) = &value.kind else {
            panic!("expected function literal");
        };
        assert_eq!(literal.name.as_deref(), Some("suma"));
        let names: Vec<&str> = literal.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn domain_and_dictionary_literals() {
        let program = parse_ok("dominio calc { variable pi = 3.14; } {'a': 1, 2: verdadero}");
        assert!(matches!(
            &program.statements[0].kind,
            NodeKind::Domain { name, body } if name.name == "calc" && body.statements.len() == 1
        ));
        assert!(matches!(
            &expression(&program.statements[1]).kind,
            NodeKind::Dictionary(pairs) if pairs.len() == 2
        ));
    }

    #[test]
    fn expect_peek_reports_token_kinds() {
        assert_eq!(
            messages("variable = 5;"),
            vec!["se esperaba que el siguiente token fuera IDENT pero se obtuvo ASSIGN"]
        );
        assert_eq!(
            messages("variable x 5;"),
            vec!["se esperaba que el siguiente token fuera ASSIGN pero se obtuvo NUM"]
        );
    }

    #[test]
    fn missing_prefix_handler_is_reported() {
        assert_eq!(
            messages("variable x = @;"),
            vec!["no se encontró ninguna función de parseo para el token @"]
        );
    }

    #[test]
    fn reserved_words_cannot_be_names() {
        assert_eq!(
            messages("variable si = 1;"),
            vec!["no se puede usar la palabra reservada 'si' como nombre de variable"]
        );
        assert_eq!(
            messages("variable f = procedimiento(regresa) { 1 };"),
            vec!["no se puede usar la palabra reservada 'regresa' como nombre de parámetro"]
        );
        assert_eq!(
            messages("[1, mientras]"),
            vec!["no se puede usar la palabra reservada mientras como identificador"]
        );
    }

    #[test]
    fn foreign_declaration_words_recover_and_keep_parsing() {
        let errors = messages("let x = 5; const k = 2; variable z = ; var w = 1;");
        assert_eq!(
            errors,
            vec![
                "'let' no es una palabra clave válida para declarar variables. ¿Quisiste decir 'variable'?",
                "'const' no es una palabra clave válida para declarar variables. ¿Quisiste decir 'variable'?",
                "no se encontró ninguna función de parseo para el token ;",
                "'var' no es una palabra clave válida para declarar variables. ¿Quisiste decir 'variable'?",
            ]
        );
    }

    #[test]
    fn foreign_declaration_inside_block_keeps_the_block() {
        let (program, errors) = parse_source("si (verdadero) { let x = 1 } 5;");
        assert_eq!(errors.len(), 1);
        assert_eq!(program.statements.len(), 2);
    }

    #[test]
    fn reserved_words_alone_in_a_list_are_misused_names() {
        assert_eq!(
            messages("[si, 2]"),
            vec!["no se puede usar la palabra reservada si como identificador"]
        );
        assert_eq!(
            messages("f(1, no)"),
            vec!["no se puede usar la palabra reservada no como identificador"]
        );
        parse_ok("[verdadero, falso, no falso, si (a) { 1 }]");
    }

    #[test]
    fn every_compound_operator_parses_in_expression_position() {
        let cases = [
            ("(i -= 1)", AssignOp::Sub),
            ("(i *= 2)", AssignOp::Mul),
            ("(i /= 2)", AssignOp::Div),
        ];
        for (source, expected) in cases {
            let program = parse_ok(source);
            match &expression(&program.statements[0]).kind {
                NodeKind::Infix { operator, .. } => {
                    assert_eq!(*operator, InfixOp::Compound(expected), "source: {}", source)
                }
                other => panic!("expected infix, found {:?}", other),
            }
        }
    }

    #[test]
    fn error_on_closing_brace_does_not_swallow_the_block() {
        let (program, errors) = parse_source("si (verdadero) { variable x = } 5;");
        assert_eq!(
            errors.into_iter().map(|err| err.message).collect::<Vec<_>>(),
            vec!["no se encontró ninguna función de parseo para el token }"]
        );
        assert_eq!(program.statements.len(), 2);
    }

    #[test]
    fn error_after_a_nested_block_still_recovers_to_the_statement_end() {
        let (program, errors) = parse_source("si (verdadero) { hacer { 1 } 5; 6 } 7;");
        assert_eq!(errors.len(), 1);
        assert_eq!(program.statements.len(), 2);
    }
}
