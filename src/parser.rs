use std::fmt;
use std::sync::Arc;

use log::{debug, trace};

use crate::ast::{Ast, BinaryOp, NodeId, NodeKind, UnaryOp};
use crate::token::{Span, Token, TokenKind};

/// Deepest expression or block nesting the parser will descend into.
pub const MAX_NESTING_DEPTH: usize = 128;

/// The construct being parsed when an error was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context {
    Statement,
    Package,
    Import,
    Function,
    Parameters,
    Return,
    If,
    Switch,
    Case,
    For,
    Assignment,
    Expression,
    Call,
    Grouping,
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Statement => "statement",
            Self::Package => "package declaration",
            Self::Import => "import declaration",
            Self::Function => "function definition",
            Self::Parameters => "parameter list",
            Self::Return => "return statement",
            Self::If => "if statement",
            Self::Switch => "switch statement",
            Self::Case => "switch clause",
            Self::For => "for loop",
            Self::Assignment => "assignment",
            Self::Expression => "expression",
            Self::Call => "call arguments",
            Self::Grouping => "parenthesized expression",
        };
        f.write_str(text)
    }
}

/// Classifies a parser error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// A specific token or construct was required here.
    UnexpectedToken { expected: String, found: TokenKind },
    /// Input ended before the `end` closing a block.
    UnterminatedBlock { opened_at: Span },
    /// No expression can start with the current token.
    MalformedExpression { found: TokenKind },
    /// Left side of `:=` is not a name or member access.
    InvalidAssignmentTarget,
    /// Expressions or blocks nest deeper than [`MAX_NESTING_DEPTH`].
    NestingTooDeep { limit: usize },
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedToken { expected, found } => {
                write!(f, "expected {expected}, found {found}")
            }
            Self::UnterminatedBlock { .. } => write!(f, "block is never closed with 'end'"),
            Self::MalformedExpression { found } => {
                write!(f, "expected expression, found {found}")
            }
            Self::InvalidAssignmentTarget => write!(f, "invalid assignment target"),
            Self::NestingTooDeep { limit } => {
                write!(f, "nesting exceeds {limit} levels")
            }
        }
    }
}

/// Error produced during parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{source_id}:{}:{}: {kind} in {context}", span.line, span.column)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub context: Context,
    pub span: Span,
    pub source_id: Arc<str>,
}

/// Parse a token stream into an AST rooted at a `Program` node.
///
/// Syntax errors do not stop the parse: each malformed statement is
/// reported, skipped up to the next statement boundary (or past the
/// matching `end` when it opened a block), and left out of the tree. The returned AST always has a root.
#[must_use]
pub fn produce_ast(tokens: &[Token]) -> (Ast, Vec<ParseError>) {
    Parser::new(tokens).parse()
}

struct Parser<'a> {
    tokens: Vec<&'a Token>,
    /// Returned once the cursor runs past the last token.
    eof: Token,
    pos: usize,
    depth: usize,
    ast: Ast,
    errors: Vec<ParseError>,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        let eof = tokens.last().map_or_else(
            || Token {
                kind: TokenKind::EndOfInput,
                lexeme: String::new(),
                line: 1,
                column_start: 1,
                column_end: 1,
                position_start: 0,
                position_end: 0,
                source_id: Arc::from(""),
                message: None,
            },
            |last| Token {
                kind: TokenKind::EndOfInput,
                lexeme: String::new(),
                line: last.line,
                column_start: last.column_end,
                column_end: last.column_end,
                position_start: last.position_end,
                position_end: last.position_end,
                source_id: Arc::clone(&last.source_id),
                message: None,
            },
        );

        Self {
            // Unknown tokens were already reported by the lexer.
            tokens: tokens
                .iter()
                .filter(|token| token.kind != TokenKind::Unknown)
                .collect(),
            eof,
            pos: 0,
            depth: 0,
            ast: Ast::new(),
            errors: Vec::new(),
        }
    }

    fn parse(mut self) -> (Ast, Vec<ParseError>) {
        let start = self.current().span();
        let mut statements = Vec::new();

        while !self.at_eof() {
            self.statement_or_recover(&mut statements);
        }

        let span = start.merge(self.current().span());
        let root = self.ast.push(NodeKind::Program, span, statements);
        self.ast.set_root(root);

        debug!(
            "{}: parsed {} node(s), {} error(s)",
            self.eof.source_id,
            self.ast.len(),
            self.errors.len()
        );
        (self.ast, self.errors)
    }

    // -- Cursor --

    fn current(&self) -> &Token {
        match self.tokens.get(self.pos) {
            Some(&token) => token,
            None => &self.eof,
        }
    }

    fn kind(&self) -> TokenKind {
        self.current().kind
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.kind() == kind
    }

    fn at_eof(&self) -> bool {
        self.at(TokenKind::EndOfInput)
    }

    /// Step past the current token and return its span.
    fn advance(&mut self) -> Span {
        let span = self.current().span();
        if self.pos < self.tokens.len() && !self.at_eof() {
            self.pos += 1;
        }
        span
    }

    fn previous_span(&self) -> Span {
        self.pos
            .checked_sub(1)
            .and_then(|index| self.tokens.get(index))
            .map_or_else(|| self.current().span(), |token| token.span())
    }

    fn eat(&mut self, kind: TokenKind) -> Option<Span> {
        self.at(kind).then(|| self.advance())
    }

    fn expect(&mut self, kind: TokenKind, context: Context) -> Result<Span, ParseError> {
        if self.at(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(kind.to_string(), context))
        }
    }

    fn expect_identifier(&mut self, context: Context) -> Result<(String, Span), ParseError> {
        if self.at(TokenKind::Identifier) {
            let name = self.current().lexeme.clone();
            Ok((name, self.advance()))
        } else {
            Err(self.unexpected("identifier", context))
        }
    }

    /// Consume the `end` closing a block opened at `opened_at`.
    ///
    /// A missing `end` is recorded rather than returned so the caller
    /// keeps the partially built node.
    fn expect_end(&mut self, opened_at: Span, context: Context) -> Span {
        if self.at(TokenKind::End) {
            return self.advance();
        }
        let err = self.error_at(
            ParseErrorKind::UnterminatedBlock { opened_at },
            context,
            opened_at,
        );
        self.report(err);
        self.previous_span()
    }

    // -- Errors and recovery --

    fn error_at(&self, kind: ParseErrorKind, context: Context, span: Span) -> ParseError {
        ParseError {
            kind,
            context,
            span,
            source_id: Arc::clone(&self.current().source_id),
        }
    }

    fn error_here(&self, kind: ParseErrorKind, context: Context) -> ParseError {
        self.error_at(kind, context, self.current().span())
    }

    fn unexpected(&self, expected: impl Into<String>, context: Context) -> ParseError {
        self.error_here(
            ParseErrorKind::UnexpectedToken {
                expected: expected.into(),
                found: self.kind(),
            },
            context,
        )
    }

    fn report(&mut self, err: ParseError) {
        trace!("{err}");
        self.errors.push(err);
    }

    /// Skip to the next statement boundary after an error.
    fn synchronize(&mut self) {
        loop {
            match self.kind() {
                TokenKind::Semicolon => {
                    self.advance();
                    return;
                }
                TokenKind::EndOfInput
                | TokenKind::End
                | TokenKind::Elif
                | TokenKind::Else
                | TokenKind::Case
                | TokenKind::Default => return,
                kind if kind.starts_statement() => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    /// Move past the `end` matching the block opener at token `start`.
    ///
    /// Nested openers are counted, so a dropped statement takes its
    /// whole body with it. Without a matching `end` the rest of the
    /// input is skipped.
    fn skip_block(&mut self, start: usize) {
        let mut open = 0_usize;
        let mut index = start;

        while let Some(token) = self.tokens.get(index) {
            index += 1;
            if token.kind.opens_block() {
                open += 1;
            } else if token.kind == TokenKind::End {
                open = open.saturating_sub(1);
                if open == 0 {
                    break;
                }
            }
        }
        trace!("skipped block body up to token {index}");
        self.pos = self.pos.max(index);
    }

    fn enter(&mut self, context: Context) -> Result<(), ParseError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(self.error_here(
                ParseErrorKind::NestingTooDeep {
                    limit: MAX_NESTING_DEPTH,
                },
                context,
            ));
        }
        self.depth += 1;
        Ok(())
    }

    const fn leave(&mut self) {
        self.depth -= 1;
    }

    // -- Statements --

    fn statement_or_recover(&mut self, statements: &mut Vec<NodeId>) {
        let start = self.pos;
        let nodes_before = self.ast.len();
        let opens_block = self.kind().opens_block();

        match self.parse_statement() {
            Ok(Some(id)) => statements.push(id),
            Ok(None) => {}
            Err(err) => {
                self.report(err);
                self.ast.truncate(nodes_before);
                if opens_block {
                    self.skip_block(start);
                } else {
                    self.synchronize();
                }
                if self.pos == start {
                    self.advance();
                }
            }
        }
    }

    fn parse_statement(&mut self) -> Result<Option<NodeId>, ParseError> {
        let node = match self.kind() {
            TokenKind::Semicolon => {
                self.advance();
                return Ok(None);
            }
            TokenKind::Package => self.parse_package()?,
            TokenKind::Import => self.parse_import()?,
            TokenKind::Def => self.parse_function()?,
            TokenKind::Return => self.parse_return()?,
            TokenKind::If => self.parse_if()?,
            TokenKind::Switch => self.parse_switch()?,
            TokenKind::For => self.parse_for()?,
            kind if kind.starts_expression() => self.parse_simple_statement()?,
            _ => return Err(self.unexpected("statement", Context::Statement)),
        };
        self.eat(TokenKind::Semicolon);
        Ok(Some(node))
    }

    /// Statements up to (not including) one of `terminators`.
    fn parse_block(
        &mut self,
        terminators: &[TokenKind],
        context: Context,
    ) -> Result<NodeId, ParseError> {
        self.enter(context)?;
        let start = self.current().span();
        let mut statements = Vec::new();

        while !self.at_eof() && !terminators.contains(&self.kind()) {
            self.statement_or_recover(&mut statements);
        }
        self.leave();

        let span = match (statements.first(), statements.last()) {
            (Some(&first), Some(&last)) => self.ast.span(first).merge(self.ast.span(last)),
            _ => Span {
                end: start.start,
                ..start
            },
        };
        Ok(self.ast.push(NodeKind::Block, span, statements))
    }

    fn parse_package(&mut self) -> Result<NodeId, ParseError> {
        let start = self.advance();
        let path = self.parse_path(Context::Package)?;
        let span = start.merge(self.ast.span(path));
        Ok(self.ast.push(NodeKind::Package, span, vec![path]))
    }

    fn parse_import(&mut self) -> Result<NodeId, ParseError> {
        let start = self.advance();
        let path = if self.at(TokenKind::String) {
            let value = self.current().string_value().to_string();
            let span = self.advance();
            self.ast
                .push(NodeKind::StringLiteral(value), span, Vec::new())
        } else {
            self.parse_path(Context::Import)?
        };
        let span = start.merge(self.ast.span(path));
        Ok(self.ast.push(NodeKind::Import, span, vec![path]))
    }

    /// `name ('.' name)*` as an identifier wrapped in member accesses.
    fn parse_path(&mut self, context: Context) -> Result<NodeId, ParseError> {
        let (name, span) = self.expect_identifier(context)?;
        let mut path = self.ast.push(NodeKind::Identifier(name), span, Vec::new());

        while self.eat(TokenKind::Dot).is_some() {
            let (name, name_span) = self.expect_identifier(context)?;
            let span = self.ast.span(path).merge(name_span);
            path = self.ast.push(NodeKind::Member(name), span, vec![path]);
        }
        Ok(path)
    }

    fn parse_function(&mut self) -> Result<NodeId, ParseError> {
        let start = self.advance();
        let (name, name_span) = self.expect_identifier(Context::Function)?;
        let name = self
            .ast
            .push(NodeKind::Identifier(name), name_span, Vec::new());
        let parameters = self.parse_parameters()?;
        let mut children = vec![name, parameters];

        if let Some(arrow) = self.eat(TokenKind::Arrow) {
            let (ty, ty_span) = self.expect_identifier(Context::Function)?;
            let ty = self.ast.push(NodeKind::Identifier(ty), ty_span, Vec::new());
            let return_type = self
                .ast
                .push(NodeKind::ReturnType, arrow.merge(ty_span), vec![ty]);
            children.push(return_type);
        }

        children.push(self.parse_block(&[TokenKind::End], Context::Function)?);
        let end = self.expect_end(start, Context::Function);
        Ok(self
            .ast
            .push(NodeKind::Function, start.merge(end), children))
    }

    fn parse_parameters(&mut self) -> Result<NodeId, ParseError> {
        let open = self.expect(TokenKind::OpenParen, Context::Parameters)?;
        let mut parameters = Vec::new();

        if !self.at(TokenKind::CloseParen) {
            loop {
                parameters.push(self.parse_parameter()?);
                if self.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
        }

        let close = self.expect(TokenKind::CloseParen, Context::Parameters)?;
        Ok(self
            .ast
            .push(NodeKind::Parameters, open.merge(close), parameters))
    }

    fn parse_parameter(&mut self) -> Result<NodeId, ParseError> {
        let (name, mut span) = self.expect_identifier(Context::Parameters)?;
        let mut children = Vec::new();

        if self.eat(TokenKind::Colon).is_some() {
            let (ty, ty_span) = self.expect_identifier(Context::Parameters)?;
            children.push(self.ast.push(NodeKind::Identifier(ty), ty_span, Vec::new()));
            span = span.merge(ty_span);
        }
        Ok(self.ast.push(NodeKind::Parameter(name), span, children))
    }

    fn parse_return(&mut self) -> Result<NodeId, ParseError> {
        let mut span = self.advance();
        let mut children = Vec::new();

        if self.kind().starts_expression() {
            let value = self.parse_expression(Context::Return)?;
            span = span.merge(self.ast.span(value));
            children.push(value);
        }
        Ok(self.ast.push(NodeKind::Return, span, children))
    }

    fn parse_if(&mut self) -> Result<NodeId, ParseError> {
        const BRANCH_END: [TokenKind; 3] = [TokenKind::End, TokenKind::Elif, TokenKind::Else];

        let start = self.advance();
        let condition = self.parse_expression(Context::If)?;
        let body = self.parse_block(&BRANCH_END, Context::If)?;
        let mut children = vec![condition, body];

        while let Some(elif) = self.eat(TokenKind::Elif) {
            let condition = self.parse_expression(Context::If)?;
            let body = self.parse_block(&BRANCH_END, Context::If)?;
            let span = elif.merge(self.ast.span(body));
            children.push(self.ast.push(NodeKind::Elif, span, vec![condition, body]));
        }

        if let Some(else_span) = self.eat(TokenKind::Else) {
            let body = self.parse_block(&[TokenKind::End], Context::If)?;
            let span = else_span.merge(self.ast.span(body));
            children.push(self.ast.push(NodeKind::Else, span, vec![body]));
        }

        let end = self.expect_end(start, Context::If);
        Ok(self.ast.push(NodeKind::If, start.merge(end), children))
    }

    fn parse_switch(&mut self) -> Result<NodeId, ParseError> {
        let start = self.advance();
        let subject = self.parse_expression(Context::Switch)?;
        let mut children = vec![subject];
        let mut seen_default = false;

        loop {
            match self.kind() {
                TokenKind::Case | TokenKind::Default => {
                    if seen_default {
                        let err = self.unexpected("'end' after 'default' clause", Context::Switch);
                        self.report(err);
                    }
                    seen_default |= self.at(TokenKind::Default);
                    children.push(self.parse_clause()?);
                }
                TokenKind::End | TokenKind::EndOfInput => break,
                _ => {
                    let err = self.unexpected("'case', 'default' or 'end'", Context::Switch);
                    self.report(err);
                    while !matches!(
                        self.kind(),
                        TokenKind::Case
                            | TokenKind::Default
                            | TokenKind::End
                            | TokenKind::EndOfInput
                    ) {
                        self.advance();
                    }
                }
            }
        }

        let end = self.expect_end(start, Context::Switch);
        Ok(self
            .ast
            .push(NodeKind::Switch, start.merge(end), children))
    }

    /// `case value: block` or `default: block`.
    fn parse_clause(&mut self) -> Result<NodeId, ParseError> {
        const CLAUSE_END: [TokenKind; 3] = [TokenKind::Case, TokenKind::Default, TokenKind::End];

        let is_default = self.at(TokenKind::Default);
        let start = self.advance();
        let mut children = Vec::new();

        if !is_default {
            children.push(self.parse_expression(Context::Case)?);
        }
        self.expect(TokenKind::Colon, Context::Case)?;
        let body = self.parse_block(&CLAUSE_END, Context::Case)?;
        children.push(body);

        let kind = if is_default {
            NodeKind::Default
        } else {
            NodeKind::Case
        };
        let span = start.merge(self.ast.span(body));
        Ok(self.ast.push(kind, span, children))
    }

    fn parse_for(&mut self) -> Result<NodeId, ParseError> {
        let start = self.advance();
        let (name, name_span) = self.expect_identifier(Context::For)?;
        let variable = self
            .ast
            .push(NodeKind::Identifier(name), name_span, Vec::new());
        self.expect(TokenKind::Colon, Context::For)?;
        let iterable = self.parse_expression(Context::For)?;
        let body = self.parse_block(&[TokenKind::End], Context::For)?;
        let end = self.expect_end(start, Context::For);
        Ok(self.ast.push(
            NodeKind::For,
            start.merge(end),
            vec![variable, iterable, body],
        ))
    }

    /// An expression, optionally followed by `:= value`.
    fn parse_simple_statement(&mut self) -> Result<NodeId, ParseError> {
        let target = self.parse_expression(Context::Expression)?;
        if !self.at(TokenKind::Assign) {
            return Ok(target);
        }

        if !matches!(
            self.ast.kind(target),
            NodeKind::Identifier(_) | NodeKind::Member(_)
        ) {
            return Err(self.error_at(
                ParseErrorKind::InvalidAssignmentTarget,
                Context::Assignment,
                self.ast.span(target),
            ));
        }

        self.advance();
        let value = self.parse_expression(Context::Assignment)?;
        let span = self.ast.span(target).merge(self.ast.span(value));
        Ok(self.ast.push(NodeKind::Assign, span, vec![target, value]))
    }

    // -- Expressions --

    fn parse_expression(&mut self, context: Context) -> Result<NodeId, ParseError> {
        self.parse_binary(0, context)
    }

    /// Precedence climbing: fold operators binding at least `min_bp`.
    fn parse_binary(&mut self, min_bp: u8, context: Context) -> Result<NodeId, ParseError> {
        self.enter(context)?;
        let result = self.parse_binary_operands(min_bp, context);
        self.leave();
        result
    }

    fn parse_binary_operands(&mut self, min_bp: u8, context: Context) -> Result<NodeId, ParseError> {
        let mut lhs = self.parse_unary(context)?;

        while let Some((kind, left_bp, right_bp)) = infix_binding_power(self.kind()) {
            if left_bp < min_bp {
                break;
            }
            self.advance();
            let rhs = self.parse_binary(right_bp, context)?;
            let span = self.ast.span(lhs).merge(self.ast.span(rhs));
            lhs = self.ast.push(kind, span, vec![lhs, rhs]);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self, context: Context) -> Result<NodeId, ParseError> {
        let Some(start) = self.eat(TokenKind::Minus) else {
            return self.parse_postfix(context);
        };

        self.enter(context)?;
        let operand = self.parse_unary(context);
        self.leave();
        let operand = operand?;

        let span = start.merge(self.ast.span(operand));
        Ok(self
            .ast
            .push(NodeKind::Unary(UnaryOp::Negate), span, vec![operand]))
    }

    fn parse_postfix(&mut self, context: Context) -> Result<NodeId, ParseError> {
        let mut expr = self.parse_primary(context)?;

        loop {
            match self.kind() {
                TokenKind::OpenParen => {
                    self.advance();
                    let mut children = vec![expr];
                    if !self.at(TokenKind::CloseParen) {
                        loop {
                            children.push(self.parse_expression(Context::Call)?);
                            if self.eat(TokenKind::Comma).is_none() {
                                break;
                            }
                        }
                    }
                    let close = self.expect(TokenKind::CloseParen, Context::Call)?;
                    let span = self.ast.span(expr).merge(close);
                    expr = self.ast.push(NodeKind::Call, span, children);
                }
                TokenKind::Dot => {
                    self.advance();
                    let (name, name_span) = self.expect_identifier(context)?;
                    let span = self.ast.span(expr).merge(name_span);
                    expr = self.ast.push(NodeKind::Member(name), span, vec![expr]);
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_primary(&mut self, context: Context) -> Result<NodeId, ParseError> {
        let kind = match self.kind() {
            TokenKind::Number => NodeKind::Number(self.current().lexeme.clone()),
            TokenKind::String => NodeKind::StringLiteral(self.current().string_value().to_string()),
            TokenKind::True => NodeKind::Boolean(true),
            TokenKind::False => NodeKind::Boolean(false),
            TokenKind::Identifier => NodeKind::Identifier(self.current().lexeme.clone()),
            TokenKind::OpenParen => return self.parse_group(),
            found => {
                return Err(self.error_here(ParseErrorKind::MalformedExpression { found }, context));
            }
        };
        let span = self.advance();
        Ok(self.ast.push(kind, span, Vec::new()))
    }

    fn parse_group(&mut self) -> Result<NodeId, ParseError> {
        let open = self.advance();
        let inner = self.parse_expression(Context::Grouping)?;
        let close = self.expect(TokenKind::CloseParen, Context::Grouping)?;
        Ok(self
            .ast
            .push(NodeKind::Group, open.merge(close), vec![inner]))
    }
}

/// Node kind and (left, right) binding powers of an infix operator.
///
/// Left-associative tiers use `right = left + 1`; `**` is the only
/// right-associative operator.
fn infix_binding_power(kind: TokenKind) -> Option<(NodeKind, u8, u8)> {
    let (node, left, right) = match kind {
        TokenKind::Caret => (NodeKind::Binary(BinaryOp::BitXor), 1, 2),
        TokenKind::Lt => (NodeKind::Binary(BinaryOp::Less), 3, 4),
        TokenKind::Gt => (NodeKind::Binary(BinaryOp::Greater), 3, 4),
        TokenKind::LessEqual => (NodeKind::Binary(BinaryOp::LessEqual), 3, 4),
        TokenKind::GreaterEqual => (NodeKind::Binary(BinaryOp::GreaterEqual), 3, 4),
        TokenKind::Equal => (NodeKind::Binary(BinaryOp::Equal), 3, 4),
        TokenKind::Range => (NodeKind::Range, 5, 6),
        TokenKind::Plus => (NodeKind::Binary(BinaryOp::Add), 7, 8),
        TokenKind::Minus => (NodeKind::Binary(BinaryOp::Subtract), 7, 8),
        TokenKind::Mul => (NodeKind::Binary(BinaryOp::Multiply), 9, 10),
        TokenKind::Div => (NodeKind::Binary(BinaryOp::Divide), 9, 10),
        TokenKind::Modulus => (NodeKind::Binary(BinaryOp::Modulo), 9, 10),
        TokenKind::Power => (NodeKind::Binary(BinaryOp::Power), 12, 11),
        _ => return None,
    };
    Some((node, left, right))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse_input(input: &str) -> (Ast, Vec<ParseError>) {
        let (tokens, _) = tokenize(input, "test");
        produce_ast(&tokens)
    }

    fn parse_ok(input: &str) -> Ast {
        let (ast, errors) = parse_input(input);
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        ast
    }

    /// Compact rendering: operators as heads, leaves as their text.
    fn sexpr(ast: &Ast, id: NodeId) -> String {
        let node = ast.node(id);
        let head = match &node.kind {
            NodeKind::Number(text) | NodeKind::Identifier(text) => return text.clone(),
            NodeKind::StringLiteral(text) => return format!("{text:?}"),
            NodeKind::Boolean(value) => return value.to_string(),
            NodeKind::Binary(op) => op.to_string(),
            NodeKind::Unary(op) => op.to_string(),
            other => other.to_string(),
        };
        let children: Vec<String> = node.children.iter().map(|&c| sexpr(ast, c)).collect();
        if children.is_empty() {
            format!("({head})")
        } else {
            format!("({head} {})", children.join(" "))
        }
    }

    fn expr(input: &str) -> String {
        let ast = parse_ok(input);
        sexpr(&ast, ast.statements()[0])
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        assert_eq!(expr("1 + 2 * 3"), "(+ 1 (* 2 3))");
    }

    #[test]
    fn subtraction_is_left_associative() {
        assert_eq!(expr("1 - 2 - 3"), "(- (- 1 2) 3)");
    }

    #[test]
    fn power_is_right_associative() {
        assert_eq!(expr("2 ** 3 ** 2"), "(** 2 (** 3 2))");
        assert_eq!(expr("2 * 3 ** 2"), "(* 2 (** 3 2))");
    }

    #[test]
    fn unary_minus_binds_tighter_than_power() {
        assert_eq!(expr("-2 ** 2"), "(** (- 2) 2)");
    }

    #[test]
    fn range_sits_between_comparison_and_additive() {
        assert_eq!(expr("1 + 2 .. 3 * 4"), "(Range (+ 1 2) (* 3 4))");
        assert_eq!(expr("a < 1 .. 2"), "(< a (Range 1 2))");
    }

    #[test]
    fn caret_is_loosest() {
        assert_eq!(expr("a == b ^ c"), "(^ (== a b) c)");
    }

    #[test]
    fn parentheses_reset_precedence() {
        assert_eq!(expr("(1 + 2) * 3"), "(* (Group (+ 1 2)) 3)");
    }

    #[test]
    fn calls_and_members() {
        assert_eq!(expr("io.print(1, x)"), "(Call (Member(print) io) 1 x)");
        assert_eq!(expr("f()"), "(Call f)");
        assert_eq!(expr("-f(1)"), "(- (Call f 1))");
    }

    #[test]
    fn assignment() {
        assert_eq!(expr("x := 1 + 2"), "(Assign x (+ 1 2))");
    }

    #[test]
    fn literals() {
        assert_eq!(expr("\"hi\""), "\"hi\"");
        assert_eq!(expr("true"), "true");
        assert_eq!(expr("3.5"), "3.5");
    }

    #[test]
    fn function_definition() {
        let ast = parse_ok("def add(a: int, b) -> int\n  return a + b\nend\n");
        assert_eq!(
            sexpr(&ast, ast.statements()[0]),
            "(Function add (Parameters (Parameter(a) int) (Parameter(b))) \
             (ReturnType int) (Block (Return (+ a b))))"
        );
    }

    #[test]
    fn if_elif_else_chain() {
        let ast = parse_ok("if x < 1\n  a := 1\nelif x < 2\n  a := 2\nelse\n  a := 3\nend");
        assert_eq!(
            sexpr(&ast, ast.statements()[0]),
            "(If (< x 1) (Block (Assign a 1)) (Elif (< x 2) (Block (Assign a 2))) \
             (Else (Block (Assign a 3))))"
        );
    }

    #[test]
    fn switch_with_default() {
        let ast = parse_ok("switch x\ncase 1:\n  y := 1\ncase 2:\ndefault:\n  y := 0\nend");
        assert_eq!(
            sexpr(&ast, ast.statements()[0]),
            "(Switch x (Case 1 (Block (Assign y 1))) (Case 2 (Block)) \
             (Default (Block (Assign y 0))))"
        );
    }

    #[test]
    fn for_loop_over_range() {
        let ast = parse_ok("for i : 0..10\n  total := total + i\nend");
        assert_eq!(
            sexpr(&ast, ast.statements()[0]),
            "(For i (Range 0 10) (Block (Assign total (+ total i))))"
        );
    }

    #[test]
    fn package_and_imports() {
        let ast = parse_ok("package galaxy.core;\nimport io\nimport \"lib/math\"");
        assert_eq!(
            sexpr(&ast, ast.statements()[0]),
            "(Package (Member(core) galaxy))"
        );
        assert_eq!(sexpr(&ast, ast.statements()[1]), "(Import io)");
        assert_eq!(sexpr(&ast, ast.statements()[2]), "(Import \"lib/math\")");
    }

    #[test]
    fn malformed_statement_is_skipped() {
        let (ast, errors) = parse_input("x := ;\ny := 2\nz := 3\n");
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors[0].kind,
            ParseErrorKind::MalformedExpression {
                found: TokenKind::Semicolon
            }
        ));
        assert_eq!(errors[0].context, Context::Assignment);
        assert_eq!(ast.statements().len(), 2);
        assert_eq!(sexpr(&ast, ast.statements()[0]), "(Assign y 2)");
    }

    #[test]
    fn dropped_statement_leaves_no_orphans() {
        let (ast, errors) = parse_input("x := 1 + ;");
        assert_eq!(errors.len(), 1);
        // Only the Program root remains.
        assert_eq!(ast.len(), 1);
    }

    #[test]
    fn missing_end_keeps_partial_function() {
        let (ast, errors) = parse_input("def main()\n  x := 1\n");
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors[0].kind,
            ParseErrorKind::UnterminatedBlock { opened_at } if opened_at.line == 1
        ));
        assert_eq!(errors[0].context, Context::Function);
        assert_eq!(ast.statements().len(), 1);
        assert_eq!(ast.kind(ast.statements()[0]), &NodeKind::Function);
    }

    #[test]
    fn stray_end_at_top_level() {
        let (ast, errors) = parse_input("end\nx := 1");
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors[0].kind,
            ParseErrorKind::UnexpectedToken {
                found: TokenKind::End,
                ..
            }
        ));
        assert_eq!(ast.statements().len(), 1);
    }

    #[test]
    fn invalid_assignment_target() {
        let (ast, errors) = parse_input("1 := 2\ny := 3");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ParseErrorKind::InvalidAssignmentTarget);
        assert_eq!(ast.statements().len(), 1);
    }

    #[test]
    fn error_inside_block_recovers_locally() {
        let (ast, errors) = parse_input("def f()\n  x := )\n  y := 1\nend\nz := 2");
        assert_eq!(errors.len(), 1);
        assert_eq!(ast.statements().len(), 2);
        assert_eq!(
            sexpr(&ast, ast.statements()[0]),
            "(Function f (Parameters) (Block (Assign y 1)))"
        );
    }

    #[test]
    fn deep_nesting_is_reported() {
        let input = format!("{}1{}", "(".repeat(1000), ")".repeat(1000));
        let (ast, errors) = parse_input(&input);
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].kind,
            ParseErrorKind::NestingTooDeep {
                limit: MAX_NESTING_DEPTH
            }
        );
        assert!(ast.statements().is_empty());
    }

    #[test]
    fn unknown_tokens_are_ignored() {
        let (tokens, lex_errors) = tokenize("x := {1}", "test");
        assert_eq!(lex_errors.len(), 2);
        let (ast, errors) = produce_ast(&tokens);
        assert!(errors.is_empty());
        assert_eq!(sexpr(&ast, ast.statements()[0]), "(Assign x 1)");
    }

    #[test]
    fn token_slice_without_end_of_input() {
        let (mut tokens, _) = tokenize("x := 1", "test");
        tokens.pop();
        let (ast, errors) = produce_ast(&tokens);
        assert!(errors.is_empty());
        assert_eq!(ast.statements().len(), 1);
    }

    #[test]
    fn empty_token_slice() {
        let (ast, errors) = produce_ast(&[]);
        assert!(errors.is_empty());
        assert!(ast.root().is_some());
        assert!(ast.statements().is_empty());
    }

    #[test]
    fn error_display_includes_location_and_context() {
        let (_, errors) = parse_input("def 5()\nend");
        assert_eq!(
            errors[0].to_string(),
            "test:1:5: expected identifier, found number in function definition"
        );
    }
}
