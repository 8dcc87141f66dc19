use super::{ComparisonExpr, Expr, FilterAst};
use crate::{
    lex::{LexError, LexErrorKind},
    op::LogicalOp,
    token::{Token, TokenKind},
    tokenizer::{Tokenizer, DOUBLE_QUOTE},
};
use serde::{Deserialize, Serialize};
use std::cmp::{max, min};
use std::error::Error;
use std::fmt::{self, Display, Formatter};

/// An opaque filter parsing error associated with the parsed input.
///
/// For now, you can just print it in a debug or a human-readable fashion.
#[derive(Debug, PartialEq)]
pub struct ParseError<'i> {
    /// The error that occurred when parsing the input
    pub(crate) kind: LexErrorKind,

    /// The input that caused the parse error
    pub(crate) input: &'i str,

    /// The line number on the input where the error occurred
    pub(crate) line_number: usize,

    /// The start of the bad input
    pub(crate) span_start: usize,

    /// The number of characters that span the bad input
    pub(crate) span_len: usize,
}

impl Error for ParseError<'_> {}

impl<'i> ParseError<'i> {
    /// Create a new ParseError for the input, LexErrorKind and span in the
    /// input.
    pub fn new(mut input: &'i str, (kind, span): LexError<'i>) -> Self {
        let input_range = input.as_ptr() as usize..=input.as_ptr() as usize + input.len();
        assert!(
            input_range.contains(&(span.as_ptr() as usize))
                && input_range.contains(&(span.as_ptr() as usize + span.len()))
        );
        let mut span_start = span.as_ptr() as usize - input.as_ptr() as usize;

        let (line_number, line_start) = input[..span_start]
            .match_indices('\n')
            .map(|(pos, _)| pos + 1)
            .scan(0, |line_number, line_start| {
                *line_number += 1;
                Some((*line_number, line_start))
            })
            .last()
            .unwrap_or_default();

        input = &input[line_start..];

        span_start -= line_start;
        let mut span_len = span.len();

        if let Some(line_end) = input.find('\n') {
            input = &input[..line_end];
            span_len = min(span_len, line_end - span_start);
        }

        ParseError {
            kind,
            input,
            line_number,
            span_start,
            span_len,
        }
    }

    /// What went wrong.
    pub fn kind(&self) -> &LexErrorKind {
        &self.kind
    }

    /// The line of input the error was found on.
    pub fn line(&self) -> &'i str {
        self.input
    }

    /// Zero-based line number of the error.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Byte range of the offending input within [`ParseError::line`].
    pub fn span(&self) -> std::ops::Range<usize> {
        self.span_start..self.span_start + self.span_len
    }
}

impl Display for ParseError<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Filter parsing error ({}:{}):",
            self.line_number + 1,
            self.span_start + 1
        )?;

        writeln!(f, "{}", self.input)?;

        for _ in 0..self.span_start {
            write!(f, " ")?;
        }

        for _ in 0..max(1, self.span_len) {
            write!(f, "^")?;
        }

        writeln!(f, " {}", self.kind)?;

        Ok(())
    }
}

/// Parser settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserSettings {
    /// Character delimiting quoted literals.
    /// Default: `"`
    pub quote: char,
    /// Maximum depth of nested parentheses.
    /// Default: 128
    pub nesting_limit: usize,
}

impl Default for ParserSettings {
    #[inline]
    fn default() -> Self {
        Self {
            quote: DOUBLE_QUOTE,
            nesting_limit: 128,
        }
    }
}

/// A structure used to drive parsing of an expression into a [`FilterAst`].
///
/// The grammar, loosest binding first:
///
/// ```text
/// expression := term (OR term)*
/// term       := factor (AND factor)*
/// factor     := '(' expression ')' | comparison
/// comparison := FIELD relop FIELD
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterParser {
    pub(crate) settings: ParserSettings,
}

impl FilterParser {
    /// Creates a new parser with default settings.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new parser with the specified settings.
    #[inline]
    pub fn with_settings(settings: ParserSettings) -> Self {
        Self { settings }
    }

    /// Retrieve parser settings.
    #[inline]
    pub fn settings(&self) -> &ParserSettings {
        &self.settings
    }

    /// Parses a filter expression into an AST form.
    ///
    /// An empty (or all-whitespace) expression parses into an empty tree.
    pub fn parse<'i>(&self, input: &'i str) -> Result<FilterAst, ParseError<'i>> {
        let mut tokenizer = Tokenizer::new(self.settings.quote);
        tokenizer
            .tokenize(input)
            .and_then(|()| self.parse_tokens(&mut tokenizer))
            .map_err(|err| ParseError::new(input, err))
    }

    /// Parses already tokenized input, starting at the tokenizer's cursor.
    ///
    /// Every remaining token must be consumed; there is no partial result.
    pub fn parse_tokens<'i>(
        &self,
        tokens: &mut Tokenizer<'i>,
    ) -> Result<FilterAst, LexError<'i>> {
        if !tokens.has_tokens() {
            return Ok(FilterAst::default());
        }

        let mut descent = Descent {
            tokens,
            nesting_limit: self.settings.nesting_limit,
            depth: 0,
        };
        let root = descent.expression()?;

        match descent.tokens.peek() {
            None => Ok(FilterAst::new(root)),
            Some(token) => Err(unexpected(token, "logical operator")),
        }
    }
}

fn unexpected<'i>(token: &Token<'i>, expected: &'static str) -> LexError<'i> {
    match token.kind {
        TokenKind::RightParen => (LexErrorKind::UnexpectedParenthesis, token.span),
        _ => (LexErrorKind::ExpectedName(expected), token.span),
    }
}

struct Descent<'t, 'i> {
    tokens: &'t mut Tokenizer<'i>,
    nesting_limit: usize,
    depth: usize,
}

impl<'t, 'i> Descent<'t, 'i> {
    fn end_of_input(&self, expected: &'static str) -> LexError<'i> {
        let input = self.tokens.expression();
        (LexErrorKind::ExpectedName(expected), &input[input.len()..])
    }

    fn eat_logical(&mut self, op: LogicalOp) -> bool {
        let matched = matches!(
            self.tokens.peek(),
            Some(Token { kind: TokenKind::Logical(next), .. }) if *next == op
        );
        if matched {
            self.tokens.advance();
        }
        matched
    }

    fn expression(&mut self) -> Result<Expr, LexError<'i>> {
        self.combine(LogicalOp::Or, Self::term)
    }

    fn term(&mut self) -> Result<Expr, LexError<'i>> {
        self.combine(LogicalOp::And, Self::factor)
    }

    fn combine(
        &mut self,
        op: LogicalOp,
        operand: fn(&mut Self) -> Result<Expr, LexError<'i>>,
    ) -> Result<Expr, LexError<'i>> {
        let mut lhs = operand(self)?;
        while self.eat_logical(op) {
            let rhs = operand(self)?;
            lhs = Expr::Logical {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn factor(&mut self) -> Result<Expr, LexError<'i>> {
        let open = match self.tokens.peek() {
            Some(token) if token.is(TokenKind::LeftParen) => token.span,
            _ => return self.comparison().map(Expr::Comparison),
        };
        self.tokens.advance();

        if self.depth == self.nesting_limit {
            return Err((
                LexErrorKind::NestingLimit {
                    limit: self.nesting_limit,
                },
                open,
            ));
        }

        self.depth += 1;
        let expr = self.expression()?;
        self.depth -= 1;

        match self.tokens.advance() {
            Some(token) if token.is(TokenKind::RightParen) => Ok(expr),
            Some(token) => Err(unexpected(token, "logical operator")),
            None => Err((LexErrorKind::UnmatchedParenthesis, open)),
        }
    }

    fn comparison(&mut self) -> Result<ComparisonExpr, LexError<'i>> {
        let field = self.field("field name")?;

        let op = match self.tokens.advance() {
            Some(Token {
                kind: TokenKind::Ordering(op),
                ..
            }) => *op,
            Some(token) => return Err(unexpected(token, "comparison operator")),
            None => return Err(self.end_of_input("comparison operator")),
        };

        let literal = self.field("literal")?;

        Ok(ComparisonExpr { field, op, literal })
    }

    fn field(&mut self, expected: &'static str) -> Result<String, LexError<'i>> {
        match self.tokens.advance() {
            Some(token) if token.is(TokenKind::Field) => Ok(token.text.to_string()),
            Some(token) => Err(unexpected(token, expected)),
            None => Err(self.end_of_input(expected)),
        }
    }
}
