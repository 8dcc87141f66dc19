use crate::{
    lex::{complete, Lex},
    op::{LogicalOp, OrderingOp},
    split::Chunk,
};
use serde::Serialize;
use std::borrow::Cow;

/// Lexical category of a [`Token`].
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize)]
pub enum TokenKind {
    /// `and` / `or` and their symbol forms
    Logical(LogicalOp),
    /// A relational operator
    Ordering(OrderingOp),
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// A field name or a literal value; which one is decided by position.
    Field,
}

impl TokenKind {
    /// Maps a lexeme onto the operator vocabulary.
    ///
    /// Matching is exact and case-sensitive; anything else is a
    /// [`TokenKind::Field`].
    pub fn classify(text: &str) -> Self {
        match text {
            "(" => TokenKind::LeftParen,
            ")" => TokenKind::RightParen,
            _ => {
                if let Ok(op) = complete(LogicalOp::lex(text)) {
                    TokenKind::Logical(op)
                } else if let Ok(op) = complete(OrderingOp::lex(text)) {
                    TokenKind::Ordering(op)
                } else {
                    TokenKind::Field
                }
            }
        }
    }
}

/// A classified lexical unit of a filter expression.
#[derive(Debug, PartialEq, Eq, Clone, Serialize)]
pub struct Token<'i> {
    /// Category of the token.
    pub kind: TokenKind,
    /// Literal text, quotes stripped and escapes resolved.
    pub text: Cow<'i, str>,
    /// Where the token was found in the expression.
    #[serde(skip)]
    pub span: &'i str,
}

impl<'i> Token<'i> {
    /// Classifies a chunk. Quoted chunks are always [`TokenKind::Field`].
    pub fn classify(chunk: Chunk<'i>) -> Self {
        let kind = if chunk.quoted {
            TokenKind::Field
        } else {
            TokenKind::classify(&chunk.text)
        };

        Token {
            kind,
            text: chunk.text,
            span: chunk.span,
        }
    }

    /// An `==` token that does not appear in the source; it is located at
    /// the start of `next`.
    pub(crate) fn implicit_equal(next: &Token<'i>) -> Self {
        Token {
            kind: TokenKind::Ordering(OrderingOp::Equal),
            text: Cow::Borrowed(OrderingOp::Equal.symbol()),
            span: &next.span[..0],
        }
    }

    /// Checks the category of the token.
    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }
}

#[test]
fn test_classify() {
    use LogicalOp::*;
    use OrderingOp::*;

    let cases = [
        ("and", TokenKind::Logical(And)),
        ("&&", TokenKind::Logical(And)),
        ("or", TokenKind::Logical(Or)),
        ("||", TokenKind::Logical(Or)),
        ("eq", TokenKind::Ordering(Equal)),
        ("==", TokenKind::Ordering(Equal)),
        ("neq", TokenKind::Ordering(NotEqual)),
        ("!=", TokenKind::Ordering(NotEqual)),
        ("gt", TokenKind::Ordering(GreaterThan)),
        (">", TokenKind::Ordering(GreaterThan)),
        ("lt", TokenKind::Ordering(LessThan)),
        ("<", TokenKind::Ordering(LessThan)),
        ("geq", TokenKind::Ordering(GreaterThanEqual)),
        (">=", TokenKind::Ordering(GreaterThanEqual)),
        ("leq", TokenKind::Ordering(LessThanEqual)),
        ("<=", TokenKind::Ordering(LessThanEqual)),
        ("(", TokenKind::LeftParen),
        (")", TokenKind::RightParen),
    ];

    for (text, kind) in cases {
        assert_eq!(TokenKind::classify(text), kind, "{text:?}");
    }

    for text in ["AND", "andy", "=", ">==", "equal", "field_a", "1.23"] {
        assert_eq!(TokenKind::classify(text), TokenKind::Field, "{text:?}");
    }
}

#[test]
fn test_quoted_operator_is_field() {
    let token = Token::classify(Chunk {
        quoted: true,
        position: 0,
        span: "\"and\"",
        text: Cow::Borrowed("and"),
    });

    assert!(token.is(TokenKind::Field));
    assert_eq!(token.text, "and");
}
