//! A small filter language over named fields.
//!
//! Expressions such as `name foo and (size > 2 or kind != bar)` are parsed
//! into a [`FilterAst`] and applied to arbitrary objects through the typed
//! accessors registered in a [`Scheme`]. [`Evaluator`] ties the two
//! together.
#![warn(missing_docs)]

#[macro_use]
mod lex;

mod ast;
mod evaluator;
mod op;
mod scheme;
mod split;
mod token;
mod tokenizer;

pub use self::{
    ast::{ComparisonExpr, Expr, FilterAst, FilterParser, ParseError, ParserSettings, Visitor},
    evaluator::{EvaluationError, Evaluator},
    lex::{LexError, LexErrorKind},
    op::{LogicalOp, OrderingOp},
    scheme::{Field, FieldRedefinitionError, FieldValue, Scheme, UnknownFieldError},
    split::{Chunk, Split, Splitter},
    token::{Token, TokenKind},
    tokenizer::{Tokenizer, DOUBLE_QUOTE},
};
