use crate::{
    lex::LexError,
    split::Splitter,
    token::{Token, TokenKind},
};

const PARENTHESES: &[char] = &['(', ')'];

/// Default quote character.
pub const DOUBLE_QUOTE: char = '"';

/// Turns an expression into a sequence of [`Token`]s and lets a parser walk
/// over it with a cursor.
#[derive(Debug, Clone)]
pub struct Tokenizer<'i> {
    quote: char,
    expression: &'i str,
    tokens: Vec<Token<'i>>,
    current: usize,
}

impl Default for Tokenizer<'_> {
    fn default() -> Self {
        Tokenizer::new(DOUBLE_QUOTE)
    }
}

impl<'i> Tokenizer<'i> {
    /// Creates an empty tokenizer quoting with `quote`.
    pub fn new(quote: char) -> Self {
        Tokenizer {
            quote,
            expression: "",
            tokens: Vec::new(),
            current: 0,
        }
    }

    /// Tokenizes `expression`, replacing any previous tokens and rewinding
    /// the cursor.
    ///
    /// Whenever a field token directly follows another field token, an `==`
    /// token is inserted between them, so `name value` reads as
    /// `name == value`.
    ///
    /// On error no tokens are retained.
    pub fn tokenize(&mut self, expression: &'i str) -> Result<(), LexError<'i>> {
        self.expression = expression;
        self.tokens.clear();
        self.reset();

        let tokens = Splitter::new(PARENTHESES, self.quote)
            .split(expression)
            .map(|chunk| chunk.map(Token::classify))
            .collect::<Result<Vec<_>, _>>()?;

        self.tokens = insert_implicit_equality(tokens);
        Ok(())
    }

    /// The last expression passed to [`Tokenizer::tokenize`].
    pub fn expression(&self) -> &'i str {
        self.expression
    }

    /// All tokens of the current expression, regardless of the cursor.
    pub fn tokens(&self) -> &[Token<'i>] {
        &self.tokens
    }

    /// Checks whether any tokens remain past the cursor.
    pub fn has_tokens(&self) -> bool {
        self.current < self.tokens.len()
    }

    /// Returns the token under the cursor without consuming it.
    pub fn peek(&self) -> Option<&Token<'i>> {
        self.tokens.get(self.current)
    }

    /// Returns the token under the cursor and moves past it.
    pub fn advance(&mut self) -> Option<&Token<'i>> {
        let token = self.tokens.get(self.current)?;
        self.current += 1;
        Some(token)
    }

    /// Moves the cursor back to the first token.
    pub fn reset(&mut self) {
        self.current = 0;
    }
}

fn insert_implicit_equality<'i>(tokens: Vec<Token<'i>>) -> Vec<Token<'i>> {
    let len = tokens.len();
    tokens
        .into_iter()
        .fold(Vec::with_capacity(len), |mut res, token| {
            let after_field = res.last().map_or(false, |prev: &Token<'_>| {
                prev.is(TokenKind::Field)
            });
            if after_field && token.is(TokenKind::Field) {
                res.push(Token::implicit_equal(&token));
            }
            res.push(token);
            res
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        lex::LexErrorKind,
        op::{LogicalOp, OrderingOp},
    };

    fn kinds(expression: &str) -> Vec<TokenKind> {
        let mut tokenizer = Tokenizer::default();
        tokenizer.tokenize(expression).unwrap();
        tokenizer.tokens().iter().map(|token| token.kind).collect()
    }

    fn texts(expression: &str) -> Vec<String> {
        let mut tokenizer = Tokenizer::default();
        tokenizer.tokenize(expression).unwrap();
        tokenizer
            .tokens()
            .iter()
            .map(|token| token.text.to_string())
            .collect()
    }

    const EQ: TokenKind = TokenKind::Ordering(OrderingOp::Equal);
    const FIELD: TokenKind = TokenKind::Field;

    #[test]
    fn test_parentheses_split() {
        assert_eq!(texts("(x"), vec!["(", "x"]);
        assert_eq!(texts("(a b)or(c d)").len(), 11);
        assert_eq!(
            kinds("(a b)"),
            vec![TokenKind::LeftParen, FIELD, EQ, FIELD, TokenKind::RightParen]
        );
    }

    #[test]
    fn test_implicit_equality() {
        assert_eq!(kinds("field_a foo"), vec![FIELD, EQ, FIELD]);
        assert_eq!(texts("field_a foo"), vec!["field_a", "==", "foo"]);
        assert_eq!(kinds("field_a == foo"), vec![FIELD, EQ, FIELD]);
        assert_eq!(
            kinds("field_a neq foo"),
            vec![FIELD, TokenKind::Ordering(OrderingOp::NotEqual), FIELD]
        );
        assert_eq!(kinds("a b c"), vec![FIELD, EQ, FIELD, EQ, FIELD]);
        assert_eq!(
            kinds("a b and c d"),
            vec![
                FIELD,
                EQ,
                FIELD,
                TokenKind::Logical(LogicalOp::And),
                FIELD,
                EQ,
                FIELD
            ]
        );
        // parentheses break adjacency
        assert_eq!(
            kinds("a) (b"),
            vec![FIELD, TokenKind::RightParen, TokenKind::LeftParen, FIELD]
        );
    }

    #[test]
    fn test_implicit_equality_span() {
        let mut tokenizer = Tokenizer::default();
        tokenizer.tokenize("name value").unwrap();

        let eq = &tokenizer.tokens()[1];
        assert_eq!(eq.span, "");
        assert_eq!(
            eq.span.as_ptr() as usize - tokenizer.expression().as_ptr() as usize,
            5
        );
    }

    #[test]
    fn test_quoted_tokens() {
        assert_eq!(kinds(r#"field_a "and""#), vec![FIELD, EQ, FIELD]);
        assert_eq!(texts(r#"field_a "foo foo""#), vec!["field_a", "==", "foo foo"]);
        assert_eq!(kinds(r#""(" == ")""#), vec![FIELD, EQ, FIELD]);
    }

    #[test]
    fn test_custom_quote() {
        let mut tokenizer = Tokenizer::new('\'');
        tokenizer.tokenize(r#"a == 'b c' or a == "d""#).unwrap();

        let texts = tokenizer
            .tokens()
            .iter()
            .map(|token| token.text.as_ref())
            .collect::<Vec<_>>();
        assert_eq!(texts, vec!["a", "==", "b c", "or", "a", "==", r#""d""#]);
    }

    #[test]
    fn test_cursor() {
        let mut tokenizer = Tokenizer::default();
        tokenizer.tokenize("a > 1").unwrap();

        assert!(tokenizer.has_tokens());
        assert_eq!(tokenizer.peek().unwrap().text, "a");
        assert_eq!(tokenizer.advance().unwrap().text, "a");
        assert_eq!(tokenizer.advance().unwrap().text, ">");
        assert_eq!(tokenizer.peek().unwrap().text, "1");
        assert_eq!(tokenizer.advance().unwrap().text, "1");
        assert!(!tokenizer.has_tokens());
        assert_eq!(tokenizer.peek(), None);
        assert_eq!(tokenizer.advance(), None);

        tokenizer.reset();
        assert_eq!(tokenizer.peek().unwrap().text, "a");

        tokenizer.advance();
        tokenizer.tokenize("b").unwrap();
        assert_eq!(tokenizer.tokens().len(), 1);
        assert_eq!(tokenizer.advance().unwrap().text, "b");
    }

    #[test]
    fn test_empty() {
        assert!(kinds("").is_empty());
        assert!(kinds(" \t ").is_empty());
    }

    #[test]
    fn test_missing_ending_quote() {
        let mut tokenizer = Tokenizer::default();
        tokenizer.tokenize("a b").unwrap();

        assert_eq!(
            tokenizer.tokenize(r#"a "b"#),
            Err((LexErrorKind::MissingEndingQuote, r#""b"#))
        );
        assert!(tokenizer.tokens().is_empty());
        assert!(!tokenizer.has_tokens());
    }
}
