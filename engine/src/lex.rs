use thiserror::Error;

#[derive(Debug, PartialEq, Eq, Clone, Error)]
/// LexErrorKind occurs when an expression cannot be turned into a filter.
pub enum LexErrorKind {
    /// Expected the next token to be of the named category
    #[error("expected {0}")]
    ExpectedName(&'static str),

    /// Expected the next token to be a literal
    #[error("expected literal {0:?}")]
    ExpectedLiteral(&'static str),

    /// A quoted span was opened but never closed
    #[error("could not find an ending quote")]
    MissingEndingQuote,

    /// An opening parenthesis has no matching closing one
    #[error("unmatched opening parenthesis")]
    UnmatchedParenthesis,

    /// A closing parenthesis appeared without an opener
    #[error("unexpected closing parenthesis")]
    UnexpectedParenthesis,

    /// Parentheses are nested deeper than the parser allows
    #[error("parentheses nested deeper than {limit} levels")]
    NestingLimit {
        /// The configured maximum depth
        limit: usize,
    },

    /// End Of File
    #[error("unrecognised input")]
    EOF,
}

/// An error kind paired with the input it occurred at.
pub type LexError<'i> = (LexErrorKind, &'i str);

pub type LexResult<'i, T> = Result<(T, &'i str), LexError<'i>>;

pub trait Lex<'i>: Sized {
    fn lex(input: &'i str) -> LexResult<'i, Self>;
}

pub fn expect<'i>(input: &'i str, s: &'static str) -> Result<&'i str, LexError<'i>> {
    if let Some(rest) = input.strip_prefix(s) {
        Ok(rest)
    } else {
        Err((LexErrorKind::ExpectedLiteral(s), input))
    }
}

/// This macro generates enum declaration + lexer implementation.
///
/// It works by recursively processing variants one by one, while passing
/// around intermediate state (partial declaration and lexer bodies).
///
/// Alternatives are tried in declaration order and the first prefix match
/// wins, so longer spellings must come before their own prefixes.
macro_rules! lex_enum {
    // Branch for handling `"some_string" | "other_string" => VariantName`.
    // (also supports optional constant value via `... => VariantName = 42`)
    //
    // Creates a unit variant `VariantName`.
    //
    // On the parser side, tries to parse either of the given string values,
    // and returns the variant if any of them succeeded.
    (@decl $preamble:tt $name:ident $input:ident { $($decl:tt)* } { $($expr:tt)* } {
        $(#[$meta:meta])* $($s:literal)|+ => $item:ident $(= $value:expr)*,
        $($rest:tt)*
    }) => {
        lex_enum!(@decl $preamble $name $input {
            $($decl)*
            $(#[$meta])*
            $item $(= $value)*,
        } {
            $($expr)*
            $(if let Ok($input) = $crate::lex::expect($input, $s) {
                return Ok(($name::$item, $input));
            })+
        } { $($rest)* });
    };

    // Internal finish point for declaration + lexer generation.
    //
    // This is invoked when no more variants are left to process.
    // At this point declaration and lexer body are considered complete.
    (@decl { $($preamble:tt)* } $name:ident $input:ident $decl:tt { $($expr:stmt)* } {}) => {
        #[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, ::serde::Serialize)]
        $($preamble)*
        pub enum $name $decl

        impl<'i> $crate::lex::Lex<'i> for $name {
            fn lex($input: &'i str) -> $crate::lex::LexResult<'i, Self> {
                $($expr)*
                Err((
                    $crate::lex::LexErrorKind::ExpectedName(stringify!($name)),
                    $input
                ))
            }
        }
    };

    // The public entry point to the macro.
    ($(#[$meta:meta])* $name:ident $items:tt) => {
        lex_enum!(@decl {
            $(#[$meta])*
        } $name input {} {} $items);
    };
}

pub fn span<'i>(input: &'i str, rest: &'i str) -> &'i str {
    &input[..input.len() - rest.len()]
}

pub fn take_while<'i, F: Fn(char) -> bool>(
    input: &'i str,
    name: &'static str,
    f: F,
) -> LexResult<'i, &'i str> {
    let mut iter = input.chars();
    loop {
        let rest = iter.as_str();
        match iter.next() {
            Some(c) if f(c) => {}
            _ => {
                return if rest.len() != input.len() {
                    Ok((span(input, rest), rest))
                } else {
                    Err((LexErrorKind::ExpectedName(name), input))
                };
            }
        }
    }
}

pub fn complete<T>(res: LexResult<'_, T>) -> Result<T, LexError<'_>> {
    let (res, input) = res?;
    if input.is_empty() {
        Ok(res)
    } else {
        Err((LexErrorKind::EOF, input))
    }
}

#[cfg(test)]
macro_rules! assert_ok {
    ($s:expr, $res:expr, $rest:expr) => {{
        let expr = $s.unwrap();
        assert_eq!(expr, ($res, $rest));
        expr.0
    }};

    ($s:expr, $res:expr) => {
        assert_ok!($s, $res, "")
    };
}

#[cfg(test)]
macro_rules! assert_err {
    ($s:expr, $kind:expr, $span:expr) => {
        assert_eq!($s, Err(($kind, $span)))
    };
}

#[cfg(test)]
macro_rules! assert_json {
    ($expr:expr, $json:tt) => {{
        let json = ::serde_json::to_value(&$expr).unwrap();
        assert_eq!(json, ::serde_json::json!($json));
        json
    }};
}

#[test]
fn test_take_while() {
    assert_ok!(
        take_while("abc def", "letter", |c| c.is_ascii_alphabetic()),
        "abc",
        " def"
    );
    assert_err!(
        take_while(" abc", "letter", |c| c.is_ascii_alphabetic()),
        LexErrorKind::ExpectedName("letter"),
        " abc"
    );
}

#[test]
fn test_complete() {
    assert_eq!(complete(Ok((1, ""))), Ok(1));
    assert_eq!(complete(Ok((1, "rest"))), Err((LexErrorKind::EOF, "rest")));
}
