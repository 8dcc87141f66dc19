use crate::lex::{span, take_while, LexError, LexErrorKind, LexResult};
use std::borrow::Cow;

/// A primitive lexical chunk produced by [`Splitter`].
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Chunk<'i> {
    /// Whether the chunk came from a quoted span.
    pub quoted: bool,
    /// Byte offset of the chunk within the input.
    pub position: usize,
    /// The raw input slice, quotes and escapes included.
    pub span: &'i str,
    /// The chunk content with quotes stripped and escapes resolved.
    pub text: Cow<'i, str>,
}

/// Splits a string on whitespace and on a set of delimiter characters.
///
/// Whitespace is dropped, each delimiter is kept as a chunk of its own and a
/// quote character at the start of a chunk opens a quoted span that runs
/// until the next unescaped quote character. Inside a quoted span `\` escapes
/// the quote character or another `\`; any other escape sequence is kept
/// verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Splitter<'d> {
    delimiters: &'d [char],
    quote: char,
}

impl<'d> Splitter<'d> {
    /// Creates a splitter retaining `delimiters` and quoting with `quote`.
    pub const fn new(delimiters: &'d [char], quote: char) -> Self {
        Splitter { delimiters, quote }
    }

    /// Lazily splits `input` into chunks.
    pub fn split<'i>(&self, input: &'i str) -> Split<'i, 'd> {
        Split {
            input,
            rest: input,
            splitter: *self,
        }
    }

    fn is_delimiter(&self, c: char) -> bool {
        self.delimiters.contains(&c)
    }

    fn is_chunk_char(&self, c: char) -> bool {
        !c.is_whitespace() && !self.is_delimiter(c)
    }
}

/// Iterator over the chunks of a string, see [`Splitter::split`].
///
/// After the first error the iterator is exhausted.
#[derive(Debug, Clone)]
pub struct Split<'i, 'd> {
    input: &'i str,
    rest: &'i str,
    splitter: Splitter<'d>,
}

impl<'i, 'd> Split<'i, 'd> {
    fn chunk(
        &mut self,
        quoted: bool,
        start: &'i str,
        text: Cow<'i, str>,
        rest: &'i str,
    ) -> Chunk<'i> {
        self.rest = rest;
        Chunk {
            quoted,
            position: self.input.len() - start.len(),
            span: span(start, rest),
            text,
        }
    }
}

impl<'i, 'd> Iterator for Split<'i, 'd> {
    type Item = Result<Chunk<'i>, LexError<'i>>;

    fn next(&mut self) -> Option<Self::Item> {
        let splitter = self.splitter;
        let start = self.rest.trim_start_matches(char::is_whitespace);
        let mut chars = start.chars();
        let c = match chars.next() {
            Some(c) => c,
            None => {
                self.rest = start;
                return None;
            }
        };

        if splitter.is_delimiter(c) {
            let rest = chars.as_str();
            let text = Cow::Borrowed(span(start, rest));
            return Some(Ok(self.chunk(false, start, text, rest)));
        }

        if c == splitter.quote {
            return Some(match lex_quoted(start, splitter.quote) {
                Ok((text, rest)) => Ok(self.chunk(true, start, text, rest)),
                Err(err) => {
                    self.rest = "";
                    Err(err)
                }
            });
        }

        Some(
            take_while(start, "character", |c| splitter.is_chunk_char(c))
                .map(|(text, rest)| self.chunk(false, start, Cow::Borrowed(text), rest)),
        )
    }
}

fn lex_quoted(input: &str, quote: char) -> LexResult<'_, Cow<'_, str>> {
    let body = &input[quote.len_utf8()..];
    let mut unescaped: Option<String> = None;
    let mut iter = body.char_indices();

    while let Some((i, c)) = iter.next() {
        if c == '\\' {
            let res = unescaped.get_or_insert_with(|| body[..i].to_owned());
            match iter.next() {
                Some((_, e)) if e == quote || e == '\\' => res.push(e),
                Some((_, e)) => {
                    res.push('\\');
                    res.push(e);
                }
                None => break,
            }
        } else if c == quote {
            let rest = &body[i + c.len_utf8()..];
            let text = match unescaped {
                Some(res) => Cow::Owned(res),
                None => Cow::Borrowed(&body[..i]),
            };
            return Ok((text, rest));
        } else if let Some(res) = unescaped.as_mut() {
            res.push(c);
        }
    }

    Err((LexErrorKind::MissingEndingQuote, input))
}
