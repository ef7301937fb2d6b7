use std::iter::FusedIterator;

use logos::Logos;

use crate::error::LexError;
use crate::token::{Token, TokenError};
use crate::{Span, SpannedToken};

const DIRECTIVE_OPEN: &str = "<?";
const DIRECTIVE_CLOSE: &str = "?>";
const OUTPUT_OPEN: &str = "{{";
const NOTE: &str = "note";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Close {
    Directive,
    Output,
    // a bare expression runs to the end of the input
    Expression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Literal,
    Directive { open: usize, close: Close },
    Done,
}

/// A lazy token stream over a template source.
///
/// Cloning the stream gives an independent scanner at the same position, so
/// a stream can always be restarted by calling [`tokenize`] again or by
/// keeping a clone around.
#[derive(Debug, Clone)]
pub struct Tokens<'a> {
    src: &'a str,
    pos: usize,
    mode: Mode,
}

/// Tokenize a template source.
///
/// Literal text is produced as [`Token::Text`]; a directive is produced as
/// [`Token::DirectiveOpen`] or [`Token::OutputOpen`], the tokens inside it,
/// and the closing token. `<?note ...?>` comments produce no tokens at all.
pub fn tokenize(src: &str) -> Tokens<'_> {
    Tokens {
        src,
        pos: 0,
        mode: Mode::Literal,
    }
}

/// Tokenize a bare expression, as it appears between directive delimiters.
pub fn tokenize_expression(src: &str) -> Tokens<'_> {
    Tokens {
        src,
        pos: 0,
        mode: Mode::Directive {
            open: 0,
            close: Close::Expression,
        },
    }
}

impl<'a> Tokens<'a> {
    pub fn source(&self) -> &'a str {
        self.src
    }

    fn fail(&mut self, error: LexError) -> Option<Result<SpannedToken<'a>, LexError>> {
        self.mode = Mode::Done;
        Some(Err(error))
    }

    fn next_literal(&mut self) -> Option<Result<SpannedToken<'a>, LexError>> {
        let src = self.src;
        loop {
            let rest = &src[self.pos..];
            if rest.is_empty() {
                self.mode = Mode::Done;
                return None;
            }
            let start = self.pos;
            match find_open(rest) {
                None => {
                    self.pos = self.src.len();
                    return Some(Ok((Token::Text(rest), start..self.pos)));
                }
                Some(0) if rest.starts_with(DIRECTIVE_OPEN) => {
                    let inner = &rest[DIRECTIVE_OPEN.len()..];
                    if is_note(inner) {
                        match inner.find(DIRECTIVE_CLOSE) {
                            Some(end) => {
                                self.pos += DIRECTIVE_OPEN.len() + end + DIRECTIVE_CLOSE.len();
                                continue;
                            }
                            None => {
                                return self.fail(LexError::UnterminatedDirective {
                                    span: start..self.src.len(),
                                })
                            }
                        }
                    }
                    self.pos += DIRECTIVE_OPEN.len();
                    self.mode = Mode::Directive {
                        open: start,
                        close: Close::Directive,
                    };
                    return Some(Ok((Token::DirectiveOpen, start..self.pos)));
                }
                Some(0) => {
                    self.pos += OUTPUT_OPEN.len();
                    self.mode = Mode::Directive {
                        open: start,
                        close: Close::Output,
                    };
                    return Some(Ok((Token::OutputOpen, start..self.pos)));
                }
                Some(i) => {
                    self.pos += i;
                    return Some(Ok((Token::Text(&rest[..i]), start..self.pos)));
                }
            }
        }
    }

    fn next_directive(
        &mut self,
        open: usize,
        close: Close,
    ) -> Option<Result<SpannedToken<'a>, LexError>> {
        let src = self.src;
        let rest = &src[self.pos..];
        let mut lexer = Token::lexer(rest);
        let next = lexer.next();
        let span: Span = self.pos + lexer.span().start..self.pos + lexer.span().end;
        match next {
            None if close == Close::Expression => {
                self.mode = Mode::Done;
                None
            }
            None => self.fail(LexError::UnterminatedDirective {
                span: open..self.src.len(),
            }),
            Some(Err(TokenError::InvalidNumber)) => self.fail(LexError::InvalidNumber { span }),
            Some(Err(TokenError::UnexpectedCharacter)) => {
                let found = self.src[span.start..].chars().next().unwrap_or_default();
                self.fail(LexError::UnexpectedCharacter { found, span })
            }
            Some(Ok(token)) => {
                self.pos = span.end;
                match (&token, close) {
                    (Token::DirectiveClose, Close::Directive) | (Token::OutputClose, Close::Output) => {
                        self.mode = Mode::Literal;
                    }
                    _ => {}
                }
                Some(Ok((token, span)))
            }
        }
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Result<SpannedToken<'a>, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.mode {
            Mode::Literal => self.next_literal(),
            Mode::Directive { open, close } => self.next_directive(open, close),
            Mode::Done => None,
        }
    }
}

impl FusedIterator for Tokens<'_> {}

// the position of the first directive or output opening delimiter
fn find_open(s: &str) -> Option<usize> {
    match (s.find(DIRECTIVE_OPEN), s.find(OUTPUT_OPEN)) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

fn is_note(inner: &str) -> bool {
    match inner.strip_prefix(NOTE) {
        Some(after) => {
            after.is_empty()
                || after.starts_with(DIRECTIVE_CLOSE)
                || after.starts_with(|c: char| c.is_whitespace())
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_open() {
        assert_eq!(find_open("ab{{c<?"), Some(2));
        assert_eq!(find_open("ab<?c{{"), Some(2));
        assert_eq!(find_open("abc"), None);
    }

    #[test]
    fn test_is_note() {
        assert!(is_note("note hello"));
        assert!(is_note("note?>"));
        assert!(!is_note("notes"));
        assert!(!is_note("print x"));
    }

    #[test]
    fn test_expression() {
        let tokens = tokenize_expression("a + 1")
            .map(|t| t.map(|(token, _)| token))
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(tokens, vec![Token::Name("a"), Token::Plus, Token::Integer(1)]);
    }

    #[test]
    fn test_expression_close_is_a_token() {
        let tokens = tokenize_expression("a ?> b")
            .map(|t| t.map(|(token, _)| token))
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(
            tokens,
            vec![Token::Name("a"), Token::DirectiveClose, Token::Name("b")]
        );
    }
}
