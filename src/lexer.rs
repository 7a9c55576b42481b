use logos::Logos;
use tracing::trace;

use crate::token::{Token, TokenKind};

/// Pull-based scanner over a source string.
///
/// Once the input is exhausted every further call to [`Lexer::next_token`]
/// returns an end-of-input token.
pub struct Lexer<'src> {
    inner: logos::Lexer<'src, TokenKind>,
    exhausted: bool,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            inner: TokenKind::lexer(source),
            exhausted: false,
        }
    }

    pub fn next_token(&mut self) -> Token<'src> {
        if self.exhausted {
            return Token::eof();
        }

        let token = match self.inner.next() {
            Some(Ok(kind)) => Token::new(kind, self.inner.slice()),
            Some(Err(())) => self.error_token(),
            None => {
                self.exhausted = true;
                Token::eof()
            }
        };

        trace!(kind = %token.kind, lexeme = token.lexeme, "scanned token");
        token
    }

    // The error lexeme is widened to the next char boundary so that a stray
    // multi-byte character is reported whole
    fn error_token(&mut self) -> Token<'src> {
        let source = self.inner.source();
        let span = self.inner.span();

        let mut end = span.end.max(span.start + 1).min(source.len());
        while !source.is_char_boundary(end) {
            end += 1;
        }
        self.inner.bump(end - span.end);

        Token::new(TokenKind::Error, &source[span.start..end])
    }
}

impl<'src> Iterator for Lexer<'src> {
    type Item = Token<'src>;

    /// Yields tokens up to, but not including, the end of input.
    fn next(&mut self) -> Option<Self::Item> {
        let token = self.next_token();
        (token.kind != TokenKind::Eof).then_some(token)
    }
}
