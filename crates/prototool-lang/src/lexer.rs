use prototool_core::Location;

use crate::error::ParseError;
use crate::token::{Token, TokenKind, TokenStream};

/// Lex `source` into a trivia-preserving token stream. `file` is
/// only used in error messages.
pub fn lex(file: &str, source: &str) -> Result<TokenStream, ParseError> {
    Lexer::new(file, source).run()
}

struct Lexer<'a> {
    file: &'a str,
    src: &'a str,
    chars: Vec<(usize, char)>,
    /// Index into `chars`.
    pos: usize,
    line: usize,
    column: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(file: &'a str, src: &'a str) -> Self {
        Self {
            file,
            src,
            chars: src.char_indices().collect(),
            pos: 0,
            line: 1,
            column: 1,
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Result<TokenStream, ParseError> {
        while let Some(c) = self.peek() {
            let start = self.mark();
            match c {
                ' ' | '\t' | '\r' | '\n' | '\x0b' | '\x0c' => {
                    while self
                        .peek()
                        .is_some_and(|c| matches!(c, ' ' | '\t' | '\r' | '\n' | '\x0b' | '\x0c'))
                    {
                        self.bump();
                    }
                    self.push(TokenKind::Whitespace, start);
                }
                '/' if self.peek_at(1) == Some('/') => {
                    while self.peek().is_some_and(|c| c != '\n') {
                        self.bump();
                    }
                    self.push(TokenKind::LineComment, start);
                }
                '/' if self.peek_at(1) == Some('*') => {
                    self.bump();
                    self.bump();
                    loop {
                        match self.peek() {
                            Some('*') if self.peek_at(1) == Some('/') => {
                                self.bump();
                                self.bump();
                                break;
                            }
                            Some(_) => {
                                self.bump();
                            }
                            None => {
                                return Err(self.error(start, "unterminated block comment"));
                            }
                        }
                    }
                    self.push(TokenKind::BlockComment, start);
                }
                '"' | '\'' => {
                    self.lex_string(c, start)?;
                }
                c if c.is_ascii_digit() => {
                    self.lex_number(start)?;
                }
                '.' if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => {
                    self.lex_number(start)?;
                }
                c if c.is_ascii_alphabetic() || c == '_' => {
                    while self
                        .peek()
                        .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
                    {
                        self.bump();
                    }
                    self.push(TokenKind::Ident, start);
                }
                '{' | '}' | '[' | ']' | '(' | ')' | '<' | '>' | '=' | ';' | ',' | '.' | ':'
                | '/' | '-' | '+' => {
                    self.bump();
                    self.push(TokenKind::Symbol, start);
                }
                other => {
                    return Err(self.error(start, format!("unexpected character {other:?}")));
                }
            }
        }
        Ok(TokenStream::new(self.tokens))
    }

    fn lex_string(&mut self, quote: char, start: Mark) -> Result<(), ParseError> {
        self.bump();
        loop {
            match self.peek() {
                Some(c) if c == quote => {
                    self.bump();
                    break;
                }
                Some('\\') => {
                    self.bump();
                    if self.peek().is_none() {
                        return Err(self.error(start, "unterminated string literal"));
                    }
                    self.bump();
                }
                Some('\n') | None => {
                    return Err(self.error(start, "unterminated string literal"));
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
        self.push(TokenKind::StrLit, start);
        Ok(())
    }

    fn lex_number(&mut self, start: Mark) -> Result<(), ParseError> {
        let mut is_float = false;
        if self.peek() == Some('0') && matches!(self.peek_at(1), Some('x') | Some('X')) {
            self.bump();
            self.bump();
            let mut digits = 0;
            while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                self.bump();
                digits += 1;
            }
            if digits == 0 {
                return Err(self.error(start, "malformed hex literal"));
            }
            self.push(TokenKind::IntLit, start);
            return Ok(());
        }

        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        if self.peek() == Some('.') {
            is_float = true;
            self.bump();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            let mut lookahead = 1;
            if matches!(self.peek_at(1), Some('+') | Some('-')) {
                lookahead = 2;
            }
            if self.peek_at(lookahead).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                for _ in 0..=lookahead {
                    self.bump();
                }
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.bump();
                }
            }
        }
        let kind = if is_float {
            TokenKind::FloatLit
        } else {
            TokenKind::IntLit
        };
        self.push(kind, start);
        Ok(())
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|&(_, c)| c)
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.chars.get(self.pos + n).map(|&(_, c)| c)
    }

    fn bump(&mut self) {
        if let Some(&(_, c)) = self.chars.get(self.pos) {
            self.pos += 1;
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }

    fn byte_offset(&self) -> usize {
        self.chars
            .get(self.pos)
            .map(|&(o, _)| o)
            .unwrap_or(self.src.len())
    }

    fn mark(&self) -> Mark {
        Mark {
            offset: self.byte_offset(),
            line: self.line,
            column: self.column,
        }
    }

    fn push(&mut self, kind: TokenKind, start: Mark) {
        let end = self.byte_offset();
        self.tokens.push(Token {
            kind,
            text: self.src[start.offset..end].to_string(),
            location: Location::new(start.line, start.column, start.offset),
        });
    }

    fn error(&self, start: Mark, message: impl Into<String>) -> ParseError {
        ParseError::syntax(self.file, start.line, start.column, message)
    }
}

#[derive(Clone, Copy)]
struct Mark {
    offset: usize,
    line: usize,
    column: usize,
}

/// Decode the value of a string literal token (quotes stripped,
/// escapes resolved).
pub fn str_lit_value(token: &Token) -> String {
    let inner = &token.text[1..token.text.len().saturating_sub(1)];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('a') => out.push('\x07'),
            Some('b') => out.push('\x08'),
            Some('f') => out.push('\x0c'),
            Some('v') => out.push('\x0b'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some(other) => {
                // Hex/octal escapes and unknown escapes are kept as-is;
                // exact byte values are not needed by any consumer.
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_reproduces_source() {
        let src = "syntax = \"proto3\";\n\n// a comment\nmessage Foo {\n  /* block */\n  string name = 1; // trailing\n  map<string, int64> counts = 2 [deprecated = true];\n}\n";
        let stream = lex("t.proto", src).unwrap();
        assert_eq!(stream.source(), src);
    }

    #[test]
    fn locations_are_one_based() {
        let stream = lex("t.proto", "enum foo {\n  A = 0;\n}\n").unwrap();
        let first = stream.significant(0).unwrap();
        assert_eq!((first.location.line, first.location.column), (1, 1));
        let name = stream.significant(1).unwrap();
        assert_eq!(name.text, "foo");
        assert_eq!((name.location.line, name.location.column), (1, 6));
        let a = stream.significant(3).unwrap();
        assert_eq!(a.text, "A");
        assert_eq!((a.location.line, a.location.column), (2, 3));
    }

    #[test]
    fn numbers_and_strings() {
        let stream = lex("t.proto", "1 0x1F 3.14 .5 2e10 'a\\'b' \"c\"").unwrap();
        let kinds: Vec<TokenKind> = (0..stream.significant_len())
            .map(|i| stream.significant(i).unwrap().kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::IntLit,
                TokenKind::IntLit,
                TokenKind::FloatLit,
                TokenKind::FloatLit,
                TokenKind::FloatLit,
                TokenKind::StrLit,
                TokenKind::StrLit,
            ]
        );
        assert_eq!(str_lit_value(stream.significant(5).unwrap()), "a'b");
    }

    #[test]
    fn unterminated_constructs_error() {
        assert!(lex("t.proto", "/* never closed").is_err());
        assert!(lex("t.proto", "\"open").is_err());
        assert!(lex("t.proto", "\"line\nbreak\"").is_err());
    }

    #[test]
    fn leading_and_trailing_comment_attachment() {
        let src = "// detached\n\n// lead one\n// lead two\nmessage Foo {} // trail\n";
        let stream = lex("t.proto", src).unwrap();
        // significant: message Foo { }
        let lead = stream.leading_comments(0);
        assert_eq!(lead.len(), 2);
        assert_eq!(lead[0].text, "// lead one");
        let trail = stream.trailing_comment(3).unwrap();
        assert_eq!(trail.text, "// trail");
    }
}
