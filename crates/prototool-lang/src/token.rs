use prototool_core::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    IntLit,
    FloatLit,
    StrLit,
    Symbol,
    LineComment,
    BlockComment,
    Whitespace,
}

impl TokenKind {
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            TokenKind::LineComment | TokenKind::BlockComment | TokenKind::Whitespace
        )
    }

    pub fn is_comment(self) -> bool {
        matches!(self, TokenKind::LineComment | TokenKind::BlockComment)
    }
}

/// One lexed token. `text` is the exact source slice: concatenating
/// the text of every token in a stream reproduces the input
/// byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub location: Location,
}

impl Token {
    pub fn end_offset(&self) -> usize {
        self.location.offset + self.text.len()
    }

    /// Whether this token is the symbol `c`.
    pub fn is_symbol(&self, c: char) -> bool {
        self.kind == TokenKind::Symbol && self.text.len() == c.len_utf8() && self.text.starts_with(c)
    }
}

/// The complete token stream for one file, trivia included. Parsing
/// walks the significant tokens; comment attachment is computed on
/// demand from the trivia in between.
#[derive(Debug, Clone)]
pub struct TokenStream {
    tokens: Vec<Token>,
    /// Indices into `tokens` of the non-trivia tokens, in order.
    significant: Vec<usize>,
}

impl TokenStream {
    pub fn new(tokens: Vec<Token>) -> Self {
        let significant = tokens
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.kind.is_trivia())
            .map(|(i, _)| i)
            .collect();
        Self {
            tokens,
            significant,
        }
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn significant_len(&self) -> usize {
        self.significant.len()
    }

    /// The `i`th significant token.
    pub fn significant(&self, i: usize) -> Option<&Token> {
        self.significant.get(i).map(|&idx| &self.tokens[idx])
    }

    /// Raw index (into `tokens`) of the `i`th significant token.
    pub fn significant_index(&self, i: usize) -> Option<usize> {
        self.significant.get(i).copied()
    }

    /// Significant position of the token at raw index `raw`, if it
    /// is a significant token.
    pub fn significant_position(&self, raw: usize) -> Option<usize> {
        self.significant.binary_search(&raw).ok()
    }

    /// Comments attached before the `i`th significant token: the
    /// contiguous run of comments immediately preceding it, stopping
    /// at a blank line or at trailing-comment position of the
    /// previous significant token.
    pub fn leading_comments(&self, i: usize) -> Vec<&Token> {
        let Some(&raw) = self.significant.get(i) else {
            return Vec::new();
        };
        let lower = if i == 0 {
            0
        } else {
            self.significant[i - 1] + 1
        };

        let mut comments: Vec<&Token> = Vec::new();
        let mut blank_pending = false;
        for idx in lower..raw {
            let t = &self.tokens[idx];
            match t.kind {
                TokenKind::Whitespace => {
                    // Two newlines between comments detach the earlier run.
                    if t.text.matches('\n').count() >= 2 {
                        blank_pending = true;
                    }
                }
                TokenKind::LineComment | TokenKind::BlockComment => {
                    if blank_pending {
                        comments.clear();
                        blank_pending = false;
                    }
                    comments.push(t);
                }
                _ => {}
            }
        }

        // A comment on the same line as the previous significant token
        // trails that token instead of leading this one.
        if i > 0 {
            let prev_line = self.tokens[self.significant[i - 1]].location.line;
            comments.retain(|c| c.location.line != prev_line);
        }
        comments
    }

    /// The comment on the same line after the `i`th significant
    /// token, if any.
    pub fn trailing_comment(&self, i: usize) -> Option<&Token> {
        let &raw = self.significant.get(i)?;
        let line = self.tokens[raw].location.line;
        let upper = self
            .significant
            .get(i + 1)
            .copied()
            .unwrap_or(self.tokens.len());
        self.tokens[raw + 1..upper]
            .iter()
            .find(|t| t.kind.is_comment() && t.location.line == line)
    }

    /// Reassemble the original source.
    pub fn source(&self) -> String {
        self.tokens.iter().map(|t| t.text.as_str()).collect()
    }
}
