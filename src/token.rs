//! The tokenizer (C1): an eager, greedy, single-pass byte classifier.
//!
//! Priority order matters and is fixed: directive, identifier, quoted
//! string (double then single), number (decimal then hex), the fixed
//! punctuation set, whitespace, comments, and finally a maximal run of
//! operator characters. See `tokenize` for the exact order.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Directive,
    Ident,
    Quoted,
    Number,
    OpenParen,
    CloseParen,
    OpenBrace,
    CloseBrace,
    OpenBracket,
    CloseBracket,
    StmtEnd,
    Comma,
    Whitespace,
    LineComment,
    BlockComment,
    Op,
    Eof,
}

impl TokenKind {
    /// Whitespace and comments; every consumer filters these via the same set.
    pub fn is_skippable(self) -> bool {
        matches!(
            self,
            TokenKind::Whitespace | TokenKind::LineComment | TokenKind::BlockComment
        )
    }
}

/// A half-open byte range `[start, end)` into the tokenized text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Span {
            start: start as u32,
            end: end as u32,
        }
    }

    pub fn empty_at(pos: usize) -> Self {
        Span::new(pos, pos)
    }

    pub fn start(self) -> usize {
        self.start as usize
    }

    pub fn end(self) -> usize {
        self.end as usize
    }

    pub fn len(self) -> usize {
        self.end() - self.start()
    }

    pub fn is_empty(self) -> bool {
        self.start == self.end
    }

    pub fn text<'a>(self, source: &'a str) -> &'a str {
        &source[self.start()..self.end()]
    }

    pub fn contains_index(self, idx: usize) -> bool {
        self.start() <= idx && idx <= self.end()
    }

    pub fn contains(self, other: Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn overlaps(self, other: Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn join(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Extends `end` to cover the trailing newline, if the next byte is one.
    pub fn extend_to_newline(self, source: &str) -> Span {
        let bytes = source.as_bytes();
        let mut end = self.end();
        if end < bytes.len() && bytes[end] == b'\n' {
            end += 1;
        }
        Span { start: self.start, end: end as u32 }
    }

    /// Extends `start` to absorb preceding whitespace (not past a newline).
    pub fn extend_to_whitespace(self, source: &str) -> Span {
        let bytes = source.as_bytes();
        let mut start = self.start();
        while start > 0 {
            match bytes[start - 1] {
                b' ' | b'\t' => start -= 1,
                _ => break,
            }
        }
        Span { start: start as u32, end: self.end }
    }

    /// 1-based (line, column) position for `idx` into `source`.
    pub fn line_col(source: &str, idx: usize) -> (usize, usize) {
        let mut line = 1;
        let mut col = 1;
        for ch in source[..idx.min(source.len())].chars() {
            if ch == '\n' {
                line += 1;
                col = 1;
            } else {
                col += 1;
            }
        }
        (line, col)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        self.span.text(source)
    }

    pub fn is_directive(&self, source: &str, name: &str) -> bool {
        self.kind == TokenKind::Directive && &self.text(source)[1..] == name
    }

    /// Parses a `Number` token's text: hex (`0x...`) as an integer, anything
    /// else as a float. Returns `None` for non-number tokens or bad text.
    pub fn number_value(&self, source: &str) -> Option<f64> {
        if self.kind != TokenKind::Number {
            return None;
        }
        let text = self.text(source).replace('_', "");
        if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
            i64::from_str_radix(hex, 16).ok().map(|v| v as f64)
        } else {
            text.parse::<f64>().ok()
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}@[{},{})", self.kind, self.span.start, self.span.end)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

fn is_ident_continue(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_' || c == b'-'
}

const OPERATOR_CHARS: &[u8] = b".:=|<>+-/*$";

/// Tokenizes `source`, returning the full token list (always non-empty,
/// always terminated by `Eof`) plus any lex errors encountered along the
/// way. A lex error aborts only the offending byte; tokenization resumes
/// at the next byte so the result is always total over its input.
pub fn tokenize(source: &str) -> (Vec<Token>, Vec<LexError>) {
    let bytes = source.as_bytes();
    let len = bytes.len();
    let mut tokens = Vec::new();
    let mut errors = Vec::new();
    let mut i = 0usize;

    while i < len {
        let start = i;
        let b = bytes[i];

        // Directive: @ident
        if b == b'@' && i + 1 < len && is_ident_start(bytes[i + 1]) {
            let mut j = i + 1;
            while j < len && is_ident_continue(bytes[j]) {
                j += 1;
            }
            tokens.push(Token { kind: TokenKind::Directive, span: Span::new(start, j) });
            i = j;
            continue;
        }

        // Identifier
        if is_ident_start(b) {
            let mut j = i + 1;
            while j < len && is_ident_continue(bytes[j]) {
                j += 1;
            }
            tokens.push(Token { kind: TokenKind::Ident, span: Span::new(start, j) });
            i = j;
            continue;
        }

        // Quoted string (double, then single)
        if b == b'"' || b == b'\'' {
            match scan_quoted(bytes, i, b) {
                Ok(end) => {
                    tokens.push(Token { kind: TokenKind::Quoted, span: Span::new(start, end) });
                    i = end;
                }
                Err(msg) => {
                    errors.push(LexError { message: msg, span: Span::new(start, len) });
                    i = len;
                }
            }
            continue;
        }

        // Number: optional sign, digits/underscores, optional fraction; or 0x hex
        if b.is_ascii_digit() || ((b == b'+' || b == b'-') && i + 1 < len && bytes[i + 1].is_ascii_digit()) {
            if let Some(end) = scan_hex(bytes, i) {
                tokens.push(Token { kind: TokenKind::Number, span: Span::new(start, end) });
                i = end;
                continue;
            }
            let end = scan_decimal(bytes, i);
            tokens.push(Token { kind: TokenKind::Number, span: Span::new(start, end) });
            i = end;
            continue;
        }

        match b {
            b'(' => {
                tokens.push(Token { kind: TokenKind::OpenParen, span: Span::new(start, i + 1) });
                i += 1;
                continue;
            }
            b')' => {
                tokens.push(Token { kind: TokenKind::CloseParen, span: Span::new(start, i + 1) });
                i += 1;
                continue;
            }
            b'{' => {
                tokens.push(Token { kind: TokenKind::OpenBrace, span: Span::new(start, i + 1) });
                i += 1;
                continue;
            }
            b'}' => {
                tokens.push(Token { kind: TokenKind::CloseBrace, span: Span::new(start, i + 1) });
                i += 1;
                continue;
            }
            b'[' => {
                tokens.push(Token { kind: TokenKind::OpenBracket, span: Span::new(start, i + 1) });
                i += 1;
                continue;
            }
            b']' => {
                tokens.push(Token { kind: TokenKind::CloseBracket, span: Span::new(start, i + 1) });
                i += 1;
                continue;
            }
            b';' => {
                tokens.push(Token { kind: TokenKind::StmtEnd, span: Span::new(start, i + 1) });
                i += 1;
                continue;
            }
            b',' => {
                tokens.push(Token { kind: TokenKind::Comma, span: Span::new(start, i + 1) });
                i += 1;
                continue;
            }
            _ => {}
        }

        if b.is_ascii_whitespace() {
            let mut j = i + 1;
            while j < len && bytes[j].is_ascii_whitespace() {
                j += 1;
            }
            tokens.push(Token { kind: TokenKind::Whitespace, span: Span::new(start, j) });
            i = j;
            continue;
        }

        if b == b'/' && i + 1 < len && bytes[i + 1] == b'/' {
            let mut j = i + 2;
            while j < len && bytes[j] != b'\n' {
                j += 1;
            }
            tokens.push(Token { kind: TokenKind::LineComment, span: Span::new(start, j) });
            i = j;
            continue;
        }

        if b == b'/' && i + 1 < len && bytes[i + 1] == b'*' {
            match find(bytes, i + 2, b"*/") {
                Some(close) => {
                    tokens.push(Token {
                        kind: TokenKind::BlockComment,
                        span: Span::new(start, close + 2),
                    });
                    i = close + 2;
                }
                None => {
                    errors.push(LexError {
                        message: "unterminated block comment".to_string(),
                        span: Span::new(start, start + 2),
                    });
                    i = len;
                }
            }
            continue;
        }

        if OPERATOR_CHARS.contains(&b) {
            let mut j = i + 1;
            while j < len && OPERATOR_CHARS.contains(&bytes[j]) {
                j += 1;
            }
            tokens.push(Token { kind: TokenKind::Op, span: Span::new(start, j) });
            i = j;
            continue;
        }

        errors.push(LexError {
            message: "could not determine what kind of syntax is meant here".to_string(),
            span: Span::new(start, start + 1),
        });
        i += 1;
    }

    tokens.push(Token { kind: TokenKind::Eof, span: Span::new(len, len) });
    (tokens, errors)
}

fn scan_quoted(bytes: &[u8], start: usize, quote: u8) -> Result<usize, String> {
    let len = bytes.len();
    let mut j = start + 1;
    loop {
        if j >= len || bytes[j] == b'\n' {
            return Err("unterminated string literal".to_string());
        }
        if bytes[j] == b'\\' {
            j += 1;
            if j >= len {
                return Err("incomplete escape sequence at end of input".to_string());
            }
            match bytes[j] {
                b'n' | b't' | b'"' | b'\'' | b'\\' => {
                    j += 1;
                }
                _ => {
                    return Err(format!("unknown escape sequence '\\{}'", bytes[j] as char));
                }
            }
            continue;
        }
        if bytes[j] == quote {
            return Ok(j + 1);
        }
        j += 1;
    }
}

fn scan_hex(bytes: &[u8], start: usize) -> Option<usize> {
    if bytes[start] != b'0' {
        return None;
    }
    let next = *bytes.get(start + 1)?;
    if next != b'x' && next != b'X' {
        return None;
    }
    let mut j = start + 2;
    let digits_start = j;
    while j < bytes.len() && bytes[j].is_ascii_hexdigit() {
        j += 1;
    }
    if j == digits_start {
        return None;
    }
    Some(j)
}

fn scan_decimal(bytes: &[u8], start: usize) -> usize {
    let len = bytes.len();
    let mut j = start;
    if bytes[j] == b'+' || bytes[j] == b'-' {
        j += 1;
    }
    while j < len && (bytes[j].is_ascii_digit() || bytes[j] == b'_') {
        j += 1;
    }
    if j < len && bytes[j] == b'.' && j + 1 < len && bytes[j + 1].is_ascii_digit() {
        j += 1;
        while j < len && (bytes[j].is_ascii_digit() || bytes[j] == b'_') {
            j += 1;
        }
    }
    j
}

fn find(haystack: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from > haystack.len() || needle.is_empty() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src).0.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn totality_reproduces_input_byte_for_byte() {
        let src = "using Gtk 4.0;\nBox { orientation: vertical; } // trailing\n";
        let (tokens, errors) = tokenize(src);
        assert!(errors.is_empty());
        assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
        let rebuilt: String = tokens
            .iter()
            .filter(|t| t.kind != TokenKind::Eof)
            .map(|t| t.text(src))
            .collect();
        assert_eq!(rebuilt, src);
    }

    #[test]
    fn classifies_directive_before_identifier() {
        assert_eq!(kinds("@name"), vec![TokenKind::Directive, TokenKind::Eof]);
    }

    #[test]
    fn classifies_double_and_single_quoted() {
        assert_eq!(
            kinds(r#" "a\"b" 'c\'d' "#),
            vec![
                TokenKind::Whitespace,
                TokenKind::Quoted,
                TokenKind::Whitespace,
                TokenKind::Quoted,
                TokenKind::Whitespace,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn classifies_hex_before_decimal() {
        let (tokens, errors) = tokenize("0x1F");
        assert!(errors.is_empty());
        assert_eq!(tokens[0].kind, TokenKind::Number);
        let src = "0x1F";
        assert_eq!(tokens[0].number_value(src), Some(31.0));
    }

    #[test]
    fn unterminated_string_is_lex_error_not_eof_swallow() {
        let (tokens, errors) = tokenize(r#"Box { a: "oops }"#);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("unterminated"));
        assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
    }

    #[test]
    fn unknown_byte_is_one_char_lex_error_and_recovers() {
        let (tokens, errors) = tokenize("a ` b");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].span.len(), 1);
        assert_eq!(
            kinds("a ` b"),
            vec![
                TokenKind::Ident,
                TokenKind::Whitespace,
                TokenKind::Whitespace,
                TokenKind::Ident,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn operator_run_is_maximal() {
        assert_eq!(kinds("<="), vec![TokenKind::Op, TokenKind::Eof]);
    }
}
