//
// Copyright (c) 2026 Jeff Garzik
//
// This file is part of the cflow-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// Token model and the backtracking token buffer
//
// The parser never reads the scanner directly.  Tokens are pulled into a
// growable buffer with a read cursor; everything between the cursor and the
// buffer tail is re-readable lookahead.  The buffer supports saving and
// rewinding the cursor, literal in-place edits (used to normalize anonymous
// struct/union declarations) and compaction of the consumed prefix.
//

use crate::lexer::Lexer;
use crate::symbol::SymbolTable;
use std::fmt;

// ============================================================================
// Token Kinds
// ============================================================================

/// Lexical classes delivered by the scanner.
///
/// Identifier-shaped input is classified through the symbol table: a name
/// registered as a type, modifier, qualifier or attribute wrapper comes back
/// as that class instead of `Identifier`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// End of input
    Eof,
    /// Plain keyword or numeric literal; ignored by the expression scanner
    Word,
    Identifier,
    /// Registered type name
    Type,
    /// `*` or a registered modifier word
    Modifier,
    /// Registered qualifier (`const`, `inline`, ...)
    Qualifier,
    /// Attribute wrapper followed by balanced parentheses (`__attribute__`)
    Wrapper,
    Extern,
    Static,
    Typedef,
    Struct,
    Union,
    Enum,
    /// `.` or `->`
    MemberOf,
    /// Any other operator
    Op,
    StringLit,
    Lparen,
    Rparen,
    Lbracket,
    Rbracket,
    /// `{` not in column zero
    Lbrace,
    /// `}` not in column zero
    Rbrace,
    /// `{` in column zero
    Lbrace0,
    /// `}` in column zero
    Rbrace0,
    Semicolon,
    Comma,
    Assign,
}

// ============================================================================
// Token
// ============================================================================

/// One scanned token.  `text` carries the spelling where it matters
/// (identifiers, type names, operators); fixed punctuation leaves it empty.
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: u32,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: u32) -> Self {
        Self {
            kind,
            text: text.into(),
            line,
        }
    }

    pub fn eof() -> Self {
        Self {
            kind: TokenKind::Eof,
            text: String::new(),
            line: 0,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Identifier
            | TokenKind::Type
            | TokenKind::Word
            | TokenKind::Modifier
            | TokenKind::Struct
            | TokenKind::Union
            | TokenKind::Enum
            | TokenKind::Wrapper
            | TokenKind::Qualifier
            | TokenKind::MemberOf
            | TokenKind::Op => write!(f, "`{}'", self.text),
            TokenKind::Lbrace | TokenKind::Lbrace0 => write!(f, "`{{'"),
            TokenKind::Rbrace | TokenKind::Rbrace0 => write!(f, "`}}'"),
            TokenKind::Extern => write!(f, "`extern'"),
            TokenKind::Static => write!(f, "`static'"),
            TokenKind::Typedef => write!(f, "`typedef'"),
            TokenKind::StringLit => write!(f, "\"{}\"", self.text),
            TokenKind::Lparen => write!(f, "`('"),
            TokenKind::Rparen => write!(f, "`)'"),
            TokenKind::Lbracket => write!(f, "`['"),
            TokenKind::Rbracket => write!(f, "`]'"),
            TokenKind::Semicolon => write!(f, "`;'"),
            TokenKind::Comma => write!(f, "`,'"),
            TokenKind::Assign => write!(f, "`='"),
            TokenKind::Eof => write!(f, "end of file"),
        }
    }
}

// ============================================================================
// Token Stream
// ============================================================================

/// Buffered token stream over the scanner.
///
/// Indices below the cursor are consumed; `[curs, buf.len())` is buffered
/// lookahead that `restore` makes re-readable without re-scanning.  The
/// buffer grows geometrically through `Vec`, relocating tokens rather than
/// re-reading them.
pub struct TokenStream {
    lexer: Lexer,
    buf: Vec<Token>,
    curs: usize,
}

impl TokenStream {
    pub fn new(lexer: Lexer) -> Self {
        Self::with_capacity(lexer, 64)
    }

    /// `capacity` seeds the buffer allocation (the `--pushdown` option).
    pub fn with_capacity(lexer: Lexer, capacity: usize) -> Self {
        Self {
            lexer,
            buf: Vec::with_capacity(capacity.max(1)),
            curs: 0,
        }
    }

    /// Name of the file currently being scanned, as adjusted by `#line`
    /// directives.
    pub fn filename(&self) -> &str {
        self.lexer.filename()
    }

    /// True while the directive-adjusted filename differs from the file that
    /// was actually opened, i.e. while scanning preprocessed include text.
    pub fn in_included_text(&self) -> bool {
        self.lexer.filename() != self.lexer.canonical_filename()
    }

    /// Read the next token, pulling from the scanner when the buffered
    /// lookahead is exhausted.
    pub fn next(&mut self, table: &SymbolTable) -> Token {
        if self.curs == self.buf.len() {
            let t = self.lexer.next_token(table);
            self.buf.push(t);
        }
        let t = self.buf[self.curs].clone();
        self.curs += 1;
        t
    }

    /// Move the cursor back one token and return the new current token.
    ///
    /// Underflow is a parser bug, not bad input.
    pub fn putback(&mut self) -> Token {
        if self.curs == 0 {
            panic!("INTERNAL ERROR: cannot return token to stream");
        }
        self.curs -= 1;
        if self.curs > 0 {
            self.buf[self.curs - 1].clone()
        } else {
            Token::eof()
        }
    }

    /// Save the cursor for a later `restore`.
    pub fn mark(&self) -> usize {
        self.curs
    }

    /// Rewind the cursor to a saved position and return the token current at
    /// that point.
    pub fn restore(&mut self, pos: usize) -> Token {
        self.curs = pos;
        if self.curs > 0 {
            self.buf[self.curs - 1].clone()
        } else {
            Token::eof()
        }
    }

    /// Current cursor position.
    pub fn cursor(&self) -> usize {
        self.curs
    }

    /// Buffered token at `idx`.
    pub fn token(&self, idx: usize) -> &Token {
        &self.buf[idx]
    }

    /// Delete the buffered tokens in `[beg, end]` (inclusive).
    pub fn delete_range(&mut self, beg: usize, end: usize) {
        if end >= beg && beg < self.buf.len() {
            let end = end.min(self.buf.len() - 1);
            self.buf.drain(beg..=end);
        }
    }

    /// Insert a token at `pos`, shifting the rest of the buffer up.
    pub fn insert(&mut self, pos: usize, token: Token) {
        self.buf.insert(pos, token);
    }

    /// Drop buffered tokens at and above `len`.  The caller is expected to
    /// restore the cursor to a position inside the remaining prefix.
    pub fn truncate(&mut self, len: usize) {
        self.buf.truncate(len);
        if self.curs > len {
            self.curs = len;
        }
    }

    /// Drop the fully consumed prefix so the buffer does not grow without
    /// bound over a long file.
    pub fn compact(&mut self) {
        if self.curs > 0 {
            self.buf.drain(..self.curs);
            self.curs = 0;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::symbol::SymbolTable;

    fn stream(src: &str) -> (TokenStream, SymbolTable) {
        let mut table = SymbolTable::new();
        crate::lexer::register_keywords(&mut table);
        (TokenStream::new(Lexer::from_source(src, "test.c")), table)
    }

    #[test]
    fn test_mark_restore_idempotent() {
        let (mut st, table) = stream("a b c");
        st.next(&table);
        let pos = st.mark();
        let t = st.restore(pos);
        assert_eq!(st.cursor(), pos);
        assert_eq!(t.text, "a");
    }

    #[test]
    fn test_restore_replays_identical_tokens() {
        let (mut st, table) = stream("alpha beta gamma ;");
        let pos = st.mark();
        let first: Vec<String> = (0..4).map(|_| st.next(&table).text).collect();
        st.restore(pos);
        let second: Vec<String> = (0..4).map(|_| st.next(&table).text).collect();
        assert_eq!(first, second);
        assert_eq!(first, vec!["alpha", "beta", "gamma", ";"]);
    }

    #[test]
    fn test_growth_preserves_order() {
        let src = (0..200)
            .map(|i| format!("tok{}", i))
            .collect::<Vec<_>>()
            .join(" ");
        let (mut st, table) = stream(&src);
        let pos = st.mark();
        for i in 0..200 {
            assert_eq!(st.next(&table).text, format!("tok{}", i));
        }
        st.restore(pos);
        for i in 0..200 {
            assert_eq!(st.next(&table).text, format!("tok{}", i));
        }
    }

    #[test]
    fn test_putback_returns_previous() {
        let (mut st, table) = stream("x y");
        st.next(&table);
        st.next(&table);
        let t = st.putback();
        assert_eq!(t.text, "x");
        assert_eq!(st.next(&table).text, "y");
    }

    #[test]
    #[should_panic(expected = "cannot return token")]
    fn test_putback_underflow_panics() {
        let (mut st, _table) = stream("x");
        st.putback();
    }

    #[test]
    fn test_delete_and_insert_splice() {
        let (mut st, table) = stream("struct a b c end");
        for _ in 0..5 {
            st.next(&table);
        }
        st.restore(1);
        // replace the buffered "a b c" run with one synthetic identifier
        st.delete_range(1, 3);
        st.insert(1, Token::new(TokenKind::Identifier, "{ ... }", 1));
        assert_eq!(st.next(&table).text, "{ ... }");
        assert_eq!(st.next(&table).text, "end");
    }

    #[test]
    fn test_compact_drops_consumed_prefix() {
        let (mut st, table) = stream("a b c d");
        st.next(&table);
        st.next(&table);
        st.compact();
        assert_eq!(st.cursor(), 0);
        assert_eq!(st.next(&table).text, "c");
    }

    #[test]
    fn test_truncate_clamps_cursor() {
        let (mut st, table) = stream("a b c d");
        for _ in 0..4 {
            st.next(&table);
        }
        st.truncate(1);
        assert_eq!(st.cursor(), 1);
        // scanning resumes after the retained prefix
        assert_eq!(st.next(&table).kind, TokenKind::Eof);
    }
}
