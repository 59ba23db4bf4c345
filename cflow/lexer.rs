//
// Copyright (c) 2026 Jeff Garzik
//
// This file is part of the cflow-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// Scanner for cflow
//
// Classifies raw bytes into the token kinds the parser understands.  No
// macro expansion happens here: preprocessor lines are skipped, except for
// `#line N "file"` and `# N "file"` markers, which keep positions honest
// when the input has been run through an external preprocessor.
//
// Identifier-shaped input is classified through the symbol table, so a name
// registered as a type, modifier, qualifier or attribute wrapper (via the
// built-in keyword seeding or a `--symbol` override) is returned as that
// class instead of a plain identifier.
//

use crate::symbol::SymbolTable;
use crate::token::{Token, TokenKind};
use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::process::Command;

// ============================================================================
// Keyword Seeding
// ============================================================================

/// C keywords and their token classes, installed into the symbol table
/// before any scanning begins.  `--symbol` overrides may extend or replace
/// these entries.
const KEYWORDS: &[(&str, TokenKind)] = &[
    ("auto", TokenKind::Qualifier),
    ("break", TokenKind::Word),
    ("case", TokenKind::Word),
    ("char", TokenKind::Type),
    ("const", TokenKind::Qualifier),
    ("continue", TokenKind::Word),
    ("default", TokenKind::Word),
    ("do", TokenKind::Word),
    ("double", TokenKind::Type),
    ("else", TokenKind::Word),
    ("enum", TokenKind::Enum),
    ("extern", TokenKind::Extern),
    ("float", TokenKind::Type),
    ("for", TokenKind::Word),
    ("goto", TokenKind::Word),
    ("if", TokenKind::Word),
    ("inline", TokenKind::Qualifier),
    ("int", TokenKind::Type),
    ("long", TokenKind::Type),
    ("register", TokenKind::Qualifier),
    ("restrict", TokenKind::Qualifier),
    ("return", TokenKind::Word),
    ("short", TokenKind::Type),
    ("signed", TokenKind::Type),
    ("sizeof", TokenKind::Word),
    ("static", TokenKind::Static),
    ("struct", TokenKind::Struct),
    ("switch", TokenKind::Word),
    ("typedef", TokenKind::Typedef),
    ("union", TokenKind::Union),
    ("unsigned", TokenKind::Type),
    ("void", TokenKind::Type),
    ("volatile", TokenKind::Qualifier),
    ("while", TokenKind::Word),
    ("_Bool", TokenKind::Type),
    ("__attribute__", TokenKind::Wrapper),
    ("__inline", TokenKind::Qualifier),
    ("__inline__", TokenKind::Qualifier),
    ("__const", TokenKind::Qualifier),
    ("__restrict", TokenKind::Qualifier),
];

/// Seed the symbol table with the built-in keyword classification entries.
pub fn register_keywords(table: &mut SymbolTable) {
    for &(name, kind) in KEYWORDS {
        table.register_token(name, kind);
    }
}

// ============================================================================
// Preprocessor
// ============================================================================

/// External preprocessor command plus accumulated `-D`/`-U`/`-I` options.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    pub command: String,
    pub options: Vec<String>,
}

impl Preprocessor {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            options: Vec::new(),
        }
    }

    /// Run the preprocessor over `path` and return its standard output.
    fn run(&self, path: &str) -> io::Result<Vec<u8>> {
        let mut words = self.command.split_whitespace();
        let program = words.next().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "empty preprocessor command")
        })?;
        let output = Command::new(program)
            .args(words)
            .args(&self.options)
            .arg(path)
            .output()?;
        io::stderr().write_all(&output.stderr)?;
        if !output.status.success() {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("preprocessor exited with {}", output.status),
            ));
        }
        Ok(output.stdout)
    }
}

// ============================================================================
// Lexer
// ============================================================================

/// Byte-level tokenizer over one input file.
pub struct Lexer {
    src: Vec<u8>,
    pos: usize,
    line: u32,
    /// Only whitespace seen so far on the current line
    bol: bool,
    /// Current filename, as adjusted by line directives
    filename: String,
    /// The file actually opened
    canonical: String,
}

impl Lexer {
    pub fn new(src: Vec<u8>, name: &str) -> Self {
        Self {
            src,
            pos: 0,
            line: 1,
            bol: true,
            filename: name.to_string(),
            canonical: name.to_string(),
        }
    }

    /// Tokenize an in-memory string (used heavily by the test suite).
    pub fn from_source(src: &str, name: &str) -> Self {
        Self::new(src.as_bytes().to_vec(), name)
    }

    /// Open `path`, optionally through the external preprocessor.
    pub fn from_file(path: &str, pp: Option<&Preprocessor>) -> io::Result<Self> {
        let src = match pp {
            Some(p) => p.run(path)?,
            None => {
                let file = File::open(path)?;
                let mut reader = BufReader::new(file);
                let mut buffer = Vec::new();
                reader.read_to_end(&mut buffer)?;
                buffer
            }
        };
        Ok(Self::new(src, path))
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn canonical_filename(&self) -> &str {
        &self.canonical
    }

    fn cur(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn at(&self, off: usize) -> Option<u8> {
        self.src.get(self.pos + off).copied()
    }

    /// True when the byte at `idx` starts a line.
    fn at_line_start(&self, idx: usize) -> bool {
        idx == 0 || self.src[idx - 1] == b'\n'
    }

    fn skip_block_comment(&mut self) {
        self.pos += 2;
        while let Some(c) = self.cur() {
            if c == b'\n' {
                self.line += 1;
            } else if c == b'*' && self.at(1) == Some(b'/') {
                self.pos += 2;
                return;
            }
            self.pos += 1;
        }
    }

    fn skip_line_comment(&mut self) {
        while let Some(c) = self.cur() {
            if c == b'\n' {
                return;
            }
            self.pos += 1;
        }
    }

    /// Skip to the end of the current line, honoring backslash
    /// continuations.  Leaves the newline unconsumed.
    fn skip_to_eol(&mut self) {
        while let Some(c) = self.cur() {
            match c {
                b'\\' if self.at(1) == Some(b'\n') => {
                    self.pos += 2;
                    self.line += 1;
                }
                b'\n' => return,
                b'/' if self.at(1) == Some(b'*') => self.skip_block_comment(),
                _ => self.pos += 1,
            }
        }
    }

    /// Handle a `#` line.  `#line N "file"` and `# N "file"` update the
    /// scanner position; everything else is skipped.
    fn directive(&mut self) {
        self.pos += 1;
        while matches!(self.cur(), Some(b' ') | Some(b'\t')) {
            self.pos += 1;
        }
        if self.src[self.pos..].starts_with(b"line") {
            self.pos += 4;
            while matches!(self.cur(), Some(b' ') | Some(b'\t')) {
                self.pos += 1;
            }
        }
        if matches!(self.cur(), Some(c) if c.is_ascii_digit()) {
            let mut n: u32 = 0;
            while let Some(c) = self.cur() {
                if !c.is_ascii_digit() {
                    break;
                }
                n = n.wrapping_mul(10).wrapping_add(u32::from(c - b'0'));
                self.pos += 1;
            }
            while matches!(self.cur(), Some(b' ') | Some(b'\t')) {
                self.pos += 1;
            }
            let mut file = None;
            if self.cur() == Some(b'"') {
                self.pos += 1;
                let start = self.pos;
                while let Some(c) = self.cur() {
                    if c == b'"' || c == b'\n' {
                        break;
                    }
                    self.pos += 1;
                }
                file = Some(String::from_utf8_lossy(&self.src[start..self.pos]).into_owned());
                if self.cur() == Some(b'"') {
                    self.pos += 1;
                }
            }
            self.skip_to_eol();
            if self.cur() == Some(b'\n') {
                self.pos += 1;
            }
            self.line = n.max(1);
            if let Some(f) = file {
                self.filename = f;
            }
        } else {
            self.skip_to_eol();
            if self.cur() == Some(b'\n') {
                self.pos += 1;
                self.line += 1;
            }
        }
        self.bol = true;
    }

    fn scan_identifier(&mut self, table: &SymbolTable) -> Token {
        let start = self.pos;
        let line = self.line;
        while let Some(c) = self.cur() {
            if c.is_ascii_alphanumeric() || c == b'_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        let name = String::from_utf8_lossy(&self.src[start..self.pos]).into_owned();
        let kind = table.token_class(&name).unwrap_or(TokenKind::Identifier);
        Token::new(kind, name, line)
    }

    /// Numeric literals come back as plain word tokens: the expression
    /// scanner ignores them and declaration-text synthesis renders them
    /// between brackets.
    fn scan_number(&mut self) -> Token {
        let start = self.pos;
        let line = self.line;
        self.pos += 1;
        while let Some(c) = self.cur() {
            if c.is_ascii_alphanumeric() || c == b'.' || c == b'_' {
                self.pos += 1;
            } else if (c == b'+' || c == b'-')
                && matches!(self.src[self.pos - 1], b'e' | b'E' | b'p' | b'P')
            {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text = String::from_utf8_lossy(&self.src[start..self.pos]).into_owned();
        Token::new(TokenKind::Word, text, line)
    }

    fn scan_quoted(&mut self, quote: u8) -> Token {
        let line = self.line;
        self.pos += 1;
        let start = self.pos;
        while let Some(c) = self.cur() {
            match c {
                b'\\' => {
                    self.pos += 2;
                    if self.src.get(self.pos - 1) == Some(&b'\n') {
                        self.line += 1;
                    }
                }
                b'\n' => {
                    // unterminated literal; resynchronize at the newline
                    break;
                }
                c if c == quote => break,
                _ => self.pos += 1,
            }
        }
        let end = self.pos.min(self.src.len());
        let text = String::from_utf8_lossy(&self.src[start..end]).into_owned();
        if self.cur() == Some(quote) {
            self.pos += 1;
        }
        Token::new(TokenKind::StringLit, text, line)
    }

    fn op(&mut self, len: usize) -> Token {
        let start = self.pos;
        let line = self.line;
        self.pos += len;
        Token::new(
            TokenKind::Op,
            String::from_utf8_lossy(&self.src[start..self.pos]).into_owned(),
            line,
        )
    }

    /// Produce the next token, classifying identifiers through `table`.
    pub fn next_token(&mut self, table: &SymbolTable) -> Token {
        loop {
            let c = match self.cur() {
                Some(c) => c,
                None => return Token::new(TokenKind::Eof, "", self.line),
            };
            match c {
                b'\n' => {
                    self.pos += 1;
                    self.line += 1;
                    self.bol = true;
                }
                b' ' | b'\t' | b'\r' | 0x0b | 0x0c => self.pos += 1,
                b'\\' if self.at(1) == Some(b'\n') => {
                    self.pos += 2;
                    self.line += 1;
                }
                b'/' if self.at(1) == Some(b'*') => {
                    self.bol = false;
                    self.skip_block_comment();
                }
                b'/' if self.at(1) == Some(b'/') => self.skip_line_comment(),
                b'#' if self.bol => self.directive(),
                _ => break,
            }
        }

        self.bol = false;
        let c = self.src[self.pos];
        let line = self.line;

        if c.is_ascii_alphabetic() || c == b'_' {
            return self.scan_identifier(table);
        }
        if c.is_ascii_digit() {
            return self.scan_number();
        }

        let next = self.at(1);
        match c {
            b'"' | b'\'' => self.scan_quoted(c),
            b'(' => {
                self.pos += 1;
                Token::new(TokenKind::Lparen, "(", line)
            }
            b')' => {
                self.pos += 1;
                Token::new(TokenKind::Rparen, ")", line)
            }
            b'[' => {
                self.pos += 1;
                Token::new(TokenKind::Lbracket, "[", line)
            }
            b']' => {
                self.pos += 1;
                Token::new(TokenKind::Rbracket, "]", line)
            }
            b';' => {
                self.pos += 1;
                Token::new(TokenKind::Semicolon, ";", line)
            }
            b',' => {
                self.pos += 1;
                Token::new(TokenKind::Comma, ",", line)
            }
            b'{' => {
                let kind = if self.at_line_start(self.pos) {
                    TokenKind::Lbrace0
                } else {
                    TokenKind::Lbrace
                };
                self.pos += 1;
                Token::new(kind, "{", line)
            }
            b'}' => {
                let kind = if self.at_line_start(self.pos) {
                    TokenKind::Rbrace0
                } else {
                    TokenKind::Rbrace
                };
                self.pos += 1;
                Token::new(kind, "}", line)
            }
            b'.' => {
                if matches!(next, Some(d) if d.is_ascii_digit()) {
                    self.scan_number()
                } else if next == Some(b'.') && self.at(2) == Some(b'.') {
                    self.op(3)
                } else {
                    self.pos += 1;
                    Token::new(TokenKind::MemberOf, ".", line)
                }
            }
            b'-' => {
                if next == Some(b'>') {
                    self.pos += 2;
                    Token::new(TokenKind::MemberOf, "->", line)
                } else if next == Some(b'-') || next == Some(b'=') {
                    self.op(2)
                } else {
                    self.op(1)
                }
            }
            b'=' => {
                if next == Some(b'=') {
                    self.op(2)
                } else {
                    self.pos += 1;
                    Token::new(TokenKind::Assign, "=", line)
                }
            }
            b'*' => {
                if next == Some(b'=') {
                    self.op(2)
                } else {
                    self.pos += 1;
                    Token::new(TokenKind::Modifier, "*", line)
                }
            }
            b'<' => {
                if next == Some(b'<') {
                    if self.at(2) == Some(b'=') {
                        self.op(3)
                    } else {
                        self.op(2)
                    }
                } else if next == Some(b'=') {
                    self.op(2)
                } else {
                    self.op(1)
                }
            }
            b'>' => {
                if next == Some(b'>') {
                    if self.at(2) == Some(b'=') {
                        self.op(3)
                    } else {
                        self.op(2)
                    }
                } else if next == Some(b'=') {
                    self.op(2)
                } else {
                    self.op(1)
                }
            }
            b'+' | b'&' | b'|' => {
                if next == Some(c) || next == Some(b'=') {
                    self.op(2)
                } else {
                    self.op(1)
                }
            }
            b'!' | b'^' | b'%' | b'/' => {
                if next == Some(b'=') {
                    self.op(2)
                } else {
                    self.op(1)
                }
            }
            b'?' | b':' | b'~' | b'#' => self.op(1),
            _ => {
                // byte we have no use for; drop it and carry on
                self.pos += 1;
                self.next_token(table)
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_table() -> SymbolTable {
        let mut table = SymbolTable::new();
        register_keywords(&mut table);
        table
    }

    fn kinds(src: &str) -> Vec<TokenKind> {
        let table = seeded_table();
        let mut lex = Lexer::from_source(src, "test.c");
        let mut out = Vec::new();
        loop {
            let t = lex.next_token(&table);
            if t.kind == TokenKind::Eof {
                break;
            }
            out.push(t.kind);
        }
        out
    }

    #[test]
    fn test_keyword_classification() {
        assert_eq!(
            kinds("static int x;"),
            vec![
                TokenKind::Static,
                TokenKind::Type,
                TokenKind::Identifier,
                TokenKind::Semicolon
            ]
        );
    }

    #[test]
    fn test_qualifier_and_wrapper() {
        assert_eq!(
            kinds("const __attribute__"),
            vec![TokenKind::Qualifier, TokenKind::Wrapper]
        );
    }

    #[test]
    fn test_pointer_is_modifier_but_mul_assign_is_op() {
        assert_eq!(kinds("* *="), vec![TokenKind::Modifier, TokenKind::Op]);
    }

    #[test]
    fn test_member_of() {
        assert_eq!(
            kinds("a.b c->d"),
            vec![
                TokenKind::Identifier,
                TokenKind::MemberOf,
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::MemberOf,
                TokenKind::Identifier
            ]
        );
    }

    #[test]
    fn test_column_zero_braces() {
        assert_eq!(
            kinds("f()\n{\n x {\n}\n"),
            vec![
                TokenKind::Identifier,
                TokenKind::Lparen,
                TokenKind::Rparen,
                TokenKind::Lbrace0,
                TokenKind::Identifier,
                TokenKind::Lbrace,
                TokenKind::Rbrace0
            ]
        );
    }

    #[test]
    fn test_numbers_are_words() {
        assert_eq!(
            kinds("42 0x1f 3.14 1e-9"),
            vec![TokenKind::Word; 4]
        );
    }

    #[test]
    fn test_comments_and_strings_skipped_or_tokenized() {
        assert_eq!(
            kinds("/* hi */ x // tail\n\"lit\\\"eral\" y"),
            vec![
                TokenKind::Identifier,
                TokenKind::StringLit,
                TokenKind::Identifier
            ]
        );
    }

    #[test]
    fn test_line_tracking() {
        let table = seeded_table();
        let mut lex = Lexer::from_source("a\nb\n\nc", "test.c");
        assert_eq!(lex.next_token(&table).line, 1);
        assert_eq!(lex.next_token(&table).line, 2);
        assert_eq!(lex.next_token(&table).line, 4);
    }

    #[test]
    fn test_line_directive_updates_position() {
        let table = seeded_table();
        let mut lex = Lexer::from_source("#line 10 \"other.h\"\nx\n# 3 \"test.c\"\ny", "test.c");
        let t = lex.next_token(&table);
        assert_eq!(t.text, "x");
        assert_eq!(t.line, 10);
        assert_eq!(lex.filename(), "other.h");
        let t = lex.next_token(&table);
        assert_eq!(t.text, "y");
        assert_eq!(t.line, 3);
        assert_eq!(lex.filename(), "test.c");
    }

    #[test]
    fn test_other_directives_skipped() {
        assert_eq!(
            kinds("#include <stdio.h>\n#define X 1\nmain"),
            vec![TokenKind::Identifier]
        );
    }

    #[test]
    fn test_ellipsis_is_op() {
        assert_eq!(
            kinds("( ... )"),
            vec![TokenKind::Lparen, TokenKind::Op, TokenKind::Rparen]
        );
    }
}
