//
// Copyright (c) 2026 Jeff Garzik
//
// This file is part of the cflow-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// Heuristic declaration parser for cflow
//
// This is not a C grammar.  It recognizes just enough structure to find
// declarations, function bodies, calls and references, and it tolerates
// dialects and extensions by resynchronizing instead of failing.  Every
// speculative path is bracketed by a token-stream mark/restore pair with a
// single point of commitment; abandoned lookahead leaves no state behind.
//
// Parsing mutates the symbol table as a side effect: committed declarators
// install or overwrite symbols, function bodies raise and lower the block
// nesting level (purging automatics on the way out), and the expression
// walker records references and caller/callee edges.
//

use crate::config::Config;
use crate::diag;
use crate::lexer::Lexer;
use crate::symbol::{Storage, SymbolFlag, SymbolId, SymbolTable, SymbolType, INSTALL_UNIT_LOCAL};
use crate::token::{Token, TokenKind, TokenStream};

// ============================================================================
// Declarator Working State
// ============================================================================

/// Working state for one declarator, alive only while it is being
/// recognized.
#[derive(Debug)]
struct Ident {
    name: Option<String>,
    /// Buffer position one past the base-type tokens, reused when a comma
    /// introduces another declarator with the same base type
    type_end: Option<usize>,
    /// Parameter declarators consumed; -1 until a parameter list is seen
    parmcnt: i32,
    line: u32,
    storage: Storage,
}

impl Ident {
    fn new(storage: Storage) -> Self {
        Self {
            name: None,
            type_end: None,
            parmcnt: -1,
            line: 0,
            storage,
        }
    }
}

// ============================================================================
// Declaration Text Arena
// ============================================================================

/// Bump buffer for composing declaration strings, with a savepoint/rewind
/// pair mirroring the token stream's mark/restore so abandoned speculative
/// parses release their partial text.
struct DeclArena {
    buf: String,
    need_space: bool,
}

impl DeclArena {
    fn new() -> Self {
        Self {
            buf: String::new(),
            need_space: false,
        }
    }

    fn mark(&self) -> usize {
        self.buf.len()
    }

    #[cfg_attr(not(test), allow(dead_code))]
    fn rewind(&mut self, mark: usize) {
        self.buf.truncate(mark);
    }

    /// Detach and return everything accumulated past `mark`.
    fn finish(&mut self, mark: usize) -> String {
        self.buf.split_off(mark)
    }

    fn space_if_needed(&mut self) {
        if self.need_space {
            self.buf.push(' ');
        }
    }

    fn push_str(&mut self, s: &str) {
        self.buf.push_str(s);
    }

    fn push_char(&mut self, c: char) {
        self.buf.push(c);
    }
}

// ============================================================================
// Balanced-Skip Result
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Skip {
    Ok,
    /// The next token was not the expected opener; it has been consumed
    NotOpen,
    Eof,
}

// ============================================================================
// Parser
// ============================================================================

/// Recursive-descent recognizer over one translation unit.
///
/// The symbol table outlives the parser: one table accumulates symbols and
/// call-graph edges across every input file of the run.
pub struct Parser<'a> {
    config: &'a Config,
    table: &'a mut SymbolTable,
    stream: TokenStream,
    /// Most recently read token
    tok: Token,
    /// Current block nesting level
    level: i32,
    /// Parameter declaration nesting level
    parm_level: i32,
    /// Function whose body is being walked
    caller: Option<SymbolId>,
    text: DeclArena,
    /// Buffer position up to which tokens feed declaration text
    save_end: Option<usize>,
}

impl<'a> Parser<'a> {
    pub fn new(config: &'a Config, table: &'a mut SymbolTable, lexer: Lexer) -> Self {
        let stream = TokenStream::with_capacity(lexer, config.pushdown);
        Self {
            config,
            table,
            stream,
            tok: Token::eof(),
            level: 0,
            parm_level: 0,
            caller: None,
            text: DeclArena::new(),
            save_end: None,
        }
    }

    /// Parse the whole translation unit: top-level forms until end of
    /// input, compacting the token buffer between forms.
    pub fn parse(&mut self) {
        self.level = 0;
        self.caller = None;
        loop {
            if self.next_token() == TokenKind::Eof {
                break;
            }
            let mut ident = Ident::new(Storage::Extern);
            match self.tok.kind {
                TokenKind::Qualifier => continue,
                TokenKind::Typedef => self.parse_typedef(),
                TokenKind::Extern => {
                    ident.storage = Storage::ExplicitExtern;
                    self.parse_declaration(&mut ident, false);
                }
                TokenKind::Static => {
                    ident.storage = Storage::Static;
                    self.next_token();
                    self.parse_declaration(&mut ident, false);
                }
                _ => self.parse_declaration(&mut ident, false),
            }
            self.stream.compact();
        }
    }

    // ------------------------------------------------------------------
    // Token plumbing
    // ------------------------------------------------------------------

    fn next_token(&mut self) -> TokenKind {
        self.tok = self.stream.next(&*self.table);
        self.tok.kind
    }

    fn putback(&mut self) -> TokenKind {
        self.tok = self.stream.putback();
        self.tok.kind
    }

    fn file_error(&self, msg: &str, near: Option<&Token>) {
        let text = match near {
            Some(t) => format!("{} near {}", msg, t),
            None => msg.to_string(),
        };
        diag::warning_at(self.stream.filename(), self.tok.line, &text);
    }

    fn skip_to(&mut self, kind: TokenKind) {
        while self.next_token() != TokenKind::Eof {
            if self.tok.kind == kind {
                break;
            }
        }
    }

    /// Skip a balanced token run.  `level` > 0 means the opener has already
    /// been consumed.  Column-zero braces count as ordinary braces here.
    fn skip_balanced(&mut self, open: TokenKind, close: TokenKind, mut level: i32) -> Skip {
        if level == 0 {
            if self.next_token() != open {
                return Skip::NotOpen;
            }
            level += 1;
        }
        while self.next_token() != TokenKind::Eof {
            let mut kind = self.tok.kind;
            if kind == TokenKind::Lbrace0 && open == TokenKind::Lbrace {
                kind = TokenKind::Lbrace;
            } else if kind == TokenKind::Rbrace0 && close == TokenKind::Rbrace {
                kind = TokenKind::Rbrace;
            }
            if kind == open {
                level += 1;
            } else if kind == close {
                level -= 1;
                if level == 0 {
                    self.next_token();
                    return Skip::Ok;
                }
            }
        }
        Skip::Eof
    }

    // ------------------------------------------------------------------
    // Declaration text synthesis
    // ------------------------------------------------------------------

    fn save_stack(&mut self) {
        self.save_end = Some(self.stream.cursor().saturating_sub(1));
    }

    fn undo_save_stack(&mut self) {
        self.save_end = None;
    }

    fn save_stack_is_empty(&self) -> bool {
        self.save_end.map_or(true, |end| end == 0)
    }

    fn save_token(&mut self, t: &Token) {
        match t.kind {
            TokenKind::Identifier
            | TokenKind::Type
            | TokenKind::Struct
            | TokenKind::Union
            | TokenKind::Enum
            | TokenKind::Wrapper
            | TokenKind::Word
            | TokenKind::Qualifier => {
                self.text.space_if_needed();
                self.text.push_str(&t.text);
                self.text.need_space = true;
            }
            TokenKind::Modifier => {
                self.text.space_if_needed();
                self.text.push_str(&t.text);
                self.text.need_space = !t.text.starts_with('*');
            }
            // storage class keywords never appear in declaration text
            TokenKind::Extern | TokenKind::Static => {}
            TokenKind::Comma => {
                self.text.push_char(',');
                self.text.need_space = true;
            }
            TokenKind::Lparen => {
                self.text.space_if_needed();
                self.text.push_char('(');
                self.text.need_space = false;
            }
            TokenKind::Rparen => {
                self.text.push_char(')');
                self.text.need_space = true;
            }
            TokenKind::Lbracket | TokenKind::Rbracket => {
                self.text
                    .push_char(if t.kind == TokenKind::Lbracket { '[' } else { ']' });
                self.text.need_space = false;
            }
            TokenKind::Lbrace | TokenKind::Lbrace0 => {
                self.text.space_if_needed();
                self.text.push_char('{');
                self.text.need_space = true;
            }
            TokenKind::Rbrace | TokenKind::Rbrace0 => {
                self.text.space_if_needed();
                self.text.push_char('}');
                self.text.need_space = true;
            }
            TokenKind::Op | TokenKind::MemberOf => {
                self.text.push_char(' ');
                self.text.push_str(&t.text);
                self.text.need_space = true;
            }
            _ => {
                if self.config.verbose {
                    self.file_error("unrecognized definition", Some(t));
                }
            }
        }
    }

    /// Compose the normalized declaration string from the buffered tokens
    /// of the committed declarator, applying the configured elisions.
    fn finish_save_stack(&mut self, name: &str) -> String {
        let end = self.save_end.unwrap_or(0);
        let mark = self.text.mark();
        self.text.need_space = false;
        let mut level = 0;
        let mut found_ident = !self.config.omit_symbol_names;
        for i in 0..end {
            let t = self.stream.token(i).clone();
            match t.kind {
                TokenKind::Lparen if self.config.omit_arguments => {
                    if level == 0 {
                        self.save_token(&t);
                    }
                    level += 1;
                    continue;
                }
                TokenKind::Rparen if self.config.omit_arguments => {
                    level -= 1;
                    if level == 0 {
                        self.save_token(&t);
                    }
                    continue;
                }
                TokenKind::Identifier if !found_ident && t.text == name => {
                    self.text.need_space = true;
                    found_ident = true;
                    continue;
                }
                _ => {}
            }
            if level == 0 {
                self.save_token(&t);
            }
        }
        self.text.finish(mark)
    }

    // ------------------------------------------------------------------
    // Function-vs-variable discrimination
    // ------------------------------------------------------------------

    /// Bounded lookahead deciding whether the upcoming declarator is a
    /// function: scan past type-ish tokens; at the first `(` the declarator
    /// is a function unless a `*` follows (a grouped pointer declarator).
    /// The cursor is rewound either way.
    fn is_function(&mut self) -> bool {
        let sp = self.stream.mark();
        let mut res = false;
        loop {
            match self.tok.kind {
                TokenKind::Qualifier
                | TokenKind::Type
                | TokenKind::Identifier
                | TokenKind::Modifier
                | TokenKind::Static
                | TokenKind::Extern
                | TokenKind::Struct
                | TokenKind::Union
                | TokenKind::Enum => {
                    self.next_token();
                    continue;
                }
                TokenKind::Wrapper => {
                    if self.skip_balanced(TokenKind::Lparen, TokenKind::Rparen, 0) == Skip::Eof {
                        self.file_error("unexpected end of file in declaration", None);
                    }
                    continue;
                }
                TokenKind::Lparen => {
                    res = self.next_token() != TokenKind::Modifier;
                }
                _ => {}
            }
            break;
        }
        self.tok = self.stream.restore(sp);
        res
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    fn parse_declaration(&mut self, ident: &mut Ident, parm: bool) {
        if self.is_function() {
            self.parse_function_declaration(ident, parm);
        } else {
            self.parse_variable_declaration(ident, parm);
        }
        self.table.delete_parms(self.parm_level, self.config);
    }

    fn parse_function_declaration(&mut self, ident: &mut Ident, parm: bool) {
        ident.type_end = None;
        self.parse_knr_dcl(ident);

        let mut error_recovery = false;
        loop {
            match self.tok.kind {
                TokenKind::Rparen if parm => break,
                TokenKind::Semicolon | TokenKind::Comma => break,
                TokenKind::Lbrace | TokenKind::Lbrace0 => {
                    if let Some(name) = ident.name.clone() {
                        let mut caller = self.table.lookup(&name);
                        if let Some(id) = caller {
                            if self.table.get(id).storage == Storage::Auto {
                                caller = None;
                            }
                        }
                        self.caller = caller;
                        self.func_body();
                    }
                    break;
                }
                TokenKind::Eof => {
                    if self.config.verbose {
                        self.file_error("unexpected end of file in declaration", None);
                    }
                    break;
                }
                _ => {
                    if error_recovery {
                        self.next_token();
                    } else {
                        if self.config.verbose {
                            let t = self.tok.clone();
                            self.file_error("expected `;'", Some(&t));
                        }
                        error_recovery = true;
                    }
                }
            }
        }
    }

    fn parse_variable_declaration(&mut self, ident: &mut Ident, parm: bool) {
        let sp = self.stream.mark();
        ident.type_end = None;
        if matches!(
            self.tok.kind,
            TokenKind::Struct | TokenKind::Union | TokenKind::Enum
        ) {
            if self.next_token() == TokenKind::Identifier {
                ident.type_end = Some(self.stream.cursor());
            }
            self.putback();
            self.skip_struct();
            while self.tok.kind == TokenKind::Modifier || self.tok.kind == TokenKind::Qualifier {
                self.next_token();
            }
            if self.tok.kind == TokenKind::Identifier {
                if ident.type_end.is_none() {
                    // there was no tag: splice one synthetic identifier over
                    // the skipped aggregate body, so declarator analysis
                    // treats tagged and untagged aggregates uniformly
                    let pos = self.stream.cursor() - 1;
                    let line = self.tok.line;
                    self.tok = self.stream.restore(sp);
                    if pos > self.stream.cursor() {
                        self.stream.delete_range(self.stream.cursor(), pos - 1);
                    }
                    self.stream.insert(
                        self.stream.cursor(),
                        Token::new(TokenKind::Identifier, "{ ... }", line),
                    );
                }
            } else if self.tok.kind == TokenKind::Semicolon {
                return;
            } else {
                self.tok = self.stream.restore(sp);
            }
        }
        'again: loop {
            self.parse_dcl(ident, false);
            loop {
                match self.tok.kind {
                    TokenKind::Rparen if parm => break 'again,
                    TokenKind::Comma if parm => break 'again,
                    TokenKind::Semicolon => break 'again,
                    TokenKind::Comma => {
                        // second declarator with the same base type: keep
                        // the type tokens, drop the rest, rescan
                        if let Some(end) = ident.type_end {
                            self.stream.truncate(end);
                        }
                        self.tok = self.stream.restore(sp);
                        continue 'again;
                    }
                    TokenKind::Assign => {
                        let kind = self.next_token();
                        if kind == TokenKind::Lbrace || kind == TokenKind::Lbrace0 {
                            self.initializer_list();
                        } else {
                            self.expression();
                        }
                    }
                    TokenKind::Lbrace | TokenKind::Lbrace0 => {
                        self.func_body();
                        break 'again;
                    }
                    TokenKind::Eof => {
                        if self.config.verbose {
                            self.file_error("unexpected end of file in declaration", None);
                        }
                        break 'again;
                    }
                    _ => {
                        if self.config.verbose {
                            let t = self.tok.clone();
                            self.file_error("expected `;'", Some(&t));
                        }
                        break 'again;
                    }
                }
            }
        }
    }

    /// Recognize aggregate heads (`struct tag`, `union tag`, `enum tag`) for
    /// typedefs.  Returns false when the construct turned out not to be an
    /// aggregate (or reads as a function).
    fn fake_struct(&mut self, ident: &mut Ident) -> bool {
        ident.type_end = None;
        if !matches!(
            self.tok.kind,
            TokenKind::Struct | TokenKind::Union | TokenKind::Enum
        ) {
            return false;
        }
        if self.next_token() == TokenKind::Identifier {
            ident.type_end = Some(self.stream.cursor());
        }
        self.putback();
        self.skip_struct();
        match self.tok.kind {
            TokenKind::Identifier | TokenKind::Modifier | TokenKind::Qualifier => {
                self.putback();
            }
            TokenKind::Lparen => return false,
            TokenKind::Semicolon => {}
            _ => {
                let t = self.tok.clone();
                self.file_error("missing `;' after struct declaration", Some(&t));
            }
        }
        true
    }

    /// Skip a struct/union/enum head: optional tag, optional braced body,
    /// trailing attribute wrappers.
    fn skip_struct(&mut self) {
        if self.next_token() == TokenKind::Identifier {
            self.next_token();
        } else if self.tok.kind == TokenKind::Semicolon {
            return;
        }
        if self.tok.kind == TokenKind::Lbrace || self.tok.kind == TokenKind::Lbrace0 {
            if self.skip_balanced(TokenKind::Lbrace, TokenKind::Rbrace, 1) == Skip::Eof {
                self.file_error("unexpected end of file in struct", None);
                return;
            }
        }
        while self.tok.kind == TokenKind::Wrapper {
            if self.skip_balanced(TokenKind::Lparen, TokenKind::Rparen, 0) == Skip::Eof {
                self.file_error("unexpected end of file in struct", None);
                return;
            }
        }
    }

    fn parse_typedef(&mut self) {
        let mut ident = Ident::new(Storage::Any);
        self.next_token();
        if !self.fake_struct(&mut ident) {
            self.putback();
        }
        self.dcl(&mut ident);
        if ident.name.is_some() {
            self.declare_type(&ident);
        }
    }

    fn parse_knr_dcl(&mut self, ident: &mut Ident) {
        ident.type_end = None;
        let maybe_knr = !self.config.strict_ansi;
        self.parse_dcl(ident, maybe_knr);
    }

    fn parse_dcl(&mut self, ident: &mut Ident, maybe_knr: bool) {
        ident.parmcnt = -1;
        ident.name = None;
        self.putback();
        self.dcl(ident);
        self.save_stack();
        if ident.name.is_some() {
            self.declare(ident, maybe_knr);
        } else {
            self.undo_save_stack();
        }
    }

    // ------------------------------------------------------------------
    // Declarator recognition
    // ------------------------------------------------------------------

    /// Consume base-type tokens up to the declarator proper, tracking where
    /// the type portion ends.  Returns false when the run cannot be a
    /// declarator.
    fn dcl(&mut self, ident: &mut Ident) -> bool {
        loop {
            let kind = self.next_token();
            if kind == TokenKind::Eof || kind == TokenKind::Lparen {
                break;
            }
            match kind {
                TokenKind::Modifier => {
                    if ident.type_end.is_none() {
                        ident.type_end = Some(self.stream.cursor() - 1);
                    }
                }
                TokenKind::Wrapper => {
                    if self.skip_balanced(TokenKind::Lparen, TokenKind::Rparen, 0) == Skip::Eof {
                        self.file_error("unexpected end of file in function declaration", None);
                        return false;
                    }
                }
                TokenKind::Identifier => {
                    while self.tok.kind == TokenKind::Identifier {
                        self.next_token();
                    }
                    let after = self.tok.kind;
                    self.putback();
                    if !matches!(
                        after,
                        TokenKind::Type | TokenKind::Modifier | TokenKind::Qualifier
                    ) {
                        break;
                    }
                }
                TokenKind::Rparen | TokenKind::Semicolon => return false,
                _ => {}
            }
        }
        if ident.type_end.is_none() {
            ident.type_end = Some(self.stream.cursor().saturating_sub(1));
        }
        self.dirdcl(ident)
    }

    /// Direct declarator: nested parenthesized declarators, the declared
    /// name, array and parameter-list suffixes, attribute wrappers.
    fn dirdcl(&mut self, ident: &mut Ident) -> bool {
        let mut wrapper = false;
        let mut named_here = false;

        if self.tok.kind == TokenKind::Lparen {
            self.dcl(ident);
            if self.tok.kind != TokenKind::Rparen && self.config.verbose {
                let t = self.tok.clone();
                self.file_error("expected `)'", Some(&t));
                return false;
            }
        } else if self.tok.kind == TokenKind::Identifier {
            ident.name = Some(self.tok.text.clone());
            ident.line = self.tok.line;
            named_here = true;
        }

        if self.next_token() == TokenKind::Wrapper {
            wrapper = true;
            self.next_token(); // the wrapper's opening paren
        } else {
            self.putback();
        }

        loop {
            let kind = self.next_token();
            if kind == TokenKind::Lbracket {
                self.skip_to(TokenKind::Rbracket);
            } else if kind == TokenKind::Lparen {
                let cnt = if named_here {
                    Some(&mut ident.parmcnt)
                } else {
                    None
                };
                self.maybe_parm_list(cnt);
                if self.tok.kind != TokenKind::Rparen && self.config.verbose {
                    let t = self.tok.clone();
                    self.file_error("expected `)'", Some(&t));
                    return false;
                }
            } else {
                break;
            }
        }

        if wrapper {
            self.next_token(); // the wrapper's closing paren
        }
        while self.tok.kind == TokenKind::Wrapper {
            if self.skip_balanced(TokenKind::Lparen, TokenKind::Rparen, 0) == Skip::Eof {
                self.file_error("unexpected end of file in function declaration", None);
            }
        }
        true
    }

    /// A parenthesized list that may be a parameter list.  Counts parameter
    /// declarators into `parm_cnt` and installs them as pending parameter
    /// symbols.
    fn maybe_parm_list(&mut self, mut parm_cnt: Option<&mut i32>) {
        let mut parmcnt = 0;
        self.parm_level += 1;
        while self.next_token() != TokenKind::Eof {
            match self.tok.kind {
                TokenKind::Rparen => {
                    if let Some(cnt) = parm_cnt.take() {
                        *cnt = parmcnt;
                    }
                    self.parm_level -= 1;
                    return;
                }
                TokenKind::Comma => {}
                TokenKind::Qualifier
                | TokenKind::Identifier
                | TokenKind::Modifier
                | TokenKind::Struct
                | TokenKind::Union
                | TokenKind::Type => {
                    parmcnt += 1;
                    let mut ident = Ident::new(Storage::Auto);
                    self.parse_declaration(&mut ident, true);
                    self.putback();
                }
                _ => {
                    if self.config.verbose {
                        let t = self.tok.clone();
                        self.file_error("unexpected token in parameter list", Some(&t));
                    }
                    let mut level = 0;
                    loop {
                        match self.tok.kind {
                            TokenKind::Lparen => level += 1,
                            TokenKind::Rparen => {
                                let before = level;
                                level -= 1;
                                if before == 0 {
                                    break;
                                }
                            }
                            _ => {}
                        }
                        if self.next_token() == TokenKind::Eof {
                            break;
                        }
                    }
                    self.putback();
                }
            }
        }
        if self.config.verbose {
            self.file_error("unexpected end of file in parameter list", None);
        }
    }

    /// Old-style parameter declarations between a function declarator and
    /// its body.  Returns true when the lookahead did not resolve to a
    /// consistent parameter sequence and was rolled back.
    fn get_knr_args(&mut self, ident: &Ident) -> bool {
        if !matches!(
            self.tok.kind,
            TokenKind::Identifier | TokenKind::Type | TokenKind::Struct
        ) {
            return false;
        }
        let sp = self.stream.mark();
        let mut parmcnt = 0;
        let mut stop = false;
        while !stop && parmcnt < ident.parmcnt {
            let mut id = Ident::new(Storage::Auto);
            match self.tok.kind {
                TokenKind::Lbrace | TokenKind::Lbrace0 => {
                    self.putback();
                    stop = true;
                }
                TokenKind::Type | TokenKind::Identifier | TokenKind::Struct => {
                    self.putback();
                    let new_sp = self.stream.mark();
                    if self.dcl(&mut id) {
                        parmcnt += 1;
                        if self.tok.kind == TokenKind::Comma {
                            loop {
                                if let Some(end) = id.type_end {
                                    self.stream.truncate(end);
                                }
                                self.tok = self.stream.restore(new_sp);
                                self.dcl(&mut id);
                                if self.tok.kind != TokenKind::Comma {
                                    break;
                                }
                            }
                        } else if self.tok.kind != TokenKind::Semicolon {
                            self.putback();
                        }
                    } else {
                        self.tok = self.stream.restore(sp);
                        return true;
                    }
                }
                _ => {
                    self.tok = self.stream.restore(sp);
                    return true;
                }
            }
            self.next_token();
        }
        false
    }

    // ------------------------------------------------------------------
    // Function bodies and expressions
    // ------------------------------------------------------------------

    /// Walk a function body, dispatching block-scope declarations back into
    /// the declarator recognizer and everything else into the expression
    /// scanner.  Automatics are purged as each level closes.
    fn func_body(&mut self) {
        self.level += 1;
        self.table.move_parms(self.level);
        while self.level > 0 {
            self.stream.compact();
            self.next_token();
            match self.tok.kind {
                TokenKind::Static => {
                    let mut ident = Ident::new(Storage::Static);
                    self.next_token();
                    self.parse_variable_declaration(&mut ident, false);
                }
                TokenKind::Type | TokenKind::Struct | TokenKind::Union | TokenKind::Enum => {
                    let mut ident = Ident::new(Storage::Auto);
                    self.parse_variable_declaration(&mut ident, false);
                }
                TokenKind::Extern => {
                    let mut ident = Ident::new(Storage::ExplicitExtern);
                    self.parse_declaration(&mut ident, false);
                }
                TokenKind::Lbrace0 | TokenKind::Lbrace => self.level += 1,
                TokenKind::Rbrace0 => {
                    if self.config.use_indentation {
                        if self.config.verbose && self.level != 1 {
                            self.file_error("forced function body close", None);
                        }
                        while self.level > 0 {
                            self.table.delete_autos(self.level, self.config);
                            self.level -= 1;
                        }
                    } else {
                        self.table.delete_autos(self.level, self.config);
                        self.level -= 1;
                    }
                }
                TokenKind::Rbrace => {
                    self.table.delete_autos(self.level, self.config);
                    self.level -= 1;
                }
                TokenKind::Eof => {
                    if self.config.verbose {
                        self.file_error("unexpected end of file in function body", None);
                    }
                    self.caller = None;
                    return;
                }
                _ => self.expression(),
            }
        }
        self.caller = None;
    }

    fn initializer_list(&mut self) {
        let mut level = 0;
        loop {
            match self.tok.kind {
                TokenKind::Lbrace | TokenKind::Lbrace0 => level += 1,
                TokenKind::Rbrace | TokenKind::Rbrace0 => {
                    level -= 1;
                    if level <= 0 {
                        self.next_token();
                        return;
                    }
                }
                TokenKind::Eof => {
                    self.file_error("unexpected end of file in initializer list", None);
                    return;
                }
                TokenKind::Comma => {}
                _ => self.expression(),
            }
            self.next_token();
        }
    }

    /// Flat token walk over an expression.  The only significant
    /// constructs are `identifier (` (a call) and a bare identifier (a
    /// reference); parenthesized type names read as casts and member
    /// selections do not produce references.
    fn expression(&mut self) {
        let mut parens_lev = 0;
        loop {
            match self.tok.kind {
                TokenKind::Semicolon => return,
                TokenKind::Lbrace
                | TokenKind::Lbrace0
                | TokenKind::Rbrace
                | TokenKind::Rbrace0 => {
                    self.putback();
                    return;
                }
                TokenKind::Comma if parens_lev == 0 => return,
                TokenKind::Eof => {
                    if self.config.verbose {
                        self.file_error("unexpected end of file in expression", None);
                    }
                    return;
                }
                TokenKind::Identifier => {
                    let name = self.tok.text.clone();
                    let line = self.tok.line;
                    self.next_token();
                    if self.tok.kind == TokenKind::Lparen {
                        self.call(&name, line);
                        parens_lev += 1;
                    } else {
                        self.reference(&name, line);
                        // a member selection can follow a closing paren,
                        // as in (*a)->b
                        while parens_lev > 0 && self.tok.kind == TokenKind::Rparen {
                            parens_lev -= 1;
                            self.next_token();
                        }
                        if self.tok.kind == TokenKind::MemberOf {
                            self.next_token();
                        } else {
                            self.putback();
                        }
                    }
                }
                TokenKind::Lparen => {
                    // maybe a typecast
                    let kind = self.next_token();
                    if matches!(
                        kind,
                        TokenKind::Type | TokenKind::Struct | TokenKind::Union | TokenKind::Enum
                    ) {
                        self.skip_to(TokenKind::Rparen);
                    } else {
                        self.putback();
                        parens_lev += 1;
                    }
                }
                TokenKind::Rparen => parens_lev -= 1,
                TokenKind::MemberOf => {
                    self.next_token();
                }
                _ => {}
            }
            self.next_token();
        }
    }

    // ------------------------------------------------------------------
    // Symbol table commits
    // ------------------------------------------------------------------

    fn in_included_text(&self) -> bool {
        self.stream.in_included_text()
    }

    fn call(&mut self, name: &str, line: u32) {
        let unit_local = self.in_included_text();
        let file = self.stream.filename().to_string();
        let id = match self
            .table
            .record_reference(name, &file, line, unit_local, self.config)
        {
            Some(id) => id,
            None => return,
        };
        if self.table.get(id).arity < 0 {
            self.table.get_mut(id).arity = 0;
        }
        if let Some(caller) = self.caller {
            self.table.record_call(caller, id);
        }
    }

    fn reference(&mut self, name: &str, line: u32) {
        let unit_local = self.in_included_text();
        let file = self.stream.filename().to_string();
        let id = match self
            .table
            .record_reference(name, &file, line, unit_local, self.config)
        {
            Some(id) => id,
            None => return,
        };
        if let Some(caller) = self.caller {
            self.table.record_call(caller, id);
        }
    }

    /// Commit a recognized declarator to the symbol table.
    fn declare(&mut self, ident: &mut Ident, maybe_knr: bool) {
        if ident.storage == Storage::Auto {
            self.undo_save_stack();
            let name = ident.name.clone().unwrap_or_default();
            let id = self.table.install_ident(&name, Storage::Auto, false);
            let parm_level = self.parm_level;
            let level = self.level;
            let sym = self.table.get_mut(id);
            if parm_level > 0 {
                sym.level = parm_level;
                sym.flag = SymbolFlag::Parameter;
            } else {
                sym.level = level;
            }
            sym.arity = -1;
            return;
        }

        if (ident.parmcnt >= 0
            && (!maybe_knr || !self.get_knr_args(ident))
            && !matches!(
                self.tok.kind,
                TokenKind::Lbrace | TokenKind::Lbrace0 | TokenKind::Type | TokenKind::Wrapper
            ))
            || (ident.parmcnt < 0 && ident.storage == Storage::ExplicitExtern)
            || self.save_stack_is_empty()
        {
            // a declaration rather than a definition
            self.undo_save_stack();
            return;
        }

        let name = ident.name.clone().unwrap_or_default();
        let unit_local = self.in_included_text();
        let mut id = self.table.resolve_identifier(&name, unit_local);
        if self.table.get(id).source.is_some() {
            if ident.storage == Storage::Static
                && (self.table.get(id).storage != Storage::Static || self.level > 0)
            {
                // a static definition shadowing an earlier global one gets
                // a fresh chained symbol
                id = self.table.install_ident(&name, Storage::Static, unit_local);
            } else {
                let prev = self.table.get(id);
                let prev_arity = prev.arity;
                let prev_line = prev.def_line;
                let prev_source = prev.source.clone().unwrap_or_default();
                let file = self.stream.filename().to_string();
                if prev_arity >= 0 {
                    diag::error_at(
                        &file,
                        ident.line,
                        &format!("{}/{} redefined", name, prev_arity),
                    );
                } else {
                    diag::error_at(&file, ident.line, &format!("{} redefined", name));
                }
                diag::error_at(
                    &prev_source,
                    prev_line,
                    "this is the place of previous definition",
                );
            }
        }

        let storage = if ident.storage == Storage::ExplicitExtern {
            Storage::Extern
        } else {
            ident.storage
        };
        let decl = self.finish_save_stack(&name);
        let file = self.stream.filename().to_string();
        let level = self.level;
        self.table.change_storage(id, storage);
        let sym = self.table.get_mut(id);
        sym.ty = SymbolType::Identifier;
        if !(sym.arity >= 0 && ident.parmcnt < 0) {
            sym.arity = ident.parmcnt;
        }
        sym.decl = Some(decl);
        sym.source = Some(file);
        sym.def_line = ident.line;
        sym.level = level;
    }

    /// Commit a typedef name as a registered type token, visible to the
    /// scanner for the rest of the unit.
    fn declare_type(&mut self, ident: &Ident) {
        self.undo_save_stack();
        let name = match &ident.name {
            Some(n) => n.clone(),
            None => return,
        };
        let found = self.table.lookup(&name).and_then(|head| {
            self.table
                .chain_find(head, |s| s.ty == SymbolType::Token(TokenKind::Type))
        });
        let id = match found {
            Some(id) => id,
            None => self.table.install(&name, INSTALL_UNIT_LOCAL),
        };
        let file = self.stream.filename().to_string();
        let sym = self.table.get_mut(id);
        sym.ty = SymbolType::Token(TokenKind::Type);
        sym.source = Some(file);
        sym.def_line = ident.line;
        sym.refs.clear();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::is_function;

    fn parse_with(src: &str, config: &Config) -> SymbolTable {
        let mut table = SymbolTable::new();
        crate::lexer::register_keywords(&mut table);
        let lexer = Lexer::from_source(src, "test.c");
        let mut parser = Parser::new(config, &mut table, lexer);
        parser.parse();
        table
    }

    fn parse(src: &str) -> SymbolTable {
        parse_with(src, &Config::default())
    }

    #[test]
    fn test_function_definition_and_call() {
        let table = parse("int f(int x)\n{\n g();\n}\n");
        let f = table.lookup("f").unwrap();
        let g = table.lookup("g").unwrap();

        assert_eq!(table.get(f).arity, 1);
        assert_eq!(table.get(f).def_line, 1);
        assert_eq!(table.get(f).source.as_deref(), Some("test.c"));

        assert_eq!(table.get(g).arity, 0);
        assert!(table.get(g).source.is_none());
        assert_eq!(table.get(g).refs.len(), 1);
        assert_eq!(table.get(g).refs[0].line, 3);

        assert_eq!(table.get(f).callees, vec![g]);
        assert_eq!(table.get(g).callers, vec![f]);
    }

    #[test]
    fn test_declaration_text() {
        let table = parse("char *dup_string(const char *s, int len)\n{\n}\n");
        let id = table.lookup("dup_string").unwrap();
        assert_eq!(
            table.get(id).decl.as_deref(),
            Some("char *dup_string (const char *s, int len)")
        );
    }

    #[test]
    fn test_omit_arguments() {
        let config = Config {
            omit_arguments: true,
            ..Config::default()
        };
        let table = parse_with("int f(int x)\n{\n}\n", &config);
        let id = table.lookup("f").unwrap();
        assert_eq!(table.get(id).decl.as_deref(), Some("int f ()"));
    }

    #[test]
    fn test_omit_symbol_names() {
        let config = Config {
            omit_symbol_names: true,
            ..Config::default()
        };
        let table = parse_with("int f(int x)\n{\n}\n", &config);
        let id = table.lookup("f").unwrap();
        assert_eq!(table.get(id).decl.as_deref(), Some("int (int x)"));
    }

    #[test]
    fn test_prototype_is_not_a_definition() {
        let table = parse("int f(int x);\n");
        assert!(table.lookup("f").is_none());
    }

    #[test]
    fn test_redefinition_keeps_one_live_symbol() {
        let table = parse("int f()\n{\n}\nint f(int x)\n{\n}\n");
        let live: Vec<_> = table
            .collect(|s| s.name == "f" && s.ty == SymbolType::Identifier)
            .into_iter()
            .collect();
        assert_eq!(live.len(), 1);
        assert_eq!(table.get(live[0]).arity, 1);
        assert_eq!(table.get(live[0]).def_line, 4);
    }

    #[test]
    fn test_block_local_not_visible_after_block() {
        let table = parse("void f(void)\n{\n int x;\n use(x);\n}\n");
        assert!(table.lookup("x").is_none());
        // the local never produced a reference or an edge
        let use_id = table.lookup("use").unwrap();
        let f = table.lookup("f").unwrap();
        assert_eq!(table.get(use_id).callers, vec![f]);
        assert_eq!(table.get(f).callees, vec![use_id]);
    }

    #[test]
    fn test_knr_definition_arity() {
        let table = parse("int f(x)\nint x;\n{\n return x;\n}\n");
        let f = table.lookup("f").unwrap();
        assert_eq!(table.get(f).arity, 1);
        assert!(is_function(table.get(f)));
    }

    #[test]
    fn test_parameters_not_recorded_as_references() {
        let table = parse("int f(int count)\n{\n return count + 1;\n}\n");
        // count resolves to the parameter, which is auto storage
        assert!(table.lookup("count").is_none());
        let f = table.lookup("f").unwrap();
        assert!(table.get(f).callees.is_empty());
    }

    #[test]
    fn test_typedef_registers_type() {
        let table = parse("typedef struct list LIST;\nLIST *head;\n");
        assert_eq!(table.token_class("LIST"), Some(TokenKind::Type));
        let head = table.lookup("head").unwrap();
        assert_eq!(table.get(head).arity, -1);
        assert_eq!(table.get(head).decl.as_deref(), Some("LIST *head"));
    }

    #[test]
    fn test_anonymous_struct_normalized() {
        let table = parse("struct\n{\n int a;\n} obj;\n");
        let obj = table.lookup("obj").unwrap();
        assert_eq!(table.get(obj).decl.as_deref(), Some("struct { ... } obj"));
    }

    #[test]
    fn test_enum_constants_not_installed() {
        let table = parse("enum color { RED, GREEN } current;\n");
        let current = table.lookup("current").unwrap();
        assert_eq!(table.get(current).arity, -1);
        assert!(table.lookup("RED").is_none());
        assert!(table.lookup("GREEN").is_none());
    }

    #[test]
    fn test_anonymous_enum_normalized() {
        let table = parse("enum\n{\n FIRST\n} obj;\n");
        let obj = table.lookup("obj").unwrap();
        assert_eq!(table.get(obj).decl.as_deref(), Some("enum { ... } obj"));
        assert!(table.lookup("FIRST").is_none());
    }

    #[test]
    fn test_typedef_enum() {
        let table = parse("typedef enum { OK_S, ERR_S } status_t;\n");
        assert_eq!(table.token_class("status_t"), Some(TokenKind::Type));
        assert!(table.lookup("OK_S").is_none());
    }

    #[test]
    fn test_block_scope_enum_variable() {
        let table = parse("void f(void)\n{\n enum color c;\n use(c);\n}\n");
        assert!(table.lookup("c").is_none());
        let f = table.lookup("f").unwrap();
        let use_id = table.lookup("use").unwrap();
        assert_eq!(table.get(f).callees, vec![use_id]);
    }

    #[test]
    fn test_multiple_declarators_share_base_type() {
        let table = parse("int first = 1, second = 2;\n");
        let first = table.lookup("first").unwrap();
        let second = table.lookup("second").unwrap();
        assert_eq!(table.get(first).decl.as_deref(), Some("int first"));
        assert_eq!(table.get(second).decl.as_deref(), Some("int second"));
    }

    #[test]
    fn test_function_pointer_variable_is_data() {
        let table = parse("int (*handler)(void);\n");
        let id = table.lookup("handler").unwrap();
        assert_eq!(table.get(id).arity, -1);
        assert!(!is_function(table.get(id)));
    }

    #[test]
    fn test_cast_is_not_a_call() {
        let table = parse("void f(void)\n{\n y = (int) g(y);\n}\n");
        let f = table.lookup("f").unwrap();
        let g = table.lookup("g").unwrap();
        assert!(is_function(table.get(g)));
        assert_eq!(table.get(f).callees, vec![g]);
        assert!(table.lookup("int").is_some()); // the keyword entry, untouched
    }

    #[test]
    fn test_member_selection_suppresses_reference() {
        let table = parse("void f(void)\n{\n p->count = q.total;\n}\n");
        assert!(table.lookup("count").is_none());
        assert!(table.lookup("total").is_none());
        assert!(table.lookup("p").is_some());
        assert!(table.lookup("q").is_some());
    }

    #[test]
    fn test_call_in_argument_list() {
        let table = parse("void f(void)\n{\n outer(inner());\n}\n");
        let f = table.lookup("f").unwrap();
        let outer = table.lookup("outer").unwrap();
        let inner = table.lookup("inner").unwrap();
        assert!(table.get(f).callees.contains(&outer));
        assert!(table.get(f).callees.contains(&inner));
    }

    #[test]
    fn test_duplicate_calls_deduplicated() {
        let table = parse("void f(void)\n{\n g();\n g();\n}\n");
        let f = table.lookup("f").unwrap();
        let g = table.lookup("g").unwrap();
        assert_eq!(table.get(f).callees, vec![g]);
        assert_eq!(table.get(g).callers, vec![f]);
        assert_eq!(table.get(g).refs.len(), 2);
    }

    #[test]
    fn test_static_definition_shadows_global() {
        let table = parse("int helper()\n{\n}\nstatic int helper()\n{\n}\n");
        let live = table.lookup("helper").unwrap();
        assert_eq!(table.get(live).storage, Storage::Static);
        let all = table.collect(|s| s.name == "helper" && s.ty == SymbolType::Identifier);
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_static_not_resolvable_after_unit_but_listed() {
        let config = Config::default();
        let mut table = SymbolTable::new();
        crate::lexer::register_keywords(&mut table);
        let lexer = Lexer::from_source(
            "static int helper(void)\n{\n}\nint user(void)\n{\n helper();\n}\n",
            "a.c",
        );
        Parser::new(&config, &mut table, lexer).parse();
        let helper = table.lookup("helper").unwrap();
        table.delete_statics(&config);

        // not visible while the next unit parses
        assert!(table.lookup("helper").is_none());
        // yet retained for listings that include static symbols
        assert!(table.collect_functions().contains(&helper));
        assert_eq!(table.get(helper).ty, SymbolType::Identifier);
    }

    #[test]
    fn test_wrapper_attributes_skipped() {
        let table = parse("int f(int x) __attribute__((unused));\nint f(int x)\n{\n}\n");
        let f = table.lookup("f").unwrap();
        assert_eq!(table.get(f).arity, 1);
    }

    #[test]
    fn test_initializer_calls_recorded_at_file_scope() {
        let table = parse("int limit = compute();\n");
        // no caller context at file scope: a reference is recorded but no
        // edge is drawn
        let compute = table.lookup("compute").unwrap();
        assert!(table.get(compute).callers.is_empty());
        assert_eq!(table.get(compute).refs.len(), 1);
    }

    #[test]
    fn test_use_indentation_forces_body_close() {
        let config = Config {
            use_indentation: true,
            ..Config::default()
        };
        // the inner brace never closes; the column-zero brace ends the body
        let table = parse_with(
            "void f(void)\n{\n if (x) {\n g();\n}\nint h(void)\n{\n}\n",
            &config,
        );
        assert!(table.lookup("h").is_some());
        // a lone `void` still reads as one parameter declarator
        assert_eq!(table.get(table.lookup("h").unwrap()).arity, 1);
    }

    #[test]
    fn test_decl_arena_savepoint_rewind() {
        let mut arena = DeclArena::new();
        arena.push_str("int f");
        let mark = arena.mark();
        arena.push_str(" (int x)");
        arena.rewind(mark);
        assert_eq!(arena.finish(0), "int f");
    }
}
