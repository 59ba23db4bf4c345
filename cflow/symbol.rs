//
// Copyright (c) 2026 Jeff Garzik
//
// This file is part of the cflow-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// Symbol table for cflow
//
// Symbols live in a stable arena and are addressed by SymbolId, so the
// caller/callee edge sets can hold handles that stay valid after a symbol
// leaves the live name table.  Name lookup goes through per-name buckets
// holding chains in most-recent-first order; an alias symbol redirects
// lookup to its target before anything else sees it.
//
// Lifetime is driven by storage class: automatics die with their block,
// statics and unit-local symbols die with their translation unit, extern
// symbols live for the whole run.  A symbol leaving the table is only
// destroyed when nothing in the output stage could still need it.
//

use crate::config::Config;
use crate::token::TokenKind;
use std::collections::HashMap;

// ============================================================================
// Symbol Id
// ============================================================================

/// Handle into the symbol arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(pub u32);

impl SymbolId {
    fn idx(self) -> usize {
        self.0 as usize
    }
}

// ============================================================================
// Storage Classes
// ============================================================================

/// Storage class, governing visibility and lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    /// File-scope symbol without an explicit storage keyword
    Extern,
    /// Declared with the `extern` keyword
    ExplicitExtern,
    Static,
    Auto,
    /// Typedefs and other storage-agnostic entries
    Any,
}

// ============================================================================
// Symbol Type and Flags
// ============================================================================

/// What a table entry stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolType {
    /// Freshly installed or destroyed entry
    Undefined,
    /// A token class registration (keyword, type name, qualifier, wrapper)
    Token(TokenKind),
    /// Function or variable
    Identifier,
    /// Redirects lookup to another symbol; the rest of the record is unused
    Alias(SymbolId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolFlag {
    None,
    /// Must be dropped at the end of the current compilation unit
    UnitLocal,
    /// Function parameter awaiting promotion to a body-local automatic
    Parameter,
}

/// Which retention list currently owns the symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Retention {
    Static,
    Auto,
}

// ============================================================================
// Symbol
// ============================================================================

/// One recorded occurrence of a name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ref {
    pub file: String,
    pub line: u32,
}

/// A symbol record.  Call graph edges are non-owning SymbolId handles.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub ty: SymbolType,
    pub flag: SymbolFlag,
    pub storage: Storage,
    /// Block nesting level for automatics, parameter level for parameters
    pub level: i32,
    /// Declared parameter count; -1 marks a variable
    pub arity: i32,
    /// Normalized declaration text
    pub decl: Option<String>,
    /// File of the definition, when one was seen
    pub source: Option<String>,
    pub def_line: u32,
    /// Every place the symbol was referenced
    pub refs: Vec<Ref>,
    pub callers: Vec<SymbolId>,
    pub callees: Vec<SymbolId>,
    /// Output line at which the symbol's subtree is being expanded;
    /// 0 when not on the traversal stack
    pub active: u32,
    pub recursive: bool,
    /// Dense index assigned during output
    pub ord: usize,
    /// Still reachable through the name buckets
    linked: bool,
    list: Option<Retention>,
}

impl Symbol {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ty: SymbolType::Undefined,
            flag: SymbolFlag::None,
            storage: Storage::Extern,
            level: -1,
            arity: -1,
            decl: None,
            source: None,
            def_line: 0,
            refs: Vec::new(),
            callers: Vec::new(),
            callees: Vec::new(),
            active: 0,
            recursive: false,
            ord: 0,
            linked: false,
            list: None,
        }
    }
}

/// Function symbols are identifiers that acquired a parameter count.
pub fn is_function(sym: &Symbol) -> bool {
    sym.ty == SymbolType::Identifier && sym.arity >= 0
}

// ============================================================================
// Install Flags
// ============================================================================

pub const INSTALL_DEFAULT: u32 = 0x00;
/// Reuse an existing entry with the same name instead of chaining a new one
pub const INSTALL_OVERWRITE: u32 = 0x01;
/// The new symbol dies with the current compilation unit
pub const INSTALL_UNIT_LOCAL: u32 = 0x02;

// ============================================================================
// Symbol Table
// ============================================================================

pub struct SymbolTable {
    syms: Vec<Symbol>,
    /// name -> chain of ids, most recent first
    buckets: HashMap<String, Vec<SymbolId>>,
    /// Symbols to drop at end of the current translation unit
    static_list: Vec<SymbolId>,
    /// Symbols to drop at block exit
    auto_list: Vec<SymbolId>,
    /// File-static functions kept for cross-unit graph output
    static_func_list: Vec<SymbolId>,
    /// Unit-local symbols retained for the cross-reference listing
    unit_local_list: Vec<SymbolId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            syms: Vec::new(),
            buckets: HashMap::new(),
            static_list: Vec::new(),
            auto_list: Vec::new(),
            static_func_list: Vec::new(),
            unit_local_list: Vec::new(),
        }
    }

    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.syms[id.idx()]
    }

    pub fn get_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.syms[id.idx()]
    }

    // ------------------------------------------------------------------
    // Retention list bookkeeping
    // ------------------------------------------------------------------

    fn retained_vec(&mut self, which: Retention) -> &mut Vec<SymbolId> {
        match which {
            Retention::Static => &mut self.static_list,
            Retention::Auto => &mut self.auto_list,
        }
    }

    fn append_retained(&mut self, id: SymbolId, which: Retention) {
        if let Some(cur) = self.syms[id.idx()].list {
            self.retained_vec(cur).retain(|&x| x != id);
        }
        self.retained_vec(which).push(id);
        self.syms[id.idx()].list = Some(which);
    }

    fn remove_retained(&mut self, id: SymbolId) {
        if let Some(cur) = self.syms[id.idx()].list {
            self.retained_vec(cur).retain(|&x| x != id);
            self.syms[id.idx()].list = None;
        }
    }

    // ------------------------------------------------------------------
    // Install and lookup
    // ------------------------------------------------------------------

    /// Install a new symbol named `name`, chaining onto an existing bucket
    /// on collision.  An undefined chain head is replaced outright.
    pub fn install(&mut self, name: &str, flags: u32) -> SymbolId {
        if flags & INSTALL_OVERWRITE != 0 {
            if let Some(ids) = self.buckets.get(name) {
                if let Some(&head) = ids.first() {
                    return head;
                }
            }
        }
        let id = SymbolId(self.syms.len() as u32);
        self.syms.push(Symbol::new(name));
        if flags & INSTALL_UNIT_LOCAL != 0 {
            self.syms[id.idx()].flag = SymbolFlag::UnitLocal;
            self.append_retained(id, Retention::Static);
        }
        let mut replaced = None;
        let bucket = self.buckets.entry(name.to_string()).or_default();
        match bucket.first().copied() {
            Some(head) if self.syms[head.idx()].ty == SymbolType::Undefined => {
                bucket[0] = id;
                replaced = Some(head);
            }
            Some(_) => bucket.insert(0, id),
            None => bucket.push(id),
        }
        if let Some(old) = replaced {
            self.syms[old.idx()].linked = false;
        }
        self.syms[id.idx()].linked = true;
        id
    }

    /// Register a token-class entry (keyword seeding and `--symbol`
    /// overrides).
    pub fn register_token(&mut self, name: &str, kind: TokenKind) -> SymbolId {
        let id = self.install(name, INSTALL_OVERWRITE);
        let sym = &mut self.syms[id.idx()];
        sym.ty = SymbolType::Token(kind);
        sym.source = None;
        sym.def_line = 0;
        sym.refs.clear();
        id
    }

    /// Register `name` as an alias of `target` (`--symbol NAME:=TARGET`).
    /// An unknown target is created as an unclassified token entry.
    pub fn register_alias(&mut self, name: &str, target: &str) -> SymbolId {
        let target_id = match self.lookup(target) {
            Some(id) => id,
            None => self.register_token(target, TokenKind::Identifier),
        };
        let id = self.install(name, INSTALL_OVERWRITE);
        let sym = &mut self.syms[id.idx()];
        sym.ty = SymbolType::Alias(target_id);
        sym.source = None;
        sym.def_line = 0;
        sym.refs.clear();
        id
    }

    /// Look `name` up in the live table, following alias redirection.
    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        let mut id = *self.buckets.get(name)?.first()?;
        let mut hops = 0;
        while let SymbolType::Alias(target) = self.syms[id.idx()].ty {
            id = target;
            hops += 1;
            if hops > self.syms.len() {
                break;
            }
        }
        Some(id)
    }

    /// Token class a name was registered with, if any.  The scanner queries
    /// this for every identifier-shaped token.
    pub fn token_class(&self, name: &str) -> Option<TokenKind> {
        let id = self.lookup(name)?;
        match self.syms[id.idx()].ty {
            SymbolType::Token(kind) => Some(kind),
            _ => None,
        }
    }

    /// Walk the chain starting at `start` (inclusive) for the first symbol
    /// matching `pred`.
    pub fn chain_find<F>(&self, start: SymbolId, pred: F) -> Option<SymbolId>
    where
        F: Fn(&Symbol) -> bool,
    {
        let ids = self.buckets.get(&self.syms[start.idx()].name)?;
        let pos = ids.iter().position(|&i| i == start)?;
        ids[pos..].iter().copied().find(|&i| pred(&self.syms[i.idx()]))
    }

    /// Install an identifier with default fields and put it on the retention
    /// list its storage class calls for.
    pub fn install_ident(&mut self, name: &str, storage: Storage, unit_local: bool) -> SymbolId {
        let flags = if storage != Storage::Auto && unit_local {
            INSTALL_UNIT_LOCAL
        } else {
            INSTALL_DEFAULT
        };
        let id = self.install(name, flags);
        let sym = &mut self.syms[id.idx()];
        sym.ty = SymbolType::Identifier;
        sym.arity = -1;
        sym.storage = Storage::Extern;
        sym.decl = None;
        sym.source = None;
        sym.def_line = 0;
        sym.level = -1;
        sym.refs.clear();
        sym.callers.clear();
        sym.callees.clear();
        self.change_storage(id, storage);
        id
    }

    /// Move a symbol between retention lists when its storage class changes.
    pub fn change_storage(&mut self, id: SymbolId, storage: Storage) {
        if self.syms[id.idx()].storage == storage {
            return;
        }
        match storage {
            Storage::Static => self.append_retained(id, Retention::Static),
            Storage::Auto => self.append_retained(id, Retention::Auto),
            _ => {}
        }
        self.syms[id.idx()].storage = storage;
    }

    /// Find the identifier symbol for `name`, creating an implicit extern on
    /// a miss.
    pub fn resolve_identifier(&mut self, name: &str, unit_local: bool) -> SymbolId {
        if let Some(head) = self.lookup(name) {
            let found = self.chain_find(head, |s| {
                s.ty == SymbolType::Identifier && s.name == name
            });
            if let Some(id) = found {
                return id;
            }
        }
        self.install_ident(name, Storage::Extern, unit_local)
    }

    // ------------------------------------------------------------------
    // References and call graph edges
    // ------------------------------------------------------------------

    /// Record an occurrence of `name` at `file:line`.  Returns None, and
    /// records nothing, for block-local automatics and for statics filtered
    /// out by a globals-only class map.
    pub fn record_reference(
        &mut self,
        name: &str,
        file: &str,
        line: u32,
        unit_local: bool,
        config: &Config,
    ) -> Option<SymbolId> {
        let id = self.resolve_identifier(name, unit_local);
        let sym = &self.syms[id.idx()];
        if sym.storage == Storage::Auto
            || (sym.storage == Storage::Static && config.globals_only())
        {
            return None;
        }
        self.syms[id.idx()].refs.push(Ref {
            file: file.to_string(),
            line,
        });
        Some(id)
    }

    /// Add a caller/callee edge pair.  Insertion is a set-add.
    pub fn record_call(&mut self, caller: SymbolId, callee: SymbolId) {
        if !self.syms[callee.idx()].callers.contains(&caller) {
            self.syms[callee.idx()].callers.push(caller);
        }
        if !self.syms[caller.idx()].callees.contains(&callee) {
            self.syms[caller.idx()].callees.push(callee);
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Remove the symbol from its name bucket, leaving the record itself in
    /// place for anything still holding its id.
    fn unlink(&mut self, id: SymbolId) {
        if !self.syms[id.idx()].linked {
            return;
        }
        let name = self.syms[id.idx()].name.clone();
        if let Some(ids) = self.buckets.get_mut(&name) {
            ids.retain(|&x| x != id);
            if ids.is_empty() {
                self.buckets.remove(&name);
            }
        }
        self.syms[id.idx()].linked = false;
    }

    /// Unlink a symbol and, when nothing in the output stage can still need
    /// it, destroy the record.  A symbol survives destruction iff it has
    /// recorded references, or reverse-tree mode is active and its callee
    /// set is non-empty.
    fn delete_symbol(&mut self, id: SymbolId, config: &Config) {
        self.unlink(id);
        let sym = &self.syms[id.idx()];
        if sym.refs.is_empty() && !(config.reverse && !sym.callees.is_empty()) {
            let sym = &mut self.syms[id.idx()];
            sym.ty = SymbolType::Undefined;
            sym.refs.clear();
            sym.callers.clear();
            sym.callees.clear();
            sym.decl = None;
            sym.source = None;
        }
    }

    /// Drop every automatic declared at `level`, and unlink block-scope
    /// statics declared there.
    pub fn delete_autos(&mut self, level: i32, config: &Config) {
        let ids = self.auto_list.clone();
        for id in ids {
            if self.syms[id.idx()].level == level {
                self.remove_retained(id);
                self.delete_symbol(id, config);
            }
        }
        let ids = self.static_list.clone();
        for id in ids {
            if self.syms[id.idx()].level == level {
                self.remove_retained(id);
                self.unlink(id);
            }
        }
    }

    /// Drop parameters with parameter nesting level greater than `level`.
    pub fn delete_parms(&mut self, level: i32, config: &Config) {
        let ids = self.auto_list.clone();
        for id in ids {
            if !self.syms[id.idx()].linked {
                self.remove_retained(id);
                continue;
            }
            let sym = &self.syms[id.idx()];
            if sym.ty == SymbolType::Identifier
                && sym.storage == Storage::Auto
                && sym.flag == SymbolFlag::Parameter
                && sym.level > level
            {
                self.remove_retained(id);
                self.delete_symbol(id, config);
            }
        }
    }

    /// Redeclare saved parameters as body-local automatics at `level`.
    pub fn move_parms(&mut self, level: i32) {
        let ids = self.auto_list.clone();
        for id in ids {
            let sym = &mut self.syms[id.idx()];
            if sym.ty == SymbolType::Identifier
                && sym.storage == Storage::Auto
                && sym.flag == SymbolFlag::Parameter
            {
                sym.level = level;
                sym.flag = SymbolFlag::None;
            }
        }
    }

    /// End-of-unit processing: every static-storage symbol defined in the
    /// unit just finished leaves the live table.  Unit-local symbols
    /// eligible for the cross-reference listing move to the unit-local
    /// retention list; file-static functions move to the static-function
    /// list so cross-unit graphs still render; everything else is deleted,
    /// subject to the retention rule in `delete_symbol`.
    ///
    /// Installation is most-recent-first, so the list never holds statics
    /// from an earlier unit.
    pub fn delete_statics(&mut self, config: &Config) {
        let list = std::mem::take(&mut self.static_list);
        for id in list {
            self.syms[id.idx()].list = None;
            if !self.syms[id.idx()].linked {
                continue;
            }
            if self.syms[id.idx()].flag == SymbolFlag::UnitLocal {
                if config.print_xref && config.include_symbol(&self.syms[id.idx()]) {
                    self.unlink(id);
                    self.unit_local_list.push(id);
                } else {
                    self.delete_symbol(id, config);
                }
            } else {
                self.unlink(id);
                if is_function(&self.syms[id.idx()]) {
                    self.static_func_list.push(id);
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Collection
    // ------------------------------------------------------------------

    /// Gather all currently visible symbols matching `sel`: the live
    /// buckets plus the retained static-function and unit-local lists.
    pub fn collect<F>(&self, sel: F) -> Vec<SymbolId>
    where
        F: Fn(&Symbol) -> bool,
    {
        let mut out = Vec::new();
        for ids in self.buckets.values() {
            for &id in ids {
                if sel(&self.syms[id.idx()]) {
                    out.push(id);
                }
            }
        }
        for &id in self.static_func_list.iter().chain(&self.unit_local_list) {
            if sel(&self.syms[id.idx()]) {
                out.push(id);
            }
        }
        out
    }

    /// All function symbols, including file-statics retained past their
    /// unit.
    pub fn collect_functions(&self) -> Vec<SymbolId> {
        self.collect(is_function)
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn xref_config() -> Config {
        Config {
            print_xref: true,
            print_tree: false,
            symbol_map: crate::config::SM_FUNCTIONS
                | crate::config::SM_STATIC
                | crate::config::SM_UNDEFINED
                | crate::config::SM_TYPEDEF,
            ..Config::default()
        }
    }

    #[test]
    fn test_install_and_lookup() {
        let mut table = SymbolTable::new();
        let id = table.install_ident("x", Storage::Extern, false);
        assert_eq!(table.lookup("x"), Some(id));
        assert_eq!(table.get(id).arity, -1);
        assert!(table.lookup("y").is_none());
    }

    #[test]
    fn test_chain_shadows_most_recent_first() {
        let mut table = SymbolTable::new();
        let first = table.install_ident("x", Storage::Extern, false);
        let second = table.install_ident("x", Storage::Static, false);
        assert_ne!(first, second);
        assert_eq!(table.lookup("x"), Some(second));
    }

    #[test]
    fn test_undefined_head_is_replaced() {
        let mut table = SymbolTable::new();
        let raw = table.install("x", INSTALL_DEFAULT);
        let ident = table.install_ident("x", Storage::Extern, false);
        assert_ne!(raw, ident);
        assert_eq!(table.lookup("x"), Some(ident));
        // the undefined head was dropped, not chained
        let chain = table.collect(|s| s.name == "x");
        assert_eq!(chain, vec![ident]);
    }

    #[test]
    fn test_alias_redirection() {
        let mut table = SymbolTable::new();
        let target = table.register_token("unsigned_long", TokenKind::Type);
        table.register_alias("ulong", "unsigned_long");
        assert_eq!(table.lookup("ulong"), Some(target));
        assert_eq!(table.token_class("ulong"), Some(TokenKind::Type));
    }

    #[test]
    fn test_alias_to_unknown_target_reads_as_identifier() {
        let mut table = SymbolTable::new();
        table.register_alias("LIST", "list_t");
        assert_eq!(table.token_class("LIST"), Some(TokenKind::Identifier));
    }

    #[test]
    fn test_record_reference_filters_autos() {
        let mut table = SymbolTable::new();
        let config = Config::default();
        table.install_ident("local", Storage::Auto, false);
        assert!(table
            .record_reference("local", "a.c", 3, false, &config)
            .is_none());
        assert!(table.get(table.lookup("local").unwrap()).refs.is_empty());
    }

    #[test]
    fn test_record_reference_globals_only_skips_statics() {
        let mut table = SymbolTable::new();
        let mut config = Config::default();
        config.symbol_map &= !crate::config::SM_STATIC;
        table.install_ident("helper", Storage::Static, false);
        assert!(table
            .record_reference("helper", "a.c", 3, false, &config)
            .is_none());

        config.symbol_map |= crate::config::SM_STATIC;
        let id = table
            .record_reference("helper", "a.c", 4, false, &config)
            .unwrap();
        assert_eq!(table.get(id).refs.len(), 1);
    }

    #[test]
    fn test_record_call_deduplicates() {
        let mut table = SymbolTable::new();
        let f = table.install_ident("f", Storage::Extern, false);
        let g = table.install_ident("g", Storage::Extern, false);
        table.record_call(f, g);
        table.record_call(f, g);
        assert_eq!(table.get(f).callees, vec![g]);
        assert_eq!(table.get(g).callers, vec![f]);
    }

    #[test]
    fn test_delete_autos_purges_level() {
        let mut table = SymbolTable::new();
        let config = Config::default();
        let id = table.install_ident("x", Storage::Auto, false);
        table.get_mut(id).level = 2;
        table.delete_autos(1, &config);
        assert!(table.lookup("x").is_some());
        table.delete_autos(2, &config);
        assert!(table.lookup("x").is_none());
        assert_eq!(table.get(id).ty, SymbolType::Undefined);
    }

    #[test]
    fn test_parameter_promotion() {
        let mut table = SymbolTable::new();
        let id = table.install_ident("arg", Storage::Auto, false);
        {
            let sym = table.get_mut(id);
            sym.flag = SymbolFlag::Parameter;
            sym.level = 1;
        }
        table.move_parms(3);
        assert_eq!(table.get(id).level, 3);
        assert_eq!(table.get(id).flag, SymbolFlag::None);
    }

    #[test]
    fn test_delete_parms_depth() {
        let mut table = SymbolTable::new();
        let config = Config::default();
        let inner = table.install_ident("cb_arg", Storage::Auto, false);
        {
            let sym = table.get_mut(inner);
            sym.flag = SymbolFlag::Parameter;
            sym.level = 2;
        }
        let outer = table.install_ident("arg", Storage::Auto, false);
        {
            let sym = table.get_mut(outer);
            sym.flag = SymbolFlag::Parameter;
            sym.level = 1;
        }
        table.delete_parms(1, &config);
        assert!(table.lookup("cb_arg").is_none());
        assert!(table.lookup("arg").is_some());
    }

    #[test]
    fn test_static_function_retained_for_graph() {
        let mut table = SymbolTable::new();
        let config = Config::default();
        let id = table.install_ident("helper", Storage::Static, false);
        {
            let sym = table.get_mut(id);
            sym.arity = 0;
            sym.source = Some("a.c".to_string());
        }
        table.delete_statics(&config);
        // gone from the live table, but still collectable for the graph
        assert!(table.lookup("helper").is_none());
        assert!(table.collect_functions().contains(&id));
        assert_eq!(table.get(id).ty, SymbolType::Identifier);
    }

    #[test]
    fn test_unit_local_destroyed_without_xref() {
        let mut table = SymbolTable::new();
        let config = Config::default();
        let id = table.install("FILE", INSTALL_UNIT_LOCAL);
        table.get_mut(id).ty = SymbolType::Token(TokenKind::Type);
        table.delete_statics(&config);
        assert!(table.lookup("FILE").is_none());
        assert_eq!(table.get(id).ty, SymbolType::Undefined);
    }

    #[test]
    fn test_unit_local_retained_for_xref() {
        let mut table = SymbolTable::new();
        let config = xref_config();
        let id = table.install("FILE", INSTALL_UNIT_LOCAL);
        {
            let sym = table.get_mut(id);
            sym.ty = SymbolType::Token(TokenKind::Type);
            sym.source = Some("stdio.h".to_string());
        }
        table.delete_statics(&config);
        assert!(table.lookup("FILE").is_none());
        assert!(table.collect(|s| s.name == "FILE").contains(&id));
        assert_eq!(table.get(id).ty, SymbolType::Token(TokenKind::Type));
    }

    // Retention boundary, pinned: no refs and no callees means destruction
    // even when the symbol still has callers; refs or (reverse mode plus
    // callees) keep the record alive.
    #[test]
    fn test_retention_rule_boundary() {
        let config = Config::default();

        // referenced: survives
        let mut table = SymbolTable::new();
        let id = table.install_ident("a", Storage::Auto, false);
        table.get_mut(id).level = 1;
        table.get_mut(id).refs.push(Ref {
            file: "a.c".to_string(),
            line: 1,
        });
        table.delete_autos(1, &config);
        assert_eq!(table.get(id).ty, SymbolType::Identifier);

        // callers but neither refs nor callees: destroyed
        let mut table = SymbolTable::new();
        let caller = table.install_ident("f", Storage::Extern, false);
        let id = table.install_ident("b", Storage::Auto, false);
        table.get_mut(id).level = 1;
        table.get_mut(id).callers.push(caller);
        table.delete_autos(1, &config);
        assert_eq!(table.get(id).ty, SymbolType::Undefined);

        // callees pin the record only in reverse-tree mode
        let mut reverse = Config::default();
        reverse.reverse = true;
        let mut table = SymbolTable::new();
        let callee = table.install_ident("g", Storage::Extern, false);
        let id = table.install_ident("c", Storage::Auto, false);
        table.get_mut(id).level = 1;
        table.get_mut(id).callees.push(callee);
        table.delete_autos(1, &config);
        assert_eq!(table.get(id).ty, SymbolType::Undefined);

        let mut table = SymbolTable::new();
        let callee = table.install_ident("g", Storage::Extern, false);
        let id = table.install_ident("d", Storage::Auto, false);
        table.get_mut(id).level = 1;
        table.get_mut(id).callees.push(callee);
        table.delete_autos(1, &reverse);
        assert_eq!(table.get(id).ty, SymbolType::Identifier);
    }
}
