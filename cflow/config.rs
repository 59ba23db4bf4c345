//
// Copyright (c) 2026 Jeff Garzik
//
// This file is part of the cflow-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// Run-scoped configuration consumed by the parser and the output stage
//

use crate::lexer::Preprocessor;
use crate::symbol::{Storage, Symbol, SymbolType};
use crate::token::TokenKind;

// ============================================================================
// Symbol Class Map
// ============================================================================

/// Classes of symbols included in the graph (`--include`)
pub const SM_FUNCTIONS: u32 = 0x0001;
pub const SM_DATA: u32 = 0x0002;
pub const SM_STATIC: u32 = 0x0004;
pub const SM_UNDERSCORE: u32 = 0x0008;
pub const SM_TYPEDEF: u32 = 0x0010;
pub const SM_UNDEFINED: u32 = 0x0020;

// ============================================================================
// Config
// ============================================================================

/// Everything the core consumes from the command line and rc file.
/// Constructed once per run and passed by reference into the parser and the
/// output stage, which share one symbol table across all input files.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bitmap of symbol classes included in the output
    pub symbol_map: u32,
    /// Produce the cross-reference listing
    pub print_xref: bool,
    /// Produce the call tree listing
    pub print_tree: bool,
    /// Traverse callers instead of callees
    pub reverse: bool,
    /// Cut the flowgraph at this depth; 0 means unlimited
    pub max_depth: usize,
    /// Start symbol; None means every unreferenced function is a root
    pub start_name: Option<String>,
    /// 1: also print trees for uncalled functions; >1: for every function
    pub all_functions: u8,
    /// Brief output: expand each function's subtree only once
    pub brief: bool,
    pub print_line_numbers: bool,
    pub print_levels: bool,
    pub level_begin: String,
    /// Per-level indent strings, indexed by the level mark
    pub level_indent: [String; 2],
    /// Branch prefix strings, indexed by is-last-sibling
    pub level_end: [String; 2],
    /// Leave argument lists out of declaration strings
    pub omit_arguments: bool,
    /// Leave the symbol name out of declaration strings
    pub omit_symbol_names: bool,
    /// Trust column-zero braces to delimit function bodies
    pub use_indentation: bool,
    /// Accept only ANSI parameter syntax, disabling K&R recovery
    pub strict_ansi: bool,
    /// Verbose recoverable-anomaly diagnostics
    pub verbose: bool,
    /// Initial token buffer size (`--pushdown`)
    pub pushdown: usize,
    /// Output file name; "-" means stdout
    pub output: String,
    /// Output driver name
    pub format: String,
    /// External preprocessor, when enabled
    pub preprocess: Option<Preprocessor>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            symbol_map: SM_FUNCTIONS | SM_STATIC | SM_UNDEFINED,
            print_xref: false,
            print_tree: true,
            reverse: false,
            max_depth: 0,
            start_name: Some("main".to_string()),
            all_functions: 0,
            brief: false,
            print_line_numbers: false,
            print_levels: false,
            level_begin: String::new(),
            level_indent: ["    ".to_string(), "    ".to_string()],
            level_end: [String::new(), String::new()],
            omit_arguments: false,
            omit_symbol_names: false,
            use_indentation: false,
            strict_ansi: false,
            verbose: false,
            pushdown: 64,
            output: "-".to_string(),
            format: "gnu".to_string(),
            preprocess: None,
        }
    }
}

impl Config {
    /// True when static symbols are filtered out of the graph, in which case
    /// references to them are not recorded at all.
    pub fn globals_only(&self) -> bool {
        self.symbol_map & SM_STATIC == 0
    }

    /// Decide whether a symbol belongs in the output under the active class
    /// filter.
    pub fn include_symbol(&self, sym: &Symbol) -> bool {
        match sym.ty {
            SymbolType::Identifier => {
                if sym.name.starts_with('_') && self.symbol_map & SM_UNDERSCORE == 0 {
                    return false;
                }
                let mut class = 0;
                if sym.storage == Storage::Static {
                    class |= SM_STATIC;
                }
                if sym.arity == -1 && sym.storage != Storage::Auto {
                    class |= SM_DATA;
                } else if sym.arity >= 0 {
                    class |= SM_FUNCTIONS;
                }
                if sym.source.is_none() {
                    class |= SM_UNDEFINED;
                }
                self.symbol_map & class == class
            }
            SymbolType::Token(TokenKind::Type) if sym.source.is_some() => {
                self.symbol_map & SM_TYPEDEF != 0
            }
            _ => false,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::SymbolTable;

    fn function(table: &mut SymbolTable, name: &str, storage: Storage) -> Symbol {
        let id = table.install_ident(name, storage, false);
        let sym = table.get_mut(id);
        sym.arity = 0;
        sym.source = Some("a.c".to_string());
        sym.clone()
    }

    #[test]
    fn test_default_map_includes_functions() {
        let config = Config::default();
        let mut table = SymbolTable::new();
        let f = function(&mut table, "f", Storage::Extern);
        assert!(config.include_symbol(&f));
    }

    #[test]
    fn test_underscore_excluded_by_default() {
        let config = Config::default();
        let mut table = SymbolTable::new();
        let f = function(&mut table, "_helper", Storage::Extern);
        assert!(!config.include_symbol(&f));
        let mut permissive = config.clone();
        permissive.symbol_map |= SM_UNDERSCORE;
        assert!(permissive.include_symbol(&f));
    }

    #[test]
    fn test_data_symbols_off_by_default() {
        let config = Config::default();
        let mut table = SymbolTable::new();
        let id = table.install_ident("counter", Storage::Extern, false);
        let sym = table.get_mut(id);
        sym.source = Some("a.c".to_string());
        let sym = table.get(id).clone();
        assert!(!config.include_symbol(&sym));
        let mut with_data = config.clone();
        with_data.symbol_map |= SM_DATA;
        assert!(with_data.include_symbol(&sym));
    }

    #[test]
    fn test_globals_only_follows_static_class() {
        let mut config = Config::default();
        assert!(!config.globals_only());
        config.symbol_map &= !SM_STATIC;
        assert!(config.globals_only());
    }
}
