//
// Copyright (c) 2026 Jeff Garzik
//
// This file is part of the cflow-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// Graph analysis, traversal and output dispatch for cflow
//
// Collects the function symbols, computes the reachability closure to flag
// recursion, then walks the call graph depth-first (directly or inverted),
// emitting an ordered event stream to the selected output driver.  The
// driver decides how a symbol line looks; this module decides which symbols
// appear and in what order.
//

use crate::config::Config;
use crate::depmap::Depmap;
use crate::symbol::{is_function, Storage, Symbol, SymbolId, SymbolTable, SymbolType};
use std::fs::File;
use std::io::{self, BufWriter, Write};

// ============================================================================
// Output Events
// ============================================================================

/// Payload of a symbol event.
pub struct SymbolEvent<'a> {
    /// Direct (callee) or inverted (caller) traversal
    pub direct: bool,
    pub level: usize,
    pub last: bool,
    pub id: SymbolId,
    pub sym: &'a Symbol,
    /// The symbol has outgoing edges in the traversal direction
    pub has_children: bool,
    /// A subtree will actually be printed below this line
    pub expandable: bool,
    /// Per-level continuation marks for tree art
    pub marks: &'a [bool],
    /// Current output line number
    pub line: u32,
}

/// Commands delivered to an output driver, in emission order.
pub enum Command<'a> {
    Init,
    Begin,
    End,
    Newline,
    Separator,
    Symbol(&'a SymbolEvent<'a>),
    Text(&'a str),
}

/// A pluggable listing renderer.  The return value of a `Symbol` command
/// tells the traversal whether to suppress descending into that symbol's
/// subtree.
pub trait OutputDriver {
    fn handle(&mut self, cmd: Command<'_>, out: &mut dyn Write, config: &Config)
        -> io::Result<bool>;
}

/// Resolve a driver by name.
pub fn driver_for(name: &str) -> Option<Box<dyn OutputDriver>> {
    match name {
        "gnu" => Some(Box::new(crate::gnu::GnuDriver::new())),
        "posix" => Some(Box::new(crate::posix::PosixDriver::new())),
        _ => None,
    }
}

/// Render the line prefix for a tree level: optional line number and level
/// number, then one indent element per enclosing level, then the branch
/// element.
pub fn print_level(
    out: &mut dyn Write,
    config: &Config,
    marks: &[bool],
    line: u32,
    level: usize,
    last: bool,
) -> io::Result<()> {
    if config.print_line_numbers {
        write!(out, "{:5} ", line)?;
    }
    if config.print_levels {
        write!(out, "{{{:4}}} ", level)?;
    }
    write!(out, "{}", config.level_begin)?;
    for i in 0..level {
        let mark = marks.get(i).copied().unwrap_or(false);
        write!(out, "{}", config.level_indent[usize::from(mark)])?;
    }
    write!(out, "{}", config.level_end[usize::from(last)])?;
    Ok(())
}

// ============================================================================
// Graph Analysis
// ============================================================================

/// Symbols eligible for listing: functions and data with linkage, plus
/// whatever token entries (typedefs) the class filter admits.
fn listed_symbol(sym: &Symbol, config: &Config) -> bool {
    if !config.include_symbol(sym) {
        return false;
    }
    match sym.ty {
        SymbolType::Identifier => {
            sym.storage == Storage::Extern || sym.storage == Storage::Static
        }
        _ => true,
    }
}

/// Assign dense ordinals to every function symbol, build the dependency
/// matrix from function-to-function edges, close it transitively, and flag
/// the recursive functions.
pub fn analyze_recursion(table: &mut SymbolTable) {
    let funcs = table.collect_functions();
    for (i, &id) in funcs.iter().enumerate() {
        table.get_mut(id).ord = i;
    }
    let mut map = Depmap::new(funcs.len());
    for (i, &id) in funcs.iter().enumerate() {
        let callees = table.get(id).callees.clone();
        for callee in callees {
            if is_function(table.get(callee)) {
                map.set(i, table.get(callee).ord);
            }
        }
    }
    map.transitive_closure();
    for (i, &id) in funcs.iter().enumerate() {
        if map.is_set(i, i) {
            table.get_mut(id).recursive = true;
        }
    }
}

// ============================================================================
// Tree Traversal
// ============================================================================

struct TreeOutput<'a> {
    table: &'a mut SymbolTable,
    config: &'a Config,
    driver: &'a mut dyn OutputDriver,
    out: &'a mut dyn Write,
    out_line: u32,
    marks: Vec<bool>,
}

impl<'a> TreeOutput<'a> {
    fn command(&mut self, cmd: Command<'_>) -> io::Result<bool> {
        self.driver.handle(cmd, &mut *self.out, self.config)
    }

    fn newline(&mut self) -> io::Result<()> {
        self.command(Command::Newline)?;
        self.out_line += 1;
        Ok(())
    }

    fn set_mark(&mut self, level: usize, more: bool) {
        if level >= self.marks.len() {
            self.marks.resize(level + 1, false);
        }
        self.marks[level] = more;
    }

    fn emit_symbol(
        &mut self,
        direct: bool,
        level: usize,
        last: bool,
        id: SymbolId,
    ) -> io::Result<bool> {
        let (has_children, expandable) = {
            let sym = self.table.get(id);
            let children = if direct { &sym.callees } else { &sym.callers };
            let depth_ok = self.config.max_depth == 0 || level + 1 < self.config.max_depth;
            let any_printable = children
                .iter()
                .any(|&c| self.config.include_symbol(self.table.get(c)));
            (!children.is_empty(), sym.active == 0 && depth_ok && any_printable)
        };
        let sym = self.table.get(id).clone();
        let marks = self.marks.clone();
        let event = SymbolEvent {
            direct,
            level,
            last,
            id,
            sym: &sym,
            has_children,
            expandable,
            marks: &marks,
            line: self.out_line,
        };
        self.driver
            .handle(Command::Symbol(&event), &mut *self.out, self.config)
    }

    /// Emit one subtree of the direct call graph.  The `active` guard keeps
    /// cyclic graphs finite: a symbol already on the traversal stack is
    /// printed but never descended into again.
    fn direct_tree(&mut self, level: usize, last: bool, id: SymbolId) -> io::Result<()> {
        self.tree(true, level, last, id)
    }

    /// Same walk over the caller sets, for the reverse call tree.
    fn inverted_tree(&mut self, level: usize, last: bool, id: SymbolId) -> io::Result<()> {
        self.tree(false, level, last, id)
    }

    fn tree(&mut self, direct: bool, level: usize, last: bool, id: SymbolId) -> io::Result<()> {
        {
            let sym = self.table.get(id);
            if sym.ty == SymbolType::Undefined
                || (self.config.max_depth > 0 && level >= self.config.max_depth)
                || !self.config.include_symbol(sym)
            {
                return Ok(());
            }
        }
        let suppressed = self.emit_symbol(direct, level, last, id)?;
        self.newline()?;
        if suppressed || self.table.get(id).active != 0 {
            return Ok(());
        }
        self.table.get_mut(id).active = self.out_line;
        let children = {
            let sym = self.table.get(id);
            if direct {
                sym.callees.clone()
            } else {
                sym.callers.clone()
            }
        };
        let printable: Vec<bool> = children
            .iter()
            .map(|&c| self.config.include_symbol(self.table.get(c)))
            .collect();
        for (i, &child) in children.iter().enumerate() {
            let child_last = !printable[i + 1..].iter().any(|&p| p);
            self.set_mark(level + 1, !child_last);
            self.tree(direct, level + 1, child_last, child)?;
        }
        self.table.get_mut(id).active = 0;
        Ok(())
    }
}

/// Produce the tree listing: recursion analysis, root selection, traversal.
pub fn tree_output(
    table: &mut SymbolTable,
    config: &Config,
    driver: &mut dyn OutputDriver,
    out: &mut dyn Write,
) -> io::Result<()> {
    analyze_recursion(table);

    let mut ids = table.collect(|s| listed_symbol(s, config));
    ids.sort_by(|a, b| table.get(*a).name.cmp(&table.get(*b).name));

    let mut walker = TreeOutput {
        table,
        config,
        driver,
        out,
        out_line: 1,
        marks: vec![false],
    };
    walker.command(Command::Begin)?;

    if config.reverse {
        for id in ids {
            walker.inverted_tree(0, false, id)?;
            walker.command(Command::Separator)?;
        }
    } else {
        let main_sym = config
            .start_name
            .as_deref()
            .and_then(|name| walker.table.lookup(name));
        let mut all_functions = config.all_functions;
        if let Some(id) = main_sym {
            walker.direct_tree(0, false, id)?;
            walker.command(Command::Separator)?;
        } else if all_functions == 0 {
            // no start symbol: treat every unreferenced function as a root
            all_functions = 1;
        }
        if all_functions > 0 {
            for id in ids {
                if Some(id) == main_sym || walker.table.get(id).source.is_none() {
                    continue;
                }
                if all_functions > 1 || walker.table.get(id).callers.is_empty() {
                    walker.direct_tree(0, false, id)?;
                    walker.command(Command::Separator)?;
                }
            }
        }
    }

    walker.command(Command::End)?;
    Ok(())
}

// ============================================================================
// Cross-Reference Output
// ============================================================================

/// Flat listing of each qualifying symbol: definition site, then every
/// reference site.
pub fn xref_output(table: &SymbolTable, config: &Config, out: &mut dyn Write) -> io::Result<()> {
    let mut ids = table.collect(|s| listed_symbol(s, config));
    ids.sort_by(|a, b| table.get(*a).name.cmp(&table.get(*b).name));

    for id in ids {
        let sym = table.get(id);
        match sym.ty {
            SymbolType::Identifier => {
                if let Some(source) = &sym.source {
                    writeln!(
                        out,
                        "{} * {}:{} {}",
                        sym.name,
                        source,
                        sym.def_line,
                        sym.decl.as_deref().unwrap_or("")
                    )?;
                }
                for r in &sym.refs {
                    writeln!(out, "{}   {}:{}", sym.name, r.file, r.line)?;
                }
            }
            SymbolType::Token(_) => {
                if let Some(source) = &sym.source {
                    writeln!(out, "{} t {}:{}", sym.name, source, sym.def_line)?;
                }
            }
            _ => {}
        }
    }
    Ok(())
}

// ============================================================================
// Top-Level Output
// ============================================================================

/// Open the configured output sink and run the selected listings.
pub fn output(table: &mut SymbolTable, config: &Config) -> io::Result<()> {
    let mut driver = driver_for(&config.format).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{}: no such output driver", config.format),
        )
    })?;
    let sink: Box<dyn Write> = if config.output == "-" {
        Box::new(io::stdout())
    } else {
        Box::new(File::create(&config.output)?)
    };
    let mut out = BufWriter::new(sink);

    driver.handle(Command::Init, &mut out, config)?;
    if config.print_xref {
        xref_output(table, config, &mut out)?;
    }
    if config.print_tree {
        tree_output(table, config, driver.as_mut(), &mut out)?;
    }
    out.flush()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    struct Recorder {
        events: Vec<(usize, String)>,
    }

    impl Recorder {
        fn new() -> Self {
            Self { events: Vec::new() }
        }
    }

    impl OutputDriver for Recorder {
        fn handle(
            &mut self,
            cmd: Command<'_>,
            _out: &mut dyn Write,
            _config: &Config,
        ) -> io::Result<bool> {
            if let Command::Symbol(ev) = cmd {
                self.events.push((ev.level, ev.sym.name.clone()));
            }
            Ok(false)
        }
    }

    fn build_table(src: &str, config: &Config) -> SymbolTable {
        let mut table = SymbolTable::new();
        crate::lexer::register_keywords(&mut table);
        let lexer = Lexer::from_source(src, "test.c");
        Parser::new(config, &mut table, lexer).parse();
        table
    }

    fn walk(src: &str, config: &Config) -> Vec<(usize, String)> {
        let mut table = build_table(src, config);
        let mut recorder = Recorder::new();
        let mut sink = Vec::new();
        tree_output(&mut table, config, &mut recorder, &mut sink).unwrap();
        recorder.events
    }

    #[test]
    fn test_mutual_recursion_flagged() {
        let config = Config::default();
        let mut table = build_table(
            "int f(void)\n{\n g();\n}\nint g(void)\n{\n f();\n}\n",
            &config,
        );
        analyze_recursion(&mut table);
        assert!(table.get(table.lookup("f").unwrap()).recursive);
        assert!(table.get(table.lookup("g").unwrap()).recursive);
    }

    #[test]
    fn test_acyclic_chain_not_flagged() {
        let config = Config::default();
        let mut table = build_table(
            "int h(void)\n{\n}\nint g(void)\n{\n h();\n}\nint f(void)\n{\n g();\n}\n",
            &config,
        );
        analyze_recursion(&mut table);
        for name in ["f", "g", "h"] {
            assert!(!table.get(table.lookup(name).unwrap()).recursive);
        }
    }

    #[test]
    fn test_self_recursion_flagged() {
        let config = Config::default();
        let mut table = build_table("int fact(int n)\n{\n return fact(n);\n}\n", &config);
        analyze_recursion(&mut table);
        assert!(table.get(table.lookup("fact").unwrap()).recursive);
    }

    #[test]
    fn test_traversal_order_from_main() {
        let config = Config::default();
        let events = walk(
            "void leaf(void)\n{\n}\nvoid mid(void)\n{\n leaf();\n}\nint main(void)\n{\n mid();\n}\n",
            &config,
        );
        assert_eq!(
            events,
            vec![
                (0, "main".to_string()),
                (1, "mid".to_string()),
                (2, "leaf".to_string())
            ]
        );
    }

    #[test]
    fn test_depth_cutoff_bounds_levels() {
        let config = Config {
            max_depth: 2,
            ..Config::default()
        };
        let events = walk(
            "void d(void)\n{\n}\nvoid c(void)\n{\n d();\n}\nvoid b(void)\n{\n c();\n}\nint main(void)\n{\n b();\n}\n",
            &config,
        );
        assert!(!events.is_empty());
        assert!(events.iter().all(|(level, _)| *level < 2));
    }

    #[test]
    fn test_depth_cutoff_on_cyclic_graph() {
        let config = Config {
            max_depth: 5,
            ..Config::default()
        };
        let events = walk("int main(void)\n{\n main();\n}\n", &config);
        assert!(events.iter().all(|(level, _)| *level < 5));
        // active guard stops the cycle long before the cutoff
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_cycle_terminates_without_depth_limit() {
        let config = Config::default();
        let events = walk(
            "int f(void)\n{\n g();\n}\nint g(void)\n{\n f();\n}\nint main(void)\n{\n f();\n}\n",
            &config,
        );
        // main -> f -> g -> f(cycle stops)
        assert_eq!(events.len(), 4);
        assert_eq!(events[3], (3, "f".to_string()));
    }

    #[test]
    fn test_unreferenced_roots_without_main() {
        let config = Config {
            start_name: None,
            ..Config::default()
        };
        let events = walk(
            "void helper(void)\n{\n}\nvoid entry(void)\n{\n helper();\n}\n",
            &config,
        );
        let roots: Vec<_> = events
            .iter()
            .filter(|(level, _)| *level == 0)
            .map(|(_, name)| name.as_str())
            .collect();
        assert_eq!(roots, vec!["entry"]);
    }

    #[test]
    fn test_reverse_traversal_follows_callers() {
        let config = Config {
            reverse: true,
            ..Config::default()
        };
        let events = walk(
            "void callee(void)\n{\n}\nint main(void)\n{\n callee();\n}\n",
            &config,
        );
        let callee_pos = events
            .iter()
            .position(|(level, name)| *level == 0 && name == "callee")
            .unwrap();
        assert_eq!(events[callee_pos + 1], (1, "main".to_string()));
    }

    #[test]
    fn test_xref_lists_definitions_and_references() {
        let config = Config {
            print_xref: true,
            print_tree: false,
            ..Config::default()
        };
        let table = build_table("int f(void)\n{\n g();\n}\n", &config);
        let mut out = Vec::new();
        xref_output(&table, &config, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("f * test.c:1 int f (void)"));
        assert!(text.contains("g   test.c:3"));
    }
}
