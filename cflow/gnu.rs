//
// Copyright (c) 2026 Jeff Garzik
//
// This file is part of the cflow-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// GNU-style listing driver
//
// One line per symbol: `name() <decl at file:line>`, with `(R)` marking
// recursive functions, `(recursive: see N)` back references at cycle
// sites, `[see N]` repeats in brief mode, and a trailing `:` on lines
// whose subtree follows.
//

use crate::config::Config;
use crate::output::{print_level, Command, OutputDriver, SymbolEvent};
use crate::symbol::SymbolId;
use std::collections::HashMap;
use std::io::{self, Write};

pub struct GnuDriver {
    /// Output line of each symbol's first expansion, for brief mode
    expanded: HashMap<SymbolId, u32>,
}

impl GnuDriver {
    pub fn new() -> Self {
        Self {
            expanded: HashMap::new(),
        }
    }

    fn print_symbol(
        &mut self,
        ev: &SymbolEvent<'_>,
        out: &mut dyn Write,
        config: &Config,
    ) -> io::Result<bool> {
        print_level(out, config, ev.marks, ev.line, ev.level, ev.last)?;
        write!(out, "{}()", ev.sym.name)?;
        if let Some(decl) = &ev.sym.decl {
            write!(
                out,
                " <{} at {}:{}>",
                decl,
                ev.sym.source.as_deref().unwrap_or("?"),
                ev.sym.def_line
            )?;
        }
        if ev.sym.active != 0 {
            write!(out, " (recursive: see {})", ev.sym.active - 1)?;
            return Ok(true);
        }
        if ev.sym.recursive {
            write!(out, " (R)")?;
        }
        let mut suppressed = false;
        if config.brief {
            if let Some(&line) = self.expanded.get(&ev.id) {
                write!(out, " [see {}]", line)?;
                suppressed = true;
            } else if ev.has_children {
                self.expanded.insert(ev.id, ev.line);
            }
        }
        if !suppressed && ev.expandable {
            write!(out, ":")?;
        }
        Ok(suppressed)
    }
}

impl Default for GnuDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputDriver for GnuDriver {
    fn handle(
        &mut self,
        cmd: Command<'_>,
        out: &mut dyn Write,
        config: &Config,
    ) -> io::Result<bool> {
        match cmd {
            Command::Newline => {
                writeln!(out)?;
                Ok(false)
            }
            Command::Text(text) => {
                write!(out, "{}", text)?;
                Ok(false)
            }
            Command::Symbol(ev) => self.print_symbol(ev, out, config),
            Command::Init | Command::Begin | Command::End | Command::Separator => Ok(false),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
