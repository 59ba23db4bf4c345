//
// Copyright (c) 2026 Jeff Garzik
//
// This file is part of the cflow-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// POSIX-style listing driver
//
// One line per symbol: `name: decl, <file line>`, or `name: <>` for
// symbols without a definition.  Line numbering is forced on when this
// driver is selected.
//

use crate::config::Config;
use crate::output::{print_level, Command, OutputDriver, SymbolEvent};
use std::io::{self, Write};

pub struct PosixDriver;

impl PosixDriver {
    pub fn new() -> Self {
        Self
    }

    fn print_symbol(
        &mut self,
        ev: &SymbolEvent<'_>,
        out: &mut dyn Write,
        config: &Config,
    ) -> io::Result<bool> {
        print_level(out, config, ev.marks, ev.line, ev.level, ev.last)?;
        write!(out, "{}: ", ev.sym.name)?;
        match (&ev.sym.decl, &ev.sym.source) {
            (Some(decl), Some(source)) => {
                write!(out, "{}, <{} {}>", decl, source, ev.sym.def_line)?;
            }
            _ => {
                write!(out, "<>")?;
            }
        }
        Ok(false)
    }
}

impl Default for PosixDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputDriver for PosixDriver {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::{Storage, SymbolTable};

    #[test]
    fn test_defined_and_undefined_lines() {
        let config = Config {
            print_line_numbers: true,
            ..Config::default()
        };
        let mut table = SymbolTable::new();
        let id = table.install_ident("main", Storage::Extern, false);
        {
            let sym = table.get_mut(id);
            sym.arity = 1;
            sym.decl = Some("int main (void)".to_string());
            sym.source = Some("main.c".to_string());
            sym.def_line = 4;
        }
        let sym = table.get(id).clone();
        let ev = SymbolEvent {
            direct: true,
            level: 0,
            last: false,
            id,
            sym: &sym,
            has_children: true,
            expandable: true,
            marks: &[false],
            line: 1,
        };
        let mut driver = PosixDriver::new();
        let mut out = Vec::new();
        driver.handle(Command::Symbol(&ev), &mut out, &config).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "    1 main: int main (void), <main.c 4>"
        );

        let undef_id = table.install_ident("printf", Storage::Extern, false);
        table.get_mut(undef_id).arity = 0;
        let undef = table.get(undef_id).clone();
        let ev = SymbolEvent {
            direct: true,
            level: 1,
            last: true,
            id: undef_id,
            sym: &undef,
            has_children: false,
            expandable: false,
            marks: &[false, false],
            line: 2,
        };
        let mut out = Vec::new();
        driver.handle(Command::Symbol(&ev), &mut out, &config).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "    2     printf: <>"
        );
    }
}
