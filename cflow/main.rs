//
// Copyright (c) 2026 Jeff Garzik
//
// This file is part of the cflow-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// cflow - generate a program flowgraph
//
// Analyzes C source files, charts the function call relationships and
// prints them as a call tree, a reverse call tree or a cross-reference
// listing.
//

use cflow_rs::config::{
    Config, SM_DATA, SM_STATIC, SM_TYPEDEF, SM_UNDEFINED, SM_UNDERSCORE,
};
use cflow_rs::diag::{EX_FATAL, EX_OK, EX_SOFT, EX_USAGE};
use cflow_rs::lexer::{register_keywords, Lexer, Preprocessor};
use cflow_rs::output;
use cflow_rs::parser::Parser as FlowParser;
use cflow_rs::rc;
use cflow_rs::symbol::SymbolTable;
use cflow_rs::token::TokenKind;
use clap::Parser;
use gettextrs::{bind_textdomain_codeset, gettext, setlocale, textdomain, LocaleCategory};
use std::process::ExitCode;

const DEFAULT_PREPROCESSOR: &str = "/usr/bin/cpp";

// ============================================================================
// CLI
// ============================================================================

#[derive(Parser)]
#[command(name = "cflow", version, about = gettext("cflow - generate a program flowgraph"))]
struct Args {
    #[arg(short = 'd', long, value_name = "NUMBER", help = gettext("Set the depth at which the flowgraph is cut off"))]
    depth: Option<usize>,

    #[arg(short = 'i', long = "include", value_name = "CLASSES", action = clap::ArgAction::Append, help = gettext("Include specified classes of symbols: x=data, _=underscore names, s=static, t=typedefs, u=undefined. Prepend CLASSES with ^ or - to exclude them"))]
    include: Vec<String>,

    #[arg(short = 'f', long, value_name = "NAME", value_parser = ["gnu", "posix"], help = gettext("Use given output format NAME. Valid names are gnu (default) and posix"))]
    format: Option<String>,

    #[arg(short = 'r', long, help = gettext("Print reverse call tree"))]
    reverse: bool,

    #[arg(short = 'x', long, help = gettext("Produce cross-reference listing only"))]
    xref: bool,

    #[arg(short = 'o', long, value_name = "FILE", default_value = "-", help = gettext("Set output file name (default -, meaning stdout)"))]
    output: String,

    #[arg(short = 'S', long = "use-indentation", help = gettext("Rely on indentation"))]
    use_indentation: bool,

    #[arg(short = 'a', long = "ansi", help = gettext("Accept only sources in ANSI C"))]
    ansi: bool,

    #[arg(short = 'p', long = "pushdown", value_name = "NUMBER", default_value_t = 64, help = gettext("Set initial token stack size to NUMBER"))]
    pushdown: usize,

    #[arg(short = 's', long = "symbol", value_name = "SYMBOL:[=]TYPE", action = clap::ArgAction::Append, help = gettext("Register SYMBOL with given TYPE, or define an alias (if := is used). Valid types are: keyword (or kw), modifier, qualifier, identifier, type, wrapper"))]
    symbol: Vec<String>,

    #[arg(short = 'm', long = "main", value_name = "NAME", help = gettext("Assume main function to be called NAME"))]
    main_name: Option<String>,

    #[arg(long = "no-main", help = gettext("There's no main function; print graphs for all functions in the program"))]
    no_main: bool,

    #[arg(short = 'D', value_name = "NAME[=DEFN]", action = clap::ArgAction::Append, help = gettext("Predefine NAME as a macro"))]
    defines: Vec<String>,

    #[arg(short = 'U', value_name = "NAME", action = clap::ArgAction::Append, help = gettext("Cancel any previous definition of NAME"))]
    undefines: Vec<String>,

    #[arg(short = 'I', value_name = "DIR", action = clap::ArgAction::Append, help = gettext("Add the directory DIR to the list of directories to be searched for header files"))]
    include_dirs: Vec<String>,

    #[arg(long = "cpp", alias = "preprocess", value_name = "COMMAND", num_args = 0..=1, require_equals = true, default_missing_value = DEFAULT_PREPROCESSOR, help = gettext("Run the specified preprocessor command"))]
    cpp: Option<String>,

    #[arg(long = "no-cpp", alias = "no-preprocess", help = gettext("Do not preprocess the sources"))]
    no_cpp: bool,

    #[arg(short = 'A', long = "all", action = clap::ArgAction::Count, help = gettext("Show all functions, not only those reachable from main"))]
    all: u8,

    #[arg(short = 'n', long = "number", help = gettext("Print line numbers"))]
    number: bool,

    #[arg(short = 'l', long = "print-level", help = gettext("Print nesting level along with the call tree"))]
    print_level: bool,

    #[arg(long = "level-indent", value_name = "ELEMENT", action = clap::ArgAction::Append, help = gettext("Control graph appearance"))]
    level_indent: Vec<String>,

    #[arg(short = 'T', long = "tree", help = gettext("Draw ASCII art tree"))]
    tree: bool,

    #[arg(short = 'b', long = "brief", help = gettext("Brief output"))]
    brief: bool,

    #[arg(long = "omit-arguments", help = gettext("Do not print argument lists in function declarations"))]
    omit_arguments: bool,

    #[arg(long = "omit-symbol-names", help = gettext("Do not print symbol names in declaration strings"))]
    omit_symbol_names: bool,

    #[arg(short = 'v', long, help = gettext("Verbose error diagnostics"))]
    verbose: bool,

    #[arg(required = true, value_name = "FILE", help = gettext("Input files"))]
    files: Vec<String>,
}

// ============================================================================
// Option Parsing Helpers
// ============================================================================

/// Match a possibly abbreviated option argument against a table of
/// `(full name, minimum match length, value)` entries.
fn match_abbrev<T: Copy>(table: &[(&str, usize, T)], arg: &str) -> Option<T> {
    for &(full, min_match, value) in table {
        if arg.len() >= min_match && full.starts_with(arg) {
            return Some(value);
        }
    }
    None
}

/// Apply one `--include` argument to the symbol class map.
fn apply_symbol_classes(map: &mut u32, spec: &str) -> Result<(), String> {
    let mut include = true;
    for c in spec.chars() {
        let class = match c {
            '-' | '^' => {
                include = false;
                continue;
            }
            '+' => {
                include = true;
                continue;
            }
            'x' => SM_DATA,
            '_' => SM_UNDERSCORE,
            's' => SM_STATIC,
            't' => SM_TYPEDEF,
            'u' => SM_UNDEFINED,
            _ => return Err(format!("{}: {}", gettext("unknown symbol class"), c)),
        };
        if include {
            *map |= class;
        } else {
            *map &= !class;
        }
    }
    Ok(())
}

/// Apply one `--symbol` override: `NAME:TYPE` registers a token class,
/// `NAME:=TARGET` defines an alias.
fn apply_symbol_override(table: &mut SymbolTable, spec: &str) -> Result<(), String> {
    const SYMBOL_TYPES: &[(&str, usize, TokenKind)] = &[
        ("keyword", 2, TokenKind::Word),
        ("kw", 2, TokenKind::Word),
        ("modifier", 1, TokenKind::Modifier),
        ("identifier", 1, TokenKind::Identifier),
        ("type", 1, TokenKind::Type),
        ("wrapper", 1, TokenKind::Wrapper),
        ("qualifier", 1, TokenKind::Qualifier),
    ];
    let colon = spec
        .find(':')
        .ok_or_else(|| format!("{}: {}", spec, gettext("no symbol type supplied")))?;
    let name = &spec[..colon];
    let rest = &spec[colon + 1..];
    if let Some(target) = rest.strip_prefix('=') {
        table.register_alias(name, target);
    } else {
        let kind = match_abbrev(SYMBOL_TYPES, rest)
            .ok_or_else(|| format!("{}: {}", gettext("unknown symbol type"), rest))?;
        table.register_token(name, kind);
    }
    Ok(())
}

/// Expand a `--level-indent` element string: C escapes plus `\e`, and a
/// character followed by `xN` repeats it to N copies.  `x` keeps its
/// literal meaning at the start of the string.
fn parse_level_string(arg: &str) -> Result<String, String> {
    const MAX_LEVEL_INDENT: usize = 216;
    let chars: Vec<char> = arg.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '\\' => {
                i += 1;
                let c = match chars.get(i) {
                    None => break,
                    Some(&c) => c,
                };
                match c {
                    'a' => out.push('\x07'),
                    'b' => out.push('\x08'),
                    'e' => out.push('\x1b'),
                    'f' => out.push('\x0c'),
                    'n' => out.push('\n'),
                    'r' => out.push('\r'),
                    't' => out.push('\t'),
                    'x' | 'X' => {
                        let mut val = 0u32;
                        let mut digits = 0;
                        while digits < 2 {
                            match chars.get(i + 1).and_then(|c| c.to_digit(16)) {
                                Some(d) => {
                                    val = val * 16 + d;
                                    i += 1;
                                    digits += 1;
                                }
                                None => break,
                            }
                        }
                        out.push(char::from_u32(val).unwrap_or(' '));
                    }
                    '0' => {
                        let mut val = 0u32;
                        let mut digits = 0;
                        while digits < 3 {
                            match chars.get(i + 1).and_then(|c| c.to_digit(8)) {
                                Some(d) => {
                                    val = val * 8 + d;
                                    i += 1;
                                    digits += 1;
                                }
                                None => break,
                            }
                        }
                        out.push(char::from_u32(val).unwrap_or(' '));
                    }
                    other => out.push(other),
                }
                i += 1;
            }
            'x' if !out.is_empty() => {
                let mut num = 0usize;
                let mut j = i + 1;
                while let Some(d) = chars.get(j).and_then(|c| c.to_digit(10)) {
                    num = num * 10 + d as usize;
                    j += 1;
                }
                if j == i + 1 {
                    out.push('x');
                    i += 1;
                    continue;
                }
                let prev = out.chars().last().unwrap_or(' ');
                for _ in 1..num {
                    out.push(prev);
                }
                i = j;
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
        if out.len() >= MAX_LEVEL_INDENT {
            return Err(gettext("level indent string is too long"));
        }
    }
    Ok(out)
}

/// Apply one `--level-indent` argument: either a bare number selecting a
/// space indent of that width, or `KEYWORD=STRING`.
fn apply_level_indent(config: &mut Config, spec: &str) -> Result<(), String> {
    const ELEMENTS: &[(&str, usize, u8)] = &[
        ("begin", 1, 0),
        ("start", 1, 0),
        ("0", 1, 1),
        ("1", 1, 2),
        ("end0", 4, 3),
        ("end1", 4, 4),
    ];
    if let Ok(n) = spec.parse::<usize>() {
        if n > 0 {
            let indent = " ".repeat(n.saturating_sub(1));
            config.level_indent = [indent.clone(), indent];
            return Ok(());
        }
    }
    let eq = spec
        .find('=')
        .ok_or_else(|| gettext("level-indent syntax"))?;
    let value = parse_level_string(&spec[eq + 1..])?;
    match match_abbrev(ELEMENTS, &spec[..eq]) {
        Some(0) => config.level_begin = value,
        Some(1) => config.level_indent[0] = value,
        Some(2) => config.level_indent[1] = value,
        Some(3) => config.level_end[0] = value,
        Some(4) => config.level_end[1] = value,
        _ => {
            return Err(format!(
                "{}: {}",
                gettext("unknown level indent option"),
                spec
            ))
        }
    }
    Ok(())
}

// ============================================================================
// Configuration
// ============================================================================

fn build_config(args: &Args) -> Result<Config, String> {
    let mut config = Config::default();

    config.max_depth = args.depth.unwrap_or(0);
    config.reverse = args.reverse;
    config.output = args.output.clone();
    config.use_indentation = args.use_indentation;
    config.strict_ansi = args.ansi;
    config.pushdown = args.pushdown;
    config.all_functions = args.all;
    config.print_line_numbers = args.number;
    config.print_levels = args.print_level;
    config.brief = args.brief;
    config.omit_arguments = args.omit_arguments;
    config.omit_symbol_names = args.omit_symbol_names;
    config.verbose = args.verbose;

    if args.xref {
        config.print_xref = true;
        config.print_tree = false;
        // static symbols stay out of cross-reference listings unless
        // explicitly re-included
        config.symbol_map &= !SM_STATIC;
    }
    for spec in &args.include {
        apply_symbol_classes(&mut config.symbol_map, spec)?;
    }

    config.start_name = if args.no_main {
        None
    } else {
        Some(args.main_name.clone().unwrap_or_else(|| "main".to_string()))
    };

    if args.tree {
        config.level_indent = ["  ".to_string(), "| ".to_string()];
        config.level_end = ["+-".to_string(), "\\-".to_string()];
    }
    for spec in &args.level_indent {
        apply_level_indent(&mut config, spec)?;
    }

    config.format = match &args.format {
        Some(name) => name.clone(),
        None => {
            if std::env::var_os("POSIXLY_CORRECT").is_some() {
                "posix".to_string()
            } else {
                "gnu".to_string()
            }
        }
    };
    if config.format == "posix" {
        config.print_line_numbers = true;
    }

    let mut pp_options = Vec::new();
    pp_options.extend(args.defines.iter().map(|d| format!("-D{}", d)));
    pp_options.extend(args.undefines.iter().map(|u| format!("-U{}", u)));
    pp_options.extend(args.include_dirs.iter().map(|i| format!("-I{}", i)));
    if !args.no_cpp && (args.cpp.is_some() || !pp_options.is_empty()) {
        let mut pp = Preprocessor::new(
            args.cpp
                .clone()
                .unwrap_or_else(|| DEFAULT_PREPROCESSOR.to_string()),
        );
        pp.options = pp_options;
        config.preprocess = Some(pp);
    }

    Ok(config)
}

// ============================================================================
// Main
// ============================================================================

fn main() -> ExitCode {
    setlocale(LocaleCategory::LcAll, "");
    textdomain("cflow-rs").unwrap();
    bind_textdomain_codeset("cflow-rs", "UTF-8").unwrap();

    let argv = rc::expand_args(std::env::args().collect());
    let args = Args::parse_from(&argv);

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("cflow: {}", err);
            return ExitCode::from(EX_USAGE);
        }
    };

    let mut table = SymbolTable::new();
    register_keywords(&mut table);
    for spec in &args.symbol {
        if let Err(err) = apply_symbol_override(&mut table, spec) {
            eprintln!("cflow: {}", err);
            return ExitCode::from(EX_USAGE);
        }
    }

    let mut status = EX_OK;
    for file in &args.files {
        match Lexer::from_file(file, config.preprocess.as_ref()) {
            Ok(lexer) => {
                FlowParser::new(&config, &mut table, lexer).parse();
                table.delete_statics(&config);
            }
            Err(err) => {
                eprintln!("cflow: {}: {}", file, err);
                status = EX_SOFT;
            }
        }
    }

    if let Err(err) = output::output(&mut table, &config) {
        eprintln!("cflow: {}: {}", config.output, err);
        return ExitCode::from(EX_FATAL);
    }
    ExitCode::from(status)
}

// ============================================================================
// Tests
// ============================================================================
