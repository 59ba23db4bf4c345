//
// Copyright (c) 2026 Jeff Garzik
//
// This file is part of the cflow-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// Startup options expansion
//
// Options may come from the CFLOW_OPTIONS environment variable and from an
// rc file (`$CFLOWRC`, or `~/.cflowrc`) before the real command line.  Both
// sources are split into words and inserted between argv[0] and the first
// real argument.  Nothing is read when POSIXLY_CORRECT is set.
//

use std::env;
use std::fs;
use std::path::Path;

/// Split a line of rc text into argv words.  Whitespace separates words,
/// `#` starts a comment, and single or double quotes group; a backslash
/// escapes the next character inside double quotes or bare text.
pub fn split_words(line: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut chars = line.chars().peekable();
    loop {
        while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
            chars.next();
        }
        match chars.peek() {
            None | Some('#') => break,
            _ => {}
        }
        let mut word = String::new();
        while let Some(&c) = chars.peek() {
            match c {
                c if c.is_whitespace() => break,
                '#' => break,
                '"' | '\'' => {
                    let quote = c;
                    chars.next();
                    while let Some(&inner) = chars.peek() {
                        chars.next();
                        if inner == quote {
                            break;
                        }
                        if inner == '\\' && quote == '"' {
                            if let Some(&escaped) = chars.peek() {
                                chars.next();
                                word.push(escaped);
                            }
                        } else {
                            word.push(inner);
                        }
                    }
                }
                '\\' => {
                    chars.next();
                    if let Some(&escaped) = chars.peek() {
                        chars.next();
                        word.push(escaped);
                    }
                }
                _ => {
                    chars.next();
                    word.push(c);
                }
            }
        }
        words.push(word);
    }
    words
}

/// Read an rc file and split every line into words, skipping comments.
pub fn read_rc_words(path: &Path) -> Vec<String> {
    let Ok(text) = fs::read_to_string(path) else {
        return Vec::new();
    };
    text.lines().flat_map(split_words).collect()
}

fn rc_file_words() -> Vec<String> {
    let path = match env::var("CFLOWRC") {
        Ok(p) => p,
        Err(_) => match env::var("HOME") {
            Ok(home) => format!("{}/.cflowrc", home),
            Err(_) => return Vec::new(),
        },
    };
    read_rc_words(Path::new(&path))
}

/// Expand argv with the startup options, keeping argv[0] first.
pub fn expand_args(argv: Vec<String>) -> Vec<String> {
    if argv.is_empty() || env::var_os("POSIXLY_CORRECT").is_some() {
        return argv;
    }
    let mut out = Vec::with_capacity(argv.len());
    out.push(argv[0].clone());
    if let Ok(opts) = env::var("CFLOW_OPTIONS") {
        out.extend(split_words(&opts));
    }
    out.extend(rc_file_words());
    out.extend(argv.into_iter().skip(1));
    out
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_split_plain_words() {
        assert_eq!(
            split_words("--brief -d 3"),
            vec!["--brief", "-d", "3"]
        );
    }

    #[test]
    fn test_split_skips_comments_and_blanks() {
        assert_eq!(split_words("   # all of this is comment"), Vec::<String>::new());
        assert_eq!(split_words(""), Vec::<String>::new());
        assert_eq!(split_words("-r # reverse by default"), vec!["-r"]);
    }

    #[test]
    fn test_split_quoted_words() {
        assert_eq!(
            split_words("--level-indent '0=  ' --main \"my main\""),
            vec!["--level-indent", "0=  ", "--main", "my main"]
        );
    }

    #[test]
    fn test_split_backslash_escape() {
        assert_eq!(split_words(r"a\ b c"), vec!["a b", "c"]);
    }

    #[test]
    fn test_read_rc_words() {
        let mut path = env::temp_dir();
        path.push(format!("cflow-rc-test-{}", std::process::id()));
        {
            let mut f = fs::File::create(&path).unwrap();
            writeln!(f, "# defaults").unwrap();
            writeln!(f, "--brief").unwrap();
            writeln!(f, "-d 5  # depth").unwrap();
        }
        let words = read_rc_words(&path);
        fs::remove_file(&path).unwrap();
        assert_eq!(words, vec!["--brief", "-d", "5"]);
    }

    #[test]
    fn test_missing_rc_file_is_empty() {
        assert!(read_rc_words(Path::new("/nonexistent/.cflowrc")).is_empty());
    }
}
