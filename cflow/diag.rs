//
// Copyright (c) 2026 Jeff Garzik
//
// This file is part of the cflow-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// Diagnostic output and exit status codes for cflow
//

use std::sync::atomic::{AtomicU32, Ordering};

// ============================================================================
// Exit Codes
// ============================================================================

/// Success
pub const EX_OK: u8 = 0;
/// Fatal error
pub const EX_FATAL: u8 = 1;
/// Some input files cannot be read or parsed
pub const EX_SOFT: u8 = 2;
/// Command line usage error
pub const EX_USAGE: u8 = 3;

// ============================================================================
// Error Tracking
// ============================================================================

static ERROR_COUNT: AtomicU32 = AtomicU32::new(0);
static WARNING_COUNT: AtomicU32 = AtomicU32::new(0);

/// Get error count
#[cfg(test)]
pub fn error_count() -> u32 {
    ERROR_COUNT.load(Ordering::Relaxed)
}

/// Get warning count
#[cfg(test)]
pub fn warning_count() -> u32 {
    WARNING_COUNT.load(Ordering::Relaxed)
}

/// Reset error/warning counts
#[cfg(test)]
pub fn reset_counts() {
    ERROR_COUNT.store(0, Ordering::Relaxed);
    WARNING_COUNT.store(0, Ordering::Relaxed);
}

// ============================================================================
// Diagnostic Output
// ============================================================================

/// Print an error message without source position
pub fn error(msg: &str) {
    ERROR_COUNT.fetch_add(1, Ordering::Relaxed);
    eprintln!("cflow: {}", msg);
}

/// Print an error message prefixed with a source position
pub fn error_at(file: &str, line: u32, msg: &str) {
    ERROR_COUNT.fetch_add(1, Ordering::Relaxed);
    eprintln!("{}:{}: {}", file, line, msg);
}

/// Print a recoverable parse anomaly prefixed with a source position
pub fn warning_at(file: &str, line: u32, msg: &str) {
    WARNING_COUNT.fetch_add(1, Ordering::Relaxed);
    eprintln!("{}:{}: {}", file, line, msg);
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_counting() {
        reset_counts();
        assert_eq!(error_count(), 0);

        error("test error");
        assert_eq!(error_count(), 1);

        error_at("test.c", 3, "another");
        assert_eq!(error_count(), 2);

        warning_at("test.c", 4, "loose end");
        assert_eq!(warning_count(), 1);

        reset_counts();
        assert_eq!(error_count(), 0);
        assert_eq!(warning_count(), 0);
    }

    #[test]
    fn test_exit_codes_are_distinct() {
        assert_eq!(EX_OK, 0);
        assert_eq!(EX_FATAL, 1);
        assert_eq!(EX_SOFT, 2);
        assert_eq!(EX_USAGE, 3);
    }
}
