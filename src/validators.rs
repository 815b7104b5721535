// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::LazyLock;

use regex::Regex;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
        .expect("email pattern compiles")
});

/// Loose `local@domain.tld` check, applied to the trimmed value.
pub fn is_email(value: &str) -> bool {
    EMAIL.is_match(value.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_addresses() {
        assert!(is_email("ada@example.com"));
        assert!(is_email("first.last+tag@mail.example.co.uk"));
        assert!(is_email("  padded@example.org  "));
    }

    #[test]
    fn rejects_non_addresses() {
        assert!(!is_email("Ada Lovelace"));
        assert!(!is_email("missing-at.example.com"));
        assert!(!is_email("ada@localhost"));
        assert!(!is_email(""));
    }
}
