// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Credential shape checks backing each adapter's `is_available()`.
//!
//! Missing or placeholder credentials make a provider unavailable. They are
//! never a runtime error.

use once_cell::sync::Lazy;
use regex::Regex;

/// Values commonly left in `.env` templates.
static PLACEHOLDER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(<.*>|\$\{.*\}|your[_\- ].*|.*_here|x{3,}|\*{3,}|change[_\-]?me|placeholder|dummy|none|null|undefined)$")
        .unwrap()
});

/// Shortest string accepted as a real API key.
const MIN_KEY_LEN: usize = 8;

/// Check that a credential is present and not an obvious placeholder.
pub fn is_usable(value: Option<&str>) -> bool {
    match value.map(str::trim) {
        Some(v) => v.len() >= MIN_KEY_LEN && !PLACEHOLDER_REGEX.is_match(v) && !v.contains(' '),
        None => false,
    }
}

/// Check a credential and its vendor-specific prefix (e.g. `gsk_` for Groq).
pub fn is_usable_with_prefix(value: Option<&str>, prefix: &str) -> bool {
    is_usable(value) && value.map(str::trim).is_some_and(|v| v.starts_with(prefix))
}

/// Redact a secret for display, keeping only a short prefix.
pub fn redact(value: &str) -> String {
    let visible: String = value.chars().take(4).collect();
    if value.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("{}****", visible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_and_empty() {
        assert!(!is_usable(None));
        assert!(!is_usable(Some("")));
        assert!(!is_usable(Some("   ")));
        assert!(!is_usable(Some("short")));
    }

    #[test]
    fn test_placeholders_rejected() {
        for placeholder in [
            "your_api_key_here",
            "YOUR-GEMINI-KEY",
            "<insert key>",
            "${GROQ_API_KEY}",
            "xxxxxxxxxx",
            "changeme",
            "paste_key_here",
            "placeholder",
        ] {
            assert!(!is_usable(Some(placeholder)), "{} should be rejected", placeholder);
        }
    }

    #[test]
    fn test_real_looking_keys_accepted() {
        assert!(is_usable(Some("AIzaSyA1b2C3d4E5f6G7h8")));
        assert!(is_usable(Some("  gsk_abcdef123456  ")));
    }

    #[test]
    fn test_prefix_check() {
        assert!(is_usable_with_prefix(Some("gsk_abcdef123456"), "gsk_"));
        assert!(!is_usable_with_prefix(Some("sk-abcdef123456"), "gsk_"));
        assert!(!is_usable_with_prefix(None, "gsk_"));
    }

    #[test]
    fn test_redact() {
        assert_eq!(redact("gsk_abcdef123456"), "gsk_****");
        assert_eq!(redact("abc"), "****");
    }
}
