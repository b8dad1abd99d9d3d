//! Sanitization: makes arbitrary extracted text safe to embed in LaTeX.
//!
//! Rules run in a fixed order and the output is always 7-bit ASCII, so running
//! the function twice changes nothing.

/// Mojibake left behind when a UTF-8 replacement character was decoded as Latin-1.
const MOJIBAKE_REPLACEMENT: &str = "\u{00EF}\u{00BF}\u{00BD}";

/// Applies the sanitization rules in order:
/// 1. invalid sequences were already replaced at decode time (Rust strings are valid UTF-8)
/// 2. `#` → `sharp`
/// 3. drop U+FFFD and its Latin-1 mojibake
/// 4. `&` → `and`
/// 5. `$` → `USD`
/// 6. drop everything outside 0x00–0x7F
pub fn sanitize(text: &str) -> String {
    let text = text
        .replace('#', "sharp")
        .replace(MOJIBAKE_REPLACEMENT, "")
        .replace(char::REPLACEMENT_CHARACTER, "")
        .replace('&', "and")
        .replace('$', "USD");
    strip_non_ascii(&text)
}

/// Removes every character outside the 7-bit ASCII range, including U+FFFD.
pub fn strip_non_ascii(text: &str) -> String {
    text.chars().filter(char::is_ascii).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sanitize_bytes(bytes: &[u8]) -> String {
        sanitize(&String::from_utf8_lossy(bytes))
    }

    const SAMPLES: &[&str] = &[
        "",
        "plain text",
        "C# & F# developer, $120k",
        "José Müller — Zürich ☕ 🚀",
        "\u{FFFD}broken\u{FFFD}",
        "ï¿½ mojibake",
        "##&&$$",
        "tabs\tand\nnewlines\r\n",
        "日本語のテキスト",
        "mixed #1 résumé & CV ($)",
    ];

    #[test]
    fn test_replaces_latex_specials() {
        assert_eq!(
            sanitize("C# & Rust, $5M ARR"),
            "Csharp and Rust, USD5M ARR"
        );
    }

    #[test]
    fn test_strips_non_ascii() {
        assert_eq!(sanitize("José — café"), "Jos  caf");
    }

    #[test]
    fn test_removes_replacement_characters() {
        assert_eq!(sanitize("a\u{FFFD}b"), "ab");
        assert_eq!(sanitize("aï¿½b"), "ab");
    }

    #[test]
    fn test_keeps_ascii_control_characters() {
        assert_eq!(sanitize("line one\nline\ttwo"), "line one\nline\ttwo");
    }

    #[test]
    fn test_is_idempotent() {
        for sample in SAMPLES {
            let once = sanitize(sample);
            assert_eq!(sanitize(&once), once, "not idempotent for {sample:?}");
        }
    }

    #[test]
    fn test_output_is_ascii_only() {
        for sample in SAMPLES {
            assert!(sanitize(sample).is_ascii(), "non-ascii output for {sample:?}");
        }
    }

    #[test]
    fn test_invalid_utf8_bytes_are_dropped() {
        let bytes = b"Rust \xff\xfe engineer \xc3\xa9";
        let cleaned = sanitize_bytes(bytes);
        assert!(cleaned.is_ascii());
        assert_eq!(cleaned, "Rust  engineer ");
        assert_eq!(sanitize(&cleaned), cleaned);
    }

    #[test]
    fn test_every_byte_value_yields_ascii() {
        let all: Vec<u8> = (0..=255u8).collect();
        assert!(sanitize_bytes(&all).is_ascii());
    }
}
