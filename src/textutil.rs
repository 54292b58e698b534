use once_cell::sync::Lazy;
use regex::Regex;

static CJK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\u4e00-\u9fff]").expect("cjk"));
static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\s\-‐‑‒–—―－]*$").expect("placeholder"));

/// Empty text or a bare run of dashes (`-`, `—`, `－`...).
pub fn is_placeholder_text(text: &str) -> bool {
    PLACEHOLDER_RE.is_match(text)
}

pub fn contains_cjk(text: &str) -> bool {
    CJK_RE.is_match(text)
}

pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

pub fn first_non_empty_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).find(|l| !l.is_empty())
}

/// Clip for log lines; never used on data that leaves the process.
pub fn clip_for_log(text: &str, max_chars: usize) -> String {
    let flat = text.replace(['\r', '\n'], " ");
    if char_len(&flat) <= max_chars {
        return flat;
    }
    let mut out: String = flat.chars().take(max_chars).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_detection() {
        assert!(is_placeholder_text(""));
        assert!(is_placeholder_text("  "));
        assert!(is_placeholder_text("--"));
        assert!(is_placeholder_text("——"));
        assert!(!is_placeholder_text("A-B"));
        assert!(!is_placeholder_text("无"));
    }

    #[test]
    fn first_line_skips_blank_lines() {
        assert_eq!(first_non_empty_line("\n  \n Title \nrest"), Some("Title"));
        assert_eq!(first_non_empty_line("   "), None);
    }

    #[test]
    fn clip_counts_chars_not_bytes() {
        assert_eq!(clip_for_log("东京杂草", 2), "东京…");
        assert_eq!(clip_for_log("a\nb", 10), "a b");
    }
}
