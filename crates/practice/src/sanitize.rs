/// Fallback returned when nothing usable survives sanitization.
pub const UNKNOWN_NAME: &str = "unknown";

const MAX_NAME_LEN: usize = 50;

/// Turn an arbitrary display name into a storage-key fragment.
///
/// Lower-cases, trims, folds whitespace runs into `_`, drops anything outside
/// `[a-z0-9_-]` and caps the result at 50 characters. Never returns an empty
/// string: absent or fully stripped input yields [`UNKNOWN_NAME`].
pub fn sanitize_name(name: Option<&str>) -> String {
    let Some(name) = name else {
        return UNKNOWN_NAME.to_string();
    };

    let lowered = name.to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut in_space = false;

    for c in lowered.trim().chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push('_');
                in_space = true;
            }
            continue;
        }
        in_space = false;
        if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-' {
            out.push(c);
        }
    }

    // ascii only at this point, byte truncation is char-safe
    out.truncate(MAX_NAME_LEN);

    if out.is_empty() {
        UNKNOWN_NAME.to_string()
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_key_safe(s: &str) -> bool {
        !s.is_empty()
            && s.len() <= MAX_NAME_LEN
            && s.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
    }

    #[test]
    fn test_basic_name() {
        assert_eq!(sanitize_name(Some("John Doe!")), "john_doe");
        assert_eq!(sanitize_name(Some("  Priya   K.  Sharma ")), "priya_k_sharma");
        assert_eq!(sanitize_name(Some("anne-marie_2")), "anne-marie_2");
    }

    #[test]
    fn test_empty_and_absent() {
        assert_eq!(sanitize_name(Some("")), "unknown");
        assert_eq!(sanitize_name(Some("   ")), "unknown");
        assert_eq!(sanitize_name(None), "unknown");
        assert_eq!(sanitize_name(Some("!!!@@@")), "unknown");
        assert_eq!(sanitize_name(Some("अक्षरा")), "unknown");
    }

    #[test]
    fn test_truncates_to_fifty() {
        let long = "a".repeat(80);
        assert_eq!(sanitize_name(Some(&long)).len(), 50);
    }

    #[test]
    fn test_output_always_key_safe_and_idempotent() {
        let inputs = [
            "John Doe!",
            "",
            "\t\n",
            "ÉMILE zola",
            "x".repeat(120).as_str(),
            "a b\tc\nd",
            "../../etc/passwd",
            "Ω≈ç√ 42",
            "__--__",
            "Mary  Ann O'Neil",
        ]
        .map(String::from);

        for input in &inputs {
            let once = sanitize_name(Some(input));
            assert!(once == UNKNOWN_NAME || is_key_safe(&once), "unsafe output {once:?} for {input:?}");
            assert_eq!(sanitize_name(Some(&once)), once, "not a fixed point for {input:?}");
        }
    }
}
