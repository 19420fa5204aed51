//! RFC-compatible hostname grammar used to validate domains accepted through
//! the Control API before they ever reach the Store.
//!
//! Rules (per spec): total length 1-253; each label 1-63 of `[A-Za-z0-9-]`,
//! not starting or ending with `-`; at least one dot; TLD label of 2+ letters.

pub fn is_valid_domain(input: &str) -> bool {
    let domain = input.trim_end_matches('.');

    if domain.is_empty() || domain.len() > 253 {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }

    if !labels.iter().all(|label| is_valid_label(label)) {
        return false;
    }

    let tld = labels[labels.len() - 1];
    tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic())
}

fn is_valid_label(label: &str) -> bool {
    if label.is_empty() || label.len() > 63 {
        return false;
    }
    if label.starts_with('-') || label.ends_with('-') {
        return false;
    }
    label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_domains() {
        assert!(is_valid_domain("a.b"));
        assert!(is_valid_domain("a-b.co"));
        assert!(is_valid_domain("xn--nxasmq6b.jp"));
        assert!(is_valid_domain("ads.example.com"));
    }

    #[test]
    fn rejects_malformed_domains() {
        assert!(!is_valid_domain("-a.com"));
        assert!(!is_valid_domain("a..b"));
        assert!(!is_valid_domain("a.b-"));
        assert!(!is_valid_domain("a"));
        assert!(!is_valid_domain(""));
    }

    #[test]
    fn rejects_domains_over_253_chars() {
        let long_label = "a".repeat(63);
        let domain = format!("{long_label}.{long_label}.{long_label}.{long_label}.com");
        assert!(domain.len() > 253);
        assert!(!is_valid_domain(&domain));
    }

    #[test]
    fn rejects_tld_with_digits() {
        assert!(!is_valid_domain("example.c0m"));
    }
}
