//! Normalization helpers shared across identity keys and extractors.

/// Normalize a personal name for identity matching: lowercase, collapsed
/// whitespace.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Normalize a phone number for identity matching: digits only.
pub fn normalize_phone(phone: &str) -> String {
    phone.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Normalize a website URL for identity matching: lowercase, scheme and
/// `www.` prefix stripped, trailing slash removed.
pub fn normalize_website(website: &str) -> String {
    let mut s = website.trim().to_lowercase();
    for prefix in ["https://", "http://"] {
        if let Some(rest) = s.strip_prefix(prefix) {
            s = rest.to_string();
            break;
        }
    }
    if let Some(rest) = s.strip_prefix("www.") {
        s = rest.to_string();
    }
    s.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  Jane   DOE "), "jane doe");
        assert_eq!(normalize_name("John Smith"), "john smith");
    }

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("306-555-0000"), "3065550000");
        assert_eq!(normalize_phone("(306) 555 1111"), "3065551111");
        assert_eq!(normalize_phone(""), "");
    }

    #[test]
    fn test_normalize_website() {
        assert_eq!(
            normalize_website("https://www.JohnSmith.ca/"),
            "johnsmith.ca"
        );
        assert_eq!(
            normalize_website("http://johnsmith.ca/about"),
            "johnsmith.ca/about"
        );
    }
}
