//! Anchored `*` wildcard matching.

/// A pattern where `*` matches any run of characters (including none) and
/// every other character matches itself. The whole text must match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WildcardPattern {
    source: String,
}

impl WildcardPattern {
    pub fn new(pattern: &str) -> Self {
        Self {
            source: pattern.to_string(),
        }
    }

    /// Whether `text` would compile to a wildcard rather than a literal.
    pub fn is_pattern(text: &str) -> bool {
        text.contains('*')
    }

    /// The pattern as written.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Full-string match. Case-sensitive; callers normalise case.
    pub fn matches(&self, text: &str) -> bool {
        let parts: Vec<&str> = self.source.split('*').collect();
        let (first, last) = match parts.as_slice() {
            [only] => return *only == text,
            [first, .., last] => (*first, *last),
            [] => return text.is_empty(),
        };

        if text.len() < first.len() + last.len()
            || !text.starts_with(first)
            || !text.ends_with(last)
        {
            return false;
        }

        // Middle parts must appear in order between the anchored ends
        let mut middle = &text[first.len()..text.len() - last.len()];
        for part in &parts[1..parts.len() - 1] {
            if part.is_empty() {
                continue;
            }
            match middle.find(part) {
                Some(found) => middle = &middle[found + part.len()..],
                None => return false,
            }
        }
        true
    }
}
