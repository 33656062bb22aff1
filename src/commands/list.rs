use glob::{MatchOptions, Pattern};

use crate::bundle::Bundle;

pub(crate) fn matches_any(patterns: &[Pattern], path: &str) -> bool {
    patterns.iter().any(|pattern| {
        pattern.matches_with(
            path,
            MatchOptions {
                require_literal_separator: true,
                ..Default::default()
            },
        )
    })
}

/// Entry names matching any of the glob patterns, in directory order
pub fn list_entries<'a>(bundle: &'a Bundle, patterns: &[Pattern]) -> Vec<&'a str> {
    bundle
        .file_list()
        .into_iter()
        .filter(|path| matches_any(patterns, path))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_any() {
        let patterns = [Pattern::new("CAB-*").unwrap()];
        assert!(matches_any(&patterns, "CAB-0000"));
        assert!(!matches_any(&patterns, "archive/CAB-0000"));
        assert!(!matches_any(&[], "CAB-0000"));
    }
}
