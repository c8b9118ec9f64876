//! Utility functions for the index store implementations.

/// Build an `ILIKE` pattern matching `term` anywhere in a column.
///
/// The LIKE metacharacters `%` and `_` and the escape character `\` in the
/// term are escaped so they match literally. Use with `ESCAPE '\'`.
///
/// # Example
///
/// ```
/// use entity_index_repository::like_pattern;
///
/// assert_eq!(like_pattern("Mauri"), "%Mauri%");
/// assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
/// ```
pub fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_plain() {
        assert_eq!(like_pattern("abc"), "%abc%");
        assert_eq!(like_pattern(""), "%%");
    }

    #[test]
    fn test_like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("a%b"), "%a\\%b%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }
}
