//! Helpers for building argument and query words.

/// An argument word: `=<key>=<value>`.
pub fn attr(key: &str, value: &str) -> String {
    format!("={key}={value}")
}

/// An equality query word: `?<key>=<value>`.
pub fn query(key: &str, value: &str) -> String {
    format!("?{key}={value}")
}

/// A pattern query word: `?<key>~<pattern>`.
pub fn query_match(key: &str, pattern: &str) -> String {
    format!("?{key}~{pattern}")
}

/// Splits an attribute word `=key=value` into `(key, value)`.
///
/// Only the first `=` after the leading one separates key from value, so
/// values may themselves contain `=`. A word with no separator (`=key`)
/// yields an empty value. Returns `None` for words that aren't attributes.
pub fn split_attr(word: &str) -> Option<(&str, &str)> {
    let body = word.strip_prefix('=')?;
    Some(body.split_once('=').unwrap_or((body, "")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attr_and_query_formats() {
        assert_eq!(attr("name", "room5-12"), "=name=room5-12");
        assert_eq!(attr(".id", "*1A"), "=.id=*1A");
        assert_eq!(query("name", "alice"), "?name=alice");
        assert_eq!(query_match("comment", "^guest"), "?comment~^guest");
    }

    #[test]
    fn test_split_attr_splits_once() {
        assert_eq!(split_attr("=name=alice"), Some(("name", "alice")));
        assert_eq!(split_attr("=comment=a=b"), Some(("comment", "a=b")));
        assert_eq!(split_attr("=disabled="), Some(("disabled", "")));
        assert_eq!(split_attr("=flag"), Some(("flag", "")));
    }

    #[test]
    fn test_split_attr_rejects_non_attribute_words() {
        assert_eq!(split_attr("!re"), None);
        assert_eq!(split_attr("?name=alice"), None);
        assert_eq!(split_attr(".tag=4"), None);
    }
}
