//! Identifier vetting and `LIKE` pattern escaping.
//!
//! Identifiers (table names, columns, FTS index names) are the one class
//! of input that cannot be bound as a parameter, so they are restricted
//! to a conservative grammar instead: `[A-Za-z_][A-Za-z0-9_]*`. Anything
//! else is rejected before it can reach SQL text.

use crate::{Error, Result};

/// Validates that a name is a plain SQL identifier.
///
/// # Errors
///
/// Returns [`Error::UnsafeIdentifier`] for an empty string, a leading
/// digit, or any character outside `[A-Za-z0-9_]`.
pub fn validate_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(Error::UnsafeIdentifier {
            identifier: name.to_string(),
        });
    };
    if !first.is_ascii_alphabetic() && first != '_' {
        return Err(Error::UnsafeIdentifier {
            identifier: name.to_string(),
        });
    }
    for ch in chars {
        if !ch.is_ascii_alphanumeric() && ch != '_' {
            return Err(Error::UnsafeIdentifier {
                identifier: name.to_string(),
            });
        }
    }
    Ok(())
}

/// Escapes SQL `LIKE` wildcards in a string.
///
/// `LIKE` patterns treat `%` as "any characters" and `_` as "single
/// character"; user input containing them must be escaped to match
/// literally. Uses `\` as the escape character (requires `ESCAPE '\'` in
/// the LIKE clause).
#[must_use]
pub fn escape_like_wildcards(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '%' | '_' | '\\' => {
                result.push('\\');
                result.push(c);
            },
            _ => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("status"; "plain")]
    #[test_case("_internal"; "leading underscore")]
    #[test_case("batch_no2"; "digits after first")]
    fn test_valid_identifiers(name: &str) {
        assert!(validate_identifier(name).is_ok());
    }

    #[test_case(""; "empty")]
    #[test_case("2fast"; "leading digit")]
    #[test_case("status; DROP TABLE reagents"; "statement injection")]
    #[test_case("name--"; "comment")]
    #[test_case("a.b"; "qualified")]
    #[test_case("col\""; "quote")]
    #[test_case("col name"; "space")]
    #[test_case("naïve"; "non ascii")]
    fn test_invalid_identifiers(name: &str) {
        assert!(matches!(
            validate_identifier(name),
            Err(Error::UnsafeIdentifier { .. })
        ));
    }

    #[test]
    fn test_escape_like_wildcards() {
        assert_eq!(escape_like_wildcards("normal"), "normal");
        assert_eq!(escape_like_wildcards("100%"), "100\\%");
        assert_eq!(escape_like_wildcards("user_name"), "user\\_name");
        assert_eq!(escape_like_wildcards("path\\file"), "path\\\\file");
        assert_eq!(escape_like_wildcards("100%_x\\"), "100\\%\\_x\\\\");
        assert_eq!(escape_like_wildcards(""), "");
    }
}
