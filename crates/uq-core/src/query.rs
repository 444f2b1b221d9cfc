//! Query-string representation of the shareable inputs.
//!
//! Only `subject`, `limit` and `ex` are owned here. Any other parameter in
//! the address is preserved in place when the representation is rewritten.

use std::fmt;

use crate::derive::CharClasses;

pub const SUBJECT_PARAM: &str = "subject";
pub const LIMIT_PARAM: &str = "limit";
pub const EXCLUDE_PARAM: &str = "ex";

/// A limit value that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidLimit(pub String);

impl fmt::Display for InvalidLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid limit {:?}", self.0)
    }
}

impl std::error::Error for InvalidLimit {}

/// Parse a length limit with integer-prefix semantics.
///
/// Leading whitespace and an optional `+` are skipped and the leading run of
/// decimal digits is used; anything after it is ignored (`"12px"` is 12).
/// No digits, a minus sign, or overflow is an error.
pub fn parse_limit(text: &str) -> Result<usize, InvalidLimit> {
    let invalid = || InvalidLimit(text.to_string());
    let trimmed = text.trim_start();
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let digits_end = unsigned
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(unsigned.len());
    let digits = &unsigned[..digits_end];
    if digits.is_empty() {
        return Err(invalid());
    }
    digits.parse::<usize>().map_err(|_| invalid())
}

/// The parameters carried in the address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryState {
    pub subject: Option<String>,
    pub limit: Option<usize>,
    pub exclude: CharClasses,
}

impl QueryState {
    /// Read the owned parameters from a decoded pair list.
    ///
    /// An empty `subject` is treated as absent. A malformed `limit` is
    /// logged and ignored.
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        let mut state = Self::default();

        if let Some(text) = first_value(pairs, LIMIT_PARAM) {
            match parse_limit(text) {
                Ok(limit) => state.limit = Some(limit),
                Err(e) => tracing::warn!("'{LIMIT_PARAM}' parameter ignored: {e}"),
            }
        }

        state.subject = first_value(pairs, SUBJECT_PARAM)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        if let Some(code) = first_value(pairs, EXCLUDE_PARAM) {
            state.exclude = CharClasses::from_code(code);
        }

        state
    }

    /// Rewrite `pairs` in place.
    ///
    /// Owned parameters are replaced where they already appear (duplicates
    /// are dropped), appended when new, and removed when empty or unset.
    pub fn apply(&self, pairs: &mut Vec<(String, String)>) {
        set_param(pairs, SUBJECT_PARAM, self.subject.clone().filter(|s| !s.is_empty()));
        set_param(pairs, LIMIT_PARAM, self.limit.map(|n| n.to_string()));
        let code = (!self.exclude.is_empty()).then(|| self.exclude.code());
        set_param(pairs, EXCLUDE_PARAM, code);
    }
}

fn first_value<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn set_param(pairs: &mut Vec<(String, String)>, key: &str, value: Option<String>) {
    let Some(value) = value else {
        pairs.retain(|(k, _)| k != key);
        return;
    };

    match pairs.iter().position(|(k, _)| k == key) {
        Some(first) => {
            pairs[first].1 = value;
            let mut index = 0;
            pairs.retain(|(k, _)| {
                let keep = k != key || index == first;
                index += 1;
                keep
            });
        }
        None => pairs.push((key.to_string(), value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_limit_prefix_semantics() {
        assert_eq!(parse_limit("10"), Ok(10));
        assert_eq!(parse_limit("  7"), Ok(7));
        assert_eq!(parse_limit("+3"), Ok(3));
        assert_eq!(parse_limit("12px"), Ok(12));
        assert_eq!(parse_limit("10.9"), Ok(10));
        assert_eq!(parse_limit("0"), Ok(0));
    }

    #[test]
    fn test_parse_limit_rejects() {
        assert!(parse_limit("").is_err());
        assert!(parse_limit("abc").is_err());
        assert!(parse_limit("-5").is_err());
        assert!(parse_limit("+").is_err());
        assert!(parse_limit("99999999999999999999999999").is_err());
    }

    #[test]
    fn test_from_pairs() {
        let state = QueryState::from_pairs(&pairs(&[
            ("subject", "example.com"),
            ("limit", "12"),
            ("ex", "ns"),
        ]));
        assert_eq!(state.subject.as_deref(), Some("example.com"));
        assert_eq!(state.limit, Some(12));
        assert!(state.exclude.contains(CharClasses::DIGIT));
        assert!(state.exclude.contains(CharClasses::SYMBOL));
        assert_eq!(state.exclude.len(), 2);
    }

    #[test]
    fn test_from_pairs_ignores_bad_limit_and_empty_subject() {
        let state = QueryState::from_pairs(&pairs(&[("subject", ""), ("limit", "lots")]));
        assert_eq!(state, QueryState::default());
    }

    #[test]
    fn test_apply_preserves_unrelated_params() {
        let mut current = pairs(&[("utm", "x"), ("limit", "4"), ("lang", "en")]);
        let state = QueryState {
            subject: Some("foo".into()),
            limit: Some(10),
            exclude: CharClasses::SYMBOL,
        };
        state.apply(&mut current);
        assert_eq!(
            current,
            pairs(&[
                ("utm", "x"),
                ("limit", "10"),
                ("lang", "en"),
                ("subject", "foo"),
                ("ex", "s"),
            ])
        );
    }

    #[test]
    fn test_apply_removes_empty_values() {
        let mut current = pairs(&[("subject", "old"), ("limit", "4"), ("ex", "u"), ("keep", "1")]);
        QueryState {
            subject: Some(String::new()),
            limit: None,
            exclude: CharClasses::empty(),
        }
        .apply(&mut current);
        assert_eq!(current, pairs(&[("keep", "1")]));
    }

    #[test]
    fn test_apply_collapses_duplicates() {
        let mut current = pairs(&[("limit", "1"), ("x", "y"), ("limit", "2")]);
        QueryState {
            limit: Some(9),
            ..QueryState::default()
        }
        .apply(&mut current);
        assert_eq!(current, pairs(&[("limit", "9"), ("x", "y")]));
    }

    #[test]
    fn test_roundtrip() {
        let state = QueryState {
            subject: Some("foo".into()),
            limit: Some(10),
            exclude: CharClasses::SYMBOL,
        };
        let mut written = Vec::new();
        state.apply(&mut written);
        assert_eq!(QueryState::from_pairs(&written), state);
    }
}
