//! Deterministic site-password derivation.
//!
//! SHA-256 over `secret + subject`, standard base64, drop excluded
//! character classes, then truncate. Empty secret or subject yields an
//! empty string.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};

/// Length of an unfiltered SHA-256 digest in padded base64.
pub const DEFAULT_LIMIT: usize = 44;

/// A named set of characters that can appear in a base64 digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CharClass {
    Lower,
    Digit,
    Symbol,
    Upper,
}

impl CharClass {
    /// All classes, in query-code order.
    pub const ALL: [CharClass; 4] = [
        CharClass::Lower,
        CharClass::Digit,
        CharClass::Symbol,
        CharClass::Upper,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CharClass::Lower => "lower",
            CharClass::Digit => "numbers",
            CharClass::Symbol => "symbols",
            CharClass::Upper => "upper",
        }
    }

    /// One-letter code used in the `ex` query parameter.
    pub fn code(self) -> char {
        match self {
            CharClass::Lower => 'l',
            CharClass::Digit => 'n',
            CharClass::Symbol => 's',
            CharClass::Upper => 'u',
        }
    }

    pub fn from_code(code: char) -> Option<Self> {
        Self::ALL.into_iter().find(|class| class.code() == code)
    }

    pub fn matches(self, c: char) -> bool {
        match self {
            CharClass::Lower => c.is_ascii_lowercase(),
            CharClass::Digit => c.is_ascii_digit(),
            CharClass::Symbol => matches!(c, '+' | '/' | '='),
            CharClass::Upper => c.is_ascii_uppercase(),
        }
    }

    pub fn flag(self) -> CharClasses {
        match self {
            CharClass::Lower => CharClasses::LOWER,
            CharClass::Digit => CharClasses::DIGIT,
            CharClass::Symbol => CharClasses::SYMBOL,
            CharClass::Upper => CharClasses::UPPER,
        }
    }
}

impl fmt::Display for CharClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

bitflags::bitflags! {
    /// A subset of [`CharClass`], bit order matching the query codes.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct CharClasses: u8 {
        const LOWER  = 0b0001;
        const DIGIT  = 0b0010;
        const SYMBOL = 0b0100;
        const UPPER  = 0b1000;
    }
}

impl CharClasses {
    pub fn with(self, class: CharClass) -> Self {
        self | class.flag()
    }

    pub fn len(self) -> usize {
        self.bits().count_ones() as usize
    }

    /// Member classes in query-code order.
    pub fn classes(self) -> impl Iterator<Item = CharClass> {
        CharClass::ALL
            .into_iter()
            .filter(move |class| self.contains(class.flag()))
    }

    /// True when `c` belongs to any class in the set.
    pub fn excludes(self, c: char) -> bool {
        self.classes().any(|class| class.matches(c))
    }

    /// Concatenated one-letter codes, e.g. `"ns"`.
    pub fn code(self) -> String {
        self.classes().map(CharClass::code).collect()
    }

    /// Parse a code string. Unknown letters are skipped with a warning.
    pub fn from_code(code: &str) -> Self {
        let mut classes = Self::empty();
        for letter in code.chars() {
            match CharClass::from_code(letter) {
                Some(class) => classes.insert(class.flag()),
                None => tracing::warn!("ignoring unknown character class code '{letter}'"),
            }
        }
        classes
    }
}

impl From<CharClass> for CharClasses {
    fn from(class: CharClass) -> Self {
        class.flag()
    }
}

impl FromIterator<CharClass> for CharClasses {
    fn from_iter<I: IntoIterator<Item = CharClass>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::empty(), |classes, class| classes.with(class))
    }
}

/// Run the pipeline synchronously.
///
/// `limit` of `None` or `Some(0)` keeps the whole filtered string.
/// Truncation counts characters after filtering.
pub fn derive_password(
    secret: &str,
    subject: &str,
    limit: Option<usize>,
    exclude: CharClasses,
) -> String {
    if secret.is_empty() || subject.is_empty() {
        return String::new();
    }

    // Order matters: secret first, subject appended, no separator
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(subject.as_bytes());
    let encoded = STANDARD.encode(hasher.finalize());

    let filtered = encoded.chars().filter(|&c| !exclude.excludes(c));
    match limit {
        Some(n) if n > 0 => filtered.take(n).collect(),
        _ => filtered.collect(),
    }
}

/// Asynchronous entry point used by the session wiring.
pub async fn derive(
    secret: String,
    subject: String,
    limit: Option<usize>,
    exclude: CharClasses,
) -> String {
    derive_password(&secret, &subject, limit, exclude)
}

#[cfg(test)]
mod tests {
    use super::*;

    // base64(SHA-256("correct horseexample.com")), computed independently
    const CORRECT_HORSE: &str = "CW4tAm3VScOlzZaejYeXBUegvm3JAIGj9LXfvJEtkg4=";
    // base64(SHA-256("hunter2github.com"))
    const HUNTER2: &str = "c6Huq+VKDV+s/UfFokpys7C4hWi64/8RXQNfgpeEuXI=";

    #[test]
    fn test_full_output_matches_reference() {
        let out = derive_password("correct horse", "example.com", None, CharClasses::empty());
        assert_eq!(out, CORRECT_HORSE);
        assert_eq!(out.len(), DEFAULT_LIMIT);
    }

    #[test]
    fn test_limit_truncates() {
        let out = derive_password("correct horse", "example.com", Some(10), CharClasses::empty());
        assert_eq!(out, &CORRECT_HORSE[..10]);
        assert_eq!(out, "CW4tAm3VSc");
    }

    #[test]
    fn test_zero_limit_is_no_op() {
        let out = derive_password("correct horse", "example.com", Some(0), CharClasses::empty());
        assert_eq!(out, CORRECT_HORSE);
    }

    #[test]
    fn test_limit_beyond_length_is_no_op() {
        let out = derive_password("hunter2", "github.com", Some(500), CharClasses::empty());
        assert_eq!(out, HUNTER2);
    }

    #[test]
    fn test_concatenation_order_matters() {
        let forward = derive_password("correct horse", "example.com", None, CharClasses::empty());
        let swapped = derive_password("example.com", "correct horse", None, CharClasses::empty());
        assert_ne!(forward, swapped);
        assert_eq!(swapped, "BD9b66UsstDDKaCR2OGvusR/QcII+xLZ7NU1fCfmUX4=");
    }

    #[test]
    fn test_empty_inputs_yield_empty() {
        let none = CharClasses::empty();
        assert_eq!(derive_password("", "example.com", Some(10), none), "");
        assert_eq!(derive_password("secret", "", None, none), "");
        assert_eq!(derive_password("", "", None, none), "");
    }

    #[test]
    fn test_exclude_symbols() {
        let symbols = CharClasses::SYMBOL;
        let out = derive_password("hunter2", "github.com", None, symbols);
        assert_eq!(out, "c6HuqVKDVsUfFokpys7C4hWi648RXQNfgpeEuXI");
        let out = derive_password("hunter2", "github.com", Some(12), symbols);
        assert_eq!(out, "c6HuqVKDVsUf");
    }

    #[test]
    fn test_exclude_upper_and_digits() {
        let classes = CharClasses::UPPER | CharClasses::DIGIT;
        let out = derive_password("hunter2", "github.com", None, classes);
        assert_eq!(out, "cuq++s/fokpyshi/fgpeu=");
    }

    #[test]
    fn test_exclude_lower_and_symbols() {
        let classes = CharClasses::LOWER | CharClasses::SYMBOL;
        let out = derive_password("hunter2", "github.com", None, classes);
        assert_eq!(out, "6HVKDVUF7C4W648RXQNEXI");
    }

    #[test]
    fn test_excluding_everything_yields_empty() {
        let all = CharClasses::all();
        assert_eq!(derive_password("hunter2", "github.com", Some(8), all), "");
    }

    #[test]
    fn test_class_codes() {
        let classes = CharClasses::from_code("us");
        assert!(classes.contains(CharClasses::UPPER));
        assert!(classes.contains(CharClasses::SYMBOL));
        assert!(!classes.contains(CharClasses::LOWER));
        assert_eq!(classes.len(), 2);
        assert_eq!(classes.code(), "su");

        let all: CharClasses = CharClass::ALL.into_iter().collect();
        assert_eq!(all.code(), "lnsu");
    }

    #[test]
    fn test_unknown_codes_ignored() {
        let classes = CharClasses::from_code("nxz");
        assert_eq!(classes, CharClasses::DIGIT);
    }

    #[test]
    fn test_class_flags_agree_with_codes() {
        let collected: CharClasses = CharClass::ALL.into_iter().collect();
        assert_eq!(collected, CharClasses::all());
        for class in CharClass::ALL {
            let single = CharClasses::from(class);
            assert_eq!(single.len(), 1);
            assert_eq!(single.code(), class.code().to_string());
            assert_eq!(single.classes().collect::<Vec<_>>(), vec![class]);
        }
        assert_eq!(
            CharClasses::empty().with(CharClass::Upper).with(CharClass::Digit),
            CharClasses::UPPER | CharClasses::DIGIT
        );
    }

    #[test]
    fn test_remove_class() {
        let mut classes = CharClasses::from_code("lnsu");
        classes.remove(CharClasses::LOWER);
        assert_eq!(classes.code(), "nsu");
        assert!(!classes.excludes('a'));
        assert!(classes.excludes('A'));
        assert!(classes.excludes('/'));
    }
}
