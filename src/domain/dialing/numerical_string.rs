//! Dialed digits that compare as both text and number
//!
//! `"0123"` keeps its leading zero as text while still comparing equal to
//! the number `123`.

use regex::Regex;
use std::fmt;
use std::ops::RangeInclusive;

/// What a dialed value can be compared against
#[derive(Debug, Clone)]
pub enum Matcher {
    Number(u64),
    Text(String),
    Pattern(Regex),
    Range(RangeInclusive<u64>),
}

impl From<u64> for Matcher {
    fn from(n: u64) -> Self {
        Matcher::Number(n)
    }
}

impl From<&str> for Matcher {
    fn from(s: &str) -> Self {
        Matcher::Text(s.to_string())
    }
}

impl From<Regex> for Matcher {
    fn from(re: Regex) -> Self {
        Matcher::Pattern(re)
    }
}

impl From<RangeInclusive<u64>> for Matcher {
    fn from(range: RangeInclusive<u64>) -> Self {
        Matcher::Range(range)
    }
}

/// Digits entered by a caller or dialed by a routine
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NumericalString {
    text: String,
    numeric: Option<u64>,
}

impl NumericalString {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let numeric = if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
            text.parse().ok()
        } else {
            None
        };
        Self { text, numeric }
    }

    /// `"0123"` yes, `"0"` and `"123"` no
    pub fn starts_with_leading_zero(s: &str) -> bool {
        let bytes = s.as_bytes();
        bytes.len() > 1 && bytes[0] == b'0' && bytes[1].is_ascii_digit()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Numeric value; present only when the text is all digits
    pub fn numeric(&self) -> Option<u64> {
        self.numeric
    }

    pub fn eq_number(&self, n: u64) -> bool {
        self.numeric == Some(n)
    }

    pub fn eq_text(&self, s: &str) -> bool {
        self.text == s
    }

    pub fn matches(&self, matcher: &Matcher) -> bool {
        match matcher {
            Matcher::Number(n) => self.eq_number(*n),
            Matcher::Text(s) => self.eq_text(s),
            Matcher::Pattern(re) => re.is_match(&self.text),
            Matcher::Range(range) => self.numeric.is_some_and(|n| range.contains(&n)),
        }
    }
}

impl AsRef<str> for NumericalString {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for NumericalString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl From<&str> for NumericalString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leading_zero_preserved() {
        let digits = NumericalString::new("0123");
        assert_eq!(digits.text(), "0123");
        assert_eq!(digits.numeric(), Some(123));
        assert!(digits.eq_number(123));
        assert!(digits.eq_text("0123"));
        assert!(!digits.eq_text("123"));
        assert_eq!(digits.to_string(), "0123");
    }

    #[test]
    fn test_starts_with_leading_zero() {
        assert!(NumericalString::starts_with_leading_zero("0123"));
        assert!(NumericalString::starts_with_leading_zero("00"));
        assert!(!NumericalString::starts_with_leading_zero("0"));
        assert!(!NumericalString::starts_with_leading_zero("123"));
        assert!(!NumericalString::starts_with_leading_zero("0abc"));
    }

    #[test]
    fn test_non_numeric_text() {
        let star = NumericalString::new("*72");
        assert_eq!(star.numeric(), None);
        assert!(!star.matches(&Matcher::Number(72)));
        assert!(!star.matches(&Matcher::Range(0..=100)));
        assert!(star.matches(&Matcher::Text("*72".to_string())));
        assert_eq!(NumericalString::new("").numeric(), None);
    }

    #[test]
    fn test_matchers() {
        let ext = NumericalString::new("0042");
        assert!(ext.matches(&Matcher::from(42u64)));
        assert!(ext.matches(&Matcher::from(40u64..=49)));
        assert!(!ext.matches(&Matcher::from(50u64..=59)));
        assert!(ext.matches(&Matcher::from(Regex::new(r"^00\d\d$").unwrap())));
        assert!(!ext.matches(&Matcher::from("42")));
    }
}
