use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

const MAX_SYMBOL_LEN: usize = 15;

/// Joins a ticker to the timestamp in artifact ids; never valid in a ticker.
pub(crate) const ARTIFACT_ID_SEPARATOR: char = '_';

/// Normalized equity ticker: an ASCII letter followed by letters, digits,
/// `.` or `-`, at most 15 characters, stored upper-case.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Parse and normalize a symbol to uppercase.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let normalized = input.trim().to_ascii_uppercase();
        let len = normalized.chars().count();
        if len == 0 {
            return Err(ValidationError::EmptySymbol);
        }
        if len > MAX_SYMBOL_LEN {
            return Err(ValidationError::SymbolTooLong {
                len,
                max: MAX_SYMBOL_LEN,
            });
        }

        for (index, ch) in normalized.chars().enumerate() {
            match ch {
                ARTIFACT_ID_SEPARATOR => {
                    return Err(ValidationError::SymbolReservedSeparator { index });
                }
                ch if index == 0 && !ch.is_ascii_alphabetic() => {
                    return Err(ValidationError::SymbolInvalidStart { ch });
                }
                ch if ch.is_ascii_alphanumeric() || ch == '.' || ch == '-' => {}
                ch => return Err(ValidationError::SymbolInvalidChar { ch, index }),
            }
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Symbol {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for Symbol {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Symbol> for String {
    fn from(value: Symbol) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_normalizes_symbol() {
        let parsed = Symbol::parse(" brk.b ").expect("symbol should parse");
        assert_eq!(parsed.as_str(), "BRK.B");
    }

    #[test]
    fn underscore_is_reported_as_the_artifact_separator() {
        let err = Symbol::parse("AAPL_2024").expect_err("must fail");
        assert_eq!(err, ValidationError::SymbolReservedSeparator { index: 4 });
        assert!(err.to_string().contains("artifact id"), "{err}");

        let err = Symbol::parse("_AAPL").expect_err("must fail");
        assert_eq!(err, ValidationError::SymbolReservedSeparator { index: 0 });
    }

    #[test]
    fn rejects_other_punctuation_and_overlong_input() {
        let err = Symbol::parse("BRK/B").expect_err("must fail");
        assert_eq!(err, ValidationError::SymbolInvalidChar { ch: '/', index: 3 });
        assert_eq!(Symbol::parse("   ").expect_err("must fail"), ValidationError::EmptySymbol);
        assert!(matches!(
            Symbol::parse("ABCDEFGHIJKLMNOP").expect_err("must fail"),
            ValidationError::SymbolTooLong { len: 16, max: 15 }
        ));
    }

    #[test]
    fn rejects_invalid_start() {
        let err = Symbol::parse("1AAPL").expect_err("must fail");
        assert!(matches!(err, ValidationError::SymbolInvalidStart { .. }));
    }
}
