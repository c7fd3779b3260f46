//! Canonical symbol representation and splitting.

use smol_str::SmolStr;
use std::fmt;
use thiserror::Error;

/// Quote currencies recognised when a symbol carries no separator.
const KNOWN_QUOTES: &[&str] = &["TRY", "USDT", "USDC", "BTC", "ETH", "EUR", "USD"];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SymbolError {
    #[error("symbol '{0}' could not be split into base/quote: no separator and no known quote suffix")]
    UnsplittableSymbol(String),
}

/// A canonical, uppercase, separator-free symbol (e.g. `BTCTRY`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(SmolStr);

impl Symbol {
    pub fn new(raw: &str) -> Self {
        Self(SmolStr::new(normalize_symbol(raw)))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Split into `(base, quote)`. See [`split_symbol`].
    pub fn split(&self) -> Result<(SmolStr, SmolStr), SymbolError> {
        split_symbol(self.as_str())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Symbol {
    fn from(raw: &str) -> Self {
        Symbol::new(raw)
    }
}

impl From<String> for Symbol {
    fn from(raw: String) -> Self {
        Symbol::new(&raw)
    }
}

/// Uppercase and strip `_`/`-` separators to yield the canonical form.
pub fn normalize_symbol(raw: &str) -> String {
    raw.trim()
        .to_ascii_uppercase()
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .collect()
}

/// Split a symbol into `(base, quote)`.
///
/// If the original string (before normalization) contains an underscore,
/// that separator is authoritative. Otherwise the canonical form must end
/// with one of [`KNOWN_QUOTES`]; any symbol failing to split this way is an
/// error — the quote currency is never guessed.
pub fn split_symbol(raw: &str) -> Result<(SmolStr, SmolStr), SymbolError> {
    let upper = raw.trim().to_ascii_uppercase();
    if let Some(idx) = upper.find(['_', '-']) {
        let (base, quote) = upper.split_at(idx);
        let quote = &quote[1..];
        if base.is_empty() || quote.is_empty() {
            return Err(SymbolError::UnsplittableSymbol(raw.to_string()));
        }
        return Ok((SmolStr::new(base), SmolStr::new(quote)));
    }

    let canonical = normalize_symbol(raw);
    for quote in KNOWN_QUOTES {
        if canonical.len() > quote.len() && canonical.ends_with(quote) {
            let base = &canonical[..canonical.len() - quote.len()];
            return Ok((SmolStr::new(base), SmolStr::new(*quote)));
        }
    }

    Err(SymbolError::UnsplittableSymbol(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_separators() {
        assert_eq!(normalize_symbol("btc_try"), "BTCTRY");
        assert_eq!(normalize_symbol("btc-try"), "BTCTRY");
        assert_eq!(normalize_symbol(" BtcTry "), "BTCTRY");
    }

    #[test]
    fn splits_on_underscore_first() {
        let (base, quote) = split_symbol("eth_usdt").unwrap();
        assert_eq!(base, "ETH");
        assert_eq!(quote, "USDT");
    }

    #[test]
    fn splits_on_known_quote_suffix() {
        let (base, quote) = split_symbol("BTCTRY").unwrap();
        assert_eq!(base, "BTC");
        assert_eq!(quote, "TRY");
    }

    #[test]
    fn rejects_unknown_suffix() {
        assert!(split_symbol("XYZZY").is_err());
    }

    #[test]
    fn rejects_when_entire_string_is_the_quote() {
        assert!(split_symbol("TRY").is_err());
    }
}
