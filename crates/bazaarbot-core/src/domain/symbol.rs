use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

const MAX_SYMBOL_LEN: usize = 20;

/// Indian stock exchanges served by the quote provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Exchange {
    Nse,
    Bse,
}

impl Exchange {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Nse => "NSE",
            Self::Bse => "BSE",
        }
    }

    /// Ticker suffix used by the historical candle source.
    pub const fn candle_suffix(self) -> &'static str {
        match self {
            Self::Nse => ".NS",
            Self::Bse => ".BO",
        }
    }
}

impl Display for Exchange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Exchange {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "NSE" => Ok(Self::Nse),
            "BSE" => Ok(Self::Bse),
            other => Err(ValidationError::InvalidExchange {
                value: other.to_owned(),
            }),
        }
    }
}

/// Normalized exchange-qualified trading symbol.
///
/// Accepts either a bare symbol (`reliance`, defaulting to NSE) or the
/// `EXCHANGE-SYMBOL` form (`BSE-TCS`); both normalize to uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExchangeSymbol {
    exchange: Exchange,
    symbol: String,
}

impl ExchangeSymbol {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptySymbol);
        }

        let (exchange, raw_symbol) = match trimmed.split_once('-') {
            Some((prefix, rest)) => (Exchange::from_str(prefix)?, rest),
            None => (Exchange::Nse, trimmed),
        };

        let symbol = raw_symbol.trim().to_ascii_uppercase();
        if symbol.is_empty() {
            return Err(ValidationError::EmptySymbol);
        }

        let len = symbol.chars().count();
        if len > MAX_SYMBOL_LEN {
            return Err(ValidationError::SymbolTooLong {
                len,
                max: MAX_SYMBOL_LEN,
            });
        }

        for (index, ch) in symbol.chars().enumerate() {
            let valid = ch.is_ascii_alphanumeric() || ch == '&' || ch == '.';
            if !valid {
                return Err(ValidationError::SymbolInvalidChar { ch, index });
            }
        }

        Ok(Self { exchange, symbol })
    }

    pub const fn exchange(&self) -> Exchange {
        self.exchange
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Stable `EXCHANGE:SYMBOL` token for cache keys.
    pub fn cache_token(&self) -> String {
        format!("{}:{}", self.exchange.as_str(), self.symbol)
    }

    /// Ticker form used by the historical candle source, e.g.
    /// `RELIANCE.NS`.
    pub fn candle_ticker(&self) -> String {
        format!("{}{}", self.symbol, self.exchange.candle_suffix())
    }
}

impl Display for ExchangeSymbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.exchange.as_str(), self.symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_symbol_defaults_to_nse_and_uppercases() {
        let parsed = ExchangeSymbol::parse(" reliance ").expect("must parse");
        assert_eq!(parsed.exchange(), Exchange::Nse);
        assert_eq!(parsed.symbol(), "RELIANCE");
        assert_eq!(parsed.to_string(), "NSE-RELIANCE");
    }

    #[test]
    fn exchange_prefix_is_honored() {
        let parsed = ExchangeSymbol::parse("bse-tcs").expect("must parse");
        assert_eq!(parsed.exchange(), Exchange::Bse);
        assert_eq!(parsed.symbol(), "TCS");
        assert_eq!(parsed.candle_ticker(), "TCS.BO");
    }

    #[test]
    fn ampersand_symbols_are_accepted() {
        let parsed = ExchangeSymbol::parse("M&M").expect("must parse");
        assert_eq!(parsed.symbol(), "M&M");
    }

    #[test]
    fn unknown_exchange_is_rejected() {
        let err = ExchangeSymbol::parse("NYSE-AAPL").expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidExchange { .. }));
    }

    #[test]
    fn empty_and_invalid_symbols_are_rejected() {
        assert!(matches!(
            ExchangeSymbol::parse("  "),
            Err(ValidationError::EmptySymbol)
        ));
        assert!(matches!(
            ExchangeSymbol::parse("NSE-"),
            Err(ValidationError::EmptySymbol)
        ));
        assert!(matches!(
            ExchangeSymbol::parse("TCS!"),
            Err(ValidationError::SymbolInvalidChar { .. })
        ));
    }

    #[test]
    fn cache_token_is_stable() {
        let parsed = ExchangeSymbol::parse("NSE-INFY").expect("must parse");
        assert_eq!(parsed.cache_token(), "NSE:INFY");
    }
}
