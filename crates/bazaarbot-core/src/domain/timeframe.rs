use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Chart lookback windows understood by the router and the market
/// client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "1w")]
    OneWeek,
    #[serde(rename = "1M")]
    OneMonth,
    #[serde(rename = "3M")]
    ThreeMonths,
    #[serde(rename = "6M")]
    SixMonths,
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "5y")]
    FiveYears,
}

impl Timeframe {
    pub const ALL: [Self; 7] = [
        Self::OneDay,
        Self::OneWeek,
        Self::OneMonth,
        Self::ThreeMonths,
        Self::SixMonths,
        Self::OneYear,
        Self::FiveYears,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OneDay => "1d",
            Self::OneWeek => "1w",
            Self::OneMonth => "1M",
            Self::ThreeMonths => "3M",
            Self::SixMonths => "6M",
            Self::OneYear => "1y",
            Self::FiveYears => "5y",
        }
    }

    /// Candle-source `(range, interval)` pairing: longer lookbacks use
    /// coarser sampling.
    pub const fn candle_window(self) -> (&'static str, &'static str) {
        match self {
            Self::OneDay => ("1d", "5m"),
            Self::OneWeek => ("5d", "15m"),
            Self::OneMonth => ("1mo", "1d"),
            Self::ThreeMonths => ("3mo", "1d"),
            Self::SixMonths => ("6mo", "1d"),
            Self::OneYear => ("1y", "1wk"),
            Self::FiveYears => ("5y", "1mo"),
        }
    }

    /// Lenient parse for externally supplied duration codes; unknown
    /// values fall back to the three-month window.
    pub fn parse_lenient(value: &str) -> Self {
        Self::from_str(value).unwrap_or(Self::ThreeMonths)
    }
}

impl Default for Timeframe {
    fn default() -> Self {
        Self::ThreeMonths
    }
}

impl Display for Timeframe {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "1d" => Ok(Self::OneDay),
            "1w" => Ok(Self::OneWeek),
            "1M" => Ok(Self::OneMonth),
            "3M" => Ok(Self::ThreeMonths),
            "6M" => Ok(Self::SixMonths),
            "1y" => Ok(Self::OneYear),
            "5y" => Ok(Self::FiveYears),
            other => Err(ValidationError::InvalidTimeframe {
                value: other.to_owned(),
            }),
        }
    }
}
