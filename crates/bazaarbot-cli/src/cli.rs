//! CLI argument definitions.
//!
//! | Command | Description |
//! |---------|-------------|
//! | `quote` | Live quote for a symbol |
//! | `history` | Historical candles for a symbol |
//! | `search` | Instrument search |
//! | `news` | Keyword news search |
//! | `headlines` | Category headlines |
//! | `trending` | Curated trending quotes |
//! | `ask` | Route a free-text question and fetch the answer data |
//! | `limits` | Upstream call budget usage |

use clap::{Parser, Subcommand};

/// Indian stock-market data assistant.
#[derive(Debug, Parser)]
#[command(name = "bazaarbot", version, about = "Indian stock-market data assistant")]
pub struct Cli {
    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Run fully offline with no-op transports.
    #[arg(long, global = true)]
    pub mock: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch the live quote for a symbol (e.g. RELIANCE, BSE-TCS).
    Quote {
        symbol: String,
    },
    /// Fetch historical candles for a symbol.
    History {
        symbol: String,
        /// Lookback window: 1d, 1w, 1M, 3M, 6M, 1y or 5y.
        #[arg(long, default_value = "3M")]
        range: String,
    },
    /// Search instruments by name or symbol fragment.
    Search {
        query: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Search news articles by keyword.
    News {
        query: String,
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
    /// Fetch top headlines for a category.
    Headlines {
        #[arg(long, default_value = "business")]
        category: String,
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
    /// Fetch quotes for the curated trending list.
    Trending,
    /// Route a free-text question and fetch the matching data.
    Ask {
        text: String,
    },
    /// Show upstream call budget usage.
    Limits,
}
