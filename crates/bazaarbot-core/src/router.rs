//! Deterministic intent and entity extraction for free-text queries.
//!
//! The router is pure: identical input text always yields an identical
//! [`ParsedQuery`]. Symbol extraction unions three strategies — a
//! curated ticker set matched per word, a colloquial-name alias table,
//! and the explicit `EXCHANGE-SYMBOL` form. Intent resolution walks a
//! fixed precedence ladder so specific domains pre-empt generic ones
//! ("chart price of X" is a chart request; a bare ticker is a price
//! request).

use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::Timeframe;

/// Classified purpose of a user query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    PriceQuote,
    Options,
    Ipo,
    Intraday,
    LongTerm,
    Chart,
    News,
    Educational,
    Search,
    General,
}

impl Intent {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PriceQuote => "PRICE_QUOTE",
            Self::Options => "OPTIONS",
            Self::Ipo => "IPO",
            Self::Intraday => "INTRADAY",
            Self::LongTerm => "LONG_TERM",
            Self::Chart => "CHART",
            Self::News => "NEWS",
            Self::Educational => "EDUCATIONAL",
            Self::Search => "SEARCH",
            Self::General => "GENERAL",
        }
    }
}

impl Display for Intent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured form of one user query. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedQuery {
    pub intent: Intent,
    /// Extracted symbols, deduplicated and sorted.
    pub symbols: Vec<String>,
    pub timeframe: Option<Timeframe>,
    /// Residual free text for SEARCH-style lookups.
    pub search_term: Option<String>,
    pub query_text: String,
    /// Set when the query spans multiple tool domains.
    pub is_complex: bool,
}

/// Curated NSE large-cap tickers recognized as bare words.
const KNOWN_SYMBOLS: [&str; 48] = [
    "RELIANCE", "TCS", "INFY", "HDFCBANK", "ICICIBANK", "SBIN", "ITC",
    "BHARTIARTL", "HINDUNILVR", "KOTAKBANK", "LT", "BAJFINANCE", "MARUTI",
    "TITAN", "AXISBANK", "WIPRO", "ADANIPORTS", "ASIANPAINT", "ULTRACEMCO",
    "NIFTY", "SENSEX", "TATAMOTORS", "SUNPHARMA", "ONGC", "NTPC",
    "POWERGRID", "NESTLEIND", "JSWSTEEL", "TATASTEEL", "TECHM", "HCLTECH",
    "BAJAJFINSV", "DIVISLAB", "DRREDDY", "CIPLA", "EICHERMOT", "HEROMOTOCO",
    "M&M", "COALINDIA", "GRASIM", "APOLLOHOSP", "BRITANNIA", "SBILIFE",
    "BPCL", "HINDALCO", "INDUSINDBK", "UPL", "TATACONSUM",
];

/// Colloquial-name aliases. Multi-word company names whose resolution
/// is the SEARCH flow's job are deliberately not aliased here.
const SYMBOL_ALIASES: [(&str, &str); 18] = [
    ("reliance", "RELIANCE"),
    ("ril", "RELIANCE"),
    ("tata consultancy", "TCS"),
    ("infosys", "INFY"),
    ("infy", "INFY"),
    ("hdfc bank", "HDFCBANK"),
    ("icici bank", "ICICIBANK"),
    ("sbi", "SBIN"),
    ("state bank", "SBIN"),
    ("airtel", "BHARTIARTL"),
    ("bharti airtel", "BHARTIARTL"),
    ("zomato", "ZOMATO"),
    ("paytm", "PAYTM"),
    ("one97", "PAYTM"),
    ("nifty", "NIFTY"),
    ("nifty 50", "NIFTY"),
    ("sensex", "SENSEX"),
    ("bse index", "SENSEX"),
];

const PRICE_KEYWORDS: [&str; 9] = [
    "price", "current", "trading", "ltp", "quote", "value", "worth", "how much", "rate",
];
const CHART_KEYWORDS: [&str; 7] = [
    "chart", "graph", "candlestick", "historical", "trend", "performance", "movement",
];
const NEWS_KEYWORDS: [&str; 7] = [
    "news", "headlines", "latest", "updates", "sentiment", "articles", "market buzz",
];
const SEARCH_KEYWORDS: [&str; 7] = [
    "find", "search", "lookup", "which stock", "symbol for", "ticker", "suggest",
];
const OPTIONS_KEYWORDS: [&str; 8] = [
    "call option", "put option", "f&o", "futures", "derivatives", "strike", "premium", "expiry",
];
const IPO_KEYWORDS: [&str; 7] = [
    "ipo", "upcoming ipo", "listing", "subscription", "allotment", "gmp", "grey market",
];
const INTRADAY_KEYWORDS: [&str; 6] = [
    "intraday", "day trade", "scalping", "short term", "today", "swing trade",
];
const LONG_TERM_KEYWORDS: [&str; 8] = [
    "invest", "long term", "hold", "portfolio", "fundamentals", "value investing",
    "dividend", "multibagger",
];
const EDUCATIONAL_KEYWORDS: [&str; 6] = [
    "what is", "define", "explain", "how does", "meaning of", "learn",
];

/// Stop words removed when deriving a search term.
const SEARCH_STOP_WORDS: [&str; 11] = [
    "find", "search", "stock", "symbol", "for", "what", "is", "the", "lookup", "price", "of",
];

/// Rule-based query parser. Construct once and share; parsing holds no
/// mutable state.
pub struct QueryRouter {
    known_symbols: BTreeSet<&'static str>,
    exchange_pattern: Regex,
    timeframe_patterns: Vec<(Regex, Timeframe)>,
}

impl Default for QueryRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryRouter {
    pub fn new() -> Self {
        // Ordered: first match wins, so "today" stays ahead of the
        // generic day pattern.
        let timeframe_table: [(&str, Timeframe); 8] = [
            (r"\btoday\b", Timeframe::OneDay),
            (r"\b(1|one)\s*day\b", Timeframe::OneDay),
            (r"\b(1|one)\s*week\b", Timeframe::OneWeek),
            (r"\b(1|one)\s*month\b", Timeframe::OneMonth),
            (r"\b(3|three)\s*months?\b", Timeframe::ThreeMonths),
            (r"\b(6|six)\s*months?\b", Timeframe::SixMonths),
            (r"\b(1|one)\s*year\b", Timeframe::OneYear),
            (r"\b(5|five)\s*years?\b", Timeframe::FiveYears),
        ];

        Self {
            known_symbols: KNOWN_SYMBOLS.into_iter().collect(),
            exchange_pattern: Regex::new(r"\b(NSE|BSE)-([A-Z0-9&]+)\b")
                .expect("exchange pattern is valid"),
            timeframe_patterns: timeframe_table
                .into_iter()
                .map(|(pattern, timeframe)| {
                    (
                        Regex::new(pattern).expect("timeframe pattern is valid"),
                        timeframe,
                    )
                })
                .collect(),
        }
    }

    /// Parse a free-text query into its structured form.
    pub fn parse(&self, query: &str) -> ParsedQuery {
        let lower = query.to_lowercase();
        let symbols = self.extract_symbols(query, &lower);
        let timeframe = self.extract_timeframe(&lower);
        let intent = self.determine_intent(&lower, &symbols);

        let search_term = if intent == Intent::Search
            || (intent == Intent::PriceQuote && symbols.is_empty())
        {
            extract_search_term(&lower, &symbols)
        } else {
            None
        };

        ParsedQuery {
            intent,
            symbols,
            timeframe,
            search_term,
            query_text: query.to_owned(),
            is_complex: is_complex_query(&lower),
        }
    }

    fn extract_symbols(&self, query: &str, lower: &str) -> Vec<String> {
        let upper = query.to_uppercase();
        let mut found = BTreeSet::new();

        // Known tickers, matched per whitespace token with punctuation
        // stripped, so a short ticker never matches inside a longer
        // word.
        for token in upper.split_whitespace() {
            let clean: String = token
                .chars()
                .filter(|ch| ch.is_ascii_alphanumeric() || *ch == '&')
                .collect();
            if self.known_symbols.contains(clean.as_str()) {
                found.insert(clean);
            }
        }

        for (alias, symbol) in SYMBOL_ALIASES {
            if contains_word(lower, alias) {
                found.insert(symbol.to_owned());
            }
        }

        for capture in self.exchange_pattern.captures_iter(&upper) {
            found.insert(capture[2].to_owned());
        }

        found.into_iter().collect()
    }

    fn extract_timeframe(&self, lower: &str) -> Option<Timeframe> {
        self.timeframe_patterns
            .iter()
            .find(|(pattern, _)| pattern.is_match(lower))
            .map(|(_, timeframe)| *timeframe)
    }

    fn determine_intent(&self, lower: &str, symbols: &[String]) -> Intent {
        // Symbol plus a price keyword is the strongest signal.
        if !symbols.is_empty() && contains_any(lower, &PRICE_KEYWORDS) {
            return Intent::PriceQuote;
        }

        if contains_any(lower, &OPTIONS_KEYWORDS) {
            return Intent::Options;
        }
        if contains_any(lower, &IPO_KEYWORDS) {
            return Intent::Ipo;
        }
        if contains_any(lower, &INTRADAY_KEYWORDS) {
            return Intent::Intraday;
        }
        if contains_any(lower, &LONG_TERM_KEYWORDS) {
            return Intent::LongTerm;
        }

        if contains_any(lower, &CHART_KEYWORDS) {
            return Intent::Chart;
        }
        if contains_any(lower, &NEWS_KEYWORDS) {
            return Intent::News;
        }
        if contains_any(lower, &EDUCATIONAL_KEYWORDS) {
            return Intent::Educational;
        }

        if symbols.is_empty() && contains_any(lower, &SEARCH_KEYWORDS) {
            return Intent::Search;
        }

        // A bare ticker defaults to a price lookup.
        if !symbols.is_empty() || contains_any(lower, &PRICE_KEYWORDS) {
            return Intent::PriceQuote;
        }

        Intent::General
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

/// Word-boundary containment check for multi-word aliases.
fn contains_word(haystack: &str, needle: &str) -> bool {
    let mut start = 0;
    while let Some(offset) = haystack[start..].find(needle) {
        let begin = start + offset;
        let end = begin + needle.len();

        let boundary_before = begin == 0
            || !haystack[..begin]
                .chars()
                .next_back()
                .is_some_and(|ch| ch.is_alphanumeric());
        let boundary_after = end == haystack.len()
            || !haystack[end..]
                .chars()
                .next()
                .is_some_and(|ch| ch.is_alphanumeric());

        if boundary_before && boundary_after {
            return true;
        }
        start = begin + needle.len().max(1);
    }
    false
}

fn extract_search_term(lower: &str, symbols: &[String]) -> Option<String> {
    let symbol_words: Vec<String> = symbols.iter().map(|s| s.to_lowercase()).collect();

    let words: Vec<&str> = lower
        .split(|ch: char| !ch.is_alphanumeric() && ch != '&')
        .filter(|word| !word.is_empty())
        .filter(|word| !SEARCH_STOP_WORDS.contains(word))
        .filter(|word| !symbol_words.iter().any(|symbol| symbol.as_str() == *word))
        .collect();

    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}

fn is_complex_query(lower: &str) -> bool {
    let domains = [&PRICE_KEYWORDS[..], &NEWS_KEYWORDS[..], &CHART_KEYWORDS[..]];
    domains
        .iter()
        .filter(|keywords| contains_any(lower, keywords))
        .count()
        > 1
}
