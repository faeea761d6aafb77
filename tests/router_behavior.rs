//! Behavior-driven tests for the query router.
//!
//! These pin the canonical precedence ladder and the extraction rules:
//! identical text always parses identically, specific domains pre-empt
//! generic ones, and short tickers never match inside longer words.

use bazaarbot_core::{Intent, QueryRouter, Timeframe};

fn router() -> QueryRouter {
    QueryRouter::new()
}

// =============================================================================
// Canonical intent scenarios
// =============================================================================

#[test]
fn price_question_with_company_name_routes_to_price_quote() {
    let parsed = router().parse("What is the price of Reliance?");

    assert_eq!(parsed.intent, Intent::PriceQuote);
    assert!(parsed.symbols.contains(&String::from("RELIANCE")));
    assert_eq!(parsed.query_text, "What is the price of Reliance?");
}

#[test]
fn chart_request_with_symbol_and_range_routes_to_chart() {
    let parsed = router().parse("Show me RELIANCE chart for 1 year");

    assert_eq!(parsed.intent, Intent::Chart);
    assert!(parsed.symbols.contains(&String::from("RELIANCE")));
    assert_eq!(parsed.timeframe, Some(Timeframe::OneYear));
}

#[test]
fn options_explainer_preempts_bare_symbol_match() {
    let parsed = router().parse("Explain call options for NIFTY");

    assert_eq!(parsed.intent, Intent::Options);
}

#[test]
fn bare_ticker_defaults_to_price_quote() {
    let parsed = router().parse("INFY");

    assert_eq!(parsed.intent, Intent::PriceQuote);
    assert_eq!(parsed.symbols, vec![String::from("INFY")]);
}

#[test]
fn market_overview_today_has_no_symbols_and_one_day_timeframe() {
    let parsed = router().parse("How is the market today?");

    assert!(parsed.symbols.is_empty());
    assert_eq!(parsed.timeframe, Some(Timeframe::OneDay));
}

#[test]
fn company_symbol_lookup_routes_to_search_with_term() {
    let parsed = router().parse("Find Tata Motors stock symbol");

    assert_eq!(parsed.intent, Intent::Search);
    let term = parsed.search_term.expect("search term must be present");
    assert!(!term.is_empty());
    assert_eq!(term, "tata motors");
}

#[test]
fn chart_and_price_keyword_ambiguity_follows_the_ladder() {
    // A recognized symbol plus a price keyword is the strongest
    // signal, even when chart words appear too.
    let quote = router().parse("chart price of RELIANCE");
    assert_eq!(quote.intent, Intent::PriceQuote, "symbol + price keyword wins");

    // Without a recognized symbol, chart pre-empts the generic
    // trailing price rule.
    let chart = router().parse("chart price of suzlon energy");
    assert_eq!(chart.intent, Intent::Chart);

    let chart_only = router().parse("RELIANCE candlestick movement");
    assert_eq!(chart_only.intent, Intent::Chart);
}

#[test]
fn news_request_routes_to_news() {
    let parsed = router().parse("latest news about TATAMOTORS");

    assert_eq!(parsed.intent, Intent::News);
    assert_eq!(parsed.symbols, vec![String::from("TATAMOTORS")]);
}

#[test]
fn ipo_and_intraday_and_long_term_precedence() {
    assert_eq!(router().parse("upcoming ipo allotment status").intent, Intent::Ipo);
    assert_eq!(router().parse("intraday plan please").intent, Intent::Intraday);
    assert_eq!(
        router().parse("should i invest for the long term").intent,
        Intent::LongTerm
    );
}

#[test]
fn educational_question_routes_to_educational() {
    let parsed = router().parse("explain the meaning of circuit breaker");
    assert_eq!(parsed.intent, Intent::Educational);
}

#[test]
fn unclassifiable_text_routes_to_general() {
    let parsed = router().parse("good morning");

    assert_eq!(parsed.intent, Intent::General);
    assert!(parsed.symbols.is_empty());
    assert!(parsed.timeframe.is_none());
    assert!(parsed.search_term.is_none());
    assert!(!parsed.is_complex);
}

// =============================================================================
// Symbol extraction rules
// =============================================================================

#[test]
fn two_letter_ticker_does_not_match_inside_longer_word() {
    // LT is a known ticker; RESULT must not surface it.
    let parsed = router().parse("STRONG QUARTERLY RESULT EXPECTED");
    assert!(parsed.symbols.is_empty());

    let direct = router().parse("LT latest price");
    assert!(direct.symbols.contains(&String::from("LT")));
}

#[test]
fn exchange_qualified_form_is_extracted() {
    let parsed = router().parse("compare NSE-ZOMATO with BSE-PAYTM price");

    assert!(parsed.symbols.contains(&String::from("ZOMATO")));
    assert!(parsed.symbols.contains(&String::from("PAYTM")));
}

#[test]
fn nickname_and_ticker_for_same_company_deduplicate() {
    let parsed = router().parse("reliance RELIANCE NSE-RELIANCE quote");

    assert_eq!(parsed.symbols, vec![String::from("RELIANCE")]);
}

#[test]
fn multiple_companies_are_all_extracted() {
    let parsed = router().parse("compare TCS and Infosys price");

    assert!(parsed.symbols.contains(&String::from("TCS")));
    assert!(parsed.symbols.contains(&String::from("INFY")));
}

#[test]
fn punctuation_around_tickers_is_ignored() {
    let parsed = router().parse("price of ITC, SBIN?");

    assert!(parsed.symbols.contains(&String::from("ITC")));
    assert!(parsed.symbols.contains(&String::from("SBIN")));
}

// =============================================================================
// Timeframe table
// =============================================================================

#[test]
fn timeframe_table_maps_spelled_and_numeric_quantities() {
    let cases = [
        ("performance over 1 day", Timeframe::OneDay),
        ("one week trend", Timeframe::OneWeek),
        ("1 month chart", Timeframe::OneMonth),
        ("three month history", Timeframe::ThreeMonths),
        ("6 month movement", Timeframe::SixMonths),
        ("one year graph", Timeframe::OneYear),
        ("5 year performance", Timeframe::FiveYears),
        ("how is it today", Timeframe::OneDay),
    ];

    for (text, expected) in cases {
        let parsed = router().parse(text);
        assert_eq!(parsed.timeframe, Some(expected), "text: {text}");
    }
}

#[test]
fn absent_timeframe_stays_absent() {
    assert!(router().parse("RELIANCE price").timeframe.is_none());
}

// =============================================================================
// Search term and complexity
// =============================================================================

#[test]
fn search_term_strips_symbols_and_stop_words() {
    let parsed = router().parse("find the symbol for Mahindra Logistics");

    assert_eq!(parsed.intent, Intent::Search);
    assert_eq!(parsed.search_term.as_deref(), Some("mahindra logistics"));
}

#[test]
fn price_query_without_symbol_carries_search_term() {
    let parsed = router().parse("price of Suzlon Energy");

    assert_eq!(parsed.intent, Intent::PriceQuote);
    assert!(parsed.symbols.is_empty());
    assert_eq!(parsed.search_term.as_deref(), Some("suzlon energy"));
}

#[test]
fn complexity_flag_requires_more_than_one_domain() {
    assert!(router().parse("TCS price and latest news").is_complex);
    assert!(router().parse("RELIANCE chart with current price").is_complex);
    assert!(!router().parse("TCS news").is_complex);
    assert!(!router().parse("TCS quote").is_complex);
}

// =============================================================================
// Determinism
// =============================================================================

#[test]
fn identical_input_always_parses_identically() {
    let r = router();
    let texts = [
        "What is the price of Reliance?",
        "Show me RELIANCE chart for 1 year",
        "Find Tata Motors stock symbol",
        "latest news and price for NSE-ZOMATO today",
    ];

    for text in texts {
        let first = r.parse(text);
        for _ in 0..5 {
            assert_eq!(r.parse(text), first, "text: {text}");
        }
    }
}
