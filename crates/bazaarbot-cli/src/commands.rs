//! Command dispatch against the assembled core.

use serde_json::{json, Value};

use bazaarbot_core::{Core, CoreBuilder, Intent, Timeframe};

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub async fn run(cli: &Cli) -> Result<(), CliError> {
    let core = build_core(cli);

    let output = match &cli.command {
        Command::Quote { symbol } => {
            let quote = core
                .market
                .stock_data(symbol)
                .await
                .ok_or_else(|| CliError::NoData(symbol.clone()))?;
            serde_json::to_value(quote)?
        }
        Command::History { symbol, range } => {
            let timeframe = Timeframe::parse_lenient(range);
            let candles = core
                .market
                .historical_candles(symbol, timeframe)
                .await
                .ok_or_else(|| CliError::NoData(symbol.clone()))?;
            json!({
                "symbol": symbol,
                "timeframe": timeframe.as_str(),
                "candles": candles,
            })
        }
        Command::Search { query, limit } => {
            serde_json::to_value(core.market.search_stocks(query, *limit).await)?
        }
        Command::News { query, limit } => {
            serde_json::to_value(core.news.search_news(query, *limit).await)?
        }
        Command::Headlines { category, limit } => {
            serde_json::to_value(core.news.top_headlines(category, *limit).await)?
        }
        Command::Trending => serde_json::to_value(core.market.trending_stocks().await)?,
        Command::Ask { text } => answer(&core, text).await?,
        Command::Limits => serde_json::to_value(core.limiter_statuses())?,
    };

    render(&output, cli.pretty)?;
    Ok(())
}

fn build_core(cli: &Cli) -> Core {
    if cli.mock {
        CoreBuilder::new().with_mock_mode().build()
    } else {
        CoreBuilder::from_env().build()
    }
}

/// Route a free-text question and fetch the data its intent calls for.
/// Advisory intents (options, IPO, intraday, long-term, educational,
/// general) are answered by an external model layer; for those only
/// the parsed routing is returned.
async fn answer(core: &Core, text: &str) -> Result<Value, CliError> {
    let parsed = core.router.parse(text);
    let mut output = json!({ "query": &parsed });

    match parsed.intent {
        Intent::PriceQuote => {
            let mut quotes = Vec::new();
            for symbol in &parsed.symbols {
                if let Some(quote) = core.market.stock_data(symbol).await {
                    quotes.push(quote);
                }
            }
            if quotes.is_empty() {
                if let Some(term) = &parsed.search_term {
                    output["matches"] =
                        serde_json::to_value(core.market.search_stocks(term, 5).await)?;
                }
            }
            output["quotes"] = serde_json::to_value(quotes)?;
        }
        Intent::Chart => {
            let timeframe = parsed.timeframe.unwrap_or_default();
            let mut charts = Vec::new();
            for symbol in &parsed.symbols {
                if let Some(candles) = core.market.historical_candles(symbol, timeframe).await {
                    charts.push(json!({ "symbol": symbol, "candles": candles }));
                }
            }
            output["charts"] = Value::Array(charts);
        }
        Intent::News => {
            let topic = parsed
                .symbols
                .first()
                .cloned()
                .or_else(|| parsed.search_term.clone())
                .unwrap_or_else(|| String::from("indian stock market"));
            output["articles"] = serde_json::to_value(core.news.search_news(&topic, 5).await)?;
        }
        Intent::Search => {
            let term = parsed.search_term.clone().unwrap_or_else(|| text.to_owned());
            output["matches"] = serde_json::to_value(core.market.search_stocks(&term, 10).await)?;
        }
        Intent::Options
        | Intent::Ipo
        | Intent::Intraday
        | Intent::LongTerm
        | Intent::Educational
        | Intent::General => {}
    }

    Ok(output)
}

fn render(output: &Value, pretty: bool) -> Result<(), CliError> {
    let rendered = if pretty {
        serde_json::to_string_pretty(output)?
    } else {
        serde_json::to_string(output)?
    };
    println!("{rendered}");
    Ok(())
}
