use anyhow::Context;
use clap::Parser;
use colored::*;
use std::path::PathBuf;
use std::sync::Arc;

use cointrack::apis::coingecko::CoinGeckoClient;
use cointrack::apis::SharedPriceApi;
use cointrack::config::TrackerConfig;
use cointrack::logger::{self, LogTag};
use cointrack::store::{AppSnapshot, AppStore};

/// Market tracker and converter against the CoinGecko API.
///
/// One-shot CLI consumer of the store: refresh the top markets, apply an
/// optional search query, print the filtered table, then run a single
/// conversion for the selected pair.
#[derive(Parser)]
#[command(name = "cointrack", version, about = "Cryptocurrency market tracker and converter")]
struct Cli {
    /// Path to the JSON config file
    #[arg(long, default_value = "cointrack.json")]
    config: PathBuf,

    /// Filter the market table by name or symbol
    #[arg(long)]
    query: Option<String>,

    /// Conversion source asset id (e.g. "bitcoin")
    #[arg(long)]
    from: Option<String>,

    /// Conversion target asset id (e.g. "ethereum")
    #[arg(long)]
    to: Option<String>,

    /// Amount to convert
    #[arg(long)]
    amount: Option<String>,

    /// Enable debug logging for a tag (repeatable; "all" for everything)
    #[arg(long = "debug", value_name = "TAG")]
    debug: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logger::init_with_args(
        cli.debug
            .iter()
            .map(|tag| format!("--debug-{}", tag))
            .collect(),
    );

    let mut config = TrackerConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;
    if let Some(from) = &cli.from {
        config.default_from = from.clone();
    }
    if let Some(to) = &cli.to {
        config.default_to = to.clone();
    }
    if let Some(amount) = &cli.amount {
        config.default_amount = amount.clone();
    }

    logger::info(LogTag::System, "cointrack starting up");

    let api: SharedPriceApi = Arc::new(CoinGeckoClient::new(
        &config.base_url,
        config.per_page,
        config.request_timeout_secs,
    )?);
    let store = AppStore::new(api, &config);

    store.refresh().await;

    if let Some(query) = &cli.query {
        store.set_search_text(query);
        // One-shot run: wait out the debounce window before reading the
        // filtered view.
        store.wait_search_settled().await;
    }

    if let Err(e) = store.convert_now().await {
        logger::warning(LogTag::System, &format!("Conversion skipped: {}", e));
    }

    let snapshot = store.snapshot();
    print_markets(&snapshot);
    print_conversion(&snapshot);

    Ok(())
}

fn print_markets(snapshot: &AppSnapshot) {
    println!();
    if snapshot.search.settled.is_empty() {
        println!("{}", format!("Top {} markets by market cap", snapshot.quotes.len()).bold());
    } else {
        println!(
            "{}",
            format!(
                "{} of {} markets matching \"{}\"",
                snapshot.filtered.len(),
                snapshot.quotes.len(),
                snapshot.search.settled
            )
            .bold()
        );
    }
    println!("{}", "─".repeat(72).dimmed());

    if let Some(error) = &snapshot.last_error {
        println!("{} {}", "refresh failed:".red().bold(), error);
    }

    for quote in snapshot.filtered.iter() {
        let rank = quote
            .market_cap_rank
            .map(|r| format!("#{}", r))
            .unwrap_or_else(|| "-".to_string());
        let change_24h = colorize_change(&format!(
            "{} 24h",
            format_percentage(quote.price_change_percentage_24h)
        ), quote.price_change_percentage_24h);
        let change_7d = match quote.price_change_percentage_7d_in_currency {
            Some(change) => colorize_change(&format!("{} 7d", format_percentage(change)), change),
            None => String::new(),
        };

        println!(
            "{:>5} {:>6} {:<24} {:>14} {} {}",
            rank.dimmed(),
            quote.symbol.to_uppercase().bold(),
            quote.name,
            format_price(quote.current_price),
            change_24h,
            change_7d
        );
    }
}

fn print_conversion(snapshot: &AppSnapshot) {
    let input = &snapshot.conversion_input;
    let from_symbol = symbol_for(snapshot, &input.from_id);
    let to_symbol = symbol_for(snapshot, &input.to_id);

    println!();
    println!("{}", "Conversion".bold());
    println!("{}", "─".repeat(72).dimmed());

    match (&snapshot.conversion.amount, &snapshot.conversion.rate) {
        (Some(converted), Some(_)) => {
            println!("{} {} = {} {}", input.amount, from_symbol, format!("{:.8}", converted).bold(), to_symbol);
            println!("{}", rate_line(&input.amount, *converted, &from_symbol, &to_symbol).dimmed());
        }
        _ => {
            let reason = snapshot
                .conversion
                .last_error
                .clone()
                .unwrap_or_else(|| "no result".to_string());
            println!("{} ({})", "no conversion available".yellow(), reason);
        }
    }
}

fn symbol_for(snapshot: &AppSnapshot, id: &str) -> String {
    snapshot
        .quotes
        .iter()
        .find(|q| q.id == id)
        .map(|q| q.symbol.to_uppercase())
        .unwrap_or_else(|| id.to_string())
}

/// Unit rate as displayed: converted amount divided by the entered
/// amount. A zero amount yields a non-finite value.
fn rate_line(amount: &str, converted: f64, from_symbol: &str, to_symbol: &str) -> String {
    let entered: f64 = amount.trim().parse().unwrap_or(f64::NAN);
    format!("1 {} = {:.8} {}", from_symbol, converted / entered, to_symbol)
}

fn format_price(price: f64) -> String {
    // More precision for sub-dollar assets.
    if price < 1.0 {
        format!("${:.6}", price)
    } else {
        format!("${:.2}", price)
    }
}

fn format_percentage(percentage: f64) -> String {
    if percentage > 0.0 {
        format!("+{:.2}%", percentage)
    } else {
        format!("{:.2}%", percentage)
    }
}

fn colorize_change(text: &str, change: f64) -> String {
    if change > 0.0 {
        text.green().to_string()
    } else {
        text.red().to_string()
    }
}
