use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use stock_tracker::domain::{format_date, parse_calendar_date};
use stock_tracker::orchestration::fetch_series;
use stock_tracker::{
    ApiCredentials, AppError, BatchRunner, Config, CsvTableStore, Decimal, PriceSeries,
    StockDataSource, TableStore,
};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Fill the first week of closing prices for every stock in a tracking table.
#[derive(Debug, Parser)]
#[command(name = "stock-tracker", version)]
struct Cli {
    /// Tracking table (CSV)
    #[arg(required_unless_present = "show")]
    file: Option<PathBuf>,

    /// Create the table with the tracking header if it does not exist
    #[arg(long)]
    create: bool,

    /// Enable debug logging
    #[arg(long, short)]
    verbose: bool,

    /// Print the price history of SYMBOL instead of updating a table
    #[arg(long, value_name = "SYMBOL", requires = "from")]
    show: Option<String>,

    /// First date for --show (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date_arg)]
    from: Option<NaiveDate>,

    /// Last date for --show, open-ended when omitted
    #[arg(long, value_parser = parse_date_arg)]
    to: Option<NaiveDate>,
}

fn parse_date_arg(raw: &str) -> Result<NaiveDate, String> {
    parse_calendar_date(raw).ok_or_else(|| format!("invalid date: {}", raw))
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let config = Config::from_env()?;
    let credentials =
        ApiCredentials::load(&config.api_keys_file, config.stockdata_api_token.clone());
    if credentials.stockdata_token().is_none() {
        tracing::warn!(
            "No StockData.org token found in {} or STOCKDATA_API_TOKEN; every row will be deferred",
            config.api_keys_file.display()
        );
    }

    let source = Arc::new(StockDataSource::new(
        config.stockdata_api_url.clone(),
        credentials,
        config.http_settings(),
    ));

    if let Some(symbol) = cli.show.as_deref() {
        let from = cli
            .from
            .ok_or_else(|| AppError::BadRequest("--show needs --from".to_string()))?;
        let series = fetch_series(&*source, symbol, from, cli.to).await?;
        print_series(symbol, &series);
        return Ok(());
    }

    let path = cli
        .file
        .ok_or_else(|| AppError::BadRequest("no table file given".to_string()))?;
    let store = CsvTableStore::new(path);

    if !store.exists() {
        if !cli.create {
            return Err(AppError::BadRequest(format!(
                "{} does not exist; pass --create to start a new table",
                store.path().display()
            )));
        }
        store.create()?;
        println!("Created {}", store.path().display());
    }
    println!("Columns: {}", store.columns()?.join(", "));

    let runner = BatchRunner::new(source, Arc::new(store), config.reference_clock())
        .persist_each_row(config.persist_each_row);

    tokio::select! {
        result = runner.run_pass() => {
            let summary = result?;
            println!("{}", summary);
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted; rows after the last save are unchanged");
        }
    }
    Ok(())
}

fn print_series(symbol: &str, series: &PriceSeries) {
    let cell = |v: Option<Decimal>| v.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string());

    match (series.first(), series.last()) {
        (Some((first, _)), Some((last, _))) => println!(
            "{}: {} bars from {} to {}",
            symbol,
            series.len(),
            format_date(first),
            format_date(last)
        ),
        _ => {
            println!("{}: no data", symbol);
            return;
        }
    }
    println!(
        "{:<12} {:>12} {:>12} {:>12} {:>12} {:>14}",
        "date", "open", "high", "low", "close", "volume"
    );
    for (date, bar) in series.iter() {
        println!(
            "{:<12} {:>12} {:>12} {:>12} {:>12} {:>14}",
            format_date(*date),
            cell(bar.open),
            cell(bar.high),
            cell(bar.low),
            cell(bar.close),
            bar.volume.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string()),
        );
    }
}
