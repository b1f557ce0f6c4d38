//! Command-line lookup
//!
//! Tax numbers given as arguments are looked up in a single upload; without
//! arguments they are read from standard input, one per line, and streamed
//! through one worker per CPU.
//!
//! ```bash
//! cargo run --example lookup -- 12345676 13895459
//! cut -d';' -f1 partners.csv | cargo run --release --example lookup
//! ```
//!
//! Each record is printed as `<tax number>;"<owner>"`, or
//! `<tax number>;INVALID` when the checksum fails. Any failure exits with
//! status 2 after printing what was already found.
//!
//! Environment (a `.env` file is read too):
//! - `NAV_QUERY_URL` - start page (default: the authority's public page)
//! - `NAV_QUERY_BATCH_SIZE` - tax numbers per upload when streaming (default: 128)
//! - `NAV_QUERY_TIMEOUT_SECS` - overall deadline (default: 300)

use nav_query::{CallContext, Config, NavClient, TaxRecord};
use std::time::Duration;
use tokio::io::BufReader;
use tokio::sync::mpsc;

type DemoResult<T> = Result<T, Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Initialize tracing for logging (optional)
    // Uncomment if you add tracing-subscriber to your dependencies:
    // tracing_subscriber::fmt::init();

    if let Err(e) = run().await {
        eprintln!("error: {}", e);
        std::process::exit(2);
    }
}

async fn run() -> DemoResult<()> {
    let client = NavClient::new(config_from_env())?;
    let timeout = std::env::var("NAV_QUERY_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(300);
    let ctx = CallContext::with_timeout(Duration::from_secs(timeout));

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        lookup_stdin(&client, &ctx).await
    } else {
        lookup_args(&client, &ctx, &args).await
    }
}

fn config_from_env() -> Config {
    let mut config = Config::default();
    if let Ok(url) = std::env::var("NAV_QUERY_URL") {
        config.start_url = url;
    }
    if let Some(batch_size) = std::env::var("NAV_QUERY_BATCH_SIZE")
        .ok()
        .and_then(|s| s.parse().ok())
    {
        config.batch_size = batch_size;
    }
    config
}

fn print_records(records: &[TaxRecord]) {
    for record in records {
        println!("{}", record);
    }
}

async fn lookup_args(client: &NavClient, ctx: &CallContext, args: &[String]) -> DemoResult<()> {
    match client.lookup(ctx, args).await {
        Ok(records) => {
            print_records(&records);
            Ok(())
        }
        Err(failure) => {
            print_records(&failure.partial);
            Err(failure.into())
        }
    }
}

async fn lookup_stdin(client: &NavClient, ctx: &CallContext) -> DemoResult<()> {
    let workers = std::thread::available_parallelism()
        .map(usize::from)
        .unwrap_or(1);
    let (tx, mut rx) = mpsc::channel::<Vec<TaxRecord>>(workers);

    // Drain results before the workers start producing them
    let printer = tokio::spawn(async move {
        while let Some(records) = rx.recv().await {
            print_records(&records);
        }
    });

    let input = BufReader::new(tokio::io::stdin());
    let outcome = client.lookup_stream(ctx, tx, input).await;
    printer.await?;
    outcome.map_err(Into::into)
}
