use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use comfy_table::{Table, presets::UTF8_FULL};
use configuration::Config;
use core_types::{LotMode, Side, TradingMode};
use database::{FileStore, RemoteLedger};
use engine::{AccountService, AccountSnapshot, BackgroundScheduler, OrderRequest, ServiceParams, SystemClock};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

/// The main entry point for the Tradewind paper-trading account engine.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; it only carries optional overrides.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = configuration::load_config(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config))?;
    let _log_guard = configuration::init_tracing(&config.logging)?;

    let service = open_service(&cli.user, &config).await?;

    match cli.command {
        Commands::Status(args) => handle_status(&service, args).await,
        Commands::Buy(args) => handle_order(&service, Side::Buy, args).await,
        Commands::Sell(args) => handle_order(&service, Side::Sell, args).await,
        Commands::Tick => {
            let report = service.tick().await;
            println!(
                "Settled: {}  Defaulted: {}  Persisted: {}",
                report.settled.len(),
                report.defaulted.len(),
                report.persisted
            );
            Ok(())
        }
        Commands::Sync => {
            let report = service.sync().await;
            match report.degraded {
                Some(reason) => println!("Remote unavailable, local state kept: {}", reason),
                None => println!(
                    "Merged {} transaction(s) into {:?}. Persisted: {}",
                    report.added, report.changed_modes, report.persisted
                ),
            }
            Ok(())
        }
        Commands::Reset(args) => {
            let persisted = service.reset_mode(args.mode).await;
            println!("{} account reset. Persisted: {}", args.mode, persisted);
            Ok(())
        }
        Commands::Run => handle_run(Arc::new(service), &config).await,
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// A paper-trading account engine with a ledger-derived balance and T+2 settlement.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file (extension optional).
    #[arg(long, default_value = "config.toml")]
    config: String,

    /// The account owner.
    #[arg(long)]
    user: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show balance, pending settlement, positions and ledger.
    Status(StatusArgs),
    /// Quote a buy order, and place it with --yes.
    Buy(OrderArgs),
    /// Quote a sell order, and place it with --yes.
    Sell(OrderArgs),
    /// Run one settlement pass over both modes.
    Tick,
    /// Merge the remote replica into both modes.
    Sync,
    /// Replace one mode's account with a fresh one.
    Reset(ModeArgs),
    /// Settle and sync periodically until Ctrl-C, printing events as JSON.
    Run,
}

#[derive(Parser)]
struct StatusArgs {
    #[arg(long, value_enum, default_value = "practice")]
    mode: TradingMode,

    /// Mark a position at a price, e.g. --quote 2330=612.5. Repeatable.
    #[arg(long = "quote", value_parser = parse_quote)]
    quotes: Vec<(String, Decimal)>,
}

#[derive(Parser)]
struct OrderArgs {
    #[arg(long, value_enum, default_value = "practice")]
    mode: TradingMode,

    /// Instrument symbol (e.g., "2330").
    #[arg(long)]
    symbol: String,

    /// Display name; defaults to the symbol.
    #[arg(long, default_value = "")]
    name: String,

    /// Lots for whole-lot orders, shares for odd-lot orders.
    #[arg(long)]
    quantity: u64,

    #[arg(long, value_enum, default_value = "whole")]
    lot_mode: LotMode,

    /// The quoted price per share.
    #[arg(long)]
    price: Decimal,

    /// Confirm the order instead of only quoting it.
    #[arg(long)]
    yes: bool,
}

#[derive(Parser)]
struct ModeArgs {
    #[arg(long, value_enum)]
    mode: TradingMode,
}

fn parse_quote(raw: &str) -> Result<(String, Decimal), String> {
    let (symbol, price) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected SYMBOL=PRICE, got `{}`", raw))?;
    let price = price
        .trim()
        .parse::<Decimal>()
        .map_err(|e| format!("invalid price `{}`: {}", price, e))?;
    Ok((symbol.trim().to_string(), price))
}

// ==============================================================================
// Command Logic
// ==============================================================================

async fn open_service(user: &str, config: &Config) -> anyhow::Result<AccountService> {
    let params = ServiceParams::from_settings(&config.trading, &config.service)?;
    let storage = Arc::new(FileStore::new(&config.storage.data_dir));
    let remote = config
        .storage
        .remote_dir
        .as_deref()
        .filter(|dir| !dir.is_empty())
        .map(|dir| Arc::new(FileStore::new(dir)) as Arc<dyn RemoteLedger>);

    AccountService::open(user, params, storage, remote, Arc::new(SystemClock))
        .await
        .with_context(|| format!("failed to open the account of {}", user))
}

async fn handle_status(service: &AccountService, args: StatusArgs) -> anyhow::Result<()> {
    let snapshot = service.current_state(args.mode).await;
    print_summary(&snapshot);

    let quotes: HashMap<String, Decimal> = args.quotes.into_iter().collect();
    let valuation = service.valuation(args.mode, &quotes).await;

    let mut positions = Table::new();
    positions.load_preset(UTF8_FULL).set_header(vec![
        "Symbol", "Shares", "Avg Price", "Mark", "Market Value", "Unrealized P&L",
    ]);
    for p in &valuation.positions {
        let mark = if p.quoted { p.mark_price.to_string() } else { format!("{} (cost)", p.mark_price) };
        positions.add_row(vec![
            p.symbol.clone(),
            p.shares.to_string(),
            p.average_price.round_dp(2).to_string(),
            mark,
            p.market_value.round_dp(2).to_string(),
            p.unrealized_pnl.round_dp(2).to_string(),
        ]);
    }
    println!("{positions}");
    println!("Total equity: {}", valuation.total_equity.round_dp(2));

    let mut ledger_table = Table::new();
    ledger_table.load_preset(UTF8_FULL).set_header(vec![
        "Created", "Symbol", "Side", "Shares", "Price", "Fee", "Tax", "Settles", "Status",
    ]);
    for tx in &snapshot.ledger {
        ledger_table.add_row(vec![
            tx.created_at.format("%Y-%m-%d %H:%M").to_string(),
            tx.symbol.clone(),
            tx.side.to_string(),
            tx.shares.to_string(),
            tx.price.to_string(),
            tx.fee.to_string(),
            tx.tax.to_string(),
            tx.settles_at.format("%Y-%m-%d %H:%M").to_string(),
            format!("{:?}", tx.status()),
        ]);
    }
    println!("{ledger_table}");
    Ok(())
}

fn print_summary(snapshot: &AccountSnapshot) {
    println!("Mode:        {}", snapshot.mode);
    println!("Balance:     {}", snapshot.balance);
    println!("Frozen:      {}", snapshot.frozen);
    println!("Payable:     {}", snapshot.pending.payable);
    println!("Receivable:  {}", snapshot.pending.receivable);
    println!("Last update: {}", snapshot.last_update);
}

async fn handle_order(service: &AccountService, side: Side, args: OrderArgs) -> anyhow::Result<()> {
    let request = OrderRequest {
        mode: args.mode,
        symbol: args.symbol,
        name: args.name,
        side,
        lot_mode: args.lot_mode,
        quantity: args.quantity,
        quoted_price: args.price,
    };
    let quote = service.place_order(&request).await?;
    println!(
        "{} {} x {} @ {}  gross {}  fee {}  tax {}  total {}",
        quote.ticket.side,
        quote.ticket.symbol,
        quote.ticket.shares,
        quote.ticket.price,
        quote.costs.gross,
        quote.costs.fee,
        quote.costs.tax,
        quote.total
    );
    if !args.yes {
        println!("Quote only. Re-run with --yes to place the order.");
        return Ok(());
    }
    let tx = service.confirm_order(&quote).await?;
    println!("Placed {} (settles {}).", tx.id, tx.settles_at);
    Ok(())
}

async fn handle_run(service: Arc<AccountService>, config: &Config) -> anyhow::Result<()> {
    let mut events = service.subscribe();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = BackgroundScheduler::new(
        service.clone(),
        config.service.tick_interval(),
        config.service.sync_interval(),
    )
    .spawn(shutdown_rx);

    loop {
        tokio::select! {
            received = events.recv() => match received {
                Ok(envelope) => println!("{}", envelope.to_json()?),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event printer fell behind");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for Ctrl-C")?;
                break;
            }
        }
    }

    if shutdown_tx.send(true).is_err() {
        bail!("background task ended unexpectedly");
    }
    handle.await.context("background task panicked")?;
    Ok(())
}
