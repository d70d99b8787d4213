//! Trading CLI - Main Entry Point
//!
//! Risk-sized futures trading across every configured account, driven by
//! flags or by natural-language chat.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use std::io::Write;
use std::process::ExitCode;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use trading_cli::config::{load_config, DEFAULT_CONFIG_PATH};
use trading_cli::render::render_report;
use trading_cli::watch::run_watch;
use trading_cli::{AccountScope, BatchReport, IntentKind, RawIntent, TradingContext, TradingError};

/// CLI arguments for the application
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Route every account to the exchange demo environment
    #[arg(long, global = true)]
    demo: bool,

    /// Log level (trace, debug, info, warn, error); defaults to settings.log_level
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Run only on this account
    #[arg(short, long, global = true)]
    account: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone, Copy)]
struct WatchArgs {
    /// Keep refreshing until Ctrl+C
    #[arg(short, long)]
    watch: bool,

    /// Seconds between refreshes; defaults to settings.watch_refresh_seconds
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    refresh: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show account balances
    Balance {
        #[command(flatten)]
        watch: WatchArgs,
    },
    /// Show open positions with PnL and distance to targets
    Positions {
        #[arg(short, long)]
        symbol: Option<String>,
        #[command(flatten)]
        watch: WatchArgs,
    },
    /// Show resting orders with expected PnL
    Orders {
        #[arg(short, long)]
        symbol: Option<String>,
        /// Show full order ids
        #[arg(long)]
        verbose: bool,
        #[command(flatten)]
        watch: WatchArgs,
    },
    /// Open a risk-sized position
    Open {
        #[arg(long)]
        symbol: String,
        /// long or short
        #[arg(long)]
        side: String,
        #[arg(long)]
        entry: Decimal,
        /// Stop-loss price
        #[arg(long)]
        sl: Decimal,
        /// Percent of available balance to risk
        #[arg(long)]
        risk: Decimal,
        /// Reward-to-risk ratio for the take profit
        #[arg(long)]
        rr: Option<Decimal>,
        /// Explicit take-profit price
        #[arg(long)]
        tp: Option<Decimal>,
        /// Enter with a market order
        #[arg(long)]
        market: bool,
    },
    /// Close positions, fully or partially
    Close {
        #[arg(short, long)]
        symbol: Option<String>,
        /// Percent of the position to close (default 100)
        #[arg(short, long)]
        percent: Option<Decimal>,
    },
    /// Cancel resting orders
    Cancel {
        #[arg(short, long)]
        symbol: Option<String>,
    },
    /// Attach a trailing stop to a position
    Trail {
        #[arg(long)]
        symbol: String,
        /// Activation price
        #[arg(long)]
        trigger: Decimal,
        /// Callback in percent, e.g. 0.5
        #[arg(long)]
        callback: Decimal,
    },
    /// Move the stop of a position to its entry price
    Breakeven {
        #[arg(long)]
        symbol: String,
    },
    /// Interactive natural-language mode
    Chat,
}

impl Command {
    fn to_raw(&self) -> Option<RawIntent> {
        let raw = match self {
            Command::Balance { .. } => RawIntent::new(IntentKind::CheckBalance),
            Command::Positions { symbol, .. } => RawIntent {
                symbol: symbol.clone(),
                ..RawIntent::new(IntentKind::ViewPositions)
            },
            Command::Orders { symbol, .. } => RawIntent {
                symbol: symbol.clone(),
                ..RawIntent::new(IntentKind::ViewOrders)
            },
            Command::Open {
                symbol,
                side,
                entry,
                sl,
                risk,
                rr,
                tp,
                market,
            } => RawIntent {
                entry_price: Some(*entry),
                stop_loss: Some(*sl),
                risk_percent: Some(*risk),
                rr_ratio: *rr,
                take_profit: *tp,
                market: *market,
                ..RawIntent::new(IntentKind::Open)
                    .with_symbol(symbol.as_str())
                    .with_side(side.as_str())
            },
            Command::Close { symbol, percent } => RawIntent {
                symbol: symbol.clone(),
                close_percentage: *percent,
                ..RawIntent::new(IntentKind::Close)
            },
            Command::Cancel { symbol } => RawIntent {
                symbol: symbol.clone(),
                ..RawIntent::new(IntentKind::Cancel)
            },
            Command::Trail {
                symbol,
                trigger,
                callback,
            } => RawIntent {
                trigger_price: Some(*trigger),
                callback_rate: Some(*callback),
                ..RawIntent::new(IntentKind::TrailingStop).with_symbol(symbol.as_str())
            },
            Command::Breakeven { symbol } => {
                RawIntent::new(IntentKind::BreakEven).with_symbol(symbol.as_str())
            }
            Command::Chat => return None,
        };
        Some(raw)
    }

    fn watch_args(&self) -> Option<WatchArgs> {
        match self {
            Command::Balance { watch } | Command::Positions { watch, .. } | Command::Orders { watch, .. } => {
                Some(*watch)
            }
            _ => None,
        }
    }

    fn verbose(&self) -> bool {
        matches!(self, Command::Orders { verbose: true, .. })
    }
}

fn init_logging(level: &str) -> Result<()> {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // RUST_LOG wins over the flag
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn exit_code(report: &BatchReport) -> ExitCode {
    if report.is_total_failure() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Print a run result; validation problems are user errors, not crashes
fn report_outcome(result: trading_cli::Result<BatchReport>, verbose: bool) -> Result<ExitCode> {
    match result {
        Ok(report) => {
            println!("{}", render_report(&report, verbose));
            Ok(exit_code(&report))
        }
        Err(TradingError::Validation(problems)) => {
            eprintln!("Invalid command:");
            for problem in problems {
                eprintln!("  - {}", problem);
            }
            Ok(ExitCode::from(2))
        }
        Err(e) => Err(e.into()),
    }
}

async fn watch_loop(
    ctx: &TradingContext,
    raw: &RawIntent,
    scope: &AccountScope,
    interval: Duration,
    verbose: bool,
) -> Result<ExitCode> {
    let command = ctx.normalize(raw);
    if let Err(e) = command.ensure_valid() {
        return report_outcome(Err(e), verbose);
    }

    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = tx.send(true);
        }
    });

    let secs = interval.as_secs();
    run_watch(
        interval,
        rx,
        || ctx.run(&command, scope),
        |report: &BatchReport| {
            print!("\x1B[2J\x1B[H");
            println!("{}", render_report(report, verbose));
            println!("\nRefreshing every {}s, press Ctrl+C to stop", secs);
        },
    )
    .await?;

    Ok(ExitCode::SUCCESS)
}

async fn chat(ctx: &TradingContext, scope: &AccountScope) -> Result<ExitCode> {
    let processor = ctx.nlp_processor()?;
    info!(provider = processor.provider(), "Chat session started");

    println!("Type a trading command in plain English or Spanish. 'exit' to leave.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input, "exit" | "quit" | "q") {
            println!("Goodbye!");
            break;
        }

        let parsed = match processor.parse_command(input).await {
            Ok(parsed) => parsed,
            Err(e) => {
                println!("Failed to parse: {}", e);
                continue;
            }
        };

        if parsed.confidence > 0.0 {
            println!(
                "  Intent: {} ({:.0}% confidence)",
                parsed.command.intent(),
                parsed.confidence * 100.0
            );
        }

        match ctx.run(&parsed.command, scope).await {
            Ok(report) => println!("{}", render_report(&report, false)),
            Err(TradingError::Validation(problems)) => {
                for problem in problems {
                    println!("  - {}", problem);
                }
            }
            Err(e) => println!("Execution failed: {}", e),
        }
        println!();
    }

    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse command line arguments
    let cli = Cli::parse();

    let config = load_config(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config))?;

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.settings.log_level.clone());
    init_logging(&level)?;
    info!(config = %cli.config, demo = cli.demo, "Starting trading CLI");

    let refresh_default = config.settings.watch_refresh_seconds;
    let ctx = TradingContext::connect(config, cli.demo)?;
    let scope = AccountScope::from(cli.account.clone());
    let verbose = cli.command.verbose();

    let Some(raw) = cli.command.to_raw() else {
        return chat(&ctx, &scope).await;
    };

    match cli.command.watch_args() {
        Some(WatchArgs {
            watch: true,
            refresh,
        }) => {
            let interval = Duration::from_secs(refresh.unwrap_or(refresh_default));
            watch_loop(&ctx, &raw, &scope, interval, verbose).await
        }
        _ => report_outcome(ctx.run_raw(&raw, &scope).await, verbose),
    }
}
