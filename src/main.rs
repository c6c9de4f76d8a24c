//! Prediction market arbitrage engine entry point.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusBuilder;
use time::OffsetDateTime;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use prediction_arb::arbitrage::Scanner;
use prediction_arb::circuit::CircuitBreaker;
use prediction_arb::config::Config;
use prediction_arb::ledger::{Ledger, MemoryLedger};
use prediction_arb::market::{HttpMarketFeed, MarketFeed};
use prediction_arb::metrics;
use prediction_arb::risk::RiskManager;
use prediction_arb::trading::{ExecutionOutcome, Executor, HttpOrderGateway, OrderGateway};

/// Prediction market arbitrage engine.
#[derive(Parser, Debug)]
#[command(name = "prediction-arb")]
#[command(about = "Scans binary prediction markets for YES+NO mispricings and executes both legs")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the scan-evaluate-execute loop (default).
    Run {
        /// Override dry-run mode (no real orders).
        #[arg(long)]
        dry_run: Option<bool>,
    },

    /// Run a single scan cycle and print the ranked opportunities.
    Scan,

    /// Check configuration validity.
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("prediction_arb=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    metrics::init_metrics();

    match args.command {
        Some(Command::CheckConfig) => cmd_check_config(),
        Some(Command::Scan) => cmd_scan().await,
        Some(Command::Run { dry_run }) => cmd_run(dry_run).await,
        None => cmd_run(None).await,
    }
}

/// Check configuration validity.
fn cmd_check_config() -> anyhow::Result<()> {
    println!("Loading configuration...");
    let config = Config::load()?;

    match config.validate() {
        Ok(()) => println!("Configuration OK"),
        Err(e) => {
            println!("Configuration INVALID: {e}");
            anyhow::bail!("configuration validation failed");
        }
    }

    println!("  Min gross edge:       {}", config.min_gross_edge);
    println!("  Min net profit:       ${}", config.min_net_profit);
    println!("  Min liquidity:        ${}", config.min_liquidity);
    println!("  Min APY:              {}%", config.min_apy);
    println!("  Max trade size:       ${}", config.max_trade_size);
    println!("  Max daily loss:       ${}", config.max_daily_loss);
    println!("  Max open exposure:    ${}", config.max_open_exposure);
    println!("  Max days to resolve:  {}", config.max_days_to_resolution);
    println!("  Order timeout:        {}s", config.order_timeout_seconds);
    println!("  Partial fill unwind:  {}", config.partial_fill_unwind);
    println!("  Dry run:              {}", config.dry_run);

    Ok(())
}

/// Run a single scan cycle and print the results.
async fn cmd_scan() -> anyhow::Result<()> {
    let config = Arc::new(Config::load()?);
    config.validate().map_err(|e| anyhow::anyhow!(e))?;

    let feed: Arc<dyn MarketFeed> = Arc::new(HttpMarketFeed::new(&config));
    let scanner = Scanner::new(config, feed);

    let opportunities = scanner.scan_and_rank().await;
    if opportunities.is_empty() {
        println!("No arbitrage opportunities found.");
        return Ok(());
    }

    println!("{} opportunities, best first:", opportunities.len());
    for opp in &opportunities {
        println!(
            "  {} | edge={} net=${} apy={}% size=${} confidence={}",
            opp.market.title,
            opp.gross_edge,
            opp.net_profit,
            opp.apy.round_dp(1),
            opp.position_size,
            opp.confidence_score().round_dp(0),
        );
    }

    Ok(())
}

/// Run the main trading loop until interrupted.
async fn cmd_run(dry_run_override: Option<bool>) -> anyhow::Result<()> {
    let mut config = Config::load()?;
    if let Some(dry_run) = dry_run_override {
        config.dry_run = dry_run;
    }
    config.validate().map_err(|e| anyhow::anyhow!(e))?;
    let config = Arc::new(config);

    if let Err(err) = PrometheusBuilder::new().install() {
        warn!(error = %err, "failed to install Prometheus exporter, metrics disabled");
    }

    info!(
        dry_run = config.dry_run,
        scan_interval_s = config.scan_interval_seconds,
        "starting arbitrage engine"
    );

    let feed: Arc<dyn MarketFeed> = Arc::new(HttpMarketFeed::new(&config));
    let gateway: Arc<dyn OrderGateway> = Arc::new(HttpOrderGateway::new(&config));
    let ledger: Arc<dyn Ledger> = Arc::new(MemoryLedger::new());

    let scanner = Scanner::new(config.clone(), feed.clone());
    let executor = Executor::new(config.clone(), gateway, feed, ledger.clone());
    let mut risk = RiskManager::new(config.clone(), ledger);
    let breaker = CircuitBreaker::new(config.max_consecutive_gateway_failures);

    let trading_loop = async {
        loop {
            run_cycle(&config, &scanner, &executor, &mut risk, &breaker).await;
            sleep(config.scan_interval()).await;
        }
    };

    tokio::select! {
        _ = trading_loop => {}
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received, stopping");
        }
    }

    Ok(())
}

/// One scan-evaluate-execute cycle.
async fn run_cycle(
    config: &Arc<Config>,
    scanner: &Scanner,
    executor: &Executor,
    risk: &mut RiskManager,
    breaker: &CircuitBreaker,
) {
    if breaker.is_halted() {
        if let Some(reason) = breaker.trip_reason() {
            warn!(%reason, "circuit breaker halted, skipping cycle");
        }
        return;
    }

    match risk.emergency_stop().await {
        Ok(None) => {}
        Ok(Some(reason)) => {
            warn!(%reason, "emergency stop active, skipping cycle");
            return;
        }
        Err(err) => {
            warn!(error = %err, "could not evaluate emergency stop, skipping cycle");
            return;
        }
    }

    let opportunities = scanner.scan_and_rank().await;
    let Some(top) = opportunities.first() else {
        return;
    };

    let now = OffsetDateTime::now_utc();
    if let Err(defect) = risk.validate_opportunity(top, now) {
        debug!(market = %top.market.id, %defect, "opportunity rejected by validation");
        return;
    }

    if let Err(denial) = risk.check_trade_allowed(top).await {
        metrics::record_denial();
        debug!(market = %top.market.id, %denial, "trade denied");
        return;
    }

    if config.dry_run {
        info!(
            market = %top.market.id,
            size = %top.position_size,
            net_profit = %top.net_profit,
            "dry run: would execute arbitrage"
        );
        return;
    }

    let report = executor.execute(top).await;
    match report.outcome {
        ExecutionOutcome::FullyFilled => {
            breaker.record_success();
            risk.record_trade_result(top.net_profit);
        }
        ExecutionOutcome::Unwound => {
            breaker.record_success();
            let realized = report.realized_pnl.unwrap_or_default();
            risk.record_trade_result(realized - config.estimated_fee_per_trade());
        }
        ExecutionOutcome::UnwindFailed => {
            breaker.record_unwind_failure(&top.market.id);
        }
        ExecutionOutcome::Failed => {
            metrics::record_gateway_failure();
            breaker.record_gateway_failure();
        }
        ExecutionOutcome::TimedOut | ExecutionOutcome::PartiallyFilled => {
            // No realized result to record; exposure (if any) is already in
            // the ledger and will gate the next cycle.
        }
    }
}
